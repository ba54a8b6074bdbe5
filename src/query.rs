//! The listing query model.
//!
//! A [`ListingQuery`] is one page of one collection: a fixed scope (e.g. "only
//! doctors"), at most one user-selected filter, a sort order, and a 1-based
//! page of a fixed size. The row range sent to the store is derived from the
//! page, never stored separately.
//!
//! ```text
//! page 1, size 9  →  rows [0, 8]
//! page 3, size 9  →  rows [18, 26]
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("page index must be at least 1")]
    ZeroPage,
    #[error("page size must be greater than 0")]
    ZeroPageSize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortOrder {
    pub field: String,
    pub direction: Direction,
}

impl SortOrder {
    pub fn ascending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Ascending,
        }
    }

    pub fn descending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Descending,
        }
    }
}

/// A row predicate the store must be able to evaluate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Predicate {
    /// `field = value`
    Equals { field: String, value: String },
    /// The list in `field` shares at least one element with `values`.
    Overlaps { field: String, values: Vec<String> },
    /// The list in `field` holds every element of `values`.
    Contains { field: String, values: Vec<String> },
    /// `lower <= field <= upper`, compared on the bound's prefix length so
    /// timestamps match date bounds.
    Between {
        field: String,
        lower: String,
        upper: String,
    },
}

impl Predicate {
    pub fn field(&self) -> &str {
        match self {
            Predicate::Equals { field, .. }
            | Predicate::Overlaps { field, .. }
            | Predicate::Contains { field, .. }
            | Predicate::Between { field, .. } => field,
        }
    }
}

/// Inclusive row range `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowRange {
    pub start: u64,
    pub end: u64,
}

impl RowRange {
    /// Number of rows the range spans.
    pub fn row_count(&self) -> u64 {
        self.end + 1 - self.start
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListingQuery {
    pub collection: String,
    /// Always-on restriction that defines the listing (not user-selectable).
    pub scope: Vec<Predicate>,
    /// The single active filter dimension, if any.
    pub filter: Option<Predicate>,
    pub sort: SortOrder,
    page: u32,
    page_size: u32,
}

impl ListingQuery {
    pub fn new(
        collection: impl Into<String>,
        sort: SortOrder,
        page: u32,
        page_size: u32,
    ) -> Result<Self, QueryError> {
        if page == 0 {
            return Err(QueryError::ZeroPage);
        }
        if page_size == 0 {
            return Err(QueryError::ZeroPageSize);
        }
        Ok(Self {
            collection: collection.into(),
            scope: Vec::new(),
            filter: None,
            sort,
            page,
            page_size,
        })
    }

    pub fn with_scope(mut self, scope: impl IntoIterator<Item = Predicate>) -> Self {
        self.scope.extend(scope);
        self
    }

    /// Replace the active filter. Setting a new one drops the previous one.
    pub fn with_filter(mut self, filter: Option<Predicate>) -> Self {
        self.filter = filter;
        self
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Rows `[(page-1)*size, page*size - 1]`.
    pub fn range(&self) -> RowRange {
        let size = u64::from(self.page_size);
        let start = u64::from(self.page - 1) * size;
        RowRange {
            start,
            end: start + size - 1,
        }
    }

    /// Scope predicates followed by the active filter.
    pub fn predicates(&self) -> impl Iterator<Item = &Predicate> {
        self.scope.iter().chain(self.filter.iter())
    }
}
