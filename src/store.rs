//! Remote store interface and the bundled in-memory store.
//!
//! The listing engine only ever needs two reads from the store:
//!
//! - [`RemoteStore::select`] — a filtered, sorted, ranged read of one
//!   collection that also reports the exact number of matching rows, in the
//!   same round trip.
//! - [`RemoteStore::select_in`] — a batched lookup of many keys at once, used
//!   to resolve foreign keys without one request per row.
//!
//! [`MemoryStore`] implements both over collections of JSON rows, loaded from
//! a fixture file or built in tests. It keeps a log of every call it served
//! and can be told to fail reads of a collection, which is how the engine's
//! degradation paths are exercised.

use crate::query::{Direction, ListingQuery, Predicate, RowRange, SortOrder};
use crate::types::RecordId;
use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("request to `{collection}` failed: {message}")]
    Request { collection: String, message: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One read against one collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectRequest {
    pub collection: String,
    pub predicates: Vec<Predicate>,
    pub sort: Option<SortOrder>,
    /// Rows to return; `None` returns every matching row.
    pub range: Option<RowRange>,
}

impl SelectRequest {
    /// Every row of a collection, unsorted.
    pub fn all(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            predicates: Vec::new(),
            sort: None,
            range: None,
        }
    }

    /// The counted, ranged read for one listing page.
    pub fn for_page(query: &ListingQuery) -> Self {
        Self {
            collection: query.collection.clone(),
            predicates: query.predicates().cloned().collect(),
            sort: Some(query.sort.clone()),
            range: Some(query.range()),
        }
    }

    pub fn filtered(mut self, predicates: impl IntoIterator<Item = Predicate>) -> Self {
        self.predicates.extend(predicates);
        self
    }

    pub fn sorted(mut self, sort: SortOrder) -> Self {
        self.sort = Some(sort);
        self
    }
}

/// Rows of one read plus the exact count of matching rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    pub rows: Vec<Value>,
    /// Matching rows before the range was applied.
    pub count: u64,
}

#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn select(&self, request: &SelectRequest) -> Result<Selection, StoreError>;

    /// Rows of `collection` whose `field` holds one of `ids`.
    async fn select_in(
        &self,
        collection: &str,
        field: &str,
        ids: &[RecordId],
    ) -> Result<Vec<Value>, StoreError>;
}

/// A call served by [`MemoryStore`], in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Select {
        collection: String,
        range: Option<RowRange>,
    },
    SelectIn {
        collection: String,
        ids: Vec<RecordId>,
    },
}

/// In-process store over JSON rows.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: BTreeMap<String, Vec<Value>>,
    failing: Mutex<BTreeSet<String>>,
    calls: Mutex<Vec<StoreCall>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a fixture of the form `{"articles": [...], "issues": [...]}`.
    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        let collections: BTreeMap<String, Vec<Value>> = serde_json::from_str(json)?;
        Ok(Self {
            collections,
            ..Self::default()
        })
    }

    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn with_collection(
        mut self,
        name: impl Into<String>,
        rows: impl IntoIterator<Item = Value>,
    ) -> Self {
        self.insert(name, rows);
        self
    }

    /// Append rows to a collection, creating it if needed.
    pub fn insert(&mut self, name: impl Into<String>, rows: impl IntoIterator<Item = Value>) {
        self.collections.entry(name.into()).or_default().extend(rows);
    }

    pub fn collection_names(&self) -> impl Iterator<Item = &str> {
        self.collections.keys().map(String::as_str)
    }

    pub fn rows(&self, collection: &str) -> &[Value] {
        self.collections
            .get(collection)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Make every following read of `collection` fail.
    pub fn fail_collection(&self, collection: &str) {
        lock(&self.failing).insert(collection.to_string());
    }

    pub fn recover_collection(&self, collection: &str) {
        lock(&self.failing).remove(collection);
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        lock(&self.calls).clone()
    }

    /// Number of batched lookups served for `collection`.
    pub fn lookups(&self, collection: &str) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|call| {
                matches!(call, StoreCall::SelectIn { collection: c, .. } if c == collection)
            })
            .count()
    }

    pub fn clear_calls(&self) {
        lock(&self.calls).clear();
    }

    fn record(&self, call: StoreCall) {
        lock(&self.calls).push(call);
    }

    fn readable(&self, collection: &str) -> Result<&[Value], StoreError> {
        if lock(&self.failing).contains(collection) {
            return Err(StoreError::Request {
                collection: collection.to_string(),
                message: "store unavailable".to_string(),
            });
        }
        match self.collections.get(collection) {
            Some(rows) => Ok(rows),
            None => Err(StoreError::Request {
                collection: collection.to_string(),
                message: format!("relation \"{collection}\" does not exist"),
            }),
        }
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn select(&self, request: &SelectRequest) -> Result<Selection, StoreError> {
        self.record(StoreCall::Select {
            collection: request.collection.clone(),
            range: request.range,
        });
        let rows = self.readable(&request.collection)?;

        let mut matching: Vec<&Value> = rows
            .iter()
            .filter(|row| request.predicates.iter().all(|p| matches(row, p)))
            .collect();
        if let Some(sort) = &request.sort {
            matching.sort_by(|a, b| compare_rows(a, b, sort));
        }

        let count = matching.len() as u64;
        let rows: Vec<Value> = match request.range {
            Some(range) => matching
                .into_iter()
                .skip(to_usize(range.start))
                .take(to_usize(range.row_count()))
                .cloned()
                .collect(),
            None => matching.into_iter().cloned().collect(),
        };
        debug!(
            collection = %request.collection,
            count,
            returned = rows.len(),
            "served select"
        );
        Ok(Selection { rows, count })
    }

    async fn select_in(
        &self,
        collection: &str,
        field: &str,
        ids: &[RecordId],
    ) -> Result<Vec<Value>, StoreError> {
        self.record(StoreCall::SelectIn {
            collection: collection.to_string(),
            ids: ids.to_vec(),
        });
        let rows = self.readable(collection)?;
        let wanted: BTreeSet<&RecordId> = ids.iter().collect();
        Ok(rows
            .iter()
            .filter(|row| {
                row.get(field)
                    .and_then(RecordId::from_value)
                    .is_some_and(|id| wanted.contains(&id))
            })
            .cloned()
            .collect())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn to_usize(n: u64) -> usize {
    usize::try_from(n).unwrap_or(usize::MAX)
}

// ============================================================================
// Predicate evaluation
// ============================================================================

/// Evaluate one predicate against a row.
pub fn matches(row: &Value, predicate: &Predicate) -> bool {
    let field = row.get(predicate.field());
    match predicate {
        Predicate::Equals { value, .. } => field
            .and_then(RecordId::from_value)
            .is_some_and(|v| v.as_str() == value),
        Predicate::Overlaps { values, .. } => list_values(field)
            .iter()
            .any(|v| values.iter().any(|wanted| wanted == v)),
        Predicate::Contains { values, .. } => {
            let present = list_values(field);
            values.iter().all(|wanted| present.contains(&wanted.as_str()))
        }
        Predicate::Between { lower, upper, .. } => match field {
            Some(Value::String(s)) => {
                let low_cut = s.get(..lower.len()).unwrap_or(s);
                let high_cut = s.get(..upper.len()).unwrap_or(s);
                low_cut >= lower.as_str() && high_cut <= upper.as_str()
            }
            _ => false,
        },
    }
}

/// A list column, tolerating a bare string in place of a one-element list.
pub(crate) fn list_values(field: Option<&Value>) -> Vec<&str> {
    match field {
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
        Some(Value::String(s)) => vec![s.as_str()],
        _ => Vec::new(),
    }
}

/// Order two rows by the sort field; nulls and missing values sort last in
/// both directions.
fn compare_rows(a: &Value, b: &Value, sort: &SortOrder) -> Ordering {
    let key = |row: &Value| row.get(&sort.field).filter(|v| !v.is_null()).cloned();
    match (key(a), key(b)) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(x), Some(y)) => {
            let ord = compare_values(&x, &y);
            match sort.direction {
                Direction::Ascending => ord,
                Direction::Descending => ord.reverse(),
            }
        }
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => a.to_string().cmp(&b.to_string()),
    }
}
