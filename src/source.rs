//! Data source: counted, ranged reads of one listing collection.
//!
//! Rows are validated into [`Record`]s here. A row that fails validation is
//! logged and left out of the page; it never reaches the renderer. The total
//! count is the store's count, so it can exceed the rows returned when rows
//! are rejected.

use crate::catalog::{ListingKind, PayloadError};
use crate::query::{ListingQuery, QueryError};
use crate::store::{RemoteStore, SelectRequest, StoreError, matches};
use crate::types::{Record, RecordId, RecordShape};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum ListingError {
    #[error("remote store error: {0}")]
    Remote(#[from] StoreError),
    #[error("{collection} record {id} not found")]
    NotFound { collection: String, id: RecordId },
    #[error("invalid query: {0}")]
    Query(#[from] QueryError),
    #[error("invalid filter: {0}")]
    Filter(#[from] PayloadError),
}

/// One fetched page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageResult {
    pub rows: Vec<Record>,
    /// Rows matching the query across all pages.
    pub total_count: u64,
    /// Rows dropped by validation.
    pub rejected: usize,
}

#[derive(Debug)]
pub struct DataSource<S: ?Sized> {
    store: Arc<S>,
}

impl<S: ?Sized> Clone for DataSource<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: RemoteStore + ?Sized> DataSource<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Fetch one page. A page past the end yields no rows and the true count.
    pub async fn fetch(
        &self,
        query: &ListingQuery,
        shape: RecordShape,
    ) -> Result<PageResult, ListingError> {
        let request = SelectRequest::for_page(query);
        debug!(
            collection = %query.collection,
            page = query.page(),
            start = request.range.map(|r| r.start),
            "fetching page"
        );
        let selection = self.store.select(&request).await?;

        let mut page = PageResult {
            total_count: selection.count,
            ..PageResult::default()
        };
        for row in &selection.rows {
            match Record::from_row(shape, row) {
                Ok(record) => page.rows.push(record),
                Err(err) => {
                    page.rejected += 1;
                    warn!(collection = %query.collection, error = %err, "skipping invalid row");
                }
            }
        }
        Ok(page)
    }

    /// Fetch a single record by primary key.
    pub async fn fetch_one(
        &self,
        collection: &str,
        id: &RecordId,
        shape: RecordShape,
    ) -> Result<Record, ListingError> {
        let rows = self
            .store
            .select_in(collection, "id", std::slice::from_ref(id))
            .await?;
        let not_found = || ListingError::NotFound {
            collection: collection.to_string(),
            id: id.clone(),
        };
        let row = rows.first().ok_or_else(not_found)?;
        Record::from_row(shape, row).map_err(|err| {
            warn!(collection, %id, error = %err, "record failed validation");
            not_found()
        })
    }
}

/// Validation tally of the rows one listing reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowAudit {
    pub kind: ListingKind,
    pub accepted: usize,
    pub rejected: usize,
}

/// Validate every row in `kind`'s scope, as a fetch would.
pub fn audit_rows(kind: ListingKind, rows: &[Value]) -> RowAudit {
    let scope = kind.scope();
    let mut audit = RowAudit {
        kind,
        accepted: 0,
        rejected: 0,
    };
    for row in rows.iter().filter(|row| scope.iter().all(|p| matches(row, p))) {
        match Record::from_row(kind.shape(), row) {
            Ok(_) => audit.accepted += 1,
            Err(err) => {
                audit.rejected += 1;
                warn!(listing = %kind, error = %err, "invalid row");
            }
        }
    }
    audit
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ListingKind;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn source(store: MemoryStore) -> DataSource<MemoryStore> {
        DataSource::new(Arc::new(store))
    }

    fn issues(n: usize) -> MemoryStore {
        MemoryStore::new().with_collection(
            "issues",
            (1..=n).map(|i| {
                json!({
                    "id": i,
                    "issue_title": format!("Issue {i}"),
                    "start_date": format!("2020-{:02}-01", (i % 12) + 1),
                })
            }),
        )
    }

    #[tokio::test]
    async fn fetch_returns_page_and_total() {
        let source = source(issues(21));
        let query = ListingKind::Issues.query(3, 9, None).unwrap();
        let page = source.fetch(&query, RecordShape::Issue).await.unwrap();
        assert_eq!(page.rows.len(), 3);
        assert_eq!(page.total_count, 21);
    }

    #[tokio::test]
    async fn page_past_the_end_is_empty_not_an_error() {
        let source = source(issues(21));
        let query = ListingKind::Issues.query(4, 9, None).unwrap();
        let page = source.fetch(&query, RecordShape::Issue).await.unwrap();
        assert!(page.rows.is_empty());
        assert_eq!(page.total_count, 21);
    }

    #[tokio::test]
    async fn invalid_rows_are_dropped_and_counted() {
        let store = MemoryStore::new().with_collection(
            "articles",
            vec![
                json!({"id": "a", "title": "Kept", "date": "2024-01-02"}),
                json!({"id": "b", "date": "2024-01-01"}),
                json!({"title": "No key", "date": "2023-12-31"}),
            ],
        );
        let query = ListingKind::Articles.query(1, 9, None).unwrap();
        let page = source(store).fetch(&query, RecordShape::Article).await.unwrap();
        assert_eq!(page.rows.len(), 1);
        assert_eq!(page.rejected, 2);
        assert_eq!(page.total_count, 3);
    }

    #[tokio::test]
    async fn store_failure_is_remote_error() {
        let store = issues(3);
        store.fail_collection("issues");
        let query = ListingKind::Issues.query(1, 9, None).unwrap();
        let err = source(store).fetch(&query, RecordShape::Issue).await.unwrap_err();
        assert!(matches!(err, ListingError::Remote(_)));
    }

    #[tokio::test]
    async fn fetch_one_finds_by_key() {
        let source = source(issues(3));
        let record = source
            .fetch_one("issues", &RecordId::new("2"), RecordShape::Issue)
            .await
            .unwrap();
        assert_eq!(record.id().as_str(), "2");
    }

    #[tokio::test]
    async fn fetch_one_missing_is_not_found() {
        let source = source(issues(3));
        let err = source
            .fetch_one("issues", &RecordId::new("99"), RecordShape::Issue)
            .await
            .unwrap_err();
        assert!(matches!(err, ListingError::NotFound { .. }));
    }

    #[test]
    fn audit_counts_only_rows_in_scope() {
        let rows = vec![
            json!({"id": 1, "first_name": "Ann", "type": ["doctor"]}),
            json!({"id": 2, "type": ["doctor"]}),
            json!({"id": 3, "first_name": "Ray", "type": ["attorney"]}),
        ];
        let audit = audit_rows(ListingKind::Doctors, &rows);
        assert_eq!((audit.accepted, audit.rejected), (1, 1));
        let audit = audit_rows(ListingKind::Attorneys, &rows);
        assert_eq!((audit.accepted, audit.rejected), (1, 0));
    }
}
