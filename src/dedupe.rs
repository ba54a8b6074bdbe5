//! Duplicate removal for range-paginated pages.
//!
//! Range pagination re-counts on every request, so a row inserted between two
//! page reads can push an already-seen row onto the next page. The page is
//! cleaned before rendering: the first occurrence of each primary key wins and
//! keeps its position.

use crate::types::{Record, RecordId};
use std::collections::HashSet;
use tracing::debug;

/// Anything with a primary key.
pub trait Keyed {
    fn key(&self) -> &RecordId;
}

impl Keyed for Record {
    fn key(&self) -> &RecordId {
        self.id()
    }
}

/// Stable, first-occurrence-wins deduplication. Idempotent.
pub fn dedupe<T: Keyed>(rows: Vec<T>) -> Vec<T> {
    let total = rows.len();
    let mut seen: HashSet<RecordId> = HashSet::with_capacity(total);
    let mut kept = Vec::with_capacity(total);
    for row in rows {
        if seen.insert(row.key().clone()) {
            kept.push(row);
        }
    }
    if kept.len() < total {
        debug!(removed = total - kept.len(), "dropped duplicate rows");
    }
    kept
}
