//! One page fetch from query to cards.
//!
//! ```text
//! DataSource::fetch → dedupe → resolve (batched) → render
//! ```
//!
//! Only the primary fetch can fail; relation lookups degrade to fallback
//! labels inside [`resolve`].

use crate::catalog::ListingKind;
use crate::config::RenderConfig;
use crate::dedupe::dedupe;
use crate::query::ListingQuery;
use crate::render::{Rendered, render};
use crate::resolve::{Relation, resolve};
use crate::source::{DataSource, ListingError};
use crate::store::RemoteStore;
use std::sync::Arc;
use tracing::info;

/// What one fetch produced.
#[derive(Debug, Clone, PartialEq)]
pub struct PageOutput {
    pub rendered: Rendered,
    pub total_count: u64,
    /// Rows left after validation and deduplication.
    pub row_count: usize,
    pub rejected: usize,
}

#[derive(Debug)]
pub struct ListingPipeline<S: ?Sized> {
    kind: ListingKind,
    source: DataSource<S>,
    relations: Vec<Relation>,
    render: RenderConfig,
}

impl<S: RemoteStore + ?Sized> ListingPipeline<S> {
    pub fn new(kind: ListingKind, store: Arc<S>, render: RenderConfig) -> Self {
        Self {
            kind,
            source: DataSource::new(store),
            relations: kind.relations(),
            render,
        }
    }

    pub fn kind(&self) -> ListingKind {
        self.kind
    }

    pub fn source(&self) -> &DataSource<S> {
        &self.source
    }

    pub fn render_config(&self) -> &RenderConfig {
        &self.render
    }

    pub async fn run(&self, query: &ListingQuery) -> Result<PageOutput, ListingError> {
        let page = self.source.fetch(query, self.kind.shape()).await?;
        let rows = dedupe(page.rows);
        let related = resolve(self.source.store(), &rows, &self.relations).await;
        let rendered = render(&rows, &related, &self.render);
        info!(
            listing = %self.kind,
            page = query.page(),
            rows = rows.len(),
            total = page.total_count,
            "rendered page"
        );
        Ok(PageOutput {
            rendered,
            total_count: page.total_count,
            row_count: rows.len(),
            rejected: page.rejected,
        })
    }
}
