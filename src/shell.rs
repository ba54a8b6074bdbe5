//! Page shell: named mount points and the listing page that fills them.
//!
//! A [`Document`] is a page skeleton with named containers. A
//! [`ListingPage`] wires one controller, its filter selector and its bus
//! subscription together, and paints cards, controls and dropdown into the
//! document's containers. If a container the page needs is missing,
//! initialization logs it and does nothing.

use crate::bus::{FilterBus, FilterPayload, FilterSubscription};
use crate::catalog::ListingKind;
use crate::config::{ContainerConfig, ListingsConfig, RenderConfig};
use crate::filter::{FilterSelector, SelectError};
use crate::html;
use crate::pagination::{ListingController, PageAction, Phase};
use crate::pipeline::ListingPipeline;
use crate::query::QueryError;
use crate::render::month_year;
use crate::source::{DataSource, ListingError};
use crate::store::RemoteStore;
use crate::types::{Record, RecordId, RecordShape};
use maud::{Markup, html};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Container holding an issue page's heading.
pub const ISSUE_HEADER: &str = "issue-header";

const ISSUE_NOT_FOUND: &str = "Issue Not Found";

/// A page with named containers.
#[derive(Debug, Clone)]
pub struct Document {
    title: String,
    containers: Vec<(String, Markup)>,
}

impl Document {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            containers: Vec::new(),
        }
    }

    /// Skeleton with the containers a listing page expects.
    pub fn for_listing(title: impl Into<String>, containers: &ContainerConfig) -> Self {
        Self::new(title)
            .with_container(&containers.filters)
            .with_container(&containers.cards)
            .with_container(&containers.pagination)
    }

    /// Skeleton of an issue page: header, cards, pagination.
    pub fn for_issue(containers: &ContainerConfig) -> Self {
        Self::new("Issue")
            .with_container(ISSUE_HEADER)
            .with_container(&containers.cards)
            .with_container(&containers.pagination)
    }

    pub fn with_container(mut self, name: &str) -> Self {
        if !self.has_container(name) {
            self.containers.push((name.to_string(), html! {}));
        }
        self
    }

    pub fn has_container(&self, name: &str) -> bool {
        self.containers.iter().any(|(n, _)| n == name)
    }

    pub fn container(&self, name: &str) -> Option<&Markup> {
        self.containers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, markup)| markup)
    }

    /// Replace a container's content. Returns false if there is no such
    /// container.
    pub fn mount(&mut self, name: &str, markup: Markup) -> bool {
        match self.containers.iter_mut().find(|(n, _)| n == name) {
            Some((_, slot)) => {
                *slot = markup;
                true
            }
            None => false,
        }
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn render(&self) -> Markup {
        let content = html! {
            main.listing-page {
                @for (name, markup) in &self.containers {
                    div id=(name) { (markup) }
                }
            }
        };
        html::base_document(&self.title, None, content)
    }
}

/// Heading data of an issue page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueHeading {
    pub title: String,
    pub cover: (String, String),
    pub date_range: Option<String>,
}

impl IssueHeading {
    fn from_record(record: &Record, config: &RenderConfig) -> Option<Self> {
        let Record::Issue(issue) = record else {
            return None;
        };
        let title = issue
            .title
            .clone()
            .unwrap_or_else(|| config.labels.untitled_issue.clone());
        let src = config
            .images
            .source(issue.cover_image_link.as_deref(), &config.images.cover_transform);
        Some(Self {
            cover: (src, title.clone()),
            title,
            date_range: issue.start_date.map(month_year),
        })
    }

    fn not_found(config: &RenderConfig) -> Self {
        Self {
            title: ISSUE_NOT_FOUND.to_string(),
            cover: (config.images.placeholder.clone(), ISSUE_NOT_FOUND.to_string()),
            date_range: None,
        }
    }
}

/// One listing page instance.
pub struct ListingPage<S: ?Sized> {
    kind: ListingKind,
    containers: ContainerConfig,
    render: RenderConfig,
    source: DataSource<S>,
    controller: ListingController<S>,
    selector: Option<FilterSelector<S>>,
    subscription: Option<FilterSubscription>,
    issue_id: Option<RecordId>,
    heading: Option<IssueHeading>,
    mounted: bool,
}

impl<S: RemoteStore + ?Sized> ListingPage<S> {
    /// A listing page with its filter selector, subscribed to the bus.
    pub fn new(
        kind: ListingKind,
        store: Arc<S>,
        bus: &FilterBus,
        config: &ListingsConfig,
    ) -> Result<Self, QueryError> {
        let render = config.render_config();
        let pipeline = ListingPipeline::new(kind, Arc::clone(&store), render.clone());
        let controller = ListingController::new(Arc::new(pipeline), config.page_size(kind))?;
        Ok(Self {
            kind,
            containers: config.containers.clone(),
            render,
            source: DataSource::new(Arc::clone(&store)),
            controller,
            selector: Some(FilterSelector::new(kind.dimension(), store, bus.clone(), config)),
            subscription: Some(bus.subscribe(kind.dimension())),
            issue_id: None,
            heading: None,
            mounted: false,
        })
    }

    /// The articles of one issue, headed by the issue itself. No selector.
    pub fn issue(
        issue_id: RecordId,
        store: Arc<S>,
        config: &ListingsConfig,
    ) -> Result<Self, ListingError> {
        let kind = ListingKind::Articles;
        let render = config.render_config();
        let pipeline = ListingPipeline::new(kind, Arc::clone(&store), render.clone());
        let controller = ListingController::new(Arc::new(pipeline), config.page_size(kind))?
            .with_filter(FilterPayload::Single(issue_id.to_string()))?;
        Ok(Self {
            kind,
            containers: config.containers.clone(),
            render,
            source: DataSource::new(store),
            controller,
            selector: None,
            subscription: None,
            issue_id: Some(issue_id),
            heading: None,
            mounted: false,
        })
    }

    pub fn kind(&self) -> ListingKind {
        self.kind
    }

    pub fn controller(&self) -> &ListingController<S> {
        &self.controller
    }

    pub fn selector(&self) -> Option<&FilterSelector<S>> {
        self.selector.as_ref()
    }

    pub fn heading(&self) -> Option<&IssueHeading> {
        self.heading.as_ref()
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Container names this page paints into.
    pub fn required_containers(&self) -> Vec<&str> {
        let mut names = Vec::with_capacity(3);
        if self.issue_id.is_some() {
            names.push(ISSUE_HEADER);
        } else {
            names.push(self.containers.filters.as_str());
        }
        names.push(self.containers.cards.as_str());
        names.push(self.containers.pagination.as_str());
        names
    }

    /// Verify mount points, load options and the first page, and paint.
    /// Missing containers make this a logged no-op.
    pub async fn initialize(&mut self, doc: &mut Document) -> bool {
        self.initialize_at(doc, 1).await
    }

    /// [`initialize`](Self::initialize), starting from `page`.
    pub async fn initialize_at(&mut self, doc: &mut Document, page: u32) -> bool {
        let missing: Vec<&str> = self
            .required_containers()
            .into_iter()
            .filter(|name| !doc.has_container(name))
            .collect();
        if !missing.is_empty() {
            for container in missing {
                error!(listing = %self.kind, container, "mount point missing, not initializing");
            }
            return false;
        }

        if let Some(issue_id) = self.issue_id.clone() {
            self.heading = Some(self.load_heading(&issue_id).await);
        }
        if let Some(selector) = self.selector.as_mut() {
            selector.initialize().await;
        }
        if let Err(err) = self.controller.load_page(page.max(1)).await {
            warn!(listing = %self.kind, page, error = %err, "initial page request rejected");
        }
        self.mounted = true;
        self.paint(doc);
        info!(listing = %self.kind, phase = %self.controller.phase(), "listing initialized");
        true
    }

    async fn load_heading(&self, issue_id: &RecordId) -> IssueHeading {
        match self.source.fetch_one("issues", issue_id, RecordShape::Issue).await {
            Ok(record) => IssueHeading::from_record(&record, &self.render)
                .unwrap_or_else(|| IssueHeading::not_found(&self.render)),
            Err(err) => {
                warn!(issue = %issue_id, error = %err, "issue page without an issue");
                IssueHeading::not_found(&self.render)
            }
        }
    }

    /// Select a filter option by value, publish it, and deliver it to this
    /// page's controller before returning.
    pub async fn select_filter(
        &mut self,
        doc: &mut Document,
        value: &str,
    ) -> Result<Option<Phase>, SelectError> {
        let Some(selector) = self.selector.as_mut() else {
            return Ok(None);
        };
        selector.select(value)?;
        let phase = self.drain_filter_events().await;
        self.paint(doc);
        Ok(phase)
    }

    /// Apply filter changes already queued on this page's subscription.
    pub async fn drain_filter_events(&mut self) -> Option<Phase> {
        let subscription = self.subscription.as_mut()?;
        let mut phase = None;
        while let Some(event) = subscription.try_recv() {
            match self.controller.on_filter_changed(&event).await {
                Ok(applied) => phase = applied.or(phase),
                Err(err) => warn!(listing = %self.kind, error = %err, "filter change rejected"),
            }
        }
        phase
    }

    /// Load `page` with the active filter and repaint. Pages past the end
    /// clamp to the last page; page 0 reads as page 1.
    pub async fn show_page(&mut self, doc: &mut Document, page: u32) -> Option<Phase> {
        let phase = match self.controller.load_page(page.max(1)).await {
            Ok(phase) => Some(phase),
            Err(err) => {
                warn!(listing = %self.kind, page, error = %err, "page request rejected");
                None
            }
        };
        self.paint(doc);
        phase
    }

    /// Handle a control click and repaint.
    pub async fn perform(&mut self, doc: &mut Document, action: PageAction) -> Option<Phase> {
        let phase = match self.controller.perform(action).await {
            Ok(phase) => phase,
            Err(err) => {
                warn!(listing = %self.kind, error = %err, "page request rejected");
                None
            }
        };
        self.paint(doc);
        phase
    }

    /// Write the current state into the document's containers.
    pub fn paint(&mut self, doc: &mut Document) {
        if !self.mounted {
            return;
        }
        doc.mount(&self.containers.cards, html::listing_grid(self.controller.view()));
        doc.mount(
            &self.containers.pagination,
            html::control_strip(&self.controller.controls()),
        );
        if let Some(selector) = self.selector.as_mut() {
            doc.mount(
                &self.containers.filters,
                html::filter_dropdown(
                    selector.dimension(),
                    selector.options(),
                    selector.selected_label(),
                ),
            );
            selector.mount();
        }
        if let Some(heading) = &self.heading {
            let (src, alt) = &heading.cover;
            doc.mount(
                ISSUE_HEADER,
                html::issue_header(
                    &heading.title,
                    Some((src.as_str(), alt.as_str())),
                    heading.date_range.as_deref(),
                ),
            );
            doc.set_title(heading.title.clone());
        } else {
            doc.set_title(self.kind.title());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::stock_config;
    use crate::store::MemoryStore;
    use crate::test_helpers::{card_titles, cards, numbered_profiles};
    use serde_json::json;

    fn store() -> Arc<MemoryStore> {
        Arc::new(
            MemoryStore::new()
                .with_collection(
                    "profiles",
                    numbered_profiles(14, "dentist", "dentist_specialties"),
                )
                .with_collection(
                    "issues",
                    vec![json!({
                        "id": 5,
                        "issue_title": "Summer 2024",
                        "start_date": "2024-06-01",
                    })],
                )
                .with_collection(
                    "articles",
                    vec![
                        json!({"id": "a1", "title": "In Summer", "date": "2024-06-02", "issue_id": 5}),
                        json!({"id": "a2", "title": "Elsewhere", "date": "2024-06-03", "issue_id": 6}),
                    ],
                )
                .with_collection("authors", vec![]),
        )
    }

    #[tokio::test]
    async fn missing_container_is_a_logged_no_op() {
        let config = stock_config();
        let store = store();
        let bus = FilterBus::new(4);
        let mut page =
            ListingPage::new(ListingKind::Dentists, Arc::clone(&store), &bus, &config).unwrap();
        let mut doc = Document::new("Dentists").with_container(&config.containers.cards);

        assert!(!page.initialize(&mut doc).await);
        assert!(!page.is_mounted());
        assert!(store.calls().is_empty());
        assert_eq!(doc.container(&config.containers.cards).map(|m| m.0.is_empty()), Some(true));
    }

    #[tokio::test]
    async fn initialize_paints_every_container() {
        let config = stock_config();
        let bus = FilterBus::new(4);
        let mut page = ListingPage::new(ListingKind::Dentists, store(), &bus, &config).unwrap();
        let mut doc = Document::for_listing("Dentists", &config.containers);

        assert!(page.initialize(&mut doc).await);
        assert_eq!(cards(page.controller().view()).len(), 12);
        let grid = doc.container(&config.containers.cards).unwrap().0.clone();
        assert_eq!(grid.matches("profile-card").count(), 12);
        let controls = doc.container(&config.containers.pagination).unwrap().0.clone();
        assert!(controls.contains(r#"data-page="2""#));
        let filters = doc.container(&config.containers.filters).unwrap().0.clone();
        assert!(filters.contains("All Specialties"));
    }

    #[tokio::test]
    async fn selecting_a_filter_reaches_the_controller_synchronously() {
        let config = stock_config();
        let bus = FilterBus::new(4);
        let mut page = ListingPage::new(ListingKind::Dentists, store(), &bus, &config).unwrap();
        let mut doc = Document::for_listing("Dentists", &config.containers);
        page.initialize(&mut doc).await;
        page.perform(&mut doc, PageAction::Next).await;
        assert_eq!(page.controller().state().current_page(), 2);

        let phase = page.select_filter(&mut doc, "Cardiology").await.unwrap();
        assert_eq!(phase, Some(Phase::Loaded));
        assert_eq!(page.controller().state().current_page(), 1);
        assert_eq!(page.controller().total_count(), Some(5));
        let filters = doc.container(&config.containers.filters).unwrap().0.clone();
        assert!(filters.contains(r#"<span class="selected-option">Cardiology</span>"#));
    }

    #[tokio::test]
    async fn page_zero_starts_on_the_first_page() {
        let config = stock_config();
        let bus = FilterBus::new(4);
        let mut page = ListingPage::new(ListingKind::Dentists, store(), &bus, &config).unwrap();
        let mut doc = Document::for_listing("Dentists", &config.containers);

        assert!(page.initialize_at(&mut doc, 0).await);
        assert_eq!(page.controller().phase(), Phase::Loaded);
        assert_eq!(page.controller().state().current_page(), 1);
        let grid = doc.container(&config.containers.cards).unwrap().0.clone();
        assert!(!grid.contains("Loading"));
    }

    #[tokio::test]
    async fn filtered_page_past_the_end_clamps() {
        let config = stock_config();
        let bus = FilterBus::new(4);
        let mut page = ListingPage::new(ListingKind::Dentists, store(), &bus, &config).unwrap();
        let mut doc = Document::for_listing("Dentists", &config.containers);
        page.initialize(&mut doc).await;
        page.select_filter(&mut doc, "Cardiology").await.unwrap();

        // Five cardiologists fit on one page.
        assert_eq!(page.show_page(&mut doc, 4).await, Some(Phase::Loaded));
        assert_eq!(page.controller().state().current_page(), 1);
        assert_eq!(cards(page.controller().view()).len(), 5);
    }

    #[tokio::test]
    async fn issue_page_lists_only_that_issue() {
        let config = stock_config();
        let mut page = ListingPage::issue(RecordId::new("5"), store(), &config).unwrap();
        let mut doc = Document::for_issue(&config.containers);
        assert!(page.initialize(&mut doc).await);

        assert_eq!(page.heading().map(|h| h.title.as_str()), Some("Summer 2024"));
        assert_eq!(card_titles(page.controller().view()), vec!["In Summer"]);
        assert!(doc.render().into_string().contains("<title>Summer 2024</title>"));
    }

    #[tokio::test]
    async fn unknown_issue_renders_not_found_heading() {
        let config = stock_config();
        let mut page = ListingPage::issue(RecordId::new("404"), store(), &config).unwrap();
        let mut doc = Document::for_issue(&config.containers);
        page.initialize(&mut doc).await;
        assert_eq!(page.heading().map(|h| h.title.as_str()), Some("Issue Not Found"));
        assert_eq!(page.controller().phase(), Phase::Empty);
    }
}
