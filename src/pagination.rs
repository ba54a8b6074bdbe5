//! Pagination controller.
//!
//! Each listing page owns one [`ListingController`], which owns the page's
//! [`PaginationState`], its active filter, and the last thing it displayed.
//! Nothing is shared between listings.
//!
//! ## Phases
//!
//! ```text
//! Idle ──request──▶ Loading ──rows > 0──▶ Loaded
//!                      │     ──rows = 0──▶ Empty
//!                      └─────failure────▶ Error
//! any phase ──request──▶ Loading
//! ```
//!
//! ## Ordering
//!
//! Every request gets the next number of a per-controller sequence. Only the
//! outcome of the newest request is applied; an older response that arrives
//! late is discarded, so the display never regresses to a superseded page or
//! filter. Requests are never cancelled.
//!
//! When a successful fetch lands past the last page (no rows, positive
//! count) the current page is clamped and the clamped page is requested once.

use crate::bus::{FilterChanged, FilterPayload, FilterSubscription};
use crate::catalog::{FilterDimension, ListingKind, PayloadError};
use crate::pipeline::{ListingPipeline, PageOutput};
use crate::query::{ListingQuery, Predicate, QueryError};
use crate::render::{CardModel, Rendered};
use crate::source::ListingError;
use crate::store::RemoteStore;
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// `max(1, ceil(count / page_size))`
pub fn total_pages(count: u64, page_size: u32) -> u32 {
    let size = u64::from(page_size.max(1));
    let pages = count.div_ceil(size).max(1);
    u32::try_from(pages).unwrap_or(u32::MAX)
}

/// Current page, page count and loading flag of one listing.
///
/// `1 <= current_page <= max(1, total_pages)` holds after every fetch.
/// `total_pages` is zero only in the error state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationState {
    current_page: u32,
    total_pages: u32,
    loading: bool,
}

impl Default for PaginationState {
    fn default() -> Self {
        Self {
            current_page: 1,
            total_pages: 1,
            loading: false,
        }
    }
}

impl PaginationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    fn begin(&mut self, page: u32) {
        self.current_page = page.max(1);
        self.loading = true;
    }

    /// Record a successful count. Returns whether the current page moved.
    fn settle(&mut self, count: u64, page_size: u32) -> bool {
        self.loading = false;
        self.total_pages = total_pages(count, page_size);
        self.clamp()
    }

    fn fail(&mut self) {
        self.loading = false;
        self.total_pages = 0;
        self.clamp();
    }

    fn clamp(&mut self) -> bool {
        let clamped = self.current_page.clamp(1, self.total_pages.max(1));
        let moved = clamped != self.current_page;
        self.current_page = clamped;
        moved
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlState {
    Enabled,
    /// The current page.
    Active,
    Disabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageControl {
    pub page: u32,
    pub state: ControlState,
}

/// Previous, one control per page, next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlStrip {
    pub previous: ControlState,
    pub pages: Vec<PageControl>,
    pub next: ControlState,
}

impl ControlStrip {
    pub fn layout(state: &PaginationState) -> Self {
        let (current, total) = (state.current_page, state.total_pages);
        if total == 0 {
            return Self::disabled();
        }
        let previous = if current == 1 {
            ControlState::Disabled
        } else {
            ControlState::Enabled
        };
        let next = if current >= total {
            ControlState::Disabled
        } else {
            ControlState::Enabled
        };
        let pages = (1..=total)
            .map(|page| PageControl {
                page,
                state: if page == current {
                    ControlState::Active
                } else {
                    ControlState::Enabled
                },
            })
            .collect();
        Self {
            previous,
            pages,
            next,
        }
    }

    pub fn disabled() -> Self {
        Self {
            previous: ControlState::Disabled,
            pages: Vec::new(),
            next: ControlState::Disabled,
        }
    }
}

/// A click on the control strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageAction {
    Previous,
    Next,
    Page(u32),
}

impl PageAction {
    /// The page this action leads to, or `None` when its control is disabled.
    pub fn target(self, state: &PaginationState) -> Option<u32> {
        let (current, total) = (state.current_page, state.total_pages);
        match self {
            PageAction::Previous => (current > 1).then(|| current - 1),
            PageAction::Next => (total > 0 && current < total).then(|| current + 1),
            PageAction::Page(page) => (page >= 1 && page <= total).then_some(page),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Loading,
    Loaded,
    Empty,
    Error,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::Loading => "loading",
            Phase::Loaded => "loaded",
            Phase::Empty => "empty",
            Phase::Error => "error",
        };
        f.write_str(name)
    }
}

/// What the card container currently shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingView {
    Pending,
    Cards(Vec<CardModel>),
    Message(String),
}

/// A request handed out by the controller.
#[derive(Debug, Clone)]
pub struct FetchTicket {
    pub seq: u64,
    pub page: u32,
    pub query: ListingQuery,
    /// Set on the single re-request that follows a clamp.
    pub retry: bool,
}

#[derive(Debug)]
pub struct FetchOutcome {
    pub seq: u64,
    pub page: u32,
    pub retry: bool,
    pub result: Result<PageOutput, ListingError>,
}

/// How an outcome was handled.
#[derive(Debug)]
pub enum Applied {
    Current { phase: Phase, clamped: bool },
    /// Past the last page: the clamped page must be fetched.
    Refetch(FetchTicket),
    Stale { seq: u64 },
}

/// Execute a ticket against a pipeline.
pub async fn execute<S>(pipeline: &ListingPipeline<S>, ticket: FetchTicket) -> FetchOutcome
where
    S: RemoteStore + ?Sized,
{
    let result = pipeline.run(&ticket.query).await;
    FetchOutcome {
        seq: ticket.seq,
        page: ticket.page,
        retry: ticket.retry,
        result,
    }
}

pub struct ListingController<S: ?Sized> {
    kind: ListingKind,
    dimension: FilterDimension,
    pipeline: Arc<ListingPipeline<S>>,
    page_size: u32,
    state: PaginationState,
    phase: Phase,
    filter: FilterPayload,
    predicate: Option<Predicate>,
    issued: u64,
    total_count: Option<u64>,
    view: ListingView,
}

impl<S: RemoteStore + ?Sized> ListingController<S> {
    pub fn new(pipeline: Arc<ListingPipeline<S>>, page_size: u32) -> Result<Self, QueryError> {
        if page_size == 0 {
            return Err(QueryError::ZeroPageSize);
        }
        let kind = pipeline.kind();
        Ok(Self {
            kind,
            dimension: kind.dimension(),
            pipeline,
            page_size,
            state: PaginationState::new(),
            phase: Phase::Idle,
            filter: FilterPayload::Cleared,
            predicate: None,
            issued: 0,
            total_count: None,
            view: ListingView::Pending,
        })
    }

    /// Start with a filter already applied, before the first fetch.
    pub fn with_filter(mut self, payload: FilterPayload) -> Result<Self, PayloadError> {
        self.set_filter(payload)?;
        Ok(self)
    }

    pub fn kind(&self) -> ListingKind {
        self.kind
    }

    pub fn dimension(&self) -> FilterDimension {
        self.dimension
    }

    pub fn state(&self) -> &PaginationState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn view(&self) -> &ListingView {
        &self.view
    }

    pub fn filter(&self) -> &FilterPayload {
        &self.filter
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Count reported by the last applied successful fetch.
    pub fn total_count(&self) -> Option<u64> {
        self.total_count
    }

    /// Sequence number of the newest request.
    pub fn latest_seq(&self) -> u64 {
        self.issued
    }

    pub fn controls(&self) -> ControlStrip {
        match self.phase {
            Phase::Error => ControlStrip::disabled(),
            _ => ControlStrip::layout(&self.state),
        }
    }

    fn set_filter(&mut self, payload: FilterPayload) -> Result<(), PayloadError> {
        self.predicate = self.dimension.predicate(&payload)?;
        self.filter = payload;
        Ok(())
    }

    /// Issue a request for `page` with the active filter.
    pub fn request_page(&mut self, page: u32) -> Result<FetchTicket, ListingError> {
        let query = self
            .kind
            .query(page, self.page_size, self.predicate.clone())?;
        self.issued += 1;
        self.state.begin(page);
        self.phase = Phase::Loading;
        debug!(listing = %self.kind, seq = self.issued, page, "requesting page");
        Ok(FetchTicket {
            seq: self.issued,
            page,
            query,
            retry: false,
        })
    }

    /// Issue the request behind a control click. Disabled controls do nothing.
    pub fn request_action(
        &mut self,
        action: PageAction,
    ) -> Result<Option<FetchTicket>, ListingError> {
        match action.target(&self.state) {
            Some(page) => self.request_page(page).map(Some),
            None => {
                debug!(listing = %self.kind, ?action, "ignoring disabled control");
                Ok(None)
            }
        }
    }

    /// Adopt a new filter and request page 1. Events for another dimension
    /// are ignored.
    pub fn request_filter(
        &mut self,
        event: &FilterChanged,
    ) -> Result<Option<FetchTicket>, ListingError> {
        if event.dimension() != self.dimension {
            warn!(
                listing = %self.kind,
                expected = %self.dimension,
                received = %event.dimension(),
                "ignoring filter change for another dimension"
            );
            return Ok(None);
        }
        self.set_filter(event.payload().clone())?;
        info!(listing = %self.kind, filter = ?self.filter, "filter changed, back to page 1");
        self.request_page(1).map(Some)
    }

    /// Apply a finished fetch, unless a newer request has been issued since.
    pub fn apply(&mut self, outcome: FetchOutcome) -> Applied {
        if outcome.seq != self.issued {
            debug!(
                listing = %self.kind,
                seq = outcome.seq,
                latest = self.issued,
                page = outcome.page,
                "discarding stale response"
            );
            return Applied::Stale { seq: outcome.seq };
        }

        let output = match outcome.result {
            Ok(output) => output,
            Err(err) => {
                error!(listing = %self.kind, page = outcome.page, error = %err, "fetch failed");
                self.state.fail();
                self.phase = Phase::Error;
                self.view = ListingView::Message(self.kind.error_message());
                return Applied::Current {
                    phase: Phase::Error,
                    clamped: false,
                };
            }
        };

        let clamped = self.state.settle(output.total_count, self.page_size);
        self.total_count = Some(output.total_count);

        if clamped && output.row_count == 0 && output.total_count > 0 && !outcome.retry {
            let page = self.state.current_page;
            info!(
                listing = %self.kind,
                requested = outcome.page,
                page,
                "past the last page, clamping"
            );
            match self.request_page(page) {
                Ok(mut ticket) => {
                    ticket.retry = true;
                    return Applied::Refetch(ticket);
                }
                Err(err) => {
                    warn!(listing = %self.kind, error = %err, "could not re-request clamped page")
                }
            }
        }

        self.phase = match output.rendered {
            Rendered::Cards(cards) => {
                self.view = ListingView::Cards(cards);
                Phase::Loaded
            }
            Rendered::NoRecords => {
                self.view = ListingView::Message(self.kind.empty_message());
                Phase::Empty
            }
        };
        Applied::Current {
            phase: self.phase,
            clamped,
        }
    }

    /// Run a ticket to completion, following a clamp re-request.
    pub async fn drive(&mut self, ticket: FetchTicket) -> Phase {
        let mut ticket = ticket;
        loop {
            let outcome = execute(self.pipeline.as_ref(), ticket).await;
            match self.apply(outcome) {
                Applied::Refetch(next) => ticket = next,
                Applied::Current { phase, .. } => return phase,
                Applied::Stale { .. } => return self.phase,
            }
        }
    }

    pub async fn load_page(&mut self, page: u32) -> Result<Phase, ListingError> {
        let ticket = self.request_page(page)?;
        Ok(self.drive(ticket).await)
    }

    /// Handle a control click. `None` when the control was disabled.
    pub async fn perform(&mut self, action: PageAction) -> Result<Option<Phase>, ListingError> {
        match self.request_action(action)? {
            Some(ticket) => Ok(Some(self.drive(ticket).await)),
            None => Ok(None),
        }
    }

    pub async fn on_filter_changed(
        &mut self,
        event: &FilterChanged,
    ) -> Result<Option<Phase>, ListingError> {
        match self.request_filter(event)? {
            Some(ticket) => Ok(Some(self.drive(ticket).await)),
            None => Ok(None),
        }
    }
}

impl<S: RemoteStore + ?Sized + 'static> ListingController<S> {
    fn spawn_fetch(&self, ticket: FetchTicket) -> BoxFuture<'static, FetchOutcome> {
        let pipeline = Arc::clone(&self.pipeline);
        Box::pin(async move { execute(pipeline.as_ref(), ticket).await })
    }

    /// Event loop: control clicks and filter changes start fetches, which
    /// may overlap; outcomes are applied as they complete. Returns once both
    /// inputs are closed and nothing is in flight.
    pub async fn run(
        mut self,
        mut actions: mpsc::Receiver<PageAction>,
        mut filters: FilterSubscription,
    ) -> Self {
        let mut in_flight: FuturesUnordered<BoxFuture<'static, FetchOutcome>> =
            FuturesUnordered::new();
        let mut actions_open = true;
        let mut filters_open = true;

        loop {
            tokio::select! {
                action = actions.recv(), if actions_open => match action {
                    Some(action) => match self.request_action(action) {
                        Ok(Some(ticket)) => in_flight.push(self.spawn_fetch(ticket)),
                        Ok(None) => {}
                        Err(err) => {
                            warn!(listing = %self.kind, error = %err, "page request rejected")
                        }
                    },
                    None => actions_open = false,
                },
                event = filters.recv(), if filters_open => match event {
                    Some(event) => match self.request_filter(&event) {
                        Ok(Some(ticket)) => in_flight.push(self.spawn_fetch(ticket)),
                        Ok(None) => {}
                        Err(err) => {
                            warn!(listing = %self.kind, error = %err, "filter change rejected")
                        }
                    },
                    None => filters_open = false,
                },
                Some(outcome) = in_flight.next(), if !in_flight.is_empty() => {
                    if let Applied::Refetch(ticket) = self.apply(outcome) {
                        in_flight.push(self.spawn_fetch(ticket));
                    }
                },
                else => break,
            }
        }
        self
    }
}
