//! # Springs Listings
//!
//! The listing engine behind the Springs Magazine public pages: articles,
//! doctor, dentist and attorney directories, the issue archive, category
//! pages, and the articles of a single issue. Every listing is the same
//! machine with different parameters.
//!
//! # Architecture: One Pipeline Per Listing
//!
//! ```text
//! FilterSelector ──FilterChanged──▶ FilterBus ──▶ ListingController
//!                                                     │ request(page, filter)
//!                                                     ▼
//!                    DataSource → dedupe → resolve → render → html
//! ```
//!
//! A selector publishes a typed filter change on the bus. The controller
//! subscribed to that dimension resets to page 1 and issues a fetch. Fetches
//! are numbered; only the newest one's outcome is ever displayed. The fetched
//! page is deduplicated by id, its foreign keys are resolved with one batched
//! lookup per relation, and each record becomes a card model. The
//! [`shell`] paints cards, page controls and the dropdown into named
//! containers of a [`shell::Document`].
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`types`] | Validated record variants (`Article`, `Profile`, `Issue`) parsed from raw rows |
//! | [`query`] | Page/range arithmetic, sort order, and filter predicates |
//! | [`store`] | The `RemoteStore` seam and the JSON-backed `MemoryStore` |
//! | [`catalog`] | Per-listing parameters: collection, scope, sort, relations, filter dimension |
//! | [`source`] | Counted, ranged page fetches with row validation |
//! | [`dedupe`] | Drop repeated ids, keeping first occurrence |
//! | [`resolve`] | Batched foreign-key resolution into id → label maps |
//! | [`render`] | Record → card model, with fallbacks for every missing field |
//! | [`pipeline`] | fetch → dedupe → resolve → render for one page |
//! | [`pagination`] | `PaginationState`, controls, and the sequence-guarded controller |
//! | [`bus`] | Typed `FilterChanged` events over a broadcast channel |
//! | [`filter`] | Filter option loading and selection |
//! | [`html`] | Maud components: cards, control strip, dropdown, issue header |
//! | [`shell`] | Named mount points and the listing page that fills them |
//! | [`config`] | `listings.toml` loading, merging over stock defaults, validation |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Explicit Pagination State
//!
//! Each controller owns its `PaginationState`. Nothing about the current
//! page lives in a global, so two listings on one page cannot interfere.
//!
//! ## Newest Request Wins
//!
//! Requests are never cancelled. Every outcome carries its request's
//! sequence number and is dropped unless it matches the newest one, so a
//! slow response for page 2 can never overwrite page 3.
//!
//! ## Typed Filter Events
//!
//! `FilterChanged` can only be built through a constructor that checks the
//! payload against its dimension, and subscribers check it again on
//! receipt. A year filter carrying a tag list is rejected, not coerced.

pub mod bus;
pub mod catalog;
pub mod config;
pub mod dedupe;
pub mod filter;
pub mod html;
pub mod output;
pub mod pagination;
pub mod pipeline;
pub mod query;
pub mod render;
pub mod resolve;
pub mod shell;
pub mod source;
pub mod store;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
