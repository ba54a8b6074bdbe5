//! Coordination bus between filter selectors and listing controllers.
//!
//! One event type travels on the bus: [`FilterChanged`], a filter dimension
//! plus its new payload. Events are checked against their dimension when
//! they are built and again when a subscriber receives them, so a payload
//! that does not fit its dimension never reaches a controller.
//!
//! Publishing never blocks and never fails. Subscriptions are scoped to one
//! dimension and silently skip the others; dropping a subscription
//! unsubscribes it. A subscriber created after a publish does not see it.

use crate::catalog::{FilterDimension, PayloadError};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tracing::{debug, warn};

/// The value carried by a filter change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FilterPayload {
    Single(String),
    Many(Vec<String>),
    /// The "all" sentinel: no filter.
    Cleared,
}

impl FilterPayload {
    pub fn is_cleared(&self) -> bool {
        match self {
            FilterPayload::Cleared => true,
            FilterPayload::Many(values) => values.is_empty(),
            FilterPayload::Single(_) => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterChanged {
    dimension: FilterDimension,
    payload: FilterPayload,
}

impl FilterChanged {
    /// Build an event, refusing payloads the dimension cannot express.
    pub fn new(dimension: FilterDimension, payload: FilterPayload) -> Result<Self, PayloadError> {
        dimension.validate(&payload)?;
        Ok(Self { dimension, payload })
    }

    pub fn cleared(dimension: FilterDimension) -> Self {
        Self {
            dimension,
            payload: FilterPayload::Cleared,
        }
    }

    pub fn dimension(&self) -> FilterDimension {
        self.dimension
    }

    pub fn payload(&self) -> &FilterPayload {
        &self.payload
    }
}

/// Process-wide publish/subscribe channel for filter changes.
#[derive(Debug, Clone)]
pub struct FilterBus {
    sender: broadcast::Sender<FilterChanged>,
}

impl FilterBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Fan an event out to every live subscription. Returns how many
    /// receivers it was queued for.
    pub fn publish(&self, event: FilterChanged) -> usize {
        let dimension = event.dimension;
        match self.sender.send(event) {
            Ok(receivers) => {
                debug!(%dimension, receivers, "published filter change");
                receivers
            }
            Err(_) => {
                debug!(%dimension, "filter change published with no listeners");
                0
            }
        }
    }

    pub fn subscribe(&self, dimension: FilterDimension) -> FilterSubscription {
        FilterSubscription {
            dimension,
            receiver: self.sender.subscribe(),
        }
    }

    pub fn listener_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Receives the filter changes of one dimension.
#[derive(Debug)]
pub struct FilterSubscription {
    dimension: FilterDimension,
    receiver: broadcast::Receiver<FilterChanged>,
}

impl FilterSubscription {
    pub fn dimension(&self) -> FilterDimension {
        self.dimension
    }

    /// Wait for the next matching event. `None` once every publisher is gone.
    pub async fn recv(&mut self) -> Option<FilterChanged> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => {
                    if let Some(event) = self.accept(event) {
                        return Some(event);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(
                        dimension = %self.dimension,
                        skipped,
                        "filter subscription lagged, skipping events"
                    );
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Next matching event already queued, without waiting.
    pub fn try_recv(&mut self) -> Option<FilterChanged> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if let Some(event) = self.accept(event) {
                        return Some(event);
                    }
                }
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(
                        dimension = %self.dimension,
                        skipped,
                        "filter subscription lagged, skipping events"
                    );
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }

    pub fn unsubscribe(self) {}

    fn accept(&self, event: FilterChanged) -> Option<FilterChanged> {
        if event.dimension != self.dimension {
            return None;
        }
        match event.dimension.validate(&event.payload) {
            Ok(()) => Some(event),
            Err(err) => {
                warn!(
                    dimension = %self.dimension,
                    error = %err,
                    "dropping malformed filter change"
                );
                None
            }
        }
    }
}
