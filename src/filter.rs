//! Filter selector.
//!
//! Owns the option vocabulary of one filter dimension and the current
//! selection. Options are fetched once, on first [`FilterSelector::initialize`].
//! Selecting an option (or the "all" sentinel) updates the displayed label
//! and publishes a [`FilterChanged`] on the bus. The selector never fetches
//! listing data itself; the controller subscribed to the dimension does.
//!
//! | Dimension | Options | Payload |
//! |-----------|---------|---------|
//! | issue | every issue, newest first | `Single(id)` |
//! | specialty | distinct specialties of the profession, sorted | `Many([specialty])` |
//! | year | distinct `start_date` years, newest first | `Single(year)` |
//! | category | `[[categories]]` from config | `Many(tags)` |

use crate::bus::{FilterBus, FilterChanged, FilterPayload};
use crate::catalog::{FilterDimension, PayloadError};
use crate::config::{CategoryConfig, ListingsConfig};
use crate::query::{Predicate, SortOrder};
use crate::store::{RemoteStore, SelectRequest, StoreError, list_values};
use crate::types::{RecordId, parse_date};
use chrono::Datelike;
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

/// Option value of the "all" sentinel.
pub const ALL_VALUE: &str = "all";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectError {
    #[error("`{value}` is not a {dimension} option")]
    UnknownOption {
        dimension: FilterDimension,
        value: String,
    },
    #[error(transparent)]
    Payload(#[from] PayloadError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterOption {
    pub value: String,
    pub label: String,
    pub payload: FilterPayload,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorPhase {
    Uninitialized,
    OptionsLoaded,
    /// Options are on screen and selectable.
    Idle,
    /// Options could not be loaded; only the sentinel is offered.
    Failed(String),
}

pub struct FilterSelector<S: ?Sized> {
    dimension: FilterDimension,
    store: Arc<S>,
    bus: FilterBus,
    categories: Vec<CategoryConfig>,
    untitled_issue: String,
    phase: SelectorPhase,
    options: Vec<FilterOption>,
    selected: Option<usize>,
}

impl<S: RemoteStore + ?Sized> FilterSelector<S> {
    pub fn new(
        dimension: FilterDimension,
        store: Arc<S>,
        bus: FilterBus,
        config: &ListingsConfig,
    ) -> Self {
        Self {
            dimension,
            store,
            bus,
            categories: config.categories.clone(),
            untitled_issue: config.labels.untitled_issue.clone(),
            phase: SelectorPhase::Uninitialized,
            options: Vec::new(),
            selected: None,
        }
    }

    pub fn dimension(&self) -> FilterDimension {
        self.dimension
    }

    pub fn phase(&self) -> &SelectorPhase {
        &self.phase
    }

    pub fn options(&self) -> &[FilterOption] {
        &self.options
    }

    pub fn selected(&self) -> Option<&FilterOption> {
        self.selected.and_then(|idx| self.options.get(idx))
    }

    /// Label shown on the closed dropdown.
    pub fn selected_label(&self) -> &str {
        self.selected()
            .map(|option| option.label.as_str())
            .unwrap_or(self.dimension.all_label())
    }

    /// Fetch the option vocabulary. Only the first call hits the store.
    pub async fn initialize(&mut self) -> &SelectorPhase {
        if self.phase != SelectorPhase::Uninitialized {
            return &self.phase;
        }
        match self.load_options().await {
            Ok(options) => {
                info!(
                    dimension = %self.dimension,
                    options = options.len(),
                    "filter options loaded"
                );
                self.options = options;
                self.phase = SelectorPhase::OptionsLoaded;
            }
            Err(err) => {
                error!(dimension = %self.dimension, error = %err, "could not load filter options");
                self.phase = SelectorPhase::Failed(err.to_string());
            }
        }
        &self.phase
    }

    /// The dropdown has been painted.
    pub fn mount(&mut self) {
        if self.phase == SelectorPhase::OptionsLoaded {
            self.phase = SelectorPhase::Idle;
        }
    }

    /// Select an option by value ([`ALL_VALUE`] clears) and publish the change.
    pub fn select(&mut self, value: &str) -> Result<FilterChanged, SelectError> {
        let (selected, event) = if value == ALL_VALUE {
            (None, FilterChanged::cleared(self.dimension))
        } else {
            let idx = self
                .options
                .iter()
                .position(|option| option.value == value)
                .ok_or_else(|| SelectError::UnknownOption {
                    dimension: self.dimension,
                    value: value.to_string(),
                })?;
            let event = FilterChanged::new(self.dimension, self.options[idx].payload.clone())?;
            (Some(idx), event)
        };
        self.selected = selected;
        let receivers = self.bus.publish(event.clone());
        info!(
            dimension = %self.dimension,
            selected = self.selected_label(),
            receivers,
            "filter selected"
        );
        Ok(event)
    }

    async fn load_options(&self) -> Result<Vec<FilterOption>, StoreError> {
        match self.dimension {
            FilterDimension::Issue => {
                let request =
                    SelectRequest::all("issues").sorted(SortOrder::descending("start_date"));
                let rows = self.store.select(&request).await?.rows;
                Ok(rows
                    .iter()
                    .filter_map(|row| {
                        let id = row.get("id").and_then(RecordId::from_value)?;
                        let label = row
                            .get("issue_title")
                            .and_then(Value::as_str)
                            .map(str::trim)
                            .filter(|title| !title.is_empty())
                            .unwrap_or(self.untitled_issue.as_str())
                            .to_string();
                        Some(FilterOption {
                            value: id.to_string(),
                            label,
                            payload: FilterPayload::Single(id.to_string()),
                        })
                    })
                    .collect())
            }
            FilterDimension::Specialty(profession) => {
                let request = SelectRequest::all("profiles").filtered([Predicate::Contains {
                    field: "type".to_string(),
                    values: vec![profession.type_tag().to_string()],
                }]);
                let rows = self.store.select(&request).await?.rows;
                let specialties: BTreeSet<&str> = rows
                    .iter()
                    .flat_map(|row| list_values(row.get(profession.specialty_field())))
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .collect();
                Ok(specialties
                    .into_iter()
                    .map(|specialty| FilterOption {
                        value: specialty.to_string(),
                        label: specialty.to_string(),
                        payload: FilterPayload::Many(vec![specialty.to_string()]),
                    })
                    .collect())
            }
            FilterDimension::Year => {
                let rows = self.store.select(&SelectRequest::all("issues")).await?.rows;
                let years: BTreeSet<i32> = rows
                    .iter()
                    .filter_map(|row| row.get("start_date").and_then(Value::as_str))
                    .filter_map(parse_date)
                    .map(|date| date.year())
                    .collect();
                Ok(years
                    .into_iter()
                    .rev()
                    .map(|year| FilterOption {
                        value: year.to_string(),
                        label: year.to_string(),
                        payload: FilterPayload::Single(year.to_string()),
                    })
                    .collect())
            }
            FilterDimension::Category => Ok(self
                .categories
                .iter()
                .map(|category| FilterOption {
                    value: category.label.clone(),
                    label: category.label.clone(),
                    payload: FilterPayload::Many(category.tags.clone()),
                })
                .collect()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::stock_config;
    use crate::store::{MemoryStore, StoreCall};
    use crate::types::Profession;
    use serde_json::json;

    fn store() -> Arc<MemoryStore> {
        Arc::new(
            MemoryStore::new()
                .with_collection(
                    "issues",
                    vec![
                        json!({"id": 1, "issue_title": "Spring 2023", "start_date": "2023-03-01"}),
                        json!({"id": 2, "issue_title": "Winter 2024", "start_date": "2024-12-01"}),
                        json!({"id": 3, "issue_title": null, "start_date": "2024-06-01"}),
                    ],
                )
                .with_collection(
                    "profiles",
                    vec![
                        json!({"id": 1, "last_name": "A", "type": ["doctor"], "specialty": ["Pediatrics", "Cardiology"]}),
                        json!({"id": 2, "last_name": "B", "type": ["doctor"], "specialty": "Cardiology"}),
                        json!({"id": 3, "last_name": "C", "type": ["doctor"], "specialty": null}),
                        json!({"id": 4, "last_name": "D", "type": ["dentist"], "specialty": ["Oncology"]}),
                    ],
                ),
        )
    }

    fn selector(
        dimension: FilterDimension,
        store: Arc<MemoryStore>,
        bus: &FilterBus,
    ) -> FilterSelector<MemoryStore> {
        FilterSelector::new(dimension, store, bus.clone(), &stock_config())
    }

    fn labels(selector: &FilterSelector<MemoryStore>) -> Vec<&str> {
        selector.options().iter().map(|o| o.label.as_str()).collect()
    }

    #[tokio::test]
    async fn issue_options_newest_first() {
        let bus = FilterBus::new(4);
        let mut selector = selector(FilterDimension::Issue, store(), &bus);
        assert_eq!(selector.initialize().await, &SelectorPhase::OptionsLoaded);
        assert_eq!(labels(&selector), vec!["Winter 2024", "Untitled Issue", "Spring 2023"]);
    }

    #[tokio::test]
    async fn specialty_options_are_distinct_sorted_and_scoped() {
        let bus = FilterBus::new(4);
        let mut selector = selector(FilterDimension::Specialty(Profession::Doctor), store(), &bus);
        selector.initialize().await;
        assert_eq!(labels(&selector), vec!["Cardiology", "Pediatrics"]);
    }

    #[tokio::test]
    async fn year_options_descending() {
        let bus = FilterBus::new(4);
        let mut selector = selector(FilterDimension::Year, store(), &bus);
        selector.initialize().await;
        assert_eq!(labels(&selector), vec!["2024", "2023"]);
    }

    #[tokio::test]
    async fn category_options_come_from_config() {
        let bus = FilterBus::new(4);
        let store = store();
        let mut selector = selector(FilterDimension::Category, Arc::clone(&store), &bus);
        selector.initialize().await;
        assert_eq!(selector.options()[0].label, "Health");
        assert_eq!(
            selector.options()[0].payload,
            FilterPayload::Many(vec!["health".into(), "wellness".into()])
        );
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn options_are_fetched_once() {
        let bus = FilterBus::new(4);
        let store = store();
        let mut selector = selector(FilterDimension::Year, Arc::clone(&store), &bus);
        selector.initialize().await;
        selector.mount();
        selector.initialize().await;
        assert_eq!(selector.phase(), &SelectorPhase::Idle);
        let selects = store
            .calls()
            .into_iter()
            .filter(|call| matches!(call, StoreCall::Select { .. }))
            .count();
        assert_eq!(selects, 1);
    }

    #[tokio::test]
    async fn store_failure_leaves_only_the_sentinel() {
        let bus = FilterBus::new(4);
        let store = store();
        store.fail_collection("issues");
        let mut selector = selector(FilterDimension::Issue, store, &bus);
        assert!(matches!(selector.initialize().await, SelectorPhase::Failed(_)));
        assert!(selector.options().is_empty());
        assert_eq!(selector.selected_label(), "All Issues");
    }

    #[tokio::test]
    async fn selecting_publishes_and_updates_label() {
        let bus = FilterBus::new(4);
        let dimension = FilterDimension::Specialty(Profession::Doctor);
        let mut sub = bus.subscribe(dimension);
        let mut selector = selector(dimension, store(), &bus);
        selector.initialize().await;

        let event = selector.select("Cardiology").unwrap();
        assert_eq!(event.payload(), &FilterPayload::Many(vec!["Cardiology".into()]));
        assert_eq!(selector.selected_label(), "Cardiology");
        assert_eq!(sub.try_recv(), Some(event));

        selector.select(ALL_VALUE).unwrap();
        assert_eq!(selector.selected_label(), "All Specialties");
        assert_eq!(sub.try_recv(), Some(FilterChanged::cleared(dimension)));
    }

    #[tokio::test]
    async fn unknown_option_is_rejected_without_publishing() {
        let bus = FilterBus::new(4);
        let mut sub = bus.subscribe(FilterDimension::Year);
        let mut selector = selector(FilterDimension::Year, store(), &bus);
        selector.initialize().await;
        let err = selector.select("1999").unwrap_err();
        assert!(matches!(err, SelectError::UnknownOption { .. }));
        assert_eq!(sub.try_recv(), None);
    }
}
