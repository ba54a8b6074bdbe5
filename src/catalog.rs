//! The six listings and their filter dimensions.
//!
//! Every listing page runs the same engine; what differs is captured here as
//! data. A [`ListingKind`] fixes the collection, record shape, scope, sort
//! order, relations and messages. A [`FilterDimension`] fixes how a filter
//! payload becomes a store predicate.
//!
//! | Kind | Collection | Scope | Sort | Filter |
//! |------|------------|-------|------|--------|
//! | articles | `articles` | — | `date` ↓ | issue (`issue_id =`) |
//! | doctors | `profiles` | type ⊇ doctor | `last_name` ↑ | specialty (overlap) |
//! | dentists | `profiles` | type ⊇ dentist | `last_name` ↑ | dentist specialty (overlap) |
//! | attorneys | `profiles` | type ⊇ attorney | `last_name` ↑ | legal specialty (overlap) |
//! | issues | `issues` | — | `start_date` ↓ | year (date range) |
//! | category | `articles` | — | `date` ↓ | category tags (overlap) |

use crate::bus::FilterPayload;
use crate::query::{ListingQuery, Predicate, QueryError, SortOrder};
use crate::resolve::Relation;
use crate::types::{Profession, RecordShape};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PayloadError {
    #[error("the {dimension} filter takes a single value")]
    ExpectedSingle { dimension: FilterDimension },
    #[error("`{0}` is not a year")]
    NotAYear(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingKind {
    Articles,
    Doctors,
    Dentists,
    Attorneys,
    Issues,
    Category,
}

impl ListingKind {
    pub const ALL: [ListingKind; 6] = [
        ListingKind::Articles,
        ListingKind::Doctors,
        ListingKind::Dentists,
        ListingKind::Attorneys,
        ListingKind::Issues,
        ListingKind::Category,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ListingKind::Articles => "articles",
            ListingKind::Doctors => "doctors",
            ListingKind::Dentists => "dentists",
            ListingKind::Attorneys => "attorneys",
            ListingKind::Issues => "issues",
            ListingKind::Category => "category",
        }
    }

    /// Page heading.
    pub fn title(self) -> &'static str {
        match self {
            ListingKind::Articles => "Articles",
            ListingKind::Doctors => "Doctors",
            ListingKind::Dentists => "Dentists",
            ListingKind::Attorneys => "Attorneys",
            ListingKind::Issues => "Issues",
            ListingKind::Category => "Categories",
        }
    }

    /// What the listing shows, in user-facing messages.
    pub fn noun(self) -> &'static str {
        match self {
            ListingKind::Articles | ListingKind::Category => "articles",
            ListingKind::Doctors => "doctors",
            ListingKind::Dentists => "dentists",
            ListingKind::Attorneys => "attorneys",
            ListingKind::Issues => "issues",
        }
    }

    pub fn profession(self) -> Option<Profession> {
        match self {
            ListingKind::Doctors => Some(Profession::Doctor),
            ListingKind::Dentists => Some(Profession::Dentist),
            ListingKind::Attorneys => Some(Profession::Attorney),
            ListingKind::Articles | ListingKind::Issues | ListingKind::Category => None,
        }
    }

    pub fn collection(self) -> &'static str {
        match self {
            ListingKind::Articles | ListingKind::Category => "articles",
            ListingKind::Doctors | ListingKind::Dentists | ListingKind::Attorneys => "profiles",
            ListingKind::Issues => "issues",
        }
    }

    pub fn shape(self) -> RecordShape {
        match self.profession() {
            Some(profession) => RecordShape::Profile(profession),
            None if self == ListingKind::Issues => RecordShape::Issue,
            None => RecordShape::Article,
        }
    }

    /// Predicates that define the listing regardless of the active filter.
    pub fn scope(self) -> Vec<Predicate> {
        match self.profession() {
            Some(profession) => vec![Predicate::Contains {
                field: "type".to_string(),
                values: vec![profession.type_tag().to_string()],
            }],
            None => Vec::new(),
        }
    }

    pub fn sort(self) -> SortOrder {
        match self {
            ListingKind::Articles | ListingKind::Category => SortOrder::descending("date"),
            ListingKind::Doctors | ListingKind::Dentists | ListingKind::Attorneys => {
                SortOrder::ascending("last_name")
            }
            ListingKind::Issues => SortOrder::descending("start_date"),
        }
    }

    pub fn dimension(self) -> FilterDimension {
        match self {
            ListingKind::Articles => FilterDimension::Issue,
            ListingKind::Doctors => FilterDimension::Specialty(Profession::Doctor),
            ListingKind::Dentists => FilterDimension::Specialty(Profession::Dentist),
            ListingKind::Attorneys => FilterDimension::Specialty(Profession::Attorney),
            ListingKind::Issues => FilterDimension::Year,
            ListingKind::Category => FilterDimension::Category,
        }
    }

    /// Foreign keys resolved before rendering.
    pub fn relations(self) -> Vec<Relation> {
        match self {
            ListingKind::Articles | ListingKind::Category => {
                vec![Relation::author(), Relation::issue()]
            }
            ListingKind::Doctors
            | ListingKind::Dentists
            | ListingKind::Attorneys
            | ListingKind::Issues => Vec::new(),
        }
    }

    pub fn empty_message(self) -> String {
        match self {
            ListingKind::Doctors | ListingKind::Dentists | ListingKind::Attorneys => {
                format!("No {} found matching your criteria.", self.noun())
            }
            _ => format!("No {} found.", self.noun()),
        }
    }

    pub fn error_message(self) -> String {
        format!("Error loading {}. Please try again later.", self.noun())
    }

    /// Build the query for one page with an optional filter predicate.
    pub fn query(
        self,
        page: u32,
        page_size: u32,
        filter: Option<Predicate>,
    ) -> Result<ListingQuery, QueryError> {
        Ok(ListingQuery::new(self.collection(), self.sort(), page, page_size)?
            .with_scope(self.scope())
            .with_filter(filter))
    }
}

impl fmt::Display for ListingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ListingKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ListingKind::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                let names: Vec<&str> = ListingKind::ALL.iter().map(|k| k.name()).collect();
                format!("unknown listing `{s}` (expected one of: {})", names.join(", "))
            })
    }
}

/// The single axis a listing can be filtered along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterDimension {
    Issue,
    Specialty(Profession),
    Year,
    Category,
}

impl FilterDimension {
    /// Label of the "all" sentinel.
    pub fn all_label(self) -> &'static str {
        match self {
            FilterDimension::Issue => "All Issues",
            FilterDimension::Specialty(_) => "All Specialties",
            FilterDimension::Year => "All Years",
            FilterDimension::Category => "All Categories",
        }
    }

    pub fn heading(self) -> &'static str {
        match self {
            FilterDimension::Issue => "Filter by Issues",
            FilterDimension::Specialty(_) => "Pick a Specialty",
            FilterDimension::Year => "Filter by Year",
            FilterDimension::Category => "Browse by Category",
        }
    }

    /// Check that a payload has the form this dimension expects.
    pub fn validate(self, payload: &FilterPayload) -> Result<(), PayloadError> {
        self.predicate(payload).map(|_| ())
    }

    /// Translate a payload into the store predicate. A cleared payload (or
    /// an empty value set) means no filter.
    pub fn predicate(self, payload: &FilterPayload) -> Result<Option<Predicate>, PayloadError> {
        let values = match payload {
            FilterPayload::Cleared => return Ok(None),
            FilterPayload::Many(values) if values.is_empty() => return Ok(None),
            FilterPayload::Single(value) => vec![value.clone()],
            FilterPayload::Many(values) => values.clone(),
        };
        match self {
            FilterDimension::Issue => Ok(Some(Predicate::Equals {
                field: "issue_id".to_string(),
                value: self.single(values)?,
            })),
            FilterDimension::Year => {
                let raw = self.single(values)?;
                let year: i32 = raw
                    .trim()
                    .parse()
                    .map_err(|_| PayloadError::NotAYear(raw.clone()))?;
                Ok(Some(Predicate::Between {
                    field: "start_date".to_string(),
                    lower: format!("{year:04}-01-01"),
                    upper: format!("{year:04}-12-31"),
                }))
            }
            FilterDimension::Specialty(profession) => Ok(Some(Predicate::Overlaps {
                field: profession.specialty_field().to_string(),
                values,
            })),
            FilterDimension::Category => Ok(Some(Predicate::Overlaps {
                field: "tags".to_string(),
                values,
            })),
        }
    }

    fn single(self, mut values: Vec<String>) -> Result<String, PayloadError> {
        match values.len() {
            1 => Ok(values.remove(0)),
            _ => Err(PayloadError::ExpectedSingle { dimension: self }),
        }
    }
}

impl fmt::Display for FilterDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterDimension::Issue => f.write_str("issue"),
            FilterDimension::Specialty(profession) => {
                write!(f, "{} specialty", profession.type_tag())
            }
            FilterDimension::Year => f.write_str("year"),
            FilterDimension::Category => f.write_str("category"),
        }
    }
}
