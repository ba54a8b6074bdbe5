//! Typed records fetched from the remote store.
//!
//! The store hands back sparse JSON objects. Rows are validated here, at the
//! data-source boundary, into one tagged variant per entity kind so nothing
//! downstream has to probe for fields. Optional fields stay `Option`/empty and
//! fall back at render time; required fields (the primary key, an article's
//! title, a profile's name) reject the row with a [`RenderInputError`].
//!
//! Field parsing is deliberately lenient: a specialty column may hold a single
//! string or a list, keys may be numbers or strings, and dates may carry a
//! time suffix. Anything unparseable in an optional field degrades to absent.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Why a row was refused at the data-source boundary.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderInputError {
    #[error("row is missing its primary key")]
    MissingId,
    #[error("record {id} is missing required field `{field}`")]
    MissingField { id: RecordId, field: &'static str },
    #[error("malformed row: {0}")]
    Malformed(String),
}

/// Primary or foreign key. Numeric keys are normalized to their string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Read a key out of a raw JSON value. Null, blank and non-scalar values
    /// are not keys.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) if !s.trim().is_empty() => Some(Self(s.trim().to_string())),
            Value::Number(n) => Some(Self(n.to_string())),
            _ => None,
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Which kind of professional a profile listing shows.
///
/// All three share the `profiles` collection; they differ in the `type` tag
/// that scopes them and the column their specialties live in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Profession {
    Doctor,
    Dentist,
    Attorney,
}

impl Profession {
    /// Value of the profile's `type` list that marks this profession.
    pub fn type_tag(self) -> &'static str {
        match self {
            Profession::Doctor => "doctor",
            Profession::Dentist => "dentist",
            Profession::Attorney => "attorney",
        }
    }

    /// Column holding this profession's specialties.
    pub fn specialty_field(self) -> &'static str {
        match self {
            Profession::Doctor => "specialty",
            Profession::Dentist => "dentist_specialties",
            Profession::Attorney => "legal_specialties",
        }
    }

    pub fn honorific(self) -> Option<&'static str> {
        match self {
            Profession::Doctor => Some("Dr."),
            Profession::Dentist | Profession::Attorney => None,
        }
    }
}

/// The record layout a collection is parsed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordShape {
    Article,
    Profile(Profession),
    Issue,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Article {
    pub id: RecordId,
    pub title: String,
    pub date: Option<NaiveDate>,
    pub cover_image_link: Option<String>,
    pub tags: Vec<String>,
    pub author_id: Option<RecordId>,
    pub issue_id: Option<RecordId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Profile {
    pub id: RecordId,
    pub profession: Profession,
    pub first_name: String,
    pub last_name: String,
    pub profile_pic_link: Option<String>,
    /// Practice or firm name (`bizpractice_name` in the store).
    pub business_name: Option<String>,
    pub specialties: Vec<String>,
}

impl Profile {
    /// "Dr. Ann Lee" for doctors, "Ann Lee" otherwise.
    pub fn display_name(&self) -> String {
        self.profession
            .honorific()
            .into_iter()
            .chain([self.first_name.as_str(), self.last_name.as_str()])
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Plain name without the honorific, used for image alt text.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Issue {
    pub id: RecordId,
    pub title: Option<String>,
    pub cover_image_link: Option<String>,
    pub start_date: Option<NaiveDate>,
}

/// A validated row of any listing collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Record {
    Article(Article),
    Profile(Profile),
    Issue(Issue),
}

impl Record {
    pub fn id(&self) -> &RecordId {
        match self {
            Record::Article(article) => &article.id,
            Record::Profile(profile) => &profile.id,
            Record::Issue(issue) => &issue.id,
        }
    }

    /// Validate one raw store row against the given shape.
    pub fn from_row(shape: RecordShape, row: &Value) -> Result<Self, RenderInputError> {
        if !row.is_object() {
            return Err(RenderInputError::Malformed("row is not an object".into()));
        }
        match shape {
            RecordShape::Article => {
                let raw = ArticleRow::deserialize(row).map_err(malformed)?;
                let id = raw.id.ok_or(RenderInputError::MissingId)?;
                let title = raw.title.ok_or_else(|| RenderInputError::MissingField {
                    id: id.clone(),
                    field: "title",
                })?;
                Ok(Record::Article(Article {
                    id,
                    title,
                    date: raw.date,
                    cover_image_link: raw.cover_image_link,
                    tags: raw.tags,
                    author_id: raw.author_id,
                    issue_id: raw.issue_id,
                }))
            }
            RecordShape::Profile(profession) => {
                let raw = ProfileRow::deserialize(row).map_err(malformed)?;
                let id = raw.id.ok_or(RenderInputError::MissingId)?;
                let first_name = raw.first_name.unwrap_or_default();
                let last_name = raw.last_name.unwrap_or_default();
                if first_name.is_empty() && last_name.is_empty() {
                    return Err(RenderInputError::MissingField {
                        id,
                        field: "last_name",
                    });
                }
                let specialties = match profession {
                    Profession::Doctor => raw.specialty,
                    Profession::Dentist => raw.dentist_specialties,
                    Profession::Attorney => raw.legal_specialties,
                };
                Ok(Record::Profile(Profile {
                    id,
                    profession,
                    first_name,
                    last_name,
                    profile_pic_link: raw.profile_pic_link,
                    business_name: raw.bizpractice_name,
                    specialties,
                }))
            }
            RecordShape::Issue => {
                let raw = IssueRow::deserialize(row).map_err(malformed)?;
                let id = raw.id.ok_or(RenderInputError::MissingId)?;
                Ok(Record::Issue(Issue {
                    id,
                    title: raw.issue_title,
                    cover_image_link: raw.issue_cover_image_link,
                    start_date: raw.start_date,
                }))
            }
        }
    }
}

fn malformed(err: serde_json::Error) -> RenderInputError {
    RenderInputError::Malformed(err.to_string())
}

// ============================================================================
// Raw row layouts
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ArticleRow {
    #[serde(deserialize_with = "optional_id")]
    id: Option<RecordId>,
    #[serde(deserialize_with = "optional_text")]
    title: Option<String>,
    #[serde(deserialize_with = "lenient_date")]
    date: Option<NaiveDate>,
    #[serde(deserialize_with = "optional_text")]
    cover_image_link: Option<String>,
    #[serde(deserialize_with = "string_list")]
    tags: Vec<String>,
    #[serde(deserialize_with = "optional_id")]
    author_id: Option<RecordId>,
    #[serde(deserialize_with = "optional_id")]
    issue_id: Option<RecordId>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ProfileRow {
    #[serde(deserialize_with = "optional_id")]
    id: Option<RecordId>,
    #[serde(deserialize_with = "optional_text")]
    first_name: Option<String>,
    #[serde(deserialize_with = "optional_text")]
    last_name: Option<String>,
    #[serde(deserialize_with = "optional_text")]
    profile_pic_link: Option<String>,
    #[serde(deserialize_with = "optional_text")]
    bizpractice_name: Option<String>,
    #[serde(deserialize_with = "string_list")]
    specialty: Vec<String>,
    #[serde(deserialize_with = "string_list")]
    dentist_specialties: Vec<String>,
    #[serde(deserialize_with = "string_list")]
    legal_specialties: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct IssueRow {
    #[serde(deserialize_with = "optional_id")]
    id: Option<RecordId>,
    #[serde(deserialize_with = "optional_text")]
    issue_title: Option<String>,
    #[serde(deserialize_with = "optional_text")]
    issue_cover_image_link: Option<String>,
    #[serde(deserialize_with = "lenient_date")]
    start_date: Option<NaiveDate>,
}

fn optional_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<RecordId>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(RecordId::from_value(&value))
}

fn optional_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    })
}

/// Accepts `null`, a single string, or an array of strings.
fn string_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) if !s.trim().is_empty() => vec![s.trim().to_string()],
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    })
}

fn lenient_date<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<NaiveDate>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => parse_date(&s),
        _ => None,
    })
}

/// Parse the `YYYY-MM-DD` prefix of a date or timestamp string.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let day = raw.trim().get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}
