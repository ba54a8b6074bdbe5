//! Related-entity resolution.
//!
//! Article cards show an author name and an issue title, but article rows
//! only carry `author_id` and `issue_id`. For each relation the resolver
//! gathers the distinct non-null keys of the whole page and issues exactly
//! one batched [`RemoteStore::select_in`], no matter how many rows point at
//! the same entity. Lookups for different relations run concurrently.
//!
//! A failed lookup is not fatal: that relation resolves to an empty map, the
//! renderer falls back to its literal labels, and the other relations are
//! unaffected. Maps are built per page and never cached across pages.

use crate::store::RemoteStore;
use crate::types::{Record, RecordId};
use futures::future::join_all;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationName {
    Author,
    Issue,
}

impl fmt::Display for RelationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelationName::Author => f.write_str("author"),
            RelationName::Issue => f.write_str("issue"),
        }
    }
}

/// How to follow one foreign key and label what it points at.
#[derive(Debug, Clone)]
pub struct Relation {
    pub name: RelationName,
    pub collection: &'static str,
    /// Key column in the related collection.
    pub key_field: &'static str,
    foreign_key: fn(&Record) -> Option<&RecordId>,
    label: fn(&Value) -> Option<String>,
}

impl Relation {
    /// `articles.author_id → authors.id`, labelled "First Last".
    pub fn author() -> Self {
        Self {
            name: RelationName::Author,
            collection: "authors",
            key_field: "id",
            foreign_key: |record| match record {
                Record::Article(article) => article.author_id.as_ref(),
                _ => None,
            },
            label: |row| {
                let name = format!(
                    "{} {}",
                    text_field(row, "first_name"),
                    text_field(row, "last_name")
                );
                let name = name.trim();
                (!name.is_empty()).then(|| name.to_string())
            },
        }
    }

    /// `articles.issue_id → issues.id`, labelled with the issue title.
    pub fn issue() -> Self {
        Self {
            name: RelationName::Issue,
            collection: "issues",
            key_field: "id",
            foreign_key: |record| match record {
                Record::Article(article) => article.issue_id.as_ref(),
                _ => None,
            },
            label: |row| {
                let title = text_field(row, "issue_title");
                (!title.is_empty()).then(|| title.to_string())
            },
        }
    }

    /// Distinct non-null keys referenced by the page.
    pub fn foreign_keys(&self, rows: &[Record]) -> BTreeSet<RecordId> {
        rows.iter()
            .filter_map(|row| (self.foreign_key)(row))
            .cloned()
            .collect()
    }

    fn label_map(&self, found: &[Value]) -> HashMap<RecordId, String> {
        found
            .iter()
            .filter_map(|row| {
                let id = row.get(self.key_field).and_then(RecordId::from_value)?;
                let label = (self.label)(row)?;
                Some((id, label))
            })
            .collect()
    }
}

fn text_field<'a>(row: &'a Value, field: &str) -> &'a str {
    row.get(field).and_then(Value::as_str).unwrap_or("").trim()
}

/// id → label maps for one page, keyed by relation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RelatedEntities {
    maps: HashMap<RelationName, HashMap<RecordId, String>>,
}

impl RelatedEntities {
    pub fn insert(&mut self, relation: RelationName, map: HashMap<RecordId, String>) {
        self.maps.insert(relation, map);
    }

    pub fn map(&self, relation: RelationName) -> Option<&HashMap<RecordId, String>> {
        self.maps.get(&relation)
    }

    /// Label for a possibly-absent foreign key.
    pub fn label(&self, relation: RelationName, id: Option<&RecordId>) -> Option<&str> {
        let id = id?;
        self.maps.get(&relation)?.get(id).map(String::as_str)
    }
}

/// Resolve every relation for a page with one batched lookup each.
pub async fn resolve<S>(store: &S, rows: &[Record], relations: &[Relation]) -> RelatedEntities
where
    S: RemoteStore + ?Sized,
{
    let lookups = relations.iter().map(|relation| async move {
        let ids: Vec<RecordId> = relation.foreign_keys(rows).into_iter().collect();
        if ids.is_empty() {
            return (relation.name, HashMap::new());
        }
        match store
            .select_in(relation.collection, relation.key_field, &ids)
            .await
        {
            Ok(found) => {
                let map = relation.label_map(&found);
                debug!(
                    relation = %relation.name,
                    requested = ids.len(),
                    resolved = map.len(),
                    "resolved relation"
                );
                (relation.name, map)
            }
            Err(err) => {
                warn!(
                    relation = %relation.name,
                    error = %err,
                    "relation lookup failed, using fallback labels"
                );
                (relation.name, HashMap::new())
            }
        }
    });

    let mut related = RelatedEntities::default();
    for (name, map) in join_all(lookups).await {
        related.insert(name, map);
    }
    related
}
