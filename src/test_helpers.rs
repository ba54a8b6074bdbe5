//! Shared test utilities for the listings test suite.
//!
//! Provides record builders, bulk row generators for the in-memory store,
//! and lookups over rendered views that panic with a clear message on miss.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let store = MemoryStore::new()
//!     .with_collection("profiles", numbered_profiles(30, "doctor", "specialty"));
//!
//! let record = article("a1", Some("au-1"), Some("1"));
//! assert_eq!(record.id().as_str(), "a1");
//! ```

use serde_json::{Value, json};
use std::path::Path;

use crate::pagination::ListingView;
use crate::render::CardModel;
use crate::store::MemoryStore;
use crate::types::{Article, Issue, Profession, Profile, Record, RecordId};

/// Specialties handed out round-robin by [`numbered_profiles`].
pub const SPECIALTIES: [&str; 3] = ["Cardiology", "Pediatrics", "Oncology"];

// =========================================================================
// Fixture setup
// =========================================================================

/// Load `fixtures/store.json` into a fresh in-memory store.
pub fn fixture_store() -> MemoryStore {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/store.json");
    MemoryStore::load(&path).unwrap()
}

// =========================================================================
// Record builders
// =========================================================================

/// An undated article with no cover and no tags.
pub fn article(id: &str, author: Option<&str>, issue: Option<&str>) -> Record {
    Record::Article(Article {
        id: RecordId::new(id),
        title: format!("Article {id}"),
        date: None,
        cover_image_link: None,
        tags: Vec::new(),
        author_id: author.map(RecordId::new),
        issue_id: issue.map(RecordId::new),
    })
}

/// A profile with no picture, practice, or specialties.
pub fn profile(id: &str, profession: Profession, first: &str, last: &str) -> Record {
    Record::Profile(Profile {
        id: RecordId::new(id),
        profession,
        first_name: first.to_string(),
        last_name: last.to_string(),
        profile_pic_link: None,
        business_name: None,
        specialties: Vec::new(),
    })
}

pub fn issue(id: &str, title: Option<&str>) -> Record {
    Record::Issue(Issue {
        id: RecordId::new(id),
        title: title.map(str::to_string),
        cover_image_link: None,
        start_date: None,
    })
}

// =========================================================================
// Bulk rows
// =========================================================================

/// `n` profile rows of one type, specialties cycling through
/// [`SPECIALTIES`] starting at the first.
pub fn numbered_profiles(n: usize, type_tag: &str, specialty_field: &str) -> Vec<Value> {
    (0..n)
        .map(|i| {
            let mut row = json!({
                "id": format!("p{i}"),
                "first_name": format!("First{i}"),
                "last_name": format!("Name{i:03}"),
                "type": [type_tag],
            });
            row[specialty_field] = json!([SPECIALTIES[i % SPECIALTIES.len()]]);
            row
        })
        .collect()
}

/// `n` article rows, one per day counting back from 2024-12-31, so the
/// first row is the newest.
pub fn numbered_articles(n: usize, issue_id: &str) -> Vec<Value> {
    let newest = chrono::NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
    (0..n)
        .map(|i| {
            let date = newest - chrono::Days::new(i as u64);
            json!({
                "id": format!("a{i}"),
                "title": format!("Article {i}"),
                "date": date.format("%Y-%m-%d").to_string(),
                "issue_id": issue_id,
            })
        })
        .collect()
}

// =========================================================================
// View lookups
// =========================================================================

/// Cards of a view. Panics if the view is a message or still pending.
pub fn cards(view: &ListingView) -> &[CardModel] {
    match view {
        ListingView::Cards(cards) => cards,
        other => panic!("expected cards, got {other:?}"),
    }
}

/// Card titles in display order.
pub fn card_titles(view: &ListingView) -> Vec<&str> {
    cards(view).iter().map(|c| c.title.as_str()).collect()
}
