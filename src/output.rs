//! CLI output formatting for rendered listings.
//!
//! # Output Format
//!
//! ## Render
//!
//! ```text
//! Doctors (page 2 of 3, 30 records)
//!     Filter: Cardiology
//! 001 Dr. First3 Name003
//!     Meta: Cardiology
//!     Link: /Profile.html?id=p3
//! ```
//!
//! ## Options
//!
//! ```text
//! Pick a Specialty
//!     all → All Specialties
//!     Cardiology → Cardiology
//! ```
//!
//! ## Check
//!
//! ```text
//! Config
//!     listings.toml
//! Store
//!     fixtures/store.json
//!     articles: 21 rows
//! Listings
//!     articles: 21 valid
//!     doctors: 13 valid, 1 rejected
//! Page sizes
//!     articles: 9
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure.

use crate::catalog::{FilterDimension, ListingKind};
use crate::config::ListingsConfig;
use crate::filter::{ALL_VALUE, FilterOption, SelectorPhase};
use crate::pagination::{ListingView, Phase};
use crate::render::CardModel;
use crate::source::RowAudit;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(n: u64, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

/// Header line plus indented context lines for one card.
fn card_lines(index: usize, card: &CardModel) -> Vec<String> {
    let mut lines = vec![format!("{} {}", format_index(index), card.title)];
    if let Some(meta) = &card.meta {
        lines.push(format!("{}Meta: {}", indent(1), meta));
    }
    if let Some(subtitle) = &card.subtitle {
        lines.push(format!("{}Subtitle: {}", indent(1), subtitle));
    }
    if !card.badges.is_empty() {
        lines.push(format!("{}Badges: {}", indent(1), card.badges.join(", ")));
    }
    if card.image.placeholder {
        lines.push(format!("{}Image: placeholder", indent(1)));
    }
    lines.push(format!("{}Link: {}", indent(1), card.href));
    lines
}

// ============================================================================
// Render
// ============================================================================

/// What one listing is showing.
#[derive(Debug, Clone, Copy)]
pub struct ListingSummary<'a> {
    pub title: &'a str,
    pub phase: Phase,
    pub current_page: u32,
    pub total_pages: u32,
    pub total_count: Option<u64>,
    pub filter_label: Option<&'a str>,
    pub view: &'a ListingView,
}

pub fn format_listing(summary: &ListingSummary<'_>) -> Vec<String> {
    let mut lines = Vec::new();
    let header = match (summary.phase, summary.total_count) {
        (Phase::Error, _) => format!("{} (unavailable)", summary.title),
        (_, Some(count)) => format!(
            "{} (page {} of {}, {})",
            summary.title,
            summary.current_page,
            summary.total_pages,
            plural(count, "record")
        ),
        (_, None) => format!("{} (page {})", summary.title, summary.current_page),
    };
    lines.push(header);
    if let Some(filter) = summary.filter_label {
        lines.push(format!("{}Filter: {}", indent(1), filter));
    }

    match summary.view {
        ListingView::Pending => lines.push(format!("{}Loading…", indent(1))),
        ListingView::Message(message) => lines.push(format!("{}{}", indent(1), message)),
        ListingView::Cards(cards) => {
            for (i, card) in cards.iter().enumerate() {
                lines.extend(card_lines(i + 1, card));
            }
        }
    }
    lines
}

pub fn print_listing(summary: &ListingSummary<'_>) {
    for line in format_listing(summary) {
        println!("{}", line);
    }
}

// ============================================================================
// Options
// ============================================================================

pub fn format_options(
    dimension: FilterDimension,
    phase: &SelectorPhase,
    options: &[FilterOption],
) -> Vec<String> {
    let mut lines = vec![dimension.heading().to_string()];
    lines.push(format!("{}{} → {}", indent(1), ALL_VALUE, dimension.all_label()));
    for option in options {
        lines.push(format!("{}{} → {}", indent(1), option.value, option.label));
    }
    if let SelectorPhase::Failed(reason) = phase {
        lines.push(format!("{}Options unavailable: {}", indent(1), reason));
    }
    lines
}

pub fn print_options(dimension: FilterDimension, phase: &SelectorPhase, options: &[FilterOption]) {
    for line in format_options(dimension, phase, options) {
        println!("{}", line);
    }
}

// ============================================================================
// Check
// ============================================================================

/// `config_source` is the config file in use, or `None` for stock defaults.
pub fn format_check(
    config: &ListingsConfig,
    config_source: Option<&str>,
    collections: &[(String, usize)],
    audits: &[RowAudit],
) -> Vec<String> {
    let mut lines = vec!["Config".to_string()];
    lines.push(format!(
        "{}{}",
        indent(1),
        config_source.unwrap_or("stock defaults")
    ));

    lines.push("Store".to_string());
    lines.push(format!("{}{}", indent(1), config.store.path));
    for (name, rows) in collections {
        lines.push(format!(
            "{}{}: {}",
            indent(1),
            name,
            plural(*rows as u64, "row")
        ));
    }

    lines.push("Listings".to_string());
    for audit in audits {
        let mut line = format!("{}{}: {} valid", indent(1), audit.kind, audit.accepted);
        if audit.rejected > 0 {
            line.push_str(&format!(", {} rejected", audit.rejected));
        }
        lines.push(line);
    }

    lines.push("Page sizes".to_string());
    for kind in ListingKind::ALL {
        lines.push(format!("{}{}: {}", indent(1), kind, config.page_size(kind)));
    }

    if !config.categories.is_empty() {
        lines.push("Categories".to_string());
        for category in &config.categories {
            lines.push(format!(
                "{}{} [{}]",
                indent(1),
                category.label,
                category.tags.join(", ")
            ));
        }
    }
    lines
}

pub fn print_check(
    config: &ListingsConfig,
    config_source: Option<&str>,
    collections: &[(String, usize)],
    audits: &[RowAudit],
) {
    for line in format_check(config, config_source, collections, audits) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::FilterPayload;
    use crate::config::stock_config;
    use crate::render::{CardImage, CardStyle};
    use crate::types::{Profession, RecordId};

    fn card(title: &str, placeholder: bool) -> CardModel {
        CardModel {
            id: RecordId::new("p1"),
            style: CardStyle::Profile,
            href: "/Profile.html?id=p1".into(),
            image: CardImage {
                src: "/placeholder.svg".into(),
                alt: title.into(),
                placeholder,
            },
            title: title.into(),
            meta: None,
            subtitle: Some("Lee Cardiology".into()),
            badges: vec!["Cardiology".into()],
            call_to_action: None,
        }
    }

    // =========================================================================
    // Helper tests
    // =========================================================================

    #[test]
    fn format_index_pads_to_three_digits() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(42), "042");
        assert_eq!(format_index(100), "100");
    }

    #[test]
    fn plural_handles_one() {
        assert_eq!(plural(1, "record"), "1 record");
        assert_eq!(plural(0, "record"), "0 records");
    }

    // =========================================================================
    // Listing tests
    // =========================================================================

    #[test]
    fn listing_header_and_cards() {
        let view = ListingView::Cards(vec![card("Dr. Ann Lee", false), card("Dr. Bo Park", true)]);
        let lines = format_listing(&ListingSummary {
            title: "Doctors",
            phase: Phase::Loaded,
            current_page: 2,
            total_pages: 3,
            total_count: Some(30),
            filter_label: Some("Cardiology"),
            view: &view,
        });
        assert_eq!(lines[0], "Doctors (page 2 of 3, 30 records)");
        assert_eq!(lines[1], "    Filter: Cardiology");
        assert_eq!(lines[2], "001 Dr. Ann Lee");
        assert!(lines.contains(&"    Badges: Cardiology".to_string()));
        assert!(lines.contains(&"002 Dr. Bo Park".to_string()));
        assert_eq!(lines.iter().filter(|l| l.contains("placeholder")).count(), 1);
    }

    #[test]
    fn listing_message_is_indented() {
        let view = ListingView::Message("No issues found.".into());
        let lines = format_listing(&ListingSummary {
            title: "Issues",
            phase: Phase::Empty,
            current_page: 1,
            total_pages: 1,
            total_count: Some(0),
            filter_label: None,
            view: &view,
        });
        assert_eq!(lines, vec!["Issues (page 1 of 1, 0 records)", "    No issues found."]);
    }

    #[test]
    fn error_header_omits_pages() {
        let view = ListingView::Message("Error loading issues. Please try again later.".into());
        let lines = format_listing(&ListingSummary {
            title: "Issues",
            phase: Phase::Error,
            current_page: 1,
            total_pages: 0,
            total_count: None,
            filter_label: None,
            view: &view,
        });
        assert_eq!(lines[0], "Issues (unavailable)");
    }

    // =========================================================================
    // Options and check tests
    // =========================================================================

    #[test]
    fn options_start_with_sentinel() {
        let options = vec![FilterOption {
            value: "Cardiology".into(),
            label: "Cardiology".into(),
            payload: FilterPayload::Many(vec!["Cardiology".into()]),
        }];
        let lines = format_options(
            FilterDimension::Specialty(Profession::Doctor),
            &SelectorPhase::Idle,
            &options,
        );
        assert_eq!(
            lines,
            vec!["Pick a Specialty", "    all → All Specialties", "    Cardiology → Cardiology"]
        );
    }

    #[test]
    fn failed_options_report_reason() {
        let lines = format_options(
            FilterDimension::Year,
            &SelectorPhase::Failed("store down".into()),
            &[],
        );
        assert_eq!(lines.last().unwrap(), "    Options unavailable: store down");
    }

    #[test]
    fn check_lists_store_and_page_sizes() {
        let config = stock_config();
        let audits = [
            RowAudit {
                kind: ListingKind::Articles,
                accepted: 21,
                rejected: 0,
            },
            RowAudit {
                kind: ListingKind::Doctors,
                accepted: 13,
                rejected: 1,
            },
        ];
        let lines = format_check(&config, None, &[("articles".to_string(), 21)], &audits);
        assert!(lines.contains(&"    stock defaults".to_string()));
        assert!(lines.contains(&"    articles: 21 valid".to_string()));
        assert!(lines.contains(&"    doctors: 13 valid, 1 rejected".to_string()));
        assert!(lines.contains(&"    articles: 21 rows".to_string()));
        assert!(lines.contains(&"    doctors: 12".to_string()));
        assert!(lines.contains(&"    Health [health, wellness]".to_string()));
    }
}
