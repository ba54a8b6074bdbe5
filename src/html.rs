//! HTML components for listing pages.
//!
//! Uses [maud](https://maud.lambda.xyz/) for compile-time HTML templating.
//! Every function here is a pure mapping from display models to markup; the
//! page shell decides which container each fragment lands in.

use crate::catalog::FilterDimension;
use crate::filter::{ALL_VALUE, FilterOption};
use crate::pagination::{ControlState, ControlStrip, ListingView};
use crate::render::{CardModel, CardStyle};
use maud::{DOCTYPE, Markup, html};

// ============================================================================
// HTML Components
// ============================================================================

/// Renders the base HTML document structure
pub fn base_document(title: &str, body_class: Option<&str>, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) }
            }
            body class=[body_class] {
                (content)
            }
        }
    }
}

/// Renders one result card
pub fn card(card: &CardModel) -> Markup {
    let class = match card.style {
        CardStyle::Article => "transparentcard group article-card",
        CardStyle::Profile => "transparentcard group profile-card",
        CardStyle::Issue => "transparentcard group issue-card",
    };
    html! {
        a class=(class) href=(card.href) data-id=(card.id) {
            img.placeholder[card.image.placeholder] src=(card.image.src) alt=(card.image.alt) loading="lazy";
            @if !card.badges.is_empty() {
                div.badges {
                    @for badge in &card.badges {
                        span.badge { (badge) }
                    }
                }
            }
            @if let Some(meta) = &card.meta {
                h6.meta { (meta) }
            }
            h6.title { (card.title) }
            @if let Some(subtitle) = &card.subtitle {
                p.subtitle { (subtitle) }
            }
            @if let Some(cta) = card.call_to_action {
                p.link { (cta) }
            }
        }
    }
}

/// Renders the card grid, or the view's message in place of it
pub fn listing_grid(view: &ListingView) -> Markup {
    html! {
        @match view {
            ListingView::Pending => {
                div.listing-status.loading { "Loading…" }
            }
            ListingView::Cards(cards) => {
                @for model in cards {
                    (card(model))
                }
            }
            ListingView::Message(message) => {
                p.listing-status { (message) }
            }
        }
    }
}

/// Renders previous, numbered, and next controls
pub fn control_strip(strip: &ControlStrip) -> Markup {
    html! {
        button.prev-btn type="button" disabled[strip.previous == ControlState::Disabled] {
            "Previous"
        }
        @for control in &strip.pages {
            @let active = control.state == ControlState::Active;
            button.page-btn.active[active] type="button"
                aria-current=[active.then_some("page")]
                disabled[control.state == ControlState::Disabled]
                data-page=(control.page) {
                (control.page)
            }
        }
        button.next-btn type="button" disabled[strip.next == ControlState::Disabled] {
            "Next"
        }
    }
}

/// Renders the filter heading and dropdown with its "all" sentinel first
pub fn filter_dropdown(
    dimension: FilterDimension,
    options: &[FilterOption],
    selected_label: &str,
) -> Markup {
    html! {
        h6.filter-heading { (dimension.heading()) }
        div.filter-dropdown data-dimension=(dimension) {
            button.filter-toggle type="button" {
                span.selected-option { (selected_label) }
            }
            div.filter-options {
                a.filter-option.all href="#" data-value=(ALL_VALUE) { (dimension.all_label()) }
                @for option in options {
                    a.filter-option href="#" data-value=(option.value) { (option.label) }
                }
            }
        }
    }
}

/// Renders the heading of an issue page
pub fn issue_header(title: &str, cover: Option<(&str, &str)>, date_range: Option<&str>) -> Markup {
    html! {
        header.issue-header {
            @if let Some((src, alt)) = cover {
                img id="issue-cover-image" src=(src) alt=(alt);
            }
            h1 id="issue-title" { (title) }
            @if let Some(range) = date_range {
                p id="issuedaterange" { (range) }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::FilterPayload;
    use crate::pagination::PageControl;
    use crate::render::CardImage;
    use crate::types::RecordId;

    fn model(badges: Vec<String>) -> CardModel {
        CardModel {
            id: RecordId::new("a1"),
            style: CardStyle::Article,
            href: "/Article.html?id=a1".into(),
            image: CardImage {
                src: "/placeholder.svg".into(),
                alt: "Title".into(),
                placeholder: true,
            },
            title: "Title".into(),
            meta: Some("Uncategorized • Unknown Author".into()),
            subtitle: None,
            badges,
            call_to_action: Some("Read Article"),
        }
    }

    #[test]
    fn base_document_includes_doctype() {
        let content = html! { p { "test" } };
        let doc = base_document("Test", None, content).into_string();
        assert!(doc.starts_with("<!DOCTYPE html>"));
        assert!(doc.contains("<title>Test</title>"));
    }

    #[test]
    fn card_without_badges_has_no_badge_elements() {
        let html = card(&model(vec![])).into_string();
        assert!(!html.contains("badge"));
        assert!(html.contains(r#"href="/Article.html?id=a1""#));
        assert!(html.contains("placeholder"));
    }

    #[test]
    fn card_renders_one_badge_per_tag() {
        let html = card(&model(vec!["health".into(), "dining".into()])).into_string();
        assert_eq!(html.matches(r#"class="badge""#).count(), 2);
    }

    #[test]
    fn grid_shows_message_instead_of_cards() {
        let html = listing_grid(&ListingView::Message("No issues found.".into())).into_string();
        assert!(html.contains("No issues found."));
        assert!(!html.contains("<a "));
    }

    #[test]
    fn control_strip_disabled_and_active_states() {
        let strip = ControlStrip {
            previous: ControlState::Disabled,
            pages: vec![
                PageControl {
                    page: 1,
                    state: ControlState::Active,
                },
                PageControl {
                    page: 2,
                    state: ControlState::Enabled,
                },
            ],
            next: ControlState::Enabled,
        };
        let html = control_strip(&strip).into_string();
        let prev = &html[..html.find("Previous").unwrap()];
        assert!(prev.contains("disabled"));
        assert_eq!(html.matches("disabled").count(), 1);
        assert!(html.contains(r#"aria-current="page""#));
        assert!(html.contains(r#"data-page="2""#));
    }

    #[test]
    fn dropdown_lists_sentinel_then_options() {
        let options = vec![FilterOption {
            value: "2024".into(),
            label: "2024".into(),
            payload: FilterPayload::Single("2024".into()),
        }];
        let html = filter_dropdown(FilterDimension::Year, &options, "All Years").into_string();
        let sentinel = html.find(r#"data-value="all""#).unwrap();
        let option = html.find(r#"data-value="2024""#).unwrap();
        assert!(sentinel < option);
        assert!(html.contains("Filter by Year"));
    }

    #[test]
    fn html_escape_in_maud() {
        let mut model = model(vec![]);
        model.title = "<script>alert('xss')</script>".into();
        let html = card(&model).into_string();
        assert!(!html.contains("<script>alert"));
        assert!(html.contains("&lt;script&gt;"));
    }
}
