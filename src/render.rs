//! Listing renderer: records plus resolved labels → card models.
//!
//! Pure functions of their inputs. Missing optional fields fall back to the
//! configured placeholder image and labels; an empty tag or specialty list
//! produces no badges. An empty page is reported as [`Rendered::NoRecords`]
//! so the caller shows its empty message instead of an empty grid.

use crate::config::RenderConfig;
use crate::resolve::{RelatedEntities, RelationName};
use crate::types::{Article, Issue, Profile, Record, RecordId};
use chrono::NaiveDate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardStyle {
    Article,
    Profile,
    Issue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardImage {
    pub src: String,
    pub alt: String,
    /// True when `src` is the placeholder.
    pub placeholder: bool,
}

/// Display model of one card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardModel {
    pub id: RecordId,
    pub style: CardStyle,
    pub href: String,
    pub image: CardImage,
    pub title: String,
    /// Small line above the title: byline or issue date.
    pub meta: Option<String>,
    /// Line under the title: practice name or issue blurb.
    pub subtitle: Option<String>,
    pub badges: Vec<String>,
    pub call_to_action: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered {
    Cards(Vec<CardModel>),
    NoRecords,
}

impl Rendered {
    pub fn cards(&self) -> &[CardModel] {
        match self {
            Rendered::Cards(cards) => cards,
            Rendered::NoRecords => &[],
        }
    }
}

pub fn render(rows: &[Record], related: &RelatedEntities, config: &RenderConfig) -> Rendered {
    if rows.is_empty() {
        return Rendered::NoRecords;
    }
    Rendered::Cards(
        rows.iter()
            .map(|row| render_card(row, related, config))
            .collect(),
    )
}

pub fn render_card(record: &Record, related: &RelatedEntities, config: &RenderConfig) -> CardModel {
    match record {
        Record::Article(article) => article_card(article, related, config),
        Record::Profile(profile) => profile_card(profile, config),
        Record::Issue(issue) => issue_card(issue, config),
    }
}

fn image(config: &RenderConfig, link: Option<&str>, transform: &str, alt: String) -> CardImage {
    CardImage {
        src: config.images.source(link, transform),
        alt,
        placeholder: link.is_none(),
    }
}

fn article_card(article: &Article, related: &RelatedEntities, config: &RenderConfig) -> CardModel {
    let issue = related
        .label(RelationName::Issue, article.issue_id.as_ref())
        .unwrap_or(config.labels.uncategorized.as_str());
    let author = related
        .label(RelationName::Author, article.author_id.as_ref())
        .unwrap_or(config.labels.unknown_author.as_str());
    let byline = match article.date {
        Some(date) => format!("{} {issue} • {author}", short_date(date)),
        None => format!("{issue} • {author}"),
    };
    CardModel {
        id: article.id.clone(),
        style: CardStyle::Article,
        href: format!("/Article.html?id={}", article.id),
        image: image(
            config,
            article.cover_image_link.as_deref(),
            &config.images.cover_transform,
            article.title.clone(),
        ),
        title: article.title.clone(),
        meta: Some(byline),
        subtitle: None,
        badges: article.tags.clone(),
        call_to_action: Some("Read Article"),
    }
}

fn profile_card(profile: &Profile, config: &RenderConfig) -> CardModel {
    CardModel {
        id: profile.id.clone(),
        style: CardStyle::Profile,
        href: format!("/Profile.html?id={}", profile.id),
        image: image(
            config,
            profile.profile_pic_link.as_deref(),
            &config.images.portrait_transform,
            profile.full_name(),
        ),
        title: profile.display_name(),
        meta: None,
        subtitle: profile.business_name.clone(),
        badges: profile.specialties.clone(),
        call_to_action: None,
    }
}

fn issue_card(issue: &Issue, config: &RenderConfig) -> CardModel {
    let alt = issue
        .title
        .clone()
        .unwrap_or_else(|| config.labels.magazine_issue.clone());
    CardModel {
        id: issue.id.clone(),
        style: CardStyle::Issue,
        href: format!("/Issue.html?id={}", issue.id),
        image: image(
            config,
            issue.cover_image_link.as_deref(),
            &config.images.cover_transform,
            alt,
        ),
        title: issue
            .title
            .clone()
            .unwrap_or_else(|| config.labels.untitled_issue.clone()),
        meta: issue.start_date.map(month_year),
        subtitle: Some("View this issue of Springs Magazine".to_string()),
        badges: Vec::new(),
        call_to_action: Some("View Full Issue"),
    }
}

/// `4/2/2024`
pub fn short_date(date: NaiveDate) -> String {
    date.format("%-m/%-d/%Y").to_string()
}

/// `April 2024`
pub fn month_year(date: NaiveDate) -> String {
    date.format("%B %Y").to_string()
}
