//! Listing configuration.
//!
//! Handles loading, validating, and merging `listings.toml`. Stock defaults
//! reproduce the magazine's production behavior; a user file overrides only
//! the keys it names.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [store]
//! path = "fixtures/store.json"   # JSON store backing the CLI
//!
//! [page_sizes]
//! articles = 9
//! doctors = 12
//! dentists = 12
//! attorneys = 12
//! issues = 9
//! category = 9
//!
//! [images]
//! placeholder = "/placeholder.svg"
//! cover_transform = "height=377&quality=10&resize=cover"
//! portrait_transform = "height=233&quality=10&resize=cover"
//!
//! [labels]
//! unknown_author = "Unknown Author"
//! uncategorized = "Uncategorized"
//! untitled_issue = "Untitled Issue"
//! magazine_issue = "Magazine Issue"
//!
//! [containers]
//! cards = "listing-cards"
//! pagination = "pagination"
//! filters = "filters"
//!
//! [bus]
//! capacity = 16
//!
//! [[categories]]
//! label = "Health"
//! tags = ["health", "wellness"]
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse — override just the values you want:
//!
//! ```toml
//! [page_sizes]
//! doctors = 24
//! ```
//!
//! Arrays (such as `categories`) replace the default list wholesale.
//! Unknown keys are rejected to catch typos early.

use crate::catalog::ListingKind;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// File name looked up in the config directory.
pub const CONFIG_FILENAME: &str = "listings.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Listing configuration loaded from `listings.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ListingsConfig {
    /// Location of the bundled JSON store.
    pub store: StoreConfig,
    /// Rows per page for each listing.
    pub page_sizes: PageSizes,
    /// Image references and resize transforms.
    pub images: ImageConfig,
    /// Fallback text for missing optional fields.
    pub labels: LabelConfig,
    /// Mount-point names the page shell must provide.
    pub containers: ContainerConfig,
    /// Coordination bus settings.
    pub bus: BusConfig,
    /// Tag groups offered by the category listing.
    pub categories: Vec<CategoryConfig>,
}

impl ListingsConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for kind in ListingKind::ALL {
            if self.page_sizes.for_kind(kind) == 0 {
                return Err(ConfigError::Validation(format!(
                    "page_sizes.{} must be greater than 0",
                    kind.name()
                )));
            }
        }
        if self.bus.capacity == 0 {
            return Err(ConfigError::Validation(
                "bus.capacity must be greater than 0".into(),
            ));
        }
        if self.images.placeholder.trim().is_empty() {
            return Err(ConfigError::Validation(
                "images.placeholder must not be empty".into(),
            ));
        }
        let names = [
            &self.containers.cards,
            &self.containers.pagination,
            &self.containers.filters,
        ];
        if names.iter().any(|name| name.trim().is_empty()) {
            return Err(ConfigError::Validation(
                "container names must not be empty".into(),
            ));
        }
        if names.iter().collect::<HashSet<_>>().len() != names.len() {
            return Err(ConfigError::Validation(
                "container names must be distinct".into(),
            ));
        }
        let mut labels = HashSet::new();
        for category in &self.categories {
            if category.label.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "categories.label must not be empty".into(),
                ));
            }
            if category.tags.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "category `{}` must list at least one tag",
                    category.label
                )));
            }
            if !labels.insert(category.label.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "category `{}` is defined twice",
                    category.label
                )));
            }
        }
        Ok(())
    }

    pub fn page_size(&self, kind: ListingKind) -> u32 {
        self.page_sizes.for_kind(kind)
    }

    /// The subset of settings the card renderer reads.
    pub fn render_config(&self) -> RenderConfig {
        RenderConfig {
            images: self.images.clone(),
            labels: self.labels.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Path of the JSON store, relative to the working directory.
    pub path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: "fixtures/store.json".to_string(),
        }
    }
}

/// Rows per page. Zero is rejected by [`ListingsConfig::validate`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PageSizes {
    pub articles: u32,
    pub doctors: u32,
    pub dentists: u32,
    pub attorneys: u32,
    pub issues: u32,
    pub category: u32,
}

impl PageSizes {
    pub fn for_kind(&self, kind: ListingKind) -> u32 {
        match kind {
            ListingKind::Articles => self.articles,
            ListingKind::Doctors => self.doctors,
            ListingKind::Dentists => self.dentists,
            ListingKind::Attorneys => self.attorneys,
            ListingKind::Issues => self.issues,
            ListingKind::Category => self.category,
        }
    }
}

impl Default for PageSizes {
    fn default() -> Self {
        Self {
            articles: 9,
            doctors: 12,
            dentists: 12,
            attorneys: 12,
            issues: 9,
            category: 9,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImageConfig {
    /// Image shown when a record has no image link.
    pub placeholder: String,
    /// Query string appended to article and issue covers.
    pub cover_transform: String,
    /// Query string appended to profile portraits.
    pub portrait_transform: String,
}

impl ImageConfig {
    /// `link?transform`, or the placeholder when there is no link.
    pub fn source(&self, link: Option<&str>, transform: &str) -> String {
        match link {
            Some(link) if transform.is_empty() => link.to_string(),
            Some(link) => format!("{link}?{transform}"),
            None => self.placeholder.clone(),
        }
    }
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            placeholder: "/placeholder.svg".to_string(),
            cover_transform: "height=377&quality=10&resize=cover".to_string(),
            portrait_transform: "height=233&quality=10&resize=cover".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LabelConfig {
    pub unknown_author: String,
    pub uncategorized: String,
    pub untitled_issue: String,
    /// Alt text of an untitled issue cover.
    pub magazine_issue: String,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            unknown_author: "Unknown Author".to_string(),
            uncategorized: "Uncategorized".to_string(),
            untitled_issue: "Untitled Issue".to_string(),
            magazine_issue: "Magazine Issue".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContainerConfig {
    pub cards: String,
    pub pagination: String,
    pub filters: String,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            cards: "listing-cards".to_string(),
            pagination: "pagination".to_string(),
            filters: "filters".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BusConfig {
    /// Events buffered per subscriber before it starts lagging.
    pub capacity: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self { capacity: 16 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CategoryConfig {
    pub label: String,
    pub tags: Vec<String>,
}

/// Image and label settings handed to the card renderer.
#[derive(Debug, Clone, Default)]
pub struct RenderConfig {
    pub images: ImageConfig,
    pub labels: LabelConfig,
}

fn default_categories() -> Vec<CategoryConfig> {
    [
        ("Health", &["health", "wellness"][..]),
        ("Dining", &["dining", "food"][..]),
        ("Arts & Culture", &["arts", "culture"][..]),
        ("Home & Design", &["home", "design"][..]),
    ]
    .into_iter()
    .map(|(label, tags)| CategoryConfig {
        label: label.to_string(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
    })
    .collect()
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// Base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    let stock = ListingsConfig {
        categories: default_categories(),
        ..ListingsConfig::default()
    };
    toml::Value::try_from(stock).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `listings.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join(CONFIG_FILENAME);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<ListingsConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: ListingsConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `listings.toml` in the given directory, on top of the
/// stock defaults.
pub fn load_config(dir: &Path) -> Result<ListingsConfig, ConfigError> {
    resolve_config(stock_defaults_value(), load_raw_config(dir)?)
}

/// The stock configuration with its defaults resolved.
pub fn stock_config() -> ListingsConfig {
    ListingsConfig {
        categories: default_categories(),
        ..ListingsConfig::default()
    }
}

/// Returns a fully-commented stock `listings.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Springs Listings Configuration
# ==============================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Store
# ---------------------------------------------------------------------------
[store]
# JSON file holding one array of rows per collection.
path = "fixtures/store.json"

# ---------------------------------------------------------------------------
# Rows per page (must be greater than 0)
# ---------------------------------------------------------------------------
[page_sizes]
articles = 9
doctors = 12
dentists = 12
attorneys = 12
issues = 9
category = 9

# ---------------------------------------------------------------------------
# Images
# ---------------------------------------------------------------------------
[images]
# Shown when a record has no image link.
placeholder = "/placeholder.svg"
# Resize query appended to article and issue covers.
cover_transform = "height=377&quality=10&resize=cover"
# Resize query appended to profile portraits.
portrait_transform = "height=233&quality=10&resize=cover"

# ---------------------------------------------------------------------------
# Fallback labels
# ---------------------------------------------------------------------------
[labels]
unknown_author = "Unknown Author"
uncategorized = "Uncategorized"
untitled_issue = "Untitled Issue"
magazine_issue = "Magazine Issue"

# ---------------------------------------------------------------------------
# Mount points the page must provide
# ---------------------------------------------------------------------------
[containers]
cards = "listing-cards"
pagination = "pagination"
filters = "filters"

# ---------------------------------------------------------------------------
# Filter-change bus
# ---------------------------------------------------------------------------
[bus]
# Events buffered per subscriber.
capacity = 16

# ---------------------------------------------------------------------------
# Category listing tag groups (replaces the whole list when set)
# ---------------------------------------------------------------------------
[[categories]]
label = "Health"
tags = ["health", "wellness"]

[[categories]]
label = "Dining"
tags = ["dining", "food"]

[[categories]]
label = "Arts & Culture"
tags = ["arts", "culture"]

[[categories]]
label = "Home & Design"
tags = ["home", "design"]
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_page_sizes() {
        let config = stock_config();
        assert_eq!(config.page_size(ListingKind::Articles), 9);
        assert_eq!(config.page_size(ListingKind::Doctors), 12);
        assert_eq!(config.page_size(ListingKind::Issues), 9);
    }

    #[test]
    fn parse_partial_config() {
        let toml = r#"
[page_sizes]
doctors = 24
"#;
        let config: ListingsConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.page_sizes.doctors, 24);
        assert_eq!(config.page_sizes.dentists, 12);
        assert_eq!(config.labels.unknown_author, "Unknown Author");
    }

    #[test]
    fn image_source_appends_transform() {
        let images = ImageConfig::default();
        assert_eq!(
            images.source(Some("https://cdn/a.jpg"), &images.portrait_transform),
            "https://cdn/a.jpg?height=233&quality=10&resize=cover"
        );
        assert_eq!(images.source(Some("https://cdn/a.jpg"), ""), "https://cdn/a.jpg");
        assert_eq!(images.source(None, &images.cover_transform), "/placeholder.svg");
    }

    // =========================================================================
    // load_config tests
    // =========================================================================

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.page_sizes.articles, 9);
        assert_eq!(config.categories.len(), 4);
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILENAME),
            r#"
[labels]
unknown_author = "Staff Writer"

[containers]
cards = "doctor-cards"
"#,
        )
        .unwrap();

        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.labels.unknown_author, "Staff Writer");
        assert_eq!(config.labels.uncategorized, "Uncategorized");
        assert_eq!(config.containers.cards, "doctor-cards");
        assert_eq!(config.containers.pagination, "pagination");
    }

    #[test]
    fn categories_replace_defaults() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILENAME),
            r#"
[[categories]]
label = "Outdoors"
tags = ["hiking"]
"#,
        )
        .unwrap();

        let config = load_config(tmp.path()).unwrap();
        assert_eq!(
            config.categories,
            vec![CategoryConfig {
                label: "Outdoors".into(),
                tags: vec!["hiking".into()]
            }]
        );
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILENAME), "not valid toml [[[").unwrap();
        assert!(matches!(load_config(tmp.path()), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn unknown_key_rejected() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILENAME),
            "[page_sizes]\npodcasts = 3\n",
        )
        .unwrap();
        assert!(matches!(load_config(tmp.path()), Err(ConfigError::Toml(_))));
    }

    // =========================================================================
    // Validation
    // =========================================================================

    #[test]
    fn validate_stock_config_passes() {
        assert!(stock_config().validate().is_ok());
    }

    #[test]
    fn validate_zero_page_size() {
        let mut config = stock_config();
        config.page_sizes.issues = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("page_sizes.issues"));
    }

    #[test]
    fn validate_zero_bus_capacity() {
        let mut config = stock_config();
        config.bus.capacity = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validate_duplicate_containers() {
        let mut config = stock_config();
        config.containers.filters = config.containers.cards.clone();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("distinct"));
    }

    #[test]
    fn validate_category_without_tags() {
        let mut config = stock_config();
        config.categories.push(CategoryConfig {
            label: "Empty".into(),
            tags: vec![],
        });
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Empty"));
    }

    #[test]
    fn validate_duplicate_category() {
        let mut config = stock_config();
        let first = config.categories[0].clone();
        config.categories.push(first);
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn resolve_config_rejects_invalid_values() {
        let overlay: toml::Value = toml::from_str("[page_sizes]\narticles = 0\n").unwrap();
        let result = resolve_config(stock_defaults_value(), Some(overlay));
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    // =========================================================================
    // merge_toml
    // =========================================================================

    #[test]
    fn merge_toml_table_merge() {
        let base: toml::Value = toml::from_str("[a]\nx = 1\ny = 2\n").unwrap();
        let overlay: toml::Value = toml::from_str("[a]\ny = 3\n").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged["a"]["x"].as_integer(), Some(1));
        assert_eq!(merged["a"]["y"].as_integer(), Some(3));
    }

    #[test]
    fn merge_toml_array_replaces() {
        let base: toml::Value = toml::from_str("xs = [1, 2, 3]\n").unwrap();
        let overlay: toml::Value = toml::from_str("xs = [9]\n").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged["xs"].as_array().map(Vec::len), Some(1));
    }

    // =========================================================================
    // Stock config
    // =========================================================================

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        let parsed: ListingsConfig = toml::from_str(stock_config_toml()).unwrap();
        let stock = stock_config();
        assert_eq!(parsed.page_sizes.doctors, stock.page_sizes.doctors);
        assert_eq!(parsed.images.placeholder, stock.images.placeholder);
        assert_eq!(parsed.containers.cards, stock.containers.cards);
        assert_eq!(parsed.bus.capacity, stock.bus.capacity);
        assert_eq!(parsed.categories, stock.categories);
    }

    #[test]
    fn stock_defaults_value_is_table() {
        let value = stock_defaults_value();
        assert!(value.is_table());
        assert!(value.get("categories").is_some());
    }
}
