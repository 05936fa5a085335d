//! Site and folder configuration.
//!
//! Configuration is hierarchical: built-in defaults are overridden by the site
//! configuration in the project root, which is overridden by folder
//! configuration documents at any depth of the content tree, which are
//! overridden by a page's own front matter.
//!
//! ## Config File Location
//!
//! ```text
//! my-site/
//! ├── config.yaml              # Site config (overrides built-in defaults)
//! └── pages/
//!     ├── config.yaml          # Content-root config (overrides site)
//!     └── blog/
//!         ├── config.yaml      # Folder config (overrides content root)
//!         └── first-post.md    # Front matter (overrides folder)
//! ```
//!
//! Each directory is searched for `config.yaml`, `config.yml`, `config.json`
//! and `config.toml`, in that order; the first one found wins.
//!
//! ## Merged Metadata
//!
//! Unlike a fixed record, the merged configuration is an open key-value
//! overlay: any key set in a config file or in front matter becomes a template
//! variable for every page beneath it. [`Metadata`] holds the merged map and
//! exposes typed accessors. [`SiteConfig`] is the typed view of the keys the
//! generator itself interprets; its serialized default is the bottom layer of
//! every page's metadata.
//!
//! ## Partial Configuration
//!
//! Config files are sparse; override just the values you want:
//!
//! ```yaml
//! sitename: Field Notes
//! page_size: 10
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::warn;

/// A JSON object: the common representation of every configuration format.
pub type Table = serde_json::Map<String, Value>;

/// Configuration document names searched in each directory, first match wins.
pub const CONFIG_FILENAMES: &[&str] = &["config.yaml", "config.yml", "config.json", "config.toml"];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Typed view of the configuration keys the generator interprets.
///
/// All fields have defaults. Unknown keys are allowed: site configuration
/// doubles as a source of template variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Site name, used as the default feed title.
    pub sitename: String,
    /// Absolute base URL (`https://example.com`) used in feeds.
    pub site_url: String,
    /// Language code written to feeds.
    pub language: String,
    /// Layout applied when no folder layout or front matter layout applies.
    pub default_layout_name: String,
    /// Fragment used to render link lists when no list-specific fragment exists.
    pub default_link_name: String,
    pub link_class: String,
    pub tag_class: String,
    pub breadcrumb_class: String,
    /// Raw HTML placed between breadcrumb links.
    pub breadcrumb_separator: String,
    pub prev_next_class: String,
    pub pagination_class: String,
    pub pagination_link_class: String,
    pub pagination_current_class: String,
    /// `strftime` format for the `date`, `created_at` and `updated_at` variables.
    pub date_format: String,
    /// Default child ordering for folders: `asc` or `desc`.
    pub date_sort_order: String,
    pub words_per_minute: u32,
    /// Optimized images are scaled down to at most this width.
    pub max_image_width: u32,
    /// Quiet period in milliseconds before a batch of changes is dispatched.
    pub watcher_delay: u64,
    pub serve_port: u16,
    pub rss_feeds: Vec<FeedEntry>,
    pub rss_max_items: usize,
    pub rss_filename: String,
    /// Extension of every emitted page (`output/<url>/index.<ext>`).
    pub output_extension: String,
    /// Maximum number of parallel workers. Absent means one per CPU core.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_processes: Option<usize>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            sitename: "My Site".to_string(),
            site_url: String::new(),
            language: "en".to_string(),
            default_layout_name: "default".to_string(),
            default_link_name: "links".to_string(),
            link_class: String::new(),
            tag_class: "tag".to_string(),
            breadcrumb_class: "breadcrumb".to_string(),
            breadcrumb_separator: "&raquo;".to_string(),
            prev_next_class: String::new(),
            pagination_class: "pagination".to_string(),
            pagination_link_class: "pagination_link".to_string(),
            pagination_current_class: "pagination_current".to_string(),
            date_format: "%a, %b %-d, %Y".to_string(),
            date_sort_order: "desc".to_string(),
            words_per_minute: 200,
            max_image_width: 800,
            watcher_delay: 100,
            serve_port: 3000,
            rss_feeds: Vec::new(),
            rss_max_items: 20,
            rss_filename: "rss.xml".to_string(),
            output_extension: "html".to_string(),
            max_processes: None,
        }
    }
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rss_max_items == 0 {
            return Err(ConfigError::Validation(
                "rss_max_items must be greater than 0".into(),
            ));
        }
        if self.max_image_width == 0 {
            return Err(ConfigError::Validation(
                "max_image_width must be greater than 0".into(),
            ));
        }
        if SortOrder::parse(&self.date_sort_order).is_none() {
            return Err(ConfigError::Validation(format!(
                "date_sort_order must be 'asc' or 'desc', got '{}'",
                self.date_sort_order
            )));
        }
        if self.words_per_minute == 0 {
            return Err(ConfigError::Validation(
                "words_per_minute must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Replace every out-of-range value with its default, logging each fix.
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        if self.rss_max_items == 0 {
            warn!("rss_max_items must be greater than 0, using {}", defaults.rss_max_items);
            self.rss_max_items = defaults.rss_max_items;
        }
        if self.max_image_width == 0 {
            warn!("max_image_width must be greater than 0, using {}", defaults.max_image_width);
            self.max_image_width = defaults.max_image_width;
        }
        if SortOrder::parse(&self.date_sort_order).is_none() {
            warn!(value = %self.date_sort_order, "Unknown date_sort_order, using 'desc'");
            self.date_sort_order = defaults.date_sort_order;
        }
        if self.words_per_minute == 0 {
            self.words_per_minute = defaults.words_per_minute;
        }
        self
    }

    /// Deserialize the typed view out of merged metadata.
    pub fn from_metadata(metadata: &Metadata) -> Result<Self, ConfigError> {
        let config: SiteConfig = serde_json::from_value(Value::Object(metadata.as_table().clone()))?;
        Ok(config)
    }
}

/// A feed declaration: either a bare folder name or a detailed entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeedEntry {
    Folder(String),
    Detailed {
        folder: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
}

impl FeedEntry {
    pub fn folder(&self) -> &str {
        match self {
            Self::Folder(folder) => folder,
            Self::Detailed { folder, .. } => folder,
        }
    }

    pub fn title(&self) -> Option<&str> {
        match self {
            Self::Folder(_) => None,
            Self::Detailed { title, .. } => title.as_deref(),
        }
    }

    pub fn description(&self) -> Option<&str> {
        match self {
            Self::Folder(_) => None,
            Self::Detailed { description, .. } => description.as_deref(),
        }
    }
}

/// Child ordering for a folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &SiteConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Merged metadata
// =============================================================================

/// Merged key-value metadata for one page or folder.
///
/// Built by layering tables in increasing precedence: defaults, site config,
/// each ancestor folder config (outermost first), front matter.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Metadata(Table);

impl Metadata {
    pub fn new() -> Self {
        Self(Table::new())
    }

    pub fn from_table(table: Table) -> Self {
        Self(table)
    }

    /// Layer `overlay` on top of this metadata, returning the merged result.
    pub fn overlay(&self, overlay: &Table) -> Self {
        let mut merged = self.0.clone();
        merge_tables(&mut merged, overlay);
        Self(merged)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|v| !v.is_null())
    }

    pub fn str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// A non-negative integer, accepting numeric strings as well.
    pub fn u64(&self, key: &str) -> Option<u64> {
        match self.get(key)? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// A boolean flag; `true`, `"true"` and `"yes"` count as set.
    pub fn flag(&self, key: &str) -> bool {
        match self.get(key) {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "yes"),
            _ => false,
        }
    }

    /// A list of strings, accepting either an array or a comma-separated string.
    pub fn list(&self, key: &str) -> Vec<String> {
        match self.get(key) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s.trim().to_string()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .filter(|s| !s.is_empty())
                .collect(),
            Some(Value::String(s)) => s
                .split(',')
                .map(|part| part.trim().to_string())
                .filter(|part| !part.is_empty())
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn as_table(&self) -> &Table {
        &self.0
    }
}

// =============================================================================
// Config loading, merging, and resolution
// =============================================================================

/// Returns the built-in defaults as a table.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_table() -> Table {
    match serde_json::to_value(SiteConfig::default()) {
        Ok(Value::Object(table)) => table,
        _ => Table::new(),
    }
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_values(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_table), Value::Object(overlay_table)) => {
            merge_tables(&mut base_table, &overlay_table);
            Value::Object(base_table)
        }
        (_, overlay) => overlay,
    }
}

fn merge_tables(base: &mut Table, overlay: &Table) {
    for (key, overlay_val) in overlay {
        let merged = match base.remove(key) {
            Some(base_val) => merge_values(base_val, overlay_val.clone()),
            None => overlay_val.clone(),
        };
        base.insert(key.clone(), merged);
    }
}

/// Parse a configuration or data document according to its extension.
pub fn parse_document(path: &Path, content: &str) -> Result<Value, ConfigError> {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    let value = match ext.as_str() {
        "json" => serde_json::from_str(content)?,
        "toml" => toml::from_str(content)?,
        _ => serde_yaml::from_str(content)?,
    };
    Ok(value)
}

/// Load the configuration document of a directory as a raw table.
///
/// Returns `Ok(None)` if the directory (or any config document in it) doesn't
/// exist. Returns `Err` if the document exists but can't be read or parsed.
pub fn load_raw_config(dir: &Path) -> Result<Option<Table>, ConfigError> {
    let Some(path) = CONFIG_FILENAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.is_file())
    else {
        return Ok(None);
    };
    let content = fs::read_to_string(&path)?;
    match parse_document(&path, &content)? {
        Value::Object(table) => Ok(Some(table)),
        Value::Null => Ok(Some(Table::new())),
        _ => Err(ConfigError::Validation(format!(
            "{} must contain a key-value mapping",
            path.display()
        ))),
    }
}

/// Merge a directory's configuration document over `inherited`.
///
/// `inherited` already carries every ancestor's resolved configuration. A
/// missing directory or document leaves it unchanged; a malformed document is
/// logged and ignored so one bad file can't abort the build.
pub fn resolve(dir: &Path, inherited: &Metadata) -> Metadata {
    match load_raw_config(dir) {
        Ok(Some(layer)) => inherited.overlay(&layer),
        Ok(None) => inherited.clone(),
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "Ignoring malformed configuration");
            inherited.clone()
        }
    }
}

/// Site-level configuration: the typed view plus the merged metadata layer.
#[derive(Debug, Clone)]
pub struct SiteSettings {
    pub config: SiteConfig,
    /// Built-in defaults with the site configuration merged on top.
    pub metadata: Metadata,
}

/// Load the site configuration from the project root.
pub fn load_site_config(root: &Path) -> SiteSettings {
    let defaults = Metadata::from_table(stock_defaults_table());
    let metadata = resolve(root, &defaults);
    let config = match SiteConfig::from_metadata(&metadata) {
        Ok(config) => config.sanitized(),
        Err(e) => {
            warn!(error = %e, "Site configuration has invalid values, using defaults");
            SiteConfig::default()
        }
    };
    SiteSettings { config, metadata }
}

/// Returns a fully-commented stock `config.yaml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_yaml() -> &'static str {
    r##"# Site Configuration
# ==================
# All settings are optional. Values shown below are the defaults.
#
# Config files can be placed at any level of the content tree:
#   config.yaml                -> site (overrides built-in defaults)
#   pages/config.yaml          -> content root (overrides site)
#   pages/blog/config.yaml     -> folder (overrides content root)
#
# Each level only needs the keys it wants to override. Any extra key becomes a
# template variable ({{ key }}) for every page beneath it.

sitename: My Site
# Absolute URL used for links in feeds.
site_url: ""
language: en

# ---------------------------------------------------------------------------
# Layouts and link lists
# ---------------------------------------------------------------------------
default_layout_name: default
default_link_name: links
link_class: ""
tag_class: tag
breadcrumb_class: breadcrumb
breadcrumb_separator: "&raquo;"
prev_next_class: ""
pagination_class: pagination
pagination_link_class: pagination_link
pagination_current_class: pagination_current

# ---------------------------------------------------------------------------
# Dates and ordering
# ---------------------------------------------------------------------------
date_format: "%a, %b %-d, %Y"
# Folder children are sorted by date, newest first unless set to asc.
date_sort_order: desc
words_per_minute: 200

# Folder-only: split a folder's listing into pages of this size.
# page_size: 10

# ---------------------------------------------------------------------------
# Images
# ---------------------------------------------------------------------------
max_image_width: 800

# ---------------------------------------------------------------------------
# Feeds
# ---------------------------------------------------------------------------
# Each entry is a folder name or {folder, title, description}.
rss_feeds: []
rss_max_items: 20
rss_filename: rss.xml

# ---------------------------------------------------------------------------
# Output, watch mode and processing
# ---------------------------------------------------------------------------
output_extension: html
watcher_delay: 100
serve_port: 3000
# Maximum parallel workers. Omit to auto-detect (= number of CPU cores).
# max_processes: 4
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn table(value: Value) -> Table {
        match value {
            Value::Object(t) => t,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn default_config_has_layout_and_feed_settings() {
        let config = SiteConfig::default();
        assert_eq!(config.default_layout_name, "default");
        assert_eq!(config.rss_max_items, 20);
        assert_eq!(config.rss_filename, "rss.xml");
        assert!(config.rss_feeds.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn stock_defaults_contain_every_typed_key() {
        let defaults = stock_defaults_table();
        assert_eq!(defaults.get("sitename"), Some(&json!("My Site")));
        assert_eq!(defaults.get("words_per_minute"), Some(&json!(200)));
        assert!(!defaults.contains_key("max_processes"));
    }

    #[test]
    fn stock_config_yaml_parses_to_defaults() {
        let parsed: SiteConfig = serde_yaml::from_str(stock_config_yaml()).unwrap();
        let defaults = SiteConfig::default();
        assert_eq!(parsed.sitename, defaults.sitename);
        assert_eq!(parsed.date_format, defaults.date_format);
        assert_eq!(parsed.breadcrumb_separator, defaults.breadcrumb_separator);
    }

    #[test]
    fn feed_entries_accept_both_shapes() {
        let config: SiteConfig = serde_yaml::from_str(
            r#"
rss_feeds:
  - blog
  - folder: notes
    title: Notes
"#,
        )
        .unwrap();
        assert_eq!(config.rss_feeds.len(), 2);
        assert_eq!(config.rss_feeds[0].folder(), "blog");
        assert_eq!(config.rss_feeds[0].title(), None);
        assert_eq!(config.rss_feeds[1].folder(), "notes");
        assert_eq!(config.rss_feeds[1].title(), Some("Notes"));
    }

    // =========================================================================
    // merge tests
    // =========================================================================

    #[test]
    fn merge_scalar_override() {
        let merged = merge_values(json!({"quality": 90}), json!({"quality": 70}));
        assert_eq!(merged["quality"], json!(70));
    }

    #[test]
    fn merge_nested_tables_key_by_key() {
        let merged = merge_values(
            json!({"social": {"mastodon": "@a", "github": "a"}}),
            json!({"social": {"github": "b"}}),
        );
        assert_eq!(merged["social"]["mastodon"], json!("@a"));
        assert_eq!(merged["social"]["github"], json!("b"));
    }

    #[test]
    fn merge_arrays_replace_rather_than_append() {
        let merged = merge_values(json!({"tags": ["a", "b"]}), json!({"tags": ["c"]}));
        assert_eq!(merged["tags"], json!(["c"]));
    }

    #[test]
    fn overlay_layers_in_increasing_precedence() {
        let defaults = Metadata::from_table(table(json!({"a": 1, "b": 1, "c": 1, "d": 1})));
        let site = table(json!({"b": 2, "c": 2, "d": 2}));
        let folder = table(json!({"c": 3, "d": 3}));
        let front = table(json!({"d": 4}));

        let merged = defaults.overlay(&site).overlay(&folder).overlay(&front);
        assert_eq!(merged.u64("a"), Some(1));
        assert_eq!(merged.u64("b"), Some(2));
        assert_eq!(merged.u64("c"), Some(3));
        assert_eq!(merged.u64("d"), Some(4));
    }

    // =========================================================================
    // Metadata accessor tests
    // =========================================================================

    #[test]
    fn metadata_accessors_coerce_common_shapes() {
        let meta = Metadata::from_table(table(json!({
            "page_size": "3",
            "draft": "yes",
            "tags": "rust, web , ",
            "list": ["a", 2, null],
            "nothing": null,
        })));
        assert_eq!(meta.u64("page_size"), Some(3));
        assert!(meta.flag("draft"));
        assert!(!meta.flag("missing"));
        assert_eq!(meta.list("tags"), vec!["rust", "web"]);
        assert_eq!(meta.list("list"), vec!["a", "2"]);
        assert!(meta.get("nothing").is_none());
    }

    // =========================================================================
    // resolve / load tests
    // =========================================================================

    #[test]
    fn resolve_returns_inherited_when_dir_missing() {
        let tmp = TempDir::new().unwrap();
        let inherited = Metadata::from_table(table(json!({"a": 1})));
        let resolved = resolve(&tmp.path().join("nope"), &inherited);
        assert_eq!(resolved, inherited);
    }

    #[test]
    fn resolve_merges_yaml_over_inherited() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("config.yaml"), "page_size: 2\ntitle: Blog\n").unwrap();
        let inherited = Metadata::from_table(table(json!({"title": "Site", "sitename": "S"})));
        let resolved = resolve(tmp.path(), &inherited);
        assert_eq!(resolved.str("title"), Some("Blog"));
        assert_eq!(resolved.str("sitename"), Some("S"));
        assert_eq!(resolved.u64("page_size"), Some(2));
    }

    #[test]
    fn first_config_document_wins() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("config.json"), r#"{"title": "from json"}"#).unwrap();
        fs::write(tmp.path().join("config.yaml"), "title: from yaml\n").unwrap();
        let raw = load_raw_config(tmp.path()).unwrap().unwrap();
        assert_eq!(raw.get("title"), Some(&json!("from yaml")));
    }

    #[test]
    fn toml_config_is_supported() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("config.toml"), "sitename = \"Toml Site\"\n").unwrap();
        let raw = load_raw_config(tmp.path()).unwrap().unwrap();
        assert_eq!(raw.get("sitename"), Some(&json!("Toml Site")));
    }

    #[test]
    fn malformed_config_falls_back_to_inherited() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("config.json"), "{ not json").unwrap();
        assert!(matches!(load_raw_config(tmp.path()), Err(ConfigError::Json(_))));

        let inherited = Metadata::from_table(table(json!({"title": "kept"})));
        let resolved = resolve(tmp.path(), &inherited);
        assert_eq!(resolved, inherited);
    }

    #[test]
    fn non_mapping_config_is_rejected() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("config.yaml"), "- a\n- b\n").unwrap();
        assert!(matches!(
            load_raw_config(tmp.path()),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn site_config_loads_typed_and_extra_keys() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("config.yaml"),
            "sitename: Field Notes\nauthor: Sam\nrss_max_items: 5\n",
        )
        .unwrap();
        let settings = load_site_config(tmp.path());
        assert_eq!(settings.config.sitename, "Field Notes");
        assert_eq!(settings.config.rss_max_items, 5);
        assert_eq!(settings.metadata.str("author"), Some("Sam"));
        assert_eq!(settings.metadata.str("default_layout_name"), Some("default"));
    }

    #[test]
    fn invalid_values_are_sanitized() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("config.yaml"),
            "rss_max_items: 0\ndate_sort_order: sideways\n",
        )
        .unwrap();
        let settings = load_site_config(tmp.path());
        assert_eq!(settings.config.rss_max_items, 20);
        assert_eq!(settings.config.date_sort_order, "desc");
    }

    #[test]
    fn validate_rejects_zero_width() {
        let config = SiteConfig {
            max_image_width: 0,
            ..SiteConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn sort_order_parse() {
        assert_eq!(SortOrder::parse("ASC"), Some(SortOrder::Asc));
        assert_eq!(SortOrder::parse(" desc "), Some(SortOrder::Desc));
        assert_eq!(SortOrder::parse("random"), None);
    }

    #[test]
    fn effective_threads_user_constrains_down() {
        let config = SiteConfig {
            max_processes: Some(1),
            ..SiteConfig::default()
        };
        assert_eq!(effective_threads(&config), 1);
    }

    #[test]
    fn effective_threads_clamped_to_cores() {
        let config = SiteConfig {
            max_processes: Some(99999),
            ..SiteConfig::default()
        };
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_threads(&config), cores);
    }
}
