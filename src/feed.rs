//! RSS feeds for configured folders.
//!
//! Each `rss_feeds` entry names a folder under the content root:
//!
//! ```yaml
//! rss_feeds:
//!   - blog
//!   - folder: notes
//!     title: Field Notes
//!     description: Short observations
//! ```
//!
//! A feed lists every non-folder page whose URL lies under `/<folder>/`, taken
//! from the full child lists, so folder pagination never truncates it. Items
//! are sorted newest first and capped at `rss_max_items`. The document is
//! written to `output/<folder>/<rss_filename>`.

use crate::config::{FeedEntry, SiteConfig};
use crate::imaging::is_optimizable;
use crate::page::Page;
use crate::template::markdown_to_html;
use chrono::{DateTime, Utc};
use regex::Regex;
use rss::{ChannelBuilder, EnclosureBuilder, GuidBuilder, Item, ItemBuilder};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;
use tracing::{info, warn};

/// Characters of page text used for an item description.
const EXCERPT_CHARS: usize = 300;

static HTML_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Cannot write feed {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Write one feed per configured folder. Returns the written paths.
///
/// Folders without pages are skipped with a warning.
pub fn generate(pages: &[Page], config: &SiteConfig, output: &Path) -> Result<Vec<PathBuf>, FeedError> {
    let now = Utc::now();
    let mut written = Vec::new();
    for entry in &config.rss_feeds {
        let folder = entry.folder().trim_matches('/');
        if folder.is_empty() {
            warn!("Feed entry without a folder, skipping");
            continue;
        }
        let Some(xml) = render_feed(entry, pages, config, now) else {
            warn!(folder, "No pages found for feed, skipping");
            continue;
        };
        let dir = output.join(folder);
        let path = dir.join(&config.rss_filename);
        fs::create_dir_all(&dir).map_err(|source| FeedError::Write {
            path: dir.clone(),
            source,
        })?;
        fs::write(&path, xml).map_err(|source| FeedError::Write {
            path: path.clone(),
            source,
        })?;
        info!(feed = %path.display(), "Feed written");
        written.push(path);
    }
    Ok(written)
}

/// Every non-folder page under `/<folder>/`, searching full child lists.
pub fn collect_pages<'p>(pages: &'p [Page], folder: &str) -> Vec<&'p Page> {
    let prefix = format!("/{}/", folder.trim_matches('/'));
    let mut found = Vec::new();
    collect_into(pages, &prefix, &mut found);
    found
}

fn collect_into<'p>(pages: &'p [Page], prefix: &str, found: &mut Vec<&'p Page>) {
    for page in pages {
        if !page.is_folder && page.url.starts_with(prefix) {
            found.push(page);
        }
        collect_into(&page.children, prefix, found);
    }
}

/// The feed document for one entry, or `None` if the folder has no pages.
pub fn render_feed(entry: &FeedEntry, pages: &[Page], config: &SiteConfig, now: DateTime<Utc>) -> Option<String> {
    let folder = entry.folder().trim_matches('/');
    let mut members = collect_pages(pages, folder);
    if members.is_empty() {
        return None;
    }
    members.sort_by(|a, b| b.effective_date().cmp(&a.effective_date()));
    members.truncate(config.rss_max_items);

    let site_url = config.site_url.trim_end_matches('/');
    let title = entry.title().unwrap_or(&config.sitename).to_string();
    let description = entry
        .description()
        .map(String::from)
        .unwrap_or_else(|| format!("Latest updates from {title}"));
    let items: Vec<Item> = members.iter().map(|page| feed_item(page, site_url)).collect();

    let channel = ChannelBuilder::default()
        .title(title)
        .link(format!("{site_url}/{folder}"))
        .description(description)
        .language(Some(config.language.clone()))
        .last_build_date(Some(now.to_rfc2822()))
        .generator(Some(format!("quire {}", env!("CARGO_PKG_VERSION"))))
        .items(items)
        .build();
    Some(channel.to_string())
}

fn feed_item(page: &Page, site_url: &str) -> Item {
    let link = format!("{site_url}{}", page.url);
    let description = page
        .meta
        .str("description")
        .or_else(|| page.meta.str("summary"))
        .map(String::from)
        .unwrap_or_else(|| excerpt(&page.body));
    let enclosure = page.meta.str("image").map(|image| {
        let url = absolute_image_url(image, site_url);
        EnclosureBuilder::default()
            .mime_type(mime_type(&url).to_string())
            .length("0".to_string())
            .url(url)
            .build()
    });

    ItemBuilder::default()
        .title(Some(page.title.clone()))
        .link(Some(link.clone()))
        .guid(Some(GuidBuilder::default().permalink(true).value(link).build()))
        .pub_date(Some(page.effective_date().to_rfc2822()))
        .description(Some(description))
        .enclosure(enclosure)
        .build()
}

/// Plain-text excerpt of a markdown body.
pub fn excerpt(body: &str) -> String {
    let html = markdown_to_html(body);
    let text = HTML_TAG.replace_all(&html, "");
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    match text.char_indices().nth(EXCERPT_CHARS) {
        Some((cut, _)) => format!("{}...", text[..cut].trim_end()),
        None => text,
    }
}

/// Site-relative images become absolute; optimized formats point at the WebP output.
fn absolute_image_url(image: &str, site_url: &str) -> String {
    if image.starts_with("http://") || image.starts_with("https://") {
        return image.to_string();
    }
    let path = if image.starts_with('/') {
        image.to_string()
    } else {
        format!("/{image}")
    };
    let path = if path.starts_with("/images/") && is_optimizable(Path::new(&path)) {
        Path::new(&path).with_extension("webp").to_string_lossy().into_owned()
    } else {
        path
    };
    format!("{site_url}{path}")
}

fn mime_type(url: &str) -> &'static str {
    let ext = Path::new(url)
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
}
