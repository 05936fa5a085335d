//! The page node: one output document or folder index.
//!
//! Pages form an owned tree: a folder owns its children, and each child keeps
//! only a [`ParentRef`] snapshot of its parent (title, URL, filename), never
//! a pointer back. Synthetic pagination pages live inside the folder's
//! [`Pagination`] rather than among its children, so `children` is always the
//! full, unchunked listing.

use crate::config::{Metadata, SiteConfig, Table};
use crate::date;
use crate::types::LinkItem;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::ops::Range;
use std::path::PathBuf;

/// Snapshot of a page's parent, taken while the tree is built.
#[derive(Debug, Clone, PartialEq)]
pub struct ParentRef {
    pub title: String,
    pub url: String,
    pub filename: String,
}

/// A folder's pagination state.
#[derive(Debug, Clone, Default)]
pub struct Pagination {
    pub page_size: usize,
    /// Index ranges into the folder's `children`, one per output page.
    pub chunks: Vec<Range<usize>>,
    /// Synthetic pages for chunks 2..N.
    pub pages: Vec<Page>,
}

/// Rendered navigation fragments, filled in by [`crate::links::annotate`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NavLinks {
    pub breadcrumbs: String,
    pub links_to_tags: String,
    pub prev_page: String,
    pub next_page: String,
    pub links_to_children: String,
    pub links_to_siblings: String,
    pub links_to_self_and_siblings: String,
    pub nav_links: String,
    /// Pagination nav; set while the tree is built, kept by annotation.
    pub pagination: String,
}

#[derive(Debug, Clone)]
pub struct Page {
    pub url: String,
    pub name: String,
    pub title: String,
    /// Source stem (`first-post` for `first-post.md`); used for fragment lookup.
    pub filename: String,
    /// Source document or directory. `None` for synthesized pages.
    pub source: Option<PathBuf>,
    pub is_folder: bool,
    pub is_root: bool,
    /// Listed in the global nav (top-level entries other than the root).
    pub in_nav: bool,
    pub parent: Option<ParentRef>,
    pub children: Vec<Page>,
    pub pagination: Option<Pagination>,
    /// Unrendered body: markdown for documents, a link list for folders.
    pub body: String,
    pub layout: Option<String>,
    pub meta: Metadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Explicit front matter date.
    pub date: Option<DateTime<Utc>>,
    /// Explicit sort position.
    pub position: Option<u64>,
    pub tags: Vec<String>,
    pub draft: bool,
    pub links: NavLinks,
}

impl Page {
    pub fn new(url: impl Into<String>, name: impl Into<String>) -> Self {
        let name = name.into();
        let now = Utc::now();
        Self {
            url: url.into(),
            title: name.clone(),
            filename: String::new(),
            name,
            source: None,
            is_folder: false,
            is_root: false,
            in_nav: false,
            parent: None,
            children: Vec::new(),
            pagination: None,
            body: String::new(),
            layout: None,
            meta: Metadata::new(),
            created_at: now,
            updated_at: now,
            date: None,
            position: None,
            tags: Vec::new(),
            draft: false,
            links: NavLinks::default(),
        }
    }

    /// Explicit date if set, else the creation timestamp.
    pub fn effective_date(&self) -> DateTime<Utc> {
        self.date.unwrap_or(self.created_at)
    }

    /// Whether this page takes part in prev/next navigation.
    pub fn is_content(&self) -> bool {
        !self.is_folder && !self.is_root && self.filename != "index"
    }

    /// Children visible on the folder's own page: the first chunk when paginated.
    pub fn visible_children(&self) -> &[Page] {
        match &self.pagination {
            Some(p) => p.chunks.first().map_or(&[][..], |r| &self.children[r.clone()]),
            None => &self.children,
        }
    }

    pub fn as_parent(&self) -> ParentRef {
        ParentRef {
            title: self.title.clone(),
            url: self.url.clone(),
            filename: self.filename.clone(),
        }
    }

    /// Link list entry for this page.
    pub fn link_item(&self, config: &SiteConfig) -> LinkItem {
        let mut item = LinkItem::new(&self.title, &self.url, &self.name);
        for (key, value) in self.meta.as_table() {
            item.vars.entry(key.clone()).or_insert_with(|| value.clone());
        }
        item.vars.insert(
            "date".into(),
            Value::String(date::format_date(&self.effective_date(), &config.date_format)),
        );
        item
    }

    /// Reading time in whole minutes, at least one.
    pub fn reading_time(&self, words_per_minute: u32) -> u64 {
        let words = self.body.split_whitespace().count() as u64;
        words.div_ceil(u64::from(words_per_minute.max(1))).max(1)
    }

    /// Substitution scope for rendering: merged metadata with page variables on top.
    pub fn scope(&self, config: &SiteConfig) -> Table {
        let mut scope = self.meta.as_table().clone();
        let fmt = &config.date_format;
        let mut set = |key: &str, value: Value| {
            scope.insert(key.to_string(), value);
        };
        set("title", self.title.clone().into());
        set("name", self.name.clone().into());
        set("url", self.url.clone().into());
        set("date", date::format_date(&self.effective_date(), fmt).into());
        set("created_at", date::format_date(&self.created_at, fmt).into());
        set("updated_at", date::format_date(&self.updated_at, fmt).into());
        set("reading_time", self.reading_time(config.words_per_minute).into());
        set("tags", Value::Array(self.tags.iter().cloned().map(Value::String).collect()));

        let links = &self.links;
        set("breadcrumbs", links.breadcrumbs.clone().into());
        set("links_to_tags", links.links_to_tags.clone().into());
        set("prev_page", links.prev_page.clone().into());
        set("next_page", links.next_page.clone().into());
        set("links_to_children", links.links_to_children.clone().into());
        set("links_to_siblings", links.links_to_siblings.clone().into());
        set(
            "links_to_self_and_siblings",
            links.links_to_self_and_siblings.clone().into(),
        );
        set("nav_links", links.nav_links.clone().into());
        set("pagination", links.pagination.clone().into());
        scope
    }

    /// Depth-first iterator over this page, its children and pagination pages.
    pub fn walk(&self) -> Vec<&Page> {
        let mut out = vec![self];
        for child in &self.children {
            out.extend(child.walk());
        }
        if let Some(p) = &self.pagination {
            for page in &p.pages {
                out.extend(page.walk());
            }
        }
        out
    }
}
