//! Page tree construction.
//!
//! Stage 1 of the build pipeline. Walks the content root and produces the
//! owned [`Page`] forest that annotation and rendering consume.
//!
//! ## Traversal
//!
//! ```text
//! pages/
//! ├── index.md            → /            (root page, "Home")
//! ├── about.md            → /about       (top level: in nav)
//! └── blog/               → /blog        (folder: link list of children)
//!     ├── config.yaml     page_size: 2, date_sort_order: asc
//!     ├── first-post.md   → /blog/first-post
//!     └── second-post.md  → /blog/second-post
//! ```
//!
//! Entries of one directory are loaded on the rayon pool; a folder's
//! aggregate step (ordering, pagination, link list) runs only after every
//! child, including nested folders, has been built.
//!
//! ## Registration
//!
//! Once the whole forest exists, a sequential post-order pass registers every
//! page in the [`PageIndex`] and every tag in the tag map. Both live in a
//! [`BuildContext`] owned by one [`build`] call, so nothing carries over
//! between builds. The synthetic tag pages are created last.

use crate::config::{self, Metadata, SortOrder, Table};
use crate::content;
use crate::date;
use crate::naming;
use crate::page::{Page, Pagination, ParentRef};
use crate::pagination;
use crate::template::TemplateEngine;
use crate::types::{BuildMode, LinkItem};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// URL of the synthesized tag index folder.
pub const TAGS_URL: &str = "/tags";

/// One registered page.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    pub url: String,
    pub title: String,
    pub name: String,
    pub in_nav: bool,
}

/// Every page of one build, in registration order.
#[derive(Debug, Default)]
pub struct PageIndex {
    pub entries: Vec<IndexEntry>,
    urls: HashSet<String>,
}

impl PageIndex {
    /// Register a page. Returns false if its URL is already taken.
    pub fn insert(&mut self, page: &Page) -> bool {
        if !self.urls.insert(page.url.clone()) {
            return false;
        }
        self.entries.push(IndexEntry {
            url: page.url.clone(),
            title: page.title.clone(),
            name: page.name.clone(),
            in_nav: page.in_nav,
        });
        true
    }

    pub fn contains(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One tag: the spelling it was first seen with and the pages carrying it.
#[derive(Debug, Clone, PartialEq)]
pub struct TagEntry {
    pub name: String,
    pub members: Vec<LinkItem>,
}

/// Accumulator state for one build.
#[derive(Debug)]
pub struct BuildContext {
    pub mode: BuildMode,
    pub now: DateTime<Utc>,
    /// Tag slug → tag. Spellings sharing a slug share one entry.
    pub tags: BTreeMap<String, TagEntry>,
    pub index: PageIndex,
}

impl BuildContext {
    pub fn new(mode: BuildMode, now: DateTime<Utc>) -> Self {
        Self {
            mode,
            now,
            tags: BTreeMap::new(),
            index: PageIndex::default(),
        }
    }

    /// Record `item` under `tag`. Tags without a usable slug are skipped.
    pub fn add_tag(&mut self, tag: &str, item: LinkItem) {
        let slug = naming::tag_slug(tag);
        if slug.is_empty() {
            warn!(tag, url = %item.url, "Tag has no usable characters, skipped");
            return;
        }
        let entry = self.tags.entry(slug).or_insert_with(|| TagEntry {
            name: tag.to_string(),
            members: Vec::new(),
        });
        if entry.name != tag {
            debug!(tag, kept = %entry.name, "Tag spellings share a page");
        }
        entry.members.push(item);
    }
}

/// The result of tree construction.
#[derive(Debug)]
pub struct SiteTree {
    /// Top-level pages: the root page, top-level entries, then the tags folder.
    pub pages: Vec<Page>,
    pub index: PageIndex,
    /// Tag slug → tag, sorted by slug.
    pub tags: BTreeMap<String, TagEntry>,
}

impl SiteTree {
    /// Every page in the forest, including pagination and tag pages.
    pub fn all_pages(&self) -> Vec<&Page> {
        self.pages.iter().flat_map(Page::walk).collect()
    }

    /// URLs of the pages carrying `tag` or any spelling with the same slug,
    /// in registration order.
    pub fn tag_urls(&self, tag: &str) -> Vec<&str> {
        self.tags
            .get(&naming::tag_slug(tag))
            .map(|entry| entry.members.iter().map(|i| i.url.as_str()).collect())
            .unwrap_or_default()
    }
}

/// Build the page tree for the project behind `engine`.
///
/// `site_meta` is the built-in defaults with the site configuration merged on
/// top; the content root's own configuration is layered over it here.
pub fn build(engine: &TemplateEngine<'_>, site_meta: &Metadata) -> SiteTree {
    PageTreeBuilder::new(engine, site_meta).build(Utc::now())
}

/// What a directory's entries need to know about the folder that holds them.
#[derive(Debug, Clone)]
struct FolderInfo {
    parent: ParentRef,
    layout: Option<String>,
}

pub struct PageTreeBuilder<'e, 'a> {
    engine: &'e TemplateEngine<'a>,
    site_meta: &'e Metadata,
    mode: BuildMode,
}

impl<'e, 'a> PageTreeBuilder<'e, 'a> {
    pub fn new(engine: &'e TemplateEngine<'a>, site_meta: &'e Metadata) -> Self {
        Self {
            engine,
            site_meta,
            mode: engine.mode(),
        }
    }

    /// Build the tree, judging scheduled pages against `now`.
    pub fn build(&self, now: DateTime<Utc>) -> SiteTree {
        let root_dir = &self.engine.paths().pages;
        let root_meta = config::resolve(root_dir, self.site_meta);
        let mut ctx = BuildContext::new(self.mode, now);

        let pages = self.build_dir(root_dir, None, &root_meta, now);
        let mut pages = self.register(&mut ctx, pages);

        if !ctx.tags.is_empty() && ctx.index.contains(TAGS_URL) {
            warn!(url = TAGS_URL, "A content page already uses the tags URL, tag pages skipped");
        } else if !ctx.tags.is_empty() {
            let tags_folder = self.tags_folder(&ctx.tags, &root_meta);
            pages.extend(self.register(&mut ctx, vec![tags_folder]));
        }

        info!(pages = ctx.index.len(), tags = ctx.tags.len(), "Page tree built");
        SiteTree {
            pages,
            index: ctx.index,
            tags: ctx.tags,
        }
    }

    // =========================================================================
    // Traversal
    // =========================================================================

    /// Build every entry of `dir`. `meta` is the directory's merged metadata.
    fn build_dir(
        &self,
        dir: &Path,
        folder: Option<&FolderInfo>,
        meta: &Metadata,
        now: DateTime<Utc>,
    ) -> Vec<Page> {
        let entries = match collect_entries(dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "Cannot read directory");
                return Vec::new();
            }
        };

        let built: Vec<Page> = entries
            .par_iter()
            .filter_map(|path| self.build_entry(path, folder, meta, now))
            .collect();

        let mut seen = HashSet::new();
        built
            .into_iter()
            .filter(|page| {
                let fresh = seen.insert(page.url.clone());
                if !fresh {
                    warn!(url = %page.url, "Duplicate URL, page dropped");
                }
                fresh
            })
            .collect()
    }

    fn build_entry(
        &self,
        path: &Path,
        folder: Option<&FolderInfo>,
        dir_meta: &Metadata,
        now: DateTime<Utc>,
    ) -> Option<Page> {
        let is_dir = path.is_dir();
        if !is_dir && !naming::is_content_file(path) {
            return None;
        }
        let file_name = path.file_name()?.to_string_lossy().into_owned();
        let stem = if is_dir {
            file_name.clone()
        } else {
            naming::entry_stem(&file_name).to_string()
        };
        let is_root = !is_dir && folder.is_none() && stem == "index";

        let (own, body) = if is_dir {
            (own_config(path), String::new())
        } else {
            match content::load(path) {
                Ok(doc) => (doc.front_matter, doc.body),
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "Skipping unreadable document");
                    return None;
                }
            }
        };
        let own_layer = Metadata::from_table(own.clone());
        let meta = dir_meta.overlay(&own);

        let relative = path.strip_prefix(&self.engine.paths().pages).unwrap_or(path);
        let url = if is_root {
            "/".to_string()
        } else {
            naming::url_for(relative)
        };
        let name = if is_root {
            "Home".to_string()
        } else {
            naming::display_name(&stem)
        };

        let mut page = Page::new(url, name);
        page.filename = stem;
        page.source = Some(path.to_path_buf());
        page.is_folder = is_dir;
        page.is_root = is_root;
        page.in_nav = folder.is_none() && !is_root;
        page.parent = folder.map(|f| f.parent.clone());
        page.title = own_layer.str("title").map_or_else(|| page.name.clone(), String::from);
        page.position = own_layer.u64("position");
        page.tags = own_layer.list("tags");
        page.date = own_layer.get("date").and_then(date::parse_value);
        page.draft = meta.flag("draft");
        page.layout = self.resolve_layout(&own_layer, folder, &meta);
        page.body = body;
        if let Ok(stat) = fs::metadata(path) {
            let modified = stat.modified().ok().map(date::from_system_time);
            let created = stat.created().ok().map(date::from_system_time).or(modified);
            page.created_at = created.unwrap_or(now);
            page.updated_at = modified.unwrap_or(now);
        }
        page.meta = meta;

        if !self.mode.is_preview() {
            if page.draft {
                debug!(url = %page.url, "Skipping draft");
                return None;
            }
            if page.date.is_some_and(|d| d > now) {
                debug!(url = %page.url, "Skipping scheduled page");
                return None;
            }
        }

        if is_dir {
            let info = FolderInfo {
                parent: page.as_parent(),
                layout: page.layout.clone(),
            };
            page.children = self.build_dir(path, Some(&info), &page.meta, now);
            self.finish_folder(&mut page);
        }
        Some(page)
    }

    /// Front matter layout, else the parent folder's same-named layout, else
    /// the parent's layout, else the configured default.
    fn resolve_layout(
        &self,
        own: &Metadata,
        folder: Option<&FolderInfo>,
        meta: &Metadata,
    ) -> Option<String> {
        if let Some(layout) = own.str("layout") {
            return Some(layout.to_string());
        }
        match folder {
            Some(f) if self.engine.has_layout(&f.parent.filename) => Some(f.parent.filename.clone()),
            Some(f) => f.layout.clone(),
            None => Some(
                meta.str("default_layout_name")
                    .unwrap_or(&self.engine.config().default_layout_name)
                    .to_string(),
            ),
        }
    }

    // =========================================================================
    // Folder aggregation
    // =========================================================================

    /// Order children, paginate and render the folder's link list.
    fn finish_folder(&self, folder: &mut Page) {
        let order = folder
            .meta
            .str("date_sort_order")
            .and_then(SortOrder::parse)
            .unwrap_or_default();
        sort_children(&mut folder.children, order);

        let config = self.engine.config();
        let items: Vec<LinkItem> = folder.children.iter().map(|c| c.link_item(config)).collect();
        let page_size = folder
            .meta
            .u64("page_size")
            .or_else(|| folder.meta.u64("page_count"))
            .unwrap_or(0) as usize;

        if page_size == 0 || folder.children.len() <= page_size {
            folder.body = self.engine.render_link_list(&folder.filename, &items);
            return;
        }

        let chunks = pagination::chunk_ranges(folder.children.len(), page_size);
        let total = chunks.len();
        let base_url = format!("{}/", folder.url);
        debug!(url = %folder.url, pages = total, "Paginating folder");

        folder.body = self.engine.render_link_list(&folder.filename, &items[chunks[0].clone()]);
        folder.links.pagination = pagination::render_nav(1, total, &base_url, config);

        let pages = chunks
            .iter()
            .enumerate()
            .skip(1)
            .map(|(i, range)| {
                let n = i + 1;
                let mut page = Page::new(format!("{}/page/{n}", folder.url), format!("{} - Page {n}", folder.name));
                page.title = format!("{} - Page {n}", folder.title);
                page.filename = n.to_string();
                page.layout = folder.layout.clone();
                page.parent = Some(folder.as_parent());
                page.meta = folder.meta.clone();
                page.meta.insert("title", page.title.clone());
                page.created_at = folder.created_at;
                page.updated_at = folder.updated_at;
                page.body = self.engine.render_link_list(&folder.filename, &items[range.clone()]);
                page.links.pagination = pagination::render_nav(n, total, &base_url, config);
                page
            })
            .collect();

        folder.pagination = Some(Pagination {
            page_size,
            chunks,
            pages,
        });
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Post-order registration; pages whose URL is already taken are dropped.
    fn register(&self, ctx: &mut BuildContext, pages: Vec<Page>) -> Vec<Page> {
        let config = self.engine.config();
        let mut kept = Vec::with_capacity(pages.len());
        for mut page in pages {
            page.children = self.register(ctx, std::mem::take(&mut page.children));
            if let Some(p) = page.pagination.as_mut() {
                p.pages = self.register(ctx, std::mem::take(&mut p.pages));
            }
            if !ctx.index.insert(&page) {
                warn!(url = %page.url, "Duplicate URL, page dropped");
                continue;
            }
            for tag in &page.tags {
                ctx.add_tag(tag, page.link_item(config));
            }
            kept.push(page);
        }
        kept
    }

    /// The "Tags" folder with one page per tag.
    fn tags_folder(&self, tags: &BTreeMap<String, TagEntry>, root_meta: &Metadata) -> Page {
        let layout = if self.engine.has_layout("tags") {
            "tags".to_string()
        } else {
            self.engine.config().default_layout_name.clone()
        };

        let mut folder = Page::new(TAGS_URL, "Tags");
        folder.title = "All Tags".into();
        folder.filename = "tags".into();
        folder.is_folder = true;
        folder.layout = Some(layout.clone());
        folder.meta = root_meta.clone();
        folder.meta.insert("title", folder.title.clone());
        let parent = folder.as_parent();

        folder.children = tags
            .iter()
            .map(|(slug, tag)| {
                let mut page = Page::new(format!("{TAGS_URL}/{slug}"), tag.name.clone());
                page.title = format!("Pages tagged with {}", naming::capitalize_words(&tag.name));
                page.filename = slug.clone();
                page.layout = Some(layout.clone());
                page.parent = Some(parent.clone());
                page.meta = root_meta.clone();
                page.meta.insert("title", page.title.clone());
                page.body = self.engine.render_link_list("tags", &tag.members);
                page
            })
            .collect();

        let entries: Vec<LinkItem> = folder
            .children
            .iter()
            .map(|p| LinkItem::new(&p.name, &p.url, &p.name))
            .collect();
        folder.body = self.engine.render_link_list("tags", &entries);
        folder
    }
}

/// Directory entries sorted by name, without hidden files.
fn collect_entries(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .is_some_and(|n| !n.to_string_lossy().starts_with('.'))
        })
        .collect();
    entries.sort();
    Ok(entries)
}

/// A directory's own configuration layer; malformed documents count as empty.
fn own_config(dir: &Path) -> Table {
    match config::load_raw_config(dir) {
        Ok(table) => table.unwrap_or_default(),
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "Ignoring malformed configuration");
            Table::new()
        }
    }
}

/// Order by `position` when every child has one, else by effective date.
/// The sort is stable, so ties keep traversal order.
pub fn sort_children(children: &mut [Page], order: SortOrder) {
    if children.iter().all(|c| c.position.is_some()) {
        children.sort_by_key(|c| c.position);
        return;
    }
    children.sort_by(|a, b| {
        let ord = a.effective_date().cmp(&b.effective_date());
        match order {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        }
    });
}
