//! Shared test utilities for the quire test suite.
//!
//! Builds throwaway projects in a temp directory and provides page lookups
//! that panic with a clear message on a miss.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let fx = SiteFixture::new();
//! fx.write("pages/blog/a.md", &post("A", "2024-01-01", ""));
//! let tree = fx.annotated_tree(BuildMode::Production);
//!
//! let page = find_page(&tree.pages, "/blog/a");
//! assert_eq!(page.title, "A");
//! ```

use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

use crate::config::{SiteSettings, load_site_config};
use crate::links;
use crate::page::Page;
use crate::paths::SitePaths;
use crate::template::{Caches, TemplateEngine};
use crate::tree::{self, SiteTree};
use crate::types::BuildMode;

// =========================================================================
// Fixture setup
// =========================================================================

/// A project root in a temp directory, with output under `dist/`.
pub struct SiteFixture {
    pub tmp: TempDir,
    pub paths: SitePaths,
    pub caches: Caches,
}

impl SiteFixture {
    pub fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        let paths = SitePaths::new(tmp.path(), tmp.path().join("dist"));
        fs::create_dir_all(&paths.pages).unwrap();
        Self {
            tmp,
            paths,
            caches: Caches::new(),
        }
    }

    /// Write a file relative to the project root, creating parent directories.
    pub fn write(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.paths.root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    pub fn settings(&self) -> SiteSettings {
        load_site_config(&self.paths.root)
    }

    /// Construct the page tree without annotation.
    pub fn tree(&self, mode: BuildMode) -> SiteTree {
        let settings = self.settings();
        let engine = TemplateEngine::new(&self.paths, &settings.config, &self.caches, mode);
        tree::build(&engine, &settings.metadata)
    }

    /// Construct and annotate the page tree.
    pub fn annotated_tree(&self, mode: BuildMode) -> SiteTree {
        let settings = self.settings();
        let engine = TemplateEngine::new(&self.paths, &settings.config, &self.caches, mode);
        let mut tree = tree::build(&engine, &settings.metadata);
        links::annotate(&mut tree, &engine);
        tree
    }
}

/// A content document with a title, a date and extra front matter lines.
pub fn post(title: &str, date: &str, extra: &str) -> String {
    format!("---\ntitle: {title}\ndate: {date}\n{extra}---\nBody of {title}.\n")
}

// =========================================================================
// Page lookups: panic with a clear message on a miss
// =========================================================================

/// Every page in the forest, including pagination pages.
pub fn all_pages(pages: &[Page]) -> Vec<&Page> {
    pages.iter().flat_map(Page::walk).collect()
}

/// Every URL in the forest, in walk order.
pub fn all_urls(pages: &[Page]) -> Vec<String> {
    all_pages(pages).iter().map(|p| p.url.clone()).collect()
}

/// Find a page anywhere in the forest by URL. Panics if not found.
pub fn find_page<'a>(pages: &'a [Page], url: &str) -> &'a Page {
    all_pages(pages)
        .into_iter()
        .find(|p| p.url == url)
        .unwrap_or_else(|| panic!("page '{url}' not found. Available: {:?}", all_urls(pages)))
}

/// URLs of a folder's children, in order.
pub fn child_urls(page: &Page) -> Vec<&str> {
    page.children.iter().map(|c| c.url.as_str()).collect()
}

/// Whether the forest contains a page with this URL.
pub fn has_page(pages: &[Page], url: &str) -> bool {
    all_pages(pages).iter().any(|p| p.url == url)
}
