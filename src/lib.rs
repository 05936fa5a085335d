//! # Quire
//!
//! A static site generator for Markdown sites. The filesystem is the data
//! source: directories become folders with link-list index pages, Markdown
//! files become pages, and configuration documents cascade from the site
//! root down through every directory.
//!
//! # Architecture: Two-Phase Build
//!
//! ```text
//! 1. Construct   pages/  →  SiteTree   (front matter, config cascade,
//!                                       ordering, pagination, tag pages)
//! 2. Annotate    SiteTree → SiteTree   (breadcrumbs, nav, siblings,
//!                                       prev/next, tag links)
//! 3. Render      SiteTree → dist/      (fragments, layouts, site template,
//!                                       feeds, assets, images)
//! ```
//!
//! Annotation needs the finished tree: nav lists, sibling lists and tag
//! links refer to pages that do not exist until the traversal has joined.
//! The two phases stay separate for that reason.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | Layered configuration: stock defaults, site document, folder documents, front matter |
//! | [`content`] | Front matter / body split for content documents |
//! | [`tree`] | Page tree construction, pagination pages, tag index and tag pages |
//! | [`links`] | Navigation annotation pass over the finished tree |
//! | [`template`] | Fragment inclusion, layouts, site template, variable substitution, caches |
//! | [`pagination`] | Chunking and the pagination nav block |
//! | [`feed`] | RSS feeds for configured folders |
//! | [`assets`] | Style/script copying with fingerprinted import tags, image pipeline |
//! | [`imaging`] | Pure-Rust image resize and WebP encode behind [`imaging::ImageBackend`] |
//! | [`data`] | Structured data documents exposed to templates |
//! | [`site`] | Whole-site build orchestration and stale output pruning |
//! | [`watch`] | Rebuild coordinator: change classification, cache invalidation, debouncing |
//! | [`serve`] | Development server with long-poll live reload |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Per-Build Context
//!
//! The tag index and the page index are owned by a build context created for
//! each construction pass and dropped when it returns. Nothing about one
//! build leaks into the next; only the template caches persist, and those are
//! cleared explicitly by the rebuild coordinator.
//!
//! ## Contained Failures
//!
//! A missing layout, an unparsable folder config or broken front matter
//! degrades one page and logs a warning. Only output write failures abort a
//! build, and in watch mode even those just return the coordinator to idle.

pub mod assets;
pub mod config;
pub mod content;
pub mod data;
pub mod date;
pub mod feed;
pub mod imaging;
pub mod links;
pub mod naming;
pub mod output;
pub mod page;
pub mod pagination;
pub mod paths;
pub mod serve;
pub mod site;
pub mod template;
pub mod tree;
pub mod types;
pub mod watch;

#[cfg(test)]
pub(crate) mod test_helpers;
