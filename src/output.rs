//! CLI output formatting for the page tree and build results.
//!
//! Output is information-first: every page leads with its positional index,
//! title and URL; the source file follows as an indented `Source:` line.
//!
//! # Output Format
//!
//! ## Check
//!
//! ```text
//! Pages
//! 001 Home → /
//!     Source: pages/index.md
//! 002 Blog → /blog (5 pages, 2 more pagination pages)
//!     Source: pages/blog
//!     001 Second Post → /blog/second-post [draft]
//!         Source: pages/blog/second-post.md
//!
//! Tags
//!     rust (2) → /tags/rust
//! ```
//!
//! ## Build
//!
//! ```text
//! Built 12 pages into dist in 0.84s
//!     Assets: 3 copied
//!     Images: 2 processed, 5 fresh, 0 failed
//!     Feed: dist/blog/rss.xml
//!     Pruned: 1 stale file
//! ```
//!
//! Each `format_*` function is pure and returns lines; `print_*` wrappers
//! write them to stdout.

use crate::page::Page;
use crate::site::BuildReport;
use crate::tree::{SiteTree, TAGS_URL};
use std::path::Path;

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

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

/// Index, title and URL, with folder counts and draft marker.
///
/// ```text
/// 002 Blog → /blog (5 pages, 2 more pagination pages)
/// 001 WIP → /wip [draft]
/// ```
fn page_header(index: usize, page: &Page) -> String {
    let mut line = format!("{} {} → {}", format_index(index), page.title, page.url);
    if page.is_folder {
        let extra = page.pagination.as_ref().map_or(0, |p| p.pages.len());
        if extra > 0 {
            line.push_str(&format!(
                " ({}, {})",
                plural(page.children.len(), "page"),
                plural(extra, "more pagination page")
            ));
        } else {
            line.push_str(&format!(" ({})", plural(page.children.len(), "page")));
        }
    }
    if page.draft {
        line.push_str(" [draft]");
    }
    line
}

fn relative(path: &Path, root: &Path) -> String {
    path.strip_prefix(root).unwrap_or(path).display().to_string()
}

// ============================================================================
// Check: page tree
// ============================================================================

fn format_pages(pages: &[Page], depth: usize, root: &Path, lines: &mut Vec<String>) {
    for (i, page) in pages.iter().enumerate() {
        lines.push(format!("{}{}", indent(depth), page_header(i + 1, page)));
        if let Some(source) = &page.source {
            lines.push(format!("{}Source: {}", indent(depth + 1), relative(source, root)));
        }
        // The tag folder lists its own section below.
        if page.url != TAGS_URL {
            format_pages(&page.children, depth + 1, root, lines);
        }
    }
}

/// Format the built page tree and the tag index.
pub fn format_tree(tree: &SiteTree, root: &Path) -> Vec<String> {
    let mut lines = vec!["Pages".to_string()];
    format_pages(&tree.pages, 0, root, &mut lines);

    if !tree.tags.is_empty() {
        lines.push(String::new());
        lines.push("Tags".to_string());
        for (slug, tag) in &tree.tags {
            lines.push(format!(
                "{}{} ({}) → {}/{}",
                indent(1),
                tag.name,
                tag.members.len(),
                TAGS_URL,
                slug
            ));
        }
    }

    lines.push(String::new());
    lines.push(format!("{} in total", plural(tree.index.len(), "page")));
    lines
}

pub fn print_tree(tree: &SiteTree, root: &Path) {
    for line in format_tree(tree, root) {
        println!("{}", line);
    }
}

// ============================================================================
// Build report
// ============================================================================

/// Format the summary of a completed build.
pub fn format_build_report(report: &BuildReport, output: &Path) -> Vec<String> {
    let mut lines = vec![format!(
        "Built {} into {} in {:.2}s",
        plural(report.pages, "page"),
        output.display(),
        report.elapsed.as_secs_f64()
    )];
    if report.assets > 0 {
        lines.push(format!("{}Assets: {} copied", indent(1), report.assets));
    }
    let images = &report.images;
    if images.processed + images.skipped + images.failed > 0 {
        lines.push(format!(
            "{}Images: {} processed, {} fresh, {} failed",
            indent(1),
            images.processed,
            images.skipped,
            images.failed
        ));
    }
    for feed in &report.feeds {
        lines.push(format!("{}Feed: {}", indent(1), feed.display()));
    }
    if report.pruned > 0 {
        lines.push(format!("{}Pruned: {}", indent(1), plural(report.pruned, "stale file")));
    }
    lines
}

pub fn print_build_report(report: &BuildReport, output: &Path) {
    for line in format_build_report(report, output) {
        println!("{}", line);
    }
}
