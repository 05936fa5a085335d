//! Pagination chunking and the page-number navigation bar.
//!
//! Page 1 of a paginated folder lives at the folder URL; pages 2..N live at
//! `<folder>/page/<n>/`:
//!
//! ```text
//! « Previous  1  [2]  3  Next »
//! ```

use crate::config::SiteConfig;
use maud::{Markup, html};
use std::ops::Range;

/// Partition `len` items into consecutive ranges of `size`; the last may be short.
pub fn chunk_ranges(len: usize, size: usize) -> Vec<Range<usize>> {
    if size == 0 {
        return vec![0..len];
    }
    (0..len)
        .step_by(size)
        .map(|start| start..(start + size).min(len))
        .collect()
}

/// URL of page `n` under `base_url` (which ends with `/`).
pub fn page_url(base_url: &str, n: usize) -> String {
    if n <= 1 {
        base_url.to_string()
    } else {
        format!("{base_url}page/{n}/")
    }
}

/// Render the navigation bar for page `current` of `total`.
///
/// Empty when there is only one page.
pub fn render_nav(current: usize, total: usize, base_url: &str, config: &SiteConfig) -> String {
    if total <= 1 {
        return String::new();
    }
    let link_class = &config.pagination_link_class;
    let prev_class = format!("{link_class} pagination_prev");
    let next_class = format!("{link_class} pagination_next");

    let mut entries: Vec<Markup> = Vec::with_capacity(total + 2);
    if current > 1 {
        entries.push(html! {
            a href=(page_url(base_url, current - 1)) class=(prev_class) { "« Previous" }
        });
    }
    for n in 1..=total {
        entries.push(if n == current {
            html! { span class=(config.pagination_current_class) { (n) } }
        } else {
            html! { a href=(page_url(base_url, n)) class=(link_class) { (n) } }
        });
    }
    if current < total {
        entries.push(html! {
            a href=(page_url(base_url, current + 1)) class=(next_class) { "Next »" }
        });
    }

    html! {
        nav class=(config.pagination_class) {
            @for (i, entry) in entries.iter().enumerate() {
                @if i > 0 { " " }
                (entry)
            }
        }
    }
    .into_string()
}
