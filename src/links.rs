//! Cross-page navigation, computed once the whole tree exists.
//!
//! Stage 2 of the build pipeline. Each page receives rendered HTML for:
//!
//! | Variable | Contents |
//! |----------|----------|
//! | `breadcrumbs` | parent's breadcrumbs + separator + link to this page |
//! | `links_to_tags` | one link per tag, to `/tags/<slug>` |
//! | `prev_page` / `next_page` | neighbours among content siblings |
//! | `links_to_children` | visible children, via the page's own fragment |
//! | `links_to_siblings` | siblings without this page, via the parent's fragment |
//! | `links_to_self_and_siblings` | all siblings, via the parent's fragment |
//! | `nav_links` | top-level entries, via the `nav` fragment |
//!
//! Pagination pages take the folder's breadcrumbs and nav list verbatim.

use crate::config::SiteConfig;
use crate::naming;
use crate::page::Page;
use crate::template::TemplateEngine;
use crate::tree::SiteTree;
use crate::types::LinkItem;
use maud::html;

/// Fragment used for sibling lists at the top level.
const TOP_LEVEL_FRAGMENT: &str = "pages";
/// Fragment used for the global navigation list.
const NAV_FRAGMENT: &str = "nav";

/// What the children of a page inherit from it.
struct ParentLinks<'p> {
    breadcrumbs: &'p str,
    filename: &'p str,
}

/// Fill in the navigation fields of every page in the tree.
pub fn annotate(tree: &mut SiteTree, engine: &TemplateEngine<'_>) {
    let nav_items: Vec<LinkItem> = tree
        .index
        .entries
        .iter()
        .filter(|e| e.in_nav)
        .map(|e| LinkItem::new(&e.title, &e.url, &e.name))
        .collect();
    let nav_links = engine.render_link_list(NAV_FRAGMENT, &nav_items);
    annotate_level(&mut tree.pages, None, engine, &nav_links);
}

fn annotate_level(
    pages: &mut [Page],
    parent: Option<&ParentLinks<'_>>,
    engine: &TemplateEngine<'_>,
    nav_links: &str,
) {
    let config = engine.config();
    let items: Vec<LinkItem> = pages.iter().map(|p| p.link_item(config)).collect();
    let sibling_fragment = parent.map_or(TOP_LEVEL_FRAGMENT, |p| p.filename);
    let self_and_siblings = engine.render_link_list(sibling_fragment, &items);
    let neighbours = content_neighbours(pages, config);

    for (i, page) in pages.iter_mut().enumerate() {
        let crumbs = breadcrumbs(page_crumb(page, config), parent, config);
        let tags = tag_links(&page.tags, config);
        let children = if page.is_folder {
            let visible: Vec<LinkItem> =
                page.visible_children().iter().map(|c| c.link_item(config)).collect();
            engine.render_link_list(&page.filename, &visible)
        } else {
            String::new()
        };
        let (prev, next) = neighbours[i].clone();

        page.links.breadcrumbs = crumbs;
        page.links.links_to_tags = tags;
        page.links.prev_page = prev;
        page.links.next_page = next;
        page.links.links_to_children = children;

        let others: Vec<LinkItem> = items
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != i)
            .map(|(_, item)| item.clone())
            .collect();
        page.links.links_to_siblings = engine.render_link_list(sibling_fragment, &others);
        page.links.links_to_self_and_siblings = self_and_siblings.clone();
        page.links.nav_links = nav_links.to_string();

        let inherited = ParentLinks {
            breadcrumbs: &page.links.breadcrumbs,
            filename: &page.filename,
        };
        annotate_level(&mut page.children, Some(&inherited), engine, nav_links);

        if let Some(pagination) = page.pagination.as_mut() {
            for extra in &mut pagination.pages {
                extra.links.breadcrumbs = page.links.breadcrumbs.clone();
                extra.links.nav_links = nav_links.to_string();
            }
        }
    }
}

/// This page's own breadcrumb segment; empty for the root page.
fn page_crumb(page: &Page, config: &SiteConfig) -> String {
    if page.is_root {
        return String::new();
    }
    let link = html! { a class=(config.breadcrumb_class) href=(page.url) { (page.name) } };
    format!(" {} {}", config.breadcrumb_separator, link.into_string())
}

fn breadcrumbs(crumb: String, parent: Option<&ParentLinks<'_>>, config: &SiteConfig) -> String {
    match parent {
        Some(p) => format!("{}{crumb}", p.breadcrumbs),
        None => {
            let home = html! { a class=(config.breadcrumb_class) href="/" { "Home" } };
            format!("{}{crumb}", home.into_string())
        }
    }
}

fn tag_links(tags: &[String], config: &SiteConfig) -> String {
    tags.iter()
        .filter_map(|tag| {
            let slug = naming::tag_slug(tag);
            if slug.is_empty() {
                return None;
            }
            let href = format!("/tags/{slug}");
            Some(html! { a class=(config.tag_class) href=(href) { (tag) } }.into_string())
        })
        .collect()
}

/// Prev/next links per page; only content pages get neighbours.
fn content_neighbours(pages: &[Page], config: &SiteConfig) -> Vec<(String, String)> {
    let class = [&config.prev_next_class, &config.link_class]
        .into_iter()
        .find(|c| !c.is_empty());
    let link = |page: &Page| {
        html! { a href=(page.url) class=[class] { (page.title) } }.into_string()
    };

    let content: Vec<usize> = (0..pages.len()).filter(|&i| pages[i].is_content()).collect();
    let mut out = vec![(String::new(), String::new()); pages.len()];
    for (k, &i) in content.iter().enumerate() {
        if k > 0 {
            out[i].0 = link(&pages[content[k - 1]]);
        }
        if let Some(&next) = content.get(k + 1) {
            out[i].1 = link(&pages[next]);
        }
    }
    out
}
