//! Template resolution: placeholders, fragments, layouts and the site template.
//!
//! ## Placeholder Syntax
//!
//! | Syntax | Meaning |
//! |--------|---------|
//! | `{{ key }}` | page variable, merged metadata key, or data document (`{{ team.lead }}`) |
//! | `{{ partial: name }}` | include `partials/name.md` (markdown) or `partials/name.html` |
//! | `{{ content }}` | content marker in layouts |
//! | `<%= content %>` | content marker in `template.html` |
//!
//! Unknown keys are left in place verbatim.
//!
//! ## Code Protection
//!
//! Before anything is substituted, every code region (fenced block, inline code
//! span, `<pre>…</pre>`, `<code>…</code>`) is swapped for an opaque token and
//! restored afterwards, so placeholder syntax shown in documentation examples is
//! never rewritten. Fragment output is stashed the same way once resolved.
//!
//! ## Render Order
//!
//! ```text
//! body ──substitute──▶ markdown ──▶ layout ──▶ site template ──substitute──▶ document
//! ```
//!
//! The last pass resolves template-level placeholders (navigation, breadcrumbs)
//! exactly once, after structural assembly.

use crate::assets;
use crate::config::{SiteConfig, Table};
use crate::data;
use crate::page::Page;
use crate::paths::SitePaths;
use crate::serve::LIVE_RELOAD_SCRIPT;
use crate::types::{BuildMode, LinkItem};
use maud::{DOCTYPE, PreEscaped, html};
use pulldown_cmark::{Options, Parser, html as md_html};
use regex::{Captures, NoExpand, Regex};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, LazyLock, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

/// Nested fragment inclusions deeper than this are refused.
pub const MAX_FRAGMENT_DEPTH: usize = 16;

static CODE_REGION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```.*?```|`[^`]+`|<pre[^>]*>.*?</pre>|<code[^>]*>.*?</code>").unwrap()
});
static FRAGMENT_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*partial:\s*([\w-]+)\s*\}\}").unwrap());
static VARIABLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([^}\s]+)\s*\}\}").unwrap());
static STASH_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("\u{E000}(\\d+)\u{E001}").unwrap());
static CONTENT_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<%=\s*content\s*%>|\{\{\s*content\s*\}\}").unwrap());
static IMAGE_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(/images/[^"'\s()<>]+?)\.(?:png|jpe?g)\b"#).unwrap()
});

// =============================================================================
// Caches
// =============================================================================

/// Which caches a change invalidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheScope {
    /// Everything: layouts, fragments, the site template and data.
    All,
    /// The assembled site template and layouts (asset fingerprints changed).
    Templates,
    /// Structured data only.
    Data,
    /// Layouts, fragments and the site template.
    Structural,
}

/// A loaded fragment document.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    pub text: String,
    /// `.md` fragments are converted to HTML after substitution.
    pub markdown: bool,
}

/// Number of populated entries per cache, for reporting and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub layouts: usize,
    pub fragments: usize,
    pub template: bool,
    pub data: bool,
}

/// Name → text caches shared across builds.
///
/// Entries are loaded on first use (a miss is cached too) and live until
/// [`Caches::invalidate`] clears them; a build never clears them part-way.
#[derive(Debug, Default)]
pub struct Caches {
    layouts: Mutex<HashMap<String, Option<String>>>,
    fragments: Mutex<HashMap<String, Option<Fragment>>>,
    template: Mutex<Option<String>>,
    data: Mutex<Option<Arc<Table>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Caches {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn invalidate(&self, scope: CacheScope) {
        debug!(?scope, "Invalidating caches");
        let clear_layouts = matches!(scope, CacheScope::All | CacheScope::Templates | CacheScope::Structural);
        let clear_fragments = matches!(scope, CacheScope::All | CacheScope::Structural);
        let clear_data = matches!(scope, CacheScope::All | CacheScope::Data);
        if clear_layouts {
            lock(&self.layouts).clear();
            *lock(&self.template) = None;
        }
        if clear_fragments {
            lock(&self.fragments).clear();
        }
        if clear_data {
            *lock(&self.data) = None;
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            layouts: lock(&self.layouts).len(),
            fragments: lock(&self.fragments).len(),
            template: lock(&self.template).is_some(),
            data: lock(&self.data).is_some(),
        }
    }

    /// Layout text by name, loaded from the layouts root.
    pub fn layout(&self, paths: &SitePaths, name: &str) -> Option<String> {
        let mut layouts = lock(&self.layouts);
        layouts
            .entry(name.to_string())
            .or_insert_with(|| fs::read_to_string(paths.layout_file(name)).ok())
            .clone()
    }

    /// Fragment by name: `<name>.md` first, then `<name>.html`.
    pub fn fragment(&self, partials: &Path, name: &str) -> Option<Fragment> {
        let mut fragments = lock(&self.fragments);
        fragments
            .entry(name.to_string())
            .or_insert_with(|| load_fragment(partials, name))
            .clone()
    }

    /// The assembled site template, built by `load` on a miss.
    pub fn template(&self, load: impl FnOnce() -> String) -> String {
        lock(&self.template).get_or_insert_with(load).clone()
    }

    pub fn data(&self, dir: &Path) -> Arc<Table> {
        lock(&self.data)
            .get_or_insert_with(|| Arc::new(data::load_data(dir)))
            .clone()
    }
}

fn load_fragment(partials: &Path, name: &str) -> Option<Fragment> {
    for (ext, markdown) in [("md", true), ("html", false)] {
        if let Ok(text) = fs::read_to_string(partials.join(format!("{name}.{ext}"))) {
            return Some(Fragment { text, markdown });
        }
    }
    None
}

// =============================================================================
// Engine
// =============================================================================

/// Convert markdown to HTML. Raw HTML passes through.
pub fn markdown_to_html(markdown: &str) -> String {
    let options = Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS;
    let parser = Parser::new_ext(markdown, options);
    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    md_html::push_html(&mut out, parser);
    out
}

/// Replace every content marker in `container` with `content`, literally.
pub fn wrap_content(container: &str, content: &str) -> String {
    CONTENT_MARKER
        .replace_all(container, NoExpand(content))
        .into_owned()
}

/// Resolves placeholders and assembles documents for one build.
pub struct TemplateEngine<'a> {
    paths: &'a SitePaths,
    config: &'a SiteConfig,
    caches: &'a Caches,
    data: Arc<Table>,
    imports: String,
    mode: BuildMode,
}

impl<'a> TemplateEngine<'a> {
    pub fn new(paths: &'a SitePaths, config: &'a SiteConfig, caches: &'a Caches, mode: BuildMode) -> Self {
        Self {
            data: caches.data(&paths.data),
            imports: assets::import_tags(&paths.css, &paths.js),
            paths,
            config,
            caches,
            mode,
        }
    }

    pub fn config(&self) -> &SiteConfig {
        self.config
    }

    pub fn paths(&self) -> &SitePaths {
        self.paths
    }

    pub fn mode(&self) -> BuildMode {
        self.mode
    }

    /// Whether a layout with this name exists.
    pub fn has_layout(&self, name: &str) -> bool {
        self.caches.layout(self.paths, name).is_some()
    }

    /// Substitute variables and fragments in `text`, leaving code regions intact.
    pub fn substitute(&self, text: &str, scope: &Table) -> String {
        self.expand(text, scope, &mut Vec::new(), false)
    }

    /// Resolve a fragment by name against `scope`, as HTML.
    pub fn include_fragment(&self, name: &str, scope: &Table) -> String {
        self.fragment_html(name, scope, &mut Vec::new())
    }

    /// Render a link list through the fragment `name`.
    ///
    /// Falls back to the default link fragment, then to plain `<li>` links.
    /// Entries are joined with newlines.
    pub fn render_link_list(&self, name: &str, items: &[LinkItem]) -> String {
        let partials = &self.paths.partials;
        let fragment = self
            .caches
            .fragment(partials, name)
            .or_else(|| self.caches.fragment(partials, &self.config.default_link_name));

        let entries: Vec<String> = match fragment {
            Some(fragment) => items
                .iter()
                .map(|item| self.substitute(&fragment.text, &item.vars))
                .collect(),
            None => items
                .iter()
                .map(|item| default_link(item, &self.config.link_class))
                .collect(),
        };
        entries.join("\n")
    }

    /// Render a page into its final document.
    pub fn render(&self, page: &Page) -> String {
        let scope = page.scope(self.config);
        let body = self.substitute(&page.body, &scope);
        let html = markdown_to_html(&body);

        let wrapped = match page.layout.as_deref() {
            Some(name) => match self.caches.layout(self.paths, name) {
                Some(layout) => wrap_content(&layout, &html),
                None => {
                    debug!(page = %page.url, layout = name, "Layout not found, rendering unwrapped");
                    html
                }
            },
            None => html,
        };

        let template = self.caches.template(|| self.assemble_template());
        let document = wrap_content(&template, &wrapped);
        self.expand(&document, &scope, &mut Vec::new(), true)
    }

    /// Load `template.html` (or the built-in one) and insert asset imports
    /// before `</head>`; in preview mode the live-reload client goes before `</body>`.
    fn assemble_template(&self) -> String {
        let mut template = match fs::read_to_string(&self.paths.template) {
            Ok(text) => text,
            Err(_) => {
                warn!(path = %self.paths.template.display(), "Site template not found, using the built-in template");
                builtin_template(&self.config.language)
            }
        };
        if !self.imports.is_empty() {
            template = insert_before(&template, "</head>", &self.imports);
        }
        if self.mode.is_preview() {
            let script = format!("<script>{LIVE_RELOAD_SCRIPT}</script>");
            template = insert_before(&template, "</body>", &script);
        }
        template
    }

    fn expand(&self, text: &str, scope: &Table, stack: &mut Vec<String>, rewrite_images: bool) -> String {
        let mut stash: Vec<String> = Vec::new();

        let protected = CODE_REGION.replace_all(text, |caps: &Captures| stash_token(&mut stash, &caps[0]));

        let with_fragments = FRAGMENT_REF.replace_all(&protected, |caps: &Captures| {
            let html = self.fragment_html(&caps[1], scope, stack);
            stash_token(&mut stash, &html)
        });

        let substituted = VARIABLE.replace_all(&with_fragments, |caps: &Captures| {
            self.lookup(&caps[1], scope)
                .unwrap_or_else(|| caps[0].to_string())
        });

        let rewritten = if rewrite_images {
            IMAGE_REF.replace_all(&substituted, "${1}.webp").into_owned()
        } else {
            substituted.into_owned()
        };

        STASH_TOKEN
            .replace_all(&rewritten, |caps: &Captures| {
                caps[1]
                    .parse::<usize>()
                    .ok()
                    .and_then(|i| stash.get(i).cloned())
                    .unwrap_or_default()
            })
            .into_owned()
    }

    fn fragment_html(&self, name: &str, scope: &Table, stack: &mut Vec<String>) -> String {
        if stack.iter().any(|n| n == name) || stack.len() >= MAX_FRAGMENT_DEPTH {
            warn!(fragment = name, chain = %stack.join(" > "), "Recursive fragment inclusion skipped");
            return format!("<p>Include \"{name}\" skipped: recursive inclusion.</p>");
        }
        let Some(fragment) = self.caches.fragment(&self.paths.partials, name) else {
            warn!(fragment = name, "Fragment not found");
            return format!("<p>Include \"{name}\" not found.</p>");
        };

        stack.push(name.to_string());
        let expanded = self.expand(&fragment.text, scope, stack, false);
        stack.pop();

        if fragment.markdown {
            markdown_to_html(&expanded)
        } else {
            expanded
        }
    }

    /// Dotted lookup: page scope first, then data documents.
    fn lookup(&self, key: &str, scope: &Table) -> Option<String> {
        let mut parts = key.split('.');
        let head = parts.next()?;
        let root = match scope.get(head) {
            Some(value) => value,
            None if head == "data" => self.data.get(parts.next()?)?,
            None => self.data.get(head)?,
        };
        descend(root, parts).map(render_value)
    }
}

fn stash_token(stash: &mut Vec<String>, text: &str) -> String {
    stash.push(text.to_string());
    format!("\u{E000}{}\u{E001}", stash.len() - 1)
}

fn insert_before(text: &str, marker: &str, insert: &str) -> String {
    match text.rfind(marker) {
        Some(pos) => format!("{}{}\n{}", &text[..pos], insert, &text[pos..]),
        None => text.to_string(),
    }
}

fn descend<'v, 'k>(mut value: &'v Value, parts: impl Iterator<Item = &'k str>) -> Option<&'v Value> {
    for part in parts {
        value = match value {
            Value::Object(map) => map.get(part)?,
            Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(value)
}

fn render_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items
            .iter()
            .map(render_value)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(_) => value.to_string(),
    }
}

fn default_link(item: &LinkItem, class: &str) -> String {
    let class = (!class.is_empty()).then_some(class);
    html! { li { a href=(item.url) class=[class] { (item.title) } } }.into_string()
}

/// Minimal document used when the project has no `template.html`.
fn builtin_template(language: &str) -> String {
    html! {
        (DOCTYPE)
        html lang=(language) {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { "{{ title }} | {{ sitename }}" }
            }
            body {
                header {
                    nav { ul { "{{ nav_links }}" } }
                    p.breadcrumbs { "{{ breadcrumbs }}" }
                }
                main { (PreEscaped("<%= content %>")) }
                footer { "{{ pagination }}" }
            }
        }
    }
    .into_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::PathBuf;
    use tempfile::TempDir;

    struct Fixture {
        _tmp: TempDir,
        paths: SitePaths,
        config: SiteConfig,
        caches: Caches,
    }

    impl Fixture {
        fn new() -> Self {
            let tmp = TempDir::new().unwrap();
            let paths = SitePaths::new(tmp.path(), tmp.path().join("dist"));
            Self {
                _tmp: tmp,
                paths,
                config: SiteConfig::default(),
                caches: Caches::new(),
            }
        }

        fn write(&self, relative: &str, content: &str) -> PathBuf {
            let path = self.paths.root.join(relative);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, content).unwrap();
            path
        }

        fn engine(&self) -> TemplateEngine<'_> {
            TemplateEngine::new(&self.paths, &self.config, &self.caches, BuildMode::Production)
        }
    }

    fn scope(value: Value) -> Table {
        match value {
            Value::Object(t) => t,
            _ => panic!("expected object"),
        }
    }

    // =========================================================================
    // Variable substitution
    // =========================================================================

    #[test]
    fn substitutes_known_and_keeps_unknown() {
        let fx = Fixture::new();
        let out = fx
            .engine()
            .substitute("Hi {{ name }}, {{missing}}!", &scope(json!({"name": "Ada"})));
        assert_eq!(out, "Hi Ada, {{missing}}!");
    }

    #[test]
    fn fenced_code_is_byte_identical() {
        let fx = Fixture::new();
        let text = "{{var}}\n\n```\nuse `{{var}}` here {{ var }}\n```\n";
        let out = fx.engine().substitute(text, &scope(json!({"var": "X"})));
        assert_eq!(out, "X\n\n```\nuse `{{var}}` here {{ var }}\n```\n");
    }

    #[test]
    fn inline_code_and_pre_blocks_are_protected() {
        let fx = Fixture::new();
        let text = "`{{a}}` {{a}} <pre>{{a}}</pre> <code class=\"x\">{{ a }}</code>";
        let out = fx.engine().substitute(text, &scope(json!({"a": "1"})));
        assert_eq!(out, "`{{a}}` 1 <pre>{{a}}</pre> <code class=\"x\">{{ a }}</code>");
    }

    #[test]
    fn substituted_values_are_not_rescanned() {
        let fx = Fixture::new();
        let out = fx
            .engine()
            .substitute("{{a}}", &scope(json!({"a": "{{b}}", "b": "no"})));
        assert_eq!(out, "{{b}}");
    }

    #[test]
    fn dotted_lookup_into_scope_and_data() {
        let fx = Fixture::new();
        fx.write("data/team.yaml", "lead: Ada\nmembers: [Ada, Bo]\n");
        let engine = fx.engine();
        let vars = scope(json!({"social": {"github": "ada"}}));
        assert_eq!(engine.substitute("{{ social.github }}", &vars), "ada");
        assert_eq!(engine.substitute("{{ team.lead }}", &vars), "Ada");
        assert_eq!(engine.substitute("{{ data.team.lead }}", &vars), "Ada");
        assert_eq!(engine.substitute("{{ team.members }}", &vars), "Ada, Bo");
        assert_eq!(engine.substitute("{{ team.members.1 }}", &vars), "Bo");
        assert_eq!(engine.substitute("{{ team.nope }}", &vars), "{{ team.nope }}");
    }

    #[test]
    fn scope_shadows_data() {
        let fx = Fixture::new();
        fx.write("data/title.json", r#""from data""#);
        let out = fx.engine().substitute("{{ title }}", &scope(json!({"title": "page"})));
        assert_eq!(out, "page");
    }

    // =========================================================================
    // Fragments
    // =========================================================================

    #[test]
    fn markdown_fragment_is_resolved_and_converted() {
        let fx = Fixture::new();
        fx.write("partials/greeting.md", "Hello **{{ name }}**");
        let out = fx
            .engine()
            .substitute("{{ partial: greeting }}", &scope(json!({"name": "Ada"})));
        assert_eq!(out.trim(), "<p>Hello <strong>Ada</strong></p>");
    }

    #[test]
    fn html_fragment_is_inserted_verbatim() {
        let fx = Fixture::new();
        fx.write("partials/footer.html", "<footer>{{ sitename }}</footer>");
        let out = fx
            .engine()
            .substitute("{{partial:footer}}", &scope(json!({"sitename": "S"})));
        assert_eq!(out, "<footer>S</footer>");
    }

    #[test]
    fn nested_fragments_resolve() {
        let fx = Fixture::new();
        fx.write("partials/outer.html", "[{{ partial: inner }}]");
        fx.write("partials/inner.html", "<b>{{ x }}</b>");
        let out = fx.engine().include_fragment("outer", &scope(json!({"x": "y"})));
        assert_eq!(out, "[<b>y</b>]");
    }

    #[test]
    fn missing_fragment_renders_marker() {
        let fx = Fixture::new();
        let out = fx.engine().substitute("{{ partial: nope }}", &Table::new());
        assert_eq!(out, "<p>Include \"nope\" not found.</p>");
    }

    #[test]
    fn self_inclusion_is_cut_off() {
        let fx = Fixture::new();
        fx.write("partials/loop.html", "a{{ partial: loop }}");
        let out = fx.engine().include_fragment("loop", &Table::new());
        assert_eq!(out, "a<p>Include \"loop\" skipped: recursive inclusion.</p>");
    }

    #[test]
    fn mutual_inclusion_is_cut_off() {
        let fx = Fixture::new();
        fx.write("partials/ping.html", "ping {{ partial: pong }}");
        fx.write("partials/pong.html", "pong {{ partial: ping }}");
        let out = fx.engine().include_fragment("ping", &Table::new());
        assert!(out.starts_with("ping pong <p>Include \"ping\" skipped"));
    }

    #[test]
    fn fragment_reference_inside_code_is_not_included() {
        let fx = Fixture::new();
        fx.write("partials/x.html", "SHOULD NOT APPEAR");
        let out = fx.engine().substitute("`{{ partial: x }}`", &Table::new());
        assert_eq!(out, "`{{ partial: x }}`");
    }

    // =========================================================================
    // Link lists
    // =========================================================================

    #[test]
    fn link_list_without_fragment_uses_plain_links() {
        let fx = Fixture::new();
        let items = vec![LinkItem::new("A & B", "/a", "A"), LinkItem::new("C", "/c", "C")];
        let out = fx.engine().render_link_list("blog", &items);
        assert_eq!(
            out,
            "<li><a href=\"/a\">A &amp; B</a></li>\n<li><a href=\"/c\">C</a></li>"
        );
    }

    #[test]
    fn link_list_uses_named_then_default_fragment() {
        let fx = Fixture::new();
        fx.write("partials/links.md", "* [{{ title }}]({{ url }})");
        let items = vec![LinkItem::new("A", "/a", "A")];
        assert_eq!(fx.engine().render_link_list("blog", &items), "* [A](/a)");

        fx.write("partials/blog.md", "<article>{{ title }} {{ date }}</article>");
        fx.caches.invalidate(CacheScope::Structural);
        let items = vec![LinkItem::new("A", "/a", "A").with_var("date", "today")];
        assert_eq!(
            fx.engine().render_link_list("blog", &items),
            "<article>A today</article>"
        );
    }

    #[test]
    fn link_list_class_is_applied() {
        let mut fx = Fixture::new();
        fx.config.link_class = "lnk".into();
        let out = fx.engine().render_link_list("x", &[LinkItem::new("A", "/a", "A")]);
        assert_eq!(out, "<li><a href=\"/a\" class=\"lnk\">A</a></li>");
    }

    // =========================================================================
    // Document assembly
    // =========================================================================

    fn page(body: &str, layout: Option<&str>) -> Page {
        let mut page = Page::new("/post", "Post");
        page.body = body.to_string();
        page.layout = layout.map(String::from);
        page.links.nav_links = "<li>NAV</li>".into();
        page
    }

    #[test]
    fn layout_and_template_wrap_the_body() {
        let fx = Fixture::new();
        fx.write("template.html", "<html><head></head><body><%= content %><ul>{{ nav_links }}</ul></body></html>");
        fx.write("layouts/post.html", "<article>{{ content }}</article><h1>{{ title }}</h1>");
        let out = fx.engine().render(&page("Some *text*", Some("post")));
        assert_eq!(
            out,
            "<html><head></head><body><article><p>Some <em>text</em></p>\n</article><h1>Post</h1><ul><li>NAV</li></ul></body></html>"
        );
    }

    #[test]
    fn missing_layout_passes_through() {
        let fx = Fixture::new();
        fx.write("template.html", "<body><%= content %></body>");
        let out = fx.engine().render(&page("plain", Some("absent")));
        assert_eq!(out, "<body><p>plain</p>\n</body>");
    }

    #[test]
    fn dollar_signs_in_content_survive_wrapping() {
        let fx = Fixture::new();
        fx.write("template.html", "<%= content %>");
        let out = fx.engine().render(&page("costs $1 and $0", None));
        assert_eq!(out, "<p>costs $1 and $0</p>\n");
    }

    #[test]
    fn code_blocks_survive_the_final_pass() {
        let fx = Fixture::new();
        fx.write("template.html", "<%= content %>");
        let out = fx.engine().render(&page("```\n{{ title }}\n```\n\n{{ title }}", None));
        assert!(out.contains("<code>{{ title }}\n</code>"));
        assert!(out.contains("<p>Post</p>"));
    }

    #[test]
    fn image_references_are_rewritten_outside_code() {
        let fx = Fixture::new();
        fx.write("template.html", "<%= content %>");
        let out = fx
            .engine()
            .render(&page("![a](/images/cat.PNG)\n\n`/images/dog.png`", None));
        assert!(out.contains("src=\"/images/cat.webp\""));
        assert!(out.contains("<code>/images/dog.png</code>"));
    }

    #[test]
    fn imports_and_live_reload_are_injected() {
        let fx = Fixture::new();
        fx.write("template.html", "<head></head><body><%= content %></body>");
        fx.write("css/site.css", "body {}");
        let engine = TemplateEngine::new(&fx.paths, &fx.config, &fx.caches, BuildMode::Preview);
        let out = engine.render(&page("x", None));
        assert!(out.contains("<link rel=\"stylesheet\" href=\"/css/site.css?v="));
        assert!(out.contains("__livereload"));
        let head_end = out.find("</head>").unwrap();
        assert!(out.find("/css/site.css").unwrap() < head_end);
    }

    #[test]
    fn builtin_template_is_used_when_missing() {
        let fx = Fixture::new();
        let mut page = page("hello", None);
        page.meta.insert("sitename", "My Site");
        let out = fx.engine().render(&page);
        assert!(out.starts_with("<!DOCTYPE html>"));
        assert!(out.contains("<title>Post | My Site</title>"));
        assert!(out.contains("<main><p>hello</p>\n</main>"));
        assert!(out.contains("<li>NAV</li>"));
    }

    // =========================================================================
    // Cache invalidation
    // =========================================================================

    #[test]
    fn invalidation_scopes() {
        let fx = Fixture::new();
        fx.write("template.html", "<%= content %>");
        fx.write("layouts/post.html", "{{ content }}");
        fx.write("partials/f.md", "f");
        let engine = fx.engine();
        engine.render(&page("{{ partial: f }}", Some("post")));

        let full = CacheStats { layouts: 1, fragments: 1, template: true, data: true };
        assert_eq!(fx.caches.stats(), full);

        fx.caches.invalidate(CacheScope::Data);
        assert_eq!(fx.caches.stats(), CacheStats { data: false, ..full });

        fx.caches.invalidate(CacheScope::Templates);
        assert_eq!(
            fx.caches.stats(),
            CacheStats { layouts: 0, fragments: 1, template: false, data: false }
        );

        fx.caches.invalidate(CacheScope::All);
        assert_eq!(fx.caches.stats(), CacheStats::default());
    }

    #[test]
    fn cached_layout_survives_file_edit_until_invalidated() {
        let fx = Fixture::new();
        fx.write("layouts/post.html", "old");
        assert_eq!(fx.caches.layout(&fx.paths, "post").as_deref(), Some("old"));
        fx.write("layouts/post.html", "new");
        assert_eq!(fx.caches.layout(&fx.paths, "post").as_deref(), Some("old"));
        fx.caches.invalidate(CacheScope::Structural);
        assert_eq!(fx.caches.layout(&fx.paths, "post").as_deref(), Some("new"));
    }
}
