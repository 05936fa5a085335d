//! Names, titles and URL segments derived from source filenames.
//!
//! Every content entry is addressed by its path relative to the content root
//! with the markdown extension removed:
//!
//! - `pages/about.md` → `/about`, displayed as "About"
//! - `pages/blog/my-first-post.md` → `/blog/my-first-post`, displayed as "My First Post"
//! - `pages/blog/` → `/blog`, displayed as "Blog"
//!
//! Dashes in the stem become spaces in the display name, and each word is
//! capitalized.

use std::path::Path;

/// Extensions recognized as content documents.
pub const CONTENT_EXTENSIONS: &[&str] = &["md", "markdown"];

/// Whether `path` names a content document by extension.
pub fn is_content_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| CONTENT_EXTENSIONS.iter().any(|c| e.eq_ignore_ascii_case(c)))
}

/// Filename without its content extension: `my-post.md` → `my-post`.
pub fn entry_stem(file_name: &str) -> &str {
    CONTENT_EXTENSIONS
        .iter()
        .find_map(|ext| {
            let suffix_len = ext.len() + 1;
            let split = file_name.len().checked_sub(suffix_len)?;
            let (stem, suffix) = file_name.split_at_checked(split)?;
            (suffix.starts_with('.') && suffix[1..].eq_ignore_ascii_case(ext)).then_some(stem)
        })
        .unwrap_or(file_name)
}

/// Uppercase the first letter of every word.
///
/// A word starts after any non-alphanumeric character, so `"rust-lang tips"`
/// becomes `"Rust-Lang Tips"`.
pub fn capitalize_words(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut at_word_start = true;
    for c in text.chars() {
        if at_word_start && c.is_alphanumeric() {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        at_word_start = !c.is_alphanumeric();
    }
    out
}

/// Display name for a filename stem: dashes become spaces, words capitalized.
///
/// - `"my-first-post"` → `"My First Post"`
/// - `"about"` → `"About"`
pub fn display_name(stem: &str) -> String {
    capitalize_words(&stem.replace('-', " "))
}

/// URL path for a source entry, relative to the content root.
///
/// Path separators are normalized to `/` and the content extension is removed.
pub fn url_for(relative: &Path) -> String {
    let segments: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    let mut url = String::new();
    let last = segments.len().saturating_sub(1);
    for (i, segment) in segments.iter().enumerate() {
        url.push('/');
        if i == last {
            url.push_str(entry_stem(segment));
        } else {
            url.push_str(segment);
        }
    }
    if url.is_empty() { "/".to_string() } else { url }
}

/// URL-safe slug for a tag: lowercase, runs of non-alphanumerics become `-`.
///
/// - `"Rust"` → `"rust"`
/// - `"Static Sites"` → `"static-sites"`
/// - `"C++ tips!"` → `"c-tips"`
pub fn tag_slug(tag: &str) -> String {
    let mut slug = String::with_capacity(tag.len());
    let mut pending_dash = false;
    for c in tag.trim().chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}
