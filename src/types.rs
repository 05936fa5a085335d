//! Shared types used across the build pipeline.

use crate::config::Table;
use serde_json::Value;

/// Whether unpublished content is rendered.
///
/// `Production` omits drafts and future-dated pages. `Preview` (watch mode)
/// renders everything and injects the live-reload client into each document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BuildMode {
    #[default]
    Production,
    Preview,
}

impl BuildMode {
    pub fn is_preview(self) -> bool {
        matches!(self, Self::Preview)
    }
}

/// One entry of a rendered link list.
///
/// `vars` is the substitution scope used when the list is rendered through a
/// fragment; it always carries `title`, `url` and `name`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkItem {
    pub title: String,
    pub url: String,
    pub vars: Table,
}

impl LinkItem {
    pub fn new(title: impl Into<String>, url: impl Into<String>, name: impl Into<String>) -> Self {
        let title = title.into();
        let url = url.into();
        let mut vars = Table::new();
        vars.insert("title".into(), Value::String(title.clone()));
        vars.insert("url".into(), Value::String(url.clone()));
        vars.insert("name".into(), Value::String(name.into()));
        Self { title, url, vars }
    }

    /// Add an extra substitution variable.
    pub fn with_var(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.vars.insert(key.to_string(), value.into());
        self
    }
}
