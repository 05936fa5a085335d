//! Content document loading: front matter plus body text.
//!
//! A content document starts with an optional YAML front matter block fenced
//! by `---` lines, followed by markdown:
//!
//! ```text
//! ---
//! title: First Post
//! date: 2024-03-15
//! tags: [rust, web]
//! ---
//! # Hello
//! ```
//!
//! The block is split off with `gray_matter` and parsed with `serde_yaml` into
//! the common [`Table`] representation, so front matter merges with folder
//! configuration like any other layer.

use crate::config::Table;
use gray_matter::engine::Engine;
use gray_matter::{Matter, Pod};
use serde_json::Value;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ContentError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed front matter: {0}")]
    FrontMatter(String),
}

/// Engine that hands back the raw front matter text.
///
/// Parsing is done afterwards with `serde_yaml` so malformed YAML is reported
/// as an error instead of being silently dropped.
struct RawFrontMatter;

impl Engine for RawFrontMatter {
    fn parse(content: &str) -> Result<Pod, gray_matter::Error> {
        Ok(Pod::String(content.to_string()))
    }
}

/// A parsed content document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub front_matter: Table,
    pub body: String,
}

/// Split and parse a content document.
pub fn parse_document(text: &str) -> Result<Document, ContentError> {
    let matter = Matter::<RawFrontMatter>::new();
    let parsed = matter
        .parse::<String>(text)
        .map_err(|e| ContentError::FrontMatter(e.to_string()))?;

    let raw = parsed.data.filter(|raw| !raw.trim().is_empty());
    let front_matter = match raw {
        None => Table::new(),
        Some(raw) => match serde_yaml::from_str::<Value>(&raw) {
            Ok(Value::Object(table)) => table,
            Ok(Value::Null) => Table::new(),
            Ok(_) => {
                return Err(ContentError::FrontMatter(
                    "front matter must be a key-value mapping".into(),
                ));
            }
            Err(e) => return Err(ContentError::FrontMatter(e.to_string())),
        },
    };

    Ok(Document {
        front_matter,
        body: parsed.content,
    })
}

/// Read and parse a content document from disk.
pub fn load(path: &Path) -> Result<Document, ContentError> {
    let text = fs::read_to_string(path)?;
    parse_document(&text)
}
