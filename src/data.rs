//! Structured data exposed to templates.
//!
//! Every document in `data/` is parsed and stored under its file stem, so
//! `data/team.yaml` is reachable as `{{ team.lead }}` (or `{{ data.team.lead }}`).
//! Unparsable documents are skipped with a warning.

use crate::config::{self, Table};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

const DATA_EXTENSIONS: &[&str] = &["json", "yaml", "yml", "toml"];

/// Load every data document in `dir`. A missing directory yields an empty table.
pub fn load_data(dir: &Path) -> Table {
    let mut table = Table::new();
    let Ok(entries) = fs::read_dir(dir) else {
        return table;
    };

    let mut paths: Vec<_> = entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| DATA_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        })
        .collect();
    paths.sort();

    for path in paths {
        let Some(stem) = path.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
            continue;
        };
        let parsed = fs::read_to_string(&path)
            .map_err(config::ConfigError::from)
            .and_then(|text| config::parse_document(&path, &text));
        match parsed {
            Ok(value) => {
                if table.contains_key(&stem) {
                    warn!(file = %path.display(), "Duplicate data name '{stem}', keeping the first");
                    continue;
                }
                debug!(name = %stem, "Loaded data document");
                table.insert(stem, value);
            }
            Err(e) => warn!(file = %path.display(), error = %e, "Skipping unreadable data document"),
        }
    }
    table
}
