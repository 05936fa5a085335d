//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use quire::imaging::{BackendError, Dimensions, ImageBackend, OptimizeParams};
use quire::paths::SitePaths;
use quire::site::Site;
use quire::types::BuildMode;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Backend that copies the source bytes to the output path.
pub struct CopyBackend;

impl ImageBackend for CopyBackend {
    fn optimize(&self, params: &OptimizeParams) -> Result<Dimensions, BackendError> {
        if let Some(parent) = params.output.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(&params.source, &params.output)?;
        Ok(Dimensions { width: 1, height: 1 })
    }
}

pub struct Project {
    pub tmp: TempDir,
    pub paths: SitePaths,
}

impl Project {
    /// An empty project with a bare site template.
    pub fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        let paths = SitePaths::new(tmp.path(), tmp.path().join("dist"));
        fs::create_dir_all(&paths.pages).unwrap();
        let project = Self { tmp, paths };
        project.write("template.html", "<html><head></head><body><%= content %></body></html>");
        project
    }

    pub fn write(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.paths.root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    pub fn site(&self, mode: BuildMode) -> Site<CopyBackend> {
        Site::new(self.paths.clone(), mode, CopyBackend)
    }

    pub fn out(&self, relative: &str) -> PathBuf {
        self.paths.output.join(relative)
    }

    pub fn read_out(&self, relative: &str) -> String {
        let path = self.out(relative);
        fs::read_to_string(&path).unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()))
    }

    /// Every `index.html` under the output root, sorted.
    pub fn documents(&self) -> Vec<PathBuf> {
        let mut docs: Vec<PathBuf> = walkdir::WalkDir::new(&self.paths.output)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_name() == "index.html")
            .map(|e| e.into_path())
            .collect();
        docs.sort();
        docs
    }
}

pub fn post(title: &str, date: &str, extra: &str) -> String {
    format!("---\ntitle: {title}\ndate: {date}\n{extra}---\nBody of {title}.\n")
}
