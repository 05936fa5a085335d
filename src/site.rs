//! Whole-site build orchestration.
//!
//! ```text
//! config ─▶ assets + images ─▶ page tree ─▶ links ─▶ render ─▶ feeds ─▶ prune
//! ```
//!
//! Every document lands at `output/<url>/index.<ext>`. The build records each
//! file it writes and afterwards deletes everything else under the output
//! root, which is how removed sources disappear from the output. An output
//! root that contains the project or lies inside a source root is refused
//! before anything is written.
//!
//! A [`Site`] owns the template caches, so a long-lived watch process keeps
//! loaded layouts and fragments between builds until the rebuild coordinator
//! invalidates them.

use crate::assets::{self, ImageReport};
use crate::config::{SiteConfig, load_site_config};
use crate::feed::{self, FeedError};
use crate::imaging::{BackendError, ImageBackend};
use crate::links;
use crate::paths::SitePaths;
use crate::template::{CacheScope, Caches, TemplateEngine};
use crate::tree::{self, SiteTree};
use crate::types::BuildMode;
use rayon::prelude::*;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),
    #[error("Image error: {0}")]
    Image(#[from] BackendError),
    #[error("Refusing to build into {output}: it overlaps {overlaps}")]
    UnsafeOutput { output: PathBuf, overlaps: PathBuf },
}

fn write_error(path: &Path) -> impl FnOnce(std::io::Error) -> BuildError + '_ {
    move |source| BuildError::Write {
        path: path.to_path_buf(),
        source,
    }
}

/// Summary of one full build.
#[derive(Debug, Default)]
pub struct BuildReport {
    pub pages: usize,
    pub assets: usize,
    pub images: ImageReport,
    pub feeds: Vec<PathBuf>,
    pub pruned: usize,
    pub elapsed: Duration,
}

/// A project and the state that survives between its builds.
pub struct Site<B: ImageBackend> {
    paths: SitePaths,
    mode: BuildMode,
    caches: Caches,
    backend: B,
}

impl<B: ImageBackend> Site<B> {
    pub fn new(paths: SitePaths, mode: BuildMode, backend: B) -> Self {
        Self {
            paths,
            mode,
            caches: Caches::new(),
            backend,
        }
    }

    pub fn paths(&self) -> &SitePaths {
        &self.paths
    }

    pub fn mode(&self) -> BuildMode {
        self.mode
    }

    pub fn caches(&self) -> &Caches {
        &self.caches
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn config(&self) -> SiteConfig {
        load_site_config(&self.paths.root).config
    }

    pub fn invalidate(&self, scope: CacheScope) {
        self.caches.invalidate(scope);
    }

    /// Build and annotate the page tree without writing anything.
    pub fn tree(&self) -> SiteTree {
        let settings = load_site_config(&self.paths.root);
        let engine = TemplateEngine::new(&self.paths, &settings.config, &self.caches, self.mode);
        let mut tree = tree::build(&engine, &settings.metadata);
        links::annotate(&mut tree, &engine);
        tree
    }

    /// Run a full build into the output root.
    pub fn build(&self) -> Result<BuildReport, BuildError> {
        let started = Instant::now();
        let output = &self.paths.output;
        if let Some(overlaps) = self.paths.output_overlap() {
            return Err(BuildError::UnsafeOutput {
                output: output.clone(),
                overlaps: overlaps.to_path_buf(),
            });
        }
        let settings = load_site_config(&self.paths.root);
        let config = &settings.config;
        fs::create_dir_all(output).map_err(write_error(output))?;

        let mut written: HashSet<PathBuf> = HashSet::new();
        let mut report = BuildReport::default();

        for (source, name, ext) in [(&self.paths.css, "css", "css"), (&self.paths.js, "js", "js")] {
            let dest = output.join(name);
            let copied = assets::copy_assets(source, &dest, ext).map_err(write_error(&dest))?;
            report.assets += copied.len();
            written.extend(copied);
        }

        report.images = assets::process_images(
            &self.backend,
            &self.paths.images,
            &output.join("images"),
            config.max_image_width,
            true,
        );
        written.extend(report.images.outputs.iter().cloned());

        let engine = TemplateEngine::new(&self.paths, config, &self.caches, self.mode);
        let mut tree = tree::build(&engine, &settings.metadata);
        links::annotate(&mut tree, &engine);

        let documents = self.render_all(&engine, &tree, config)?;
        report.pages = documents.len();
        written.extend(documents);

        report.feeds = feed::generate(&tree.pages, config, output)?;
        written.extend(report.feeds.iter().cloned());

        report.pruned = prune(output, &written)?;
        report.elapsed = started.elapsed();
        info!(
            pages = report.pages,
            assets = report.assets,
            images = report.images.processed,
            feeds = report.feeds.len(),
            pruned = report.pruned,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Build complete"
        );
        Ok(report)
    }

    /// Render every page on the rayon pool and write it out.
    fn render_all(
        &self,
        engine: &TemplateEngine<'_>,
        tree: &SiteTree,
        config: &SiteConfig,
    ) -> Result<Vec<PathBuf>, BuildError> {
        let file_name = format!("index.{}", config.output_extension);
        tree.all_pages()
            .par_iter()
            .map(|page| {
                let html = engine.render(page);
                let dir = self.paths.output_dir_for(&page.url);
                fs::create_dir_all(&dir).map_err(write_error(&dir))?;
                let path = dir.join(&file_name);
                fs::write(&path, html).map_err(write_error(&path))?;
                debug!(url = %page.url, "Wrote page");
                Ok(path)
            })
            .collect()
    }

    /// Re-process a single image into the output tree.
    pub fn process_image(&self, source: &Path) -> Result<PathBuf, BuildError> {
        let config = self.config();
        let output = assets::process_image(
            &self.backend,
            &self.paths.images,
            &self.paths.output.join("images"),
            source,
            config.max_image_width,
        )?;
        info!(image = %output.display(), "Image updated");
        Ok(output)
    }
}

/// Delete every file under `output` that is not in `keep`, then empty directories.
fn prune(output: &Path, keep: &HashSet<PathBuf>) -> Result<usize, BuildError> {
    let mut removed = 0;
    let stale: Vec<PathBuf> = WalkDir::new(output)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| !keep.contains(p))
        .collect();
    for path in stale {
        debug!(file = %path.display(), "Removing stale output");
        fs::remove_file(&path).map_err(write_error(&path))?;
        removed += 1;
    }

    let dirs: Vec<PathBuf> = WalkDir::new(output)
        .min_depth(1)
        .contents_first(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir())
        .map(|e| e.into_path())
        .collect();
    for dir in dirs {
        let empty = fs::read_dir(&dir).map(|mut d| d.next().is_none()).unwrap_or(false);
        if empty && let Err(e) = fs::remove_dir(&dir) {
            warn!(dir = %dir.display(), error = %e, "Cannot remove empty output directory");
        }
    }
    Ok(removed)
}
