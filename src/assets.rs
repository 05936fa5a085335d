//! Static assets: styles, scripts and images.
//!
//! Styles and scripts are copied flat to `output/css` and `output/js` and
//! referenced from every document through generated import tags. Each tag
//! carries a content fingerprint (`?v=<8 hex of sha256>`), so editing a
//! stylesheet changes every emitted page.
//!
//! Images under `images/` are mirrored into `output/images`: PNG and JPEG
//! sources are scaled to `max_width` and re-encoded as WebP through an
//! [`ImageBackend`]; everything else is copied.

use crate::imaging::{BackendError, ImageBackend, OptimizeParams, is_optimizable};
use maud::html;
use rayon::prelude::*;
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// SHA-256 of a file's contents, first 8 hex digits.
pub fn fingerprint(path: &Path) -> io::Result<String> {
    let bytes = fs::read(path)?;
    let digest = Sha256::digest(&bytes);
    let hex = format!("{:x}", digest);
    Ok(hex[..8].to_string())
}

/// Files directly inside `dir` with the given extension, sorted by name.
pub fn list_assets(dir: &Path, extension: &str) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case(extension))
        })
        .collect();
    files.sort();
    files
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn versioned_href(prefix: &str, path: &Path) -> String {
    let name = file_name(path);
    match fingerprint(path) {
        Ok(hash) => format!("/{prefix}/{name}?v={hash}"),
        Err(e) => {
            warn!(file = %path.display(), error = %e, "Cannot fingerprint asset");
            format!("/{prefix}/{name}")
        }
    }
}

/// Stylesheet links followed by script tags, each group in sorted filename order.
pub fn import_tags(css_dir: &Path, js_dir: &Path) -> String {
    let styles = list_assets(css_dir, "css");
    let scripts = list_assets(js_dir, "js");
    let mut tags: Vec<String> = Vec::with_capacity(styles.len() + scripts.len());
    for path in &styles {
        let href = versioned_href("css", path);
        tags.push(html! { link rel="stylesheet" href=(href); }.into_string());
    }
    for path in &scripts {
        let src = versioned_href("js", path);
        tags.push(html! { script src=(src) {} }.into_string());
    }
    tags.join("\n")
}

/// Copy every `extension` file from `source` into `dest`. Returns the written paths.
pub fn copy_assets(source: &Path, dest: &Path, extension: &str) -> io::Result<Vec<PathBuf>> {
    let files = list_assets(source, extension);
    if files.is_empty() {
        return Ok(Vec::new());
    }
    fs::create_dir_all(dest)?;
    let mut written = Vec::with_capacity(files.len());
    for file in files {
        let target = dest.join(file_name(&file));
        fs::copy(&file, &target)?;
        written.push(target);
    }
    Ok(written)
}

/// Output location of an image: mirrored path, `.webp` for optimizable sources.
pub fn image_output_path(images_root: &Path, out_root: &Path, source: &Path) -> Option<PathBuf> {
    let relative = source.strip_prefix(images_root).ok()?;
    let target = out_root.join(relative);
    Some(if is_optimizable(source) {
        target.with_extension("webp")
    } else {
        target
    })
}

fn is_fresh(source: &Path, output: &Path) -> bool {
    let modified = |p: &Path| fs::metadata(p).and_then(|m| m.modified()).ok();
    match (modified(source), modified(output)) {
        (Some(src), Some(out)) => out >= src,
        _ => false,
    }
}

/// Process one image into the output tree. Returns the written path.
pub fn process_image(
    backend: &dyn ImageBackend,
    images_root: &Path,
    out_root: &Path,
    source: &Path,
    max_width: u32,
) -> Result<PathBuf, BackendError> {
    let output = image_output_path(images_root, out_root, source).ok_or_else(|| {
        BackendError::ProcessingFailed(format!("{} is outside the images root", source.display()))
    })?;
    if is_optimizable(source) {
        let dims = backend.optimize(&OptimizeParams {
            source: source.to_path_buf(),
            output: output.clone(),
            max_width,
        })?;
        debug!(image = %source.display(), width = dims.width, height = dims.height, "Optimized image");
    } else {
        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(source, &output)?;
    }
    Ok(output)
}

/// Outcome of processing the whole images root.
#[derive(Debug, Default)]
pub struct ImageReport {
    /// Every output path that belongs to the current image set: fresh,
    /// skipped, or left over from the last good run of an image that failed.
    pub outputs: Vec<PathBuf>,
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Process every image under `images_root` in parallel.
///
/// When `skip_fresh` is set, images whose output is at least as new as the
/// source are left alone. Individual failures are logged and counted; a
/// failed image keeps its previous output, if there is one.
pub fn process_images(
    backend: &dyn ImageBackend,
    images_root: &Path,
    out_root: &Path,
    max_width: u32,
    skip_fresh: bool,
) -> ImageReport {
    if !images_root.is_dir() {
        return ImageReport::default();
    }
    let sources: Vec<PathBuf> = WalkDir::new(images_root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| !e.file_name().to_string_lossy().starts_with('.'))
        .map(|e| e.into_path())
        .collect();

    enum Outcome {
        Processed(PathBuf),
        Skipped(PathBuf),
        Failed(Option<PathBuf>),
    }

    let outcomes: Vec<Outcome> = sources
        .par_iter()
        .map(|source| {
            let Some(output) = image_output_path(images_root, out_root, source) else {
                return Outcome::Failed(None);
            };
            if skip_fresh && is_fresh(source, &output) {
                return Outcome::Skipped(output);
            }
            match process_image(backend, images_root, out_root, source, max_width) {
                Ok(path) => Outcome::Processed(path),
                Err(e) => {
                    warn!(image = %source.display(), error = %e, "Image processing failed");
                    Outcome::Failed(Some(output))
                }
            }
        })
        .collect();

    let mut report = ImageReport::default();
    for outcome in outcomes {
        match outcome {
            Outcome::Processed(path) => {
                report.processed += 1;
                report.outputs.push(path);
            }
            Outcome::Skipped(path) => {
                report.skipped += 1;
                report.outputs.push(path);
            }
            Outcome::Failed(previous) => {
                report.failed += 1;
                if let Some(path) = previous.filter(|p| p.is_file()) {
                    report.outputs.push(path);
                }
            }
        }
    }
    report
}
