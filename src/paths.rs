//! Locations of the source roots inside a project, and of the output tree.

use std::path::{Component, Path, PathBuf};

/// Project layout, resolved against a root directory.
///
/// ```text
/// my-site/
/// ├── config.yaml     site configuration
/// ├── template.html   site-wide template
/// ├── pages/          content root
/// ├── layouts/        <name>.html wrapping templates
/// ├── partials/       <name>.md / <name>.html fragments
/// ├── css/  js/       copied verbatim, referenced by import tags
/// ├── images/         optimized into output/images
/// └── data/           <name>.{json,yaml,yml,toml} template data
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitePaths {
    pub root: PathBuf,
    pub pages: PathBuf,
    pub layouts: PathBuf,
    pub partials: PathBuf,
    pub css: PathBuf,
    pub js: PathBuf,
    pub images: PathBuf,
    pub data: PathBuf,
    pub template: PathBuf,
    pub output: PathBuf,
}

impl SitePaths {
    pub fn new(root: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            pages: root.join("pages"),
            layouts: root.join("layouts"),
            partials: root.join("partials"),
            css: root.join("css"),
            js: root.join("js"),
            images: root.join("images"),
            data: root.join("data"),
            template: root.join("template.html"),
            output: output.into(),
            root,
        }
    }

    /// Layout file for a layout name.
    pub fn layout_file(&self, name: &str) -> PathBuf {
        self.layouts.join(format!("{name}.html"))
    }

    /// Output directory for a page URL: `output/<url>/`.
    pub fn output_dir_for(&self, url: &str) -> PathBuf {
        let relative = url.trim_matches('/');
        if relative.is_empty() {
            self.output.clone()
        } else {
            self.output.join(relative)
        }
    }

    /// Source roots a build reads from.
    pub fn sources(&self) -> [&Path; 8] {
        [
            &self.pages,
            &self.layouts,
            &self.partials,
            &self.css,
            &self.js,
            &self.images,
            &self.data,
            &self.template,
        ]
    }

    /// The source the output root would clobber, if any.
    ///
    /// The output root may not contain the project root, and may not equal or
    /// sit inside a source root. Paths are compared after resolving `.` and
    /// `..` against the working directory.
    pub fn output_overlap(&self) -> Option<&Path> {
        let output = normalize(&self.output);
        if normalize(&self.root).starts_with(&output) {
            return Some(&self.root);
        }
        self.sources()
            .into_iter()
            .find(|source| output.starts_with(normalize(source)))
    }

    /// Whether `path` is a site-level configuration document.
    pub fn is_site_config(&self, path: &Path) -> bool {
        path.parent() == Some(self.root.as_path())
            && path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| crate::config::CONFIG_FILENAMES.contains(&n))
    }
}

/// Absolute form of `path` with `.` and `..` folded lexically.
fn normalize(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut out = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}
