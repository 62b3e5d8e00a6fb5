// src/config/paths.rs

//! Resolution of the four logical roots.

use std::path::{Component, Path, PathBuf};

use crate::config::model::PathsSection;

/// The four logical roots, resolved against the project root.
///
/// Each root is kept twice: as a filesystem path (for reading/writing) and as
/// a normalized `/`-separated string relative to the project root (for
/// building glob patterns that the watcher matches against).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    pub root: PathBuf,
    pub dist: PathBuf,
    pub assets: PathBuf,
    pub src: PathBuf,
    pub public: PathBuf,
    rel_dist: String,
    rel_src: String,
    rel_public: String,
}

impl Paths {
    /// Resolve `section` against `root`.
    ///
    /// Assumes the section has been validated (relative, no `..`).
    pub fn resolve(root: impl Into<PathBuf>, section: &PathsSection) -> Self {
        let root = root.into();
        let rel_dist = normalize_relative(&section.dist).unwrap_or_default();
        let rel_assets = normalize_relative(&section.assets).unwrap_or_default();
        let rel_src = normalize_relative(&section.src).unwrap_or_default();
        let rel_public = normalize_relative(&section.public).unwrap_or_default();

        Self {
            dist: root.join(&rel_dist),
            assets: root.join(&rel_assets),
            src: root.join(&rel_src),
            public: root.join(&rel_public),
            root,
            rel_dist,
            rel_src,
            rel_public,
        }
    }

    pub fn css_dir(&self) -> PathBuf {
        self.assets.join("css")
    }

    pub fn js_dir(&self) -> PathBuf {
        self.assets.join("js")
    }

    /// `dist` relative to the project root, e.g. `"docs"`.
    pub fn rel_dist(&self) -> &str {
        &self.rel_dist
    }

    /// `src` relative to the project root, e.g. `"src"`.
    pub fn rel_src(&self) -> &str {
        &self.rel_src
    }

    /// `public` relative to the project root, e.g. `"public"`.
    pub fn rel_public(&self) -> &str {
        &self.rel_public
    }

    /// URL path under which the dev server exposes `file`, if it lives in `dist`.
    pub fn url_path(&self, file: &Path) -> Option<String> {
        let rel = file.strip_prefix(&self.dist).ok()?;
        let segments: Vec<String> = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(format!("/{}", segments.join("/")))
    }
}

/// Normalize a configured relative path into `/`-separated components.
///
/// `"./src/"` becomes `"src"`. Absolute paths and `..` are rejected, as are
/// paths that collapse to the project root itself.
pub fn normalize_relative(raw: &str) -> Result<String, String> {
    let mut parts = Vec::new();
    for component in Path::new(raw).components() {
        match component {
            Component::CurDir => {}
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::ParentDir => {
                return Err(format!("path '{raw}' must not contain '..'"));
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(format!("path '{raw}' must be relative to the project root"));
            }
        }
    }
    if parts.is_empty() {
        return Err(format!("path '{raw}' must not be the project root"));
    }
    Ok(parts.join("/"))
}
