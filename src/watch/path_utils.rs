// src/watch/path_utils.rs

//! Path normalization for watcher events.

use std::path::Path;

use crate::fs::relative_slash_path;

/// Convert `path` into a `/`-separated string relative to `root`.
///
/// Event paths sometimes arrive with a different absolute prefix than the
/// watched root (symlinks, `/private/var` on macOS), so a failed direct
/// strip falls back to comparing canonical paths. Deleted files can't be
/// canonicalized, in which case only the parent is canonicalized.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    if let Some(rel) = relative_slash_path(root, path) {
        return Some(rel);
    }

    let root_canon = root.canonicalize().ok()?;
    if let Ok(path_canon) = path.canonicalize() {
        return relative_slash_path(&root_canon, &path_canon);
    }

    let parent = path.parent()?.canonicalize().ok()?;
    let joined = parent.join(path.file_name()?);
    relative_slash_path(&root_canon, &joined)
}
