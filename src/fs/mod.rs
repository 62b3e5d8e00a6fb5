// src/fs/mod.rs

//! Filesystem access used by the leaf tasks.
//!
//! Tasks go through [`FileSystem`] so directory walks and copies can be
//! exercised against [`mock::MockFileSystem`] without touching disk.

use std::fmt::Debug;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::GlobSet;

pub mod mock;

/// Abstract filesystem interface.
pub trait FileSystem: Send + Sync + Debug {
    fn read(&self, path: &Path) -> Result<Vec<u8>>;
    fn read_to_string(&self, path: &Path) -> Result<String>;
    fn exists(&self, path: &Path) -> bool;
    fn is_dir(&self, path: &Path) -> bool;

    /// Return the entries of a directory as full paths.
    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>>;

    /// Replace `path` with `contents` in a single rename, creating parent
    /// directories. Readers never observe a half-written file.
    fn write_atomic(&self, path: &Path, contents: &[u8]) -> Result<()>;

    /// Copy a file, creating the destination's parent directories.
    fn copy(&self, from: &Path, to: &Path) -> Result<()>;

    /// Recursively delete a directory. A missing directory is not an error.
    fn remove_dir_all(&self, path: &Path) -> Result<()>;
}

/// Implementation that uses `std::fs`.
#[derive(Debug, Clone, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        fs::read(path).with_context(|| format!("reading file {:?}", path))
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).with_context(|| format!("reading file {:?}", path))
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(path).with_context(|| format!("reading dir {:?}", path))? {
            entries.push(entry?.path());
        }
        Ok(entries)
    }

    fn write_atomic(&self, path: &Path, contents: &[u8]) -> Result<()> {
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent).with_context(|| format!("creating dir {:?}", parent))?;

        // The temp file must live on the same filesystem for the rename.
        let mut tmp = tempfile::NamedTempFile::new_in(parent)
            .with_context(|| format!("creating temp file in {:?}", parent))?;
        tmp.write_all(contents)
            .with_context(|| format!("writing temp file for {:?}", path))?;
        tmp.persist(path)
            .map_err(|e| e.error)
            .with_context(|| format!("renaming temp file onto {:?}", path))?;
        Ok(())
    }

    fn copy(&self, from: &Path, to: &Path) -> Result<()> {
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent).with_context(|| format!("creating dir {:?}", parent))?;
        }
        fs::copy(from, to).with_context(|| format!("copying {:?} to {:?}", from, to))?;
        Ok(())
    }

    fn remove_dir_all(&self, path: &Path) -> Result<()> {
        match fs::remove_dir_all(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("removing dir {:?}", path)),
        }
    }
}

/// Recursively collect every file under `base` whose `/`-separated path
/// relative to `base` matches `globs`.
///
/// The result is sorted so callers get a deterministic order. A missing
/// `base` yields an empty list.
pub fn collect_files(fs: &dyn FileSystem, base: &Path, globs: &GlobSet) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    if !fs.is_dir(base) {
        return Ok(found);
    }

    let mut stack = vec![base.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in fs.read_dir(&dir)? {
            if fs.is_dir(&entry) {
                stack.push(entry);
                continue;
            }
            if let Some(rel) = relative_slash_path(base, &entry) {
                if globs.is_match(&rel) {
                    found.push(entry);
                }
            }
        }
    }

    found.sort();
    Ok(found)
}

/// `path` relative to `base`, joined with `/` regardless of platform.
pub fn relative_slash_path(base: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(base).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use globset::{Glob, GlobSetBuilder};

    fn globs(patterns: &[&str]) -> GlobSet {
        let mut builder = GlobSetBuilder::new();
        for p in patterns {
            builder.add(Glob::new(p).unwrap());
        }
        builder.build().unwrap()
    }

    #[test]
    fn collect_files_is_sorted_and_filtered() {
        let fs = mock::MockFileSystem::new();
        fs.add_file("/p/libs/b.css", "b");
        fs.add_file("/p/libs/a.css", "a");
        fs.add_file("/p/libs/nested/c.css", "c");
        fs.add_file("/p/libs/skip.js", "js");

        let files = collect_files(&fs, Path::new("/p/libs"), &globs(&["**/*.css"])).unwrap();
        assert_eq!(
            files,
            vec![
                PathBuf::from("/p/libs/a.css"),
                PathBuf::from("/p/libs/b.css"),
                PathBuf::from("/p/libs/nested/c.css"),
            ]
        );
    }

    #[test]
    fn collect_files_on_missing_base_is_empty() {
        let fs = mock::MockFileSystem::new();
        let files = collect_files(&fs, Path::new("/nowhere"), &globs(&["**/*"])).unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn real_remove_dir_all_ignores_missing_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let fs = RealFileSystem;
        fs.remove_dir_all(&tmp.path().join("absent")).unwrap();
    }

    #[test]
    fn real_write_atomic_replaces_content() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("out/main.css");
        let fs = RealFileSystem;
        fs.write_atomic(&target, b"one").unwrap();
        fs.write_atomic(&target, b"two").unwrap();
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "two");
    }
}
