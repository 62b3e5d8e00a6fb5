// src/fs/mock.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::{anyhow, Result};

use super::FileSystem;

/// In-memory filesystem. Only files are stored; a directory exists whenever
/// some file lives below it.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    files: Arc<Mutex<BTreeMap<PathBuf, Vec<u8>>>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        self.files()
            .insert(path.as_ref().to_path_buf(), content.into());
    }

    /// Raw bytes of a file, if present.
    pub fn contents(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        self.files().get(path.as_ref()).cloned()
    }

    /// All stored file paths, sorted.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.files().keys().cloned().collect()
    }

    fn files(&self) -> MutexGuard<'_, BTreeMap<PathBuf, Vec<u8>>> {
        self.files.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl FileSystem for MockFileSystem {
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        self.contents(path)
            .ok_or_else(|| anyhow!("file not found: {:?}", path))
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        String::from_utf8(self.read(path)?).map_err(|e| anyhow!("invalid UTF-8: {e}"))
    }

    fn exists(&self, path: &Path) -> bool {
        let is_file = self.files().contains_key(path);
        is_file || self.is_dir(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.files()
            .keys()
            .any(|p| p != path && p.starts_with(path))
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let mut children: Vec<PathBuf> = Vec::new();
        for file in self.files().keys() {
            let Ok(rel) = file.strip_prefix(path) else {
                continue;
            };
            let Some(first) = rel.components().next() else {
                continue;
            };
            let child = path.join(first.as_os_str());
            if !children.contains(&child) {
                children.push(child);
            }
        }
        if children.is_empty() {
            return Err(anyhow!("not a directory or not found: {:?}", path));
        }
        Ok(children)
    }

    fn write_atomic(&self, path: &Path, contents: &[u8]) -> Result<()> {
        self.add_file(path, contents);
        Ok(())
    }

    fn copy(&self, from: &Path, to: &Path) -> Result<()> {
        let content = self
            .contents(from)
            .ok_or_else(|| anyhow!("file not found: {:?}", from))?;
        self.add_file(to, content);
        Ok(())
    }

    fn remove_dir_all(&self, path: &Path) -> Result<()> {
        self.files().retain(|p, _| !p.starts_with(path));
        Ok(())
    }
}
