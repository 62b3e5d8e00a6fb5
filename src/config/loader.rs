// src/config/loader.rs

use std::fs;
use std::io;
use std::path::Path;

use tracing::{debug, info};

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{Result, SitepipeError};

/// Read and deserialize `path` without validating it.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| SitepipeError::filesystem(path, e))?;
    debug!(config = ?path, bytes = text.len(), "read config file");
    Ok(toml::from_str(&text)?)
}

/// Read, deserialize and validate `path`.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    ConfigFile::try_from(load_from_path(path)?)
}

/// Like [`load_and_validate`], but a missing file yields the defaults.
pub fn load_or_default(path: impl AsRef<Path>) -> Result<ConfigFile> {
    match load_and_validate(&path) {
        Err(SitepipeError::Filesystem { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
            info!(config = ?path.as_ref(), "no config file; using defaults");
            ConfigFile::try_from(RawConfigFile::default())
        }
        other => other,
    }
}
