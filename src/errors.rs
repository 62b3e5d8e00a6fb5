// src/errors.rs

//! Crate-wide error type.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SitepipeError {
    #[error("invalid configuration: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("{}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{task}: {message}")]
    Compile { task: String, message: String },

    #[error("dev server cannot listen on {addr}: {source}")]
    PortBind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unknown task: {0}")]
    TaskNotFound(String),

    #[error("task graph has a cycle: {0}")]
    DagCycle(String),

    #[error("invalid TOML: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("build failed: {}", .0.join(", "))]
    BuildFailed(Vec<String>),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SitepipeError {
    /// Build a [`SitepipeError::Compile`] from any error, keeping its whole
    /// source chain in the message (template engines nest the useful part).
    pub fn compile(task: &str, err: &dyn std::error::Error) -> Self {
        let mut message = err.to_string();
        let mut source = err.source();
        while let Some(inner) = source {
            message.push_str(": ");
            message.push_str(&inner.to_string());
            source = inner.source();
        }
        SitepipeError::Compile {
            task: task.to_string(),
            message,
        }
    }

    pub fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SitepipeError::Filesystem {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, SitepipeError>;
