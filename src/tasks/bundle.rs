// src/tasks/bundle.rs

//! `styles-lib` and `scripts-lib`: vendor bundles from `src/libs`.
//!
//! Sources are concatenated as raw bytes, so vendor files in legacy
//! encodings pass through unchanged.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use tracing::{debug, info};

use crate::errors::{Result, SitepipeError};
use crate::fs::{collect_files, FileSystem};
use crate::watch::patterns::build_globset;

use super::compile::run_pipeline;
use super::{blocking, TaskContext, TaskId};

pub const LIBS_DIR: &str = "libs";
pub const STYLES_BUNDLE: &str = "libs.min.css";
pub const SCRIPTS_BUNDLE: &str = "libs.min.js";

/// Concatenate `libs/**/*.css` and run the result through the configured
/// minifier into `assets/css/libs.min.css`.
pub async fn styles(ctx: &TaskContext) -> Result<Vec<PathBuf>> {
    let fs = Arc::clone(&ctx.fs);
    let libs = ctx.paths.src.join(LIBS_DIR);
    let dest = ctx.paths.css_dir().join(STYLES_BUNDLE);

    let joined = blocking(TaskId::StylesLib, move || concatenate(fs.as_ref(), &libs, "**/*.css")).await?;
    let Some(joined) = joined else {
        return Ok(Vec::new());
    };

    let scratch = tempfile::Builder::new()
        .prefix("sitepipe-")
        .tempdir()
        .context("creating scratch directory")?;
    let input = scratch.path().join("libs.css");
    tokio::fs::write(&input, &joined)
        .await
        .map_err(|e| SitepipeError::filesystem(&input, e))?;

    let stages = [ctx.config.styles.minifier.clone()];
    run_pipeline(TaskId::StylesLib, ctx, &stages, &input, &dest, &[], "css").await
}

/// Concatenate `libs/**/*.js` into `assets/js/libs.min.js` as-is.
pub async fn scripts(ctx: &TaskContext) -> Result<Vec<PathBuf>> {
    let fs = Arc::clone(&ctx.fs);
    let libs = ctx.paths.src.join(LIBS_DIR);
    let dest = ctx.paths.js_dir().join(SCRIPTS_BUNDLE);

    blocking(TaskId::ScriptsLib, move || {
        let Some(joined) = concatenate(fs.as_ref(), &libs, "**/*.js")? else {
            return Ok(Vec::new());
        };
        fs.write_atomic(&dest, &joined)?;
        info!(path = ?dest, bytes = joined.len(), "bundle written");
        Ok(vec![dest])
    })
    .await
}

/// Inputs joined with `\n` in lexicographic path order; `None` when there
/// are no inputs.
fn concatenate(fs: &dyn FileSystem, libs: &Path, pattern: &str) -> Result<Option<Vec<u8>>> {
    let inputs = collect_files(fs, libs, &build_globset(&[pattern])?)?;
    if inputs.is_empty() {
        info!(dir = ?libs, pattern, "no library sources; skipping bundle");
        return Ok(None);
    }

    let mut joined = Vec::new();
    for (i, input) in inputs.iter().enumerate() {
        debug!(path = ?input, "adding to bundle");
        if i > 0 {
            joined.push(b'\n');
        }
        joined.extend(fs.read(input)?);
    }
    Ok(Some(joined))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn concatenates_in_path_order() {
        let fs = MockFileSystem::new();
        fs.add_file("/s/libs/z/last.js", "z();");
        fs.add_file("/s/libs/b.js", "b();");
        fs.add_file("/s/libs/a.js", "a();");

        let joined = concatenate(&fs, Path::new("/s/libs"), "**/*.js").unwrap();
        assert_eq!(joined.unwrap(), b"a();\nb();\nz();");
    }

    #[test]
    fn bytes_that_are_not_utf8_pass_through() {
        let fs = MockFileSystem::new();
        fs.add_file("/s/libs/legacy.js", b"var s = '\xe9';".to_vec());
        fs.add_file("/s/libs/modern.js", "var t = 1;");

        let joined = concatenate(&fs, Path::new("/s/libs"), "**/*.js").unwrap();
        assert_eq!(joined.unwrap(), b"var s = '\xe9';\nvar t = 1;".to_vec());
    }

    #[test]
    fn empty_libs_yield_nothing() {
        let fs = MockFileSystem::new();
        assert!(concatenate(&fs, Path::new("/s/libs"), "**/*.css").unwrap().is_none());
    }
}
