// src/tasks/public.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::errors::Result;
use crate::fs::{collect_files, relative_slash_path, FileSystem};
use crate::watch::patterns::build_globset;

use super::{blocking, TaskContext, TaskId};

/// Copy `public/**/*.*` into the distribution root. Stale copies of removed
/// sources are left in place.
pub async fn run(ctx: &TaskContext) -> Result<Vec<PathBuf>> {
    let fs = Arc::clone(&ctx.fs);
    let public = ctx.paths.public.clone();
    let dist = ctx.paths.dist.clone();

    blocking(TaskId::Public, move || copy_tree(fs.as_ref(), &public, &dist)).await
}

fn copy_tree(fs: &dyn FileSystem, from: &Path, to: &Path) -> Result<Vec<PathBuf>> {
    let globs = build_globset(&["**/*.*"])?;
    let mut written = Vec::new();

    for file in collect_files(fs, from, &globs)? {
        let Some(rel) = relative_slash_path(from, &file) else {
            continue;
        };
        let dest = to.join(&rel);
        debug!(src = ?file, dest = ?dest, "copying public file");
        fs.copy(&file, &dest)?;
        written.push(dest);
    }

    Ok(written)
}
