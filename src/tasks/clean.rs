// src/tasks/clean.rs

use std::sync::Arc;

use tracing::info;

use crate::errors::Result;

use super::{blocking, TaskContext, TaskId};

/// Delete the distribution root. Absent root is a no-op.
pub async fn run(ctx: &TaskContext) -> Result<()> {
    let fs = Arc::clone(&ctx.fs);
    let dist = ctx.paths.dist.clone();

    info!(path = ?dist, "removing distribution directory");
    blocking(TaskId::Clean, move || Ok(fs.remove_dir_all(&dist)?)).await
}
