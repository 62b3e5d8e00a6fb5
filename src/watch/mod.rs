// src/watch/mod.rs

//! File watching and the `watch` dispatcher task.
//!
//! This module compiles the binding table, wires up a cross-platform
//! filesystem watcher (`notify`), and turns changes into task triggers. It
//! does not know about the task graph; the scheduler decides what a trigger
//! pulls in.

pub mod event_handler;
pub mod path_utils;
pub mod patterns;
pub mod watcher;

use std::time::Duration;

use tracing::info;

use crate::errors::Result;
use crate::tasks::{TaskContext, TaskHandle};

pub use patterns::{bound_tasks, build_globset, site_bindings, WatchBinding};
pub use watcher::{spawn_watcher, WatcherHandle};

/// Body of the `watch` task: register the bindings, report readiness, then
/// keep the watcher alive for the rest of the process.
pub async fn run_dispatcher(ctx: &TaskContext, handle: &TaskHandle) -> Result<()> {
    let bindings = site_bindings(&ctx.paths, &ctx.config.templates)?;
    for binding in &bindings {
        info!(task = %binding.task(), patterns = ?binding.patterns(), "watch binding");
    }

    let dirs = [ctx.paths.src.clone(), ctx.paths.public.clone()];
    let debounce = Duration::from_millis(ctx.config.config.debounce_ms);
    let _watcher = spawn_watcher(
        ctx.paths.root.clone(),
        &dirs,
        bindings,
        debounce,
        handle.runtime_tx(),
    )?;

    handle.ready().await;
    std::future::pending::<()>().await;
    Ok(())
}
