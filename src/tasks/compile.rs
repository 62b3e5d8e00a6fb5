// src/tasks/compile.rs

//! `styles-dev` and `scripts-dev`: single-entry pipelines through external
//! stage commands. `styles-lib` reuses the pipeline for its minifier.
//!
//! Each stage reads the previous stage's output. All intermediates live in a
//! temporary directory; only the final result is moved into the distribution
//! tree, so a failing stage never touches the last good output.

use std::io;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{debug, info};

use crate::errors::{Result, SitepipeError};
use crate::exec::command::{render_stage, run_stage};

use super::{TaskContext, TaskId};

/// Entry candidates under `src/`, first existing one wins.
const STYLE_ENTRIES: [&str; 2] = ["sass/index.sass", "sass/index.scss"];
const SCRIPT_ENTRY: &str = "js/index.js";

pub async fn styles(ctx: &TaskContext) -> Result<Vec<PathBuf>> {
    let entry = STYLE_ENTRIES
        .iter()
        .map(|rel| ctx.paths.src.join(rel))
        .find(|p| ctx.fs.exists(p))
        .ok_or_else(|| missing_entry(&ctx.paths.src.join(STYLE_ENTRIES[0])))?;

    let dest = ctx.paths.css_dir().join("main.css");
    let envs = [("BROWSERSLIST", ctx.config.styles.browserslist.as_str())];

    run_pipeline(TaskId::StylesDev, ctx, &ctx.config.styles.stages, &entry, &dest, &envs, "css").await
}

pub async fn scripts(ctx: &TaskContext) -> Result<Vec<PathBuf>> {
    let entry = ctx.paths.src.join(SCRIPT_ENTRY);
    if !ctx.fs.exists(&entry) {
        return Err(missing_entry(&entry));
    }

    let dest = ctx.paths.js_dir().join("main.js");
    let stages = [ctx.config.scripts.bundler.clone()];

    run_pipeline(TaskId::ScriptsDev, ctx, &stages, &entry, &dest, &[], "js").await
}

pub(super) async fn run_pipeline(
    task: TaskId,
    ctx: &TaskContext,
    stages: &[String],
    entry: &Path,
    dest: &Path,
    envs: &[(&str, &str)],
    ext: &str,
) -> Result<Vec<PathBuf>> {
    let scratch = tempfile::Builder::new()
        .prefix("sitepipe-")
        .tempdir()
        .context("creating scratch directory")?;

    let mut input = entry.to_path_buf();
    for (i, template) in stages.iter().enumerate() {
        let output = scratch.path().join(format!("stage-{i}.{ext}"));
        let cmd_line = render_stage(template, &input, &output);

        debug!(task = %task, stage = i, cmd = %cmd_line, "running stage");
        let result = run_stage(&cmd_line, &ctx.paths.root, envs).await?;

        if !result.status.success() {
            let stderr = result.stderr.trim();
            let message = if stderr.is_empty() {
                format!("`{cmd_line}` exited with {}", result.status)
            } else {
                stderr.to_string()
            };
            return Err(SitepipeError::Compile {
                task: task.as_str().to_string(),
                message,
            });
        }
        if !output.is_file() {
            return Err(SitepipeError::Compile {
                task: task.as_str().to_string(),
                message: format!("`{cmd_line}` did not produce {}", output.display()),
            });
        }

        input = output;
    }

    let compiled = tokio::fs::read(&input)
        .await
        .map_err(|e| SitepipeError::filesystem(&input, e))?;
    ctx.fs.write_atomic(dest, &compiled)?;

    info!(task = %task, path = ?dest, bytes = compiled.len(), "compiled output written");
    Ok(vec![dest.to_path_buf()])
}

fn missing_entry(path: &Path) -> SitepipeError {
    SitepipeError::filesystem(
        path,
        io::Error::new(io::ErrorKind::NotFound, "entry file not found"),
    )
}
