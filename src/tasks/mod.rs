// src/tasks/mod.rs

//! The nine runnable tasks and the context they run in.
//!
//! Leaf tasks return the files they wrote; the task runner turns that into a
//! reload notification via [`TaskId::reload_message`].

pub mod bundle;
pub mod clean;
pub mod compile;
pub mod public;
pub mod templates;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::mpsc;
use tracing::warn;

use crate::config::{ConfigFile, Paths};
use crate::engine::RuntimeEvent;
use crate::errors::Result;
use crate::fs::{FileSystem, RealFileSystem};
use crate::server::{self, ReloadHub, ReloadMessage};

/// Closed set of tasks, each with a stable kebab-case name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TaskId {
    Clean,
    Serve,
    Public,
    Templates,
    StylesLib,
    StylesDev,
    ScriptsLib,
    ScriptsDev,
    Watch,
}

impl TaskId {
    pub const ALL: [TaskId; 9] = [
        TaskId::Clean,
        TaskId::Serve,
        TaskId::Public,
        TaskId::Templates,
        TaskId::StylesLib,
        TaskId::StylesDev,
        TaskId::ScriptsLib,
        TaskId::ScriptsDev,
        TaskId::Watch,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TaskId::Clean => "clean",
            TaskId::Serve => "serve",
            TaskId::Public => "public",
            TaskId::Templates => "templates",
            TaskId::StylesLib => "styles-lib",
            TaskId::StylesDev => "styles-dev",
            TaskId::ScriptsLib => "scripts-lib",
            TaskId::ScriptsDev => "scripts-dev",
            TaskId::Watch => "watch",
        }
    }

    /// Tasks that keep running and report readiness instead of completing.
    pub fn is_long_lived(self) -> bool {
        matches!(self, TaskId::Serve | TaskId::Watch)
    }

    /// Notification to send after a successful run that wrote `written`.
    ///
    /// Stylesheet tasks ask the browser to swap the stylesheet in place; the
    /// other build tasks ask for a full reload.
    pub fn reload_message(self, paths: &Paths, written: &[PathBuf]) -> Option<ReloadMessage> {
        match self {
            TaskId::Clean | TaskId::Serve | TaskId::Watch => None,
            TaskId::StylesLib | TaskId::StylesDev => {
                let path = written.first().and_then(|p| paths.url_path(p))?;
                Some(ReloadMessage::Css { path })
            }
            TaskId::Public | TaskId::Templates | TaskId::ScriptsLib | TaskId::ScriptsDev => {
                if written.is_empty() {
                    None
                } else {
                    Some(ReloadMessage::Reload)
                }
            }
        }
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskId {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        TaskId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| format!("unknown task '{s}'"))
    }
}

/// Everything a task needs: validated config, resolved paths, filesystem,
/// and the reload hub.
#[derive(Debug)]
pub struct TaskContext {
    pub config: ConfigFile,
    pub paths: Paths,
    pub fs: Arc<dyn FileSystem>,
    pub reload: ReloadHub,
}

impl TaskContext {
    pub fn new(config: ConfigFile, paths: Paths) -> Self {
        Self {
            config,
            paths,
            fs: Arc::new(RealFileSystem),
            reload: ReloadHub::default(),
        }
    }

    pub fn with_fs(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    pub fn with_reload(mut self, reload: ReloadHub) -> Self {
        self.reload = reload;
        self
    }
}

/// Per-invocation link back to the runtime.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    task: TaskId,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
}

impl TaskHandle {
    pub fn new(task: TaskId, runtime_tx: mpsc::Sender<RuntimeEvent>) -> Self {
        Self { task, runtime_tx }
    }

    /// Report that a long-lived task is up, releasing its dependents.
    pub async fn ready(&self) {
        let event = RuntimeEvent::TaskProgressed {
            task: self.task.as_str().to_string(),
        };
        if self.runtime_tx.send(event).await.is_err() {
            warn!(task = %self.task, "runtime gone; readiness not delivered");
        }
    }

    pub fn runtime_tx(&self) -> mpsc::Sender<RuntimeEvent> {
        self.runtime_tx.clone()
    }
}

/// Run one invocation of `task`, returning the files it wrote.
pub async fn run(task: TaskId, ctx: &TaskContext, handle: &TaskHandle) -> Result<Vec<PathBuf>> {
    match task {
        TaskId::Clean => clean::run(ctx).await.map(|()| Vec::new()),
        TaskId::Serve => server::run(ctx, handle).await.map(|()| Vec::new()),
        TaskId::Public => public::run(ctx).await,
        TaskId::Templates => templates::run(ctx).await,
        TaskId::StylesLib => bundle::styles(ctx).await,
        TaskId::ScriptsLib => bundle::scripts(ctx).await,
        TaskId::StylesDev => compile::styles(ctx).await,
        TaskId::ScriptsDev => compile::scripts(ctx).await,
        TaskId::Watch => crate::watch::run_dispatcher(ctx, handle)
            .await
            .map(|()| Vec::new()),
    }
}

/// Run filesystem-heavy work off the async workers.
async fn blocking<T, F>(task: TaskId, f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .with_context(|| format!("task '{task}' panicked"))?
}
