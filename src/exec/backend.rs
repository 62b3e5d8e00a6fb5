// src/exec/backend.rs

//! The seam between the runtime and whatever actually runs tasks.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use anyhow::anyhow;
use tokio::sync::mpsc;

use crate::dag::ScheduledTask;
use crate::engine::RuntimeEvent;
use crate::errors::Result;
use crate::tasks::TaskContext;

use super::executor_loop::spawn_executor;

pub type SpawnFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

/// Accepts tasks the scheduler released. Their outcomes come back later as
/// `RuntimeEvent`s on the runtime channel, not through the returned future,
/// which only reports whether the hand-off worked.
pub trait ExecutorBackend: Send {
    fn spawn_ready_tasks(&mut self, tasks: Vec<ScheduledTask>) -> SpawnFuture<'_>;
}

/// Production backend: a queue into the loop started by [`spawn_executor`].
pub struct RealExecutorBackend {
    queue: mpsc::Sender<ScheduledTask>,
}

impl RealExecutorBackend {
    pub fn new(ctx: Arc<TaskContext>, runtime_tx: mpsc::Sender<RuntimeEvent>) -> Self {
        Self {
            queue: spawn_executor(ctx, runtime_tx),
        }
    }
}

impl ExecutorBackend for RealExecutorBackend {
    fn spawn_ready_tasks(&mut self, tasks: Vec<ScheduledTask>) -> SpawnFuture<'_> {
        Box::pin(async move {
            for task in tasks {
                let name = task.name.clone();
                self.queue
                    .send(task)
                    .await
                    .map_err(|_| anyhow!("executor loop stopped before '{name}' could start"))?;
            }
            Ok(())
        })
    }
}
