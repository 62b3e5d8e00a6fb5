// src/engine/runtime.rs

use tokio::sync::mpsc;
use tracing::{debug, error, info, trace};

use crate::dag::ScheduledTask;
use crate::errors::{Result, SitepipeError};
use crate::exec::ExecutorBackend;

use super::core::{CoreCommand, CoreRuntime, CoreStep};
use super::RuntimeEvent;

/// Async shell around [`CoreRuntime`]: receives events, feeds them to the
/// core and carries out the resulting commands with an [`ExecutorBackend`].
pub struct Runtime<E: ExecutorBackend> {
    core: CoreRuntime,
    events: mpsc::Receiver<RuntimeEvent>,
    executor: E,
}

impl<E: ExecutorBackend> Runtime<E> {
    pub fn new(core: CoreRuntime, events: mpsc::Receiver<RuntimeEvent>, executor: E) -> Self {
        Self {
            core,
            events,
            executor,
        }
    }

    /// Run until the core asks to stop or every event sender is gone.
    ///
    /// An aborted build comes back as [`SitepipeError::BuildFailed`].
    pub async fn run(mut self) -> Result<()> {
        info!("runtime started");

        while let Some(event) = self.events.recv().await {
            trace!(?event, "runtime event");

            let CoreStep {
                commands,
                keep_running,
            } = self.core.step(event);

            for command in commands {
                match command {
                    CoreCommand::DispatchTasks(tasks) => self.dispatch(tasks).await?,
                    CoreCommand::RequestExit => {
                        info!(runs = self.core.finished_runs(), "all requested tasks finished");
                    }
                    CoreCommand::Abort(failed) => {
                        error!(?failed, "build failed; stopping");
                        return Err(SitepipeError::BuildFailed(failed));
                    }
                }
            }

            if !keep_running {
                return Ok(());
            }
        }

        info!("event channel closed; stopping");
        Ok(())
    }

    async fn dispatch(&mut self, tasks: Vec<ScheduledTask>) -> Result<()> {
        debug!(tasks = ?tasks.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(), "dispatching");
        self.executor.spawn_ready_tasks(tasks).await
    }
}
