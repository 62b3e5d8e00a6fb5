// src/exec/task_runner.rs

//! Individual task invocation.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::dag::ScheduledTask;
use crate::engine::{RuntimeEvent, TaskOutcome};
use crate::tasks::{self, TaskContext, TaskHandle, TaskId};

/// Run one invocation of a task and emit its `TaskCompleted` event.
///
/// On success the task's reload notification goes out to connected browsers
/// before the scheduler hears about it; on failure the error is logged and
/// broadcast as an `error` message.
pub async fn run_task(
    task: ScheduledTask,
    ctx: Arc<TaskContext>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) {
    let name = task.name.clone();
    let run_id = task.run_id;

    let outcome = match name.parse::<TaskId>() {
        Ok(id) => {
            info!(task = %name, run_id, "starting task");
            let handle = TaskHandle::new(id, runtime_tx.clone());

            match tasks::run(id, &ctx, &handle).await {
                Ok(written) => {
                    info!(task = %name, run_id, outputs = written.len(), "task finished");
                    if let Some(message) = id.reload_message(&ctx.paths, &written) {
                        ctx.reload.notify(message);
                    }
                    TaskOutcome::Success
                }
                Err(err) => {
                    error!(task = %name, run_id, error = %err, "task failed");
                    ctx.reload.notify_error(&name, &err.to_string());
                    TaskOutcome::Failed
                }
            }
        }
        Err(err) => {
            error!(task = %name, run_id, error = %err, "no task function for scheduled task");
            TaskOutcome::Failed
        }
    };

    if runtime_tx
        .send(RuntimeEvent::TaskCompleted {
            task: name.clone(),
            outcome,
        })
        .await
        .is_err()
    {
        warn!(task = %name, run_id, "runtime gone; dropping completion event");
    }
}
