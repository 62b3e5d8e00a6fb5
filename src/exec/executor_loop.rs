// src/exec/executor_loop.rs

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::dag::ScheduledTask;
use crate::engine::RuntimeEvent;
use crate::exec::task_runner::run_task;
use crate::tasks::TaskContext;

/// Start the background loop that runs scheduled tasks and return its input
/// queue.
///
/// Each task runs in its own Tokio task. There is never more than one
/// instance per task name:
///
/// - a long-lived task (`serve`, `watch`) that is still up is not started
///   again; its running instance answers for the new run with a synthesized
///   `TaskProgressed`;
/// - a finite task whose previous instance is still going is awaited before
///   the new one starts.
pub fn spawn_executor(
    ctx: Arc<TaskContext>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) -> mpsc::Sender<ScheduledTask> {
    let (tx, mut rx) = mpsc::channel::<ScheduledTask>(32);

    let mut executor = ExecutorLoop {
        ctx,
        runtime_tx,
        instances: HashMap::new(),
    };

    tokio::spawn(async move {
        info!("executor loop started");
        while let Some(task) = rx.recv().await {
            executor.accept(task).await;
        }
        info!("executor loop finished");
    });

    tx
}

struct ExecutorLoop {
    ctx: Arc<TaskContext>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    instances: HashMap<String, JoinHandle<()>>,
}

impl ExecutorLoop {
    async fn accept(&mut self, task: ScheduledTask) {
        if let Some(previous) = self.instances.remove(&task.name) {
            if task.long_lived && !previous.is_finished() {
                debug!(task = %task.name, run_id = task.run_id, "already up; reporting ready");
                self.instances.insert(task.name.clone(), previous);
                let _ = self
                    .runtime_tx
                    .send(RuntimeEvent::TaskProgressed { task: task.name })
                    .await;
                return;
            }

            if !previous.is_finished() {
                debug!(task = %task.name, run_id = task.run_id, "waiting for previous instance");
            }
            let _ = previous.await;
        }

        let name = task.name.clone();
        let ctx = Arc::clone(&self.ctx);
        let runtime_tx = self.runtime_tx.clone();
        let instance = tokio::spawn(run_task(task, ctx, runtime_tx));
        self.instances.insert(name, instance);
    }
}
