use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use sitepipe::dag::ScheduledTask;
use sitepipe::engine::{RuntimeEvent, TaskOutcome};
use sitepipe::exec::{ExecutorBackend, SpawnFuture};
use tokio::sync::mpsc;

/// Names of dispatched tasks, in dispatch order.
pub type Executed = Arc<Mutex<Vec<String>>>;

/// Stand-in for the real executor: runs nothing, answers at once.
///
/// Long-lived tasks get `TaskProgressed`; everything else `TaskCompleted`,
/// failed for the names given to [`FakeExecutor::failing`].
pub struct FakeExecutor {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    executed: Executed,
    failing: HashSet<String>,
}

impl FakeExecutor {
    pub fn new(runtime_tx: mpsc::Sender<RuntimeEvent>, executed: Executed) -> Self {
        Self {
            runtime_tx,
            executed,
            failing: HashSet::new(),
        }
    }

    pub fn failing<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.failing.extend(names.into_iter().map(Into::into));
        self
    }

    fn answer(&self, task: ScheduledTask) -> RuntimeEvent {
        if task.long_lived {
            return RuntimeEvent::TaskProgressed { task: task.name };
        }
        let outcome = if self.failing.contains(&task.name) {
            TaskOutcome::Failed
        } else {
            TaskOutcome::Success
        };
        RuntimeEvent::TaskCompleted {
            task: task.name,
            outcome,
        }
    }
}

impl ExecutorBackend for FakeExecutor {
    fn spawn_ready_tasks(&mut self, tasks: Vec<ScheduledTask>) -> SpawnFuture<'_> {
        Box::pin(async move {
            for task in tasks {
                self.executed.lock().unwrap().push(task.name.clone());
                let event = self.answer(task);
                self.runtime_tx.send(event).await.map_err(anyhow::Error::from)?;
            }
            Ok(())
        })
    }
}
