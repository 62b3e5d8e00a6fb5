// src/watch/event_handler.rs

//! Turning filesystem events into task triggers.

use std::collections::BTreeSet;
use std::path::Path;

use notify::{Event, EventKind};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::engine::{RuntimeEvent, TriggerReason};
use crate::tasks::TaskId;
use crate::watch::path_utils::relative_str;
use crate::watch::patterns::WatchBinding;

/// Tasks whose bindings match `rel_path`.
pub fn matching_tasks(bindings: &[WatchBinding], rel_path: &str) -> Vec<TaskId> {
    bindings
        .iter()
        .filter(|b| b.matches(rel_path))
        .map(|b| b.task())
        .collect()
}

/// Add every task matched by `event` to `pending`.
///
/// Access events (reads, opens) never change content and are ignored.
pub fn collect_event(
    root: &Path,
    event: &Event,
    bindings: &[WatchBinding],
    pending: &mut BTreeSet<TaskId>,
) {
    if matches!(event.kind, EventKind::Access(_)) {
        return;
    }

    for path in &event.paths {
        let Some(rel) = relative_str(root, path) else {
            warn!(?path, ?root, "could not relativize event path");
            continue;
        };

        let tasks = matching_tasks(bindings, &rel);
        if !tasks.is_empty() {
            debug!(path = %rel, ?tasks, "watch match");
        }
        pending.extend(tasks);
    }
}

/// Send one `TaskTriggered` per pending task.
///
/// Returns `false` once the runtime channel is closed.
pub async fn dispatch_triggers(
    pending: BTreeSet<TaskId>,
    runtime_tx: &mpsc::Sender<RuntimeEvent>,
) -> bool {
    for task in pending {
        info!(task = %task, "change detected; triggering task");
        let event = RuntimeEvent::TaskTriggered {
            task: task.as_str().to_string(),
            reason: TriggerReason::FileWatch,
        };
        if let Err(err) = runtime_tx.send(event).await {
            warn!("failed to send RuntimeEvent::TaskTriggered: {err}");
            return false;
        }
    }
    true
}
