// src/engine/queue.rs

use std::collections::{BTreeSet, VecDeque};

use serde::Deserialize;
use tracing::{debug, warn};

use crate::engine::TaskName;

/// What to do with a watch trigger for a task that is already part of the
/// active run. The running task itself is never interrupted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerWhileRunningBehaviour {
    /// Remember it and replay it once the run finishes, coalescing repeats.
    #[default]
    Queue,
    /// Forget anything queued earlier and keep only the latest trigger.
    Cancel,
}

/// Triggers parked until the active run finishes.
///
/// Each entry is a batch of task names that seeds one follow-up run; at most
/// `max_batches` are kept (oldest dropped first). With the default of 1
/// everything coalesces into a single follow-up run.
#[derive(Debug)]
pub struct TriggerQueue {
    behaviour: TriggerWhileRunningBehaviour,
    max_batches: usize,
    batches: VecDeque<BTreeSet<TaskName>>,
}

impl TriggerQueue {
    pub fn new(behaviour: TriggerWhileRunningBehaviour, max_batches: usize) -> Self {
        Self {
            behaviour,
            max_batches: max_batches.max(1),
            batches: VecDeque::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    pub fn record_trigger(&mut self, task: &str) {
        match self.behaviour {
            TriggerWhileRunningBehaviour::Queue => {
                let fresh = match self.batches.back_mut() {
                    Some(batch) => batch.insert(task.to_string()),
                    None => {
                        self.batches.push_back(BTreeSet::from([task.to_string()]));
                        true
                    }
                };
                debug!(task, fresh, "re-trigger queued for the next run");

                while self.batches.len() > self.max_batches {
                    warn!(max_batches = self.max_batches, "trigger queue full; dropping oldest batch");
                    self.batches.pop_front();
                }
            }
            TriggerWhileRunningBehaviour::Cancel => {
                debug!(task, "replacing queued triggers with the latest one");
                self.batches.clear();
                self.batches.push_back(BTreeSet::from([task.to_string()]));
            }
        }
    }

    /// Everything queued, merged into one sorted list.
    pub fn drain_pending(&mut self) -> Vec<TaskName> {
        let merged: BTreeSet<TaskName> = self.batches.drain(..).flatten().collect();
        if !merged.is_empty() {
            debug!(tasks = ?merged, "replaying queued triggers");
        }
        merged.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_mode_coalesces_repeated_triggers() {
        let mut q = TriggerQueue::new(TriggerWhileRunningBehaviour::Queue, 1);
        q.record_trigger("templates");
        q.record_trigger("templates");
        q.record_trigger("styles-dev");

        assert_eq!(q.drain_pending(), vec!["styles-dev".to_string(), "templates".to_string()]);
        assert!(q.is_empty());
    }

    #[test]
    fn cancel_mode_keeps_only_latest_trigger() {
        let mut q = TriggerQueue::new(TriggerWhileRunningBehaviour::Cancel, 4);
        q.record_trigger("templates");
        q.record_trigger("scripts-dev");

        assert_eq!(q.drain_pending(), vec!["scripts-dev".to_string()]);
    }

    #[test]
    fn behaviour_names_are_lowercase_in_config() {
        #[derive(Deserialize)]
        struct Section {
            behaviour: TriggerWhileRunningBehaviour,
        }
        let s: Section = toml::from_str("behaviour = \"cancel\"").unwrap();
        assert_eq!(s.behaviour, TriggerWhileRunningBehaviour::Cancel);
        assert!(toml::from_str::<Section>("behaviour = \"drop\"").is_err());
    }
}
