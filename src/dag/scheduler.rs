// src/dag/scheduler.rs

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::dag::graph::TaskGraph;
use crate::dag::state::{ScheduledTask, TaskEntry, TaskRunState};
use crate::engine::{TaskName, TaskOutcome};

/// What changed as the result of feeding one event to the [`Scheduler`].
#[derive(Debug, Clone, Default)]
pub struct SchedulerStep {
    /// Tasks to hand to the executor, in graph declaration order.
    pub newly_scheduled: Vec<ScheduledTask>,
    /// The failing task first, then every dependent it blocked.
    pub newly_failed: Vec<TaskName>,
    /// The active run ended with this step.
    pub run_just_finished: bool,
}

/// Interprets a [`TaskGraph`] run by run.
///
/// A *run* starts with one or more triggered tasks. Each triggered task pulls
/// its downstream dependents into the run; a task is dispatched once all of
/// its `after` tasks are done; a failure fails everything downstream of it
/// (series abort) while unrelated branches carry on (parallel fan-out). The
/// run ends when no participating task is pending or running.
///
/// An `after` task that is not part of the run counts as done if it
/// succeeded in an earlier run, which is what lets a watch-triggered rebuild
/// of one leaf skip `clean`.
#[derive(Debug)]
pub struct Scheduler {
    /// Graph declaration order; every walk goes through it so dispatch order
    /// never depends on hashing.
    entries: Vec<TaskEntry>,
    index: HashMap<TaskName, usize>,
    runs_started: u64,
    active_run: Option<u64>,
}

impl Scheduler {
    /// Build the task table from a validated graph.
    pub fn from_graph(graph: &TaskGraph) -> Self {
        let mut entries: Vec<TaskEntry> = graph.nodes().iter().map(TaskEntry::new).collect();
        let index: HashMap<TaskName, usize> = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.name.clone(), i))
            .collect();

        for node in graph.nodes() {
            for dep in &node.after {
                if let Some(&i) = index.get(dep) {
                    entries[i].dependents.push(node.name.clone());
                }
            }
        }

        Self {
            entries,
            index,
            runs_started: 0,
            active_run: None,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.active_run.is_none()
    }

    pub fn current_run_id(&self) -> Option<u64> {
        self.active_run
    }

    /// `None` for a task the graph does not know.
    pub fn run_state_of(&self, task: &str) -> Option<TaskRunState> {
        self.entry(task).map(|e| e.state)
    }

    /// Tasks participating in the active run, in declaration order.
    pub fn tasks_in_current_run(&self) -> Vec<TaskName> {
        self.entries
            .iter()
            .filter(|e| e.state != TaskRunState::NotInRun)
            .map(|e| e.name.clone())
            .collect()
    }

    /// Whether every `after` task of `task` is done for the active run.
    pub fn deps_satisfied(&self, task: &str) -> Option<bool> {
        self.entry(task).map(|e| self.ready_to_start(e))
    }

    /// Open a new run. Per-run states reset; success history is kept.
    pub fn start_new_run(&mut self) {
        self.runs_started += 1;
        self.active_run = Some(self.runs_started);
        for entry in &mut self.entries {
            entry.state = TaskRunState::NotInRun;
        }
        debug!(run_id = self.runs_started, "scheduler: starting new run");
    }

    pub fn handle_trigger(&mut self, task: &str) -> Vec<ScheduledTask> {
        self.step_trigger(task).newly_scheduled
    }

    pub fn handle_progress(&mut self, task: &str) -> Vec<ScheduledTask> {
        self.step_progress(task).newly_scheduled
    }

    pub fn handle_completion(&mut self, task: &str, outcome: TaskOutcome) -> Vec<ScheduledTask> {
        self.step_completion(task, outcome).newly_scheduled
    }

    /// Pull `task` and everything downstream of it into the active run,
    /// opening one if needed.
    pub fn step_trigger(&mut self, task: &str) -> SchedulerStep {
        if self.active_run.is_none() {
            self.start_new_run();
        }

        if self.index.contains_key(task) {
            self.pull_into_run(task);
        } else {
            warn!(task = %task, "trigger for unknown task; ignoring");
        }

        self.finish_step(Vec::new())
    }

    /// A long-lived task is up: it counts as done so its dependents may
    /// start.
    pub fn step_progress(&mut self, task: &str) -> SchedulerStep {
        let Some(run_id) = self.active_run else {
            debug!(task = %task, "progress with no active run; ignoring");
            return SchedulerStep::default();
        };

        match self.entry_mut(task) {
            Some(entry) if entry.state != TaskRunState::NotInRun => {
                debug!(task = %entry.name, run_id, "task reported ready");
                entry.state = TaskRunState::DoneSuccess;
                entry.last_success = Some(run_id);
            }
            Some(_) => {
                debug!(task = %task, run_id, "progress from task outside the run; ignoring");
                return SchedulerStep::default();
            }
            None => {
                warn!(task = %task, "progress from unknown task; ignoring");
                return SchedulerStep::default();
            }
        }

        self.finish_step(Vec::new())
    }

    /// Record the outcome of a running task.
    ///
    /// Completions for tasks that are not running in the active run (a
    /// long-lived task that already reported readiness, or a leftover from an
    /// earlier run) change nothing.
    pub fn step_completion(&mut self, task: &str, outcome: TaskOutcome) -> SchedulerStep {
        let Some(run_id) = self.active_run else {
            warn!(task = %task, "completion with no active run; ignoring");
            return SchedulerStep::default();
        };

        let Some(entry) = self.entry_mut(task) else {
            warn!(task = %task, "completion for unknown task; ignoring");
            return SchedulerStep::default();
        };

        if entry.state != TaskRunState::Running {
            debug!(task = %entry.name, run_id, state = ?entry.state, ?outcome, "stale completion; ignoring");
            return SchedulerStep::default();
        }

        let mut failed = Vec::new();
        match outcome {
            TaskOutcome::Success => {
                entry.state = TaskRunState::DoneSuccess;
                entry.last_success = Some(run_id);
                debug!(task = %entry.name, run_id, "task succeeded");
            }
            TaskOutcome::Failed => {
                entry.state = TaskRunState::DoneFailed;
                entry.last_failure = Some(run_id);
                warn!(task = %entry.name, run_id, "task failed; failing its dependents in this run");
                failed.push(entry.name.clone());
                failed.extend(self.fail_downstream(task));
            }
        }

        self.finish_step(failed)
    }

    fn entry(&self, task: &str) -> Option<&TaskEntry> {
        self.index.get(task).map(|&i| &self.entries[i])
    }

    fn entry_mut(&mut self, task: &str) -> Option<&mut TaskEntry> {
        self.index.get(task).map(|&i| &mut self.entries[i])
    }

    fn ready_to_start(&self, entry: &TaskEntry) -> bool {
        entry.after.iter().all(|dep| match self.entry(dep) {
            Some(dep) => dep.satisfies_dependents(),
            None => {
                warn!(task = %entry.name, dep = %dep, "dependency missing from task table");
                false
            }
        })
    }

    /// Pending and running tasks keep their state. Tasks that already
    /// finished in this run go back to pending and run again.
    fn pull_into_run(&mut self, root: &str) {
        let mut stack = vec![root.to_string()];
        while let Some(name) = stack.pop() {
            let Some(entry) = self.entry_mut(&name) else {
                continue;
            };
            if entry.state.is_active() {
                continue;
            }
            let rejoined = entry.state != TaskRunState::NotInRun;
            entry.state = TaskRunState::Pending;
            debug!(task = %entry.name, rejoined, "joined run as pending");
            stack.extend(entry.dependents.iter().cloned());
        }
    }

    /// Series abort: everything downstream of `task` that is still pending
    /// becomes failed. Returns those tasks.
    ///
    /// A long-lived task that is already up keeps running, so it is marked
    /// done instead and the walk stops there.
    fn fail_downstream(&mut self, task: &str) -> Vec<TaskName> {
        let mut failed = Vec::new();
        let mut stack = self.entry(task).map(|e| e.dependents.clone()).unwrap_or_default();

        while let Some(name) = stack.pop() {
            let Some(entry) = self.entry_mut(&name) else {
                continue;
            };
            if !entry.state.is_active() {
                continue;
            }
            if entry.long_lived && entry.last_success.is_some() {
                debug!(task = %entry.name, upstream = %task, "still up; not failed");
                entry.state = TaskRunState::DoneSuccess;
                continue;
            }
            entry.state = TaskRunState::DoneFailed;
            debug!(task = %entry.name, upstream = %task, "blocked by upstream failure");
            failed.push(entry.name.clone());
            stack.extend(entry.dependents.iter().cloned());
        }

        failed
    }

    /// Dispatch whatever became ready, then close the run if nothing is left.
    fn finish_step(&mut self, newly_failed: Vec<TaskName>) -> SchedulerStep {
        let run_id = self.active_run.unwrap_or(0);

        let ready: Vec<usize> = (0..self.entries.len())
            .filter(|&i| {
                let entry = &self.entries[i];
                entry.state == TaskRunState::Pending && self.ready_to_start(entry)
            })
            .collect();

        let mut newly_scheduled = Vec::with_capacity(ready.len());
        for i in ready {
            let entry = &mut self.entries[i];
            info!(task = %entry.name, run_id, rebuild = entry.has_run_before(), "dispatching task");
            entry.state = TaskRunState::Running;
            newly_scheduled.push(ScheduledTask {
                name: entry.name.clone(),
                long_lived: entry.long_lived,
                run_id,
            });
        }

        let run_just_finished =
            self.active_run.is_some() && !self.entries.iter().any(|e| e.state.is_active());
        if run_just_finished {
            info!(run_id, "scheduler: run finished");
            self.active_run = None;
        }

        SchedulerStep {
            newly_scheduled,
            newly_failed,
            run_just_finished,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> TaskGraph {
        let mut graph = TaskGraph::new();
        graph.add_node("a", &[], false);
        graph.add_node("b", &["a".to_string()], false);
        graph.add_node("c", &["b".to_string()], true);
        graph
    }

    #[test]
    fn failure_in_the_middle_fails_the_tail() {
        let mut s = Scheduler::from_graph(&chain());
        s.handle_trigger("a");
        s.handle_completion("a", TaskOutcome::Success);

        let step = s.step_completion("b", TaskOutcome::Failed);
        assert_eq!(step.newly_failed, vec!["b".to_string(), "c".to_string()]);
        assert!(step.run_just_finished);
        assert_eq!(s.run_state_of("c"), Some(TaskRunState::DoneFailed));
    }

    #[test]
    fn earlier_success_satisfies_dependencies_outside_the_run() {
        let mut s = Scheduler::from_graph(&chain());
        s.handle_trigger("a");
        s.handle_completion("a", TaskOutcome::Success);
        s.handle_completion("b", TaskOutcome::Success);
        assert!(s.step_progress("c").run_just_finished);

        let ready = s.handle_trigger("b");
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].name, "b");
        assert_eq!(ready[0].run_id, 2);
        assert_eq!(s.tasks_in_current_run(), vec!["b".to_string(), "c".to_string()]);
    }

    #[test]
    fn finished_task_rejoins_the_active_run() {
        let mut graph = TaskGraph::new();
        graph.add_node("a", &[], false);
        graph.add_node("b", &[], false);
        let mut s = Scheduler::from_graph(&graph);

        s.handle_trigger("a");
        s.handle_trigger("b");
        s.handle_completion("a", TaskOutcome::Success);

        let ready = s.handle_trigger("a");
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].name, "a");
        assert_eq!(ready[0].run_id, 1);

        // Running tasks are left alone.
        assert!(s.handle_trigger("b").is_empty());
        assert_eq!(s.run_state_of("b"), Some(TaskRunState::Running));
    }

    #[test]
    fn running_long_lived_dependents_survive_a_failed_rebuild() {
        let mut s = Scheduler::from_graph(&chain());
        s.handle_trigger("a");
        s.handle_completion("a", TaskOutcome::Success);
        s.handle_completion("b", TaskOutcome::Success);
        s.handle_progress("c");
        assert!(s.is_idle());

        s.handle_trigger("b");
        let step = s.step_completion("b", TaskOutcome::Failed);
        assert_eq!(step.newly_failed, vec!["b".to_string()]);
        assert!(step.run_just_finished);
        assert_eq!(s.run_state_of("c"), Some(TaskRunState::DoneSuccess));
    }

    #[test]
    fn unknown_task_opens_an_empty_run_that_closes_immediately() {
        let mut s = Scheduler::from_graph(&chain());
        let step = s.step_trigger("nope");
        assert!(step.newly_scheduled.is_empty());
        assert!(step.run_just_finished);
        assert!(s.is_idle());
    }
}
