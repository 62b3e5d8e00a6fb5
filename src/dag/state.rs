// src/dag/state.rs

//! Per-task scheduling state.

use crate::dag::graph::TaskNode;
use crate::engine::TaskName;

/// Where a task stands in the active run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskRunState {
    /// Not part of the active run (or no run is active).
    #[default]
    NotInRun,
    /// Pulled into the run, waiting for its `after` tasks.
    Pending,
    /// Handed to the executor.
    Running,
    /// Completed, or for a long-lived task, reported that it is up.
    DoneSuccess,
    /// Failed itself, or an upstream task failed.
    DoneFailed,
}

impl TaskRunState {
    /// Still has work to do in this run.
    pub fn is_active(self) -> bool {
        matches!(self, TaskRunState::Pending | TaskRunState::Running)
    }
}

/// Row of the scheduler's task table.
#[derive(Debug, Clone)]
pub(crate) struct TaskEntry {
    pub name: TaskName,
    pub long_lived: bool,
    pub after: Vec<TaskName>,
    /// Filled in from the other nodes' `after` lists.
    pub dependents: Vec<TaskName>,
    pub state: TaskRunState,
    /// Run ID of the latest success; satisfies dependents in later runs that
    /// do not include this task.
    pub last_success: Option<u64>,
    pub last_failure: Option<u64>,
}

impl TaskEntry {
    pub fn new(node: &TaskNode) -> Self {
        Self {
            name: node.name.clone(),
            long_lived: node.long_lived,
            after: node.after.clone(),
            dependents: Vec::new(),
            state: TaskRunState::NotInRun,
            last_success: None,
            last_failure: None,
        }
    }

    pub fn has_run_before(&self) -> bool {
        self.last_success.is_some() || self.last_failure.is_some()
    }

    /// As a dependency: done for the purposes of the active run.
    pub fn satisfies_dependents(&self) -> bool {
        match self.state {
            TaskRunState::DoneSuccess => true,
            TaskRunState::NotInRun => self.last_success.is_some(),
            _ => false,
        }
    }
}

/// A task the scheduler wants started now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledTask {
    pub name: TaskName,
    pub long_lived: bool,
    /// Shared by every task dispatched for the same run.
    pub run_id: u64,
}
