// src/engine/mod.rs

//! Orchestration engine.
//!
//! Watch triggers, readiness reports, completions and Ctrl-C all arrive on
//! one channel as [`RuntimeEvent`]s. [`CoreRuntime`] turns each event into
//! [`CoreCommand`]s without doing any IO; [`Runtime`] owns the channel and
//! the executor and carries the commands out.

pub mod core;
pub mod queue;
pub mod runtime;

pub use core::{CoreCommand, CoreRuntime, CoreStep};
pub use queue::{TriggerQueue, TriggerWhileRunningBehaviour};
pub use runtime::Runtime;

pub type TaskName = String;

/// Result of one task invocation as the scheduler sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    /// Entry task of the target picked on the command line.
    Initial,
    /// A watch binding matched a changed file.
    FileWatch,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeOptions {
    /// Leave the event loop once nothing is running or queued. Set for
    /// targets without long-lived tasks.
    pub exit_when_idle: bool,
}

#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    TaskTriggered {
        task: TaskName,
        reason: TriggerReason,
    },
    /// A long-lived task is up: the server is bound or the watcher is
    /// registered.
    TaskProgressed { task: TaskName },
    TaskCompleted { task: TaskName, outcome: TaskOutcome },
    ShutdownRequested,
}
