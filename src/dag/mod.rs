// src/dag/mod.rs

//! The task graph and the scheduler that walks it.
//!
//! [`TaskGraph`] is what the composition layer produces: named tasks with
//! `after` constraints. [`Scheduler`] keeps one row of run state per task and
//! answers "what may start now?" as triggers, readiness reports and
//! completions come in.

pub mod graph;
pub mod scheduler;
pub mod state;

pub use graph::{TaskGraph, TaskNode};
pub use scheduler::{Scheduler, SchedulerStep};
pub use state::{ScheduledTask, TaskRunState};
