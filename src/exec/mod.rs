// src/exec/mod.rs

//! Task execution layer.
//!
//! Runs the tasks the scheduler dispatches and reports back to the
//! orchestration runtime via `RuntimeEvent`s.
//!
//! - [`executor_loop`] owns the loop that keeps at most one instance of each
//!   task alive.
//! - [`task_runner`] runs a single task invocation, broadcasts its reload
//!   notification, and emits the completion event.
//! - [`command`] runs external stage commands (`sass`, `postcss`, `rollup`).
//! - [`backend`] provides the `ExecutorBackend` trait and the
//!   `RealExecutorBackend` used in production; tests swap in a fake.

pub mod backend;
pub mod command;
pub mod executor_loop;
pub mod task_runner;

pub use backend::{ExecutorBackend, RealExecutorBackend, SpawnFuture};
pub use executor_loop::spawn_executor;
