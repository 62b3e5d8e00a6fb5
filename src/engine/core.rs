// src/engine/core.rs

//! IO-free orchestration state machine.
//!
//! Everything that decides *what happens next* lives here, so series abort,
//! parallel fan-out and re-trigger queueing can be tested by feeding events
//! by hand.

use std::collections::BTreeSet;

use tracing::{info, warn};

use crate::dag::{ScheduledTask, Scheduler, SchedulerStep, TaskRunState};
use crate::engine::queue::{TriggerQueue, TriggerWhileRunningBehaviour};
use crate::engine::{RuntimeEvent, RuntimeOptions, TaskName, TriggerReason};

/// Instruction for the IO shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreCommand {
    DispatchTasks(Vec<ScheduledTask>),
    /// Everything requested has finished; leave cleanly.
    RequestExit,
    /// A run that had to succeed did not; leave with these failed tasks.
    Abort(Vec<TaskName>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreStep {
    pub commands: Vec<CoreCommand>,
    pub keep_running: bool,
}

impl CoreStep {
    fn proceed(commands: Vec<CoreCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }

    fn stop(commands: Vec<CoreCommand>) -> Self {
        Self {
            commands,
            keep_running: false,
        }
    }
}

#[derive(Debug)]
pub struct CoreRuntime {
    scheduler: Scheduler,
    queue: TriggerQueue,
    options: RuntimeOptions,
    /// Failures of the active run, reported when it finishes.
    failed: BTreeSet<TaskName>,
    finished_runs: u64,
}

impl CoreRuntime {
    pub fn new(
        scheduler: Scheduler,
        behaviour: TriggerWhileRunningBehaviour,
        queue_length: usize,
        options: RuntimeOptions,
    ) -> Self {
        Self {
            scheduler,
            queue: TriggerQueue::new(behaviour, queue_length),
            options,
            failed: BTreeSet::new(),
            finished_runs: 0,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.scheduler.is_idle()
    }

    pub fn queue_is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn finished_runs(&self) -> u64 {
        self.finished_runs
    }

    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        match event {
            RuntimeEvent::TaskTriggered { task, reason } => self.on_trigger(task, reason),
            RuntimeEvent::TaskProgressed { task } => {
                let step = self.scheduler.step_progress(&task);
                self.settle(step)
            }
            RuntimeEvent::TaskCompleted { task, outcome } => {
                let step = self.scheduler.step_completion(&task, outcome);
                self.settle(step)
            }
            RuntimeEvent::ShutdownRequested => {
                info!("shutdown requested");
                CoreStep::stop(Vec::new())
            }
        }
    }

    /// - Idle: open a run seeded with this trigger plus anything queued.
    /// - Task not in the active run, or already finished in it: (re)join the
    ///   run right away, so independent watch bindings never wait on each
    ///   other.
    /// - Task pending or running: park it in the queue.
    fn on_trigger(&mut self, task: TaskName, reason: TriggerReason) -> CoreStep {
        if self.scheduler.is_idle() {
            let mut seeds = self.queue.drain_pending();
            if !seeds.contains(&task) {
                seeds.push(task);
            }
            info!(?seeds, ?reason, "starting run");
            return CoreStep::proceed(self.begin_run(seeds));
        }

        let mut commands = Vec::new();
        match self.scheduler.run_state_of(&task) {
            None => warn!(task = %task, "trigger for unknown task; ignoring"),
            Some(state) if !state.is_active() => {
                self.failed.remove(&task);
                dispatch(&mut commands, self.scheduler.handle_trigger(&task));
            }
            Some(state) => {
                info!(task = %task, ?state, "task already in the active run; queueing re-trigger");
                self.queue.record_trigger(&task);
            }
        }
        CoreStep::proceed(commands)
    }

    fn begin_run(&mut self, seeds: Vec<TaskName>) -> Vec<CoreCommand> {
        let mut commands = Vec::new();
        if seeds.is_empty() {
            return commands;
        }

        self.scheduler.start_new_run();
        let mut ready = Vec::new();
        for task in &seeds {
            ready.extend(self.scheduler.handle_trigger(task));
        }
        dispatch(&mut commands, ready);
        commands
    }

    /// Common tail of progress and completion handling.
    ///
    /// The first run is the startup build: if it fails, nothing downstream is
    /// up and the process has to stop. One-shot targets stop on any failure.
    /// Otherwise a failed rebuild is only reported and the next change gets
    /// another chance.
    fn settle(&mut self, step: SchedulerStep) -> CoreStep {
        let mut commands = Vec::new();
        self.failed.extend(step.newly_failed);
        dispatch(&mut commands, step.newly_scheduled);

        if step.run_just_finished {
            let startup = self.finished_runs == 0;
            self.finished_runs += 1;
            let failed: Vec<TaskName> = std::mem::take(&mut self.failed).into_iter().collect();

            if !failed.is_empty() {
                if startup || self.options.exit_when_idle {
                    commands.push(CoreCommand::Abort(failed));
                    return CoreStep::stop(commands);
                }
                warn!(?failed, "rebuild failed; waiting for further changes");
            }
        }

        if self.scheduler.is_idle() {
            let seeds = self.queue.drain_pending();
            commands.extend(self.begin_run(seeds));
        }

        if self.options.exit_when_idle && self.scheduler.is_idle() && self.queue.is_empty() {
            commands.push(CoreCommand::RequestExit);
            return CoreStep::stop(commands);
        }

        CoreStep::proceed(commands)
    }
}

fn dispatch(commands: &mut Vec<CoreCommand>, tasks: Vec<ScheduledTask>) {
    if !tasks.is_empty() {
        commands.push(CoreCommand::DispatchTasks(tasks));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose;
    use crate::engine::TaskOutcome;

    fn core(comp: &compose::Composition) -> CoreRuntime {
        let plan = compose::plan(comp).unwrap();
        CoreRuntime::new(
            Scheduler::from_graph(&plan.graph),
            TriggerWhileRunningBehaviour::Queue,
            1,
            RuntimeOptions {
                exit_when_idle: plan.exit_when_idle,
            },
        )
    }

    fn trigger(task: &str, reason: TriggerReason) -> RuntimeEvent {
        RuntimeEvent::TaskTriggered {
            task: task.into(),
            reason,
        }
    }

    fn done(task: &str, outcome: TaskOutcome) -> RuntimeEvent {
        RuntimeEvent::TaskCompleted {
            task: task.into(),
            outcome,
        }
    }

    fn dispatched(step: &CoreStep) -> Vec<String> {
        step.commands
            .iter()
            .filter_map(|c| match c {
                CoreCommand::DispatchTasks(tasks) => Some(tasks),
                _ => None,
            })
            .flatten()
            .map(|t| t.name.clone())
            .collect()
    }

    #[test]
    fn single_task_target_exits_after_success() {
        let mut core = core(&compose::for_target(crate::cli::Target::Public));
        let step = core.step(trigger("public", TriggerReason::Initial));
        assert_eq!(dispatched(&step), vec!["public"]);

        let step = core.step(done("public", TaskOutcome::Success));
        assert_eq!(step, CoreStep::stop(vec![CoreCommand::RequestExit]));
        assert_eq!(core.finished_runs(), 1);
    }

    #[test]
    fn failed_rebuild_after_startup_keeps_watching() {
        let mut core = core(&compose::for_target(crate::cli::Target::Watch));
        core.step(trigger("watch", TriggerReason::Initial));
        let step = core.step(RuntimeEvent::TaskProgressed {
            task: "watch".into(),
        });
        assert!(step.keep_running);

        let step = core.step(trigger("templates", TriggerReason::FileWatch));
        assert_eq!(dispatched(&step), vec!["templates"]);
        let step = core.step(done("templates", TaskOutcome::Failed));
        assert!(step.keep_running);
        assert!(step.commands.is_empty());
        assert!(core.is_idle());
    }

    #[test]
    fn independent_trigger_joins_the_active_run() {
        let mut core = core(&compose::for_target(crate::cli::Target::Watch));
        core.step(trigger("watch", TriggerReason::Initial));
        core.step(RuntimeEvent::TaskProgressed {
            task: "watch".into(),
        });

        core.step(trigger("styles-dev", TriggerReason::FileWatch));
        let step = core.step(trigger("scripts-dev", TriggerReason::FileWatch));
        assert_eq!(dispatched(&step), vec!["scripts-dev"]);

        // Same task again while it runs: queued, replayed after the run.
        let step = core.step(trigger("styles-dev", TriggerReason::FileWatch));
        assert!(step.commands.is_empty());
        assert!(!core.queue_is_empty());

        core.step(done("scripts-dev", TaskOutcome::Success));
        let step = core.step(done("styles-dev", TaskOutcome::Success));
        assert_eq!(dispatched(&step), vec!["styles-dev"]);
        assert_eq!(core.scheduler().current_run_id(), Some(3));
    }

    #[test]
    fn finished_binding_rebuilds_while_another_is_still_running() {
        let mut core = core(&compose::for_target(crate::cli::Target::Watch));
        core.step(trigger("watch", TriggerReason::Initial));
        core.step(RuntimeEvent::TaskProgressed {
            task: "watch".into(),
        });

        core.step(trigger("scripts-dev", TriggerReason::FileWatch));
        core.step(trigger("styles-dev", TriggerReason::FileWatch));
        core.step(done("styles-dev", TaskOutcome::Success));

        let step = core.step(trigger("styles-dev", TriggerReason::FileWatch));
        assert_eq!(dispatched(&step), vec!["styles-dev"]);
        assert!(core.queue_is_empty());
        assert_eq!(core.scheduler().current_run_id(), Some(2));

        core.step(done("styles-dev", TaskOutcome::Success));
        let step = core.step(done("scripts-dev", TaskOutcome::Success));
        assert!(step.commands.is_empty());
        assert!(core.is_idle());
    }

    #[test]
    fn failed_rebuild_in_default_target_does_not_report_long_lived_tasks() {
        let mut core = core(&compose::default_pipeline());
        core.step(trigger("clean", TriggerReason::Initial));
        core.step(done("clean", TaskOutcome::Success));
        for leaf in [
            "public",
            "templates",
            "styles-lib",
            "styles-dev",
            "scripts-lib",
            "scripts-dev",
        ] {
            core.step(done(leaf, TaskOutcome::Success));
        }
        core.step(RuntimeEvent::TaskProgressed {
            task: "watch".into(),
        });
        core.step(RuntimeEvent::TaskProgressed {
            task: "serve".into(),
        });
        assert!(core.is_idle());

        core.step(trigger("templates", TriggerReason::FileWatch));
        let step = core.step(done("templates", TaskOutcome::Failed));
        assert!(step.keep_running);
        assert!(core.is_idle());
        assert_eq!(core.scheduler().run_state_of("serve"), Some(TaskRunState::DoneSuccess));
        assert_eq!(core.scheduler().run_state_of("watch"), Some(TaskRunState::DoneSuccess));
    }
}
