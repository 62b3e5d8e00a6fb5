// src/compose.rs

//! Series/parallel task composition.
//!
//! A [`Composition`] is lowered into an explicit [`TaskGraph`]: in a series,
//! every exit of one stage becomes an `after` dependency of every entry of
//! the next; parallel branches share the same `after` list and their exits
//! are unioned. The scheduler then interprets the graph, which is what gives
//! series their abort-on-failure behaviour and lets parallel siblings run on
//! when one of them fails.

use std::collections::HashSet;
use std::fmt;

use crate::cli::Target;
use crate::dag::TaskGraph;
use crate::engine::TaskName;
use crate::errors::{Result, SitepipeError};
use crate::tasks::TaskId;
use crate::watch::bound_tasks;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Composition {
    Task(TaskId),
    /// Each item starts only after the previous one finished.
    Series(Vec<Composition>),
    /// Items start together; the group finishes when all of them have.
    Parallel(Vec<Composition>),
}

pub fn series(items: impl IntoIterator<Item = Composition>) -> Composition {
    Composition::Series(items.into_iter().collect())
}

pub fn parallel(items: impl IntoIterator<Item = Composition>) -> Composition {
    Composition::Parallel(items.into_iter().collect())
}

impl From<TaskId> for Composition {
    fn from(task: TaskId) -> Self {
        Composition::Task(task)
    }
}

impl fmt::Display for Composition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (label, items) = match self {
            Composition::Task(task) => return write!(f, "{task}"),
            Composition::Series(items) => ("series", items),
            Composition::Parallel(items) => ("parallel", items),
        };
        write!(f, "{label}(")?;
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{item}")?;
        }
        f.write_str(")")
    }
}

/// `series(clean, parallel(public, templates, styles-lib, styles-dev,
/// scripts-lib, scripts-dev))`
pub fn dev() -> Composition {
    series([
        TaskId::Clean.into(),
        parallel([
            TaskId::Public.into(),
            TaskId::Templates.into(),
            TaskId::StylesLib.into(),
            TaskId::StylesDev.into(),
            TaskId::ScriptsLib.into(),
            TaskId::ScriptsDev.into(),
        ]),
    ])
}

/// `series(dev, parallel(watch, serve))`
pub fn default_pipeline() -> Composition {
    series([dev(), parallel([TaskId::Watch.into(), TaskId::Serve.into()])])
}

pub fn for_target(target: Target) -> Composition {
    match target {
        Target::Default => default_pipeline(),
        Target::Dev => dev(),
        other => match other.task() {
            Some(task) => Composition::Task(task),
            None => dev(),
        },
    }
}

impl Composition {
    /// Leaf tasks in declaration order.
    pub fn tasks(&self) -> Vec<TaskId> {
        let mut out = Vec::new();
        self.collect_tasks(&mut out);
        out
    }

    fn collect_tasks(&self, out: &mut Vec<TaskId>) {
        match self {
            Composition::Task(task) => out.push(*task),
            Composition::Series(items) | Composition::Parallel(items) => {
                for item in items {
                    item.collect_tasks(out);
                }
            }
        }
    }

    /// Lower into a validated task graph.
    ///
    /// A task may appear only once per composition.
    pub fn compile(&self) -> Result<TaskGraph> {
        let mut graph = TaskGraph::new();
        let mut seen = HashSet::new();
        lower(self, &[], &mut graph, &mut seen)?;
        graph.validate()?;
        Ok(graph)
    }
}

/// Add `comp` to `graph` with every entry running after `after`; returns the
/// exits of `comp`.
fn lower(
    comp: &Composition,
    after: &[TaskName],
    graph: &mut TaskGraph,
    seen: &mut HashSet<TaskId>,
) -> Result<Vec<TaskName>> {
    match comp {
        Composition::Task(task) => {
            if !seen.insert(*task) {
                return Err(SitepipeError::ConfigError(format!(
                    "task '{task}' appears more than once in the composition"
                )));
            }
            graph.add_node(task.as_str(), after, task.is_long_lived());
            Ok(vec![task.as_str().to_string()])
        }
        Composition::Series(items) => {
            let mut current = after.to_vec();
            for item in items {
                current = lower(item, &current, graph, seen)?;
            }
            Ok(current)
        }
        Composition::Parallel(items) => {
            if items.is_empty() {
                return Ok(after.to_vec());
            }
            let mut exits = Vec::new();
            for item in items {
                for exit in lower(item, after, graph, seen)? {
                    if !exits.contains(&exit) {
                        exits.push(exit);
                    }
                }
            }
            Ok(exits)
        }
    }
}

/// What the runtime needs to execute a target.
#[derive(Debug, Clone)]
pub struct Plan {
    pub graph: TaskGraph,
    /// Entry tasks triggered at startup.
    pub initial: Vec<TaskName>,
    /// One-shot targets exit once the graph is idle.
    pub exit_when_idle: bool,
}

/// Compile `composition` into a runnable plan.
///
/// When the composition contains `watch`, every task it may trigger is made
/// schedulable too: tasks missing from the composition are added as free
/// nodes that only ever start from a file change.
pub fn plan(composition: &Composition) -> Result<Plan> {
    let mut graph = composition.compile()?;
    let initial = graph.roots();
    let exit_when_idle = !graph.has_long_lived();

    if graph.contains(TaskId::Watch.as_str()) {
        for task in bound_tasks() {
            if !graph.contains(task.as_str()) {
                graph.add_node(task.as_str(), &[], false);
            }
        }
        graph.validate()?;
    }

    Ok(Plan {
        graph,
        initial,
        exit_when_idle,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn after(graph: &TaskGraph, name: &str) -> Vec<String> {
        graph.node(name).unwrap().after.clone()
    }

    #[test]
    fn dev_runs_everything_after_clean() {
        let graph = dev().compile().unwrap();
        assert_eq!(graph.roots(), vec!["clean".to_string()]);
        for task in ["public", "templates", "styles-lib", "styles-dev", "scripts-lib", "scripts-dev"] {
            assert_eq!(after(&graph, task), vec!["clean".to_string()]);
        }
    }

    #[test]
    fn default_starts_watch_and_serve_after_every_build_task() {
        let graph = default_pipeline().compile().unwrap();
        let builds = vec![
            "public".to_string(),
            "templates".to_string(),
            "styles-lib".to_string(),
            "styles-dev".to_string(),
            "scripts-lib".to_string(),
            "scripts-dev".to_string(),
        ];
        assert_eq!(after(&graph, "watch"), builds);
        assert_eq!(after(&graph, "serve"), builds);
        assert!(graph.node("serve").unwrap().long_lived);
    }

    #[test]
    fn duplicate_task_is_rejected() {
        let comp = series([TaskId::Clean.into(), TaskId::Clean.into()]);
        assert!(matches!(comp.compile(), Err(SitepipeError::ConfigError(_))));
    }

    #[test]
    fn display_mirrors_structure() {
        assert_eq!(
            default_pipeline().to_string(),
            "series(series(clean, parallel(public, templates, styles-lib, styles-dev, scripts-lib, scripts-dev)), parallel(watch, serve))"
        );
    }

    #[test]
    fn watch_plan_adds_free_bound_tasks_without_triggering_them() {
        let plan = plan(&Composition::Task(TaskId::Watch)).unwrap();
        assert_eq!(plan.initial, vec!["watch".to_string()]);
        assert!(!plan.exit_when_idle);
        assert!(plan.graph.contains("styles-dev"));
        assert!(after(&plan.graph, "styles-dev").is_empty());
    }

    #[test]
    fn one_shot_targets_exit_when_idle() {
        assert!(plan(&dev()).unwrap().exit_when_idle);
        assert!(plan(&for_target(Target::Templates)).unwrap().exit_when_idle);
        assert!(!plan(&default_pipeline()).unwrap().exit_when_idle);
    }
}
