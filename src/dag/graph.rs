// src/dag/graph.rs

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::engine::TaskName;
use crate::errors::{Result, SitepipeError};

/// A node of a declared task graph: a task plus its ordering constraints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskNode {
    pub name: TaskName,
    /// Tasks that must complete (or report readiness) before this one starts.
    pub after: Vec<TaskName>,
    /// Long-lived tasks never exit under normal operation; they report
    /// readiness instead of completion.
    pub long_lived: bool,
}

/// Declared task graph: nodes in insertion order, edges given by `after`.
///
/// Built by the composition layer (or by hand in tests) and checked with
/// [`TaskGraph::validate`] before anything is scheduled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskGraph {
    nodes: Vec<TaskNode>,
}

impl TaskGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node, or merge `after` into an existing node of the same name.
    pub fn add_node<N: Into<TaskName>>(&mut self, name: N, after: &[TaskName], long_lived: bool) {
        let name = name.into();
        if let Some(node) = self.nodes.iter_mut().find(|n| n.name == name) {
            for dep in after {
                if !node.after.contains(dep) {
                    node.after.push(dep.clone());
                }
            }
            node.long_lived |= long_lived;
            return;
        }
        self.nodes.push(TaskNode {
            name,
            after: after.to_vec(),
            long_lived,
        });
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.iter().any(|n| n.name == name)
    }

    pub fn node(&self, name: &str) -> Option<&TaskNode> {
        self.nodes.iter().find(|n| n.name == name)
    }

    pub fn nodes(&self) -> &[TaskNode] {
        &self.nodes
    }

    /// Tasks without ordering constraints, in insertion order.
    pub fn roots(&self) -> Vec<TaskName> {
        self.nodes
            .iter()
            .filter(|n| n.after.is_empty())
            .map(|n| n.name.clone())
            .collect()
    }

    pub fn has_long_lived(&self) -> bool {
        self.nodes.iter().any(|n| n.long_lived)
    }

    /// Check that the graph is non-empty, every `after` reference names a
    /// node, no node depends on itself, and there are no cycles.
    pub fn validate(&self) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(SitepipeError::ConfigError(
                "task graph must contain at least one task".to_string(),
            ));
        }

        for node in &self.nodes {
            for dep in &node.after {
                if dep == &node.name {
                    return Err(SitepipeError::ConfigError(format!(
                        "task '{}' cannot run after itself",
                        node.name
                    )));
                }
                if !self.contains(dep) {
                    return Err(SitepipeError::TaskNotFound(format!(
                        "task '{}' runs after unknown task '{}'",
                        node.name, dep
                    )));
                }
            }
        }

        // Edge direction: dep -> task.
        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
        for node in &self.nodes {
            graph.add_node(node.name.as_str());
        }
        for node in &self.nodes {
            for dep in &node.after {
                graph.add_edge(dep.as_str(), node.name.as_str(), ());
            }
        }

        match toposort(&graph, None) {
            Ok(_order) => Ok(()),
            Err(cycle) => Err(SitepipeError::DagCycle(format!(
                "cycle detected in task graph involving task '{}'",
                cycle.node_id()
            ))),
        }
    }
}
