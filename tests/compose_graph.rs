// tests/compose_graph.rs

use sitepipe::cli::Target;
use sitepipe::compose::{self, parallel, series, Composition};
use sitepipe::dag::TaskGraph;
use sitepipe::errors::SitepipeError;
use sitepipe::tasks::TaskId;

fn after(graph: &TaskGraph, name: &str) -> Vec<String> {
    graph.node(name).expect("node exists").after.clone()
}

#[test]
fn series_links_every_exit_to_every_entry() {
    // series(parallel(a, b), parallel(c, d))
    let comp = series([
        parallel([TaskId::Public.into(), TaskId::Templates.into()]),
        parallel([TaskId::StylesLib.into(), TaskId::ScriptsLib.into()]),
    ]);
    let graph = comp.compile().unwrap();

    let exits = vec!["public".to_string(), "templates".to_string()];
    assert_eq!(after(&graph, "styles-lib"), exits);
    assert_eq!(after(&graph, "scripts-lib"), exits);
    assert_eq!(graph.roots(), exits);
}

#[test]
fn nested_series_chains_stages() {
    let comp = series([
        TaskId::Clean.into(),
        series([TaskId::StylesDev.into(), TaskId::ScriptsDev.into()]),
    ]);
    let graph = comp.compile().unwrap();
    assert_eq!(after(&graph, "styles-dev"), vec!["clean".to_string()]);
    assert_eq!(after(&graph, "scripts-dev"), vec!["styles-dev".to_string()]);
}

#[test]
fn empty_groups_pass_dependencies_through() {
    let comp = series([TaskId::Clean.into(), parallel([]), TaskId::Public.into()]);
    let graph = comp.compile().unwrap();
    assert_eq!(after(&graph, "public"), vec!["clean".to_string()]);
}

#[test]
fn targets_map_to_compositions() {
    assert_eq!(compose::for_target(Target::Dev), compose::dev());
    assert_eq!(compose::for_target(Target::Default), compose::default_pipeline());
    assert_eq!(
        compose::for_target(Target::StylesDev),
        Composition::Task(TaskId::StylesDev)
    );
    assert_eq!(
        compose::default_pipeline().tasks(),
        vec![
            TaskId::Clean,
            TaskId::Public,
            TaskId::Templates,
            TaskId::StylesLib,
            TaskId::StylesDev,
            TaskId::ScriptsLib,
            TaskId::ScriptsDev,
            TaskId::Watch,
            TaskId::Serve,
        ]
    );
}

#[test]
fn default_plan_triggers_only_clean() {
    let plan = compose::plan(&compose::default_pipeline()).unwrap();
    assert_eq!(plan.initial, vec!["clean".to_string()]);
    assert_eq!(plan.graph.nodes().len(), 9);
}

#[test]
fn graph_validation_reports_cycles_and_unknown_tasks() {
    let mut graph = TaskGraph::new();
    graph.add_node("a", &["b".to_string()], false);
    graph.add_node("b", &["a".to_string()], false);
    assert!(matches!(graph.validate(), Err(SitepipeError::DagCycle(_))));

    let mut graph = TaskGraph::new();
    graph.add_node("a", &["ghost".to_string()], false);
    assert!(matches!(graph.validate(), Err(SitepipeError::TaskNotFound(_))));

    assert!(matches!(TaskGraph::new().validate(), Err(SitepipeError::ConfigError(_))));
}
