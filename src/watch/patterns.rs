// src/watch/patterns.rs

use std::fmt;

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::config::{Paths, TemplatesSection};
use crate::tasks::TaskId;

/// Compiled glob set bound to one task.
///
/// Patterns are relative to the project root; the watcher passes relative
/// `/`-separated paths (e.g. `"src/sass/_vars.scss"`) into [`matches`].
///
/// [`matches`]: WatchBinding::matches
#[derive(Clone)]
pub struct WatchBinding {
    task: TaskId,
    patterns: Vec<String>,
    watch_set: GlobSet,
    exclude_set: GlobSet,
}

impl fmt::Debug for WatchBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchBinding")
            .field("task", &self.task)
            .field("patterns", &self.patterns)
            .finish_non_exhaustive()
    }
}

impl WatchBinding {
    pub fn new(task: TaskId, patterns: Vec<String>, exclude: &[String]) -> Result<Self> {
        let watch_set = build_globset(&patterns)
            .with_context(|| format!("building watch globset for task {task}"))?;
        let exclude_set = build_globset(exclude)
            .with_context(|| format!("building exclude globset for task {task}"))?;

        Ok(Self {
            task,
            patterns,
            watch_set,
            exclude_set,
        })
    }

    pub fn task(&self) -> TaskId {
        self.task
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn matches(&self, rel_path: &str) -> bool {
        self.watch_set.is_match(rel_path) && !self.exclude_set.is_match(rel_path)
    }
}

/// The fixed binding table of the `watch` task.
///
/// The distribution root is always excluded so a build never retriggers
/// itself.
pub fn site_bindings(paths: &Paths, templates: &TemplatesSection) -> Result<Vec<WatchBinding>> {
    let src = paths.rel_src();
    let public = paths.rel_public();
    let ext = templates.ext();
    let exclude = vec![format!("{}/**", paths.rel_dist())];

    let table: [(TaskId, Vec<String>); 6] = [
        (TaskId::Public, vec![format!("{public}/**/*.*")]),
        (
            TaskId::Templates,
            vec![format!("{src}/{{views,layouts,components}}/**/*.{ext}")],
        ),
        (TaskId::StylesLib, vec![format!("{src}/libs/**/*.css")]),
        (
            TaskId::StylesDev,
            vec![format!("{src}/{{sass,components}}/**/*.{{sass,scss}}")],
        ),
        (TaskId::ScriptsLib, vec![format!("{src}/libs/**/*.js")]),
        (
            TaskId::ScriptsDev,
            vec![format!("{src}/{{js,components}}/**/*.js")],
        ),
    ];

    table
        .into_iter()
        .map(|(task, patterns)| WatchBinding::new(task, patterns, &exclude))
        .collect()
}

/// Tasks bound by the `watch` dispatcher, in table order.
pub fn bound_tasks() -> [TaskId; 6] {
    [
        TaskId::Public,
        TaskId::Templates,
        TaskId::StylesLib,
        TaskId::StylesDev,
        TaskId::ScriptsLib,
        TaskId::ScriptsDev,
    ]
}

/// Build a `GlobSet` from string patterns.
pub fn build_globset<S: AsRef<str>>(patterns: &[S]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let pat = pat.as_ref();
        let glob = Glob::new(pat).with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}
