// src/cli.rs

//! Command line.

use clap::{Parser, ValueEnum};

use crate::tasks::TaskId;

/// Command-line arguments for `sitepipe`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "sitepipe",
    version,
    about = "Build a static site from templates, styles and scripts, then watch and serve it.",
    long_about = None
)]
pub struct CliArgs {
    /// What to run: `default` (build, watch, serve), `dev` (one-shot build),
    /// or a single task name.
    #[arg(value_enum, default_value_t = Target::Default)]
    pub target: Target,

    /// Path to the config file (TOML). A missing file means "all defaults".
    ///
    /// The directory containing it is the project root.
    #[arg(long, value_name = "PATH", default_value = "Sitepipe.toml")]
    pub config: String,

    /// Log verbosity. Falls back to `SITEPIPE_LOG`, then `info`.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Print paths, the composed task graph and watch bindings, but don't run
    /// anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Named entry points, mirroring the exported task names.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum Target {
    /// Full build, then watch and serve.
    Default,
    /// Clean, then every build task in parallel. Exits when done.
    Dev,
    Clean,
    Serve,
    Public,
    Templates,
    StylesLib,
    StylesDev,
    ScriptsLib,
    ScriptsDev,
    Watch,
}

impl Target {
    /// The single task this target stands for, if it is not a composition.
    pub fn task(self) -> Option<TaskId> {
        match self {
            Target::Default | Target::Dev => None,
            Target::Clean => Some(TaskId::Clean),
            Target::Serve => Some(TaskId::Serve),
            Target::Public => Some(TaskId::Public),
            Target::Templates => Some(TaskId::Templates),
            Target::StylesLib => Some(TaskId::StylesLib),
            Target::StylesDev => Some(TaskId::StylesDev),
            Target::ScriptsLib => Some(TaskId::ScriptsLib),
            Target::ScriptsDev => Some(TaskId::ScriptsDev),
            Target::Watch => Some(TaskId::Watch),
        }
    }
}

#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}
