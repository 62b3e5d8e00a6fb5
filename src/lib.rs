// src/lib.rs

pub mod cli;
pub mod compose;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod server;
pub mod tasks;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::compose::Plan;
use crate::config::{load_or_default, ConfigFile, ConfigSection, Paths};
use crate::dag::Scheduler;
use crate::engine::{CoreRuntime, Runtime, RuntimeEvent, RuntimeOptions, TriggerReason};
use crate::errors::Result;
use crate::exec::{ExecutorBackend, RealExecutorBackend};
use crate::tasks::TaskContext;

/// Load the config, compose the selected target and run it with the
/// in-process executor.
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_or_default(&config_path)?;
    let root = project_root(&config_path);
    let paths = Paths::resolve(&root, &cfg.paths);

    let composition = compose::for_target(args.target);
    let plan = compose::plan(&composition)?;
    info!(target = %composition, root = ?paths.root, "composed target");

    if args.dry_run {
        print_dry_run(&cfg, &paths, &plan)?;
        return Ok(());
    }

    let settings = cfg.config.clone();
    let ctx = Arc::new(TaskContext::new(cfg, paths));

    drive(plan, &settings, |rt_tx| RealExecutorBackend::new(ctx, rt_tx)).await
}

/// Execute `plan` with the executor built by `make_executor`.
///
/// Seeds the plan's initial triggers, installs the Ctrl-C handler, and runs
/// the event loop until the core requests exit.
pub async fn drive<E, F>(plan: Plan, settings: &ConfigSection, make_executor: F) -> Result<()>
where
    E: ExecutorBackend,
    F: FnOnce(mpsc::Sender<RuntimeEvent>) -> E,
{
    let scheduler = Scheduler::from_graph(&plan.graph);

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);
    let executor = make_executor(rt_tx.clone());

    tokio::spawn(shutdown_on_ctrl_c(rt_tx.clone()));

    info!(initial = ?plan.initial, "initial tasks to trigger at startup");
    for task in plan.initial {
        rt_tx
            .send(RuntimeEvent::TaskTriggered {
                task,
                reason: TriggerReason::Initial,
            })
            .await
            .map_err(anyhow::Error::from)?;
    }

    let options = RuntimeOptions {
        exit_when_idle: plan.exit_when_idle,
    };

    let core = CoreRuntime::new(
        scheduler,
        settings.triggered_while_running_behaviour,
        settings.queue_length,
        options,
    );

    Runtime::new(core, rt_rx, executor).run().await
}

async fn shutdown_on_ctrl_c(tx: mpsc::Sender<RuntimeEvent>) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            info!("Ctrl-C received; shutting down");
            let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
        }
        Err(err) => warn!(error = %err, "cannot listen for Ctrl-C"),
    }
}

/// Directory holding the config file, made absolute.
///
/// - "site/Sitepipe.toml" → "<cwd>/site"
/// - bare "Sitepipe.toml" → the current working directory
fn project_root(config_path: &Path) -> PathBuf {
    let dir = match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    dir.canonicalize()
        .or_else(|_| std::path::absolute(&dir))
        .unwrap_or(dir)
}

/// Print resolved paths, the task graph and watch bindings.
fn print_dry_run(cfg: &ConfigFile, paths: &Paths, plan: &Plan) -> Result<()> {
    println!("sitepipe dry-run");
    println!("  root   = {}", paths.root.display());
    println!("  dist   = {}", paths.dist.display());
    println!("  assets = {}", paths.assets.display());
    println!("  src    = {}", paths.src.display());
    println!("  public = {}", paths.public.display());
    println!();

    println!("tasks ({}):", plan.graph.nodes().len());
    for node in plan.graph.nodes() {
        println!("  - {}", node.name);
        if !node.after.is_empty() {
            println!("      after: {:?}", node.after);
        }
        if node.long_lived {
            println!("      long_lived: true");
        }
    }
    println!("initial: {:?}", plan.initial);
    println!("exit when idle: {}", plan.exit_when_idle);

    if plan.graph.contains(tasks::TaskId::Watch.as_str()) {
        println!();
        println!("watch bindings:");
        for binding in watch::site_bindings(paths, &cfg.templates)? {
            println!("  - {} <- {:?}", binding.task(), binding.patterns());
        }
    }

    debug!("dry run finished");
    Ok(())
}
