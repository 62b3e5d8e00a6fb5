// src/watch/watcher.rs

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::engine::RuntimeEvent;
use crate::watch::event_handler::{collect_event, dispatch_triggers};
use crate::watch::patterns::WatchBinding;

/// Keeps the underlying `RecommendedWatcher` alive. Dropping it stops
/// watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
    watched: Vec<PathBuf>,
}

impl WatcherHandle {
    /// Directories actually registered with the OS watcher.
    pub fn watched(&self) -> &[PathBuf] {
        &self.watched
    }
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle")
            .field("watched", &self.watched)
            .finish_non_exhaustive()
    }
}

/// Watch `dirs` recursively and send `RuntimeEvent::TaskTriggered` for every
/// task whose binding matches a changed path.
///
/// - `root` is the project root all binding patterns are relative to.
/// - Events within `debounce` of the first event of a batch are merged, so
///   an editor's save burst triggers each task once.
/// - Directories that don't exist are skipped with a warning.
pub fn spawn_watcher(
    root: impl Into<PathBuf>,
    dirs: &[PathBuf],
    bindings: Vec<WatchBinding>,
    debounce: Duration,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) -> Result<WatcherHandle> {
    let root = root.into();
    let root = root.canonicalize().unwrap_or(root);

    // Channel from the blocking notify callback into the async world.
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if let Err(err) = event_tx.send(event) {
                    eprintln!("sitepipe: failed to forward notify event: {err}");
                }
            }
            Err(err) => eprintln!("sitepipe: file watch error: {err}"),
        },
        Config::default(),
    )?;

    let mut watched = Vec::new();
    for dir in dirs {
        if !dir.is_dir() {
            warn!(?dir, "watch directory does not exist; skipping");
            continue;
        }
        watcher.watch(dir, RecursiveMode::Recursive)?;
        watched.push(dir.clone());
    }

    info!(?watched, "file watcher started");

    tokio::spawn(async move {
        while let Some(first) = event_rx.recv().await {
            let mut pending = BTreeSet::new();
            debug!(event = ?first, "received notify event");
            collect_event(&root, &first, &bindings, &mut pending);

            let deadline = Instant::now() + debounce;
            let mut closed = false;
            loop {
                match tokio::time::timeout_at(deadline, event_rx.recv()).await {
                    Ok(Some(event)) => {
                        debug!(?event, "received notify event");
                        collect_event(&root, &event, &bindings, &mut pending);
                    }
                    Ok(None) => {
                        closed = true;
                        break;
                    }
                    Err(_) => break,
                }
            }

            if !dispatch_triggers(pending, &runtime_tx).await || closed {
                break;
            }
        }
        debug!("watcher event loop finished");
    });

    Ok(WatcherHandle {
        _inner: watcher,
        watched,
    })
}
