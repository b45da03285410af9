//! Source watch: re-run one transform step when its source tree changes.
//!
//! Each [`Subscription`] binds a source directory to the task it feeds. The
//! `notify` backend delivers events on its own thread; they are forwarded to a
//! single dispatch loop that maps each event to its task and spawns a re-run.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::{Layout, WatchConfig};
use crate::error::{BuildError, Result};
use crate::graph::TaskRunner;
use crate::models::Task;

/// A source directory and the task to re-run when anything under it changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub root: PathBuf,
    pub task: Task,
}

/// The four source watches: templates, styles, images and scripts.
pub fn source_subscriptions(layout: &Layout) -> Vec<Subscription> {
    vec![
        Subscription {
            root: layout.templates_dir(),
            task: Task::Pug,
        },
        Subscription {
            root: layout.styles_dir(),
            task: Task::Style,
        },
        Subscription {
            root: layout.images_dir(),
            task: Task::Img,
        },
        Subscription {
            root: layout.scripts_dir(),
            task: Task::Js,
        },
    ]
}

/// Live source watches. Dropping the handle stops them.
pub struct WatchHandle {
    _watchers: Vec<RecommendedWatcher>,
    dispatch: JoinHandle<()>,
}

impl WatchHandle {
    /// Stop watching. Re-runs already started are left to finish.
    pub fn stop(self) {
        drop(self);
    }

    /// Wait until the dispatch loop ends, which only happens on stop.
    pub async fn wait(&mut self) -> Result<()> {
        match (&mut self.dispatch).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_cancelled() => Ok(()),
            Err(e) => Err(BuildError::Join(e)),
        }
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.dispatch.abort();
    }
}

/// Start one recursive watch per subscription and the dispatch loop feeding
/// `runner`. A missing source directory is a fatal error.
pub fn start_watch(
    subscriptions: Vec<Subscription>,
    runner: Arc<dyn TaskRunner>,
    config: WatchConfig,
) -> Result<WatchHandle> {
    let (tx, rx) = mpsc::unbounded_channel();
    let mut watchers = Vec::with_capacity(subscriptions.len());

    for subscription in subscriptions {
        if !subscription.root.is_dir() {
            return Err(BuildError::MissingSource(subscription.root));
        }
        let tx = tx.clone();
        let task = subscription.task;
        let watcher = watch_recursive(&subscription.root, move |_| {
            // The receiver only goes away when the handle is dropped.
            let _ = tx.send(task);
        })?;
        tracing::info!(
            "Watching {} for '{}'",
            subscription.root.display(),
            subscription.task
        );
        watchers.push(watcher);
    }

    let dispatch = tokio::spawn(dispatch(rx, runner, config.debounce));
    Ok(WatchHandle {
        _watchers: watchers,
        dispatch,
    })
}

/// Watch `root` recursively and call `on_change` for every create, modify or
/// remove event. Access events are ignored.
pub fn watch_recursive<F>(root: &Path, on_change: F) -> Result<RecommendedWatcher>
where
    F: Fn(&Event) + Send + 'static,
{
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
        Ok(event) if is_change(&event.kind) => on_change(&event),
        Ok(_) => {}
        Err(e) => tracing::warn!("Watch error: {}", e),
    })?;
    watcher.watch(root, RecursiveMode::Recursive)?;
    Ok(watcher)
}

pub(crate) fn is_change(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}

/// Collect the tasks touched within `debounce` of the first event, then spawn
/// one re-run per task. Re-runs are not awaited, so different kinds proceed
/// concurrently and a slow step never blocks the loop.
async fn dispatch(
    mut rx: mpsc::UnboundedReceiver<Task>,
    runner: Arc<dyn TaskRunner>,
    debounce: Duration,
) {
    while let Some(first) = rx.recv().await {
        let mut pending = BTreeSet::from([first]);
        if !debounce.is_zero() {
            let deadline = Instant::now() + debounce;
            while let Ok(Some(task)) = tokio::time::timeout_at(deadline, rx.recv()).await {
                pending.insert(task);
            }
        }

        for task in pending {
            tracing::debug!("Source change, re-running '{}'", task);
            let runner = Arc::clone(&runner);
            tokio::spawn(async move {
                if let Err(e) = runner.run(task).await {
                    tracing::error!("'{}' failed: {}", task, e);
                }
            });
        }
    }
}
