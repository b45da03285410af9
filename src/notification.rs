//! Developer-facing notifications for transform steps.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::models::Task;

/// Receives the outcome of template, style and script steps.
pub trait Notifier: Send + Sync {
    /// A step wrote `file` (relative to the output root).
    fn success(&self, task: Task, file: &Path);

    /// A step hit a recoverable error and skipped its output.
    fn failure(&self, task: Task, message: &str);
}

/// Reports through `tracing`, which is where the console output goes.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn success(&self, task: Task, file: &Path) {
        tracing::info!(task = %task, "{} complete: {}", task, file.display());
    }

    fn failure(&self, task: Task, message: &str) {
        tracing::warn!(task = %task, "Error: {}", message);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Success { task: Task, file: PathBuf },
    Failure { task: Task, message: String },
}

/// Keeps every notification in memory, in arrival order.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    seen: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.seen.lock().expect("notifier lock poisoned").clone()
    }

    pub fn failures(&self) -> Vec<Notification> {
        self.notifications()
            .into_iter()
            .filter(|n| matches!(n, Notification::Failure { .. }))
            .collect()
    }

    fn push(&self, notification: Notification) {
        self.seen
            .lock()
            .expect("notifier lock poisoned")
            .push(notification);
    }
}

impl Notifier for RecordingNotifier {
    fn success(&self, task: Task, file: &Path) {
        self.push(Notification::Success {
            task,
            file: file.to_path_buf(),
        });
    }

    fn failure(&self, task: Task, message: &str) {
        self.push(Notification::Failure {
            task,
            message: message.to_string(),
        });
    }
}
