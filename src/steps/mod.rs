//! Transform steps and the clean step.
//!
//! Every step is a blocking function over the filesystem: it reads the files
//! of one source directory, applies one fixed transformation and writes the
//! result under the output root. Nothing is cached between runs.

mod clean;
mod fonts;
mod images;
mod scripts;
mod styles;
mod templates;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::Layout;
use crate::error::{BuildError, Result};
use crate::graph::TaskRunner;
use crate::models::{StepReport, Task, TransformFailure};
use crate::notification::{LogNotifier, Notifier};

/// Runs steps against one site layout.
#[derive(Clone)]
pub struct Pipeline {
    layout: Layout,
    notifier: Arc<dyn Notifier>,
}

impl Pipeline {
    pub fn new(layout: Layout, notifier: Arc<dyn Notifier>) -> Self {
        Self { layout, notifier }
    }

    /// A pipeline that reports through the log.
    pub fn with_log(layout: Layout) -> Self {
        Self::new(layout, Arc::new(LogNotifier))
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Run one step. `Clean` yields an empty report; `Watch` and `Server`
    /// are long-running and not steps.
    pub fn run_step(&self, task: Task) -> Result<StepReport> {
        let notifier = self.notifier.as_ref();
        let report = match task {
            Task::Clean => {
                clean::clean(&self.layout)?;
                StepReport::new(Task::Clean)
            }
            Task::Fonts => fonts::copy(&self.layout)?,
            Task::Pug => templates::render(&self.layout, notifier)?,
            Task::Style => styles::render(&self.layout, notifier)?,
            Task::Img => images::optimize(&self.layout)?,
            Task::Js => scripts::bundle(&self.layout, notifier)?,
            Task::Watch | Task::Server => return Err(BuildError::NotAStep(task)),
        };

        tracing::info!(
            task = %task,
            written = report.written.len(),
            failed = report.failures.len(),
            "Finished '{}'",
            task
        );
        Ok(report)
    }
}

/// Steps run on the blocking pool; they are file and CPU bound.
#[async_trait]
impl TaskRunner for Pipeline {
    async fn run(&self, task: Task) -> Result<()> {
        let pipeline = self.clone();
        tokio::task::spawn_blocking(move || pipeline.run_step(task)).await??;
        Ok(())
    }
}

// ============================================================
// Shared file helpers
// ============================================================

fn require_dir(dir: &Path) -> Result<()> {
    if dir.is_dir() {
        Ok(())
    } else {
        Err(BuildError::MissingSource(dir.to_path_buf()))
    }
}

/// Files under `dir` matching `pattern`, in sorted path order.
fn collect_files(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let base = glob::Pattern::escape(&dir.to_string_lossy());
    let mut files = Vec::new();
    for entry in glob::glob(&format!("{}/{}", base, pattern))? {
        let path = entry.map_err(|e| {
            let path = e.path().to_path_buf();
            BuildError::io(path, e.into_error())
        })?;
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| BuildError::io(path, e))
}

fn write_file(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| BuildError::io(parent, e))?;
    }
    std::fs::write(path, contents).map_err(|e| BuildError::io(path, e))
}

fn relative_to(path: &Path, base: &Path) -> PathBuf {
    path.strip_prefix(base).unwrap_or(path).to_path_buf()
}

/// Record a recoverable failure and tell the developer about it.
fn report_failure(
    report: &mut StepReport,
    notifier: &dyn Notifier,
    file: &Path,
    message: String,
) {
    notifier.failure(report.task, &message);
    report.failures.push(TransformFailure {
        file: file.to_path_buf(),
        message,
    });
}
