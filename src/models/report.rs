use std::path::PathBuf;

use super::task::Task;

/// A recoverable error for one input file (or the whole step when it has a
/// single entry). The step keeps going; the failure is surfaced to the
/// developer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformFailure {
    pub file: PathBuf,
    pub message: String,
}

/// Outcome of one transform step run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub task: Task,
    /// Files written, relative to the output root.
    pub written: Vec<PathBuf>,
    pub failures: Vec<TransformFailure>,
}

impl StepReport {
    pub fn new(task: Task) -> Self {
        Self {
            task,
            written: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}
