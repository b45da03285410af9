use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors that abort a task run.
///
/// Per-file compile errors are not represented here; they are collected in a
/// [`crate::models::StepReport`] and reported through the notifier.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Source not found: {}", .0.display())]
    MissingSource(PathBuf),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("'{0}' is not a build step")]
    NotAStep(crate::models::Task),

    #[error("Invalid file pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("File watch failed: {0}")]
    Watch(#[from] notify::Error),

    #[error("Server error: {0}")]
    Server(#[source] std::io::Error),

    #[error("Background job failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl BuildError {
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

pub type Result<T, E = BuildError> = std::result::Result<T, E>;

/// Render an error with its whole source chain on one line.
pub fn error_chain(e: &dyn std::error::Error) -> String {
    let mut msg = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        let cause_msg = cause.to_string();
        if !msg.contains(&cause_msg) {
            msg.push_str(": ");
            msg.push_str(&cause_msg);
        }
        source = cause.source();
    }
    msg
}
