//! Error types shared across the crate

use std::path::PathBuf;
use thiserror::Error;

/// The workflow config could not be read or parsed.
///
/// The previous snapshot stays in effect when this is returned.
#[derive(Debug, Clone, Error)]
#[error("Unable to load config from {}: {message}", .path.display())]
pub struct LoadError {
    pub path: PathBuf,
    pub message: String,
}

impl LoadError {
    pub fn new(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

/// Errors that stop the runtime or a host command
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// No usable workspace root; nothing can be resolved without one
    #[error("No workspace folder detected at {}. Open a folder before using workflow panels.", .0.display())]
    WorkspaceMissing(PathBuf),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("{0} is not configured.")]
    NotConfigured(&'static str),

    #[error("No commands configured.")]
    NoCommands,

    #[error("No configured command named {0:?}")]
    UnknownCommand(String),

    #[error("Unable to open {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
