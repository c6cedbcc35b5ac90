//! Panel view models - current task, task queue, status files
//!
//! Each panel turns the current config snapshot plus freshly read files
//! into a flat list of rows. Any failure becomes a row; nothing here
//! returns an error.

pub mod queue;
pub mod status;
pub mod task;

use crate::commands::HostCommand;
use crate::config::ConfigSnapshot;
use std::path::{Path, PathBuf};

/// Placeholder for a field that did not match
pub const EMPTY_VALUE: &str = "—";

/// One line in a panel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub label: String,
    pub action: Option<RowAction>,
}

/// What activating a row does
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowAction {
    /// Show a file in the document viewer
    OpenFile(PathBuf),
    /// Run a host command
    Invoke(HostCommand),
}

impl Row {
    /// Row without an action
    pub fn text(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            action: None,
        }
    }

    pub fn open_file(label: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            label: label.into(),
            action: Some(RowAction::OpenFile(path.into())),
        }
    }

    pub fn invoke(label: impl Into<String>, command: HostCommand) -> Self {
        Self {
            label: label.into(),
            action: Some(RowAction::Invoke(command)),
        }
    }
}

/// The three panels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelKind {
    CurrentTask,
    Queue,
    Status,
}

impl PanelKind {
    pub const ALL: [PanelKind; 3] = [Self::CurrentTask, Self::Queue, Self::Status];

    pub fn title(self) -> &'static str {
        match self {
            Self::CurrentTask => "Current Task",
            Self::Queue => "Task Queue",
            Self::Status => "Status",
        }
    }

    /// Compute this panel's rows
    pub async fn rows(self, snapshot: Option<&ConfigSnapshot>, root: &Path) -> Vec<Row> {
        match self {
            Self::CurrentTask => task::rows(snapshot, root).await,
            Self::Queue => queue::rows(snapshot, root).await,
            Self::Status => status::rows(snapshot, root).await,
        }
    }
}

/// Read a text file, `None` on any error
pub(crate) async fn read_text(path: &Path) -> Option<String> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Some(content),
        Err(e) => {
            log::debug!("Unable to read {}: {}", path.display(), e);
            None
        }
    }
}

/// Fill in the placeholder for a missing value
pub(crate) fn or_empty(value: Option<String>) -> String {
    value.unwrap_or_else(|| EMPTY_VALUE.to_string())
}
