//! Host commands - refresh, open task/queue files, run configured commands
//!
//! These are the operations a UI binds to keys or row clicks. They only
//! resolve what to do; showing documents and spawning terminals is left to
//! the caller.

use crate::config::{CommandConfig, ConfigSnapshot};
use crate::core::resolve;
use crate::error::WorkflowError;
use std::path::{Path, PathBuf};

/// Commands exposed to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostCommand {
    Refresh,
    OpenCurrentTask,
    OpenTaskQueue,
    RunCommand,
}

impl HostCommand {
    /// Stable identifier
    pub fn id(self) -> &'static str {
        match self {
            Self::Refresh => "workflow.refresh",
            Self::OpenCurrentTask => "workflow.openCurrentTask",
            Self::OpenTaskQueue => "workflow.openTaskQueue",
            Self::RunCommand => "workflow.runCommand",
        }
    }
}

/// A file loaded for the document viewer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub path: PathBuf,
    pub lines: Vec<String>,
}

impl Document {
    /// Read a document for display
    pub async fn open(path: &Path) -> Result<Self, WorkflowError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| WorkflowError::Open {
                path: path.to_path_buf(),
                source,
            })?;

        Ok(Self {
            path: path.to_path_buf(),
            lines: content.lines().map(str::to_string).collect(),
        })
    }
}

/// Resolved current task file
pub fn current_task_file(
    snapshot: Option<&ConfigSnapshot>,
    root: &Path,
) -> Result<PathBuf, WorkflowError> {
    snapshot
        .and_then(|s| s.config.current_task_path())
        .map(|p| resolve(p, root))
        .ok_or(WorkflowError::NotConfigured("currentTask.path"))
}

/// Resolved task queue file
pub fn task_queue_file(
    snapshot: Option<&ConfigSnapshot>,
    root: &Path,
) -> Result<PathBuf, WorkflowError> {
    snapshot
        .and_then(|s| s.config.task_queue_path())
        .map(|p| resolve(p, root))
        .ok_or(WorkflowError::NotConfigured("taskQueue.path"))
}

/// One entry in the command picker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandChoice {
    pub label: String,
    /// The shell command itself
    pub description: String,
    /// `cwd: ...` or empty
    pub detail: String,
    pub launch: Launch,
}

/// A command ready to spawn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Launch {
    pub label: String,
    pub command: String,
    pub cwd: PathBuf,
}

impl Launch {
    /// Resolve a configured command; without `cwd` it runs in the root
    pub fn from_config(cmd: &CommandConfig, index: usize, root: &Path) -> Self {
        let cwd = match cmd.cwd.as_deref() {
            Some(cwd) if !cwd.is_empty() => resolve(cwd, root),
            _ => root.to_path_buf(),
        };

        Self {
            label: cmd.display_label(index),
            command: cmd.command.clone(),
            cwd,
        }
    }
}

/// Picker entries for every configured command, in declared order
pub fn command_choices(
    snapshot: Option<&ConfigSnapshot>,
    root: &Path,
) -> Result<Vec<CommandChoice>, WorkflowError> {
    let commands = snapshot
        .map(|s| s.config.commands.as_slice())
        .unwrap_or_default();
    if commands.is_empty() {
        return Err(WorkflowError::NoCommands);
    }

    Ok(commands
        .iter()
        .enumerate()
        .map(|(index, cmd)| CommandChoice {
            label: cmd.display_label(index),
            description: cmd.command.clone(),
            detail: cmd.detail(),
            launch: Launch::from_config(cmd, index, root),
        })
        .collect())
}

/// Find a configured command by its picker label
pub fn find_command(
    snapshot: Option<&ConfigSnapshot>,
    root: &Path,
    label: &str,
) -> Result<Launch, WorkflowError> {
    command_choices(snapshot, root)?
        .into_iter()
        .find(|choice| choice.label == label)
        .map(|choice| choice.launch)
        .ok_or_else(|| WorkflowError::UnknownCommand(label.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkflowConfig;

    fn snapshot(json: &str) -> ConfigSnapshot {
        ConfigSnapshot {
            config: WorkflowConfig::from_json(json).unwrap(),
            source: PathBuf::from("/ws/workflow.config.json"),
            generation: 1,
        }
    }

    #[test]
    fn test_open_targets_require_config() {
        let root = Path::new("/ws");
        let err = current_task_file(None, root).unwrap_err();
        assert_eq!(err.to_string(), "currentTask.path is not configured.");

        let snap = snapshot(r#"{"taskQueue": {"path": "TASK_QUEUE.json"}}"#);
        assert_eq!(
            task_queue_file(Some(&snap), root).unwrap(),
            PathBuf::from("/ws/TASK_QUEUE.json")
        );
        assert!(current_task_file(Some(&snap), root).is_err());
    }

    #[test]
    fn test_command_choices() {
        let snap = snapshot(
            r#"{"commands": [
                {"label": "Coordinator", "command": "./ai_coordinator.sh"},
                {"command": "make test", "cwd": "backend"}
            ]}"#,
        );
        let choices = command_choices(Some(&snap), Path::new("/ws")).unwrap();

        assert_eq!(choices[0].label, "Coordinator");
        assert_eq!(choices[0].detail, "");
        assert_eq!(choices[0].launch.cwd, PathBuf::from("/ws"));

        assert_eq!(choices[1].label, "Command 2");
        assert_eq!(choices[1].description, "make test");
        assert_eq!(choices[1].detail, "cwd: backend");
        assert_eq!(choices[1].launch.cwd, PathBuf::from("/ws/backend"));
    }

    #[test]
    fn test_no_commands() {
        let snap = snapshot("{}");
        let err = command_choices(Some(&snap), Path::new("/ws")).unwrap_err();
        assert!(matches!(err, WorkflowError::NoCommands));
    }

    #[test]
    fn test_find_command() {
        let snap = snapshot(r#"{"commands": [{"label": "Status", "command": "./status.sh"}]}"#);
        let root = Path::new("/ws");
        assert_eq!(find_command(Some(&snap), root, "Status").unwrap().command, "./status.sh");
        assert!(matches!(
            find_command(Some(&snap), root, "Deploy"),
            Err(WorkflowError::UnknownCommand(_))
        ));
    }

    #[tokio::test]
    async fn test_document_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("CURRENT_TASK.md");
        std::fs::write(&path, "line one\nline two\n").unwrap();

        let doc = Document::open(&path).await.unwrap();
        assert_eq!(doc.lines, vec!["line one", "line two"]);

        let err = Document::open(&dir.path().join("nope.md")).await.unwrap_err();
        assert!(err.to_string().starts_with("Unable to open"));
    }
}
