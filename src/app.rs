//! Application state and key handling for the dashboard

use crate::commands::{self, CommandChoice, Document, HostCommand};
use crate::events::{PanelEvent, ReloadTrigger};
use crate::runtime::Runtime;
use crate::terminal::{CommandEvent, CommandRunner};
use crate::views::{PanelKind, Row, RowAction};
use chrono::{DateTime, Local};
use crossterm::event::{KeyCode, KeyEvent};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;

const OUTPUT_LIMIT: usize = 500;

/// Severity of the status line message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub level: Level,
    pub text: String,
}

/// Document viewer state
#[derive(Debug, Clone)]
pub struct Viewer {
    pub document: Document,
    pub scroll: u16,
}

/// Command picker state
#[derive(Debug, Clone)]
pub struct Picker {
    pub choices: Vec<CommandChoice>,
    pub selected: usize,
}

/// What is drawn over the panels
#[derive(Debug, Clone, Default)]
pub enum Overlay {
    #[default]
    None,
    Viewer(Viewer),
    Picker(Picker),
}

/// Application state
pub struct App {
    pub runtime: Arc<Runtime>,
    pub runner: CommandRunner,
    pub panels: Vec<(PanelKind, Vec<Row>)>,
    pub focus: usize,
    pub selected: Vec<usize>,
    pub overlay: Overlay,
    pub output: Vec<String>,
    pub output_title: String,
    pub message: Option<Message>,
    pub last_refresh: Option<DateTime<Local>>,
    pub should_quit: bool,
}

impl App {
    /// Create a new app around a started runtime, along with the receiver
    /// for output of commands it launches
    pub fn new(runtime: Arc<Runtime>) -> (Self, mpsc::UnboundedReceiver<CommandEvent>) {
        let (runner, command_rx) = CommandRunner::new();
        // Errors broadcast before anyone subscribed
        let message = runtime.last_error().map(|e| Message {
            level: Level::Error,
            text: e.to_string(),
        });

        let app = Self {
            runtime,
            runner,
            panels: PanelKind::ALL.iter().map(|&kind| (kind, Vec::new())).collect(),
            focus: 0,
            selected: vec![0; PanelKind::ALL.len()],
            overlay: Overlay::None,
            output: Vec::new(),
            output_title: "Command Output".to_string(),
            message,
            last_refresh: None,
            should_quit: false,
        };
        (app, command_rx)
    }

    /// Recompute every panel from the current snapshot
    pub async fn refresh_rows(&mut self) {
        for (idx, (kind, rows)) in self.panels.iter_mut().enumerate() {
            *rows = self.runtime.rows(*kind).await;
            if self.selected[idx] >= rows.len() {
                self.selected[idx] = rows.len().saturating_sub(1);
            }
        }
        self.last_refresh = Some(Local::now());
    }

    /// React to a runtime notification
    pub async fn apply_panel_event(&mut self, event: PanelEvent) {
        match event {
            PanelEvent::Refreshed { .. } => self.refresh_rows().await,
            PanelEvent::ConfigError { message } => self.set_message(Level::Error, message),
        }
    }

    /// Fold command session output into the output pane
    pub fn apply_command_event(&mut self, event: CommandEvent) {
        match event {
            CommandEvent::Started { label, .. } => {
                self.output.clear();
                self.output_title = format!("Command Output: {}", label);
            }
            CommandEvent::Output { line, .. } => {
                if !line.is_empty() {
                    self.output.push(line);
                    if self.output.len() > OUTPUT_LIMIT {
                        self.output.remove(0);
                    }
                }
            }
            CommandEvent::Exited { exit_code, .. } => {
                let level = if exit_code == 0 {
                    Level::Info
                } else {
                    Level::Warning
                };
                self.set_message(level, format!("Command exited with code {}", exit_code));
            }
            CommandEvent::Failed { error, .. } => self.set_message(Level::Error, error),
        }
    }

    /// Handle keyboard input
    pub async fn handle_key(&mut self, key: KeyEvent) {
        match &mut self.overlay {
            Overlay::Viewer(viewer) => {
                match key.code {
                    KeyCode::Esc | KeyCode::Char('q') => self.overlay = Overlay::None,
                    KeyCode::Up | KeyCode::Char('k') => {
                        viewer.scroll = viewer.scroll.saturating_sub(1)
                    }
                    KeyCode::Down | KeyCode::Char('j') => {
                        viewer.scroll = viewer.scroll.saturating_add(1)
                    }
                    KeyCode::PageUp => viewer.scroll = viewer.scroll.saturating_sub(20),
                    KeyCode::PageDown => viewer.scroll = viewer.scroll.saturating_add(20),
                    _ => {}
                }
                return;
            }
            Overlay::Picker(picker) => {
                match key.code {
                    KeyCode::Esc | KeyCode::Char('q') => self.overlay = Overlay::None,
                    KeyCode::Up => picker.selected = picker.selected.saturating_sub(1),
                    KeyCode::Down => {
                        if picker.selected + 1 < picker.choices.len() {
                            picker.selected += 1;
                        }
                    }
                    KeyCode::Enter => {
                        if let Some(choice) = picker.choices.get(picker.selected).cloned() {
                            self.overlay = Overlay::None;
                            self.launch(&choice);
                        }
                    }
                    _ => {}
                }
                return;
            }
            Overlay::None => {}
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.should_quit = true;
            }
            KeyCode::Tab => {
                self.focus = (self.focus + 1) % self.panels.len();
            }
            KeyCode::BackTab => {
                self.focus = (self.focus + self.panels.len() - 1) % self.panels.len();
            }
            KeyCode::Up => {
                let selected = &mut self.selected[self.focus];
                *selected = selected.saturating_sub(1);
            }
            KeyCode::Down => {
                let count = self.panels[self.focus].1.len();
                let selected = &mut self.selected[self.focus];
                if *selected + 1 < count {
                    *selected += 1;
                }
            }
            KeyCode::Enter => self.activate_selected().await,
            KeyCode::Char('r') => self.execute(HostCommand::Refresh).await,
            KeyCode::Char('t') => self.execute(HostCommand::OpenCurrentTask).await,
            KeyCode::Char('u') => self.execute(HostCommand::OpenTaskQueue).await,
            KeyCode::Char('c') => self.execute(HostCommand::RunCommand).await,
            _ => {}
        }
    }

    /// Run the action of the focused row, if it has one
    pub async fn activate_selected(&mut self) {
        let action = self.panels[self.focus]
            .1
            .get(self.selected[self.focus])
            .and_then(|row| row.action.clone());

        match action {
            Some(RowAction::OpenFile(path)) => self.open_document(&path).await,
            Some(RowAction::Invoke(command)) => self.execute(command).await,
            None => {}
        }
    }

    /// Execute a host command
    pub async fn execute(&mut self, command: HostCommand) {
        log::debug!("Executing {}", command.id());
        let snapshot = self.runtime.current();
        let root = self.runtime.root().to_path_buf();

        match command {
            HostCommand::Refresh => {
                // Failures arrive as a ConfigError event
                if self.runtime.reload(ReloadTrigger::Manual).await.is_ok() {
                    self.set_message(Level::Info, "Workflow panels refreshed");
                }
            }
            HostCommand::OpenCurrentTask => {
                match commands::current_task_file(snapshot.as_deref(), &root) {
                    Ok(path) => self.open_document(&path).await,
                    Err(e) => self.set_message(Level::Warning, e.to_string()),
                }
            }
            HostCommand::OpenTaskQueue => match commands::task_queue_file(snapshot.as_deref(), &root) {
                Ok(path) => self.open_document(&path).await,
                Err(e) => self.set_message(Level::Warning, e.to_string()),
            },
            HostCommand::RunCommand => match commands::command_choices(snapshot.as_deref(), &root) {
                Ok(choices) => {
                    self.overlay = Overlay::Picker(Picker {
                        choices,
                        selected: 0,
                    })
                }
                Err(e) => self.set_message(Level::Info, e.to_string()),
            },
        }
    }

    /// Show a file in the viewer
    pub async fn open_document(&mut self, path: &Path) {
        match Document::open(path).await {
            Ok(document) => {
                self.overlay = Overlay::Viewer(Viewer {
                    document,
                    scroll: 0,
                })
            }
            Err(e) => self.set_message(Level::Error, e.to_string()),
        }
    }

    fn launch(&mut self, choice: &CommandChoice) {
        match self.runner.start(&choice.launch) {
            Ok(_) => self.set_message(Level::Info, format!("Running {}", choice.label)),
            Err(e) => self.set_message(Level::Error, format!("Failed to run {}: {}", choice.label, e)),
        }
    }

    pub fn set_message(&mut self, level: Level, text: impl Into<String>) {
        let text = text.into();
        match level {
            Level::Error => log::warn!("{}", text),
            _ => log::info!("{}", text),
        }
        self.message = Some(Message { level, text });
    }

    /// Rows of the focused panel
    pub fn focused_rows(&self) -> &[Row] {
        &self.panels[self.focus].1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crossterm::event::KeyModifiers;
    use std::fs;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    async fn app_with(config: &str) -> (tempfile::TempDir, App) {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("workflow.config.json"), config).unwrap();
        fs::write(dir.path().join("CURRENT_TASK.md"), "**Status:** IN PROGRESS\n").unwrap();
        let mut settings = Settings::for_root(dir.path());
        settings.auto_refresh_interval = 0;

        let runtime = Runtime::start(settings).await.unwrap();
        let (mut app, _command_rx) = App::new(runtime);
        app.refresh_rows().await;
        (dir, app)
    }

    #[tokio::test]
    async fn test_rows_and_navigation() {
        let (_dir, mut app) = app_with(
            r#"{"currentTask": {"path": "CURRENT_TASK.md",
                "fields": [{"label": "Status", "regex": "\\*\\*Status:\\*\\* (.+)"}]}}"#,
        )
        .await;

        assert_eq!(app.focused_rows()[0].label, "Status: IN PROGRESS");

        app.handle_key(key(KeyCode::Down)).await;
        assert_eq!(app.selected[0], 1);
        app.handle_key(key(KeyCode::Down)).await;
        assert_eq!(app.selected[0], 1);

        app.handle_key(key(KeyCode::Tab)).await;
        assert_eq!(app.focus, 1);

        app.runtime.teardown();
    }

    #[tokio::test]
    async fn test_open_current_task_row_shows_viewer() {
        let (_dir, mut app) = app_with(r#"{"currentTask": {"path": "CURRENT_TASK.md"}}"#).await;

        // Preview row, then the open row
        app.selected[0] = 1;
        app.handle_key(key(KeyCode::Enter)).await;
        match &app.overlay {
            Overlay::Viewer(viewer) => {
                assert_eq!(viewer.document.lines, vec!["**Status:** IN PROGRESS"])
            }
            other => panic!("expected viewer, got {:?}", other),
        }

        app.handle_key(key(KeyCode::Esc)).await;
        assert!(matches!(app.overlay, Overlay::None));
        assert!(!app.should_quit);

        app.runtime.teardown();
    }

    #[tokio::test]
    async fn test_unconfigured_commands_warn() {
        let (_dir, mut app) = app_with("{}").await;

        app.handle_key(key(KeyCode::Char('u'))).await;
        assert_eq!(
            app.message.as_ref().unwrap().text,
            "taskQueue.path is not configured."
        );

        app.handle_key(key(KeyCode::Char('c'))).await;
        assert_eq!(app.message.as_ref().unwrap().text, "No commands configured.");
        assert!(matches!(app.overlay, Overlay::None));

        app.runtime.teardown();
    }

    #[tokio::test]
    async fn test_picker_opens_with_commands() {
        let (_dir, mut app) = app_with(
            r#"{"commands": [{"label": "One", "command": "true"}, {"command": "true"}]}"#,
        )
        .await;

        app.handle_key(key(KeyCode::Char('c'))).await;
        app.handle_key(key(KeyCode::Down)).await;
        match &app.overlay {
            Overlay::Picker(picker) => {
                assert_eq!(picker.selected, 1);
                assert_eq!(picker.choices[1].label, "Command 2");
            }
            other => panic!("expected picker, got {:?}", other),
        }

        app.runtime.teardown();
    }

    #[tokio::test]
    async fn test_command_events_fill_output() {
        let (_dir, mut app) = app_with("{}").await;

        app.apply_command_event(CommandEvent::Started {
            session: 1,
            label: "Build".to_string(),
        });
        app.apply_command_event(CommandEvent::Output {
            session: 1,
            line: "compiling".to_string(),
        });
        app.apply_command_event(CommandEvent::Exited {
            session: 1,
            exit_code: 2,
        });

        assert_eq!(app.output_title, "Command Output: Build");
        assert_eq!(app.output, vec!["compiling"]);
        assert_eq!(app.message.as_ref().unwrap().level, Level::Warning);

        app.runtime.teardown();
    }

    #[tokio::test]
    async fn test_broken_config_at_startup_is_shown() {
        let (_dir, app) = app_with("{ broken").await;

        let message = app.message.as_ref().unwrap();
        assert_eq!(message.level, Level::Error);
        assert!(message.text.starts_with("Unable to load config from"));
        assert_eq!(
            app.panels[0].1[0].label,
            "Configure currentTask.path to display details."
        );

        app.runtime.teardown();
    }

    #[tokio::test]
    async fn test_config_error_event_sets_message() {
        let (_dir, mut app) = app_with("{}").await;
        app.apply_panel_event(PanelEvent::ConfigError {
            message: "Unable to load config".to_string(),
        })
        .await;
        assert_eq!(app.message.as_ref().unwrap().level, Level::Error);

        app.runtime.teardown();
    }
}
