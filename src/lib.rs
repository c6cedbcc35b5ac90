//! Workflow Panels - config-driven workflow dashboard
//!
//! Reads a JSON workflow config from a workspace, renders the current task,
//! task queue and status files as panels, keeps them fresh through file
//! watching and a fallback timer, and runs the configured commands in
//! terminal sessions.

pub mod app;
pub mod commands;
pub mod config;
pub mod core;
pub mod error;
pub mod events;
pub mod runtime;
pub mod terminal;
pub mod ui;
pub mod views;
pub mod watch;

// Re-exports
pub use app::App;
pub use commands::{CommandChoice, Document, HostCommand, Launch};
pub use config::{ConfigSnapshot, ConfigStore, LoadOutcome, Settings, WorkflowConfig};
pub use error::{LoadError, WorkflowError};
pub use events::{PanelEvent, ReloadTrigger};
pub use runtime::Runtime;
pub use views::{PanelKind, Row, RowAction};
pub use watch::{WatchDiff, WatchSet};

/// Result type alias
pub type Result<T> = anyhow::Result<T>;
