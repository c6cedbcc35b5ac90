//! Current task panel

use super::{or_empty, read_text, Row};
use crate::commands::HostCommand;
use crate::config::{ConfigSnapshot, CurrentTaskConfig};
use crate::core::{extract, resolve};
use std::path::Path;

const PREVIEW_LINES: usize = 5;

pub const NOT_CONFIGURED: &str = "Configure currentTask.path to display details.";
pub const OPEN_LABEL: &str = "Open current task…";

/// Rows for the current task panel
pub async fn rows(snapshot: Option<&ConfigSnapshot>, root: &Path) -> Vec<Row> {
    let Some(task) = snapshot
        .and_then(|s| s.config.current_task.as_ref())
        .filter(|t| !t.path.is_empty())
    else {
        return vec![Row::text(NOT_CONFIGURED)];
    };

    let path = resolve(&task.path, root);
    let mut rows = match read_text(&path).await {
        Some(content) => rows_from_content(task, &content),
        None => vec![Row::text(format!("Unable to read {}", task.path))],
    };
    rows.push(Row::invoke(OPEN_LABEL, HostCommand::OpenCurrentTask));
    rows
}

/// Field rows, or a short preview when no fields are configured
pub fn rows_from_content(task: &CurrentTaskConfig, content: &str) -> Vec<Row> {
    if task.fields.is_empty() {
        return vec![Row::text(preview(content))];
    }

    task.fields
        .iter()
        .map(|field| {
            let label = if field.label.is_empty() {
                "Field"
            } else {
                field.label.as_str()
            };
            let value = or_empty(extract(content, &field.regex));
            Row::text(format!("{}: {}", label, value))
        })
        .collect()
}

fn preview(content: &str) -> String {
    let joined = content
        .split('\n')
        .take(PREVIEW_LINES)
        .map(|line| line.trim_end_matches('\r'))
        .collect::<Vec<_>>()
        .join(" ");

    if joined.trim().is_empty() {
        "(file is empty)".to_string()
    } else {
        joined
    }
}
