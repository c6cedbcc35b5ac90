//! Task queue panel
//!
//! JSON queues are rendered item by item through the configured template;
//! text queues show one row per non-empty line.

use super::{read_text, Row};
use crate::commands::HostCommand;
use crate::config::{ConfigSnapshot, QueueKind, TaskQueueConfig};
use crate::core::{get_by_path, render, resolve, value_to_string};
use serde_json::{Map, Value};
use std::path::Path;

pub const NOT_CONFIGURED: &str = "Configure taskQueue.path to display queue items.";
pub const OPEN_LABEL: &str = "Open task queue…";

/// Rows for the task queue panel
pub async fn rows(snapshot: Option<&ConfigSnapshot>, root: &Path) -> Vec<Row> {
    let Some(queue) = snapshot
        .and_then(|s| s.config.task_queue.as_ref())
        .filter(|q| !q.path.is_empty())
    else {
        return vec![Row::text(NOT_CONFIGURED)];
    };

    let path = resolve(&queue.path, root);
    let mut rows = match read_text(&path).await {
        Some(content) => rows_from_content(queue, &content, root),
        None => vec![Row::text(format!("Unable to read {}", queue.path))],
    };
    rows.push(Row::invoke(OPEN_LABEL, HostCommand::OpenTaskQueue));
    rows
}

/// Rows for already loaded queue content, without the trailing open row
pub fn rows_from_content(queue: &TaskQueueConfig, content: &str, root: &Path) -> Vec<Row> {
    match &queue.kind {
        QueueKind::Json => match serde_json::from_str::<Value>(content) {
            Ok(doc) => json_rows(queue, &doc, root),
            Err(e) => vec![Row::text(format!("Failed to parse {}: {}", queue.path, e))],
        },
        QueueKind::Text => content
            .lines()
            .filter(|line| !line.is_empty())
            .take(queue.limit())
            .map(Row::text)
            .collect(),
        QueueKind::Other(kind) => vec![Row::text(format!("Unsupported queue type: {}", kind))],
    }
}

fn json_rows(queue: &TaskQueueConfig, doc: &Value, root: &Path) -> Vec<Row> {
    let items: &[Value] = match doc {
        Value::Array(items) => items,
        _ => match get_by_path(doc, queue.list()) {
            Some(Value::Array(items)) => items,
            _ => &[],
        },
    };

    items
        .iter()
        .take(queue.limit())
        .map(|item| item_row(queue, item, root))
        .collect()
}

fn item_row(queue: &TaskQueueConfig, item: &Value, root: &Path) -> Row {
    let mut values = match item {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };

    let icon = item
        .get(queue.status_field())
        .map(|status| queue.status_icon(&value_to_string(status)))
        .unwrap_or_default();
    values.insert("statusIcon".to_string(), Value::String(icon));

    let mut label = render(queue.template(), &values);
    if label.is_empty() {
        label = item.to_string();
    }

    let reveal = queue
        .reveal_path
        .as_deref()
        .and_then(|reveal| get_by_path(item, reveal))
        .filter(|target| !matches!(target, Value::Null | Value::Bool(false)))
        .map(value_to_string)
        .filter(|target| !target.is_empty());

    match reveal {
        Some(target) => Row::open_file(label, resolve(&target, root)),
        None => Row::text(label),
    }
}
