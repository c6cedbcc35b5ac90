//! Status panel - one row per configured status file

use super::{or_empty, read_text, Row};
use crate::config::{ConfigSnapshot, StatusConfig};
use crate::core::{extract, resolve};
use std::path::Path;

pub const NOT_CONFIGURED: &str = "Configure statuses[] to display live updates.";

/// Rows for the status panel
pub async fn rows(snapshot: Option<&ConfigSnapshot>, root: &Path) -> Vec<Row> {
    let statuses = snapshot
        .map(|s| s.config.statuses.as_slice())
        .unwrap_or_default();

    if statuses.is_empty() {
        return vec![Row::text(NOT_CONFIGURED)];
    }

    let mut rows = Vec::with_capacity(statuses.len());
    for status in statuses {
        rows.push(status_row(status, root).await);
    }
    rows
}

async fn status_row(status: &StatusConfig, root: &Path) -> Row {
    if status.path.is_empty() {
        let label = non_empty(&status.label).unwrap_or("Status");
        return Row::text(format!("{}: missing path", label));
    }

    let path = resolve(&status.path, root);
    let Some(content) = read_text(&path).await else {
        let label = non_empty(&status.label).unwrap_or(&status.path);
        return Row::text(format!("{}: unreadable", label));
    };

    row_from_content(status, &content, &path)
}

/// Row for an already read status file at `path`
pub fn row_from_content(status: &StatusConfig, content: &str, path: &Path) -> Row {
    let basename = Path::new(&status.path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| status.path.clone());
    let label = non_empty(&status.label)
        .map(str::to_string)
        .unwrap_or(basename);

    let text = format!("{}: {}", label, or_empty(extract(content, &status.regex)));
    if status.open_on_click {
        Row::open_file(text, path)
    } else {
        Row::text(text)
    }
}

fn non_empty(s: &str) -> Option<&str> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkflowConfig;
    use crate::views::RowAction;
    use std::path::PathBuf;

    fn status(label: &str, path: &str, regex: &str) -> StatusConfig {
        StatusConfig {
            label: label.to_string(),
            path: path.to_string(),
            regex: regex.to_string(),
            open_on_click: true,
        }
    }

    #[test]
    fn test_row_label_and_action() {
        let cfg = status("Build", "status/build.md", r"Result: (\w+)");
        let path = Path::new("/ws/status/build.md");
        let row = row_from_content(&cfg, "Result: green\n", path);
        assert_eq!(row.label, "Build: green");
        assert_eq!(row.action, Some(RowAction::OpenFile(path.to_path_buf())));
    }

    #[test]
    fn test_row_uses_basename_and_placeholder() {
        let cfg = StatusConfig {
            open_on_click: false,
            ..status("", "status/deploy.md", r"State: (.+)")
        };
        let row = row_from_content(&cfg, "nothing here", Path::new("/ws/status/deploy.md"));
        assert_eq!(row, Row::text("deploy.md: —"));
    }

    #[tokio::test]
    async fn test_rows_without_statuses() {
        let rows = rows(None, Path::new("/ws")).await;
        assert_eq!(rows, vec![Row::text(NOT_CONFIGURED)]);
    }

    #[tokio::test]
    async fn test_rows_degrade_per_entry() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("ok.md"), "Phase: review").unwrap();

        let snapshot = ConfigSnapshot {
            config: WorkflowConfig::from_json(
                r#"{"statuses": [
                    {"label": "Phase", "path": "ok.md", "regex": "Phase: (.+)"},
                    {"label": "Lint"},
                    {"path": "missing.md"},
                    {"label": "Tests", "path": "also-missing.md"}
                ]}"#,
            )
            .unwrap(),
            source: PathBuf::from("workflow.config.json"),
            generation: 1,
        };

        let labels: Vec<_> = rows(Some(&snapshot), dir.path())
            .await
            .into_iter()
            .map(|r| r.label)
            .collect();
        assert_eq!(
            labels,
            vec![
                "Phase: review",
                "Lint: missing path",
                "missing.md: unreadable",
                "Tests: unreadable",
            ]
        );
    }
}
