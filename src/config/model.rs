//! Workflow config document - `workflow.config.json`
//!
//! ```json
//! {
//!   "currentTask": { "path": "CURRENT_TASK.md",
//!                    "fields": [{ "label": "Status", "regex": "\\*\\*Status:\\*\\* (.+)" }] },
//!   "taskQueue":   { "path": "TASK_QUEUE.json", "type": "json", "limit": 5,
//!                    "statusIcons": { "done": "✅" }, "template": "{{statusIcon}} #{{id}}" },
//!   "statuses":    [{ "label": "Build", "path": "status/build.md", "regex": "Result: (.+)" }],
//!   "commands":    [{ "label": "Coordinator", "command": "./ai_coordinator.sh" }]
//! }
//! ```
//!
//! Every section and field is optional. Parsing is best effort: a `null` or
//! mistyped value falls back to its default instead of failing the document,
//! and list entries that do not parse are skipped.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Queue rows shown when `limit` is missing or zero
pub const DEFAULT_QUEUE_LIMIT: usize = 5;

/// Parsed workflow config
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WorkflowConfig {
    #[serde(deserialize_with = "lenient")]
    pub current_task: Option<CurrentTaskConfig>,
    #[serde(deserialize_with = "lenient")]
    pub task_queue: Option<TaskQueueConfig>,
    #[serde(deserialize_with = "lenient_list")]
    pub statuses: Vec<StatusConfig>,
    #[serde(deserialize_with = "lenient_list")]
    pub commands: Vec<CommandConfig>,
}

impl WorkflowConfig {
    /// Parse a config document
    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }

    /// Configured current task path, if any
    pub fn current_task_path(&self) -> Option<&str> {
        self.current_task
            .as_ref()
            .map(|t| t.path.as_str())
            .filter(|p| !p.is_empty())
    }

    /// Configured task queue path, if any
    pub fn task_queue_path(&self) -> Option<&str> {
        self.task_queue
            .as_ref()
            .map(|q| q.path.as_str())
            .filter(|p| !p.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CurrentTaskConfig {
    #[serde(deserialize_with = "lenient")]
    pub path: String,
    #[serde(deserialize_with = "lenient_list")]
    pub fields: Vec<FieldConfig>,
}

/// One labelled value pulled out of the current task file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldConfig {
    #[serde(deserialize_with = "lenient")]
    pub label: String,
    #[serde(deserialize_with = "lenient")]
    pub regex: String,
}

/// Queue file format
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum QueueKind {
    Json,
    Text,
    /// Anything else; kept so the panel can name it
    Other(String),
}

impl Default for QueueKind {
    fn default() -> Self {
        Self::Json
    }
}

impl From<String> for QueueKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "json" => Self::Json,
            "text" => Self::Text,
            _ => Self::Other(value),
        }
    }
}

impl From<QueueKind> for String {
    fn from(kind: QueueKind) -> Self {
        kind.to_string()
    }
}

impl fmt::Display for QueueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
            Self::Text => write!(f, "text"),
            Self::Other(other) => write!(f, "{}", other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TaskQueueConfig {
    #[serde(deserialize_with = "lenient")]
    pub path: String,
    #[serde(rename = "type", deserialize_with = "lenient")]
    pub kind: QueueKind,
    /// Dotted path to the list when the document root is an object
    #[serde(deserialize_with = "lenient")]
    pub list: String,
    #[serde(deserialize_with = "lenient")]
    pub limit: usize,
    #[serde(deserialize_with = "lenient")]
    pub status_field: String,
    /// Status value -> icon; icons may be any JSON value
    #[serde(deserialize_with = "lenient")]
    pub status_icons: BTreeMap<String, Value>,
    #[serde(deserialize_with = "lenient")]
    pub template: String,
    /// Dotted path, per item, to a file opened when the row is activated
    #[serde(deserialize_with = "lenient")]
    pub reveal_path: Option<String>,
}

impl Default for TaskQueueConfig {
    fn default() -> Self {
        Self {
            path: String::new(),
            kind: QueueKind::Json,
            list: "queue".to_string(),
            limit: DEFAULT_QUEUE_LIMIT,
            status_field: "status".to_string(),
            status_icons: BTreeMap::new(),
            template: "{{status}}".to_string(),
            reveal_path: None,
        }
    }
}

impl TaskQueueConfig {
    /// Maximum data rows; zero means the default
    pub fn limit(&self) -> usize {
        if self.limit == 0 {
            DEFAULT_QUEUE_LIMIT
        } else {
            self.limit
        }
    }

    /// Dotted path to the item list, `queue` when blank
    pub fn list(&self) -> &str {
        or_default(&self.list, "queue")
    }

    /// Item key holding the status, `status` when blank
    pub fn status_field(&self) -> &str {
        or_default(&self.status_field, "status")
    }

    /// Row template, `{{status}}` when blank
    pub fn template(&self) -> &str {
        or_default(&self.template, "{{status}}")
    }

    /// Icon for a status value; blank when unmapped or `null`
    pub fn status_icon(&self, status: &str) -> String {
        self.status_icons
            .get(status)
            .filter(|icon| !icon.is_null())
            .map(crate::core::value_to_string)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StatusConfig {
    #[serde(deserialize_with = "lenient")]
    pub label: String,
    #[serde(deserialize_with = "lenient")]
    pub path: String,
    #[serde(deserialize_with = "lenient")]
    pub regex: String,
    /// Only an explicit `false` turns it off
    #[serde(deserialize_with = "unless_false")]
    pub open_on_click: bool,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            label: String::new(),
            path: String::new(),
            regex: String::new(),
            open_on_click: true,
        }
    }
}

/// Shell command offered by run-configured-command
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandConfig {
    #[serde(deserialize_with = "lenient")]
    pub label: String,
    #[serde(deserialize_with = "lenient")]
    pub command: String,
    #[serde(deserialize_with = "lenient")]
    pub cwd: Option<String>,
}

impl CommandConfig {
    /// Label shown in the picker; `index` is zero-based
    pub fn display_label(&self, index: usize) -> String {
        if self.label.is_empty() {
            format!("Command {}", index + 1)
        } else {
            self.label.clone()
        }
    }

    /// Detail line shown under the command in the picker
    pub fn detail(&self) -> String {
        match &self.cwd {
            Some(cwd) if !cwd.is_empty() => format!("cwd: {}", cwd),
            _ => String::new(),
        }
    }
}

fn or_default<'a>(value: &'a str, default: &'a str) -> &'a str {
    if value.is_empty() {
        default
    } else {
        value
    }
}

/// The value, or the type's default when it is `null` or mistyped
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(T::default());
    }
    Ok(serde_json::from_value(value).unwrap_or_else(|e| {
        log::debug!("Ignoring config value: {}", e);
        T::default()
    }))
}

/// Entries that parse; anything but an array is an empty list
fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let Value::Array(entries) = Value::deserialize(deserializer)? else {
        return Ok(Vec::new());
    };

    Ok(entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value(entry) {
            Ok(entry) => Some(entry),
            Err(e) => {
                log::debug!("Skipping config entry: {}", e);
                None
            }
        })
        .collect())
}

fn unless_false<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(!matches!(Value::deserialize(deserializer)?, Value::Bool(false)))
}
