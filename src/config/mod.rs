//! Workflow config - document model, runtime settings, snapshot store

mod model;
mod settings;
mod store;

pub use model::{
    CommandConfig, CurrentTaskConfig, FieldConfig, QueueKind, StatusConfig, TaskQueueConfig,
    WorkflowConfig, DEFAULT_QUEUE_LIMIT,
};
pub use settings::{Settings, DEFAULT_CONFIG_PATH, DEFAULT_REFRESH_SECS};
pub use store::{ConfigSnapshot, ConfigStore, LoadOutcome};
