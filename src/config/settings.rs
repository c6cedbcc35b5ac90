//! Runtime settings - where the config lives and how often to poll

use clap::Args;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "workflow.config.json";
pub const DEFAULT_REFRESH_SECS: i64 = 15;

/// Host-level settings, read from flags or the environment
#[derive(Debug, Clone, Args)]
pub struct Settings {
    /// Workspace root that relative config paths resolve against
    #[arg(long, env = "WORKFLOW_ROOT", global = true)]
    pub root: Option<PathBuf>,

    /// Workflow config file, relative to the workspace root or absolute
    #[arg(
        long = "config",
        env = "WORKFLOW_CONFIG_PATH",
        default_value = DEFAULT_CONFIG_PATH,
        global = true
    )]
    pub config_path: String,

    /// Seconds between fallback reloads; 0 or less disables the timer
    #[arg(
        long = "interval",
        env = "WORKFLOW_REFRESH_INTERVAL",
        default_value_t = DEFAULT_REFRESH_SECS,
        allow_negative_numbers = true,
        global = true
    )]
    pub auto_refresh_interval: i64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            root: None,
            config_path: DEFAULT_CONFIG_PATH.to_string(),
            auto_refresh_interval: DEFAULT_REFRESH_SECS,
        }
    }
}

impl Settings {
    /// Settings for a given workspace root with everything else defaulted
    pub fn for_root(root: impl AsRef<Path>) -> Self {
        Self {
            root: Some(root.as_ref().to_path_buf()),
            ..Self::default()
        }
    }

    /// Period of the fallback reload timer, `None` when disabled
    pub fn refresh_interval(&self) -> Option<Duration> {
        if self.auto_refresh_interval <= 0 {
            None
        } else {
            Some(Duration::from_secs(self.auto_refresh_interval as u64))
        }
    }

    /// Config path as configured, or the default when blank
    pub fn config_path(&self) -> &str {
        if self.config_path.trim().is_empty() {
            DEFAULT_CONFIG_PATH
        } else {
            &self.config_path
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_interval() {
        let mut settings = Settings::default();
        assert_eq!(settings.refresh_interval(), Some(Duration::from_secs(15)));

        settings.auto_refresh_interval = 0;
        assert_eq!(settings.refresh_interval(), None);

        settings.auto_refresh_interval = -3;
        assert_eq!(settings.refresh_interval(), None);
    }

    #[test]
    fn test_blank_config_path_falls_back() {
        let mut settings = Settings::for_root("/ws");
        settings.config_path = "  ".to_string();
        assert_eq!(settings.config_path(), DEFAULT_CONFIG_PATH);
    }
}
