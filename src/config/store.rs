//! Config store - owns the active snapshot and serializes reloads
//!
//! Every load takes a ticket from a monotonic counter. A finished load is
//! only installed when its ticket is newer than the installed snapshot, so a
//! slow read that completes after a newer one can never roll the panels back.

use super::model::WorkflowConfig;
use crate::error::LoadError;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::Mutex;

/// Immutable view of one successfully loaded config
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigSnapshot {
    pub config: WorkflowConfig,
    /// File the config was read from
    pub source: PathBuf,
    /// Ticket of the load that produced it; increases with every load
    pub generation: u64,
}

/// Result of a load that did not fail
#[derive(Debug, Clone)]
pub enum LoadOutcome {
    /// New snapshot is now current
    Applied(Arc<ConfigSnapshot>),
    /// A newer load already finished, or the store was closed
    Discarded,
}

impl LoadOutcome {
    pub fn applied(&self) -> Option<&Arc<ConfigSnapshot>> {
        match self {
            Self::Applied(snapshot) => Some(snapshot),
            Self::Discarded => None,
        }
    }
}

#[derive(Default)]
struct StoreState {
    snapshot: Option<Arc<ConfigSnapshot>>,
}

/// Holds the current config snapshot for one workspace
pub struct ConfigStore {
    config_path: PathBuf,
    state: RwLock<StoreState>,
    tickets: AtomicU64,
    reload_gate: Mutex<()>,
    closed: AtomicBool,
}

impl ConfigStore {
    /// Create an unloaded store for an already resolved config path
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            state: RwLock::new(StoreState::default()),
            tickets: AtomicU64::new(0),
            reload_gate: Mutex::new(()),
            closed: AtomicBool::new(false),
        }
    }

    /// Absolute path of the config file
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Current snapshot, `None` while unloaded
    pub fn current(&self) -> Option<Arc<ConfigSnapshot>> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot
            .clone()
    }

    /// Read and parse the config file.
    ///
    /// On error the previous snapshot is left in place.
    pub async fn load(&self) -> Result<LoadOutcome, LoadError> {
        let ticket = self.issue_ticket();
        let raw = tokio::fs::read_to_string(&self.config_path)
            .await
            .map_err(|e| LoadError::new(&self.config_path, e))?;
        self.complete(ticket, &raw)
    }

    /// Load with at most one reload in flight per store
    pub async fn reload(&self) -> Result<LoadOutcome, LoadError> {
        let _guard = self.reload_gate.lock().await;
        self.load().await
    }

    /// Stop installing snapshots; later and in-flight loads are discarded
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn issue_ticket(&self) -> u64 {
        self.tickets.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn complete(&self, ticket: u64, raw: &str) -> Result<LoadOutcome, LoadError> {
        let config =
            WorkflowConfig::from_json(raw).map_err(|e| LoadError::new(&self.config_path, e))?;

        if self.is_closed() {
            log::debug!("Config store closed, dropping load #{}", ticket);
            return Ok(LoadOutcome::Discarded);
        }

        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(current) = &state.snapshot {
            if current.generation > ticket {
                log::debug!(
                    "Discarding stale config load #{} (current #{})",
                    ticket,
                    current.generation
                );
                return Ok(LoadOutcome::Discarded);
            }
        }

        let snapshot = Arc::new(ConfigSnapshot {
            config,
            source: self.config_path.clone(),
            generation: ticket,
        });
        state.snapshot = Some(snapshot.clone());
        log::info!(
            "Loaded config #{} from {}",
            ticket,
            self.config_path.display()
        );

        Ok(LoadOutcome::Applied(snapshot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const VALID: &str = r#"{"currentTask": {"path": "CURRENT_TASK.md"}}"#;
    const OTHER: &str = r#"{"currentTask": {"path": "OTHER.md"}}"#;

    #[tokio::test]
    async fn test_load_installs_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("workflow.config.json");
        fs::write(&path, VALID).unwrap();

        let store = ConfigStore::new(&path);
        assert!(store.current().is_none());

        let outcome = store.load().await.unwrap();
        let snapshot = outcome.applied().unwrap();
        assert_eq!(snapshot.source, path);
        assert_eq!(
            snapshot.config.current_task_path(),
            Some("CURRENT_TASK.md")
        );
        assert_eq!(store.current().unwrap().generation, snapshot.generation);
    }

    #[tokio::test]
    async fn test_missing_file_is_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.json");
        let store = ConfigStore::new(&path);

        let err = store.load().await.unwrap_err();
        assert_eq!(err.path, path);
        assert!(store.current().is_none());
    }

    #[tokio::test]
    async fn test_invalid_json_keeps_last_good() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("workflow.config.json");
        fs::write(&path, VALID).unwrap();

        let store = ConfigStore::new(&path);
        store.reload().await.unwrap();
        let before = store.current().unwrap();

        fs::write(&path, "{ not json").unwrap();
        let err = store.reload().await.unwrap_err();
        assert!(err.to_string().contains("Unable to load config"));

        let after = store.current().unwrap();
        assert!(Arc::ptr_eq(&before, &after));
    }

    #[test]
    fn test_out_of_order_completion_keeps_newest() {
        let store = ConfigStore::new("/ws/workflow.config.json");

        let older = store.issue_ticket();
        let newer = store.issue_ticket();

        // Newer read finishes first
        let applied = store.complete(newer, OTHER).unwrap();
        assert!(applied.applied().is_some());

        // Older read lands afterwards and must not win
        let late = store.complete(older, VALID).unwrap();
        assert!(matches!(late, LoadOutcome::Discarded));

        let current = store.current().unwrap();
        assert_eq!(current.generation, newer);
        assert_eq!(current.config.current_task_path(), Some("OTHER.md"));
    }

    #[test]
    fn test_closed_store_discards() {
        let store = ConfigStore::new("/ws/workflow.config.json");
        let ticket = store.issue_ticket();
        store.close();

        let outcome = store.complete(ticket, VALID).unwrap();
        assert!(matches!(outcome, LoadOutcome::Discarded));
        assert!(store.current().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_reloads_end_on_latest_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("workflow.config.json");
        fs::write(&path, VALID).unwrap();

        let store = Arc::new(ConfigStore::new(&path));
        let first = {
            let store = store.clone();
            tokio::spawn(async move { store.reload().await })
        };
        let second = {
            let store = store.clone();
            tokio::spawn(async move { store.reload().await })
        };
        first.await.unwrap().unwrap();
        second.await.unwrap().unwrap();

        // Both reloads ran; the survivor carries the highest ticket
        assert_eq!(store.current().unwrap().generation, 2);
    }
}
