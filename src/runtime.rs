//! Workflow runtime - owns the store, watches, refresh timer and event stream
//!
//! One `Runtime` exists per workspace. It is built at startup, drives every
//! reload (activation, manual, watcher, timer) through a single path, and is
//! torn down at shutdown.

use crate::config::{ConfigSnapshot, ConfigStore, LoadOutcome, Settings};
use crate::core::resolve;
use crate::error::{LoadError, WorkflowError};
use crate::events::{EventStream, PanelEvent, ReloadTrigger};
use crate::views::{PanelKind, Row};
use crate::watch::{WatchRegistry, WatchSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Quiet period that folds a burst of file events into one reload
const WATCH_DEBOUNCE: Duration = Duration::from_millis(150);

/// Owned runtime state for one workspace
pub struct Runtime {
    root: PathBuf,
    settings: Settings,
    store: ConfigStore,
    watches: Mutex<WatchRegistry>,
    events: EventStream,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    reload_gate: tokio::sync::Mutex<()>,
    /// Most recent load failure not yet superseded by a good load
    last_error: Mutex<Option<LoadError>>,
    shut_down: AtomicBool,
}

impl Runtime {
    /// Resolve the workspace and build an unloaded runtime.
    ///
    /// Nothing is watched or scheduled until [`Runtime::start`].
    pub fn new(settings: Settings) -> Result<Self, WorkflowError> {
        let root = workspace_root(settings.root.as_deref())?;
        let config_path = resolve(settings.config_path(), &root);

        Ok(Self {
            store: ConfigStore::new(config_path),
            root,
            settings,
            watches: Mutex::new(WatchRegistry::inactive()),
            events: EventStream::default(),
            tasks: Mutex::new(Vec::new()),
            reload_gate: tokio::sync::Mutex::new(()),
            last_error: Mutex::new(None),
            shut_down: AtomicBool::new(false),
        })
    }

    /// Build, load the config once and start watching and the refresh timer.
    ///
    /// A failed first load is reported on the event stream; the runtime
    /// still starts so that fixing the config file picks it up.
    pub async fn start(settings: Settings) -> Result<Arc<Self>, WorkflowError> {
        let runtime = Arc::new(Self::new(settings)?);
        let (tx, rx) = mpsc::unbounded_channel();

        {
            let tx = tx.clone();
            let registry = WatchRegistry::new(move |path| {
                log::debug!("Change detected: {}", path.display());
                let _ = tx.send(ReloadTrigger::Watcher);
            });
            *runtime.lock_watches() = registry;
        }
        // Watch the config file even before it loads
        runtime.rebuild_watches(None);

        if let Err(e) = runtime.reload(ReloadTrigger::Activation).await {
            log::warn!("{}", e);
        }

        let mut tasks = vec![tokio::spawn(drive(Arc::downgrade(&runtime), rx))];
        if let Some(period) = runtime.settings.refresh_interval() {
            tasks.push(spawn_timer(period, tx));
        } else {
            log::info!("Periodic refresh disabled");
        }
        runtime
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(tasks);

        log::info!("Workflow runtime started for {}", runtime.root.display());
        Ok(runtime)
    }

    /// Workspace root all config paths resolve against
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Absolute path of the workflow config file
    pub fn config_path(&self) -> &Path {
        self.store.config_path()
    }

    /// Current config snapshot, if one has loaded
    pub fn current(&self) -> Option<Arc<ConfigSnapshot>> {
        self.store.current()
    }

    /// Load failure still in effect, such as a broken config at startup.
    ///
    /// Errors are broadcast as they happen; this covers consumers that
    /// subscribe afterwards.
    pub fn last_error(&self) -> Option<LoadError> {
        self.lock_last_error().clone()
    }

    /// Subscribe to panel change notifications
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<PanelEvent> {
        self.events.subscribe()
    }

    /// Rows for one panel against the current snapshot
    pub async fn rows(&self, panel: PanelKind) -> Vec<Row> {
        let snapshot = self.current();
        panel.rows(snapshot.as_deref(), &self.root).await
    }

    /// Files currently covered by the watcher
    pub fn watch_set(&self) -> WatchSet {
        self.lock_watches().current().clone()
    }

    /// Directories registered with the OS watcher
    pub fn active_watch_count(&self) -> usize {
        self.lock_watches().active_watch_count()
    }

    /// Background tasks still running (reload driver, refresh timer)
    pub fn active_task_count(&self) -> usize {
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|task| !task.is_finished())
            .count()
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    /// Reload the config and, when a new snapshot lands, rebuild watches
    /// and notify panels exactly once.
    ///
    /// Returns `Ok(None)` when the result was discarded (stale or shut down).
    pub async fn reload(
        &self,
        trigger: ReloadTrigger,
    ) -> Result<Option<Arc<ConfigSnapshot>>, LoadError> {
        if self.is_shut_down() {
            return Ok(None);
        }

        let _guard = self.reload_gate.lock().await;
        match self.store.reload().await {
            Ok(LoadOutcome::Applied(snapshot)) => {
                if self.is_shut_down() {
                    return Ok(None);
                }
                self.lock_last_error().take();
                self.rebuild_watches(Some(&snapshot));
                self.events.emit(PanelEvent::Refreshed {
                    generation: snapshot.generation,
                    trigger,
                });
                log::debug!("Reloaded config #{} ({:?})", snapshot.generation, trigger);
                Ok(Some(snapshot))
            }
            Ok(LoadOutcome::Discarded) => Ok(None),
            Err(e) => {
                *self.lock_last_error() = Some(e.clone());
                if trigger.surfaces_errors() {
                    self.events.emit(PanelEvent::ConfigError {
                        message: e.to_string(),
                    });
                } else {
                    log::warn!("{} (keeping last good config)", e);
                }
                Err(e)
            }
        }
    }

    /// Stop the timer and driver, release every watch, stop reloading.
    ///
    /// Idempotent.
    pub fn teardown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }

        self.store.close();
        for task in self
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
        {
            task.abort();
        }
        self.lock_watches().clear();

        log::info!("Workflow runtime stopped");
    }

    fn rebuild_watches(&self, snapshot: Option<&ConfigSnapshot>) {
        let next = WatchSet::recompute(snapshot, self.store.config_path(), &self.root);
        self.lock_watches().apply(next);
    }

    fn lock_last_error(&self) -> std::sync::MutexGuard<'_, Option<LoadError>> {
        self.last_error.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_watches(&self) -> std::sync::MutexGuard<'_, WatchRegistry> {
        self.watches.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Resolve and check the workspace root; defaults to the current directory
pub fn workspace_root(root: Option<&Path>) -> Result<PathBuf, WorkflowError> {
    let candidate = match root {
        Some(root) => root.to_path_buf(),
        None => std::env::current_dir()
            .map_err(|_| WorkflowError::WorkspaceMissing(PathBuf::from(".")))?,
    };

    match candidate.canonicalize() {
        Ok(path) if path.is_dir() => Ok(path),
        _ => Err(WorkflowError::WorkspaceMissing(candidate)),
    }
}

/// Turn watcher and timer triggers into reloads, one at a time
async fn drive(runtime: Weak<Runtime>, mut rx: mpsc::UnboundedReceiver<ReloadTrigger>) {
    while let Some(trigger) = rx.recv().await {
        if trigger == ReloadTrigger::Watcher {
            tokio::time::sleep(WATCH_DEBOUNCE).await;
        }
        // Fold anything queued meanwhile into this reload
        while rx.try_recv().is_ok() {}

        let Some(runtime) = runtime.upgrade() else {
            break;
        };
        let _ = runtime.reload(trigger).await;
    }
}

fn spawn_timer(period: Duration, tx: mpsc::UnboundedSender<ReloadTrigger>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if tx.send(ReloadTrigger::Timer).is_err() {
                break;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const CONFIG: &str = r#"{
        "currentTask": {"path": "CURRENT_TASK.md"},
        "statuses": [{"label": "Build", "path": "status/build.md", "regex": "Result: (.+)"}]
    }"#;

    fn workspace(config: &str) -> (TempDir, Settings) {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("status")).unwrap();
        fs::write(dir.path().join("workflow.config.json"), config).unwrap();
        let settings = Settings::for_root(dir.path());
        (dir, settings)
    }

    #[test]
    fn test_missing_workspace_is_fatal() {
        let settings = Settings::for_root("/definitely/not/a/workspace");
        assert!(matches!(
            Runtime::new(settings),
            Err(WorkflowError::WorkspaceMissing(_))
        ));
    }

    #[tokio::test]
    async fn test_startup_error_is_kept_until_a_good_load() {
        let (dir, mut settings) = workspace("{ broken");
        settings.auto_refresh_interval = 0;
        let runtime = Runtime::start(settings).await.unwrap();

        let err = runtime.last_error().unwrap();
        assert!(err.to_string().starts_with("Unable to load config from"));

        fs::write(dir.path().join("workflow.config.json"), CONFIG).unwrap();
        runtime.reload(ReloadTrigger::Manual).await.unwrap();
        assert!(runtime.last_error().is_none());

        runtime.teardown();
    }

    #[tokio::test]
    async fn test_start_loads_and_watches() {
        let (_dir, settings) = workspace(CONFIG);
        let runtime = Runtime::start(settings).await.unwrap();

        assert!(runtime.current().is_some());
        let watched = runtime.watch_set().watched;
        assert!(watched.contains(&runtime.root().join("CURRENT_TASK.md")));
        assert!(watched.contains(&runtime.root().join("status/build.md")));
        assert!(watched.contains(&runtime.root().join("workflow.config.json")));
        assert_eq!(runtime.active_task_count(), 2);

        runtime.teardown();
    }

    #[tokio::test]
    async fn test_reload_notifies_once() {
        let (_dir, settings) = workspace(CONFIG);
        let runtime = Runtime::start(settings).await.unwrap();
        let mut events = runtime.subscribe();

        let snapshot = runtime.reload(ReloadTrigger::Manual).await.unwrap().unwrap();
        assert_eq!(
            events.recv().await.unwrap(),
            PanelEvent::Refreshed {
                generation: snapshot.generation,
                trigger: ReloadTrigger::Manual,
            }
        );
        assert!(events.try_recv().is_err());

        runtime.teardown();
    }

    #[tokio::test]
    async fn test_invalid_config_keeps_snapshot_and_watches() {
        let (dir, settings) = workspace(CONFIG);
        let runtime = Runtime::start(settings).await.unwrap();
        let before = runtime.current().unwrap();
        let watches_before = runtime.watch_set();
        let mut events = runtime.subscribe();

        fs::write(dir.path().join("workflow.config.json"), "{ broken").unwrap();

        // Background triggers stay silent
        assert!(runtime.reload(ReloadTrigger::Timer).await.is_err());
        assert!(events.try_recv().is_err());

        // Manual refresh reports the error
        assert!(runtime.reload(ReloadTrigger::Manual).await.is_err());
        assert!(matches!(
            events.recv().await.unwrap(),
            PanelEvent::ConfigError { .. }
        ));

        assert!(Arc::ptr_eq(&before, &runtime.current().unwrap()));
        assert_eq!(runtime.watch_set(), watches_before);

        runtime.teardown();
    }

    #[tokio::test]
    async fn test_teardown_twice() {
        let (_dir, settings) = workspace(CONFIG);
        let runtime = Runtime::start(settings).await.unwrap();

        runtime.teardown();
        runtime.teardown();

        assert!(runtime.is_shut_down());
        assert_eq!(runtime.active_task_count(), 0);
        assert_eq!(runtime.active_watch_count(), 0);
        assert!(runtime.watch_set().watched.is_empty());
        assert!(runtime.reload(ReloadTrigger::Manual).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_disabled_timer() {
        let (_dir, mut settings) = workspace(CONFIG);
        settings.auto_refresh_interval = 0;
        let runtime = Runtime::start(settings).await.unwrap();

        // Only the reload driver runs
        assert_eq!(runtime.active_task_count(), 1);
        runtime.teardown();
    }

    #[tokio::test]
    async fn test_rows_follow_config() {
        let (dir, settings) = workspace(CONFIG);
        fs::write(dir.path().join("status/build.md"), "Result: green").unwrap();
        let runtime = Runtime::start(settings).await.unwrap();

        let rows = runtime.rows(PanelKind::Status).await;
        assert_eq!(rows[0].label, "Build: green");

        runtime.teardown();
    }

    #[tokio::test]
    async fn test_watched_file_change_triggers_refresh() {
        let (dir, mut settings) = workspace(CONFIG);
        settings.auto_refresh_interval = 0;
        fs::write(dir.path().join("CURRENT_TASK.md"), "draft").unwrap();
        let runtime = Runtime::start(settings).await.unwrap();
        let mut events = runtime.subscribe();

        fs::write(runtime.root().join("CURRENT_TASK.md"), "updated").unwrap();

        let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(
            event,
            PanelEvent::Refreshed {
                trigger: ReloadTrigger::Watcher,
                ..
            }
        ));

        runtime.teardown();
    }
}
