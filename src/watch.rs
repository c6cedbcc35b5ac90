//! File watching - which files to observe and the notify registrations
//!
//! Watches are placed on each file's parent directory so that files which
//! are created, deleted or replaced by an editor's atomic save are still
//! noticed. Events are filtered against the current file set.

use crate::config::ConfigSnapshot;
use crate::core::{is_within, normalize, resolve};
use notify::{Config, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

/// Files the runtime should observe for one snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchSet {
    /// Inside the workspace; registered with the OS watcher
    pub watched: BTreeSet<PathBuf>,
    /// Outside the workspace; only the refresh timer covers these
    pub unwatched: BTreeSet<PathBuf>,
}

/// Changes needed to move from one watch set to the next
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchDiff {
    pub to_add: BTreeSet<PathBuf>,
    pub to_remove: BTreeSet<PathBuf>,
}

impl WatchDiff {
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

impl WatchSet {
    /// Collect the config file plus every path the snapshot references
    pub fn recompute(snapshot: Option<&ConfigSnapshot>, config_path: &Path, root: &Path) -> Self {
        let mut candidates = vec![config_path.to_path_buf()];

        if let Some(snapshot) = snapshot {
            let config = &snapshot.config;
            let referenced = config
                .current_task_path()
                .into_iter()
                .chain(config.task_queue_path())
                .chain(config.statuses.iter().map(|s| s.path.as_str()));

            for raw in referenced.filter(|p| !p.is_empty()) {
                candidates.push(resolve(raw, root));
            }
        }

        let mut set = Self::default();
        for path in candidates {
            let path = normalize(&path);
            if is_within(&path, root) {
                set.watched.insert(path);
            } else {
                set.unwatched.insert(path);
            }
        }

        set
    }

    /// Set difference between the previous and next watched files
    pub fn diff(&self, next: &WatchSet) -> WatchDiff {
        WatchDiff {
            to_add: next.watched.difference(&self.watched).cloned().collect(),
            to_remove: self.watched.difference(&next.watched).cloned().collect(),
        }
    }
}

/// Live notify registrations for a watch set.
///
/// Directory watches are shared by the files inside them and dropped with
/// the last one.
pub struct WatchRegistry {
    watcher: Option<RecommendedWatcher>,
    current: WatchSet,
    files: Arc<RwLock<BTreeSet<PathBuf>>>,
    /// Watched directory -> files that need it
    dirs: BTreeMap<PathBuf, BTreeSet<PathBuf>>,
}

impl WatchRegistry {
    /// Create a registry that calls `on_change` for events on watched files.
    ///
    /// When the platform watcher cannot be created the registry still tracks
    /// the set but registers nothing; the refresh timer covers it.
    pub fn new<F>(on_change: F) -> Self
    where
        F: Fn(PathBuf) + Send + 'static,
    {
        let files: Arc<RwLock<BTreeSet<PathBuf>>> = Arc::default();
        let filter = files.clone();

        let watcher = RecommendedWatcher::new(
            move |res: notify::Result<notify::Event>| {
                let event = match res {
                    Ok(event) => event,
                    Err(e) => {
                        log::debug!("Watch error: {}", e);
                        return;
                    }
                };
                if matches!(event.kind, EventKind::Access(_)) {
                    return;
                }

                let hit = {
                    let files = filter.read().unwrap_or_else(PoisonError::into_inner);
                    event.paths.into_iter().find(|p| files.contains(p))
                };
                if let Some(path) = hit {
                    on_change(path);
                }
            },
            Config::default(),
        );

        let watcher = match watcher {
            Ok(watcher) => Some(watcher),
            Err(e) => {
                log::warn!("File watching unavailable, relying on refresh timer: {}", e);
                None
            }
        };

        Self {
            watcher,
            current: WatchSet::default(),
            files,
            dirs: BTreeMap::new(),
        }
    }

    /// Registry with no OS watcher at all
    pub fn inactive() -> Self {
        Self {
            watcher: None,
            current: WatchSet::default(),
            files: Arc::default(),
            dirs: BTreeMap::new(),
        }
    }

    /// Current watch set
    pub fn current(&self) -> &WatchSet {
        &self.current
    }

    /// Number of directories registered with the OS watcher
    pub fn active_watch_count(&self) -> usize {
        self.dirs.len()
    }

    /// Move to `next`, touching only the files that changed
    pub fn apply(&mut self, mut next: WatchSet) -> WatchDiff {
        let diff = self.current.diff(&next);

        for path in &next.unwatched {
            if !self.current.unwatched.contains(path) {
                log::info!(
                    "{} is outside the workspace; relying on periodic refresh",
                    path.display()
                );
            }
        }

        for path in &diff.to_remove {
            self.release_dir(path);
        }

        for path in &diff.to_add {
            // Left out of the current set so the next apply retries it
            if !self.acquire_dir(path) {
                next.watched.remove(path);
            }
        }

        *self.files.write().unwrap_or_else(PoisonError::into_inner) = next.watched.clone();
        self.current = next;

        if !diff.is_empty() {
            log::debug!(
                "Watch set updated: +{} -{} ({} dirs)",
                diff.to_add.len(),
                diff.to_remove.len(),
                self.dirs.len()
            );
        }

        diff
    }

    /// Drop every registration; safe to call repeatedly
    pub fn clear(&mut self) {
        if let Some(watcher) = self.watcher.as_mut() {
            for dir in self.dirs.keys() {
                let _ = watcher.unwatch(dir);
            }
        }
        self.dirs.clear();
        self.files
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.current = WatchSet::default();
        self.watcher = None;
    }

    /// Register `file`'s directory. False when the OS refused the watch.
    fn acquire_dir(&mut self, file: &Path) -> bool {
        let Some(dir) = file.parent() else {
            return false;
        };
        if let Some(holders) = self.dirs.get_mut(dir) {
            holders.insert(file.to_path_buf());
            return true;
        }

        // Without a watcher the set is only tracked
        let Some(watcher) = self.watcher.as_mut() else {
            return true;
        };
        match watcher.watch(dir, RecursiveMode::NonRecursive) {
            Ok(()) => {
                self.dirs
                    .insert(dir.to_path_buf(), BTreeSet::from([file.to_path_buf()]));
                true
            }
            Err(e) => {
                log::debug!("Cannot watch {} yet: {}", dir.display(), e);
                false
            }
        }
    }

    fn release_dir(&mut self, file: &Path) {
        let Some(dir) = file.parent() else {
            return;
        };
        let Some(holders) = self.dirs.get_mut(dir) else {
            return;
        };

        holders.remove(file);
        if holders.is_empty() {
            self.dirs.remove(dir);
            if let Some(watcher) = self.watcher.as_mut() {
                let _ = watcher.unwatch(dir);
            }
        }
    }
}
