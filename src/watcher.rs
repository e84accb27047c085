//! Change Watcher
//!
//! Watches a transcript root recursively and reports `added`, `changed` and `removed`
//! events for `.jsonl` files. Raw notifications go through a debouncer, so a path is only
//! reported once it has been quiet for the stability window; a transcript being appended
//! to produces one `changed` event after the writer pauses, not one per write. The
//! debouncer's interim `AnyContinuous` notices for a path still being written are dropped.
//!
//! The debouncer does not say what happened to a path, so the watcher keeps the set of
//! transcripts it knows about and classifies each quiet path against it.
//!
//! Listeners register through [`ChangeWatcher::subscribe`] and stay registered while the
//! returned [`Subscription`] is alive.

use crate::file_discovery::FileDiscovery;
use dashmap::{DashMap, DashSet};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use notify_debouncer_mini::{new_debouncer, DebounceEventResult, DebouncedEventKind, Debouncer};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Changed,
    Removed,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub path: PathBuf,
}

impl ChangeEvent {
    pub fn new(kind: ChangeKind, path: PathBuf) -> Self {
        Self { kind, path }
    }
}

type Listener = Arc<dyn Fn(&ChangeEvent) + Send + Sync>;

#[derive(Default)]
struct ListenerRegistry {
    next_id: AtomicU64,
    listeners: DashMap<u64, Listener>,
}

impl ListenerRegistry {
    fn emit(&self, event: &ChangeEvent) {
        // Clone out first so a listener may unsubscribe without deadlocking the map
        let listeners: Vec<Listener> = self.listeners.iter().map(|l| l.value().clone()).collect();
        for listener in listeners {
            listener(event);
        }
    }
}

/// Cancellation handle for a listener. Dropping it unsubscribes.
pub struct Subscription {
    id: u64,
    registry: Weak<ListenerRegistry>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        // Drop does the work
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.listeners.remove(&self.id);
        }
    }
}

pub struct ChangeWatcher {
    root: PathBuf,
    stability: Duration,
    emit_initial: bool,
    registry: Arc<ListenerRegistry>,
    known: Arc<DashSet<PathBuf>>,
    debouncer: Option<Debouncer<RecommendedWatcher>>,
}

impl ChangeWatcher {
    pub fn new(root: impl Into<PathBuf>, stability: Duration) -> Self {
        Self {
            root: root.into(),
            stability,
            emit_initial: true,
            registry: Arc::new(ListenerRegistry::default()),
            known: Arc::new(DashSet::new()),
            debouncer: None,
        }
    }

    /// Whether `start` reports transcripts already on disk as `added`.
    pub fn with_initial_events(mut self, emit_initial: bool) -> Self {
        self.emit_initial = emit_initial;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_running(&self) -> bool {
        self.debouncer.is_some()
    }

    /// Register a callback. It runs on the watcher's notification thread.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&ChangeEvent) + Send + Sync + 'static,
    {
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);
        self.registry.listeners.insert(id, Arc::new(listener));
        Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Receive events on an async channel.
    pub fn subscribe_channel(&self) -> (Subscription, mpsc::UnboundedReceiver<ChangeEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscription = self.subscribe(move |event| {
            let _ = tx.send(event.clone());
        });
        (subscription, rx)
    }

    /// Start watching. A missing root is logged and left unwatched.
    pub fn start(&mut self) -> anyhow::Result<()> {
        if self.debouncer.is_some() {
            return Ok(());
        }

        if !self.root.is_dir() {
            info!(root = %self.root.display(), "Transcript root does not exist, not watching");
            return Ok(());
        }

        let registry = Arc::clone(&self.registry);
        let known = Arc::clone(&self.known);
        let mut debouncer = new_debouncer(self.stability, move |result: DebounceEventResult| {
            match result {
                Ok(events) => {
                    // `AnyContinuous` means the path is still being written
                    for event in events.iter().filter(|e| e.kind == DebouncedEventKind::Any) {
                        for change in classify(&known, &event.path) {
                            debug!(kind = ?change.kind, path = %change.path.display(), "Transcript change");
                            registry.emit(&change);
                        }
                    }
                }
                Err(e) => warn!(error = %e, "File watcher error"),
            }
        })?;

        debouncer
            .watcher()
            .watch(&self.root, RecursiveMode::Recursive)?;

        // Seed after the watch is in place so a file created meanwhile is not missed
        self.known.clear();
        for path in FileDiscovery::find_transcript_files(&self.root) {
            if self.known.insert(path.clone()) && self.emit_initial {
                self.registry.emit(&ChangeEvent::new(ChangeKind::Added, path));
            }
        }

        info!(
            root = %self.root.display(),
            known = self.known.len(),
            stability_ms = self.stability.as_millis() as u64,
            "Watching transcripts"
        );
        self.debouncer = Some(debouncer);
        Ok(())
    }

    /// Stop watching and release the OS handles. Pending debounced events are dropped.
    pub fn stop(&mut self) {
        if self.debouncer.take().is_some() {
            info!(root = %self.root.display(), "Stopped watching transcripts");
        }
    }
}

impl Drop for ChangeWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Decide what a quiet path means given the transcripts seen so far.
fn classify(known: &DashSet<PathBuf>, path: &Path) -> Vec<ChangeEvent> {
    if FileDiscovery::is_transcript_file(path) {
        let exists = path.is_file();
        let was_known = known.contains(path);
        let kind = match (exists, was_known) {
            (true, false) => ChangeKind::Added,
            (true, true) => ChangeKind::Changed,
            (false, true) => ChangeKind::Removed,
            (false, false) => return Vec::new(),
        };

        if exists {
            known.insert(path.to_path_buf());
        } else {
            known.remove(path);
        }
        return vec![ChangeEvent::new(kind, path.to_path_buf())];
    }

    if path.exists() {
        return Vec::new();
    }

    // A removed directory takes its transcripts with it
    let gone: Vec<PathBuf> = known
        .iter()
        .filter(|p| p.starts_with(path))
        .map(|p| p.key().clone())
        .collect();
    gone.into_iter()
        .filter_map(|p| known.remove(&p))
        .map(|p| ChangeEvent::new(ChangeKind::Removed, p))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::tempdir;

    #[test]
    fn test_classify_lifecycle() {
        let dir = tempdir().unwrap();
        let known = DashSet::new();
        let file = dir.path().join("s.jsonl");

        fs::write(&file, "{}").unwrap();
        assert_eq!(classify(&known, &file)[0].kind, ChangeKind::Added);
        assert_eq!(classify(&known, &file)[0].kind, ChangeKind::Changed);

        fs::remove_file(&file).unwrap();
        assert_eq!(classify(&known, &file)[0].kind, ChangeKind::Removed);
        assert!(classify(&known, &file).is_empty());
    }

    #[test]
    fn test_classify_ignores_other_files() {
        let dir = tempdir().unwrap();
        let known = DashSet::new();
        let file = dir.path().join("notes.txt");
        fs::write(&file, "x").unwrap();

        assert!(classify(&known, &file).is_empty());
    }

    #[test]
    fn test_classify_removed_directory() {
        let dir = tempdir().unwrap();
        let project = dir.path().join("-proj");
        let known = DashSet::new();
        known.insert(project.join("a.jsonl"));
        known.insert(project.join("b.jsonl"));
        known.insert(dir.path().join("-other").join("c.jsonl"));

        let events = classify(&known, &project);
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.kind == ChangeKind::Removed));
        assert_eq!(known.len(), 1);
    }

    #[test]
    fn test_subscription_drop_unsubscribes() {
        let watcher = ChangeWatcher::new("/nonexistent", Duration::from_millis(100));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let subscription = watcher.subscribe(move |e| sink.lock().unwrap().push(e.clone()));

        let event = ChangeEvent::new(ChangeKind::Added, PathBuf::from("/x.jsonl"));
        watcher.registry.emit(&event);
        subscription.unsubscribe();
        watcher.registry.emit(&event);

        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_start_on_missing_root_is_noop() {
        let dir = tempdir().unwrap();
        let mut watcher = ChangeWatcher::new(dir.path().join("missing"), Duration::from_millis(100));

        assert!(watcher.start().is_ok());
        assert!(!watcher.is_running());
        watcher.stop();
    }

    #[test]
    fn test_stop_without_start_is_safe() {
        let mut watcher = ChangeWatcher::new("/nonexistent", Duration::from_millis(100));
        watcher.stop();
        watcher.stop();
        assert!(!watcher.is_running());
    }
}
