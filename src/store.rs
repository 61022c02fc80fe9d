//! Persistence context for `Preferences`
//!
//! The store owns the last committed snapshot, serializes it on every commit
//! and notifies subscribers. It is hydrated once at startup and flushed on
//! teardown.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::prefs::Preferences;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store io error: {0}")]
    Io(#[from] io::Error),
    #[error("store snapshot is not valid json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Where snapshots live
pub trait SnapshotStorage: Send {
    /// `Ok(None)` when nothing has been stored yet
    fn read(&self) -> Result<Option<String>, StoreError>;
    fn write(&mut self, snapshot: &str) -> Result<(), StoreError>;
}

/// Snapshot stored as a JSON file
#[derive(Clone, Debug)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotStorage for JsonFileStorage {
    fn read(&self) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn write(&mut self, snapshot: &str) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, snapshot)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

pub type SubscriptionId = u64;

type Subscriber = Box<dyn Fn(&Preferences) + Send>;

pub struct PreferencesStore {
    storage: Box<dyn SnapshotStorage>,
    current: Preferences,
    dirty: bool,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_id: SubscriptionId,
}

impl PreferencesStore {
    /// Load the stored snapshot. A missing or unreadable snapshot yields defaults.
    pub fn hydrate(storage: Box<dyn SnapshotStorage>) -> Self {
        let current = match storage.read() {
            Ok(Some(json)) => match Preferences::from_snapshot(&json) {
                Ok(prefs) => {
                    tracing::info!(
                        favorites = prefs.favorites.len(),
                        history = prefs.history.len(),
                        "preferences hydrated"
                    );
                    prefs
                }
                Err(err) => {
                    tracing::warn!(error = %err, "corrupt preferences snapshot, using defaults");
                    Preferences::default()
                }
            },
            Ok(None) => Preferences::default(),
            Err(err) => {
                tracing::warn!(error = %err, "failed to read preferences, using defaults");
                Preferences::default()
            }
        };

        Self {
            storage,
            current,
            dirty: false,
            subscribers: Vec::new(),
            next_id: 0,
        }
    }

    pub fn preferences(&self) -> &Preferences {
        &self.current
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: Fn(&Preferences) + Send + 'static,
    {
        let id = self.next_id;
        self.next_id += 1;
        self.subscribers.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub_id, _)| *sub_id != id);
        self.subscribers.len() != before
    }

    /// Replace the snapshot, notify subscribers, then write it out.
    ///
    /// Subscribers see the new value even if the write fails; the store
    /// stays dirty until a later commit or `flush` succeeds.
    pub fn commit(&mut self, prefs: Preferences) -> Result<(), StoreError> {
        if prefs == self.current && !self.dirty {
            return Ok(());
        }
        self.current = prefs;
        for (_, listener) in &self.subscribers {
            listener(&self.current);
        }
        self.dirty = true;
        self.write()
    }

    /// Retry a failed write.
    pub fn flush(&mut self) -> Result<(), StoreError> {
        if self.dirty {
            self.write()?;
        }
        Ok(())
    }

    fn write(&mut self) -> Result<(), StoreError> {
        let json = self.current.to_snapshot()?;
        match self.storage.write(&json) {
            Ok(()) => {
                self.dirty = false;
                tracing::debug!(bytes = json.len(), "preferences committed");
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to write preferences");
                Err(err)
            }
        }
    }
}

impl std::fmt::Debug for PreferencesStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreferencesStore")
            .field("current", &self.current)
            .field("dirty", &self.dirty)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// In-memory storage whose writes can be made to fail
    #[derive(Clone, Default)]
    struct MemoryStorage {
        contents: Arc<parking_lot::Mutex<Option<String>>>,
        fail_writes: Arc<AtomicBool>,
    }

    impl SnapshotStorage for MemoryStorage {
        fn read(&self) -> Result<Option<String>, StoreError> {
            Ok(self.contents.lock().clone())
        }

        fn write(&mut self, snapshot: &str) -> Result<(), StoreError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(io::Error::other("disk full").into());
            }
            *self.contents.lock() = Some(snapshot.to_string());
            Ok(())
        }
    }

    fn favorites(names: &[&str]) -> Preferences {
        Preferences {
            favorites: names.iter().map(|s| s.to_string()).collect(),
            history: Vec::new(),
        }
    }

    #[test]
    fn test_hydrate_missing_snapshot_uses_defaults() {
        let store = PreferencesStore::hydrate(Box::new(MemoryStorage::default()));
        assert_eq!(store.preferences(), &Preferences::default());
        assert!(!store.is_dirty());
    }

    #[test]
    fn test_hydrate_corrupt_snapshot_uses_defaults() {
        let storage = MemoryStorage::default();
        *storage.contents.lock() = Some("{ favorites: nope".into());

        let store = PreferencesStore::hydrate(Box::new(storage));
        assert_eq!(store.preferences(), &Preferences::default());
    }

    #[test]
    fn test_commit_writes_and_notifies() {
        let storage = MemoryStorage::default();
        let mut store = PreferencesStore::hydrate(Box::new(storage.clone()));
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        store.subscribe(move |prefs| {
            assert_eq!(prefs.favorites, vec!["Quito"]);
            seen.fetch_add(1, Ordering::SeqCst);
        });

        store.commit(favorites(&["Quito"])).expect("commit");

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let written = storage.contents.lock().clone().expect("snapshot written");
        assert_eq!(
            Preferences::from_snapshot(&written).expect("parse"),
            favorites(&["Quito"])
        );
    }

    #[test]
    fn test_unsubscribe_stops_notifications() {
        let mut store = PreferencesStore::hydrate(Box::new(MemoryStorage::default()));
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let id = store.subscribe(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        assert!(store.unsubscribe(id));
        assert!(!store.unsubscribe(id));
        store.commit(favorites(&["Lagos"])).expect("commit");

        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_failed_write_is_retried_on_flush() {
        let storage = MemoryStorage::default();
        let mut store = PreferencesStore::hydrate(Box::new(storage.clone()));

        storage.fail_writes.store(true, Ordering::SeqCst);
        assert!(store.commit(favorites(&["Perth"])).is_err());
        assert!(store.is_dirty());
        assert_eq!(store.preferences(), &favorites(&["Perth"]));

        storage.fail_writes.store(false, Ordering::SeqCst);
        store.flush().expect("flush");
        assert!(!store.is_dirty());
        assert!(storage.contents.lock().is_some());
    }

    #[test]
    fn test_json_file_storage_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("store.json");
        let mut storage = JsonFileStorage::new(&path);

        assert!(storage.read().expect("read").is_none());
        storage.write(r#"{"favorites":["Doha"]}"#).expect("write");

        let store = PreferencesStore::hydrate(Box::new(storage));
        assert_eq!(store.preferences(), &favorites(&["Doha"]));
        assert!(path.exists());
    }
}
