//! Key-value storage scopes and change notifications.
//!
//! Two scopes mirror what a browser tab gets: a session scope that dies
//! with the session and a persistent scope that survives it. Every handle
//! publishes a [`StorageEvent`] on write so other handles over the same
//! data (other "tabs") can react.

use gymdesk_core::error::{GymError, GymResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;

/// Storage keys shared by every component.
pub mod keys {
    pub const TOKEN: &str = "token";
    pub const REFRESH_TOKEN: &str = "refresh_token";
    pub const USER: &str = "user";
    pub const LOCALE: &str = "gym_locale";
    pub const OFFLINE_ACTIVE_MEMBERS: &str = "offline_active_members";
    pub const OFFLINE_MEMBER_DETAILS: &str = "offline_member_details";
    pub const PENDING_SCANS: &str = "pending_scans";
}

const EVENT_CAPACITY: usize = 64;

static NEXT_STORE_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies one handle onto a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StoreId(u64);

impl StoreId {
    fn next() -> Self {
        Self(NEXT_STORE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Published on every `set`/`remove`. `new_value` is `None` for removals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    pub key: String,
    pub new_value: Option<String>,
    pub origin: StoreId,
}

pub trait KeyValueStore: Send + Sync {
    fn id(&self) -> StoreId;
    fn get(&self, key: &str) -> GymResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> GymResult<()>;
    fn remove(&self, key: &str) -> GymResult<()>;
    fn subscribe(&self) -> broadcast::Receiver<StorageEvent>;
}

/// JSON helpers over any [`KeyValueStore`].
pub trait KeyValueStoreExt: KeyValueStore {
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> GymResult<Option<T>> {
        match self.get(key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> GymResult<()> {
        self.set(key, &serde_json::to_string(value)?)
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStoreExt for S {}

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

struct Shared {
    data: RwLock<HashMap<String, String>>,
    events: broadcast::Sender<StorageEvent>,
}

impl Shared {
    fn new(data: HashMap<String, String>) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Arc::new(Self {
            data: RwLock::new(data),
            events,
        })
    }

    fn read(&self, key: &str) -> GymResult<Option<String>> {
        let data = self
            .data
            .read()
            .map_err(|_| GymError::Storage("store lock poisoned".into()))?;
        Ok(data.get(key).cloned())
    }

    /// Applies a write and returns a snapshot for persistence.
    fn write(
        &self,
        key: &str,
        value: Option<&str>,
        origin: StoreId,
    ) -> GymResult<HashMap<String, String>> {
        let snapshot = {
            let mut data = self
                .data
                .write()
                .map_err(|_| GymError::Storage("store lock poisoned".into()))?;
            match value {
                Some(v) => {
                    data.insert(key.to_string(), v.to_string());
                }
                None => {
                    data.remove(key);
                }
            }
            data.clone()
        };

        // No receivers is fine.
        let _ = self.events.send(StorageEvent {
            key: key.to_string(),
            new_value: value.map(str::to_string),
            origin,
        });
        Ok(snapshot)
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// In-process store. Used for the session scope and in tests.
pub struct MemoryStore {
    id: StoreId,
    shared: Arc<Shared>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            id: StoreId::next(),
            shared: Shared::new(HashMap::new()),
        }
    }

    /// Another handle over the same data, with its own identity.
    pub fn new_handle(&self) -> Self {
        Self {
            id: StoreId::next(),
            shared: self.shared.clone(),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for MemoryStore {
    fn id(&self) -> StoreId {
        self.id
    }

    fn get(&self, key: &str) -> GymResult<Option<String>> {
        self.shared.read(key)
    }

    fn set(&self, key: &str, value: &str) -> GymResult<()> {
        self.shared.write(key, Some(value), self.id).map(|_| ())
    }

    fn remove(&self, key: &str) -> GymResult<()> {
        self.shared.write(key, None, self.id).map(|_| ())
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageEvent> {
        self.shared.events.subscribe()
    }
}

// ---------------------------------------------------------------------------
// FileStore
// ---------------------------------------------------------------------------

/// A JSON object on disk, cached in memory and rewritten on every change.
pub struct FileStore {
    id: StoreId,
    path: PathBuf,
    shared: Arc<Shared>,
}

impl FileStore {
    /// Opens `path`, creating parent directories. A missing file is an
    /// empty store; an unreadable one is an error.
    pub fn open(path: impl Into<PathBuf>) -> GymResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                GymError::Storage(format!("Failed to create {}: {e}", parent.display()))
            })?;
        }

        let data = load_map(&path)?;
        tracing::debug!(path = %path.display(), entries = data.len(), "opened file store");

        Ok(Self {
            id: StoreId::next(),
            path,
            shared: Shared::new(data),
        })
    }

    pub fn new_handle(&self) -> Self {
        Self {
            id: StoreId::next(),
            path: self.path.clone(),
            shared: self.shared.clone(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, snapshot: &HashMap<String, String>) -> GymResult<()> {
        let body = serde_json::to_vec_pretty(snapshot)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, body)
            .and_then(|_| std::fs::rename(&tmp, &self.path))
            .map_err(|e| GymError::Storage(format!("Failed to write {}: {e}", self.path.display())))
    }
}

fn load_map(path: &Path) -> GymResult<HashMap<String, String>> {
    match std::fs::read(path) {
        Ok(bytes) if bytes.is_empty() => Ok(HashMap::new()),
        Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
            GymError::Storage(format!("{} is not a JSON object: {e}", path.display()))
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
        Err(e) => Err(GymError::Storage(format!(
            "Failed to read {}: {e}",
            path.display()
        ))),
    }
}

impl KeyValueStore for FileStore {
    fn id(&self) -> StoreId {
        self.id
    }

    fn get(&self, key: &str) -> GymResult<Option<String>> {
        self.shared.read(key)
    }

    fn set(&self, key: &str, value: &str) -> GymResult<()> {
        let snapshot = self.shared.write(key, Some(value), self.id)?;
        self.persist(&snapshot)
    }

    fn remove(&self, key: &str) -> GymResult<()> {
        let snapshot = self.shared.write(key, None, self.id)?;
        self.persist(&snapshot)
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageEvent> {
        self.shared.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_basic_ops() {
        let store = MemoryStore::new();
        assert_eq!(store.get("k").unwrap(), None);
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn handles_share_data_and_publish_origin() {
        let tab_a = MemoryStore::new();
        let tab_b = tab_a.new_handle();
        let mut rx = tab_b.subscribe();

        tab_a.set(keys::LOCALE, "ar").unwrap();

        assert_eq!(tab_b.get(keys::LOCALE).unwrap().as_deref(), Some("ar"));
        let ev = rx.try_recv().unwrap();
        assert_eq!(ev.key, keys::LOCALE);
        assert_eq!(ev.new_value.as_deref(), Some("ar"));
        assert_eq!(ev.origin, tab_a.id());
        assert_ne!(ev.origin, tab_b.id());
    }

    #[test]
    fn json_helpers() {
        let store = MemoryStore::new();
        store.set_json("ids", &vec!["a", "b"]).unwrap();
        let ids: Vec<String> = store.get_json("ids").unwrap().unwrap();
        assert_eq!(ids, vec!["a", "b"]);

        store.set("broken", "{not json").unwrap();
        assert!(store.get_json::<Vec<String>>("broken").is_err());
    }

    #[test]
    fn file_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("local.json");

        let store = FileStore::open(&path).unwrap();
        store.set(keys::LOCALE, "ar").unwrap();
        store.set(keys::USER, "{}").unwrap();
        store.remove(keys::USER).unwrap();
        drop(store);

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.get(keys::LOCALE).unwrap().as_deref(), Some("ar"));
        assert_eq!(reopened.get(keys::USER).unwrap(), None);
    }

    #[test]
    fn file_store_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("local.json");
        std::fs::write(&path, "[1,2,3]").unwrap();
        assert!(matches!(FileStore::open(&path), Err(GymError::Storage(_))));
    }
}
