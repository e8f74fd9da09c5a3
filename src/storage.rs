//! Durable key-value persistence.
//!
//! Every value is stored JSON-encoded under one of the `etl_*` keys. Reads never
//! fail: a missing or corrupted value falls back to the caller's default.

use std::cell::RefCell;
use std::collections::BTreeMap;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::StorageError;

pub const KEY_PARTICIPANT_ID: &str = "etl_participantId";
pub const KEY_SESSION_ID: &str = "etl_sessionId";
pub const KEY_STARTED_AT: &str = "etl_startedAt";
pub const KEY_STAGE: &str = "etl_stage";
pub const KEY_MODE: &str = "etl_mode";
pub const KEY_BEST: &str = "etl_best";
pub const KEY_LOCAL_LOG: &str = "etl_localLog";
pub const KEY_LOG_BUFFER: &str = "etl_logBuffer";

/// Keys removed by "Submit Another Response". The pending-upload buffer is left
/// alone so unsent records survive into the next session.
pub const RESET_KEYS: &[&str] = &[
    KEY_PARTICIPANT_ID,
    KEY_SESSION_ID,
    KEY_STARTED_AT,
    KEY_STAGE,
    KEY_BEST,
    KEY_LOCAL_LOG,
    KEY_MODE,
];

/// Minimal string store, shaped after the browser `Storage` API.
pub trait KeyValueStore {
    fn get_item(&self, key: &str) -> Option<String>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove_item(&self, key: &str);
}

/// In-process store used by native builds and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: RefCell<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.items.borrow().contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.items.borrow().keys().cloned().collect()
    }
}

impl KeyValueStore for MemoryStore {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items.borrow().get(key).cloned()
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.items
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) {
        self.items.borrow_mut().remove(key);
    }
}

/// Read a JSON value, falling back to `fallback` when absent, `null`, or corrupt.
pub fn load_or<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str, fallback: T) -> T {
    load(store, key).unwrap_or(fallback)
}

pub fn load<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Option<T> {
    let raw = store.get_item(key)?;
    match serde_json::from_str::<Option<T>>(&raw) {
        Ok(v) => v,
        Err(err) => {
            debug!(key, %err, "discarding unreadable stored value");
            None
        }
    }
}

pub fn save<T: Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let raw = serde_json::to_string(value).map_err(|e| StorageError::WriteRejected {
        key: key.to_string(),
        reason: e.to_string(),
    })?;
    store.set_item(key, &raw).inspect_err(|err| {
        warn!(key, %err, "storage write failed");
    })
}

pub fn clear(store: &dyn KeyValueStore, keys: &[&str]) {
    for key in keys {
        store.remove_item(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_or_falls_back_on_missing_and_corrupt_values() {
        let store = MemoryStore::new();
        assert_eq!(load_or(&store, KEY_STAGE, "start".to_string()), "start");

        store.set_item(KEY_STAGE, "{not json").unwrap();
        assert_eq!(load_or(&store, KEY_STAGE, "start".to_string()), "start");

        store.set_item(KEY_STAGE, "null").unwrap();
        assert_eq!(load_or(&store, KEY_STAGE, "start".to_string()), "start");

        store.set_item(KEY_STAGE, "42").unwrap();
        assert_eq!(load_or(&store, KEY_STAGE, "start".to_string()), "start");
    }

    #[test]
    fn values_are_stored_json_encoded() {
        let store = MemoryStore::new();
        save(&store, KEY_PARTICIPANT_ID, "Ada").unwrap();
        assert_eq!(store.get_item(KEY_PARTICIPANT_ID).as_deref(), Some("\"Ada\""));
        let back: Option<String> = load(&store, KEY_PARTICIPANT_ID);
        assert_eq!(back.as_deref(), Some("Ada"));
    }

    #[test]
    fn reset_keys_spare_the_upload_buffer() {
        let store = MemoryStore::new();
        save(&store, KEY_LOG_BUFFER, &vec![1, 2, 3]).unwrap();
        save(&store, KEY_BEST, &0).unwrap();
        save(&store, KEY_STAGE, "end").unwrap();
        clear(&store, RESET_KEYS);
        assert!(store.contains(KEY_LOG_BUFFER));
        assert!(!store.contains(KEY_BEST));
        assert!(!store.contains(KEY_STAGE));
    }
}
