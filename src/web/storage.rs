//! `window.localStorage` behind the `KeyValueStore` trait.

use crate::error::StorageError;
use crate::storage::KeyValueStore;

fn local_storage() -> Option<web_sys::Storage> {
    web_sys::window().and_then(|w| w.local_storage().ok().flatten())
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LocalStorage;

impl KeyValueStore for LocalStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        local_storage().and_then(|s| s.get_item(key).ok().flatten())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let storage = local_storage().ok_or(StorageError::Unavailable)?;
        storage
            .set_item(key, value)
            .map_err(|e| StorageError::WriteRejected {
                key: key.to_string(),
                reason: e.as_string().unwrap_or_else(|| format!("{e:?}")),
            })
    }

    fn remove_item(&self, key: &str) {
        if let Some(s) = local_storage() {
            let _ = s.remove_item(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn values_round_trip_through_local_storage() {
        let store = LocalStorage;
        storage::save(&store, "etl_test_key", &vec![1, 2, 3]).unwrap();
        let back: Vec<u32> = storage::load_or(&store, "etl_test_key", Vec::new());
        assert_eq!(back, vec![1, 2, 3]);
        store.remove_item("etl_test_key");
        assert!(store.get_item("etl_test_key").is_none());
    }
}
