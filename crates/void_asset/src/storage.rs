//! Asset Storage - Resident asset bytes by key

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::handle::{AssetHandle, AssetId, AssetKind};

/// Stored asset entry
struct AssetEntry {
    handle: AssetHandle,
    /// Retention hint recorded at load time
    cached: bool,
}

/// Storage for all resident assets
pub struct AssetStorage {
    assets: RwLock<BTreeMap<String, AssetEntry>>,
    next_id: AtomicU64,
}

impl AssetStorage {
    /// Create new asset storage
    pub fn new() -> Self {
        Self {
            assets: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Allocate a new asset ID
    pub fn allocate_id(&self) -> AssetId {
        AssetId::new(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Store bytes under a key and return a handle to them
    ///
    /// Storing a key twice replaces the previous bytes with a fresh ID.
    pub fn store(&self, key: &str, kind: AssetKind, bytes: Vec<u8>, cached: bool) -> AssetHandle {
        let handle = AssetHandle::new(self.allocate_id(), key, kind, bytes);
        self.assets.write().insert(
            key.to_string(),
            AssetEntry {
                handle: handle.clone(),
                cached,
            },
        );
        handle
    }

    /// Get a handle to a resident asset
    pub fn get(&self, key: &str) -> Option<AssetHandle> {
        self.assets.read().get(key).map(|e| e.handle.clone())
    }

    /// Check if a key is resident
    pub fn contains(&self, key: &str) -> bool {
        self.assets.read().contains_key(key)
    }

    /// Retention hint recorded for a resident key
    pub fn is_cached(&self, key: &str) -> Option<bool> {
        self.assets.read().get(key).map(|e| e.cached)
    }

    /// Remove an asset
    pub fn remove(&self, key: &str) -> bool {
        self.assets.write().remove(key).is_some()
    }

    /// Clear all assets
    pub fn clear(&self) {
        self.assets.write().clear();
    }

    /// Get number of stored assets
    pub fn len(&self) -> usize {
        self.assets.read().len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.assets.read().is_empty()
    }

    /// Get all resident keys
    pub fn keys(&self) -> Vec<String> {
        self.assets.read().keys().cloned().collect()
    }
}

impl Default for AssetStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_storage() {
        let storage = AssetStorage::new();

        let handle = storage.store("car", AssetKind::Model, b"mesh".to_vec(), true);

        assert!(storage.contains("car"));
        assert_eq!(storage.get("car"), Some(handle));
        assert_eq!(storage.is_cached("car"), Some(true));
        assert_eq!(storage.len(), 1);
    }

    #[test]
    fn test_restore_allocates_new_id() {
        let storage = AssetStorage::new();

        let first = storage.store("car", AssetKind::Model, Vec::new(), false);
        let second = storage.store("car", AssetKind::Model, Vec::new(), false);

        assert_ne!(first.id(), second.id());
        assert_eq!(storage.len(), 1);
        assert!(storage.remove("car"));
        assert!(storage.is_empty());
    }

    #[test]
    fn test_resident_entry_holds_a_handle() {
        let storage = AssetStorage::new();

        let handle = storage.store("cone", AssetKind::Model, Vec::new(), true);
        assert_eq!(handle.ref_count(), 2);

        let again = storage.get("cone").unwrap();
        assert_eq!(handle.ref_count(), 3);

        drop(again);
        assert!(storage.remove("cone"));
        assert_eq!(handle.ref_count(), 1);
    }
}
