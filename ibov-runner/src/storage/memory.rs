//! In-process object storage.

use super::{ObjectInfo, ObjectStorage, StorageError};
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Objects kept in a map, keyed like the real bucket.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.lock().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Vec<u8>>> {
        // A poisoned map is still a valid map.
        self.objects.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ObjectStorage for MemoryStorage {
    fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), StorageError> {
        self.lock().insert(key.to_string(), bytes);
        Ok(())
    }

    fn head(&self, key: &str) -> Result<ObjectInfo, StorageError> {
        self.lock()
            .get(key)
            .map(|b| ObjectInfo {
                key: key.to_string(),
                size: b.len() as u64,
            })
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_overwrites_and_head_reports_size() {
        let store = MemoryStorage::new();
        store.put("a/b", vec![1, 2, 3]).unwrap();
        store.put("a/b", vec![9]).unwrap();

        assert_eq!(store.get("a/b"), Some(vec![9]));
        assert_eq!(store.head("a/b").unwrap().size, 1);
        assert!(matches!(store.head("a/c"), Err(StorageError::NotFound(_))));
    }
}
