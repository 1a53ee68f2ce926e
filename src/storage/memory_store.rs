// src/storage/memory_store.rs
//! In-memory key-value storage for tickets, resources and tokens.
//!
//! Entries live in a hashmap behind a mutex. `take` removes an entry while
//! holding the same guard that read it, which makes ticket consumption
//! single-use even when rounds race on the same id.

use crate::error::{Result, UmaError};
use crate::storage::KeyValueStore;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// Thread-safe in-memory store.
///
/// This storage provides:
/// - O(1) average case insertions, lookups and removals
/// - Atomic get-and-delete through [`KeyValueStore::take`]
///
/// # Note
/// Contents are lost on restart.
pub struct MemoryStore<V> {
    /// Entries by key
    entries: Mutex<HashMap<String, V>>,
}

impl<V> MemoryStore<V> {
    /// Creates a new empty store.
    pub fn new() -> Self {
        MemoryStore {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the number of stored entries.
    pub fn len(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.lock()?.is_empty())
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, V>>> {
        self.entries
            .lock()
            .map_err(|_| UmaError::Storage("memory store lock poisoned".into()))
    }
}

impl<V> Default for MemoryStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<V> KeyValueStore<V> for MemoryStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &str) -> Result<Option<V>> {
        Ok(self.lock()?.get(key).cloned())
    }

    /// Overwrites an existing entry with the same key.
    async fn set(&self, key: &str, value: V) -> Result<()> {
        self.lock()?.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.lock()?.remove(key).is_some())
    }

    async fn has(&self, key: &str) -> Result<bool> {
        Ok(self.lock()?.contains_key(key))
    }

    async fn take(&self, key: &str) -> Result<Option<V>> {
        Ok(self.lock()?.remove(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio_test::{assert_ok, block_on};

    #[test]
    fn test_has_after_set() {
        let store: MemoryStore<u32> = MemoryStore::new();
        let key = "ticket-123";

        // Initially should not contain
        assert!(!assert_ok!(block_on(store.has(key))));

        assert_ok!(block_on(store.set(key, 7u32)));
        assert!(assert_ok!(block_on(store.has(key))));
        assert_eq!(assert_ok!(block_on(store.get(key))), Some(7));
    }

    #[tokio::test]
    async fn test_delete() {
        let store: MemoryStore<String> = MemoryStore::new();
        store.set("temporary", "value".to_string()).await.unwrap();

        assert!(store.delete("temporary").await.unwrap());
        assert!(!store.has("temporary").await.unwrap());
        assert!(store.is_empty().unwrap());

        // Delete non-existent returns false
        assert!(!store.delete("non-existent-id").await.unwrap());
    }

    #[tokio::test]
    async fn test_count_after_overwrite() {
        let store: MemoryStore<i32> = MemoryStore::new();
        store.set("id1", 1).await.unwrap();
        store.set("id2", 2).await.unwrap();
        store.set("id2", 3).await.unwrap();

        assert_eq!(store.len().unwrap(), 2);
        assert_eq!(store.get("id2").await.unwrap(), Some(3));
    }

    #[tokio::test]
    async fn test_take_is_single_use() {
        let store: MemoryStore<String> = MemoryStore::new();
        store.set("ticket", "state".to_string()).await.unwrap();

        assert_eq!(store.take("ticket").await.unwrap(), Some("state".to_string()));
        assert_eq!(store.take("ticket").await.unwrap(), None);
        assert!(store.get("ticket").await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_take_has_one_winner() {
        let store: Arc<MemoryStore<u8>> = Arc::new(MemoryStore::new());
        store.set("ticket", 1u8).await.unwrap();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.take("ticket").await.unwrap() })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap().is_some() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }
}
