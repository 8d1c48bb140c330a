pub mod disk;
pub mod memory;
pub mod rate;

use crate::core::store::{KeyValueCollection, Store};
use anyhow::{Context, Result};
use disk::DiskCollection;
use fjall::{Keyspace, PartitionCreateOptions};
use memory::MemoryCollection;
use std::{
    collections::HashMap,
    path::Path,
    sync::{Arc, PoisonError, RwLock},
};
use tracing::debug;

/// A thread-safe key-value store that can hold multiple collections.
///
/// Collections live in a fjall keyspace when the store was opened on disk,
/// and in memory otherwise.
pub struct KeyValueStore {
    collections: RwLock<HashMap<String, Arc<dyn KeyValueCollection>>>,
    keyspace: Option<Arc<Keyspace>>,
}

impl KeyValueStore {
    pub fn open(path: &Path) -> Result<Self> {
        std::fs::create_dir_all(path)
            .with_context(|| format!("Failed to create store directory: {}", path.display()))?;
        let keyspace = fjall::Config::new(path)
            .open()
            .with_context(|| format!("Failed to open store at {}", path.display()))?;
        debug!("Opened store at {}", path.display());

        Ok(Self {
            collections: RwLock::new(HashMap::new()),
            keyspace: Some(Arc::new(keyspace)),
        })
    }

    pub fn in_memory() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            keyspace: None,
        }
    }

    pub fn is_persistent(&self) -> bool {
        self.keyspace.is_some()
    }
}

impl Store for KeyValueStore {
    fn collection(&self, name: &str) -> Result<Arc<dyn KeyValueCollection>> {
        {
            let collections = self.collections.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(collection) = collections.get(name) {
                return Ok(Arc::clone(collection));
            }
        }

        let mut collections = self
            .collections
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(collection) = collections.get(name) {
            return Ok(Arc::clone(collection));
        }

        let collection: Arc<dyn KeyValueCollection> = match &self.keyspace {
            Some(keyspace) => {
                let partition = keyspace
                    .open_partition(name, PartitionCreateOptions::default())
                    .with_context(|| format!("Failed to open collection: {name}"))?;
                Arc::new(DiskCollection::new(Arc::clone(keyspace), partition))
            }
            None => Arc::new(MemoryCollection::new()),
        };
        collections.insert(name.to_string(), Arc::clone(&collection));
        Ok(collection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_collections_are_shared_by_name() {
        let store = KeyValueStore::in_memory();
        assert!(!store.is_persistent());

        let first = store.collection("categories").unwrap();
        first.put("cash", b"{}".to_vec()).await.unwrap();

        let second = store.collection("categories").unwrap();
        assert_eq!(second.get("cash").await.unwrap(), Some(b"{}".to_vec()));

        let other = store.collection("rates").unwrap();
        assert!(other.get("cash").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_disk_store_persists_across_instances() {
        let dir = tempdir().unwrap();
        {
            let store = KeyValueStore::open(dir.path()).unwrap();
            assert!(store.is_persistent());
            let rates = store.collection("rates").unwrap();
            rates.put("last_rate", b"1".to_vec()).await.unwrap();
        }

        let store = KeyValueStore::open(dir.path()).unwrap();
        let rates = store.collection("rates").unwrap();
        assert_eq!(rates.get("last_rate").await.unwrap(), Some(b"1".to_vec()));
    }
}
