use crate::core::store::KeyValueCollection;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// In-memory collection, lost when the process exits
#[derive(Clone, Default)]
pub struct MemoryCollection {
    inner: Arc<Mutex<BTreeMap<String, Vec<u8>>>>,
}

impl MemoryCollection {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueCollection for MemoryCollection {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let map = self.inner.lock().await;
        let value = map.get(key).cloned();
        if value.is_some() {
            debug!("Store HIT for key: {}", key);
        } else {
            debug!("Store MISS for key: {}", key);
        }
        Ok(value)
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<()> {
        let mut map = self.inner.lock().await;
        debug!("Store PUT for key: {}", key);
        map.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let mut map = self.inner.lock().await;
        map.remove(key);
        debug!("Store REMOVE for key: {}", key);
        Ok(())
    }

    async fn entries(&self) -> Result<Vec<(String, Vec<u8>)>> {
        let map = self.inner.lock().await;
        Ok(map.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_collection_get_put() {
        let collection = MemoryCollection::new();

        // Initially, collection is empty
        assert!(collection.get("key1").await.unwrap().is_none());

        collection.put("key1", b"123".to_vec()).await.unwrap();
        assert_eq!(collection.get("key1").await.unwrap(), Some(b"123".to_vec()));

        // Get a non-existent key
        assert!(collection.get("key2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_collection_remove_and_entries() {
        let collection = MemoryCollection::new();

        collection.put("b", b"2".to_vec()).await.unwrap();
        collection.put("a", b"1".to_vec()).await.unwrap();
        assert_eq!(
            collection.entries().await.unwrap(),
            vec![("a".to_string(), b"1".to_vec()), ("b".to_string(), b"2".to_vec())]
        );

        collection.remove("a").await.unwrap();
        assert!(collection.get("a").await.unwrap().is_none());
        assert_eq!(collection.entries().await.unwrap().len(), 1);
    }
}
