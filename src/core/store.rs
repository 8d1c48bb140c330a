//! Key-value storage abstractions

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use std::sync::Arc;

/// A named group of string keys mapping to raw bytes.
#[async_trait]
pub trait KeyValueCollection: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<()>;

    async fn remove(&self, key: &str) -> Result<()>;

    async fn entries(&self) -> Result<Vec<(String, Vec<u8>)>>;
}

pub trait Store: Send + Sync {
    /// Returns the collection called `name`, creating it on first use.
    fn collection(&self, name: &str) -> Result<Arc<dyn KeyValueCollection>>;
}

pub async fn get_json<T: DeserializeOwned>(
    collection: &dyn KeyValueCollection,
    key: &str,
) -> Result<Option<T>> {
    match collection.get(key).await? {
        Some(bytes) => {
            let value = serde_json::from_slice(&bytes)
                .with_context(|| format!("Failed to decode stored value for key: {key}"))?;
            Ok(Some(value))
        }
        None => Ok(None),
    }
}

pub async fn put_json<T: Serialize + Sync>(
    collection: &dyn KeyValueCollection,
    key: &str,
    value: &T,
) -> Result<()> {
    let bytes = serde_json::to_vec(value)
        .with_context(|| format!("Failed to encode value for key: {key}"))?;
    collection.put(key, bytes).await
}
