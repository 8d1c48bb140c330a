use crate::core::rate::{ExchangeRate, RatePersistence};
use crate::core::store::{KeyValueCollection, get_json, put_json};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

pub const RATES_COLLECTION: &str = "rates";
const LAST_RATE_KEY: &str = "last_rate";

/// Keeps the last accepted exchange rate in a store collection.
pub struct StoredRatePersistence {
    collection: Arc<dyn KeyValueCollection>,
}

impl StoredRatePersistence {
    pub fn new(collection: Arc<dyn KeyValueCollection>) -> Self {
        Self { collection }
    }
}

#[async_trait]
impl RatePersistence for StoredRatePersistence {
    async fn load(&self) -> Option<ExchangeRate> {
        match get_json::<ExchangeRate>(self.collection.as_ref(), LAST_RATE_KEY).await {
            Ok(rate) => {
                debug!(?rate, "Loaded persisted exchange rate");
                rate
            }
            Err(e) => {
                warn!(error = %format!("{e:#}"), "Failed to load persisted exchange rate");
                None
            }
        }
    }

    async fn save(&self, rate: &ExchangeRate) {
        if let Err(e) = put_json(self.collection.as_ref(), LAST_RATE_KEY, rate).await {
            warn!(error = %format!("{e:#}"), "Failed to persist exchange rate");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryCollection;
    use anyhow::{Result, anyhow};
    use chrono::{TimeZone, Utc};

    struct BrokenCollection;

    #[async_trait]
    impl KeyValueCollection for BrokenCollection {
        async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>> {
            Err(anyhow!("disk on fire"))
        }

        async fn put(&self, _key: &str, _value: Vec<u8>) -> Result<()> {
            Err(anyhow!("disk on fire"))
        }

        async fn remove(&self, _key: &str) -> Result<()> {
            Err(anyhow!("disk on fire"))
        }

        async fn entries(&self) -> Result<Vec<(String, Vec<u8>)>> {
            Err(anyhow!("disk on fire"))
        }
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let persistence = StoredRatePersistence::new(Arc::new(MemoryCollection::new()));
        assert!(persistence.load().await.is_none());

        let timestamp = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let rate = ExchangeRate::new(117.23, timestamp).unwrap();
        persistence.save(&rate).await;

        assert_eq!(persistence.load().await, Some(rate));
    }

    #[tokio::test]
    async fn test_corrupt_record_reads_as_absent() {
        let collection = Arc::new(MemoryCollection::new());
        collection
            .put(LAST_RATE_KEY, br#"{"rate":-3.0,"timestamp":0}"#.to_vec())
            .await
            .unwrap();

        let persistence = StoredRatePersistence::new(collection);
        assert!(persistence.load().await.is_none());
    }

    #[tokio::test]
    async fn test_storage_failures_are_swallowed() {
        let persistence = StoredRatePersistence::new(Arc::new(BrokenCollection));
        persistence
            .save(&ExchangeRate::new(117.0, Utc::now()).unwrap())
            .await;
        assert!(persistence.load().await.is_none());
    }
}
