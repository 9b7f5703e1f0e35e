//! Tenant-keyed projection of the readings each tenant may see "now".
//!
//! Entries are disposable and fully derived from the store: a missing key
//! means "no data yet", never an error.

use energy_client::domain::Reading;

pub mod memory;
pub mod postgres;

pub use memory::MemoryCache;
pub use postgres::PgCache;

#[derive(thiserror::Error, Debug)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(String),
    #[error("cache payload error: {0}")]
    Payload(#[from] serde_json::Error),
}

#[async_trait::async_trait]
pub trait CacheGateway: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Unconditional overwrite; last write wins.
    async fn set(&self, key: &str, value: String) -> Result<(), CacheError>;
}

/// Serialize `readings` and overwrite the entry under `key`.
pub async fn publish(cache: &dyn CacheGateway, key: &str, readings: &[Reading]) -> Result<(), CacheError> {
    let payload = serde_json::to_string(readings)?;
    cache.set(key, payload).await
}

/// Readings cached under `key`, or an empty list on a miss.
pub async fn latest(cache: &dyn CacheGateway, key: &str) -> Result<Vec<Reading>, CacheError> {
    match cache.get(key).await? {
        Some(payload) => Ok(serde_json::from_str(&payload)?),
        None => Ok(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::reading;
    use time::macros::datetime;

    #[tokio::test]
    async fn miss_is_an_empty_list() {
        let cache = MemoryCache::new();
        let readings = latest(&cache, "never-written").await.unwrap();
        assert!(readings.is_empty());
    }

    #[tokio::test]
    async fn publish_then_latest_returns_the_list() {
        let cache = MemoryCache::new();
        let list = vec![
            reading("1A", "Building A", datetime!(2024-05-01 10:00:00 UTC)),
            reading("2A", "Building A", datetime!(2024-05-01 10:05:00 UTC)),
        ];

        publish(&cache, "tenant-a", &list).await.unwrap();

        assert_eq!(latest(&cache, "tenant-a").await.unwrap(), list);
    }

    #[tokio::test]
    async fn publish_overwrites_previous_entry() {
        let cache = MemoryCache::new();
        let older = vec![reading("1A", "Building A", datetime!(2024-05-01 10:00:00 UTC))];

        publish(&cache, "tenant-a", &older).await.unwrap();
        publish(&cache, "tenant-a", &[]).await.unwrap();

        assert!(latest(&cache, "tenant-a").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn corrupt_payload_is_a_payload_error() {
        let cache = MemoryCache::new();
        cache.set("tenant-a", "{not json".to_string()).await.unwrap();

        let err = latest(&cache, "tenant-a").await.unwrap_err();
        assert!(matches!(err, CacheError::Payload(_)));
    }
}
