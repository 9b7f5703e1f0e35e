use std::collections::HashMap;

use tokio::sync::RwLock;

use super::{CacheError, CacheGateway};

#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl CacheGateway for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<(), CacheError> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }
}
