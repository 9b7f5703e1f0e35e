use sqlx::PgPool;

use super::{CacheError, CacheGateway};

/// Cache entries in the `reading_cache` table, so they survive restarts and
/// can be read by a separate API process.
pub struct PgCache {
    pool: PgPool,
}

impl PgCache {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl CacheGateway for PgCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        sqlx::query_scalar::<_, String>("SELECT payload FROM reading_cache WHERE cache_key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))
    }

    async fn set(&self, key: &str, value: String) -> Result<(), CacheError> {
        sqlx::query(
            r#"
            INSERT INTO reading_cache (cache_key, payload, updated_at)
            VALUES ($1, $2, now())
            ON CONFLICT (cache_key)
            DO UPDATE SET payload = EXCLUDED.payload, updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .map(|_| ())
        .map_err(|e| CacheError::Backend(e.to_string()))
    }
}
