//! Persistence boundary for readings.

use energy_client::{db::ReadingOrder, domain::Reading};
use time::OffsetDateTime;

pub mod memory;
pub mod postgres;

pub use memory::MemoryReadingStore;
pub use postgres::PgReadingStore;

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("reading {0} already exists")]
    Duplicate(String),
    #[error("database error: {0}")]
    Database(String),
}

#[async_trait::async_trait]
pub trait ReadingStore: Send + Sync {
    async fn append(&self, reading: &Reading) -> Result<(), StoreError>;

    /// Every stored reading, across all buildings.
    async fn list_all(&self) -> Result<Vec<Reading>, StoreError>;

    async fn list_for_building(&self, building: &str) -> Result<Vec<Reading>, StoreError>;

    /// Readings of `building` ingested within `[start, end)`.
    async fn list_for_building_between(
        &self,
        building: &str,
        start: OffsetDateTime,
        end: OffsetDateTime,
    ) -> Result<Vec<Reading>, StoreError>;

    /// Zero-based `page` of `size` readings.
    async fn page(&self, order: ReadingOrder, page: u32, size: u32) -> Result<Vec<Reading>, StoreError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Reading>, StoreError>;
}
