use energy_client::{
    db::{reading_queries, ReadingOrder},
    domain::Reading,
};
use sqlx::PgPool;
use time::OffsetDateTime;

use super::{ReadingStore, StoreError};

pub struct PgReadingStore {
    pool: PgPool,
}

impl PgReadingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn store_error(e: anyhow::Error, id: Option<&str>) -> StoreError {
    if let (Some(id), Some(sqlx::Error::Database(db))) = (id, e.downcast_ref::<sqlx::Error>()) {
        if db.is_unique_violation() {
            return StoreError::Duplicate(id.to_string());
        }
    }
    StoreError::Database(e.to_string())
}

#[async_trait::async_trait]
impl ReadingStore for PgReadingStore {
    async fn append(&self, reading: &Reading) -> Result<(), StoreError> {
        reading_queries::insert_reading(&self.pool, reading)
            .await
            .map_err(|e| store_error(e, Some(&reading.id)))
    }

    async fn list_all(&self) -> Result<Vec<Reading>, StoreError> {
        reading_queries::all_readings(&self.pool)
            .await
            .map_err(|e| store_error(e, None))
    }

    async fn list_for_building(&self, building: &str) -> Result<Vec<Reading>, StoreError> {
        reading_queries::readings_for_building(&self.pool, building)
            .await
            .map_err(|e| store_error(e, None))
    }

    async fn list_for_building_between(
        &self,
        building: &str,
        start: OffsetDateTime,
        end: OffsetDateTime,
    ) -> Result<Vec<Reading>, StoreError> {
        reading_queries::readings_for_building_between(&self.pool, building, start, end)
            .await
            .map_err(|e| store_error(e, None))
    }

    async fn page(&self, order: ReadingOrder, page: u32, size: u32) -> Result<Vec<Reading>, StoreError> {
        let offset = i64::from(page) * i64::from(size);
        reading_queries::reading_page(&self.pool, order, offset, i64::from(size))
            .await
            .map_err(|e| store_error(e, None))
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Reading>, StoreError> {
        reading_queries::reading_by_id(&self.pool, id)
            .await
            .map_err(|e| store_error(e, None))
    }
}
