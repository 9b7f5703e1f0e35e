use std::cmp::Ordering;

use energy_client::{
    db::{ReadingOrder, SortField},
    domain::Reading,
};
use time::OffsetDateTime;
use tokio::sync::RwLock;

use super::{ReadingStore, StoreError};

/// Process-local store, kept in insertion order. Used for local runs and tests.
#[derive(Default)]
pub struct MemoryReadingStore {
    rows: RwLock<Vec<Reading>>,
}

impl MemoryReadingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_readings(readings: Vec<Reading>) -> Self {
        Self {
            rows: RwLock::new(readings),
        }
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

fn compare(a: &Reading, b: &Reading, order: ReadingOrder) -> Ordering {
    let primary = match order.field {
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
        SortField::Timestamp => a.timestamp.cmp(&b.timestamp),
        SortField::Id => a.id.cmp(&b.id),
        SortField::Building => a.building.cmp(&b.building),
    };
    let primary = if order.descending { primary.reverse() } else { primary };
    primary.then_with(|| a.id.cmp(&b.id))
}

#[async_trait::async_trait]
impl ReadingStore for MemoryReadingStore {
    async fn append(&self, reading: &Reading) -> Result<(), StoreError> {
        let mut rows = self.rows.write().await;
        if rows.iter().any(|r| r.id == reading.id) {
            return Err(StoreError::Duplicate(reading.id.clone()));
        }
        rows.push(reading.clone());
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Reading>, StoreError> {
        Ok(self.rows.read().await.clone())
    }

    async fn list_for_building(&self, building: &str) -> Result<Vec<Reading>, StoreError> {
        let rows = self.rows.read().await;
        Ok(rows.iter().filter(|r| r.building == building).cloned().collect())
    }

    async fn list_for_building_between(
        &self,
        building: &str,
        start: OffsetDateTime,
        end: OffsetDateTime,
    ) -> Result<Vec<Reading>, StoreError> {
        let rows = self.rows.read().await;
        Ok(rows
            .iter()
            .filter(|r| r.building == building && r.created_at >= start && r.created_at < end)
            .cloned()
            .collect())
    }

    async fn page(&self, order: ReadingOrder, page: u32, size: u32) -> Result<Vec<Reading>, StoreError> {
        let mut rows = self.rows.read().await.clone();
        rows.sort_by(|a, b| compare(a, b, order));

        let skip = (page as usize).saturating_mul(size as usize);
        Ok(rows.into_iter().skip(skip).take(size as usize).collect())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Reading>, StoreError> {
        Ok(self.rows.read().await.iter().find(|r| r.id == id).cloned())
    }
}
