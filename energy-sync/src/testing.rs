//! Fixtures and doubles shared by the unit tests.

use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::{Duration, SystemTime},
};

use energy_client::{
    db::ReadingOrder,
    domain::{Channels, Reading, RemoteReading},
};
use time::OffsetDateTime;

use crate::{
    cache::{CacheError, CacheGateway},
    pipeline::{Envelope, ReadingSource, ReadingStream, SyncError},
    store::{MemoryReadingStore, ReadingStore, StoreError},
};

pub fn reading(id: &str, building: &str, created_at: OffsetDateTime) -> Reading {
    Reading {
        id: id.to_string(),
        building: building.to_string(),
        timestamp: created_at,
        channels: Channels {
            voltage_a: Some(220.0),
            ..Channels::default()
        },
        created_at,
    }
}

pub fn remote(id: i64) -> RemoteReading {
    RemoteReading {
        id,
        timestamp: OffsetDateTime::now_utc(),
        channels: Channels {
            active_power_total: Some(id as f64),
            ..Channels::default()
        },
    }
}

/// Source replaying a fixed result set, or failing like an unreachable API.
pub struct StaticSource {
    building: String,
    readings: Vec<RemoteReading>,
    fail: bool,
    delay: Option<Duration>,
    pub fetches: AtomicUsize,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl StaticSource {
    pub fn new(building: &str, ids: impl IntoIterator<Item = i64>) -> Self {
        Self {
            building: building.to_string(),
            readings: ids.into_iter().map(remote).collect(),
            fail: false,
            delay: None,
            fetches: AtomicUsize::new(0),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing(building: &str) -> Self {
        Self {
            fail: true,
            ..Self::new(building, [])
        }
    }

    /// Hold each fetch open for `delay` of (tokio) time.
    pub fn slow(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ReadingSource for StaticSource {
    fn building(&self) -> &str {
        &self.building
    }

    async fn stream(&self) -> ReadingStream {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
        }

        if self.fail {
            let err = SyncError::SourceUnavailable {
                building: self.building.clone(),
                reason: "connection refused".to_string(),
            };
            return Box::pin(futures::stream::iter(vec![Err(err)]));
        }

        let items: Vec<_> = self
            .readings
            .iter()
            .cloned()
            .map(|payload| {
                Ok(Envelope {
                    payload,
                    received_at: SystemTime::now(),
                })
            })
            .collect();
        Box::pin(futures::stream::iter(items))
    }
}

/// Memory store that refuses to append the listed ids.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryReadingStore,
    reject: HashSet<String>,
}

impl FlakyStore {
    pub fn rejecting(ids: &[&str]) -> Self {
        Self {
            inner: MemoryReadingStore::new(),
            reject: ids.iter().map(|id| id.to_string()).collect(),
        }
    }
}

#[async_trait::async_trait]
impl ReadingStore for FlakyStore {
    async fn append(&self, reading: &Reading) -> Result<(), StoreError> {
        if self.reject.contains(&reading.id) {
            return Err(StoreError::Database("connection reset".to_string()));
        }
        self.inner.append(reading).await
    }

    async fn list_all(&self) -> Result<Vec<Reading>, StoreError> {
        self.inner.list_all().await
    }

    async fn list_for_building(&self, building: &str) -> Result<Vec<Reading>, StoreError> {
        self.inner.list_for_building(building).await
    }

    async fn list_for_building_between(
        &self,
        building: &str,
        start: OffsetDateTime,
        end: OffsetDateTime,
    ) -> Result<Vec<Reading>, StoreError> {
        self.inner.list_for_building_between(building, start, end).await
    }

    async fn page(&self, order: ReadingOrder, page: u32, size: u32) -> Result<Vec<Reading>, StoreError> {
        self.inner.page(order, page, size).await
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Reading>, StoreError> {
        self.inner.find_by_id(id).await
    }
}

/// Cache whose writes always fail; remembers the attempted keys.
#[derive(Default)]
pub struct BrokenCache {
    pub attempts: Mutex<Vec<String>>,
}

#[async_trait::async_trait]
impl CacheGateway for BrokenCache {
    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Ok(None)
    }

    async fn set(&self, key: &str, _value: String) -> Result<(), CacheError> {
        if let Ok(mut attempts) = self.attempts.lock() {
            attempts.push(key.to_string());
        }
        Err(CacheError::Backend("READONLY replica".to_string()))
    }
}
