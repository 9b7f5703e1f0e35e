//! Recurring sync of every configured source into the store and cache.
//!
//! Each tick spawns one task per source and returns without waiting for
//! them. Ticks therefore overlap when a source is slower than the interval;
//! there is no mutual exclusion between ticks. Overlapping runs of the same
//! source are safe: dedup skips stored ids and a racing insert of the same id
//! surfaces as a per-reading persistence failure.

use std::{sync::Arc, time::Duration};

use energy_client::domain::Reading;
use serde::Deserialize;
use time::{OffsetDateTime, Time};
use tokio::{task::JoinHandle, time::MissedTickBehavior};

use crate::{
    cache::{self, CacheGateway},
    pipeline::{ReadingSource, SyncError},
    reconcile::Reconciler,
    store::ReadingStore,
};

/// Which readings of a building the cache entry holds after a tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheWindow {
    /// Readings ingested during the current UTC day.
    #[default]
    Today,
    /// Every reading of the building.
    All,
}

impl CacheWindow {
    async fn readings(
        self,
        store: &dyn ReadingStore,
        building: &str,
        now: OffsetDateTime,
    ) -> Result<Vec<Reading>, SyncError> {
        let res = match self {
            Self::Today => {
                let start = now.replace_time(Time::MIDNIGHT);
                let end = start + time::Duration::days(1);
                store.list_for_building_between(building, start, end).await
            }
            Self::All => store.list_for_building(building).await,
        };
        res.map_err(|e| SyncError::Store(e.to_string()))
    }
}

/// A source together with the tenant key its cache entry is published under.
#[derive(Clone)]
pub struct SourceBinding {
    pub source: Arc<dyn ReadingSource>,
    pub cache_key: String,
}

/// What one source's run achieved during a tick.
#[derive(Debug)]
pub struct SourceSummary {
    pub building: String,
    pub fetched: usize,
    pub persisted: usize,
    pub failed: usize,
    /// Size of the list published to the cache.
    pub cached: usize,
}

struct Shared {
    store: Arc<dyn ReadingStore>,
    cache: Arc<dyn CacheGateway>,
    reconciler: Reconciler,
    window: CacheWindow,
}

impl Shared {
    async fn sync_source(&self, binding: &SourceBinding) -> Result<SourceSummary, SyncError> {
        let source = binding.source.as_ref();
        let building = source.building();

        let report = self.reconciler.reconcile(source).await?;

        let visible = self
            .window
            .readings(self.store.as_ref(), building, OffsetDateTime::now_utc())
            .await?;

        cache::publish(self.cache.as_ref(), &binding.cache_key, &visible)
            .await
            .map_err(|e| {
                metrics::counter!("sync_cache_write_errors_total").increment(1);
                SyncError::CacheWrite {
                    key: binding.cache_key.clone(),
                    reason: e.to_string(),
                }
            })?;

        Ok(SourceSummary {
            building: building.to_string(),
            fetched: report.fetched,
            persisted: report.persisted.len(),
            failed: report.failures.len(),
            cached: visible.len(),
        })
    }
}

pub struct SyncScheduler {
    shared: Arc<Shared>,
    sources: Vec<SourceBinding>,
    interval: Duration,
}

impl SyncScheduler {
    pub fn new(
        store: Arc<dyn ReadingStore>,
        cache: Arc<dyn CacheGateway>,
        sources: Vec<SourceBinding>,
        window: CacheWindow,
        interval: Duration,
    ) -> Self {
        let shared = Shared {
            reconciler: Reconciler::new(store.clone()),
            store,
            cache,
            window,
        };
        Self {
            shared: Arc::new(shared),
            sources,
            interval,
        }
    }

    /// Start one task per source and hand back their handles. Dropping the
    /// handles detaches the tasks; they still run to completion.
    pub fn tick(&self) -> Vec<JoinHandle<Result<SourceSummary, SyncError>>> {
        metrics::counter!("sync_ticks_total").increment(1);

        self.sources
            .iter()
            .cloned()
            .map(|binding| {
                let shared = self.shared.clone();
                tokio::spawn(async move {
                    let building = binding.source.building().to_string();
                    let started = std::time::Instant::now();
                    let res = shared.sync_source(&binding).await;
                    metrics::histogram!("sync_source_duration_seconds").record(started.elapsed().as_secs_f64());

                    match &res {
                        Ok(summary) => tracing::info!(
                            building = %building,
                            fetched = summary.fetched,
                            persisted = summary.persisted,
                            failed = summary.failed,
                            cached = summary.cached,
                            "energy data updated and cached"
                        ),
                        Err(e @ SyncError::SourceUnavailable { .. }) => {
                            tracing::warn!(building = %building, error = %e, "skipping source for this cycle")
                        }
                        Err(e) => tracing::error!(building = %building, error = %e, "error during energy data update"),
                    }
                    res
                })
            })
            .collect()
    }

    /// Run a single tick and wait for every source to finish.
    pub async fn run_once(&self) -> Vec<Result<SourceSummary, SyncError>> {
        let handles = self.tick();
        let joined = futures::future::join_all(handles).await;
        joined
            .into_iter()
            .map(|res| res.unwrap_or_else(|e| Err(SyncError::Task(e.to_string()))))
            .collect()
    }

    /// Tick forever at the configured interval. The first tick fires at once.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            tracing::info!(sources = self.sources.len(), "refreshing energy data");
            drop(self.tick());
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}
