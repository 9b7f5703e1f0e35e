//! Diff a source's fresh result set against the store and persist only what
//! is new.

use std::{collections::HashSet, sync::Arc, time::SystemTime};

use energy_client::domain::RemoteReading;
use futures::TryStreamExt;
use time::OffsetDateTime;

use crate::{
    pipeline::{Envelope, ReadingSource, SyncError},
    store::ReadingStore,
};

/// Character appended to raw upstream ids to keep buildings apart: the last
/// character of the building name, taken as written.
pub fn disambiguator(building: &str) -> Option<char> {
    building.chars().last()
}

/// Composite identity of an upstream reading: raw id followed by the
/// building's disambiguator (`481` from "Building A" becomes `481A`).
pub fn composite_id(raw_id: i64, building: &str) -> String {
    match disambiguator(building) {
        Some(c) => format!("{raw_id}{c}"),
        None => raw_id.to_string(),
    }
}

#[derive(Debug, Default)]
pub struct ReconcileReport {
    pub fetched: usize,
    /// Composite ids persisted by this run, in the order received.
    pub persisted: Vec<String>,
    /// One `SyncError::Persistence` per reading that failed to save.
    pub failures: Vec<SyncError>,
}

pub struct Reconciler {
    store: Arc<dyn ReadingStore>,
}

impl Reconciler {
    pub fn new(store: Arc<dyn ReadingStore>) -> Self {
        Self { store }
    }

    /// Persist every reading from `source` whose composite id is not stored yet.
    ///
    /// The comparison set is the whole store, not just this building. A failed
    /// fetch aborts before anything is written; a failed insert is recorded
    /// against that reading and the rest carry on.
    pub async fn reconcile(&self, source: &dyn ReadingSource) -> Result<ReconcileReport, SyncError> {
        let building = source.building();
        tracing::info!(building, "updating energy data in database");

        let mut known: HashSet<String> = self
            .store
            .list_all()
            .await
            .map_err(|e| SyncError::Store(e.to_string()))?
            .into_iter()
            .map(|r| r.id)
            .collect();

        let fetched: Vec<Envelope<RemoteReading>> = source.stream().await.try_collect().await?;

        let mut report = ReconcileReport {
            fetched: fetched.len(),
            ..ReconcileReport::default()
        };

        for env in fetched {
            let id = composite_id(env.payload.id, building);
            // `insert` also drops repeats within the same batch.
            if !known.insert(id.clone()) {
                continue;
            }

            let reading = env.payload.into_reading(id, building, OffsetDateTime::now_utc());
            match self.store.append(&reading).await {
                Ok(()) => {
                    tracing::info!(reading_id = %reading.id, building, "saved new energy reading");
                    metrics::counter!("sync_readings_persisted_total").increment(1);
                    if let Ok(dur) = SystemTime::now().duration_since(env.received_at) {
                        metrics::histogram!("sync_ingest_latency_seconds").record(dur.as_secs_f64());
                    }
                    report.persisted.push(reading.id);
                }
                Err(e) => {
                    tracing::error!(reading_id = %reading.id, building, error = %e, "failed to persist energy reading");
                    metrics::counter!("sync_persist_errors_total").increment(1);
                    report.failures.push(SyncError::Persistence {
                        id: reading.id,
                        reason: e.to_string(),
                    });
                }
            }
        }

        Ok(report)
    }
}
