use std::{pin::Pin, time::SystemTime};

use energy_client::domain::RemoteReading;
use futures::Stream;

#[derive(Debug, Clone)]
pub struct Envelope<T> {
    pub payload: T,
    pub received_at: SystemTime,
}

/// Failures inside the scheduled pipeline. All of them are scoped to one
/// source (or one reading) and never stop the scheduler.
#[derive(thiserror::Error, Debug)]
pub enum SyncError {
    #[error("external source unavailable for {building}: {reason}")]
    SourceUnavailable { building: String, reason: String },
    #[error("failed to persist reading {id}: {reason}")]
    Persistence { id: String, reason: String },
    #[error("failed to write cache entry {key}: {reason}")]
    CacheWrite { key: String, reason: String },
    #[error("store error: {0}")]
    Store(String),
    #[error("sync task aborted: {0}")]
    Task(String),
}

pub type ReadingStream = Pin<Box<dyn Stream<Item = Result<Envelope<RemoteReading>, SyncError>> + Send>>;

/// One building's upstream feed.
#[async_trait::async_trait]
pub trait ReadingSource: Send + Sync {
    /// Display name of the building; stamped on every reading and used to
    /// derive composite ids.
    fn building(&self) -> &str;

    /// Lazily fetch the current result set. Nothing is requested until the
    /// stream is polled.
    async fn stream(&self) -> ReadingStream;
}
