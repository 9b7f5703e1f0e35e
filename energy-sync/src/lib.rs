pub mod api;
pub mod app;
pub mod cache;
pub mod config;
pub mod metrics_server;
pub mod observability;
pub mod paging;
pub mod pipeline;
pub mod reconcile;
pub mod scheduler;
pub mod sources;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use pipeline::{Envelope, ReadingSource, SyncError};
pub use scheduler::{CacheWindow, SyncScheduler};
