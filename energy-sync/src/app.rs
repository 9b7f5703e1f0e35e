//! Wiring from a validated `AppConfig` to running components.

use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;

use crate::{
    api::{AppState, ReadingService, StaticTokenResolver},
    cache::{CacheGateway, MemoryCache, PgCache},
    config::{AppConfig, BackendKind},
    scheduler::{SourceBinding, SyncScheduler},
    sources::MonitoringApiSource,
    store::{MemoryReadingStore, PgReadingStore, ReadingStore},
};

pub struct App {
    pub scheduler: SyncScheduler,
    pub state: AppState,
}

impl App {
    pub async fn build(cfg: &AppConfig) -> Result<Self> {
        let needs_db = cfg.store.kind == BackendKind::Postgres || cfg.cache.kind == BackendKind::Postgres;

        // Connect only when a backend lives in Postgres.
        let pool = if needs_db {
            let db = cfg
                .database
                .as_ref()
                .context("postgres backend selected but [database] is missing")?;
            let pool = PgPoolOptions::new()
                .max_connections(db.max_connections)
                .connect(&db.uri)
                .await
                .context("failed to connect to database")?;
            Some(pool)
        } else {
            None
        };

        let store: Arc<dyn ReadingStore> = match (cfg.store.kind, &pool) {
            (BackendKind::Postgres, Some(pool)) => Arc::new(PgReadingStore::new(pool.clone())),
            _ => Arc::new(MemoryReadingStore::new()),
        };
        let cache: Arc<dyn CacheGateway> = match (cfg.cache.kind, &pool) {
            (BackendKind::Postgres, Some(pool)) => Arc::new(PgCache::new(pool.clone())),
            _ => Arc::new(MemoryCache::new()),
        };

        Self::assemble(cfg, store, cache)
    }

    /// Build with explicit backends, bypassing the `store`/`cache` settings.
    pub fn assemble(cfg: &AppConfig, store: Arc<dyn ReadingStore>, cache: Arc<dyn CacheGateway>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(cfg.external_api.request_timeout())
            .build()
            .context("failed to build http client")?;

        let sources = source_bindings(cfg, &http);
        tracing::info!(
            sources = sources.len(),
            base_url = %cfg.external_api.base_url(),
            window = ?cfg.scheduler.cache_window,
            "configured energy sources"
        );

        let scheduler = SyncScheduler::new(
            store.clone(),
            cache.clone(),
            sources,
            cfg.scheduler.cache_window,
            cfg.scheduler.interval(),
        );

        let tokens = cfg
            .api
            .iter()
            .flat_map(|api| api.tokens.iter())
            .map(|t| (t.token.clone(), t.tenant_key.clone()));
        let state = AppState {
            service: ReadingService::new(store, cache),
            resolver: Arc::new(StaticTokenResolver::new(tokens)),
        };

        Ok(Self { scheduler, state })
    }
}

pub fn source_bindings(cfg: &AppConfig, http: &reqwest::Client) -> Vec<SourceBinding> {
    let base_url = cfg.external_api.base_url();
    cfg.sources
        .iter()
        .map(|src| SourceBinding {
            source: Arc::new(MonitoringApiSource::new(
                http.clone(),
                &base_url,
                &src.endpoint,
                src.building.clone(),
            )),
            cache_key: src.cache_key.clone(),
        })
        .collect()
}
