use serde::Deserialize;
use std::{collections::HashMap, fs, time::Duration};

use crate::{reconcile::disambiguator, scheduler::CacheWindow};

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io { path: String, source: std::io::Error },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("at least one [[sources]] entry is required")]
    NoSources,
    #[error("source building name must not be empty")]
    EmptyBuilding,
    #[error("cache key '{0}' is used by more than one source")]
    DuplicateCacheKey(String),
    #[error("buildings '{first}' and '{second}' both end in '{ch}', their reading ids would collide")]
    AmbiguousBuildings { first: String, second: String, ch: char },
    #[error("scheduler.interval_ms must be greater than zero")]
    ZeroInterval,
    #[error("a [database] section is required when store or cache kind is \"postgres\"")]
    MissingDatabase,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub uri: String,
    pub max_connections: u32,
}

fn default_scheme() -> String {
    "http".to_string()
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExternalApiConfig {
    #[serde(default = "default_scheme")]
    pub scheme: String,
    pub host: String,
    pub port: u16,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl ExternalApiConfig {
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn default_interval_ms() -> u64 {
    300_000
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default)]
    pub cache_window: CacheWindow,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            cache_window: CacheWindow::default(),
        }
    }
}

impl SchedulerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    pub kind: BackendKind,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::Postgres,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    pub kind: BackendKind,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::Memory,
        }
    }
}

/// One building's monitoring endpoint and the tenant key its cache entry is
/// published under.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub building: String,
    pub endpoint: String,
    pub cache_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenConfig {
    pub token: String,
    pub tenant_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub bind_addr: String,
    #[serde(default)]
    pub tokens: Vec<TokenConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database: Option<DatabaseConfig>,
    pub external_api: ExternalApiConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
    pub api: Option<ApiConfig>,
    pub metrics: Option<MetricsConfig>,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        use std::env;

        let path = env::var("ENERGY_SYNC_CONFIG").unwrap_or_else(|_| "energy-sync.toml".to_string());
        let contents = fs::read_to_string(&path).map_err(|source| ConfigError::Io { path, source })?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let cfg: AppConfig = toml::from_str(contents)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sources.is_empty() {
            return Err(ConfigError::NoSources);
        }
        if self.scheduler.interval_ms == 0 {
            return Err(ConfigError::ZeroInterval);
        }
        let needs_db = self.store.kind == BackendKind::Postgres || self.cache.kind == BackendKind::Postgres;
        if needs_db && self.database.is_none() {
            return Err(ConfigError::MissingDatabase);
        }

        let mut keys: HashMap<&str, &str> = HashMap::new();
        let mut suffixes: HashMap<char, &str> = HashMap::new();
        for src in &self.sources {
            let ch = disambiguator(&src.building).ok_or(ConfigError::EmptyBuilding)?;

            if keys.insert(&src.cache_key, &src.building).is_some() {
                return Err(ConfigError::DuplicateCacheKey(src.cache_key.clone()));
            }
            if let Some(first) = suffixes.insert(ch, &src.building) {
                return Err(ConfigError::AmbiguousBuildings {
                    first: first.to_string(),
                    second: src.building.clone(),
                    ch,
                });
            }
        }

        Ok(())
    }
}
