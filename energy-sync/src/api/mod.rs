//! Read side: latest readings from the cache, history and lookups from the
//! store.

use std::sync::Arc;

use axum::{
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use energy_client::{
    db::{ReadingOrder, SortField},
    domain::Reading,
};
use serde::{Deserialize, Serialize};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use crate::{
    cache::{self, CacheGateway},
    store::ReadingStore,
};

pub mod auth;
pub mod routes;

pub use auth::{StaticTokenResolver, TenantResolver};
pub use routes::{router, AppState};

pub const MAX_PAGE_SIZE: u32 = 500;

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("energy reading {0} not found")]
    NotFound(String),
    #[error("missing or unrecognised credentials")]
    Unauthorized,
    #[error("{0}")]
    BadRequest(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// An `ApiError` answered for one request. `uri` is echoed back as the
/// body's `details`.
#[derive(Debug)]
pub struct ErrorResponse {
    pub error: ApiError,
    pub uri: String,
}

impl ApiError {
    pub fn at(self, uri: &Uri) -> ErrorResponse {
        ErrorResponse {
            error: self,
            uri: uri.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    message: String,
    timestamp: String,
    details: String,
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        let status = self.error.status();
        if let ApiError::Internal(reason) = &self.error {
            tracing::error!(error = %reason, uri = %self.uri, "read request failed");
        }
        let body = ErrorBody {
            message: self.error.to_string(),
            timestamp: OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default(),
            details: self.uri,
        };
        (status, Json(body)).into_response()
    }
}

fn default_page_size() -> u32 {
    30
}

fn default_direction() -> String {
    "asc".to_string()
}

fn default_order_by() -> String {
    "createdAt".to_string()
}

/// Paging parameters for the history endpoint. `page` is zero-based.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryQuery {
    #[serde(default)]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub size: u32,
    #[serde(default = "default_direction")]
    pub direction: String,
    #[serde(default = "default_order_by", rename = "orderBy")]
    pub order_by: String,
}

impl Default for HistoryQuery {
    fn default() -> Self {
        Self {
            page: 0,
            size: default_page_size(),
            direction: default_direction(),
            order_by: default_order_by(),
        }
    }
}

impl HistoryQuery {
    /// Anything other than `asc` (any case) sorts descending.
    pub fn order(&self) -> Result<ReadingOrder, ApiError> {
        let field = SortField::parse(&self.order_by)
            .ok_or_else(|| ApiError::BadRequest(format!("cannot order by '{}'", self.order_by)))?;
        Ok(ReadingOrder {
            field,
            descending: !self.direction.eq_ignore_ascii_case("asc"),
        })
    }
}

#[derive(Clone)]
pub struct ReadingService {
    store: Arc<dyn ReadingStore>,
    cache: Arc<dyn CacheGateway>,
}

impl ReadingService {
    pub fn new(store: Arc<dyn ReadingStore>, cache: Arc<dyn CacheGateway>) -> Self {
        Self { store, cache }
    }

    /// The list last published for `tenant_key`; empty when nothing was
    /// published yet.
    pub async fn get_latest(&self, tenant_key: &str) -> Result<Vec<Reading>, ApiError> {
        cache::latest(self.cache.as_ref(), tenant_key)
            .await
            .map_err(|e| ApiError::Internal(e.to_string()))
    }

    pub async fn get_history(&self, query: &HistoryQuery) -> Result<Vec<Reading>, ApiError> {
        if query.size == 0 || query.size > MAX_PAGE_SIZE {
            return Err(ApiError::BadRequest(format!("size must be between 1 and {MAX_PAGE_SIZE}")));
        }
        let order = query.order()?;
        self.store
            .page(order, query.page, query.size)
            .await
            .map_err(|e| ApiError::Internal(e.to_string()))
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Reading, ApiError> {
        self.store
            .find_by_id(id)
            .await
            .map_err(|e| ApiError::Internal(e.to_string()))?
            .ok_or_else(|| ApiError::NotFound(id.to_string()))
    }
}
