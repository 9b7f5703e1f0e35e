use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::{HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use energy_client::domain::Reading;

use super::{ApiError, ErrorResponse, HistoryQuery, ReadingService, TenantResolver};

#[derive(Clone)]
pub struct AppState {
    pub service: ReadingService,
    pub resolver: Arc<dyn TenantResolver>,
}

impl AppState {
    fn tenant(&self, headers: &HeaderMap) -> Result<String, ApiError> {
        self.resolver.resolve(headers).ok_or(ApiError::Unauthorized)
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/energy", get(latest))
        .route("/api/v1/energy/history", get(history))
        .route("/api/v1/energy/:id", get(by_id))
        .with_state(state)
}

fn list_response(readings: Vec<Reading>) -> Response {
    if readings.is_empty() {
        StatusCode::NO_CONTENT.into_response()
    } else {
        Json(readings).into_response()
    }
}

async fn latest(State(state): State<AppState>, uri: Uri, headers: HeaderMap) -> Result<Response, ErrorResponse> {
    let tenant = state.tenant(&headers).map_err(|e| e.at(&uri))?;
    let readings = state.service.get_latest(&tenant).await.map_err(|e| e.at(&uri))?;
    Ok(list_response(readings))
}

async fn history(
    State(state): State<AppState>,
    uri: Uri,
    headers: HeaderMap,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> Result<Response, ErrorResponse> {
    state.tenant(&headers).map_err(|e| e.at(&uri))?;
    let Query(query) = query.map_err(|rejection| ApiError::BadRequest(rejection.body_text()).at(&uri))?;
    let readings = state.service.get_history(&query).await.map_err(|e| e.at(&uri))?;
    Ok(list_response(readings))
}

async fn by_id(
    State(state): State<AppState>,
    uri: Uri,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Reading>, ErrorResponse> {
    state.tenant(&headers).map_err(|e| e.at(&uri))?;
    let reading = state.service.get_by_id(&id).await.map_err(|e| e.at(&uri))?;
    Ok(Json(reading))
}
