//! `PUT /metrics` and `POST /metrics/inc`

use axum::{extract::State, http::StatusCode};
use serde::Deserialize;

use super::AppState;
use super::extractors::{AuthenticatedPlayer, QueryParams, RawBody};
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct MetricRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub increment: i64,
}

#[derive(Debug, Deserialize)]
pub struct IncrementQuery {
    #[serde(default)]
    pub name: String,
}

pub async fn record_metric(
    State(state): State<AppState>,
    AuthenticatedPlayer(_): AuthenticatedPlayer,
    RawBody(body): RawBody,
) -> Result<StatusCode, ApiError> {
    let request: MetricRequest = serde_json::from_slice(&body)
        .map_err(|_| ApiError::Validation("invalid request body".to_string()))?;
    if request.name.is_empty() {
        return Err(ApiError::Validation("name is required".to_string()));
    }

    state.metrics.record(&request.name, request.increment).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Query-string variant for clients that cannot send a body
pub async fn increment_metric(
    State(state): State<AppState>,
    AuthenticatedPlayer(_): AuthenticatedPlayer,
    QueryParams(query): QueryParams<IncrementQuery>,
) -> Result<StatusCode, ApiError> {
    state.metrics.record(&query.name, 1).await?;
    Ok(StatusCode::NO_CONTENT)
}
