//! `GET /activity` - completed maps per day for the last 30 days

use axum::{Json, extract::State, response::Response};
use serde::Serialize;

use super::AppState;
use super::middleware::cached;
use crate::error::ApiError;

#[derive(Debug, Serialize)]
pub struct ActivityResponse {
    /// Oldest day first
    pub medals: Vec<i64>,
}

pub async fn get_activity(State(state): State<AppState>) -> Result<Response, ApiError> {
    let medals = state.ranker.daily_activity().await?;
    Ok(cached(state.cache.activity_ttl, Json(ActivityResponse { medals })))
}
