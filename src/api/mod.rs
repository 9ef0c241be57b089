//! HTTP API for the score service
//!
//! Routes (mounted under `/api` by the binary):
//! - `POST /auth` - sign in with an Openplanet token
//! - `POST /scores` - submit a run (bearer)
//! - `GET /leaderboard`, `GET /worldrecords`, `GET /activity` - public reads
//! - `PUT|POST /metrics`, `POST /metrics/inc` - usage counters (bearer)
//!
//! Every route answers unsupported methods with a JSON 405 and unknown paths
//! get a JSON 404.

pub mod activity;
pub mod auth;
pub mod extractors;
pub mod leaderboard;
pub mod metrics;
pub mod middleware;
pub mod scores;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{MethodRouter, get, post, put},
};
use std::sync::Arc;

use crate::config::{CacheConfig, ServiceConfig};
use crate::database::Datastore;
use crate::error::ApiError;
use crate::metrics::MetricsRecorder;
use crate::ranking::Ranker;
use crate::ratelimit::IpRateLimiter;
use crate::scores::ScorePipeline;
use crate::session::{IdentityVerifier, SessionAuthenticator};

pub use extractors::{AuthenticatedPlayer, ClientIp, QueryParams, RawBody};
pub use middleware::{
    SecurityMiddlewareConfig, SecurityState, body_size_middleware, cache_control, client_ip,
    logging_middleware, sanitize_for_log,
};

/// Services shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionAuthenticator>,
    pub identity: Arc<dyn IdentityVerifier>,
    pub scores: Arc<ScorePipeline>,
    pub ranker: Arc<Ranker>,
    pub metrics: Arc<MetricsRecorder>,
    /// Throttles `POST /auth` per client IP
    pub auth_limiter: Arc<IpRateLimiter>,
    pub cache: CacheConfig,
    pub max_request_size: usize,
}

impl AppState {
    pub fn new(
        config: &ServiceConfig,
        store: Arc<dyn Datastore>,
        identity: Arc<dyn IdentityVerifier>,
    ) -> Self {
        Self {
            sessions: Arc::new(SessionAuthenticator::new(
                store.clone(),
                config.auth.token_expiry,
            )),
            identity,
            scores: Arc::new(ScorePipeline::new(store.clone(), config.scores.cooldown)),
            ranker: Arc::new(Ranker::new(store.clone())),
            metrics: Arc::new(MetricsRecorder::new(
                store,
                config.metrics.allowed.iter().cloned(),
            )),
            auth_limiter: Arc::new(IpRateLimiter::per_minute(config.auth.rate_limit_per_minute)),
            cache: config.cache.clone(),
            max_request_size: config.security.max_request_size,
        }
    }
}

pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

pub async fn not_found() -> ApiError {
    ApiError::NotFound
}

fn only(route: MethodRouter<AppState>) -> MethodRouter<AppState> {
    route.fallback(method_not_allowed)
}

pub fn create_router(state: AppState) -> Router {
    let body_limit = DefaultBodyLimit::max(state.max_request_size);

    Router::new()
        .route("/auth", only(post(auth::sign_in)))
        .route("/scores", only(post(scores::submit_score)))
        .route("/leaderboard", only(get(leaderboard::get_leaderboard)))
        .route("/worldrecords", only(get(leaderboard::get_world_records)))
        .route("/activity", only(get(activity::get_activity)))
        .route(
            "/metrics",
            only(put(metrics::record_metric).post(metrics::record_metric)),
        )
        .route("/metrics/inc", only(post(metrics::increment_metric)))
        .fallback(not_found)
        .layer(body_limit)
        .with_state(state)
}

/// Full application: the API under `/api`, a health probe and the request
/// middleware
pub fn create_app(state: AppState, security: SecurityState) -> Router {
    Router::new()
        .nest("/api", create_router(state))
        .route("/health", get(|| async { "OK" }))
        .fallback(not_found)
        .layer(axum::middleware::from_fn_with_state(
            security.clone(),
            body_size_middleware,
        ))
        .layer(axum::middleware::from_fn_with_state(
            security,
            logging_middleware,
        ))
}
