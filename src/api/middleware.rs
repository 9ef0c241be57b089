//! Request middleware for the score API
//!
//! Provides:
//! - Client IP resolution behind a trusted proxy
//! - Request logging with sanitization
//! - Request body size limits
//! - Edge cache headers for read endpoints

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderValue, Extensions, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

use crate::config::ServiceConfig;
use crate::error::ApiError;

/// Settings shared by the middleware functions
#[derive(Debug, Clone)]
pub struct SecurityMiddlewareConfig {
    /// Maximum request body size in bytes
    pub max_request_size: usize,
    /// Enable request logging
    pub log_requests: bool,
    /// Mask client addresses in logs
    pub sanitize_logs: bool,
}

impl Default for SecurityMiddlewareConfig {
    fn default() -> Self {
        Self {
            max_request_size: 1024 * 1024, // 1MB
            log_requests: true,
            sanitize_logs: true,
        }
    }
}

impl From<&ServiceConfig> for SecurityMiddlewareConfig {
    fn from(config: &ServiceConfig) -> Self {
        Self {
            max_request_size: config.security.max_request_size,
            log_requests: config.logging.log_requests,
            sanitize_logs: config.logging.sanitize_logs,
        }
    }
}

/// Shared state for security middleware
#[derive(Debug, Clone)]
pub struct SecurityState {
    pub config: SecurityMiddlewareConfig,
}

impl SecurityState {
    pub fn new(config: SecurityMiddlewareConfig) -> Self {
        Self { config }
    }
}

/// Resolve the client address of a request.
///
/// `X-Real-Ip` wins, then the rightmost `X-Forwarded-For` entry (the one our
/// proxy appended), then the TCP peer.
pub fn client_ip(headers: &HeaderMap, extensions: &Extensions) -> String {
    if let Some(real_ip) = headers.get("x-real-ip")
        && let Ok(ip) = real_ip.to_str()
        && !ip.trim().is_empty()
    {
        return ip.trim().to_string();
    }

    if let Some(forwarded) = headers.get("x-forwarded-for")
        && let Ok(value) = forwarded.to_str()
        && let Some(ip) = value.rsplit(',').map(str::trim).find(|ip| !ip.is_empty())
    {
        return ip.to_string();
    }

    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Sanitize value for logging (mask sensitive data)
pub fn sanitize_for_log(value: &str) -> String {
    if value.len() <= 8 {
        return "*".repeat(value.len());
    }
    match (value.get(..4), value.get(value.len() - 4..)) {
        (Some(head), Some(tail)) => format!("{head}...{tail}"),
        _ => "*".repeat(value.chars().count()),
    }
}

/// `Cache-Control` for a shared cache, or nothing when `ttl` is zero
pub fn cache_control(ttl: Duration) -> Option<HeaderValue> {
    if ttl.is_zero() {
        return None;
    }
    HeaderValue::from_str(&format!(
        "public, s-maxage={}, stale-while-revalidate=60, stale-if-error=3600",
        ttl.as_secs()
    ))
    .ok()
}

/// Attach the edge cache header to a response
pub fn cached(ttl: Duration, body: impl IntoResponse) -> Response {
    let mut response = body.into_response();
    if let Some(value) = cache_control(ttl) {
        response.headers_mut().insert(header::CACHE_CONTROL, value);
    }
    response
}

/// Request logging middleware with sanitization
pub async fn logging_middleware(
    State(state): State<SecurityState>,
    request: Request,
    next: Next,
) -> Response {
    if !state.config.log_requests {
        return next.run(request).await;
    }

    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let ip = client_ip(request.headers(), request.extensions());

    let log_ip = if state.config.sanitize_logs {
        sanitize_for_log(&ip)
    } else {
        ip
    };

    let response = next.run(request).await;
    let duration = start.elapsed();
    let status = response.status();

    if status.is_server_error() {
        error!(
            method = %method,
            path = %path,
            status = status.as_u16(),
            duration_ms = duration.as_millis() as u64,
            client_ip = %log_ip,
            "Request failed"
        );
    } else if status.is_client_error() {
        warn!(
            method = %method,
            path = %path,
            status = status.as_u16(),
            duration_ms = duration.as_millis() as u64,
            client_ip = %log_ip,
            "Client error"
        );
    } else {
        info!(
            method = %method,
            path = %path,
            status = status.as_u16(),
            duration_ms = duration.as_millis() as u64,
            client_ip = %log_ip,
            "Request completed"
        );
    }

    response
}

/// Reject bodies whose declared length exceeds the limit
pub async fn body_size_middleware(
    State(state): State<SecurityState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let declared = request
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());

    if let Some(length) = declared
        && length > state.config.max_request_size
    {
        warn!(
            length,
            max = state.config.max_request_size,
            "Request body too large"
        );
        return Err(ApiError::PayloadTooLarge);
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    fn peer(extensions: &mut Extensions) {
        extensions.insert(ConnectInfo(SocketAddr::new(
            IpAddr::V4(Ipv4Addr::new(10, 0, 0, 9)),
            4000,
        )));
    }

    #[test]
    fn test_client_ip_prefers_real_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static(" 203.0.113.7 "));
        headers.insert("x-forwarded-for", HeaderValue::from_static("1.1.1.1, 2.2.2.2"));
        let mut extensions = Extensions::new();
        peer(&mut extensions);

        assert_eq!(client_ip(&headers, &extensions), "203.0.113.7");
    }

    #[test]
    fn test_client_ip_takes_rightmost_forwarded_entry() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("6.6.6.6, 198.51.100.4"),
        );
        assert_eq!(client_ip(&headers, &Extensions::new()), "198.51.100.4");
    }

    #[test]
    fn test_client_ip_falls_back_to_peer() {
        let mut extensions = Extensions::new();
        peer(&mut extensions);
        assert_eq!(client_ip(&HeaderMap::new(), &extensions), "10.0.0.9");
        assert_eq!(client_ip(&HeaderMap::new(), &Extensions::new()), "unknown");
    }

    #[test]
    fn test_sanitize_for_log() {
        assert_eq!(sanitize_for_log("short"), "*****");
        assert_eq!(sanitize_for_log("abcdefghij"), "abcd...ghij");
        let result = sanitize_for_log("192.168.1.100");
        assert!(result.starts_with("192."));
        assert!(result.ends_with(".100"));
    }

    #[test]
    fn test_cache_control() {
        assert_eq!(
            cache_control(Duration::from_secs(300)).unwrap(),
            "public, s-maxage=300, stale-while-revalidate=60, stale-if-error=3600"
        );
        assert!(cache_control(Duration::ZERO).is_none());
    }
}
