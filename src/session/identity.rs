//! Identity verification against Openplanet
//!
//! The plugin obtains a short-lived token from Openplanet; we exchange it
//! (together with the plugin secret) for the account id and display name.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::IdentityConfig;
use crate::error::ApiError;

/// A verified Openplanet account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub account_id: String,
    /// Openplanet may omit it for accounts without a name
    #[serde(default)]
    pub display_name: String,
}

#[derive(Debug, Error)]
pub enum IdentityError {
    /// The provider looked at the token and said no
    #[error("token rejected: {0}")]
    Rejected(String),

    /// The provider could not be reached or answered nonsense
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

impl From<IdentityError> for ApiError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::Rejected(reason) => {
                warn!(reason = %reason, "Openplanet token rejected");
                ApiError::Unauthorized("invalid openplanet token".to_string())
            }
            IdentityError::Unavailable(cause) => ApiError::unavailable(cause),
        }
    }
}

#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Identity, IdentityError>;
}

#[derive(Serialize)]
struct ValidateRequest<'a> {
    token: &'a str,
    secret: &'a str,
}

/// Verifier backed by the Openplanet validation endpoint
pub struct OpenplanetVerifier {
    client: Client,
    auth_url: Url,
    secret: String,
    max_response_size: usize,
}

impl OpenplanetVerifier {
    pub fn new(config: &IdentityConfig) -> Result<Self> {
        let auth_url = validate_auth_url(&config.auth_url)?;

        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("rmpc-server/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create Openplanet HTTP client")?;

        info!(url = %auth_url, timeout_ms = config.timeout.as_millis() as u64, "Openplanet verifier ready");

        Ok(Self {
            client,
            auth_url,
            secret: config.plugin_secret.clone(),
            max_response_size: config.max_response_size,
        })
    }

    async fn read_limited(&self, mut response: reqwest::Response) -> Result<Vec<u8>, IdentityError> {
        if let Some(length) = response.content_length()
            && length > self.max_response_size as u64
        {
            return Err(IdentityError::Unavailable(format!(
                "response too large: {length} bytes"
            )));
        }

        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| IdentityError::Unavailable(format!("failed to read response: {e}")))?
        {
            if body.len() + chunk.len() > self.max_response_size {
                return Err(IdentityError::Unavailable(format!(
                    "response exceeds {} bytes",
                    self.max_response_size
                )));
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }
}

#[async_trait]
impl IdentityVerifier for OpenplanetVerifier {
    async fn verify(&self, token: &str) -> Result<Identity, IdentityError> {
        let response = self
            .client
            .post(self.auth_url.clone())
            .json(&ValidateRequest {
                token,
                secret: &self.secret,
            })
            .send()
            .await
            .map_err(|e| IdentityError::Unavailable(format!("failed to contact Openplanet: {e}")))?;

        let status = response.status();
        let body = self.read_limited(response).await?;

        if status != StatusCode::OK {
            let detail = String::from_utf8_lossy(&body);
            return Err(if status.is_client_error() {
                IdentityError::Rejected(format!("status {}: {}", status.as_u16(), detail))
            } else {
                IdentityError::Unavailable(format!("status {}: {}", status.as_u16(), detail))
            });
        }

        parse_identity(&body)
    }
}

/// Decode a validation response body
pub fn parse_identity(body: &[u8]) -> Result<Identity, IdentityError> {
    let identity: Identity = serde_json::from_slice(body)
        .map_err(|e| IdentityError::Unavailable(format!("malformed Openplanet response: {e}")))?;

    if identity.account_id.is_empty() {
        return Err(IdentityError::Rejected(
            "Openplanet returned empty account_id".to_string(),
        ));
    }
    Ok(identity)
}

/// Require HTTPS except for loopback hosts used in local development
fn validate_auth_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw).context("Invalid OPENPLANET_AUTH_URL value")?;
    let host = url
        .host_str()
        .ok_or_else(|| anyhow::anyhow!("OPENPLANET_AUTH_URL must have a host: {}", raw))?;

    let loopback = host == "localhost" || host == "127.0.0.1" || host == "[::1]";
    if url.scheme() != "https" {
        if !loopback {
            return Err(anyhow::anyhow!(
                "OPENPLANET_AUTH_URL must use HTTPS: {}",
                raw
            ));
        }
        warn!("Using plain HTTP identity endpoint on loopback host {}", host);
    }
    Ok(url)
}

/// Fixed token -> identity table, for dev mode and tests
pub struct StaticIdentityVerifier {
    identities: HashMap<String, Identity>,
}

impl StaticIdentityVerifier {
    pub fn new() -> Self {
        Self {
            identities: HashMap::new(),
        }
    }

    pub fn with_identity(mut self, token: &str, account_id: &str, display_name: &str) -> Self {
        self.identities.insert(
            token.to_string(),
            Identity {
                account_id: account_id.to_string(),
                display_name: display_name.to_string(),
            },
        );
        self
    }

    /// The canned players served by the dev server
    pub fn dev_players() -> Self {
        Self::new()
            .with_identity("token-alice", "op-alice2-001", "AlicE")
            .with_identity("token-bob", "op-bob2-002", "Boob")
            .with_identity("token-charlie", "op-charlie2-003", "Charlie New")
            .with_identity("token-diana", "op-diana2-004", "Diana The Destroyer")
            .with_identity("token-eve", "op-eve2-005", "Evelyn")
    }
}

impl Default for StaticIdentityVerifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityVerifier for StaticIdentityVerifier {
    async fn verify(&self, token: &str) -> Result<Identity, IdentityError> {
        match self.identities.get(token) {
            Some(identity) => {
                debug!(account_id = %identity.account_id, "Static identity matched");
                Ok(identity.clone())
            }
            None => Err(IdentityError::Rejected("unknown token".to_string())),
        }
    }
}

/// Upper bound on a provider response
pub const DEFAULT_MAX_RESPONSE_SIZE: usize = 64 * 1024;

/// Provider call timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
