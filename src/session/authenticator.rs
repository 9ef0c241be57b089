//! Bearer-token sessions
//!
//! Sign-in upserts the player and stores a fresh token digest with an
//! absolute expiry. Authentication parses `Authorization: Bearer <token>`,
//! hashes the token and looks the digest up.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use super::identity::Identity;
use super::token::{generate_session_token, hash_token};
use crate::database::Datastore;
use crate::error::{ApiError, StoreError};
use crate::models::PlayerId;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("missing Authorization header")]
    MissingHeader,

    #[error("invalid Authorization header format")]
    MalformedHeader,

    #[error("empty bearer token")]
    EmptyToken,

    #[error("invalid session token")]
    UnknownToken,

    #[error("session token has expired")]
    Expired,

    #[error("session store unavailable: {0}")]
    Store(StoreError),
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Store(cause) => ApiError::unavailable(cause),
            other => ApiError::Unauthorized(format!("unauthorized: {other}")),
        }
    }
}

/// Returned to the client once; only the digest is kept server-side
#[derive(Debug, Clone, Serialize)]
pub struct IssuedSession {
    pub session_token: String,
    pub expires_at: DateTime<Utc>,
}

/// Extract the token from an `Authorization` header value
pub fn parse_bearer(header: Option<&str>) -> Result<&str, SessionError> {
    let value = header.ok_or(SessionError::MissingHeader)?;
    let token = value
        .strip_prefix("Bearer ")
        .ok_or(SessionError::MalformedHeader)?;
    if token.is_empty() {
        return Err(SessionError::EmptyToken);
    }
    Ok(token)
}

pub struct SessionAuthenticator {
    store: Arc<dyn Datastore>,
    ttl: chrono::Duration,
}

impl SessionAuthenticator {
    pub fn new(store: Arc<dyn Datastore>, ttl: Duration) -> Self {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        Self { store, ttl }
    }

    /// Upsert the verified player and issue a session for them
    pub async fn sign_in(&self, identity: &Identity) -> Result<IssuedSession, StoreError> {
        let player_id = self
            .store
            .upsert_player(&identity.account_id, &identity.display_name)
            .await?;
        let issued = self.issue(player_id).await?;

        info!(player_id = %player_id, expires_at = %issued.expires_at, "Session issued");
        Ok(issued)
    }

    /// Create a session for an existing player. Earlier sessions are revoked.
    pub async fn issue(&self, player_id: PlayerId) -> Result<IssuedSession, StoreError> {
        let (session_token, digest) = generate_session_token();
        let expires_at = Utc::now()
            .checked_add_signed(self.ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        self.store
            .create_session(player_id, &digest, expires_at)
            .await?;

        Ok(IssuedSession {
            session_token,
            expires_at,
        })
    }

    /// Resolve the player behind an `Authorization` header value
    pub async fn authenticate(&self, header: Option<&str>) -> Result<PlayerId, SessionError> {
        let token = parse_bearer(header)?;
        self.authenticate_token(token).await
    }

    pub async fn authenticate_token(&self, token: &str) -> Result<PlayerId, SessionError> {
        let session = match self.store.find_session_by_token_hash(&hash_token(token)).await {
            Ok(session) => session,
            Err(StoreError::NotFound) => return Err(SessionError::UnknownToken),
            Err(other) => return Err(SessionError::Store(other)),
        };

        if session.is_expired_at(Utc::now()) {
            debug!(player_id = %session.player_id, "Rejected expired session");
            return Err(SessionError::Expired);
        }

        Ok(session.player_id)
    }
}
