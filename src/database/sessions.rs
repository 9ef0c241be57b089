//! Session Repository - token digests and expiry

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use std::time::Duration;

use super::store::with_timeout;
use crate::error::StoreError;
use crate::models::{PlayerId, Session};

pub struct SessionRepository {
    pool: PgPool,
    timeout: Duration,
}

impl SessionRepository {
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    /// Replace the player's sessions with a single new one
    pub async fn create(
        &self,
        player_id: PlayerId,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        with_timeout(self.timeout, async {
            let mut tx = self.pool.begin().await?;

            sqlx::query("DELETE FROM sessions WHERE player_id = $1")
                .bind(player_id.0)
                .execute(&mut *tx)
                .await?;

            sqlx::query(
                r#"
                INSERT INTO sessions (player_id, token_hash, expires_at)
                VALUES ($1, $2, $3)
                "#,
            )
            .bind(player_id.0)
            .bind(token_hash)
            .bind(expires_at)
            .execute(&mut *tx)
            .await?;

            tx.commit().await?;
            Ok::<_, StoreError>(())
        })
        .await
    }

    pub async fn find_by_token_hash(&self, token_hash: &str) -> Result<Session, StoreError> {
        let row = with_timeout(self.timeout, async {
            Ok::<_, StoreError>(sqlx::query(
                r#"
                SELECT id, player_id, token_hash, expires_at
                FROM sessions
                WHERE token_hash = $1
                LIMIT 1
                "#,
            )
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .await?)
        })
        .await?
        .ok_or(StoreError::NotFound)?;

        Ok(Session {
            id: row.try_get("id")?,
            player_id: PlayerId(row.try_get("player_id")?),
            token_hash: row.try_get("token_hash")?,
            expires_at: row.try_get("expires_at")?,
        })
    }
}
