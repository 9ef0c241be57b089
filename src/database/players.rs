//! Player Repository - PostgreSQL operations for players and bans using sqlx

use sqlx::{PgPool, Row};
use std::time::Duration;
use tracing::debug;

use super::store::with_timeout;
use crate::error::StoreError;
use crate::models::PlayerId;

pub struct PlayerRepository {
    pool: PgPool,
    timeout: Duration,
}

impl PlayerRepository {
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    /// Insert a player or refresh the display name of an existing one
    pub async fn upsert(
        &self,
        openplanet_id: &str,
        display_name: &str,
    ) -> Result<PlayerId, StoreError> {
        let row = with_timeout(self.timeout, async {
            Ok::<_, StoreError>(sqlx::query(
                r#"
                INSERT INTO players (openplanet_id, display_name)
                VALUES ($1, $2)
                ON CONFLICT (openplanet_id) DO UPDATE SET
                    display_name = EXCLUDED.display_name,
                    updated_at = NOW()
                RETURNING id
                "#,
            )
            .bind(openplanet_id)
            .bind(display_name)
            .fetch_one(&self.pool)
            .await?)
        })
        .await?;

        let id = PlayerId(row.try_get("id")?);
        debug!(player_id = %id, "Player upserted");
        Ok(id)
    }

    pub async fn is_banned(&self, player_id: PlayerId) -> Result<bool, StoreError> {
        let row = with_timeout(self.timeout, async {
            Ok::<_, StoreError>(sqlx::query(
                "SELECT EXISTS (SELECT 1 FROM banned_players WHERE player_id = $1) AS banned",
            )
            .bind(player_id.0)
            .fetch_one(&self.pool)
            .await?)
        })
        .await?;

        Ok(row.try_get("banned")?)
    }
}
