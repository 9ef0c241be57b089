//! Leaderboard, world record and activity queries
//!
//! Everything is recomputed from the datastore on each call. HTTP caching
//! happens at the edge via Cache-Control.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::debug;

use super::activity::{ACTIVITY_DAYS, daily_series};
use super::leaderboard::{LEADERBOARD_LIMIT, RankedEntry, assign_dense_ranks};
use super::period::{Month, Period};
use super::world_records::{WorldRecords, best_per_mode};
use crate::database::Datastore;
use crate::error::StoreError;
use crate::models::{GameMode, ScoreFilter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Leaderboard {
    pub entries: Vec<RankedEntry>,
    pub game_mode: Option<GameMode>,
    pub period: Period,
}

pub struct Ranker {
    store: Arc<dyn Datastore>,
}

impl Ranker {
    pub fn new(store: Arc<dyn Datastore>) -> Self {
        Self { store }
    }

    pub async fn leaderboard(
        &self,
        game_mode: Option<GameMode>,
        period: Period,
    ) -> Result<Leaderboard, StoreError> {
        self.leaderboard_at(game_mode, period, Utc::now()).await
    }

    pub async fn leaderboard_at(
        &self,
        game_mode: Option<GameMode>,
        period: Period,
        now: DateTime<Utc>,
    ) -> Result<Leaderboard, StoreError> {
        let empty = Leaderboard {
            entries: Vec::new(),
            game_mode,
            period,
        };

        if let Some(month) = period.month()
            && !month.has_data(now)
        {
            debug!(month = %month, "Leaderboard month outside recorded range");
            return Ok(empty);
        }

        let filter = ScoreFilter {
            game_mode,
            window: period.window(),
        };
        let best = self
            .store
            .best_scores_per_player(filter, LEADERBOARD_LIMIT)
            .await?;

        Ok(Leaderboard {
            entries: assign_dense_ranks(best),
            ..empty
        })
    }

    /// All-time records and records for the calendar month containing now
    pub async fn world_records(&self) -> Result<WorldRecords, StoreError> {
        self.world_records_at(Utc::now()).await
    }

    pub async fn world_records_at(&self, now: DateTime<Utc>) -> Result<WorldRecords, StoreError> {
        let all_time = self
            .store
            .best_score_per_mode(&GameMode::RANKED, None)
            .await?;
        let monthly = self
            .store
            .best_score_per_mode(&GameMode::RANKED, Some(Month::containing(now).window()))
            .await?;

        Ok(WorldRecords {
            all_time: best_per_mode(all_time, &GameMode::RANKED),
            monthly: best_per_mode(monthly, &GameMode::RANKED),
        })
    }

    /// Completed maps per day over the last `ACTIVITY_DAYS` days, oldest first
    pub async fn daily_activity(&self) -> Result<Vec<i64>, StoreError> {
        let start = Utc::now() - Duration::days(i64::from(ACTIVITY_DAYS));
        let totals = self.store.daily_completed_maps(start).await?;
        Ok(daily_series(&totals, start, ACTIVITY_DAYS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::InMemoryDatastore;
    use crate::models::{NewScore, PlayerId};
    use chrono::TimeZone;

    fn score(player_id: PlayerId, mode: GameMode, value: i32) -> NewScore {
        NewScore {
            player_id,
            game_mode: mode,
            score: value,
            maps_completed: value,
            maps_skipped: 0,
            duration_ms: 3_600_000,
            metadata: None,
        }
    }

    #[tokio::test]
    async fn test_leaderboard_dense_ranks_excluding_banned() {
        let store = Arc::new(InMemoryDatastore::new());
        let p1 = store.upsert_player("op-1", "P1").await.unwrap();
        let p2 = store.upsert_player("op-2", "P2").await.unwrap();
        let p3 = store.upsert_player("op-3", "P3").await.unwrap();

        store.insert_score(&score(p1, GameMode::Author, 10)).await.unwrap();
        store.insert_score(&score(p1, GameMode::Author, 20)).await.unwrap();
        store.insert_score(&score(p2, GameMode::Author, 20)).await.unwrap();
        store.insert_score(&score(p3, GameMode::Author, 30)).await.unwrap();
        store.ban_player(p3).await;

        let ranker = Ranker::new(store);
        let board = ranker
            .leaderboard(Some(GameMode::Author), Period::AllTime)
            .await
            .unwrap();

        assert_eq!(board.entries.len(), 2);
        assert!(board.entries.iter().all(|e| e.rank == 1 && e.entry.score == 20));
        assert!(board.entries.iter().all(|e| e.entry.player_id != p3));
    }

    #[tokio::test]
    async fn test_leaderboard_mode_filter() {
        let store = Arc::new(InMemoryDatastore::new());
        let p1 = store.upsert_player("op-1", "P1").await.unwrap();
        store.insert_score(&score(p1, GameMode::Gold, 50)).await.unwrap();

        let ranker = Ranker::new(store);
        let author = ranker
            .leaderboard(Some(GameMode::Author), Period::AllTime)
            .await
            .unwrap();
        let all = ranker.leaderboard(None, Period::AllTime).await.unwrap();

        assert!(author.entries.is_empty());
        assert_eq!(all.entries.len(), 1);
    }

    #[tokio::test]
    async fn test_month_window() {
        let store = Arc::new(InMemoryDatastore::new());
        let p1 = store.upsert_player("op-1", "P1").await.unwrap();
        let p2 = store.upsert_player("op-2", "P2").await.unwrap();

        let december = Utc.with_ymd_and_hms(2025, 12, 10, 0, 0, 0).unwrap();
        let january = Utc.with_ymd_and_hms(2026, 1, 10, 0, 0, 0).unwrap();
        store.insert_score_at(&score(p1, GameMode::Author, 99), december).await;
        store.insert_score_at(&score(p2, GameMode::Author, 5), january).await;

        let ranker = Ranker::new(store);
        let now = Utc.with_ymd_and_hms(2026, 1, 20, 0, 0, 0).unwrap();
        let board = ranker
            .leaderboard_at(None, Period::Month(Month::containing(january)), now)
            .await
            .unwrap();

        assert_eq!(board.entries.len(), 1);
        assert_eq!(board.entries[0].entry.display_name, "P2");
    }

    #[tokio::test]
    async fn test_months_without_data_return_empty() {
        let store = Arc::new(InMemoryDatastore::new());
        let p1 = store.upsert_player("op-1", "P1").await.unwrap();
        let october = Utc.with_ymd_and_hms(2025, 10, 10, 0, 0, 0).unwrap();
        store.insert_score_at(&score(p1, GameMode::Author, 99), october).await;

        let ranker = Ranker::new(store);
        let now = Utc.with_ymd_and_hms(2026, 1, 20, 0, 0, 0).unwrap();
        let before = ranker
            .leaderboard_at(None, Period::Month(Month::new(2025, 10).unwrap()), now)
            .await
            .unwrap();
        let future = ranker
            .leaderboard_at(None, Period::Month(Month::new(2026, 2).unwrap()), now)
            .await
            .unwrap();

        assert!(before.entries.is_empty());
        assert!(future.entries.is_empty());
    }

    #[tokio::test]
    async fn test_world_records_all_time_and_monthly() {
        let store = Arc::new(InMemoryDatastore::new());
        let p1 = store.upsert_player("op-1", "Old Champ").await.unwrap();
        let p2 = store.upsert_player("op-2", "New Kid").await.unwrap();

        let now = Utc::now();
        let long_ago = now - Duration::days(90);
        store.insert_score_at(&score(p1, GameMode::Author, 80), long_ago).await;
        store.insert_score_at(&score(p2, GameMode::Author, 40), now).await;
        store.insert_score_at(&score(p2, GameMode::Custom, 500), now).await;

        let records = Ranker::new(store).world_records_at(now).await.unwrap();

        assert_eq!(records.all_time[&GameMode::Author].display_name, "Old Champ");
        assert_eq!(records.monthly[&GameMode::Author].display_name, "New Kid");
        assert!(!records.all_time.contains_key(&GameMode::Gold));
        assert!(!records.all_time.contains_key(&GameMode::Custom));
    }

    #[tokio::test]
    async fn test_daily_activity_length() {
        let store = Arc::new(InMemoryDatastore::new());
        let activity = Ranker::new(store).daily_activity().await.unwrap();
        assert_eq!(activity.len(), ACTIVITY_DAYS as usize);
    }
}
