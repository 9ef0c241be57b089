use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::player::PlayerId;

/// Game mode of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    Author,
    Gold,
    Custom,
}

impl GameMode {
    /// Modes that have leaderboards and world records
    pub const RANKED: [GameMode; 2] = [GameMode::Author, GameMode::Gold];

    pub fn as_str(&self) -> &'static str {
        match self {
            GameMode::Author => "author",
            GameMode::Gold => "gold",
            GameMode::Custom => "custom",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "author" => Some(GameMode::Author),
            "gold" => Some(GameMode::Gold),
            "custom" => Some(GameMode::Custom),
            _ => None,
        }
    }

    pub fn is_ranked(&self) -> bool {
        Self::RANKED.contains(self)
    }
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated submission ready to be persisted
#[derive(Debug, Clone, PartialEq)]
pub struct NewScore {
    pub player_id: PlayerId,
    pub game_mode: GameMode,
    pub score: i32,
    pub maps_completed: i32,
    pub maps_skipped: i32,
    pub duration_ms: i32,
    pub metadata: Option<serde_json::Value>,
}

/// What the caller learns about a stored (or shadow-accepted) score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreReceipt {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl ScoreReceipt {
    /// Receipt for a submission that was never stored
    pub fn shadow() -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
        }
    }
}

/// A stored score joined with its player's public identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreEntry {
    pub score_id: Uuid,
    pub player_id: PlayerId,
    pub openplanet_id: String,
    pub display_name: String,
    pub game_mode: GameMode,
    pub score: i32,
    pub maps_completed: i32,
    pub maps_skipped: i32,
    pub duration_ms: i32,
    pub created_at: DateTime<Utc>,
}

/// Half-open `[start, end)` interval over submission time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant < self.end
    }
}

/// Narrowing applied to ranking queries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScoreFilter {
    pub game_mode: Option<GameMode>,
    pub window: Option<TimeWindow>,
}

impl ScoreFilter {
    pub fn matches(&self, entry: &ScoreEntry) -> bool {
        if let Some(mode) = self.game_mode
            && entry.game_mode != mode
        {
            return false;
        }
        match self.window {
            Some(window) => window.contains(entry.created_at),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_game_mode_parse() {
        assert_eq!(GameMode::parse("author"), Some(GameMode::Author));
        assert_eq!(GameMode::parse("gold"), Some(GameMode::Gold));
        assert_eq!(GameMode::parse("custom"), Some(GameMode::Custom));
        assert_eq!(GameMode::parse("Author"), None);
        assert_eq!(GameMode::parse(""), None);
    }

    #[test]
    fn test_custom_mode_is_not_ranked() {
        assert!(GameMode::Author.is_ranked());
        assert!(GameMode::Gold.is_ranked());
        assert!(!GameMode::Custom.is_ranked());
    }

    #[test]
    fn test_time_window_is_half_open() {
        let start = Utc.with_ymd_and_hms(2025, 11, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 12, 1, 0, 0, 0).unwrap();
        let window = TimeWindow::new(start, end);

        assert!(window.contains(start));
        assert!(window.contains(end - Duration::seconds(1)));
        assert!(!window.contains(end));
        assert!(!window.contains(start - Duration::seconds(1)));
    }
}
