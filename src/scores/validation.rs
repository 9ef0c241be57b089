//! Score payload validation
//!
//! Numeric fields are decoded as `i64` so that out-of-range values produce a
//! field message instead of a generic decode failure. All field problems are
//! collected and joined with `"; "`; metadata checks run afterwards.

use serde::Deserialize;
use serde_json::value::RawValue;
use thiserror::Error;

use crate::models::{GameMode, NewScore, PlayerId};

pub const MIN_DURATION_MS: i64 = 60_000;
pub const MAX_DURATION_MS: i64 = 7_200_000;
pub const MAX_METADATA_BYTES: usize = 256 * 1024;
pub const MAX_METADATA_KEYS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid request body")]
    MalformedBody,

    #[error("{}", .0.join("; "))]
    Fields(Vec<String>),

    #[error("metadata must not exceed 256KB")]
    MetadataTooLarge,

    #[error("metadata must be a JSON object")]
    MetadataNotObject,

    #[error("metadata must not have more than 10 keys")]
    MetadataTooManyKeys,
}

/// Raw submission body
#[derive(Debug, Deserialize)]
pub struct ScoreSubmission {
    #[serde(default)]
    pub game_mode: Option<String>,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub maps_completed: i64,
    #[serde(default)]
    pub maps_skipped: i64,
    #[serde(default)]
    pub duration_ms: i64,
    #[serde(default)]
    pub metadata: Option<Box<RawValue>>,
}

impl ScoreSubmission {
    pub fn from_json(body: &[u8]) -> Result<Self, ValidationError> {
        serde_json::from_slice(body).map_err(|_| ValidationError::MalformedBody)
    }

    /// Check every constraint and produce a storable score
    pub fn into_new_score(self, player_id: PlayerId) -> Result<NewScore, ValidationError> {
        let mut problems = Vec::new();

        let game_mode = match self.game_mode.as_deref() {
            None | Some("") => {
                problems.push("game_mode is required".to_string());
                None
            }
            Some(raw) => {
                let mode = GameMode::parse(raw);
                if mode.is_none() {
                    problems.push("game_mode must be 'author', 'gold', or 'custom'".to_string());
                }
                mode
            }
        };

        let score = non_negative("score", self.score, &mut problems);
        let maps_completed = non_negative("maps_completed", self.maps_completed, &mut problems);
        let maps_skipped = non_negative("maps_skipped", self.maps_skipped, &mut problems);

        if self.duration_ms < MIN_DURATION_MS {
            problems.push(format!("duration_ms must be at least {MIN_DURATION_MS}"));
        } else if self.duration_ms > MAX_DURATION_MS {
            problems.push(format!("duration_ms must not exceed {MAX_DURATION_MS}"));
        }

        if !problems.is_empty() {
            return Err(ValidationError::Fields(problems));
        }

        let game_mode = game_mode
            .ok_or_else(|| ValidationError::Fields(vec!["game_mode is required".to_string()]))?;
        let metadata = match self.metadata {
            Some(raw) => Some(validate_metadata(&raw)?),
            None => None,
        };

        Ok(NewScore {
            player_id,
            game_mode,
            score,
            maps_completed,
            maps_skipped,
            // Bounds checked above
            duration_ms: self.duration_ms as i32,
            metadata,
        })
    }
}

fn non_negative(field: &str, value: i64, problems: &mut Vec<String>) -> i32 {
    if value < 0 {
        problems.push(format!("{field} must be non-negative"));
        return 0;
    }
    match i32::try_from(value) {
        Ok(v) => v,
        Err(_) => {
            problems.push(format!("{field} must not exceed {}", i32::MAX));
            0
        }
    }
}

/// Size, shape and key-count limits for the free-form metadata object
pub fn validate_metadata(raw: &RawValue) -> Result<serde_json::Value, ValidationError> {
    if raw.get().len() > MAX_METADATA_BYTES {
        return Err(ValidationError::MetadataTooLarge);
    }

    let value: serde_json::Value =
        serde_json::from_str(raw.get()).map_err(|_| ValidationError::MetadataNotObject)?;
    match &value {
        serde_json::Value::Object(map) if map.len() > MAX_METADATA_KEYS => {
            Err(ValidationError::MetadataTooManyKeys)
        }
        serde_json::Value::Object(_) => Ok(value),
        _ => Err(ValidationError::MetadataNotObject),
    }
}
