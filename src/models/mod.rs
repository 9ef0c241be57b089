//! Domain models shared by the session, submission and ranking layers

pub mod player;
pub mod score;

pub use player::{Player, PlayerId, Session};
pub use score::{GameMode, NewScore, ScoreEntry, ScoreFilter, ScoreReceipt, TimeWindow};
