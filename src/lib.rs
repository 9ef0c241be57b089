//! rmpc score server
//!
//! Backend of the score-tracking service for the Openplanet plugin: players
//! sign in with an Openplanet token, submit finished runs, and read
//! leaderboards, world records and activity.
//!
//! ## Module Structure
//!
//! ```text
//! src/
//! ├── lib.rs         - Crate root with re-exports
//! ├── main.rs        - Server entrypoint
//! ├── config.rs      - Environment configuration
//! ├── error.rs       - Store and API error types
//! ├── metrics.rs     - Allow-listed usage counters
//! ├── models/        - Players, sessions, scores
//! ├── ratelimit/     - Sliding-window limiter per client IP
//! ├── session/       - Identity verification, tokens, bearer auth
//! │   ├── identity.rs      - Openplanet verifier and dev stand-in
//! │   ├── token.rs         - Token generation and hashing
//! │   └── authenticator.rs - Session issuance and authentication
//! ├── scores/        - Submission pipeline
//! │   ├── validation.rs - Payload and metadata rules
//! │   └── pipeline.rs   - Ban shadowing, cooldown, persistence
//! ├── ranking/       - Leaderboards, world records, activity
//! ├── api/           - HTTP handlers, extractors and middleware
//! └── database/      - Datastore trait, PostgreSQL and in-memory backends
//! ```

pub mod api;
pub mod config;
pub mod database;
pub mod error;
pub mod metrics;
pub mod models;
pub mod ranking;
pub mod ratelimit;
pub mod scores;
pub mod session;

// Re-export main types for convenience
pub use config::ServiceConfig;
pub use database::{DatabasePool, Datastore, InMemoryDatastore};
pub use error::{ApiError, StoreError};
pub use metrics::MetricsRecorder;
pub use models::{GameMode, NewScore, Player, PlayerId, ScoreEntry, ScoreReceipt, Session};
pub use ranking::{Leaderboard, Period, Ranker, WorldRecords};
pub use ratelimit::IpRateLimiter;
pub use scores::ScorePipeline;
pub use session::{Identity, IdentityVerifier, SessionAuthenticator, StaticIdentityVerifier};

// Re-export API types
pub use api::{AppState, SecurityMiddlewareConfig, SecurityState, create_app, create_router};
