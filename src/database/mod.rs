//! Storage Module
//!
//! `Datastore` is the seam every service talks to. `DatabasePool` backs it
//! with PostgreSQL repositories, `InMemoryDatastore` with process memory.

pub mod memory;
pub mod metrics;
pub mod players;
pub mod pool;
pub mod rankings;
pub mod scores;
pub mod sessions;
pub mod store;

pub use memory::InMemoryDatastore;
pub use metrics::MetricRepository;
pub use players::PlayerRepository;
pub use pool::DatabasePool;
pub use rankings::RankingRepository;
pub use scores::ScoreRepository;
pub use sessions::SessionRepository;
pub use store::{Datastore, with_timeout};
