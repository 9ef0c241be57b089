//! In-process rate limiting keyed by client IP

pub mod limiter;

pub use limiter::{DEFAULT_MAX_KEYS, IpRateLimiter};
