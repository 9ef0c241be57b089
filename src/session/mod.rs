//! Player sign-in and session authentication
//!
//! - `identity` - Openplanet token verification
//! - `token` - session token generation and hashing
//! - `authenticator` - session issuance and bearer authentication

pub mod authenticator;
pub mod identity;
pub mod token;

pub use authenticator::{IssuedSession, SessionAuthenticator, SessionError, parse_bearer};
pub use identity::{
    Identity, IdentityError, IdentityVerifier, OpenplanetVerifier, StaticIdentityVerifier,
};
pub use token::{generate_session_token, hash_token};
