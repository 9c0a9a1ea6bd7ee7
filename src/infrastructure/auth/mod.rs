//! Authentication infrastructure module
//!
//! Session tokens for the session cookie, the list of revoked sessions and
//! one-time password reset tokens.

mod reset_token;
mod revocation;
mod session;

pub use reset_token::{
    decode_uid, encode_uid, PasswordResetTokenGenerator, DEFAULT_RESET_TIMEOUT_SECS,
};
pub use revocation::{
    InMemorySessionRevocations, PostgresSessionRevocations, SessionRevocations,
};
pub use session::{SessionClaims, SessionConfig, SessionManager, SessionService};
