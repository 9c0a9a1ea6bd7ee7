//! One-time password reset tokens and user id encoding for reset links
//!
//! A token is `<timestamp base36>-<truncated hmac hex>`. The HMAC binds the
//! user's id, password hash, last login and email, so any of those changing
//! invalidates every outstanding token for that user.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt::Debug;

use crate::domain::user::{User, UserId};
use crate::domain::DomainError;

type HmacSha256 = Hmac<Sha256>;

const KEY_SALT: &[u8] = b"accounts.tokens.PasswordResetTokenGenerator";

/// 2001-01-01T00:00:00Z as a Unix timestamp
const TOKEN_EPOCH: i64 = 978_307_200;

/// Bytes of the HMAC kept in the token (32 hex characters)
const SIGNATURE_BYTES: usize = 16;

/// Longest base36 timestamp accepted; larger values cannot be valid
const MAX_TIMESTAMP_DIGITS: usize = 13;

/// Default validity of a reset token
pub const DEFAULT_RESET_TIMEOUT_SECS: u64 = 60 * 60 * 24 * 3;

/// Generates and checks password reset tokens
#[derive(Clone)]
pub struct PasswordResetTokenGenerator {
    secret: String,
    timeout_secs: u64,
}

impl Debug for PasswordResetTokenGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordResetTokenGenerator")
            .field("timeout_secs", &self.timeout_secs)
            .field("secret", &"[hidden]")
            .finish()
    }
}

impl PasswordResetTokenGenerator {
    pub fn new(secret: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            secret: secret.into(),
            timeout_secs,
        }
    }

    /// Make a token for the user, valid from now
    pub fn make_token(&self, user: &User) -> Result<String, DomainError> {
        self.make_token_with_timestamp(user, now_timestamp())
    }

    /// Check a token against the user's current state
    pub fn check_token(&self, user: &User, token: &str) -> bool {
        self.check_token_at(user, token, now_timestamp())
    }

    fn make_token_with_timestamp(&self, user: &User, timestamp: i64) -> Result<String, DomainError> {
        let signature = self.mac(user, timestamp)?.finalize().into_bytes();

        Ok(format!(
            "{}-{}",
            to_base36(timestamp),
            hex::encode(&signature[..SIGNATURE_BYTES])
        ))
    }

    fn check_token_at(&self, user: &User, token: &str, now: i64) -> bool {
        let Some((ts_b36, signature_hex)) = token.split_once('-') else {
            return false;
        };

        let Some(timestamp) = from_base36(ts_b36) else {
            return false;
        };

        let Ok(signature) = hex::decode(signature_hex) else {
            return false;
        };

        if signature.len() != SIGNATURE_BYTES {
            return false;
        }

        let Ok(mac) = self.mac(user, timestamp) else {
            return false;
        };

        // Constant-time comparison of the truncated tag
        if mac.verify_truncated_left(&signature).is_err() {
            return false;
        }

        now - timestamp <= self.timeout_secs as i64
    }

    fn mac(&self, user: &User, timestamp: i64) -> Result<HmacSha256, DomainError> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|e| DomainError::internal(format!("Invalid token secret: {}", e)))?;

        let login_timestamp = user
            .last_login()
            .map(|at| at.timestamp().to_string())
            .unwrap_or_default();

        mac.update(KEY_SALT);
        mac.update(user.id().to_string().as_bytes());
        mac.update(user.password_hash().as_bytes());
        mac.update(login_timestamp.as_bytes());
        mac.update(timestamp.to_string().as_bytes());
        mac.update(user.email().as_bytes());

        Ok(mac)
    }
}

fn now_timestamp() -> i64 {
    Utc::now().timestamp() - TOKEN_EPOCH
}

fn to_base36(mut value: i64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

    if value <= 0 {
        return "0".to_string();
    }

    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();

    String::from_utf8(out).unwrap_or_default()
}

fn from_base36(value: &str) -> Option<i64> {
    if value.is_empty() || value.len() > MAX_TIMESTAMP_DIGITS {
        return None;
    }

    i64::from_str_radix(value, 36).ok().filter(|ts| *ts >= 0)
}

/// Encode a user id for use in a reset link
pub fn encode_uid(id: &UserId) -> String {
    URL_SAFE_NO_PAD.encode(id.to_string())
}

/// Decode a user id from a reset link; `None` for anything malformed
pub fn decode_uid(uidb64: &str) -> Option<UserId> {
    let bytes = URL_SAFE_NO_PAD.decode(uidb64).ok()?;
    let text = String::from_utf8(bytes).ok()?;
    UserId::parse(&text)
}
