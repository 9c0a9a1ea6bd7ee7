//! Signed session tokens carried in the session cookie

use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt::Debug;
use uuid::Uuid;

use crate::domain::user::{User, UserId};
use crate::domain::DomainError;

type HmacSha256 = Hmac<Sha256>;

const SESSION_HASH_SALT: &[u8] = b"accounts.session.password";

/// Session claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject (user ID)
    pub sub: String,
    /// Session ID, used to revoke this session alone
    pub jti: String,
    /// Email at the time of login
    pub email: String,
    /// HMAC of the password hash; a password change invalidates the session
    pub session_hash: String,
    /// Issued at timestamp (Unix epoch)
    pub iat: i64,
    /// Expiration timestamp (Unix epoch)
    pub exp: i64,
}

impl SessionClaims {
    /// Check if the session has expired
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }

    /// When the token stops being accepted
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or_else(Utc::now)
    }

    /// Get the user ID from the claims
    pub fn user_id(&self) -> Option<UserId> {
        UserId::parse(&self.sub)
    }
}

/// Configuration for session tokens
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub secret: String,
    pub expiration_hours: u64,
}

impl SessionConfig {
    /// Create new session configuration
    pub fn new(secret: impl Into<String>, expiration_hours: u64) -> Self {
        Self {
            secret: secret.into(),
            expiration_hours,
        }
    }
}

/// Trait for session token operations
pub trait SessionManager: Send + Sync + Debug {
    /// Issue a session token for a user
    fn issue(&self, user: &User) -> Result<String, DomainError>;

    /// Validate a session token and return its claims
    fn validate(&self, token: &str) -> Result<SessionClaims, DomainError>;

    /// Whether the claims still match the user's current credentials
    fn matches_user(&self, claims: &SessionClaims, user: &User) -> bool;

    /// Session lifetime in hours
    fn expiration_hours(&self) -> u64;
}

/// HS256 session token service
#[derive(Clone)]
pub struct SessionService {
    config: SessionConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl Debug for SessionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionService")
            .field("expiration_hours", &self.config.expiration_hours)
            .field("secret", &"[hidden]")
            .finish()
    }
}

impl SessionService {
    /// Create a new session service with the given configuration
    pub fn new(config: SessionConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    fn password_mac(&self, user: &User) -> Result<HmacSha256, DomainError> {
        let mut mac = HmacSha256::new_from_slice(self.config.secret.as_bytes())
            .map_err(|e| DomainError::internal(format!("Invalid session secret: {}", e)))?;
        mac.update(SESSION_HASH_SALT);
        mac.update(user.password_hash().as_bytes());
        Ok(mac)
    }

    fn session_hash(&self, user: &User) -> Result<String, DomainError> {
        Ok(hex::encode(self.password_mac(user)?.finalize().into_bytes()))
    }
}

impl SessionManager for SessionService {
    fn issue(&self, user: &User) -> Result<String, DomainError> {
        let now = Utc::now();
        let exp = now + Duration::hours(self.config.expiration_hours as i64);

        let claims = SessionClaims {
            sub: user.id().to_string(),
            jti: Uuid::new_v4().simple().to_string(),
            email: user.email().to_string(),
            session_hash: self.session_hash(user)?,
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| DomainError::internal(format!("Failed to issue session: {}", e)))
    }

    fn validate(&self, token: &str) -> Result<SessionClaims, DomainError> {
        let token_data = decode::<SessionClaims>(token, &self.decoding_key, &Validation::default())
            .map_err(|e| DomainError::credential(format!("Invalid session: {}", e)))?;

        Ok(token_data.claims)
    }

    fn matches_user(&self, claims: &SessionClaims, user: &User) -> bool {
        if claims.sub != user.id().to_string() {
            return false;
        }

        let Ok(expected) = hex::decode(&claims.session_hash) else {
            return false;
        };

        self.password_mac(user)
            .map(|mac| mac.verify_slice(&expected).is_ok())
            .unwrap_or(false)
    }

    fn expiration_hours(&self) -> u64 {
        self.config.expiration_hours
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_user() -> User {
        User::new("test@django.com", "$argon2id$stored-hash")
    }

    fn create_service() -> SessionService {
        SessionService::new(SessionConfig::new("test-secret-key-12345", 24))
    }

    #[test]
    fn test_issue_and_validate() {
        let service = create_service();
        let user = create_test_user();

        let token = service.issue(&user).unwrap();
        let claims = service.validate(&token).unwrap();

        assert_eq!(claims.user_id(), Some(*user.id()));
        assert_eq!(claims.email, "test@django.com");
        assert!(!claims.is_expired());
        assert!(service.matches_user(&claims, &user));
    }

    #[test]
    fn test_each_session_has_its_own_id() {
        let service = create_service();
        let user = create_test_user();

        let first = service.validate(&service.issue(&user).unwrap()).unwrap();
        let second = service.validate(&service.issue(&user).unwrap()).unwrap();

        assert_eq!(first.jti.len(), 32);
        assert_ne!(first.jti, second.jti);
        assert_eq!(first.expires_at().timestamp(), first.exp);
    }

    #[test]
    fn test_session_hash_does_not_expose_password_hash() {
        let service = create_service();
        let user = create_test_user();

        let claims = service.validate(&service.issue(&user).unwrap()).unwrap();

        assert!(!claims.session_hash.contains("argon2"));
        assert_eq!(claims.session_hash.len(), 64);
    }

    #[test]
    fn test_password_change_invalidates_session() {
        let service = create_service();
        let mut user = create_test_user();

        let claims = service.validate(&service.issue(&user).unwrap()).unwrap();
        user.set_password_hash("$argon2id$another-hash");

        assert!(!service.matches_user(&claims, &user));
    }

    #[test]
    fn test_claims_for_other_user_do_not_match() {
        let service = create_service();
        let user = create_test_user();
        let other = User::new("other@django.com", "$argon2id$stored-hash");

        let claims = service.validate(&service.issue(&user).unwrap()).unwrap();

        assert!(!service.matches_user(&claims, &other));
    }

    #[test]
    fn test_invalid_token() {
        let service = create_service();

        assert!(service.validate("invalid-token").is_err());
    }

    #[test]
    fn test_wrong_secret() {
        let service1 = SessionService::new(SessionConfig::new("secret-1", 24));
        let service2 = SessionService::new(SessionConfig::new("secret-2", 24));

        let token = service1.issue(&create_test_user()).unwrap();

        assert!(service2.validate(&token).is_err());
    }

    #[test]
    fn test_expired_token() {
        let service = create_service();
        let user = create_test_user();

        let past_time = Utc::now() - Duration::hours(1);
        let claims = SessionClaims {
            sub: user.id().to_string(),
            jti: Uuid::new_v4().simple().to_string(),
            email: user.email().to_string(),
            session_hash: String::new(),
            iat: (past_time - Duration::hours(2)).timestamp(),
            exp: past_time.timestamp(),
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"test-secret-key-12345"),
        )
        .unwrap();

        assert!(service.validate(&token).is_err());
    }

    #[test]
    fn test_expiration_hours() {
        let service = SessionService::new(SessionConfig::new("secret", 48));
        assert_eq!(service.expiration_hours(), 48);
    }
}
