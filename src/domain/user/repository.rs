//! User repository trait

use async_trait::async_trait;
use std::fmt::Debug;

use super::entity::{User, UserId};
use crate::domain::profile::Profile;
use crate::domain::DomainError;

/// Repository trait for users and the profiles they own
///
/// Profiles live and die with their user, so the same store owns both
/// tables. There is no way to insert a profile on its own.
#[async_trait]
pub trait UserRepository: Send + Sync + Debug {
    /// Get a user by their ID
    async fn get(&self, id: &UserId) -> Result<Option<User>, DomainError>;

    /// Get a user by their (normalized) email, for login
    async fn get_by_email(&self, email: &str) -> Result<Option<User>, DomainError>;

    /// Users whose email matches ignoring case, for password resets
    async fn find_by_email_iexact(&self, email: &str) -> Result<Vec<User>, DomainError>;

    /// Get a user by their external unique identifier
    async fn get_by_unique_id(&self, unique_id: &str) -> Result<Option<User>, DomainError>;

    /// Persist a new user together with its profile, atomically.
    ///
    /// Fails with `DomainError::Conflict` when the email or unique ID is taken;
    /// in that case neither record is written.
    async fn create(&self, user: User, profile: Profile) -> Result<User, DomainError>;

    /// Update an existing user
    async fn update(&self, user: &User) -> Result<User, DomainError>;

    /// Store a user's password hash; other fields are left as stored
    async fn update_password(&self, user: &User) -> Result<(), DomainError>;

    /// Delete a user and its profile
    async fn delete(&self, id: &UserId) -> Result<bool, DomainError>;

    /// List all users, oldest first
    async fn list(&self) -> Result<Vec<User>, DomainError>;

    /// Count users
    async fn count(&self) -> Result<usize, DomainError>;

    /// Check if an email is registered
    async fn email_exists(&self, email: &str) -> Result<bool, DomainError> {
        Ok(self.get_by_email(email).await?.is_some())
    }

    /// Record a login for a user
    async fn record_login(&self, id: &UserId) -> Result<(), DomainError>;

    /// Get the profile owned by a user
    async fn get_profile(&self, user_id: &UserId) -> Result<Option<Profile>, DomainError>;

    /// Persist a user and its profile in one step; both or neither
    async fn save_account(&self, user: &User, profile: &Profile) -> Result<(), DomainError>;
}
