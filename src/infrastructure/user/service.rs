//! User service for account creation, authentication and management

use std::sync::Arc;

use tracing::{debug, info};

use crate::domain::profile::Profile;
use crate::domain::user::{normalize_email, ExtraFields, User, UserId, UserRepository};
use crate::domain::DomainError;

use super::password::PasswordHasher;

/// User service for authentication and management
#[derive(Debug)]
pub struct UserService<R: UserRepository, H: PasswordHasher> {
    repository: Arc<R>,
    hasher: Arc<H>,
}

impl<R: UserRepository, H: PasswordHasher> UserService<R, H> {
    /// Create a new user service
    pub fn new(repository: Arc<R>, hasher: Arc<H>) -> Self {
        Self { repository, hasher }
    }

    /// Create a user and its default profile.
    ///
    /// The profile is written in the same repository call as the user, so a
    /// user never exists without one.
    pub async fn create_user(
        &self,
        email: &str,
        password: &str,
        extra: ExtraFields,
    ) -> Result<User, DomainError> {
        if email.trim().is_empty() {
            return Err(DomainError::validation("Email must be entered to create a user"));
        }

        let email = normalize_email(email);

        if self.repository.email_exists(&email).await? {
            return Err(DomainError::conflict(format!("Email '{}' already exists", email)));
        }

        let password_hash = self.hasher.hash(password)?;
        let user = User::new(email, password_hash).with_extra(&extra);
        let profile = Profile::new_default(*user.id());

        let user = self.repository.create(user, profile).await?;

        info!(user_id = %user.id(), staff = user.is_staff(), "User created");

        Ok(user)
    }

    /// Create a user with staff and superuser rights.
    ///
    /// `is_active`, `is_staff` and `is_superuser` default to true; explicitly
    /// clearing either of the elevated flags is an error.
    pub async fn create_superuser(
        &self,
        email: &str,
        password: &str,
        mut extra: ExtraFields,
    ) -> Result<User, DomainError> {
        extra.is_active.get_or_insert(true);
        let is_staff = *extra.is_staff.get_or_insert(true);
        let is_superuser = *extra.is_superuser.get_or_insert(true);

        if !is_staff {
            return Err(DomainError::validation("Superuser must have is_staff=True."));
        }

        if !is_superuser {
            return Err(DomainError::validation("Superuser must have is_superuser=True."));
        }

        self.create_user(email, password, extra).await
    }

    /// Check a raw password against the user's stored hash
    pub fn check_password(&self, user: &User, password: &str) -> bool {
        self.hasher.verify(password, user.password_hash())
    }

    /// Authenticate with email and password.
    ///
    /// Returns `None` for unknown emails, inactive users and wrong or unusable
    /// passwords alike. A successful login is recorded on the user.
    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<User>, DomainError> {
        let email = normalize_email(email);

        let Some(user) = self.repository.get_by_email(&email).await? else {
            // Hash anyway so unknown emails cost the same as wrong passwords
            let _ = self.hasher.hash(password);
            return Ok(None);
        };

        if !self.check_password(&user, password) || !user.is_active() {
            debug!(user_id = %user.id(), "Authentication rejected");
            return Ok(None);
        }

        self.repository.record_login(user.id()).await?;

        self.repository.get(user.id()).await
    }

    /// Get a user by ID
    pub async fn get(&self, id: &UserId) -> Result<Option<User>, DomainError> {
        self.repository.get(id).await
    }

    /// Get a user by email
    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>, DomainError> {
        self.repository.get_by_email(&normalize_email(email)).await
    }

    /// Users whose email matches ignoring case
    pub async fn find_by_email_iexact(&self, email: &str) -> Result<Vec<User>, DomainError> {
        self.repository.find_by_email_iexact(email.trim()).await
    }

    /// Get a user by external unique ID
    pub async fn get_by_unique_id(&self, unique_id: &str) -> Result<Option<User>, DomainError> {
        self.repository.get_by_unique_id(unique_id).await
    }

    /// Get the profile of a user
    pub async fn get_profile(&self, user_id: &UserId) -> Result<Option<Profile>, DomainError> {
        self.repository.get_profile(user_id).await
    }

    /// List all users
    pub async fn list(&self) -> Result<Vec<User>, DomainError> {
        self.repository.list().await
    }

    /// Count users
    pub async fn count(&self) -> Result<usize, DomainError> {
        self.repository.count().await
    }

    /// Change a password after checking the current one
    pub async fn change_password(
        &self,
        id: &UserId,
        old_password: &str,
        new_password: &str,
    ) -> Result<User, DomainError> {
        let user = self.require(id).await?;

        if !self.check_password(&user, old_password) {
            return Err(DomainError::credential("Current password is incorrect"));
        }

        self.store_password(user, new_password).await
    }

    /// Set a new password without knowing the old one (reset flow)
    pub async fn set_password(&self, id: &UserId, new_password: &str) -> Result<User, DomainError> {
        let user = self.require(id).await?;
        self.store_password(user, new_password).await
    }

    /// Persist edited user and profile records together
    pub async fn update_account(&self, user: &User, profile: &Profile) -> Result<(), DomainError> {
        self.repository.save_account(user, profile).await?;
        info!(user_id = %user.id(), "Account updated");
        Ok(())
    }

    /// Delete a user; the profile goes with it
    pub async fn delete(&self, id: &UserId) -> Result<bool, DomainError> {
        self.repository.delete(id).await
    }

    async fn require(&self, id: &UserId) -> Result<User, DomainError> {
        self.repository
            .get(id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("User '{}' not found", id)))
    }

    async fn store_password(&self, mut user: User, new_password: &str) -> Result<User, DomainError> {
        let new_hash = self.hasher.hash(new_password)?;
        user.set_password_hash(new_hash);

        self.repository.update_password(&user).await?;
        info!(user_id = %user.id(), "Password changed");

        Ok(user)
    }
}
