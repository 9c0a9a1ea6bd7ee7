//! Application state for shared services

use std::sync::Arc;

use crate::api::cookies::MessageSigner;
use crate::config::SiteConfig;
use crate::domain::{DomainError, ExtraFields, Profile, User, UserId, UserRepository};
use crate::infrastructure::auth::{
    PasswordResetTokenGenerator, SessionManager, SessionRevocations,
};
use crate::infrastructure::mail::Mailer;
use crate::infrastructure::media::MediaStorage;
use crate::infrastructure::user::{PasswordHasher, UserService};

/// Application state containing shared services using dynamic dispatch
#[derive(Clone)]
pub struct AppState {
    pub user_service: Arc<dyn UserServiceTrait>,
    pub sessions: Arc<dyn SessionManager>,
    pub revoked_sessions: Arc<dyn SessionRevocations>,
    pub reset_tokens: Arc<PasswordResetTokenGenerator>,
    pub mailer: Arc<dyn Mailer>,
    pub media: Arc<dyn MediaStorage>,
    pub message_signer: MessageSigner,
    pub web: WebSettings,
}

/// Settings the HTTP layer needs at request time
#[derive(Debug, Clone)]
pub struct WebSettings {
    pub site: SiteConfig,
    pub media_url: String,
    pub secure_cookies: bool,
}

/// Trait for account operations used by handlers and the CLI
#[async_trait::async_trait]
pub trait UserServiceTrait: Send + Sync {
    async fn create_user(
        &self,
        email: &str,
        password: &str,
        extra: ExtraFields,
    ) -> Result<User, DomainError>;
    async fn create_superuser(
        &self,
        email: &str,
        password: &str,
        extra: ExtraFields,
    ) -> Result<User, DomainError>;
    async fn authenticate(&self, email: &str, password: &str) -> Result<Option<User>, DomainError>;
    fn check_password(&self, user: &User, password: &str) -> bool;
    async fn change_password(
        &self,
        id: &UserId,
        old_password: &str,
        new_password: &str,
    ) -> Result<User, DomainError>;
    async fn set_password(&self, id: &UserId, new_password: &str) -> Result<User, DomainError>;
    async fn update_account(&self, user: &User, profile: &Profile) -> Result<(), DomainError>;
    async fn get(&self, id: &UserId) -> Result<Option<User>, DomainError>;
    async fn get_by_email(&self, email: &str) -> Result<Option<User>, DomainError>;
    async fn find_by_email_iexact(&self, email: &str) -> Result<Vec<User>, DomainError>;
    async fn get_profile(&self, user_id: &UserId) -> Result<Option<Profile>, DomainError>;
    async fn count(&self) -> Result<usize, DomainError>;
}

#[async_trait::async_trait]
impl<R, H> UserServiceTrait for UserService<R, H>
where
    R: UserRepository + 'static,
    H: PasswordHasher + 'static,
{
    async fn create_user(
        &self,
        email: &str,
        password: &str,
        extra: ExtraFields,
    ) -> Result<User, DomainError> {
        UserService::create_user(self, email, password, extra).await
    }

    async fn create_superuser(
        &self,
        email: &str,
        password: &str,
        extra: ExtraFields,
    ) -> Result<User, DomainError> {
        UserService::create_superuser(self, email, password, extra).await
    }

    async fn authenticate(&self, email: &str, password: &str) -> Result<Option<User>, DomainError> {
        UserService::authenticate(self, email, password).await
    }

    fn check_password(&self, user: &User, password: &str) -> bool {
        UserService::check_password(self, user, password)
    }

    async fn change_password(
        &self,
        id: &UserId,
        old_password: &str,
        new_password: &str,
    ) -> Result<User, DomainError> {
        UserService::change_password(self, id, old_password, new_password).await
    }

    async fn set_password(&self, id: &UserId, new_password: &str) -> Result<User, DomainError> {
        UserService::set_password(self, id, new_password).await
    }

    async fn update_account(&self, user: &User, profile: &Profile) -> Result<(), DomainError> {
        UserService::update_account(self, user, profile).await
    }

    async fn get(&self, id: &UserId) -> Result<Option<User>, DomainError> {
        UserService::get(self, id).await
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>, DomainError> {
        UserService::get_by_email(self, email).await
    }

    async fn find_by_email_iexact(&self, email: &str) -> Result<Vec<User>, DomainError> {
        UserService::find_by_email_iexact(self, email).await
    }

    async fn get_profile(&self, user_id: &UserId) -> Result<Option<Profile>, DomainError> {
        UserService::get_profile(self, user_id).await
    }

    async fn count(&self) -> Result<usize, DomainError> {
        UserService::count(self).await
    }
}
