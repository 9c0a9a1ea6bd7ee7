//! In-memory user repository implementation

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::profile::Profile;
use crate::domain::user::{User, UserId, UserRepository};
use crate::domain::DomainError;

/// Tables guarded by a single lock so user and profile writes are atomic
#[derive(Debug, Default)]
struct Store {
    users: HashMap<UserId, User>,
    /// email -> user ID
    email_index: HashMap<String, UserId>,
    /// unique_id -> user ID
    unique_id_index: HashMap<String, UserId>,
    profiles: HashMap<UserId, Profile>,
}

impl Store {
    fn check_email_free(&self, email: &str, owner: Option<&UserId>) -> Result<(), DomainError> {
        match self.email_index.get(email) {
            Some(id) if Some(id) != owner => Err(DomainError::conflict(format!(
                "Email '{}' already exists",
                email
            ))),
            _ => Ok(()),
        }
    }

    fn write_user(&mut self, user: &User) -> Result<(), DomainError> {
        let old_email = self
            .users
            .get(user.id())
            .map(|u| u.email().to_string())
            .ok_or_else(|| DomainError::not_found(format!("User '{}' not found", user.id())))?;

        if old_email != user.email() {
            self.check_email_free(user.email(), Some(user.id()))?;
            self.email_index.remove(&old_email);
            self.email_index.insert(user.email().to_string(), *user.id());
        }

        self.users.insert(*user.id(), user.clone());
        Ok(())
    }
}

/// In-memory implementation of UserRepository
#[derive(Debug, Clone, Default)]
pub struct InMemoryUserRepository {
    store: Arc<RwLock<Store>>,
}

impl InMemoryUserRepository {
    /// Create a new empty repository
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored profiles
    pub async fn profile_count(&self) -> usize {
        self.store.read().await.profiles.len()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn get(&self, id: &UserId) -> Result<Option<User>, DomainError> {
        Ok(self.store.read().await.users.get(id).cloned())
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>, DomainError> {
        let store = self.store.read().await;

        Ok(store
            .email_index
            .get(email)
            .and_then(|id| store.users.get(id))
            .cloned())
    }

    async fn find_by_email_iexact(&self, email: &str) -> Result<Vec<User>, DomainError> {
        let email = email.to_lowercase();
        let store = self.store.read().await;

        let mut users: Vec<User> = store
            .users
            .values()
            .filter(|user| user.email().to_lowercase() == email)
            .cloned()
            .collect();
        users.sort_by_key(|u| u.date_joined());

        Ok(users)
    }

    async fn get_by_unique_id(&self, unique_id: &str) -> Result<Option<User>, DomainError> {
        let store = self.store.read().await;

        Ok(store
            .unique_id_index
            .get(unique_id)
            .and_then(|id| store.users.get(id))
            .cloned())
    }

    async fn create(&self, user: User, profile: Profile) -> Result<User, DomainError> {
        let mut store = self.store.write().await;

        if store.users.contains_key(user.id()) {
            return Err(DomainError::conflict(format!(
                "User with ID '{}' already exists",
                user.id()
            )));
        }

        store.check_email_free(user.email(), None)?;

        if store.unique_id_index.contains_key(user.unique_id()) {
            return Err(DomainError::conflict(format!(
                "Unique ID '{}' already exists",
                user.unique_id()
            )));
        }

        if profile.user_id() != user.id() {
            return Err(DomainError::validation("Profile does not belong to the new user"));
        }

        store.email_index.insert(user.email().to_string(), *user.id());
        store
            .unique_id_index
            .insert(user.unique_id().to_string(), *user.id());
        store.profiles.insert(*user.id(), profile);
        store.users.insert(*user.id(), user.clone());

        Ok(user)
    }

    async fn update(&self, user: &User) -> Result<User, DomainError> {
        self.store.write().await.write_user(user)?;
        Ok(user.clone())
    }

    async fn update_password(&self, user: &User) -> Result<(), DomainError> {
        let mut store = self.store.write().await;

        match store.users.get_mut(user.id()) {
            Some(stored) => {
                stored.set_password_hash(user.password_hash());
                Ok(())
            }
            None => Err(DomainError::not_found(format!("User '{}' not found", user.id()))),
        }
    }

    async fn delete(&self, id: &UserId) -> Result<bool, DomainError> {
        let mut store = self.store.write().await;

        match store.users.remove(id) {
            Some(user) => {
                store.email_index.remove(user.email());
                store.unique_id_index.remove(user.unique_id());
                store.profiles.remove(id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list(&self) -> Result<Vec<User>, DomainError> {
        let store = self.store.read().await;

        let mut users: Vec<User> = store.users.values().cloned().collect();
        users.sort_by_key(|u| u.date_joined());

        Ok(users)
    }

    async fn count(&self) -> Result<usize, DomainError> {
        Ok(self.store.read().await.users.len())
    }

    async fn record_login(&self, id: &UserId) -> Result<(), DomainError> {
        let mut store = self.store.write().await;

        match store.users.get_mut(id) {
            Some(user) => {
                user.record_login();
                Ok(())
            }
            None => Err(DomainError::not_found(format!("User '{}' not found", id))),
        }
    }

    async fn get_profile(&self, user_id: &UserId) -> Result<Option<Profile>, DomainError> {
        Ok(self.store.read().await.profiles.get(user_id).cloned())
    }

    async fn save_account(&self, user: &User, profile: &Profile) -> Result<(), DomainError> {
        let mut store = self.store.write().await;

        if profile.user_id() != user.id() {
            return Err(DomainError::validation("Profile does not belong to the user"));
        }

        if !store.profiles.contains_key(user.id()) {
            return Err(DomainError::not_found(format!(
                "Profile for user '{}' not found",
                user.id()
            )));
        }

        store.write_user(user)?;
        store.profiles.insert(*user.id(), profile.clone());

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_user(email: &str) -> (User, Profile) {
        let user = User::new(email, "hashed_password");
        let profile = Profile::new_default(*user.id());
        (user, profile)
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let repo = InMemoryUserRepository::new();
        let (user, profile) = create_test_user("test@django.com");

        repo.create(user.clone(), profile).await.unwrap();

        let retrieved = repo.get(user.id()).await.unwrap().unwrap();
        assert_eq!(retrieved.email(), "test@django.com");

        let profile = repo.get_profile(user.id()).await.unwrap().unwrap();
        assert!(profile.has_default_image());
    }

    #[tokio::test]
    async fn test_get_by_email_and_unique_id() {
        let repo = InMemoryUserRepository::new();
        let (user, profile) = create_test_user("test@django.com");

        repo.create(user.clone(), profile).await.unwrap();

        let by_email = repo.get_by_email("test@django.com").await.unwrap();
        assert_eq!(by_email.unwrap().id(), user.id());

        let by_unique = repo.get_by_unique_id(user.unique_id()).await.unwrap();
        assert_eq!(by_unique.unwrap().id(), user.id());

        assert!(repo.get_by_email("nobody@django.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_by_email_ignores_case() {
        let repo = InMemoryUserRepository::new();

        for email in ["Test@django.com", "test@django.com", "other@django.com"] {
            let (user, profile) = create_test_user(email);
            repo.create(user, profile).await.unwrap();
        }

        let found = repo.find_by_email_iexact("TEST@django.com").await.unwrap();
        let emails: Vec<&str> = found.iter().map(|u| u.email()).collect();

        assert_eq!(emails.len(), 2);
        assert!(emails.contains(&"Test@django.com"));
        assert!(emails.contains(&"test@django.com"));
        assert!(repo.find_by_email_iexact("nobody@django.com").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_password_keeps_other_fields() {
        let repo = InMemoryUserRepository::new();
        let (user, profile) = create_test_user("test@django.com");

        repo.create(user.clone(), profile).await.unwrap();
        repo.record_login(user.id()).await.unwrap();

        // A stale copy from before the login
        let mut stale = user.clone();
        stale.set_names("Stale", "Copy");
        stale.set_password_hash("new_hash");
        repo.update_password(&stale).await.unwrap();

        let stored = repo.get(user.id()).await.unwrap().unwrap();
        assert_eq!(stored.password_hash(), "new_hash");
        assert!(stored.last_login().is_some());
        assert_eq!(stored.first_name(), "");
    }

    #[tokio::test]
    async fn test_duplicate_email_writes_nothing() {
        let repo = InMemoryUserRepository::new();
        let (first, first_profile) = create_test_user("same@django.com");
        let (second, second_profile) = create_test_user("same@django.com");

        repo.create(first, first_profile).await.unwrap();

        let result = repo.create(second.clone(), second_profile).await;
        assert!(matches!(result, Err(DomainError::Conflict { .. })));
        assert!(repo.get(second.id()).await.unwrap().is_none());
        assert_eq!(repo.count().await.unwrap(), 1);
        assert_eq!(repo.profile_count().await, 1);
    }

    #[tokio::test]
    async fn test_create_rejects_foreign_profile() {
        let repo = InMemoryUserRepository::new();
        let (user, _) = create_test_user("a@django.com");
        let stray = Profile::new_default(UserId::generate());

        let result = repo.create(user, stray).await;
        assert!(result.is_err());
        assert_eq!(repo.profile_count().await, 0);
    }

    #[tokio::test]
    async fn test_update_email_moves_index() {
        let repo = InMemoryUserRepository::new();
        let (mut user, profile) = create_test_user("old@django.com");

        repo.create(user.clone(), profile).await.unwrap();

        user.set_email("new@django.com");
        repo.update(&user).await.unwrap();

        assert!(repo.get_by_email("old@django.com").await.unwrap().is_none());
        assert!(repo.get_by_email("new@django.com").await.unwrap().is_some());
        assert_eq!(repo.profile_count().await, 1);
    }

    #[tokio::test]
    async fn test_update_email_conflict() {
        let repo = InMemoryUserRepository::new();
        let (first, first_profile) = create_test_user("first@django.com");
        let (mut second, second_profile) = create_test_user("second@django.com");

        repo.create(first, first_profile).await.unwrap();
        repo.create(second.clone(), second_profile).await.unwrap();

        second.set_email("first@django.com");

        let result = repo.update(&second).await;
        assert!(matches!(result, Err(DomainError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_update_missing_user() {
        let repo = InMemoryUserRepository::new();
        let (user, _) = create_test_user("ghost@django.com");

        let result = repo.update(&user).await;
        assert!(matches!(result, Err(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_delete_cascades_to_profile() {
        let repo = InMemoryUserRepository::new();
        let (user, profile) = create_test_user("test@django.com");

        repo.create(user.clone(), profile).await.unwrap();

        assert!(repo.delete(user.id()).await.unwrap());
        assert!(repo.get(user.id()).await.unwrap().is_none());
        assert!(repo.get_profile(user.id()).await.unwrap().is_none());
        assert!(repo.get_by_email("test@django.com").await.unwrap().is_none());
        assert_eq!(repo.profile_count().await, 0);

        assert!(!repo.delete(user.id()).await.unwrap());
    }

    #[tokio::test]
    async fn test_record_login_does_not_touch_profiles() {
        let repo = InMemoryUserRepository::new();
        let (user, profile) = create_test_user("test@django.com");

        repo.create(user.clone(), profile).await.unwrap();
        repo.record_login(user.id()).await.unwrap();
        repo.record_login(user.id()).await.unwrap();

        let after = repo.get(user.id()).await.unwrap().unwrap();
        assert!(after.last_login().is_some());
        assert_eq!(repo.profile_count().await, 1);
    }

    #[tokio::test]
    async fn test_save_account_updates_both() {
        let repo = InMemoryUserRepository::new();
        let (mut user, mut profile) = create_test_user("test@django.com");

        repo.create(user.clone(), profile.clone()).await.unwrap();

        user.set_names("Chester", "Bennington");
        profile.set_image("profile_pics/me.png");
        repo.save_account(&user, &profile).await.unwrap();

        let stored_user = repo.get(user.id()).await.unwrap().unwrap();
        let stored_profile = repo.get_profile(user.id()).await.unwrap().unwrap();
        assert_eq!(stored_user.first_name(), "Chester");
        assert_eq!(stored_profile.image(), "profile_pics/me.png");
    }

    #[tokio::test]
    async fn test_save_account_conflict_leaves_profile_untouched() {
        let repo = InMemoryUserRepository::new();
        let (taken, taken_profile) = create_test_user("taken@django.com");
        let (mut user, mut profile) = create_test_user("mine@django.com");

        repo.create(taken, taken_profile).await.unwrap();
        repo.create(user.clone(), profile.clone()).await.unwrap();

        user.set_email("taken@django.com");
        profile.set_image("profile_pics/new.png");

        assert!(repo.save_account(&user, &profile).await.is_err());

        let stored_profile = repo.get_profile(user.id()).await.unwrap().unwrap();
        assert!(stored_profile.has_default_image());
    }

    #[tokio::test]
    async fn test_list_and_count() {
        let repo = InMemoryUserRepository::new();

        for email in ["one@django.com", "two@django.com"] {
            let (user, profile) = create_test_user(email);
            repo.create(user, profile).await.unwrap();
        }

        assert_eq!(repo.list().await.unwrap().len(), 2);
        assert_eq!(repo.count().await.unwrap(), 2);
    }
}
