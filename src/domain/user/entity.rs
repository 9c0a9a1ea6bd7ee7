//! User entity and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User identifier (primary key)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    /// Generate a fresh random identifier
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Parse an identifier from its hyphenated text form
    pub fn parse(id: &str) -> Option<Self> {
        Uuid::parse_str(id).ok().map(Self)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Optional attributes supplied when creating a user
///
/// Flags left as `None` take the defaults of the creation variant in use.
#[derive(Debug, Clone, Default)]
pub struct ExtraFields {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_active: Option<bool>,
    pub is_staff: Option<bool>,
    pub is_superuser: Option<bool>,
}

impl ExtraFields {
    pub fn with_names(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            first_name: Some(first_name.into()),
            last_name: Some(last_name.into()),
            ..Self::default()
        }
    }
}

/// User entity keyed by email
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Primary key
    id: UserId,
    /// Login credential, unique across users
    email: String,
    /// Argon2 password hash - never exposed in serialization.
    /// Empty means the account has no usable password.
    #[serde(skip_serializing, default)]
    password_hash: String,
    /// Stable external reference, distinct from the primary key
    unique_id: String,
    first_name: String,
    last_name: String,
    is_active: bool,
    is_staff: bool,
    is_superuser: bool,
    date_joined: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_login: Option<DateTime<Utc>>,
}

impl User {
    /// Create a new user with default flags (active, not staff, not superuser)
    pub fn new(email: impl Into<String>, password_hash: impl Into<String>) -> Self {
        let now = Utc::now();

        Self {
            id: UserId::generate(),
            email: email.into(),
            password_hash: password_hash.into(),
            unique_id: Uuid::new_v4().to_string(),
            first_name: String::new(),
            last_name: String::new(),
            is_active: true,
            is_staff: false,
            is_superuser: false,
            date_joined: now,
            updated_at: now,
            last_login: None,
        }
    }

    /// Apply creation-time extra fields
    pub fn with_extra(mut self, extra: &ExtraFields) -> Self {
        if let Some(first_name) = &extra.first_name {
            self.first_name = first_name.clone();
        }
        if let Some(last_name) = &extra.last_name {
            self.last_name = last_name.clone();
        }
        if let Some(is_active) = extra.is_active {
            self.is_active = is_active;
        }
        if let Some(is_staff) = extra.is_staff {
            self.is_staff = is_staff;
        }
        if let Some(is_superuser) = extra.is_superuser {
            self.is_superuser = is_superuser;
        }
        self
    }

    /// Rebuild a user from persisted columns
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        id: UserId,
        email: String,
        password_hash: String,
        unique_id: String,
        first_name: String,
        last_name: String,
        flags: (bool, bool, bool),
        date_joined: DateTime<Utc>,
        updated_at: DateTime<Utc>,
        last_login: Option<DateTime<Utc>>,
    ) -> Self {
        let (is_active, is_staff, is_superuser) = flags;

        Self {
            id,
            email,
            password_hash,
            unique_id,
            first_name,
            last_name,
            is_active,
            is_staff,
            is_superuser,
            date_joined,
            updated_at,
            last_login,
        }
    }

    // Getters

    pub fn id(&self) -> &UserId {
        &self.id
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn password_hash(&self) -> &str {
        &self.password_hash
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    pub fn last_name(&self) -> &str {
        &self.last_name
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn is_staff(&self) -> bool {
        self.is_staff
    }

    pub fn is_superuser(&self) -> bool {
        self.is_superuser
    }

    pub fn date_joined(&self) -> DateTime<Utc> {
        self.date_joined
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn last_login(&self) -> Option<DateTime<Utc>> {
        self.last_login
    }

    /// Whether the account can authenticate with a password at all
    pub fn has_usable_password(&self) -> bool {
        !self.password_hash.is_empty()
    }

    /// "First Last", trimmed
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    // Mutators

    pub fn set_email(&mut self, email: impl Into<String>) {
        self.email = email.into();
        self.touch();
    }

    pub fn set_names(&mut self, first_name: impl Into<String>, last_name: impl Into<String>) {
        self.first_name = first_name.into();
        self.last_name = last_name.into();
        self.touch();
    }

    pub fn set_password_hash(&mut self, password_hash: impl Into<String>) {
        self.password_hash = password_hash.into();
        self.touch();
    }

    /// Mark the password as unusable
    pub fn set_unusable_password(&mut self) {
        self.password_hash.clear();
        self.touch();
    }

    pub fn set_active(&mut self, is_active: bool) {
        self.is_active = is_active;
        self.touch();
    }

    /// Record a login
    pub fn record_login(&mut self) {
        self.last_login = Some(Utc::now());
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl std::fmt::Display for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.email)
    }
}
