//! Profile entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::user::UserId;

/// Placeholder avatar used until the user uploads one
pub const DEFAULT_PROFILE_IMAGE: &str = "default.jpg";

/// Media sub-directory receiving uploaded avatars
pub const PROFILE_UPLOAD_DIR: &str = "profile_pics";

/// Auxiliary per-user record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// Owning user; also the profile's key
    user_id: UserId,
    /// Media-relative path of the avatar
    image: String,
    updated_at: DateTime<Utc>,
}

impl Profile {
    /// Profile with the placeholder avatar
    pub fn new_default(user_id: UserId) -> Self {
        Self {
            user_id,
            image: DEFAULT_PROFILE_IMAGE.to_string(),
            updated_at: Utc::now(),
        }
    }

    pub fn restore(user_id: UserId, image: String, updated_at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            image,
            updated_at,
        }
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn has_default_image(&self) -> bool {
        self.image == DEFAULT_PROFILE_IMAGE
    }

    /// Public URL of the avatar under the given media URL prefix
    pub fn image_url(&self, media_url: &str) -> String {
        format!("{}/{}", media_url.trim_end_matches('/'), self.image)
    }

    /// Point the profile at a new avatar
    pub fn set_image(&mut self, image: impl Into<String>) {
        self.image = image.into();
        self.updated_at = Utc::now();
    }
}
