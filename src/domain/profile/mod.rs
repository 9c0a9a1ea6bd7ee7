//! Profile domain
//!
//! One profile per user, holding the avatar reference. Profiles are created
//! together with their user and removed with it.

mod entity;

pub use entity::{Profile, DEFAULT_PROFILE_IMAGE, PROFILE_UPLOAD_DIR};
