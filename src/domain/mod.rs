//! Domain layer - Core business logic and entities

pub mod error;
pub mod form;
pub mod profile;
pub mod user;

pub use error::DomainError;
pub use form::{FormErrors, NON_FIELD_ERRORS};
pub use profile::{Profile, DEFAULT_PROFILE_IMAGE, PROFILE_UPLOAD_DIR};
pub use user::{ExtraFields, User, UserId, UserRepository};
