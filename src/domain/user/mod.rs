//! User domain
//!
//! This module provides domain types and traits for email-based
//! authentication: the user entity, field validation, and the repository
//! trait.

mod entity;
mod repository;
mod validation;

pub use entity::{ExtraFields, User, UserId};
pub use repository::UserRepository;
pub use validation::{
    normalize_email, validate_email, validate_name, validate_password, validate_password_pair,
    UserValidationError, MAX_NAME_LENGTH,
};
