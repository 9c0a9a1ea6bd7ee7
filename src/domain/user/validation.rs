//! User validation utilities

use thiserror::Error;
use validator::ValidateEmail;

/// Errors that can occur during user validation
///
/// The display strings are the messages shown next to form fields.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum UserValidationError {
    #[error("This field is required.")]
    Required,

    #[error("Enter a valid email address.")]
    InvalidEmail,

    #[error("Ensure this value has at most {0} characters.")]
    TooLong(usize),

    #[error("This password is too short. It must contain at least {0} characters.")]
    PasswordTooShort(usize),

    #[error("Ensure this value has at most {0} characters.")]
    PasswordTooLong(usize),

    #[error("This password is entirely numeric.")]
    PasswordEntirelyNumeric,

    #[error("The two password fields didn't match.")]
    PasswordMismatch,
}

pub const MAX_EMAIL_LENGTH: usize = 254;
pub const MAX_NAME_LENGTH: usize = 150;
const MIN_PASSWORD_LENGTH: usize = 8;
const MAX_PASSWORD_LENGTH: usize = 128;

/// Normalize an email address by lowercasing its domain part
///
/// The local part is kept as entered; mailbox names may be case-sensitive.
pub fn normalize_email(email: &str) -> String {
    let email = email.trim();

    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{}@{}", local, domain.to_lowercase()),
        None => email.to_string(),
    }
}

/// Validate an email address
///
/// Rules:
/// - Cannot be empty
/// - Maximum 254 characters
/// - Must be a syntactically valid address
pub fn validate_email(email: &str) -> Result<(), UserValidationError> {
    let email = email.trim();

    if email.is_empty() {
        return Err(UserValidationError::Required);
    }

    if email.len() > MAX_EMAIL_LENGTH {
        return Err(UserValidationError::TooLong(MAX_EMAIL_LENGTH));
    }

    if !email.validate_email() {
        return Err(UserValidationError::InvalidEmail);
    }

    Ok(())
}

/// Validate an optional display name (first or last name)
pub fn validate_name(name: &str) -> Result<(), UserValidationError> {
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(UserValidationError::TooLong(MAX_NAME_LENGTH));
    }

    Ok(())
}

/// Validate a password against the password policy
///
/// Rules:
/// - Minimum 8 characters
/// - Maximum 128 characters
/// - Not made of digits only
///
/// All violations are reported, in rule order.
pub fn validate_password(password: &str) -> Result<(), Vec<UserValidationError>> {
    let mut errors = Vec::new();
    let length = password.chars().count();

    if length < MIN_PASSWORD_LENGTH {
        errors.push(UserValidationError::PasswordTooShort(MIN_PASSWORD_LENGTH));
    }

    if length > MAX_PASSWORD_LENGTH {
        errors.push(UserValidationError::PasswordTooLong(MAX_PASSWORD_LENGTH));
    }

    if !password.is_empty() && password.chars().all(|c| c.is_ascii_digit()) {
        errors.push(UserValidationError::PasswordEntirelyNumeric);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate that both copies of a new password are equal
pub fn validate_password_pair(first: &str, second: &str) -> Result<(), UserValidationError> {
    if first != second {
        return Err(UserValidationError::PasswordMismatch);
    }

    Ok(())
}
