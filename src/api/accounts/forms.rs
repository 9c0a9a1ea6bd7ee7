//! Account form payloads and their field validation
//!
//! Each form validates its own fields into `FormErrors`; checks that need
//! stored state (duplicate email, current password) are added by the
//! handlers on top.

use serde::Deserialize;

use crate::domain::user::{
    normalize_email, validate_email, validate_name, validate_password, validate_password_pair,
    UserValidationError,
};
use crate::domain::FormErrors;

/// Non-field error for a failed login
pub const INVALID_LOGIN_MESSAGE: &str =
    "Please enter a correct email and password. Note that both fields may be case-sensitive.";

/// Field error for an email that is already registered
pub const DUPLICATE_EMAIL_MESSAGE: &str = "User with this Email address already exists.";

/// Field error for a wrong current password
pub const INCORRECT_OLD_PASSWORD_MESSAGE: &str =
    "Your old password was entered incorrectly. Please enter it again.";

fn required(errors: &mut FormErrors, field: &str, value: &str) -> bool {
    if value.trim().is_empty() {
        errors.add(field, UserValidationError::Required.to_string());
        false
    } else {
        true
    }
}

fn check_email(errors: &mut FormErrors, field: &str, email: &str) {
    if let Err(e) = validate_email(email) {
        errors.add(field, e.to_string());
    }
}

fn check_name(errors: &mut FormErrors, field: &str, name: &str) {
    if let Err(e) = validate_name(name) {
        errors.add(field, e.to_string());
    }
}

/// Mismatch first; the policy is only applied to a confirmed password
fn check_new_password(errors: &mut FormErrors, field: &str, first: &str, second: &str) {
    if let Err(e) = validate_password_pair(first, second) {
        errors.add(field, e.to_string());
        return;
    }

    if let Err(violations) = validate_password(second) {
        for violation in violations {
            errors.add(field, violation.to_string());
        }
    }
}

/// Registration form
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RegisterForm {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password1: String,
    pub password2: String,
}

/// Cleaned registration data
#[derive(Debug, Clone)]
pub struct Registration {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

impl RegisterForm {
    pub fn validate(&self) -> Result<Registration, FormErrors> {
        let mut errors = FormErrors::new();

        if required(&mut errors, "email", &self.email) {
            check_email(&mut errors, "email", &self.email);
        }

        if required(&mut errors, "first_name", &self.first_name) {
            check_name(&mut errors, "first_name", &self.first_name);
        }
        check_name(&mut errors, "last_name", &self.last_name);

        let has_password1 = required(&mut errors, "password1", &self.password1);
        let has_password2 = required(&mut errors, "password2", &self.password2);

        if has_password1 && has_password2 {
            check_new_password(&mut errors, "password2", &self.password1, &self.password2);
        }

        errors.into_result(Registration {
            email: normalize_email(&self.email),
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            password: self.password1.clone(),
        })
    }
}

/// Login form; `username` carries the email, `email` is accepted as an alias
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub next: Option<String>,
}

impl LoginForm {
    /// The submitted email, whichever field carried it
    pub fn login(&self) -> &str {
        if self.username.trim().is_empty() {
            self.email.trim()
        } else {
            self.username.trim()
        }
    }

    pub fn validate(&self) -> Result<(), FormErrors> {
        let mut errors = FormErrors::new();

        required(&mut errors, "username", self.login());
        required(&mut errors, "password", &self.password);

        errors.into_result(())
    }
}

/// Password change form
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PasswordChangeForm {
    pub old_password: String,
    pub new_password1: String,
    pub new_password2: String,
}

impl PasswordChangeForm {
    /// Field checks; the old password is verified by the handler
    pub fn validate(&self) -> FormErrors {
        let mut errors = FormErrors::new();

        required(&mut errors, "old_password", &self.old_password);
        let has_new1 = required(&mut errors, "new_password1", &self.new_password1);
        let has_new2 = required(&mut errors, "new_password2", &self.new_password2);

        if has_new1 && has_new2 {
            check_new_password(
                &mut errors,
                "new_password2",
                &self.new_password1,
                &self.new_password2,
            );
        }

        errors
    }
}

/// New password form used by the reset confirmation page
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SetPasswordForm {
    pub new_password1: String,
    pub new_password2: String,
}

impl SetPasswordForm {
    pub fn validate(&self) -> Result<String, FormErrors> {
        let mut errors = FormErrors::new();

        let has_new1 = required(&mut errors, "new_password1", &self.new_password1);
        let has_new2 = required(&mut errors, "new_password2", &self.new_password2);

        if has_new1 && has_new2 {
            check_new_password(
                &mut errors,
                "new_password2",
                &self.new_password1,
                &self.new_password2,
            );
        }

        errors.into_result(self.new_password1.clone())
    }
}

/// Password reset request form
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PasswordResetForm {
    pub email: String,
}

impl PasswordResetForm {
    pub fn validate(&self) -> Result<String, FormErrors> {
        let mut errors = FormErrors::new();

        if required(&mut errors, "email", &self.email) {
            check_email(&mut errors, "email", &self.email);
        }

        errors.into_result(normalize_email(&self.email))
    }
}

/// User part of the profile edit form
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UserUpdateForm {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl UserUpdateForm {
    pub fn validate(&self) -> Result<UserUpdateForm, FormErrors> {
        let mut errors = FormErrors::new();

        if required(&mut errors, "email", &self.email) {
            check_email(&mut errors, "email", &self.email);
        }
        check_name(&mut errors, "first_name", &self.first_name);
        check_name(&mut errors, "last_name", &self.last_name);

        errors.into_result(UserUpdateForm {
            email: normalize_email(&self.email),
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
        })
    }
}
