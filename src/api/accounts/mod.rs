//! Account pages
//!
//! Registration, session login/logout, password change and reset, and the
//! profile editor. Every page answers with a JSON page document; successful
//! form posts redirect and carry a flash message to the next page.

pub mod auth;
pub mod forms;
pub mod password;
pub mod profile;
pub mod register;

use axum::{routing::get, Router};

use crate::api::state::AppState;

pub const HOME_URL: &str = "/";
pub const PROFILE_URL: &str = "/profile/";
pub const PASSWORD_CHANGE_DONE_URL: &str = "/password_/change/done/";
pub const PASSWORD_RESET_DONE_URL: &str = "/password_/reset/done/";
pub const PASSWORD_RESET_COMPLETE_URL: &str = "/password_/reset/complete/";

/// Create the account pages router
pub fn create_accounts_router() -> Router<AppState> {
    Router::new()
        .route("/", get(auth::index))
        .route("/login/", get(auth::show_login).post(auth::login))
        .route("/logout/", get(auth::logout).post(auth::logout))
        .route(
            "/register/",
            get(register::show_register).post(register::register),
        )
        .route(
            "/profile/",
            get(profile::show_profile).post(profile::update_profile),
        )
        .route(
            "/password_/change/",
            get(password::show_change).post(password::change_password),
        )
        .route("/password_/change/done/", get(password::change_done))
        .route(
            "/password_/reset/",
            get(password::show_reset).post(password::request_reset),
        )
        .route("/password_/reset/done/", get(password::reset_done))
        .route(
            "/password_/new/{uidb64}/{token}/",
            get(password::show_confirm).post(password::confirm_reset),
        )
        .route("/password_/reset/complete/", get(password::reset_complete))
}

/// Redirect target for a user-supplied `next`; only same-site paths pass
pub fn safe_next(next: Option<&str>) -> String {
    match next {
        Some(path)
            if path.starts_with('/')
                && !path.starts_with("//")
                && !path.starts_with("/\\")
                && !path.chars().any(char::is_control) =>
        {
            path.to_string()
        }
        _ => HOME_URL.to_string(),
    }
}
