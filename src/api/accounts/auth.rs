//! Login, logout and the landing page

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::{debug, info};

use super::forms::{LoginForm, INVALID_LOGIN_MESSAGE};
use super::{safe_next, HOME_URL};
use crate::api::cookies::{expired_cookie, session_cookie, Flash, SESSION_COOKIE};
use crate::api::middleware::{end_session, CurrentUser, RequireUser};
use crate::api::state::AppState;
use crate::api::types::{ApiError, Form, Page, Redirect};
use crate::domain::FormErrors;
use crate::infrastructure::observability::record_login;

pub const LOGIN_MESSAGE: &str = "You are successfully logged in.";

/// `?next=` on login links
#[derive(Debug, Default, Deserialize)]
pub struct NextQuery {
    #[serde(default)]
    pub next: Option<String>,
}

fn login_page(login: &str, next: Option<&str>, errors: FormErrors, flash: Flash) -> Page {
    let mut page = Page::new("users/login.html")
        .form("login")
        .value("username", login)
        .errors(errors)
        .flash(flash);

    if let Some(next) = next {
        page = page.context("next", next);
    }

    page
}

/// Landing page
///
/// GET /
pub async fn index(RequireUser(user): RequireUser, flash: Flash) -> Page {
    Page::new("index.html").user(&user).flash(flash)
}

/// Login form
///
/// GET /login/
pub async fn show_login(
    CurrentUser(current): CurrentUser,
    Query(query): Query<NextQuery>,
    flash: Flash,
) -> Response {
    if current.is_some() {
        return Redirect::to(HOME_URL).into_response();
    }

    login_page("", query.next.as_deref(), FormErrors::new(), flash).into_response()
}

/// Authenticate and start a session
///
/// POST /login/
///
/// Sets the session cookie and redirects to a safe `next` or the landing page.
pub async fn login(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
    Query(query): Query<NextQuery>,
    flash: Flash,
    Form(form): Form<LoginForm>,
) -> Result<Response, ApiError> {
    if current.is_some() {
        return Ok(Redirect::to(HOME_URL).into_response());
    }

    let next = form.next.clone().filter(|n| !n.is_empty()).or(query.next);

    if let Err(errors) = form.validate() {
        return Ok(login_page(form.login(), next.as_deref(), errors, flash).into_response());
    }

    let Some(user) = state
        .user_service
        .authenticate(form.login(), &form.password)
        .await?
    else {
        record_login(false);
        debug!("Login rejected");

        let mut errors = FormErrors::new();
        errors.add_non_field(INVALID_LOGIN_MESSAGE);
        return Ok(login_page(form.login(), next.as_deref(), errors, flash).into_response());
    };

    record_login(true);
    info!(user_id = %user.id(), "User logged in");

    let token = state.sessions.issue(&user)?;
    let max_age = state.sessions.expiration_hours() * 3600;

    Ok(Redirect::to(safe_next(next.as_deref()))
        .cookie(session_cookie(&token, max_age, state.web.secure_cookies))
        .message(&state.message_signer, LOGIN_MESSAGE)
        .into_response())
}

/// End the session
///
/// GET|POST /logout/
///
/// The session token is revoked as well as cleared, so a copy of the cookie
/// no longer signs anyone in.
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
    CurrentUser(current): CurrentUser,
    flash: Flash,
) -> Result<Page, ApiError> {
    end_session(&headers, &state).await?;

    if let Some(user) = current {
        info!(user_id = %user.id(), "User logged out");
    }

    Ok(Page::new("registration/logged_out.html")
        .cookie(expired_cookie(SESSION_COOKIE))
        .flash(flash))
}
