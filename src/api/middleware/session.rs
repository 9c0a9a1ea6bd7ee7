//! Session cookie authentication extractors

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
    response::{IntoResponse, Response},
};
use tracing::debug;

use crate::api::cookies::{read_cookie, SESSION_COOKIE};
use crate::api::state::AppState;
use crate::api::types::{ApiError, Redirect};
use crate::domain::user::User;

/// Path of the login page
pub const LOGIN_URL: &str = "/login/";

/// Extractor for the signed-in user, if any
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Option<User>);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(CurrentUser(resolve_session(&parts.headers, state).await?))
    }
}

/// Extractor that requires a signed-in user
///
/// Anonymous callers are redirected to the login page with the requested
/// path in `next`.
#[derive(Debug, Clone)]
pub struct RequireUser(pub User);

impl FromRequestParts<AppState> for RequireUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match resolve_session(&parts.headers, state).await {
            Ok(Some(user)) => Ok(RequireUser(user)),
            Ok(None) => {
                let next = parts
                    .uri
                    .path_and_query()
                    .map(|pq| pq.as_str())
                    .unwrap_or("/");

                Err(Redirect::to(login_url(next)).into_response())
            }
            Err(e) => Err(e.into_response()),
        }
    }
}

/// Login URL carrying the page to return to
pub fn login_url(next: &str) -> String {
    format!(
        "{}?next={}",
        LOGIN_URL,
        urlencoding::encode(next).replace("%2F", "/")
    )
}

/// Resolve the session cookie to an active user whose credentials still match
pub async fn resolve_session(
    headers: &HeaderMap,
    state: &AppState,
) -> Result<Option<User>, ApiError> {
    let Some(token) = read_cookie(headers, SESSION_COOKIE) else {
        return Ok(None);
    };

    let claims = match state.sessions.validate(&token) {
        Ok(claims) => claims,
        Err(e) => {
            debug!("Ignoring session cookie: {}", e);
            return Ok(None);
        }
    };

    if state.revoked_sessions.is_revoked(&claims.jti).await? {
        debug!("Ignoring revoked session");
        return Ok(None);
    }

    let Some(user_id) = claims.user_id() else {
        return Ok(None);
    };

    let Some(user) = state.user_service.get(&user_id).await? else {
        return Ok(None);
    };

    if !user.is_active() || !state.sessions.matches_user(&claims, &user) {
        debug!(user_id = %user.id(), "Session no longer valid for user");
        return Ok(None);
    }

    Ok(Some(user))
}

/// Revoke the session named by the session cookie, if it is valid
pub async fn end_session(headers: &HeaderMap, state: &AppState) -> Result<(), ApiError> {
    let Some(token) = read_cookie(headers, SESSION_COOKIE) else {
        return Ok(());
    };

    let Ok(claims) = state.sessions.validate(&token) else {
        return Ok(());
    };

    state
        .revoked_sessions
        .revoke(&claims.jti, claims.expires_at())
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_url_keeps_slashes() {
        assert_eq!(login_url("/"), "/login/?next=/");
        assert_eq!(login_url("/password_/change/"), "/login/?next=/password_/change/");
    }

    #[test]
    fn test_login_url_encodes_query() {
        assert_eq!(login_url("/profile/?a=1&b=2"), "/login/?next=/profile/%3Fa%3D1%26b%3D2");
    }
}
