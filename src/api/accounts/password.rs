//! Password change and password reset pages

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use tracing::{debug, error, info};

use super::forms::{
    PasswordChangeForm, PasswordResetForm, SetPasswordForm, INCORRECT_OLD_PASSWORD_MESSAGE,
};
use super::{PASSWORD_CHANGE_DONE_URL, PASSWORD_RESET_COMPLETE_URL, PASSWORD_RESET_DONE_URL};
use crate::api::cookies::{session_cookie, Flash};
use crate::api::middleware::RequireUser;
use crate::api::state::AppState;
use crate::api::types::{ApiError, Form, Page, Redirect};
use crate::domain::{DomainError, FormErrors, User};
use crate::infrastructure::auth::{decode_uid, encode_uid};
use crate::infrastructure::mail::EmailMessage;
use crate::infrastructure::observability::record_password_reset_requested;

pub const PASSWORD_CHANGED_MESSAGE: &str = "Your password has been successfully changed.";
pub const PASSWORD_SET_MESSAGE: &str =
    "Your new password has been set, login with email and new password.";

fn change_page(user: &User, errors: FormErrors, flash: Flash) -> Page {
    Page::new("registration/password_change_form.html")
        .form("password_change")
        .user(user)
        .errors(errors)
        .flash(flash)
}

fn confirm_page(validlink: bool, errors: FormErrors, flash: Flash) -> Page {
    let page = Page::new("registration/password_reset_confirm.html")
        .context("validlink", validlink)
        .errors(errors)
        .flash(flash);

    if validlink {
        page.form("set_password")
    } else {
        page
    }
}

/// Password change form
///
/// GET /password_/change/
pub async fn show_change(RequireUser(user): RequireUser, flash: Flash) -> Page {
    change_page(&user, FormErrors::new(), flash)
}

/// Change the signed-in user's password
///
/// POST /password_/change/
///
/// The session cookie is re-issued so the current session survives the new
/// password hash; other sessions of the user end.
pub async fn change_password(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    flash: Flash,
    Form(form): Form<PasswordChangeForm>,
) -> Result<Response, ApiError> {
    let mut errors = form.validate();

    if !errors.is_empty() {
        if errors.get("old_password").is_empty()
            && !state.user_service.check_password(&user, &form.old_password)
        {
            errors.add("old_password", INCORRECT_OLD_PASSWORD_MESSAGE);
        }
        return Ok(change_page(&user, errors, flash).into_response());
    }

    let updated = match state
        .user_service
        .change_password(user.id(), &form.old_password, &form.new_password1)
        .await
    {
        Ok(updated) => updated,
        Err(DomainError::Credential { .. }) => {
            errors.add("old_password", INCORRECT_OLD_PASSWORD_MESSAGE);
            return Ok(change_page(&user, errors, flash).into_response());
        }
        Err(e) => return Err(e.into()),
    };

    let token = state.sessions.issue(&updated)?;
    let max_age = state.sessions.expiration_hours() * 3600;

    Ok(Redirect::to(PASSWORD_CHANGE_DONE_URL)
        .cookie(session_cookie(&token, max_age, state.web.secure_cookies))
        .message(&state.message_signer, PASSWORD_CHANGED_MESSAGE)
        .into_response())
}

/// GET /password_/change/done/
pub async fn change_done(RequireUser(user): RequireUser, flash: Flash) -> Page {
    Page::new("registration/password_change_done.html")
        .user(&user)
        .flash(flash)
}

/// Password reset request form
///
/// GET /password_/reset/
pub async fn show_reset(flash: Flash) -> Page {
    Page::new("registration/password_reset_form.html")
        .form("password_reset")
        .flash(flash)
}

/// Email a reset link
///
/// POST /password_/reset/
///
/// Always redirects to the done page once the email is well formed, so the
/// response does not reveal whether an account exists.
pub async fn request_reset(
    State(state): State<AppState>,
    flash: Flash,
    Form(form): Form<PasswordResetForm>,
) -> Result<Response, ApiError> {
    let email = match form.validate() {
        Ok(email) => email,
        Err(errors) => {
            return Ok(Page::new("registration/password_reset_form.html")
                .form("password_reset")
                .value("email", form.email.as_str())
                .errors(errors)
                .flash(flash)
                .into_response());
        }
    };

    let mut sent = 0;

    for user in state.user_service.find_by_email_iexact(&email).await? {
        if !user.is_active() || !user.has_usable_password() {
            debug!(user_id = %user.id(), "Skipping reset for inactive or passwordless user");
            continue;
        }

        let token = state.reset_tokens.make_token(&user)?;
        let path = format!("/password_/new/{}/{}/", encode_uid(user.id()), token);
        let link = state.web.site.absolute_url(&path);

        let message = EmailMessage::password_reset(user.email(), &state.web.site.domain, &link);

        match state.mailer.send(message).await {
            Ok(()) => {
                sent += 1;
                info!(user_id = %user.id(), "Password reset email sent");
            }
            Err(e) => error!(user_id = %user.id(), error = %e, "Failed to send password reset email"),
        }
    }

    record_password_reset_requested(sent);

    Ok(Redirect::to(PASSWORD_RESET_DONE_URL).into_response())
}

/// GET /password_/reset/done/
pub async fn reset_done(flash: Flash) -> Page {
    Page::new("registration/password_reset_done.html").flash(flash)
}

/// User a reset link points at, if the link is still valid
async fn resolve_reset_link(
    state: &AppState,
    uidb64: &str,
    token: &str,
) -> Result<Option<User>, ApiError> {
    let Some(user_id) = decode_uid(uidb64) else {
        return Ok(None);
    };

    let Some(user) = state.user_service.get(&user_id).await? else {
        return Ok(None);
    };

    if !state.reset_tokens.check_token(&user, token) {
        debug!(user_id = %user.id(), "Rejected password reset token");
        return Ok(None);
    }

    Ok(Some(user))
}

/// New password form behind a reset link
///
/// GET /password_/new/{uidb64}/{token}/
pub async fn show_confirm(
    State(state): State<AppState>,
    Path((uidb64, token)): Path<(String, String)>,
    flash: Flash,
) -> Result<Page, ApiError> {
    let validlink = resolve_reset_link(&state, &uidb64, &token).await?.is_some();
    Ok(confirm_page(validlink, FormErrors::new(), flash))
}

/// Set a new password through a reset link
///
/// POST /password_/new/{uidb64}/{token}/
///
/// Setting the password changes the hash the token is bound to, so the link
/// stops working afterwards.
pub async fn confirm_reset(
    State(state): State<AppState>,
    Path((uidb64, token)): Path<(String, String)>,
    flash: Flash,
    Form(form): Form<SetPasswordForm>,
) -> Result<Response, ApiError> {
    let Some(user) = resolve_reset_link(&state, &uidb64, &token).await? else {
        return Ok(confirm_page(false, FormErrors::new(), flash).into_response());
    };

    let new_password = match form.validate() {
        Ok(new_password) => new_password,
        Err(errors) => return Ok(confirm_page(true, errors, flash).into_response()),
    };

    state.user_service.set_password(user.id(), &new_password).await?;
    info!(user_id = %user.id(), "Password reset completed");

    Ok(Redirect::to(PASSWORD_RESET_COMPLETE_URL)
        .message(&state.message_signer, PASSWORD_SET_MESSAGE)
        .into_response())
}

/// GET /password_/reset/complete/
pub async fn reset_complete(flash: Flash) -> Page {
    Page::new("registration/password_reset_complete.html").flash(flash)
}
