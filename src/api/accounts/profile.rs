//! Profile editor: account fields and avatar upload

use axum::{
    extract::{FromRequest, Multipart, Request, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
    Form as AxumForm,
};
use bytes::Bytes;
use tracing::{debug, info, warn};

use super::forms::{UserUpdateForm, DUPLICATE_EMAIL_MESSAGE};
use super::PROFILE_URL;
use crate::api::cookies::Flash;
use crate::api::middleware::RequireUser;
use crate::api::state::AppState;
use crate::api::types::{ApiError, Page, Redirect};
use crate::domain::{FormErrors, Profile, User, PROFILE_UPLOAD_DIR};
use crate::infrastructure::media::{is_valid_image, INVALID_IMAGE_MESSAGE};

pub const PROFILE_UPDATED_MESSAGE: &str = "Your account has been updated!";

/// Uploaded file from a multipart body
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub content: Bytes,
}

/// Profile edit submission, multipart or urlencoded
#[derive(Debug, Clone, Default)]
pub struct ProfileSubmission {
    pub form: UserUpdateForm,
    pub image: Option<Upload>,
}

fn is_multipart(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("multipart/form-data"))
}

impl<S> FromRequest<S> for ProfileSubmission
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if !is_multipart(req.headers()) {
            let AxumForm(form) = AxumForm::<UserUpdateForm>::from_request(req, state)
                .await
                .map_err(|e| ApiError::bad_request(e.body_text()).with_code("form_parse_error"))?;

            return Ok(Self { form, image: None });
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()).with_code("form_parse_error"))?;

        let mut submission = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()).with_code("form_parse_error"))?
        {
            let name = field.name().unwrap_or_default().to_string();

            if name == "image" {
                let filename = field.file_name().unwrap_or_default().to_string();
                let content = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(e.body_text()))?;

                // Browsers send an empty part when no file was chosen
                if !filename.is_empty() {
                    submission.image = Some(Upload { filename, content });
                }
                continue;
            }

            let value = field
                .text()
                .await
                .map_err(|e| ApiError::bad_request(e.body_text()))?;

            match name.as_str() {
                "email" => submission.form.email = value,
                "first_name" => submission.form.first_name = value,
                "last_name" => submission.form.last_name = value,
                _ => {}
            }
        }

        Ok(submission)
    }
}

fn profile_page(
    state: &AppState,
    user: &User,
    profile: &Profile,
    form: &UserUpdateForm,
    errors: FormErrors,
    flash: Flash,
) -> Page {
    Page::new("profile.html")
        .form("profile")
        .user(user)
        .value("email", form.email.as_str())
        .value("first_name", form.first_name.as_str())
        .value("last_name", form.last_name.as_str())
        .context("image", profile.image())
        .context("image_url", profile.image_url(&state.web.media_url))
        .errors(errors)
        .flash(flash)
}

async fn load_profile(state: &AppState, user: &User) -> Result<Profile, ApiError> {
    state
        .user_service
        .get_profile(user.id())
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Profile for user '{}' not found", user.id())))
}

/// Remove an upload whose profile was never saved
async fn discard_upload(state: &AppState, name: &str) {
    if let Err(e) = state.media.delete(name).await {
        warn!(name = %name, error = %e, "Failed to discard unsaved upload");
    }
}

/// Profile page with the current account values
///
/// GET /profile/
pub async fn show_profile(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    flash: Flash,
) -> Result<Page, ApiError> {
    let profile = load_profile(&state, &user).await?;

    let current = UserUpdateForm {
        email: user.email().to_string(),
        first_name: user.first_name().to_string(),
        last_name: user.last_name().to_string(),
    };

    Ok(profile_page(&state, &user, &profile, &current, FormErrors::new(), flash))
}

/// Update account fields and optionally replace the avatar
///
/// POST /profile/
///
/// Account fields and the upload are validated independently and their
/// errors reported together; nothing is written unless both pass.
pub async fn update_profile(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    flash: Flash,
    submission: ProfileSubmission,
) -> Result<Response, ApiError> {
    let profile = load_profile(&state, &user).await?;
    let ProfileSubmission { form, image } = submission;

    let (cleaned, mut errors) = match form.validate() {
        Ok(cleaned) => (Some(cleaned), FormErrors::new()),
        Err(errors) => (None, errors),
    };

    if let Some(cleaned) = &cleaned {
        if cleaned.email != user.email() {
            let taken = state
                .user_service
                .get_by_email(&cleaned.email)
                .await?
                .is_some_and(|other| other.id() != user.id());

            if taken {
                errors.add("email", DUPLICATE_EMAIL_MESSAGE);
            }
        }
    }

    if let Some(upload) = &image {
        if !is_valid_image(&upload.filename, &upload.content) {
            debug!(user_id = %user.id(), filename = %upload.filename, "Rejected avatar upload");
            errors.add("image", INVALID_IMAGE_MESSAGE);
        }
    }

    let Some(cleaned) = cleaned.filter(|_| errors.is_empty()) else {
        return Ok(profile_page(&state, &user, &profile, &form, errors, flash).into_response());
    };

    let mut updated_user = user.clone();
    updated_user.set_email(cleaned.email.as_str());
    updated_user.set_names(cleaned.first_name.as_str(), cleaned.last_name.as_str());

    let mut updated_profile = profile.clone();
    let mut stored_image = None;
    if let Some(upload) = image {
        let name = state
            .media
            .save(PROFILE_UPLOAD_DIR, &upload.filename, &upload.content)
            .await?;
        updated_profile.set_image(name.as_str());
        stored_image = Some(name);
    }

    let saved = state
        .user_service
        .update_account(&updated_user, &updated_profile)
        .await;

    if let Err(e) = saved {
        if let Some(name) = &stored_image {
            discard_upload(&state, name).await;
        }

        if e.is_conflict() {
            errors.add("email", DUPLICATE_EMAIL_MESSAGE);
            return Ok(profile_page(&state, &user, &profile, &form, errors, flash).into_response());
        }
        return Err(e.into());
    }

    info!(user_id = %user.id(), "Profile updated");

    Ok(Redirect::to(PROFILE_URL)
        .message(&state.message_signer, PROFILE_UPDATED_MESSAGE)
        .into_response())
}
