//! Registration page

use axum::{
    extract::State,
    response::{IntoResponse, Response},
};
use tracing::info;

use super::forms::{RegisterForm, DUPLICATE_EMAIL_MESSAGE};
use super::HOME_URL;
use crate::api::cookies::Flash;
use crate::api::middleware::{CurrentUser, LOGIN_URL};
use crate::api::state::AppState;
use crate::api::types::{ApiError, Form, Page, Redirect};
use crate::domain::{ExtraFields, FormErrors};
use crate::infrastructure::observability::record_registration;

pub const REGISTERED_MESSAGE: &str =
    "You have been successfully registered, login with your email and password.";

/// Submitted values are echoed back; passwords never are
fn register_page(form: &RegisterForm, errors: FormErrors, flash: Flash) -> Page {
    Page::new("users/register.html")
        .form("register")
        .value("email", form.email.as_str())
        .value("first_name", form.first_name.as_str())
        .value("last_name", form.last_name.as_str())
        .errors(errors)
        .flash(flash)
}

/// Registration form
///
/// GET /register/
pub async fn show_register(CurrentUser(current): CurrentUser, flash: Flash) -> Response {
    if current.is_some() {
        return Redirect::to(HOME_URL).into_response();
    }

    register_page(&RegisterForm::default(), FormErrors::new(), flash).into_response()
}

/// Create an account
///
/// POST /register/
///
/// The new user is not signed in; they are sent to the login page.
pub async fn register(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
    flash: Flash,
    Form(form): Form<RegisterForm>,
) -> Result<Response, ApiError> {
    if current.is_some() {
        return Ok(Redirect::to(HOME_URL).into_response());
    }

    let (registration, mut errors) = match form.validate() {
        Ok(registration) => (Some(registration), FormErrors::new()),
        Err(errors) => (None, errors),
    };

    if errors.get("email").is_empty()
        && state.user_service.get_by_email(&form.email).await?.is_some()
    {
        errors.add("email", DUPLICATE_EMAIL_MESSAGE);
    }

    let Some(registration) = registration.filter(|_| errors.is_empty()) else {
        return Ok(register_page(&form, errors, flash).into_response());
    };

    let extra = ExtraFields::with_names(registration.first_name, registration.last_name);
    let user = match state
        .user_service
        .create_user(&registration.email, &registration.password, extra)
        .await
    {
        Ok(user) => user,
        // Lost a race with a concurrent registration of the same email
        Err(e) if e.is_conflict() => {
            errors.add("email", DUPLICATE_EMAIL_MESSAGE);
            return Ok(register_page(&form, errors, flash).into_response());
        }
        Err(e) => return Err(e.into()),
    };

    record_registration();
    info!(user_id = %user.id(), "User registered");

    Ok(Redirect::to(LOGIN_URL)
        .message(&state.message_signer, REGISTERED_MESSAGE)
        .into_response())
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use super::*;
    use crate::api::accounts::create_accounts_router;
    use crate::api::test_support::*;

    const VALID_BODY: &str = "email=test%40django.com&first_name=Chester&last_name=Bennington\
                              &password1=awesome_django&password2=awesome_django";

    #[tokio::test]
    async fn test_register_page() {
        let app = TestApp::new();
        let router = create_accounts_router().with_state(app.state.clone());

        let response = send(router, get("/register/", None)).await;

        assert_eq!(response.status(), StatusCode::OK);
        let page = body_json(response).await;
        assert_eq!(page["template"], "users/register.html");
        assert_eq!(page["form"], "register");
    }

    #[tokio::test]
    async fn test_register_creates_user_and_profile() {
        let app = TestApp::new();
        let router = create_accounts_router().with_state(app.state.clone());

        let response = send(router.clone(), post_form("/register/", VALID_BODY, None)).await;

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(location(&response), "/login/");
        assert!(set_cookie(&response, "sessionid").is_none());

        let user = app
            .state
            .user_service
            .get_by_email("test@django.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(user.first_name(), "Chester");
        assert!(!user.is_staff());

        let profile = app.state.user_service.get_profile(user.id()).await.unwrap();
        assert!(profile.unwrap().has_default_image());

        // The flash message shows on the login page
        let messages = set_cookie(&response, "messages").unwrap();
        let response = send(router, get("/login/", Some(&messages))).await;
        let page = body_json(response).await;
        assert_eq!(page["messages"][0], REGISTERED_MESSAGE);
    }

    #[tokio::test]
    async fn test_register_duplicate_email() {
        let app = TestApp::new();
        app.create_user("test@django.com", "django123").await;
        let router = create_accounts_router().with_state(app.state.clone());

        let response = send(router, post_form("/register/", VALID_BODY, None)).await;

        assert_eq!(response.status(), StatusCode::OK);
        let page = body_json(response).await;
        assert_eq!(page["errors"]["email"][0], DUPLICATE_EMAIL_MESSAGE);
        assert_eq!(app.state.user_service.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_register_password_mismatch_keeps_input() {
        let app = TestApp::new();
        let router = create_accounts_router().with_state(app.state.clone());

        let body = "email=test%40django.com&first_name=Chester&last_name=Bennington\
                    &password1=awesome_django&password2=awesome_rails";
        let response = send(router, post_form("/register/", body, None)).await;

        assert_eq!(response.status(), StatusCode::OK);
        let page = body_json(response).await;
        assert_eq!(
            page["errors"]["password2"][0],
            "The two password fields didn't match."
        );
        assert_eq!(page["values"]["first_name"], "Chester");
        assert!(page["values"].get("password1").is_none());
        assert_eq!(app.state.user_service.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_register_missing_fields() {
        let app = TestApp::new();
        let router = create_accounts_router().with_state(app.state.clone());

        let response = send(router, post_form("/register/", "", None)).await;

        assert_eq!(response.status(), StatusCode::OK);
        let page = body_json(response).await;
        for field in ["email", "first_name", "password1", "password2"] {
            assert_eq!(page["errors"][field][0], "This field is required.");
        }
    }

    #[tokio::test]
    async fn test_register_redirects_authenticated_user() {
        let app = TestApp::new();
        let user = app.create_user("test@django.com", "django123").await;
        let cookie = app.session_for(&user);
        let router = create_accounts_router().with_state(app.state.clone());

        let response = send(router.clone(), get("/register/", Some(&cookie))).await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(location(&response), "/");

        let response = send(router, post_form("/register/", VALID_BODY, Some(&cookie))).await;
        assert_eq!(location(&response), "/");
        assert_eq!(app.state.user_service.count().await.unwrap(), 1);
    }
}
