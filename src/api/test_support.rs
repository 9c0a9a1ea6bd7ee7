//! Shared fixtures for HTTP handler tests

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request},
    response::Response,
    Router,
};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use crate::api::cookies::MessageSigner;
use crate::api::state::{AppState, WebSettings};
use crate::config::SiteConfig;
use crate::domain::{ExtraFields, User};
use crate::infrastructure::auth::{
    InMemorySessionRevocations, PasswordResetTokenGenerator, SessionConfig, SessionService,
    DEFAULT_RESET_TIMEOUT_SECS,
};
use crate::infrastructure::mail::InMemoryMailer;
use crate::infrastructure::media::LocalMediaStorage;
use crate::infrastructure::user::{Argon2Hasher, InMemoryUserRepository, UserService};

pub(crate) const TEST_SECRET: &str = "test-secret-key";

/// State wired to in-memory services, plus handles to inspect them
pub(crate) struct TestApp {
    pub state: AppState,
    pub mailer: InMemoryMailer,
    pub media_root: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        let media_root = tempfile::tempdir().unwrap();
        let mailer = InMemoryMailer::new();

        let user_service = UserService::new(
            Arc::new(InMemoryUserRepository::new()),
            Arc::new(Argon2Hasher::new()),
        );

        let state = AppState {
            user_service: Arc::new(user_service),
            sessions: Arc::new(SessionService::new(SessionConfig::new(TEST_SECRET, 24))),
            revoked_sessions: Arc::new(InMemorySessionRevocations::new()),
            reset_tokens: Arc::new(PasswordResetTokenGenerator::new(
                TEST_SECRET,
                DEFAULT_RESET_TIMEOUT_SECS,
            )),
            mailer: Arc::new(mailer.clone()),
            media: Arc::new(LocalMediaStorage::new(media_root.path())),
            message_signer: MessageSigner::new(TEST_SECRET),
            web: WebSettings {
                site: SiteConfig {
                    domain: "testserver".to_string(),
                    scheme: "http".to_string(),
                },
                media_url: "/media/".to_string(),
                secure_cookies: false,
            },
        };

        Self {
            state,
            mailer,
            media_root,
        }
    }

    pub async fn create_user(&self, email: &str, password: &str) -> User {
        self.state
            .user_service
            .create_user(email, password, ExtraFields::with_names("Test", "User"))
            .await
            .unwrap()
    }

    /// Cookie header value for a signed-in user
    pub fn session_for(&self, user: &User) -> String {
        format!("sessionid={}", self.state.sessions.issue(user).unwrap())
    }
}

pub(crate) fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

pub(crate) fn post_form(uri: &str, body: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub(crate) async fn send(router: Router, request: Request<Body>) -> Response {
    router.oneshot(request).await.unwrap()
}

pub(crate) async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub(crate) fn location(response: &Response) -> &str {
    response.headers()[header::LOCATION].to_str().unwrap()
}

/// `name=value` pair of a Set-Cookie header on the response
pub(crate) fn set_cookie(response: &Response, name: &str) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| value.split(';').next())
        .find(|pair| pair.starts_with(&format!("{}=", name)))
        .map(str::to_string)
}
