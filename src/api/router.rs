use std::path::Path;

use axum::{extract::DefaultBodyLimit, middleware, routing::get, Router};
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use super::accounts;
use super::health;
use super::middleware::{
    logging_middleware, metrics_middleware, request_guard_middleware,
    security_headers_middleware, MAX_BODY_SIZE,
};
use super::state::AppState;

/// Create the full router with application state
///
/// Uploaded media under `media_root` is served at the configured media URL.
pub fn create_router_with_state(state: AppState, media_root: &Path) -> Router {
    let media_prefix = state.web.media_url.trim_end_matches('/').to_string();

    let mut router = Router::new()
        // Probes
        .route("/health", get(health::health_check))
        .route("/ready", get(health::ready_check))
        .route("/live", get(health::live_check))
        // Account pages
        .merge(accounts::create_accounts_router());

    if media_prefix.starts_with('/') && media_prefix.len() > 1 {
        router = router.nest_service(&media_prefix, ServeDir::new(media_root));
    }

    router
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .layer(middleware::from_fn(request_guard_middleware))
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(middleware::from_fn(logging_middleware))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

#[cfg(test)]
mod tests {
    use axum::http::{header, StatusCode};

    use super::*;
    use crate::api::test_support::{get, send, TestApp};

    #[tokio::test]
    async fn test_probes() {
        let app = TestApp::new();
        let router = create_router_with_state(app.state.clone(), app.media_root.path());

        for path in ["/health", "/live", "/ready"] {
            let response = send(router.clone(), get(path, None)).await;
            assert_eq!(response.status(), StatusCode::OK, "{}", path);
        }
    }

    #[tokio::test]
    async fn test_pages_carry_security_headers() {
        let app = TestApp::new();
        let router = create_router_with_state(app.state.clone(), app.media_root.path());

        let response = send(router, get("/login/", None)).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-frame-options"], "DENY");
        assert_eq!(response.headers()["x-content-type-options"], "nosniff");
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_serves_uploaded_media() {
        let app = TestApp::new();
        let dir = app.media_root.path().join("profile_pics");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("avatar.png"), b"\x89PNG\r\n\x1a\n").unwrap();

        let router = create_router_with_state(app.state.clone(), app.media_root.path());
        let response = send(router, get("/media/profile_pics/avatar.png", None)).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let app = TestApp::new();
        let router = create_router_with_state(app.state.clone(), app.media_root.path());

        let response = send(router, get("/admin/", None)).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
