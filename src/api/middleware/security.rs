//! Security middleware for HTTP headers and request validation

use axum::{
    body::Body,
    http::{header, HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::api::types::ApiError;

/// Maximum request body size, bounding avatar uploads (10 MB)
pub const MAX_BODY_SIZE: usize = 10 * 1024 * 1024;

/// Middleware to add security headers to all responses
pub async fn security_headers_middleware(request: Request<Body>, next: Next) -> Response {
    let is_media = request.uri().path().starts_with("/media/");
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(
        header::REFERRER_POLICY,
        HeaderValue::from_static("same-origin"),
    );
    headers.insert(
        header::CONTENT_SECURITY_POLICY,
        HeaderValue::from_static("default-src 'none'; img-src 'self'; frame-ancestors 'none'"),
    );

    // Account pages carry personal data; media may be cached
    if !is_media && !headers.contains_key(header::CACHE_CONTROL) {
        headers.insert(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store, no-cache, must-revalidate"),
        );
    }

    response
}

/// Middleware rejecting path traversal and null bytes before routing
pub async fn request_guard_middleware(request: Request<Body>, next: Next) -> Response {
    if let Err(e) = validate_request_path(request.uri().path()) {
        return e.into_response();
    }

    next.run(request).await
}

/// Validate a request path for common injection attempts
pub fn validate_request_path(path: &str) -> Result<(), SecurityValidationError> {
    if path.split('/').any(|segment| segment == "..") || path.contains("//") {
        return Err(SecurityValidationError::PathTraversal);
    }

    if path.contains('\0') || path.contains("%00") {
        return Err(SecurityValidationError::InvalidCharacters);
    }

    Ok(())
}

/// Security validation error
#[derive(Debug, PartialEq, Eq)]
pub enum SecurityValidationError {
    PathTraversal,
    InvalidCharacters,
}

impl IntoResponse for SecurityValidationError {
    fn into_response(self) -> Response {
        let message = match self {
            SecurityValidationError::PathTraversal => "Invalid path: path traversal detected",
            SecurityValidationError::InvalidCharacters => "Invalid request: prohibited characters",
        };

        ApiError::bad_request(message)
            .with_code("invalid_path")
            .into_response()
    }
}
