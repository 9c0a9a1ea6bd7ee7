//! Urlencoded form extractor that reports rejections as API errors

use axum::{
    extract::{FromRequest, Request},
    response::{IntoResponse, Response},
    Form as AxumForm,
};
use serde::de::DeserializeOwned;

use super::error::ApiError;

/// Wrapper around `axum::Form` whose rejections use the API error body
#[derive(Debug, Clone, Copy, Default)]
pub struct Form<T>(pub T);

impl<T> Form<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

/// Form rejection in API error format
#[derive(Debug)]
pub struct FormRejection(ApiError);

impl IntoResponse for FormRejection {
    fn into_response(self) -> Response {
        self.0.into_response()
    }
}

impl<S, T> FromRequest<S> for Form<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = FormRejection;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match AxumForm::<T>::from_request(req, state).await {
            Ok(AxumForm(value)) => Ok(Form(value)),
            Err(rejection) => {
                let status = rejection.status();
                let error = ApiError::bad_request(format_rejection_message(&rejection))
                    .with_code("form_parse_error");

                Err(FormRejection(ApiError { status, ..error }))
            }
        }
    }
}

fn format_rejection_message(rejection: &axum::extract::rejection::FormRejection) -> String {
    use axum::extract::rejection::FormRejection::*;

    match rejection {
        InvalidFormContentType(_) => {
            "Expected 'application/x-www-form-urlencoded' form data.".to_string()
        }
        FailedToDeserializeForm(err) => format!("Invalid form data: {}", err.body_text()),
        FailedToDeserializeFormBody(err) => format!("Invalid form data: {}", err.body_text()),
        BytesRejection(err) => format!("Failed to read request body: {}", err.body_text()),
        _ => "Invalid form request".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode};
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct LoginFields {
        username: String,
        #[serde(default)]
        next: Option<String>,
    }

    fn form_request(body: &'static str, content_type: &'static str) -> Request {
        Request::builder()
            .method("POST")
            .uri("/")
            .header("content-type", content_type)
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_form_extracts_fields() {
        let req = form_request(
            "username=test%40django.com&next=%2Fprofile%2F",
            "application/x-www-form-urlencoded",
        );

        let Form(fields) = Form::<LoginFields>::from_request(req, &()).await.unwrap();

        assert_eq!(fields.username, "test@django.com");
        assert_eq!(fields.next.as_deref(), Some("/profile/"));
    }

    #[tokio::test]
    async fn test_malformed_body_is_rejected() {
        let req = form_request("next=%2F", "application/x-www-form-urlencoded");

        let rejection = Form::<LoginFields>::from_request(req, &()).await.unwrap_err();
        let response = rejection.into_response();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["code"], "form_parse_error");
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .starts_with("Invalid form data:"));
    }

    #[tokio::test]
    async fn test_wrong_content_type_is_rejected() {
        let req = form_request("{}", "application/json");

        let rejection = Form::<LoginFields>::from_request(req, &()).await.unwrap_err();

        assert_eq!(
            rejection.into_response().status(),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
    }
}
