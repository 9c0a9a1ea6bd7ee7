//! Page documents and redirects
//!
//! A page is a JSON document naming the template it stands for, together
//! with the submitted values, form errors, flash messages and extra context.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;

use crate::api::cookies::{self, Flash, MessageSigner};
use crate::domain::{FormErrors, User};

/// JSON page standing in for a rendered template
#[derive(Debug, Serialize)]
pub struct Page {
    template: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    form: Option<&'static str>,
    values: Map<String, Value>,
    errors: FormErrors,
    messages: Vec<String>,
    context: Map<String, Value>,
    #[serde(skip)]
    cookies: Vec<String>,
}

impl Page {
    pub fn new(template: &'static str) -> Self {
        Self {
            template,
            form: None,
            values: Map::new(),
            errors: FormErrors::new(),
            messages: Vec::new(),
            context: Map::new(),
            cookies: Vec::new(),
        }
    }

    /// Name the form rendered on the page
    pub fn form(mut self, name: &'static str) -> Self {
        self.form = Some(name);
        self
    }

    /// Echo a submitted (or current) field value
    pub fn value(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.values.insert(field.to_string(), value.into());
        self
    }

    pub fn errors(mut self, errors: FormErrors) -> Self {
        self.errors = errors;
        self
    }

    pub fn context(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.context.insert(key.to_string(), value.into());
        self
    }

    /// Consume pending flash messages; the messages cookie is cleared
    pub fn flash(mut self, flash: Flash) -> Self {
        if flash.was_set() {
            self.cookies.push(cookies::expired_cookie(cookies::MESSAGES_COOKIE));
        }
        self.messages.extend(flash.into_messages());
        self
    }

    /// Expose the signed-in user to the page
    pub fn user(self, user: &User) -> Self {
        let summary = serde_json::json!({
            "email": user.email(),
            "first_name": user.first_name(),
            "last_name": user.last_name(),
            "full_name": user.full_name(),
            "is_staff": user.is_staff(),
        });
        self.context("user", summary)
    }

    pub fn cookie(mut self, cookie: String) -> Self {
        self.cookies.push(cookie);
        self
    }

    pub fn template(&self) -> &'static str {
        self.template
    }
}

impl IntoResponse for Page {
    fn into_response(self) -> Response {
        let cookies = self.cookies.clone();
        let mut response = (StatusCode::OK, Json(self)).into_response();
        append_cookies(&mut response, &cookies);
        response
    }
}

/// 302 Found redirect, optionally setting cookies
#[derive(Debug)]
pub struct Redirect {
    location: String,
    cookies: Vec<String>,
}

impl Redirect {
    pub fn to(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            cookies: Vec::new(),
        }
    }

    pub fn cookie(mut self, cookie: String) -> Self {
        self.cookies.push(cookie);
        self
    }

    /// Carry a one-shot message to the next page
    pub fn message(self, signer: &MessageSigner, message: &str) -> Self {
        let cookie = cookies::messages_cookie(signer, &[message.to_string()]);
        self.cookie(cookie)
    }

    pub fn location(&self) -> &str {
        &self.location
    }
}

impl IntoResponse for Redirect {
    fn into_response(self) -> Response {
        let location = HeaderValue::try_from(self.location.as_str())
            .unwrap_or_else(|_| HeaderValue::from_static("/"));

        let mut response = (StatusCode::FOUND, [(header::LOCATION, location)]).into_response();
        append_cookies(&mut response, &self.cookies);
        response
    }
}

fn append_cookies(response: &mut Response, cookies: &[String]) {
    for cookie in cookies {
        match HeaderValue::try_from(cookie.as_str()) {
            Ok(value) => {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(e) => warn!("Dropping invalid Set-Cookie header: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_serialization() {
        let mut errors = FormErrors::new();
        errors.add("email", "This field is required.");

        let page = Page::new("users/register.html")
            .form("register")
            .value("first_name", "Chester")
            .errors(errors)
            .context("validlink", true);

        let json = serde_json::to_value(&page).unwrap();

        assert_eq!(json["template"], "users/register.html");
        assert_eq!(json["form"], "register");
        assert_eq!(json["values"]["first_name"], "Chester");
        assert_eq!(json["errors"]["email"][0], "This field is required.");
        assert_eq!(json["context"]["validlink"], true);
        assert!(json.get("cookies").is_none());
    }

    #[test]
    fn test_page_without_form_omits_key() {
        let json = serde_json::to_value(Page::new("index.html")).unwrap();
        assert!(json.get("form").is_none());
        assert_eq!(json["messages"], serde_json::json!([]));
    }

    #[test]
    fn test_redirect_response() {
        let response = Redirect::to("/login/")
            .message(
                &MessageSigner::new("test-secret-key"),
                "You have been successfully registered, login with your email and password.",
            )
            .into_response();

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], "/login/");

        let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(cookie.starts_with("messages="));
    }

    #[test]
    fn test_page_sets_cookies() {
        let response = Page::new("registration/logged_out.html")
            .cookie(cookies::expired_cookie(cookies::SESSION_COOKIE))
            .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(cookie.starts_with("sessionid=;"));
        assert!(cookie.contains("Max-Age=0"));
    }
}
