//! Session and flash message cookies

use std::convert::Infallible;
use std::fmt::Debug;

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::api::state::AppState;

type HmacSha256 = Hmac<Sha256>;

const MESSAGES_SALT: &[u8] = b"accounts.messages";

/// Cookie holding the signed session token
pub const SESSION_COOKIE: &str = "sessionid";

/// Cookie carrying one-shot messages across a redirect
pub const MESSAGES_COOKIE: &str = "messages";

/// Read a cookie value from the request headers
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

/// Set-Cookie value for a new session
pub fn session_cookie(token: &str, max_age_secs: u64, secure: bool) -> String {
    let mut parts = vec![
        format!("{}={}", SESSION_COOKIE, token),
        "Path=/".to_string(),
        "HttpOnly".to_string(),
    ];

    if secure {
        parts.push("Secure".to_string());
    }

    parts.push("SameSite=Lax".to_string());
    parts.push(format!("Max-Age={}", max_age_secs));

    parts.join("; ")
}

/// Set-Cookie value deleting a cookie
pub fn expired_cookie(name: &str) -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", name)
}

/// Signs the messages cookie so clients cannot forge messages
#[derive(Clone)]
pub struct MessageSigner {
    key: Vec<u8>,
}

impl Debug for MessageSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageSigner")
            .field("key", &"[hidden]")
            .finish()
    }
}

impl MessageSigner {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            key: secret.as_ref().to_vec(),
        }
    }

    fn mac(&self, payload: &str) -> Option<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(&self.key).ok()?;
        mac.update(MESSAGES_SALT);
        mac.update(payload.as_bytes());
        Some(mac)
    }

    /// Cookie value: base64 JSON payload, a dot, then the hex HMAC
    pub fn sign(&self, messages: &[String]) -> String {
        let json = serde_json::to_vec(messages).unwrap_or_default();
        let payload = URL_SAFE_NO_PAD.encode(json);
        let signature = self
            .mac(&payload)
            .map(|mac| hex::encode(mac.finalize().into_bytes()))
            .unwrap_or_default();

        format!("{}.{}", payload, signature)
    }

    /// Messages in a cookie value; `None` when the signature does not match
    pub fn unsign(&self, value: &str) -> Option<Vec<String>> {
        let (payload, signature) = value.rsplit_once('.')?;
        let signature = hex::decode(signature).ok()?;

        self.mac(payload)?.verify_slice(&signature).ok()?;

        let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
        serde_json::from_slice(&bytes).ok()
    }
}

/// Set-Cookie value carrying flash messages
pub fn messages_cookie(signer: &MessageSigner, messages: &[String]) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax",
        MESSAGES_COOKIE,
        signer.sign(messages)
    )
}

/// Flash messages pending for this request
#[derive(Debug, Clone, Default)]
pub struct Flash {
    messages: Vec<String>,
    was_set: bool,
}

impl Flash {
    /// Messages from a correctly signed cookie; tampered cookies carry none
    pub fn from_headers(headers: &HeaderMap, signer: &MessageSigner) -> Self {
        match read_cookie(headers, MESSAGES_COOKIE) {
            Some(value) => Self {
                messages: signer.unsign(&value).unwrap_or_default(),
                was_set: true,
            },
            None => Self::default(),
        }
    }

    /// Whether the request carried a messages cookie that must be cleared
    pub fn was_set(&self) -> bool {
        self.was_set
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn into_messages(self) -> Vec<String> {
        self.messages
    }
}

impl FromRequestParts<AppState> for Flash {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Flash::from_headers(&parts.headers, &state.message_signer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers_with_cookie(cookie: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, cookie.parse().unwrap());
        headers
    }

    #[test]
    fn test_read_cookie() {
        let headers = headers_with_cookie("theme=dark; sessionid=abc.def.ghi; other=1");

        assert_eq!(read_cookie(&headers, "sessionid").as_deref(), Some("abc.def.ghi"));
        assert_eq!(read_cookie(&headers, "theme").as_deref(), Some("dark"));
        assert_eq!(read_cookie(&headers, "missing"), None);
    }

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = session_cookie("token", 3600, false);

        assert!(cookie.starts_with("sessionid=token; "));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Max-Age=3600"));
        assert!(!cookie.contains("Secure"));

        assert!(session_cookie("token", 3600, true).contains("; Secure"));
    }

    fn signer() -> MessageSigner {
        MessageSigner::new("test-secret-key")
    }

    fn cookie_value(set_cookie: &str) -> String {
        set_cookie
            .split(';')
            .next()
            .and_then(|pair| pair.split_once('='))
            .map(|(_, v)| v.to_string())
            .unwrap()
    }

    #[test]
    fn test_messages_cookie_round_trip() {
        let messages = vec!["Your account has been updated!".to_string()];
        let value = cookie_value(&messages_cookie(&signer(), &messages));

        let flash = Flash::from_headers(
            &headers_with_cookie(&format!("messages={}", value)),
            &signer(),
        );

        assert!(flash.was_set());
        assert_eq!(flash.messages(), messages.as_slice());
    }

    #[test]
    fn test_unsigned_messages_are_ignored() {
        let forged = URL_SAFE_NO_PAD.encode(br#"["Your password is: hunter2"]"#);

        let flash = Flash::from_headers(
            &headers_with_cookie(&format!("messages={}", forged)),
            &signer(),
        );

        assert!(flash.was_set());
        assert!(flash.messages().is_empty());
    }

    #[test]
    fn test_tampered_messages_are_ignored() {
        let value = signer().sign(&["Welcome".to_string()]);
        let (_, signature) = value.rsplit_once('.').unwrap();
        let other_payload = URL_SAFE_NO_PAD.encode(br#"["Injected"]"#);
        let tampered = format!("{}.{}", other_payload, signature);

        assert!(signer().unsign(&tampered).is_none());
        assert!(MessageSigner::new("another-secret").unsign(&value).is_none());
        assert_eq!(signer().unsign(&value), Some(vec!["Welcome".to_string()]));
    }

    #[test]
    fn test_garbage_messages_cookie_yields_no_messages() {
        let flash = Flash::from_headers(&headers_with_cookie("messages=%%%not-base64"), &signer());

        assert!(flash.was_set());
        assert!(flash.messages().is_empty());
    }

    #[test]
    fn test_no_messages_cookie() {
        let flash = Flash::from_headers(&HeaderMap::new(), &signer());

        assert!(!flash.was_set());
        assert!(flash.into_messages().is_empty());
    }
}
