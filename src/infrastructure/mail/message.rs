//! Outgoing email messages

use serde::Serialize;

/// A plain-text email ready for delivery
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl EmailMessage {
    pub fn new(to: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            body: body.into(),
        }
    }

    /// The password reset email carrying a one-time link
    pub fn password_reset(to: &str, site_domain: &str, reset_link: &str) -> Self {
        let subject = format!("Password reset on {}", site_domain);
        let body = format!(
            "You're receiving this email because you requested a password reset \
             for your user account at {site_domain}.\n\n\
             Please go to the following page and choose a new password:\n\n\
             {reset_link}\n\n\
             Your email, in case you've forgotten: {to}\n\n\
             Thanks for using our site!\n\n\
             The {site_domain} team\n"
        );

        Self::new(to, subject, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_reset_message() {
        let message = EmailMessage::password_reset(
            "test@django.com",
            "example.com",
            "http://example.com/password_/new/abc/token/",
        );

        assert_eq!(message.to, "test@django.com");
        assert_eq!(message.subject, "Password reset on example.com");
        assert!(message.body.contains("http://example.com/password_/new/abc/token/"));
        assert!(message.body.contains("test@django.com"));
    }
}
