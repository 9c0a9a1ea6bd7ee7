//! Mail infrastructure module
//!
//! Email messages and delivery backends: SMTP via lettre, a console
//! backend for development and an in-memory outbox for tests.

mod mailer;
mod message;

pub use mailer::{ConsoleMailer, InMemoryMailer, Mailer, SmtpMailer, SmtpSettings};
pub use message::EmailMessage;
