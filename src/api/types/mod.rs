//! API request and response types

pub mod error;
pub mod form;
pub mod page;

pub use error::{ApiError, ApiErrorResponse};
pub use form::Form;
pub use page::{Page, Redirect};
