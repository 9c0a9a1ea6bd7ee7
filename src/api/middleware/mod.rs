//! API middleware components

pub mod logging;
pub mod metrics;
pub mod security;
pub mod session;

pub use logging::logging_middleware;
pub use metrics::metrics_middleware;
pub use security::{request_guard_middleware, security_headers_middleware, MAX_BODY_SIZE};
pub use session::{end_session, login_url, resolve_session, CurrentUser, RequireUser, LOGIN_URL};
