//! API layer - account pages, probes and middleware

pub mod accounts;
pub mod cookies;
pub mod health;
pub mod middleware;
pub mod router;
pub mod state;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use middleware::{CurrentUser, RequireUser};
pub use router::create_router_with_state;
pub use state::{AppState, UserServiceTrait, WebSettings};
