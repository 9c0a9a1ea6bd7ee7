//! User infrastructure module
//!
//! Password hashing with Argon2, the in-memory and PostgreSQL account
//! stores, and the user service that creates identities together with
//! their profiles.

mod password;
mod postgres_repository;
mod repository;
mod service;

pub use password::{Argon2Hasher, PasswordHasher};
pub use postgres_repository::PostgresUserRepository;
pub use repository::InMemoryUserRepository;
pub use service::UserService;
