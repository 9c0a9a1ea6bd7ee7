//! Accounts Service
//!
//! Email-keyed user accounts over HTTP:
//! - Registration with an automatically created profile
//! - Session login/logout, password change and emailed password reset
//! - Profile editing with avatar uploads
//! - In-memory or PostgreSQL account store

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use api::cookies::MessageSigner;
use api::state::{AppState, UserServiceTrait, WebSettings};
use config::EmailBackend;
use domain::PROFILE_UPLOAD_DIR;
use infrastructure::{
    auth::{
        InMemorySessionRevocations, PasswordResetTokenGenerator, PostgresSessionRevocations,
        SessionConfig, SessionRevocations, SessionService,
    },
    mail::{ConsoleMailer, InMemoryMailer, Mailer, SmtpMailer, SmtpSettings},
    media::LocalMediaStorage,
    storage::{connect_pool, run_account_migrations, PostgresConfig},
    user::{Argon2Hasher, InMemoryUserRepository, PostgresUserRepository, UserService},
};
use rand::Rng;
use sqlx::PgPool;
use tracing::{info, warn};

/// Create the application state with default configuration
pub async fn create_app_state() -> anyhow::Result<AppState> {
    create_app_state_with_config(&AppConfig::default()).await
}

/// Create the application state with custom configuration
///
/// Uses PostgreSQL when a database URL is configured (applying pending
/// migrations), the in-memory store otherwise.
pub async fn create_app_state_with_config(config: &AppConfig) -> anyhow::Result<AppState> {
    let hasher = Arc::new(Argon2Hasher::new());

    let (user_service, revoked_sessions): (
        Arc<dyn UserServiceTrait>,
        Arc<dyn SessionRevocations>,
    ) = match connect_database(config).await? {
        Some(pool) => {
            let applied = run_account_migrations(&pool).await?;
            info!(applied, "Account schema up to date");

            (
                Arc::new(UserService::new(
                    Arc::new(PostgresUserRepository::new(pool.clone())),
                    hasher,
                )),
                Arc::new(PostgresSessionRevocations::new(pool)),
            )
        }
        None => {
            warn!("No database URL configured; accounts are kept in memory");
            (
                Arc::new(UserService::new(
                    Arc::new(InMemoryUserRepository::new()),
                    hasher,
                )),
                Arc::new(InMemorySessionRevocations::new()),
            )
        }
    };

    let secret = config.auth.secret_key.clone().unwrap_or_else(|| {
        warn!(
            "No auth secret_key configured. Generating random secret. \
             Sessions and reset links will NOT survive a restart."
        );
        generate_random_secret()
    });

    let sessions = Arc::new(SessionService::new(SessionConfig::new(
        secret.clone(),
        u64::from(config.auth.session_hours),
    )));

    let message_signer = MessageSigner::new(&secret);

    let reset_tokens = Arc::new(PasswordResetTokenGenerator::new(
        secret,
        config.auth.password_reset_timeout_secs,
    ));

    let media = LocalMediaStorage::new(config.media.root.clone());
    media.ensure_dirs(&[PROFILE_UPLOAD_DIR]).await?;

    Ok(AppState {
        user_service,
        sessions,
        revoked_sessions,
        reset_tokens,
        mailer: create_mailer(config)?,
        media: Arc::new(media),
        message_signer,
        web: WebSettings {
            site: config.site.clone(),
            media_url: config.media.url.clone(),
            secure_cookies: config.auth.secure_cookies,
        },
    })
}

/// Open the configured database pool, if any
pub async fn connect_database(config: &AppConfig) -> anyhow::Result<Option<PgPool>> {
    let Some(url) = config.database.url.as_deref().filter(|url| !url.is_empty()) else {
        return Ok(None);
    };

    let pg_config = PostgresConfig::new(url).with_max_connections(config.database.max_connections);
    let pool = connect_pool(&pg_config).await?;

    Ok(Some(pool))
}

fn create_mailer(config: &AppConfig) -> anyhow::Result<Arc<dyn Mailer>> {
    let mailer: Arc<dyn Mailer> = match config.email.backend {
        EmailBackend::Console => Arc::new(ConsoleMailer::new()),
        EmailBackend::Memory => Arc::new(InMemoryMailer::new()),
        EmailBackend::Smtp => {
            let settings = SmtpSettings {
                host: config.email.smtp_host.clone(),
                port: config.email.smtp_port,
                username: config.email.smtp_username.clone(),
                password: config.email.smtp_password.clone(),
                use_tls: config.email.smtp_tls,
            };
            info!(host = %settings.host, port = settings.port, "Using SMTP mailer");
            Arc::new(SmtpMailer::new(&settings, &config.email.from_address)?)
        }
    };

    Ok(mailer)
}

/// Generate a random signing secret
fn generate_random_secret() -> String {
    use rand::distributions::Alphanumeric;

    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_random_secret() {
        let a = generate_random_secret();
        let b = generate_random_secret();

        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_in_memory_state_from_config() {
        let media_root = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.media.root = media_root.path().join("media");
        config.email.backend = EmailBackend::Memory;

        let state = create_app_state_with_config(&config).await.unwrap();

        assert_eq!(state.user_service.count().await.unwrap(), 0);
        assert_eq!(state.web.media_url, "/media/");
        assert!(media_root.path().join("media/profile_pics").is_dir());
    }

    #[test]
    fn test_smtp_mailer_rejects_bad_from_address() {
        let mut config = AppConfig::default();
        config.email.backend = EmailBackend::Smtp;
        config.email.from_address = "not an address".to_string();

        assert!(create_mailer(&config).is_err());
    }
}
