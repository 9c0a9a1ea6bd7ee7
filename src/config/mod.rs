//! Application configuration

mod app_config;

pub use app_config::{
    AppConfig, AuthConfig, DatabaseConfig, EmailBackend, EmailConfig, LogFormat, LoggingConfig,
    MediaConfig, MetricsConfig, ServerConfig, SiteConfig,
};
