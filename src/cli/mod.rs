//! CLI module for the accounts service
//!
//! Subcommands:
//! - `serve`: HTTP server (default)
//! - `migrate`: apply pending database migrations
//! - `create-superuser`: create an account with every privilege flag set

pub mod create_superuser;
pub mod migrate;
pub mod serve;

use clap::{Parser, Subcommand};

use crate::config::AppConfig;
use crate::infrastructure::logging;

/// Accounts Service - email-keyed user accounts over HTTP
#[derive(Parser)]
#[command(name = "accounts-service")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP server (default)
    Serve,

    /// Apply pending database migrations
    Migrate,

    /// Create a superuser account
    CreateSuperuser(create_superuser::CreateSuperuserArgs),
}

/// Load `.env` and the layered configuration, then install logging
pub(crate) fn load_config() -> AppConfig {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().unwrap_or_else(|e| {
        eprintln!("Invalid configuration, using defaults: {}", e);
        AppConfig::default()
    });

    logging::init_logging(&config.logging);
    config
}
