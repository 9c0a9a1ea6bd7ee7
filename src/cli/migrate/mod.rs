//! Migrate command - applies pending account schema migrations

use tracing::info;

use crate::infrastructure::storage::{run_account_migrations, PostgresMigrator};

/// Apply pending migrations to the configured database
pub async fn run() -> anyhow::Result<()> {
    let config = super::load_config();

    let Some(pool) = crate::connect_database(&config).await? else {
        anyhow::bail!("No database URL configured (set APP__DATABASE__URL)");
    };

    let applied = run_account_migrations(&pool).await?;
    let version = PostgresMigrator::new(pool.clone()).current_version().await?;

    info!(applied, version = ?version, "Migrations complete");
    println!(
        "Applied {} migration(s); schema version {}",
        applied,
        version.map_or_else(|| "none".to_string(), |v| v.to_string())
    );

    pool.close().await;

    Ok(())
}
