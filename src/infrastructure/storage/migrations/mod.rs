//! Database migrations infrastructure

use sqlx::postgres::PgPool;
use tracing::info;

use crate::domain::DomainError;

/// Applies versioned migrations recorded in a `_migrations` table
#[derive(Debug)]
pub struct PostgresMigrator {
    pool: PgPool,
}

impl PostgresMigrator {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the migrations table if it doesn't exist
    async fn ensure_migrations_table(&self) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version BIGINT PRIMARY KEY,
                description TEXT NOT NULL,
                installed_on TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to create migrations table: {}", e)))?;

        Ok(())
    }

    async fn is_applied(&self, version: i64) -> Result<bool, DomainError> {
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM _migrations WHERE version = $1)")
            .bind(version)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to check migration status: {}", e)))
    }

    /// Applies a migration and records it in one transaction; returns false if already applied
    pub async fn run_migration(&self, migration: &Migration) -> Result<bool, DomainError> {
        self.ensure_migrations_table().await?;

        if self.is_applied(migration.version).await? {
            return Ok(false);
        }

        let failed = |e: sqlx::Error| {
            DomainError::storage(format!("Failed to run migration {}: {}", migration.version, e))
        };

        let mut tx = self.pool.begin().await.map_err(failed)?;

        sqlx::raw_sql(migration.up).execute(&mut *tx).await.map_err(failed)?;

        sqlx::query("INSERT INTO _migrations (version, description) VALUES ($1, $2)")
            .bind(migration.version)
            .bind(migration.description)
            .execute(&mut *tx)
            .await
            .map_err(failed)?;

        tx.commit().await.map_err(failed)?;

        info!(version = migration.version, description = migration.description, "Migration applied");

        Ok(true)
    }

    /// Returns the latest applied migration version
    pub async fn current_version(&self) -> Result<Option<i64>, DomainError> {
        self.ensure_migrations_table().await?;

        sqlx::query_scalar("SELECT MAX(version) FROM _migrations")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to get migration version: {}", e)))
    }
}

/// Represents a database migration
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub version: i64,
    pub description: &'static str,
    /// SQL to run when applying the migration
    pub up: &'static str,
}

/// Schema for accounts, their profiles and revoked sessions
pub fn account_migrations() -> Vec<Migration> {
    vec![
        Migration {
            version: 1,
            description: "Create users table",
            up: r#"
            CREATE TABLE IF NOT EXISTS users (
                id UUID PRIMARY KEY,
                email VARCHAR(254) NOT NULL,
                password_hash VARCHAR(255) NOT NULL DEFAULT '',
                unique_id VARCHAR(40) NOT NULL,
                first_name VARCHAR(150) NOT NULL DEFAULT '',
                last_name VARCHAR(150) NOT NULL DEFAULT '',
                is_active BOOLEAN NOT NULL DEFAULT TRUE,
                is_staff BOOLEAN NOT NULL DEFAULT FALSE,
                is_superuser BOOLEAN NOT NULL DEFAULT FALSE,
                date_joined TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                last_login TIMESTAMPTZ NULL,
                CONSTRAINT users_email_key UNIQUE (email),
                CONSTRAINT users_unique_id_key UNIQUE (unique_id)
            );
            "#,
        },
        Migration {
            version: 2,
            description: "Create profiles table",
            up: r#"
            CREATE TABLE IF NOT EXISTS profiles (
                user_id UUID PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
                image VARCHAR(100) NOT NULL DEFAULT 'default.jpg',
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            );
            "#,
        },
        Migration {
            version: 3,
            description: "Index users by join date",
            up: "CREATE INDEX IF NOT EXISTS idx_users_date_joined ON users(date_joined);",
        },
        Migration {
            version: 4,
            description: "Index users by case-folded email",
            up: "CREATE INDEX IF NOT EXISTS idx_users_email_lower ON users(LOWER(email));",
        },
        Migration {
            version: 5,
            description: "Create revoked_sessions table",
            up: r#"
            CREATE TABLE IF NOT EXISTS revoked_sessions (
                session_id VARCHAR(64) PRIMARY KEY,
                expires_at TIMESTAMPTZ NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_revoked_sessions_expires_at
                ON revoked_sessions(expires_at);
            "#,
        },
    ]
}

/// Runs all pending account migrations, returning how many were applied
pub async fn run_account_migrations(pool: &PgPool) -> Result<usize, DomainError> {
    let migrator = PostgresMigrator::new(pool.clone());
    let mut applied = 0;

    for migration in account_migrations() {
        if migrator.run_migration(&migration).await? {
            applied += 1;
        }
    }

    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::media::MAX_MEDIA_NAME_LEN;

    #[test]
    fn test_migrations_order() {
        let migrations = account_migrations();

        assert!(!migrations.is_empty());

        for pair in migrations.windows(2) {
            assert!(
                pair[1].version > pair[0].version,
                "Migrations should be in ascending order"
            );
        }
    }

    #[test]
    fn test_migrations_content() {
        for migration in account_migrations() {
            assert!(!migration.description.is_empty());
            assert!(!migration.up.trim().is_empty());
        }
    }

    #[test]
    fn test_profiles_cascade_with_users() {
        let migrations = account_migrations();
        let profiles = migrations
            .iter()
            .find(|m| m.up.contains("CREATE TABLE IF NOT EXISTS profiles"))
            .unwrap();

        assert!(profiles.up.contains("ON DELETE CASCADE"));
        assert!(profiles.up.contains("'default.jpg'"));
    }

    #[test]
    fn test_profile_image_column_holds_media_names() {
        let profiles = &account_migrations()[1];

        assert!(profiles
            .up
            .contains(&format!("image VARCHAR({})", MAX_MEDIA_NAME_LEN)));
    }

    #[test]
    fn test_unique_constraints_named_for_conflict_mapping() {
        let users = &account_migrations()[0];

        assert!(users.up.contains("users_email_key UNIQUE (email)"));
        assert!(users.up.contains("users_unique_id_key UNIQUE (unique_id)"));
    }
}
