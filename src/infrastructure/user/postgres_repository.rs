//! PostgreSQL user repository implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use crate::domain::profile::Profile;
use crate::domain::user::{User, UserId, UserRepository};
use crate::domain::DomainError;

const USER_COLUMNS: &str = "id, email, password_hash, unique_id, first_name, last_name, \
     is_active, is_staff, is_superuser, date_joined, updated_at, last_login";

/// PostgreSQL implementation of UserRepository
#[derive(Debug, Clone)]
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_user(&self, column: &str, value: &str) -> Result<Option<User>, DomainError> {
        let sql = format!("SELECT {} FROM users WHERE {} = $1", USER_COLUMNS, column);

        let row = sqlx::query(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to get user: {}", e)))?;

        row.as_ref().map(row_to_user).transpose()
    }

    async fn begin(&self) -> Result<Transaction<'static, Postgres>, DomainError> {
        self.pool
            .begin()
            .await
            .map_err(|e| DomainError::storage(format!("Failed to begin transaction: {}", e)))
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn get(&self, id: &UserId) -> Result<Option<User>, DomainError> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);

        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to get user: {}", e)))?;

        row.as_ref().map(row_to_user).transpose()
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>, DomainError> {
        self.fetch_user("email", email).await
    }

    async fn find_by_email_iexact(&self, email: &str) -> Result<Vec<User>, DomainError> {
        let sql = format!(
            "SELECT {} FROM users WHERE LOWER(email) = LOWER($1) ORDER BY date_joined",
            USER_COLUMNS
        );

        let rows = sqlx::query(&sql)
            .bind(email)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to find users: {}", e)))?;

        rows.iter().map(row_to_user).collect()
    }

    async fn get_by_unique_id(&self, unique_id: &str) -> Result<Option<User>, DomainError> {
        self.fetch_user("unique_id", unique_id).await
    }

    async fn create(&self, user: User, profile: Profile) -> Result<User, DomainError> {
        if profile.user_id() != user.id() {
            return Err(DomainError::validation("Profile does not belong to the new user"));
        }

        let mut tx = self.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO users (id, email, password_hash, unique_id, first_name, last_name,
                               is_active, is_staff, is_superuser, date_joined, updated_at,
                               last_login)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(user.id().as_uuid())
        .bind(user.email())
        .bind(user.password_hash())
        .bind(user.unique_id())
        .bind(user.first_name())
        .bind(user.last_name())
        .bind(user.is_active())
        .bind(user.is_staff())
        .bind(user.is_superuser())
        .bind(user.date_joined())
        .bind(user.updated_at())
        .bind(user.last_login())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_write_error(e, &user, "create user"))?;

        insert_profile(&mut tx, &profile).await?;

        tx.commit()
            .await
            .map_err(|e| map_write_error(e, &user, "commit user creation"))?;

        Ok(user)
    }

    async fn update(&self, user: &User) -> Result<User, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET email = $2, password_hash = $3, first_name = $4, last_name = $5,
                is_active = $6, is_staff = $7, is_superuser = $8, updated_at = $9,
                last_login = $10
            WHERE id = $1
            "#,
        )
        .bind(user.id().as_uuid())
        .bind(user.email())
        .bind(user.password_hash())
        .bind(user.first_name())
        .bind(user.last_name())
        .bind(user.is_active())
        .bind(user.is_staff())
        .bind(user.is_superuser())
        .bind(user.updated_at())
        .bind(user.last_login())
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, user, "update user"))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found(format!("User '{}' not found", user.id())));
        }

        Ok(user.clone())
    }

    async fn update_password(&self, user: &User) -> Result<(), DomainError> {
        let result =
            sqlx::query("UPDATE users SET password_hash = $2, updated_at = $3 WHERE id = $1")
                .bind(user.id().as_uuid())
                .bind(user.password_hash())
                .bind(user.updated_at())
                .execute(&self.pool)
                .await
                .map_err(|e| DomainError::storage(format!("Failed to update password: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found(format!("User '{}' not found", user.id())));
        }

        Ok(())
    }

    async fn delete(&self, id: &UserId) -> Result<bool, DomainError> {
        // profiles.user_id is ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to delete user: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }

    async fn list(&self) -> Result<Vec<User>, DomainError> {
        let sql = format!("SELECT {} FROM users ORDER BY date_joined", USER_COLUMNS);

        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to list users: {}", e)))?;

        rows.iter().map(row_to_user).collect()
    }

    async fn count(&self) -> Result<usize, DomainError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to count users: {}", e)))?;

        Ok(count as usize)
    }

    async fn record_login(&self, id: &UserId) -> Result<(), DomainError> {
        let result = sqlx::query("UPDATE users SET last_login = NOW() WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to record login: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found(format!("User '{}' not found", id)));
        }

        Ok(())
    }

    async fn get_profile(&self, user_id: &UserId) -> Result<Option<Profile>, DomainError> {
        let row = sqlx::query("SELECT user_id, image, updated_at FROM profiles WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to get profile: {}", e)))?;

        Ok(row.as_ref().map(row_to_profile))
    }

    async fn save_account(&self, user: &User, profile: &Profile) -> Result<(), DomainError> {
        if profile.user_id() != user.id() {
            return Err(DomainError::validation("Profile does not belong to the user"));
        }

        let mut tx = self.begin().await?;

        let users = sqlx::query(
            r#"
            UPDATE users
            SET email = $2, first_name = $3, last_name = $4, updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(user.id().as_uuid())
        .bind(user.email())
        .bind(user.first_name())
        .bind(user.last_name())
        .bind(user.updated_at())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_write_error(e, user, "update user"))?;

        let profiles =
            sqlx::query("UPDATE profiles SET image = $2, updated_at = $3 WHERE user_id = $1")
                .bind(profile.user_id().as_uuid())
                .bind(profile.image())
                .bind(profile.updated_at())
                .execute(&mut *tx)
                .await
                .map_err(|e| DomainError::storage(format!("Failed to update profile: {}", e)))?;

        if users.rows_affected() == 0 || profiles.rows_affected() == 0 {
            return Err(DomainError::not_found(format!(
                "Account '{}' not found",
                user.id()
            )));
        }

        tx.commit()
            .await
            .map_err(|e| DomainError::storage(format!("Failed to save account: {}", e)))
    }
}

async fn insert_profile(
    tx: &mut Transaction<'static, Postgres>,
    profile: &Profile,
) -> Result<(), DomainError> {
    sqlx::query("INSERT INTO profiles (user_id, image, updated_at) VALUES ($1, $2, $3)")
        .bind(profile.user_id().as_uuid())
        .bind(profile.image())
        .bind(profile.updated_at())
        .execute(&mut **tx)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to create profile: {}", e)))?;

    Ok(())
}

/// Map a write failure, turning unique violations into conflicts
fn map_write_error(error: sqlx::Error, user: &User, action: &str) -> DomainError {
    if let sqlx::Error::Database(db_error) = &error {
        if db_error.is_unique_violation() {
            return match db_error.constraint() {
                Some(constraint) if constraint.contains("unique_id") => DomainError::conflict(
                    format!("Unique ID '{}' already exists", user.unique_id()),
                ),
                Some(constraint) if constraint.contains("pkey") => DomainError::conflict(
                    format!("User with ID '{}' already exists", user.id()),
                ),
                _ => DomainError::conflict(format!("Email '{}' already exists", user.email())),
            };
        }
    }

    DomainError::storage(format!("Failed to {}: {}", action, error))
}

fn row_to_user(row: &PgRow) -> Result<User, DomainError> {
    let get_err = |e: sqlx::Error| DomainError::storage(format!("Invalid user row: {}", e));

    let id: Uuid = row.try_get("id").map_err(get_err)?;
    let flags = (
        row.try_get("is_active").map_err(get_err)?,
        row.try_get("is_staff").map_err(get_err)?,
        row.try_get("is_superuser").map_err(get_err)?,
    );
    let last_login: Option<DateTime<Utc>> = row.try_get("last_login").map_err(get_err)?;

    Ok(User::restore(
        UserId::from_uuid(id),
        row.try_get("email").map_err(get_err)?,
        row.try_get("password_hash").map_err(get_err)?,
        row.try_get("unique_id").map_err(get_err)?,
        row.try_get("first_name").map_err(get_err)?,
        row.try_get("last_name").map_err(get_err)?,
        flags,
        row.try_get("date_joined").map_err(get_err)?,
        row.try_get("updated_at").map_err(get_err)?,
        last_login,
    ))
}

fn row_to_profile(row: &PgRow) -> Profile {
    let user_id: Uuid = row.get("user_id");
    let image: String = row.get("image");
    let updated_at: DateTime<Utc> = row.get("updated_at");

    Profile::restore(UserId::from_uuid(user_id), image, updated_at)
}
