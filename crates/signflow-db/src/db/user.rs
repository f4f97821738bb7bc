use async_trait::async_trait;
use signflow_core::{
    models::{User, UserRole},
    AppError,
};
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use super::traits::UserDirectory;

const USER_COLUMNS: &str = "id, name, email, role, ad_username, is_active, created_at, updated_at";

/// Repository for the user directory
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for UserRepository {
    #[tracing::instrument(skip(self), fields(db.table = "users", db.operation = "select"))]
    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        let users = sqlx::query_as::<Postgres, User>(&format!(
            "SELECT {} FROM users ORDER BY name ASC",
            USER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    #[tracing::instrument(skip(self), fields(db.table = "users", db.operation = "insert"))]
    async fn create_user(&self, name: &str, email: &str, role: UserRole) -> Result<User, AppError> {
        let user = sqlx::query_as::<Postgres, User>(&format!(
            r#"
            INSERT INTO users (name, email, role)
            VALUES ($1, $2, $3)
            ON CONFLICT (email) DO NOTHING
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(name)
        .bind(email)
        .bind(role)
        .fetch_optional(&self.pool)
        .await?;

        user.ok_or_else(|| AppError::Conflict(format!("User with email {} already exists", email)))
    }

    #[tracing::instrument(skip(self), fields(db.table = "users", db.operation = "select", db.record_id = %id))]
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<Postgres, User>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    #[tracing::instrument(skip(self), fields(db.table = "users", db.operation = "select"))]
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<Postgres, User>(&format!(
            "SELECT {} FROM users WHERE LOWER(email) = LOWER($1)",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    #[tracing::instrument(skip(self), fields(db.table = "users", db.operation = "select"))]
    async fn available_signers(&self, acting_user_id: Uuid) -> Result<Vec<User>, AppError> {
        let users = sqlx::query_as::<Postgres, User>(&format!(
            r#"
            SELECT {}
            FROM users
            WHERE is_active = TRUE
            ORDER BY CASE WHEN id = $1 THEN 0 ELSE 1 END, name ASC
            "#,
            USER_COLUMNS
        ))
        .bind(acting_user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }
}
