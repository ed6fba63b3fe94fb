use async_trait::async_trait;
use chrono::{DateTime, Utc};
use imgu_core::{AppError, User};
use sqlx::{PgPool, Postgres};

use crate::store::UserStore;

/// Repository for the group-related view of user accounts
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
impl UserStore for UserRepository {
    #[tracing::instrument(skip(self), fields(db.table = "users", db.operation = "select", db.record_id = id))]
    async fn find_user(&self, id: i32) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<Postgres, User>(
            "SELECT id, username, email, email_verified, role, group_id, group_expires_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    #[tracing::instrument(skip(self), fields(db.table = "users", db.operation = "update", db.record_id = user_id))]
    async fn set_user_group(
        &self,
        user_id: i32,
        group_id: i32,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<(), AppError> {
        let result =
            sqlx::query("UPDATE users SET group_id = $2, group_expires_at = $3 WHERE id = $1")
                .bind(user_id)
                .bind(group_id)
                .bind(expires_at)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("user {} not found", user_id)));
        }
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.table = "users", db.operation = "update"))]
    async fn revert_expired_groups(
        &self,
        now: DateTime<Utc>,
        default_group: i32,
    ) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE users SET group_id = $2, group_expires_at = NULL
            WHERE group_expires_at IS NOT NULL AND group_expires_at <= $1
            "#,
        )
        .bind(now)
        .bind(default_group)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
