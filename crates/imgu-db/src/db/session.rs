use async_trait::async_trait;
use chrono::{DateTime, Utc};
use imgu_core::{AppError, Session};
use sqlx::{PgPool, Postgres};

use crate::store::SessionStore;

#[derive(Clone)]
pub struct SessionRepository {
    pool: PgPool,
}

impl SessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for SessionRepository {
    #[tracing::instrument(skip(self, token), fields(db.table = "sessions", db.operation = "select"))]
    async fn find_session(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Session>, AppError> {
        let session = sqlx::query_as::<Postgres, Session>(
            "SELECT token, user_id, expires_at FROM sessions WHERE token = $1 AND expires_at > $2",
        )
        .bind(token)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }

    #[tracing::instrument(skip(self), fields(db.table = "sessions", db.operation = "delete"))]
    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
