use async_trait::async_trait;
use imgu_core::AppError;
use sqlx::{PgPool, Postgres};

use crate::store::SettingStore;

/// Key/value site settings
#[derive(Clone)]
pub struct SettingRepository {
    pool: PgPool,
}

impl SettingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SettingStore for SettingRepository {
    #[tracing::instrument(skip(self), fields(db.table = "settings", db.operation = "select"))]
    async fn get_setting(&self, key: &str) -> Result<Option<String>, AppError> {
        let value = sqlx::query_scalar::<Postgres, String>("SELECT value FROM settings WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(value)
    }

    #[tracing::instrument(skip(self, value), fields(db.table = "settings", db.operation = "upsert"))]
    async fn set_setting(&self, key: &str, value: &str) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO settings (key, value) VALUES ($1, $2) ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
