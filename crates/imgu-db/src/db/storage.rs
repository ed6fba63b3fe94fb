use async_trait::async_trait;
use imgu_core::{AppError, StorageConfig, StorageConfigUpdate, StorageType};
use sqlx::{PgPool, Postgres};

use crate::store::StorageConfigStore;

const STORAGE_COLUMNS: &str = "id, name, type AS storage_type, config, enabled, allow_upload";

/// Repository for storage backend configuration
#[derive(Clone)]
pub struct StorageRepository {
    pool: PgPool,
}

impl StorageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StorageConfigStore for StorageRepository {
    #[tracing::instrument(skip(self), fields(db.table = "storages", db.operation = "select"))]
    async fn list_storages(&self) -> Result<Vec<StorageConfig>, AppError> {
        let storages = sqlx::query_as::<Postgres, StorageConfig>(&format!(
            "SELECT {} FROM storages ORDER BY id ASC",
            STORAGE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(storages)
    }

    #[tracing::instrument(skip(self), fields(db.table = "storages", db.operation = "select", db.record_id = id))]
    async fn find_storage(&self, id: i32) -> Result<Option<StorageConfig>, AppError> {
        let storage = sqlx::query_as::<Postgres, StorageConfig>(&format!(
            "SELECT {} FROM storages WHERE id = $1",
            STORAGE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(storage)
    }

    #[tracing::instrument(skip(self), fields(db.table = "storages", db.operation = "insert"))]
    async fn create_storage(
        &self,
        name: &str,
        storage_type: StorageType,
    ) -> Result<StorageConfig, AppError> {
        let storage = sqlx::query_as::<Postgres, StorageConfig>(&format!(
            r#"
            INSERT INTO storages (name, type, config, enabled, allow_upload)
            VALUES ($1, $2, '{{}}', FALSE, FALSE)
            RETURNING {}
            "#,
            STORAGE_COLUMNS
        ))
        .bind(name)
        .bind(storage_type.to_string())
        .fetch_one(&self.pool)
        .await?;

        Ok(storage)
    }

    #[tracing::instrument(skip(self, update), fields(db.table = "storages", db.operation = "update", db.record_id = id))]
    async fn update_storage(
        &self,
        id: i32,
        update: &StorageConfigUpdate,
    ) -> Result<StorageConfig, AppError> {
        let storage = sqlx::query_as::<Postgres, StorageConfig>(&format!(
            r#"
            UPDATE storages SET enabled = $2, allow_upload = $3, config = $4
            WHERE id = $1
            RETURNING {}
            "#,
            STORAGE_COLUMNS
        ))
        .bind(id)
        .bind(update.enabled)
        .bind(update.allow_upload)
        .bind(&update.config)
        .fetch_optional(&self.pool)
        .await?;

        storage.ok_or_else(|| AppError::NotFound(format!("storage {} not found", id)))
    }

    #[tracing::instrument(skip(self), fields(db.table = "storages", db.operation = "update", db.record_id = id))]
    async fn set_storage_enabled(&self, id: i32, enabled: bool) -> Result<(), AppError> {
        sqlx::query("UPDATE storages SET enabled = $2 WHERE id = $1")
            .bind(id)
            .bind(enabled)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.table = "storages", db.operation = "delete", db.record_id = id))]
    async fn delete_storage_if_unreferenced(&self, id: i32) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        // Row lock conflicts with the key-share lock taken by the images FK
        // check, so no image can be inserted against this id until commit.
        let locked = sqlx::query_scalar::<Postgres, i32>(
            "SELECT id FROM storages WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        if locked.is_none() {
            return Err(AppError::NotFound(format!("storage {} not found", id)));
        }

        let references = sqlx::query_scalar::<Postgres, i64>(
            "SELECT COUNT(*) FROM images WHERE storage_id = $1",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        if references > 0 {
            tx.rollback().await?;
            return Err(AppError::Conflict(format!(
                "storage {} still holds {} images",
                id, references
            )));
        }

        sqlx::query("DELETE FROM storages WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(storage_id = id, "Storage deleted");
        Ok(())
    }
}
