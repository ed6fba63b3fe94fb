use async_trait::async_trait;
use imgu_core::{AppError, Group, GroupLimits};
use sqlx::{PgPool, Postgres};

use crate::store::GroupStore;

const GROUP_COLUMNS: &str = "id, name, allow_upload, max_file_size, upload_per_minute, upload_per_hour, \
     upload_per_day, upload_per_month, total_uploads, max_retention_seconds";

/// Repository for upload groups
#[derive(Clone)]
pub struct GroupRepository {
    pool: PgPool,
}

impl GroupRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GroupStore for GroupRepository {
    #[tracing::instrument(skip(self), fields(db.table = "groups", db.operation = "select", db.record_id = id))]
    async fn find_group(&self, id: i32) -> Result<Option<Group>, AppError> {
        let group = sqlx::query_as::<Postgres, Group>(&format!(
            "SELECT {} FROM groups WHERE id = $1",
            GROUP_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(group)
    }

    #[tracing::instrument(skip(self), fields(db.table = "groups", db.operation = "select"))]
    async fn list_groups(&self) -> Result<Vec<Group>, AppError> {
        let groups = sqlx::query_as::<Postgres, Group>(&format!(
            "SELECT {} FROM groups ORDER BY id ASC",
            GROUP_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(groups)
    }

    #[tracing::instrument(skip(self, limits), fields(db.table = "groups", db.operation = "insert"))]
    async fn create_group(&self, limits: &GroupLimits) -> Result<Group, AppError> {
        let group = sqlx::query_as::<Postgres, Group>(&format!(
            r#"
            INSERT INTO groups (name, allow_upload, max_file_size, upload_per_minute, upload_per_hour,
                                upload_per_day, upload_per_month, total_uploads, max_retention_seconds)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            GROUP_COLUMNS
        ))
        .bind(&limits.name)
        .bind(limits.allow_upload)
        .bind(limits.max_file_size)
        .bind(limits.upload_per_minute)
        .bind(limits.upload_per_hour)
        .bind(limits.upload_per_day)
        .bind(limits.upload_per_month)
        .bind(limits.total_uploads)
        .bind(limits.max_retention_seconds)
        .fetch_one(&self.pool)
        .await?;

        Ok(group)
    }

    #[tracing::instrument(skip(self, limits), fields(db.table = "groups", db.operation = "update", db.record_id = id))]
    async fn update_group(&self, id: i32, limits: &GroupLimits) -> Result<Group, AppError> {
        let group = sqlx::query_as::<Postgres, Group>(&format!(
            r#"
            UPDATE groups SET name = $2, allow_upload = $3, max_file_size = $4, upload_per_minute = $5,
                upload_per_hour = $6, upload_per_day = $7, upload_per_month = $8, total_uploads = $9,
                max_retention_seconds = $10
            WHERE id = $1
            RETURNING {}
            "#,
            GROUP_COLUMNS
        ))
        .bind(id)
        .bind(&limits.name)
        .bind(limits.allow_upload)
        .bind(limits.max_file_size)
        .bind(limits.upload_per_minute)
        .bind(limits.upload_per_hour)
        .bind(limits.upload_per_day)
        .bind(limits.upload_per_month)
        .bind(limits.total_uploads)
        .bind(limits.max_retention_seconds)
        .fetch_optional(&self.pool)
        .await?;

        group.ok_or_else(|| AppError::NotFound(format!("group {} not found", id)))
    }

    #[tracing::instrument(skip(self), fields(db.table = "groups", db.operation = "delete", db.record_id = id))]
    async fn delete_group_if_unreferenced(&self, id: i32) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let locked = sqlx::query_scalar::<Postgres, i32>(
            "SELECT id FROM groups WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        if locked.is_none() {
            return Err(AppError::NotFound(format!("group {} not found", id)));
        }

        let members = sqlx::query_scalar::<Postgres, i64>(
            "SELECT COUNT(*) FROM users WHERE group_id = $1",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        if members > 0 {
            tx.rollback().await?;
            return Err(AppError::Conflict(format!(
                "group {} still has {} members",
                id, members
            )));
        }

        sqlx::query("DELETE FROM groups WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(group_id = id, "Group deleted");
        Ok(())
    }
}
