use async_trait::async_trait;
use chrono::{DateTime, Utc};
use imgu_core::{AppError, ImageRecord, NewImageRecord};
use sqlx::{PgPool, Postgres};

use crate::store::ImageStore;

const IMAGE_COLUMNS: &str =
    "id, storage_id, uploader_id, public_name, internal_name, uploader_ip, created_at, expires_at";

/// Repository for image metadata
#[derive(Clone)]
pub struct ImageRepository {
    pool: PgPool,
}

impl ImageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ImageStore for ImageRepository {
    #[tracing::instrument(skip(self, image), fields(db.table = "images", db.operation = "insert", public_name = %image.public_name))]
    async fn insert_image(&self, image: &NewImageRecord) -> Result<ImageRecord, AppError> {
        let record = sqlx::query_as::<Postgres, ImageRecord>(&format!(
            r#"
            INSERT INTO images (storage_id, uploader_id, public_name, internal_name, uploader_ip, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            IMAGE_COLUMNS
        ))
        .bind(image.storage_id)
        .bind(image.uploader_id)
        .bind(&image.public_name)
        .bind(&image.internal_name)
        .bind(&image.uploader_ip)
        .bind(image.expires_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(record)
    }

    #[tracing::instrument(skip(self), fields(db.table = "images", db.operation = "select"))]
    async fn find_live_image(
        &self,
        public_name: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<ImageRecord>, AppError> {
        let record = sqlx::query_as::<Postgres, ImageRecord>(&format!(
            "SELECT {} FROM images WHERE public_name = $1 AND (expires_at IS NULL OR expires_at > $2)",
            IMAGE_COLUMNS
        ))
        .bind(public_name)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    #[tracing::instrument(skip(self), fields(db.table = "images", db.operation = "select"))]
    async fn list_expired_images(
        &self,
        now: DateTime<Utc>,
        after_id: i64,
        limit: i64,
    ) -> Result<Vec<ImageRecord>, AppError> {
        let records = sqlx::query_as::<Postgres, ImageRecord>(&format!(
            "SELECT {} FROM images WHERE expires_at IS NOT NULL AND expires_at <= $1 AND id > $2 ORDER BY id ASC LIMIT $3",
            IMAGE_COLUMNS
        ))
        .bind(now)
        .bind(after_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    #[tracing::instrument(skip(self), fields(db.table = "images", db.operation = "select"))]
    async fn list_all_images(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ImageRecord>, AppError> {
        let records = sqlx::query_as::<Postgres, ImageRecord>(&format!(
            "SELECT {} FROM images ORDER BY id DESC LIMIT $1 OFFSET $2",
            IMAGE_COLUMNS
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    #[tracing::instrument(skip(self), fields(db.table = "images", db.operation = "select"))]
    async fn list_images_by_uploader(
        &self,
        uploader_id: i32,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ImageRecord>, AppError> {
        let records = sqlx::query_as::<Postgres, ImageRecord>(&format!(
            "SELECT {} FROM images WHERE uploader_id = $1 ORDER BY id DESC LIMIT $2 OFFSET $3",
            IMAGE_COLUMNS
        ))
        .bind(uploader_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    #[tracing::instrument(skip(self), fields(db.table = "images", db.operation = "delete", db.record_id = id))]
    async fn delete_image(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM images WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
