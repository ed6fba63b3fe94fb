//! Store traits consumed by the registry, the services and the scheduler.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use imgu_core::{
    AppError, Group, GroupLimits, ImageRecord, NewImageRecord, Session, StorageConfig,
    StorageConfigUpdate, StorageType, User,
};

#[async_trait]
pub trait StorageConfigStore: Send + Sync {
    async fn list_storages(&self) -> Result<Vec<StorageConfig>, AppError>;

    async fn find_storage(&self, id: i32) -> Result<Option<StorageConfig>, AppError>;

    /// Insert a new backend with an empty config, disabled and closed for uploads
    async fn create_storage(
        &self,
        name: &str,
        storage_type: StorageType,
    ) -> Result<StorageConfig, AppError>;

    async fn update_storage(
        &self,
        id: i32,
        update: &StorageConfigUpdate,
    ) -> Result<StorageConfig, AppError>;

    async fn set_storage_enabled(&self, id: i32, enabled: bool) -> Result<(), AppError>;

    /// Delete the row unless an image references it. Counting and deleting
    /// happen atomically with respect to concurrent image inserts.
    ///
    /// Returns `AppError::Conflict` when referenced, `AppError::NotFound` when absent.
    async fn delete_storage_if_unreferenced(&self, id: i32) -> Result<(), AppError>;
}

#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn insert_image(&self, image: &NewImageRecord) -> Result<ImageRecord, AppError>;

    /// Look up by public name, ignoring records already past their expiry
    async fn find_live_image(
        &self,
        public_name: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<ImageRecord>, AppError>;

    /// One page of records expired at `now`, in id order, starting after
    /// `after_id`. Pass the last id of a page to fetch the next one.
    async fn list_expired_images(
        &self,
        now: DateTime<Utc>,
        after_id: i64,
        limit: i64,
    ) -> Result<Vec<ImageRecord>, AppError>;

    /// Every image, newest first
    async fn list_all_images(&self, limit: i64, offset: i64)
        -> Result<Vec<ImageRecord>, AppError>;

    async fn list_images_by_uploader(
        &self,
        uploader_id: i32,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ImageRecord>, AppError>;

    /// Returns whether a row was removed
    async fn delete_image(&self, id: i64) -> Result<bool, AppError>;
}

#[async_trait]
pub trait GroupStore: Send + Sync {
    async fn find_group(&self, id: i32) -> Result<Option<Group>, AppError>;

    async fn list_groups(&self) -> Result<Vec<Group>, AppError>;

    async fn create_group(&self, limits: &GroupLimits) -> Result<Group, AppError>;

    async fn update_group(&self, id: i32, limits: &GroupLimits) -> Result<Group, AppError>;

    /// Delete the group unless a user is a member. Atomic like
    /// [`StorageConfigStore::delete_storage_if_unreferenced`].
    async fn delete_group_if_unreferenced(&self, id: i32) -> Result<(), AppError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user(&self, id: i32) -> Result<Option<User>, AppError>;

    async fn set_user_group(
        &self,
        user_id: i32,
        group_id: i32,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<(), AppError>;

    /// Move every user whose group assignment expired back to `default_group`
    /// and clear the expiry. Returns the number of users moved.
    async fn revert_expired_groups(
        &self,
        now: DateTime<Utc>,
        default_group: i32,
    ) -> Result<u64, AppError>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn find_session(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Session>, AppError>;

    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64, AppError>;
}

#[async_trait]
pub trait SettingStore: Send + Sync {
    async fn get_setting(&self, key: &str) -> Result<Option<String>, AppError>;

    async fn set_setting(&self, key: &str, value: &str) -> Result<(), AppError>;
}
