//! In-process implementations of every store trait
//!
//! All tables share one lock, so the "count references then delete"
//! operations are atomic with respect to inserts exactly like the
//! PostgreSQL repositories.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use imgu_core::constants::DEFAULT_GROUP_ID;
use imgu_core::{
    AppError, Group, GroupLimits, ImageRecord, NewImageRecord, Session, StorageConfig,
    StorageConfigUpdate, StorageType, User,
};

use crate::store::{
    GroupStore, ImageStore, SessionStore, SettingStore, StorageConfigStore, UserStore,
};

#[derive(Default)]
struct MemoryState {
    storages: BTreeMap<i32, StorageConfig>,
    images: BTreeMap<i64, ImageRecord>,
    groups: BTreeMap<i32, Group>,
    users: BTreeMap<i32, User>,
    sessions: HashMap<String, Session>,
    settings: HashMap<String, String>,
    next_storage_id: i32,
    next_image_id: i64,
    next_group_id: i32,
}

/// In-memory metadata store for tests
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    fail_image_inserts: Arc<AtomicBool>,
}

impl MemoryStore {
    /// Empty store seeded with the default group (id 0), like the initial migration
    pub fn new() -> Self {
        let store = Self::default();
        store.put_group(Group {
            id: DEFAULT_GROUP_ID,
            name: "Default user group".to_string(),
            allow_upload: true,
            max_file_size: 16_000_000,
            upload_per_minute: 30,
            upload_per_hour: 100,
            upload_per_day: 1000,
            upload_per_month: 1000,
            total_uploads: 10000,
            max_retention_seconds: 0,
        });
        store
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Insert or replace a storage row as-is
    pub fn put_storage(&self, storage: StorageConfig) {
        let mut state = self.state();
        state.next_storage_id = state.next_storage_id.max(storage.id);
        state.storages.insert(storage.id, storage);
    }

    /// Insert or replace a group as-is
    pub fn put_group(&self, group: Group) {
        let mut state = self.state();
        state.next_group_id = state.next_group_id.max(group.id);
        state.groups.insert(group.id, group);
    }

    pub fn put_user(&self, user: User) {
        self.state().users.insert(user.id, user);
    }

    pub fn put_session(&self, session: Session) {
        self.state().sessions.insert(session.token.clone(), session);
    }

    /// Insert an image row with a caller-chosen creation and expiry time
    pub fn put_image(&self, image: ImageRecord) {
        let mut state = self.state();
        state.next_image_id = state.next_image_id.max(image.id);
        state.images.insert(image.id, image);
    }

    pub fn storage(&self, id: i32) -> Option<StorageConfig> {
        self.state().storages.get(&id).cloned()
    }

    pub fn user(&self, id: i32) -> Option<User> {
        self.state().users.get(&id).cloned()
    }

    pub fn images(&self) -> Vec<ImageRecord> {
        self.state().images.values().cloned().collect()
    }

    pub fn session_count(&self) -> usize {
        self.state().sessions.len()
    }

    /// Make every following `insert_image` fail with a database-shaped error
    pub fn set_fail_image_inserts(&self, fail: bool) {
        self.fail_image_inserts.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl StorageConfigStore for MemoryStore {
    async fn list_storages(&self) -> Result<Vec<StorageConfig>, AppError> {
        Ok(self.state().storages.values().cloned().collect())
    }

    async fn find_storage(&self, id: i32) -> Result<Option<StorageConfig>, AppError> {
        Ok(self.storage(id))
    }

    async fn create_storage(
        &self,
        name: &str,
        storage_type: StorageType,
    ) -> Result<StorageConfig, AppError> {
        let mut state = self.state();
        state.next_storage_id += 1;
        let storage = StorageConfig {
            id: state.next_storage_id,
            name: name.to_string(),
            storage_type: storage_type.to_string(),
            config: "{}".to_string(),
            enabled: false,
            allow_upload: false,
        };
        state.storages.insert(storage.id, storage.clone());
        Ok(storage)
    }

    async fn update_storage(
        &self,
        id: i32,
        update: &StorageConfigUpdate,
    ) -> Result<StorageConfig, AppError> {
        let mut state = self.state();
        let storage = state
            .storages
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("storage {} not found", id)))?;
        storage.enabled = update.enabled;
        storage.allow_upload = update.allow_upload;
        storage.config = update.config.clone();
        Ok(storage.clone())
    }

    async fn set_storage_enabled(&self, id: i32, enabled: bool) -> Result<(), AppError> {
        if let Some(storage) = self.state().storages.get_mut(&id) {
            storage.enabled = enabled;
        }
        Ok(())
    }

    async fn delete_storage_if_unreferenced(&self, id: i32) -> Result<(), AppError> {
        let mut state = self.state();
        if !state.storages.contains_key(&id) {
            return Err(AppError::NotFound(format!("storage {} not found", id)));
        }
        let references = state
            .images
            .values()
            .filter(|image| image.storage_id == id)
            .count();
        if references > 0 {
            return Err(AppError::Conflict(format!(
                "storage {} still holds {} images",
                id, references
            )));
        }
        state.storages.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl ImageStore for MemoryStore {
    async fn insert_image(&self, image: &NewImageRecord) -> Result<ImageRecord, AppError> {
        if self.fail_image_inserts.load(Ordering::SeqCst) {
            return Err(AppError::Internal("image insert rejected".to_string()));
        }
        let mut state = self.state();
        if !state.storages.contains_key(&image.storage_id) {
            return Err(AppError::InvalidInput(format!(
                "storage {} does not exist",
                image.storage_id
            )));
        }
        if state
            .images
            .values()
            .any(|existing| existing.public_name == image.public_name)
        {
            return Err(AppError::Conflict(format!(
                "public name {} already exists",
                image.public_name
            )));
        }
        state.next_image_id += 1;
        let record = ImageRecord {
            id: state.next_image_id,
            storage_id: image.storage_id,
            uploader_id: image.uploader_id,
            public_name: image.public_name.clone(),
            internal_name: image.internal_name.clone(),
            uploader_ip: image.uploader_ip.clone(),
            created_at: Utc::now(),
            expires_at: image.expires_at,
        };
        state.images.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_live_image(
        &self,
        public_name: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<ImageRecord>, AppError> {
        Ok(self
            .state()
            .images
            .values()
            .find(|image| image.public_name == public_name && !image.is_expired(now))
            .cloned())
    }

    async fn list_expired_images(
        &self,
        now: DateTime<Utc>,
        after_id: i64,
        limit: i64,
    ) -> Result<Vec<ImageRecord>, AppError> {
        Ok(self
            .state()
            .images
            .range(after_id.saturating_add(1)..)
            .map(|(_, image)| image)
            .filter(|image| image.is_expired(now))
            .take(usize::try_from(limit).unwrap_or(0))
            .cloned()
            .collect())
    }

    async fn list_all_images(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ImageRecord>, AppError> {
        Ok(self
            .state()
            .images
            .values()
            .rev()
            .skip(usize::try_from(offset).unwrap_or(0))
            .take(usize::try_from(limit).unwrap_or(0))
            .cloned()
            .collect())
    }

    async fn list_images_by_uploader(
        &self,
        uploader_id: i32,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ImageRecord>, AppError> {
        Ok(self
            .state()
            .images
            .values()
            .rev()
            .filter(|image| image.uploader_id == Some(uploader_id))
            .skip(usize::try_from(offset).unwrap_or(0))
            .take(usize::try_from(limit).unwrap_or(0))
            .cloned()
            .collect())
    }

    async fn delete_image(&self, id: i64) -> Result<bool, AppError> {
        Ok(self.state().images.remove(&id).is_some())
    }
}

#[async_trait]
impl GroupStore for MemoryStore {
    async fn find_group(&self, id: i32) -> Result<Option<Group>, AppError> {
        Ok(self.state().groups.get(&id).cloned())
    }

    async fn list_groups(&self) -> Result<Vec<Group>, AppError> {
        Ok(self.state().groups.values().cloned().collect())
    }

    async fn create_group(&self, limits: &GroupLimits) -> Result<Group, AppError> {
        let mut state = self.state();
        state.next_group_id += 1;
        let group = group_from_limits(state.next_group_id, limits);
        state.groups.insert(group.id, group.clone());
        Ok(group)
    }

    async fn update_group(&self, id: i32, limits: &GroupLimits) -> Result<Group, AppError> {
        let mut state = self.state();
        if !state.groups.contains_key(&id) {
            return Err(AppError::NotFound(format!("group {} not found", id)));
        }
        let group = group_from_limits(id, limits);
        state.groups.insert(id, group.clone());
        Ok(group)
    }

    async fn delete_group_if_unreferenced(&self, id: i32) -> Result<(), AppError> {
        let mut state = self.state();
        if !state.groups.contains_key(&id) {
            return Err(AppError::NotFound(format!("group {} not found", id)));
        }
        let members = state.users.values().filter(|u| u.group_id == id).count();
        if members > 0 {
            return Err(AppError::Conflict(format!(
                "group {} still has {} members",
                id, members
            )));
        }
        state.groups.remove(&id);
        Ok(())
    }
}

fn group_from_limits(id: i32, limits: &GroupLimits) -> Group {
    Group {
        id,
        name: limits.name.clone(),
        allow_upload: limits.allow_upload,
        max_file_size: limits.max_file_size,
        upload_per_minute: limits.upload_per_minute,
        upload_per_hour: limits.upload_per_hour,
        upload_per_day: limits.upload_per_day,
        upload_per_month: limits.upload_per_month,
        total_uploads: limits.total_uploads,
        max_retention_seconds: limits.max_retention_seconds,
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user(&self, id: i32) -> Result<Option<User>, AppError> {
        Ok(self.user(id))
    }

    async fn set_user_group(
        &self,
        user_id: i32,
        group_id: i32,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<(), AppError> {
        let mut state = self.state();
        if !state.groups.contains_key(&group_id) {
            return Err(AppError::InvalidInput(format!(
                "group {} does not exist",
                group_id
            )));
        }
        let user = state
            .users
            .get_mut(&user_id)
            .ok_or_else(|| AppError::NotFound(format!("user {} not found", user_id)))?;
        user.group_id = group_id;
        user.group_expires_at = expires_at;
        Ok(())
    }

    async fn revert_expired_groups(
        &self,
        now: DateTime<Utc>,
        default_group: i32,
    ) -> Result<u64, AppError> {
        let mut reverted = 0;
        for user in self.state().users.values_mut() {
            if user.group_expires_at.is_some_and(|at| at <= now) {
                user.group_id = default_group;
                user.group_expires_at = None;
                reverted += 1;
            }
        }
        Ok(reverted)
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn find_session(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Session>, AppError> {
        Ok(self
            .state()
            .sessions
            .get(token)
            .filter(|session| session.expires_at > now)
            .cloned())
    }

    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
        let mut state = self.state();
        let before = state.sessions.len();
        state.sessions.retain(|_, session| session.expires_at > now);
        Ok((before - state.sessions.len()) as u64)
    }
}

#[async_trait]
impl SettingStore for MemoryStore {
    async fn get_setting(&self, key: &str) -> Result<Option<String>, AppError> {
        Ok(self.state().settings.get(key).cloned())
    }

    async fn set_setting(&self, key: &str, value: &str) -> Result<(), AppError> {
        self.state()
            .settings
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}
