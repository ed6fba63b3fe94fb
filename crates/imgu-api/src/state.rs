//! Shared handler state

use std::sync::Arc;

use imgu_db::{
    GroupRepository, GroupStore, ImageRepository, ImageStore, SessionRepository, SessionStore,
    SettingRepository, SettingStore, StorageConfigStore, StorageRepository, UserRepository,
    UserStore,
};
use imgu_processing::ImageCodec;
use imgu_services::{
    GroupAdminService, GroupResolver, ImageService, SettingsAdminService, SiteSettings,
    StorageAdminService, UploadService,
};
use imgu_storage::StorageRegistry;
use sqlx::PgPool;

/// One handle per metadata store trait
#[derive(Clone)]
pub struct Stores {
    pub storages: Arc<dyn StorageConfigStore>,
    pub images: Arc<dyn ImageStore>,
    pub groups: Arc<dyn GroupStore>,
    pub users: Arc<dyn UserStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub settings: Arc<dyn SettingStore>,
}

impl Stores {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            storages: Arc::new(StorageRepository::new(pool.clone())),
            images: Arc::new(ImageRepository::new(pool.clone())),
            groups: Arc::new(GroupRepository::new(pool.clone())),
            users: Arc::new(UserRepository::new(pool.clone())),
            sessions: Arc::new(SessionRepository::new(pool.clone())),
            settings: Arc::new(SettingRepository::new(pool)),
        }
    }

    /// Every store backed by the same value, e.g. an in-memory store
    pub fn shared<S>(store: Arc<S>) -> Self
    where
        S: StorageConfigStore
            + ImageStore
            + GroupStore
            + UserStore
            + SessionStore
            + SettingStore
            + 'static,
    {
        Self {
            storages: store.clone(),
            images: store.clone(),
            groups: store.clone(),
            users: store.clone(),
            sessions: store.clone(),
            settings: store,
        }
    }
}

pub struct AppState {
    pub uploads: UploadService,
    pub images: ImageService,
    pub storage_admin: StorageAdminService,
    pub group_admin: GroupAdminService,
    pub settings_admin: SettingsAdminService,
    pub sessions: Arc<dyn SessionStore>,
    pub users: Arc<dyn UserStore>,
    pub trusted_proxy_count: usize,
}

impl AppState {
    pub fn new(
        stores: &Stores,
        registry: Arc<StorageRegistry>,
        codec: Arc<dyn ImageCodec>,
        trusted_proxy_count: usize,
    ) -> Self {
        let settings = SiteSettings::new(stores.settings.clone());
        let resolver = GroupResolver::new(stores.groups.clone(), settings.clone());

        Self {
            uploads: UploadService::new(
                resolver,
                settings.clone(),
                codec,
                registry.clone(),
                stores.images.clone(),
            ),
            images: ImageService::new(stores.images.clone(), registry),
            storage_admin: StorageAdminService::new(stores.storages.clone()),
            group_admin: GroupAdminService::new(
                stores.groups.clone(),
                stores.users.clone(),
                settings.clone(),
            ),
            settings_admin: SettingsAdminService::new(settings, stores.groups.clone()),
            sessions: stores.sessions.clone(),
            users: stores.users.clone(),
            trusted_proxy_count,
        }
    }
}
