use std::sync::Arc;

use chrono::Utc;
use imgu_core::{AppError, ImageRecord, User};
use imgu_db::ImageStore;
use imgu_storage::{RegistryError, StorageDriver, StorageRegistry, StoredObject};

/// Read and delete paths for stored images
#[derive(Clone)]
pub struct ImageService {
    images: Arc<dyn ImageStore>,
    registry: Arc<StorageRegistry>,
}

impl ImageService {
    pub fn new(images: Arc<dyn ImageStore>, registry: Arc<StorageRegistry>) -> Self {
        Self { images, registry }
    }

    fn driver_for(&self, record: &ImageRecord) -> Result<Arc<dyn StorageDriver>, AppError> {
        self.registry.resolve(record.storage_id).map_err(|e| {
            if let RegistryError::UnknownDriver(storage_id) = e {
                tracing::error!(
                    storage_id,
                    image_id = record.id,
                    internal_name = %record.internal_name,
                    "Integrity error: image references a storage that is not loaded"
                );
            }
            AppError::Storage(e.to_string())
        })
    }

    /// Fetch by public name. Records past their expiry are treated as absent
    /// even before the sweep removes them.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, public_name: &str) -> Result<StoredObject, AppError> {
        let record = self
            .images
            .find_live_image(public_name, Utc::now())
            .await?
            .ok_or_else(|| AppError::NotFound(format!("image {} not found", public_name)))?;

        let driver = self.driver_for(&record)?;
        driver.get(&record.internal_name).await.map_err(|e| {
            if e.is_not_found() {
                tracing::warn!(
                    storage_id = record.storage_id,
                    internal_name = %record.internal_name,
                    "Image record has no backing object"
                );
                AppError::NotFound(format!("image {} not found", public_name))
            } else {
                tracing::error!(
                    storage_id = record.storage_id,
                    internal_name = %record.internal_name,
                    error = %e,
                    "Storage read failed"
                );
                AppError::Storage(e.to_string())
            }
        })
    }

    /// Remove the object, then the record. An object that is already gone
    /// on the backend does not block removal of the record.
    #[tracing::instrument(skip(self, record), fields(image_id = record.id, storage_id = record.storage_id))]
    pub async fn delete(&self, record: &ImageRecord) -> Result<(), AppError> {
        let driver = self.driver_for(record)?;

        match driver.delete(&record.internal_name).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                tracing::debug!(internal_name = %record.internal_name, "Object already absent");
            }
            Err(e) => {
                tracing::error!(
                    internal_name = %record.internal_name,
                    error = %e,
                    "Storage delete failed"
                );
                return Err(AppError::Storage(e.to_string()));
            }
        }

        self.images.delete_image(record.id).await?;
        tracing::info!(public_name = %record.public_name, "Image deleted");
        Ok(())
    }

    /// Delete on behalf of `user`: the uploader, or any admin
    pub async fn delete_owned(&self, user: &User, public_name: &str) -> Result<(), AppError> {
        let record = self
            .images
            .find_live_image(public_name, Utc::now())
            .await?
            .ok_or_else(|| AppError::NotFound(format!("image {} not found", public_name)))?;

        if !user.is_admin() && record.uploader_id != Some(user.id) {
            return Err(AppError::Forbidden(
                "only the uploader may delete this image".to_string(),
            ));
        }

        self.delete(&record).await
    }

    /// Newest first
    pub async fn list_mine(
        &self,
        user: &User,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ImageRecord>, AppError> {
        self.images
            .list_images_by_uploader(user.id, limit.clamp(1, 100), offset.max(0))
            .await
    }

    /// Admin listing across all uploaders, optionally narrowed to one
    pub async fn list_all(
        &self,
        uploader_id: Option<i32>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ImageRecord>, AppError> {
        let (limit, offset) = (limit.clamp(1, 100), offset.max(0));
        match uploader_id {
            Some(id) => self.images.list_images_by_uploader(id, limit, offset).await,
            None => self.images.list_all_images(limit, offset).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use chrono::Duration;
    use imgu_core::UserRole;
    use imgu_db::MemoryStore;

    use super::*;
    use crate::testing::{storage_row, user, FakeDriver};

    fn record(id: i64, storage_id: i32, name: &str, uploader: Option<i32>) -> ImageRecord {
        ImageRecord {
            id,
            storage_id,
            uploader_id: uploader,
            public_name: name.to_string(),
            internal_name: name.to_string(),
            uploader_ip: "127.0.0.1".to_string(),
            created_at: Utc::now(),
            expires_at: None,
        }
    }

    fn service(store: &Arc<MemoryStore>, drivers: Vec<Arc<FakeDriver>>) -> ImageService {
        let drivers = drivers
            .into_iter()
            .map(|d| {
                store.put_storage(storage_row(d.id()));
                (d as Arc<dyn StorageDriver>, true)
            })
            .collect();
        ImageService::new(store.clone(), Arc::new(StorageRegistry::from_drivers(drivers)))
    }

    #[tokio::test]
    async fn test_get_returns_bytes_or_redirect() {
        let store = Arc::new(MemoryStore::new());
        let local = Arc::new(FakeDriver::new(1));
        local.insert("abc.png", b"\x89PNG\r\n\x1a\n");
        let remote = Arc::new(FakeDriver::redirecting(2, "https://cdn.example.com"));
        let svc = service(&store, vec![local, remote]);
        store.put_image(record(1, 1, "abc.png", None));
        store.put_image(record(2, 2, "def.webp", None));

        assert_eq!(
            svc.get("abc.png").await.unwrap(),
            StoredObject::Bytes(Bytes::from_static(b"\x89PNG\r\n\x1a\n"))
        );
        assert_eq!(
            svc.get("def.webp").await.unwrap(),
            StoredObject::Redirect("https://cdn.example.com/def.webp".to_string())
        );
        assert!(matches!(svc.get("nope.png").await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_expired_record_is_not_served() {
        let store = Arc::new(MemoryStore::new());
        let driver = Arc::new(FakeDriver::new(1));
        driver.insert("old.png", b"x");
        let svc = service(&store, vec![driver]);
        let mut old = record(1, 1, "old.png", None);
        old.expires_at = Some(Utc::now() - Duration::seconds(1));
        store.put_image(old);

        assert!(matches!(svc.get("old.png").await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_tolerates_missing_object() {
        let store = Arc::new(MemoryStore::new());
        let driver = Arc::new(FakeDriver::new(1));
        let svc = service(&store, vec![driver.clone()]);
        let gone = record(1, 1, "gone.png", None);
        store.put_image(gone.clone());

        svc.delete(&gone).await.unwrap();
        assert_eq!(driver.delete_calls(), 1);
        assert!(store.images().is_empty());
    }

    #[tokio::test]
    async fn test_delete_keeps_record_when_backend_fails() {
        let store = Arc::new(MemoryStore::new());
        let driver = Arc::new(FakeDriver::new(1));
        driver.insert("stuck.png", b"x");
        driver.fail_delete_of("stuck.png");
        let svc = service(&store, vec![driver]);
        let stuck = record(1, 1, "stuck.png", None);
        store.put_image(stuck.clone());

        assert!(matches!(svc.delete(&stuck).await, Err(AppError::Storage(_))));
        assert_eq!(store.images().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_driver_is_storage_error() {
        let store = Arc::new(MemoryStore::new());
        let svc = service(&store, vec![]);
        store.put_storage(storage_row(9));
        store.put_image(record(1, 9, "orphan.png", None));

        assert!(matches!(svc.get("orphan.png").await, Err(AppError::Storage(_))));
    }

    #[tokio::test]
    async fn test_only_owner_or_admin_deletes() {
        let store = Arc::new(MemoryStore::new());
        let driver = Arc::new(FakeDriver::new(1));
        driver.insert("mine.png", b"x");
        driver.insert("theirs.png", b"x");
        let svc = service(&store, vec![driver]);
        store.put_image(record(1, 1, "mine.png", Some(1)));
        store.put_image(record(2, 1, "theirs.png", Some(2)));

        let owner = user(1, 0);
        assert!(matches!(
            svc.delete_owned(&owner, "theirs.png").await,
            Err(AppError::Forbidden(_))
        ));
        svc.delete_owned(&owner, "mine.png").await.unwrap();

        let mut admin = user(3, 0);
        admin.role = UserRole::Admin;
        svc.delete_owned(&admin, "theirs.png").await.unwrap();
        assert!(store.images().is_empty());
    }

    #[tokio::test]
    async fn test_list_mine_filters_by_uploader() {
        let store = Arc::new(MemoryStore::new());
        let svc = service(&store, vec![Arc::new(FakeDriver::new(1))]);
        store.put_image(record(1, 1, "a.png", Some(1)));
        store.put_image(record(2, 1, "b.png", Some(2)));
        store.put_image(record(3, 1, "c.png", Some(1)));

        let mine = svc.list_mine(&user(1, 0), 50, 0).await.unwrap();
        let names: Vec<_> = mine.iter().map(|r| r.public_name.as_str()).collect();
        assert_eq!(names, vec!["c.png", "a.png"]);
    }

    #[tokio::test]
    async fn test_list_all_spans_uploaders() {
        let store = Arc::new(MemoryStore::new());
        let svc = service(&store, vec![Arc::new(FakeDriver::new(1))]);
        store.put_image(record(1, 1, "a.png", Some(1)));
        store.put_image(record(2, 1, "b.png", None));
        store.put_image(record(3, 1, "c.png", Some(2)));

        let all = svc.list_all(None, 2, 0).await.unwrap();
        let names: Vec<_> = all.iter().map(|r| r.public_name.as_str()).collect();
        assert_eq!(names, vec!["c.png", "b.png"]);

        let rest = svc.list_all(None, 2, 2).await.unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].public_name, "a.png");

        let second = svc.list_all(Some(2), 50, 0).await.unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].public_name, "c.png");
    }
}
