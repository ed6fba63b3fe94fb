//! Test doubles shared by the service tests

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use imgu_core::{Group, ImageFormat, StorageConfig, StorageType, User, UserRole};
use imgu_processing::{EncodeParams, ImageCodec};
use imgu_storage::{StorageDriver, StorageError, StorageResult, StoredObject};

pub fn group(id: i32, max_file_size: i64, max_retention_seconds: i64) -> Group {
    Group {
        id,
        name: format!("group-{}", id),
        allow_upload: true,
        max_file_size,
        upload_per_minute: 30,
        upload_per_hour: 100,
        upload_per_day: 1000,
        upload_per_month: 1000,
        total_uploads: 10000,
        max_retention_seconds,
    }
}

pub fn user(id: i32, group_id: i32) -> User {
    User {
        id,
        username: format!("user{}", id),
        email: format!("user{}@example.com", id),
        email_verified: true,
        role: UserRole::User,
        group_id,
        group_expires_at: None,
    }
}

pub fn storage_row(id: i32) -> StorageConfig {
    StorageConfig {
        id,
        name: format!("fake-{}", id),
        storage_type: "local".to_string(),
        config: "{}".to_string(),
        enabled: true,
        allow_upload: true,
    }
}

/// In-memory driver with switchable failure modes
#[derive(Default)]
pub struct FakeDriver {
    id: i32,
    objects: Mutex<HashMap<String, Bytes>>,
    failing_deletes: Mutex<HashSet<String>>,
    assigned_name: Option<String>,
    redirect_base: Option<String>,
    deletes: AtomicUsize,
}

impl FakeDriver {
    pub fn new(id: i32) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    /// Behaves like a host that names objects itself
    pub fn assigning(id: i32, name: &str) -> Self {
        Self {
            id,
            assigned_name: Some(name.to_string()),
            ..Default::default()
        }
    }

    /// Serves reads as redirects to `base/key`
    pub fn redirecting(id: i32, base: &str) -> Self {
        Self {
            id,
            redirect_base: Some(base.to_string()),
            ..Default::default()
        }
    }

    pub fn insert(&self, key: &str, content: &'static [u8]) {
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), Bytes::from_static(content));
    }

    pub fn fail_delete_of(&self, key: &str) {
        self.failing_deletes.lock().unwrap().insert(key.to_string());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.lock().unwrap().contains_key(key)
    }

    pub fn object_count(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    pub fn delete_calls(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StorageDriver for FakeDriver {
    fn id(&self) -> i32 {
        self.id
    }

    fn storage_type(&self) -> StorageType {
        StorageType::Local
    }

    async fn put(
        &self,
        key: &str,
        content: Bytes,
        _expires_at: Option<DateTime<Utc>>,
    ) -> StorageResult<Option<String>> {
        let name = self.assigned_name.clone().unwrap_or_else(|| key.to_string());
        let mut objects = self.objects.lock().unwrap();
        if objects.contains_key(&name) {
            return Err(StorageError::AlreadyExists(name));
        }
        objects.insert(name, content);
        Ok(self.assigned_name.clone())
    }

    async fn get(&self, key: &str) -> StorageResult<StoredObject> {
        if let Some(base) = &self.redirect_base {
            return Ok(StoredObject::Redirect(format!("{}/{}", base, key)));
        }
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .map(StoredObject::Bytes)
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        if self.failing_deletes.lock().unwrap().contains(key) {
            return Err(StorageError::DeleteFailed("backend unavailable".to_string()));
        }
        self.objects
            .lock()
            .unwrap()
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }
}

/// Codec that counts calls and emits a minimal file of the target format
#[derive(Default)]
pub struct CountingCodec {
    calls: AtomicUsize,
    fail: bool,
    /// Extra padding appended to the output
    grow_by: usize,
    last_params: Mutex<Option<EncodeParams>>,
}

impl CountingCodec {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn growing(grow_by: usize) -> Self {
        Self {
            grow_by,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_params(&self) -> Option<EncodeParams> {
        *self.last_params.lock().unwrap()
    }
}

/// Smallest byte prefix [`ImageFormat::sniff`] recognizes
pub fn magic(format: ImageFormat) -> Vec<u8> {
    match format {
        ImageFormat::Png => b"\x89PNG\r\n\x1a\n".to_vec(),
        ImageFormat::Jpeg => vec![0xFF, 0xD8, 0xFF, 0xE0],
        ImageFormat::Gif => b"GIF89a".to_vec(),
        ImageFormat::Webp => b"RIFF\x00\x00\x00\x00WEBPVP8 ".to_vec(),
        ImageFormat::Avif => b"\x00\x00\x00\x1cftypavif".to_vec(),
    }
}

impl ImageCodec for CountingCodec {
    fn encode(&self, _input: &[u8], params: &EncodeParams) -> Option<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_params.lock().unwrap() = Some(*params);
        if self.fail {
            return None;
        }
        let mut output = magic(params.format);
        output.resize(output.len() + self.grow_by, 0);
        Some(output)
    }
}
