//! Shared setup for the HTTP tests: a memory store, a local driver in a
//! temporary directory and the real codec behind the full router.

#![allow(dead_code)]

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use axum_test::multipart::{MultipartForm, Part};
use axum_test::{TestResponse, TestServer};
use bytes::Bytes;
use chrono::Utc;
use imgu_api::setup::routes::setup_routes;
use imgu_api::state::{AppState, Stores};
use imgu_core::{Group, Session, StorageConfig, User, UserRole};
use imgu_db::MemoryStore;
use imgu_processing::NativeCodec;
use imgu_storage::{BackendDriverFactory, StorageRegistry};
use tempfile::TempDir;

pub const ADMIN_TOKEN: &str = "admin-session-token";
pub const MEMBER_TOKEN: &str = "member-session-token";
pub const EXPIRED_TOKEN: &str = "expired-session-token";

pub const ADMIN_ID: i32 = 1;
pub const MEMBER_ID: i32 = 2;
/// Group of the member: one hour retention ceiling
pub const LIMITED_GROUP_ID: i32 = 1;
pub const LOCAL_STORAGE_ID: i32 = 1;

pub struct TestApp {
    pub server: TestServer,
    pub store: Arc<MemoryStore>,
    pub storage_dir: TempDir,
}

pub fn group(id: i32, allow_upload: bool, max_retention_seconds: i64) -> Group {
    Group {
        id,
        name: format!("group-{}", id),
        allow_upload,
        max_file_size: 4_000_000,
        upload_per_minute: 30,
        upload_per_hour: 100,
        upload_per_day: 1000,
        upload_per_month: 1000,
        total_uploads: 10000,
        max_retention_seconds,
    }
}

fn user(id: i32, role: UserRole, group_id: i32) -> User {
    User {
        id,
        username: format!("user{}", id),
        email: format!("user{}@example.com", id),
        email_verified: true,
        role,
        group_id,
        group_expires_at: None,
    }
}

fn session(token: &str, user_id: i32, valid_for: chrono::Duration) -> Session {
    Session {
        token: token.to_string(),
        user_id,
        expires_at: Utc::now() + valid_for,
    }
}

/// Router over a fresh store. `guest_uploads` controls the default group.
pub async fn setup_test_app(guest_uploads: bool) -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let storage_dir = tempfile::tempdir().expect("Failed to create storage dir");

    store.put_group(group(0, guest_uploads, 0));
    store.put_group(group(LIMITED_GROUP_ID, true, 3600));
    store.put_user(user(ADMIN_ID, UserRole::Admin, 0));
    store.put_user(user(MEMBER_ID, UserRole::User, LIMITED_GROUP_ID));
    store.put_session(session(ADMIN_TOKEN, ADMIN_ID, chrono::Duration::days(1)));
    store.put_session(session(MEMBER_TOKEN, MEMBER_ID, chrono::Duration::days(1)));
    store.put_session(session(EXPIRED_TOKEN, MEMBER_ID, -chrono::Duration::minutes(1)));
    store.put_storage(StorageConfig {
        id: LOCAL_STORAGE_ID,
        name: "local".to_string(),
        storage_type: "local".to_string(),
        config: serde_json::json!({ "path": storage_dir.path() }).to_string(),
        enabled: true,
        allow_upload: true,
    });

    let stores = Stores::shared(store.clone());
    let factory = BackendDriverFactory::new(Duration::from_secs(5));
    let registry = StorageRegistry::init(stores.storages.as_ref(), &factory)
        .await
        .expect("Failed to build storage registry");

    let state = Arc::new(AppState::new(
        &stores,
        Arc::new(registry),
        Arc::new(NativeCodec::new()),
        0,
    ));
    let server = TestServer::new(setup_routes(state, 8 * 1024 * 1024))
        .expect("Failed to create test server");

    TestApp {
        server,
        store,
        storage_dir,
    }
}

/// A small opaque red PNG
pub fn png_fixture() -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(6, 4, image::Rgba([220, 20, 20, 255]));
    let mut out = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut out, image::ImageFormat::Png)
        .expect("Failed to encode fixture");
    out.into_inner()
}

pub fn upload_form(content: Vec<u8>, format: &str, expire: i64) -> MultipartForm {
    let part = Part::bytes(Bytes::from(content))
        .file_name("fixture.png")
        .mime_type("image/png");
    MultipartForm::new()
        .add_part("file", part)
        .add_text("format", format)
        .add_text("expire", expire.to_string())
}

pub async fn upload(
    app: &TestApp,
    token: Option<&str>,
    format: &str,
    expire: i64,
) -> TestResponse {
    let mut request = app
        .server
        .post("/api/upload")
        .multipart(upload_form(png_fixture(), format, expire));
    if let Some(token) = token {
        request = request.add_header("Authorization", format!("Bearer {}", token));
    }
    request.await
}
