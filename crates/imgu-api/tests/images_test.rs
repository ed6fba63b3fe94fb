mod helpers;

use axum::http::StatusCode;
use helpers::*;
use imgu_core::ImageFormat;

#[tokio::test]
async fn test_guest_upload_then_fetch() {
    let app = setup_test_app(true).await;

    let response = upload(&app, None, "webp", 0).await;
    response.assert_status(StatusCode::CREATED);
    let body: serde_json::Value = response.json();
    let name = body["public_name"].as_str().unwrap().to_string();
    assert!(name.ends_with(".webp"));
    assert_eq!(body["url"], format!("/i/{}", name));
    assert_eq!(body["storage_id"], LOCAL_STORAGE_ID);
    assert!(body["expires_at"].is_null());

    assert!(app.storage_dir.path().join(&name).exists());
    let records = app.store.images();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].uploader_id, None);

    let response = app.server.get(&format!("/i/{}", name)).await;
    response.assert_status_ok();
    assert_eq!(response.header("content-type"), "image/webp");
    assert_eq!(
        ImageFormat::sniff(response.as_bytes()),
        Some(ImageFormat::Webp)
    );
}

#[tokio::test]
async fn test_guest_upload_denied_by_group() {
    let app = setup_test_app(false).await;

    let response = upload(&app, None, "png", 0).await;
    response.assert_status(StatusCode::FORBIDDEN);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "GUEST_UPLOAD_NOT_ALLOWED");
    assert!(app.store.images().is_empty());
}

#[tokio::test]
async fn test_retention_ceiling_applies_to_member() {
    let app = setup_test_app(true).await;

    let response = upload(&app, Some(MEMBER_TOKEN), "png", 0).await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "EXPIRE_TOO_LARGE");

    let response = upload(&app, Some(MEMBER_TOKEN), "png", 7200).await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let response = upload(&app, Some(MEMBER_TOKEN), "png", 60).await;
    response.assert_status(StatusCode::CREATED);
    let body: serde_json::Value = response.json();
    assert!(body["expires_at"].is_string());

    let records = app.store.images();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].uploader_id, Some(MEMBER_ID));
}

#[tokio::test]
async fn test_malformed_upload_is_invalid_input() {
    let app = setup_test_app(true).await;

    let response = upload(&app, None, "bmp", 0).await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "INVALID_INPUT");

    let form = upload_form(b"definitely not an image".to_vec(), "png", 0);
    let response = app.server.post("/api/upload").multipart(form).await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "IMAGE_PROCESSING_ERROR");
}

#[tokio::test]
async fn test_expired_session_is_rejected() {
    let app = setup_test_app(true).await;

    let response = upload(&app, Some(EXPIRED_TOKEN), "png", 60).await;
    response.assert_status(StatusCode::UNAUTHORIZED);

    let response = app.server.get("/api/images").await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unknown_image_is_not_found() {
    let app = setup_test_app(true).await;

    let response = app.server.get("/i/abcdefgh.png").await;
    response.assert_status(StatusCode::NOT_FOUND);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_owner_lists_and_deletes() {
    let app = setup_test_app(true).await;

    let response = upload(&app, Some(MEMBER_TOKEN), "png", 60).await;
    response.assert_status(StatusCode::CREATED);
    let body: serde_json::Value = response.json();
    let name = body["public_name"].as_str().unwrap().to_string();

    let response = app
        .server
        .get("/api/images")
        .add_header("Authorization", format!("Bearer {}", MEMBER_TOKEN))
        .await;
    response.assert_status_ok();
    let listed: serde_json::Value = response.json();
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["public_name"], name.as_str());

    // Guests cannot delete
    let response = app.server.delete(&format!("/api/images/{}", name)).await;
    response.assert_status(StatusCode::UNAUTHORIZED);

    let response = app
        .server
        .delete(&format!("/api/images/{}", name))
        .add_header("Authorization", format!("Bearer {}", MEMBER_TOKEN))
        .await;
    response.assert_status(StatusCode::NO_CONTENT);

    assert!(app.store.images().is_empty());
    assert!(!app.storage_dir.path().join(&name).exists());
    app.server
        .get(&format!("/i/{}", name))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_deletes_any_image() {
    let app = setup_test_app(true).await;

    let response = upload(&app, Some(MEMBER_TOKEN), "jpeg", 60).await;
    response.assert_status(StatusCode::CREATED);
    let body: serde_json::Value = response.json();
    let name = body["public_name"].as_str().unwrap().to_string();
    assert!(name.ends_with(".jpg"));

    let response = app
        .server
        .delete(&format!("/api/images/{}", name))
        .add_header("Authorization", format!("Bearer {}", ADMIN_TOKEN))
        .await;
    response.assert_status(StatusCode::NO_CONTENT);
    assert!(app.store.images().is_empty());
}

#[tokio::test]
async fn test_common_headers_are_set() {
    let app = setup_test_app(true).await;

    let response = app.server.get("/health").await;
    response.assert_status_ok();
    assert_eq!(response.header("x-content-type-options"), "nosniff");
    assert!(!response.header("x-request-id").is_empty());
}
