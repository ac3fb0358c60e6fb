mod common;

use common::{spawn_app, spawn_app_with_max_upload};
use reqwest::StatusCode;
use squawk_server::auth::{Claims, encode_jwt};
use uuid::Uuid;

#[tokio::test]
async fn upload_without_duration_persists_nothing() {
    let app = spawn_app().await;
    let (_user, token) = app.register_approved("alice", "device-a").await;

    let resp = app.upload(&token, "clip.m4a", b"audio".to_vec(), None).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    assert_eq!(app.message_count().await, 0);
    assert_eq!(app.audio_file_count(), 0);
}

#[tokio::test]
async fn upload_with_malformed_duration_persists_nothing() {
    let app = spawn_app().await;
    let (_user, token) = app.register_approved("alice", "device-a").await;

    for duration in ["abc", "1.5", ""] {
        let resp = app.upload(&token, "clip.m4a", b"audio".to_vec(), Some(duration)).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "duration {duration:?}");
    }

    assert_eq!(app.message_count().await, 0);
    assert_eq!(app.audio_file_count(), 0);
}

#[tokio::test]
async fn upload_with_negative_duration_persists_nothing() {
    let app = spawn_app().await;
    let (_user, token) = app.register_approved("alice", "device-a").await;

    let resp = app.upload(&token, "clip.m4a", b"audio".to_vec(), Some("-5")).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    assert_eq!(app.message_count().await, 0);
    assert_eq!(app.audio_file_count(), 0);
}

#[tokio::test]
async fn upload_without_audio_part_is_rejected() {
    let app = spawn_app().await;
    let (_user, token) = app.register_approved("alice", "device-a").await;

    let form = reqwest::multipart::Form::new().text("duration", "5");
    let resp = app
        .client
        .post(format!("{}/api/messages/upload", app.base_url))
        .bearer_auth(&token)
        .multipart(form)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(app.message_count().await, 0);
}

#[tokio::test]
async fn oversized_upload_is_rejected_and_leaves_no_blob() {
    let app = spawn_app_with_max_upload(1024).await;
    let (_user, token) = app.register_approved("alice", "device-a").await;

    let resp = app.upload(&token, "clip.m4a", vec![0u8; 4096], Some("5")).await;
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);

    assert_eq!(app.message_count().await, 0);
    assert_eq!(app.audio_file_count(), 0);
}

#[tokio::test]
async fn upload_at_the_size_limit_succeeds() {
    let app = spawn_app_with_max_upload(1024).await;
    let (_user, token) = app.register_approved("alice", "device-a").await;

    let resp = app.upload(&token, "clip.m4a", vec![0u8; 1024], Some("5")).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    assert_eq!(app.audio_file_count(), 1);
}

#[tokio::test]
async fn ledger_failure_rolls_back_the_blob() {
    let app = spawn_app().await;

    // A valid token for a user id with no users row: the blob write succeeds,
    // then the ledger insert trips the sender foreign key.
    let ghost = Claims::new(Uuid::new_v4(), 30);
    let token = encode_jwt(&ghost, common::TEST_JWT_SECRET).unwrap();

    let resp = app.upload(&token, "clip.m4a", b"orphan bytes".to_vec(), Some("5")).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    assert_eq!(app.message_count().await, 0);
    assert_eq!(app.audio_file_count(), 0);
}

#[tokio::test]
async fn client_file_extension_never_names_the_blob() {
    let app = spawn_app().await;
    let (_user, token) = app.register_approved("alice", "device-a").await;

    let resp = app.upload(&token, "../../../evil.sh", b"audio".to_vec(), Some("2")).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: serde_json::Value = resp.json().await.unwrap();
    let message_id = body["message_id"].as_str().unwrap();

    let blob_key: String = sqlx::query_scalar("SELECT blob_key FROM audio_messages WHERE id = ?")
        .bind(Uuid::parse_str(message_id).unwrap())
        .fetch_one(&app.pool)
        .await
        .unwrap();

    assert_eq!(blob_key, format!("{message_id}.m4a"));
    assert!(app.audio_dir.join(&blob_key).is_file());
}
