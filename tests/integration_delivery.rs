mod common;

use common::spawn_app;
use reqwest::StatusCode;
use uuid::Uuid;

#[tokio::test]
async fn clip_flows_from_sender_to_recipient_exactly_once() {
    let app = spawn_app().await;
    let (user_a, token_a) = app.register_approved("alice", "device-a").await;
    let (_user_b, token_b) = app.register_approved("bob", "device-b").await;

    let audio = b"fake m4a bytes".to_vec();
    let message_id = app.upload_ok(&token_a, audio.clone(), "5").await;

    // B sees exactly one unread entry with A's id and the uploaded duration.
    let unread = app.list_unread(&token_b).await;
    assert_eq!(unread.len(), 1);
    assert_eq!(unread[0]["id"].as_str().unwrap(), message_id.to_string());
    assert_eq!(unread[0]["sender_id"].as_str().unwrap(), user_a.to_string());
    assert_eq!(unread[0]["duration"].as_i64().unwrap(), 5);

    // Download serves the original bytes and records the receipt.
    let resp = app.download(&token_b, message_id).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["content-length"], audio.len().to_string().as_str());
    assert_eq!(resp.bytes().await.unwrap().to_vec(), audio);
    assert_eq!(app.receipt_count(message_id).await, 1);

    // Gone from B's unread list, and A never saw their own clip.
    assert!(app.list_unread(&token_b).await.is_empty());
    assert!(app.list_unread(&token_a).await.is_empty());
}

#[tokio::test]
async fn mark_received_removes_only_that_message() {
    let app = spawn_app().await;
    let (_user_a, token_a) = app.register_approved("alice", "device-a").await;
    let (_user_b, token_b) = app.register_approved("bob", "device-b").await;

    let first = app.upload_ok(&token_a, b"first".to_vec(), "3").await;
    let second = app.upload_ok(&token_a, b"second".to_vec(), "4").await;

    let resp = app.mark_received(&token_b, first).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let unread = app.list_unread(&token_b).await;
    assert_eq!(unread.len(), 1);
    assert_eq!(unread[0]["id"].as_str().unwrap(), second.to_string());
}

#[tokio::test]
async fn unread_is_ordered_oldest_first() {
    let app = spawn_app().await;
    let (_user_a, token_a) = app.register_approved("alice", "device-a").await;
    let (_user_b, token_b) = app.register_approved("bob", "device-b").await;

    let mut uploaded = Vec::new();
    for i in 0..3 {
        uploaded.push(app.upload_ok(&token_a, vec![i as u8; 16], "2").await);
    }

    let unread = app.list_unread(&token_b).await;
    let listed: Vec<Uuid> =
        unread.iter().map(|m| Uuid::parse_str(m["id"].as_str().unwrap()).unwrap()).collect();
    assert_eq!(listed, uploaded);
}

#[tokio::test]
async fn every_approved_user_receives_independently() {
    let app = spawn_app().await;
    let (_user_a, token_a) = app.register_approved("alice", "device-a").await;
    let (_user_b, token_b) = app.register_approved("bob", "device-b").await;
    let (_user_c, token_c) = app.register_approved("carol", "device-c").await;

    let message_id = app.upload_ok(&token_a, b"to everyone".to_vec(), "7").await;

    assert_eq!(app.download(&token_b, message_id).await.status(), StatusCode::OK);

    // B's receipt does not consume the message for C.
    let unread_c = app.list_unread(&token_c).await;
    assert_eq!(unread_c.len(), 1);

    assert_eq!(app.download(&token_c, message_id).await.status(), StatusCode::OK);
    assert!(app.list_unread(&token_c).await.is_empty());
    assert_eq!(app.receipt_count(message_id).await, 2);
}

#[tokio::test]
async fn unknown_message_is_not_found() {
    let app = spawn_app().await;
    let (_user, token) = app.register_approved("alice", "device-a").await;

    let missing = Uuid::new_v4();
    assert_eq!(app.download(&token, missing).await.status(), StatusCode::NOT_FOUND);
    assert_eq!(app.mark_received(&token, missing).await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn missing_blob_surfaces_as_not_found() {
    let app = spawn_app().await;
    let (_user_a, token_a) = app.register_approved("alice", "device-a").await;
    let (_user_b, token_b) = app.register_approved("bob", "device-b").await;

    let message_id = app.upload_ok(&token_a, b"doomed".to_vec(), "2").await;

    // Make the ledger and the store diverge.
    let blob_key: String = sqlx::query_scalar("SELECT blob_key FROM audio_messages WHERE id = ?")
        .bind(message_id)
        .fetch_one(&app.pool)
        .await
        .unwrap();
    std::fs::remove_file(app.audio_dir.join(&blob_key)).unwrap();

    assert_eq!(app.download(&token_b, message_id).await.status(), StatusCode::NOT_FOUND);
}
