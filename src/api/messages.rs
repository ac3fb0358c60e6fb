use crate::api::AppState;
use crate::api::middleware::AuthUser;
use crate::api::schemas::messages::{
    DownloadParams, MarkReceived, MarkReceivedResponse, MessagesResponse, UploadResponse,
};
use crate::error::{AppError, Result};
use axum::{
    Json,
    body::Body,
    extract::{Multipart, Query, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use bytes::BytesMut;
use futures::StreamExt;

/// Accepts a multipart form with an `audio` file part and a `duration` text
/// field, and creates a message. The whole form is read before anything is
/// persisted, so a bad duration leaves no blob behind.
///
/// # Errors
/// Returns `AppError::BadRequest` for a missing audio part or a
/// missing/malformed duration, and `AppError::PayloadTooLarge` past the size
/// limit.
pub async fn upload(
    auth_user: AuthUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse> {
    let limit = state.config.storage.max_upload_bytes;
    let mut audio: Option<(Option<String>, bytes::Bytes)> = None;
    let mut duration_value: Option<String> = None;

    while let Some(mut field) = multipart.next_field().await.map_err(bad_multipart)? {
        let name = field.name().map(ToOwned::to_owned);
        match name.as_deref() {
            Some("audio") => {
                let file_name = field.file_name().map(ToOwned::to_owned);
                let mut buf = BytesMut::new();
                while let Some(chunk) = field.chunk().await.map_err(bad_multipart)? {
                    if buf.len() + chunk.len() > limit {
                        return Err(AppError::PayloadTooLarge);
                    }
                    buf.extend_from_slice(&chunk);
                }
                audio = Some((file_name, buf.freeze()));
            }
            Some("duration") => {
                duration_value = Some(field.text().await.map_err(bad_multipart)?);
            }
            _ => {}
        }
    }

    let (file_name, bytes) =
        audio.ok_or_else(|| AppError::BadRequest("Audio file is required".to_string()))?;
    let duration = duration_value
        .ok_or_else(|| AppError::BadRequest("Duration is required".to_string()))?
        .trim()
        .parse::<i64>()
        .map_err(|_| AppError::BadRequest("Invalid duration format".to_string()))?;

    let stream = futures::stream::iter(vec![Ok(bytes)]).boxed();
    let message_id =
        state.delivery_service.upload(auth_user.user_id, file_name.as_deref(), duration, stream).await?;

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse { message_id, message: "Audio uploaded successfully".to_string() }),
    ))
}

/// Returns the caller's unread messages, oldest first.
///
/// # Errors
/// Returns `AppError::Database` if the query fails.
pub async fn list_unread(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse> {
    let messages = state.delivery_service.list_unread(auth_user.user_id).await?;

    Ok(Json(MessagesResponse { messages: messages.into_iter().map(Into::into).collect() }))
}

/// Streams the stored audio and lazily records the caller's receipt.
///
/// # Errors
/// Returns `AppError::NotFound` if the message is unknown, soft-deleted, or its
/// blob is gone.
pub async fn download(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<DownloadParams>,
) -> Result<impl IntoResponse> {
    let (message, size, stream) = state.delivery_service.download(auth_user.user_id, params.id).await?;

    let mut response = Response::new(Body::from_stream(stream));
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/octet-stream"));
    if let Ok(val) = HeaderValue::from_str(&size.to_string()) {
        response.headers_mut().insert(header::CONTENT_LENGTH, val);
    }
    if let Ok(val) = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", message.blob_key)) {
        response.headers_mut().insert(header::CONTENT_DISPOSITION, val);
    }

    Ok(response)
}

/// Explicitly marks a message received by the caller. Safe to repeat.
///
/// # Errors
/// Returns `AppError::NotFound` for an unknown message and `AppError::Database`
/// if the receipt cannot be stored.
pub async fn mark_received(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<MarkReceived>,
) -> Result<impl IntoResponse> {
    state.delivery_service.mark_received(auth_user.user_id, payload.message_id).await?;

    Ok(Json(MarkReceivedResponse { message: "Message marked as received".to_string() }))
}

fn bad_multipart(e: axum::extract::multipart::MultipartError) -> AppError {
    AppError::BadRequest(format!("Invalid multipart form: {e}"))
}
