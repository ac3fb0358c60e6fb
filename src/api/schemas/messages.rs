use crate::domain::AudioMessage;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Serialize)]
pub struct UploadResponse {
    pub message_id: Uuid,
    pub message: String,
}

#[derive(Serialize)]
pub struct MessageEntry {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub blob_key: String,
    pub duration: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<AudioMessage> for MessageEntry {
    fn from(message: AudioMessage) -> Self {
        Self {
            id: message.id,
            sender_id: message.sender_id,
            blob_key: message.blob_key,
            duration: message.duration_secs,
            created_at: message.created_at,
        }
    }
}

#[derive(Serialize)]
pub struct MessagesResponse {
    pub messages: Vec<MessageEntry>,
}

#[derive(Deserialize)]
pub struct DownloadParams {
    pub id: Uuid,
}

#[derive(Deserialize)]
pub struct MarkReceived {
    pub message_id: Uuid,
}

#[derive(Serialize)]
pub struct MarkReceivedResponse {
    pub message: String,
}
