use crate::domain::AudioMessage;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(sqlx::FromRow)]
pub(crate) struct AudioMessageRecord {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub blob_key: String,
    pub duration_secs: i64,
    pub created_at: OffsetDateTime,
    pub deleted_at: Option<OffsetDateTime>,
}

impl From<AudioMessageRecord> for AudioMessage {
    fn from(record: AudioMessageRecord) -> Self {
        Self {
            id: record.id,
            sender_id: record.sender_id,
            blob_key: record.blob_key,
            duration_secs: record.duration_secs,
            created_at: record.created_at,
            deleted_at: record.deleted_at,
        }
    }
}
