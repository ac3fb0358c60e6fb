use crate::domain::Receipt;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(sqlx::FromRow)]
pub(crate) struct ReceiptRecord {
    pub audio_message_id: Uuid,
    pub user_id: Uuid,
    pub received_at: OffsetDateTime,
}

impl From<ReceiptRecord> for Receipt {
    fn from(record: ReceiptRecord) -> Self {
        Self {
            audio_message_id: record.audio_message_id,
            user_id: record.user_id,
            received_at: record.received_at,
        }
    }
}
