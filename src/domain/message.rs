use time::OffsetDateTime;
use uuid::Uuid;

/// A stored voice message. Immutable after creation except for `deleted_at`,
/// which only the retention sweeper sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioMessage {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub blob_key: String,
    pub duration_secs: i64,
    pub created_at: OffsetDateTime,
    pub deleted_at: Option<OffsetDateTime>,
}

impl AudioMessage {
    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}
