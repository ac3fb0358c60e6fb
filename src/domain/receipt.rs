use time::OffsetDateTime;
use uuid::Uuid;

/// Proof that a user has consumed a message. At most one exists per
/// (message, user) pair; `received_at` reflects the first successful insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub audio_message_id: Uuid,
    pub user_id: Uuid,
    pub received_at: OffsetDateTime,
}
