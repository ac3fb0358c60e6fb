use crate::domain::Receipt;
use crate::error::Result;
use crate::storage::DbPool;
use crate::storage::records::ReceiptRecord;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Clone, Debug)]
pub struct ReceiptRepository {
    pool: DbPool,
}

impl ReceiptRepository {
    #[must_use]
    pub const fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn find(&self, audio_message_id: Uuid, user_id: Uuid) -> Result<Option<Receipt>> {
        let record = sqlx::query_as::<_, ReceiptRecord>(
            r"
            SELECT audio_message_id, user_id, received_at
            FROM receipts
            WHERE audio_message_id = ? AND user_id = ?
            ",
        )
        .bind(audio_message_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Into::into))
    }

    /// Records the receipt unless one already exists. The primary-key conflict
    /// collapses silently, so concurrent calls for the same pair converge to a
    /// single row whose timestamp reflects the first insert. Returns whether
    /// this call created the row.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn create_if_absent(
        &self,
        audio_message_id: Uuid,
        user_id: Uuid,
        received_at: OffsetDateTime,
    ) -> Result<bool> {
        let result = sqlx::query(
            r"
            INSERT INTO receipts (audio_message_id, user_id, received_at)
            VALUES (?, ?, ?)
            ON CONFLICT (audio_message_id, user_id) DO NOTHING
            ",
        )
        .bind(audio_message_id)
        .bind(user_id)
        .bind(received_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
