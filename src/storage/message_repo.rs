use crate::domain::AudioMessage;
use crate::error::Result;
use crate::storage::DbPool;
use crate::storage::records::AudioMessageRecord;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Clone, Debug)]
pub struct MessageRepository {
    pool: DbPool,
}

impl MessageRepository {
    #[must_use]
    pub const fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn create(
        &self,
        id: Uuid,
        sender_id: Uuid,
        blob_key: &str,
        duration_secs: i64,
        created_at: OffsetDateTime,
    ) -> Result<AudioMessage> {
        sqlx::query(
            r"
            INSERT INTO audio_messages (id, sender_id, blob_key, duration_secs, created_at)
            VALUES (?, ?, ?, ?, ?)
            ",
        )
        .bind(id)
        .bind(sender_id)
        .bind(blob_key)
        .bind(duration_secs)
        .bind(created_at)
        .execute(&self.pool)
        .await?;

        Ok(AudioMessage {
            id,
            sender_id,
            blob_key: blob_key.to_string(),
            duration_secs,
            created_at,
            deleted_at: None,
        })
    }

    /// Looks up a live message. Soft-deleted rows are treated as absent.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<AudioMessage>> {
        let record = sqlx::query_as::<_, AudioMessageRecord>(
            r"
            SELECT id, sender_id, blob_key, duration_secs, created_at, deleted_at
            FROM audio_messages
            WHERE id = ? AND deleted_at IS NULL
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Into::into))
    }

    /// Looks up a message regardless of soft deletion. Sweeper use only.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn find_by_id_any(&self, id: Uuid) -> Result<Option<AudioMessage>> {
        let record = sqlx::query_as::<_, AudioMessageRecord>(
            r"
            SELECT id, sender_id, blob_key, duration_secs, created_at, deleted_at
            FROM audio_messages
            WHERE id = ?
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Into::into))
    }

    /// All live messages the user has not yet received, excluding their own
    /// sends, oldest first so clips play back in send order.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn fetch_unreceived(&self, user_id: Uuid) -> Result<Vec<AudioMessage>> {
        let records = sqlx::query_as::<_, AudioMessageRecord>(
            r"
            SELECT m.id, m.sender_id, m.blob_key, m.duration_secs, m.created_at, m.deleted_at
            FROM audio_messages m
            WHERE m.deleted_at IS NULL
              AND m.sender_id != ?
              AND NOT EXISTS (
                  SELECT 1 FROM receipts r
                  WHERE r.audio_message_id = m.id AND r.user_id = ?
              )
            ORDER BY m.created_at ASC
            ",
        )
        .bind(user_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records.into_iter().map(Into::into).collect())
    }

    /// Marks a message logically gone. Idempotent; returns whether this call set the flag.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn soft_delete(&self, id: Uuid, at: OffsetDateTime) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE audio_messages SET deleted_at = ? WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Removes the row for good. Receipts cascade.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM audio_messages WHERE id = ?").bind(id).execute(&self.pool).await?;
        Ok(())
    }

    /// Live messages created at or before `before` that every currently
    /// approved user other than the sender has receipted. Messages with no
    /// other approved user are never considered fully received.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn fetch_fully_received(&self, before: OffsetDateTime) -> Result<Vec<AudioMessage>> {
        let records = sqlx::query_as::<_, AudioMessageRecord>(
            r"
            SELECT m.id, m.sender_id, m.blob_key, m.duration_secs, m.created_at, m.deleted_at
            FROM audio_messages m
            WHERE m.deleted_at IS NULL
              AND m.created_at <= ?
              AND EXISTS (
                  SELECT 1 FROM users u
                  WHERE u.approved = 1 AND u.id != m.sender_id
              )
              AND NOT EXISTS (
                  SELECT 1 FROM users u
                  WHERE u.approved = 1 AND u.id != m.sender_id
                    AND NOT EXISTS (
                        SELECT 1 FROM receipts r
                        WHERE r.audio_message_id = m.id AND r.user_id = u.id
                    )
              )
            ",
        )
        .bind(before)
        .fetch_all(&self.pool)
        .await?;

        Ok(records.into_iter().map(Into::into).collect())
    }

    /// Live messages created at or before `before`, regardless of receipts.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn fetch_created_before(&self, before: OffsetDateTime) -> Result<Vec<AudioMessage>> {
        let records = sqlx::query_as::<_, AudioMessageRecord>(
            r"
            SELECT id, sender_id, blob_key, duration_secs, created_at, deleted_at
            FROM audio_messages
            WHERE deleted_at IS NULL AND created_at <= ?
            ",
        )
        .bind(before)
        .fetch_all(&self.pool)
        .await?;

        Ok(records.into_iter().map(Into::into).collect())
    }

    /// Soft-deleted messages whose deletion is old enough to purge.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn fetch_soft_deleted_before(&self, before: OffsetDateTime) -> Result<Vec<AudioMessage>> {
        let records = sqlx::query_as::<_, AudioMessageRecord>(
            r"
            SELECT id, sender_id, blob_key, duration_secs, created_at, deleted_at
            FROM audio_messages
            WHERE deleted_at IS NOT NULL AND deleted_at <= ?
            ",
        )
        .bind(before)
        .fetch_all(&self.pool)
        .await?;

        Ok(records.into_iter().map(Into::into).collect())
    }
}
