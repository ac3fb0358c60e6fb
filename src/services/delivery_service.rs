use crate::domain::AudioMessage;
use crate::error::{AppError, Result};
use crate::storage::{AudioStorage, AudioStream, MessageRepository, ReceiptRepository};
use opentelemetry::{global, metrics::Counter};
use std::sync::Arc;
use time::OffsetDateTime;
use uuid::Uuid;

/// Extensions we are willing to carry through as a content-type hint. Anything
/// else collapses to the default; the locator is never taken from the client.
const ALLOWED_EXTENSIONS: &[&str] = &["aac", "m4a", "mp3", "ogg", "opus", "wav", "webm"];
const DEFAULT_EXTENSION: &str = "m4a";

#[derive(Clone, Debug)]
struct Metrics {
    uploads_total: Counter<u64>,
    downloads_total: Counter<u64>,
    receipts_total: Counter<u64>,
    lazy_receipt_failures_total: Counter<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("squawk-server");
        Self {
            uploads_total: meter
                .u64_counter("audio_uploads_total")
                .with_description("Total audio messages uploaded")
                .build(),
            downloads_total: meter
                .u64_counter("audio_downloads_total")
                .with_description("Total audio message downloads served")
                .build(),
            receipts_total: meter
                .u64_counter("audio_receipts_total")
                .with_description("Total receipts recorded")
                .build(),
            lazy_receipt_failures_total: meter
                .u64_counter("audio_lazy_receipt_failures_total")
                .with_description("Receipt writes that failed on the download path")
                .build(),
        }
    }
}

/// Orchestrates the message lifecycle over the blob store and the two ledgers.
/// Per recipient a message moves `unseen -> received` via download or an
/// explicit mark; globally it moves `active -> soft-deleted` under the sweeper.
#[derive(Clone, Debug)]
pub struct DeliveryService {
    storage: Arc<dyn AudioStorage>,
    messages: MessageRepository,
    receipts: ReceiptRepository,
    max_upload_bytes: usize,
    metrics: Metrics,
}

impl DeliveryService {
    #[must_use]
    pub fn new(
        storage: Arc<dyn AudioStorage>,
        messages: MessageRepository,
        receipts: ReceiptRepository,
        max_upload_bytes: usize,
    ) -> Self {
        Self { storage, messages, receipts, max_upload_bytes, metrics: Metrics::new() }
    }

    /// Stores an uploaded clip and records it in the ledger.
    ///
    /// The blob is written first; if the ledger insert then fails, the blob is
    /// removed again so no orphan stays reachable through a returned id.
    ///
    /// # Errors
    /// Returns `AppError::BadRequest` for a negative duration,
    /// `AppError::PayloadTooLarge` past the size limit, and storage errors
    /// unchanged.
    #[tracing::instrument(
        err(level = "warn"),
        skip(self, stream, file_name),
        fields(message_id = tracing::field::Empty, size_bytes = tracing::field::Empty)
    )]
    pub async fn upload(
        &self,
        sender_id: Uuid,
        file_name: Option<&str>,
        duration_secs: i64,
        stream: AudioStream,
    ) -> Result<Uuid> {
        if duration_secs < 0 {
            return Err(AppError::BadRequest("duration must be non-negative".to_string()));
        }

        let id = Uuid::new_v4();
        let key = format!("{id}.{}", allowed_extension(file_name));
        tracing::Span::current().record("message_id", tracing::field::display(id));

        let size = self.storage.put(&key, stream, self.max_upload_bytes).await?;
        tracing::Span::current().record("size_bytes", size);

        if let Err(e) = self.messages.create(id, sender_id, &key, duration_secs, OffsetDateTime::now_utc()).await
        {
            if let Err(cleanup_err) = self.storage.delete(&key).await {
                tracing::warn!(error = %cleanup_err, key = %key, "Failed to remove blob after ledger failure");
            }
            return Err(e);
        }

        self.metrics.uploads_total.add(1, &[]);
        tracing::info!(sender_id = %sender_id, duration_secs, "Audio message stored");
        Ok(id)
    }

    /// Live messages the user has not yet received, oldest first. Pure read.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the query fails.
    #[tracing::instrument(err(level = "warn"), skip(self))]
    pub async fn list_unread(&self, user_id: Uuid) -> Result<Vec<AudioMessage>> {
        self.messages.fetch_unreceived(user_id).await
    }

    /// Serves the stored bytes and lazily records the receipt. A receipt-write
    /// failure never fails the download; the message simply reappears as
    /// unread next time.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` for unknown or soft-deleted messages, and
    /// for ledger rows whose blob has gone missing.
    #[tracing::instrument(err(level = "warn"), skip(self), fields(blob_key = tracing::field::Empty))]
    pub async fn download(
        &self,
        user_id: Uuid,
        message_id: Uuid,
    ) -> Result<(AudioMessage, u64, AudioStream)> {
        let message = self.messages.find_by_id(message_id).await?.ok_or(AppError::NotFound)?;
        tracing::Span::current().record("blob_key", tracing::field::display(&message.blob_key));

        let (size, stream) = match self.storage.get(&message.blob_key).await {
            Ok(found) => found,
            Err(AppError::NotFound) => {
                // Ledger and store have diverged; surface as missing, never repair here.
                tracing::error!(key = %message.blob_key, "Ledger references a missing audio blob");
                return Err(AppError::NotFound);
            }
            Err(e) => return Err(e),
        };

        match self.receipts.create_if_absent(message_id, user_id, OffsetDateTime::now_utc()).await {
            Ok(true) => self.metrics.receipts_total.add(1, &[]),
            Ok(false) => {}
            Err(e) => {
                tracing::error!(error = %e, "Failed to record receipt on download");
                self.metrics.lazy_receipt_failures_total.add(1, &[]);
            }
        }

        self.metrics.downloads_total.add(1, &[]);
        Ok((message, size, stream))
    }

    /// Explicitly records the receipt. Calling it again for the same pair is a
    /// no-op, but unlike the download path a write failure is the caller's to
    /// see.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` for unknown or soft-deleted messages and
    /// `AppError::Database` if the receipt cannot be stored.
    #[tracing::instrument(err(level = "warn"), skip(self))]
    pub async fn mark_received(&self, user_id: Uuid, message_id: Uuid) -> Result<()> {
        let message = self.messages.find_by_id(message_id).await?.ok_or(AppError::NotFound)?;

        if self.receipts.create_if_absent(message.id, user_id, OffsetDateTime::now_utc()).await? {
            self.metrics.receipts_total.add(1, &[]);
        }
        Ok(())
    }
}

fn allowed_extension(file_name: Option<&str>) -> &'static str {
    file_name
        .and_then(|name| name.rsplit('.').next())
        .and_then(|ext| ALLOWED_EXTENSIONS.iter().find(|allowed| allowed.eq_ignore_ascii_case(ext)))
        .copied()
        .unwrap_or(DEFAULT_EXTENSION)
}
