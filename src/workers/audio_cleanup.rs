use crate::config::RetentionConfig;
use crate::domain::AudioMessage;
use crate::error::Result;
use crate::storage::{AudioStorage, MessageRepository};
use async_trait::async_trait;
use opentelemetry::{global, metrics::Counter};
use std::sync::Arc;
use std::time::Duration as StdDuration;
use time::{Duration, OffsetDateTime};
use tracing::Instrument;

/// Decides which live messages are ready to be reclaimed. Implementations
/// must only return rows created at or before the cutoff snapshot.
#[async_trait]
pub trait RetentionPolicy: Send + Sync + std::fmt::Debug + 'static {
    async fn eligible(&self, cutoff: OffsetDateTime) -> Result<Vec<AudioMessage>>;
}

/// Default policy: a message is reclaimable once every other currently
/// approved user holds a receipt for it, or once it is older than the
/// retention horizon, whichever comes first.
#[derive(Clone, Debug)]
pub struct StandardRetention {
    messages: MessageRepository,
    horizon: Duration,
}

impl StandardRetention {
    #[must_use]
    pub const fn new(messages: MessageRepository, horizon_days: i64) -> Self {
        Self { messages, horizon: Duration::days(horizon_days) }
    }
}

#[async_trait]
impl RetentionPolicy for StandardRetention {
    async fn eligible(&self, cutoff: OffsetDateTime) -> Result<Vec<AudioMessage>> {
        let mut eligible = self.messages.fetch_fully_received(cutoff).await?;

        for message in self.messages.fetch_created_before(cutoff - self.horizon).await? {
            if !eligible.iter().any(|m| m.id == message.id) {
                eligible.push(message);
            }
        }

        Ok(eligible)
    }
}

#[derive(Clone, Debug)]
struct Metrics {
    soft_deleted_total: Counter<u64>,
    purged_total: Counter<u64>,
    errors_total: Counter<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("squawk-server");
        Self {
            soft_deleted_total: meter
                .u64_counter("audio_cleanup_soft_deleted_total")
                .with_description("Messages marked deleted by the retention sweep")
                .build(),
            purged_total: meter
                .u64_counter("audio_cleanup_purged_total")
                .with_description("Messages whose blob and ledger rows were removed")
                .build(),
            errors_total: meter
                .u64_counter("audio_cleanup_errors_total")
                .with_description("Errors encountered during retention sweeps")
                .build(),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepOutcome {
    pub soft_deleted: u64,
    pub purged: u64,
}

/// Periodic reclamation of audio messages. Runs as a single task whose ticks
/// are strictly sequential, so a sweep can never overlap itself.
///
/// Reclamation is two-stage: eligible messages are soft-deleted first, which
/// takes them out of every unread query and download immediately; once the
/// soft deletion is older than the purge grace period the blob is deleted and
/// only then the ledger row (receipts cascade). A failed blob delete leaves
/// the row in place for the next tick.
#[derive(Debug)]
pub struct AudioCleanupWorker {
    storage: Arc<dyn AudioStorage>,
    messages: MessageRepository,
    policy: Arc<dyn RetentionPolicy>,
    config: RetentionConfig,
    metrics: Metrics,
}

impl AudioCleanupWorker {
    #[must_use]
    pub fn new(
        storage: Arc<dyn AudioStorage>,
        messages: MessageRepository,
        policy: Arc<dyn RetentionPolicy>,
        config: RetentionConfig,
    ) -> Self {
        Self { storage, messages, policy, config, metrics: Metrics::new() }
    }

    pub async fn run(self, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(StdDuration::from_secs(self.config.sweep_interval_secs));

        while !*shutdown.borrow() {
            tokio::select! {
                _ = interval.tick() => {
                    match self.sweep().instrument(tracing::info_span!("audio_cleanup_iteration")).await {
                        Ok(outcome) => {
                            if outcome != SweepOutcome::default() {
                                tracing::info!(
                                    soft_deleted = outcome.soft_deleted,
                                    purged = outcome.purged,
                                    "Retention sweep reclaimed messages"
                                );
                            }
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "Retention sweep failed");
                            self.metrics.errors_total.add(1, &[]);
                        }
                    }
                }
                _ = shutdown.changed() => {}
            }
        }
        tracing::info!("Audio cleanup loop shutting down...");
    }

    /// One full sweep against a cutoff snapshot taken at entry. Messages
    /// created after the snapshot are untouched.
    ///
    /// # Errors
    /// Returns an error if the ledger queries fail; per-message blob failures
    /// are logged and retried on the next tick instead.
    #[tracing::instrument(
        err,
        skip(self),
        fields(soft_deleted = tracing::field::Empty, purged = tracing::field::Empty)
    )]
    pub async fn sweep(&self) -> Result<SweepOutcome> {
        let cutoff = OffsetDateTime::now_utc();
        let mut outcome = SweepOutcome::default();

        for message in self.policy.eligible(cutoff).await? {
            if message.created_at > cutoff {
                continue;
            }
            if self.messages.soft_delete(message.id, cutoff).await? {
                outcome.soft_deleted += 1;
            }
        }

        let purge_cutoff = cutoff - Duration::seconds(self.config.purge_grace_secs);
        for message in self.messages.fetch_soft_deleted_before(purge_cutoff).await? {
            // Blob first; the row only goes once the bytes are gone, so no row
            // can end up pointing at a deleted blob.
            match self.storage.delete(&message.blob_key).await {
                Ok(()) => {
                    self.messages.delete(message.id).await?;
                    outcome.purged += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        message_id = %message.id,
                        key = %message.blob_key,
                        "Blob delete failed, leaving row for the next sweep"
                    );
                    self.metrics.errors_total.add(1, &[]);
                }
            }
        }

        tracing::Span::current().record("soft_deleted", outcome.soft_deleted);
        tracing::Span::current().record("purged", outcome.purged);
        self.metrics.soft_deleted_total.add(outcome.soft_deleted, &[]);
        self.metrics.purged_total.add(outcome.purged, &[]);

        Ok(outcome)
    }
}
