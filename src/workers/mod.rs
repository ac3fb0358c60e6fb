pub mod audio_cleanup;

pub use audio_cleanup::{AudioCleanupWorker, RetentionPolicy, StandardRetention, SweepOutcome};
