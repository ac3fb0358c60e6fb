use clap::{Args, Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Clone, Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Config {
    #[command(flatten)]
    pub server: ServerConfig,

    #[command(flatten)]
    pub auth: AuthConfig,

    #[command(flatten)]
    pub storage: StorageConfig,

    #[command(flatten)]
    pub retention: RetentionConfig,

    #[command(flatten)]
    pub telemetry: TelemetryConfig,
}

#[derive(Clone, Debug, Args)]
pub struct ServerConfig {
    /// Host to listen on
    #[arg(long, env = "SQUAWK_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "SQUAWK_PORT", default_value_t = 8080)]
    pub port: u16,

    /// How long to wait for background tasks during shutdown
    #[arg(long, env = "SQUAWK_SHUTDOWN_TIMEOUT_SECS", default_value_t = 10)]
    pub shutdown_timeout_secs: u64,
}

#[derive(Clone, Debug, Args)]
pub struct AuthConfig {
    /// Secret key for JWT signing
    #[arg(long, env = "SQUAWK_JWT_SECRET")]
    pub jwt_secret: Option<String>,

    /// File to read the JWT secret from; takes precedence over the inline secret
    #[arg(long, env = "SQUAWK_JWT_SECRET_FILE")]
    pub jwt_secret_file: Option<PathBuf>,

    /// Access token time-to-live in days
    #[arg(long, env = "SQUAWK_TOKEN_TTL_DAYS", default_value_t = 30)]
    pub token_ttl_days: i64,
}

impl AuthConfig {
    /// Resolves the JWT signing secret from the secret file or the inline value.
    ///
    /// # Errors
    /// Returns an error if neither source yields a non-empty secret.
    pub fn resolve_jwt_secret(&self) -> anyhow::Result<String> {
        if let Some(path) = &self.jwt_secret_file {
            let secret = std::fs::read_to_string(path)?;
            let secret = secret.trim();
            if !secret.is_empty() {
                return Ok(secret.to_string());
            }
        }

        match self.jwt_secret.as_deref() {
            Some(s) if !s.is_empty() => Ok(s.to_string()),
            _ => anyhow::bail!("JWT secret not set"),
        }
    }
}

#[derive(Clone, Debug, Args)]
pub struct StorageConfig {
    /// Path to the SQLite database file; created if missing
    #[arg(long, env = "SQUAWK_DATABASE_PATH", default_value = "./tmp/squawk.db")]
    pub database_path: PathBuf,

    /// Directory where audio blobs are stored, one file per message
    #[arg(long, env = "SQUAWK_AUDIO_DIRECTORY", default_value = "./tmp/audio")]
    pub audio_directory: PathBuf,

    /// Max audio upload size in bytes (default: 10 MiB)
    #[arg(long, env = "SQUAWK_MAX_UPLOAD_BYTES", default_value_t = 10_485_760)]
    pub max_upload_bytes: usize,
}

#[derive(Clone, Debug, Args)]
pub struct RetentionConfig {
    /// How often to run the audio retention sweep
    #[arg(long, env = "SQUAWK_SWEEP_INTERVAL_SECS", default_value_t = 60)]
    pub sweep_interval_secs: u64,

    /// Age in days past which a message is reclaimed regardless of receipts
    #[arg(long, env = "SQUAWK_RETENTION_HORIZON_DAYS", default_value_t = 7)]
    pub horizon_days: i64,

    /// Delay between soft deletion and physical removal, so in-flight downloads drain
    #[arg(long, env = "SQUAWK_PURGE_GRACE_SECS", default_value_t = 3600)]
    pub purge_grace_secs: i64,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => f.write_str("text"),
            Self::Json => f.write_str("json"),
        }
    }
}

#[derive(Clone, Debug, Args)]
pub struct TelemetryConfig {
    /// Log output format
    #[arg(long, env = "SQUAWK_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl Config {
    #[must_use]
    pub fn load() -> Self {
        Self::parse()
    }
}
