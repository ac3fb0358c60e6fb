use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::time::Duration;

pub mod blob_store;
pub mod message_repo;
pub mod receipt_repo;
pub mod records;
pub mod user_repo;

pub use blob_store::{AudioStorage, AudioStream, FsStorage};
pub use message_repo::MessageRepository;
pub use receipt_repo::ReceiptRepository;
pub use user_repo::UserRepository;

pub type DbPool = Pool<Sqlite>;

/// Opens the SQLite database, creating the file and its parent directory if missing.
///
/// # Errors
/// Returns `sqlx::Error` if the directory cannot be created or the connection fails.
pub async fn init_pool(database_path: &Path) -> Result<DbPool, sqlx::Error> {
    if let Some(parent) = database_path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await.map_err(sqlx::Error::Io)?;
    }

    let options = SqliteConnectOptions::new()
        .filename(database_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5));

    SqlitePoolOptions::new().max_connections(5).connect_with(options).await
}

/// Applies pending migrations from the `migrations/` directory.
///
/// # Errors
/// Returns `MigrateError` if a migration fails to apply.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!().run(pool).await
}
