use crate::error::{AppError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use futures::stream::BoxStream;
use std::path::PathBuf;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;

pub type AudioStream = BoxStream<'static, Result<Bytes>>;

/// Durable store for audio blobs, one object per message, addressed by an
/// opaque key generated by the caller.
#[async_trait]
pub trait AudioStorage: Send + Sync + std::fmt::Debug + 'static {
    /// Writes the stream under `key`, rejecting it once it exceeds `max_size`
    /// bytes. No partially written object is ever visible to readers. Returns
    /// the stored size.
    async fn put(&self, key: &str, stream: AudioStream, max_size: usize) -> Result<u64>;

    /// Opens the blob for reading. `AppError::NotFound` if absent.
    async fn get(&self, key: &str) -> Result<(u64, AudioStream)>;

    /// Removes the blob. Absence of the target is not an error.
    async fn delete(&self, key: &str) -> Result<()>;
}

/// Filesystem-backed store: one file per blob under a root directory, written
/// to a scratch file first and renamed into place so readers only ever see
/// complete objects.
#[derive(Clone, Debug)]
pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    /// Opens the store, creating the root directory if missing.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created.
    pub async fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    /// Keys are generated internally from message ids, but the check keeps the
    /// store safe against anything resembling a path.
    fn blob_path(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && !key.contains("..")
            && key.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'.');
        if !valid {
            return Err(AppError::BadRequest("invalid blob key".to_string()));
        }
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl AudioStorage for FsStorage {
    #[tracing::instrument(level = "debug", skip(self, stream))]
    async fn put(&self, key: &str, mut stream: AudioStream, max_size: usize) -> Result<u64> {
        let final_path = self.blob_path(key)?;
        let scratch_path = self.root.join(format!("{key}.part"));

        let written = async {
            let mut file = fs::File::create(&scratch_path).await?;
            let mut total: u64 = 0;

            while let Some(chunk) = stream.next().await {
                let chunk = chunk?;
                total += chunk.len() as u64;
                if total > max_size as u64 {
                    return Err(AppError::PayloadTooLarge);
                }
                file.write_all(&chunk).await?;
            }

            file.flush().await?;
            file.sync_all().await?;
            Ok(total)
        }
        .await;

        match written {
            Ok(total) => {
                fs::rename(&scratch_path, &final_path).await?;
                Ok(total)
            }
            Err(e) => {
                if let Err(cleanup_err) = fs::remove_file(&scratch_path).await {
                    tracing::warn!(error = %cleanup_err, key = %key, "Failed to remove scratch file");
                }
                Err(e)
            }
        }
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn get(&self, key: &str) -> Result<(u64, AudioStream)> {
        let path = self.blob_path(key)?;

        let file = match fs::File::open(&path).await {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(AppError::NotFound),
            Err(e) => return Err(e.into()),
        };

        let len = file.metadata().await?.len();
        let stream = ReaderStream::new(file).map(|res| res.map_err(AppError::from)).boxed();

        Ok((len, stream))
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.blob_path(key)?;

        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
