//! Local filesystem storage for uploaded audio
//!
//! Blobs live flat in a single uploads directory and are addressed by their
//! stored filename. The public URL of a blob is `<url_prefix>/<filename>`.

use std::path::{Path, PathBuf};

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::core::config::StorageConfig;
use crate::core::error::AppError;

/// Filesystem-backed blob storage
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
    url_prefix: String,
}

impl LocalStorage {
    /// Create the storage, making sure the uploads directory exists
    pub async fn new(config: &StorageConfig) -> Result<Self, AppError> {
        tokio::fs::create_dir_all(&config.uploads_dir)
            .await
            .map_err(|e| {
                AppError::Internal(format!(
                    "Failed to create uploads directory '{}': {}",
                    config.uploads_dir.display(),
                    e
                ))
            })?;

        info!(
            "Local storage initialized at {} (served under {})",
            config.uploads_dir.display(),
            config.url_prefix
        );

        Ok(Self {
            root: config.uploads_dir.clone(),
            url_prefix: config.url_prefix.clone(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Public relative URL for a stored filename
    pub fn public_url(&self, filename: &str) -> String {
        format!("{}/{}", self.url_prefix, filename)
    }

    /// Absolute location of a stored filename
    pub fn path_of(&self, filename: &str) -> PathBuf {
        self.root.join(filename)
    }

    /// Write `data` under `filename` and return its public URL.
    ///
    /// The file is fully flushed to disk before this returns. An existing file
    /// with the same name is never overwritten.
    pub async fn save(&self, filename: &str, data: &[u8]) -> Result<String, AppError> {
        let path = self.path_of(filename);

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;
        write_or_discard(&path, &mut file, data).await?;
        if let Err(e) = file.sync_all().await {
            discard_partial(&path).await;
            return Err(e.into());
        }

        debug!("Stored {} bytes at {}", data.len(), path.display());
        Ok(self.public_url(filename))
    }

    /// Remove a stored file; a missing file is not an error
    pub async fn remove(&self, filename: &str) -> Result<(), AppError> {
        let path = self.path_of(filename);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!("Removed {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Tried to remove missing file {}", path.display());
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Check whether a stored file exists
    #[cfg(test)]
    pub async fn exists(&self, filename: &str) -> bool {
        tokio::fs::try_exists(self.path_of(filename))
            .await
            .unwrap_or(false)
    }
}

/// Write all of `data`, removing the file at `path` if the write fails
async fn write_or_discard<W>(path: &Path, writer: &mut W, data: &[u8]) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let written = async {
        writer.write_all(data).await?;
        writer.flush().await
    }
    .await;

    if written.is_err() {
        discard_partial(path).await;
    }
    written
}

async fn discard_partial(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        warn!("Failed to remove partial file {}: {}", path.display(), e);
    }
}
