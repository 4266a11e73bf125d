//! Local filesystem storage sink.

use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;
use tracing::{debug, info};

use crate::storage::sanitize_filename;
use crate::{FileInfo, StorageError, StorageReceipt, StorageSink};

/// Filesystem sink configuration.
#[derive(Debug, Clone)]
pub struct FileSystemConfig {
    /// Destination directory for stored files.
    pub directory: PathBuf,
    /// Replace existing files instead of failing.
    pub overwrite: bool,
    /// Create the destination directory if it doesn't exist.
    pub create_directories: bool,
}

impl Default for FileSystemConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("./uploads"),
            overwrite: false,
            create_directories: true,
        }
    }
}

impl FileSystemConfig {
    /// Create configuration with a destination directory.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            ..Default::default()
        }
    }

    /// Set the overwrite policy.
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Set whether the destination directory is created on init.
    pub fn create_directories(mut self, create: bool) -> Self {
        self.create_directories = create;
        self
    }
}

/// Local filesystem storage sink.
///
/// Files are written into the configured directory under their
/// `name_with_extension()`. The existence check and the write are not
/// atomic; two concurrent stores of the same name can still collide.
#[derive(Debug, Clone)]
pub struct FileSystemSink {
    config: FileSystemConfig,
}

impl FileSystemSink {
    /// Create a new filesystem sink.
    pub async fn new(config: FileSystemConfig) -> Result<Self, StorageError> {
        if config.create_directories {
            fs::create_dir_all(&config.directory).await.map_err(|e| {
                StorageError::Config(format!(
                    "Failed to create storage directory {:?}: {}",
                    config.directory, e
                ))
            })?;
        }

        info!(path = ?config.directory, "Initialized filesystem sink");

        Ok(Self { config })
    }

    /// Create with just a destination directory (convenience method).
    pub async fn with_directory(directory: impl Into<PathBuf>) -> Result<Self, StorageError> {
        Self::new(FileSystemConfig::new(directory)).await
    }

    /// Get the full destination path for a file.
    fn destination(&self, file: &FileInfo) -> (String, PathBuf) {
        let key = sanitize_filename(&file.name_with_extension());
        let path = self.config.directory.join(&key);
        (key, path)
    }
}

#[async_trait]
impl StorageSink for FileSystemSink {
    async fn store(&self, file: &FileInfo) -> Result<StorageReceipt, StorageError> {
        let (key, path) = self.destination(file);

        if !self.config.overwrite && path.exists() {
            return Err(StorageError::AlreadyExists { key });
        }

        fs::copy(file.tmp_path(), &path).await?;

        let size = file.size().await?;
        let checksum = file.checksum().await?.to_string();
        let content_type = file.media_type().await?.to_string();

        debug!(key = %key, path = ?path, size = size, "Stored file");

        Ok(StorageReceipt::new(key, size)
            .with_content_type(content_type)
            .with_checksum(checksum))
    }
}
