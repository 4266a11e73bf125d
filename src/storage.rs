//! Storage sink trait and common types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use thiserror::Error;

use crate::FileInfo;

/// Storage backend errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The destination already holds a file with this name.
    #[error("File already exists: {key}")]
    AlreadyExists {
        /// Destination key that collided.
        key: String,
    },

    /// File not found.
    #[error("File not found: {0}")]
    NotFound(String),

    /// Backend error.
    #[error("Storage error: {0}")]
    Backend(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    /// Check if this is an already-exists collision.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }

    /// Check if this is a not found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Metadata about a stored file, returned by a sink after a successful store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageReceipt {
    /// Destination key/path of the file.
    pub key: String,
    /// File size in bytes.
    pub size: u64,
    /// MIME type.
    pub content_type: Option<String>,
    /// SHA-256 hash of the file content.
    pub checksum: Option<String>,
    /// When the file was stored.
    pub stored_at: SystemTime,
    /// Storage-specific URL (if available).
    pub url: Option<String>,
    /// Additional metadata.
    #[serde(default)]
    pub metadata: std::collections::HashMap<String, String>,
}

impl StorageReceipt {
    /// Create a new receipt.
    pub fn new(key: impl Into<String>, size: u64) -> Self {
        Self {
            key: key.into(),
            size,
            content_type: None,
            checksum: None,
            stored_at: SystemTime::now(),
            url: None,
            metadata: std::collections::HashMap::new(),
        }
    }

    /// Set the content type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Set the checksum.
    pub fn with_checksum(mut self, checksum: impl Into<String>) -> Self {
        self.checksum = Some(checksum.into());
        self
    }

    /// Set the URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Add custom metadata.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Storage backend capability.
///
/// A sink persists a validated file under its `name_with_extension()` and
/// reports back a receipt. Sinks own their configuration (destination,
/// overwrite policy, credentials) and map backend failures into
/// [`StorageError`].
#[async_trait]
pub trait StorageSink: Send + Sync {
    /// Persist a file durably.
    async fn store(&self, file: &FileInfo) -> Result<StorageReceipt, StorageError>;
}

/// Calculate SHA-256 checksum of data.
pub fn calculate_checksum(data: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Sanitize a file name for safe storage.
pub fn sanitize_filename(name: &str) -> String {
    // Remove path components
    let name = std::path::Path::new(name)
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| name.to_string());

    // Remove potentially dangerous characters
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect::<String>()
        .trim_start_matches('.')
        .to_string()
}
