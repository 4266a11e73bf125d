//! File upload handling with validation and pluggable storage
//!
//! This crate provides:
//! - Transport-agnostic upload intake (any multipart or form layer)
//! - Content-based media type detection
//! - File validation (media type, size, extension, dimensions)
//! - Multiple storage sinks (filesystem, S3-compatible object stores)
//! - Batch orchestration with lifecycle callbacks
//!
//! # Features
//!
//! - **images** *(default)* - Pixel dimension inspection and validation
//! - **s3** - S3-compatible object store sink
//!
//! # Quick Start
//!
//! ```no_run
//! use hoist::*;
//!
//! # async fn example() -> Result<()> {
//! // Describe what the transport layer received
//! let transport = TransportFiles::new()
//!     .file("avatar", TransportEntry::ok("/tmp/upload-1", "me.png"));
//!
//! // Build a batch, attach rules and a sink, then store
//! let sink = FileSystemSink::with_directory("./uploads").await?;
//! let mut batch = UploadBatch::new("avatar", sink, &transport)?
//!     .rule(rules::MediaTypeRule::new(&["image/png"]))
//!     .rule(rules::SizeRule::from_human("2M")?);
//!
//! let receipts = batch.upload().await?;
//! println!("Stored: {}", receipts[0].key);
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod error;
pub mod file;
pub mod local;
pub mod media;
pub mod storage;
pub mod transport;
pub mod validation;

#[cfg(feature = "s3")]
pub mod s3;

pub use batch::{BatchConfig, Fanout, UploadBatch};
pub use error::{Result, UploadError};
pub use file::FileInfo;
pub use local::{FileSystemConfig, FileSystemSink};
pub use storage::{StorageError, StorageReceipt, StorageSink};
pub use transport::{TransportEntry, TransportFiles, TransportStatus};
pub use validation::{human_size_to_bytes, size, ValidationError, ValidationRule};

/// Built-in validation rules.
pub mod rules {
    pub use crate::validation::{CustomRule, ExtensionRule, MediaTypeRule, SizeRule};

    #[cfg(feature = "images")]
    pub use crate::validation::DimensionsRule;
}

#[cfg(feature = "s3")]
pub use s3::{ObjectStoreConfig, ObjectStoreSink};
