//! Crate-level error types.

use thiserror::Error;

/// Result type for upload operations.
pub type Result<T> = std::result::Result<T, UploadError>;

/// Errors produced by the upload pipeline.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The runtime does not permit file uploads.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The requested field key is absent from the transport report.
    #[error("Cannot find uploaded file(s) identified by key: {0}")]
    UnknownKey(String),

    /// Malformed construction or rule-setup input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Upload was attempted on a batch with validation errors.
    #[error("File validation failed")]
    ValidationFailed {
        /// Accumulated per-file error messages, in append order.
        errors: Vec<String>,
    },

    /// Storage backend error.
    #[error("Storage error: {0}")]
    Storage(#[from] crate::StorageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl UploadError {
    /// Check if this is a configuration error.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Check if this is an invalid input error.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidInput(_) | Self::UnknownKey(_))
    }

    /// Check if this is a validation failure.
    pub fn is_validation_failed(&self) -> bool {
        matches!(self, Self::ValidationFailed { .. })
    }

    /// Check if this is a storage error.
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_))
    }

    /// Get the accumulated validation errors, if any.
    pub fn validation_errors(&self) -> Option<&[String]> {
        match self {
            Self::ValidationFailed { errors } => Some(errors),
            _ => None,
        }
    }
}
