//! File validation rules.

use async_trait::async_trait;
use std::collections::HashSet;
use thiserror::Error;

use crate::{FileInfo, UploadError};

/// Type alias for custom file validator function.
pub type RuleFn = Box<dyn Fn(&FileInfo) -> std::result::Result<(), String> + Send + Sync>;

/// Validation error.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// File is too large.
    #[error("File too large: {size} bytes exceeds maximum of {max} bytes")]
    TooLarge {
        /// Actual size.
        size: u64,
        /// Maximum size.
        max: u64,
    },

    /// File is too small.
    #[error("File too small: {size} bytes is below minimum of {min} bytes")]
    TooSmall {
        /// Actual size.
        size: u64,
        /// Minimum size.
        min: u64,
    },

    /// Media type not allowed.
    #[error("Media type not allowed: {media_type}")]
    TypeNotAllowed {
        /// The disallowed media type.
        media_type: String,
    },

    /// File extension not allowed.
    #[error("File extension not allowed: {extension}")]
    ExtensionNotAllowed {
        /// The disallowed extension.
        extension: String,
    },

    /// Image width does not match.
    #[error("Image width {actual}px does not match required width {expected}px")]
    WidthMismatch {
        /// Actual width.
        actual: u32,
        /// Required width.
        expected: u32,
    },

    /// Image height does not match.
    #[error("Image height {actual}px does not match required height {expected}px")]
    HeightMismatch {
        /// Actual height.
        actual: u32,
        /// Required height.
        expected: u32,
    },

    /// Pixel dimensions could not be read.
    #[error("Unable to read image dimensions")]
    DimensionsUnavailable,

    /// The file could not be inspected.
    #[error("Unable to inspect file: {0}")]
    Inspect(#[from] std::io::Error),

    /// Custom validation failed.
    #[error("{0}")]
    Custom(String),
}

impl ValidationError {
    /// Create a custom validation error.
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom(message.into())
    }
}

/// A validation rule for uploaded files.
///
/// Rules are independent: the batch runs every registered rule against
/// every file, in registration order, accumulating failures instead of
/// short-circuiting.
#[async_trait]
pub trait ValidationRule: Send + Sync {
    /// Validate a file.
    async fn validate(&self, file: &FileInfo) -> std::result::Result<(), ValidationError>;

    /// Rule description for error messages.
    fn description(&self) -> &str;
}

/// Convert a human readable file size (e.g. "10K" or "3M") into bytes.
///
/// Grammar: an integer followed by an optional unit letter, `b`/`k`/`m`/`g`
/// (case-insensitive). No unit letter means the number is already bytes.
pub fn human_size_to_bytes(input: &str) -> crate::Result<u64> {
    let malformed = || UploadError::InvalidInput(format!("Invalid size expression: {input}"));

    let (digits, unit) = match input.chars().next_back() {
        None => return Err(malformed()),
        Some(c) if c.is_ascii_digit() => (input, None),
        Some(c) => (&input[..input.len() - c.len_utf8()], Some(c.to_ascii_lowercase())),
    };

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed());
    }
    let number: u64 = digits.parse().map_err(|_| malformed())?;

    let multiplier = match unit {
        None | Some('b') => 1,
        Some('k') => 1024,
        Some('m') => 1_048_576,
        Some('g') => 1_073_741_824,
        Some(_) => return Err(malformed()),
    };

    Ok(number * multiplier)
}

/// Restrict files to a set of acceptable media types.
pub struct MediaTypeRule {
    allowed: HashSet<String>,
}

impl MediaTypeRule {
    /// Create a rule from acceptable media types, e.g. `["image/png", "image/jpeg"]`.
    /// A `type/*` entry accepts every subtype.
    pub fn new(types: &[&str]) -> Self {
        Self {
            allowed: types.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[async_trait]
impl ValidationRule for MediaTypeRule {
    async fn validate(&self, file: &FileInfo) -> std::result::Result<(), ValidationError> {
        let mime = file.media_type().await?;
        let mime_str = mime.essence_str().to_string();

        if !self.allowed.contains(&mime_str) && !self.allowed.contains(&format!("{}/*", mime.type_())) {
            return Err(ValidationError::TypeNotAllowed {
                media_type: mime_str,
            });
        }
        Ok(())
    }

    fn description(&self) -> &str {
        "Allowed media types"
    }
}

/// Restrict files to a size range.
pub struct SizeRule {
    max: u64,
    min: Option<u64>,
}

impl SizeRule {
    /// Create a rule with a maximum size in bytes.
    pub fn new(max: u64) -> Self {
        Self { max, min: None }
    }

    /// Create a rule from a human-readable limit such as `"5M"` or `"10K"`.
    pub fn from_human(max: &str) -> crate::Result<Self> {
        Ok(Self::new(human_size_to_bytes(max)?))
    }

    /// Require a minimum size in bytes.
    pub fn with_min(mut self, min: u64) -> Self {
        self.min = Some(min);
        self
    }
}

#[async_trait]
impl ValidationRule for SizeRule {
    async fn validate(&self, file: &FileInfo) -> std::result::Result<(), ValidationError> {
        let size = file.size().await?;

        if size > self.max {
            return Err(ValidationError::TooLarge {
                size,
                max: self.max,
            });
        }
        if let Some(min) = self.min
            && size < min
        {
            return Err(ValidationError::TooSmall { size, min });
        }
        Ok(())
    }

    fn description(&self) -> &str {
        "File size limits"
    }
}

/// Restrict files to a set of acceptable extensions.
pub struct ExtensionRule {
    allowed: HashSet<String>,
}

impl ExtensionRule {
    /// Create a rule from acceptable extensions, compared case-insensitively.
    pub fn new(extensions: &[&str]) -> Self {
        Self {
            allowed: extensions.iter().map(|s| s.to_lowercase()).collect(),
        }
    }
}

#[async_trait]
impl ValidationRule for ExtensionRule {
    async fn validate(&self, file: &FileInfo) -> std::result::Result<(), ValidationError> {
        let extension = file.extension();
        if !self.allowed.contains(extension) {
            return Err(ValidationError::ExtensionNotAllowed {
                extension: extension.to_string(),
            });
        }
        Ok(())
    }

    fn description(&self) -> &str {
        "Allowed file extensions"
    }
}

/// Require exact pixel dimensions.
#[cfg(feature = "images")]
pub struct DimensionsRule {
    width: u32,
    height: u32,
}

#[cfg(feature = "images")]
impl DimensionsRule {
    /// Create a rule requiring exact width and height.
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

#[cfg(feature = "images")]
#[async_trait]
impl ValidationRule for DimensionsRule {
    async fn validate(&self, file: &FileInfo) -> std::result::Result<(), ValidationError> {
        let (width, height) = file
            .dimensions()
            .await?
            .ok_or(ValidationError::DimensionsUnavailable)?;

        if width != self.width {
            return Err(ValidationError::WidthMismatch {
                actual: width,
                expected: self.width,
            });
        }
        if height != self.height {
            return Err(ValidationError::HeightMismatch {
                actual: height,
                expected: self.height,
            });
        }
        Ok(())
    }

    fn description(&self) -> &str {
        "Exact image dimensions"
    }
}

/// Wrap a custom validation function.
pub struct CustomRule {
    name: String,
    validator: RuleFn,
}

impl CustomRule {
    /// Create a rule from a name and a validation function.
    pub fn new<F>(name: impl Into<String>, validator: F) -> Self
    where
        F: Fn(&FileInfo) -> std::result::Result<(), String> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            validator: Box::new(validator),
        }
    }
}

#[async_trait]
impl ValidationRule for CustomRule {
    async fn validate(&self, file: &FileInfo) -> std::result::Result<(), ValidationError> {
        (self.validator)(file).map_err(ValidationError::Custom)
    }

    fn description(&self) -> &str {
        &self.name
    }
}

/// Common file size constants.
pub mod size {
    /// 1 KB
    pub const KB: u64 = 1024;
    /// 1 MB
    pub const MB: u64 = 1024 * KB;
    /// 1 GB
    pub const GB: u64 = 1024 * MB;

    /// n KB
    pub const fn kb(n: u64) -> u64 {
        n * KB
    }

    /// n MB
    pub const fn mb(n: u64) -> u64 {
        n * MB
    }

    /// n GB
    pub const fn gb(n: u64) -> u64 {
        n * GB
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;

    fn write_temp(dir: &tempfile::TempDir, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(content).unwrap();
        path
    }

    #[test]
    fn test_human_size_to_bytes() {
        assert_eq!(human_size_to_bytes("5M").unwrap(), 5 * 1_048_576);
        assert_eq!(human_size_to_bytes("10K").unwrap(), 10 * 1024);
        assert_eq!(human_size_to_bytes("100").unwrap(), 100);
        assert_eq!(human_size_to_bytes("1G").unwrap(), 1_073_741_824);
        assert_eq!(human_size_to_bytes("512b").unwrap(), 512);
        assert_eq!(human_size_to_bytes("2g").unwrap(), 2 * 1_073_741_824);
    }

    #[test]
    fn test_human_size_rejects_malformed() {
        assert!(human_size_to_bytes("").is_err());
        assert!(human_size_to_bytes("M").is_err());
        assert!(human_size_to_bytes("5X").is_err());
        assert!(human_size_to_bytes("5 M").is_err());
        assert!(human_size_to_bytes("-5M").is_err());
        assert!(human_size_to_bytes("5.5M").is_err());
    }

    #[tokio::test]
    async fn test_size_rule() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp(&dir, "data.bin", &[0u8; 2048]);
        let file = FileInfo::from_path(&path, "data.bin").unwrap();

        assert!(SizeRule::new(4096).validate(&file).await.is_ok());

        let err = SizeRule::new(1024).validate(&file).await.unwrap_err();
        assert!(matches!(err, ValidationError::TooLarge { size: 2048, max: 1024 }));

        let err = SizeRule::new(4096)
            .with_min(3000)
            .validate(&file)
            .await
            .unwrap_err();
        assert!(matches!(err, ValidationError::TooSmall { .. }));
    }

    #[tokio::test]
    async fn test_media_type_rule() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp(&dir, "pic.png", &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]);
        let file = FileInfo::from_path(&path, "pic.png").unwrap();

        let allow = MediaTypeRule::new(&["image/png", "image/jpeg"]);
        assert!(allow.validate(&file).await.is_ok());

        let deny = MediaTypeRule::new(&["application/pdf"]);
        let err = deny.validate(&file).await.unwrap_err();
        assert_eq!(err.to_string(), "Media type not allowed: image/png");

        let wildcard = MediaTypeRule::new(&["image/*"]);
        assert!(wildcard.validate(&file).await.is_ok());
    }

    #[tokio::test]
    async fn test_extension_rule() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp(&dir, "doc.PDF", b"%PDF-1.7");
        let file = FileInfo::from_path(&path, "doc.PDF").unwrap();

        assert!(ExtensionRule::new(&["pdf"]).validate(&file).await.is_ok());
        assert!(ExtensionRule::new(&["png", "jpg"]).validate(&file).await.is_err());
    }

    #[tokio::test]
    async fn test_custom_rule() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp(&dir, "a.txt", b"x");
        let file = FileInfo::from_path(&path, "a.txt").unwrap();

        let rule = CustomRule::new("no-temp-names", |f: &FileInfo| {
            if f.name().starts_with("tmp-") {
                Err("Temporary names are not allowed".to_string())
            } else {
                Ok(())
            }
        });
        assert!(rule.validate(&file).await.is_ok());
        assert_eq!(rule.description(), "no-temp-names");
    }

    #[test]
    fn test_size_constants() {
        assert_eq!(size::kb(10), 10 * 1024);
        assert_eq!(size::mb(5), 5 * 1_048_576);
        assert_eq!(size::gb(1), 1_073_741_824);
    }
}
