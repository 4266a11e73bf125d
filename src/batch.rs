//! Upload batch orchestration.
//!
//! An [`UploadBatch`] owns the files reported under one request key, the
//! validation rules to run against them, and the storage sink that persists
//! them. Validation accumulates per-file errors instead of failing fast;
//! upload refuses to touch storage until the whole batch is clean.

use mime::Mime;
use tracing::{debug, info};

use crate::transport::TransportFiles;
use crate::validation::ValidationRule;
use crate::{FileInfo, Result, StorageReceipt, StorageSink, UploadError};

/// Result of a delegated accessor over the batch's files.
///
/// Selected by file count at call time: an empty batch yields `None`, a
/// single file yields its value directly, several files yield one value per
/// file in insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fanout<T> {
    /// The batch holds no files.
    None,
    /// The batch holds exactly one file.
    One(T),
    /// The batch holds several files; one value per file, in order.
    Many(Vec<T>),
}

impl<T> Fanout<T> {
    /// Check if the batch held no files.
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Extract the single value, if the batch held exactly one file.
    pub fn into_one(self) -> Option<T> {
        match self {
            Self::One(value) => Some(value),
            _ => None,
        }
    }

    /// Flatten into a vector: empty for `None`, one element for `One`.
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Self::None => Vec::new(),
            Self::One(value) => vec![value],
            Self::Many(values) => values,
        }
    }
}

/// Runtime-level batch configuration.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Whether file uploads are permitted at all.
    pub uploads_enabled: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            uploads_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ErrorKind {
    Transport,
    Rule,
}

#[derive(Debug, Clone)]
struct BatchError {
    kind: ErrorKind,
    message: String,
}

type Callback = Box<dyn Fn(&FileInfo) + Send + Sync>;

/// A batch of uploaded files sharing one validation and storage pipeline.
pub struct UploadBatch {
    files: Vec<FileInfo>,
    rules: Vec<Box<dyn ValidationRule>>,
    sink: Box<dyn StorageSink>,
    errors: Vec<BatchError>,
    before_validate: Option<Callback>,
    after_validate: Option<Callback>,
    before_upload: Option<Callback>,
    after_upload: Option<Callback>,
}

impl UploadBatch {
    /// Create a batch for the files reported under `key`.
    ///
    /// One [`FileInfo`] is created per successfully received entry, in
    /// report order. Entries whose transfer failed contribute an error
    /// line instead and are excluded from the batch's files.
    pub fn new(
        key: &str,
        sink: impl StorageSink + 'static,
        files: &TransportFiles,
    ) -> Result<Self> {
        Self::with_config(key, sink, files, BatchConfig::default())
    }

    /// Create a batch with explicit runtime configuration.
    pub fn with_config(
        key: &str,
        sink: impl StorageSink + 'static,
        files: &TransportFiles,
        config: BatchConfig,
    ) -> Result<Self> {
        if !config.uploads_enabled {
            return Err(UploadError::Config("File uploads are disabled".to_string()));
        }

        let entries = files
            .get(key)
            .ok_or_else(|| UploadError::UnknownKey(key.to_string()))?;

        let mut batch_files = Vec::new();
        let mut errors = Vec::new();

        for entry in entries {
            if entry.status.is_ok() {
                batch_files.push(FileInfo::from_transport(entry)?);
            } else {
                errors.push(BatchError {
                    kind: ErrorKind::Transport,
                    message: format!("{}: {}", entry.name, entry.status.message()),
                });
            }
        }

        debug!(key = %key, files = batch_files.len(), errors = errors.len(), "Constructed upload batch");

        Ok(Self {
            files: batch_files,
            rules: Vec::new(),
            sink: Box::new(sink),
            errors,
            before_validate: None,
            after_validate: None,
            before_upload: None,
            after_upload: None,
        })
    }

    /// Register a validation rule. Registration order is execution order.
    pub fn rule(mut self, rule: impl ValidationRule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    /// Register several validation rules at once.
    pub fn rules(mut self, rules: Vec<Box<dyn ValidationRule>>) -> Self {
        self.rules.extend(rules);
        self
    }

    /// Get the registered validation rules.
    pub fn validations(&self) -> &[Box<dyn ValidationRule>] {
        &self.rules
    }

    /// Set the callback invoked before each file is validated.
    pub fn before_validate<F>(mut self, callback: F) -> Self
    where
        F: Fn(&FileInfo) + Send + Sync + 'static,
    {
        self.before_validate = Some(Box::new(callback));
        self
    }

    /// Set the callback invoked after each file is validated.
    pub fn after_validate<F>(mut self, callback: F) -> Self
    where
        F: Fn(&FileInfo) + Send + Sync + 'static,
    {
        self.after_validate = Some(Box::new(callback));
        self
    }

    /// Set the callback invoked before each file is stored.
    pub fn before_upload<F>(mut self, callback: F) -> Self
    where
        F: Fn(&FileInfo) + Send + Sync + 'static,
    {
        self.before_upload = Some(Box::new(callback));
        self
    }

    /// Set the callback invoked after each file is stored.
    pub fn after_upload<F>(mut self, callback: F) -> Self
    where
        F: Fn(&FileInfo) + Send + Sync + 'static,
    {
        self.after_upload = Some(Box::new(callback));
        self
    }

    /// Run every rule against every file, accumulating errors.
    ///
    /// Files are visited in insertion order. A file that is not a genuine
    /// upload is recorded as invalid and skips its rule checks. Rule
    /// failures accumulate; an earlier failure never short-circuits later
    /// rules for the same file. Returns true iff no errors are recorded.
    ///
    /// Rule errors from a previous pass are cleared before re-running;
    /// transport errors recorded at construction persist.
    pub async fn is_valid(&mut self) -> bool {
        self.errors.retain(|e| e.kind == ErrorKind::Transport);

        for file in &self.files {
            if let Some(callback) = &self.before_validate {
                callback(file);
            }

            if !file.is_genuine_upload() {
                self.errors.push(BatchError {
                    kind: ErrorKind::Rule,
                    message: format!("{}: Is not an uploaded file", file.name_with_extension()),
                });
                continue;
            }

            for rule in &self.rules {
                if let Err(e) = rule.validate(file).await {
                    self.errors.push(BatchError {
                        kind: ErrorKind::Rule,
                        message: format!("{}: {}", file.name_with_extension(), e),
                    });
                }
            }

            if let Some(callback) = &self.after_validate {
                callback(file);
            }
        }

        self.errors.is_empty()
    }

    /// Validate the batch and persist every file through the sink.
    ///
    /// Fails with [`UploadError::ValidationFailed`] before any sink call
    /// when the batch is invalid. Files are stored in insertion order; a
    /// storage failure propagates immediately and aborts the remaining
    /// files. Returns one receipt per file, in order.
    pub async fn upload(&mut self) -> Result<Vec<StorageReceipt>> {
        if !self.is_valid().await {
            return Err(UploadError::ValidationFailed {
                errors: self.error_strings(),
            });
        }

        let mut receipts = Vec::with_capacity(self.files.len());

        for file in &self.files {
            if let Some(callback) = &self.before_upload {
                callback(file);
            }

            let receipt = self.sink.store(file).await?;

            if let Some(callback) = &self.after_upload {
                callback(file);
            }

            receipts.push(receipt);
        }

        info!(files = receipts.len(), "Uploaded batch");

        Ok(receipts)
    }

    /// Accumulated error messages, in append order.
    pub fn errors(&self) -> Vec<&str> {
        self.errors.iter().map(|e| e.message.as_str()).collect()
    }

    fn error_strings(&self) -> Vec<String> {
        self.errors.iter().map(|e| e.message.clone()).collect()
    }

    /// Number of files in the batch.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if the batch holds no files.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Get a file by index.
    pub fn get(&self, index: usize) -> Option<&FileInfo> {
        self.files.get(index)
    }

    /// Get a file by index, mutably.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut FileInfo> {
        self.files.get_mut(index)
    }

    /// Append a file to the batch.
    pub fn push(&mut self, file: FileInfo) {
        self.files.push(file);
    }

    /// Remove and return a file by index.
    pub fn remove(&mut self, index: usize) -> Option<FileInfo> {
        if index < self.files.len() {
            Some(self.files.remove(index))
        } else {
            None
        }
    }

    /// Iterate over the files in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, FileInfo> {
        self.files.iter()
    }

    /// Rename every file in the batch, preserving each file's extension.
    pub fn rename(&mut self, name: &str) {
        for file in &mut self.files {
            file.rename(name);
        }
    }

    /// Base names of the files.
    pub fn names(&self) -> Fanout<String> {
        self.fan_out(|f| f.name().to_string())
    }

    /// Extensions of the files.
    pub fn extensions(&self) -> Fanout<String> {
        self.fan_out(|f| f.extension().to_string())
    }

    /// Destination filenames of the files.
    pub fn names_with_extension(&self) -> Fanout<String> {
        self.fan_out(|f| f.name_with_extension())
    }

    /// Sizes of the files in bytes.
    pub async fn sizes(&self) -> Result<Fanout<u64>> {
        match self.files.as_slice() {
            [] => Ok(Fanout::None),
            [file] => Ok(Fanout::One(file.size().await?)),
            files => {
                let mut out = Vec::with_capacity(files.len());
                for file in files {
                    out.push(file.size().await?);
                }
                Ok(Fanout::Many(out))
            }
        }
    }

    /// Content checksums of the files.
    pub async fn checksums(&self) -> Result<Fanout<String>> {
        match self.files.as_slice() {
            [] => Ok(Fanout::None),
            [file] => Ok(Fanout::One(file.checksum().await?.to_string())),
            files => {
                let mut out = Vec::with_capacity(files.len());
                for file in files {
                    out.push(file.checksum().await?.to_string());
                }
                Ok(Fanout::Many(out))
            }
        }
    }

    /// Sniffed media types of the files.
    pub async fn media_types(&self) -> Result<Fanout<Mime>> {
        match self.files.as_slice() {
            [] => Ok(Fanout::None),
            [file] => Ok(Fanout::One(file.media_type().await?.clone())),
            files => {
                let mut out = Vec::with_capacity(files.len());
                for file in files {
                    out.push(file.media_type().await?.clone());
                }
                Ok(Fanout::Many(out))
            }
        }
    }

    /// Pixel dimensions of the files, `None` per file for non-image content.
    #[cfg(feature = "images")]
    pub async fn dimensions(&self) -> Result<Fanout<Option<(u32, u32)>>> {
        match self.files.as_slice() {
            [] => Ok(Fanout::None),
            [file] => Ok(Fanout::One(file.dimensions().await?)),
            files => {
                let mut out = Vec::with_capacity(files.len());
                for file in files {
                    out.push(file.dimensions().await?);
                }
                Ok(Fanout::Many(out))
            }
        }
    }

    fn fan_out<T>(&self, f: impl Fn(&FileInfo) -> T) -> Fanout<T> {
        match self.files.as_slice() {
            [] => Fanout::None,
            [file] => Fanout::One(f(file)),
            files => Fanout::Many(files.iter().map(f).collect()),
        }
    }
}

impl std::fmt::Debug for UploadBatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadBatch")
            .field("files", &self.files)
            .field("rules", &self.rules.len())
            .field("errors", &self.errors)
            .finish_non_exhaustive()
    }
}

impl std::ops::Index<usize> for UploadBatch {
    type Output = FileInfo;

    fn index(&self, index: usize) -> &Self::Output {
        &self.files[index]
    }
}

impl<'a> IntoIterator for &'a UploadBatch {
    type Item = &'a FileInfo;
    type IntoIter = std::slice::Iter<'a, FileInfo>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
