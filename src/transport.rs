//! Transport-level upload report.
//!
//! The transport layer (an HTTP server, a job runner) reports the files it
//! received for a request as a [`TransportFiles`] structure: one or more
//! entries per field key, each carrying the temporary path the payload was
//! written to, the client-supplied name, and a status code. The report is
//! always passed explicitly to batch construction; the pipeline never reads
//! ambient request state.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

/// Per-file transport status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportStatus {
    /// The file was received in full.
    Ok,
    /// The file exceeds the server-wide upload size limit.
    ExceedsServerLimit,
    /// The file exceeds the size limit declared by the submitting form.
    ExceedsFormLimit,
    /// The file was only partially transferred.
    PartialUpload,
    /// No file was present in the field.
    NoFile,
    /// The server has no temporary directory to receive uploads.
    NoTempDir,
    /// The server failed to write the payload to disk.
    WriteFailed,
    /// A server extension rejected the upload.
    ExtensionBlocked,
}

impl TransportStatus {
    /// Check if the transfer completed successfully.
    pub fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }

    /// Fixed human-readable message for this status.
    pub fn message(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::ExceedsServerLimit => "The uploaded file exceeds the server size limit",
            Self::ExceedsFormLimit => {
                "The uploaded file exceeds the size limit declared by the form"
            }
            Self::PartialUpload => "The uploaded file was only partially uploaded",
            Self::NoFile => "No file was uploaded",
            Self::NoTempDir => "Missing a temporary folder",
            Self::WriteFailed => "Failed to write file to disk",
            Self::ExtensionBlocked => "An extension stopped the file upload",
        }
    }
}

impl fmt::Display for TransportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// One file entry reported by the transport.
#[derive(Debug, Clone)]
pub struct TransportEntry {
    /// Temporary path the payload was written to. Absent for failed transfers.
    pub tmp_path: Option<PathBuf>,
    /// Client-supplied file name.
    pub name: String,
    /// Transfer status.
    pub status: TransportStatus,
}

impl TransportEntry {
    /// A successfully received file.
    pub fn ok(tmp_path: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            tmp_path: Some(tmp_path.into()),
            name: name.into(),
            status: TransportStatus::Ok,
        }
    }

    /// A file whose transfer failed with the given status.
    pub fn failed(name: impl Into<String>, status: TransportStatus) -> Self {
        Self {
            tmp_path: None,
            name: name.into(),
            status,
        }
    }
}

/// The full set of files reported by the transport for one request,
/// grouped by field key.
#[derive(Debug, Clone, Default)]
pub struct TransportFiles {
    entries: HashMap<String, Vec<TransportEntry>>,
}

impl TransportFiles {
    /// Create an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a single entry under a field key.
    pub fn file(mut self, key: impl Into<String>, entry: TransportEntry) -> Self {
        self.entries.entry(key.into()).or_default().push(entry);
        self
    }

    /// Add several entries under a field key, preserving their order.
    pub fn files(mut self, key: impl Into<String>, entries: Vec<TransportEntry>) -> Self {
        self.entries.entry(key.into()).or_default().extend(entries);
        self
    }

    /// Get the entries reported under a key, in report order.
    pub fn get(&self, key: &str) -> Option<&[TransportEntry]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    /// Check if any entries were reported under a key.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of field keys in the report.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the report is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
