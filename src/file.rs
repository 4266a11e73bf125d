//! Uploaded file descriptor.

use mime::Mime;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncReadExt;
use tokio::sync::OnceCell;

use crate::media;
use crate::storage::calculate_checksum;
use crate::transport::TransportEntry;
use crate::{Result, UploadError};

/// Information about one physical uploaded file.
///
/// The base name and extension are tracked separately: renaming replaces
/// the base name only, and [`FileInfo::name_with_extension`] re-joins the
/// two for the destination filename. Derived attributes (size, checksum,
/// media type, dimensions) are read lazily from the temporary path and
/// cached after the first computation.
#[derive(Debug, Clone)]
pub struct FileInfo {
    tmp_path: PathBuf,
    name: String,
    extension: String,
    genuine: bool,
    size: OnceCell<u64>,
    checksum: OnceCell<String>,
    media_type: OnceCell<Mime>,
    #[cfg(feature = "images")]
    dimensions: OnceCell<Option<(u32, u32)>>,
}

impl FileInfo {
    /// Describe a file at an arbitrary local path.
    ///
    /// Files built this way are not genuine uploads and will fail batch
    /// validation; use this for inspection outside the upload pipeline.
    pub fn from_path(tmp_path: impl Into<PathBuf>, name: impl Into<String>) -> Result<Self> {
        Self::build(tmp_path.into(), &name.into(), false)
    }

    /// Build from a successfully received transport entry.
    pub fn from_transport(entry: &TransportEntry) -> Result<Self> {
        if !entry.status.is_ok() {
            return Err(UploadError::InvalidInput(format!(
                "Transport entry for {} did not complete: {}",
                entry.name, entry.status
            )));
        }
        let tmp_path = entry.tmp_path.clone().ok_or_else(|| {
            UploadError::InvalidInput(format!("Transport entry for {} has no path", entry.name))
        })?;

        Self::build(tmp_path, &entry.name, true)
    }

    fn build(tmp_path: PathBuf, original_name: &str, genuine: bool) -> Result<Self> {
        if tmp_path.as_os_str().is_empty() {
            return Err(UploadError::InvalidInput(
                "Temporary path must not be empty".to_string(),
            ));
        }
        if original_name.is_empty() {
            return Err(UploadError::InvalidInput(
                "File name must not be empty".to_string(),
            ));
        }

        let path = Path::new(original_name);
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| original_name.to_string());

        Ok(Self {
            tmp_path,
            name,
            extension,
            genuine,
            size: OnceCell::new(),
            checksum: OnceCell::new(),
            media_type: OnceCell::new(),
            #[cfg(feature = "images")]
            dimensions: OnceCell::new(),
        })
    }

    /// Temporary path of the received payload.
    pub fn tmp_path(&self) -> &Path {
        &self.tmp_path
    }

    /// Current base name, without extension.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// File extension, lower-cased, without the leading dot. Empty when the
    /// original name carried none.
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Base name and extension joined with a dot; the canonical destination
    /// filename.
    pub fn name_with_extension(&self) -> String {
        if self.extension.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.name, self.extension)
        }
    }

    /// Replace the base name, preserving the extension. The file on disk is
    /// untouched.
    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Check if the temporary path was reported by the transport's upload
    /// mechanism, as opposed to an arbitrary local path.
    pub fn is_genuine_upload(&self) -> bool {
        self.genuine
    }

    /// File size in bytes. Computed on first call, cached after.
    pub async fn size(&self) -> io::Result<u64> {
        self.size
            .get_or_try_init(|| async {
                let meta = fs::metadata(&self.tmp_path).await?;
                Ok::<_, io::Error>(meta.len())
            })
            .await
            .copied()
    }

    /// SHA-256 hash of the file content. Computed on first call, cached after.
    pub async fn checksum(&self) -> io::Result<&str> {
        self.checksum
            .get_or_try_init(|| async {
                let data = fs::read(&self.tmp_path).await?;
                Ok::<_, io::Error>(calculate_checksum(&data))
            })
            .await
            .map(String::as_str)
    }

    /// Media type sniffed from the file content. The client-declared type is
    /// never consulted; unrecognized content is `application/octet-stream`.
    pub async fn media_type(&self) -> io::Result<&Mime> {
        self.media_type
            .get_or_try_init(|| async {
                let head = self.read_head().await?;
                Ok::<_, io::Error>(
                    media::detect_media_type(&head).unwrap_or(mime::APPLICATION_OCTET_STREAM),
                )
            })
            .await
    }

    /// Pixel dimensions for raster image content, `None` for everything else
    /// or when the image cannot be decoded.
    #[cfg(feature = "images")]
    pub async fn dimensions(&self) -> io::Result<Option<(u32, u32)>> {
        self.dimensions
            .get_or_try_init(|| async {
                let mime = self.media_type().await?;
                if !media::is_raster_image(mime) {
                    return Ok(None);
                }

                let data = fs::read(&self.tmp_path).await?;
                let dims = image::ImageReader::new(std::io::Cursor::new(data))
                    .with_guessed_format()
                    .ok()
                    .and_then(|reader| reader.into_dimensions().ok());
                Ok::<_, io::Error>(dims)
            })
            .await
            .copied()
    }

    async fn read_head(&self) -> io::Result<Vec<u8>> {
        let mut file = fs::File::open(&self.tmp_path).await?;
        let mut buf = vec![0u8; media::SNIFF_LEN];
        let mut filled = 0;

        while filled < buf.len() {
            let n = file.read(&mut buf[filled..]).await?;
            if n == 0 {
                break;
            }
            filled += n;
        }

        buf.truncate(filled);
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(dir: &tempfile::TempDir, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(content).unwrap();
        path
    }

    #[test]
    fn test_name_and_extension_split() {
        let info = FileInfo::from_path("/tmp/abc123", "Photo.PNG").unwrap();
        assert_eq!(info.name(), "Photo");
        assert_eq!(info.extension(), "png");
        assert_eq!(info.name_with_extension(), "Photo.png");
    }

    #[test]
    fn test_name_without_extension() {
        let info = FileInfo::from_path("/tmp/abc123", "README").unwrap();
        assert_eq!(info.name(), "README");
        assert_eq!(info.extension(), "");
        assert_eq!(info.name_with_extension(), "README");
    }

    #[test]
    fn test_rename_preserves_extension() {
        let mut info = FileInfo::from_path("/tmp/abc123", "report.pdf").unwrap();
        info.rename("2024-summary");
        assert_eq!(info.name(), "2024-summary");
        assert_eq!(info.name_with_extension(), "2024-summary.pdf");
    }

    #[test]
    fn test_empty_inputs_rejected() {
        assert!(FileInfo::from_path("", "a.txt").is_err());
        assert!(FileInfo::from_path("/tmp/x", "").is_err());
    }

    #[test]
    fn test_genuine_flag() {
        let arbitrary = FileInfo::from_path("/tmp/abc123", "a.txt").unwrap();
        assert!(!arbitrary.is_genuine_upload());

        let entry = TransportEntry::ok("/tmp/abc123", "a.txt");
        let genuine = FileInfo::from_transport(&entry).unwrap();
        assert!(genuine.is_genuine_upload());
    }

    #[test]
    fn test_failed_transport_entry_rejected() {
        let entry = TransportEntry::failed("a.txt", crate::TransportStatus::NoFile);
        assert!(FileInfo::from_transport(&entry).is_err());
    }

    #[tokio::test]
    async fn test_lazy_size_and_checksum() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp(&dir, "data.bin", b"hello world");

        let info = FileInfo::from_path(&path, "data.bin").unwrap();
        assert_eq!(info.size().await.unwrap(), 11);

        let first = info.checksum().await.unwrap().to_string();
        let second = info.checksum().await.unwrap().to_string();
        assert_eq!(first, second);
        assert_eq!(first, calculate_checksum(b"hello world"));
    }

    #[tokio::test]
    async fn test_media_type_sniffed_not_guessed() {
        let dir = tempfile::tempdir().unwrap();
        // PNG signature despite a .txt name
        let path = write_temp(&dir, "fake.txt", &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]);

        let info = FileInfo::from_path(&path, "fake.txt").unwrap();
        assert_eq!(info.media_type().await.unwrap(), &mime::IMAGE_PNG);
    }

    #[tokio::test]
    async fn test_unknown_content_is_octet_stream() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp(&dir, "blob", &[0x00, 0x01, 0x02, 0x03, 0x04]);

        let info = FileInfo::from_path(&path, "blob").unwrap();
        assert_eq!(
            info.media_type().await.unwrap(),
            &mime::APPLICATION_OCTET_STREAM
        );
    }

    #[cfg(feature = "images")]
    #[tokio::test]
    async fn test_dimensions_none_for_non_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp(&dir, "notes.txt", b"plain text");

        let info = FileInfo::from_path(&path, "notes.txt").unwrap();
        assert_eq!(info.dimensions().await.unwrap(), None);
    }
}
