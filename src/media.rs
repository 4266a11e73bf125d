//! Content-based media type detection.
//!
//! The media type of an uploaded file is determined from its leading bytes,
//! never from the client-declared type. A mismatch between a file's name and
//! its actual content therefore surfaces as the sniffed type.

use mime::Mime;

/// Maximum bytes needed for signature detection.
pub const SNIFF_LEN: usize = 512;

/// Detect a media type from file content.
///
/// Returns `None` when no known signature matches; callers treat that as
/// `application/octet-stream`.
pub fn detect_media_type(bytes: &[u8]) -> Option<Mime> {
    if bytes.len() < 4 {
        return None;
    }

    let mime = match &bytes[0..4] {
        [0xFF, 0xD8, 0xFF, _] => mime::IMAGE_JPEG,
        [0x89, 0x50, 0x4E, 0x47] => mime::IMAGE_PNG,
        [0x47, 0x49, 0x46, 0x38] => mime::IMAGE_GIF,
        [0x52, 0x49, 0x46, 0x46] if bytes.len() >= 12 && &bytes[8..12] == b"WEBP" => {
            "image/webp".parse().ok()?
        }
        [0x42, 0x4D, _, _] => mime::IMAGE_BMP,
        [0x49, 0x49, 0x2A, 0x00] | [0x4D, 0x4D, 0x00, 0x2A] => "image/tiff".parse().ok()?,
        [0x25, 0x50, 0x44, 0x46] => mime::APPLICATION_PDF,
        [0x50, 0x4B, 0x03, 0x04] => "application/zip".parse().ok()?,
        [0x1F, 0x8B, _, _] => "application/gzip".parse().ok()?,
        _ => return detect_text(bytes),
    };

    Some(mime)
}

/// Check if a media type is a raster image with readable pixel dimensions.
pub fn is_raster_image(mime: &Mime) -> bool {
    mime.type_() == mime::IMAGE && mime.subtype() != mime::SVG
}

fn detect_text(bytes: &[u8]) -> Option<Mime> {
    let head = &bytes[..bytes.len().min(SNIFF_LEN)];

    // SVG and generic XML both open with markup
    let trimmed = head
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .map(|i| &head[i..])
        .unwrap_or(head);
    if trimmed.starts_with(b"<svg") || trimmed.starts_with(b"<?xml") {
        return Some(mime::IMAGE_SVG);
    }

    if head.iter().all(|b| !b.is_ascii_control() || b.is_ascii_whitespace()) {
        return Some(mime::TEXT_PLAIN);
    }

    None
}
