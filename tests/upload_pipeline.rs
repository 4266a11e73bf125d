//! Integration tests for common upload workflows.
//!
//! These tests verify that the most common use cases work correctly.

use hoist::*;
use std::io::Write;
use std::path::{Path, PathBuf};

fn write_temp(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.join(name);
    let mut f = std::fs::File::create(&path).unwrap();
    f.write_all(content).unwrap();
    path
}

const PNG_MAGIC: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

// =============================================================================
// End-to-End Upload Tests
// =============================================================================

#[tokio::test]
async fn test_two_file_batch_stored_end_to_end() {
    let inbox = tempfile::tempdir().unwrap();
    let dest = tempfile::tempdir().unwrap();

    let tmp_a = write_temp(inbox.path(), "upload-1", b"first payload");
    let tmp_b = write_temp(inbox.path(), "upload-2", b"second payload!");

    let report = TransportFiles::new().files(
        "attachments",
        vec![
            TransportEntry::ok(&tmp_a, "notes.txt"),
            TransportEntry::ok(&tmp_b, "draft.txt"),
        ],
    );

    let sink = FileSystemSink::with_directory(dest.path()).await.unwrap();
    let mut batch = UploadBatch::new("attachments", sink, &report)
        .unwrap()
        .rule(rules::SizeRule::from_human("1K").unwrap())
        .rule(rules::ExtensionRule::new(&["txt"]));

    assert!(batch.is_valid().await);
    let receipts = batch.upload().await.unwrap();

    assert_eq!(receipts.len(), 2);
    assert_eq!(receipts[0].key, "notes.txt");
    assert_eq!(receipts[0].size, 13);
    assert_eq!(receipts[1].key, "draft.txt");
    assert_eq!(receipts[1].size, 15);

    // Stored bytes are identical to the received payloads
    let stored_a = std::fs::read(dest.path().join("notes.txt")).unwrap();
    let stored_b = std::fs::read(dest.path().join("draft.txt")).unwrap();
    assert_eq!(stored_a, b"first payload");
    assert_eq!(stored_b, b"second payload!");

    // Receipts carry the derived attributes
    assert_eq!(
        receipts[0].checksum.as_deref(),
        Some(storage::calculate_checksum(b"first payload").as_str())
    );
    assert_eq!(receipts[0].content_type.as_deref(), Some("text/plain"));
}

#[tokio::test]
async fn test_rename_changes_destination_name() {
    let inbox = tempfile::tempdir().unwrap();
    let dest = tempfile::tempdir().unwrap();

    let tmp = write_temp(inbox.path(), "upload-1", &PNG_MAGIC);
    let report = TransportFiles::new().file("avatar", TransportEntry::ok(&tmp, "IMG_4921.png"));

    let sink = FileSystemSink::with_directory(dest.path()).await.unwrap();
    let mut batch = UploadBatch::new("avatar", sink, &report).unwrap();

    batch.rename("user-42-avatar");
    let receipts = batch.upload().await.unwrap();

    assert_eq!(receipts[0].key, "user-42-avatar.png");
    assert!(dest.path().join("user-42-avatar.png").exists());
    assert!(!dest.path().join("IMG_4921.png").exists());
}

#[tokio::test]
async fn test_invalid_batch_never_reaches_storage() {
    let inbox = tempfile::tempdir().unwrap();
    let dest = tempfile::tempdir().unwrap();

    let tmp = write_temp(inbox.path(), "upload-1", &[0u8; 4096]);
    let report = TransportFiles::new().file("doc", TransportEntry::ok(&tmp, "report.pdf"));

    let sink = FileSystemSink::with_directory(dest.path()).await.unwrap();
    let mut batch = UploadBatch::new("doc", sink, &report)
        .unwrap()
        .rule(rules::SizeRule::from_human("1K").unwrap());

    let err = batch.upload().await.unwrap_err();
    assert!(err.is_validation_failed());
    let errors = err.validation_errors().unwrap();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].starts_with("report.pdf: File too large"));

    // The destination directory was never written to
    assert_eq!(std::fs::read_dir(dest.path()).unwrap().count(), 0);
}

// =============================================================================
// Media Type Sniffing Tests
// =============================================================================

#[tokio::test]
async fn test_media_type_rule_uses_content_not_name() {
    let inbox = tempfile::tempdir().unwrap();
    let dest = tempfile::tempdir().unwrap();

    // PNG content disguised with a .txt name
    let tmp = write_temp(inbox.path(), "upload-1", &PNG_MAGIC);
    let report = TransportFiles::new().file("doc", TransportEntry::ok(&tmp, "innocent.txt"));

    let sink = FileSystemSink::with_directory(dest.path()).await.unwrap();
    let mut batch = UploadBatch::new("doc", sink, &report)
        .unwrap()
        .rule(rules::MediaTypeRule::new(&["text/plain"]));

    assert!(!batch.is_valid().await);
    assert_eq!(
        batch.errors(),
        vec!["innocent.txt: Media type not allowed: image/png"]
    );
}

// =============================================================================
// Destination Collision Tests
// =============================================================================

#[tokio::test]
async fn test_collision_fails_and_overwrite_recovers() {
    let inbox = tempfile::tempdir().unwrap();
    let dest = tempfile::tempdir().unwrap();

    write_temp(dest.path(), "taken.txt", b"existing");
    let tmp = write_temp(inbox.path(), "upload-1", b"replacement");
    let report = TransportFiles::new().file("f", TransportEntry::ok(&tmp, "taken.txt"));

    let sink = FileSystemSink::with_directory(dest.path()).await.unwrap();
    let mut batch = UploadBatch::new("f", sink, &report).unwrap();
    let err = batch.upload().await.unwrap_err();
    assert!(err.is_storage());

    let sink = FileSystemSink::new(FileSystemConfig::new(dest.path()).overwrite(true))
        .await
        .unwrap();
    let mut batch = UploadBatch::new("f", sink, &report).unwrap();
    batch.upload().await.unwrap();

    let replaced = std::fs::read(dest.path().join("taken.txt")).unwrap();
    assert_eq!(replaced, b"replacement");
}

// =============================================================================
// Lifecycle Callback Tests
// =============================================================================

#[tokio::test]
async fn test_callbacks_observe_every_stored_file() {
    let inbox = tempfile::tempdir().unwrap();
    let dest = tempfile::tempdir().unwrap();

    let tmp_a = write_temp(inbox.path(), "upload-1", b"a");
    let tmp_b = write_temp(inbox.path(), "upload-2", b"b");
    let report = TransportFiles::new().files(
        "f",
        vec![
            TransportEntry::ok(&tmp_a, "a.txt"),
            TransportEntry::ok(&tmp_b, "b.txt"),
        ],
    );

    let stored = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
    let seen = stored.clone();

    let sink = FileSystemSink::with_directory(dest.path()).await.unwrap();
    let mut batch = UploadBatch::new("f", sink, &report)
        .unwrap()
        .after_upload(move |file| {
            seen.lock().unwrap().push(file.name_with_extension());
        });

    batch.upload().await.unwrap();

    assert_eq!(*stored.lock().unwrap(), vec!["a.txt", "b.txt"]);
}
