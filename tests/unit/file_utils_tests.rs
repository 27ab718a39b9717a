/*!
 * Tests for file utility functions
 */

use anyhow::Result;
use std::path::Path;

use readaloud::file_utils::{DocumentKind, FileManager};

use crate::common;

/// Test that file_exists returns true for existing files
#[test]
fn test_file_exists_withExistingFile_shouldReturnTrue() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let test_file = common::create_test_file(temp_dir.path(), "exists.txt", "test content")?;

    assert!(FileManager::file_exists(&test_file));
    assert!(!FileManager::file_exists(temp_dir.path()));
    Ok(())
}

#[test]
fn test_file_exists_withNonExistentFile_shouldReturnFalse() {
    assert!(!FileManager::file_exists("non_existent_file.tmp"));
}

/// Test that generate_output_path swaps the extension into the output directory
#[test]
fn test_generate_output_path_withValidInputs_shouldCreateCorrectPath() {
    let output_path = FileManager::generate_output_path(
        Path::new("/tmp/input/scan.page.pdf"),
        Path::new("/tmp/output"),
        ".txt",
    );

    assert_eq!(output_path, Path::new("/tmp/output/scan.page.txt"));
}

#[test]
fn test_detect_document_kind_withExtensions_shouldClassify() {
    assert_eq!(FileManager::detect_document_kind("paper.PDF"), Some(DocumentKind::Pdf));
    assert_eq!(FileManager::detect_document_kind("scan.jpeg"), Some(DocumentKind::Image));
    assert_eq!(FileManager::detect_document_kind("notes.md"), Some(DocumentKind::Text));
    assert_eq!(FileManager::detect_document_kind("movie.mkv"), None);
}

/// Files without a known extension are classified by their magic bytes
#[test]
fn test_detect_document_kind_withoutExtension_shouldSniffContent() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let pdf = common::create_test_file(temp_dir.path(), "download", b"%PDF-1.5\n%rest")?;
    let png = common::create_test_file(temp_dir.path(), "capture", common::sample_png(4, 4))?;
    let other = common::create_test_file(temp_dir.path(), "blob", b"just some bytes")?;

    assert_eq!(FileManager::detect_document_kind(&pdf), Some(DocumentKind::Pdf));
    assert_eq!(FileManager::detect_document_kind(&png), Some(DocumentKind::Image));
    assert_eq!(FileManager::detect_document_kind(&other), None);
    Ok(())
}

#[test]
fn test_find_documents_shouldReturnSortedPdfsAndImagesRecursively() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let nested = temp_dir.path().join("nested");
    FileManager::ensure_dir(&nested)?;

    common::create_test_file(temp_dir.path(), "b.pdf", b"%PDF")?;
    common::create_test_file(temp_dir.path(), "a.png", common::sample_png(2, 2))?;
    common::create_test_file(temp_dir.path(), "notes.txt", "ignored")?;
    common::create_test_file(&nested, "c.JPG", common::sample_jpeg(2, 2))?;

    let found = FileManager::find_documents(temp_dir.path())?;
    let names: Vec<String> = found
        .iter()
        .map(|p| p.strip_prefix(temp_dir.path()).unwrap().to_string_lossy().replace('\\', "/"))
        .collect();

    assert_eq!(names, vec!["a.png", "b.pdf", "nested/c.JPG"]);
    Ok(())
}

#[test]
fn test_write_to_file_shouldCreateParentDirectories() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let target = temp_dir.path().join("out").join("deep").join("text.txt");

    FileManager::write_to_file(&target, "hello")?;

    assert_eq!(FileManager::read_to_string(&target)?, "hello");
    assert!(FileManager::dir_exists(temp_dir.path().join("out")));
    Ok(())
}
