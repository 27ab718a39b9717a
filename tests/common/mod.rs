/*!
 * Common test utilities for the readaloud test suite
 */

use anyhow::Result;
use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use readaloud::speech::VoiceProfile;

pub mod mock_engines;
pub mod pdf_builder;

/// Route library logs through env_logger; safe to call from every test
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: impl AsRef<[u8]>) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// A gray PNG of the given size with a dark band across the middle
pub fn sample_png(width: u32, height: u32) -> Vec<u8> {
    let image = GrayImage::from_fn(width, height, |_, y| {
        if y >= height / 3 && y < 2 * height / 3 { Luma([20]) } else { Luma([235]) }
    });

    let mut bytes = Vec::new();
    DynamicImage::ImageLuma8(image)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .expect("PNG encoding should succeed");
    bytes
}

/// A JPEG of the given size
pub fn sample_jpeg(width: u32, height: u32) -> Vec<u8> {
    let image = GrayImage::from_fn(width, height, |x, _| Luma([(x % 256) as u8]));

    let mut bytes = Vec::new();
    DynamicImage::ImageLuma8(image)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Jpeg)
        .expect("JPEG encoding should succeed");
    bytes
}

/// A small set of voices resembling an espeak-ng listing
pub fn sample_voices() -> Vec<VoiceProfile> {
    vec![
        VoiceProfile::new("gmw/en", "en-GB", "English (Great Britain)"),
        VoiceProfile::new("gmw/en-US", "en-US", "English (America)"),
        VoiceProfile::new("roa/fr", "fr-FR", "French (France)"),
    ]
}
