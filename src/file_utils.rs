use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

// @module: File and directory utilities

/// Kinds of files text can be extracted from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Image,
    Text,
}

const PDF_EXTENSIONS: [&str; 1] = ["pdf"];
const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];
const TEXT_EXTENSIONS: [&str; 3] = ["txt", "text", "md"];

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_file()
    }

    // @checks: Directory existence
    pub fn dir_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_dir()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.as_os_str().is_empty() && !path.exists() {
            fs::create_dir_all(path)?;
        }
        Ok(())
    }

    // @generates: Output path for extracted text
    // @params: input_file, output_dir, extension
    pub fn generate_output_path<P1: AsRef<Path>, P2: AsRef<Path>>(
        input_file: P1,
        output_dir: P2,
        extension: &str,
    ) -> PathBuf {
        let stem = input_file.as_ref().file_stem().unwrap_or_default();

        let mut output_filename = stem.to_string_lossy().to_string();
        output_filename.push('.');
        output_filename.push_str(extension.trim_start_matches('.'));

        output_dir.as_ref().join(output_filename)
    }

    /// Guess the document kind from the extension, then from the file's magic bytes
    pub fn detect_document_kind<P: AsRef<Path>>(path: P) -> Option<DocumentKind> {
        let path = path.as_ref();

        if let Some(kind) = path
            .extension()
            .and_then(|ext| Self::kind_for_extension(&ext.to_string_lossy()))
        {
            return Some(kind);
        }

        let mut header = [0u8; 16];
        let read = File::open(path).and_then(|mut file| file.read(&mut header)).ok()?;
        let header = &header[..read];

        if header.starts_with(b"%PDF") {
            Some(DocumentKind::Pdf)
        } else if matches!(
            image::guess_format(header),
            Ok(image::ImageFormat::Png | image::ImageFormat::Jpeg)
        ) {
            Some(DocumentKind::Image)
        } else {
            None
        }
    }

    fn kind_for_extension(extension: &str) -> Option<DocumentKind> {
        let extension = extension.to_lowercase();
        if PDF_EXTENSIONS.contains(&extension.as_str()) {
            Some(DocumentKind::Pdf)
        } else if IMAGE_EXTENSIONS.contains(&extension.as_str()) {
            Some(DocumentKind::Image)
        } else if TEXT_EXTENSIONS.contains(&extension.as_str()) {
            Some(DocumentKind::Text)
        } else {
            None
        }
    }

    /// Find PDF and image files under a directory, sorted by path
    pub fn find_documents<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
        let mut result = Vec::new();

        for entry in WalkDir::new(dir.as_ref()).follow_links(true) {
            let entry = entry.context("Failed to read directory entry")?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            let kind = path
                .extension()
                .and_then(|ext| Self::kind_for_extension(&ext.to_string_lossy()));
            if matches!(kind, Some(DocumentKind::Pdf | DocumentKind::Image)) {
                result.push(path.to_path_buf());
            }
        }

        result.sort();
        Ok(result)
    }

    /// Read a file to a string
    pub fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String> {
        fs::read_to_string(&path).with_context(|| format!("Failed to read file: {:?}", path.as_ref()))
    }

    /// Write a string to a file
    pub fn write_to_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            Self::ensure_dir(parent)?;
        }

        fs::write(&path, content).with_context(|| format!("Failed to write to file: {:?}", path.as_ref()))?;
        Ok(())
    }
}
