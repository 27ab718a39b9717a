//! Image files as single-page documents

use std::fs;
use std::path::Path;

use crate::errors::ExtractionError;

use super::{DocumentSource, PageContent};

/// A PNG or JPEG file; its only page is the image itself
#[derive(Debug, Clone)]
pub struct ImageDocument {
    bytes: Vec<u8>,
}

impl ImageDocument {
    pub fn open(path: &Path) -> Result<Self, ExtractionError> {
        let bytes = fs::read(path)?;
        Self::from_bytes(bytes).ok_or_else(|| ExtractionError::UnsupportedType(path.display().to_string()))
    }

    /// `None` if the bytes are not an image format we can decode
    pub fn from_bytes(bytes: Vec<u8>) -> Option<Self> {
        match image::guess_format(&bytes) {
            Ok(image::ImageFormat::Png | image::ImageFormat::Jpeg) => Some(Self { bytes }),
            _ => None,
        }
    }
}

impl DocumentSource for ImageDocument {
    fn page_count(&self) -> usize {
        1
    }

    fn page(&self, index: usize) -> Result<PageContent, ExtractionError> {
        if index != 0 {
            return Err(ExtractionError::PageOutOfRange { index, count: 1 });
        }
        Ok(PageContent::Bitmap(self.bytes.clone()))
    }
}
