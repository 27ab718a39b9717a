/*!
 * Document text extraction.
 *
 * A document exposes a page count and, per page, either embedded text or an
 * encoded bitmap that needs OCR:
 * - `pdf`: PDF files through lopdf, with scanned pages surfaced as images
 * - `image`: a single PNG or JPEG file as a one-page document
 * - `ocr`: OCR engine trait, confidence filtering and the Cloud Vision client
 * - `preprocess`: contrast and threshold cleanup before OCR
 * - `extractor`: walks the pages and assembles the document text
 */

use std::fs;
use std::path::Path;

use crate::errors::ExtractionError;
use crate::file_utils::{DocumentKind, FileManager};

pub mod extractor;
pub mod image;
pub mod ocr;
pub mod pdf;
pub mod preprocess;

pub use extractor::{ExtractedDocument, ExtractedPage, ExtractionMethod, Extractor};
pub use image::ImageDocument;
pub use ocr::{OcrEngine, OcrWord, VisionOcr};
pub use pdf::PdfDocument;

/// What a page offers for extraction
#[derive(Debug, Clone, PartialEq)]
pub enum PageContent {
    /// Text embedded in the document
    Text(String),
    /// An encoded image (PNG or JPEG) to run through OCR
    Bitmap(Vec<u8>),
    /// Nothing usable on the page
    Empty,
}

/// A paged document
pub trait DocumentSource: Send + Sync {
    fn page_count(&self) -> usize;

    /// Content of the zero-based page `index`
    fn page(&self, index: usize) -> Result<PageContent, ExtractionError>;
}

/// A plain text file as a one-page document
#[derive(Debug, Clone)]
pub struct TextDocument {
    text: String,
}

impl TextDocument {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl DocumentSource for TextDocument {
    fn page_count(&self) -> usize {
        1
    }

    fn page(&self, index: usize) -> Result<PageContent, ExtractionError> {
        if index != 0 {
            return Err(ExtractionError::PageOutOfRange { index, count: 1 });
        }

        if self.text.trim().is_empty() {
            Ok(PageContent::Empty)
        } else {
            Ok(PageContent::Text(self.text.clone()))
        }
    }
}

/// Open `path` as a document based on its type
pub fn open(path: &Path, min_text_chars: usize) -> Result<Box<dyn DocumentSource>, ExtractionError> {
    match FileManager::detect_document_kind(path) {
        Some(DocumentKind::Pdf) => Ok(Box::new(PdfDocument::open(path)?.with_min_text_chars(min_text_chars))),
        Some(DocumentKind::Image) => Ok(Box::new(ImageDocument::open(path)?)),
        Some(DocumentKind::Text) => Ok(Box::new(TextDocument::new(fs::read_to_string(path)?))),
        None => Err(ExtractionError::UnsupportedType(path.display().to_string())),
    }
}
