/*!
 * PDF documents via lopdf.
 *
 * Pages with a usable text layer yield their embedded text. Scanned pages
 * usually carry one full-page image and little or no text; for those the
 * largest image on the page is handed out as a bitmap for OCR.
 */

use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use log::{debug, warn};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::io::Cursor;
use std::path::Path;

use crate::errors::ExtractionError;

use super::{DocumentSource, PageContent};

/// Embedded text shorter than this marks a page as scanned
pub const DEFAULT_MIN_TEXT_CHARS: usize = 20;

// Guards against cyclic Parent chains in broken files
const MAX_PARENT_DEPTH: usize = 32;

/// A PDF opened for extraction
pub struct PdfDocument {
    document: Document,
    /// Page numbers in document order
    pages: Vec<u32>,
    min_text_chars: usize,
}

impl PdfDocument {
    pub fn open(path: &Path) -> Result<Self, ExtractionError> {
        let document = Document::load(path)?;
        Ok(Self::from_document(document))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ExtractionError> {
        let document = Document::load_mem(bytes)?;
        Ok(Self::from_document(document))
    }

    fn from_document(document: Document) -> Self {
        let pages: Vec<u32> = document.get_pages().keys().copied().collect();
        debug!("Opened PDF with {} pages", pages.len());
        Self {
            document,
            pages,
            min_text_chars: DEFAULT_MIN_TEXT_CHARS,
        }
    }

    pub fn with_min_text_chars(mut self, min_text_chars: usize) -> Self {
        self.min_text_chars = min_text_chars;
        self
    }

    fn page_text(&self, page_number: u32) -> String {
        match self.document.extract_text(&[page_number]) {
            Ok(text) => text,
            Err(e) => {
                warn!("Could not extract text from page {}: {}", page_number, e);
                String::new()
            }
        }
    }

    fn page_id(&self, page_number: u32) -> Option<ObjectId> {
        self.document.get_pages().get(&page_number).copied()
    }

    /// The largest decodable image on the page, encoded as PNG or JPEG
    fn largest_image(&self, page_id: ObjectId) -> Option<Vec<u8>> {
        let resources = self.page_resources(page_id)?;
        let xobjects = self.resolve(resources.get(b"XObject").ok()?).as_dict().ok()?;

        let mut best: Option<(u64, &Stream)> = None;
        for (_, entry) in xobjects.iter() {
            let Ok(stream) = self.resolve(entry).as_stream() else {
                continue;
            };
            if !is_image(&stream.dict) {
                continue;
            }

            let area = dimension(&stream.dict, b"Width") as u64 * dimension(&stream.dict, b"Height") as u64;
            if best.is_none_or(|(best_area, _)| area > best_area) {
                best = Some((area, stream));
            }
        }

        let (_, stream) = best?;
        encode_image(stream)
    }

    /// Resources of a page, inherited from the page tree if needed
    fn page_resources(&self, page_id: ObjectId) -> Option<&Dictionary> {
        let mut node = self.document.get_dictionary(page_id).ok()?;

        for _ in 0..MAX_PARENT_DEPTH {
            if let Ok(resources) = node.get(b"Resources") {
                return self.resolve(resources).as_dict().ok();
            }

            let parent = node.get(b"Parent").ok()?.as_reference().ok()?;
            node = self.document.get_dictionary(parent).ok()?;
        }

        None
    }

    fn resolve<'a>(&'a self, object: &'a Object) -> &'a Object {
        match object {
            Object::Reference(id) => self.document.get_object(*id).unwrap_or(object),
            _ => object,
        }
    }
}

impl DocumentSource for PdfDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page(&self, index: usize) -> Result<PageContent, ExtractionError> {
        let page_number = *self.pages.get(index).ok_or(ExtractionError::PageOutOfRange {
            index,
            count: self.pages.len(),
        })?;

        let text = self.page_text(page_number);
        let trimmed = text.trim();
        if trimmed.chars().count() >= self.min_text_chars {
            return Ok(PageContent::Text(trimmed.to_string()));
        }

        if let Some(bitmap) = self.page_id(page_number).and_then(|id| self.largest_image(id)) {
            debug!(
                "Page {} has {} embedded characters, using its image",
                page_number,
                trimmed.chars().count()
            );
            return Ok(PageContent::Bitmap(bitmap));
        }

        if trimmed.is_empty() {
            Ok(PageContent::Empty)
        } else {
            Ok(PageContent::Text(trimmed.to_string()))
        }
    }
}

fn is_image(dict: &Dictionary) -> bool {
    dict.get(b"Subtype")
        .and_then(Object::as_name)
        .map(|name| name == b"Image")
        .unwrap_or(false)
}

fn dimension(dict: &Dictionary, key: &[u8]) -> u32 {
    dict.get(key)
        .and_then(Object::as_i64)
        .ok()
        .and_then(|value| u32::try_from(value).ok())
        .unwrap_or(0)
}

/// Filters applied to the stream, in decoding order
fn image_filters(dict: &Dictionary) -> Vec<Vec<u8>> {
    match dict.get(b"Filter") {
        Ok(Object::Name(name)) => vec![name.clone()],
        Ok(Object::Array(filters)) => filters
            .iter()
            .filter_map(|filter| filter.as_name().ok().map(|name| name.to_vec()))
            .collect(),
        _ => Vec::new(),
    }
}

fn encode_image(stream: &Stream) -> Option<Vec<u8>> {
    let filters = image_filters(&stream.dict);

    match filters.as_slice() {
        [] => raw_to_png(&stream.dict, stream.content.clone()),
        // JPEG data can go to OCR as is
        [filter] if filter.as_slice() == b"DCTDecode" => Some(stream.content.clone()),
        [filter] if filter.as_slice() == b"FlateDecode" => match stream.decompressed_content() {
            Ok(pixels) => raw_to_png(&stream.dict, pixels),
            Err(e) => {
                warn!("Could not decompress page image: {}", e);
                None
            }
        },
        chain => {
            let names: Vec<String> = chain.iter().map(|name| String::from_utf8_lossy(name).into_owned()).collect();
            debug!("Skipping image with unsupported filters [{}]", names.join(", "));
            None
        }
    }
}

/// Encode 8-bit gray or RGB samples as PNG
fn raw_to_png(dict: &Dictionary, pixels: Vec<u8>) -> Option<Vec<u8>> {
    let width = dimension(dict, b"Width");
    let height = dimension(dict, b"Height");
    let bits = dict.get(b"BitsPerComponent").and_then(Object::as_i64).unwrap_or(8);
    if width == 0 || height == 0 || bits != 8 {
        debug!("Skipping {}x{} image with {} bits per component", width, height, bits);
        return None;
    }

    let area = width as usize * height as usize;
    let image = if pixels.len() >= area * 3 {
        let mut pixels = pixels;
        pixels.truncate(area * 3);
        DynamicImage::ImageRgb8(RgbImage::from_raw(width, height, pixels)?)
    } else if pixels.len() >= area {
        let mut pixels = pixels;
        pixels.truncate(area);
        DynamicImage::ImageLuma8(GrayImage::from_raw(width, height, pixels)?)
    } else {
        debug!("Image data too short for {}x{} pixels", width, height);
        return None;
    };

    let mut encoded = Vec::new();
    image.write_to(&mut Cursor::new(&mut encoded), ImageFormat::Png).ok()?;
    Some(encoded)
}
