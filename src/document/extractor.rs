/*!
 * Page-by-page text extraction.
 *
 * Embedded text is taken as is. Bitmap pages are preprocessed and sent to
 * the OCR engine with bounded concurrency; results are put back in page
 * order. A page whose OCR fails is left empty and extraction carries on.
 */

use futures::stream::{self, StreamExt};
use log::{info, warn};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::errors::{ExtractionError, OcrError};

use super::ocr::{self, OcrEngine};
use super::preprocess::{self, PreprocessOptions};
use super::{DocumentSource, PageContent};

/// How a page's text was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionMethod {
    Embedded,
    Ocr,
    /// No text: blank page, OCR unavailable or OCR failed
    Empty,
}

impl fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Embedded => "embedded",
            Self::Ocr => "ocr",
            Self::Empty => "empty",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedPage {
    /// Zero-based page index
    pub index: usize,
    pub text: String,
    pub method: ExtractionMethod,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExtractedDocument {
    pub pages: Vec<ExtractedPage>,
}

impl ExtractedDocument {
    /// Text of all non-empty pages separated by blank lines
    pub fn text(&self) -> String {
        self.pages
            .iter()
            .map(|page| page.text.trim())
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn count(&self, method: ExtractionMethod) -> usize {
        self.pages.iter().filter(|page| page.method == method).count()
    }
}

/// Extraction driver
pub struct Extractor {
    ocr: Option<Arc<dyn OcrEngine>>,
    preprocess: PreprocessOptions,
    min_confidence: f32,
    concurrent_requests: usize,
}

impl Default for Extractor {
    fn default() -> Self {
        Self {
            ocr: None,
            preprocess: PreprocessOptions::default(),
            min_confidence: 0.6,
            concurrent_requests: 4,
        }
    }
}

impl Extractor {
    /// An extractor without OCR; bitmap pages come out empty
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ocr(mut self, engine: Arc<dyn OcrEngine>) -> Self {
        self.ocr = Some(engine);
        self
    }

    pub fn with_preprocess(mut self, options: PreprocessOptions) -> Self {
        self.preprocess = options;
        self
    }

    pub fn with_min_confidence(mut self, min_confidence: f32) -> Self {
        self.min_confidence = min_confidence;
        self
    }

    pub fn with_concurrent_requests(mut self, concurrent_requests: usize) -> Self {
        self.concurrent_requests = concurrent_requests.max(1);
        self
    }

    /// Extract every page of `source`.
    ///
    /// `progress` is called with `(pages_done, page_count)` after each page.
    pub async fn extract(
        &self,
        source: &dyn DocumentSource,
        progress: impl Fn(usize, usize) + Send + Sync,
    ) -> Result<ExtractedDocument, ExtractionError> {
        let total = source.page_count();
        let done = AtomicUsize::new(0);
        let report = || progress(done.fetch_add(1, Ordering::SeqCst) + 1, total);

        let mut pages = Vec::with_capacity(total);
        let mut bitmaps = Vec::new();

        for index in 0..total {
            match source.page(index)? {
                PageContent::Text(text) => {
                    pages.push(ExtractedPage {
                        index,
                        text,
                        method: ExtractionMethod::Embedded,
                    });
                    report();
                }
                PageContent::Bitmap(bytes) => bitmaps.push((index, bytes)),
                PageContent::Empty => {
                    pages.push(empty_page(index));
                    report();
                }
            }
        }

        if !bitmaps.is_empty() {
            match &self.ocr {
                Some(engine) => {
                    info!("Running OCR on {} pages", bitmaps.len());
                    let recognized = stream::iter(bitmaps)
                        .map(|(index, bytes)| {
                            let engine = engine.clone();
                            let report = &report;
                            async move {
                                let page = match self.ocr_page(engine.as_ref(), &bytes).await {
                                    Ok(text) if !text.is_empty() => ExtractedPage {
                                        index,
                                        text,
                                        method: ExtractionMethod::Ocr,
                                    },
                                    Ok(_) => empty_page(index),
                                    Err(e) => {
                                        warn!("OCR failed on page {}: {}", index + 1, e);
                                        empty_page(index)
                                    }
                                };
                                report();
                                page
                            }
                        })
                        .buffer_unordered(self.concurrent_requests)
                        .collect::<Vec<_>>()
                        .await;
                    pages.extend(recognized);
                }
                None => {
                    warn!("{} pages need OCR but OCR is disabled", bitmaps.len());
                    for (index, _) in bitmaps {
                        pages.push(empty_page(index));
                        report();
                    }
                }
            }
        }

        pages.sort_by_key(|page| page.index);
        Ok(ExtractedDocument { pages })
    }

    async fn ocr_page(&self, engine: &dyn OcrEngine, bytes: &[u8]) -> Result<String, OcrError> {
        let cleaned = preprocess::preprocess(bytes, self.preprocess)?;
        let words = engine.recognize(&cleaned).await?;
        Ok(ocr::filter_words(&words, self.min_confidence))
    }
}

fn empty_page(index: usize) -> ExtractedPage {
    ExtractedPage {
        index,
        text: String::new(),
        method: ExtractionMethod::Empty,
    }
}
