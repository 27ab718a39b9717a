/*!
 * OCR engines.
 *
 * Engines return recognized words with a confidence in `[0, 1]`. Low
 * confidence words on scans are mostly noise (stains, bleed-through, margin
 * scribbles), so they are filtered out before the text is assembled.
 */

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::{OcrError, ProviderError};
use crate::providers::{check_status, request_error};

/// One recognized word
#[derive(Debug, Clone, PartialEq)]
pub struct OcrWord {
    pub text: String,
    pub confidence: f32,
}

impl OcrWord {
    pub fn new(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            confidence,
        }
    }
}

/// OCR engine trait
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Recognize the words in an encoded image
    async fn recognize(&self, image: &[u8]) -> Result<Vec<OcrWord>, OcrError>;
}

/// Join the words at or above `min_confidence` with single spaces
pub fn filter_words(words: &[OcrWord], min_confidence: f32) -> String {
    let kept: Vec<&str> = words
        .iter()
        .filter(|word| word.confidence >= min_confidence)
        .map(|word| word.text.trim())
        .filter(|text| !text.is_empty())
        .collect();

    if kept.len() < words.len() {
        debug!(
            "Dropped {} of {} words below confidence {:.2}",
            words.len() - kept.len(),
            words.len(),
            min_confidence
        );
    }

    kept.join(" ")
}

/// Google Cloud Vision client using document text detection
#[derive(Debug, Clone)]
pub struct VisionOcr {
    client: Client,
    endpoint: String,
    api_key: String,
    timeout_secs: u64,
}

#[derive(Debug, Serialize)]
struct AnnotateRequest {
    requests: Vec<AnnotateImageRequest>,
}

#[derive(Debug, Serialize)]
struct AnnotateImageRequest {
    image: VisionImage,
    features: Vec<VisionFeature>,
}

#[derive(Debug, Serialize)]
struct VisionImage {
    content: String,
}

#[derive(Debug, Serialize)]
struct VisionFeature {
    #[serde(rename = "type")]
    feature_type: String,
}

#[derive(Debug, Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<AnnotateImageResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateImageResponse {
    #[serde(default)]
    full_text_annotation: Option<TextAnnotation>,
    #[serde(default)]
    error: Option<VisionStatus>,
}

#[derive(Debug, Deserialize)]
struct VisionStatus {
    #[serde(default)]
    code: u16,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Default, Deserialize)]
struct TextAnnotation {
    #[serde(default)]
    pages: Vec<VisionPage>,
}

#[derive(Debug, Deserialize)]
struct VisionPage {
    #[serde(default)]
    blocks: Vec<VisionBlock>,
}

#[derive(Debug, Deserialize)]
struct VisionBlock {
    #[serde(default)]
    paragraphs: Vec<VisionParagraph>,
}

#[derive(Debug, Deserialize)]
struct VisionParagraph {
    #[serde(default)]
    words: Vec<VisionWord>,
}

#[derive(Debug, Deserialize)]
struct VisionWord {
    #[serde(default)]
    confidence: f32,
    #[serde(default)]
    symbols: Vec<VisionSymbol>,
}

#[derive(Debug, Deserialize)]
struct VisionSymbol {
    #[serde(default)]
    text: String,
}

impl VisionOcr {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()
                .unwrap_or_default(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            timeout_secs,
        }
    }

    fn build_request(image: &[u8]) -> AnnotateRequest {
        AnnotateRequest {
            requests: vec![AnnotateImageRequest {
                image: VisionImage {
                    content: STANDARD.encode(image),
                },
                features: vec![VisionFeature {
                    feature_type: "DOCUMENT_TEXT_DETECTION".to_string(),
                }],
            }],
        }
    }
}

/// Flatten an annotate response into words
fn parse_words(response: AnnotateResponse) -> Result<Vec<OcrWord>, ProviderError> {
    let Some(image) = response.responses.into_iter().next() else {
        return Ok(Vec::new());
    };

    if let Some(status) = image.error {
        return Err(ProviderError::ApiError {
            status_code: status.code,
            message: status.message,
        });
    }

    let words = image
        .full_text_annotation
        .unwrap_or_default()
        .pages
        .into_iter()
        .flat_map(|page| page.blocks)
        .flat_map(|block| block.paragraphs)
        .flat_map(|paragraph| paragraph.words)
        .map(|word| {
            let text: String = word.symbols.into_iter().map(|symbol| symbol.text).collect();
            OcrWord::new(text, word.confidence)
        })
        .collect();

    Ok(words)
}

#[async_trait]
impl OcrEngine for VisionOcr {
    async fn recognize(&self, image: &[u8]) -> Result<Vec<OcrWord>, OcrError> {
        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", &self.api_key)])
            .json(&Self::build_request(image))
            .send()
            .await
            .map_err(|e| request_error(e, self.timeout_secs))?;

        let response = check_status(response).await?;
        let body = response
            .json::<AnnotateResponse>()
            .await
            .map_err(|e| ProviderError::ParseError(format!("Failed to parse Vision API response: {}", e)))?;

        Ok(parse_words(body)?)
    }
}
