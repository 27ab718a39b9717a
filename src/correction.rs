/*!
 * LLM correction of extracted text.
 *
 * OCR and PDF extraction leave behind misread characters, split words and
 * page furniture. The correction service sends the text to a provider in
 * sentence-aligned pieces and stitches the answers back together in order.
 * A piece that fails or comes back empty keeps its raw text.
 */

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use log::{debug, info, warn};
use std::time::Duration;

use crate::app_config::{CorrectionConfig, CorrectionProvider};
use crate::errors::ProviderError;
use crate::providers::Provider;
use crate::providers::gemini::Gemini;
use crate::providers::openai::OpenAI;
use crate::speech::chunker;

/// Result of correcting a document
#[derive(Debug, Clone, PartialEq)]
pub struct CorrectionOutcome {
    /// Corrected text, raw text for pieces that fell back
    pub text: String,
    /// Number of pieces sent to the provider
    pub pieces: usize,
    /// Pieces that kept their raw text
    pub fallbacks: usize,
}

impl CorrectionOutcome {
    pub fn fully_corrected(&self) -> bool {
        self.fallbacks == 0
    }
}

/// Something that can clean up extracted text
#[async_trait]
pub trait TextCorrector: Send + Sync {
    async fn correct(&self, text: &str) -> CorrectionOutcome;

    /// Check that the backend is reachable
    async fn test_connection(&self) -> Result<(), ProviderError>;
}

/// Piecewise correction over a provider
#[derive(Debug)]
pub struct CorrectionService<P: Provider> {
    provider: P,
    instructions: String,
    max_chars_per_request: usize,
    concurrent_requests: usize,
    timeout: Duration,
}

impl<P: Provider> CorrectionService<P> {
    pub fn new(provider: P, instructions: impl Into<String>) -> Self {
        Self {
            provider,
            instructions: instructions.into(),
            max_chars_per_request: 2000,
            concurrent_requests: 4,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_max_chars_per_request(mut self, max_chars: usize) -> Self {
        self.max_chars_per_request = max_chars.max(1);
        self
    }

    pub fn with_concurrent_requests(mut self, concurrent_requests: usize) -> Self {
        self.concurrent_requests = concurrent_requests.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Correct one piece, `None` when the raw text must be kept
    async fn correct_piece(&self, index: usize, piece: &str) -> Option<String> {
        let request = self.provider.build_request(&self.instructions, piece);

        match tokio::time::timeout(self.timeout, self.provider.complete(request)).await {
            Ok(Ok(response)) => {
                let corrected = P::extract_text(&response).trim().to_string();
                if corrected.is_empty() {
                    warn!("Piece {} came back empty, keeping the original text", index + 1);
                    None
                } else {
                    Some(corrected)
                }
            }
            Ok(Err(e)) => {
                warn!("Correction of piece {} failed: {}", index + 1, e);
                None
            }
            Err(_) => {
                warn!(
                    "Correction of piece {} timed out after {:?}, keeping the original text",
                    index + 1,
                    self.timeout
                );
                None
            }
        }
    }
}

#[async_trait]
impl<P: Provider> TextCorrector for CorrectionService<P> {
    async fn correct(&self, text: &str) -> CorrectionOutcome {
        let pieces = chunker::chunk_text(text, self.max_chars_per_request);
        if pieces.is_empty() {
            return CorrectionOutcome {
                text: String::new(),
                pieces: 0,
                fallbacks: 0,
            };
        }

        debug!(
            "Correcting {} pieces with up to {} concurrent requests",
            pieces.len(),
            self.concurrent_requests
        );

        let mut results = stream::iter(pieces.iter().cloned().enumerate())
            .map(|(index, piece)| async move {
                let corrected = self.correct_piece(index, &piece).await;
                (index, corrected)
            })
            .buffer_unordered(self.concurrent_requests)
            .collect::<Vec<_>>()
            .await;

        // Restore document order
        results.sort_by_key(|(index, _)| *index);

        let mut fallbacks = 0;
        let corrected: Vec<String> = results
            .into_iter()
            .map(|(index, corrected)| {
                corrected.unwrap_or_else(|| {
                    fallbacks += 1;
                    pieces[index].clone()
                })
            })
            .collect();

        info!(
            "Corrected {} of {} pieces",
            pieces.len() - fallbacks,
            pieces.len()
        );

        CorrectionOutcome {
            text: corrected.join(" "),
            pieces: pieces.len(),
            fallbacks,
        }
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        self.provider.test_connection().await
    }
}

/// Build the corrector configured in `config`
pub fn build_corrector(config: &CorrectionConfig) -> Box<dyn TextCorrector> {
    let timeout_secs = config.get_timeout_secs();

    macro_rules! service {
        ($provider:expr) => {
            Box::new(
                CorrectionService::new($provider, &config.system_prompt)
                    .with_max_chars_per_request(config.get_max_chars_per_request())
                    .with_concurrent_requests(config.get_concurrent_requests())
                    .with_timeout(Duration::from_secs(timeout_secs)),
            ) as Box<dyn TextCorrector>
        };
    }

    match config.provider {
        CorrectionProvider::OpenAI => service!(OpenAI::new(
            config.get_api_key(),
            config.get_endpoint(),
            config.get_model(),
            config.temperature,
            timeout_secs,
        )),
        CorrectionProvider::Gemini => service!(Gemini::new(
            config.get_api_key(),
            config.get_endpoint(),
            config.get_model(),
            config.temperature,
            timeout_secs,
        )),
    }
}
