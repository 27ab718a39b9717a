/*!
 * Mock speech and OCR engines for testing
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use readaloud::document::{OcrEngine, OcrWord};
use readaloud::errors::{OcrError, ProviderError, SpeechError};
use readaloud::speech::{EngineCapabilities, SpeechEngine, Utterance};

/// Calls observed by a [`RecordingEngine`]
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    Speak(Utterance),
    Pause,
    Resume,
    Cancel,
}

/// Speech engine that records every call and never reports outcomes itself.
///
/// Tests play the engine's part by sending `EngineEvent`s for the recorded
/// utterances.
#[derive(Debug, Clone)]
pub struct RecordingEngine {
    calls: Arc<Mutex<Vec<EngineCall>>>,
    capabilities: EngineCapabilities,
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self::with_capabilities(EngineCapabilities {
            synthesis: true,
            pause: false,
        })
    }

    pub fn with_pause() -> Self {
        Self::with_capabilities(EngineCapabilities {
            synthesis: true,
            pause: true,
        })
    }

    pub fn with_capabilities(capabilities: EngineCapabilities) -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            capabilities,
        }
    }

    /// Shared view of the calls, usable after the engine moved into a player
    pub fn calls(&self) -> Arc<Mutex<Vec<EngineCall>>> {
        self.calls.clone()
    }
}

/// The utterances in a call log, in dispatch order
pub fn spoken(calls: &Mutex<Vec<EngineCall>>) -> Vec<Utterance> {
    calls
        .lock()
        .iter()
        .filter_map(|call| match call {
            EngineCall::Speak(utterance) => Some(utterance.clone()),
            _ => None,
        })
        .collect()
}

/// The most recent utterance in a call log
pub fn last_spoken(calls: &Mutex<Vec<EngineCall>>) -> Option<Utterance> {
    spoken(calls).pop()
}

impl SpeechEngine for RecordingEngine {
    fn capabilities(&self) -> EngineCapabilities {
        self.capabilities
    }

    fn speak(&mut self, utterance: Utterance) -> Result<(), SpeechError> {
        self.calls.lock().push(EngineCall::Speak(utterance));
        Ok(())
    }

    fn pause(&mut self) -> Result<(), SpeechError> {
        self.calls.lock().push(EngineCall::Pause);
        Ok(())
    }

    fn resume(&mut self) -> Result<(), SpeechError> {
        self.calls.lock().push(EngineCall::Resume);
        Ok(())
    }

    fn cancel(&mut self) {
        self.calls.lock().push(EngineCall::Cancel);
    }
}

/// OCR engine answering by image width, so concurrent pages stay distinguishable.
///
/// Widths mapped to `None` fail; unknown widths recognize nothing.
#[derive(Debug, Default)]
pub struct MockOcr {
    by_width: HashMap<u32, Option<Vec<OcrWord>>>,
    calls: Mutex<usize>,
}

impl MockOcr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_words(mut self, width: u32, words: &[(&str, f32)]) -> Self {
        let words = words.iter().map(|(text, confidence)| OcrWord::new(*text, *confidence)).collect();
        self.by_width.insert(width, Some(words));
        self
    }

    pub fn failing_for(mut self, width: u32) -> Self {
        self.by_width.insert(width, None);
        self
    }

    pub fn call_count(&self) -> usize {
        *self.calls.lock()
    }
}

#[async_trait]
impl OcrEngine for MockOcr {
    async fn recognize(&self, bytes: &[u8]) -> Result<Vec<OcrWord>, OcrError> {
        *self.calls.lock() += 1;
        let width = image::load_from_memory(bytes)?.width();

        match self.by_width.get(&width) {
            Some(Some(words)) => Ok(words.clone()),
            Some(None) => Err(OcrError::Provider(ProviderError::ApiError {
                status_code: 500,
                message: "Mock OCR failure".to_string(),
            })),
            None => Ok(Vec::new()),
        }
    }
}
