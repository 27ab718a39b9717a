/*!
 * # readaloud - read documents aloud
 *
 * A Rust library that turns PDFs, scanned pages and images into speech.
 *
 * ## Features
 *
 * - Extract embedded text from PDF pages
 * - OCR scanned pages and images with confidence filtering
 * - Optional LLM cleanup of extracted text:
 *   - OpenAI API
 *   - Gemini API
 * - Sentence-aware chunking for speech synthesis
 * - Playback with pause, resume, restart, rate and voice changes
 * - Default voice selection by locale and preference
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `document`: Document sources, OCR and page-by-page extraction
 * - `correction`: LLM text correction with per-piece fallback
 * - `speech`: Playback core:
 *   - `speech::chunker`: Sentence-aware text splitting
 *   - `speech::sequencer`: Playback state machine
 *   - `speech::voice_selector`: Default voice choice
 *   - `speech::player`: Async driver for the sequencer
 *   - `speech::system`: espeak-ng / say speech engine
 *   - `speech::commands`: Transport command parsing
 * - `file_utils`: File system operations
 * - `app_controller`: Main application controller
 * - `language_utils`: ISO language and locale utilities
 * - `providers`: Client implementations for LLM providers
 * - `errors`: Custom error types for the application
 */

// Global lints configuration
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod correction;
pub mod document;
pub mod errors;
pub mod file_utils;
pub mod language_utils;
pub mod providers;
pub mod speech;

// Re-export main types for easier usage
pub use app_config::Config;
pub use correction::{CorrectionOutcome, CorrectionService, TextCorrector};
pub use document::{ExtractedDocument, Extractor};
pub use errors::{AppError, ExtractionError, OcrError, PlaybackError, ProviderError, SpeechError};
pub use language_utils::{get_language_name, language_codes_match, normalize_to_part2t};
pub use speech::{Chunker, PlaybackStatus, Player, Sequencer, VoiceProfile, VoiceSelector};
