/*!
 * Error types for the readaloud application.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions.
 */

use thiserror::Error;

use crate::speech::PlaybackStatus;

/// Errors that can occur when working with provider APIs
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The request did not complete in time
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),
}

/// Failure reported by a speech synthesis engine
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{0}")]
pub struct SpeechError(pub String);

/// Errors surfaced by the playback sequencer.
///
/// Every variant is user-displayable. None of them leave the sequencer
/// unusable: after a failure it is back in `Idle` (or still `Unsupported`).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlaybackError {
    /// The runtime has no speech synthesis capability
    #[error("Speech synthesis is not supported by this engine")]
    UnsupportedEngine,

    /// The engine failed while speaking a chunk; the session was aborted
    #[error("Speech engine failed on chunk {chunk}: {message}")]
    Engine { chunk: usize, message: String },

    /// No voice could be selected, playback stays disabled
    #[error("No voice is available for playback")]
    NoVoiceAvailable,

    /// The requested voice is not in the engine's voice list
    #[error("Unknown voice: {0}")]
    UnknownVoice(String),

    /// The loaded document has nothing to speak
    #[error("Nothing to read: the document has no text")]
    NothingToRead,

    /// Rate must be a positive, finite multiplier
    #[error("Invalid speech rate: {0}")]
    InvalidRate(f32),

    /// The command does not apply in the current state
    #[error("Cannot {action} while {from}")]
    InvalidTransition {
        from: PlaybackStatus,
        action: &'static str,
    },
}

/// Errors from the OCR collaborator
#[derive(Error, Debug)]
pub enum OcrError {
    /// The bitmap could not be decoded or re-encoded
    #[error("Image processing failed: {0}")]
    Image(#[from] image::ImageError),

    /// The OCR backend rejected or failed the request
    #[error("OCR provider error: {0}")]
    Provider(#[from] ProviderError),
}

/// Errors that can occur while pulling text out of a document
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// The file could not be read
    #[error("Failed to read document: {0}")]
    Io(#[from] std::io::Error),

    /// The PDF structure could not be parsed
    #[error("Failed to parse PDF: {0}")]
    Pdf(#[from] lopdf::Error),

    /// Page index outside the document
    #[error("Page {index} out of range (document has {count} pages)")]
    PageOutOfRange { index: usize, count: usize },

    /// The file type is not something we can extract text from
    #[error("Unsupported document type: {0}")]
    UnsupportedType(String),
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from playback
    #[error("Playback error: {0}")]
    Playback(#[from] PlaybackError),

    /// Error from document extraction
    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// Error from OCR
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
