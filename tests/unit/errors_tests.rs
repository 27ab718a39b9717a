/*!
 * Tests for error types and conversions
 */

use readaloud::errors::{AppError, ExtractionError, PlaybackError, ProviderError};
use readaloud::speech::PlaybackStatus;

#[test]
fn test_providerError_apiError_shouldDisplayStatusAndMessage() {
    let error = ProviderError::ApiError {
        status_code: 429,
        message: "Too many requests".to_string(),
    };
    let display = format!("{}", error);
    assert!(display.contains("429"));
    assert!(display.contains("Too many requests"));
}

#[test]
fn test_playbackError_invalidTransition_shouldNameStateAndAction() {
    let error = PlaybackError::InvalidTransition {
        from: PlaybackStatus::Idle,
        action: "pause",
    };
    assert_eq!(error.to_string(), "Cannot pause while idle");
}

#[test]
fn test_playbackError_engine_shouldDisplayChunk() {
    let error = PlaybackError::Engine {
        chunk: 2,
        message: "audio device busy".to_string(),
    };
    let display = error.to_string();
    assert!(display.contains("chunk 2"));
    assert!(display.contains("audio device busy"));
}

#[test]
fn test_extractionError_pageOutOfRange_shouldDisplayCount() {
    let error = ExtractionError::PageOutOfRange { index: 5, count: 3 };
    assert!(error.to_string().contains("3 pages"));
}

#[test]
fn test_appError_fromPlaybackError_shouldWrap() {
    let error: AppError = PlaybackError::NothingToRead.into();
    assert!(matches!(error, AppError::Playback(PlaybackError::NothingToRead)));
    assert!(error.to_string().contains("Nothing to read"));
}

#[test]
fn test_appError_fromIoError_shouldBecomeFileError() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.pdf");
    let error: AppError = io.into();
    assert!(matches!(error, AppError::File(message) if message.contains("missing.pdf")));
}
