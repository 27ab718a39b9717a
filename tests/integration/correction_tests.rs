/*!
 * Integration tests for LLM correction of extracted text
 */

use anyhow::Result;
use std::time::Duration;

use readaloud::app_config::{CorrectionConfig, CorrectionProvider};
use readaloud::correction::{self, CorrectionService, TextCorrector};
use readaloud::document::{Extractor, TextDocument};
use readaloud::providers::mock::{MockProvider, MockRequest};
use readaloud::speech::Chunker;

fn fix_ocr_noise(request: &MockRequest) -> String {
    request.text.replace("rn", "m").replace('0', "o")
}

/// Extracted text flows through correction and then chunks for speech
#[tokio::test]
async fn test_extract_then_correct_shouldFeedCleanTextToChunker() -> Result<()> {
    let source = TextDocument::new("The c0ld rnorning. Birds sang l0udly. The end.");
    let raw = Extractor::new().extract(&source, |_, _| {}).await?.text();

    let corrector: Box<dyn TextCorrector> = Box::new(
        CorrectionService::new(MockProvider::working().with_custom_response(fix_ocr_noise), "fix")
            .with_max_chars_per_request(20),
    );
    let outcome = corrector.correct(&raw).await;

    assert!(outcome.fully_corrected());
    assert_eq!(outcome.text, "The cold morning. Birds sang loudly. The end.");

    let chunks = Chunker::new(200).chunk(&outcome.text);
    assert_eq!(chunks, vec!["The cold morning. Birds sang loudly. The end."]);
    Ok(())
}

/// Pieces finishing out of order are still joined in document order
#[tokio::test]
async fn test_correct_withConcurrentSlowProvider_shouldPreserveOrder() {
    let text = "Alpha one. Bravo two. Charlie three. Delta four. Echo five.";
    let service = CorrectionService::new(MockProvider::slow(5), "fix")
        .with_max_chars_per_request(12)
        .with_concurrent_requests(5)
        .with_timeout(Duration::from_secs(5));

    let outcome = service.correct(text).await;

    assert_eq!(outcome.pieces, 5);
    assert_eq!(
        outcome.text,
        "[CORRECTED] Alpha one. [CORRECTED] Bravo two. [CORRECTED] Charlie three. [CORRECTED] Delta four. [CORRECTED] Echo five."
    );
}

/// The boxed corrector runs on a spawned task like any other service
#[tokio::test]
async fn test_correct_onSpawnedTask_shouldReturnPiecesInOrder() {
    let corrector: Box<dyn TextCorrector> = Box::new(
        CorrectionService::new(MockProvider::working(), "fix")
            .with_max_chars_per_request(10)
            .with_concurrent_requests(3),
    );

    let outcome = tokio::spawn(async move { corrector.correct("One. Two. Three. Four.").await })
        .await
        .unwrap();

    assert_eq!(outcome.pieces, 3);
    assert!(outcome.fully_corrected());
    assert_eq!(outcome.text, "[CORRECTED] One. Two. [CORRECTED] Three. [CORRECTED] Four.");
}

/// A dead provider never loses text
#[tokio::test]
async fn test_correct_withFailingProvider_shouldReturnRawText() {
    let provider = MockProvider::failing();
    let service = CorrectionService::new(provider.clone(), "fix").with_max_chars_per_request(15);
    let text = "First part. Second part. Third part.";

    let outcome = service.correct(text).await;

    assert_eq!(outcome.text, text);
    assert_eq!(outcome.fallbacks, outcome.pieces);
    assert_eq!(provider.request_count(), outcome.pieces);
    assert!(service.test_connection().await.is_err());
}

#[test]
fn test_build_corrector_withEitherProvider_shouldBuild() {
    let mut config = CorrectionConfig::default();
    let _openai = correction::build_corrector(&config);

    config.provider = CorrectionProvider::Gemini;
    let _gemini = correction::build_corrector(&config);
}
