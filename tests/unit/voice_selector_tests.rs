/*!
 * Tests for default voice selection
 */

use readaloud::speech::voice_selector::default_female_voice_names;
use readaloud::speech::{VoiceProfile, VoiceSelector};
use readaloud::speech::VoiceGender;

use crate::common;

#[test]
fn test_select_default_withPreferredLocaleInDifferentNotation_shouldMatch() {
    let voices = vec![
        VoiceProfile::new("a", "fr_FR", "Thomas"),
        VoiceProfile::new("b", "en_us", "Fred"),
    ];

    let selected = VoiceSelector::new("en-US", "en").select_default(&voices);
    assert_eq!(selected.map(|v| v.id.as_str()), Some("b"));
}

#[test]
fn test_select_default_withEngineReportedGender_shouldPreferFemale() {
    let voices = vec![
        VoiceProfile::new("m", "de-DE", "Markus"),
        VoiceProfile::new("f", "de-DE", "Voice 2").with_gender(VoiceGender::Female),
    ];

    let selected = VoiceSelector::new("en-US", "en").select_default(&voices);
    assert_eq!(selected.map(|v| v.id.as_str()), Some("f"));
}

#[test]
fn test_select_default_withBaseLanguageOnly_shouldPickSameLanguage() {
    let voices = vec![
        VoiceProfile::new("de", "de-DE", "Markus"),
        VoiceProfile::new("gb", "en-GB", "Daniel"),
    ];

    let selected = VoiceSelector::new("en-US", "en")
        .with_female_names(Vec::new())
        .select_default(&voices);
    assert_eq!(selected.map(|v| v.id.as_str()), Some("gb"));
}

#[test]
fn test_select_default_withNoMatch_shouldFallBackToFirst() {
    let voices = vec![
        VoiceProfile::new("x", "ja-JP", "Otoya"),
        VoiceProfile::new("y", "ko-KR", "Minsu"),
    ];

    let selected = VoiceSelector::new("en-US", "en")
        .with_female_names(Vec::new())
        .select_default(&voices);
    assert_eq!(selected.map(|v| v.id.as_str()), Some("x"));
}

#[test]
fn test_select_default_withEmptyList_shouldReturnNone() {
    assert!(VoiceSelector::default().select_default(&[]).is_none());
}

#[test]
fn test_select_default_withSampleVoices_shouldPickAmericanEnglish() {
    let voices = common::sample_voices();
    let selected = VoiceSelector::default().select_default(&voices);
    assert_eq!(selected.map(|v| v.id.as_str()), Some("gmw/en-US"));
}

#[test]
fn test_default_female_voice_names_shouldNotBeEmpty() {
    assert!(!default_female_voice_names().is_empty());
}
