/*!
 * Tests for application configuration
 */

use anyhow::Result;

use readaloud::app_config::{Config, LogLevel};
use readaloud::speech::SpeechProgram;

use crate::common;

/// Test that the default config is valid as is
#[test]
fn test_default_config_shouldValidate() {
    let config = Config::default();

    assert!(config.validate().is_ok());
    assert!(!config.correction.enabled);
    assert!(!config.ocr.enabled);
    assert_eq!(config.log_level, LogLevel::Info);
}

/// Missing sections and fields fall back to their defaults
#[test]
fn test_load_or_create_withPartialFile_shouldFillDefaults() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(
        temp_dir.path(),
        "conf.json",
        r#"{ "speech": { "program": "say", "rate": 1.5 }, "log_level": "debug" }"#,
    )?;

    let config = Config::load_or_create(&path)?;

    assert_eq!(config.speech.program, SpeechProgram::Say);
    assert_eq!(config.speech.rate, 1.5);
    assert_eq!(config.speech.min_rate, 0.5);
    assert_eq!(config.speech.preferred_locale, "en-US");
    assert_eq!(config.log_level, LogLevel::Debug);
    assert_eq!(config.correction.available_providers.len(), 2);
    Ok(())
}

#[test]
fn test_load_or_create_withInvalidJson_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(temp_dir.path(), "conf.json", "{ not json")?;

    assert!(Config::load_or_create(&path).is_err());
    Ok(())
}

#[test]
fn test_validate_withInvalidRateBounds_shouldFail() {
    let mut config = Config::default();
    config.speech.min_rate = 3.0;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.speech.rate_step = 0.0;
    assert!(config.validate().is_err());
}

#[test]
fn test_sequencer_options_shouldCarrySpeechSettings() {
    let mut config = Config::default();
    config.speech.max_chunk_chars = 120;
    config.speech.preferred_locale = "en-GB".to_string();

    let options = config.speech.sequencer_options();
    assert_eq!(options.max_chunk_chars, 120);
    assert_eq!(options.selector.preferred_locale, "en-GB");
    assert_eq!(options.max_rate, 2.0);
}
