/*!
 * Tests for language and locale utility functions
 */

use readaloud::language_utils::{
    LanguageCodeType, get_language_name, language_codes_match, locale_has_language, locales_match,
    normalize_locale, normalize_to_part2t, primary_language, validate_language_code,
};

/// Test validation of language codes
#[test]
fn test_validate_language_code_withValidCodes_shouldReturnCorrectType() {
    assert!(matches!(validate_language_code("en").unwrap(), LanguageCodeType::Part1));
    assert!(matches!(validate_language_code("deu").unwrap(), LanguageCodeType::Part2T));
    assert!(matches!(validate_language_code("fre").unwrap(), LanguageCodeType::Part2B));
    assert!(matches!(validate_language_code(" EN ").unwrap(), LanguageCodeType::Part1));

    assert!(validate_language_code("xyz").is_err());
    assert!(validate_language_code("e").is_err());
}

#[test]
fn test_normalize_to_part2t_withValidCodes_shouldNormalizeCorrectly() {
    assert_eq!(normalize_to_part2t("en").unwrap(), "eng");
    assert_eq!(normalize_to_part2t("fre").unwrap(), "fra");
    assert_eq!(normalize_to_part2t(" DE ").unwrap(), "deu");
}

#[test]
fn test_language_codes_match_withEquivalentCodes_shouldReturnTrue() {
    assert!(language_codes_match("en", "eng"));
    assert!(language_codes_match("ger", "de"));
    assert!(!language_codes_match("en", "fr"));
}

#[test]
fn test_get_language_name_shouldReturnEnglishName() {
    assert_eq!(get_language_name("fr").unwrap(), "French");
    assert!(get_language_name("zz").is_err());
}

#[test]
fn test_locales_match_withDifferentSeparatorsAndCase_shouldMatch() {
    assert!(locales_match("en_US", "en-us"));
    assert!(locales_match("pt_BR.UTF-8", "pt-BR"));
    assert!(!locales_match("en-US", "en-GB"));
    assert!(!locales_match("", ""));
}

#[test]
fn test_locale_helpers_withScriptSubtag_shouldSkipScript() {
    assert_eq!(normalize_locale("zh-Hant-TW"), "zh-TW");
    assert_eq!(primary_language("zh_Hant_TW"), "zh");
}

#[test]
fn test_locale_has_language_withIsoEquivalents_shouldMatch() {
    assert!(locale_has_language("en-GB", "en"));
    assert!(locale_has_language("eng-GB", "en"));
    assert!(locale_has_language("en_AU", "eng"));
    assert!(!locale_has_language("fr-FR", "en"));
    assert!(!locale_has_language("", "en"));
}
