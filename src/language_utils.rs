//! Language and locale utilities
//!
//! Voice engines report locales in several spellings (`en-US`, `en_US`,
//! `en-us`, `eng`, sometimes just `en`). These helpers normalize them so
//! the voice selector can compare locales and primary languages reliably.

use anyhow::{Result, anyhow};
use isolang::Language;

/// ISO 639-2/B codes that differ from their 639-2/T counterparts
const BIBLIOGRAPHIC_CODES: &[(&str, &str)] = &[
    ("fre", "fra"),
    ("ger", "deu"),
    ("dut", "nld"),
    ("gre", "ell"),
    ("chi", "zho"),
    ("cze", "ces"),
    ("ice", "isl"),
    ("alb", "sqi"),
    ("arm", "hye"),
    ("baq", "eus"),
    ("bur", "mya"),
    ("per", "fas"),
    ("geo", "kat"),
    ("may", "msa"),
    ("mac", "mkd"),
    ("rum", "ron"),
    ("slo", "slk"),
    ("wel", "cym"),
];

/// Language code type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageCodeType {
    /// ISO 639-1 (2-letter) code
    Part1,
    /// ISO 639-2/T (3-letter) code
    Part2T,
    /// ISO 639-2/B (3-letter) code
    Part2B,
}

fn bibliographic_to_terminology(code: &str) -> Option<&'static str> {
    BIBLIOGRAPHIC_CODES
        .iter()
        .find(|(b, _)| *b == code)
        .map(|(_, t)| *t)
}

/// Validate if a language code is a valid ISO 639-1 or ISO 639-2 code
pub fn validate_language_code(code: &str) -> Result<LanguageCodeType> {
    let normalized_code = code.trim().to_lowercase();

    match normalized_code.len() {
        2 if Language::from_639_1(&normalized_code).is_some() => Ok(LanguageCodeType::Part1),
        3 if Language::from_639_3(&normalized_code).is_some() => Ok(LanguageCodeType::Part2T),
        3 if bibliographic_to_terminology(&normalized_code).is_some() => Ok(LanguageCodeType::Part2B),
        _ => Err(anyhow!("Invalid language code: {}", code)),
    }
}

/// Normalize a language code to ISO 639-2/T (3-letter) format
pub fn normalize_to_part2t(code: &str) -> Result<String> {
    let normalized_code = code.trim().to_lowercase();

    if normalized_code.len() == 2 {
        if let Some(lang) = Language::from_639_1(&normalized_code) {
            return Ok(lang.to_639_3().to_string());
        }
    } else if normalized_code.len() == 3 {
        if Language::from_639_3(&normalized_code).is_some() {
            return Ok(normalized_code);
        }
        if let Some(terminology) = bibliographic_to_terminology(&normalized_code) {
            return Ok(terminology.to_string());
        }
    }

    Err(anyhow!("Cannot normalize invalid language code: {}", code))
}

/// Check if two language codes match (represent the same language)
pub fn language_codes_match(code1: &str, code2: &str) -> bool {
    match (normalize_to_part2t(code1), normalize_to_part2t(code2)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Get the language name from a code
pub fn get_language_name(code: &str) -> Result<String> {
    let normalized = normalize_to_part2t(code)?;
    let lang = Language::from_639_3(&normalized)
        .ok_or_else(|| anyhow!("Failed to get language from code: {}", normalized))?;

    Ok(lang.to_name().to_string())
}

/// Normalize a locale tag to `ll-RR` form.
///
/// Separators `_` and `-` are treated alike, the language subtag is
/// lowercased and the region subtag uppercased. Anything after the region
/// (script, variant, encoding suffixes like `.UTF-8`) is dropped.
pub fn normalize_locale(tag: &str) -> String {
    let tag = tag.trim();
    let tag = tag.split(['.', '@']).next().unwrap_or(tag);
    let mut parts = tag.split(['-', '_']).filter(|p| !p.is_empty());

    let language = match parts.next() {
        Some(language) => language.to_lowercase(),
        None => return String::new(),
    };

    // Skip a 4-letter script subtag (e.g. zh-Hant-TW)
    let region = parts.find(|p| p.len() != 4 || p.chars().any(|c| !c.is_ascii_alphabetic()));

    match region {
        Some(region) => format!("{}-{}", language, region.to_uppercase()),
        None => language,
    }
}

/// The primary language subtag of a locale (`en` for `en_GB`)
pub fn primary_language(tag: &str) -> String {
    normalize_locale(tag)
        .split('-')
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Whether two locale tags name the same locale
pub fn locales_match(a: &str, b: &str) -> bool {
    let a = normalize_locale(a);
    !a.is_empty() && a == normalize_locale(b)
}

/// Whether a locale tag belongs to the given base language.
///
/// ISO 639 equivalents are honoured (`eng-GB` belongs to `en`); tags that
/// are not valid ISO codes fall back to a plain case-insensitive comparison.
pub fn locale_has_language(tag: &str, base_language: &str) -> bool {
    let primary = primary_language(tag);
    let base = base_language.trim().to_lowercase();
    if primary.is_empty() || base.is_empty() {
        return false;
    }

    language_codes_match(&primary, &base) || primary == base
}
