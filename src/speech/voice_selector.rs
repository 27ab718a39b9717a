/*!
 * Default voice selection.
 *
 * Engines list voices in whatever order they like and the list may grow
 * after startup, so the selector is a pure function of the list it is
 * given and is simply re-run when the engine reports new voices.
 */

use serde::{Deserialize, Serialize};

use crate::language_utils;

use super::{VoiceGender, VoiceProfile};

/// Display-name fragments of voices that are usually female.
///
/// Matched case-insensitively as substrings of the voice name.
pub fn default_female_voice_names() -> Vec<String> {
    [
        "samantha",
        "victoria",
        "karen",
        "moira",
        "tessa",
        "fiona",
        "serena",
        "zira",
        "susan",
        "hazel",
        "aria",
        "jenny",
        "female",
    ]
    .iter()
    .map(|name| name.to_string())
    .collect()
}

/// Voice selection policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceSelector {
    /// Exact locale to prefer (e.g. `en-US`)
    pub preferred_locale: String,
    /// Language to fall back to when the exact locale is missing (e.g. `en`)
    pub base_language: String,
    /// Curated name fragments treated as female voices
    pub female_names: Vec<String>,
}

impl Default for VoiceSelector {
    fn default() -> Self {
        Self {
            preferred_locale: "en-US".to_string(),
            base_language: "en".to_string(),
            female_names: default_female_voice_names(),
        }
    }
}

impl VoiceSelector {
    pub fn new(preferred_locale: impl Into<String>, base_language: impl Into<String>) -> Self {
        Self {
            preferred_locale: preferred_locale.into(),
            base_language: base_language.into(),
            ..Default::default()
        }
    }

    pub fn with_female_names(mut self, names: Vec<String>) -> Self {
        self.female_names = names;
        self
    }

    /// Pick the default voice. First match wins:
    /// 1. locale equals the preferred locale
    /// 2. name matches the female-name list, or the engine says female
    /// 3. locale belongs to the base language
    /// 4. the first voice
    pub fn select_default<'a>(&self, voices: &'a [VoiceProfile]) -> Option<&'a VoiceProfile> {
        voices
            .iter()
            .find(|v| language_utils::locales_match(&v.locale, &self.preferred_locale))
            .or_else(|| voices.iter().find(|v| self.looks_female(v)))
            .or_else(|| {
                voices
                    .iter()
                    .find(|v| language_utils::locale_has_language(&v.locale, &self.base_language))
            })
            .or_else(|| voices.first())
    }

    fn looks_female(&self, voice: &VoiceProfile) -> bool {
        if voice.gender == Some(VoiceGender::Female) {
            return true;
        }

        let name = voice.name.to_lowercase();
        self.female_names
            .iter()
            .filter(|fragment| !fragment.is_empty())
            .any(|fragment| name.contains(&fragment.to_lowercase()))
    }
}
