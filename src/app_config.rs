use anyhow::{Context, Result, anyhow};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

use crate::language_utils;
use crate::speech::{SequencerOptions, SpeechProgram, VoiceSelector};
use crate::speech::voice_selector::default_female_voice_names;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    /// Speech playback settings
    #[serde(default)]
    pub speech: SpeechConfig,

    /// LLM text correction settings
    #[serde(default)]
    pub correction: CorrectionConfig,

    /// OCR settings for scanned pages and images
    #[serde(default)]
    pub ocr: OcrConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Speech playback configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SpeechConfig {
    /// System program used for synthesis
    #[serde(default)]
    pub program: SpeechProgram,

    /// Initial rate multiplier
    #[serde(default = "default_rate")]
    pub rate: f32,

    #[serde(default = "default_min_rate")]
    pub min_rate: f32,

    #[serde(default = "default_max_rate")]
    pub max_rate: f32,

    /// Rate change for "faster" and "slower"
    #[serde(default = "default_rate_step")]
    pub rate_step: f32,

    /// Maximum characters per spoken chunk
    #[serde(default = "default_max_chunk_chars")]
    pub max_chunk_chars: usize,

    /// Locale preferred when picking the default voice
    #[serde(default = "default_preferred_locale")]
    pub preferred_locale: String,

    /// Language to fall back to when no voice has the preferred locale
    #[serde(default = "default_base_language")]
    pub base_language: String,

    /// Name fragments of voices considered female
    #[serde(default = "default_female_voice_names")]
    pub female_voice_names: Vec<String>,

    /// Voice id or name to use instead of the default choice
    #[serde(default)]
    pub voice: Option<String>,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            program: SpeechProgram::default(),
            rate: default_rate(),
            min_rate: default_min_rate(),
            max_rate: default_max_rate(),
            rate_step: default_rate_step(),
            max_chunk_chars: default_max_chunk_chars(),
            preferred_locale: default_preferred_locale(),
            base_language: default_base_language(),
            female_voice_names: default_female_voice_names(),
            voice: None,
        }
    }
}

impl SpeechConfig {
    /// Sequencer tuning derived from these settings
    pub fn sequencer_options(&self) -> SequencerOptions {
        SequencerOptions {
            max_chunk_chars: self.max_chunk_chars,
            rate: self.rate,
            min_rate: self.min_rate,
            max_rate: self.max_rate,
            selector: VoiceSelector::new(&self.preferred_locale, &self.base_language)
                .with_female_names(self.female_voice_names.clone()),
        }
    }
}

/// Correction provider type
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CorrectionProvider {
    #[default]
    OpenAI,
    Gemini,
}

impl CorrectionProvider {
    pub fn display_name(&self) -> &str {
        match self {
            Self::OpenAI => "OpenAI",
            Self::Gemini => "Gemini",
        }
    }

    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::OpenAI => "openai".to_string(),
            Self::Gemini => "gemini".to_string(),
        }
    }
}

impl std::fmt::Display for CorrectionProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

impl std::str::FromStr for CorrectionProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "gemini" => Ok(Self::Gemini),
            _ => Err(anyhow!("Invalid provider type: {}", s)),
        }
    }
}

/// Provider configuration wrapper
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProviderConfig {
    /// Provider type identifier
    #[serde(rename = "type")]
    pub provider_type: String,

    #[serde(default = "String::new")]
    pub model: String,

    #[serde(default = "String::new")]
    pub api_key: String,

    /// Service URL, empty for the public API
    #[serde(default = "String::new")]
    pub endpoint: String,

    /// Max concurrent requests
    #[serde(default = "default_concurrent_requests")]
    pub concurrent_requests: usize,

    /// Max characters of text per request
    #[serde(default = "default_max_chars_per_request")]
    pub max_chars_per_request: usize,

    /// Timeout for one request, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ProviderConfig {
    pub fn new(provider: CorrectionProvider) -> Self {
        let (model, endpoint) = match provider {
            CorrectionProvider::OpenAI => (default_openai_model(), default_openai_endpoint()),
            CorrectionProvider::Gemini => (default_gemini_model(), default_gemini_endpoint()),
        };

        Self {
            provider_type: provider.to_lowercase_string(),
            model,
            api_key: String::new(),
            endpoint,
            concurrent_requests: default_concurrent_requests(),
            max_chars_per_request: default_max_chars_per_request(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Text correction configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CorrectionConfig {
    /// Run extracted text through an LLM before reading it
    #[serde(default)]
    pub enabled: bool,

    /// Provider to use
    #[serde(default)]
    pub provider: CorrectionProvider,

    /// Available providers
    #[serde(default)]
    pub available_providers: Vec<ProviderConfig>,

    /// Instructions sent with every piece of text
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Temperature parameter for text generation (0.0 to 1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for CorrectionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: CorrectionProvider::default(),
            available_providers: vec![
                ProviderConfig::new(CorrectionProvider::OpenAI),
                ProviderConfig::new(CorrectionProvider::Gemini),
            ],
            system_prompt: default_system_prompt(),
            temperature: default_temperature(),
        }
    }
}

impl CorrectionConfig {
    /// Get the active provider configuration from the available_providers array
    pub fn get_active_provider_config(&self) -> Option<&ProviderConfig> {
        let provider_str = self.provider.to_lowercase_string();
        self.available_providers
            .iter()
            .find(|p| p.provider_type == provider_str)
    }

    /// Get the active provider configuration, creating it with defaults if missing
    pub fn active_provider_config_mut(&mut self) -> &mut ProviderConfig {
        let provider_str = self.provider.to_lowercase_string();
        let index = match self
            .available_providers
            .iter()
            .position(|p| p.provider_type == provider_str)
        {
            Some(index) => index,
            None => {
                self.available_providers.push(ProviderConfig::new(self.provider));
                self.available_providers.len() - 1
            }
        };
        &mut self.available_providers[index]
    }

    /// Get the model for the active provider
    pub fn get_model(&self) -> String {
        match self.get_active_provider_config() {
            Some(config) if !config.model.is_empty() => config.model.clone(),
            _ => match self.provider {
                CorrectionProvider::OpenAI => default_openai_model(),
                CorrectionProvider::Gemini => default_gemini_model(),
            },
        }
    }

    /// Get the API key for the active provider
    pub fn get_api_key(&self) -> String {
        self.get_active_provider_config()
            .map(|config| config.api_key.clone())
            .unwrap_or_default()
    }

    /// Get the endpoint for the active provider
    pub fn get_endpoint(&self) -> String {
        match self.get_active_provider_config() {
            Some(config) if !config.endpoint.is_empty() => config.endpoint.clone(),
            _ => match self.provider {
                CorrectionProvider::OpenAI => default_openai_endpoint(),
                CorrectionProvider::Gemini => default_gemini_endpoint(),
            },
        }
    }

    pub fn get_concurrent_requests(&self) -> usize {
        self.get_active_provider_config()
            .map(|config| config.concurrent_requests)
            .filter(|n| *n > 0)
            .unwrap_or_else(default_concurrent_requests)
    }

    pub fn get_max_chars_per_request(&self) -> usize {
        self.get_active_provider_config()
            .map(|config| config.max_chars_per_request)
            .filter(|n| *n > 0)
            .unwrap_or_else(default_max_chars_per_request)
    }

    pub fn get_timeout_secs(&self) -> u64 {
        self.get_active_provider_config()
            .map(|config| config.timeout_secs)
            .filter(|n| *n > 0)
            .unwrap_or_else(default_timeout_secs)
    }
}

/// OCR configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OcrConfig {
    /// OCR pages and images without usable embedded text
    #[serde(default)]
    pub enabled: bool,

    /// Cloud Vision annotate endpoint
    #[serde(default = "default_vision_endpoint")]
    pub endpoint: String,

    #[serde(default = "String::new")]
    pub api_key: String,

    /// Words recognized with lower confidence are dropped
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f32,

    /// Contrast adjustment applied before binarization
    #[serde(default = "default_contrast")]
    pub contrast: f32,

    /// Luma threshold for binarization
    #[serde(default = "default_threshold")]
    pub threshold: u8,

    /// Pages with fewer embedded characters are treated as scanned
    #[serde(default = "default_min_text_chars")]
    pub min_text_chars: usize,

    #[serde(default = "default_concurrent_requests")]
    pub concurrent_requests: usize,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_vision_endpoint(),
            api_key: String::new(),
            min_confidence: default_min_confidence(),
            contrast: default_contrast(),
            threshold: default_threshold(),
            min_text_chars: default_min_text_chars(),
            concurrent_requests: default_concurrent_requests(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_rate() -> f32 {
    1.0
}

fn default_min_rate() -> f32 {
    0.5
}

fn default_max_rate() -> f32 {
    2.0
}

fn default_rate_step() -> f32 {
    0.25
}

fn default_max_chunk_chars() -> usize {
    crate::speech::chunker::DEFAULT_MAX_CHUNK_CHARS
}

fn default_preferred_locale() -> String {
    "en-US".to_string()
}

fn default_base_language() -> String {
    "en".to_string()
}

fn default_concurrent_requests() -> usize {
    4
}

fn default_max_chars_per_request() -> usize {
    2000
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_temperature() -> f32 {
    0.1
}

fn default_openai_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_gemini_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_gemini_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_system_prompt() -> String {
    "You correct text extracted from documents by OCR or PDF parsing. Fix misrecognized characters, broken words and hyphenation, and remove page headers, footers and page numbers. Do not summarize, translate or add anything. Reply with the corrected text only.".to_string()
}

fn default_vision_endpoint() -> String {
    "https://vision.googleapis.com/v1/images:annotate".to_string()
}

fn default_min_confidence() -> f32 {
    0.6
}

fn default_contrast() -> f32 {
    30.0
}

fn default_threshold() -> u8 {
    128
}

fn default_min_text_chars() -> usize {
    20
}

impl Config {
    /// Default config location: `conf.json` in the working directory if it
    /// exists, else `<config dir>/readaloud/conf.json`
    pub fn default_path() -> PathBuf {
        let local = PathBuf::from("conf.json");
        if local.exists() {
            return local;
        }

        dirs::config_dir()
            .map(|dir| dir.join("readaloud").join("conf.json"))
            .unwrap_or(local)
    }

    /// Load the config at `path`, writing a default one first if it is missing
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if !path.exists() {
            let config = Config::default();
            config.save(path)?;
            info!("Created default config at {}", path.display());
            return Ok(config);
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).with_context(|| format!("Failed to write config file: {}", path.display()))
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        let speech = &self.speech;

        language_utils::validate_language_code(&speech.base_language)
            .with_context(|| format!("Invalid base language: {}", speech.base_language))?;
        let preferred = language_utils::primary_language(&speech.preferred_locale);
        language_utils::validate_language_code(&preferred)
            .with_context(|| format!("Invalid preferred locale: {}", speech.preferred_locale))?;

        if !(speech.min_rate > 0.0 && speech.min_rate <= speech.max_rate) {
            return Err(anyhow!(
                "Invalid rate bounds: min {} must be positive and not above max {}",
                speech.min_rate,
                speech.max_rate
            ));
        }
        if speech.rate < speech.min_rate || speech.rate > speech.max_rate {
            warn!(
                "Rate {} outside [{}, {}], it will be clamped",
                speech.rate, speech.min_rate, speech.max_rate
            );
        }
        if speech.rate_step <= 0.0 {
            return Err(anyhow!("Rate step must be positive"));
        }
        if speech.max_chunk_chars == 0 {
            return Err(anyhow!("max_chunk_chars must be at least 1"));
        }

        if self.correction.enabled {
            Url::parse(&self.correction.get_endpoint())
                .with_context(|| format!("Invalid {} endpoint", self.correction.provider.display_name()))?;
            if self.correction.get_api_key().is_empty() {
                return Err(anyhow!(
                    "Correction API key is required for {} provider",
                    self.correction.provider.display_name()
                ));
            }
        }

        if self.ocr.enabled {
            Url::parse(&self.ocr.endpoint).context("Invalid OCR endpoint")?;
            if self.ocr.api_key.is_empty() {
                return Err(anyhow!("OCR API key is required when OCR is enabled"));
            }
            if !(0.0..=1.0).contains(&self.ocr.min_confidence) {
                return Err(anyhow!("OCR min_confidence must be between 0 and 1"));
            }
        }

        Ok(())
    }
}
