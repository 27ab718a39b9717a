// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, info};
use std::io::Write;
use std::path::PathBuf;

use readaloud::app_config::{self, Config, CorrectionProvider};
use readaloud::app_controller::Controller;
use readaloud::speech::SpeechProgram;

/// CLI Wrapper for CorrectionProvider to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliCorrectionProvider {
    #[value(name = "openai")]
    OpenAI,
    Gemini,
}

impl From<CliCorrectionProvider> for CorrectionProvider {
    fn from(cli_provider: CliCorrectionProvider) -> Self {
        match cli_provider {
            CliCorrectionProvider::OpenAI => CorrectionProvider::OpenAI,
            CliCorrectionProvider::Gemini => CorrectionProvider::Gemini,
        }
    }
}

/// CLI Wrapper for SpeechProgram to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliSpeechProgram {
    #[value(name = "espeak-ng", alias = "espeak")]
    EspeakNg,
    Say,
}

impl From<CliSpeechProgram> for SpeechProgram {
    fn from(cli_program: CliSpeechProgram) -> Self {
        match cli_program {
            CliSpeechProgram::EspeakNg => SpeechProgram::EspeakNg,
            CliSpeechProgram::Say => SpeechProgram::Say,
        }
    }
}

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Extract a document's text and read it aloud
    Read {
        /// PDF, image or text file
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },

    /// Extract text from a document, or from every document in a directory
    Extract {
        /// PDF, image or text file, or a directory of documents
        #[arg(value_name = "PATH")]
        path: PathBuf,

        /// Output file (single document) or directory
        #[arg(short, long, value_name = "OUTPUT")]
        output: Option<PathBuf>,

        /// Force overwrite of existing output files
        #[arg(short, long)]
        force_overwrite: bool,
    },

    /// List the voices of the speech program
    Voices,

    /// Generate shell completions for readaloud
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Options overriding the configuration file
#[derive(Args, Debug, Clone, Default)]
struct Overrides {
    /// Correction provider to use
    #[arg(short, long, value_enum, global = true)]
    provider: Option<CliCorrectionProvider>,

    /// Model name to use for correction
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// API key of the correction provider
    #[arg(long, env = "READALOUD_API_KEY", hide_env_values = true, global = true)]
    api_key: Option<String>,

    /// API key of the OCR service
    #[arg(long, env = "READALOUD_OCR_API_KEY", hide_env_values = true, global = true)]
    ocr_api_key: Option<String>,

    /// Speech program
    #[arg(long, value_enum, global = true)]
    program: Option<CliSpeechProgram>,

    /// Voice id or name
    #[arg(long, global = true)]
    voice: Option<String>,

    /// Speech rate multiplier, 1.0 is normal speed
    #[arg(short, long, global = true)]
    rate: Option<f32>,

    /// Correct extracted text with the configured LLM provider
    #[arg(long, global = true)]
    correct: bool,

    /// OCR scanned pages and images
    #[arg(long, global = true)]
    ocr: bool,
}

/// readaloud - read documents aloud
///
/// Extracts text from PDFs and images, optionally cleans it up with an LLM,
/// and reads it with the system speech synthesizer.
#[derive(Parser, Debug)]
#[command(name = "readaloud")]
#[command(version)]
#[command(about = "Read documents aloud with system speech")]
#[command(long_about = "readaloud extracts text from PDFs and images and reads it aloud.

EXAMPLES:
    readaloud read paper.pdf                     # Read a PDF with the default voice
    readaloud read --rate 1.5 notes.txt          # Read faster
    readaloud read --ocr scan.png                # OCR an image, then read it
    readaloud read --correct -p gemini scan.pdf  # Clean up the text before reading
    readaloud extract scans/ -o text/            # Extract every document in a directory
    readaloud voices                             # List installed voices
    readaloud completions bash > readaloud.bash  # Generate bash completions

WHILE READING:
    <enter> pause/resume, r restart, + faster, - slower, speed <x>,
    voice <name>, v list voices, q quit

CONFIGURATION:
    Configuration is read from conf.json in the working directory, else from
    the user config directory. A default one is created if it is missing.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config_path: Option<PathBuf>,

    /// Set logging level
    #[arg(short, long, value_enum, global = true)]
    log_level: Option<CliLogLevel>,

    #[command(flatten)]
    overrides: Overrides,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(CustomLogger::new(level)))?;
        log::set_max_level(level);
        Ok(())
    }

    fn color_and_emoji(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("1;31", "❌"),
            Level::Warn => ("1;33", "🚧"),
            Level::Info => ("1;32", ""),
            Level::Debug => ("1;36", "🔍"),
            Level::Trace => ("1;35", "📋"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (color, emoji) = Self::color_and_emoji(record.level());
            let _ = writeln!(
                std::io::stderr(),
                "\x1B[{}m{} {} {}\x1B[0m",
                color,
                now,
                emoji,
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Trace level lets set_max_level raise verbosity later
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(*shell, &mut cmd, "readaloud", &mut std::io::stdout());
        return Ok(());
    }

    if let Some(level) = &cli.log_level {
        let level: app_config::LogLevel = level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    let config_path = cli.config_path.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load_or_create(&config_path)?;
    apply_overrides(&mut config, cli.overrides);

    match &cli.log_level {
        Some(level) => config.log_level = level.clone().into(),
        None => log::set_max_level(config.log_level.to_level_filter()),
    }

    config.validate().context("Configuration validation failed")?;

    let controller = Controller::with_config(config)?;

    match cli.command {
        Commands::Read { path } => controller.read_aloud(&path).await,
        Commands::Extract {
            path,
            output,
            force_overwrite,
        } => controller.run_extract(&path, output, force_overwrite).await,
        Commands::Voices => {
            let (voices, default) = controller.list_voices().await?;
            if voices.is_empty() {
                info!("No voices installed for {}", controller.config().speech.program);
            }
            for voice in &voices {
                let marker = if default.as_ref() == Some(voice) { "*" } else { " " };
                println!("{} {:<32} {:<10} {}", marker, voice.name, voice.locale, voice.id);
            }
            Ok(())
        }
        Commands::Completions { .. } => Ok(()),
    }
}

fn apply_overrides(config: &mut Config, overrides: Overrides) {
    if let Some(provider) = overrides.provider {
        config.correction.provider = provider.into();
    }
    if let Some(model) = overrides.model {
        config.correction.active_provider_config_mut().model = model;
    }
    if let Some(api_key) = overrides.api_key {
        config.correction.active_provider_config_mut().api_key = api_key;
    }
    if overrides.correct {
        config.correction.enabled = true;
    }

    if let Some(api_key) = overrides.ocr_api_key {
        config.ocr.api_key = api_key;
    }
    if overrides.ocr {
        config.ocr.enabled = true;
    }

    if let Some(program) = overrides.program {
        config.speech.program = program.into();
    }
    if let Some(voice) = overrides.voice {
        config.speech.voice = Some(voice);
    }
    if let Some(rate) = overrides.rate {
        config.speech.rate = rate;
    }
}
