use anyhow::{Context, Result, anyhow};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::future::Future;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::app_config::Config;
use crate::correction::{self, CorrectionOutcome};
use crate::document::preprocess::PreprocessOptions;
use crate::document::{self, ExtractedDocument, ExtractionMethod, Extractor, VisionOcr};
use crate::errors::PlaybackError;
use crate::file_utils::FileManager;
use crate::speech::system::{self, SystemSpeech};
use crate::speech::{
    PlaybackNotice, PlaybackSnapshot, PlaybackStatus, Player, PlayerCommand, Sequencer, TransportCommand,
    VoiceProfile, VoiceSelector, parse_command,
};

// @module: Application controller for document reading

const PROGRESS_TEMPLATE: &str = "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}";
const FALLBACK_TEMPLATE: &str = "{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} {msg}";

/// Main application controller
pub struct Controller {
    // @field: App configuration
    config: Config,
}

impl Controller {
    /// Create a new controller for test purposes with default configuration
    pub fn new_for_test() -> Result<Self> {
        Self::with_config(Config::default())
    }

    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        Ok(Self { config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Extractor configured with OCR when it is enabled
    pub fn build_extractor(&self) -> Extractor {
        let ocr = &self.config.ocr;
        let extractor = Extractor::new()
            .with_preprocess(PreprocessOptions {
                contrast: ocr.contrast,
                threshold: ocr.threshold,
            })
            .with_min_confidence(ocr.min_confidence)
            .with_concurrent_requests(ocr.concurrent_requests);

        if ocr.enabled {
            extractor.with_ocr(Arc::new(VisionOcr::new(&ocr.endpoint, &ocr.api_key, ocr.timeout_secs)))
        } else {
            extractor
        }
    }

    /// Extract the text of one document, showing page progress
    pub async fn extract(&self, input_file: &Path) -> Result<ExtractedDocument> {
        if !input_file.exists() {
            return Err(anyhow!("Input file does not exist: {:?}", input_file));
        }

        let source = document::open(input_file, self.config.ocr.min_text_chars)
            .with_context(|| format!("Failed to open document: {:?}", input_file))?;

        let progress_bar = new_progress_bar(source.page_count() as u64, "pages");
        progress_bar.set_message("Extracting");

        let pb = progress_bar.clone();
        let extracted = self
            .build_extractor()
            .extract(source.as_ref(), move |done, _total| pb.set_position(done as u64))
            .await?;
        progress_bar.finish_and_clear();

        info!(
            "Extracted {} pages ({} embedded, {} OCR, {} empty)",
            extracted.pages.len(),
            extracted.count(ExtractionMethod::Embedded),
            extracted.count(ExtractionMethod::Ocr),
            extracted.count(ExtractionMethod::Empty)
        );

        Ok(extracted)
    }

    /// Clean up text with the configured correction provider
    pub async fn correct_text(&self, text: &str) -> Result<CorrectionOutcome> {
        let corrector = correction::build_corrector(&self.config.correction);
        info!(
            "Correcting text with {} - {}",
            self.config.correction.provider.display_name(),
            self.config.correction.get_model()
        );

        let outcome = corrector.correct(text).await;
        if !outcome.fully_corrected() {
            warn!(
                "{} of {} pieces could not be corrected and were kept as extracted",
                outcome.fallbacks, outcome.pieces
            );
        }
        Ok(outcome)
    }

    /// Extract a document and correct it if correction is enabled
    pub async fn prepare_text(&self, input_file: &Path) -> Result<String> {
        let text = self.extract(input_file).await?.text();
        if text.trim().is_empty() {
            return Err(PlaybackError::NothingToRead.into());
        }

        if self.config.correction.enabled {
            Ok(self.correct_text(&text).await?.text)
        } else {
            Ok(text)
        }
    }

    /// Extract a file or every document under a directory to text files.
    ///
    /// With a single file and no output path the text goes to stdout.
    pub async fn run_extract(&self, input_path: &Path, output: Option<PathBuf>, force_overwrite: bool) -> Result<()> {
        if input_path.is_file() {
            let text = self.prepare_text(input_path).await?;
            match output {
                Some(output_file) => write_output(&output_file, &text, force_overwrite),
                None => {
                    println!("{}", text);
                    Ok(())
                }
            }
        } else if input_path.is_dir() {
            let documents = FileManager::find_documents(input_path)?;
            if documents.is_empty() {
                warn!("No documents found in {:?}", input_path);
                return Ok(());
            }

            let output_dir = output.unwrap_or_else(|| input_path.to_path_buf());
            let mut processed = 0;
            for document in &documents {
                info!("Processing: {:?}", document);
                let output_file = FileManager::generate_output_path(document, &output_dir, "txt");
                if output_file.exists() && !force_overwrite {
                    warn!("Skipping {:?}, output already exists (use -f to force overwrite)", document);
                    continue;
                }

                match self.prepare_text(document).await {
                    Ok(text) => {
                        write_output(&output_file, &text, true)?;
                        processed += 1;
                    }
                    Err(e) => error!("Error processing {:?}: {}", document, e),
                }
            }

            info!("Finished processing {} of {} documents", processed, documents.len());
            Ok(())
        } else {
            Err(anyhow!("Input path does not exist: {:?}", input_path))
        }
    }

    /// Installed voices and the one that would be picked by default
    pub async fn list_voices(&self) -> Result<(Vec<VoiceProfile>, Option<VoiceProfile>)> {
        let program = self.config.speech.program;
        let voices = system::list_voices(program)
            .await
            .with_context(|| format!("Failed to list voices of {}", program))?;

        let selector: VoiceSelector = self.config.speech.sequencer_options().selector;
        let default = selector.select_default(&voices).cloned();
        Ok((voices, default))
    }

    /// Extract, optionally correct, and read a document aloud.
    ///
    /// Playback is controlled by commands typed on stdin; an empty line
    /// toggles pause.
    pub async fn read_aloud(&self, input_file: &Path) -> Result<()> {
        let text = self.prepare_text(input_file).await?;
        let speech = &self.config.speech;

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let engine = SystemSpeech::detect(speech.program, event_tx).await;
        let mut sequencer = Sequencer::new(engine, speech.sequencer_options());
        if sequencer.status() == PlaybackStatus::Unsupported {
            return Err(PlaybackError::UnsupportedEngine.into());
        }

        let voices = system::list_voices(speech.program).await.unwrap_or_else(|e| {
            warn!("Could not list voices: {}", e);
            Vec::new()
        });
        sequencer.voices_changed(voices);
        if let Some(voice) = &speech.voice {
            if let Err(e) = sequencer.select_voice(voice) {
                warn!("{}, using the default voice", e);
            }
        }
        sequencer.load(text);

        let player = Player::spawn(sequencer, event_rx);
        let stdin = BufReader::new(tokio::io::stdin());
        let program = speech.program;

        let snapshot = run_session(player, stdin, speech.rate_step, || system::list_voices(program)).await?;
        info!("Stopped at {}% ({})", snapshot.rounded_percent(), snapshot.status);
        Ok(())
    }
}

/// Drive a spawned player from line commands read from `input`.
///
/// Sends `Start`, then applies each line until playback completes or the
/// user quits. `v` re-lists the engine's voices through `refresh_voices` and
/// hands them to the player. Once `input` is exhausted the session also ends
/// when playback can no longer move on its own: stopped, paused, or halted
/// by a failure, which is then returned as the error.
pub async fn run_session<R, F, Fut, E>(
    mut player: Player,
    input: R,
    rate_step: f32,
    refresh_voices: F,
) -> Result<PlaybackSnapshot>
where
    R: AsyncBufRead + Unpin,
    F: Fn() -> Fut,
    Fut: Future<Output = std::result::Result<Vec<VoiceProfile>, E>>,
    E: std::fmt::Display,
{
    let handle = player.handle.clone();

    let progress_bar = new_progress_bar(100, "%");
    progress_bar.println("Commands: <enter> pause/resume, r restart, + faster, - slower, speed <x>, voice <name>, v voices, q quit");
    if let Some(voice) = handle.snapshot().voice {
        progress_bar.println(format!("Voice: {}", voice));
    }
    progress_bar.set_message(PlaybackStatus::Idle.to_string());
    handle.send(PlayerCommand::Start)?;

    let mut lines = input.lines();
    let mut stdin_open = true;
    // Until the first state change or failure the outcome of Start is unknown
    let mut start_pending = true;
    let mut status = PlaybackStatus::Idle;
    let mut last_failure: Option<PlaybackError> = None;
    let mut stalled = false;

    loop {
        tokio::select! {
            notice = player.notices.recv() => {
                let Some(notice) = notice else { break };
                match notice {
                    PlaybackNotice::StateChanged(snapshot) => {
                        start_pending = false;
                        status = snapshot.status;
                        // A failure is always published right after its state change
                        last_failure = None;
                        progress_bar.set_position(snapshot.rounded_percent() as u64);
                        progress_bar.set_message(format!("{} at {:.2}x", snapshot.status, snapshot.rate));
                        if status == PlaybackStatus::Completed {
                            break;
                        }
                    }
                    PlaybackNotice::VoiceChanged(Some(voice)) => progress_bar.println(format!("Voice: {}", voice)),
                    PlaybackNotice::VoiceChanged(None) => progress_bar.println("No voice available"),
                    PlaybackNotice::ChunkingFallback { chars } => progress_bar.println(format!(
                        "No sentence boundaries found, reading {} characters in one go",
                        chars
                    )),
                    PlaybackNotice::Failed(e) => {
                        start_pending = false;
                        progress_bar.println(format!("Error: {}", e));
                        last_failure = Some(e);
                    }
                }
            }
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => {
                    let command = if line.trim().is_empty() {
                        Some(TransportCommand::TogglePause)
                    } else {
                        parse_command(&line)
                    };

                    match command {
                        Some(TransportCommand::Quit) => break,
                        Some(TransportCommand::ListVoices) => match refresh_voices().await {
                            Ok(voices) => {
                                for voice in &voices {
                                    progress_bar.println(format!("  {} [{}]", voice, voice.id));
                                }
                                handle.send(PlayerCommand::VoicesChanged(voices))?;
                            }
                            Err(e) => progress_bar.println(format!("Could not list voices: {}", e)),
                        },
                        Some(command) => {
                            if let Some(player_command) = command.to_player_command(rate_step) {
                                handle.send(player_command)?;
                            }
                        }
                        None => progress_bar.println(format!("Unknown command: {}", line.trim())),
                    }
                }
                Ok(None) => {
                    debug!("Input closed, playing to the end");
                    stdin_open = false;
                }
                Err(e) => {
                    warn!("Failed to read input: {}", e);
                    stdin_open = false;
                }
            },
        }

        if !stdin_open && !start_pending && status != PlaybackStatus::Playing {
            // Pick up a failure queued behind the state change that stopped playback
            while let Ok(notice) = player.notices.try_recv() {
                if let PlaybackNotice::Failed(e) = notice {
                    last_failure = Some(e);
                }
            }
            debug!("No more input and playback is {}, ending the session", status);
            stalled = true;
            break;
        }
    }

    let _ = handle.send(PlayerCommand::Shutdown);
    player.join().await?;
    progress_bar.finish_and_clear();

    match last_failure {
        Some(e) if stalled => Err(e.into()),
        _ => Ok(handle.snapshot()),
    }
}

fn new_progress_bar(len: u64, unit: &str) -> ProgressBar {
    let progress_bar = ProgressBar::new(len);
    let style = ProgressStyle::default_bar()
        .template(&PROGRESS_TEMPLATE.replace("{len}", &format!("{{len}} {}", unit)))
        .or_else(|_| ProgressStyle::default_bar().template(FALLBACK_TEMPLATE))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    progress_bar.set_style(style.progress_chars("█▓▒░"));
    progress_bar
}

fn write_output(output_file: &Path, text: &str, force_overwrite: bool) -> Result<()> {
    if output_file.exists() && !force_overwrite {
        warn!("Output file already exists: {:?}. Use -f to force overwrite.", output_file);
        return Ok(());
    }

    FileManager::write_to_file(output_file, text)?;
    info!("Success: {:?}", output_file);
    Ok(())
}
