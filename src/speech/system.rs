/*!
 * Speech engine backed by a system text-to-speech program.
 *
 * Each utterance runs one `espeak-ng` or `say` process. Neither program can
 * suspend speech, so the engine reports no pause capability and the
 * sequencer re-speaks the interrupted chunk on resume.
 */

use log::{debug, warn};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::process::Stdio;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};

use crate::errors::SpeechError;

use super::{
    EngineCapabilities, EngineEvent, SpeechEngine, Utterance, UtteranceOutcome, UtteranceTicket,
    VoiceGender, VoiceProfile,
};

/// Words per minute at rate 1.0
pub const BASE_WORDS_PER_MINUTE: f32 = 175.0;

// How often the watcher checks whether the speaking process has exited
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(20);

// `say -v ?` lines: "Alex                en_US    # Most people recognize me by my voice."
static SAY_VOICE_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<name>.+?)\s+(?P<locale>[A-Za-z]{2,3}[_-][A-Za-z0-9]+)\s+#").expect("valid regex")
});

/// Supported text-to-speech programs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpeechProgram {
    #[serde(rename = "espeak-ng")]
    EspeakNg,
    #[serde(rename = "say")]
    Say,
}

impl Default for SpeechProgram {
    fn default() -> Self {
        if cfg!(target_os = "macos") { Self::Say } else { Self::EspeakNg }
    }
}

impl fmt::Display for SpeechProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.binary())
    }
}

impl FromStr for SpeechProgram {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "espeak-ng" | "espeak" => Ok(Self::EspeakNg),
            "say" => Ok(Self::Say),
            _ => Err(anyhow::anyhow!("Unknown speech program: {}", s)),
        }
    }
}

impl SpeechProgram {
    pub fn binary(&self) -> &'static str {
        match self {
            Self::EspeakNg => "espeak-ng",
            Self::Say => "say",
        }
    }

    /// Arguments that list the installed voices
    fn voice_list_args(&self) -> &'static [&'static str] {
        match self {
            Self::EspeakNg => &["--voices"],
            Self::Say => &["-v", "?"],
        }
    }

    /// Build the command speaking one utterance
    fn speak_command(&self, utterance: &Utterance) -> Command {
        let rate_flag = match self {
            Self::EspeakNg => "-s",
            Self::Say => "-r",
        };

        let mut command = Command::new(self.binary());
        command.arg(rate_flag).arg(words_per_minute(utterance.rate).to_string());

        if let Some(voice) = &utterance.voice {
            command.arg("-v").arg(&voice.id);
        }

        // A leading dash would be read as an option
        let text = if utterance.text.starts_with('-') {
            format!(" {}", utterance.text)
        } else {
            utterance.text.clone()
        };
        command.arg(text);
        command
    }

    /// Parse the program's voice listing
    pub fn parse_voices(&self, listing: &str) -> Vec<VoiceProfile> {
        match self {
            Self::EspeakNg => parse_espeak_voices(listing),
            Self::Say => parse_say_voices(listing),
        }
    }
}

/// Map a rate multiplier to words per minute
pub fn words_per_minute(rate: f32) -> u32 {
    (BASE_WORDS_PER_MINUTE * rate).round().max(1.0) as u32
}

/// Parse `espeak-ng --voices` output.
///
/// ```text
/// Pty Language       Age/Gender VoiceName          File                 Other Languages
///  5  en-us           --/M      English_(America)  gmw/en-US
/// ```
pub fn parse_espeak_voices(listing: &str) -> Vec<VoiceProfile> {
    listing
        .lines()
        .skip_while(|line| !line.trim_start().starts_with("Pty"))
        .skip(1)
        .filter_map(|line| {
            let columns: Vec<&str> = line.split_whitespace().collect();
            if columns.len() < 5 {
                return None;
            }

            let gender = match columns[2].rsplit('/').next() {
                Some("F") => Some(VoiceGender::Female),
                Some("M") => Some(VoiceGender::Male),
                _ => None,
            };

            let mut voice = VoiceProfile::new(columns[4], columns[1], columns[3].replace('_', " "));
            voice.gender = gender;
            Some(voice)
        })
        .collect()
}

/// Parse `say -v ?` output
pub fn parse_say_voices(listing: &str) -> Vec<VoiceProfile> {
    listing
        .lines()
        .filter_map(|line| {
            let captures = SAY_VOICE_LINE.captures(line)?;
            let name = captures.name("name")?.as_str().trim();
            let locale = captures.name("locale")?.as_str();
            Some(VoiceProfile::new(name, locale, name))
        })
        .collect()
}

/// Whether the program can be launched at all
pub async fn probe(program: SpeechProgram) -> bool {
    let probe_args: &[&str] = match program {
        SpeechProgram::EspeakNg => &["--version"],
        SpeechProgram::Say => &["-v", "?"],
    };

    match Command::new(program.binary())
        .args(probe_args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
    {
        Ok(status) => status.success(),
        Err(e) => {
            debug!("{} is not available: {}", program, e);
            false
        }
    }
}

/// List the voices installed for `program`
pub async fn list_voices(program: SpeechProgram) -> Result<Vec<VoiceProfile>, SpeechError> {
    let output = Command::new(program.binary())
        .args(program.voice_list_args())
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| SpeechError(format!("Failed to run {}: {}", program, e)))?;

    if !output.status.success() {
        return Err(SpeechError(format!(
            "{} exited with {}: {}",
            program,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    let voices = program.parse_voices(&String::from_utf8_lossy(&output.stdout));
    debug!("{} lists {} voices", program, voices.len());
    Ok(voices)
}

/// One speaking process and the task watching it.
///
/// The child is shared with the watcher so that `cancel` can kill it on the
/// caller's thread. Whoever takes the child out of the slot owns its exit:
/// the watcher reports it, `cancel` silences it.
struct RunningUtterance {
    child: Arc<Mutex<Option<Child>>>,
    stop: oneshot::Sender<()>,
}

impl RunningUtterance {
    fn spawn(
        runtime: &Handle,
        mut command: Command,
        label: &'static str,
        ticket: UtteranceTicket,
        events: mpsc::UnboundedSender<EngineEvent>,
    ) -> Result<Self, SpeechError> {
        let _guard = runtime.enter();
        let child = command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SpeechError(format!("Failed to start {}: {}", label, e)))?;

        let child = Arc::new(Mutex::new(Some(child)));
        let (stop, mut stop_rx) = oneshot::channel::<()>();
        let watched = child.clone();

        runtime.spawn(async move {
            let mut ticker = tokio::time::interval(EXIT_POLL_INTERVAL);
            loop {
                tokio::select! {
                    // Fires on an explicit cancel or when the engine is dropped
                    _ = &mut stop_rx => return,
                    _ = ticker.tick() => {}
                }

                let outcome = {
                    let mut slot = watched.lock();
                    let Some(running) = slot.as_mut() else { return };
                    let outcome = match running.try_wait() {
                        Ok(None) => continue,
                        Ok(Some(status)) if status.success() => UtteranceOutcome::Finished,
                        Ok(Some(status)) => UtteranceOutcome::Failed(format!("{} exited with {}", label, status)),
                        Err(e) => UtteranceOutcome::Failed(e.to_string()),
                    };
                    slot.take();
                    outcome
                };

                let _ = events.send(EngineEvent { ticket, outcome });
                return;
            }
        });

        Ok(Self { child, stop })
    }

    /// Kill the process before returning; the watcher reports nothing
    fn cancel(self, runtime: &Handle) {
        let _ = self.stop.send(());

        let Some(mut child) = self.child.lock().take() else {
            return;
        };
        if let Err(e) = child.start_kill() {
            debug!("Failed to kill speech process: {}", e);
        }
        // Reap in the background
        runtime.spawn(async move {
            let _ = child.wait().await;
        });
    }
}

/// Speech engine running one system process per utterance
pub struct SystemSpeech {
    program: SpeechProgram,
    available: bool,
    runtime: Handle,
    events: mpsc::UnboundedSender<EngineEvent>,
    current: Option<RunningUtterance>,
}

impl SystemSpeech {
    /// Probe `program` and build an engine reporting outcomes on `events`.
    ///
    /// A missing program still yields an engine; it just reports no
    /// synthesis capability.
    pub async fn detect(program: SpeechProgram, events: mpsc::UnboundedSender<EngineEvent>) -> Self {
        let available = probe(program).await;
        if !available {
            warn!("{} not found, speech synthesis is unavailable", program);
        }

        Self {
            program,
            available,
            runtime: Handle::current(),
            events,
            current: None,
        }
    }

    pub fn program(&self) -> SpeechProgram {
        self.program
    }
}

impl SpeechEngine for SystemSpeech {
    fn capabilities(&self) -> EngineCapabilities {
        EngineCapabilities {
            synthesis: self.available,
            pause: false,
        }
    }

    fn speak(&mut self, utterance: Utterance) -> Result<(), SpeechError> {
        self.cancel();

        let running = RunningUtterance::spawn(
            &self.runtime,
            self.program.speak_command(&utterance),
            self.program.binary(),
            utterance.ticket,
            self.events.clone(),
        )?;
        self.current = Some(running);
        Ok(())
    }

    fn pause(&mut self) -> Result<(), SpeechError> {
        Err(SpeechError(format!("{} cannot pause speech", self.program)))
    }

    fn resume(&mut self) -> Result<(), SpeechError> {
        Err(SpeechError(format!("{} cannot resume speech", self.program)))
    }

    fn cancel(&mut self) {
        if let Some(running) = self.current.take() {
            running.cancel(&self.runtime);
        }
    }
}
