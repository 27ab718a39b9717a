/*!
 * Speech playback core.
 *
 * This module contains the pieces that turn extracted text into audio:
 * - `chunker`: sentence-aware splitting of text into synthesis-sized chunks
 * - `sequencer`: the playback state machine driving one utterance at a time
 * - `voice_selector`: default voice choice from the engine's voice list
 * - `player`: async driver that owns a sequencer and serializes its events
 * - `system`: a speech engine backed by `espeak-ng` or macOS `say`
 * - `commands`: parsing of spoken/typed transport commands
 */

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::SpeechError;

pub mod chunker;
pub mod commands;
pub mod player;
pub mod sequencer;
pub mod system;
pub mod voice_selector;

pub use chunker::Chunker;
pub use commands::{TransportCommand, parse_command};
pub use player::{Player, PlayerCommand, PlayerHandle};
pub use sequencer::{PlaybackNotice, PlaybackSnapshot, Sequencer, SequencerOptions, SubscriptionId};
pub use system::{SpeechProgram, SystemSpeech};
pub use voice_selector::VoiceSelector;

/// Reported gender of a voice, when the engine knows it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoiceGender {
    Female,
    Male,
}

/// A voice offered by the speech engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceProfile {
    /// Identifier passed back to the engine when speaking
    pub id: String,
    /// Locale tag as reported by the engine (e.g. `en-US`, `en_GB`)
    pub locale: String,
    /// Human readable name
    pub name: String,
    /// Gender, if the engine reports one
    #[serde(default)]
    pub gender: Option<VoiceGender>,
}

impl VoiceProfile {
    pub fn new(id: impl Into<String>, locale: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            locale: locale.into(),
            name: name.into(),
            gender: None,
        }
    }

    pub fn with_gender(mut self, gender: VoiceGender) -> Self {
        self.gender = Some(gender);
        self
    }
}

impl fmt::Display for VoiceProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.locale)
    }
}

/// Lifecycle state of the playback sequencer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackStatus {
    /// The engine cannot synthesize speech at all
    Unsupported,
    Idle,
    Playing,
    Paused,
    Completed,
}

impl fmt::Display for PlaybackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unsupported => "unsupported",
            Self::Idle => "idle",
            Self::Playing => "playing",
            Self::Paused => "paused",
            Self::Completed => "completed",
        };
        f.write_str(name)
    }
}

/// What the engine can do, negotiated once when the sequencer is built
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EngineCapabilities {
    /// Speech synthesis is available
    pub synthesis: bool,
    /// The engine can suspend an utterance and continue it later
    pub pause: bool,
}

impl EngineCapabilities {
    pub fn unsupported() -> Self {
        Self::default()
    }
}

/// Identifies one dispatched utterance.
///
/// `epoch` changes whenever a session is reset, `serial` on every dispatch.
/// Events carrying a ticket other than the in-flight one are stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UtteranceTicket {
    pub epoch: u64,
    pub chunk_index: usize,
    pub serial: u64,
}

/// One invocation of the engine over a single chunk
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub ticket: UtteranceTicket,
    pub text: String,
    /// Rate multiplier, 1.0 is the engine's normal speed
    pub rate: f32,
    pub voice: Option<VoiceProfile>,
}

/// How an utterance ended
#[derive(Debug, Clone, PartialEq)]
pub enum UtteranceOutcome {
    Finished,
    Failed(String),
}

/// Completion callback from the engine, delivered as a message
#[derive(Debug, Clone, PartialEq)]
pub struct EngineEvent {
    pub ticket: UtteranceTicket,
    pub outcome: UtteranceOutcome,
}

impl EngineEvent {
    pub fn finished(ticket: UtteranceTicket) -> Self {
        Self {
            ticket,
            outcome: UtteranceOutcome::Finished,
        }
    }

    pub fn failed(ticket: UtteranceTicket, message: impl Into<String>) -> Self {
        Self {
            ticket,
            outcome: UtteranceOutcome::Failed(message.into()),
        }
    }
}

/// A speech synthesis engine.
///
/// Calls are synchronous and must not block: `speak` starts an utterance and
/// returns, and the engine later reports the outcome as an [`EngineEvent`]
/// tagged with the utterance's ticket. `cancel` must stop audio before it
/// returns or at least have issued the stop; events for the cancelled
/// utterance may still arrive and are discarded by the sequencer.
pub trait SpeechEngine: Send {
    fn capabilities(&self) -> EngineCapabilities;

    fn speak(&mut self, utterance: Utterance) -> Result<(), SpeechError>;

    /// Suspend the current utterance. Only called when `capabilities().pause`.
    fn pause(&mut self) -> Result<(), SpeechError>;

    /// Continue a suspended utterance. Only called when `capabilities().pause`.
    fn resume(&mut self) -> Result<(), SpeechError>;

    fn cancel(&mut self);
}
