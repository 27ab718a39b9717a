/*!
 * Playback sequencer.
 *
 * A synchronous state machine that walks a chunk list, handing one chunk at
 * a time to a [`SpeechEngine`] and advancing when the engine reports the
 * utterance finished. It knows nothing about threads or rendering: callers
 * feed it transport commands and engine events one at a time and observe it
 * through `subscribe`.
 *
 * Every dispatched utterance carries an [`UtteranceTicket`]. Only an event
 * matching the in-flight ticket may move the position, so completions that
 * arrive after a restart, a cancel or a rate change are ignored.
 */

use log::{debug, error, info, warn};

use crate::errors::PlaybackError;

use super::chunker::{self, Chunker};
use super::voice_selector::VoiceSelector;
use super::{
    EngineCapabilities, EngineEvent, PlaybackStatus, SpeechEngine, Utterance, UtteranceOutcome,
    UtteranceTicket, VoiceProfile,
};

/// Tuning for a sequencer
#[derive(Debug, Clone, PartialEq)]
pub struct SequencerOptions {
    /// Maximum characters per chunk
    pub max_chunk_chars: usize,
    /// Initial rate multiplier
    pub rate: f32,
    /// Lowest accepted rate, requests below are clamped
    pub min_rate: f32,
    /// Highest accepted rate, requests above are clamped
    pub max_rate: f32,
    pub selector: VoiceSelector,
}

impl Default for SequencerOptions {
    fn default() -> Self {
        Self {
            max_chunk_chars: chunker::DEFAULT_MAX_CHUNK_CHARS,
            rate: 1.0,
            min_rate: 0.5,
            max_rate: 2.0,
            selector: VoiceSelector::default(),
        }
    }
}

/// Point-in-time view of the playback state
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSnapshot {
    pub status: PlaybackStatus,
    /// Index of the next chunk to finish
    pub position: usize,
    /// Number of chunks in the session, 0 when idle
    pub total: usize,
    /// `100 * position / total`
    pub percent: f64,
    pub epoch: u64,
    pub rate: f32,
    pub voice: Option<VoiceProfile>,
}

impl PlaybackSnapshot {
    pub fn is_playing(&self) -> bool {
        self.status == PlaybackStatus::Playing
    }

    /// Percent rounded for display. Never shows 100 before completion.
    pub fn rounded_percent(&self) -> u8 {
        let rounded = self.percent.round().clamp(0.0, 100.0) as u8;
        if self.status != PlaybackStatus::Completed && self.position < self.total {
            rounded.min(99)
        } else {
            rounded
        }
    }
}

/// Something observers may want to react to
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackNotice {
    StateChanged(PlaybackSnapshot),
    VoiceChanged(Option<VoiceProfile>),
    /// The document had no sentence boundaries and is read as one chunk
    ChunkingFallback { chars: usize },
    Failed(PlaybackError),
}

/// Handle returned by [`Sequencer::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Observer = Box<dyn FnMut(&PlaybackNotice) + Send>;

/// Sequential chunk playback over a speech engine
pub struct Sequencer<E: SpeechEngine> {
    engine: E,
    capabilities: EngineCapabilities,
    chunker: Chunker,
    selector: VoiceSelector,
    min_rate: f32,
    max_rate: f32,

    status: PlaybackStatus,
    document: String,
    chunks: Vec<String>,
    position: usize,
    epoch: u64,
    serial: u64,
    in_flight: Option<UtteranceTicket>,
    rate: f32,

    voices: Vec<VoiceProfile>,
    voice: Option<VoiceProfile>,
    pinned_voice: Option<String>,

    observers: Vec<(SubscriptionId, Observer)>,
    next_subscription: u64,
}

impl<E: SpeechEngine> Sequencer<E> {
    /// Build a sequencer, negotiating the engine's capabilities once.
    ///
    /// An engine without synthesis yields a sequencer stuck in
    /// `Unsupported`; every transport command then fails.
    pub fn new(engine: E, options: SequencerOptions) -> Self {
        let capabilities = engine.capabilities();
        let status = if capabilities.synthesis {
            PlaybackStatus::Idle
        } else {
            warn!("Speech engine has no synthesis capability, playback disabled");
            PlaybackStatus::Unsupported
        };

        let (min_rate, max_rate) = if options.min_rate <= options.max_rate {
            (options.min_rate, options.max_rate)
        } else {
            (options.max_rate, options.min_rate)
        };

        Self {
            engine,
            capabilities,
            chunker: Chunker::new(options.max_chunk_chars),
            selector: options.selector,
            min_rate,
            max_rate,
            status,
            document: String::new(),
            chunks: Vec::new(),
            position: 0,
            epoch: 0,
            serial: 0,
            in_flight: None,
            rate: options.rate.clamp(min_rate, max_rate),
            voices: Vec::new(),
            voice: None,
            pinned_voice: None,
            observers: Vec::new(),
            next_subscription: 0,
        }
    }

    pub fn status(&self) -> PlaybackStatus {
        self.status
    }

    pub fn capabilities(&self) -> EngineCapabilities {
        self.capabilities
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn rate(&self) -> f32 {
        self.rate
    }

    pub fn rate_bounds(&self) -> (f32, f32) {
        (self.min_rate, self.max_rate)
    }

    pub fn chunks(&self) -> &[String] {
        &self.chunks
    }

    pub fn voices(&self) -> &[VoiceProfile] {
        &self.voices
    }

    pub fn voice(&self) -> Option<&VoiceProfile> {
        self.voice.as_ref()
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// `100 * position / total`, 0 without a session
    pub fn progress_percent(&self) -> f64 {
        if self.chunks.is_empty() {
            0.0
        } else {
            100.0 * self.position as f64 / self.chunks.len() as f64
        }
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            status: self.status,
            position: self.position,
            total: self.chunks.len(),
            percent: self.progress_percent(),
            epoch: self.epoch,
            rate: self.rate,
            voice: self.voice.clone(),
        }
    }

    /// Register an observer called synchronously on every notice
    pub fn subscribe(&mut self, observer: impl FnMut(&PlaybackNotice) + Send + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    /// Remove an observer; returns false if it was not registered
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(existing, _)| *existing != id);
        self.observers.len() != before
    }

    /// Replace the document to read. Any running session is reset first.
    pub fn load(&mut self, text: impl Into<String>) {
        if matches!(self.status, PlaybackStatus::Playing | PlaybackStatus::Paused | PlaybackStatus::Completed) {
            self.reset_session(PlaybackStatus::Idle);
            self.publish_state();
        }
        self.document = text.into();
        debug!("Loaded document with {} characters", self.document.chars().count());
    }

    /// `Idle | Completed -> Playing`: chunk the document and speak chunk 0
    pub fn start(&mut self) -> Result<(), PlaybackError> {
        match self.status {
            PlaybackStatus::Unsupported => return self.reject(PlaybackError::UnsupportedEngine),
            PlaybackStatus::Idle | PlaybackStatus::Completed => {}
            from => {
                return self.reject(PlaybackError::InvalidTransition { from, action: "start" });
            }
        }

        if self.voice.is_none() {
            return self.reject(PlaybackError::NoVoiceAvailable);
        }

        let chunks = self.chunker.chunk(&self.document);
        if chunks.is_empty() {
            return self.reject(PlaybackError::NothingToRead);
        }

        if chunker::is_degenerate(&self.document) {
            let chars = self.document.trim().chars().count();
            self.notify(PlaybackNotice::ChunkingFallback { chars });
        }

        // A replay after completion is a new session
        if self.status == PlaybackStatus::Completed {
            self.epoch += 1;
        }

        info!("Starting playback of {} chunks", chunks.len());
        self.chunks = chunks;
        self.position = 0;
        self.status = PlaybackStatus::Playing;
        self.publish_state();

        self.dispatch_current()
    }

    /// `Playing -> Paused`, keeping the position
    pub fn pause(&mut self) -> Result<(), PlaybackError> {
        match self.status {
            PlaybackStatus::Playing => {}
            PlaybackStatus::Paused => return Ok(()),
            PlaybackStatus::Unsupported => return self.reject(PlaybackError::UnsupportedEngine),
            from => {
                return self.reject(PlaybackError::InvalidTransition { from, action: "pause" });
            }
        }

        if self.in_flight.is_some() {
            if self.capabilities.pause {
                if let Err(e) = self.engine.pause() {
                    warn!("Engine pause failed ({}), cancelling the utterance instead", e);
                    self.cancel_in_flight();
                }
            } else {
                // No true pause: drop the utterance, resume speaks the chunk again
                self.cancel_in_flight();
            }
        }

        self.status = PlaybackStatus::Paused;
        self.publish_state();
        Ok(())
    }

    /// `Paused -> Playing`
    pub fn resume(&mut self) -> Result<(), PlaybackError> {
        match self.status {
            PlaybackStatus::Paused => {}
            PlaybackStatus::Playing => return Ok(()),
            PlaybackStatus::Unsupported => return self.reject(PlaybackError::UnsupportedEngine),
            from => {
                return self.reject(PlaybackError::InvalidTransition { from, action: "resume" });
            }
        }

        self.status = PlaybackStatus::Playing;

        if self.in_flight.is_some() {
            if let Err(e) = self.engine.resume() {
                warn!("Engine resume failed ({}), speaking the chunk again", e);
                self.cancel_in_flight();
            } else {
                self.publish_state();
                return Ok(());
            }
        }

        self.publish_state();

        if self.position >= self.chunks.len() {
            // The last chunk finished while paused
            self.complete();
            return Ok(());
        }

        self.dispatch_current()
    }

    /// Pause when playing, resume when paused, start otherwise
    pub fn toggle(&mut self) -> Result<(), PlaybackError> {
        match self.status {
            PlaybackStatus::Playing => self.pause(),
            PlaybackStatus::Paused => self.resume(),
            _ => self.start(),
        }
    }

    /// `any -> Idle`: cancel speech, drop the chunks, position and progress to 0
    pub fn restart(&mut self) -> Result<(), PlaybackError> {
        self.ensure_supported()?;

        info!("Restarting playback");
        self.reset_session(PlaybackStatus::Idle);
        self.publish_state();
        Ok(())
    }

    /// Change the rate. Applied to the next utterance; the chunk being
    /// spoken is re-dispatched at the new rate.
    pub fn set_rate(&mut self, rate: f32) -> Result<(), PlaybackError> {
        self.ensure_supported()?;
        if !rate.is_finite() || rate <= 0.0 {
            return self.reject(PlaybackError::InvalidRate(rate));
        }

        let rate = rate.clamp(self.min_rate, self.max_rate);
        if (rate - self.rate).abs() < f32::EPSILON {
            return Ok(());
        }

        debug!("Rate changed from {:.2} to {:.2}", self.rate, rate);
        self.rate = rate;
        self.apply_prospectively()?;
        self.publish_state();
        Ok(())
    }

    /// Change the rate by `delta`, clamped to the configured bounds
    pub fn adjust_rate(&mut self, delta: f32) -> Result<(), PlaybackError> {
        self.ensure_supported()?;
        let target = (self.rate + delta).clamp(self.min_rate, self.max_rate);
        self.set_rate(target)
    }

    /// Pin a voice by id or name (case-insensitive)
    pub fn select_voice(&mut self, id_or_name: &str) -> Result<(), PlaybackError> {
        self.ensure_supported()?;
        let wanted = id_or_name.trim();
        let found = self
            .voices
            .iter()
            .find(|v| v.id == wanted)
            .or_else(|| self.voices.iter().find(|v| v.name.eq_ignore_ascii_case(wanted)))
            .cloned();

        let Some(voice) = found else {
            return self.reject(PlaybackError::UnknownVoice(wanted.to_string()));
        };

        self.pinned_voice = Some(voice.id.clone());
        if self.voice.as_ref() != Some(&voice) {
            info!("Voice set to {}", voice);
            self.voice = Some(voice);
            self.notify(PlaybackNotice::VoiceChanged(self.voice.clone()));
            self.apply_prospectively()?;
        }
        Ok(())
    }

    /// The engine's voice list changed: re-run the default selection.
    ///
    /// A pinned voice is kept as long as it is still listed.
    pub fn voices_changed(&mut self, voices: Vec<VoiceProfile>) {
        debug!("Engine reported {} voices", voices.len());
        self.voices = voices;

        let pinned = self
            .pinned_voice
            .as_ref()
            .and_then(|id| self.voices.iter().find(|v| &v.id == id))
            .cloned();

        let next = match pinned {
            Some(voice) => Some(voice),
            None => {
                self.pinned_voice = None;
                self.selector.select_default(&self.voices).cloned()
            }
        };

        if next != self.voice {
            match &next {
                Some(voice) => info!("Default voice: {}", voice),
                None => warn!("No voice available, playback disabled"),
            }
            self.voice = next;
            self.notify(PlaybackNotice::VoiceChanged(self.voice.clone()));
        }
    }

    /// Apply an engine completion event.
    ///
    /// Events whose ticket is not the in-flight one are stale and ignored.
    /// An engine failure aborts the session and is returned as an error.
    pub fn handle_event(&mut self, event: EngineEvent) -> Result<(), PlaybackError> {
        if event.ticket.epoch != self.epoch {
            debug!(
                "Ignoring event from epoch {} (current epoch {})",
                event.ticket.epoch, self.epoch
            );
            return Ok(());
        }
        if self.in_flight != Some(event.ticket) {
            debug!("Ignoring stale event for chunk {}", event.ticket.chunk_index);
            return Ok(());
        }
        self.in_flight = None;

        match event.outcome {
            UtteranceOutcome::Finished => {
                self.position += 1;
                if self.position >= self.chunks.len() {
                    self.complete();
                    return Ok(());
                }

                self.publish_state();
                if self.status == PlaybackStatus::Playing {
                    self.dispatch_current()
                } else {
                    Ok(())
                }
            }
            UtteranceOutcome::Failed(message) => self.fail(event.ticket.chunk_index, message),
        }
    }

    /// Cancel any speech and return to `Idle`. Used on teardown.
    pub fn shutdown(&mut self) {
        if self.in_flight.is_some() || matches!(self.status, PlaybackStatus::Playing | PlaybackStatus::Paused) {
            self.reset_session(PlaybackStatus::Idle);
            self.publish_state();
        }
    }

    fn dispatch_current(&mut self) -> Result<(), PlaybackError> {
        let Some(text) = self.chunks.get(self.position).cloned() else {
            self.complete();
            return Ok(());
        };

        self.serial += 1;
        let ticket = UtteranceTicket {
            epoch: self.epoch,
            chunk_index: self.position,
            serial: self.serial,
        };

        debug!(
            "Speaking chunk {}/{} ({} chars)",
            self.position + 1,
            self.chunks.len(),
            text.chars().count()
        );

        let utterance = Utterance {
            ticket,
            text,
            rate: self.rate,
            voice: self.voice.clone(),
        };

        match self.engine.speak(utterance) {
            Ok(()) => {
                self.in_flight = Some(ticket);
                Ok(())
            }
            Err(e) => self.fail(ticket.chunk_index, e.0),
        }
    }

    /// Re-dispatch the current chunk with new rate or voice settings
    fn apply_prospectively(&mut self) -> Result<(), PlaybackError> {
        if self.in_flight.is_none() {
            return Ok(());
        }

        match self.status {
            PlaybackStatus::Playing => {
                self.cancel_in_flight();
                self.dispatch_current()
            }
            PlaybackStatus::Paused => {
                // Drop the suspended utterance so resume speaks it with the new settings
                self.cancel_in_flight();
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn complete(&mut self) {
        self.in_flight = None;
        self.position = self.chunks.len();
        self.status = PlaybackStatus::Completed;
        info!("Playback completed");
        self.publish_state();
    }

    fn fail(&mut self, chunk: usize, message: String) -> Result<(), PlaybackError> {
        error!("Speech failed on chunk {}: {}", chunk + 1, message);
        self.reset_session(PlaybackStatus::Idle);
        self.publish_state();

        let err = PlaybackError::Engine { chunk, message };
        self.notify(PlaybackNotice::Failed(err.clone()));
        Err(err)
    }

    fn ensure_supported(&mut self) -> Result<(), PlaybackError> {
        if self.status == PlaybackStatus::Unsupported {
            return self.reject(PlaybackError::UnsupportedEngine);
        }
        Ok(())
    }

    fn reject(&mut self, err: PlaybackError) -> Result<(), PlaybackError> {
        warn!("{}", err);
        self.notify(PlaybackNotice::Failed(err.clone()));
        Err(err)
    }

    fn cancel_in_flight(&mut self) {
        if self.in_flight.take().is_some() {
            self.engine.cancel();
        }
    }

    fn reset_session(&mut self, status: PlaybackStatus) {
        self.engine.cancel();
        self.in_flight = None;
        self.epoch += 1;
        self.chunks.clear();
        self.position = 0;
        self.status = status;
    }

    fn publish_state(&mut self) {
        let snapshot = self.snapshot();
        self.notify(PlaybackNotice::StateChanged(snapshot));
    }

    fn notify(&mut self, notice: PlaybackNotice) {
        for (_, observer) in self.observers.iter_mut() {
            observer(&notice);
        }
    }
}

impl<E: SpeechEngine> Drop for Sequencer<E> {
    fn drop(&mut self) {
        if self.in_flight.is_some() {
            self.engine.cancel();
        }
    }
}
