/*!
 * Async driver for the playback sequencer.
 *
 * The sequencer is synchronous and not shareable, so a single tokio task owns
 * it. Transport commands from the user and completion events from the speech
 * engine arrive on two channels and are applied one at a time, which keeps
 * every state transition serialized without any locking around the state
 * machine itself.
 */

use anyhow::{Result, anyhow};
use log::{debug, trace};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::sequencer::{PlaybackNotice, PlaybackSnapshot, Sequencer};
use super::{EngineEvent, SpeechEngine, VoiceProfile};

/// Commands accepted by a running player
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerCommand {
    /// Replace the document, resetting any session
    Load(String),
    Start,
    Pause,
    Resume,
    /// Pause when playing, resume when paused, start otherwise
    TogglePause,
    Restart,
    SetRate(f32),
    AdjustRate(f32),
    SelectVoice(String),
    VoicesChanged(Vec<VoiceProfile>),
    Shutdown,
}

/// Cloneable handle for sending commands to a player and reading its state
#[derive(Debug, Clone)]
pub struct PlayerHandle {
    commands: mpsc::UnboundedSender<PlayerCommand>,
    snapshot: Arc<Mutex<PlaybackSnapshot>>,
}

impl PlayerHandle {
    pub fn send(&self, command: PlayerCommand) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| anyhow!("Player has shut down"))
    }

    /// The state after the last processed command or event
    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.snapshot.lock().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }
}

/// A spawned player task
pub struct Player {
    pub handle: PlayerHandle,
    /// Every notice the sequencer publishes, in order
    pub notices: mpsc::UnboundedReceiver<PlaybackNotice>,
    task: JoinHandle<()>,
}

impl Player {
    /// Move `sequencer` into a new task.
    ///
    /// `events` must be the receiving end of the channel the sequencer's
    /// engine reports utterance outcomes on. Must be called inside a tokio
    /// runtime.
    pub fn spawn<E>(mut sequencer: Sequencer<E>, events: mpsc::UnboundedReceiver<EngineEvent>) -> Self
    where
        E: SpeechEngine + 'static,
    {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (notice_tx, notice_rx) = mpsc::unbounded_channel();

        sequencer.subscribe(move |notice| {
            let _ = notice_tx.send(notice.clone());
        });

        let snapshot = Arc::new(Mutex::new(sequencer.snapshot()));
        let task = tokio::spawn(run(sequencer, command_rx, events, snapshot.clone()));

        Self {
            handle: PlayerHandle {
                commands: command_tx,
                snapshot,
            },
            notices: notice_rx,
            task,
        }
    }

    /// Wait for the player task to exit after `Shutdown`
    pub async fn join(self) -> Result<()> {
        self.task.await.map_err(|e| anyhow!("Player task failed: {}", e))
    }
}

async fn run<E: SpeechEngine>(
    mut sequencer: Sequencer<E>,
    mut commands: mpsc::UnboundedReceiver<PlayerCommand>,
    mut events: mpsc::UnboundedReceiver<EngineEvent>,
    snapshot: Arc<Mutex<PlaybackSnapshot>>,
) {
    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(PlayerCommand::Shutdown) | None => break,
                Some(command) => apply(&mut sequencer, command),
            },
            Some(event) = events.recv() => {
                trace!("Engine event {:?}", event);
                // Failures are already published as notices
                let _ = sequencer.handle_event(event);
            }
        }

        *snapshot.lock() = sequencer.snapshot();
    }

    debug!("Player shutting down");
    sequencer.shutdown();
    *snapshot.lock() = sequencer.snapshot();
}

fn apply<E: SpeechEngine>(sequencer: &mut Sequencer<E>, command: PlayerCommand) {
    trace!("Player command {:?}", command);

    let result = match command {
        PlayerCommand::Load(text) => {
            sequencer.load(text);
            Ok(())
        }
        PlayerCommand::Start => sequencer.start(),
        PlayerCommand::Pause => sequencer.pause(),
        PlayerCommand::Resume => sequencer.resume(),
        PlayerCommand::TogglePause => sequencer.toggle(),
        PlayerCommand::Restart => sequencer.restart(),
        PlayerCommand::SetRate(rate) => sequencer.set_rate(rate),
        PlayerCommand::AdjustRate(delta) => sequencer.adjust_rate(delta),
        PlayerCommand::SelectVoice(voice) => sequencer.select_voice(&voice),
        PlayerCommand::VoicesChanged(voices) => {
            sequencer.voices_changed(voices);
            Ok(())
        }
        PlayerCommand::Shutdown => Ok(()),
    };

    if let Err(e) = result {
        debug!("Command rejected: {}", e);
    }
}
