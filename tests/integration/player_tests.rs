/*!
 * Integration tests driving a spawned player through its channels
 */

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

use readaloud::errors::PlaybackError;
use readaloud::speech::{
    EngineCapabilities, EngineEvent, PlaybackNotice, PlaybackSnapshot, PlaybackStatus, Player, PlayerCommand,
    Sequencer, SequencerOptions,
};

use crate::common::mock_engines::{EngineCall, RecordingEngine, last_spoken, spoken};
use crate::common;

const THREE_SENTENCES: &str = "First sentence here. Second sentence here. Third sentence here.";

struct Harness {
    player: Player,
    events: mpsc::UnboundedSender<EngineEvent>,
    calls: std::sync::Arc<parking_lot::Mutex<Vec<EngineCall>>>,
}

impl Harness {
    fn spawn(engine: RecordingEngine, text: &str) -> Self {
        common::init_logging();
        let calls = engine.calls();
        let (events, event_rx) = mpsc::unbounded_channel();

        let options = SequencerOptions {
            max_chunk_chars: 25,
            ..SequencerOptions::default()
        };
        let mut sequencer = Sequencer::new(engine, options);
        sequencer.voices_changed(common::sample_voices());
        sequencer.load(text);

        Self {
            player: Player::spawn(sequencer, event_rx),
            events,
            calls,
        }
    }

    fn send(&self, command: PlayerCommand) {
        self.player.handle.send(command).unwrap();
    }

    /// Next state change, skipping other notices
    async fn next_state(&mut self) -> PlaybackSnapshot {
        loop {
            let notice = timeout(Duration::from_secs(2), self.player.notices.recv())
                .await
                .expect("timed out waiting for a notice")
                .expect("player closed");
            if let PlaybackNotice::StateChanged(snapshot) = notice {
                return snapshot;
            }
        }
    }

    /// Next failure notice, skipping state changes
    async fn next_failure(&mut self) -> PlaybackError {
        loop {
            let notice = timeout(Duration::from_secs(2), self.player.notices.recv())
                .await
                .expect("timed out waiting for a notice")
                .expect("player closed");
            if let PlaybackNotice::Failed(err) = notice {
                return err;
            }
        }
    }

    /// Report the most recent utterance as finished
    fn finish_current(&self) {
        let utterance = last_spoken(&self.calls).expect("nothing was spoken");
        self.events.send(EngineEvent::finished(utterance.ticket)).unwrap();
    }
}

#[tokio::test]
async fn test_player_withThreeChunks_shouldProgressToCompletion() {
    let mut harness = Harness::spawn(RecordingEngine::new(), THREE_SENTENCES);

    harness.send(PlayerCommand::Start);
    let started = harness.next_state().await;
    assert_eq!(started.status, PlaybackStatus::Playing);
    assert_eq!((started.position, started.total), (0, 3));

    let mut percents = Vec::new();
    for _ in 0..3 {
        harness.finish_current();
        percents.push(harness.next_state().await.rounded_percent());
    }

    assert_eq!(percents, vec![33, 67, 100]);
    assert_eq!(harness.player.handle.snapshot().status, PlaybackStatus::Completed);

    let texts: Vec<String> = spoken(&harness.calls).into_iter().map(|u| u.text).collect();
    assert_eq!(
        texts,
        vec!["First sentence here.", "Second sentence here.", "Third sentence here."]
    );
    assert!(spoken(&harness.calls).iter().all(|u| u.voice.as_ref().map(|v| v.id.as_str()) == Some("gmw/en-US")));

    harness.send(PlayerCommand::Shutdown);
    harness.player.join().await.unwrap();
}

/// A late event from before a restart must not move the new session
#[tokio::test]
async fn test_player_withStaleEventAfterRestart_shouldIgnoreEvent() {
    let mut harness = Harness::spawn(RecordingEngine::new(), THREE_SENTENCES);

    harness.send(PlayerCommand::Start);
    harness.next_state().await;
    let old = last_spoken(&harness.calls).unwrap();

    harness.send(PlayerCommand::Restart);
    let restarted = harness.next_state().await;
    assert_eq!(restarted.status, PlaybackStatus::Idle);
    assert_eq!(restarted.percent, 0.0);

    harness.send(PlayerCommand::Start);
    let started = harness.next_state().await;
    assert!(started.epoch > old.ticket.epoch);

    // Events are applied in order: the stale one first, then the real one
    harness.events.send(EngineEvent::finished(old.ticket)).unwrap();
    harness.finish_current();

    let advanced = harness.next_state().await;
    assert_eq!(advanced.position, 1);
    assert_eq!(advanced.status, PlaybackStatus::Playing);
    assert_eq!(harness.player.handle.snapshot().position, 1);
}

#[tokio::test]
async fn test_player_withTogglePause_shouldRespeakChunkOnResume() {
    let mut harness = Harness::spawn(RecordingEngine::new(), THREE_SENTENCES);

    harness.send(PlayerCommand::TogglePause);
    assert_eq!(harness.next_state().await.status, PlaybackStatus::Playing);
    harness.finish_current();
    assert_eq!(harness.next_state().await.position, 1);

    harness.send(PlayerCommand::TogglePause);
    let paused = harness.next_state().await;
    assert_eq!(paused.status, PlaybackStatus::Paused);
    assert_eq!(paused.position, 1);
    assert!(harness.calls.lock().contains(&EngineCall::Cancel));

    harness.send(PlayerCommand::TogglePause);
    assert_eq!(harness.next_state().await.status, PlaybackStatus::Playing);

    let texts: Vec<String> = spoken(&harness.calls).into_iter().map(|u| u.text).collect();
    assert_eq!(
        texts,
        vec!["First sentence here.", "Second sentence here.", "Second sentence here."]
    );
}

#[tokio::test]
async fn test_player_withEnginePause_shouldSuspendWithoutRespeaking() {
    let mut harness = Harness::spawn(RecordingEngine::with_pause(), THREE_SENTENCES);

    harness.send(PlayerCommand::Start);
    harness.next_state().await;
    harness.send(PlayerCommand::Pause);
    harness.next_state().await;
    harness.send(PlayerCommand::Resume);
    harness.next_state().await;

    let calls = harness.calls.lock().clone();
    assert!(calls.contains(&EngineCall::Pause));
    assert!(calls.contains(&EngineCall::Resume));
    assert_eq!(spoken(&harness.calls).len(), 1);
}

/// Changing the rate mid-chunk speaks the chunk again at the new rate
#[tokio::test]
async fn test_player_withRateChangeWhilePlaying_shouldRedispatchCurrentChunk() {
    let mut harness = Harness::spawn(RecordingEngine::new(), THREE_SENTENCES);

    harness.send(PlayerCommand::Start);
    harness.next_state().await;
    let first = last_spoken(&harness.calls).unwrap();

    harness.send(PlayerCommand::AdjustRate(0.5));
    let faster = harness.next_state().await;
    assert_eq!(faster.rate, 1.5);

    let second = last_spoken(&harness.calls).unwrap();
    assert_eq!(second.text, first.text);
    assert_eq!(second.rate, 1.5);
    assert_ne!(second.ticket, first.ticket);

    // The cancelled utterance reporting late changes nothing
    harness.events.send(EngineEvent::finished(first.ticket)).unwrap();
    harness.finish_current();
    assert_eq!(harness.next_state().await.position, 1);
}

#[tokio::test]
async fn test_player_withVoiceSelection_shouldUseVoiceForNextUtterance() {
    let mut harness = Harness::spawn(RecordingEngine::new(), THREE_SENTENCES);

    harness.send(PlayerCommand::SelectVoice("french (france)".to_string()));
    harness.send(PlayerCommand::Start);
    harness.next_state().await;

    let utterance = last_spoken(&harness.calls).unwrap();
    assert_eq!(utterance.voice.map(|v| v.id), Some("roa/fr".to_string()));
}

#[tokio::test]
async fn test_player_withEngineFailure_shouldReturnToIdleAndNotify() {
    let mut harness = Harness::spawn(RecordingEngine::new(), THREE_SENTENCES);

    harness.send(PlayerCommand::Start);
    harness.next_state().await;
    let utterance = last_spoken(&harness.calls).unwrap();
    harness
        .events
        .send(EngineEvent::failed(utterance.ticket, "device lost"))
        .unwrap();

    let err = harness.next_failure().await;
    assert!(matches!(err, PlaybackError::Engine { chunk: 0, .. }));
    assert_eq!(harness.player.handle.snapshot().status, PlaybackStatus::Idle);
}

#[tokio::test]
async fn test_player_withoutSynthesis_shouldRejectStart() {
    let engine = RecordingEngine::with_capabilities(EngineCapabilities::unsupported());
    let mut harness = Harness::spawn(engine, THREE_SENTENCES);

    harness.send(PlayerCommand::Start);
    assert_eq!(harness.next_failure().await, PlaybackError::UnsupportedEngine);
    assert_eq!(harness.player.handle.snapshot().status, PlaybackStatus::Unsupported);
    assert!(spoken(&harness.calls).is_empty());
}

#[tokio::test]
async fn test_player_withShutdownWhilePlaying_shouldCancelAndClose() {
    let mut harness = Harness::spawn(RecordingEngine::new(), THREE_SENTENCES);

    harness.send(PlayerCommand::Start);
    harness.next_state().await;

    let handle = harness.player.handle.clone();
    handle.send(PlayerCommand::Shutdown).unwrap();
    harness.player.join().await.unwrap();

    assert_eq!(handle.snapshot().status, PlaybackStatus::Idle);
    assert!(handle.is_closed());
    assert_eq!(harness.calls.lock().last(), Some(&EngineCall::Cancel));
}
