//! Transport commands from typed or transcribed phrases

use once_cell::sync::Lazy;
use regex::Regex;

use super::player::PlayerCommand;

static SET_RATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:speed|rate)\s+(?:to\s+)?(?P<rate>\d+(?:\.\d+)?)\s*x?$").expect("valid regex")
});

static SELECT_VOICE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:use\s+voice|voice|switch\s+to)\s+(?P<voice>.+)$").expect("valid regex")
});

/// A user intent for the player
#[derive(Debug, Clone, PartialEq)]
pub enum TransportCommand {
    Start,
    Pause,
    Resume,
    TogglePause,
    Restart,
    Faster,
    Slower,
    SetRate(f32),
    Voice(String),
    ListVoices,
    Quit,
}

impl TransportCommand {
    /// The player command for this intent; `None` for commands handled by
    /// the caller (`ListVoices`, `Quit`)
    pub fn to_player_command(&self, rate_step: f32) -> Option<PlayerCommand> {
        let command = match self {
            Self::Start => PlayerCommand::Start,
            Self::Pause => PlayerCommand::Pause,
            Self::Resume => PlayerCommand::Resume,
            Self::TogglePause => PlayerCommand::TogglePause,
            Self::Restart => PlayerCommand::Restart,
            Self::Faster => PlayerCommand::AdjustRate(rate_step),
            Self::Slower => PlayerCommand::AdjustRate(-rate_step),
            Self::SetRate(rate) => PlayerCommand::SetRate(*rate),
            Self::Voice(voice) => PlayerCommand::SelectVoice(voice.clone()),
            Self::ListVoices | Self::Quit => return None,
        };
        Some(command)
    }
}

/// Map a phrase to a command. Unknown phrases yield `None`.
///
/// Matching ignores case, surrounding whitespace and trailing punctuation,
/// so a speech transcript like "Pause." works as well as a typed `pause`.
pub fn parse_command(input: &str) -> Option<TransportCommand> {
    let trimmed = input
        .trim()
        .trim_end_matches(|c: char| matches!(c, '.' | '!' | '?' | ','))
        .trim();
    if trimmed.is_empty() {
        return None;
    }

    let phrase = trimmed.to_lowercase();
    let phrase = phrase.split_whitespace().collect::<Vec<_>>().join(" ");

    let command = match phrase.as_str() {
        "play" | "start" | "read" | "begin" => TransportCommand::Start,
        "pause" | "stop" | "wait" | "hold on" => TransportCommand::Pause,
        "resume" | "continue" | "go on" | "keep going" => TransportCommand::Resume,
        "p" | "toggle" => TransportCommand::TogglePause,
        "r" | "restart" | "start over" | "from the beginning" => TransportCommand::Restart,
        "+" | "faster" | "speed up" => TransportCommand::Faster,
        "-" | "slower" | "slow down" => TransportCommand::Slower,
        "v" | "voices" | "list voices" => TransportCommand::ListVoices,
        "q" | "quit" | "exit" => TransportCommand::Quit,
        _ => {
            if let Some(captures) = SET_RATE.captures(&phrase) {
                let rate = captures.name("rate")?.as_str().parse().ok()?;
                return Some(TransportCommand::SetRate(rate));
            }

            // Voice ids can be case-sensitive, capture from the original text
            let captures = SELECT_VOICE.captures(trimmed)?;
            return Some(TransportCommand::Voice(captures.name("voice")?.as_str().trim().to_string()));
        }
    };

    Some(command)
}
