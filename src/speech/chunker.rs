/*!
 * Sentence-aware text chunking for speech synthesis.
 *
 * Speech engines choke on very long utterances, so text is handed to them in
 * chunks of bounded length. Chunks only break at sentence-terminal
 * punctuation; a single sentence longer than the limit becomes an oversized
 * chunk rather than being cut mid-sentence.
 */

use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;

// A run of `.`, `!` or `?`, any closing quotes or brackets, then whitespace
// or the end of the text
static SENTENCE_END: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"[.!?]+["')\]\x{201D}\x{2019}\x{00BB}]*(?:\s+|$)"#).expect("valid regex")
});

/// Default maximum characters per chunk
pub const DEFAULT_MAX_CHUNK_CHARS: usize = 200;

/// Greedy sentence chunker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    max_chars: usize,
}

impl Default for Chunker {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CHUNK_CHARS)
    }
}

impl Chunker {
    /// Create a chunker; `max_chars` below 1 is treated as 1
    pub fn new(max_chars: usize) -> Self {
        Self {
            max_chars: max_chars.max(1),
        }
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    /// Split `text` into chunks of at most `max_chars` characters.
    ///
    /// Whitespace-only input yields no chunks. Input without any sentence
    /// boundary is returned as one chunk, whatever its length.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        let chunks = chunk_text(text, self.max_chars);

        if is_degenerate(text) {
            warn!(
                "No sentence boundaries found, reading {} characters as a single chunk",
                text.trim().chars().count()
            );
        } else {
            debug!("Split {} characters into {} chunks", text.chars().count(), chunks.len());
        }

        chunks
    }
}

/// Whether `text` has content but not a single sentence boundary
pub fn is_degenerate(text: &str) -> bool {
    !text.trim().is_empty() && !SENTENCE_END.is_match(text)
}

/// Split text into trimmed sentence units, keeping every character.
///
/// Terminal punctuation only ends a sentence when whitespace or the end of
/// the text follows, so `3.14` or `e.g.x` never split a word.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;

    for boundary in SENTENCE_END.find_iter(text) {
        push_trimmed(&mut sentences, &text[start..boundary.end()]);
        start = boundary.end();
    }

    push_trimmed(&mut sentences, &text[start..]);
    sentences
}

fn push_trimmed<'a>(sentences: &mut Vec<&'a str>, candidate: &'a str) {
    let trimmed = candidate.trim();
    if !trimmed.is_empty() {
        sentences.push(trimmed);
    }
}

/// Greedily pack sentences into chunks of at most `max_chars` characters.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut buffer = String::new();
    let mut buffer_chars = 0usize;

    for sentence in split_sentences(text) {
        let sentence_chars = sentence.chars().count();

        if buffer.is_empty() {
            buffer.push_str(sentence);
            buffer_chars = sentence_chars;
            continue;
        }

        // +1 for the joining space
        if buffer_chars + 1 + sentence_chars > max_chars {
            chunks.push(std::mem::take(&mut buffer));
            buffer.push_str(sentence);
            buffer_chars = sentence_chars;
        } else {
            buffer.push(' ');
            buffer.push_str(sentence);
            buffer_chars += 1 + sentence_chars;
        }
    }

    if !buffer.is_empty() {
        chunks.push(buffer);
    }

    chunks
}
