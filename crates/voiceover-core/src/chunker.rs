//! Script chunking for request-size-limited speech APIs.
//!
//! Long scripts are cut into bounded chunks at the most natural boundary
//! available inside the size window: paragraph break, line break, sentence
//! end, word gap, and only as a last resort a hard cut.

use crate::error::{VoiceoverError, VoiceoverResult};
use serde::{Deserialize, Serialize};

/// Soft lower bound on chunk length, in characters
pub const MIN_CHUNK_SIZE: usize = 500;

/// Hard upper bound on chunk length, in characters
pub const MAX_CHUNK_SIZE: usize = 1900;

/// Size window used when searching for a break point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkBounds {
    /// Break points before this many characters are ignored
    pub min: usize,
    /// No chunk is longer than this many characters
    pub max: usize,
}

impl Default for ChunkBounds {
    fn default() -> Self {
        Self {
            min: MIN_CHUNK_SIZE,
            max: MAX_CHUNK_SIZE,
        }
    }
}

impl ChunkBounds {
    /// Create validated bounds
    ///
    /// # Errors
    ///
    /// Returns an error unless `0 < min < max`
    pub fn new(min: usize, max: usize) -> VoiceoverResult<Self> {
        let bounds = Self { min, max };
        bounds.validate()?;
        Ok(bounds)
    }

    /// Validate the bounds
    ///
    /// # Errors
    ///
    /// Returns an error unless `0 < min < max`
    pub fn validate(&self) -> VoiceoverResult<()> {
        if self.min == 0 {
            return Err(VoiceoverError::invalid_input(
                "Minimum chunk size must be greater than 0",
            ));
        }
        if self.max <= self.min {
            return Err(VoiceoverError::invalid_input(format!(
                "Maximum chunk size ({}) must be greater than minimum ({})",
                self.max, self.min
            )));
        }
        Ok(())
    }
}

/// One bounded slice of the input script
///
/// `start..end` are byte offsets into the original input and cover the raw
/// slice the chunk was cut from, whitespace included; `text` is that slice
/// trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    /// Trimmed, non-empty chunk content
    pub text: String,
    /// Byte offset where the raw slice starts
    pub start: usize,
    /// Byte offset where the raw slice ends (exclusive)
    pub end: usize,
}

/// Splits scripts into chunks within a [`ChunkBounds`] window
#[derive(Debug, Clone, Copy, Default)]
pub struct TextChunker {
    bounds: ChunkBounds,
}

impl TextChunker {
    /// Create a chunker with custom bounds
    ///
    /// # Errors
    ///
    /// Returns an error if the bounds are invalid
    pub fn new(bounds: ChunkBounds) -> VoiceoverResult<Self> {
        bounds.validate()?;
        Ok(Self { bounds })
    }

    /// Bounds this chunker cuts with
    #[must_use]
    pub const fn bounds(&self) -> ChunkBounds {
        self.bounds
    }

    /// Split `text` into ordered chunks
    ///
    /// Empty or all-whitespace input yields no chunks.
    #[must_use]
    pub fn chunk(&self, text: &str) -> Vec<TextChunk> {
        let mut chunks = Vec::new();
        let mut offset = 0;

        while offset < text.len() {
            let remaining = &text[offset..];

            // Byte index of the (max)th char exists only when more than `max` chars remain.
            let Some((window_end, _)) = remaining.char_indices().nth(self.bounds.max) else {
                push_trimmed(&mut chunks, remaining, offset, text.len());
                break;
            };

            let min_byte = remaining
                .char_indices()
                .nth(self.bounds.min)
                .map_or(window_end, |(idx, _)| idx);

            let cut = find_break_point(&remaining[..window_end], min_byte);
            push_trimmed(&mut chunks, &remaining[..cut], offset, offset + cut);
            offset += cut;
        }

        chunks
    }
}

/// Split `text` with the default 500/1900 character bounds
#[must_use]
pub fn chunk_text(text: &str) -> Vec<TextChunk> {
    TextChunker::default().chunk(text)
}

fn push_trimmed(chunks: &mut Vec<TextChunk>, raw: &str, start: usize, end: usize) {
    let trimmed = raw.trim();
    if !trimmed.is_empty() {
        chunks.push(TextChunk {
            text: trimmed.to_string(),
            start,
            end,
        });
    }
}

/// Choose where to end the chunk inside `window`.
///
/// Returns a byte length in `1..=window.len()`; every candidate other than
/// the hard cut ends at or after `min`.
fn find_break_point(window: &str, min: usize) -> usize {
    if let Some(idx) = window.rfind("\n\n") {
        if idx >= min {
            return idx + 2;
        }
    }

    if let Some(idx) = window.rfind('\n') {
        if idx >= min {
            return idx + 1;
        }
    }

    if let Some(end) = last_sentence_end(window, min) {
        return end;
    }

    if let Some(idx) = window.rfind(' ') {
        if idx >= min {
            return idx + 1;
        }
    }

    window.len()
}

/// Last `.`, `!` or `?` at or after `min`, optionally followed by a closing
/// quote, that is followed by whitespace or the end of the window.
fn last_sentence_end(window: &str, min: usize) -> Option<usize> {
    let bytes = window.as_bytes();

    (min..bytes.len()).rev().find_map(|idx| {
        if !matches!(bytes[idx], b'.' | b'!' | b'?') {
            return None;
        }

        let mut end = idx + 1;
        if matches!(bytes.get(end), Some(b'"' | b'\'')) {
            end += 1;
        }

        window[end..]
            .chars()
            .next()
            .map_or(true, char::is_whitespace)
            .then_some(end)
    })
}
