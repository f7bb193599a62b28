//! Incremental decoder for the `text/event-stream` body of `/v1/qa/stream`.
//!
//! Chunks may end anywhere: mid-line, mid-frame, or inside a multi-byte
//! character. The decoder buffers raw bytes and only decodes a line once its
//! terminating `\n` has arrived. `\n` never occurs inside a UTF-8 multi-byte
//! sequence, so splitting on bytes keeps characters intact and the emitted
//! events do not depend on how the stream was fragmented.

use tracing::{debug, warn};

use crate::event::StreamEvent;

const DATA_FIELD: &str = "data:";
const EVENT_FIELD: &str = "event:";

/// Classification of one complete stream line.
#[derive(Debug, PartialEq)]
pub enum SseLine<'a> {
    /// Empty or whitespace-only separator line.
    Blank,
    /// `event: <name>`; the name is not used for dispatch.
    EventName(&'a str),
    /// `data: <payload>` with the field prefix removed.
    Data(&'a str),
    /// Comments (`:`) and fields this client does not consume.
    Ignored,
}

impl<'a> SseLine<'a> {
    /// Classifies a single line without its trailing newline.
    pub fn classify(line: &'a str) -> Self {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.trim().is_empty() {
            SseLine::Blank
        } else if let Some(rest) = line.strip_prefix(DATA_FIELD) {
            SseLine::Data(rest.strip_prefix(' ').unwrap_or(rest))
        } else if let Some(rest) = line.strip_prefix(EVENT_FIELD) {
            SseLine::EventName(rest.trim())
        } else {
            SseLine::Ignored
        }
    }
}

/// Line-buffering decoder producing [`StreamEvent`]s.
#[derive(Debug, Default)]
pub struct SseDecoder {
    pending: Vec<u8>,
    skipped: usize,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a chunk and returns the events of every line it completed.
    ///
    /// The trailing incomplete fragment stays buffered for the next call.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        // Everything already pending is newline-free; only the new bytes are scanned.
        let appended_at = self.pending.len();
        self.pending.extend_from_slice(chunk);

        let Some(offset) = self.pending[appended_at..]
            .iter()
            .rposition(|b| *b == b'\n')
        else {
            return Vec::new();
        };
        let last_newline = appended_at + offset;

        let tail = self.pending.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.pending, tail);

        complete
            .split(|b| *b == b'\n')
            .filter_map(|raw| self.decode_line(raw))
            .collect()
    }

    /// Number of `data:` lines dropped because their payload was not valid JSON.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Ends decoding. An unterminated trailing line is dropped; a well-formed
    /// stream always ends with a newline-terminated `done` frame.
    ///
    /// Returns the number of discarded bytes.
    pub fn finish(self) -> usize {
        let leftover = self.pending.len();
        if leftover > 0 {
            debug!(bytes = leftover, "sse: discarding unterminated trailing line");
        }
        leftover
    }

    fn decode_line(&mut self, raw: &[u8]) -> Option<StreamEvent> {
        let text = String::from_utf8_lossy(raw);
        match SseLine::classify(&text) {
            SseLine::Data(payload) => match serde_json::from_str::<StreamEvent>(payload) {
                Ok(event) => Some(event),
                Err(err) => {
                    self.skipped += 1;
                    warn!(error = %err, payload = %payload, "sse: skipping malformed data line");
                    None
                }
            },
            SseLine::Blank | SseLine::EventName(_) | SseLine::Ignored => None,
        }
    }
}
