//! Decoder for the test generation stream.
//!
//! The backend answers `POST /ai/create-test-stream` with a chunked body of
//! Server-Sent-Event style lines:
//!
//! ```text
//! data: {"type":"question","data":{...}}
//! data: {"type":"initial_ready"}
//! data: {"type":"complete"}
//! ```
//!
//! Chunks may end anywhere, including inside a line or inside a multi-byte
//! character. [`StreamDecoder`] buffers bytes and only parses complete
//! lines; [`StreamDecoder::finish`] handles a trailing unterminated line.

use serde::Deserialize;
use serde_json::Value;

use skillup_core::normalize::{to_short_string, DEFAULT_SHORT_LEN};
use skillup_core::traits::StreamEvent;

/// Prefix marking a payload line.
pub const DATA_PREFIX: &str = "data: ";

const UNKNOWN_ERROR: &str = "Unknown error";

/// Splits a growing byte stream into complete lines.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buffer: Vec<u8>,
    /// Prefix of `buffer` already known to hold no newline.
    scanned: usize,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `chunk` and return every line it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut lines = Vec::new();
        let mut consumed = 0;
        let mut from = self.scanned;
        while let Some(pos) = self.buffer[from..].iter().position(|&b| b == b'\n') {
            let end = from + pos;
            lines.push(decode_line(&self.buffer[consumed..end]));
            consumed = end + 1;
            from = consumed;
        }
        self.buffer.drain(..consumed);
        self.scanned = self.buffer.len();
        lines
    }

    /// Take the unterminated remainder, if any.
    pub fn finish(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let line = decode_line(&self.buffer);
        self.buffer.clear();
        self.scanned = 0;
        Some(line)
    }

    /// Bytes waiting for a newline.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

// '\n' never occurs inside a multi-byte sequence, so a complete line is
// always complete UTF-8 unless the server sent garbage.
fn decode_line(bytes: &[u8]) -> String {
    let line = String::from_utf8_lossy(bytes);
    line.strip_suffix('\r').unwrap_or(&line).to_string()
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Envelope {
    Question {
        #[serde(default)]
        data: Value,
    },
    InitialReady,
    Complete,
    Error {
        #[serde(default)]
        message: Option<Value>,
    },
    #[serde(other)]
    Unknown,
}

/// Parse one line into an event.
///
/// Blank lines, lines without the data prefix, malformed JSON and unknown
/// envelope types all yield `None`.
pub fn parse_line(line: &str) -> Option<StreamEvent> {
    if line.trim().is_empty() {
        return None;
    }
    let payload = line.strip_prefix(DATA_PREFIX)?;

    let envelope = match serde_json::from_str::<Envelope>(payload) {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::warn!("skipping malformed stream line: {e}");
            return None;
        }
    };

    match envelope {
        Envelope::Question { data } => {
            let id = data.get("id").cloned().unwrap_or_default();
            tracing::debug!(%id, "question received");
            Some(StreamEvent::Question(data))
        }
        Envelope::InitialReady => Some(StreamEvent::InitialReady),
        Envelope::Complete => Some(StreamEvent::Complete),
        Envelope::Error { message } => {
            let message = message
                .map(|m| to_short_string(&m, DEFAULT_SHORT_LEN))
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| UNKNOWN_ERROR.to_string());
            Some(StreamEvent::Error(message))
        }
        Envelope::Unknown => {
            tracing::warn!("skipping stream envelope of unknown type");
            None
        }
    }
}

/// Turns response chunks into [`StreamEvent`]s.
///
/// Once a `complete` or `error` envelope is seen the decoder is finished
/// and drops everything after it.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    lines: LineDecoder,
    finished: bool,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        if self.finished {
            return Vec::new();
        }
        let lines = self.lines.push(chunk);
        self.decode(lines)
    }

    /// The body ended: parse whatever is left in the buffer.
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        if self.finished {
            return Vec::new();
        }
        let rest = self.lines.finish();
        self.decode(rest)
    }

    /// A `complete` or `error` envelope has been decoded.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn decode(&mut self, lines: impl IntoIterator<Item = String>) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        for line in lines {
            let Some(event) = parse_line(&line) else {
                continue;
            };
            let terminal = matches!(event, StreamEvent::Complete | StreamEvent::Error(_));
            events.push(event);
            if terminal {
                self.finished = true;
                break;
            }
        }
        events
    }
}
