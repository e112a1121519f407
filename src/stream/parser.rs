//! Incremental server-sent-event line parser
//!
//! Network reads may cut a line (or a UTF-8 sequence) anywhere, so the parser
//! buffers raw bytes and only decodes lines once their terminating newline has
//! arrived.

use tracing::debug;

use super::event::StreamEvent;

const DATA_PREFIX: &str = "data:";
const DONE_SENTINEL: &str = "[DONE]";

/// Push-based parser: feed it chunks, collect events in arrival order
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: Vec<u8>,
    skipped: usize,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume a chunk and return every event completed by it
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.buffer[start..].iter().position(|b| *b == b'\n') {
            let end = start + offset;
            let line = String::from_utf8_lossy(&self.buffer[start..end]).into_owned();
            if let Some(event) = self.parse_line(&line) {
                events.push(event);
            }
            start = end + 1;
        }
        self.buffer.drain(..start);

        events
    }

    /// Flush a final line that arrived without a trailing newline
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        if self.buffer.is_empty() {
            return Vec::new();
        }
        let rest = std::mem::take(&mut self.buffer);
        let line = String::from_utf8_lossy(&rest).into_owned();
        self.parse_line(&line).into_iter().collect()
    }

    /// Number of data frames that failed to decode
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Bytes held back waiting for a newline
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    fn parse_line(&mut self, raw: &str) -> Option<StreamEvent> {
        let line = raw.strip_suffix('\r').unwrap_or(raw);

        if line.trim().is_empty() || line.starts_with(':') {
            return None;
        }

        // event:, id:, retry: and anything unexpected are ignored
        let payload = line.strip_prefix(DATA_PREFIX)?;
        let payload = payload.strip_prefix(' ').unwrap_or(payload).trim_end();

        if payload.is_empty() || payload == DONE_SENTINEL {
            return None;
        }

        match serde_json::from_str::<StreamEvent>(payload) {
            Ok(event) => Some(event),
            Err(e) => {
                self.skipped += 1;
                debug!("Skipping malformed SSE frame: {}", e);
                None
            }
        }
    }
}

/// Parse a complete body in one go
pub fn parse_all(body: &[u8]) -> Vec<StreamEvent> {
    let mut parser = SseParser::new();
    let mut events = parser.feed(body);
    events.extend(parser.finish());
    events
}
