//! Incremental decoder for `data: <json>\n\n` chat-completion streams.
//!
//! Reads may split a frame, its delimiter or the JSON inside it anywhere, so
//! bytes are buffered until a `\n\n` delimiter arrives. The events produced
//! depend only on the concatenated input, never on how it was chunked.

use super::StreamEvent;
use serde::Deserialize;

const FRAME_DELIMITER: &[u8] = b"\n\n";
const DONE_SENTINEL: &str = "[DONE]";

#[derive(Debug, Deserialize)]
struct Chunk {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    delta: Delta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    /// Payload that failed to decode, waiting for the rest of its JSON
    carried: String,
    finished: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `Done` or `Error` has been emitted
    pub const fn is_finished(&self) -> bool {
        self.finished
    }

    /// Consume one read; returns the events completed by it
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        if self.finished {
            return events;
        }
        self.buffer.extend_from_slice(bytes);

        while let Some(pos) = find_delimiter(&self.buffer) {
            let frame: Vec<u8> = self.buffer.drain(..pos + FRAME_DELIMITER.len()).collect();
            self.decode_frame(&frame[..pos], &mut events);
            if self.finished {
                self.buffer.clear();
                break;
            }
        }
        events
    }

    /// End of body: interpret any unterminated frame once, then `Done`
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        if self.finished {
            return events;
        }

        let residual = std::mem::take(&mut self.buffer);
        if !residual.iter().all(u8::is_ascii_whitespace) {
            self.decode_frame(&residual, &mut events);
        }
        if !self.finished {
            if !self.carried.is_empty() {
                tracing::warn!(fragment = %self.carried, "stream ended inside a payload");
                self.carried.clear();
            }
            events.push(StreamEvent::Done);
            self.finished = true;
        }
        events
    }

    fn decode_frame(&mut self, raw: &[u8], events: &mut Vec<StreamEvent>) {
        let text = String::from_utf8_lossy(raw);
        let payload = strip_marker(&text);
        if payload.is_empty() {
            return;
        }
        if payload == DONE_SENTINEL {
            events.push(StreamEvent::Done);
            self.finished = true;
            return;
        }

        if self.carried.is_empty() {
            match serde_json::from_str::<Chunk>(payload) {
                Ok(chunk) => self.emit(chunk, events),
                Err(_) => self.carried = payload.to_string(),
            }
            return;
        }

        // The delimiter fell inside a JSON value: restore it and retry
        let joined = format!("{}\n\n{payload}", self.carried);
        match serde_json::from_str::<Chunk>(&joined) {
            Ok(chunk) => {
                self.carried.clear();
                self.emit(chunk, events);
            }
            Err(_) => match serde_json::from_str::<Chunk>(payload) {
                Ok(chunk) => {
                    tracing::warn!(fragment = %self.carried, "dropping undecodable stream fragment");
                    self.carried.clear();
                    self.emit(chunk, events);
                }
                Err(_) => self.carried = joined,
            },
        }
    }

    fn emit(&mut self, chunk: Chunk, events: &mut Vec<StreamEvent>) {
        let Some(choice) = chunk.choices.into_iter().next() else {
            let message = chunk
                .error
                .as_ref()
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .unwrap_or("response data error")
                .to_string();
            events.push(StreamEvent::Error(message));
            self.finished = true;
            return;
        };

        if let Some(reason) = choice.finish_reason {
            tracing::debug!(%reason, "completion finished");
        }
        if let Some(content) = choice.delta.content.filter(|c| !c.is_empty()) {
            events.push(StreamEvent::Data(content));
        }
    }
}

fn find_delimiter(buffer: &[u8]) -> Option<usize> {
    buffer
        .windows(FRAME_DELIMITER.len())
        .position(|window| window == FRAME_DELIMITER)
}

fn strip_marker(frame: &str) -> &str {
    let frame = frame.trim_matches(|c| c == '\r' || c == '\n');
    match frame.strip_prefix("data:") {
        Some(rest) => rest.strip_prefix(' ').unwrap_or(rest),
        None => frame,
    }
}
