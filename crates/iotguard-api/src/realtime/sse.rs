//! Server-sent-event framing and realtime event decoding.
//!
//! The database streams `text/event-stream` frames of the form
//!
//! ```text
//! event: put
//! data: {"path":"/","data":{"temperature":24.5}}
//! ```
//!
//! [`SseDecoder`] turns raw body chunks into [`SseFrame`]s (chunk
//! boundaries may fall anywhere, including inside a UTF-8 sequence), and
//! [`parse_event`] interprets a frame as a [`StreamEvent`].

use serde::Deserialize;
use serde_json::Value;

/// One dispatched server-sent event.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SseFrame {
    pub event: String,
    pub data: String,
}

/// Incremental `text/event-stream` decoder.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buf: Vec<u8>,
    event: String,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a body chunk, returning every frame completed by it.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buf.extend_from_slice(chunk);

        let mut frames = Vec::new();
        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buf.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(['\n', '\r']);
            if let Some(frame) = self.feed_line(line) {
                frames.push(frame);
            }
        }
        frames
    }

    fn feed_line(&mut self, line: &str) -> Option<SseFrame> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((f, v)) => (f, v.strip_prefix(' ').unwrap_or(v)),
            None => (line, ""),
        };
        match field {
            "event" => value.clone_into(&mut self.event),
            "data" => self.data.push(value.to_owned()),
            // id / retry are not used by the database protocol
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseFrame> {
        if self.event.is_empty() && self.data.is_empty() {
            return None;
        }
        let event = std::mem::take(&mut self.event);
        let data = std::mem::take(&mut self.data).join("\n");
        Some(SseFrame {
            event: if event.is_empty() {
                "message".into()
            } else {
                event
            },
            data,
        })
    }
}

// ── Realtime events ──────────────────────────────────────────────────

/// A decoded realtime database stream event.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Replace the value at `path` (relative to the subscribed location).
    Put { path: String, data: Value },
    /// Merge the children of `data` into the value at `path`.
    Patch { path: String, data: Value },
    KeepAlive,
    /// The server stopped the stream, usually because rules now deny access.
    Cancel(String),
    /// The token used to open the stream is no longer valid.
    AuthRevoked,
}

#[derive(Deserialize)]
struct Payload {
    path: String,
    #[serde(default)]
    data: Value,
}

/// Interpret a frame. Unknown event names and malformed payloads yield `None`.
pub fn parse_event(frame: &SseFrame) -> Option<StreamEvent> {
    match frame.event.as_str() {
        "put" | "patch" => {
            let payload: Payload = match serde_json::from_str(&frame.data) {
                Ok(p) => p,
                Err(e) => {
                    tracing::debug!(error = %e, event = %frame.event, "Malformed stream payload");
                    return None;
                }
            };
            Some(if frame.event == "put" {
                StreamEvent::Put {
                    path: payload.path,
                    data: payload.data,
                }
            } else {
                StreamEvent::Patch {
                    path: payload.path,
                    data: payload.data,
                }
            })
        }
        "keep-alive" => Some(StreamEvent::KeepAlive),
        "cancel" => Some(StreamEvent::Cancel(reason_text(&frame.data))),
        "auth_revoked" => Some(StreamEvent::AuthRevoked),
        other => {
            tracing::trace!(event = other, "Ignoring unknown stream event");
            None
        }
    }
}

fn reason_text(data: &str) -> String {
    match serde_json::from_str::<Value>(data) {
        Ok(Value::String(s)) => s,
        Ok(Value::Null) => "cancelled".into(),
        _ if data.trim().is_empty() => "cancelled".into(),
        _ => data.to_owned(),
    }
}
