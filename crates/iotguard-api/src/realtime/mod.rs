//! Realtime database access: one-shot REST reads/writes and a
//! server-sent-event subscription that keeps a local copy of a subtree.

mod client;
pub mod sse;
mod stream;
pub mod tree;

pub use client::RealtimeClient;
pub use sse::{SseDecoder, SseFrame, StreamEvent};
pub use stream::{ReconnectConfig, StreamHandle, calculate_backoff};
