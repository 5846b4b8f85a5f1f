//! Event-stream subscription with auto-reconnect.
//!
//! Opens a `text/event-stream` request against a database location and
//! folds `put` / `patch` events into a local JSON tree. Every change to
//! the tree is published as a full snapshot through a
//! [`tokio::sync::watch`] channel. Handles reconnection with exponential
//! backoff + jitter automatically, asking the [`TokenProvider`] for a
//! fresh ID token on every attempt.
//!
//! # Example
//!
//! ```rust,ignore
//! use iotguard_api::{RealtimeClient, ReconnectConfig, StaticToken};
//! use tokio_util::sync::CancellationToken;
//!
//! let handle = client.stream(
//!     "sensors",
//!     Arc::new(StaticToken::default()),
//!     ReconnectConfig::default(),
//!     CancellationToken::new(),
//! )?;
//! let mut rx = handle.subscribe();
//! while rx.changed().await.is_ok() {
//!     println!("{:?}", *rx.borrow());
//! }
//! handle.shutdown();
//! ```

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use secrecy::ExposeSecret;
use serde_json::Value;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use url::Url;

use super::sse::{SseDecoder, StreamEvent, parse_event};
use super::tree;
use crate::error::Error;
use crate::token::TokenProvider;

// ── ReconnectConfig ──────────────────────────────────────────────────

/// Exponential backoff configuration for stream reconnection.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt. Default: 1s.
    pub initial_delay: Duration,

    /// Upper bound on backoff delay. Default: 30s.
    pub max_delay: Duration,

    /// Maximum consecutive failed attempts before giving up.
    /// `None` means retry forever.
    pub max_retries: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_retries: None,
        }
    }
}

// ── StreamHandle ─────────────────────────────────────────────────────

/// Handle to a running subscription.
///
/// The snapshot is `None` until the first `put` arrives and whenever the
/// location holds no data.
pub struct StreamHandle {
    rx: watch::Receiver<Option<Value>>,
    cancel: CancellationToken,
}

impl StreamHandle {
    /// Spawn the reconnection loop. Returns immediately; the first
    /// connection attempt happens in the background.
    pub(crate) fn spawn(
        http: reqwest::Client,
        url: Url,
        tokens: Arc<dyn TokenProvider>,
        reconnect: ReconnectConfig,
        cancel: CancellationToken,
    ) -> Self {
        let (tx, rx) = watch::channel(None);

        let task_cancel = cancel.clone();
        tokio::spawn(async move {
            stream_loop(&http, &url, &*tokens, &tx, &reconnect, &task_cancel).await;
        });

        Self { rx, cancel }
    }

    /// A new receiver for the snapshot channel.
    pub fn subscribe(&self) -> watch::Receiver<Option<Value>> {
        self.rx.clone()
    }

    /// The most recent snapshot.
    pub fn latest(&self) -> Option<Value> {
        self.rx.borrow().clone()
    }

    /// Signal the background task to stop.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Split into the snapshot receiver and the stop token.
    pub fn into_parts(self) -> (watch::Receiver<Option<Value>>, CancellationToken) {
        (self.rx, self.cancel)
    }
}

// ── Background reconnection loop ─────────────────────────────────────

/// Main loop: connect → read → on error, backoff → reconnect.
async fn stream_loop(
    http: &reqwest::Client,
    url: &Url,
    tokens: &dyn TokenProvider,
    tx: &watch::Sender<Option<Value>>,
    reconnect: &ReconnectConfig,
    cancel: &CancellationToken,
) {
    let mut attempt: u32 = 0;

    loop {
        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = tx.closed() => break,
            result = connect_and_read(http, url, tokens, tx, cancel) => result,
        };

        // `connect_and_read` returns Ok(()) when cancelled mid-read.
        if cancel.is_cancelled() {
            break;
        }

        let delay = match result {
            // Server ended the response body. Reconnect after the base delay.
            Ok(()) => {
                tracing::info!(path = url.path(), "Event stream ended, reconnecting");
                attempt = 0;
                reconnect.initial_delay
            }
            Err(e) => {
                tracing::warn!(error = %e, attempt, path = url.path(), "Event stream error");

                if let Some(max) = reconnect.max_retries {
                    if attempt >= max {
                        tracing::error!(
                            max_retries = max,
                            "Event stream reconnection limit reached, giving up"
                        );
                        break;
                    }
                }

                let delay = calculate_backoff(attempt, reconnect);
                attempt += 1;
                delay
            }
        };

        tracing::debug!(
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            attempt,
            "Waiting before reconnect"
        );
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(delay) => {}
        }
    }

    tracing::debug!(path = url.path(), "Event stream loop exiting");
}

// ── Single connection lifecycle ──────────────────────────────────────

/// Open one streaming request and fold events until it drops.
async fn connect_and_read(
    http: &reqwest::Client,
    url: &Url,
    tokens: &dyn TokenProvider,
    tx: &watch::Sender<Option<Value>>,
    cancel: &CancellationToken,
) -> Result<(), Error> {
    let mut request_url = url.clone();
    if let Some(token) = tokens.id_token().await? {
        request_url
            .query_pairs_mut()
            .append_pair("auth", token.expose_secret());
    }

    tracing::info!(path = url.path(), "Opening event stream");
    let resp = http
        .get(request_url)
        .header(reqwest::header::ACCEPT, "text/event-stream")
        .send()
        .await
        .map_err(|e| Error::StreamConnect(e.to_string()))?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(Error::StreamConnect(format!("HTTP {status}: {body}")));
    }

    let mut body = resp.bytes_stream();
    let mut decoder = SseDecoder::new();
    let mut local = Value::Null;

    loop {
        let chunk = tokio::select! {
            biased;
            () = cancel.cancelled() => return Ok(()),
            chunk = body.next() => chunk,
        };

        let bytes = match chunk {
            Some(Ok(bytes)) => bytes,
            Some(Err(e)) => return Err(Error::StreamConnect(e.to_string())),
            None => return Ok(()),
        };

        for frame in decoder.push(&bytes) {
            match parse_event(&frame) {
                Some(StreamEvent::Put { path, data }) => {
                    tree::apply_put(&mut local, &path, data);
                    publish(tx, &local);
                }
                Some(StreamEvent::Patch { path, data }) => {
                    tree::apply_patch(&mut local, &path, data);
                    publish(tx, &local);
                }
                Some(StreamEvent::KeepAlive) => tracing::trace!("Event stream keep-alive"),
                Some(StreamEvent::Cancel(reason)) => {
                    return Err(Error::StreamClosed { reason });
                }
                Some(StreamEvent::AuthRevoked) => {
                    return Err(Error::StreamClosed {
                        reason: "auth_revoked".into(),
                    });
                }
                None => {}
            }
        }
    }
}

/// Publish the tree if it differs from what subscribers last saw.
fn publish(tx: &watch::Sender<Option<Value>>, local: &Value) {
    let next = if local.is_null() {
        None
    } else {
        Some(local.clone())
    };
    tx.send_if_modified(|current| {
        if *current == next {
            false
        } else {
            *current = next;
            true
        }
    });
}

// ── Backoff calculation ──────────────────────────────────────────────

/// Exponential backoff with jitter.
///
/// `delay = min(initial * 2^attempt, max) * jitter`
///
/// Jitter is +-25% to spread out reconnection storms from many clients.
pub fn calculate_backoff(attempt: u32, config: &ReconnectConfig) -> Duration {
    let exp = i32::try_from(attempt.min(31)).unwrap_or(31);
    let base = config.initial_delay.as_secs_f64() * 2.0_f64.powi(exp);
    let capped = base.min(config.max_delay.as_secs_f64());

    // Deterministic "jitter" seeded from the attempt number.
    let jitter_factor = 1.0 + 0.25 * (f64::from(attempt) * 7.3).sin();
    let with_jitter = (capped * jitter_factor).max(0.0);

    Duration::from_secs_f64(with_jitter)
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn default_reconnect_config() {
        let config = ReconnectConfig::default();
        assert_eq!(config.initial_delay, Duration::from_secs(1));
        assert_eq!(config.max_delay, Duration::from_secs(30));
        assert!(config.max_retries.is_none());
    }

    #[test]
    fn backoff_increases_exponentially() {
        let config = ReconnectConfig::default();

        let d0 = calculate_backoff(0, &config);
        let d1 = calculate_backoff(1, &config);
        let d2 = calculate_backoff(2, &config);

        assert!(d1 > d0, "d1 ({d1:?}) should be greater than d0 ({d0:?})");
        assert!(d2 > d1, "d2 ({d2:?}) should be greater than d1 ({d1:?})");
    }

    #[test]
    fn backoff_caps_at_max_delay() {
        let config = ReconnectConfig {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            max_retries: None,
        };

        let d40 = calculate_backoff(40, &config);
        assert!(
            d40 <= Duration::from_millis(12_500),
            "delay at attempt 40 ({d40:?}) should be capped near max_delay"
        );
    }

    #[test]
    fn publish_skips_identical_snapshots() {
        let (tx, mut rx) = watch::channel(None);
        rx.mark_unchanged();

        publish(&tx, &json!({"ldr": 10}));
        assert!(rx.has_changed().unwrap_or(false));
        rx.mark_unchanged();

        publish(&tx, &json!({"ldr": 10}));
        assert!(!rx.has_changed().unwrap_or(true));

        publish(&tx, &Value::Null);
        assert!(rx.has_changed().unwrap_or(false));
        assert_eq!(*rx.borrow(), None);
    }
}
