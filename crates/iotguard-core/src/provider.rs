// ── Collaborator seams ──
//
// The core components never talk to HTTP clients directly. They depend on
// these traits, which `backend` binds to `iotguard-api` and `memory`
// implements in-process.

use async_trait::async_trait;
use iotguard_api::HourlyForecast;
use serde_json::Value;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::error::CoreError;
use crate::model::{Coordinates, Session};

/// Source of authentication state.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Channel carrying the current session (`None` when signed out).
    fn session_changes(&self) -> watch::Receiver<Option<Session>>;

    /// End the current session. The session channel then carries `None`.
    async fn sign_out(&self) -> Result<(), CoreError>;
}

/// Realtime key-value store addressed by slash-separated paths.
#[async_trait]
pub trait RealtimeStore: Send + Sync {
    /// Point read. An absent location is `Ok(None)`.
    async fn read_once(&self, path: &str) -> Result<Option<Value>, CoreError>;

    /// Continuous subscription delivering the whole value at `path` on
    /// every change. Must be called within a tokio runtime.
    fn subscribe(&self, path: &str) -> Result<Subscription, CoreError>;

    /// Overwrite the value at `path`.
    async fn write(&self, path: &str, value: Value) -> Result<(), CoreError>;
}

/// Geocoding and forecast lookups.
#[async_trait]
pub trait WeatherApi: Send + Sync {
    /// Candidate coordinates for a place name, best match first.
    async fn geocode(&self, place: &str) -> Result<Vec<Coordinates>, CoreError>;

    async fn forecast(&self, at: Coordinates) -> Result<HourlyForecast, CoreError>;
}

// ── Subscription ─────────────────────────────────────────────────────

/// An owned, cancellable store subscription.
///
/// Dropping the handle cancels the underlying listener.
#[derive(Debug)]
pub struct Subscription {
    path: String,
    updates: watch::Receiver<Option<Value>>,
    cancel: CancellationToken,
}

impl Subscription {
    pub fn new(
        path: impl Into<String>,
        updates: watch::Receiver<Option<Value>>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            path: path.into(),
            updates,
            cancel,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// The most recent value, marking it as seen.
    pub fn latest(&mut self) -> Option<Value> {
        self.updates.borrow_and_update().clone()
    }

    /// Wait for the next pushed value.
    ///
    /// Returns `None` once the subscription is cancelled or the store side
    /// has gone away.
    pub async fn changed(&mut self) -> Option<Option<Value>> {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => None,
            res = self.updates.changed() => {
                res.ok()?;
                Some(self.updates.borrow_and_update().clone())
            }
        }
    }

    /// `true` if a value arrived that `latest`/`changed` has not returned yet.
    pub fn updates_pending(&self) -> bool {
        self.updates.has_changed().unwrap_or(false)
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
