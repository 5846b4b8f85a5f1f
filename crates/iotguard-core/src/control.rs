// ── Control dispatch ──
//
// Turns a toggle action into a single store write. Nothing local is
// updated: the next push through the StateMirror is authoritative.
// Authorization is not checked here; callers gate on the SessionGate
// role and the store's security rules enforce the same rule server-side.

use std::sync::Arc;

use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::CoreError;
use crate::provider::RealtimeStore;

/// Characters the store forbids in a path segment.
const FORBIDDEN_KEY_CHARS: &[char] = &['/', '.', '#', '$', '[', ']'];

#[derive(Clone)]
pub struct ControlDispatcher {
    store: Arc<dyn RealtimeStore>,
    controls_path: String,
}

impl ControlDispatcher {
    pub fn new(store: Arc<dyn RealtimeStore>, controls_path: impl Into<String>) -> Self {
        Self {
            store,
            controls_path: controls_path.into(),
        }
    }

    /// Store location of a control flag.
    pub fn path_for(&self, key: &str) -> String {
        format!("{}/{key}", self.controls_path.trim_end_matches('/'))
    }

    /// Write `value` to the flag without waiting for acknowledgement.
    ///
    /// The returned handle completes once the write settles; its outcome
    /// is only logged.
    pub fn toggle(&self, key: &str, value: bool) -> Result<JoinHandle<()>, CoreError> {
        validate_key(key)?;
        let store = Arc::clone(&self.store);
        let path = self.path_for(key);

        Ok(tokio::spawn(async move {
            match store.write(&path, Value::Bool(value)).await {
                Ok(()) => debug!(path = %path, value, "control write sent"),
                Err(e) => warn!(path = %path, value, error = %e, "control write failed"),
            }
        }))
    }

    /// Same write as [`toggle`](Self::toggle), awaited.
    pub async fn toggle_acked(&self, key: &str, value: bool) -> Result<(), CoreError> {
        validate_key(key)?;
        let path = self.path_for(key);
        self.store.write(&path, Value::Bool(value)).await?;
        debug!(path = %path, value, "control write acknowledged");
        Ok(())
    }
}

/// Reject keys that are empty or not a single store path segment.
pub fn validate_key(key: &str) -> Result<(), CoreError> {
    let reason = if key.is_empty() {
        "key is empty"
    } else if key.contains(FORBIDDEN_KEY_CHARS) {
        "key contains one of / . # $ [ ]"
    } else if key.chars().any(char::is_control) {
        "key contains control characters"
    } else {
        return Ok(());
    };
    Err(CoreError::InvalidControlKey {
        key: key.to_owned(),
        reason: reason.into(),
    })
}
