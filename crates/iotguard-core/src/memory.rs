// ── In-process collaborators ──
//
// A realtime store and identity provider that live entirely in memory.
// Used to run the dashboard components without a backend and to drive
// them deterministically in tests.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use iotguard_api::realtime::tree;
use serde_json::Value;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::error::CoreError;
use crate::model::Session;
use crate::provider::{IdentityProvider, RealtimeStore, Subscription};

// ── MemoryStore ──────────────────────────────────────────────────────

#[derive(Default)]
struct StoreState {
    tree: Value,
    watchers: Vec<(String, watch::Sender<Option<Value>>)>,
    writes: Vec<(String, Value)>,
    failing: HashSet<String>,
}

/// A [`RealtimeStore`] backed by a JSON tree.
///
/// Every mutation notifies the subscribers whose location changed.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<StoreState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the value at `path` as if a device had pushed it.
    pub fn set(&self, path: &str, value: Value) {
        let mut state = self.lock();
        tree::apply_put(&mut state.tree, path, value);
        notify(&mut state);
    }

    /// The value currently stored at `path`.
    pub fn get(&self, path: &str) -> Option<Value> {
        tree::value_at(&self.lock().tree, path).cloned()
    }

    /// Every successful `write` so far, in order.
    pub fn writes(&self) -> Vec<(String, Value)> {
        self.lock().writes.clone()
    }

    /// Make reads and writes of `path` fail from now on.
    pub fn fail_path(&self, path: &str) {
        self.lock().failing.insert(normalize(path));
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        let mut state = self.lock();
        state.watchers.retain(|(_, tx)| !tx.is_closed());
        state.watchers.len()
    }

    fn check(&self, path: &str) -> Result<(), CoreError> {
        if self.lock().failing.contains(&normalize(path)) {
            return Err(CoreError::Api {
                message: format!("injected failure at {path}"),
                status: None,
            });
        }
        Ok(())
    }
}

fn normalize(path: &str) -> String {
    path.trim_matches('/').to_owned()
}

fn notify(state: &mut StoreState) {
    let StoreState { tree: root, watchers, .. } = state;
    watchers.retain(|(_, tx)| !tx.is_closed());
    for (path, tx) in watchers.iter() {
        let next = tree::value_at(root, path).cloned();
        tx.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}

#[async_trait]
impl RealtimeStore for MemoryStore {
    async fn read_once(&self, path: &str) -> Result<Option<Value>, CoreError> {
        self.check(path)?;
        Ok(self.get(path))
    }

    fn subscribe(&self, path: &str) -> Result<Subscription, CoreError> {
        let mut state = self.lock();
        let initial = tree::value_at(&state.tree, path).cloned();
        let (tx, rx) = watch::channel(initial);
        state.watchers.push((path.to_owned(), tx));
        Ok(Subscription::new(path, rx, CancellationToken::new()))
    }

    async fn write(&self, path: &str, value: Value) -> Result<(), CoreError> {
        self.check(path)?;
        let mut state = self.lock();
        state.writes.push((path.to_owned(), value.clone()));
        tree::apply_put(&mut state.tree, path, value);
        notify(&mut state);
        Ok(())
    }
}

// ── MemoryIdentity ───────────────────────────────────────────────────

/// An [`IdentityProvider`] whose session is set directly.
pub struct MemoryIdentity {
    sessions: watch::Sender<Option<Session>>,
}

impl Default for MemoryIdentity {
    fn default() -> Self {
        Self::new(None)
    }
}

impl MemoryIdentity {
    pub fn new(initial: Option<Session>) -> Self {
        let (sessions, _) = watch::channel(initial);
        Self { sessions }
    }

    pub fn sign_in(&self, user_id: &str, email: Option<&str>) {
        self.sessions.send_replace(Some(Session {
            user_id: user_id.to_owned(),
            email: email.map(str::to_owned),
        }));
    }

    pub fn current(&self) -> Option<Session> {
        self.sessions.borrow().clone()
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentity {
    fn session_changes(&self) -> watch::Receiver<Option<Session>> {
        self.sessions.subscribe()
    }

    async fn sign_out(&self) -> Result<(), CoreError> {
        self.sessions.send_replace(None);
        Ok(())
    }
}
