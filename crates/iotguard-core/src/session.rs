// ── Session gate ──
//
// Observes the identity provider's session channel and resolves the
// signed-in user's role from `users/{id}`. `SessionState::SignedOut` is
// the redirect signal: views leave the dashboard when they see it.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::CoreError;
use crate::model::profile::profile_path;
use crate::model::{Role, Session, UserProfile};
use crate::provider::{IdentityProvider, RealtimeStore};

/// Authentication state as seen by the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    /// The first session value has not been observed yet.
    Pending,
    /// No session: leave the dashboard.
    SignedOut,
    /// Signed in, profile read in flight.
    Resolving { user_id: String },
    SignedIn {
        user_id: String,
        email: Option<String>,
        role: Role,
    },
}

impl SessionState {
    /// Role while signed in; `Unknown` otherwise.
    pub fn role(&self) -> Role {
        match self {
            Self::SignedIn { role, .. } => *role,
            _ => Role::Unknown,
        }
    }

    pub fn is_signed_out(&self) -> bool {
        matches!(self, Self::SignedOut)
    }

    pub fn user_id(&self) -> Option<&str> {
        match self {
            Self::Resolving { user_id } | Self::SignedIn { user_id, .. } => Some(user_id),
            _ => None,
        }
    }
}

pub struct SessionGate {
    identity: Arc<dyn IdentityProvider>,
    state_tx: Arc<watch::Sender<SessionState>>,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl SessionGate {
    /// Register the single session observer.
    ///
    /// Must be called within a tokio runtime.
    pub fn mount(identity: Arc<dyn IdentityProvider>, store: Arc<dyn RealtimeStore>) -> Self {
        let (state_tx, _) = watch::channel(SessionState::Pending);
        let state_tx = Arc::new(state_tx);
        let cancel = CancellationToken::new();

        let task = tokio::spawn(observe(
            identity.session_changes(),
            store,
            Arc::clone(&state_tx),
            cancel.clone(),
        ));

        Self {
            identity,
            state_tx,
            cancel,
            task: Mutex::new(Some(task)),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state_tx.borrow().clone()
    }

    pub fn role(&self) -> Role {
        self.state_tx.borrow().role()
    }

    /// Whether the control toggles should be offered.
    pub fn can_control(&self) -> bool {
        self.role().can_control()
    }

    pub fn watch(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    /// Wait until the state is settled (`SignedOut` or `SignedIn`).
    pub async fn resolved(&self) -> SessionState {
        let mut rx = self.watch();
        let settled = rx
            .wait_for(|s| matches!(s, SessionState::SignedOut | SessionState::SignedIn { .. }))
            .await
            .map(|state| state.clone());
        settled.unwrap_or_else(|_| self.state())
    }

    /// End the provider session, then publish the redirect signal.
    ///
    /// The redirect is published even if the provider reports an error.
    pub async fn logout(&self) -> Result<(), CoreError> {
        let result = self.identity.sign_out().await;
        if let Err(ref e) = result {
            warn!(error = %e, "sign-out failed");
        }
        self.state_tx.send_replace(SessionState::SignedOut);
        result
    }

    /// Stop observing session changes.
    pub async fn teardown(&self) {
        self.cancel.cancel();
        if let Some(task) = self.task.lock().await.take() {
            let _ = task.await;
        }
    }
}

impl Drop for SessionGate {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn observe(
    mut sessions: watch::Receiver<Option<Session>>,
    store: Arc<dyn RealtimeStore>,
    state_tx: Arc<watch::Sender<SessionState>>,
    cancel: CancellationToken,
) {
    'observe: loop {
        let session = sessions.borrow_and_update().clone();

        if let Some(session) = session {
            state_tx.send_replace(SessionState::Resolving {
                user_id: session.user_id.clone(),
            });

            let path = profile_path(&session.user_id);
            let read = store.read_once(&path);
            tokio::pin!(read);

            let outcome = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                changed = sessions.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    debug!(user_id = %session.user_id, "session changed during profile read, discarding");
                    continue 'observe;
                }
                outcome = &mut read => outcome,
            };

            let role = match outcome {
                Ok(Some(record)) => UserProfile::from_value(&record).role,
                Ok(None) => {
                    info!(user_id = %session.user_id, "no profile record, role unknown");
                    Role::Unknown
                }
                Err(e) => {
                    warn!(user_id = %session.user_id, error = %e, "profile read failed, role unknown");
                    Role::Unknown
                }
            };

            debug!(user_id = %session.user_id, %role, "session resolved");
            state_tx.send_replace(SessionState::SignedIn {
                user_id: session.user_id,
                email: session.email,
                role,
            });
        } else {
            debug!("no session, redirecting");
            state_tx.send_replace(SessionState::SignedOut);
        }

        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            changed = sessions.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    debug!("session observer exiting");
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::memory::{MemoryIdentity, MemoryStore};
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use tokio::sync::Notify;

    use crate::provider::Subscription;

    fn gate(identity: &Arc<MemoryIdentity>, store: &Arc<MemoryStore>) -> SessionGate {
        SessionGate::mount(identity.clone(), store.clone())
    }

    #[tokio::test]
    async fn no_session_publishes_redirect() {
        let identity = Arc::new(MemoryIdentity::default());
        let store = Arc::new(MemoryStore::new());
        let gate = gate(&identity, &store);

        assert_eq!(gate.resolved().await, SessionState::SignedOut);
        assert_eq!(gate.role(), Role::Unknown);
        assert!(!gate.can_control());
    }

    #[tokio::test]
    async fn admin_profile_resolves_role() {
        let identity = Arc::new(MemoryIdentity::default());
        identity.sign_in("u1", Some("ops@example.com"));
        let store = Arc::new(MemoryStore::new());
        store.set("users/u1", json!({"role": "admin", "email": "ops@example.com"}));

        let gate = gate(&identity, &store);
        let state = gate.resolved().await;
        assert_eq!(state.role(), Role::Admin);
        assert!(gate.can_control());
    }

    #[tokio::test]
    async fn missing_profile_is_unknown_role() {
        let identity = Arc::new(MemoryIdentity::new(Some(Session {
            user_id: "u2".into(),
            email: None,
        })));
        let store = Arc::new(MemoryStore::new());

        let gate = gate(&identity, &store);
        assert_eq!(
            gate.resolved().await,
            SessionState::SignedIn {
                user_id: "u2".into(),
                email: None,
                role: Role::Unknown,
            }
        );
    }

    #[tokio::test]
    async fn failed_profile_read_is_unknown_role() {
        let identity = Arc::new(MemoryIdentity::default());
        identity.sign_in("u3", None);
        let store = Arc::new(MemoryStore::new());
        store.set("users/u3", json!({"role": "admin"}));
        store.fail_path("users/u3");

        let gate = gate(&identity, &store);
        assert_eq!(gate.resolved().await.role(), Role::Unknown);
    }

    #[tokio::test]
    async fn logout_signs_out_and_redirects() {
        let identity = Arc::new(MemoryIdentity::default());
        identity.sign_in("u1", None);
        let store = Arc::new(MemoryStore::new());
        store.set("users/u1", json!({"role": "user"}));

        let gate = gate(&identity, &store);
        assert_eq!(gate.resolved().await.role(), Role::User);

        gate.logout().await.unwrap();
        assert!(gate.state().is_signed_out());
        assert!(identity.current().is_none());
        gate.teardown().await;
    }

    /// Store whose profile reads block until released.
    struct SlowStore {
        inner: MemoryStore,
        release: Notify,
    }

    #[async_trait]
    impl RealtimeStore for SlowStore {
        async fn read_once(&self, path: &str) -> Result<Option<Value>, CoreError> {
            if path == "users/slow" {
                self.release.notified().await;
            }
            self.inner.read_once(path).await
        }

        fn subscribe(&self, path: &str) -> Result<Subscription, CoreError> {
            self.inner.subscribe(path)
        }

        async fn write(&self, path: &str, value: Value) -> Result<(), CoreError> {
            self.inner.write(path, value).await
        }
    }

    #[tokio::test]
    async fn stale_profile_read_is_discarded() {
        let identity = Arc::new(MemoryIdentity::default());
        identity.sign_in("slow", None);

        let inner = MemoryStore::new();
        inner.set("users/slow", json!({"role": "admin"}));
        inner.set("users/fast", json!({"role": "user"}));
        let store = Arc::new(SlowStore {
            inner,
            release: Notify::new(),
        });

        let gate = SessionGate::mount(identity.clone(), store.clone());
        let mut rx = gate.watch();
        rx.wait_for(|s| s.user_id() == Some("slow")).await.unwrap();

        identity.sign_in("fast", None);
        let state = gate.resolved().await;
        store.release.notify_one();

        assert_eq!(state.user_id(), Some("fast"));
        assert_eq!(state.role(), Role::User);

        tokio::task::yield_now().await;
        assert_eq!(gate.state().user_id(), Some("fast"));
        assert_eq!(gate.role(), Role::User);
    }
}
