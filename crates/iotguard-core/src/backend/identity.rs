use async_trait::async_trait;
use chrono::Duration;
use iotguard_api::{AuthTokens, IdentityClient, TokenProvider};
use secrecy::SecretString;
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};

use crate::error::CoreError;
use crate::model::Session;
use crate::provider::IdentityProvider;

/// Refresh the ID token this long before it expires.
const REFRESH_MARGIN_SECS: i64 = 60;

/// Identity provider session held in memory.
///
/// Owns the token pair and publishes session changes. Also serves as the
/// [`TokenProvider`] for database calls, refreshing the ID token shortly
/// before it expires.
pub struct FirebaseIdentity {
    client: IdentityClient,
    tokens: Mutex<Option<AuthTokens>>,
    sessions: watch::Sender<Option<Session>>,
}

impl FirebaseIdentity {
    pub fn new(client: IdentityClient) -> Self {
        let (sessions, _) = watch::channel(None);
        Self {
            client,
            tokens: Mutex::new(None),
            sessions,
        }
    }

    pub async fn sign_in(&self, email: &str, password: &SecretString) -> Result<Session, CoreError> {
        let tokens = self.client.sign_in_with_password(email, password).await?;
        info!(user_id = %tokens.user_id, "signed in");
        Ok(self.install(tokens).await)
    }

    /// Create the account and sign it in. Writing the profile record is
    /// the caller's job.
    pub async fn register(&self, email: &str, password: &SecretString) -> Result<Session, CoreError> {
        let tokens = self.client.sign_up(email, password).await?;
        info!(user_id = %tokens.user_id, "account registered");
        Ok(self.install(tokens).await)
    }

    /// Resume a session from a stored refresh token.
    pub async fn restore(
        &self,
        refresh_token: &SecretString,
        email: Option<String>,
    ) -> Result<Session, CoreError> {
        let mut tokens = self.client.refresh(refresh_token).await?;
        tokens.email = email;
        debug!(user_id = %tokens.user_id, "session restored");
        Ok(self.install(tokens).await)
    }

    /// The current refresh token, for persisting between runs.
    pub async fn refresh_token(&self) -> Option<SecretString> {
        self.tokens.lock().await.as_ref().map(|t| t.refresh_token.clone())
    }

    pub fn session(&self) -> Option<Session> {
        self.sessions.borrow().clone()
    }

    async fn install(&self, tokens: AuthTokens) -> Session {
        let session = Session {
            user_id: tokens.user_id.clone(),
            email: tokens.email.clone(),
        };
        *self.tokens.lock().await = Some(tokens);
        self.sessions.send_replace(Some(session.clone()));
        session
    }

    async fn clear(&self) {
        *self.tokens.lock().await = None;
        self.sessions.send_replace(None);
    }
}

#[async_trait]
impl IdentityProvider for FirebaseIdentity {
    fn session_changes(&self) -> watch::Receiver<Option<Session>> {
        self.sessions.subscribe()
    }

    async fn sign_out(&self) -> Result<(), CoreError> {
        self.clear().await;
        info!("signed out");
        Ok(())
    }
}

#[async_trait]
impl TokenProvider for FirebaseIdentity {
    async fn id_token(&self) -> Result<Option<SecretString>, iotguard_api::Error> {
        let mut guard = self.tokens.lock().await;
        let Some(current) = guard.as_ref() else {
            return Ok(None);
        };
        if !current.expires_within(Duration::seconds(REFRESH_MARGIN_SECS)) {
            return Ok(Some(current.id_token.clone()));
        }

        debug!("ID token near expiry, refreshing");
        match self.client.refresh(&current.refresh_token).await {
            Ok(mut fresh) => {
                fresh.email = current.email.clone();
                let id_token = fresh.id_token.clone();
                *guard = Some(fresh);
                Ok(Some(id_token))
            }
            Err(e) => {
                if e.is_auth_expired() {
                    warn!("refresh token rejected, ending session");
                    *guard = None;
                    drop(guard);
                    self.sessions.send_replace(None);
                }
                Err(e)
            }
        }
    }
}
