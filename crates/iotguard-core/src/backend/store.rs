use std::sync::Arc;

use async_trait::async_trait;
use iotguard_api::{RealtimeClient, ReconnectConfig, TokenProvider};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::CoreError;
use crate::provider::{RealtimeStore, Subscription};

/// [`RealtimeStore`] over the database REST and event-stream API.
///
/// Every call authenticates with the current ID token, if any.
pub struct FirebaseStore {
    client: RealtimeClient,
    tokens: Arc<dyn TokenProvider>,
    reconnect: ReconnectConfig,
}

impl FirebaseStore {
    pub fn new(client: RealtimeClient, tokens: Arc<dyn TokenProvider>, reconnect: ReconnectConfig) -> Self {
        Self {
            client,
            tokens,
            reconnect,
        }
    }
}

#[async_trait]
impl RealtimeStore for FirebaseStore {
    async fn read_once(&self, path: &str) -> Result<Option<Value>, CoreError> {
        let token = self.tokens.id_token().await?;
        Ok(self.client.get(path, token.as_ref()).await?)
    }

    fn subscribe(&self, path: &str) -> Result<Subscription, CoreError> {
        let handle = self.client.stream(
            path,
            Arc::clone(&self.tokens),
            self.reconnect.clone(),
            CancellationToken::new(),
        )?;
        let (updates, cancel) = handle.into_parts();
        Ok(Subscription::new(path, updates, cancel))
    }

    async fn write(&self, path: &str, value: Value) -> Result<(), CoreError> {
        let token = self.tokens.id_token().await?;
        Ok(self.client.put(path, &value, token.as_ref()).await?)
    }
}
