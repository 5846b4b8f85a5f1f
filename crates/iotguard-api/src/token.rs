// Source of ID tokens for authenticated database calls.
//
// The event-stream loop asks for a fresh token on every (re)connect, so
// implementations are expected to refresh on their own.

use async_trait::async_trait;
use secrecy::SecretString;

use crate::error::Error;

/// Supplies the current ID token, or `None` for unauthenticated access.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn id_token(&self) -> Result<Option<SecretString>, Error>;
}

/// Fixed token (or none). Used for open databases and in tests.
#[derive(Debug, Clone, Default)]
pub struct StaticToken(pub Option<SecretString>);

#[async_trait]
impl TokenProvider for StaticToken {
    async fn id_token(&self) -> Result<Option<SecretString>, Error> {
        Ok(self.0.clone())
    }
}
