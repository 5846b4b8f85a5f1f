// ── Remote backend adapters ──
//
// Bind the collaborator traits to the `iotguard-api` HTTP clients.

mod identity;
mod store;
mod weather;

use std::sync::Arc;

use iotguard_api::{IdentityClient, RealtimeClient, TokenProvider};

pub use identity::FirebaseIdentity;
pub use store::FirebaseStore;
pub use weather::PublicWeather;

use crate::config::DashboardConfig;
use crate::dashboard::DashboardContext;
use crate::error::CoreError;

/// The three remote collaborators, built from one config.
#[derive(Clone)]
pub struct Backend {
    pub identity: Arc<FirebaseIdentity>,
    pub store: Arc<FirebaseStore>,
    pub weather: Arc<PublicWeather>,
}

impl Backend {
    pub fn new(config: &DashboardConfig) -> Result<Self, CoreError> {
        let transport = config.transport();

        let identity = Arc::new(FirebaseIdentity::new(IdentityClient::new(
            config.identity_url.clone(),
            config.token_url.clone(),
            config.api_key.clone(),
            &transport,
        )?));

        let tokens: Arc<dyn TokenProvider> = identity.clone();
        let store = Arc::new(FirebaseStore::new(
            RealtimeClient::new(config.database_url.clone(), &transport)?,
            tokens,
            config.reconnect.clone(),
        ));

        let weather = Arc::new(PublicWeather::from_config(config)?);

        Ok(Self {
            identity,
            store,
            weather,
        })
    }

    pub fn context(&self) -> DashboardContext {
        DashboardContext {
            identity: self.identity.clone(),
            store: self.store.clone(),
            weather: self.weather.clone(),
        }
    }
}
