// Realtime database REST client
//
// Every location is addressed as `{database_url}/{path}.json`. The ID
// token travels as the `auth` query parameter, which is how the
// database's REST surface accepts user credentials.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use super::stream::{ReconnectConfig, StreamHandle};
use crate::error::Error;
use crate::token::TokenProvider;
use crate::transport::{TransportConfig, endpoint};

#[derive(Deserialize)]
struct DatabaseError {
    error: String,
}

/// Client for one realtime database instance.
#[derive(Clone)]
pub struct RealtimeClient {
    http: reqwest::Client,
    stream_http: reqwest::Client,
    database_url: String,
}

impl RealtimeClient {
    pub fn new(database_url: impl Into<String>, transport: &TransportConfig) -> Result<Self, Error> {
        Ok(Self {
            http: transport.build_client()?,
            stream_http: transport.build_stream_client()?,
            database_url: database_url.into(),
        })
    }

    /// The database root URL.
    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    /// REST URL for a slash-separated location.
    pub fn path_url(&self, path: &str) -> Result<Url, Error> {
        endpoint(
            &self.database_url,
            &format!("{}.json", path.trim_matches('/')),
        )
    }

    /// Read a location once. An absent location yields `None`.
    pub async fn get(&self, path: &str, auth: Option<&SecretString>) -> Result<Option<Value>, Error> {
        let url = with_auth(self.path_url(path)?, auth);
        debug!(path, "realtime GET");

        let resp = self.http.get(url).send().await?;
        let value: Value = Self::parse(resp).await?;
        Ok(if value.is_null() { None } else { Some(value) })
    }

    /// Overwrite a location.
    pub async fn put(&self, path: &str, value: &Value, auth: Option<&SecretString>) -> Result<(), Error> {
        let mut url = with_auth(self.path_url(path)?, auth);
        url.query_pairs_mut().append_pair("print", "silent");
        debug!(path, "realtime PUT");

        let resp = self.http.put(url).json(value).send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let body = resp.text().await.unwrap_or_default();
        Err(database_error(status.as_u16(), &body))
    }

    /// Subscribe to a location over the event stream.
    ///
    /// The background task runs until `cancel` fires or every receiver
    /// of the returned handle has been dropped.
    pub fn stream(
        &self,
        path: &str,
        tokens: Arc<dyn TokenProvider>,
        reconnect: ReconnectConfig,
        cancel: CancellationToken,
    ) -> Result<StreamHandle, Error> {
        let url = self.path_url(path)?;
        Ok(StreamHandle::spawn(
            self.stream_http.clone(),
            url,
            tokens,
            reconnect,
            cancel,
        ))
    }

    async fn parse(resp: reqwest::Response) -> Result<Value, Error> {
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(database_error(status.as_u16(), &body));
        }
        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body,
        })
    }
}

fn with_auth(mut url: Url, auth: Option<&SecretString>) -> Url {
    if let Some(token) = auth {
        url.query_pairs_mut()
            .append_pair("auth", token.expose_secret());
    }
    url
}

/// Map an error response. Expired ID tokens surface as [`Error::SessionExpired`].
fn database_error(status: u16, body: &str) -> Error {
    let message = serde_json::from_str::<DatabaseError>(body)
        .map_or_else(|_| body.trim().to_owned(), |e| e.error);

    if status == 401 && message.to_ascii_lowercase().contains("expired") {
        return Error::SessionExpired;
    }
    Error::Database { status, message }
}
