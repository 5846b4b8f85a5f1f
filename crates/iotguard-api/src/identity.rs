// Identity provider client
//
// Email/password sign-in and registration against the Identity Toolkit
// REST surface, plus refresh-token exchange against the secure token
// endpoint. Nothing here holds session state; `iotguard-core` owns the
// tokens and decides when to refresh.

use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Error;
use crate::transport::{TransportConfig, endpoint};

pub const DEFAULT_IDENTITY_URL: &str = "https://identitytoolkit.googleapis.com";
pub const DEFAULT_TOKEN_URL: &str = "https://securetoken.googleapis.com";

/// Sign-in error codes that mean "wrong email or password". Other calls
/// report these codes as plain authentication failures.
const REJECTED_CODES: &[&str] = &[
    "EMAIL_NOT_FOUND",
    "INVALID_PASSWORD",
    "INVALID_LOGIN_CREDENTIALS",
    "INVALID_EMAIL",
    "USER_DISABLED",
];

/// Provider error codes that mean the refresh token is no longer usable.
const EXPIRED_CODES: &[&str] = &[
    "TOKEN_EXPIRED",
    "INVALID_REFRESH_TOKEN",
    "USER_NOT_FOUND",
    "INVALID_GRANT_TYPE",
];

/// Tokens issued for a signed-in user.
#[derive(Debug, Clone)]
pub struct AuthTokens {
    pub user_id: String,
    /// Not returned by the refresh endpoint.
    pub email: Option<String>,
    pub id_token: SecretString,
    pub refresh_token: SecretString,
    pub expires_at: DateTime<Utc>,
}

impl AuthTokens {
    /// `true` if the ID token expires within `margin` of now.
    pub fn expires_within(&self, margin: Duration) -> bool {
        Utc::now() + margin >= self.expires_at
    }
}

// ── Wire types ──────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PasswordResponse {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    id_token: String,
    refresh_token: String,
    expires_in: String,
}

#[derive(Deserialize)]
struct RefreshResponse {
    user_id: String,
    id_token: String,
    refresh_token: String,
    expires_in: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

fn expiry_from(expires_in: &str) -> DateTime<Utc> {
    let secs = expires_in.trim().parse::<i64>().unwrap_or(3600);
    Utc::now() + Duration::seconds(secs)
}

// ── Client ──────────────────────────────────────────────────────────

/// Client for the identity provider's REST endpoints.
pub struct IdentityClient {
    http: reqwest::Client,
    identity_url: String,
    token_url: String,
    api_key: SecretString,
}

impl IdentityClient {
    /// Create a client with its own HTTP connection pool.
    pub fn new(
        identity_url: impl Into<String>,
        token_url: impl Into<String>,
        api_key: SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, identity_url, token_url, api_key))
    }

    /// Create a client around a pre-built `reqwest::Client`.
    pub fn with_client(
        http: reqwest::Client,
        identity_url: impl Into<String>,
        token_url: impl Into<String>,
        api_key: SecretString,
    ) -> Self {
        Self {
            http,
            identity_url: identity_url.into(),
            token_url: token_url.into(),
            api_key,
        }
    }

    /// Sign in with email and password.
    ///
    /// `POST /v1/accounts:signInWithPassword`
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<AuthTokens, Error> {
        debug!(email, "signing in");
        self.password_call("v1/accounts:signInWithPassword", email, password, REJECTED_CODES)
            .await
    }

    /// Create a new account and sign it in.
    ///
    /// `POST /v1/accounts:signUp`
    pub async fn sign_up(&self, email: &str, password: &SecretString) -> Result<AuthTokens, Error> {
        debug!(email, "registering account");
        self.password_call("v1/accounts:signUp", email, password, &[])
            .await
    }

    /// Exchange a refresh token for a fresh ID token.
    ///
    /// `POST /v1/token` (form-encoded)
    pub async fn refresh(&self, refresh_token: &SecretString) -> Result<AuthTokens, Error> {
        let mut url = endpoint(&self.token_url, "v1/token")?;
        url.query_pairs_mut()
            .append_pair("key", self.api_key.expose_secret());

        let resp = self
            .http
            .post(url)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token.expose_secret()),
            ])
            .send()
            .await?;

        let body: RefreshResponse = Self::parse(resp, &[]).await?;
        debug!(user_id = %body.user_id, "ID token refreshed");
        Ok(AuthTokens {
            user_id: body.user_id,
            email: None,
            expires_at: expiry_from(&body.expires_in),
            id_token: SecretString::from(body.id_token),
            refresh_token: SecretString::from(body.refresh_token),
        })
    }

    async fn password_call(
        &self,
        path: &str,
        email: &str,
        password: &SecretString,
        rejected: &[&str],
    ) -> Result<AuthTokens, Error> {
        let mut url = endpoint(&self.identity_url, path)?;
        url.query_pairs_mut()
            .append_pair("key", self.api_key.expose_secret());

        let resp = self
            .http
            .post(url)
            .json(&PasswordRequest {
                email,
                password: password.expose_secret(),
                return_secure_token: true,
            })
            .send()
            .await?;

        let body: PasswordResponse = Self::parse(resp, rejected).await?;
        Ok(AuthTokens {
            user_id: body.local_id,
            email: body.email.or_else(|| Some(email.to_owned())),
            expires_at: expiry_from(&body.expires_in),
            id_token: SecretString::from(body.id_token),
            refresh_token: SecretString::from(body.refresh_token),
        })
    }

    /// Decode a success body, or classify the provider's error envelope.
    async fn parse<T: serde::de::DeserializeOwned>(
        resp: reqwest::Response,
        rejected: &[&str],
    ) -> Result<T, Error> {
        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| format!("HTTP {status}"));
            return Err(classify(&message, rejected));
        }

        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body,
        })
    }
}

/// Map a provider error message (`"CODE"` or `"CODE : detail"`) to an [`Error`].
///
/// Codes in `rejected` become [`Error::CredentialsRejected`].
fn classify(message: &str, rejected: &[&str]) -> Error {
    let code = message
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .trim_end_matches(':');

    if rejected.contains(&code) {
        Error::CredentialsRejected { code: code.into() }
    } else if EXPIRED_CODES.contains(&code) {
        Error::SessionExpired
    } else {
        Error::Authentication {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_maps_provider_codes() {
        assert!(matches!(
            classify("INVALID_LOGIN_CREDENTIALS", REJECTED_CODES),
            Error::CredentialsRejected { code } if code == "INVALID_LOGIN_CREDENTIALS"
        ));
        assert!(matches!(classify("TOKEN_EXPIRED", &[]), Error::SessionExpired));
        assert!(matches!(
            classify("WEAK_PASSWORD : Password should be at least 6 characters", REJECTED_CODES),
            Error::Authentication { message } if message.starts_with("WEAK_PASSWORD")
        ));
    }

    #[test]
    fn classify_without_rejected_codes_keeps_provider_message() {
        assert!(matches!(
            classify("INVALID_EMAIL", &[]),
            Error::Authentication { message } if message == "INVALID_EMAIL"
        ));
        assert!(matches!(
            classify("INVALID_EMAIL", REJECTED_CODES),
            Error::CredentialsRejected { .. }
        ));
    }

    #[test]
    fn expiry_falls_back_to_an_hour() {
        let at = expiry_from("not-a-number");
        let delta = at - Utc::now();
        assert!(delta > Duration::minutes(59));
        assert!(delta <= Duration::minutes(60));
    }
}
