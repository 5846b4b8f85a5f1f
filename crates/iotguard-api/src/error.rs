use thiserror::Error;

/// Top-level error type for the `iotguard-api` crate.
///
/// Covers every failure mode across all remote surfaces: identity
/// provider, realtime database (REST and event stream), and the public
/// weather endpoints. `iotguard-core` maps these into domain errors.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// The identity provider refused the request for a reason other than
    /// bad credentials (weak password, email already registered, quota).
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// Email/password pair was rejected at sign-in.
    #[error("Credentials rejected ({code})")]
    CredentialsRejected { code: String },

    /// Refresh token revoked or expired, or the database rejected an
    /// expired ID token.
    #[error("Session expired -- sign in again")]
    SessionExpired,

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS setup or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    /// Non-success status from an endpoint without a structured error body.
    #[error("HTTP {status} from {endpoint}")]
    Http { status: u16, endpoint: String },

    // ── Realtime database ───────────────────────────────────────────
    /// Error reported by the realtime database (`{"error": "..."}` body).
    #[error("Realtime database error (HTTP {status}): {message}")]
    Database { status: u16, message: String },

    /// Event stream could not be opened.
    #[error("Event stream connection failed: {0}")]
    StreamConnect(String),

    /// Server ended the event stream (`cancel` / `auth_revoked`).
    #[error("Event stream closed by server: {reason}")]
    StreamClosed { reason: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if signing in again might resolve this error.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::SessionExpired)
            || matches!(self, Self::StreamClosed { reason } if reason == "auth_revoked")
    }

    /// Returns `true` if the identity provider rejected the email/password.
    pub fn is_credentials_rejected(&self) -> bool {
        matches!(self, Self::CredentialsRejected { .. })
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect() || e.is_body(),
            Self::StreamConnect(_) | Self::StreamClosed { .. } => true,
            Self::Http { status, .. } | Self::Database { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_revoked_stream_close_counts_as_expired() {
        let err = Error::StreamClosed {
            reason: "auth_revoked".into(),
        };
        assert!(err.is_auth_expired());
        assert!(err.is_transient());
    }

    #[test]
    fn server_side_failures_are_transient() {
        assert!(
            Error::Database {
                status: 503,
                message: "unavailable".into()
            }
            .is_transient()
        );
        assert!(
            !Error::Database {
                status: 401,
                message: "Permission denied".into()
            }
            .is_transient()
        );
    }

    #[test]
    fn rejected_credentials_are_not_transient() {
        let err = Error::CredentialsRejected {
            code: "INVALID_PASSWORD".into(),
        };
        assert!(err.is_credentials_rejected());
        assert!(!err.is_transient());
        assert!(!err.is_auth_expired());
    }
}
