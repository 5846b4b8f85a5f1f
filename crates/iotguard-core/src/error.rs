// ── Core error types ──
//
// User-facing errors from iotguard-core. Consumers never see HTTP status
// codes or JSON parse failures directly; the `From<iotguard_api::Error>`
// impl translates transport-layer errors into domain variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Identity ─────────────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Invalid email or password")]
    CredentialsRejected,

    #[error("Not signed in")]
    NotSignedIn,

    #[error("Operation requires the admin role")]
    NotAuthorized,

    // ── Connection ───────────────────────────────────────────────────
    #[error("Cannot reach {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Request timed out")]
    Timeout,

    // ── Data ─────────────────────────────────────────────────────────
    #[error("Invalid control key {key:?}: {reason}")]
    InvalidControlKey { key: String, reason: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// `true` for errors where the user has to sign in (again).
    pub fn needs_sign_in(&self) -> bool {
        matches!(
            self,
            Self::NotSignedIn | Self::CredentialsRejected | Self::AuthenticationFailed { .. }
        )
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<iotguard_api::Error> for CoreError {
    fn from(err: iotguard_api::Error) -> Self {
        use iotguard_api::Error as Api;

        match err {
            Api::Authentication { message } => CoreError::AuthenticationFailed { message },
            Api::CredentialsRejected { .. } => CoreError::CredentialsRejected,
            Api::SessionExpired => CoreError::AuthenticationFailed {
                message: "Session expired -- sign in again".into(),
            },
            Api::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), |u| u.origin().ascii_serialization()),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            Api::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            Api::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            Api::Http { status, endpoint } => CoreError::Api {
                message: format!("HTTP {status} from {endpoint}"),
                status: Some(status),
            },
            Api::Database { status, message } => CoreError::Api {
                message,
                status: Some(status),
            },
            Api::StreamConnect(reason) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("event stream: {reason}"),
            },
            Api::StreamClosed { reason } => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("event stream closed: {reason}"),
            },
            Api::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}
