//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use iotguard_config::ConfigError;
use iotguard_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const PERMISSION: i32 = 5;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach {url}")]
    #[diagnostic(
        code(iotguard::connection_failed),
        help(
            "Check the URL and your network connection.\n\
             Reason: {reason}\n\
             For a local emulator with a self-signed certificate, try --insecure."
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Request timed out")]
    #[diagnostic(
        code(iotguard::timeout),
        help("Increase the timeout with --timeout or check the backend's responsiveness.")
    )]
    Timeout,

    // ── Authentication ───────────────────────────────────────────────
    #[error("Invalid email or password")]
    #[diagnostic(code(iotguard::invalid_credentials))]
    InvalidCredentials,

    #[error("Authentication failed: {message}")]
    #[diagnostic(code(iotguard::auth_failed))]
    AuthFailed { message: String },

    #[error("Not signed in (profile '{profile}')")]
    #[diagnostic(code(iotguard::not_signed_in), help("Run: iotguard login"))]
    NotSignedIn { profile: String },

    #[error("Controls can only be changed by an admin")]
    #[diagnostic(
        code(iotguard::not_authorized),
        help("Ask an administrator to set role = \"admin\" on your user profile.")
    )]
    NotAuthorized,

    #[error("No API key configured for profile '{profile}'")]
    #[diagnostic(
        code(iotguard::no_credentials),
        help(
            "Configure one with: iotguard config init\n\
             Or set the IOTGUARD_API_KEY environment variable."
        )
    )]
    NoCredentials { profile: String },

    // ── API ──────────────────────────────────────────────────────────
    #[error("API error: {message}")]
    #[diagnostic(code(iotguard::api_error))]
    ApiError { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(iotguard::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(iotguard::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: iotguard config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("Configuration file not found")]
    #[diagnostic(
        code(iotguard::no_config),
        help(
            "Create one with: iotguard config init\n\
             Expected at: {path}\n\
             Or pass --database-url and --api-key."
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(iotguard::config))]
    Config(Box<ConfigError>),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render JSON: {0}")]
    #[diagnostic(code(iotguard::json))]
    Json(#[from] serde_json::Error),

    #[error("Failed to render YAML: {0}")]
    #[diagnostic(code(iotguard::yaml))]
    Yaml(#[from] serde_yaml::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout => exit_code::TIMEOUT,
            Self::InvalidCredentials
            | Self::AuthFailed { .. }
            | Self::NotSignedIn { .. }
            | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NotAuthorized => exit_code::PERMISSION,
            Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::CredentialsRejected => CliError::InvalidCredentials,
            CoreError::AuthenticationFailed { message } => CliError::AuthFailed { message },
            CoreError::NotSignedIn => CliError::NotSignedIn {
                profile: "current".into(),
            },
            CoreError::NotAuthorized => CliError::NotAuthorized,
            CoreError::ConnectionFailed { url, reason } => {
                CliError::ConnectionFailed { url, reason }
            }
            CoreError::Timeout => CliError::Timeout,
            CoreError::InvalidControlKey { key, reason } => CliError::Validation {
                field: format!("control key {key:?}"),
                reason,
            },
            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },
            CoreError::Api { message, status } => CliError::ApiError {
                message: match status {
                    Some(code) => format!("HTTP {code}: {message}"),
                    None => message,
                },
            },
            other @ CoreError::Internal(_) => CliError::ApiError {
                message: other.to_string(),
            },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            other => CliError::Config(Box::new(other)),
        }
    }
}
