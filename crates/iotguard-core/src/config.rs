// ── Runtime dashboard configuration ──
//
// Describes *where* the backend lives and how to talk to it. Carries
// credential data and connection tuning, but never touches disk. The CLI
// builds a `DashboardConfig` from its profile and hands it in.

use std::path::PathBuf;
use std::time::Duration;

use iotguard_api::ReconnectConfig;
use iotguard_api::identity::{DEFAULT_IDENTITY_URL, DEFAULT_TOKEN_URL};
use iotguard_api::transport::{TlsMode, TransportConfig};
use iotguard_api::weather::{DEFAULT_FORECAST_URL, DEFAULT_GEOCODE_URL};
use secrecy::SecretString;

use crate::weather::PipelineOptions;

/// Place looked up when none is given.
pub const DEFAULT_PLACE: &str = "Dhaka";

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification (local emulators).
    DangerAcceptInvalid,
}

/// Store locations mirrored by the dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorPaths {
    pub sensors: String,
    pub controls: String,
}

impl Default for MirrorPaths {
    fn default() -> Self {
        Self {
            sensors: "sensors".into(),
            controls: "controls".into(),
        }
    }
}

/// Everything needed to reach the identity provider, the realtime
/// database, and the weather services.
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    /// Realtime database root, e.g. `https://demo-default-rtdb.firebaseio.com`.
    pub database_url: String,
    /// Web API key of the identity project.
    pub api_key: SecretString,
    pub identity_url: String,
    pub token_url: String,
    pub geocode_url: String,
    pub forecast_url: String,
    pub paths: MirrorPaths,
    /// Initial weather place.
    pub place: String,
    pub tls: TlsVerification,
    /// Per-request timeout (connect timeout for event streams).
    pub timeout: Duration,
    pub reconnect: ReconnectConfig,
    pub pipeline: PipelineOptions,
}

impl DashboardConfig {
    /// A config with public default endpoints for everything but the database.
    pub fn new(database_url: impl Into<String>, api_key: SecretString) -> Self {
        Self {
            database_url: database_url.into(),
            api_key,
            identity_url: DEFAULT_IDENTITY_URL.into(),
            token_url: DEFAULT_TOKEN_URL.into(),
            geocode_url: DEFAULT_GEOCODE_URL.into(),
            forecast_url: DEFAULT_FORECAST_URL.into(),
            paths: MirrorPaths::default(),
            place: DEFAULT_PLACE.into(),
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            reconnect: ReconnectConfig::default(),
            pipeline: PipelineOptions::default(),
        }
    }

    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            tls: match &self.tls {
                TlsVerification::SystemDefaults => TlsMode::System,
                TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
                TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
            },
            timeout: self.timeout,
        }
    }
}
