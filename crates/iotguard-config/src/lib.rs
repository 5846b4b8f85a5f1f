//! Configuration for the iotguard CLI.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext),
//! session persistence, and translation to `iotguard_core::DashboardConfig`.
//! The CLI adds flag-aware wrappers on top.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use iotguard_core::{DEFAULT_PLACE, DashboardConfig, MirrorPaths, TlsVerification};

/// Keyring service name for stored secrets.
const KEYRING_SERVICE: &str = "iotguard";

/// Overrides the config file location.
pub const CONFIG_PATH_ENV: &str = "IOTGUARD_CONFIG";

/// When set, secrets are never read from or written to the system keyring.
pub const NO_KEYRING_ENV: &str = "IOTGUARD_NO_KEYRING";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no API key configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("profile '{profile}' not found")]
    UnknownProfile { profile: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("failed to parse session file: {0}")]
    SessionParse(#[from] toml::de::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named backend profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Name of the profile to use when none is given.
    pub fn active_profile_name(&self) -> &str {
        self.default_profile.as_deref().unwrap_or("default")
    }

    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles.get(name).ok_or_else(|| ConfigError::UnknownProfile {
            profile: name.into(),
        })
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default)]
    pub insecure: bool,

    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            insecure: false,
            timeout: default_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}

/// A named backend profile.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Realtime database root URL.
    pub database_url: String,

    /// Web API key (plaintext; prefer keyring or env var).
    pub api_key: Option<String>,

    /// Environment variable name containing the API key.
    pub api_key_env: Option<String>,

    /// Email used by `login` when `--email` is omitted.
    pub email: Option<String>,

    /// Endpoint overrides (emulators, proxies).
    pub identity_url: Option<String>,
    pub token_url: Option<String>,
    pub geocode_url: Option<String>,
    pub forecast_url: Option<String>,

    /// Initial weather place.
    pub place: Option<String>,

    /// Store locations of the device's sensor and control records.
    pub sensors_path: Option<String>,
    pub controls_path: Option<String>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Override insecure TLS setting.
    pub insecure: Option<bool>,

    /// Override timeout (seconds).
    pub timeout: Option<u64>,
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "iotguard", "iotguard")
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("iotguard");
    p
}

/// Resolve the config file path via `IOTGUARD_CONFIG` or platform conventions.
pub fn config_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_PATH_ENV) {
        return PathBuf::from(path);
    }
    project_dirs().map_or_else(
        || dirs_fallback().join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// The session file lives next to the config file.
pub fn session_path() -> PathBuf {
    config_path().with_file_name("session.toml")
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from a specific file, merged over defaults and under `IOTGUARD_*`
/// env vars (`IOTGUARD_DEFAULTS__TIMEOUT=5`).
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("IOTGUARD_").split("__").only(&[
            "default_profile",
            "defaults.output",
            "defaults.color",
            "defaults.insecure",
            "defaults.timeout",
        ]));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution (without CLI flags) ───────────────────────

fn keyring_entry(profile_name: &str, secret: &str) -> Option<keyring::Entry> {
    if std::env::var_os(NO_KEYRING_ENV).is_some() {
        return None;
    }
    keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/{secret}")).ok()
}

/// Resolve the web API key from the credential chain (no CLI flag step).
pub fn resolve_api_key(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    // 1. Profile's api_key_env → env var lookup
    if let Some(ref env_name) = profile.api_key_env {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(SecretString::from(val));
        }
    }

    // 2. System keyring
    if let Some(entry) = keyring_entry(profile_name, "api-key") {
        if let Ok(secret) = entry.get_password() {
            return Ok(SecretString::from(secret));
        }
    }

    // 3. Plaintext in config
    if let Some(ref key) = profile.api_key {
        return Ok(SecretString::from(key.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

// ── Session persistence ─────────────────────────────────────────────

/// What survives between CLI invocations for one profile.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StoredSession {
    pub user_id: Option<String>,
    pub email: Option<String>,
    /// Only written when the keyring is unavailable.
    pub refresh_token: Option<String>,
}

/// `session.toml`: per-profile stored sessions.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct SessionFile {
    #[serde(default)]
    pub sessions: HashMap<String, StoredSession>,
}

impl SessionFile {
    /// Read the file, or an empty one if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(text) => Ok(toml::from_str(&text)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }
}

fn refresh_entry(profile_name: &str) -> Option<keyring::Entry> {
    keyring_entry(profile_name, "refresh-token")
}

/// Persist a signed-in session. The refresh token goes to the keyring,
/// or into `session_file` if the keyring is unavailable.
pub fn store_session(
    session_file: &Path,
    profile_name: &str,
    user_id: &str,
    email: Option<&str>,
    refresh_token: &SecretString,
) -> Result<(), ConfigError> {
    let in_keyring = refresh_entry(profile_name)
        .is_some_and(|entry| entry.set_password(refresh_token.expose_secret()).is_ok());
    if !in_keyring {
        debug!(profile = profile_name, "keyring unavailable, storing refresh token in session file");
    }

    let mut file = SessionFile::load_from(session_file)?;
    file.sessions.insert(
        profile_name.to_owned(),
        StoredSession {
            user_id: Some(user_id.to_owned()),
            email: email.map(str::to_owned),
            refresh_token: (!in_keyring).then(|| refresh_token.expose_secret().to_owned()),
        },
    );
    file.save_to(session_file)
}

/// Load a stored session and its refresh token, if any.
pub fn load_session(
    session_file: &Path,
    profile_name: &str,
) -> Result<Option<(StoredSession, SecretString)>, ConfigError> {
    let file = SessionFile::load_from(session_file)?;
    let Some(stored) = file.sessions.get(profile_name).cloned() else {
        return Ok(None);
    };

    if let Some(ref token) = stored.refresh_token {
        let token = SecretString::from(token.clone());
        return Ok(Some((stored, token)));
    }
    let from_keyring = refresh_entry(profile_name).and_then(|entry| entry.get_password().ok());
    Ok(from_keyring.map(|token| (stored, SecretString::from(token))))
}

/// Forget a stored session (keyring entry and file record).
pub fn clear_session(session_file: &Path, profile_name: &str) -> Result<bool, ConfigError> {
    if let Some(entry) = refresh_entry(profile_name) {
        let _ = entry.delete_credential();
    }
    let mut file = SessionFile::load_from(session_file)?;
    let existed = file.sessions.remove(profile_name).is_some();
    if existed {
        file.save_to(session_file)?;
    }
    Ok(existed)
}

// ── Translation to core config ──────────────────────────────────────

/// Build a `DashboardConfig` from a profile, without CLI flag overrides.
pub fn profile_to_dashboard_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<DashboardConfig, ConfigError> {
    let api_key = resolve_api_key(profile, profile_name)?;
    dashboard_config_with_key(profile, api_key, defaults)
}

/// Like [`profile_to_dashboard_config`] with an already-resolved API key.
pub fn dashboard_config_with_key(
    profile: &Profile,
    api_key: SecretString,
    defaults: &Defaults,
) -> Result<DashboardConfig, ConfigError> {
    let database_url = validate_database_url(&profile.database_url)?;
    Ok(apply_profile(DashboardConfig::new(database_url, api_key), profile, defaults))
}

/// Settings for the public weather services only; no database or key needed.
pub fn weather_config(profile: &Profile, defaults: &Defaults) -> DashboardConfig {
    apply_profile(
        DashboardConfig::new(profile.database_url.trim(), SecretString::from(String::new())),
        profile,
        defaults,
    )
}

fn validate_database_url(raw: &str) -> Result<&str, ConfigError> {
    let database_url = raw.trim();
    let parsed: url::Url = database_url.parse().map_err(|_| ConfigError::Validation {
        field: "database_url".into(),
        reason: format!("invalid URL: {database_url:?}"),
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::Validation {
            field: "database_url".into(),
            reason: format!("expected http or https, got {}", parsed.scheme()),
        });
    }
    Ok(database_url)
}

fn apply_profile(mut config: DashboardConfig, profile: &Profile, defaults: &Defaults) -> DashboardConfig {
    if let Some(ref u) = profile.identity_url {
        config.identity_url.clone_from(u);
    }
    if let Some(ref u) = profile.token_url {
        config.token_url.clone_from(u);
    }
    if let Some(ref u) = profile.geocode_url {
        config.geocode_url.clone_from(u);
    }
    if let Some(ref u) = profile.forecast_url {
        config.forecast_url.clone_from(u);
    }

    config.place = profile.place.clone().unwrap_or_else(|| DEFAULT_PLACE.into());
    let default_paths = MirrorPaths::default();
    config.paths = MirrorPaths {
        sensors: profile.sensors_path.clone().unwrap_or(default_paths.sensors),
        controls: profile.controls_path.clone().unwrap_or(default_paths.controls),
    };

    config.tls = if profile.insecure.unwrap_or(defaults.insecure) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };
    config.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));
    config
}
