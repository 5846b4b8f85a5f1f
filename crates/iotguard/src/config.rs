//! CLI configuration: thin wrapper around `iotguard_config`.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides
//! (--database-url, --api-key, --insecure, --timeout).

use std::path::PathBuf;

use secrecy::SecretString;

use iotguard_core::DashboardConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use iotguard_config::{
    Config, Profile, clear_session, config_path, load_config, load_session, save_config,
    session_path, store_session,
};

/// Everything a backend command needs from configuration.
pub struct Resolved {
    pub profile_name: String,
    pub profile: Profile,
    pub dashboard: DashboardConfig,
    pub session_file: PathBuf,
}

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .unwrap_or_else(|| config.active_profile_name().to_owned())
}

/// The active profile with flag overrides applied, or `None` when neither
/// the config file nor the flags describe a backend.
fn effective_profile(global: &GlobalOpts) -> Result<(String, Option<Profile>, Config), CliError> {
    let cfg = load_config()?;
    let name = active_profile_name(global, &cfg);

    let profile = match cfg.profiles.get(&name) {
        Some(p) => Some(p.clone()),
        None if global.profile.is_some() && global.database_url.is_none() => {
            let mut available: Vec<_> = cfg.profiles.keys().cloned().collect();
            available.sort();
            return Err(CliError::ProfileNotFound {
                name,
                available: if available.is_empty() {
                    "(none)".into()
                } else {
                    available.join(", ")
                },
            });
        }
        None => global.database_url.as_ref().map(|_| Profile::default()),
    };

    let profile = profile.map(|mut p| {
        if let Some(ref url) = global.database_url {
            p.database_url.clone_from(url);
        }
        if global.insecure {
            p.insecure = Some(true);
        }
        if let Some(timeout) = global.timeout {
            p.timeout = Some(timeout);
        }
        p
    });

    Ok((name, profile, cfg))
}

/// Build the full backend configuration. CLI flags take priority over
/// profile values.
pub fn resolve(global: &GlobalOpts) -> Result<Resolved, CliError> {
    let (profile_name, profile, cfg) = effective_profile(global)?;
    let profile = profile.ok_or_else(|| CliError::NoConfig {
        path: config_path().display().to_string(),
    })?;

    let dashboard = match global.api_key {
        Some(ref key) => iotguard_config::dashboard_config_with_key(
            &profile,
            SecretString::from(key.clone()),
            &cfg.defaults,
        )?,
        None => iotguard_config::profile_to_dashboard_config(&profile, &profile_name, &cfg.defaults)?,
    };

    Ok(Resolved {
        profile_name,
        profile,
        dashboard,
        session_file: session_path(),
    })
}

/// Configuration for the public weather services. Works without a
/// profile; endpoints and place then fall back to defaults.
pub fn resolve_weather(global: &GlobalOpts) -> Result<DashboardConfig, CliError> {
    let (_, profile, cfg) = effective_profile(global)?;
    let mut profile = profile.unwrap_or_default();
    if global.insecure {
        profile.insecure = Some(true);
    }
    if let Some(timeout) = global.timeout {
        profile.timeout = Some(timeout);
    }
    Ok(iotguard_config::weather_config(&profile, &cfg.defaults))
}
