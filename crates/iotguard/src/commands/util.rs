//! Shared helpers for command handlers.

use tracing::debug;

use iotguard_core::{CoreError, IdentityProvider, Session, SessionGate, SessionState};

use super::AppContext;
use crate::config;
use crate::error::CliError;

/// Map a dialoguer / interactive I/O failure into CliError.
pub fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(prompt_err)
}

/// Resume the stored session for the active profile.
///
/// The refresh token may rotate on exchange, so the new one is written
/// back before returning.
pub async fn restore_session(ctx: &AppContext) -> Result<Session, CliError> {
    let resolved = &ctx.resolved;
    let not_signed_in = || CliError::NotSignedIn {
        profile: resolved.profile_name.clone(),
    };

    let Some((stored, refresh_token)) =
        config::load_session(&resolved.session_file, &resolved.profile_name)?
    else {
        return Err(not_signed_in());
    };

    let identity = &ctx.backend.identity;
    let session = match identity.restore(&refresh_token, stored.email.clone()).await {
        Ok(session) => session,
        Err(e) if e.needs_sign_in() => {
            debug!(error = %e, "stored session rejected, forgetting it");
            config::clear_session(&resolved.session_file, &resolved.profile_name)?;
            return Err(not_signed_in());
        }
        Err(e) => return Err(e.into()),
    };

    persist_session(ctx, &session).await?;
    Ok(session)
}

/// Write the identity's current refresh token to the session store.
pub async fn persist_session(ctx: &AppContext, session: &Session) -> Result<(), CliError> {
    let Some(token) = ctx.backend.identity.refresh_token().await else {
        return Err(CoreError::NotSignedIn.into());
    };
    config::store_session(
        &ctx.resolved.session_file,
        &ctx.resolved.profile_name,
        &session.user_id,
        session.email.as_deref(),
        &token,
    )?;
    Ok(())
}

/// Mount a session gate and wait for the role to resolve.
pub async fn resolve_role(ctx: &AppContext) -> SessionState {
    let gate = SessionGate::mount(ctx.backend.identity.clone(), ctx.backend.store.clone());
    let state = gate.resolved().await;
    gate.teardown().await;
    state
}

/// End the in-memory session and forget the stored one.
pub async fn forget_session(ctx: &AppContext) -> Result<bool, CliError> {
    if let Err(e) = ctx.backend.identity.sign_out().await {
        debug!(error = %e, "sign-out reported an error");
    }
    Ok(config::clear_session(
        &ctx.resolved.session_file,
        &ctx.resolved.profile_name,
    )?)
}

/// Human-readable form of an optional numeric reading.
pub fn reading(value: Option<f64>) -> String {
    value.map_or_else(|| "--".into(), |v| v.to_string())
}
