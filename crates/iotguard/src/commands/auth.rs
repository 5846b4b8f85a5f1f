//! Account commands: login, register, logout, whoami.

use dialoguer::Input;
use secrecy::SecretString;
use serde::Serialize;
use tracing::info;

use iotguard_core::{CoreError, RealtimeStore, Role, SessionState, UserProfile};
use iotguard_core::model::profile::profile_path;

use super::{AppContext, util};
use crate::cli::{GlobalOpts, LoginArgs};
use crate::error::CliError;
use crate::output;

/// Read from the environment instead of prompting (scripts, CI).
const PASSWORD_ENV: &str = "IOTGUARD_PASSWORD";

#[derive(Serialize)]
struct WhoAmI {
    user_id: String,
    email: Option<String>,
    role: Role,
}

impl WhoAmI {
    fn detail(&self) -> String {
        output::render_pairs(&[
            ("User ID", self.user_id.clone()),
            ("Email", self.email.clone().unwrap_or_else(|| "--".into())),
            ("Role", self.role.to_string()),
        ])
    }
}

// ── Prompts ──────────────────────────────────────────────────────────

fn email_for(ctx: &AppContext, args: &LoginArgs) -> Result<String, CliError> {
    let email = match args.email.clone().or_else(|| ctx.resolved.profile.email.clone()) {
        Some(email) => email,
        None => Input::new()
            .with_prompt("Email")
            .interact_text()
            .map_err(util::prompt_err)?,
    };
    let email = email.trim().to_owned();
    if email.is_empty() {
        return Err(CliError::Validation {
            field: "email".into(),
            reason: "email cannot be empty".into(),
        });
    }
    Ok(email)
}

fn password(confirm: bool) -> Result<SecretString, CliError> {
    if let Ok(value) = std::env::var(PASSWORD_ENV) {
        return Ok(SecretString::from(value));
    }

    let first = rpassword::prompt_password("Password: ").map_err(util::prompt_err)?;
    if first.is_empty() {
        return Err(CliError::Validation {
            field: "password".into(),
            reason: "password cannot be empty".into(),
        });
    }
    if confirm {
        let again = rpassword::prompt_password("Confirm password: ").map_err(util::prompt_err)?;
        if again != first {
            return Err(CliError::Validation {
                field: "password".into(),
                reason: "passwords do not match".into(),
            });
        }
    }
    Ok(SecretString::from(first))
}

// ── Handlers ─────────────────────────────────────────────────────────

pub async fn login(ctx: &AppContext, args: LoginArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let email = email_for(ctx, &args)?;
    let password = password(false)?;

    let session = match ctx.backend.identity.sign_in(&email, &password).await {
        Ok(session) => session,
        Err(CoreError::CredentialsRejected) => return Err(CliError::InvalidCredentials),
        Err(e) => return Err(e.into()),
    };
    util::persist_session(ctx, &session).await?;

    let role = util::resolve_role(ctx).await.role();
    if !global.quiet {
        eprintln!("Signed in as {email} ({role})");
    }
    Ok(())
}

pub async fn register(
    ctx: &AppContext,
    args: LoginArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let email = email_for(ctx, &args)?;
    let password = password(true)?;

    // Registration failures carry the provider's own message.
    let session = ctx.backend.identity.register(&email, &password).await?;
    util::persist_session(ctx, &session).await?;

    ctx.backend
        .store
        .write(
            &profile_path(&session.user_id),
            UserProfile::new_user_record(&email),
        )
        .await?;
    info!(user_id = %session.user_id, "profile record created");

    if !global.quiet {
        eprintln!("Account created for {email} (role: user)");
    }
    Ok(())
}

pub async fn logout(ctx: &AppContext, global: &GlobalOpts) -> Result<(), CliError> {
    let existed = util::forget_session(ctx).await?;
    if !global.quiet {
        if existed {
            eprintln!("Signed out");
        } else {
            eprintln!("Not signed in");
        }
    }
    Ok(())
}

pub async fn whoami(ctx: &AppContext, global: &GlobalOpts) -> Result<(), CliError> {
    util::restore_session(ctx).await?;

    let who = match util::resolve_role(ctx).await {
        SessionState::SignedIn {
            user_id,
            email,
            role,
        } => WhoAmI {
            user_id,
            email,
            role,
        },
        _ => {
            return Err(CliError::NotSignedIn {
                profile: ctx.resolved.profile_name.clone(),
            });
        }
    };

    let out = output::render_single(&global.output, &who, WhoAmI::detail, |w| {
        w.user_id.clone()
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}
