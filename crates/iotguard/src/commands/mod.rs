//! Command handlers, one module per top-level command.

pub mod auth;
pub mod config_cmd;
pub mod controls;
pub mod dashboard;
pub mod sensors;
pub mod util;
pub mod weather;

use iotguard_core::Backend;

use crate::cli::{Command, GlobalOpts};
use crate::config::Resolved;
use crate::error::CliError;

/// A resolved profile plus the remote clients built from it.
pub struct AppContext {
    pub resolved: Resolved,
    pub backend: Backend,
}

impl AppContext {
    pub fn new(resolved: Resolved) -> Result<Self, CliError> {
        let backend = Backend::new(&resolved.dashboard)?;
        Ok(Self { resolved, backend })
    }
}

/// Dispatch a command that talks to the identity provider or the database.
pub async fn dispatch(cmd: Command, ctx: &AppContext, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Login(args) => auth::login(ctx, args, global).await,
        Command::Register(args) => auth::register(ctx, args, global).await,
        Command::Logout => auth::logout(ctx, global).await,
        Command::Whoami => auth::whoami(ctx, global).await,
        Command::Sensors => sensors::handle(ctx, global).await,
        Command::Controls(args) => controls::handle(ctx, args, global).await,
        Command::Dashboard(args) => dashboard::handle(ctx, args, global).await,
        // Handled before a backend is built
        Command::Weather(_) | Command::Config(_) | Command::Completions(_) => {
            Err(CliError::Validation {
                field: "command".into(),
                reason: "does not use a backend connection".into(),
            })
        }
    }
}
