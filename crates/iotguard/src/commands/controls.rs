//! Control command handlers.
//!
//! The admin check here is client-side only; the database's security
//! rules have to enforce the same restriction.

use tabled::Tabled;

use iotguard_core::view::{ToggleView, toggles};
use iotguard_core::{ControlDispatcher, ControlSnapshot, RealtimeStore};

use super::{AppContext, util};
use crate::cli::{ControlsArgs, ControlsCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct ControlRow {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Control")]
    label: String,
    #[tabled(rename = "State")]
    state: String,
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    ctx: &AppContext,
    args: ControlsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    util::restore_session(ctx).await?;

    match args.command {
        ControlsCommand::List => {
            let snapshot = read_controls(ctx).await?;
            let color = output::should_color(&global.color);
            let out = output::render_list(
                &global.output,
                &toggles(&snapshot),
                |t: &ToggleView| ControlRow {
                    key: t.key.clone(),
                    label: t.label.clone(),
                    state: output::switch_label(t.on, color),
                },
                |t| format!("{}={}", t.key, t.state_label()),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ControlsCommand::Set { key, state } => set(ctx, &key, state.as_bool(), global).await,

        ControlsCommand::Toggle { key } => {
            let current = read_controls(ctx).await?.is_on(&key);
            set(ctx, &key, !current, global).await
        }
    }
}

async fn read_controls(ctx: &AppContext) -> Result<ControlSnapshot, CliError> {
    let value = ctx
        .backend
        .store
        .read_once(&ctx.resolved.dashboard.paths.controls)
        .await?;
    Ok(ControlSnapshot::from_value(value.as_ref()))
}

async fn set(ctx: &AppContext, key: &str, value: bool, global: &GlobalOpts) -> Result<(), CliError> {
    if !util::resolve_role(ctx).await.role().can_control() {
        return Err(CliError::NotAuthorized);
    }

    let dispatcher = ControlDispatcher::new(
        ctx.backend.store.clone(),
        ctx.resolved.dashboard.paths.controls.clone(),
    );
    dispatcher.toggle_acked(key, value).await?;

    if !global.quiet {
        let color = output::should_color(&global.color);
        eprintln!("{key} -> {}", output::switch_label(value, color));
    }
    Ok(())
}
