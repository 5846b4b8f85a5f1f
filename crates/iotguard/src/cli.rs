//! Clap derive structures for the `iotguard` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// iotguard -- sensors, controls, and weather for a connected device
#[derive(Debug, Parser)]
#[command(
    name = "iotguard",
    version,
    about = "Watch and control a realtime-database IoT device from the command line",
    long_about = "Signs in against the identity provider, mirrors the device's sensor and\n\
        control records from the realtime database, and looks up the local weather.\n\n\
        Controls can only be changed by accounts whose profile role is 'admin'.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Backend profile to use
    #[arg(long, short = 'p', env = "IOTGUARD_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Realtime database URL (overrides profile)
    #[arg(long, short = 'd', env = "IOTGUARD_DATABASE_URL", global = true)]
    pub database_url: Option<String>,

    /// Web API key of the identity project
    #[arg(long, env = "IOTGUARD_API_KEY", global = true, hide_env = true)]
    pub api_key: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "IOTGUARD_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept invalid TLS certificates (local emulators)
    #[arg(long, short = 'k', env = "IOTGUARD_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "IOTGUARD_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sign in with email and password
    Login(LoginArgs),

    /// Create an account (role 'user') and sign it in
    Register(LoginArgs),

    /// Sign out and forget the stored session
    Logout,

    /// Show the signed-in user and role
    Whoami,

    /// Read the current sensor values
    #[command(alias = "s")]
    Sensors,

    /// List or change control flags
    #[command(alias = "ctl")]
    Controls(ControlsArgs),

    /// Look up the forecast for a place
    #[command(alias = "w")]
    Weather(WeatherArgs),

    /// Live dashboard: sensors, controls, and weather, updated as they change
    #[command(alias = "dash")]
    Dashboard(DashboardArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Auth ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct LoginArgs {
    /// Account email (defaults to the profile's email, then a prompt)
    #[arg(long, short = 'e')]
    pub email: Option<String>,
}

// ── Controls ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ControlsArgs {
    #[command(subcommand)]
    pub command: ControlsCommand,
}

#[derive(Debug, Subcommand)]
pub enum ControlsCommand {
    /// List control flags and their state
    #[command(alias = "ls")]
    List,

    /// Switch a control on or off (admin only)
    Set {
        /// Control key, e.g. system, servo1
        key: String,

        /// New state
        state: SwitchState,
    },

    /// Flip a control's current state (admin only)
    Toggle {
        /// Control key
        key: String,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SwitchState {
    On,
    Off,
}

impl SwitchState {
    pub fn as_bool(self) -> bool {
        matches!(self, Self::On)
    }
}

// ── Weather ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WeatherArgs {
    /// Place name (defaults to the profile's place)
    pub place: Option<String>,
}

// ── Dashboard ────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct DashboardArgs {
    /// Initial weather place (defaults to the profile's place)
    #[arg(long)]
    pub place: Option<String>,

    /// Discard forecasts that finish after a newer place was requested
    #[arg(long)]
    pub latest_place_wins: bool,

    /// Show loading while a new place is looked up
    #[arg(long)]
    pub clear_on_change: bool,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display current configuration (secrets masked)
    Show,

    /// Print the config file path
    Path,

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_tree_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn controls_set_parses_state() {
        let cli = Cli::try_parse_from(["iotguard", "controls", "set", "servo1", "on"]);
        let Ok(cli) = cli else {
            panic!("parse failed");
        };
        match cli.command {
            Command::Controls(ControlsArgs {
                command: ControlsCommand::Set { key, state },
            }) => {
                assert_eq!(key, "servo1");
                assert!(state.as_bool());
            }
            other => panic!("unexpected command: {other:?}"),
        }

        assert!(Cli::try_parse_from(["iotguard", "controls", "set", "servo1", "maybe"]).is_err());
    }

    #[test]
    fn global_flags_after_subcommand() {
        let Ok(cli) = Cli::try_parse_from(["iotguard", "weather", "Sylhet", "-o", "json", "-vv"])
        else {
            panic!("parse failed");
        };
        assert!(matches!(cli.global.output, OutputFormat::Json));
        assert_eq!(cli.global.verbose, 2);
        assert!(matches!(
            cli.command,
            Command::Weather(WeatherArgs { place: Some(ref p) }) if p == "Sylhet"
        ));
    }
}
