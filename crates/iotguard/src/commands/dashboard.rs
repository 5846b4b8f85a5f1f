//! Live dashboard.
//!
//! Mounts the session gate, the state mirror, and the weather pipeline, and
//! re-renders whenever any of them changes. Lines typed on stdin drive the
//! same actions as the dashboard buttons. Exits on Ctrl-C, `quit`, or when
//! the session ends.

use std::io::{IsTerminal, Write};

use chrono::{DateTime, Local, Utc};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::debug;

use iotguard_core::view::ToggleView;
use iotguard_core::{CoreError, Dashboard, DashboardView, PipelineOptions, StaleResults};

use super::{AppContext, util};
use crate::cli::{DashboardArgs, GlobalOpts, OutputFormat};
use crate::config;
use crate::error::CliError;
use crate::output;

const HELP: &str = "commands: place <name> | on <key> | off <key> | toggle <key> | logout | quit";

// ── Interactive input ────────────────────────────────────────────────

#[derive(Debug, PartialEq, Eq)]
enum Input {
    Place(String),
    Set(String, bool),
    Toggle(String),
    Logout,
    Quit,
    Help,
    Redraw,
    Unknown(String),
}

fn parse_input(line: &str) -> Input {
    let line = line.trim();
    let (verb, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();

    match (verb.to_ascii_lowercase().as_str(), rest.is_empty()) {
        ("", _) => Input::Redraw,
        ("place" | "p", false) => Input::Place(rest.to_owned()),
        ("on", false) => Input::Set(rest.to_owned(), true),
        ("off", false) => Input::Set(rest.to_owned(), false),
        ("toggle" | "t", false) => Input::Toggle(rest.to_owned()),
        ("logout", true) => Input::Logout,
        ("quit" | "q" | "exit", true) => Input::Quit,
        ("help" | "?", _) => Input::Help,
        _ => Input::Unknown(line.to_owned()),
    }
}

/// Next stdin line. Once stdin closes, never resolves again.
async fn next_line(input: &mut Option<Lines<BufReader<Stdin>>>) -> Option<String> {
    let Some(lines) = input.as_mut() else {
        return std::future::pending().await;
    };
    match lines.next_line().await {
        Ok(Some(line)) => Some(line),
        Ok(None) | Err(_) => {
            *input = None;
            None
        }
    }
}

// ── Rendering ────────────────────────────────────────────────────────

struct Screen {
    format: OutputFormat,
    color: bool,
    quiet: bool,
    clear: bool,
    last: Option<String>,
}

impl Screen {
    fn new(global: &GlobalOpts) -> Self {
        let clear = matches!(global.output, OutputFormat::Table) && std::io::stdout().is_terminal();
        Self {
            format: global.output.clone(),
            color: output::should_color(&global.color),
            quiet: global.quiet,
            clear,
            last: None,
        }
    }

    /// Draw the view unless it is unchanged since the last draw.
    fn draw(&mut self, view: &DashboardView, last_push: Option<DateTime<Utc>>) -> Result<(), CliError> {
        let text = match self.format {
            OutputFormat::Table => render_text(view, last_push, self.color),
            OutputFormat::Json | OutputFormat::JsonCompact => output::render_json_compact(view)?,
            OutputFormat::Yaml => format!("---\n{}", output::render_yaml(view)?),
            OutputFormat::Plain => render_plain(view),
        };
        if self.last.as_deref() == Some(text.as_str()) {
            return Ok(());
        }
        if !self.quiet {
            let mut stdout = std::io::stdout().lock();
            if self.clear {
                let _ = write!(stdout, "\x1b[2J\x1b[H");
            }
            let _ = writeln!(stdout, "{text}");
            let _ = stdout.flush();
        }
        self.last = Some(text);
        Ok(())
    }
}

fn render_text(view: &DashboardView, last_push: Option<DateTime<Utc>>, color: bool) -> String {
    let updated = last_push.map_or_else(
        || "waiting for device".into(),
        |at| format!("updated {}", at.with_timezone(&Local).format("%H:%M:%S")),
    );
    let mut blocks = vec![
        output::heading(&format!("iotguard · role: {} · {updated}", view.role), color),
        output::render_pairs(&[
            ("Temperature", view.sensors.temperature.clone()),
            ("Humidity", view.sensors.humidity.clone()),
            ("Rain", view.sensors.rain.clone()),
            ("Time of day", view.sensors.time_of_day.clone()),
        ]),
    ];

    if let Some(ref controls) = view.controls {
        blocks.push(output::heading("Controls", color));
        let pairs: Vec<(&str, String)> = controls
            .iter()
            .map(|t: &ToggleView| (t.label.as_str(), output::switch_label(t.on, color)))
            .collect();
        blocks.push(output::render_pairs(&pairs));
    }

    blocks.push(output::heading(&format!("Weather · {}", view.weather.place), color));
    blocks.push(
        view.weather
            .lines
            .as_ref()
            .map_or_else(|| "Loading...".into(), |lines| lines.join("\n")),
    );
    blocks.join("\n")
}

fn render_plain(view: &DashboardView) -> String {
    let mut fields = vec![
        format!("role={}", view.role),
        format!("temperature={}", view.sensors.temperature),
        format!("humidity={}", view.sensors.humidity),
        format!("rain={}", view.sensors.rain),
        format!("time_of_day={}", view.sensors.time_of_day),
    ];
    if let Some(ref controls) = view.controls {
        fields.extend(controls.iter().map(|t| format!("{}={}", t.key, t.state_label())));
    }
    fields.join(" ")
}

// ── Handler ──────────────────────────────────────────────────────────

pub async fn handle(
    ctx: &AppContext,
    args: DashboardArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    util::restore_session(ctx).await?;

    let options = PipelineOptions {
        stale_results: if args.latest_place_wins {
            StaleResults::LatestRequestWins
        } else {
            StaleResults::LastCompletedWins
        },
        clear_on_change: args.clear_on_change,
    };
    let dash = Dashboard::mount(&ctx.backend.context(), &ctx.resolved.dashboard.paths, options)?;
    let place = args
        .place
        .unwrap_or_else(|| ctx.resolved.dashboard.place.clone());
    drop(dash.set_place(place));

    let result = run(ctx, &dash, global).await;
    dash.teardown().await;
    result
}

async fn run(ctx: &AppContext, dash: &Dashboard, global: &GlobalOpts) -> Result<(), CliError> {
    let mut screen = Screen::new(global);
    let mut updates = dash.updates();
    let mut input = Some(BufReader::new(tokio::io::stdin()).lines());

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    if !global.quiet && std::io::stdin().is_terminal() {
        eprintln!("{HELP}");
    }

    loop {
        screen.draw(&dash.view(), dash.mirror().last_push())?;

        tokio::select! {
            _ = &mut ctrl_c => return Ok(()),

            alive = updates.changed() => {
                if !alive {
                    return Ok(());
                }
                if updates.session().is_signed_out() {
                    if !global.quiet {
                        eprintln!("Session ended");
                    }
                    return Ok(());
                }
            }

            Some(line) = next_line(&mut input) => {
                if !apply(ctx, dash, parse_input(&line)).await? {
                    return Ok(());
                }
            }
        }
    }
}

/// Act on one input line. Returns `false` to leave the dashboard.
async fn apply(ctx: &AppContext, dash: &Dashboard, input: Input) -> Result<bool, CliError> {
    match input {
        Input::Place(place) => {
            drop(dash.set_place(place));
        }
        Input::Set(key, value) => toggle(dash, &key, value),
        Input::Toggle(key) => {
            let value = !dash.mirror().controls().is_on(&key);
            toggle(dash, &key, value);
        }
        Input::Logout => {
            if let Err(e) = dash.gate().logout().await {
                debug!(error = %e, "sign-out reported an error");
            }
            config::clear_session(&ctx.resolved.session_file, &ctx.resolved.profile_name)?;
        }
        Input::Quit => return Ok(false),
        Input::Help => eprintln!("{HELP}"),
        Input::Redraw => {}
        Input::Unknown(line) => eprintln!("unknown command: {line}\n{HELP}"),
    }
    Ok(true)
}

fn toggle(dash: &Dashboard, key: &str, value: bool) {
    match dash.toggle(key, value) {
        // Fire-and-forget: the mirror shows the result once the device
        // record changes.
        Ok(handle) => drop(handle),
        Err(CoreError::NotAuthorized) => eprintln!("Controls can only be changed by an admin"),
        Err(e) => eprintln!("{e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iotguard_core::Role;
    use iotguard_core::view::{SensorCards, WeatherCard};

    fn view(role: Role, controls: Option<Vec<ToggleView>>) -> DashboardView {
        DashboardView {
            role,
            sensors: SensorCards {
                temperature: "24.5 °C".into(),
                humidity: "60 %".into(),
                rain: "NO".into(),
                time_of_day: "DAY".into(),
            },
            controls,
            weather: WeatherCard {
                place: "Dhaka".into(),
                lines: None,
            },
        }
    }

    #[test]
    fn input_lines_parse_to_actions() {
        assert_eq!(parse_input("place  New York "), Input::Place("New York".into()));
        assert_eq!(parse_input("on servo1"), Input::Set("servo1".into(), true));
        assert_eq!(parse_input("OFF system"), Input::Set("system".into(), false));
        assert_eq!(parse_input("t servo2"), Input::Toggle("servo2".into()));
        assert_eq!(parse_input("logout"), Input::Logout);
        assert_eq!(parse_input("q"), Input::Quit);
        assert_eq!(parse_input("   "), Input::Redraw);
        assert_eq!(parse_input("on"), Input::Unknown("on".into()));
    }

    #[test]
    fn text_view_hides_controls_for_users() {
        let text = render_text(&view(Role::User, None), None, false);
        assert!(text.contains("24.5 °C"));
        assert!(text.contains("waiting for device"));
        assert!(text.contains("Loading..."));
        assert!(!text.contains("Controls"));
    }

    #[test]
    fn plain_view_lists_controls_for_admin() {
        let toggles = vec![ToggleView {
            key: "servo1".into(),
            label: "Servo 1".into(),
            on: true,
        }];
        let line = render_plain(&view(Role::Admin, Some(toggles)));
        assert!(line.starts_with("role=admin "));
        assert!(line.ends_with("servo1=ON"));
    }
}
