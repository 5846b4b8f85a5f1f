//! Weather command handler. Uses the public services only; no sign-in.

use std::io::IsTerminal;
use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use iotguard_core::view::weather_card;
use iotguard_core::{
    DashboardConfig, ForecastSample, ForecastState, LookupOutcome, PipelineOptions, PublicWeather,
    WeatherPipeline,
};

use crate::cli::{GlobalOpts, WeatherArgs};
use crate::error::CliError;
use crate::output;

#[derive(Serialize)]
struct WeatherReport {
    place: String,
    forecast: Option<ForecastSample>,
}

impl WeatherReport {
    fn detail(&self) -> String {
        let state = self
            .forecast
            .clone()
            .map_or(ForecastState::Loading, ForecastState::Ready);
        match weather_card(&self.place, &state).lines {
            Some(lines) => format!("Weather for {}\n{}", self.place, lines.join("\n")),
            None => format!("No forecast data for {}", self.place),
        }
    }
}

fn spinner(place: &str, quiet: bool) -> ProgressBar {
    if quiet || !std::io::stderr().is_terminal() {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        bar.set_style(style);
    }
    bar.set_message(format!("Looking up {place}..."));
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

pub async fn handle(
    config: &DashboardConfig,
    args: WeatherArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let place = args.place.unwrap_or_else(|| config.place.clone());
    let pipeline = WeatherPipeline::new(
        Arc::new(PublicWeather::from_config(config)?),
        PipelineOptions::default(),
    );

    let bar = spinner(&place, global.quiet);
    let outcome = pipeline.lookup(place.clone()).await;
    bar.finish_and_clear();

    let forecast = match outcome {
        LookupOutcome::Updated(sample) => Some(sample),
        LookupOutcome::NoMatch => {
            tracing::info!(place = %place, "no geocoding match");
            None
        }
        LookupOutcome::Superseded | LookupOutcome::Failed => None,
    };

    let report = WeatherReport { place, forecast };
    let out = output::render_single(&global.output, &report, WeatherReport::detail, |r| {
        r.forecast.as_ref().map_or_else(
            || "no data".into(),
            |s| format!("{}\n{}\n{}", s.time, s.temperature_c, s.rain_probability_pct),
        )
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_without_forecast_says_no_data() {
        let report = WeatherReport {
            place: "Atlantis".into(),
            forecast: None,
        };
        assert_eq!(report.detail(), "No forecast data for Atlantis");
    }

    #[test]
    fn detail_lists_sample_lines() {
        let report = WeatherReport {
            place: "Dhaka".into(),
            forecast: Some(ForecastSample {
                time: "2026-10-16T06:00".into(),
                temperature_c: 29.5,
                rain_probability_pct: 70.0,
            }),
        };
        let text = report.detail();
        assert!(text.starts_with("Weather for Dhaka"));
        assert!(text.contains("Temperature: 29.5 °C"));
        assert!(text.contains("(rain likely)"));
    }
}
