//! Sensor command handler.

use serde::Serialize;

use iotguard_core::view::sensor_cards;
use iotguard_core::{DerivedState, RealtimeStore, SensorSnapshot};

use super::{AppContext, util};
use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

#[derive(Serialize)]
struct SensorReport {
    path: String,
    readings: SensorSnapshot,
    derived: DerivedState,
}

impl SensorReport {
    fn detail(&self) -> String {
        let cards = sensor_cards(&self.readings);
        output::render_pairs(&[
            ("Temperature", cards.temperature),
            ("Humidity", cards.humidity),
            ("Rain", cards.rain),
            ("Time of day", cards.time_of_day),
            ("Light (ldr)", util::reading(self.readings.ldr)),
        ])
    }
}

pub async fn handle(ctx: &AppContext, global: &GlobalOpts) -> Result<(), CliError> {
    util::restore_session(ctx).await?;

    let path = ctx.resolved.dashboard.paths.sensors.clone();
    let value = ctx.backend.store.read_once(&path).await?;
    let readings = SensorSnapshot::from_value(value.as_ref());
    if readings.is_empty() && !global.quiet {
        eprintln!("No sensor data at '{path}' yet");
    }

    let report = SensorReport {
        derived: DerivedState::resolve(&readings),
        readings,
        path,
    };
    let out = output::render_single(&global.output, &report, SensorReport::detail, |r| {
        format!(
            "{}\n{}\n{}\n{}",
            util::reading(r.readings.temperature),
            util::reading(r.readings.humidity),
            r.derived.rain,
            r.derived.daylight,
        )
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}
