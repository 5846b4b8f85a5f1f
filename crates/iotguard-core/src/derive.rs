// ── Derived display state ──
//
// Pure functions of the latest SensorSnapshot, recomputed on every push.

use serde::Serialize;
use strum::Display;

use crate::model::SensorSnapshot;

/// LDR readings at or below this value count as daylight.
pub const LDR_DAY_THRESHOLD: f64 = 300.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Daylight {
    Day,
    Night,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
pub enum RainState {
    #[strum(serialize = "rain")]
    #[serde(rename = "rain")]
    Rain,
    #[strum(serialize = "no rain")]
    #[serde(rename = "no rain")]
    NoRain,
}

/// Everything the dashboard derives from sensor readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DerivedState {
    pub daylight: Daylight,
    pub rain: RainState,
}

impl DerivedState {
    pub fn resolve(sensors: &SensorSnapshot) -> Self {
        Self {
            daylight: daylight(sensors.ldr),
            rain: rain(sensors.rain),
        }
    }
}

pub fn daylight(ldr: Option<f64>) -> Daylight {
    match ldr {
        None => Daylight::Unknown,
        Some(v) if v <= LDR_DAY_THRESHOLD => Daylight::Day,
        Some(_) => Daylight::Night,
    }
}

/// An absent rain reading shows as no rain.
pub fn rain(reading: Option<bool>) -> RainState {
    if reading.unwrap_or(false) {
        RainState::Rain
    } else {
        RainState::NoRain
    }
}
