// ── Dashboard view model ──
//
// A pure rendering of role, snapshots, and forecast into display strings.
// Front-ends (the CLI table, JSON output) only format what is here.

use serde::Serialize;

use crate::derive::{Daylight, DerivedState, RainState};
use crate::model::controls::label_for;
use crate::model::{ControlSnapshot, ForecastState, Role, SensorSnapshot};

/// Sensor card values, formatted for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SensorCards {
    pub temperature: String,
    pub humidity: String,
    pub rain: String,
    pub time_of_day: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToggleView {
    pub key: String,
    pub label: String,
    pub on: bool,
}

impl ToggleView {
    pub fn state_label(&self) -> &'static str {
        if self.on { "ON" } else { "OFF" }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeatherCard {
    pub place: String,
    /// `None` while loading.
    pub lines: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardView {
    pub role: Role,
    pub sensors: SensorCards,
    /// Present only for roles allowed to flip controls.
    pub controls: Option<Vec<ToggleView>>,
    pub weather: WeatherCard,
}

fn reading(value: Option<f64>, unit: &str) -> String {
    match value {
        Some(v) => format!("{v} {unit}"),
        None => format!("-- {unit}"),
    }
}

pub fn sensor_cards(sensors: &SensorSnapshot) -> SensorCards {
    let derived = DerivedState::resolve(sensors);
    SensorCards {
        temperature: reading(sensors.temperature, "°C"),
        humidity: reading(sensors.humidity, "%"),
        rain: match derived.rain {
            RainState::Rain => "YES".into(),
            RainState::NoRain => "NO".into(),
        },
        time_of_day: match derived.daylight {
            Daylight::Day => "DAY".into(),
            Daylight::Night => "NIGHT".into(),
            Daylight::Unknown => "--".into(),
        },
    }
}

pub fn toggles(controls: &ControlSnapshot) -> Vec<ToggleView> {
    controls
        .display_keys()
        .into_iter()
        .map(|key| ToggleView {
            label: label_for(&key),
            on: controls.is_on(&key),
            key,
        })
        .collect()
}

pub fn weather_card(place: &str, forecast: &ForecastState) -> WeatherCard {
    WeatherCard {
        place: place.to_owned(),
        lines: forecast.sample().map(|s| {
            vec![
                format!("Forecast Time: {}", s.time),
                format!("Temperature: {} °C", s.temperature_c),
                format!(
                    "Rain Probability: {}% ({})",
                    s.rain_probability_pct,
                    if s.rain_likely() { "rain likely" } else { "dry" }
                ),
            ]
        }),
    }
}

/// Build the full view. Controls are included iff `role` may use them.
pub fn render(
    role: Role,
    sensors: &SensorSnapshot,
    controls: &ControlSnapshot,
    place: &str,
    forecast: &ForecastState,
) -> DashboardView {
    DashboardView {
        role,
        sensors: sensor_cards(sensors),
        controls: role.can_control().then(|| toggles(controls)),
        weather: weather_card(place, forecast),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ForecastSample;
    use pretty_assertions::assert_eq;

    fn controls() -> ControlSnapshot {
        [("system".to_owned(), true), ("servo2".to_owned(), false)]
            .into_iter()
            .collect()
    }

    #[test]
    fn controls_render_only_for_admin() {
        let sensors = SensorSnapshot::default();
        for (role, shown) in [(Role::Admin, true), (Role::User, false), (Role::Unknown, false)] {
            let view = render(role, &sensors, &controls(), "Dhaka", &ForecastState::Loading);
            assert_eq!(view.controls.is_some(), shown, "role {role}");
        }
    }

    #[test]
    fn admin_sees_known_toggles_in_order() {
        let view = render(
            Role::Admin,
            &SensorSnapshot::default(),
            &controls(),
            "Dhaka",
            &ForecastState::Loading,
        );
        assert_eq!(
            view.controls,
            Some(vec![
                ToggleView { key: "system".into(), label: "System".into(), on: true },
                ToggleView { key: "servo1".into(), label: "Servo 1".into(), on: false },
                ToggleView { key: "servo2".into(), label: "Servo 2".into(), on: false },
            ])
        );
    }

    #[test]
    fn sensor_cards_format_unknowns() {
        assert_eq!(
            sensor_cards(&SensorSnapshot::default()),
            SensorCards {
                temperature: "-- °C".into(),
                humidity: "-- %".into(),
                rain: "NO".into(),
                time_of_day: "--".into(),
            }
        );

        let s = SensorSnapshot {
            temperature: Some(24.5),
            humidity: Some(61.0),
            rain: Some(true),
            ldr: Some(800.0),
        };
        assert_eq!(
            sensor_cards(&s),
            SensorCards {
                temperature: "24.5 °C".into(),
                humidity: "61 %".into(),
                rain: "YES".into(),
                time_of_day: "NIGHT".into(),
            }
        );
    }

    #[test]
    fn weather_card_lines() {
        let ready = ForecastState::Ready(ForecastSample {
            time: "2026-10-16T00:00".into(),
            temperature_c: 27.1,
            rain_probability_pct: 65.0,
        });
        let card = weather_card("Dhaka", &ready);
        assert_eq!(
            card.lines,
            Some(vec![
                "Forecast Time: 2026-10-16T00:00".to_owned(),
                "Temperature: 27.1 °C".to_owned(),
                "Rain Probability: 65% (rain likely)".to_owned(),
            ])
        );
        assert_eq!(weather_card("Dhaka", &ForecastState::Loading).lines, None);
    }
}
