use iotguard_api::HourlyForecast;
use serde::Serialize;

/// Rain is shown as likely above this precipitation probability.
pub const RAIN_LIKELY_ABOVE_PCT: f64 = 50.0;

/// A geocoded location.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// The first hourly forecast entry for a place.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastSample {
    /// Local time of the sample, as returned by the forecast service.
    pub time: String,
    pub temperature_c: f64,
    pub rain_probability_pct: f64,
}

impl ForecastSample {
    /// Take the index-0 entry. Missing, non-finite, or out-of-range values
    /// make the whole sample invalid.
    pub fn from_hourly(hourly: &HourlyForecast) -> Option<Self> {
        let time = hourly.time.first()?.clone();
        let temperature_c = (*hourly.temperature_2m.first()?)?;
        let rain_probability_pct = (*hourly.precipitation_probability.first()?)?;

        if !temperature_c.is_finite() || !(0.0..=100.0).contains(&rain_probability_pct) {
            return None;
        }
        Some(Self {
            time,
            temperature_c,
            rain_probability_pct,
        })
    }

    pub fn rain_likely(&self) -> bool {
        self.rain_probability_pct > RAIN_LIKELY_ABOVE_PCT
    }
}

/// What the weather card shows.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "state", content = "sample", rename_all = "lowercase")]
pub enum ForecastState {
    /// No sample yet (first lookup pending, failed, or found nothing).
    #[default]
    Loading,
    Ready(ForecastSample),
}

impl ForecastState {
    pub fn sample(&self) -> Option<&ForecastSample> {
        match self {
            Self::Loading => None,
            Self::Ready(s) => Some(s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hourly(temp: Option<f64>, rain: Option<f64>) -> HourlyForecast {
        HourlyForecast {
            time: vec!["2026-10-16T00:00".into(), "2026-10-16T01:00".into()],
            temperature_2m: vec![temp, Some(30.0)],
            precipitation_probability: vec![rain, Some(10.0)],
        }
    }

    #[test]
    fn first_entry_becomes_sample() {
        let s = ForecastSample::from_hourly(&hourly(Some(27.5), Some(65.0)));
        assert_eq!(
            s,
            Some(ForecastSample {
                time: "2026-10-16T00:00".into(),
                temperature_c: 27.5,
                rain_probability_pct: 65.0,
            })
        );
        assert!(s.is_some_and(|s| s.rain_likely()));
    }

    #[test]
    fn missing_or_invalid_first_entry_is_none() {
        assert_eq!(ForecastSample::from_hourly(&HourlyForecast::default()), None);
        assert_eq!(ForecastSample::from_hourly(&hourly(None, Some(10.0))), None);
        assert_eq!(ForecastSample::from_hourly(&hourly(Some(20.0), None)), None);
        assert_eq!(ForecastSample::from_hourly(&hourly(Some(20.0), Some(140.0))), None);
        assert_eq!(ForecastSample::from_hourly(&hourly(Some(f64::INFINITY), Some(1.0))), None);
    }

    #[test]
    fn fifty_percent_is_not_rain() {
        let s = ForecastSample {
            time: String::new(),
            temperature_c: 20.0,
            rain_probability_pct: 50.0,
        };
        assert!(!s.rain_likely());
    }
}
