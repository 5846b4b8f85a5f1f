use serde::Serialize;
use serde_json::Value;

use super::lenient;

/// Latest device-reported readings from the `sensors` location.
///
/// Every field is optional; a missing or malformed field is unknown.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SensorSnapshot {
    /// Degrees Celsius.
    pub temperature: Option<f64>,
    /// Relative humidity, percent.
    pub humidity: Option<f64>,
    /// Rain sensor state.
    pub rain: Option<bool>,
    /// Raw light-dependent-resistor reading (lower is brighter).
    pub ldr: Option<f64>,
}

impl SensorSnapshot {
    /// Decode a pushed value. `None` or a non-object yields all-unknown.
    pub fn from_value(value: Option<&Value>) -> Self {
        let Some(Value::Object(map)) = value else {
            return Self::default();
        };
        Self {
            temperature: lenient::number(map.get("temperature")),
            humidity: lenient::number(map.get("humidity")),
            rain: lenient::flag(map.get("rain")),
            ldr: lenient::number(map.get("ldr")),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_mixed_encodings() {
        let v = json!({"temperature": "26.4", "humidity": 71, "rain": 1, "ldr": 120, "extra": "x"});
        let s = SensorSnapshot::from_value(Some(&v));
        assert_eq!(s.temperature, Some(26.4));
        assert_eq!(s.humidity, Some(71.0));
        assert_eq!(s.rain, Some(true));
        assert_eq!(s.ldr, Some(120.0));
    }

    #[test]
    fn wrong_types_are_unknown() {
        let v = json!({"temperature": [1], "humidity": null, "ldr": {"v": 1}});
        let s = SensorSnapshot::from_value(Some(&v));
        assert!(s.is_empty());
    }

    #[test]
    fn absent_or_scalar_root_is_empty() {
        assert!(SensorSnapshot::from_value(None).is_empty());
        assert!(SensorSnapshot::from_value(Some(&json!(42))).is_empty());
    }
}
