use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use super::lenient;

/// Control flags the dashboard always shows, with their display labels.
pub const KNOWN_CONTROLS: &[(&str, &str)] = &[
    ("system", "System"),
    ("servo1", "Servo 1"),
    ("servo2", "Servo 2"),
];

/// Named boolean flags from the `controls` location.
///
/// Open-ended: the device may define flags beyond [`KNOWN_CONTROLS`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ControlSnapshot(BTreeMap<String, bool>);

impl ControlSnapshot {
    /// Decode a pushed value. `None` or a non-object yields no flags.
    pub fn from_value(value: Option<&Value>) -> Self {
        let Some(Value::Object(map)) = value else {
            return Self::default();
        };
        Self(
            map.iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.clone(), lenient::truthy(v)))
                .collect(),
        )
    }

    /// The flag's value, or `None` if the device has not written it.
    pub fn get(&self, key: &str) -> Option<bool> {
        self.0.get(key).copied()
    }

    /// `true` only if the flag is present and set.
    pub fn is_on(&self, key: &str) -> bool {
        self.get(key).unwrap_or(false)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Display order: known flags first, then any others alphabetically.
    pub fn display_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = KNOWN_CONTROLS.iter().map(|(k, _)| (*k).to_owned()).collect();
        keys.extend(
            self.0
                .keys()
                .filter(|k| !KNOWN_CONTROLS.iter().any(|(known, _)| *known == k.as_str()))
                .cloned(),
        );
        keys
    }
}

/// Human label for a control key (`servo1` → `Servo 1`).
pub fn label_for(key: &str) -> String {
    KNOWN_CONTROLS
        .iter()
        .find(|(k, _)| *k == key)
        .map_or_else(|| key.to_owned(), |(_, label)| (*label).to_owned())
}

impl FromIterator<(String, bool)> for ControlSnapshot {
    fn from_iter<I: IntoIterator<Item = (String, bool)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
