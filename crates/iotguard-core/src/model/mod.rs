// ── Dashboard domain model ──
//
// Canonical shapes for everything the dashboard reads from the realtime
// store or the weather endpoints. Decoding is lenient: the device that
// writes these locations is not under our control.

pub mod controls;
pub mod forecast;
pub mod lenient;
pub mod profile;
pub mod sensors;

// ── Re-exports ──────────────────────────────────────────────────────

pub use controls::{ControlSnapshot, KNOWN_CONTROLS};
pub use forecast::{Coordinates, ForecastSample, ForecastState};
pub use profile::{Role, Session, UserProfile};
pub use sensors::SensorSnapshot;
