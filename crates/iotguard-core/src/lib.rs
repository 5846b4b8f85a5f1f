// iotguard-core: the dashboard's state model.
//
// Session gating, live mirroring of device state, control dispatch,
// derived display values, and the weather lookup chain. Remote access
// goes through the traits in `provider`; `backend` binds them to
// `iotguard-api` and `memory` provides in-process versions.

pub mod backend;
pub mod config;
pub mod control;
pub mod dashboard;
pub mod derive;
pub mod error;
pub mod memory;
pub mod mirror;
pub mod model;
pub mod provider;
pub mod session;
pub mod stream;
pub mod view;
pub mod weather;

// ── Primary re-exports ──────────────────────────────────────────────

pub use backend::{Backend, FirebaseIdentity, FirebaseStore, PublicWeather};
pub use config::{DEFAULT_PLACE, DashboardConfig, MirrorPaths, TlsVerification};
pub use control::ControlDispatcher;
pub use dashboard::{Dashboard, DashboardContext, DashboardUpdates};
pub use derive::{Daylight, DerivedState, LDR_DAY_THRESHOLD, RainState};
pub use error::CoreError;
pub use mirror::StateMirror;
pub use provider::{IdentityProvider, RealtimeStore, Subscription, WeatherApi};
pub use session::{SessionGate, SessionState};
pub use stream::{SnapshotStream, SnapshotWatchStream};
pub use view::DashboardView;
pub use weather::{LookupOutcome, PipelineOptions, StaleResults, WeatherPipeline};

pub use model::{
    ControlSnapshot, Coordinates, ForecastSample, ForecastState, Role, SensorSnapshot, Session,
    UserProfile,
};
