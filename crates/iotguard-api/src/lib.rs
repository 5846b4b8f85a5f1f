// iotguard-api: Async clients for the identity provider, the realtime
// database (REST + event stream), and the public weather endpoints.

pub mod error;
pub mod identity;
pub mod realtime;
pub mod token;
pub mod transport;
pub mod weather;

pub use error::Error;
pub use identity::{AuthTokens, IdentityClient};
pub use realtime::{RealtimeClient, ReconnectConfig, StreamEvent, StreamHandle};
pub use token::{StaticToken, TokenProvider};
pub use weather::{ForecastClient, GeocodeResult, GeocodingClient, HourlyForecast};
