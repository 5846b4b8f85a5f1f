//! Public weather endpoints: place-name geocoding and hourly forecasts.
//! Neither requires credentials.

mod forecast;
mod geocode;

pub use forecast::{DEFAULT_FORECAST_URL, ForecastClient, HourlyForecast};
pub use geocode::{DEFAULT_GEOCODE_URL, GeocodeResult, GeocodingClient};
