use async_trait::async_trait;
use iotguard_api::{ForecastClient, GeocodingClient, HourlyForecast};

use crate::config::DashboardConfig;
use crate::error::CoreError;
use crate::model::Coordinates;
use crate::provider::WeatherApi;

/// [`WeatherApi`] over the public geocoding and forecast services.
pub struct PublicWeather {
    geocoder: GeocodingClient,
    forecast: ForecastClient,
}

impl PublicWeather {
    pub fn new(geocoder: GeocodingClient, forecast: ForecastClient) -> Self {
        Self { geocoder, forecast }
    }

    /// Clients for the configured endpoints. Needs no credentials.
    pub fn from_config(config: &DashboardConfig) -> Result<Self, CoreError> {
        let transport = config.transport();
        Ok(Self::new(
            GeocodingClient::new(config.geocode_url.clone(), &transport)?,
            ForecastClient::new(config.forecast_url.clone(), &transport)?,
        ))
    }
}

#[async_trait]
impl WeatherApi for PublicWeather {
    async fn geocode(&self, place: &str) -> Result<Vec<Coordinates>, CoreError> {
        let results = self.geocoder.search(place, 1).await?;
        Ok(results
            .into_iter()
            .map(|r| Coordinates {
                latitude: r.lat,
                longitude: r.lon,
            })
            .collect())
    }

    async fn forecast(&self, at: Coordinates) -> Result<HourlyForecast, CoreError> {
        Ok(self.forecast.hourly(at.latitude, at.longitude).await?)
    }
}
