// Hourly forecast (Open-Meteo forecast API)

use serde::Deserialize;
use tracing::debug;

use crate::error::Error;
use crate::transport::{TransportConfig, endpoint, read_json};

pub const DEFAULT_FORECAST_URL: &str = "https://api.open-meteo.com";

/// Hourly series requested from the forecast endpoint.
const HOURLY_FIELDS: &str = "temperature_2m,precipitation_probability";

/// Parallel hourly arrays. Entries may be `null` where the model has no value.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct HourlyForecast {
    #[serde(default)]
    pub time: Vec<String>,
    #[serde(default)]
    pub temperature_2m: Vec<Option<f64>>,
    #[serde(default)]
    pub precipitation_probability: Vec<Option<f64>>,
}

#[derive(Deserialize)]
struct ForecastResponse {
    #[serde(default)]
    hourly: HourlyForecast,
}

pub struct ForecastClient {
    http: reqwest::Client,
    base_url: String,
}

impl ForecastClient {
    pub fn new(base_url: impl Into<String>, transport: &TransportConfig) -> Result<Self, Error> {
        Ok(Self::with_client(transport.build_client()?, base_url))
    }

    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    /// Fetch hourly temperature and precipitation probability in the
    /// location's local timezone.
    ///
    /// `GET /v1/forecast?latitude=..&longitude=..&hourly=..&timezone=auto`
    pub async fn hourly(&self, latitude: f64, longitude: f64) -> Result<HourlyForecast, Error> {
        let mut url = endpoint(&self.base_url, "v1/forecast")?;
        url.query_pairs_mut()
            .append_pair("latitude", &latitude.to_string())
            .append_pair("longitude", &longitude.to_string())
            .append_pair("hourly", HOURLY_FIELDS)
            .append_pair("timezone", "auto");

        debug!(latitude, longitude, "fetching forecast");
        let resp = self.http.get(url).send().await?;
        let body: ForecastResponse = read_json(resp).await?;
        Ok(body.hourly)
    }
}
