// Place-name geocoding (Nominatim search API)

use serde::{Deserialize, Deserializer};
use tracing::debug;

use crate::error::Error;
use crate::transport::{TransportConfig, endpoint, read_json};

pub const DEFAULT_GEOCODE_URL: &str = "https://nominatim.openstreetmap.org";

/// One geocoding match.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GeocodeResult {
    #[serde(deserialize_with = "number_or_string")]
    pub lat: f64,
    #[serde(deserialize_with = "number_or_string")]
    pub lon: f64,
    #[serde(default)]
    pub display_name: String,
}

/// Coordinates arrive as strings (`"23.81"`) from Nominatim.
fn number_or_string<'de, D: Deserializer<'de>>(de: D) -> Result<f64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(f64),
        Str(String),
    }

    match Raw::deserialize(de)? {
        Raw::Num(n) => Ok(n),
        Raw::Str(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

pub struct GeocodingClient {
    http: reqwest::Client,
    base_url: String,
}

impl GeocodingClient {
    pub fn new(base_url: impl Into<String>, transport: &TransportConfig) -> Result<Self, Error> {
        Ok(Self::with_client(transport.build_client()?, base_url))
    }

    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    /// Search for a place name, returning at most `limit` matches (best first).
    ///
    /// `GET /search?q=..&format=json&limit=..`
    pub async fn search(&self, place: &str, limit: u32) -> Result<Vec<GeocodeResult>, Error> {
        let mut url = endpoint(&self.base_url, "search")?;
        url.query_pairs_mut()
            .append_pair("q", place)
            .append_pair("format", "json")
            .append_pair("limit", &limit.to_string());

        debug!(place, "geocoding");
        let resp = self.http.get(url).send().await?;
        read_json(resp).await
    }
}
