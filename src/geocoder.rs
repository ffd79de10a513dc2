//! Address and postal-code lookup against the MapQuest geocoding API.

use crate::utils::{config::GeocoderConfig, ApiError, ApiResult};
use serde::Deserialize;

/// A resolved address
#[derive(Debug, Clone, PartialEq)]
pub struct GeoLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub formatted_address: String,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zipcode: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MapQuestResponse {
    #[serde(default)]
    results: Vec<MapQuestResult>,
}

#[derive(Debug, Deserialize)]
struct MapQuestResult {
    #[serde(default)]
    locations: Vec<MapQuestLocation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MapQuestLocation {
    lat_lng: LatLng,
    #[serde(default)]
    street: String,
    #[serde(default)]
    admin_area5: String,
    #[serde(default)]
    admin_area3: String,
    #[serde(default)]
    admin_area1: String,
    #[serde(default)]
    postal_code: String,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

impl From<MapQuestLocation> for GeoLocation {
    fn from(loc: MapQuestLocation) -> Self {
        let locality = [&loc.admin_area5, &loc.admin_area3, &loc.postal_code]
            .iter()
            .filter(|part| !part.is_empty())
            .map(|part| part.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let formatted_address = [loc.street.as_str(), locality.as_str(), loc.admin_area1.as_str()]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(", ");

        Self {
            latitude: loc.lat_lng.lat,
            longitude: loc.lat_lng.lng,
            formatted_address,
            street: non_empty(loc.street),
            city: non_empty(loc.admin_area5),
            state: non_empty(loc.admin_area3),
            zipcode: non_empty(loc.postal_code),
            country: non_empty(loc.admin_area1),
        }
    }
}

/// Geocoding client
#[derive(Clone)]
pub struct Geocoder {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl Geocoder {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    /// Build a geocoder when an API key is configured
    pub fn from_config(config: &GeocoderConfig) -> Option<Self> {
        config
            .api_key
            .as_ref()
            .map(|key| Self::new(config.base_url.clone(), key.clone()))
    }

    /// Resolve a free-form address or postal code to its first match
    pub async fn geocode(&self, address: &str) -> ApiResult<GeoLocation> {
        let response = self
            .client
            .get(format!("{}/geocoding/v1/address", self.base_url))
            .query(&[("key", self.api_key.as_str()), ("location", address)])
            .send()
            .await?;

        if !response.status().is_success() {
            tracing::error!(status = %response.status(), "Geocoding request failed");
            return Err(ApiError::internal_error("External service error"));
        }

        let body: MapQuestResponse = response.json().await?;
        body.results
            .into_iter()
            .flat_map(|result| result.locations)
            .next()
            .map(GeoLocation::from)
            .ok_or_else(|| ApiError::not_found_error(format!("Could not geocode {}", address)))
    }
}
