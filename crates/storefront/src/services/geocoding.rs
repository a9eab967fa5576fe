//! Google Geocoding API client.
//!
//! Successful lookups are cached for an hour, keyed by the normalized
//! address text. Failures are never cached.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

use nightowl_core::GeoPoint;

use super::Geocoder;

/// Geocoding API endpoint.
const GEOCODE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";

/// Errors from geocoding.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// No result for the address.
    #[error("address not found: {0}")]
    AddressNotFound(String),

    /// HTTP request failed.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// API returned an error status.
    #[error("geocoding API error: {0}")]
    Api(String),
}

/// A resolved address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodedAddress {
    pub formatted_address: String,
    pub location: GeoPoint,
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    formatted_address: String,
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: GeoPoint,
}

impl GeocodeResponse {
    fn into_address(self, query: &str) -> Result<GeocodedAddress, GeocodeError> {
        match self.status.as_str() {
            "OK" => self
                .results
                .into_iter()
                .next()
                .map(|r| GeocodedAddress {
                    formatted_address: r.formatted_address,
                    location: r.geometry.location,
                })
                .ok_or_else(|| GeocodeError::AddressNotFound(query.to_string())),
            "ZERO_RESULTS" => Err(GeocodeError::AddressNotFound(query.to_string())),
            other => Err(GeocodeError::Api(
                self.error_message.unwrap_or_else(|| other.to_string()),
            )),
        }
    }
}

/// Client for the Google Geocoding API.
#[derive(Clone)]
pub struct GoogleGeocoder {
    inner: Arc<GoogleGeocoderInner>,
}

struct GoogleGeocoderInner {
    client: reqwest::Client,
    api_key: SecretString,
    cache: Cache<String, GeocodedAddress>,
}

impl GoogleGeocoder {
    /// Create a new geocoding client.
    #[must_use]
    pub fn new(api_key: SecretString) -> Self {
        let cache = Cache::builder()
            .max_capacity(10_000)
            .time_to_live(Duration::from_secs(3600)) // 1 hour
            .build();

        Self {
            inner: Arc::new(GoogleGeocoderInner {
                client: reqwest::Client::new(),
                api_key,
                cache,
            }),
        }
    }
}

impl Geocoder for GoogleGeocoder {
    #[instrument(skip(self))]
    async fn geocode(&self, address: &str) -> Result<GeocodedAddress, GeocodeError> {
        let key = cache_key(address);
        if let Some(hit) = self.inner.cache.get(&key).await {
            debug!("Geocode cache hit");
            return Ok(hit);
        }

        let response = self
            .inner
            .client
            .get(GEOCODE_URL)
            .query(&[
                ("address", address),
                ("key", self.inner.api_key.expose_secret()),
            ])
            .send()
            .await?
            .error_for_status()?;

        let body: GeocodeResponse = response.json().await?;
        let resolved = body.into_address(address)?;

        self.inner.cache.insert(key, resolved.clone()).await;
        Ok(resolved)
    }
}

/// Case- and whitespace-insensitive cache key.
fn cache_key(address: &str) -> String {
    address
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_response_yields_first_result() {
        let body: GeocodeResponse = serde_json::from_str(
            r#"{
                "status": "OK",
                "results": [{
                    "formatted_address": "12 Rue Lavaud, Akaroa 7520, New Zealand",
                    "geometry": { "location": { "lat": -43.8036, "lng": 172.9683 } }
                }]
            }"#,
        )
        .unwrap();
        let resolved = body.into_address("12 rue lavaud").unwrap();
        assert_eq!(resolved.location, GeoPoint::new(-43.8036, 172.9683));
    }

    #[test]
    fn test_zero_results_is_not_found() {
        let body: GeocodeResponse =
            serde_json::from_str(r#"{"status":"ZERO_RESULTS","results":[]}"#).unwrap();
        assert!(matches!(
            body.into_address("nowhere"),
            Err(GeocodeError::AddressNotFound(_))
        ));
    }

    #[test]
    fn test_denied_request_surfaces_message() {
        let body: GeocodeResponse = serde_json::from_str(
            r#"{"status":"REQUEST_DENIED","error_message":"The provided API key is invalid."}"#,
        )
        .unwrap();
        let err = body.into_address("x").unwrap_err();
        assert!(err.to_string().contains("API key is invalid"));
    }

    #[test]
    fn test_cache_key_normalizes() {
        assert_eq!(cache_key("  12  Rue LAVAUD "), "12 rue lavaud");
    }
}
