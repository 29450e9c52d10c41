// src/services/geolocation_client.rs
// DOCUMENTATION: Geolocation provider client
// PURPOSE: Resolve the service's approximate position through the Google geolocate API

use crate::errors::{LocateError, Stage};
use crate::models::Coordinate;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Source of the position lookups are centered on
#[async_trait]
pub trait GeoResolver: Send + Sync {
    async fn resolve(&self) -> Result<Coordinate, LocateError>;
}

/// Response from the geolocate endpoint
#[derive(Debug, Deserialize, Serialize)]
pub struct GeolocationResponse {
    /// Accuracy radius in meters
    #[serde(default)]
    pub accuracy: Option<f64>,
    pub location: GeolocationPoint,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct GeolocationPoint {
    pub lat: f64,
    pub lng: f64,
}

/// Google geolocate API client
/// DOCUMENTATION: One POST with an empty body, no device hints, so the provider
/// answers with the position of the calling server's network
pub struct GoogleGeolocationClient {
    /// Shared HTTP client (carries the upstream timeout)
    client: Client,
    /// Endpoint, e.g. https://www.googleapis.com/geolocation/v1/geolocate
    base_url: String,
    api_key: String,
}

impl GoogleGeolocationClient {
    pub fn new(client: Client, base_url: String, api_key: String) -> Self {
        Self {
            client,
            base_url,
            api_key,
        }
    }
}

#[async_trait]
impl GeoResolver for GoogleGeolocationClient {
    async fn resolve(&self) -> Result<Coordinate, LocateError> {
        log::debug!("Geolocation lookup: {}", self.base_url);

        let response = self
            .client
            .post(&self.base_url)
            .query(&[("key", self.api_key.as_str())])
            .header(CONTENT_TYPE, "application/json; charset=UTF-8")
            .send()
            .await
            .map_err(|e| {
                log::error!("Geolocation request failed: {}", e);
                LocateError::from_request(Stage::Resolve, e)
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            log::error!("Geolocation API error {}: {}", status, body);
            return Err(LocateError::UpstreamStatus {
                stage: Stage::Resolve,
                status: status.as_u16(),
            });
        }

        let body: GeolocationResponse = response.json().await.map_err(|e| {
            log::error!("Failed to parse geolocation response: {}", e);
            if e.is_timeout() {
                LocateError::Timeout {
                    stage: Stage::Resolve,
                }
            } else {
                LocateError::Resolver(format!("Parse error: {}", e))
            }
        })?;

        let coordinate = Coordinate::new(body.location.lat, body.location.lng).map_err(|e| {
            log::error!("Geolocation returned an invalid position: {}", e);
            LocateError::Resolver(e)
        })?;

        log::info!(
            "Resolved position lat={}, lng={} (accuracy {:?}m)",
            coordinate.latitude,
            coordinate.longitude,
            body.accuracy
        );
        Ok(coordinate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_for(server: &MockServer) -> GoogleGeolocationClient {
        GoogleGeolocationClient::new(
            Client::new(),
            format!("{}/geolocation/v1/geolocate", server.uri()),
            "test_key".to_string(),
        )
    }

    #[tokio::test]
    async fn test_resolve_parses_location() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/geolocation/v1/geolocate"))
            .and(query_param("key", "test_key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "accuracy": 1200,
                "location": { "lat": 40.0, "lng": -74.0 }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let coordinate = client_for(&server).await.resolve().await.unwrap();

        assert_eq!(coordinate, Coordinate::new(40.0, -74.0).unwrap());
    }

    #[tokio::test]
    async fn test_non_success_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("denied"))
            .mount(&server)
            .await;

        let err = client_for(&server).await.resolve().await.unwrap_err();

        assert_eq!(
            err,
            LocateError::UpstreamStatus {
                stage: Stage::Resolve,
                status: 403
            }
        );
    }

    #[tokio::test]
    async fn test_malformed_body_never_yields_zero_coordinate() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"accuracy\": 10}"))
            .mount(&server)
            .await;

        let err = client_for(&server).await.resolve().await.unwrap_err();

        assert!(matches!(err, LocateError::Resolver(_)));
    }

    #[tokio::test]
    async fn test_out_of_range_position_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "accuracy": 10,
                "location": { "lat": 123.0, "lng": 0.0 }
            })))
            .mount(&server)
            .await;

        let err = client_for(&server).await.resolve().await.unwrap_err();

        assert_eq!(
            err,
            LocateError::Resolver("latitude out of range: 123".to_string())
        );
    }

    #[tokio::test]
    async fn test_slow_provider_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "location": { "lat": 1.0, "lng": 1.0 } }))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let client = Client::builder()
            .timeout(Duration::from_millis(50))
            .build()
            .unwrap();
        let resolver = GoogleGeolocationClient::new(
            client,
            format!("{}/geolocate", server.uri()),
            "test_key".to_string(),
        );

        assert_eq!(
            resolver.resolve().await.unwrap_err(),
            LocateError::Timeout {
                stage: Stage::Resolve
            }
        );
    }

    #[tokio::test]
    async fn test_unreachable_provider_is_an_error() {
        let resolver = GoogleGeolocationClient::new(
            Client::new(),
            "http://127.0.0.1:9/geolocate".to_string(),
            "test_key".to_string(),
        );

        assert!(matches!(
            resolver.resolve().await.unwrap_err(),
            LocateError::Resolver(_)
        ));
    }
}
