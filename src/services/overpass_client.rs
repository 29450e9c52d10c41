// src/services/overpass_client.rs
// DOCUMENTATION: Points-of-interest provider client
// PURPOSE: Query the Overpass API for tagged nodes around a position

use crate::errors::{LocateError, Stage};
use crate::models::Coordinate;
use async_trait::async_trait;
use reqwest::Client;

/// Source of raw points-of-interest payloads
#[async_trait]
pub trait PoiFetcher: Send + Sync {
    /// Fetch named nodes tagged `key=value` within `radius` meters of `coordinate`
    async fn fetch(
        &self,
        radius: u32,
        coordinate: Coordinate,
        key: &str,
        value: &str,
    ) -> Result<String, LocateError>;
}

/// Overpass interpreter client
/// DOCUMENTATION: The response body is returned untouched (Overpass XML by default)
pub struct OverpassClient {
    /// Shared HTTP client (carries the upstream timeout)
    client: Client,
    /// Interpreter endpoint, e.g. https://overpass-api.de/api/interpreter
    base_url: String,
}

impl OverpassClient {
    pub fn new(client: Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    /// Build the Overpass QL statement for a nearby lookup
    /// DOCUMENTATION: Tag key and value are quoted and escaped so caller text
    /// cannot break out of the filter
    pub fn build_query(radius: u32, coordinate: Coordinate, key: &str, value: &str) -> String {
        format!(
            "(node(around:{},{},{})['{}'='{}'][name];>;);out;",
            radius,
            coordinate.latitude,
            coordinate.longitude,
            escape_ql(key),
            escape_ql(value)
        )
    }
}

/// Escape text for a single-quoted Overpass QL string
fn escape_ql(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out
}

#[async_trait]
impl PoiFetcher for OverpassClient {
    async fn fetch(
        &self,
        radius: u32,
        coordinate: Coordinate,
        key: &str,
        value: &str,
    ) -> Result<String, LocateError> {
        let query = Self::build_query(radius, coordinate, key, value);

        log::debug!(
            "Overpass nearby search: lat={}, lng={}, radius={}",
            coordinate.latitude,
            coordinate.longitude,
            radius
        );

        // reqwest form-encodes the statement into the query string
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("data", query.as_str())])
            .send()
            .await
            .map_err(|e| {
                log::error!("Overpass request failed: {}", e);
                LocateError::from_request(Stage::Fetch, e)
            })?;

        if !response.status().is_success() {
            let status = response.status();
            log::error!("Overpass API error {}", status);
            return Err(LocateError::UpstreamStatus {
                stage: Stage::Fetch,
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| {
            log::error!("Error reading Overpass response body: {}", e);
            if e.is_timeout() {
                LocateError::Timeout { stage: Stage::Fetch }
            } else {
                LocateError::Fetch(format!("Body read failed: {}", e))
            }
        })?;

        log::info!("Overpass search returned {} bytes", body.len());
        Ok(body)
    }
}
