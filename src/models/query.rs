// src/models/query.rs
// DOCUMENTATION: Request, key and coordinate types for nearby lookups
// PURPOSE: Turn raw query parameters into a validated lookup and its cache key

use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

use crate::errors::LocateError;

/// Raw query string of GET /location-api/
/// DOCUMENTATION: Every field optional so missing parameters become a proper 400
#[derive(Debug, Deserialize)]
pub struct LocateQuery {
    /// Tag name, e.g. "amenity"
    pub key: Option<String>,
    /// Tag value, e.g. "cafe"
    pub value: Option<String>,
    /// Radius in meters, kept as text until parsed
    pub radius: Option<String>,
}

/// Validated lookup request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Validate)]
pub struct LocateRequest {
    #[validate(length(min = 1, max = 255))]
    pub key: String,

    #[validate(length(min = 1, max = 255))]
    pub value: String,

    /// Meters, at most 100 km
    #[validate(range(max = 100000))]
    pub radius: u32,
}

impl LocateQuery {
    /// Parse and validate the raw parameters
    /// DOCUMENTATION: A malformed radius is rejected, never replaced by 0
    pub fn into_request(self) -> Result<LocateRequest, LocateError> {
        let key = self
            .key
            .ok_or_else(|| LocateError::InvalidInput("missing parameter: key".to_string()))?;
        let value = self
            .value
            .ok_or_else(|| LocateError::InvalidInput("missing parameter: value".to_string()))?;
        let raw_radius = self
            .radius
            .ok_or_else(|| LocateError::InvalidInput("missing parameter: radius".to_string()))?;

        let radius = raw_radius.trim().parse::<u32>().map_err(|e| {
            log::warn!("Rejecting radius parameter {:?}: {}", raw_radius, e);
            LocateError::InvalidInput(format!(
                "radius must be a non-negative integer, got {:?}",
                raw_radius
            ))
        })?;

        let request = LocateRequest { key, value, radius };
        request
            .validate()
            .map_err(|e| LocateError::ValidationError(e.to_string()))?;

        Ok(request)
    }
}

impl LocateRequest {
    pub fn query_key(&self) -> QueryKey {
        QueryKey::new(&self.key, &self.value, self.radius)
    }
}

/// Cache key of a lookup
/// DOCUMENTATION: Equality is on the whole triple, the rendered form is only for logs and errors
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    key: String,
    value: String,
    radius: u32,
}

impl QueryKey {
    pub fn new(key: &str, value: &str, radius: u32) -> Self {
        Self {
            key: key.to_string(),
            value: value.to_string(),
            radius,
        }
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.key, self.value, self.radius)
    }
}

/// Geographic position in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    /// Build a coordinate, rejecting anything outside the WGS84 ranges
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, String> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(format!("latitude out of range: {}", latitude));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(format!("longitude out of range: {}", longitude));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

/// XML-ish envelope returned to the caller
/// DOCUMENTATION: Echoed fields are escaped, the provider payload is passed through as-is
pub fn render_places_document(
    company: &str,
    product: &str,
    request: &LocateRequest,
    places: &str,
) -> String {
    format!(
        "<company>{}</company>\n\t<product>{}</product>\n\t<key>{}</key>\n\t<value>{}</value>\n\t<radius>{}</radius>\n\t<places>{}</places>",
        escape_xml(company),
        escape_xml(product),
        escape_xml(&request.key),
        escape_xml(&request.value),
        request.radius,
        places
    )
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
