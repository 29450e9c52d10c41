// src/config/env.rs
// DOCUMENTATION: Environment variable management
// PURPOSE: Load and validate configuration from .env files

use dotenv::dotenv;
use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_GEOLOCATION_URL: &str = "https://www.googleapis.com/geolocation/v1/geolocate";
pub const DEFAULT_OVERPASS_URL: &str = "https://overpass-api.de/api/interpreter";

/// Application configuration loaded from environment variables
/// DOCUMENTATION: Centralizes all configuration in one struct
/// Load with Config::from_env() at application startup
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address (e.g., "127.0.0.1")
    pub server_address: String,

    /// Server listen port (default 8081)
    pub server_port: u16,

    /// Environment: development, staging, production
    pub environment: String,

    /// Log level: debug, info, warn, error
    pub log_level: String,

    /// Geolocation provider endpoint (Google geolocate API shape)
    pub geolocation_url: String,

    /// Geolocation provider API key
    pub geolocation_api_key: String,

    /// Overpass interpreter endpoint
    pub overpass_url: String,

    /// Deadline applied to every upstream call, in seconds
    pub upstream_timeout_seconds: u64,

    /// Labels echoed in the XML response envelope
    pub response_company: String,
    pub response_product: String,
}

impl Config {
    /// Load configuration from environment variables
    /// DOCUMENTATION: Reads from .env or process environment
    /// Called once at application startup
    pub fn from_env() -> Self {
        dotenv().ok();

        Config {
            server_address: env::var("SERVER_ADDRESS").unwrap_or_else(|_| "127.0.0.1".to_string()),

            server_port: parse_or_default("SERVER_PORT", env::var("SERVER_PORT").ok(), 8081),

            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),

            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),

            geolocation_url: env::var("GEOLOCATION_URL")
                .unwrap_or_else(|_| DEFAULT_GEOLOCATION_URL.to_string()),

            geolocation_api_key: env::var("GEOLOCATION_API_KEY").unwrap_or_else(|_| String::new()),

            overpass_url: env::var("OVERPASS_URL")
                .unwrap_or_else(|_| DEFAULT_OVERPASS_URL.to_string()),

            upstream_timeout_seconds: parse_or_default(
                "UPSTREAM_TIMEOUT_SECONDS",
                env::var("UPSTREAM_TIMEOUT_SECONDS").ok(),
                25,
            ),

            response_company: env::var("RESPONSE_COMPANY")
                .unwrap_or_else(|_| "Shahsuvarov corp.".to_string()),

            response_product: env::var("RESPONSE_PRODUCT").unwrap_or_else(|_| "Geoloc".to_string()),
        }
    }

    /// Deadline for a single upstream request
    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_seconds)
    }

    /// Validate critical configuration
    /// DOCUMENTATION: Ensures application can start safely
    pub fn validate(&self) -> Result<(), String> {
        if self.geolocation_api_key.is_empty() {
            return Err("GEOLOCATION_API_KEY is required".to_string());
        }

        if self.upstream_timeout_seconds == 0 {
            return Err("UPSTREAM_TIMEOUT_SECONDS must be greater than zero".to_string());
        }

        for (name, url) in [
            ("GEOLOCATION_URL", &self.geolocation_url),
            ("OVERPASS_URL", &self.overpass_url),
        ] {
            if reqwest::Url::parse(url).is_err() {
                return Err(format!("{} is not a valid URL: {}", name, url));
            }
        }

        if self.environment == "production" && self.server_address == "127.0.0.1" {
            log::warn!("SERVER_ADDRESS is loopback in production - service is not reachable externally");
        }

        Ok(())
    }
}

/// Parse a numeric setting, warning when a present value is unusable
fn parse_or_default<T>(name: &str, raw: Option<String>, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match raw {
        None => default,
        Some(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(e) => {
                log::warn!(
                    "{}={:?} is not valid ({}), using default {}",
                    name, raw, e, default
                );
                default
            }
        },
    }
}

#[cfg(test)]
impl Config {
    /// Fully populated configuration for unit tests
    pub fn test_config() -> Self {
        Config {
            server_address: "127.0.0.1".to_string(),
            server_port: 8081,
            environment: "test".to_string(),
            log_level: "debug".to_string(),
            geolocation_url: DEFAULT_GEOLOCATION_URL.to_string(),
            geolocation_api_key: "secret".to_string(),
            overpass_url: DEFAULT_OVERPASS_URL.to_string(),
            upstream_timeout_seconds: 25,
            response_company: "Shahsuvarov corp.".to_string(),
            response_product: "Geoloc".to_string(),
        }
    }
}
