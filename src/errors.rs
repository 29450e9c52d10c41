// src/errors.rs
// DOCUMENTATION: Custom error types and HTTP responses
// PURPOSE: Centralized error handling for entire application

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde::Serialize;
use serde_json::json;
use std::fmt;
use thiserror::Error;

/// Upstream stage of a lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Geolocation provider call
    Resolve,
    /// Points-of-interest provider call
    Fetch,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Resolve => f.write_str("resolve"),
            Stage::Fetch => f.write_str("fetch"),
        }
    }
}

/// Application-specific error types
/// DOCUMENTATION: Every failure a lookup can produce
/// Cloneable so one failed upstream call can be handed to every waiter on the same key
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LocateError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Geolocation error: {0}")]
    Resolver(String),

    #[error("Places provider error: {0}")]
    Fetch(String),

    #[error("Upstream {stage} returned status {status}")]
    UpstreamStatus { stage: Stage, status: u16 },

    #[error("Upstream {stage} timed out")]
    Timeout { stage: Stage },

    #[error("Lookup for {key} failed during {stage}: {source}")]
    CacheMissUpstreamFailure {
        key: String,
        stage: Stage,
        source: Box<LocateError>,
    },
}

impl LocateError {
    /// Wrap an upstream failure that happened while filling a cache miss
    pub fn on_miss(self, key: impl Into<String>, stage: Stage) -> Self {
        LocateError::CacheMissUpstreamFailure {
            key: key.into(),
            stage,
            source: Box::new(self),
        }
    }

    /// Map a transport failure of an upstream call
    pub fn from_request(stage: Stage, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return LocateError::Timeout { stage };
        }
        let message = format!("Request failed: {}", err);
        match stage {
            Stage::Resolve => LocateError::Resolver(message),
            Stage::Fetch => LocateError::Fetch(message),
        }
    }

    /// Stage that failed, if the error came from an upstream call
    pub fn stage(&self) -> Option<Stage> {
        match self {
            LocateError::Resolver(_) => Some(Stage::Resolve),
            LocateError::Fetch(_) => Some(Stage::Fetch),
            LocateError::UpstreamStatus { stage, .. }
            | LocateError::Timeout { stage }
            | LocateError::CacheMissUpstreamFailure { stage, .. } => Some(*stage),
            LocateError::InvalidInput(_) | LocateError::ValidationError(_) => None,
        }
    }

    fn is_timeout(&self) -> bool {
        match self {
            LocateError::Timeout { .. } => true,
            LocateError::CacheMissUpstreamFailure { source, .. } => source.is_timeout(),
            _ => false,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            LocateError::InvalidInput(_) => "INVALID_INPUT",
            LocateError::ValidationError(_) => "VALIDATION_ERROR",
            LocateError::Resolver(_) => "GEOLOCATION_ERROR",
            LocateError::Fetch(_) | LocateError::UpstreamStatus { .. } => "UPSTREAM_ERROR",
            LocateError::Timeout { .. } => "UPSTREAM_TIMEOUT",
            LocateError::CacheMissUpstreamFailure { .. } if self.is_timeout() => "UPSTREAM_TIMEOUT",
            LocateError::CacheMissUpstreamFailure { .. } => "UPSTREAM_ERROR",
        }
    }
}

/// Convert LocateError to HTTP response
/// DOCUMENTATION: Maps error types to HTTP status codes and JSON responses
impl ResponseError for LocateError {
    fn error_response(&self) -> HttpResponse {
        let body = json!({
            "error": {
                "code": self.error_code(),
                "stage": self.stage(),
                "message": self.to_string(),
                "timestamp": chrono::Utc::now().to_rfc3339()
            }
        });

        HttpResponse::build(self.status_code()).json(body)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            LocateError::InvalidInput(_) | LocateError::ValidationError(_) => StatusCode::BAD_REQUEST,
            _ if self.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::BAD_GATEWAY,
        }
    }
}
