// CORS response headers
use axum::http::{header, HeaderMap, HeaderValue};

use super::headers::allowed_headers_joined;
use crate::error::{RelayError, RelayResult};

pub const ALLOWED_METHODS: &str = "GET,POST,PATCH,PUT,DELETE";
/// Salesforce API usage header the browser is allowed to read.
pub const EXPOSED_HEADERS: &str = "SForce-Limit-Info";

/// Pre-rendered CORS header values for a relay with CORS enabled.
#[derive(Debug, Clone)]
pub struct CorsHeaders {
    allow_origin: HeaderValue,
    allow_headers: HeaderValue,
}

impl CorsHeaders {
    pub fn new(allowed_origin: &str) -> RelayResult<Self> {
        let allow_origin = HeaderValue::from_str(allowed_origin).map_err(|e| {
            RelayError::InvalidConfig(format!("allowed origin {:?}: {}", allowed_origin, e))
        })?;
        let allow_headers = HeaderValue::from_str(&allowed_headers_joined())
            .map_err(|e| RelayError::InvalidConfig(e.to_string()))?;
        Ok(Self { allow_origin, allow_headers })
    }

    /// Set the CORS headers that the response does not already carry.
    ///
    /// Relayed upstream headers of the same name take precedence.
    pub fn apply(&self, headers: &mut HeaderMap) {
        headers
            .entry(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .or_insert_with(|| self.allow_origin.clone());
        headers
            .entry(header::ACCESS_CONTROL_ALLOW_METHODS)
            .or_insert(HeaderValue::from_static(ALLOWED_METHODS));
        headers
            .entry(header::ACCESS_CONTROL_ALLOW_HEADERS)
            .or_insert_with(|| self.allow_headers.clone());
        headers
            .entry(header::ACCESS_CONTROL_EXPOSE_HEADERS)
            .or_insert(HeaderValue::from_static(EXPOSED_HEADERS));
    }
}
