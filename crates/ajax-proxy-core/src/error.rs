//! Relay error type and its HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Plain-text body sent when a destination fails endpoint validation.
pub const ENDPOINT_NOT_ALLOWED_MESSAGE: &str = "Proxying endpoint is not allowed.";

/// Errors produced while relaying a single inbound request or building a relay.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum RelayError {
    /// Destination header present but rejected by the endpoint validator.
    #[error("destination endpoint is not allowed")]
    EndpointNotAllowed,

    /// Destination matched the validator pattern but could not be parsed as a URL.
    #[error("destination endpoint is not a valid URL: {0}")]
    InvalidEndpoint(#[from] url::ParseError),

    /// Outbound exchange failed (connect, TLS, timeout, body stream).
    #[error("upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),

    /// Redirect chain exceeded the configured hop limit.
    #[error("exceeded {limit} redirects")]
    TooManyRedirects { limit: u32 },

    /// HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(String),

    /// Relay configuration is unusable (bad origin header value, etc.).
    #[error("invalid relay configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias for relay operations.
pub type RelayResult<T> = Result<T, RelayError>;

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        match self {
            Self::EndpointNotAllowed | Self::InvalidEndpoint(_) => {
                (StatusCode::BAD_REQUEST, ENDPOINT_NOT_ALLOWED_MESSAGE).into_response()
            },
            // No synthesized error page for outbound failures
            Self::Upstream(_) | Self::TooManyRedirects { .. } => {
                StatusCode::BAD_GATEWAY.into_response()
            },
            Self::ClientBuild(_) | Self::InvalidConfig(_) => {
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            },
        }
    }
}
