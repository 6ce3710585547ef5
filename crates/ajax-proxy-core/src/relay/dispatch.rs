//! Outbound parameters and per-method dispatch overrides.

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{HeaderMap, Method},
    response::Response,
};
use std::fmt;

/// OAuth token endpoint of the primary login host; used when no destination header is sent.
pub const DEFAULT_ENDPOINT: &str = "https://login.salesforce.com/services/oauth2/token";

/// Fully assembled parameters of an outbound exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundParams {
    pub url: String,
    pub method: Method,
    /// Projected (allow-listed) request headers.
    pub headers: HeaderMap,
    /// Follow every redirect regardless of status or method. When off, only
    /// GET and HEAD redirects are followed.
    pub follow_all_redirects: bool,
    /// Re-issue redirects with the original method instead of downgrading
    /// 301/302/303 to GET.
    pub follow_original_method: bool,
}

impl OutboundParams {
    pub fn new(url: impl Into<String>, method: Method, headers: HeaderMap) -> Self {
        Self {
            url: url.into(),
            method,
            headers,
            follow_all_redirects: true,
            follow_original_method: true,
        }
    }
}

/// Replaces the default dispatch for one HTTP method.
///
/// Receives the validated, projected outbound parameters and the untouched
/// inbound body; whatever it returns is sent to the caller (CORS headers are
/// still added when enabled).
#[async_trait]
pub trait DispatchOverride: Send + Sync {
    async fn dispatch(&self, params: OutboundParams, body: Body) -> Response;
}

impl fmt::Debug for dyn DispatchOverride {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DispatchOverride")
    }
}
