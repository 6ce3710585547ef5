//! Relay configuration.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::ConfigError;

/// `Access-Control-Allow-Origin` value used when none is configured.
pub const DEFAULT_ALLOWED_ORIGIN: &str = "*";

/// Relay configuration, supplied once at construction.
///
/// Field aliases accept the camelCase spellings used by browser-side tooling
/// (`enableCORS`, `allowedOrigin`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct RelayConfig {
    /// Emit CORS headers and answer `OPTIONS` pre-flight requests locally
    #[serde(default, alias = "enableCORS")]
    pub enable_cors: bool,
    /// Value of `Access-Control-Allow-Origin` when CORS is enabled
    #[serde(default = "default_allowed_origin", alias = "allowedOrigin")]
    #[validate(length(min = 1_u64))]
    pub allowed_origin: String,
    /// Maximum number of redirect hops followed for one inbound request
    #[serde(default = "default_max_redirects")]
    #[validate(range(min = 1_u32, max = 50_u32))]
    pub max_redirects: u32,
    /// Outbound request timeout in seconds; `None` keeps the HTTP client default
    #[serde(default)]
    #[validate(range(min = 1_u64, max = 3600_u64))]
    pub request_timeout: Option<u64>,
    /// Optional proxy for outbound connections
    #[serde(default)]
    #[validate(nested)]
    pub upstream_proxy: UpstreamProxyConfig,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            enable_cors: false,
            allowed_origin: default_allowed_origin(),
            max_redirects: default_max_redirects(),
            request_timeout: None,
            upstream_proxy: UpstreamProxyConfig::default(),
        }
    }
}

impl RelayConfig {
    /// Config with CORS support switched on and the wildcard origin.
    pub fn with_cors() -> Self {
        Self { enable_cors: true, ..Self::default() }
    }

    /// Run field validation and map failures to [`ConfigError::ValidationError`].
    pub fn check(&self) -> Result<(), ConfigError> {
        self.validate().map_err(|e| ConfigError::from_validation_errors(&e))
    }
}

/// Upstream proxy configuration for outbound requests.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct UpstreamProxyConfig {
    /// Route outbound requests through `url`
    #[serde(default)]
    pub enabled: bool,
    /// Proxy URL (e.g., socks5://127.0.0.1:1080 or http://corp-proxy:3128)
    #[serde(default)]
    #[validate(length(max = 2048_u64))]
    pub url: String,
}

impl UpstreamProxyConfig {
    /// True when a proxy URL should actually be applied to the client.
    pub fn is_active(&self) -> bool {
        self.enabled && !self.url.trim().is_empty()
    }
}

pub fn default_allowed_origin() -> String {
    DEFAULT_ALLOWED_ORIGIN.to_string()
}

pub const fn default_max_redirects() -> u32 {
    10
}
