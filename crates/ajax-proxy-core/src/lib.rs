//! AJAX Proxy Core
//!
//! HTTP relay that lets browser code reach Salesforce API hosts it could not
//! call directly: destination validation, allow-listed header projection,
//! optional CORS, and redirect following that replays credentials and the
//! request body only to validated hosts.

pub mod client_builder;
pub mod config;
pub mod error;
pub mod logger;
pub mod relay;
pub mod server;

pub use ajax_proxy_types::{ConfigError, RelayConfig, UpstreamProxyConfig};
pub use client_builder::{build_http_client, http_client_builder};
pub use error::{RelayError, RelayResult, ENDPOINT_NOT_ALLOWED_MESSAGE};
pub use relay::dispatch::{DispatchOverride, OutboundParams, DEFAULT_ENDPOINT};
pub use relay::endpoint::EndpointValidator;
pub use relay::headers::{ALLOWED_HEADERS, ENDPOINT_HEADER};
pub use relay::{Relay, RelayBuilder};
pub use server::build_relay_router;
