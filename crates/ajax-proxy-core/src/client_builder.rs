use ajax_proxy_types::RelayConfig;
use reqwest::redirect::Policy;
use std::time::Duration;

use crate::error::{RelayError, RelayResult};

/// Client builder for outbound exchanges, before `build()`.
///
/// Redirects are never followed by the client itself: the relay runs its own
/// redirect loop. Callers may further customize the builder (DNS overrides,
/// extra roots) before building.
pub fn http_client_builder(config: &RelayConfig) -> RelayResult<reqwest::ClientBuilder> {
    let mut builder = reqwest::Client::builder().redirect(Policy::none()).tcp_nodelay(true);

    if let Some(secs) = config.request_timeout {
        builder = builder.timeout(Duration::from_secs(secs));
    }

    if config.upstream_proxy.is_active() {
        let proxy = reqwest::Proxy::all(config.upstream_proxy.url.trim())
            .map_err(|e| RelayError::ClientBuild(format!("Invalid upstream proxy url: {}", e)))?;
        builder = builder.proxy(proxy);
    }

    Ok(builder)
}

/// Build HTTP client with optional upstream proxy and timeout.
pub fn build_http_client(config: &RelayConfig) -> RelayResult<reqwest::Client> {
    http_client_builder(config)?
        .build()
        .map_err(|e| RelayError::ClientBuild(e.to_string()))
}
