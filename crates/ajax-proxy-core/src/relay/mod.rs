//! Relay - validated, allow-listed request forwarding
//!
//! Per inbound request:
//! 1. CORS headers (when enabled); `OPTIONS` is answered locally
//! 2. Destination validation (`Salesforceproxy-Endpoint`), 400 on failure
//! 3. Header projection through the allow-list
//! 4. Per-method dispatch override, if registered
//! 5. Streaming exchange with redirect replay, response piped back

pub mod capture;
pub mod cors;
pub mod dispatch;
pub mod endpoint;
pub mod exchange;
pub mod headers;
pub mod in_flight;

use axum::{
    body::Body,
    extract::Request,
    http::{header, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use ajax_proxy_types::RelayConfig;

use crate::client_builder::build_http_client;
use crate::error::{RelayError, RelayResult};
use capture::tee;
use cors::CorsHeaders;
use dispatch::{DispatchOverride, OutboundParams, DEFAULT_ENDPOINT};
use endpoint::EndpointValidator;
use exchange::{Exchange, RedirectCredentials};
use headers::{project_headers, ENDPOINT_HEADER};
use in_flight::{Completion, InFlightGuard};

/// The forwarding middleware. Cheap to share behind an `Arc`.
pub struct Relay {
    client: reqwest::Client,
    validator: EndpointValidator,
    cors: Option<CorsHeaders>,
    overrides: HashMap<Method, Arc<dyn DispatchOverride>>,
    max_redirects: u32,
    in_flight: Arc<AtomicUsize>,
}

impl Relay {
    pub fn builder(config: RelayConfig) -> RelayBuilder {
        RelayBuilder::new(config)
    }

    /// Relay with the default HTTP client for `config`.
    pub fn new(config: RelayConfig) -> RelayResult<Self> {
        RelayBuilder::new(config).build()
    }

    /// Outbound exchanges currently waiting for a final response.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn cors_enabled(&self) -> bool {
        self.cors.is_some()
    }

    /// Handle one inbound request and produce the response for the caller.
    pub async fn handle(&self, request: Request) -> Response {
        let mut response = match self.relay(request).await {
            Ok(response) => response,
            Err(e) => e.into_response(),
        };
        if let Some(cors) = &self.cors {
            cors.apply(response.headers_mut());
        }
        response
    }

    async fn relay(&self, request: Request) -> RelayResult<Response> {
        if self.cors.is_some() && request.method() == Method::OPTIONS {
            return Ok(StatusCode::OK.into_response());
        }

        let (parts, body) = request.into_parts();
        let endpoint = self.destination(&parts.headers)?;
        let params =
            OutboundParams::new(endpoint, parts.method.clone(), project_headers(&parts.headers));

        if let Some(handler) = self.overrides.get(&parts.method) {
            tracing::debug!("Dispatch override | method={}, url={}", params.method, params.url);
            return Ok(handler.dispatch(params, body).await);
        }

        let guard = InFlightGuard::enter(self.in_flight.clone());
        tracing::debug!("method={}, url={}", params.method, params.url);

        let (outbound_body, capture) = tee(body);
        let exchange = Exchange::new(
            &self.client,
            self.validator,
            self.max_redirects,
            RedirectCredentials::from_inbound(&parts.headers),
            capture,
        );

        match exchange.run(params, outbound_body).await {
            Ok(upstream) => {
                guard.complete(Completion::Response);
                Ok(into_response(upstream))
            },
            Err(e) => {
                guard.complete(Completion::Error);
                tracing::warn!("Relay exchange failed: {}", e);
                Err(e)
            },
        }
    }

    /// Validated destination URL, or the default endpoint when the header is absent.
    fn destination(&self, headers: &HeaderMap) -> RelayResult<String> {
        let Some(value) = headers.get(ENDPOINT_HEADER) else {
            return Ok(DEFAULT_ENDPOINT.to_string());
        };
        match value.to_str() {
            Ok(endpoint) if self.validator.is_allowed(endpoint) => Ok(endpoint.to_string()),
            Ok(endpoint) => {
                tracing::warn!("Rejected proxy endpoint: {}", endpoint);
                Err(RelayError::EndpointNotAllowed)
            },
            Err(_) => {
                tracing::warn!("Rejected non-ASCII proxy endpoint");
                Err(RelayError::EndpointNotAllowed)
            },
        }
    }
}

/// Pipe the upstream response through: status, headers and streamed body.
fn into_response(upstream: reqwest::Response) -> Response {
    let status = upstream.status();
    let mut headers = upstream.headers().clone();
    // Connection-level headers; framing is redone by the server side
    for name in [
        header::CONNECTION,
        header::TRANSFER_ENCODING,
        header::UPGRADE,
        header::TE,
        header::TRAILER,
        header::PROXY_AUTHENTICATE,
    ] {
        headers.remove(name);
    }

    let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

/// Builder for [`Relay`]: configuration, HTTP client and dispatch overrides.
pub struct RelayBuilder {
    config: RelayConfig,
    client: Option<reqwest::Client>,
    overrides: HashMap<Method, Arc<dyn DispatchOverride>>,
}

impl RelayBuilder {
    pub fn new(config: RelayConfig) -> Self {
        Self { config, client: None, overrides: HashMap::new() }
    }

    /// Use a pre-built client.
    ///
    /// The client must not follow redirects on its own (see
    /// [`crate::client_builder::http_client_builder`]), otherwise the redirect
    /// hook never runs.
    pub fn client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Replace the default dispatch for `method`.
    pub fn override_method(
        mut self,
        method: Method,
        handler: impl DispatchOverride + 'static,
    ) -> Self {
        self.overrides.insert(method, Arc::new(handler));
        self
    }

    pub fn build(self) -> RelayResult<Relay> {
        self.config.check().map_err(|e| RelayError::InvalidConfig(e.to_string()))?;

        let cors = if self.config.enable_cors {
            Some(CorsHeaders::new(&self.config.allowed_origin)?)
        } else {
            None
        };
        let client = match self.client {
            Some(client) => client,
            None => build_http_client(&self.config)?,
        };

        Ok(Relay {
            client,
            validator: EndpointValidator,
            cors,
            overrides: self.overrides,
            max_redirects: self.config.max_redirects,
            in_flight: Arc::new(AtomicUsize::new(0)),
        })
    }
}
