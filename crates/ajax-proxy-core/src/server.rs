use axum::{
    extract::{DefaultBodyLimit, Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::relay::Relay;

/// Path prefix the relay is mounted under.
pub const PROXY_PATH: &str = "/proxy";

/// Router serving the relay on `/proxy` and everything below it, for any method.
///
/// Binding a listener is left to the embedding application.
pub fn build_relay_router(relay: Arc<Relay>) -> Router {
    Router::<Arc<Relay>>::new()
        .route("/", get(banner))
        // Matched by prefix here rather than by route patterns, so `/proxy`,
        // `/proxy/` and `/proxy/<anything>` all reach the relay
        .fallback(proxy_fallback)
        .layer(DefaultBodyLimit::max(100 * 1024 * 1024))
        .layer(TraceLayer::new_for_http())
        .with_state(relay)
}

fn is_proxy_path(path: &str) -> bool {
    path.strip_prefix(PROXY_PATH).is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

async fn proxy_fallback(State(relay): State<Arc<Relay>>, request: Request) -> Response {
    if !is_proxy_path(request.uri().path()) {
        return StatusCode::NOT_FOUND.into_response();
    }
    relay.handle(request).await
}

async fn banner() -> &'static str {
    concat!(
        "ajax-proxy ",
        env!("CARGO_PKG_VERSION"),
        ": send API requests to /proxy with the Salesforceproxy-Endpoint header\n"
    )
}
