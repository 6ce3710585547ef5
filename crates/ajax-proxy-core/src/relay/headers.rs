//! Inbound-to-outbound header allow-list.

use axum::http::{header, HeaderMap, HeaderName};

/// Header carrying the destination URL of the relayed request.
pub const ENDPOINT_HEADER: &str = "Salesforceproxy-Endpoint";
/// Credential header that survives frameworks which strip `Authorization`.
pub const X_AUTHORIZATION: &str = "X-Authorization";

/// Request headers allowed to cross the relay, in projection order.
///
/// `X-Authorization` comes after `Authorization` so its value wins when both
/// are present.
pub const ALLOWED_HEADERS: &[&str] = &[
    "Authorization",
    "Content-Type",
    ENDPOINT_HEADER,
    X_AUTHORIZATION,
    "X-SFDC-Session",
    "SOAPAction",
    "SForce-Auto-Assign",
    "If-Modified-Since",
    "X-User-Agent",
];

/// Comma-joined allow-list, as advertised in `Access-Control-Allow-Headers`.
pub fn allowed_headers_joined() -> String {
    ALLOWED_HEADERS.join(",")
}

/// Copy allow-listed, non-empty inbound headers into a fresh outbound map.
///
/// `X-Authorization` is emitted as `Authorization`. Anything not on the list is dropped.
pub fn project_headers(inbound: &HeaderMap) -> HeaderMap {
    let mut outbound = HeaderMap::new();

    for name in ALLOWED_HEADERS {
        let Some(value) = inbound.get(*name) else {
            continue;
        };
        if value.is_empty() {
            continue;
        }

        let target = if name.eq_ignore_ascii_case(X_AUTHORIZATION) {
            header::AUTHORIZATION
        } else {
            match HeaderName::from_bytes(name.as_bytes()) {
                Ok(n) => n,
                Err(_) => continue,
            }
        };
        outbound.insert(target, value.clone());
    }

    outbound
}
