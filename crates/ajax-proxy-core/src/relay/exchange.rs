//! Outbound exchange with manual redirect following.
//!
//! The HTTP client never follows redirects itself; this loop does, so the
//! redirect hook (validate, then conditionally reinstate credentials and
//! body) always runs before the next hop is sent.

use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use url::Url;

use super::capture::{BodyCapture, OutboundBody};
use super::dispatch::OutboundParams;
use super::endpoint::EndpointValidator;
use super::headers::X_AUTHORIZATION;
use crate::error::{RelayError, RelayResult};

/// Inbound values reinstated on a redirect to a validated target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RedirectCredentials {
    pub authorization: Option<HeaderValue>,
    pub content_type: Option<HeaderValue>,
}

impl RedirectCredentials {
    /// Takes the inbound `Authorization`, falling back to `X-Authorization`.
    pub fn from_inbound(headers: &HeaderMap) -> Self {
        let authorization = non_empty(headers.get(header::AUTHORIZATION))
            .or_else(|| non_empty(headers.get(X_AUTHORIZATION)));
        let content_type = non_empty(headers.get(header::CONTENT_TYPE));
        Self { authorization, content_type }
    }
}

fn non_empty(value: Option<&HeaderValue>) -> Option<HeaderValue> {
    value.filter(|v| !v.is_empty()).cloned()
}

struct Hop {
    url: Url,
    method: Method,
    headers: HeaderMap,
    body: OutboundBody,
}

/// One relayed request, from the first hop to the final response.
pub struct Exchange<'a> {
    client: &'a reqwest::Client,
    validator: EndpointValidator,
    max_redirects: u32,
    credentials: RedirectCredentials,
    capture: BodyCapture,
}

impl<'a> Exchange<'a> {
    pub fn new(
        client: &'a reqwest::Client,
        validator: EndpointValidator,
        max_redirects: u32,
        credentials: RedirectCredentials,
        capture: BodyCapture,
    ) -> Self {
        Self { client, validator, max_redirects, credentials, capture }
    }

    /// Send `params` and follow redirects until a final response arrives.
    ///
    /// `follow_all_redirects` off limits following to GET and HEAD;
    /// `follow_original_method` off re-issues 301/302/303 as GET.
    pub async fn run(
        mut self,
        params: OutboundParams,
        body: OutboundBody,
    ) -> RelayResult<reqwest::Response> {
        let follow_all = params.follow_all_redirects;
        let keep_method = params.follow_original_method;
        let mut hop = Hop {
            url: Url::parse(&params.url)?,
            method: params.method,
            headers: params.headers,
            body,
        };
        let mut followed: u32 = 0;

        loop {
            let url = hop.url.clone();
            let method = hop.method.clone();
            let headers = hop.headers.clone();

            let response = self.send(hop).await?;
            let Some(target) = redirect_target(&response, &url) else {
                return Ok(response);
            };
            if !follow_all && !matches!(method, Method::GET | Method::HEAD) {
                return Ok(response);
            }
            if followed >= self.max_redirects {
                return Err(RelayError::TooManyRedirects { limit: self.max_redirects });
            }
            followed += 1;

            let status = response.status();
            let next_method = redirect_method(&method, status, keep_method);
            let downgraded = next_method != method;
            hop = self.redirect(&url, next_method, headers, status, target, downgraded).await;
        }
    }

    async fn send(&self, hop: Hop) -> RelayResult<reqwest::Response> {
        let request = self.client.request(hop.method, hop.url).headers(hop.headers);
        let request = match hop.body {
            OutboundBody::Empty => request,
            OutboundBody::Stream { body, length: Some(len) } => {
                request.header(header::CONTENT_LENGTH, len).body(body)
            },
            OutboundBody::Stream { body, length: None } => request.body(body),
            OutboundBody::Replay(bytes) => request.body(bytes),
        };
        Ok(request.send().await?)
    }

    /// Redirect hook: build the next hop for `target`.
    ///
    /// `Authorization` is dropped on a host change. Credentials, `Content-Type`
    /// and the captured body go out again only when `target` passes endpoint
    /// validation; an unvalidated target gets none of them, whatever the status.
    async fn redirect(
        &mut self,
        from: &Url,
        method: Method,
        mut headers: HeaderMap,
        status: StatusCode,
        target: Url,
        downgraded: bool,
    ) -> Hop {
        headers.remove(header::CONTENT_TYPE);
        headers.remove(header::CONTENT_LENGTH);
        if from.host_str() != target.host_str() {
            headers.remove(header::AUTHORIZATION);
        }

        if !self.validator.is_allowed(target.as_str()) {
            headers.remove(header::AUTHORIZATION);
            tracing::warn!(
                "Redirect target failed endpoint validation, credentials withheld | {} {}",
                method,
                target
            );
            return Hop { url: target, method, headers, body: OutboundBody::Empty };
        }

        if let Some(value) = &self.credentials.authorization {
            headers.insert(header::AUTHORIZATION, value.clone());
        }
        let mut body = OutboundBody::Empty;
        if !downgraded {
            if let Some(value) = &self.credentials.content_type {
                headers.insert(header::CONTENT_TYPE, value.clone());
            }
            if let Some(bytes) = self.capture.finish().await {
                body = OutboundBody::Replay(bytes);
            }
        }
        tracing::info!("Following {} redirect | {} {}", status.as_u16(), method, target);

        Hop { url: target, method, headers, body }
    }
}

/// Method for the next hop. 307/308 always keep it; HEAD stays HEAD.
fn redirect_method(method: &Method, status: StatusCode, keep_method: bool) -> Method {
    let keeps = keep_method
        || matches!(status, StatusCode::TEMPORARY_REDIRECT | StatusCode::PERMANENT_REDIRECT)
        || *method == Method::HEAD;
    if keeps {
        method.clone()
    } else {
        Method::GET
    }
}

/// Resolved `Location` of a redirect response, or `None` for a final response.
fn redirect_target(response: &reqwest::Response, current: &Url) -> Option<Url> {
    let status = response.status();
    if !status.is_redirection() || status == StatusCode::NOT_MODIFIED {
        return None;
    }
    let location = response.headers().get(header::LOCATION)?.to_str().ok()?;
    match current.join(location) {
        Ok(url) => Some(url),
        Err(e) => {
            tracing::debug!("Ignoring unparseable redirect location {:?}: {}", location, e);
            None
        },
    }
}
