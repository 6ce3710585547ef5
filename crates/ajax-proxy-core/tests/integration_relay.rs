#![allow(unused_crate_dependencies)]
#![allow(clippy::tests_outside_test_module, reason = "integration tests live in tests/ dir")]
#![allow(clippy::expect_used, reason = "integration test: panics are the assertion mechanism")]

use ajax_proxy_core::{http_client_builder, Relay, RelayConfig, ENDPOINT_HEADER};
use axum::body::{to_bytes, Body};
use axum::extract::Request;
use axum::http::{header, Method, StatusCode};
use axum::response::Response;
use bytes::Bytes;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "Bearer 00Dxx0000000001!AQ4AQ";

/// Relay whose client resolves the Salesforce test hosts to the mock server,
/// so the real endpoint patterns apply.
fn relay_for(server: &MockServer, config: RelayConfig) -> Relay {
    let addr = *server.address();
    let client = http_client_builder(&config)
        .expect("client builder")
        .resolve("na1.salesforce.com", addr)
        .resolve("na2.salesforce.com", addr)
        .build()
        .expect("client");
    Relay::builder(config).client(client).build().expect("relay")
}

fn sf_url(server: &MockServer, host: &str, path: &str) -> String {
    format!("http://{}:{}{}", host, server.address().port(), path)
}

fn inbound(method: Method, endpoint: &str, headers: &[(&str, &str)], body: Body) -> Request {
    let mut builder =
        Request::builder().method(method).uri("/proxy").header(ENDPOINT_HEADER, endpoint);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    builder.body(body).expect("request")
}

async fn body_bytes(response: Response) -> Bytes {
    to_bytes(response.into_body(), usize::MAX).await.expect("response body")
}

async fn received(server: &MockServer, at: &str) -> Vec<wiremock::Request> {
    server
        .received_requests()
        .await
        .expect("request recording enabled")
        .into_iter()
        .filter(|r| r.url.path() == at)
        .collect()
}

fn header_str<'a>(request: &'a wiremock::Request, name: &str) -> Option<&'a str> {
    request.headers.get(name).and_then(|v| v.to_str().ok())
}

#[tokio::test]
async fn test_post_forwards_allowlisted_headers_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/services/data/v59.0/sobjects/Account"))
        .respond_with(
            ResponseTemplate::new(201)
                .insert_header("SForce-Limit-Info", "api-usage=18/15000")
                .set_body_string(r#"{"id":"001xx000003DGb2AAG","success":true}"#),
        )
        .expect(1)
        .mount(&server)
        .await;

    let relay = relay_for(&server, RelayConfig::with_cors());
    let response = relay
        .handle(inbound(
            Method::POST,
            &sf_url(&server, "na1.salesforce.com", "/services/data/v59.0/sobjects/Account"),
            &[
                ("Authorization", TOKEN),
                ("Content-Type", "application/json"),
                ("Cookie", "sid=should-not-leak"),
                ("X-Forwarded-For", "10.0.0.1"),
            ],
            Body::from(r#"{"Name":"Acme"}"#),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(response.headers()["sforce-limit-info"], "api-usage=18/15000");
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert_eq!(
        body_bytes(response).await,
        Bytes::from_static(br#"{"id":"001xx000003DGb2AAG","success":true}"#)
    );
    assert_eq!(relay.in_flight(), 0);

    let requests = received(&server, "/services/data/v59.0/sobjects/Account").await;
    assert_eq!(requests.len(), 1);
    let upstream = &requests[0];
    assert_eq!(header_str(upstream, "authorization"), Some(TOKEN));
    assert_eq!(header_str(upstream, "content-type"), Some("application/json"));
    assert!(upstream.headers.get("cookie").is_none());
    assert!(upstream.headers.get("x-forwarded-for").is_none());
    assert_eq!(upstream.body, br#"{"Name":"Acme"}"#);
}

#[tokio::test]
async fn test_get_without_body_is_forwarded_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/services/data"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .mount(&server)
        .await;

    let relay = relay_for(&server, RelayConfig::default());
    let response = relay
        .handle(inbound(
            Method::GET,
            &sf_url(&server, "na1.salesforce.com", "/services/data"),
            &[("Authorization", TOKEN)],
            Body::empty(),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    assert_eq!(body_bytes(response).await, Bytes::from_static(b"[]"));

    let requests = received(&server, "/services/data").await;
    assert_eq!(requests.len(), 1);
    assert!(requests[0].body.is_empty());
}

#[tokio::test]
async fn test_redirect_to_validated_host_replays_credentials_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/services/oauth2/token"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("Location", sf_url(&server, "na2.salesforce.com", "/moved")),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/moved"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let relay = relay_for(&server, RelayConfig::default());
    let response = relay
        .handle(inbound(
            Method::POST,
            &sf_url(&server, "na1.salesforce.com", "/services/oauth2/token"),
            &[("Authorization", TOKEN), ("Content-Type", "application/x-www-form-urlencoded")],
            Body::from("grant_type=refresh_token&refresh_token=abc"),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, Bytes::from_static(b"ok"));
    assert_eq!(relay.in_flight(), 0);

    let requests = received(&server, "/moved").await;
    assert_eq!(requests.len(), 1);
    let hop = &requests[0];
    // Original method kept across the 302
    assert_eq!(hop.method.as_str(), "POST");
    assert_eq!(header_str(hop, "authorization"), Some(TOKEN));
    assert_eq!(header_str(hop, "content-type"), Some("application/x-www-form-urlencoded"));
    assert_eq!(hop.body, b"grant_type=refresh_token&refresh_token=abc");
}

#[tokio::test]
async fn test_redirect_to_unvalidated_host_withholds_credentials_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/services/data"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("Location", format!("{}/leak", server.uri())),
        )
        .mount(&server)
        .await;
    Mock::given(path("/leak"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let relay = relay_for(&server, RelayConfig::default());
    let response = relay
        .handle(inbound(
            Method::POST,
            &sf_url(&server, "na1.salesforce.com", "/services/data"),
            &[("Authorization", TOKEN), ("Content-Type", "application/json")],
            Body::from(r#"{"secret":true}"#),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::OK);

    let requests = received(&server, "/leak").await;
    assert_eq!(requests.len(), 1);
    let hop = &requests[0];
    assert_eq!(hop.method.as_str(), "POST");
    assert!(hop.headers.get("authorization").is_none());
    assert!(hop.headers.get("content-type").is_none());
    assert!(hop.body.is_empty());
}

#[tokio::test]
async fn test_x_authorization_is_replayed_as_authorization() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/services/data/v59.0/sobjects/Account/001"))
        .respond_with(
            ResponseTemplate::new(301)
                .insert_header("Location", sf_url(&server, "na2.salesforce.com", "/account")),
        )
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/account"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let relay = relay_for(&server, RelayConfig::default());
    let response = relay
        .handle(inbound(
            Method::PATCH,
            &sf_url(&server, "na1.salesforce.com", "/services/data/v59.0/sobjects/Account/001"),
            &[("X-Authorization", TOKEN), ("Content-Type", "application/json")],
            Body::from(r#"{"Name":"Renamed"}"#),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let first = received(&server, "/services/data/v59.0/sobjects/Account/001").await;
    assert_eq!(header_str(&first[0], "authorization"), Some(TOKEN));

    let hops = received(&server, "/account").await;
    let hop = &hops[0];
    assert_eq!(header_str(hop, "authorization"), Some(TOKEN));
    assert_eq!(hop.body, br#"{"Name":"Renamed"}"#);
}

#[tokio::test]
async fn test_307_to_unvalidated_host_carries_no_body_or_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/services/data"))
        .respond_with(
            ResponseTemplate::new(307)
                .insert_header("Location", format!("{}/elsewhere", server.uri())),
        )
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/elsewhere"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let relay = relay_for(&server, RelayConfig::default());
    let response = relay
        .handle(inbound(
            Method::PUT,
            &sf_url(&server, "na1.salesforce.com", "/services/data"),
            &[("Authorization", TOKEN), ("Content-Type", "text/csv")],
            Body::from("Id,Name\n001,Acme\n"),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::OK);

    let hops = received(&server, "/elsewhere").await;
    assert_eq!(hops.len(), 1);
    let hop = &hops[0];
    assert_eq!(hop.method.as_str(), "PUT");
    assert!(hop.headers.get("authorization").is_none());
    assert!(hop.headers.get("content-type").is_none());
    assert!(hop.body.is_empty());
}

#[tokio::test]
async fn test_307_to_validated_host_replays_body() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/services/data"))
        .respond_with(
            ResponseTemplate::new(307)
                .insert_header("Location", sf_url(&server, "na2.salesforce.com", "/bulk")),
        )
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/bulk"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let relay = relay_for(&server, RelayConfig::default());
    let response = relay
        .handle(inbound(
            Method::PUT,
            &sf_url(&server, "na1.salesforce.com", "/services/data"),
            &[("Authorization", TOKEN), ("Content-Type", "text/csv")],
            Body::from("Id,Name\n001,Acme\n"),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::OK);

    let hops = received(&server, "/bulk").await;
    let hop = &hops[0];
    assert_eq!(header_str(hop, "authorization"), Some(TOKEN));
    assert_eq!(header_str(hop, "content-type"), Some("text/csv"));
    assert_eq!(hop.body, b"Id,Name\n001,Acme\n");
}

#[tokio::test]
async fn test_same_host_redirect_keeps_authorization() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/services/oauth2/token"))
        .respond_with(ResponseTemplate::new(302).insert_header(
            "Location",
            sf_url(&server, "na1.salesforce.com", "/services/oauth2/redirected/"),
        ))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/services/oauth2/redirected/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"access_token":"t"}"#))
        .mount(&server)
        .await;

    let relay = relay_for(&server, RelayConfig::default());
    let response = relay
        .handle(inbound(
            Method::POST,
            &sf_url(&server, "na1.salesforce.com", "/services/oauth2/token"),
            &[("Authorization", TOKEN), ("Content-Type", "application/x-www-form-urlencoded")],
            Body::from("grant_type=password"),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, Bytes::from_static(br#"{"access_token":"t"}"#));

    let hops = received(&server, "/services/oauth2/redirected/").await;
    assert_eq!(hops.len(), 1);
    let hop = &hops[0];
    assert_eq!(hop.method.as_str(), "POST");
    let host = format!("na1.salesforce.com:{}", server.address().port());
    assert_eq!(header_str(hop, "host"), Some(host.as_str()));
    assert_eq!(header_str(hop, "authorization"), Some(TOKEN));
    assert_eq!(header_str(hop, "content-type"), Some("application/x-www-form-urlencoded"));
    assert_eq!(hop.body, b"grant_type=password");
}

#[tokio::test]
async fn test_multi_chunk_body_is_replayed_whole() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/services/async/59.0/job"))
        .respond_with(
            ResponseTemplate::new(303)
                .insert_header("Location", sf_url(&server, "na2.salesforce.com", "/job")),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/job"))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;

    let chunks: Vec<Result<Bytes, std::io::Error>> = vec![
        Ok(Bytes::from_static(b"<jobInfo>")),
        Ok(Bytes::from_static(b"<operation>insert</operation>")),
        Ok(Bytes::from_static(b"</jobInfo>")),
    ];
    let relay = relay_for(&server, RelayConfig::default());
    let response = relay
        .handle(inbound(
            Method::POST,
            &sf_url(&server, "na1.salesforce.com", "/services/async/59.0/job"),
            &[("X-SFDC-Session", "sid"), ("Content-Type", "application/xml")],
            Body::from_stream(futures::stream::iter(chunks)),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::CREATED);

    let expected: &[u8] = b"<jobInfo><operation>insert</operation></jobInfo>";
    let first = received(&server, "/services/async/59.0/job").await;
    assert_eq!(first[0].body, expected);
    let hops = received(&server, "/job").await;
    let hop = &hops[0];
    assert_eq!(hop.body, expected);
    assert_eq!(header_str(hop, "x-sfdc-session"), Some("sid"));
    assert_eq!(header_str(hop, "content-type"), Some("application/xml"));
}

#[tokio::test]
async fn test_not_modified_is_returned_as_is() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/services/data/v59.0/sobjects/Account/describe"))
        .respond_with(ResponseTemplate::new(304))
        .expect(1)
        .mount(&server)
        .await;

    let relay = relay_for(&server, RelayConfig::default());
    let response = relay
        .handle(inbound(
            Method::GET,
            &sf_url(
                &server,
                "na1.salesforce.com",
                "/services/data/v59.0/sobjects/Account/describe",
            ),
            &[("If-Modified-Since", "Tue, 01 Oct 2024 00:00:00 GMT")],
            Body::empty(),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
}

#[tokio::test]
async fn test_redirect_loop_is_bad_gateway() {
    let server = MockServer::start().await;
    Mock::given(path("/loop"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/loop"))
        .mount(&server)
        .await;

    let config = RelayConfig { max_redirects: 2, ..RelayConfig::with_cors() };
    let relay = relay_for(&server, config);
    let response = relay
        .handle(inbound(
            Method::GET,
            &sf_url(&server, "na1.salesforce.com", "/loop"),
            &[],
            Body::empty(),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert!(body_bytes(response).await.is_empty());
    assert_eq!(relay.in_flight(), 0);
    // Initial request plus two followed hops
    assert_eq!(received(&server, "/loop").await.len(), 3);
}

#[tokio::test]
async fn test_connection_failure_is_bad_gateway() {
    let server = MockServer::start().await;
    // Port that nothing listens on
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        listener.local_addr().expect("local addr").port()
    };

    let relay = relay_for(&server, RelayConfig::default());
    let response = relay
        .handle(inbound(
            Method::POST,
            &format!("http://na1.salesforce.com:{}/services/data", port),
            &[("Authorization", TOKEN)],
            Body::from("{}"),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert!(body_bytes(response).await.is_empty());
    assert_eq!(relay.in_flight(), 0);
}
