//! Retry, rate-limit and classification behaviour of the JSON fetcher

use lol_ingest::api::{ApiRequest, JsonFetcher, RetryPolicy};
use lol_ingest::{ErrorClass, FetchError};
use std::time::{Duration, Instant};
use url::Url;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fetcher(max_retries: u32) -> JsonFetcher {
    let policy = RetryPolicy {
        timeout: Duration::from_secs(5),
        max_retries,
        backoff_base: 2.0,
        backoff_unit: Duration::from_millis(10),
        ..RetryPolicy::default()
    };
    JsonFetcher::new(reqwest::Client::new(), policy)
}

fn request(server: &MockServer, route: &str) -> ApiRequest {
    ApiRequest::new(Url::parse(&format!("{}{}", server.uri(), route)).unwrap())
}

#[tokio::test]
async fn test_rate_limit_waits_retry_after_without_using_retries() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/limited"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "1"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/limited"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
        .mount(&server)
        .await;

    let start = Instant::now();
    // no retry budget at all: the 429 must not consume one
    let value = fetcher(0)
        .fetch_json(&request(&server, "/limited"))
        .await
        .expect("fetch should succeed after waiting");

    assert_eq!(value["ok"], true);
    assert!(start.elapsed() >= Duration::from_secs(1));
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_rate_limit_waits_are_capped() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .mount(&server)
        .await;

    let policy = RetryPolicy {
        max_rate_limit_waits: 2,
        ..RetryPolicy::default()
    };
    let fetcher = JsonFetcher::new(reqwest::Client::new(), policy);

    let err = fetcher
        .fetch_json(&request(&server, "/always-limited"))
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::RateLimited { waits: 2, .. }));
    assert_eq!(err.class(), ErrorClass::RateLimited);
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_long_retry_after_is_clamped() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/day-long"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "86400"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/day-long"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
        .mount(&server)
        .await;

    let policy = RetryPolicy {
        max_retry_after: Duration::from_secs(1),
        ..RetryPolicy::default()
    };
    let fetcher = JsonFetcher::new(reqwest::Client::new(), policy);

    let start = Instant::now();
    let value = tokio::time::timeout(
        Duration::from_secs(5),
        fetcher.fetch_json(&request(&server, "/day-long")),
    )
    .await
    .expect("the wait should be clamped to one second")
    .unwrap();

    assert_eq!(value["ok"], true);
    assert!(start.elapsed() >= Duration::from_secs(1));
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_server_errors_are_retried_then_succeed() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([1, 2])))
        .mount(&server)
        .await;

    let value = fetcher(2)
        .fetch_json(&request(&server, "/flaky"))
        .await
        .unwrap();

    assert_eq!(value, serde_json::json!([1, 2]));
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_server_errors_surface_after_retries() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;

    let err = fetcher(1)
        .fetch_json(&request(&server, "/down"))
        .await
        .unwrap_err();

    match &err {
        FetchError::ServerError { status, body, .. } => {
            assert_eq!(*status, 500);
            assert_eq!(body, "upstream exploded");
        }
        other => panic!("expected ServerError, got {:?}", other),
    }
    assert_eq!(err.class(), ErrorClass::UpstreamServer);
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_client_errors_fail_immediately() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("{\"status\":{\"message\":\"Data not found\"}}"))
        .mount(&server)
        .await;

    let err = fetcher(3)
        .fetch_json(&request(&server, "/missing"))
        .await
        .unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(err.class(), ErrorClass::UpstreamClient);
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_invalid_json_is_a_decode_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let err = fetcher(3)
        .fetch_json(&request(&server, "/html"))
        .await
        .unwrap_err();

    assert_eq!(err.class(), ErrorClass::Decode);
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_timeouts_are_transient() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({}))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let policy = RetryPolicy {
        timeout: Duration::from_millis(200),
        max_retries: 0,
        ..RetryPolicy::default()
    };
    let err = JsonFetcher::new(reqwest::Client::new(), policy)
        .fetch_json(&request(&server, "/slow"))
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Timeout { .. }));
    assert_eq!(err.class(), ErrorClass::TransientNetwork);
}

#[tokio::test]
async fn test_headers_and_query_are_sent() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/lol/match/v5/matches/by-puuid/p/ids"))
        .and(header("x-riot-token", "secret"))
        .and(query_param("start", "0"))
        .and(query_param("count", "12"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!(["KR_1"])))
        .expect(1)
        .mount(&server)
        .await;

    let req = request(&server, "/lol/match/v5/matches/by-puuid/p/ids")
        .header(
            reqwest::header::HeaderName::from_static("x-riot-token"),
            reqwest::header::HeaderValue::from_static("secret"),
        )
        .query("start", 0)
        .query("count", 12);

    let value = fetcher(0).fetch_json(&req).await.unwrap();
    assert_eq!(value, serde_json::json!(["KR_1"]));
}
