mod support;

use std::time::Duration;

use oai_core::TransportOptions;
use oai_engine::{build_fetcher, FetchSettings, Fetcher, ReqwestFetcher, TransportFailure};
use pretty_assertions::assert_eq;
use support::init_logging;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn returns_the_raw_body() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/oai"))
        .and(header("user-agent", "oai-test/1.0"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<OAI-PMH/>"))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = ReqwestFetcher::new(FetchSettings {
        user_agent: Some("oai-test/1.0".to_string()),
        ..FetchSettings::default()
    })
    .unwrap();
    let body = fetcher
        .fetch(&format!("{}/oai?verb=Identify", server.uri()))
        .await
        .unwrap();
    assert_eq!(body, b"<OAI-PMH/>".to_vec());
}

#[tokio::test]
async fn non_success_status_is_a_transport_error() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let fetcher = ReqwestFetcher::new(FetchSettings::default()).unwrap();
    let err = fetcher
        .fetch(&format!("{}/oai", server.uri()))
        .await
        .unwrap_err();
    assert_eq!(err.kind, TransportFailure::HttpStatus(503));
}

#[tokio::test]
async fn slow_server_times_out() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("late")
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let fetcher = ReqwestFetcher::new(FetchSettings {
        request_timeout: Some(Duration::from_millis(100)),
        ..FetchSettings::default()
    })
    .unwrap();
    let err = fetcher
        .fetch(&format!("{}/oai", server.uri()))
        .await
        .unwrap_err();
    assert_eq!(err.kind, TransportFailure::Timeout);
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("x".repeat(64)))
        .mount(&server)
        .await;

    let fetcher = ReqwestFetcher::new(FetchSettings {
        max_bytes: 16,
        ..FetchSettings::default()
    })
    .unwrap();
    let err = fetcher
        .fetch(&format!("{}/oai", server.uri()))
        .await
        .unwrap_err();
    assert_eq!(
        err.kind,
        TransportFailure::TooLarge {
            max_bytes: 16,
            actual: Some(64),
        }
    );
}

#[tokio::test]
async fn malformed_url_is_rejected() {
    let fetcher = ReqwestFetcher::new(FetchSettings::default()).unwrap();
    let err = fetcher.fetch("not a url").await.unwrap_err();
    assert_eq!(err.kind, TransportFailure::InvalidUrl);
}

#[test]
fn standard_transport_is_the_default() {
    assert!(build_fetcher(&TransportOptions::default()).is_ok());
    assert_eq!(
        FetchSettings::from_options(&TransportOptions::default()).request_timeout,
        None
    );
}
