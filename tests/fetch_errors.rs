//! Fetch failure classification and batch abort behaviour

use foamtail::catalog::{MetricKey, ResidualKind};
use foamtail::collector::Collector;
use foamtail::config::Config;
use foamtail::error::AppError;
use foamtail::fetch::{FetchError, HttpFetcher, LogFetcher};
use foamtail::metrics::{FetchOutcome, Metrics};
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_fetch_returns_full_body() {
    let server = MockServer::start().await;
    let body = "line one\nline two\n".repeat(10_000);
    Mock::given(method("GET"))
        .and(path("/case/log.simpleFoam"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body.clone()))
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new(server.uri(), 2).unwrap();
    let bytes = fetcher.fetch("case/log.simpleFoam").await.unwrap();

    assert_eq!(bytes.len(), body.len());
}

#[tokio::test]
async fn test_slow_server_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("late")
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new(server.uri(), 1).unwrap();
    let start = Instant::now();
    let err = fetcher.fetch("log").await.unwrap_err();

    assert!(
        matches!(err, FetchError::Timeout { timeout_seconds: 1, .. }),
        "expected Timeout, got {:?}",
        err
    );
    assert!(
        start.elapsed() < Duration::from_secs(4),
        "timeout should fire near the bound, took {:?}",
        start.elapsed()
    );
}

#[tokio::test]
async fn test_missing_resource_is_status_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new(server.uri(), 1).unwrap();
    let err = fetcher.fetch("missing.log").await.unwrap_err();

    match err {
        FetchError::Status { url, status } => {
            assert_eq!(status, 404);
            assert!(url.ends_with("/missing.log"));
        }
        other => panic!("expected Status, got {:?}", other),
    }
}

#[tokio::test]
async fn test_connection_refused_is_transport_error() {
    // Bind then drop to get a port with nothing listening
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let fetcher = HttpFetcher::new(format!("http://127.0.0.1:{}", port), 1).unwrap();
    let err = fetcher.fetch("log").await.unwrap_err();

    assert!(
        matches!(err, FetchError::Transport { .. }),
        "expected Transport, got {:?}",
        err
    );
}

#[tokio::test]
async fn test_fetch_error_aborts_batch_even_when_skipping() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let addr = server.address();
    let config = Config::from_str(&format!(
        r#"
[source]
host = "{}"
port = {}
file_path = "log"

[collection]
on_metric_error = "skip"
"#,
        addr.ip(),
        addr.port()
    ))
    .unwrap();
    let metrics = Arc::new(Metrics::new().unwrap());
    let collector = Collector::from_config(&config, metrics.clone()).unwrap();

    let err = collector
        .collect(&[MetricKey::new("p", ResidualKind::Final)])
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AppError::Fetch(FetchError::Status { status: 500, .. })
    ));
    assert_eq!(metrics.fetch_count(FetchOutcome::Status), 1);
    assert_eq!(metrics.fetch_count(FetchOutcome::Success), 0);
}
