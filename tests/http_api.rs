//! HTTP surface tests
//!
//! Drives the full router with `oneshot` against a wiremock log server and
//! checks status codes, JSON bodies and the Prometheus exposition.

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use foamtail::{config::Config, handlers::AppState};
use std::str::FromStr;
use std::sync::Arc;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FIXTURE: &str = include_str!("fixtures/simplefoam.log");

async fn log_server(status: u16) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/log.simpleFoam"))
        .respond_with(ResponseTemplate::new(status).set_body_string(FIXTURE))
        .mount(&server)
        .await;
    server
}

fn create_test_state(server: &MockServer) -> AppState {
    let addr = server.address();
    let config = Config::from_str(&format!(
        r#"
[server]
host = "127.0.0.1"
port = 9108

[source]
host = "{}"
port = {}
file_path = "log.simpleFoam"
timeout_seconds = 1
"#,
        addr.ip(),
        addr.port()
    ))
    .expect("should parse test config");
    AppState::new(Arc::new(config)).expect("AppState::new should succeed")
}

fn app(state: AppState) -> Router {
    foamtail::handlers::router(state)
}

async fn get(app: Router, uri: &str) -> (StatusCode, String) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

#[tokio::test]
async fn test_health_reports_ok() {
    let server = log_server(200).await;
    let (status, body) = get(app(create_test_state(&server)), "/health").await;

    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["status"], "OK");
    assert_eq!(json["collection_status"], "operational");
}

#[tokio::test]
async fn test_metric_types_lists_catalog() {
    let server = log_server(200).await;
    let (status, body) = get(app(create_test_state(&server)), "/metric-types").await;

    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    let metrics = json["metrics"].as_array().expect("metrics array");
    assert_eq!(metrics.len(), 12);
    assert_eq!(metrics[0], "intel/openfoam/k/initial");
    assert!(metrics.iter().any(|m| m == "intel/openfoam/omega/final"));

    // Listing the catalog never touches the log server
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_collect_requested_metrics() {
    let server = log_server(200).await;
    let (status, body) = get(
        app(create_test_state(&server)),
        "/collect?metrics=intel/openfoam/Ux/final,intel/openfoam/p/initial",
    )
    .await;

    assert_eq!(status, StatusCode::OK, "body: {}", body);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    let items = json.as_array().expect("array of measurements");
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["namespace"], "intel/openfoam/Ux/final");
    assert_eq!(items[0]["value"], 2.36534655e-07);
    assert_eq!(items[1]["namespace"], "intel/openfoam/p/initial");
    assert_eq!(items[1]["value"], 8.60411354e-05);
}

#[tokio::test]
async fn test_collect_without_params_collects_catalog() {
    let server = log_server(200).await;
    let (status, body) = get(app(create_test_state(&server)), "/collect").await;

    assert_eq!(status, StatusCode::OK, "body: {}", body);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json.as_array().unwrap().len(), 12);
}

#[tokio::test]
async fn test_collect_rejects_malformed_namespace() {
    let server = log_server(200).await;
    let (status, body) = get(
        app(create_test_state(&server)),
        "/collect?metrics=intel/openfoam/Ux",
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("error"));
    assert!(
        server.received_requests().await.unwrap().is_empty(),
        "invalid input should be rejected before fetching"
    );
}

#[tokio::test]
async fn test_collect_missing_variable_is_404() {
    let server = log_server(200).await;
    let (status, body) = get(
        app(create_test_state(&server)),
        "/collect?metrics=intel/openfoam/fUx/final",
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert!(
        json["error"].as_str().unwrap().contains("Can't find data"),
        "unexpected error body: {}",
        body
    );
}

#[tokio::test]
async fn test_collect_upstream_failure_is_502() {
    let server = log_server(503).await;
    let (status, body) = get(
        app(create_test_state(&server)),
        "/collect?metrics=intel/openfoam/Ux/final",
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY, "body: {}", body);
}

#[tokio::test]
async fn test_metrics_exposes_gauge_after_collect() {
    let server = log_server(200).await;
    let state = create_test_state(&server);

    let (status, _) = get(app(state.clone()), "/collect?metrics=intel/openfoam/k/final").await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = get(app(state), "/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("foamtail_residual"));
    assert!(
        body.contains(r#"foamtail_residual{kind="final",variable="k"}"#),
        "gauge for k/final missing from exposition:\n{}",
        body
    );
    assert!(body.contains(r#"foamtail_fetch_total{outcome="success"} 1"#));
    assert!(body.contains("foamtail_collections_total 1"));
}
