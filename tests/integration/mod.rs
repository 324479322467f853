//! Integration tests for the contracts relay.
//!
//! Each test starts a fake Sienge upstream on an ephemeral port and drives
//! the real client and router against it.
//! Run with: cargo test --test integration

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::body::{to_bytes, Body};
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower::ServiceExt;

use contracts_relay::api::{create_router, AppState};
use contracts_relay::config::Config;
use contracts_relay::contracts::ContractAggregator;
use contracts_relay::sienge::{Credentials, SiengeClient};

const USER: &str = "relay-bot";
const PASSWORD: &str = "correct-horse";

/// Fake upstream state: total records available and every query received.
#[derive(Clone, Default)]
struct Upstream {
    total: u64,
    queries: Arc<Mutex<Vec<HashMap<String, String>>>>,
}

impl Upstream {
    fn with_total(total: u64) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    fn offsets(&self) -> Vec<u64> {
        self.queries
            .lock()
            .unwrap()
            .iter()
            .map(|q| q["offset"].parse().unwrap())
            .collect()
    }
}

async fn list_contracts(
    State(upstream): State<Upstream>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let expected = Credentials::new(USER, PASSWORD).authorization_header();
    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map_or(false, |v| v == expected);
    if !authorized {
        return (StatusCode::UNAUTHORIZED, "Invalid credentials").into_response();
    }

    upstream.queries.lock().unwrap().push(query.clone());

    let limit: u64 = query["limit"].parse().unwrap();
    let offset: u64 = query["offset"].parse().unwrap();
    let results: Vec<Value> = (offset..upstream.total.min(offset + limit))
        .map(|id| {
            json!({
                "id": id,
                "contractNumber": format!("C-{id}"),
                "totalLaborValue": 100.5,
                "totalMaterialValue": if id % 2 == 0 { json!(null) } else { json!("50") },
            })
        })
        .collect();

    Json(json!({
        "resultSetMetadata": { "count": upstream.total, "offset": offset, "limit": limit },
        "results": results
    }))
    .into_response()
}

async fn truncated_body() -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        "not json{",
    )
        .into_response()
}

async fn stalled_listing() -> Response {
    tokio::time::sleep(Duration::from_secs(3)).await;
    Json(json!({ "results": [] })).into_response()
}

async fn spawn_upstream(upstream: Upstream) -> String {
    let app = Router::new()
        .route("/supply-contracts/all", get(list_contracts))
        .route("/supply-contracts/truncated", get(truncated_body))
        .route("/supply-contracts/stalled", get(stalled_listing))
        .with_state(upstream);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}/supply-contracts/all", addr)
}

fn test_config(api_url: String, password: &str) -> Config {
    Config {
        sienge_user: USER.to_string(),
        sienge_password: password.to_string(),
        sienge_api_url: api_url,
        sienge_measurements_url: None,
        contract_start_date: "2020-01-01".to_string(),
        contract_end_date: "2030-12-31".to_string(),
        page_limit: 200,
        max_pages: 1000,
        http_timeout_ms: 5000,
        http_pool_size: 2,
        port: 0,
        static_dir: "static".to_string(),
        metrics_enabled: false,
        rust_log: "info".to_string(),
        verbose: false,
    }
}

fn relay(config: &Config) -> Router {
    let client = SiengeClient::new(config).unwrap();
    let aggregator = ContractAggregator::from_config(client, config).unwrap();
    create_router(AppState::new(aggregator), Path::new(&config.static_dir))
}

async fn get_contracts(app: Router) -> (StatusCode, HeaderMap, Vec<u8>) {
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/contracts")
                .header(header::ORIGIN, "http://localhost:5173")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, headers, bytes.to_vec())
}

#[tokio::test]
async fn drains_all_pages_and_adds_valor_total() {
    let upstream = Upstream::with_total(400);
    let url = spawn_upstream(upstream.clone()).await;

    let (status, headers, body) = get_contracts(relay(&test_config(url, PASSWORD))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert_eq!(upstream.offsets(), vec![0, 200, 400]);

    let contracts: Vec<Value> = serde_json::from_slice(&body).unwrap();
    assert_eq!(contracts.len(), 400);
    for (index, contract) in contracts.iter().enumerate() {
        assert_eq!(contract["id"], json!(index));
    }
    assert_eq!(contracts[0]["valorTotal"], json!(100.5));
    assert_eq!(contracts[1]["valorTotal"], json!(150.5));

    let query = &upstream.queries.lock().unwrap()[0];
    assert_eq!(query["contractStartDate"], "2020-01-01");
    assert_eq!(query["contractEndDate"], "2030-12-31");
    assert_eq!(query["limit"], "200");
}

#[tokio::test]
async fn wrong_credentials_pass_401_through() {
    let upstream = Upstream::with_total(10);
    let url = spawn_upstream(upstream.clone()).await;

    let (status, _, body) = get_contracts(relay(&test_config(url, "wrong"))).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let envelope: Value = serde_json::from_slice(&body).unwrap();
    assert!(envelope["error"].is_string());
    assert_eq!(envelope["details"], json!("Invalid credentials"));
    assert!(upstream.offsets().is_empty());
}

#[tokio::test]
async fn connection_refused_is_500() {
    // Grab a free port, then close it so nothing is listening.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let url = format!("http://{}/supply-contracts/all", addr);
    let (status, headers, body) = get_contracts(relay(&test_config(url, PASSWORD))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(headers[header::CONTENT_TYPE], "application/json");
    let envelope: Value = serde_json::from_slice(&body).unwrap();
    assert!(envelope["error"].as_str().unwrap().contains("transport"));
}

#[tokio::test]
async fn repeated_requests_are_byte_identical() {
    let upstream = Upstream::with_total(250);
    let url = spawn_upstream(upstream.clone()).await;
    let config = test_config(url, PASSWORD);

    let (_, _, first) = get_contracts(relay(&config)).await;
    let (_, _, second) = get_contracts(relay(&config)).await;

    assert_eq!(first, second);
    assert_eq!(upstream.offsets(), vec![0, 200, 400, 0, 200, 400]);
}

#[tokio::test]
async fn empty_upstream_returns_empty_array() {
    let upstream = Upstream::with_total(0);
    let url = spawn_upstream(upstream.clone()).await;

    let (status, _, body) = get_contracts(relay(&test_config(url, PASSWORD))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"[]".to_vec());
    assert_eq!(upstream.offsets(), vec![0]);
}

#[tokio::test]
async fn invalid_json_body_is_500() {
    let url = spawn_upstream(Upstream::with_total(10)).await;
    let url = url.replace("/all", "/truncated");

    let (status, _, body) = get_contracts(relay(&test_config(url, PASSWORD))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let envelope: Value = serde_json::from_slice(&body).unwrap();
    let message = envelope["error"].as_str().unwrap();
    assert!(message.contains("malformed upstream response"));
    assert!(envelope.get("details").is_none());
}

#[tokio::test]
async fn slow_upstream_times_out_with_500() {
    let url = spawn_upstream(Upstream::with_total(10)).await;
    let mut config = test_config(url.replace("/all", "/stalled"), PASSWORD);
    config.http_timeout_ms = 300;

    let started = Instant::now();
    let (status, _, body) = get_contracts(relay(&config)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(started.elapsed() < Duration::from_secs(3));
    let envelope: Value = serde_json::from_slice(&body).unwrap();
    assert!(envelope["error"].as_str().unwrap().contains("transport"));
}
