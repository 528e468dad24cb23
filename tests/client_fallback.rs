//! Client wrapper against a live gateway and a fake RPC backend, both on
//! loopback listeners.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::{Map, Value, json};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use product_gateway::actions::{ActionLimits, ProductSubmission, SavedSearch};
use product_gateway::auth::TokenVerifier;
use product_gateway::client::HttpGatewayTransport;
use product_gateway::gateway::{self, ActionRouter, AppState, GATEWAY_PATH};
use product_gateway::rate_limit::SlidingWindowLimiter;
use product_gateway::{ErrorKind, GatewayClient, RestBackend};

type CallLog = Arc<Mutex<Vec<(String, Value)>>>;

async fn rpc(
    State(log): State<CallLog>,
    Path(function): Path<String>,
    Json(params): Json<Value>,
) -> Response {
    log.lock().unwrap().push((function.clone(), params.clone()));
    if params["p_name"] == "dup" {
        return (
            StatusCode::CONFLICT,
            Json(json!({"message": "duplicate key value", "code": "23505"})),
        )
            .into_response();
    }
    Json(json!({"function": function, "params": params})).into_response()
}

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Address nothing listens on.
async fn closed_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

async fn spawn_backend() -> (String, CallLog) {
    let log = CallLog::default();
    let app = Router::new()
        .route("/rest/v1/rpc/{function}", post(rpc))
        .with_state(log.clone());
    (serve(app).await, log)
}

fn rest_backend(url: &str) -> Arc<RestBackend> {
    Arc::new(RestBackend::new(url, "anon-key", Duration::from_secs(5)).unwrap())
}

async fn spawn_gateway(backend_url: &str) -> String {
    let limiter = Arc::new(SlidingWindowLimiter::new(Duration::from_secs(60)));
    let router = ActionRouter::new(limiter, ActionLimits::default(), rest_backend(backend_url));
    let state = Arc::new(AppState::new(router, TokenVerifier::ClaimsOnly));
    serve(gateway::build_router(state)).await
}

fn client(gateway_url: &str, backend_url: &str) -> GatewayClient {
    let transport = HttpGatewayTransport::new(
        format!("{}{}", gateway_url, GATEWAY_PATH),
        Some("anon-key".into()),
        Duration::from_secs(5),
    )
    .unwrap();
    GatewayClient::new(Arc::new(transport), rest_backend(backend_url))
}

fn token(sub: &str) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(json!({"sub": sub}).to_string());
    format!("{}.{}.sig", header, payload)
}

fn search(name: &str) -> SavedSearch {
    SavedSearch {
        name: name.into(),
        query: None,
        filters: Map::new(),
    }
}

#[tokio::test]
async fn test_scan_through_live_gateway() {
    let (backend_url, log) = spawn_backend().await;
    let gateway_url = spawn_gateway(&backend_url).await;
    let client = client(&gateway_url, &backend_url);

    let data = client
        .record_scan(&token("user-a"), "5901234123457")
        .await
        .unwrap();
    assert_eq!(data["function"], "record_scan");
    assert_eq!(data["params"], json!({"p_ean": "5901234123457"}));
    assert_eq!(log.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_gateway_rejection_is_returned_without_fallback() {
    let (backend_url, log) = spawn_backend().await;
    let gateway_url = spawn_gateway(&backend_url).await;
    let client = client(&gateway_url, &backend_url);

    let submission = ProductSubmission {
        ean: "1234567890123".into(),
        product_name: "Oat Drink".into(),
        brand: None,
        category: None,
        photo_url: None,
        notes: None,
    };
    let err = client
        .submit_product(&token("user-a"), submission)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidEanChecksum);
    assert!(log.lock().unwrap().is_empty());

    let err = client.record_scan("not-a-jwt", "96385074").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unauthorized);
    assert!(log.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_backend_rejection_relayed_by_gateway() {
    let (backend_url, log) = spawn_backend().await;
    let gateway_url = spawn_gateway(&backend_url).await;
    let client = client(&gateway_url, &backend_url);

    let err = client
        .save_search(&token("user-a"), search("dup"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::RpcError);
    assert_eq!(err.message, "duplicate key value");
    // one call through the gateway, no second direct attempt
    assert_eq!(log.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_falls_back_when_gateway_is_down() {
    let (backend_url, log) = spawn_backend().await;
    let client = client(&closed_url().await, &backend_url);

    let data = client
        .record_scan(&token("user-a"), "96385074")
        .await
        .unwrap();
    assert_eq!(data["function"], "record_scan");

    let err = client
        .save_search(&token("user-a"), search("dup"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::RpcError);
    assert_eq!(err.message, "duplicate key value");

    let calls = log.lock().unwrap();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].0, "save_search");
}

#[tokio::test]
async fn test_gateway_and_backend_both_down() {
    let client = client(&closed_url().await, &closed_url().await);
    let err = client
        .record_scan(&token("user-a"), "96385074")
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::GatewayUnreachable);
}
