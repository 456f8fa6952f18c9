// tests/integration/http_test.rs

//! Tests for the HTTP host, served on an ephemeral port.

use super::test_helpers::init_tracing;
use actiongate::app;
use actiongate::config::PipelineConfig;
use actiongate::core::storage::MemoryStore;
use actiongate::server::{AppState, build_http_router};
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Arc;

async fn spawn_server() -> SocketAddr {
    init_tracing();
    let router = app::build_router(MemoryStore::new(), &PipelineConfig::default());
    let state = Arc::new(AppState::new(router));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, build_http_router(state)).await.unwrap();
    });
    addr
}

async fn post(addr: SocketAddr, action: &str, body: &str) -> (u16, Value) {
    let response = reqwest::Client::new()
        .post(format!("http://{addr}/actions/{action}"))
        .header("content-type", "application/json")
        .body(body.to_string())
        .send()
        .await
        .unwrap();
    let status = response.status().as_u16();
    let body = response.json::<Value>().await.unwrap();
    (status, body)
}

#[tokio::test]
async fn test_http_open_account_round_trip() {
    let addr = spawn_server().await;

    let (status, body) = post(
        addr,
        "open_account",
        r#"{"account": {"email": "ada@example.com", "display_name": "Ada"}}"#,
    )
    .await;
    assert_eq!(status, 201);
    assert_eq!(body["email"], json!("ada@example.com"));

    let (status, body) = post(addr, "get_account", r#"{"email": "ada@example.com"}"#).await;
    assert_eq!(status, 200);
    assert_eq!(body["display_name"], json!("Ada"));
}

#[tokio::test]
async fn test_http_validation_error_is_400() {
    let addr = spawn_server().await;

    let (status, body) = post(
        addr,
        "open_account",
        r#"{"account": {"email": "bad", "display_name": "Ada"}}"#,
    )
    .await;

    assert_eq!(status, 400);
    assert_eq!(
        body["Payload"],
        json!({ "Errors": { "email": ["must contain @"] } })
    );
}

#[tokio::test]
async fn test_http_handler_fault_is_500() {
    let addr = spawn_server().await;

    let (status, body) = post(
        addr,
        "deposit",
        r#"{"deposit": {"email": "ghost@example.com", "amount_cents": 10}}"#,
    )
    .await;

    assert_eq!(status, 500);
    assert_eq!(body["Error"], json!(true));
}

#[tokio::test]
async fn test_http_unknown_action_is_404() {
    let addr = spawn_server().await;

    let (status, body) = post(addr, "nope", "{}").await;

    assert_eq!(status, 404);
    assert_eq!(body["Message"], json!("Unknown action 'nope'"));
}

#[tokio::test]
async fn test_http_malformed_json_is_400() {
    let addr = spawn_server().await;

    let (status, _) = post(addr, "get_account", "{not json").await;

    assert_eq!(status, 400);
}

#[tokio::test]
async fn test_http_empty_body_binds_absent_arguments() {
    let addr = spawn_server().await;

    let (status, body) = post(addr, "get_account", "").await;

    assert_eq!(status, 500);
    assert_eq!(body["Message"], json!("missing required argument 'email'"));
}
