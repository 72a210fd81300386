//! LLM client behavior against a local stub endpoint
//!
//! Exercises the retry policy and failure mapping over real HTTP using a
//! throwaway axum server bound to an ephemeral port.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::json;
use solaudit::llm::LlmClient;
use solaudit::ErrorCode;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

async fn spawn_stub(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub listener");
    let addr = listener.local_addr().expect("stub addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve stub");
    });
    format!("http://{}/generate", addr)
}

fn wrapped_assessment_body() -> serde_json::Value {
    let assessment = json!({
        "success": true,
        "analysis": {
            "contract_name": "EtherStore",
            "security_score": 70,
            "risk_level": "CRITICAL",
            "summary": "Reentrancy in withdraw.",
            "vulnerabilities": [],
            "good_practices": [],
            "recommendations": []
        }
    });
    json!({
        "candidates": [{
            "content": {
                "parts": [{
                    "text": format!("Here is the audit:\n{}\nEnd of report.", assessment)
                }]
            }
        }]
    })
}

#[tokio::test]
async fn test_retry_then_succeed_with_linear_backoff() {
    let calls = Arc::new(AtomicU32::new(0));

    let app = Router::new()
        .route(
            "/generate",
            post(|State(calls): State<Arc<AtomicU32>>| async move {
                let attempt = calls.fetch_add(1, Ordering::SeqCst);
                if attempt < 2 {
                    (StatusCode::SERVICE_UNAVAILABLE, "upstream busy").into_response()
                } else {
                    Json(wrapped_assessment_body()).into_response()
                }
            }),
        )
        .with_state(calls.clone());

    let base_url = spawn_stub(app).await;
    let client = LlmClient::new("test-key", None).with_base_url(base_url);

    let start = Instant::now();
    let result = client
        .analyze_security("pragma solidity ^0.8.0; contract EtherStore {}")
        .await
        .expect("third attempt should succeed");

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    // Linear backoff: 1s before the second attempt, 2s before the third
    assert!(start.elapsed() >= Duration::from_secs(3));
    assert!(result.success);
    assert_eq!(result.analysis.security_score, 70);
}

#[tokio::test]
async fn test_client_errors_are_not_retried() {
    let calls = Arc::new(AtomicU32::new(0));

    let app = Router::new()
        .route(
            "/generate",
            post(|State(calls): State<Arc<AtomicU32>>| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                (StatusCode::BAD_REQUEST, r#"{"error":{"message":"bad key"}}"#)
            }),
        )
        .with_state(calls.clone());

    let base_url = spawn_stub(app).await;
    let client = LlmClient::new("test-key", None).with_base_url(base_url);

    let err = client
        .analyze_security("contract A {}")
        .await
        .expect_err("4xx must fail");

    assert_eq!(err.code, ErrorCode::ProviderError);
    assert!(err.message.contains("bad key"));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_safety_blocked_response() {
    let app = Router::new().route(
        "/generate",
        post(|| async {
            Json(json!({
                "candidates": [],
                "promptFeedback": { "blockReason": "SAFETY" }
            }))
        }),
    );

    let base_url = spawn_stub(app).await;
    let client = LlmClient::new("test-key", None).with_base_url(base_url);

    let err = client
        .analyze_security("contract A {}")
        .await
        .expect_err("blocked response must fail");

    assert_eq!(err.code, ErrorCode::ContentBlocked);
}

#[tokio::test]
async fn test_unparseable_body_is_parse_error() {
    let app = Router::new().route(
        "/generate",
        post(|| async {
            Json(json!({
                "candidates": [{
                    "content": { "parts": [{ "text": "no json object in here" }] }
                }]
            }))
        }),
    );

    let base_url = spawn_stub(app).await;
    let client = LlmClient::new("test-key", None).with_base_url(base_url);

    let err = client
        .analyze_security("contract A {}")
        .await
        .expect_err("unparseable body must fail");

    assert_eq!(err.code, ErrorCode::ParseError);
}
