//! HTTP listener driven over a real socket

use logicbox_common::{DiagnosticKind, ScriptResponse, ServiceInfo};
use logicbox_tests::common::{setup_test_logging, test_service, TestServer};
use serde_json::json;

async fn post(server: &TestServer, path: &str, body: String) -> (u16, ScriptResponse) {
    let response = reqwest::Client::new()
        .post(server.url(path))
        .header("content-type", "application/json")
        .body(body)
        .send()
        .await
        .unwrap();
    let status = response.status().as_u16();
    (status, response.json().await.unwrap())
}

#[tokio::test]
async fn test_info_endpoint_lists_symbols() {
    setup_test_logging();
    let server = TestServer::start(test_service()).await.unwrap();
    let info: ServiceInfo = reqwest::get(server.url("/"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(info.name, "logicbox");
    assert!(info.symbols.iter().any(|s| s.name == "fol_bc_ask"));
    assert!(!info.examples.is_empty());
}

#[tokio::test]
async fn test_execute_on_both_routes() {
    let server = TestServer::start(test_service()).await.unwrap();
    for path in ["/", "/code"] {
        let (status, response) = post(&server, path, json!({"expr": "x = 5\nx * 2"}).to_string()).await;
        assert_eq!(status, 200);
        assert_eq!(response.result(), Some(&json!(10)));
    }
}

#[tokio::test]
async fn test_status_mapping_over_http() {
    let server = TestServer::start(test_service()).await.unwrap();
    let cases = [
        (json!({}).to_string(), 400, DiagnosticKind::MalformedInput),
        ("{not json".to_string(), 400, DiagnosticKind::MalformedInput),
        (json!({"expr": "def f(:"}).to_string(), 422, DiagnosticKind::SyntaxFault),
        (json!({"expr": "undefined_name + 1"}).to_string(), 422, DiagnosticKind::UnresolvedSymbol),
        (json!({"expr": "[1][5]"}).to_string(), 500, DiagnosticKind::RuntimeFault),
    ];
    for (body, expected_status, expected_kind) in cases {
        let (status, response) = post(&server, "/", body.clone()).await;
        assert_eq!(status, expected_status, "body: {}", body);
        assert_eq!(response.error_kind(), Some(expected_kind), "body: {}", body);
    }
}

#[tokio::test]
async fn test_timeout_is_reported_as_runtime_fault() {
    let server = TestServer::start(test_service()).await.unwrap();
    let body = json!({
        "expr": "[i for i in range(100000) for j in range(100000) if i < 0]",
        "timeout_ms": 50
    });
    let (status, response) = post(&server, "/", body.to_string()).await;
    assert_eq!(status, 500);
    assert_eq!(response.error_kind(), Some(DiagnosticKind::RuntimeFault));
}

#[tokio::test]
async fn test_oversized_body_is_refused() {
    let server = TestServer::start_with_body_limit(test_service(), 128).await.unwrap();
    let script = format!("len('{}')", "a".repeat(1024));
    let response = reqwest::Client::new()
        .post(server.url("/"))
        .body(json!({ "expr": script }).to_string())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 413);
}
