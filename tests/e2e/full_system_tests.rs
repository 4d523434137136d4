//! Full system tests: every transport against one service

use logicbox_common::{DiagnosticKind, ScriptResponse};
use logicbox_sandbox::ResourceLimits;
use logicbox_tests::common::{setup_test_logging, test_service, test_service_with_limits, TestServer};
use logicbox_transport::{handle_event, StdioHandler};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

const SOLVER_SCRIPT: &str = "clauses = [expr('A | B'), expr('~A | C'), expr('~B | C')]\nmodel = dpll_satisfiable(expr('(A | B) & (~A | C) & (~B | C) & ~C'))\nentailed = pl_resolution(PropKB(clauses), expr('C'))\n[model, entailed, tt_entails(expr('P & Q'), expr('Q'))]";

#[tokio::test]
async fn test_transports_agree() {
    setup_test_logging();
    let service = test_service();
    let request = json!({ "expr": SOLVER_SCRIPT });

    let direct = service.handle_value(&request).await;
    assert_eq!(direct.result(), Some(&json!([false, true, true])));

    let server = TestServer::start(Arc::clone(&service)).await.unwrap();
    let over_http: ScriptResponse = reqwest::Client::new()
        .post(server.url("/code"))
        .json(&request)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(over_http.result(), direct.result());

    let input = format!("{}\n", request);
    let mut output = Vec::new();
    StdioHandler::new(Arc::clone(&service))
        .run(input.as_bytes(), &mut output)
        .await
        .unwrap();
    let over_stdio: ScriptResponse = serde_json::from_slice(&output).unwrap();
    assert_eq!(over_stdio.result(), direct.result());

    let event = json!({ "body": request });
    let over_function = handle_event(&service, &event).await.response().unwrap();
    assert_eq!(over_function.result(), direct.result());
}

#[tokio::test]
async fn test_concurrent_http_clients_are_isolated() {
    let server = TestServer::start(test_service()).await.unwrap();
    let client = reqwest::Client::new();
    let mut handles = Vec::new();
    for i in 0..16i64 {
        let client = client.clone();
        let url = server.url("/");
        handles.push(tokio::spawn(async move {
            let script = format!("kb = make_kb()\nassert_fact(kb, 'Patient(P{})')\nn = {}\n[query(kb, 'Patient(P{})'), n * n]", i, i, i);
            let response: ScriptResponse = client
                .post(url)
                .json(&json!({ "expr": script }))
                .send()
                .await
                .unwrap()
                .json()
                .await
                .unwrap();
            (i, response)
        }));
    }
    for handle in handles {
        let (i, response) = handle.await.unwrap();
        assert_eq!(response.result(), Some(&json!([true, i * i])));
    }
}

#[tokio::test]
async fn test_runaway_script_does_not_block_others() {
    let service = test_service_with_limits(ResourceLimits {
        max_duration: Some(Duration::from_millis(200)),
        max_operations: u64::MAX,
        ..ResourceLimits::default()
    });
    let slow = {
        let service = Arc::clone(&service);
        tokio::spawn(async move {
            service
                .handle_value(&json!({"expr": "[i for i in range(100000) for j in range(100000) if i < 0]"}))
                .await
        })
    };
    let fast = service.handle_value(&json!({"expr": "1 + 2"})).await;
    assert_eq!(fast.result(), Some(&json!(3)));

    let slow = slow.await.unwrap();
    assert_eq!(slow.error_kind(), Some(DiagnosticKind::RuntimeFault));
    assert!(service.in_flight().await.is_empty());
}
