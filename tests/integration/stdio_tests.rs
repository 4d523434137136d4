//! Stdio pipe driven through an in-memory duplex stream

use logicbox_common::{DiagnosticKind, ScriptResponse};
use logicbox_tests::common::test_service;
use logicbox_transport::StdioHandler;
use serde_json::json;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

#[tokio::test]
async fn test_requests_answered_in_order() {
    let handler = StdioHandler::new(test_service());
    let (client, server) = tokio::io::duplex(64 * 1024);
    let (server_read, server_write) = tokio::io::split(server);
    let serve = tokio::spawn(async move { handler.run(server_read, server_write).await });

    let (client_read, mut client_write) = tokio::io::split(client);
    let mut lines = BufReader::new(client_read).lines();

    let requests = [
        json!({"expr": "1 + 2"}),
        json!({"expr": "kb = make_kb()\nassert_fact(kb, 'P')\nquery(kb, 'P')"}),
        json!({"timeout_ms": 10}),
    ];
    for request in &requests {
        client_write
            .write_all(format!("{}\n", request).as_bytes())
            .await
            .unwrap();
    }
    client_write.write_all(b"\n").await.unwrap();

    let mut responses = Vec::new();
    for _ in 0..requests.len() {
        let line = lines.next_line().await.unwrap().unwrap();
        responses.push(serde_json::from_str::<ScriptResponse>(&line).unwrap());
    }
    client_write.shutdown().await.unwrap();
    drop(client_write);

    assert_eq!(responses[0].result(), Some(&json!(3)));
    assert_eq!(responses[1].result(), Some(&json!(true)));
    assert_eq!(responses[2].error_kind(), Some(DiagnosticKind::MalformedInput));

    let stats = serve.await.unwrap().unwrap();
    assert_eq!(stats.requests, 3);
    assert_eq!(stats.succeeded, 2);
    assert_eq!(stats.failed, 1);
}

#[tokio::test]
async fn test_invalid_utf8_line_is_answered_and_session_continues() {
    let handler = StdioHandler::new(test_service());
    let (client, server) = tokio::io::duplex(64 * 1024);
    let (server_read, server_write) = tokio::io::split(server);
    let serve = tokio::spawn(async move { handler.run(server_read, server_write).await });

    let (client_read, mut client_write) = tokio::io::split(client);
    let mut lines = BufReader::new(client_read).lines();
    client_write.write_all(b"{\"expr\": \"\xff\"}\n").await.unwrap();
    client_write.write_all(b"{\"expr\": \"1 + 2\"}\n").await.unwrap();

    let first: ScriptResponse = serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
    let second: ScriptResponse = serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
    client_write.shutdown().await.unwrap();
    drop(client_write);

    assert_eq!(first.error_kind(), Some(DiagnosticKind::MalformedInput));
    assert_eq!(second.result(), Some(&json!(3)));
    assert_eq!(serve.await.unwrap().unwrap().requests, 2);
}
