use logicbox_tests::common::test_service;
use logicbox_transport::handle_event;
use serde_json::json;

#[tokio::test]
async fn test_function_event_round_trip() {
    let service = test_service();
    let event = json!({
        "httpMethod": "POST",
        "body": json!({"code": "sorted(list(variables(expr('F(x, y) & G(z)'))), key=str)"}).to_string(),
    });
    let response = handle_event(&service, &event).await;
    assert_eq!(response.status_code, 200);
    let body = response.response().unwrap();
    assert_eq!(body.result(), Some(&json!(["x", "y", "z"])));
}
