//! One-shot function handler for serverless-style hosts

use logicbox_common::{Diagnostic, ScriptResponse};
use logicbox_sandbox::SandboxService;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

const ENCODE_FAILURE_BODY: &str = r#"{"status":"failed","error":{"kind":"RuntimeFault","message":"response could not be encoded","error_type":"InternalError","trace":[]},"duration_ms":0}"#;

/// Response envelope expected by function hosts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionResponse {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    /// JSON-encoded [`ScriptResponse`]
    pub body: String,
}

impl FunctionResponse {
    fn from_response(response: &ScriptResponse) -> Self {
        let status_code = crate::status_code(response);
        let (status_code, body) = match serde_json::to_string(response) {
            Ok(body) => (status_code, body),
            Err(e) => {
                tracing::error!(error = %e, "Failed to encode response");
                (500, ENCODE_FAILURE_BODY.to_string())
            }
        };
        let headers = BTreeMap::from([(
            "Content-Type".to_string(),
            "application/json".to_string(),
        )]);
        Self {
            status_code,
            headers,
            body,
        }
    }

    /// Decode the body back into a response
    pub fn response(&self) -> serde_json::Result<ScriptResponse> {
        serde_json::from_str(&self.body)
    }
}

/// Handle one event whose `body` is either a JSON string or an object
pub async fn handle_event(service: &SandboxService, event: &Value) -> FunctionResponse {
    let response = match event.get("body") {
        Some(Value::String(body)) => service.handle_body(body.as_bytes()).await,
        Some(body @ Value::Object(_)) => service.handle_value(body).await,
        _ => ScriptResponse::rejected(Diagnostic::malformed("Missing request body")),
    };
    FunctionResponse::from_response(&response)
}
