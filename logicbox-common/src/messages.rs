//! Request and response bodies exchanged with transports

use crate::diagnostic::{Diagnostic, DiagnosticKind};
use crate::types::ExecutionId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Field carrying the script text; `code` is accepted as an alias
pub const SCRIPT_FIELD: &str = "expr";
pub const SCRIPT_FIELD_ALIAS: &str = "code";

/// A decoded execution request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptRequest {
    #[serde(alias = "code")]
    pub expr: String,

    /// Requested wall-clock budget; transports clamp it to the configured maximum
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl ScriptRequest {
    pub fn new(expr: impl Into<String>) -> Self {
        Self {
            expr: expr.into(),
            timeout_ms: None,
        }
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }
}

/// Decode a raw request body.
///
/// Anything other than a JSON object with a non-empty string script field
/// is `MalformedInput`.
pub fn decode_request(body: &[u8]) -> Result<ScriptRequest, Diagnostic> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| Diagnostic::malformed(format!("request body is not valid JSON: {}", e)))?;
    decode_value(&value)
}

/// Decode an already parsed request body
pub fn decode_value(value: &Value) -> Result<ScriptRequest, Diagnostic> {
    let Some(object) = value.as_object() else {
        return Err(Diagnostic::malformed("request body must be a JSON object"));
    };
    // A null field counts as absent, so `code` still applies
    let present = |name: &str| object.get(name).filter(|v| !v.is_null());
    let field = present(SCRIPT_FIELD)
        .or_else(|| present(SCRIPT_FIELD_ALIAS))
        .ok_or_else(|| Diagnostic::malformed(format!("Missing \"{}\" in request body", SCRIPT_FIELD)))?;
    let Some(expr) = field.as_str() else {
        return Err(Diagnostic::malformed(format!(
            "\"{}\" must be a string",
            SCRIPT_FIELD
        )));
    };
    if expr.trim().is_empty() {
        return Err(Diagnostic::malformed(format!(
            "\"{}\" must not be empty",
            SCRIPT_FIELD
        )));
    }
    let timeout_ms = match object.get("timeout_ms") {
        None | Some(Value::Null) => None,
        Some(v) => Some(v.as_u64().ok_or_else(|| {
            Diagnostic::malformed("\"timeout_ms\" must be a non-negative integer")
        })?),
    };
    Ok(ScriptRequest {
        expr: expr.to_string(),
        timeout_ms,
    })
}

/// Outcome of one invocation as sent back to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScriptResponse {
    Succeeded {
        execution_id: ExecutionId,
        result: Value,
        #[serde(default, skip_serializing_if = "String::is_empty")]
        stdout: String,
        duration_ms: u64,
    },
    Failed {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        execution_id: Option<ExecutionId>,
        error: Diagnostic,
        #[serde(default, skip_serializing_if = "String::is_empty")]
        stdout: String,
        duration_ms: u64,
    },
}

impl ScriptResponse {
    /// Failure that happened before any engine invocation
    pub fn rejected(error: Diagnostic) -> Self {
        ScriptResponse::Failed {
            execution_id: None,
            error,
            stdout: String::new(),
            duration_ms: 0,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ScriptResponse::Succeeded { .. })
    }

    pub fn error_kind(&self) -> Option<DiagnosticKind> {
        match self {
            ScriptResponse::Succeeded { .. } => None,
            ScriptResponse::Failed { error, .. } => Some(error.kind()),
        }
    }

    pub fn result(&self) -> Option<&Value> {
        match self {
            ScriptResponse::Succeeded { result, .. } => Some(result),
            ScriptResponse::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&Diagnostic> {
        match self {
            ScriptResponse::Succeeded { .. } => None,
            ScriptResponse::Failed { error, .. } => Some(error),
        }
    }

    pub fn stdout(&self) -> &str {
        match self {
            ScriptResponse::Succeeded { stdout, .. } | ScriptResponse::Failed { stdout, .. } => {
                stdout
            }
        }
    }
}
