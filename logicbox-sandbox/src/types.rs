//! Core types for script execution

use logicbox_common::{Diagnostic, ExecutionId, ScriptRequest, ScriptResponse};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Request to run one script
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRequest {
    pub id: ExecutionId,

    /// The script text
    pub script: String,

    /// Requested wall-clock budget (None = the configured maximum)
    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,
}

impl ExecutionRequest {
    pub fn new(script: impl Into<String>) -> Self {
        Self {
            id: ExecutionId::new(),
            script: script.into(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_id(mut self, id: ExecutionId) -> Self {
        self.id = id;
        self
    }
}

impl From<ScriptRequest> for ExecutionRequest {
    fn from(request: ScriptRequest) -> Self {
        let mut out = ExecutionRequest::new(request.expr);
        out.timeout = request.timeout_ms.map(Duration::from_millis);
        out
    }
}

/// Result of one script execution
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionResult {
    pub id: ExecutionId,

    /// Serialized value of the trailing expression, or the single diagnostic
    pub outcome: Result<serde_json::Value, Diagnostic>,

    /// Text written by `print`
    pub stdout: String,

    pub duration_ms: u64,

    /// Interpreter operations consumed
    pub operations: u64,

    /// Whether the wall-clock budget ran out
    pub timed_out: bool,
}

impl ExecutionResult {
    /// Failure produced without the interpreter reporting back
    pub fn failed(id: ExecutionId, error: Diagnostic, duration_ms: u64) -> Self {
        Self {
            id,
            outcome: Err(error),
            stdout: String::new(),
            duration_ms,
            operations: 0,
            timed_out: false,
        }
    }

    pub fn success(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn error(&self) -> Option<&Diagnostic> {
        self.outcome.as_ref().err()
    }

    /// Wire form handed to transports
    pub fn into_response(self) -> ScriptResponse {
        match self.outcome {
            Ok(result) => ScriptResponse::Succeeded {
                execution_id: self.id,
                result,
                stdout: self.stdout,
                duration_ms: self.duration_ms,
            },
            Err(error) => ScriptResponse::Failed {
                execution_id: Some(self.id),
                error,
                stdout: self.stdout,
                duration_ms: self.duration_ms,
            },
        }
    }
}
