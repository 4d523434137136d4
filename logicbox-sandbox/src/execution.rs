//! Lifecycle tracking for in-flight executions

use crate::types::{ExecutionRequest, ExecutionResult};
use logicbox_common::{DiagnosticKind, ExecutionId};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Execution status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
    TimedOut,
}

impl ExecutionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecutionStatus::Succeeded | ExecutionStatus::Failed | ExecutionStatus::TimedOut
        )
    }
}

/// Snapshot of one execution
#[derive(Debug, Clone)]
pub struct ExecutionState {
    pub id: ExecutionId,
    pub status: ExecutionStatus,
    pub script_len: usize,
    pub started_at: Instant,
    pub duration: Option<Duration>,
    pub error_kind: Option<DiagnosticKind>,
}

impl ExecutionState {
    pub fn new(request: &ExecutionRequest) -> Self {
        Self {
            id: request.id,
            status: ExecutionStatus::Queued,
            script_len: request.script.len(),
            started_at: Instant::now(),
            duration: None,
            error_kind: None,
        }
    }

    pub fn start(&mut self) {
        if self.status == ExecutionStatus::Queued {
            self.status = ExecutionStatus::Running;
            self.started_at = Instant::now();
        }
    }

    /// Record the terminal status; later calls are ignored
    pub fn finish(&mut self, result: &ExecutionResult) {
        if self.status.is_terminal() {
            return;
        }
        self.status = if result.timed_out {
            ExecutionStatus::TimedOut
        } else if result.success() {
            ExecutionStatus::Succeeded
        } else {
            ExecutionStatus::Failed
        };
        self.error_kind = result.error().map(|e| e.kind());
        self.duration = Some(self.started_at.elapsed());
    }

    pub fn elapsed(&self) -> Duration {
        self.duration.unwrap_or_else(|| self.started_at.elapsed())
    }
}
