//! Runtime trait and the interpreter-backed implementation

use crate::engine::{Engine, Outcome};
use crate::types::{ExecutionRequest, ExecutionResult};
use crate::Result;
use anyhow::Context;
use async_trait::async_trait;
use logicbox_common::Diagnostic;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;

/// Stack for interpreter threads; evaluation depth is capped well inside it
pub const INTERPRETER_STACK_SIZE: usize = 64 * 1024 * 1024;

/// Extra time granted past the deadline before the caller stops waiting
const TIMEOUT_GRACE: Duration = Duration::from_millis(250);

/// Runtime abstraction for executing scripts
#[async_trait]
pub trait Runtime: Send + Sync {
    /// Run a script to completion
    async fn execute(&self, request: ExecutionRequest) -> Result<ExecutionResult>;

    /// Get runtime name
    fn name(&self) -> &str;
}

/// Runs each script on its own interpreter thread.
///
/// The interpreter stops itself at the deadline; the async side waits a
/// short grace period beyond it and then reports a timeout without waiting
/// for the thread.
pub struct InterpreterRuntime {
    engine: Arc<Engine>,
    stack_size: usize,
}

impl InterpreterRuntime {
    pub fn new(engine: Engine) -> Self {
        Self {
            engine: Arc::new(engine),
            stack_size: INTERPRETER_STACK_SIZE,
        }
    }

    pub fn with_stack_size(mut self, stack_size: usize) -> Self {
        self.stack_size = stack_size;
        self
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }
}

#[async_trait]
impl Runtime for InterpreterRuntime {
    async fn execute(&self, request: ExecutionRequest) -> Result<ExecutionResult> {
        let start = Instant::now();
        let timeout = self.engine.limits().clamp_timeout(request.timeout);
        let deadline = timeout.map(|t| start + t);

        let (result_tx, result_rx) = oneshot::channel::<Outcome>();
        let engine = Arc::clone(&self.engine);
        let script = request.script;
        std::thread::Builder::new()
            .name(format!("logicbox-exec-{}", request.id))
            .stack_size(self.stack_size)
            .spawn(move || {
                let outcome = engine.run(&script, deadline);
                let _ = result_tx.send(outcome);
            })
            .context("Failed to spawn interpreter thread")?;

        let received = match timeout {
            Some(timeout) => tokio::time::timeout(timeout + TIMEOUT_GRACE, result_rx)
                .await
                .ok(),
            None => Some(result_rx.await),
        };
        let duration_ms = start.elapsed().as_millis() as u64;

        let result = match received {
            Some(Ok(outcome)) => {
                let timed_out = matches!(
                    &outcome.result,
                    Err(Diagnostic::RuntimeFault { error_type, .. }) if error_type == "TimeoutError"
                );
                ExecutionResult {
                    id: request.id,
                    outcome: outcome.result,
                    stdout: outcome.stdout,
                    duration_ms,
                    operations: outcome.operations,
                    timed_out,
                }
            }
            Some(Err(_)) => ExecutionResult::failed(
                request.id,
                Diagnostic::runtime("InternalError", "interpreter thread exited without a result"),
                duration_ms,
            ),
            None => {
                tracing::warn!(execution_id = %request.id, duration_ms, "interpreter missed its deadline");
                let mut result = ExecutionResult::failed(
                    request.id,
                    Diagnostic::runtime("TimeoutError", "execution time limit exceeded"),
                    duration_ms,
                );
                result.timed_out = true;
                result
            }
        };
        Ok(result)
    }

    fn name(&self) -> &str {
        "interpreter"
    }
}
