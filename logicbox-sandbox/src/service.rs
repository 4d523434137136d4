//! Sandbox service - main entry point for transports

use crate::config::SandboxConfig;
use crate::engine::Engine;
use crate::execution::{ExecutionState, ExecutionStatus};
use crate::limits::ResourceLimits;
use crate::policy::{PolicyError, SymbolTable};
use crate::runtime::{InterpreterRuntime, Runtime};
use crate::types::{ExecutionRequest, ExecutionResult};
use logicbox_common::{
    decode_request, decode_value, Diagnostic, ExecutionId, ScriptRequest, ScriptResponse,
    ServiceInfo,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Script execution service shared by every transport.
///
/// Holds only read-only state plus the table of in-flight executions; each
/// request runs against its own Environment and Binding Set.
pub struct SandboxService {
    runtime: Arc<dyn Runtime>,
    symbols: Arc<SymbolTable>,
    limits: ResourceLimits,
    info: ServiceInfo,
    /// Executions that have not finished yet
    executions: Arc<RwLock<HashMap<ExecutionId, ExecutionState>>>,
}

impl SandboxService {
    /// Resolve the configured allow-list and build the interpreter runtime.
    ///
    /// An invalid allow-list is a startup error.
    pub fn from_config(config: &SandboxConfig) -> Result<Self, PolicyError> {
        let symbols = Arc::new(config.symbols.resolve()?);
        tracing::info!(
            symbols = symbols.len(),
            max_duration = ?config.limits.max_duration,
            "Allow-list resolved"
        );
        let engine = Engine::new(Arc::clone(&symbols), config.limits.clone());
        Ok(Self::new(InterpreterRuntime::new(engine), symbols, config.limits.clone()))
    }

    /// Create a service over a custom runtime
    pub fn new(
        runtime: impl Runtime + 'static,
        symbols: Arc<SymbolTable>,
        limits: ResourceLimits,
    ) -> Self {
        let info = ServiceInfo::new(symbols.describe());
        Self {
            runtime: Arc::new(runtime),
            symbols,
            limits,
            info,
            executions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Run one script; failures come back inside the result, never as `Err`
    pub async fn execute(&self, request: ExecutionRequest) -> ExecutionResult {
        let id = request.id;
        tracing::info!(
            execution_id = %id,
            runtime = self.runtime.name(),
            code_len = request.script.len(),
            "Executing script"
        );

        let mut state = ExecutionState::new(&request);
        state.start();
        self.executions.write().await.insert(id, state.clone());

        // Detached: the entry is removed even if this future is dropped
        let runtime = Arc::clone(&self.runtime);
        let executions = Arc::clone(&self.executions);
        let task = tokio::spawn(async move {
            let outcome = runtime.execute(request).await;
            executions.write().await.remove(&id);
            outcome
        });

        let outcome = match task.await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(e)) => {
                tracing::error!(execution_id = %id, error = %e, "Runtime failed");
                Err(e.to_string())
            }
            Err(e) => {
                tracing::error!(execution_id = %id, error = %e, "Execution task failed");
                self.executions.write().await.remove(&id);
                Err(e.to_string())
            }
        };
        let result = outcome.unwrap_or_else(|message| {
            ExecutionResult::failed(
                id,
                Diagnostic::runtime("InternalError", message),
                state.elapsed().as_millis() as u64,
            )
        });

        state.finish(&result);
        match state.status {
            ExecutionStatus::Succeeded => tracing::info!(
                execution_id = %id,
                duration_ms = result.duration_ms,
                operations = result.operations,
                "Script succeeded"
            ),
            status => tracing::warn!(
                execution_id = %id,
                ?status,
                kind = ?state.error_kind,
                duration_ms = result.duration_ms,
                "Script failed"
            ),
        }
        result
    }

    /// Execute a decoded wire request
    pub async fn handle(&self, request: ScriptRequest) -> ScriptResponse {
        self.execute(request.into()).await.into_response()
    }

    /// Decode and execute a raw request body.
    ///
    /// Malformed bodies are answered directly; the engine is not invoked.
    pub async fn handle_body(&self, body: &[u8]) -> ScriptResponse {
        match decode_request(body) {
            Ok(request) => self.handle(request).await,
            Err(diagnostic) => self.reject(diagnostic),
        }
    }

    /// Decode and execute an already parsed request body
    pub async fn handle_value(&self, body: &Value) -> ScriptResponse {
        match decode_value(body) {
            Ok(request) => self.handle(request).await,
            Err(diagnostic) => self.reject(diagnostic),
        }
    }

    fn reject(&self, diagnostic: Diagnostic) -> ScriptResponse {
        tracing::warn!(message = diagnostic.message(), "Rejected malformed request");
        ScriptResponse::rejected(diagnostic)
    }

    /// Executions still running
    pub async fn in_flight(&self) -> Vec<ExecutionState> {
        self.executions.read().await.values().cloned().collect()
    }

    pub fn service_info(&self) -> &ServiceInfo {
        &self.info
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn limits(&self) -> &ResourceLimits {
        &self.limits
    }

    /// Get the runtime name
    pub fn runtime_name(&self) -> &str {
        self.runtime.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{AllowList, SymbolGroup};
    use crate::Result;
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use logicbox_common::DiagnosticKind;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn service() -> SandboxService {
        SandboxService::from_config(&SandboxConfig::default()).unwrap()
    }

    /// Counts invocations instead of running anything
    #[derive(Default)]
    struct CountingRuntime {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Runtime for CountingRuntime {
        async fn execute(&self, request: ExecutionRequest) -> Result<ExecutionResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ExecutionResult {
                id: request.id,
                outcome: Ok(json!(null)),
                stdout: String::new(),
                duration_ms: 0,
                operations: 0,
                timed_out: false,
            })
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    struct BrokenRuntime;

    #[async_trait]
    impl Runtime for BrokenRuntime {
        async fn execute(&self, _request: ExecutionRequest) -> Result<ExecutionResult> {
            anyhow::bail!("no threads left")
        }

        fn name(&self) -> &str {
            "broken"
        }
    }

    /// Answers after a fixed delay
    struct SlowRuntime(Duration);

    #[async_trait]
    impl Runtime for SlowRuntime {
        async fn execute(&self, request: ExecutionRequest) -> Result<ExecutionResult> {
            tokio::time::sleep(self.0).await;
            Ok(ExecutionResult {
                id: request.id,
                outcome: Ok(json!(null)),
                stdout: String::new(),
                duration_ms: self.0.as_millis() as u64,
                operations: 0,
                timed_out: false,
            })
        }

        fn name(&self) -> &str {
            "slow"
        }
    }

    #[tokio::test]
    async fn test_handle_body_success() {
        let response = service().handle_body(br#"{"expr": "1 + 2"}"#).await;
        assert_eq!(response.result(), Some(&json!(3)));
    }

    #[tokio::test]
    async fn test_code_alias_accepted() {
        let response = service()
            .handle_value(&json!({"code": "x = 5\nx * 2"}))
            .await;
        assert_eq!(response.result(), Some(&json!(10)));
    }

    #[tokio::test]
    async fn test_malformed_request_skips_runtime() {
        let calls = Arc::new(AtomicUsize::new(0));
        let service = SandboxService::new(
            CountingRuntime {
                calls: Arc::clone(&calls),
            },
            Arc::new(AllowList::default().resolve().unwrap()),
            ResourceLimits::default(),
        );

        for body in [&br#"{}"#[..], b"not json", br#"{"expr": ""}"#, br#"{"expr": 5}"#] {
            let response = service.handle_body(body).await;
            assert_eq!(response.error_kind(), Some(DiagnosticKind::MalformedInput));
            assert_matches!(response, ScriptResponse::Failed { execution_id: None, .. });
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        service.handle_body(br#"{"expr": "1"}"#).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_runtime_error_becomes_diagnostic() {
        let service = SandboxService::new(
            BrokenRuntime,
            Arc::new(AllowList::default().resolve().unwrap()),
            ResourceLimits::default(),
        );
        let response = service.handle(ScriptRequest::new("1")).await;
        assert_matches!(
            response.error(),
            Some(Diagnostic::RuntimeFault { error_type, .. }) if error_type == "InternalError"
        );
        assert!(service.in_flight().await.is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_caller_leaves_no_in_flight_entry() {
        let service = Arc::new(SandboxService::new(
            SlowRuntime(Duration::from_millis(200)),
            Arc::new(AllowList::default().resolve().unwrap()),
            ResourceLimits::default(),
        ));
        let caller = {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.execute(ExecutionRequest::new("1")).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(service.in_flight().await.len(), 1);

        caller.abort();
        assert!(caller.await.unwrap_err().is_cancelled());
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(service.in_flight().await.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_requests_are_isolated() {
        let service = Arc::new(service());
        let mut handles = Vec::new();
        for i in 0..8 {
            let service = Arc::clone(&service);
            handles.push(tokio::spawn(async move {
                let script = format!("x = {}\nprint(x)\nx * 10", i);
                service.handle(ScriptRequest::new(script)).await
            }));
        }
        for (i, handle) in handles.into_iter().enumerate() {
            let response = handle.await.unwrap();
            assert_eq!(response.result(), Some(&json!(i as i64 * 10)));
            assert_eq!(response.stdout(), format!("{}\n", i));
        }
        assert!(service.in_flight().await.is_empty());
    }

    #[test]
    fn test_invalid_allow_list_is_startup_error() {
        let mut config = SandboxConfig::default();
        config.symbols = AllowList::groups([SymbolGroup::Utilities]).including("eval");
        assert!(SandboxService::from_config(&config).is_err());
    }

    #[test]
    fn test_service_info_lists_resolved_symbols() {
        let mut config = SandboxConfig::default();
        config.symbols = AllowList::groups([SymbolGroup::Logic]);
        let service = SandboxService::from_config(&config).unwrap();
        let info = service.service_info();
        assert_eq!(info.symbols.len(), service.symbols().len());
        assert!(info.symbols.iter().any(|s| s.name == "make_kb"));
        assert!(!info.symbols.iter().any(|s| s.name == "print"));
        assert_eq!(service.runtime_name(), "interpreter");
    }
}
