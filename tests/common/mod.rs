//! Common test utilities shared across integration and E2E tests

pub mod test_server;

pub use test_server::*;

use logicbox_common::ScriptResponse;
use logicbox_sandbox::{AllowList, Engine, ResourceLimits, SandboxConfig, SandboxService};
use std::sync::Arc;

/// Setup logging for tests
pub fn setup_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("logicbox_sandbox=debug,logicbox_transport=debug")
        .with_test_writer()
        .try_init();
}

/// Service over the default configuration
pub fn test_service() -> Arc<SandboxService> {
    Arc::new(SandboxService::from_config(&SandboxConfig::default()).expect("default allow-list resolves"))
}

/// Service with custom limits and the full allow-list
pub fn test_service_with_limits(limits: ResourceLimits) -> Arc<SandboxService> {
    let config = SandboxConfig {
        limits,
        ..SandboxConfig::default()
    };
    Arc::new(SandboxService::from_config(&config).expect("default allow-list resolves"))
}

/// Synchronous engine over the full allow-list
pub fn test_engine() -> Engine {
    let symbols = AllowList::default()
        .resolve()
        .expect("default allow-list resolves");
    Engine::new(Arc::new(symbols), ResourceLimits::default())
}

/// Run `script` through the service and return the response
pub async fn run_script(service: &SandboxService, script: &str) -> ScriptResponse {
    service
        .handle_value(&serde_json::json!({ "expr": script }))
        .await
}
