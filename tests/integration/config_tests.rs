//! Configuration files shaping the service

use logicbox_common::{Diagnostic, DiagnosticKind};
use logicbox_sandbox::{SandboxConfig, SandboxService, SymbolGroup};
use logicbox_tests::common::run_script;
use std::time::Duration;

#[tokio::test]
async fn test_config_file_restricts_symbols() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[limits]
max_duration = "2s"
max_operations = 50000

[symbols]
groups = ["logic", "utilities"]
exclude = ["to_cnf"]
"#,
    )
    .unwrap();

    let config = SandboxConfig::load_from(&path).unwrap();
    assert_eq!(config.limits.max_duration, Some(Duration::from_secs(2)));
    assert_eq!(config.symbols.groups, vec![SymbolGroup::Logic, SymbolGroup::Utilities]);

    let service = SandboxService::from_config(&config).unwrap();
    assert!(!service.symbols().contains("print"));
    assert!(!service.symbols().contains("to_cnf"));

    let response = run_script(&service, "print('hi')").await;
    assert_eq!(response.error_kind(), Some(DiagnosticKind::UnresolvedSymbol));

    let response = run_script(&service, "sum([i for i in range(100000)])").await;
    assert!(matches!(
        response.error(),
        Some(Diagnostic::RuntimeFault { error_type, .. }) if error_type == "ResourceLimitError"
    ));
}

#[test]
fn test_unknown_symbol_in_config_fails_startup() {
    let config = SandboxConfig::from_toml("[symbols]\ninclude = [\"system\"]\n").unwrap();
    assert!(SandboxService::from_config(&config).is_err());
}

#[test]
fn test_saved_defaults_load_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");
    SandboxConfig::default().save_to(&path).unwrap();
    assert_eq!(SandboxConfig::load_from(&path).unwrap(), SandboxConfig::default());
}
