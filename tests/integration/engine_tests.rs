//! Engine behaviour observed through the public service API

use assert_matches::assert_matches;
use logicbox_common::{Diagnostic, DiagnosticKind, ScriptResponse};
use logicbox_sandbox::{split, GENERIC_SUGGESTION};
use logicbox_tests::common::{run_script, test_engine, test_service};
use pretty_assertions::assert_eq;
use serde_json::json;

#[tokio::test]
async fn test_simple_expression() {
    let response = run_script(&test_service(), "1 + 2").await;
    assert_eq!(response.result(), Some(&json!(3)));
}

#[tokio::test]
async fn test_compound_script() {
    let response = run_script(&test_service(), "x = 5\nx * 2").await;
    assert_eq!(response.result(), Some(&json!(10)));
}

#[tokio::test]
async fn test_undefined_reference() {
    let response = run_script(&test_service(), "undefined_name + 1").await;
    assert_matches!(
        response.error(),
        Some(Diagnostic::UnresolvedSymbol { symbol, suggestion, .. })
            if symbol == "undefined_name" && suggestion == GENERIC_SUGGESTION
    );
}

#[tokio::test]
async fn test_misspelled_symbol_gets_a_hint() {
    let response = run_script(&test_service(), "kb = make_kb()\nqeury(kb, 'P')").await;
    assert_matches!(
        response.error(),
        Some(Diagnostic::UnresolvedSymbol { suggestion, .. }) if suggestion == "Did you mean 'query'?"
    );
}

#[tokio::test]
async fn test_malformed_script() {
    let response = run_script(&test_service(), "def f(:").await;
    assert_matches!(
        response.error(),
        Some(Diagnostic::SyntaxFault { line: Some(1), column: Some(_), .. })
    );
}

#[tokio::test]
async fn test_assert_then_query() {
    let response = run_script(
        &test_service(),
        "kb = make_kb()\nassert_fact(kb, \"P\")\nquery(kb, \"P\")",
    )
    .await;
    assert_eq!(response.result(), Some(&json!(true)));

    let response = run_script(&test_service(), "kb = make_kb()\nquery(kb, 'P')").await;
    assert_eq!(response.result(), Some(&json!(false)));
}

#[tokio::test]
async fn test_missing_script_field_is_malformed() {
    let response = test_service().handle_value(&json!({"script": "1 + 2"})).await;
    assert_eq!(response.error_kind(), Some(DiagnosticKind::MalformedInput));
    assert_matches!(response, ScriptResponse::Failed { execution_id: None, .. });
}

#[tokio::test]
async fn test_single_line_separator_is_a_syntax_fault() {
    let response = run_script(
        &test_service(),
        "kb = make_kb(); assert_fact(kb, 'P'); query(kb, 'P')",
    )
    .await;
    assert_eq!(response.error_kind(), Some(DiagnosticKind::SyntaxFault));
}

#[test]
fn test_statement_sequence_shape() {
    let simple = split("  1 + 2  ");
    assert!(simple.preparatory.is_empty());
    assert_eq!(simple.trailing.text, "1 + 2");

    let compound = split("a = 1\n\n  b = a + 1\nc = b * 2\nc");
    assert_eq!(compound.preparatory.len(), 3);
    assert_eq!(
        compound.preparatory.iter().map(|l| l.number).collect::<Vec<_>>(),
        vec![1, 3, 4]
    );
    assert_eq!(compound.trailing.text, "c");
}

#[tokio::test]
async fn test_bindings_shadow_environment_per_invocation() {
    let service = test_service();
    let response = run_script(&service, "len = 3\nlen + 1").await;
    assert_eq!(response.result(), Some(&json!(4)));

    let response = run_script(&service, "len([1, 2])").await;
    assert_eq!(response.result(), Some(&json!(2)));
}

#[tokio::test]
async fn test_serializer_value_classes() {
    let service = test_service();
    let cases = [
        ("None", json!(null)),
        ("True", json!(true)),
        ("'text'", json!("text")),
        ("7 / 2", json!(3.5)),
        ("[1, (2, 3), []]", json!([1, [2, 3], []])),
        ("expr('P & Q')", json!("(P & Q)")),
        ("[expr('~P'), 'x']", json!(["~P", "x"])),
        ("{'a': 1}", json!("{'a': 1}")),
        ("make_kb()", json!("FolKB(0 clauses)")),
    ];
    for (script, expected) in cases {
        let response = run_script(&service, script).await;
        assert_eq!(response.result(), Some(&expected), "script: {}", script);
    }
}

#[tokio::test]
async fn test_stdout_survives_failure() {
    let response = run_script(&test_service(), "print('checking')\n1 / 0").await;
    assert_eq!(response.stdout(), "checking\n");
    assert_matches!(
        response.error(),
        Some(Diagnostic::RuntimeFault { error_type, .. }) if error_type == "ZeroDivisionError"
    );
}

#[test]
fn test_identical_scripts_give_identical_results() {
    let engine = test_engine();
    let script = "kb = FolKB()\nkb.tell(expr('Parent(Ann, Bob)'))\nkb.tell(expr('Parent(x, y) ==> Ancestor(x, y)'))\nsorted([str(a['who']) for a in fol_fc_ask(kb, expr('Ancestor(Ann, who)'))])";
    let first = engine.run(script, None);
    assert_eq!(first.result, Ok(json!(["Bob"])));
    for _ in 0..3 {
        assert_eq!(engine.run(script, None), first);
    }
}

#[tokio::test]
async fn test_no_reflection_escape() {
    let service = test_service();
    for script in [
        "import os",
        "__import__('os')",
        "open('/etc/passwd')",
        "eval('1')",
        "(1).__class__",
        "exec('x = 1')",
    ] {
        let response = run_script(&service, script).await;
        assert!(!response.is_success(), "script escaped: {}", script);
        assert_ne!(response.error_kind(), Some(DiagnosticKind::MalformedInput));
    }
}
