//! Synchronous execution engine: one script in, one result or diagnostic out

use crate::classifier::classify;
use crate::environment::Environment;
use crate::error::EvalError;
use crate::interpreter::Interpreter;
use crate::limits::ResourceLimits;
use crate::parser::{parse_expression, parse_statements};
use crate::policy::SymbolTable;
use crate::serializer::serialize;
use crate::splitter::{split, SourceLine, SplitScript};
use logicbox_common::Diagnostic;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error};

/// What one invocation produced
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub result: Result<serde_json::Value, Diagnostic>,
    /// Text written by `print`, kept on both paths
    pub stdout: String,
    /// Interpreter operations consumed
    pub operations: u64,
}

/// Runs scripts against environments built from one shared allow-list.
///
/// The engine holds no per-invocation state; every call to [`Engine::run`]
/// builds its own Environment and Binding Set and drops both before returning.
#[derive(Debug, Clone)]
pub struct Engine {
    symbols: Arc<SymbolTable>,
    limits: ResourceLimits,
}

impl Engine {
    pub fn new(symbols: Arc<SymbolTable>, limits: ResourceLimits) -> Self {
        Self { symbols, limits }
    }

    pub fn symbols(&self) -> &Arc<SymbolTable> {
        &self.symbols
    }

    pub fn limits(&self) -> &ResourceLimits {
        &self.limits
    }

    /// Run `script`, stopping with a `TimeoutError` once `deadline` passes.
    ///
    /// Never panics: a panic inside the interpreter becomes an `InternalError`
    /// runtime fault.
    pub fn run(&self, script: &str, deadline: Option<Instant>) -> Outcome {
        match panic::catch_unwind(AssertUnwindSafe(|| self.run_script(script, deadline))) {
            Ok(outcome) => outcome,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(%message, "interpreter panicked");
                Outcome {
                    result: Err(Diagnostic::runtime("InternalError", message)),
                    stdout: String::new(),
                    operations: 0,
                }
            }
        }
    }

    fn run_script(&self, script: &str, deadline: Option<Instant>) -> Outcome {
        let script = split(script);
        debug!(
            preparatory = script.preparatory.len(),
            trailing_len = script.trailing.text.len(),
            "script split"
        );
        let env = Environment::build(self.symbols.clone());
        let mut interp = Interpreter::new(&env, &self.limits, deadline);

        let result = match evaluate_script(&mut interp, &script) {
            Ok(value) => Ok(serialize(&value)),
            Err((err, line)) => {
                let mut known: Vec<&str> = interp.binding_names().collect();
                for name in env.names() {
                    known.push(name);
                }
                Err(classify(err, line, known))
            }
        };
        Outcome {
            result,
            stdout: interp.take_stdout(),
            operations: interp.operations(),
        }
    }
}

/// Run the preparatory lines in order, then evaluate the trailing line.
///
/// A failure carries the line that was running.
fn evaluate_script<'s>(
    interp: &mut Interpreter<'_>,
    script: &'s SplitScript,
) -> Result<crate::value::Value, (EvalError, Option<&'s SourceLine>)> {
    for line in &script.preparatory {
        let at = |err: EvalError| (err, Some(line));
        interp.check_deadline().map_err(at)?;
        let statements = parse_statements(&line.text, line.number).map_err(|e| at(e.into()))?;
        for statement in &statements {
            interp.execute(statement).map_err(at)?;
        }
    }

    let line = &script.trailing;
    let at = |err: EvalError| (err, Some(line));
    interp.check_deadline().map_err(at)?;
    let expression = parse_expression(&line.text, line.number).map_err(|e| at(e.into()))?;
    interp.evaluate(&expression).map_err(at)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "interpreter panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::AllowList;
    use assert_matches::assert_matches;
    use logicbox_common::DiagnosticKind;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::time::Duration;

    fn engine() -> Engine {
        Engine::new(
            Arc::new(AllowList::default().resolve().unwrap()),
            ResourceLimits::default(),
        )
    }

    fn run(script: &str) -> Result<serde_json::Value, Diagnostic> {
        engine().run(script, None).result
    }

    #[test]
    fn test_simple_expression() {
        assert_eq!(run("1 + 2"), Ok(json!(3)));
    }

    #[test]
    fn test_huge_slice_steps_stop_at_the_end() {
        assert_eq!(run("[1, 2, 3, 4, 5][1::9223372036854775807]"), Ok(json!([2])));
        assert_eq!(run("'abcde'[3::-9223372036854775807]"), Ok(json!("d")));
    }

    #[test]
    fn test_bindings_reach_trailing_expression() {
        assert_eq!(run("x = 5\nx * 2"), Ok(json!(10)));
    }

    #[test]
    fn test_statements_run_in_source_order() {
        assert_eq!(
            run("log = []\nlog.append('a')\nlog.append('b')\nlog"),
            Ok(json!(["a", "b"]))
        );
        assert_matches!(
            run("y = x\nx = 1\ny"),
            Err(Diagnostic::UnresolvedSymbol { symbol, .. }) if symbol == "x"
        );
    }

    #[test]
    fn test_undefined_reference() {
        let err = run("undefined_name + 1").unwrap_err();
        assert_eq!(err.kind(), DiagnosticKind::UnresolvedSymbol);
    }

    #[test]
    fn test_malformed_script_has_position() {
        assert_matches!(
            run("def f(:"),
            Err(Diagnostic::SyntaxFault { line: Some(1), column: Some(_), .. })
        );
        assert_matches!(
            run("x = 1\ny = (2\ny"),
            Err(Diagnostic::SyntaxFault { line: Some(2), .. })
        );
    }

    #[test]
    fn test_assert_then_query() {
        assert_eq!(
            run("kb = make_kb()\nassert_fact(kb, \"P\")\nquery(kb, \"P\")"),
            Ok(json!(true))
        );
        assert_eq!(
            run("kb = make_kb(); assert_fact(kb, 'P')\nquery(kb, 'P')"),
            Ok(json!(true))
        );
    }

    #[test]
    fn test_separator_on_single_line_is_not_split() {
        assert_matches!(
            run("kb = make_kb(); assert_fact(kb, 'P'); query(kb, 'P')"),
            Err(Diagnostic::SyntaxFault { .. })
        );
    }

    #[test]
    fn test_trailing_assignment_is_rejected() {
        assert_matches!(run("x = 1\ny = x"), Err(Diagnostic::SyntaxFault { line: Some(2), .. }));
    }

    #[test]
    fn test_runtime_fault_stops_execution() {
        let outcome = engine().run("print('before')\n1 / 0\nprint('after')\n2", None);
        assert_matches!(
            &outcome.result,
            Err(Diagnostic::RuntimeFault { error_type, trace, .. })
                if error_type == "ZeroDivisionError" && trace[0] == "line 2: 1 / 0"
        );
        assert_eq!(outcome.stdout, "before\n");
    }

    #[test]
    fn test_results_are_repeatable() {
        let script = "kb = FolKB(['Fever(Ahmad)', 'Fever(x) ==> Sick(x)'])\nfol_bc_ask(kb, 'Sick(y)')";
        let engine = engine();
        let first = engine.run(script, None);
        let second = engine.run(script, None);
        assert_eq!(first, second);
        assert_eq!(first.result, Ok(json!(["{'y': Ahmad}"])));
    }

    #[test]
    fn test_bindings_do_not_leak_between_runs() {
        let engine = engine();
        assert_eq!(engine.run("secret = 42\nsecret", None).result, Ok(json!(42)));
        assert_matches!(
            engine.run("secret", None).result,
            Err(Diagnostic::UnresolvedSymbol { .. })
        );
    }

    #[test]
    fn test_deadline_is_a_runtime_fault() {
        let deadline = Instant::now() - Duration::from_millis(1);
        let outcome = engine().run("x = 1\nx", Some(deadline));
        assert_matches!(
            outcome.result,
            Err(Diagnostic::RuntimeFault { error_type, .. }) if error_type == "TimeoutError"
        );
    }

    #[test]
    fn test_operation_limit_is_a_runtime_fault() {
        let engine = Engine::new(
            Arc::new(AllowList::default().resolve().unwrap()),
            ResourceLimits {
                max_operations: 1_000,
                ..ResourceLimits::default()
            },
        );
        assert_matches!(
            engine.run("sum([i * i for i in range(10000)])", None).result,
            Err(Diagnostic::RuntimeFault { error_type, .. }) if error_type == "ResourceLimitError"
        );
    }

    #[test]
    fn test_symbols_outside_allow_list_are_unresolved() {
        let engine = Engine::new(
            Arc::new(AllowList::default().excluding("print").resolve().unwrap()),
            ResourceLimits::default(),
        );
        assert_matches!(
            engine.run("print(1)", None).result,
            Err(Diagnostic::UnresolvedSymbol { suggestion, .. }) if suggestion.contains("'int'")
        );
        assert_matches!(run("open('x')"), Err(Diagnostic::UnresolvedSymbol { .. }));
    }
}
