//! Maps engine failures onto the closed diagnostic taxonomy

use crate::error::{EvalError, SyntaxError};
use crate::splitter::SourceLine;
use logicbox_common::Diagnostic;

/// Remediation offered when no similarly named symbol exists
pub const GENERIC_SUGGESTION: &str = "Check if all variables and functions are defined";

/// Largest edit distance at which a known name is offered as a correction
const MAX_SUGGESTION_DISTANCE: usize = 2;

/// Turn a failure into exactly one diagnostic.
///
/// `line` is the statement that was running, when known. `known_names` are the
/// names visible at the point of failure and feed the "did you mean" hint.
pub fn classify<'a>(
    error: EvalError,
    line: Option<&SourceLine>,
    known_names: impl IntoIterator<Item = &'a str>,
) -> Diagnostic {
    match error {
        EvalError::Syntax(err) => syntax_fault(err),
        EvalError::Unresolved { name } => {
            let suggestion = match closest_name(&name, known_names) {
                Some(candidate) => format!("Did you mean '{}'?", candidate),
                None => GENERIC_SUGGESTION.to_string(),
            };
            Diagnostic::UnresolvedSymbol {
                message: format!("name '{}' is not defined", name),
                symbol: name,
                suggestion,
            }
        }
        EvalError::Runtime {
            error_type,
            message,
        } => {
            let mut trace = Vec::new();
            if let Some(line) = line {
                trace.push(format!("line {}: {}", line.number, line.text));
            }
            trace.push(format!("{}: {}", error_type, message));
            Diagnostic::RuntimeFault {
                message,
                error_type: error_type.to_string(),
                trace,
            }
        }
    }
}

pub fn syntax_fault(err: SyntaxError) -> Diagnostic {
    Diagnostic::SyntaxFault {
        message: err.message,
        line: Some(err.line),
        column: Some(err.column),
        text: Some(err.text),
    }
}

fn closest_name<'a>(
    name: &str,
    candidates: impl IntoIterator<Item = &'a str>,
) -> Option<&'a str> {
    candidates
        .into_iter()
        .filter(|candidate| *candidate != name)
        .map(|candidate| (edit_distance(name, candidate), candidate))
        .filter(|(distance, _)| *distance <= MAX_SUGGESTION_DISTANCE)
        .min()
        .map(|(_, candidate)| candidate)
}

/// Levenshtein distance over characters
fn edit_distance(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0; b_chars.len() + 1];
    for (i, a_char) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, b_char) in b_chars.iter().enumerate() {
            let cost = usize::from(a_char != *b_char);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b_chars.len()]
}
