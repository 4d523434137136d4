//! Classified failures returned in place of a result

use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed taxonomy of invocation failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticKind {
    MalformedInput,
    SyntaxFault,
    UnresolvedSymbol,
    RuntimeFault,
}

impl DiagnosticKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticKind::MalformedInput => "MalformedInput",
            DiagnosticKind::SyntaxFault => "SyntaxFault",
            DiagnosticKind::UnresolvedSymbol => "UnresolvedSymbol",
            DiagnosticKind::RuntimeFault => "RuntimeFault",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failure with its kind-specific payload.
///
/// Serialised with a `kind` tag, e.g.
/// `{"kind":"SyntaxFault","message":"...","line":1,"column":7}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Diagnostic {
    /// The request could not be decoded into a script
    MalformedInput { message: String },

    /// The script text is not valid statements or expression
    SyntaxFault {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        line: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        column: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
    },

    /// A name resolved neither in the bindings nor the environment
    UnresolvedSymbol {
        message: String,
        symbol: String,
        suggestion: String,
    },

    /// Anything else that failed while running the script.
    ///
    /// `trace` is informational only.
    RuntimeFault {
        message: String,
        error_type: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        trace: Vec<String>,
    },
}

impl Diagnostic {
    pub fn malformed(message: impl Into<String>) -> Self {
        Diagnostic::MalformedInput {
            message: message.into(),
        }
    }

    pub fn runtime(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Diagnostic::RuntimeFault {
            message: message.into(),
            error_type: error_type.into(),
            trace: Vec::new(),
        }
    }

    pub fn kind(&self) -> DiagnosticKind {
        match self {
            Diagnostic::MalformedInput { .. } => DiagnosticKind::MalformedInput,
            Diagnostic::SyntaxFault { .. } => DiagnosticKind::SyntaxFault,
            Diagnostic::UnresolvedSymbol { .. } => DiagnosticKind::UnresolvedSymbol,
            Diagnostic::RuntimeFault { .. } => DiagnosticKind::RuntimeFault,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Diagnostic::MalformedInput { message }
            | Diagnostic::SyntaxFault { message, .. }
            | Diagnostic::UnresolvedSymbol { message, .. }
            | Diagnostic::RuntimeFault { message, .. } => message,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::SyntaxFault {
                message,
                line: Some(line),
                column,
                ..
            } => {
                write!(f, "SyntaxFault: {} (line {}", message, line)?;
                if let Some(column) = column {
                    write!(f, ", column {}", column)?;
                }
                f.write_str(")")
            }
            Diagnostic::UnresolvedSymbol {
                message,
                suggestion,
                ..
            } => write!(f, "UnresolvedSymbol: {}. {}", message, suggestion),
            other => write!(f, "{}: {}", other.kind(), other.message()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_syntax_fault_wire_shape() {
        let d = Diagnostic::SyntaxFault {
            message: "invalid syntax".into(),
            line: Some(1),
            column: Some(7),
            text: None,
        };
        assert_eq!(
            serde_json::to_value(&d).unwrap(),
            json!({"kind": "SyntaxFault", "message": "invalid syntax", "line": 1, "column": 7})
        );
        assert_eq!(d.to_string(), "SyntaxFault: invalid syntax (line 1, column 7)");
    }

    #[test]
    fn test_runtime_fault_omits_empty_trace() {
        let d = Diagnostic::runtime("ZeroDivisionError", "division by zero");
        assert_eq!(
            serde_json::to_value(&d).unwrap(),
            json!({"kind": "RuntimeFault", "message": "division by zero", "error_type": "ZeroDivisionError"})
        );
        assert_eq!(d.kind(), DiagnosticKind::RuntimeFault);
    }

    #[test]
    fn test_diagnostic_round_trips_through_json() {
        let d = Diagnostic::UnresolvedSymbol {
            message: "name 'fol_fc' is not defined".into(),
            symbol: "fol_fc".into(),
            suggestion: "did you mean 'fol_fc_ask'?".into(),
        };
        let text = serde_json::to_string(&d).unwrap();
        let back: Diagnostic = serde_json::from_str(&text).unwrap();
        assert_eq!(back, d);
    }
}
