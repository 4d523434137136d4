//! Engine-internal failures, classified into diagnostics at the engine boundary

use logicbox_logic::LogicError;
use thiserror::Error;

/// A script line that could not be parsed
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message} (line {line}, column {column})")]
pub struct SyntaxError {
    pub message: String,
    /// 1-based line of the script
    pub line: usize,
    /// 1-based character column within the trimmed line
    pub column: usize,
    pub text: String,
}

impl SyntaxError {
    /// Error at byte `offset` of `text`
    pub fn at(message: impl Into<String>, text: &str, line: usize, offset: usize) -> Self {
        let offset = offset.min(text.len());
        let column = text
            .get(..offset)
            .map_or(offset, |prefix| prefix.chars().count())
            + 1;
        Self {
            message: message.into(),
            line,
            column,
            text: text.to_string(),
        }
    }
}

/// Failure while running a script
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error("name '{name}' is not defined")]
    Unresolved { name: String },

    #[error("{error_type}: {message}")]
    Runtime {
        error_type: &'static str,
        message: String,
    },
}

pub type EvalResult<T> = Result<T, EvalError>;

impl EvalError {
    pub fn runtime(error_type: &'static str, message: impl Into<String>) -> Self {
        EvalError::Runtime {
            error_type,
            message: message.into(),
        }
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::runtime("TypeError", message)
    }

    pub fn value_error(message: impl Into<String>) -> Self {
        Self::runtime("ValueError", message)
    }

    pub fn index_error(message: impl Into<String>) -> Self {
        Self::runtime("IndexError", message)
    }

    pub fn key_error(message: impl Into<String>) -> Self {
        Self::runtime("KeyError", message)
    }

    pub fn attribute_error(message: impl Into<String>) -> Self {
        Self::runtime("AttributeError", message)
    }

    pub fn zero_division(message: impl Into<String>) -> Self {
        Self::runtime("ZeroDivisionError", message)
    }

    pub fn overflow(message: impl Into<String>) -> Self {
        Self::runtime("OverflowError", message)
    }

    pub fn limit(message: impl Into<String>) -> Self {
        Self::runtime("ResourceLimitError", message)
    }

    pub fn timeout() -> Self {
        Self::runtime("TimeoutError", "execution time limit exceeded")
    }
}

impl From<LogicError> for EvalError {
    fn from(err: LogicError) -> Self {
        match err {
            LogicError::DeadlineExceeded => EvalError::timeout(),
            LogicError::StepBudgetExhausted(_)
            | LogicError::DepthExceeded(_)
            | LogicError::TooDeep { .. }
            | LogicError::TooManySymbols { .. } => EvalError::limit(err.to_string()),
            LogicError::Parse { .. }
            | LogicError::NotDefiniteClause(_)
            | LogicError::NotPropositional(_) => EvalError::value_error(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_counts_characters() {
        let err = SyntaxError::at("invalid syntax", "é = (", 2, 6);
        assert_eq!(err.line, 2);
        assert_eq!(err.column, 6);
    }

    #[test]
    fn test_logic_errors_map_to_runtime_kinds() {
        assert_eq!(
            EvalError::from(LogicError::DeadlineExceeded),
            EvalError::timeout()
        );
        match EvalError::from(LogicError::NotDefiniteClause("P | Q".into())) {
            EvalError::Runtime { error_type, .. } => assert_eq!(error_type, "ValueError"),
            other => panic!("unexpected {:?}", other),
        }
    }
}
