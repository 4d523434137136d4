use thiserror::Error;

/// Errors raised while building or reasoning over logic expressions
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LogicError {
    #[error("cannot parse logic expression at position {position}: {message}")]
    Parse { message: String, position: usize },

    #[error("not a definite clause: {0}")]
    NotDefiniteClause(String),

    #[error("not a propositional sentence: {0}")]
    NotPropositional(String),

    #[error("too many proposition symbols for truth-table enumeration ({count} > {max})")]
    TooManySymbols { count: usize, max: usize },

    #[error("inference step budget of {0} exhausted")]
    StepBudgetExhausted(u64),

    #[error("inference depth limit of {0} exceeded")]
    DepthExceeded(usize),

    #[error("logic expression nested {depth} levels deep (limit {max})")]
    TooDeep { depth: usize, max: usize },

    #[error("inference deadline exceeded")]
    DeadlineExceeded,
}

pub type LogicResult<T> = Result<T, LogicError>;
