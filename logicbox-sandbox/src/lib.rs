//! logicbox sandbox - allow-listed script execution
//!
//! Runs short scripts against a fixed, configuration-defined set of logic
//! toolkit symbols. Scripts are parsed by a restricted interpreter; nothing
//! outside the allow-list is reachable.

mod ast;
mod builtins;
mod classifier;
mod config;
mod engine;
mod environment;
mod error;
mod execution;
mod interpreter;
mod lexer;
mod limits;
mod methods;
mod operators;
mod parser;
mod policy;
mod runtime;
mod serializer;
mod service;
mod splitter;
mod types;
mod value;

pub use classifier::{classify, GENERIC_SUGGESTION};
pub use config::{ConfigError, SandboxConfig, ServerConfig};
pub use engine::{Engine, Outcome};
pub use environment::Environment;
pub use error::{EvalError, SyntaxError};
pub use execution::{ExecutionState, ExecutionStatus};
pub use limits::ResourceLimits;
pub use policy::{AllowList, PolicyError, SymbolGroup, SymbolTable};
pub use runtime::{InterpreterRuntime, Runtime, INTERPRETER_STACK_SIZE};
pub use serializer::serialize;
pub use service::SandboxService;
pub use splitter::{split, SourceLine, SplitScript};
pub use types::{ExecutionRequest, ExecutionResult};
pub use value::Value;

/// Re-export common error types
pub type Result<T> = anyhow::Result<T>;
