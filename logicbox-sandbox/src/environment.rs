//! Per-invocation namespace over the resolved allow-list

use crate::builtins::Builtin;
use crate::policy::SymbolTable;
use std::sync::Arc;

/// The names a script can reach without binding them itself.
///
/// Built fresh for every invocation from the shared, immutable symbol table.
/// Nothing a script does can add to or remove from it: assignments land in the
/// interpreter's Binding Set and merely shadow entries here.
#[derive(Debug, Clone)]
pub struct Environment {
    symbols: Arc<SymbolTable>,
}

impl Environment {
    pub fn build(symbols: Arc<SymbolTable>) -> Self {
        Self { symbols }
    }

    pub fn lookup(&self, name: &str) -> Option<&'static Builtin> {
        self.symbols.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.symbols.contains(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.symbols.names()
    }
}
