//! Allow-list policy: which registry symbols an environment exposes

use crate::builtins::{registry, Builtin};
use logicbox_common::SymbolInfo;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use thiserror::Error;

/// Families of allow-listed symbols
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolGroup {
    /// Expressions, knowledge bases and chaining
    Logic,
    /// Propositional satisfiability and entailment procedures
    Solvers,
    /// Length, conversions and iteration helpers
    Utilities,
    /// `print` into the invocation's stdout buffer
    Output,
}

impl SymbolGroup {
    pub const ALL: [SymbolGroup; 4] = [
        SymbolGroup::Logic,
        SymbolGroup::Solvers,
        SymbolGroup::Utilities,
        SymbolGroup::Output,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolGroup::Logic => "logic",
            SymbolGroup::Solvers => "solvers",
            SymbolGroup::Utilities => "utilities",
            SymbolGroup::Output => "output",
        }
    }
}

impl fmt::Display for SymbolGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Startup-time allow-list errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PolicyError {
    #[error("unknown symbol '{0}' in allow-list")]
    UnknownSymbol(String),

    #[error("symbol '{0}' is listed more than once")]
    DuplicateSymbol(String),

    #[error("symbol '{0}' is both included and excluded")]
    Conflicting(String),
}

/// Allow-list as written in configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllowList {
    /// Whole groups to expose
    pub groups: Vec<SymbolGroup>,

    /// Individual symbols added on top of the groups
    pub include: Vec<String>,

    /// Individual symbols removed from the result
    pub exclude: Vec<String>,
}

impl Default for AllowList {
    fn default() -> Self {
        Self {
            groups: SymbolGroup::ALL.to_vec(),
            include: Vec::new(),
            exclude: Vec::new(),
        }
    }
}

impl AllowList {
    /// Only the listed groups
    pub fn groups(groups: impl IntoIterator<Item = SymbolGroup>) -> Self {
        Self {
            groups: groups.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn including(mut self, name: impl Into<String>) -> Self {
        self.include.push(name.into());
        self
    }

    pub fn excluding(mut self, name: impl Into<String>) -> Self {
        self.exclude.push(name.into());
        self
    }

    /// Resolve against the static registry into an immutable symbol table
    pub fn resolve(&self) -> Result<SymbolTable, PolicyError> {
        let mut by_name: BTreeMap<&'static str, &'static Builtin> = BTreeMap::new();
        for builtin in registry() {
            if by_name.insert(builtin.name, builtin).is_some() {
                return Err(PolicyError::DuplicateSymbol(builtin.name.to_string()));
            }
        }

        check_unique(&self.include)?;
        check_unique(&self.exclude)?;
        if let Some(name) = self.include.iter().find(|n| self.exclude.contains(n)) {
            return Err(PolicyError::Conflicting(name.clone()));
        }

        let groups: BTreeSet<SymbolGroup> = self.groups.iter().copied().collect();
        let mut entries: BTreeMap<&'static str, &'static Builtin> = by_name
            .iter()
            .filter(|(_, b)| groups.contains(&b.group))
            .map(|(name, b)| (*name, *b))
            .collect();

        for name in &self.include {
            let builtin = by_name
                .get(name.as_str())
                .copied()
                .ok_or_else(|| PolicyError::UnknownSymbol(name.clone()))?;
            entries.insert(builtin.name, builtin);
        }
        for name in &self.exclude {
            if !by_name.contains_key(name.as_str()) {
                return Err(PolicyError::UnknownSymbol(name.clone()));
            }
            entries.remove(name.as_str());
        }

        Ok(SymbolTable { entries })
    }
}

fn check_unique(names: &[String]) -> Result<(), PolicyError> {
    let mut seen = BTreeSet::new();
    for name in names {
        if !seen.insert(name.as_str()) {
            return Err(PolicyError::DuplicateSymbol(name.clone()));
        }
    }
    Ok(())
}

/// Resolved allow-list. Built once at startup and shared read-only.
#[derive(Debug, Clone)]
pub struct SymbolTable {
    entries: BTreeMap<&'static str, &'static Builtin>,
}

impl SymbolTable {
    pub fn get(&self, name: &str) -> Option<&'static Builtin> {
        self.entries.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Advertised form, grouped then alphabetical
    pub fn describe(&self) -> Vec<SymbolInfo> {
        let mut symbols: Vec<&Builtin> = self.entries.values().copied().collect();
        symbols.sort_by_key(|b| (b.group, b.name));
        symbols
            .into_iter()
            .map(|b| SymbolInfo {
                name: b.name.to_string(),
                group: b.group.to_string(),
                summary: b.summary.to_string(),
            })
            .collect()
    }
}
