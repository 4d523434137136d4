use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for one script invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExecutionId(pub uuid::Uuid);

impl ExecutionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for ExecutionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One allow-listed symbol as advertised to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolInfo {
    pub name: String,
    pub group: String,
    pub summary: String,
}

/// Service description returned by the info endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub name: String,
    pub version: String,
    pub description: String,
    pub symbols: Vec<SymbolInfo>,
    pub examples: Vec<String>,
    pub started_at: DateTime<Utc>,
}

impl ServiceInfo {
    pub fn new(symbols: Vec<SymbolInfo>) -> Self {
        Self {
            name: "logicbox".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            description: "Sandboxed first-order logic script execution".to_string(),
            symbols,
            examples: default_examples(),
            started_at: Utc::now(),
        }
    }
}

fn default_examples() -> Vec<String> {
    [
        "1 + 2",
        "expr('Fever(x) & Cough(x) ==> HasFlu(x)')",
        "kb = FolKB()\nkb.tell(expr('Fever(Ahmad)'))\nkb.tell(expr('Cough(Ahmad)'))\nkb.tell(expr('Fever(x) & Cough(x) ==> HasFlu(x)'))\nlist(fol_fc_ask(kb, expr('HasFlu(x)')))",
        "kb = make_kb()\nassert_fact(kb, 'P')\nquery(kb, 'P')",
        "dpll_satisfiable(expr('A & ~B'))",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_id_serializes_as_uuid_text() {
        let id = ExecutionId::new();
        let json = serde_json::to_value(id).unwrap();
        assert_eq!(json, serde_json::Value::String(id.to_string()));
    }

    #[test]
    fn test_service_info_lists_examples() {
        let info = ServiceInfo::new(Vec::new());
        assert_eq!(info.name, "logicbox");
        assert!(info.examples.iter().any(|e| e.contains("make_kb")));
    }
}
