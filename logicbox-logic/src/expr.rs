//! Logic expressions: an operator applied to zero or more arguments

use crate::error::{LogicError, LogicResult};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

pub const AND: &str = "&";
pub const OR: &str = "|";
pub const NOT: &str = "~";
pub const XOR: &str = "^";
pub const IMPLIES: &str = "==>";
pub const REVERSE_IMPLIES: &str = "<==";
pub const IFF: &str = "<=>";

/// Deepest expression tree accepted from parsing or composition
pub const MAX_EXPR_DEPTH: usize = 2_000;

const TRUE_SYMBOL: &str = "True";
const FALSE_SYMBOL: &str = "False";

/// A logic sentence or term.
///
/// Symbols are expressions without arguments. A symbol whose name starts with
/// a lower-case letter is a variable; an upper-case initial marks a constant
/// or proposition symbol. Compound terms such as `Fever(x)` carry their
/// predicate or function name as the operator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Expr {
    op: Arc<str>,
    args: Vec<Expr>,
    depth: usize,
}

impl Expr {
    pub fn new(op: impl Into<Arc<str>>, args: Vec<Expr>) -> Self {
        let depth = 1 + args.iter().map(|arg| arg.depth).max().unwrap_or(0);
        Self {
            op: op.into(),
            args,
            depth,
        }
    }

    pub fn symbol(name: impl Into<Arc<str>>) -> Self {
        Self::new(name, Vec::new())
    }

    /// The constant sentences `True` and `False`
    pub fn truth(value: bool) -> Self {
        Self::symbol(if value { TRUE_SYMBOL } else { FALSE_SYMBOL })
    }

    pub fn parse(text: &str) -> LogicResult<Self> {
        crate::parser::parse(text)
    }

    pub fn op(&self) -> &str {
        &self.op
    }

    pub fn args(&self) -> &[Expr] {
        &self.args
    }

    /// Height of the expression tree; a symbol has depth 1
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Reject trees deeper than [`MAX_EXPR_DEPTH`]
    pub fn bounded(self) -> LogicResult<Self> {
        if self.depth > MAX_EXPR_DEPTH {
            return Err(LogicError::TooDeep {
                depth: self.depth,
                max: MAX_EXPR_DEPTH,
            });
        }
        Ok(self)
    }

    /// Truth value when this is the constant `True` or `False`
    pub fn truth_value(&self) -> Option<bool> {
        if !self.args.is_empty() {
            return None;
        }
        match &*self.op {
            TRUE_SYMBOL => Some(true),
            FALSE_SYMBOL => Some(false),
            _ => None,
        }
    }

    /// Operator is a name (predicate, function or symbol) rather than a connective
    pub fn is_atom(&self) -> bool {
        is_identifier(&self.op)
    }

    pub fn is_symbol(&self) -> bool {
        self.args.is_empty() && self.is_atom()
    }

    pub fn is_variable(&self) -> bool {
        self.args.is_empty() && self.op.chars().next().is_some_and(|c| c.is_lowercase())
    }

    /// Atom that may be assigned a truth value in a propositional model
    pub fn is_prop_atom(&self) -> bool {
        self.op.chars().next().is_some_and(|c| c.is_uppercase()) && self.truth_value().is_none()
    }

    pub fn negate(self) -> Expr {
        Expr::new(NOT, vec![self])
    }

    pub fn and(self, other: Expr) -> Expr {
        Expr::new(AND, vec![self, other])
    }

    pub fn or(self, other: Expr) -> Expr {
        Expr::new(OR, vec![self, other])
    }

    pub fn xor(self, other: Expr) -> Expr {
        Expr::new(XOR, vec![self, other])
    }

    pub fn implies(self, other: Expr) -> Expr {
        Expr::new(IMPLIES, vec![self, other])
    }

    pub fn reverse_implies(self, other: Expr) -> Expr {
        Expr::new(REVERSE_IMPLIES, vec![self, other])
    }

    /// Every variable occurring anywhere in the expression
    pub fn variables(&self) -> BTreeSet<Expr> {
        let mut found = BTreeSet::new();
        self.walk(&mut |e| {
            if e.is_variable() {
                found.insert(e.clone());
            }
        });
        found
    }

    /// Proposition atoms (upper-case symbols and predicate applications)
    pub fn prop_symbols(&self) -> BTreeSet<Expr> {
        let mut found = BTreeSet::new();
        collect_prop_symbols(self, &mut found);
        found
    }

    /// Upper-case argument-free symbols
    pub fn constant_symbols(&self) -> BTreeSet<Expr> {
        let mut found = BTreeSet::new();
        self.walk(&mut |e| {
            if e.args.is_empty() && e.is_prop_atom() {
                found.insert(e.clone());
            }
        });
        found
    }

    fn walk(&self, visit: &mut dyn FnMut(&Expr)) {
        visit(self);
        for arg in &self.args {
            arg.walk(visit);
        }
    }
}

fn collect_prop_symbols(e: &Expr, found: &mut BTreeSet<Expr>) {
    if e.is_prop_atom() {
        found.insert(e.clone());
    } else {
        for arg in &e.args {
            collect_prop_symbols(arg, found);
        }
    }
}

fn is_identifier(op: &str) -> bool {
    op.chars()
        .next()
        .is_some_and(|c| c.is_alphanumeric() || c == '_')
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.args.is_empty() {
            return f.write_str(&self.op);
        }
        if self.is_atom() {
            write!(f, "{}(", self.op)?;
            for (i, arg) in self.args.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{}", arg)?;
            }
            return f.write_str(")");
        }
        if self.args.len() == 1 {
            return write!(f, "{}{}", self.op, self.args[0]);
        }
        f.write_str("(")?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, " {} ", self.op)?;
            }
            write!(f, "{}", arg)?;
        }
        f.write_str(")")
    }
}

impl FromStr for Expr {
    type Err = crate::error::LogicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Expr::parse(s)
    }
}
