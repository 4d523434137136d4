//! Logic toolkit - expressions, knowledge bases and inference
//!
//! Provides the first-order and propositional primitives exposed to sandboxed
//! scripts: expression construction, unification, CNF conversion, definite
//! clause knowledge bases with forward/backward chaining, and SAT procedures.
//! Every search is bounded by a [`Budget`].

mod budget;
mod cnf;
mod error;
mod expr;
mod fol;
mod kb;
mod parser;
mod prop;
mod unify;

pub use budget::Budget;
pub use cnf::{associate, conjuncts, disjuncts, to_cnf};
pub use error::{LogicError, LogicResult};
pub use expr::{Expr, MAX_EXPR_DEPTH, AND, IFF, IMPLIES, NOT, OR, REVERSE_IMPLIES, XOR};
pub use fol::{fol_bc_ask, fol_fc_ask};
pub use kb::{is_definite_clause, parse_definite_clause, FolKb, PropKb};
pub use prop::{dpll_satisfiable, entails, pl_resolution, pl_true, tt_entails, walksat, Model};
pub use unify::{resolve_substitution, standardize_variables, subst, unify, Substitution};
