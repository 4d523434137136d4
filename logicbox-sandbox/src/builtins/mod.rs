//! The static registry of allow-listed functions.
//!
//! Every symbol a script can reach by name lives in [`registry`]. The policy
//! layer selects a subset of it at startup; nothing is registered afterwards.

mod logic;
mod utilities;

pub(crate) use logic::{substitution_to_value, to_logic};

use crate::error::{EvalError, EvalResult};
use crate::interpreter::Interpreter;
use crate::policy::SymbolGroup;
use crate::value::Value;
use std::fmt;

/// Native implementation of a builtin
pub type BuiltinFn = fn(&mut Interpreter<'_>, CallArgs) -> EvalResult<Value>;

/// One allow-listed symbol
pub struct Builtin {
    pub name: &'static str,
    pub group: SymbolGroup,
    pub summary: &'static str,
    pub func: BuiltinFn,
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builtin")
            .field("name", &self.name)
            .field("group", &self.group)
            .finish()
    }
}

/// Arguments of one call
#[derive(Debug, Default)]
pub struct CallArgs {
    pub positional: Vec<Value>,
    pub keywords: Vec<(String, Value)>,
}

impl CallArgs {
    pub fn positional(values: Vec<Value>) -> Self {
        Self {
            positional: values,
            keywords: Vec::new(),
        }
    }

    /// Match arguments against positional-or-keyword `params`.
    ///
    /// The first `required` parameters must be supplied; absent optional ones
    /// come back as `None`.
    pub fn bind<const N: usize>(
        self,
        function: &str,
        params: [&str; N],
        required: usize,
    ) -> EvalResult<[Value; N]> {
        if self.positional.len() > N {
            return Err(EvalError::type_error(format!(
                "{}() takes at most {} argument{} ({} given)",
                function,
                N,
                if N == 1 { "" } else { "s" },
                self.positional.len()
            )));
        }
        let mut slots: [Option<Value>; N] = std::array::from_fn(|_| None);
        for (slot, value) in slots.iter_mut().zip(self.positional) {
            *slot = Some(value);
        }
        for (name, value) in self.keywords {
            let index = params.iter().position(|p| *p == name).ok_or_else(|| {
                EvalError::type_error(format!(
                    "{}() got an unexpected keyword argument '{}'",
                    function, name
                ))
            })?;
            if slots[index].is_some() {
                return Err(EvalError::type_error(format!(
                    "{}() got multiple values for argument '{}'",
                    function, name
                )));
            }
            slots[index] = Some(value);
        }
        if let Some(missing) = (0..required.min(N)).find(|&i| slots[i].is_none()) {
            return Err(EvalError::type_error(format!(
                "{}() missing required argument '{}'",
                function, params[missing]
            )));
        }
        Ok(slots.map(|slot| slot.unwrap_or(Value::None)))
    }

    /// Remove a keyword argument if present
    pub fn take_keyword(&mut self, name: &str) -> Option<Value> {
        let index = self.keywords.iter().position(|(k, _)| k == name)?;
        Some(self.keywords.remove(index).1)
    }

    /// Fail on any keyword argument not consumed yet
    pub fn reject_keywords(&self, function: &str) -> EvalResult<()> {
        match self.keywords.first() {
            Some((name, _)) => Err(EvalError::type_error(format!(
                "{}() got an unexpected keyword argument '{}'",
                function, name
            ))),
            None => Ok(()),
        }
    }
}

macro_rules! builtin {
    ($name:literal, $group:ident, $func:path, $summary:literal) => {
        Builtin {
            name: $name,
            group: SymbolGroup::$group,
            summary: $summary,
            func: $func,
        }
    };
}

static REGISTRY: &[Builtin] = &[
    // logic
    builtin!("expr", Logic, logic::expr, "Parse text such as 'P & Q ==> R' into a logic expression"),
    builtin!("FolKB", Logic, logic::fol_kb, "First-order knowledge base of definite clauses"),
    builtin!("PropKB", Logic, logic::prop_kb, "Propositional knowledge base in clausal form"),
    builtin!("fol_fc_ask", Logic, logic::fol_fc_ask, "Forward chaining: substitutions answering a query"),
    builtin!("fol_bc_ask", Logic, logic::fol_bc_ask, "Backward chaining: substitutions answering a query"),
    builtin!("pl_true", Logic, logic::pl_true, "Truth of a sentence in a model (None when undetermined)"),
    builtin!("unify", Logic, logic::unify, "Most general unifier of two expressions, or None"),
    builtin!("subst", Logic, logic::subst, "Apply a substitution to an expression"),
    builtin!("substitute", Logic, logic::substitute, "Apply bindings to an expression (expression first)"),
    builtin!("standardize_variables", Logic, logic::standardize_variables, "Rename variables apart"),
    builtin!("variables", Logic, logic::variables, "Set of variables occurring in an expression"),
    builtin!("to_cnf", Logic, logic::to_cnf, "Conjunctive normal form of a sentence"),
    builtin!("make_kb", Logic, logic::make_kb, "Create an empty first-order knowledge base"),
    builtin!("assert_fact", Logic, logic::assert_fact, "Tell a sentence to a knowledge base"),
    builtin!("query", Logic, logic::query, "Whether a knowledge base proves a query"),
    // solvers
    builtin!("dpll_satisfiable", Solvers, logic::dpll_satisfiable, "Satisfying model found by DPLL, or False"),
    builtin!("walksat", Solvers, logic::walksat, "Satisfying model found by local search, or None"),
    builtin!("pl_resolution", Solvers, logic::pl_resolution, "Entailment by propositional resolution"),
    builtin!("tt_entails", Solvers, logic::tt_entails, "Entailment by truth-table enumeration"),
    // utilities
    builtin!("len", Utilities, utilities::len, "Number of items in a collection or characters in text"),
    builtin!("str", Utilities, utilities::str, "Human-readable text of a value"),
    builtin!("repr", Utilities, utilities::repr, "Diagnostic text of a value"),
    builtin!("int", Utilities, utilities::int, "Convert to an integer"),
    builtin!("float", Utilities, utilities::float, "Convert to a float"),
    builtin!("bool", Utilities, utilities::bool, "Truth value of a value"),
    builtin!("list", Utilities, utilities::list, "New list from an iterable"),
    builtin!("tuple", Utilities, utilities::tuple, "New tuple from an iterable"),
    builtin!("dict", Utilities, utilities::dict, "New dict from pairs or keywords"),
    builtin!("set", Utilities, utilities::set, "New set from an iterable"),
    builtin!("range", Utilities, utilities::range, "List of integers in an arithmetic progression"),
    builtin!("enumerate", Utilities, utilities::enumerate, "List of (index, item) pairs"),
    builtin!("zip", Utilities, utilities::zip, "List of tuples taken pairwise from iterables"),
    builtin!("map", Utilities, utilities::map, "List of a function applied to each item"),
    builtin!("filter", Utilities, utilities::filter, "List of items for which a function is true"),
    builtin!("all", Utilities, utilities::all, "True when every item is true"),
    builtin!("any", Utilities, utilities::any, "True when some item is true"),
    builtin!("sum", Utilities, utilities::sum, "Sum of numbers"),
    builtin!("max", Utilities, utilities::max, "Largest item"),
    builtin!("min", Utilities, utilities::min, "Smallest item"),
    builtin!("abs", Utilities, utilities::abs, "Absolute value"),
    builtin!("round", Utilities, utilities::round, "Round to a number of digits"),
    builtin!("sorted", Utilities, utilities::sorted, "New sorted list"),
    builtin!("reversed", Utilities, utilities::reversed, "List of items in reverse order"),
    // output
    builtin!("print", Output, utilities::print, "Write text to the invocation's stdout buffer"),
];

/// Every symbol that can ever be allow-listed
pub fn registry() -> &'static [Builtin] {
    REGISTRY
}
