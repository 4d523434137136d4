//! Conjunctive normal form conversion

use crate::budget::Budget;
use crate::error::LogicResult;
use crate::expr::{Expr, AND, IFF, IMPLIES, NOT, OR, REVERSE_IMPLIES, XOR};

/// Convert a propositional sentence to conjunctive normal form
pub fn to_cnf(sentence: &Expr, budget: &mut Budget) -> LogicResult<Expr> {
    let s = eliminate_implications(sentence);
    let s = move_not_inwards(&s);
    distribute_and_over_or(&s, budget)
}

fn eliminate_implications(s: &Expr) -> Expr {
    if s.args().is_empty() || s.is_atom() {
        return s.clone();
    }
    let args: Vec<Expr> = s.args().iter().map(eliminate_implications).collect();
    let a = args[0].clone();
    let b = args[args.len() - 1].clone();
    match s.op() {
        IMPLIES => b.or(a.negate()),
        REVERSE_IMPLIES => a.or(b.negate()),
        IFF => a.clone().or(b.clone().negate()).and(b.or(a.negate())),
        XOR => a.clone().and(b.clone().negate()).or(a.negate().and(b)),
        op => Expr::new(op, args),
    }
}

fn move_not_inwards(s: &Expr) -> Expr {
    if s.op() == NOT {
        let a = &s.args()[0];
        return match a.op() {
            NOT => move_not_inwards(&a.args()[0]),
            AND => associate(
                OR,
                a.args()
                    .iter()
                    .map(|arg| move_not_inwards(&arg.clone().negate()))
                    .collect(),
            ),
            OR => associate(
                AND,
                a.args()
                    .iter()
                    .map(|arg| move_not_inwards(&arg.clone().negate()))
                    .collect(),
            ),
            _ => match a.truth_value() {
                Some(value) => Expr::truth(!value),
                None => s.clone(),
            },
        };
    }
    if s.is_atom() || s.args().is_empty() {
        return s.clone();
    }
    Expr::new(s.op(), s.args().iter().map(move_not_inwards).collect())
}

fn distribute_and_over_or(s: &Expr, budget: &mut Budget) -> LogicResult<Expr> {
    budget.tick()?;
    match s.op() {
        OR => {
            let s = associate(OR, s.args().to_vec());
            if s.op() != OR {
                return distribute_and_over_or(&s, budget);
            }
            let Some(conj) = s.args().iter().find(|arg| arg.op() == AND).cloned() else {
                return Ok(s);
            };
            let others: Vec<Expr> = s.args().iter().filter(|arg| **arg != conj).cloned().collect();
            let rest = associate(OR, others);
            let mut distributed = Vec::with_capacity(conj.args().len());
            for c in conj.args() {
                distributed.push(distribute_and_over_or(&c.clone().or(rest.clone()), budget)?);
            }
            Ok(associate(AND, distributed))
        }
        AND => {
            let mut parts = Vec::with_capacity(s.args().len());
            for arg in s.args() {
                parts.push(distribute_and_over_or(arg, budget)?);
            }
            Ok(associate(AND, parts))
        }
        _ => Ok(s.clone()),
    }
}

/// Join `args` with `op`, flattening nested uses of the same operator.
/// An empty conjunction is `True`, an empty disjunction `False`.
pub fn associate(op: &str, args: Vec<Expr>) -> Expr {
    let mut flat = dissociate(op, &args);
    match flat.len() {
        0 => Expr::truth(op == AND),
        1 => flat.remove(0),
        _ => Expr::new(op, flat),
    }
}

fn dissociate(op: &str, args: &[Expr]) -> Vec<Expr> {
    let mut result = Vec::new();
    fn collect(op: &str, items: &[Expr], result: &mut Vec<Expr>) {
        for item in items {
            if item.op() == op {
                collect(op, item.args(), result);
            } else {
                result.push(item.clone());
            }
        }
    }
    collect(op, args, &mut result);
    result
}

/// Top-level conjuncts of a sentence
pub fn conjuncts(s: &Expr) -> Vec<Expr> {
    dissociate(AND, std::slice::from_ref(s))
}

/// Top-level disjuncts of a sentence
pub fn disjuncts(s: &Expr) -> Vec<Expr> {
    dissociate(OR, std::slice::from_ref(s))
}
