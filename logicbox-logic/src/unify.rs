//! Unification, substitution and standardising apart

use crate::budget::Budget;
use crate::error::{LogicError, LogicResult};
use crate::expr::{Expr, MAX_EXPR_DEPTH};
use std::collections::BTreeMap;

/// Variable bindings produced by unification
pub type Substitution = BTreeMap<Expr, Expr>;

/// Most general unifier of `x` and `y` extending `theta`, with occurs check
pub fn unify(x: &Expr, y: &Expr, theta: Substitution) -> Option<Substitution> {
    if x == y {
        return Some(theta);
    }
    if x.is_variable() {
        return unify_var(x, y, theta);
    }
    if y.is_variable() {
        return unify_var(y, x, theta);
    }
    if x.op() != y.op() || x.args().len() != y.args().len() {
        return None;
    }
    let mut theta = theta;
    for (a, b) in x.args().iter().zip(y.args()) {
        theta = unify(a, b, theta)?;
    }
    Some(theta)
}

fn unify_var(var: &Expr, x: &Expr, theta: Substitution) -> Option<Substitution> {
    if let Some(bound) = theta.get(var).cloned() {
        return unify(&bound, x, theta);
    }
    if x.is_variable() {
        if let Some(bound) = theta.get(x).cloned() {
            return unify(var, &bound, theta);
        }
    }
    if occurs(var, x, &theta) {
        return None;
    }
    let mut theta = theta;
    theta.insert(var.clone(), x.clone());
    Some(theta)
}

fn occurs(var: &Expr, x: &Expr, theta: &Substitution) -> bool {
    if var == x {
        return true;
    }
    if x.is_variable() {
        return theta.get(x).is_some_and(|bound| occurs(var, bound, theta));
    }
    x.args().iter().any(|arg| occurs(var, arg, theta))
}

/// Apply `theta` to `x`, following chains of variable bindings
pub fn subst(theta: &Substitution, x: &Expr) -> Expr {
    if x.is_variable() {
        return match theta.get(x) {
            Some(bound) => subst(theta, bound),
            None => x.clone(),
        };
    }
    if x.args().is_empty() {
        return x.clone();
    }
    Expr::new(x.op(), x.args().iter().map(|arg| subst(theta, arg)).collect())
}

/// Resolve every binding of an externally supplied substitution so that no
/// bound variable is left on a right-hand side.
///
/// Cyclic chains (`x: F(x)`) and explosive ones fail with
/// [`LogicError::TooDeep`] or an exhausted budget.
pub fn resolve_substitution(theta: &Substitution, budget: &mut Budget) -> LogicResult<Substitution> {
    theta
        .iter()
        .map(|(var, bound)| Ok((var.clone(), bounded_subst(theta, bound, budget, 1)?)))
        .collect()
}

fn bounded_subst(
    theta: &Substitution,
    x: &Expr,
    budget: &mut Budget,
    level: usize,
) -> LogicResult<Expr> {
    if level > MAX_EXPR_DEPTH {
        return Err(LogicError::TooDeep {
            depth: level,
            max: MAX_EXPR_DEPTH,
        });
    }
    budget.tick()?;
    if x.is_variable() {
        return match theta.get(x) {
            Some(bound) => bounded_subst(theta, bound, budget, level + 1),
            None => Ok(x.clone()),
        };
    }
    if x.args().is_empty() {
        return Ok(x.clone());
    }
    let args = x
        .args()
        .iter()
        .map(|arg| bounded_subst(theta, arg, budget, level + 1))
        .collect::<LogicResult<Vec<_>>>()?;
    Expr::new(x.op(), args).bounded()
}

/// Rename every variable in `sentence` to a fresh `v_N`, advancing `counter`
pub fn standardize_variables(sentence: &Expr, counter: &mut usize) -> Expr {
    let mut renamed = Substitution::new();
    rename(sentence, counter, &mut renamed)
}

fn rename(x: &Expr, counter: &mut usize, renamed: &mut Substitution) -> Expr {
    if x.is_variable() {
        if let Some(fresh) = renamed.get(x) {
            return fresh.clone();
        }
        let fresh = Expr::symbol(format!("v_{}", *counter));
        *counter += 1;
        renamed.insert(x.clone(), fresh.clone());
        return fresh;
    }
    if x.args().is_empty() {
        return x.clone();
    }
    Expr::new(
        x.op(),
        x.args().iter().map(|arg| rename(arg, counter, renamed)).collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn e(text: &str) -> Expr {
        Expr::parse(text).unwrap()
    }

    #[test]
    fn test_unify_binds_variables() {
        let theta = unify(&e("Knows(John, x)"), &e("Knows(y, Mother(y))"), Substitution::new())
            .unwrap();
        assert_eq!(subst(&theta, &e("x")).to_string(), "Mother(John)");
        assert_eq!(subst(&theta, &e("y")).to_string(), "John");
    }

    #[test]
    fn test_unify_fails_on_clash_and_occurs() {
        assert!(unify(&e("P(A)"), &e("P(B)"), Substitution::new()).is_none());
        assert!(unify(&e("x"), &e("F(x)"), Substitution::new()).is_none());
        assert!(unify(&e("P(x, y)"), &e("P(A)"), Substitution::new()).is_none());
    }

    #[test]
    fn test_resolve_substitution_flattens_chains() {
        let mut theta = Substitution::new();
        theta.insert(e("x"), e("F(y)"));
        theta.insert(e("y"), e("G(z)"));
        let resolved = resolve_substitution(&theta, &mut Budget::default()).unwrap();
        assert_eq!(resolved[&e("x")].to_string(), "F(G(z))");
        assert_eq!(resolved[&e("y")].to_string(), "G(z)");
    }

    #[test]
    fn test_resolve_substitution_rejects_cycles() {
        let mut theta = Substitution::new();
        theta.insert(e("x"), e("x"));
        assert!(matches!(
            resolve_substitution(&theta, &mut Budget::default()),
            Err(LogicError::TooDeep { .. })
        ));

        let mut theta = Substitution::new();
        theta.insert(e("x"), e("F(y)"));
        theta.insert(e("y"), e("G(x)"));
        assert!(resolve_substitution(&theta, &mut Budget::default()).is_err());
    }

    #[test]
    fn test_resolve_substitution_respects_budget() {
        let mut theta = Substitution::new();
        for i in 0..40 {
            theta.insert(e(&format!("x{}", i)), e(&format!("F(x{}, x{})", i + 1, i + 1)));
        }
        assert!(matches!(
            resolve_substitution(&theta, &mut Budget::new(10_000)),
            Err(LogicError::StepBudgetExhausted(10_000))
        ));
    }

    #[test]
    fn test_standardize_variables_is_consistent() {
        let mut counter = 0;
        let renamed = standardize_variables(&e("P(x, y) & Q(x)"), &mut counter);
        assert_eq!(renamed.to_string(), "(P(v_0, v_1) & Q(v_0))");
        assert_eq!(counter, 2);
    }
}
