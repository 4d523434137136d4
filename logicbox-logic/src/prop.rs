//! Propositional evaluation, entailment and satisfiability

use crate::budget::Budget;
use crate::cnf::{conjuncts, disjuncts, to_cnf};
use crate::error::{LogicError, LogicResult};
use crate::expr::{Expr, AND, IFF, IMPLIES, NOT, OR, REVERSE_IMPLIES, XOR};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::{BTreeMap, BTreeSet};

/// Truth assignment to proposition atoms
pub type Model = BTreeMap<Expr, bool>;

/// Truth-table enumeration refuses sentences with more distinct atoms than this
pub const MAX_TRUTH_TABLE_SYMBOLS: usize = 20;

/// Evaluate `sentence` under a (possibly partial) model.
///
/// Returns `Ok(None)` when the model leaves the value undetermined.
pub fn pl_true(sentence: &Expr, model: &Model) -> LogicResult<Option<bool>> {
    if let Some(value) = sentence.truth_value() {
        return Ok(Some(value));
    }
    if sentence.is_prop_atom() {
        return Ok(model.get(sentence).copied());
    }
    let args = sentence.args();
    match sentence.op() {
        NOT if args.len() == 1 => Ok(pl_true(&args[0], model)?.map(|v| !v)),
        OR => {
            let mut result = Some(false);
            for arg in args {
                match pl_true(arg, model)? {
                    Some(true) => return Ok(Some(true)),
                    None => result = None,
                    Some(false) => {}
                }
            }
            Ok(result)
        }
        AND => {
            let mut result = Some(true);
            for arg in args {
                match pl_true(arg, model)? {
                    Some(false) => return Ok(Some(false)),
                    None => result = None,
                    Some(true) => {}
                }
            }
            Ok(result)
        }
        IMPLIES if args.len() == 2 => {
            pl_true(&args[0].clone().negate().or(args[1].clone()), model)
        }
        REVERSE_IMPLIES if args.len() == 2 => {
            pl_true(&args[0].clone().or(args[1].clone().negate()), model)
        }
        op @ (IFF | XOR) if args.len() == 2 => {
            let Some(p) = pl_true(&args[0], model)? else {
                return Ok(None);
            };
            let Some(q) = pl_true(&args[1], model)? else {
                return Ok(None);
            };
            Ok(Some(if op == IFF { p == q } else { p != q }))
        }
        _ => Err(LogicError::NotPropositional(sentence.to_string())),
    }
}

/// Does `kb` entail `alpha`? Decided by enumerating every model.
pub fn tt_entails(kb: &Expr, alpha: &Expr, budget: &mut Budget) -> LogicResult<bool> {
    if let Some(var) = alpha.variables().into_iter().next() {
        return Err(LogicError::NotPropositional(format!(
            "{} (contains variable {})",
            alpha, var
        )));
    }
    let symbols: Vec<Expr> = kb
        .prop_symbols()
        .into_iter()
        .chain(alpha.prop_symbols())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    if symbols.len() > MAX_TRUTH_TABLE_SYMBOLS {
        return Err(LogicError::TooManySymbols {
            count: symbols.len(),
            max: MAX_TRUTH_TABLE_SYMBOLS,
        });
    }

    let mut model = Model::new();
    for row in 0u64..(1u64 << symbols.len()) {
        budget.tick()?;
        for (i, symbol) in symbols.iter().enumerate() {
            model.insert(symbol.clone(), row & (1 << i) != 0);
        }
        if pl_true(kb, &model)? == Some(true) && pl_true(alpha, &model)? != Some(true) {
            return Ok(false);
        }
    }
    Ok(true)
}

/// A disjunction of literals as a set, so duplicates and ordering vanish
type ClauseSet = BTreeSet<Expr>;

fn complement(literal: &Expr) -> Expr {
    if literal.op() == NOT && literal.args().len() == 1 {
        literal.args()[0].clone()
    } else {
        literal.clone().negate()
    }
}

fn clause_set(clause: &Expr) -> Option<ClauseSet> {
    let mut set = ClauseSet::new();
    for literal in disjuncts(clause) {
        match literal.truth_value() {
            Some(true) => return None,
            Some(false) => {}
            None => {
                set.insert(literal);
            }
        }
    }
    Some(set)
}

fn is_tautology(clause: &ClauseSet) -> bool {
    clause.iter().any(|lit| clause.contains(&complement(lit)))
}

/// Does the clause set `kb` together with `~alpha` resolve to the empty clause?
pub fn pl_resolution(kb: &[Expr], alpha: &Expr, budget: &mut Budget) -> LogicResult<bool> {
    let mut clauses: BTreeSet<ClauseSet> = BTreeSet::new();
    let negated = to_cnf(&alpha.clone().negate(), budget)?;
    for sentence in kb.iter().chain(std::iter::once(&negated)) {
        for clause in conjuncts(sentence) {
            if let Some(set) = clause_set(&clause) {
                if set.is_empty() {
                    return Ok(true);
                }
                if !is_tautology(&set) {
                    clauses.insert(set);
                }
            }
        }
    }

    loop {
        let current: Vec<&ClauseSet> = clauses.iter().collect();
        let mut new = BTreeSet::new();
        for (i, ci) in current.iter().enumerate() {
            for cj in &current[i + 1..] {
                budget.tick()?;
                for resolvent in resolve(ci, cj) {
                    if resolvent.is_empty() {
                        return Ok(true);
                    }
                    if !is_tautology(&resolvent) && !clauses.contains(&resolvent) {
                        new.insert(resolvent);
                    }
                }
            }
        }
        if new.is_empty() {
            return Ok(false);
        }
        clauses.extend(new);
    }
}

fn resolve(ci: &ClauseSet, cj: &ClauseSet) -> Vec<ClauseSet> {
    let mut resolvents = Vec::new();
    for di in ci {
        let dj = complement(di);
        if cj.contains(&dj) {
            let mut resolvent: ClauseSet = ci.iter().filter(|l| *l != di).cloned().collect();
            resolvent.extend(cj.iter().filter(|l| **l != dj).cloned());
            resolvents.push(resolvent);
        }
    }
    resolvents
}

/// A clause as atom/polarity pairs for model checking
type Literals = Vec<(Expr, bool)>;

fn literals_of(clause: &Expr) -> LogicResult<Option<Literals>> {
    let mut literals = Vec::new();
    for literal in disjuncts(clause) {
        match literal.truth_value() {
            Some(true) => return Ok(None),
            Some(false) => continue,
            None => {}
        }
        let (atom, positive) = if literal.op() == NOT && literal.args().len() == 1 {
            (literal.args()[0].clone(), false)
        } else {
            (literal, true)
        };
        if !atom.is_prop_atom() {
            return Err(LogicError::NotPropositional(atom.to_string()));
        }
        literals.push((atom, positive));
    }
    Ok(Some(literals))
}

fn clause_value(clause: &Literals, model: &Model) -> Option<bool> {
    let mut result = Some(false);
    for (atom, positive) in clause {
        match model.get(atom) {
            Some(value) if value == positive => return Some(true),
            Some(_) => {}
            None => result = None,
        }
    }
    result
}

fn clauses_of(sentences: &[Expr], budget: &mut Budget) -> LogicResult<Option<Vec<Literals>>> {
    let mut clauses = Vec::new();
    for sentence in sentences {
        for clause in conjuncts(&to_cnf(sentence, budget)?) {
            if let Some(literals) = literals_of(&clause)? {
                if literals.is_empty() {
                    return Ok(None);
                }
                clauses.push(literals);
            }
        }
    }
    Ok(Some(clauses))
}

/// Find a model satisfying `sentence`, or `None` if it is unsatisfiable.
///
/// Atoms the search never had to fix are absent from the model.
pub fn dpll_satisfiable(sentence: &Expr, budget: &mut Budget) -> LogicResult<Option<Model>> {
    satisfiable(std::slice::from_ref(sentence), budget)
}

/// Does the conjunction of `kb` entail `alpha`? Decided by refuting `kb & ~alpha`.
pub fn entails(kb: &[Expr], alpha: &Expr, budget: &mut Budget) -> LogicResult<bool> {
    let mut sentences = kb.to_vec();
    sentences.push(alpha.clone().negate());
    Ok(satisfiable(&sentences, budget)?.is_none())
}

fn satisfiable(sentences: &[Expr], budget: &mut Budget) -> LogicResult<Option<Model>> {
    let Some(clauses) = clauses_of(sentences, budget)? else {
        return Ok(None);
    };
    let symbols: BTreeSet<Expr> = clauses
        .iter()
        .flat_map(|c| c.iter().map(|(atom, _)| atom.clone()))
        .collect();
    dpll(&clauses, symbols, Model::new(), budget)
}

fn dpll(
    clauses: &[Literals],
    mut symbols: BTreeSet<Expr>,
    mut model: Model,
    budget: &mut Budget,
) -> LogicResult<Option<Model>> {
    budget.tick()?;
    let mut unknown = Vec::new();
    for clause in clauses {
        match clause_value(clause, &model) {
            Some(false) => return Ok(None),
            None => unknown.push(clause),
            Some(true) => {}
        }
    }
    if unknown.is_empty() {
        return Ok(Some(model));
    }

    if let Some((symbol, value)) = find_pure_symbol(&symbols, &unknown) {
        symbols.remove(&symbol);
        model.insert(symbol, value);
        return dpll(clauses, symbols, model, budget);
    }
    if let Some((symbol, value)) = find_unit_clause(&unknown, &model) {
        symbols.remove(&symbol);
        model.insert(symbol, value);
        return dpll(clauses, symbols, model, budget);
    }

    let Some(symbol) = symbols.pop_first() else {
        return Ok(None);
    };
    let mut with_true = model.clone();
    with_true.insert(symbol.clone(), true);
    if let Some(found) = dpll(clauses, symbols.clone(), with_true, budget)? {
        return Ok(Some(found));
    }
    model.insert(symbol, false);
    dpll(clauses, symbols, model, budget)
}

fn find_pure_symbol(symbols: &BTreeSet<Expr>, clauses: &[&Literals]) -> Option<(Expr, bool)> {
    for symbol in symbols {
        let mut positive = false;
        let mut negative = false;
        for clause in clauses {
            for (atom, polarity) in clause.iter() {
                if atom == symbol {
                    if *polarity {
                        positive = true;
                    } else {
                        negative = true;
                    }
                }
            }
        }
        if positive != negative {
            return Some((symbol.clone(), positive));
        }
    }
    None
}

fn find_unit_clause(clauses: &[&Literals], model: &Model) -> Option<(Expr, bool)> {
    for clause in clauses {
        let mut unassigned = clause.iter().filter(|(atom, _)| !model.contains_key(atom));
        if let (Some((atom, positive)), None) = (unassigned.next(), unassigned.next()) {
            return Some((atom.clone(), *positive));
        }
    }
    None
}

/// Local search for a model of `sentences`, flipping at most `max_flips` atoms.
///
/// With probability `p` the flipped atom is chosen at random from an
/// unsatisfied clause; otherwise the flip that satisfies most clauses wins.
pub fn walksat<R: Rng>(
    sentences: &[Expr],
    p: f64,
    max_flips: usize,
    rng: &mut R,
    budget: &mut Budget,
) -> LogicResult<Option<Model>> {
    let Some(clauses) = clauses_of(sentences, budget)? else {
        return Ok(None);
    };
    let symbols: BTreeSet<Expr> = clauses
        .iter()
        .flat_map(|c| c.iter().map(|(atom, _)| atom.clone()))
        .collect();
    let mut model: Model = symbols.into_iter().map(|s| (s, rng.gen_bool(0.5))).collect();
    let p = p.clamp(0.0, 1.0);

    for _ in 0..max_flips {
        budget.tick()?;
        let unsatisfied: Vec<&Literals> = clauses
            .iter()
            .filter(|c| clause_value(c, &model) != Some(true))
            .collect();
        let Some(clause) = unsatisfied.choose(rng) else {
            return Ok(Some(model));
        };
        let candidates: Vec<&Expr> = clause.iter().map(|(atom, _)| atom).collect();
        let flip = if rng.gen_bool(p) {
            candidates.choose(rng).map(|atom| (*atom).clone())
        } else {
            let mut best: Option<(usize, &Expr)> = None;
            for atom in &candidates {
                flip_atom(&mut model, atom);
                let count = clauses
                    .iter()
                    .filter(|c| clause_value(c, &model) == Some(true))
                    .count();
                flip_atom(&mut model, atom);
                if best.map_or(true, |(top, _)| count > top) {
                    best = Some((count, *atom));
                }
            }
            best.map(|(_, atom)| atom.clone())
        };
        if let Some(atom) = flip {
            flip_atom(&mut model, &atom);
        }
    }

    let solved = clauses.iter().all(|c| clause_value(c, &model) == Some(true));
    Ok(solved.then_some(model))
}

fn flip_atom(model: &mut Model, atom: &Expr) {
    if let Some(value) = model.get_mut(atom) {
        *value = !*value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn e(text: &str) -> Expr {
        Expr::parse(text).unwrap()
    }

    fn model(pairs: &[(&str, bool)]) -> Model {
        pairs.iter().map(|(s, v)| (e(s), *v)).collect()
    }

    #[test]
    fn test_pl_true_three_valued() {
        let m = model(&[("P", true)]);
        assert_eq!(pl_true(&e("P & Q"), &m).unwrap(), None);
        assert_eq!(pl_true(&e("P | Q"), &m).unwrap(), Some(true));
        assert_eq!(pl_true(&e("P ==> Q"), &model(&[("P", false)])).unwrap(), Some(true));
        assert_eq!(pl_true(&e("True"), &Model::new()).unwrap(), Some(true));
        assert_eq!(pl_true(&e("P ^ P"), &m).unwrap(), Some(false));
    }

    #[test]
    fn test_pl_true_rejects_variables() {
        assert!(matches!(
            pl_true(&e("x & P"), &Model::new()),
            Err(LogicError::NotPropositional(_))
        ));
    }

    #[test]
    fn test_tt_entails() {
        let mut budget = Budget::default();
        assert!(tt_entails(&e("P & Q"), &e("Q"), &mut budget).unwrap());
        assert!(!tt_entails(&e("P | Q"), &e("Q"), &mut budget).unwrap());
        assert!(tt_entails(&e("(P ==> Q) & P"), &e("Q"), &mut budget).unwrap());
    }

    #[test]
    fn test_pl_resolution_modus_ponens() {
        let kb = vec![e("P ==> Q"), e("P")];
        let kb: Vec<Expr> = kb
            .iter()
            .map(|s| to_cnf(s, &mut Budget::unlimited()).unwrap())
            .collect();
        let mut budget = Budget::default();
        assert!(pl_resolution(&kb, &e("Q"), &mut budget).unwrap());
        assert!(!pl_resolution(&kb, &e("R"), &mut budget).unwrap());
    }

    #[test]
    fn test_dpll() {
        let mut budget = Budget::default();
        let found = dpll_satisfiable(&e("A & ~B"), &mut budget).unwrap().unwrap();
        assert_eq!(found.get(&e("A")), Some(&true));
        assert_eq!(found.get(&e("B")), Some(&false));
        assert!(dpll_satisfiable(&e("P & ~P"), &mut budget).unwrap().is_none());
    }

    #[test]
    fn test_entails_via_refutation() {
        let mut budget = Budget::default();
        let kb = vec![e("A ==> B"), e("B ==> C"), e("A")];
        assert!(entails(&kb, &e("C"), &mut budget).unwrap());
        assert!(!entails(&kb, &e("D"), &mut budget).unwrap());
    }

    #[test]
    fn test_walksat_finds_model() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut budget = Budget::default();
        let sentences = vec![e("A | B"), e("~A"), e("B ==> C")];
        let found = walksat(&sentences, 0.5, 1_000, &mut rng, &mut budget)
            .unwrap()
            .unwrap();
        assert_eq!(found.get(&e("A")), Some(&false));
        assert_eq!(found.get(&e("C")), Some(&true));
        let none = walksat(&[e("P & ~P")], 0.5, 50, &mut rng, &mut budget).unwrap();
        assert!(none.is_none());
    }
}
