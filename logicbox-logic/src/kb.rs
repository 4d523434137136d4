//! Knowledge bases: propositional (CNF clauses) and first-order (definite clauses)

use crate::budget::Budget;
use crate::cnf::{conjuncts, to_cnf};
use crate::error::{LogicError, LogicResult};
use crate::expr::{Expr, IMPLIES};
use crate::fol::{backward_chain, fol_bc_ask};
use crate::prop::entails;
use crate::unify::Substitution;
use std::fmt;

/// Propositional knowledge base holding sentences in clausal form
#[derive(Debug, Clone, Default)]
pub struct PropKb {
    clauses: Vec<Expr>,
}

impl PropKb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the CNF conjuncts of `sentence`
    pub fn tell(&mut self, sentence: &Expr, budget: &mut Budget) -> LogicResult<()> {
        let cnf = to_cnf(sentence, budget)?;
        self.clauses.extend(conjuncts(&cnf));
        Ok(())
    }

    /// Remove each CNF conjunct of `sentence` that is present
    pub fn retract(&mut self, sentence: &Expr, budget: &mut Budget) -> LogicResult<()> {
        let cnf = to_cnf(sentence, budget)?;
        for clause in conjuncts(&cnf) {
            if let Some(pos) = self.clauses.iter().position(|c| *c == clause) {
                self.clauses.remove(pos);
            }
        }
        Ok(())
    }

    /// The empty substitution when `query` is entailed, otherwise `None`
    pub fn ask(&self, query: &Expr, budget: &mut Budget) -> LogicResult<Option<Substitution>> {
        Ok(self.ask_if_true(query, budget)?.then(Substitution::new))
    }

    pub fn ask_if_true(&self, query: &Expr, budget: &mut Budget) -> LogicResult<bool> {
        entails(&self.clauses, query, budget)
    }

    pub fn clauses(&self) -> &[Expr] {
        &self.clauses
    }
}

impl fmt::Display for PropKb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PropKB({} clauses)", self.clauses.len())
    }
}

/// First-order knowledge base restricted to definite clauses
#[derive(Debug, Clone, Default)]
pub struct FolKb {
    clauses: Vec<Expr>,
}

impl FolKb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clauses(initial: impl IntoIterator<Item = Expr>) -> LogicResult<Self> {
        let mut kb = Self::new();
        for clause in initial {
            kb.tell(clause)?;
        }
        Ok(kb)
    }

    /// Add a definite clause; anything else is rejected
    pub fn tell(&mut self, sentence: Expr) -> LogicResult<()> {
        if !is_definite_clause(&sentence) {
            return Err(LogicError::NotDefiniteClause(sentence.to_string()));
        }
        self.clauses.push(sentence);
        Ok(())
    }

    /// Remove the first clause equal to `sentence`; false when absent
    pub fn retract(&mut self, sentence: &Expr) -> bool {
        match self.clauses.iter().position(|c| c == sentence) {
            Some(pos) => {
                self.clauses.remove(pos);
                true
            }
            None => false,
        }
    }

    /// First substitution proving `query` by backward chaining
    pub fn ask(&self, query: &Expr, budget: &mut Budget) -> LogicResult<Option<Substitution>> {
        let limit = budget.max_answers().min(1);
        Ok(backward_chain(self, query, budget, limit)?.into_iter().next())
    }

    /// Every distinct substitution proving `query`
    pub fn ask_all(&self, query: &Expr, budget: &mut Budget) -> LogicResult<Vec<Substitution>> {
        fol_bc_ask(self, query, budget)
    }

    /// Candidate clauses for proving `goal`
    pub fn fetch_rules_for_goal<'a>(&'a self, goal: &'a Expr) -> impl Iterator<Item = &'a Expr> {
        self.clauses.iter().filter(move |clause| {
            let (_, head) = parse_definite_clause(clause);
            head.op() == goal.op() && head.args().len() == goal.args().len()
        })
    }

    pub fn clauses(&self) -> &[Expr] {
        &self.clauses
    }
}

impl fmt::Display for FolKb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FolKB({} clauses)", self.clauses.len())
    }
}

/// An atom, or a conjunction of atoms implying an atom
pub fn is_definite_clause(s: &Expr) -> bool {
    if s.is_atom() {
        return true;
    }
    if s.op() != IMPLIES || s.args().len() != 2 {
        return false;
    }
    let (antecedent, consequent) = (&s.args()[0], &s.args()[1]);
    consequent.is_atom() && conjuncts(antecedent).iter().all(Expr::is_atom)
}

/// Split a definite clause into premises and conclusion
pub fn parse_definite_clause(s: &Expr) -> (Vec<Expr>, Expr) {
    if s.op() == IMPLIES && s.args().len() == 2 {
        (conjuncts(&s.args()[0]), s.args()[1].clone())
    } else {
        (Vec::new(), s.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn e(text: &str) -> Expr {
        Expr::parse(text).unwrap()
    }

    #[test]
    fn test_definite_clause_detection() {
        assert!(is_definite_clause(&e("Fever(Ahmad)")));
        assert!(is_definite_clause(&e("Fever(x) & Cough(x) ==> HasFlu(x)")));
        assert!(!is_definite_clause(&e("Fever(x) | Cough(x)")));
        assert!(!is_definite_clause(&e("Fever(x) ==> HasFlu(x) | HasCold(x)")));
    }

    #[test]
    fn test_parse_definite_clause() {
        let (premises, head) = parse_definite_clause(&e("A(x) & B(x) ==> C(x)"));
        assert_eq!(premises.len(), 2);
        assert_eq!(head.to_string(), "C(x)");
    }

    #[test]
    fn test_fol_kb_rejects_non_definite() {
        let mut kb = FolKb::new();
        assert!(kb.tell(e("P | Q")).is_err());
        kb.tell(e("P")).unwrap();
        assert_eq!(kb.to_string(), "FolKB(1 clauses)");
        assert!(kb.retract(&e("P")));
        assert!(!kb.retract(&e("P")));
    }

    #[test]
    fn test_prop_kb_tell_ask_retract() {
        let mut budget = Budget::default();
        let mut kb = PropKb::new();
        kb.tell(&e("P ==> Q"), &mut budget).unwrap();
        kb.tell(&e("P"), &mut budget).unwrap();
        assert!(kb.ask_if_true(&e("Q"), &mut budget).unwrap());
        assert_eq!(kb.ask(&e("Q"), &mut budget).unwrap(), Some(Substitution::new()));
        kb.retract(&e("P"), &mut budget).unwrap();
        assert!(!kb.ask_if_true(&e("Q"), &mut budget).unwrap());
        assert_eq!(kb.clauses().len(), 1);
    }

    #[test]
    fn test_fol_kb_ask() {
        let mut kb = FolKb::new();
        kb.tell(e("Parent(Tom, Bob)")).unwrap();
        kb.tell(e("Parent(Bob, Ann)")).unwrap();
        kb.tell(e("Parent(x, y) & Parent(y, z) ==> Grandparent(x, z)"))
            .unwrap();
        let mut budget = Budget::default();
        let answer = kb.ask(&e("Grandparent(Tom, w)"), &mut budget).unwrap().unwrap();
        assert_eq!(answer.get(&e("w")), Some(&e("Ann")));
        assert!(kb.ask(&e("Grandparent(Ann, w)"), &mut budget).unwrap().is_none());
    }
}
