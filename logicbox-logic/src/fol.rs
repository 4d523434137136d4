//! Forward and backward chaining over definite-clause knowledge bases

use crate::budget::Budget;
use crate::error::{LogicError, LogicResult};
use crate::expr::Expr;
use crate::kb::{parse_definite_clause, FolKb};
use crate::unify::{standardize_variables, subst, unify, Substitution};
use std::ops::ControlFlow;
use tracing::debug;

/// Answers to `query` derived by forward chaining.
///
/// Premises of every rule are joined against the known facts until no new
/// fact appears. Derived facts live in a scratch copy; `kb` is left as is.
pub fn fol_fc_ask(kb: &FolKb, query: &Expr, budget: &mut Budget) -> LogicResult<Vec<Substitution>> {
    let mut facts = Vec::new();
    let mut rules = Vec::new();
    for clause in kb.clauses() {
        let (premises, head) = parse_definite_clause(clause);
        if premises.is_empty() {
            facts.push(head);
        } else {
            rules.push((premises, head));
        }
    }

    let mut answers = Answers::new(query, budget.max_answers());
    for fact in &facts {
        budget.tick()?;
        if let Some(theta) = unify(fact, query, Substitution::new()) {
            if answers.record(theta).is_break() {
                return Ok(answers.into_inner());
            }
        }
    }

    let mut rounds = 0usize;
    loop {
        rounds += 1;
        let mut derived: Vec<Expr> = Vec::new();
        for (premises, head) in &rules {
            for theta in join_premises(premises, &facts, budget)? {
                let conclusion = subst(&theta, head);
                if facts.contains(&conclusion) || derived.contains(&conclusion) {
                    continue;
                }
                if let Some(phi) = unify(&conclusion, query, Substitution::new()) {
                    if answers.record(phi).is_break() {
                        return Ok(answers.into_inner());
                    }
                }
                derived.push(conclusion);
            }
        }
        if derived.is_empty() {
            break;
        }
        facts.extend(derived);
    }

    debug!(query = %query, rounds, answers = answers.len(), "forward chaining finished");
    Ok(answers.into_inner())
}

fn join_premises(
    premises: &[Expr],
    facts: &[Expr],
    budget: &mut Budget,
) -> LogicResult<Vec<Substitution>> {
    let mut thetas = vec![Substitution::new()];
    for premise in premises {
        let mut next = Vec::new();
        for theta in &thetas {
            let goal = subst(theta, premise);
            for fact in facts {
                budget.tick()?;
                if let Some(extended) = unify(&goal, fact, theta.clone()) {
                    next.push(extended);
                }
            }
        }
        if next.is_empty() {
            return Ok(next);
        }
        thetas = next;
    }
    Ok(thetas)
}

/// Answers to `query` derived by backward chaining, depth first.
///
/// Each rule is standardised apart before use. Every answer binds exactly the
/// variables of `query`; a ground query that holds yields one empty answer.
pub fn fol_bc_ask(kb: &FolKb, query: &Expr, budget: &mut Budget) -> LogicResult<Vec<Substitution>> {
    let limit = budget.max_answers();
    backward_chain(kb, query, budget, limit)
}

pub(crate) fn backward_chain(
    kb: &FolKb,
    query: &Expr,
    budget: &mut Budget,
    limit: usize,
) -> LogicResult<Vec<Substitution>> {
    let mut answers = Answers::new(query, limit);
    if limit == 0 {
        return Ok(Vec::new());
    }
    let mut chainer = BackwardChainer {
        kb,
        budget,
        counter: 0,
    };
    chainer.or_goal(query, Substitution::new(), 0, &mut |_, theta| Ok(answers.record(theta)))?;
    debug!(query = %query, answers = answers.len(), "backward chaining finished");
    Ok(answers.into_inner())
}

type Flow = LogicResult<ControlFlow<()>>;

struct BackwardChainer<'a> {
    kb: &'a FolKb,
    budget: &'a mut Budget,
    counter: usize,
}

impl<'a> BackwardChainer<'a> {
    fn or_goal(
        &mut self,
        goal: &Expr,
        theta: Substitution,
        depth: usize,
        k: &mut dyn FnMut(&mut Self, Substitution) -> Flow,
    ) -> Flow {
        if depth > self.budget.max_depth() {
            return Err(LogicError::DepthExceeded(self.budget.max_depth()));
        }
        let kb = self.kb;
        for rule in kb.fetch_rules_for_goal(goal) {
            self.budget.tick()?;
            let renamed = standardize_variables(rule, &mut self.counter);
            let (premises, head) = parse_definite_clause(&renamed);
            let Some(theta1) = unify(&head, goal, theta.clone()) else {
                continue;
            };
            if self.and_goals(&premises, theta1, depth + 1, k)?.is_break() {
                return Ok(ControlFlow::Break(()));
            }
        }
        Ok(ControlFlow::Continue(()))
    }

    fn and_goals(
        &mut self,
        goals: &[Expr],
        theta: Substitution,
        depth: usize,
        k: &mut dyn FnMut(&mut Self, Substitution) -> Flow,
    ) -> Flow {
        let Some((first, rest)) = goals.split_first() else {
            return k(self, theta);
        };
        let goal = subst(&theta, first);
        self.or_goal(&goal, theta, depth, &mut |this: &mut Self, theta1| {
            this.and_goals(rest, theta1, depth, k)
        })
    }
}

/// Distinct answers restricted to the query's variables
struct Answers {
    variables: Vec<Expr>,
    found: Vec<Substitution>,
    limit: usize,
}

impl Answers {
    fn new(query: &Expr, limit: usize) -> Self {
        Self {
            variables: query.variables().into_iter().collect(),
            found: Vec::new(),
            limit,
        }
    }

    fn record(&mut self, theta: Substitution) -> ControlFlow<()> {
        let answer: Substitution = self
            .variables
            .iter()
            .map(|var| (var.clone(), subst(&theta, var)))
            .collect();
        if !self.found.contains(&answer) {
            self.found.push(answer);
        }
        if self.found.len() >= self.limit {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    }

    fn len(&self) -> usize {
        self.found.len()
    }

    fn into_inner(self) -> Vec<Substitution> {
        self.found
    }
}
