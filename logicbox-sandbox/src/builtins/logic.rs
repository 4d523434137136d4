//! Logic toolkit builtins: expressions, knowledge bases, chaining and solvers

use super::CallArgs;
use crate::error::{EvalError, EvalResult};
use crate::interpreter::Interpreter;
use crate::methods::answer_list;
use crate::value::{float_repr, Table, Value};
use logicbox_logic::{
    self as logic, associate, Expr as LogicExpr, FolKb, Model, PropKb, Substitution, AND,
};
use std::cell::RefCell;
use std::rc::Rc;

/// Logic-expression form of a script value; text is parsed
pub(crate) fn to_logic(value: &Value) -> EvalResult<LogicExpr> {
    match value {
        Value::Expr(e) => Ok(e.as_ref().clone()),
        Value::Str(text) => Ok(LogicExpr::parse(text)?),
        Value::Bool(b) => Ok(LogicExpr::truth(*b)),
        Value::Int(v) => Ok(LogicExpr::symbol(v.to_string())),
        Value::Float(v) => Ok(LogicExpr::symbol(float_repr(*v))),
        other => Err(EvalError::type_error(format!(
            "expected a logic expression or text, not {}",
            other.type_name()
        ))),
    }
}

/// `{'x': Ahmad}` form of a substitution
pub(crate) fn substitution_to_value(theta: &Substitution) -> EvalResult<Value> {
    let mut table = Table::new();
    for (var, binding) in theta {
        let binding = binding.clone().bounded()?;
        table.insert(Value::str(var.to_string()), Value::expr(binding))?;
    }
    Ok(Value::dict(table))
}

/// Script dict as a substitution with every binding chain resolved
fn value_to_substitution(interp: &Interpreter<'_>, value: &Value) -> EvalResult<Substitution> {
    match value {
        Value::None => Ok(Substitution::new()),
        Value::Dict(table) => {
            let theta = table
                .borrow()
                .entries()
                .map(|(k, v)| -> EvalResult<_> { Ok((to_logic(k)?, to_logic(v)?)) })
                .collect::<EvalResult<Substitution>>()?;
            Ok(logic::resolve_substitution(&theta, &mut interp.budget())?)
        }
        other => Err(EvalError::type_error(format!(
            "substitution must be a dict, not {}",
            other.type_name()
        ))),
    }
}

/// `{'P': True}` form of a model
fn model_to_value(model: &Model) -> EvalResult<Value> {
    let mut table = Table::new();
    for (atom, truth) in model {
        table.insert(Value::str(atom.to_string()), Value::Bool(*truth))?;
    }
    Ok(Value::dict(table))
}

fn value_to_model(value: &Value) -> EvalResult<Model> {
    match value {
        Value::None => Ok(Model::new()),
        Value::Dict(table) => table
            .borrow()
            .entries()
            .map(|(k, v)| -> EvalResult<_> { Ok((to_logic(k)?, v.truthy())) })
            .collect(),
        other => Err(EvalError::type_error(format!(
            "model must be a dict, not {}",
            other.type_name()
        ))),
    }
}

fn fol_kb_arg(value: &Value, function: &str) -> EvalResult<Rc<RefCell<FolKb>>> {
    match value {
        Value::FolKb(kb) => Ok(kb.clone()),
        other => Err(EvalError::type_error(format!(
            "{}() expects a FolKB, not {}",
            function,
            other.type_name()
        ))),
    }
}

/// Sentences from one sentence or an iterable of them
fn sentences(interp: &mut Interpreter<'_>, value: &Value) -> EvalResult<Vec<LogicExpr>> {
    match value {
        Value::None => Ok(Vec::new()),
        Value::Expr(_) | Value::Str(_) => Ok(vec![to_logic(value)?]),
        iterable => interp.iterate(iterable)?.iter().map(to_logic).collect(),
    }
}

pub(super) fn expr(_interp: &mut Interpreter<'_>, args: CallArgs) -> EvalResult<Value> {
    let [x] = args.bind("expr", ["x"], 1)?;
    match x {
        Value::Expr(_) => Ok(x),
        other => Ok(Value::expr(to_logic(&other)?)),
    }
}

pub(super) fn fol_kb(interp: &mut Interpreter<'_>, args: CallArgs) -> EvalResult<Value> {
    let [clauses] = args.bind("FolKB", ["clauses"], 0)?;
    let kb = FolKb::with_clauses(sentences(interp, &clauses)?)?;
    Ok(Value::FolKb(Rc::new(RefCell::new(kb))))
}

pub(super) fn prop_kb(interp: &mut Interpreter<'_>, args: CallArgs) -> EvalResult<Value> {
    let [sentence] = args.bind("PropKB", ["sentence"], 0)?;
    let mut kb = PropKb::new();
    let mut budget = interp.budget();
    for sentence in sentences(interp, &sentence)? {
        kb.tell(&sentence, &mut budget)?;
    }
    Ok(Value::PropKb(Rc::new(RefCell::new(kb))))
}

pub(super) fn fol_fc_ask(interp: &mut Interpreter<'_>, args: CallArgs) -> EvalResult<Value> {
    let [kb, alpha] = args.bind("fol_fc_ask", ["kb", "alpha"], 2)?;
    let kb = fol_kb_arg(&kb, "fol_fc_ask")?;
    let alpha = to_logic(&alpha)?;
    let answers = logic::fol_fc_ask(&kb.borrow(), &alpha, &mut interp.budget())?;
    answer_list(interp, &answers)
}

pub(super) fn fol_bc_ask(interp: &mut Interpreter<'_>, args: CallArgs) -> EvalResult<Value> {
    let [kb, query] = args.bind("fol_bc_ask", ["kb", "query"], 2)?;
    let kb = fol_kb_arg(&kb, "fol_bc_ask")?;
    let query = to_logic(&query)?;
    let answers = logic::fol_bc_ask(&kb.borrow(), &query, &mut interp.budget())?;
    answer_list(interp, &answers)
}

pub(super) fn pl_true(_interp: &mut Interpreter<'_>, args: CallArgs) -> EvalResult<Value> {
    let [exp, model] = args.bind("pl_true", ["exp", "model"], 1)?;
    let model = value_to_model(&model)?;
    Ok(match logic::pl_true(&to_logic(&exp)?, &model)? {
        Some(truth) => Value::Bool(truth),
        None => Value::None,
    })
}

pub(super) fn unify(interp: &mut Interpreter<'_>, args: CallArgs) -> EvalResult<Value> {
    let [x, y, s] = args.bind("unify", ["x", "y", "s"], 2)?;
    let theta = value_to_substitution(interp, &s)?;
    match logic::unify(&to_logic(&x)?, &to_logic(&y)?, theta) {
        Some(theta) => substitution_to_value(&theta),
        None => Ok(Value::None),
    }
}

pub(super) fn subst(interp: &mut Interpreter<'_>, args: CallArgs) -> EvalResult<Value> {
    let [s, x] = args.bind("subst", ["s", "x"], 2)?;
    let theta = value_to_substitution(interp, &s)?;
    Ok(Value::expr(logic::subst(&theta, &to_logic(&x)?).bounded()?))
}

pub(super) fn substitute(interp: &mut Interpreter<'_>, args: CallArgs) -> EvalResult<Value> {
    let [expression, bindings] = args.bind("substitute", ["expr", "bindings"], 2)?;
    let theta = value_to_substitution(interp, &bindings)?;
    Ok(Value::expr(logic::subst(&theta, &to_logic(&expression)?).bounded()?))
}

pub(super) fn standardize_variables(
    interp: &mut Interpreter<'_>,
    args: CallArgs,
) -> EvalResult<Value> {
    let [sentence] = args.bind("standardize_variables", ["sentence"], 1)?;
    let sentence = to_logic(&sentence)?;
    Ok(Value::expr(logic::standardize_variables(
        &sentence,
        interp.rename_counter(),
    )))
}

pub(super) fn variables(_interp: &mut Interpreter<'_>, args: CallArgs) -> EvalResult<Value> {
    let [s] = args.bind("variables", ["s"], 1)?;
    let members = to_logic(&s)?.variables().into_iter().map(Value::expr);
    Ok(Value::set(Table::from_members(members)?))
}

pub(super) fn to_cnf(interp: &mut Interpreter<'_>, args: CallArgs) -> EvalResult<Value> {
    let [s] = args.bind("to_cnf", ["s"], 1)?;
    let cnf = logic::to_cnf(&to_logic(&s)?, &mut interp.budget())?;
    Ok(Value::expr(cnf.bounded()?))
}

pub(super) fn make_kb(_interp: &mut Interpreter<'_>, args: CallArgs) -> EvalResult<Value> {
    args.bind("make_kb", [], 0)?;
    Ok(Value::FolKb(Rc::new(RefCell::new(FolKb::new()))))
}

pub(super) fn assert_fact(interp: &mut Interpreter<'_>, args: CallArgs) -> EvalResult<Value> {
    let [kb, fact] = args.bind("assert_fact", ["kb", "fact"], 2)?;
    let fact = to_logic(&fact)?;
    match &kb {
        Value::FolKb(kb) => kb.borrow_mut().tell(fact)?,
        Value::PropKb(kb) => kb.borrow_mut().tell(&fact, &mut interp.budget())?,
        other => {
            return Err(EvalError::type_error(format!(
                "assert_fact() expects a knowledge base, not {}",
                other.type_name()
            )))
        }
    }
    Ok(Value::None)
}

pub(super) fn query(interp: &mut Interpreter<'_>, args: CallArgs) -> EvalResult<Value> {
    let [kb, q] = args.bind("query", ["kb", "q"], 2)?;
    let q = to_logic(&q)?;
    let mut budget = interp.budget();
    let proved = match &kb {
        Value::FolKb(kb) => kb.borrow().ask(&q, &mut budget)?.is_some(),
        Value::PropKb(kb) => kb.borrow().ask_if_true(&q, &mut budget)?,
        other => {
            return Err(EvalError::type_error(format!(
                "query() expects a knowledge base, not {}",
                other.type_name()
            )))
        }
    };
    Ok(Value::Bool(proved))
}

pub(super) fn dpll_satisfiable(interp: &mut Interpreter<'_>, args: CallArgs) -> EvalResult<Value> {
    let [s] = args.bind("dpll_satisfiable", ["s"], 1)?;
    match logic::dpll_satisfiable(&to_logic(&s)?, &mut interp.budget())? {
        Some(model) => model_to_value(&model),
        None => Ok(Value::Bool(false)),
    }
}

pub(super) fn walksat(interp: &mut Interpreter<'_>, args: CallArgs) -> EvalResult<Value> {
    let [clauses, p, max_flips] = args.bind("walksat", ["clauses", "p", "max_flips"], 1)?;
    let clauses = sentences(interp, &clauses)?;
    let p = match p {
        Value::None => 0.5,
        other => other
            .as_number()
            .map(|n| n.as_f64())
            .ok_or_else(|| EvalError::type_error("walksat() p must be a number"))?,
    };
    let max_flips = match max_flips {
        Value::None => 10_000,
        other => other
            .as_int()
            .filter(|n| *n >= 0)
            .ok_or_else(|| EvalError::value_error("walksat() max_flips must be a non-negative integer"))?
            as usize,
    };
    let mut rng = rand::thread_rng();
    match logic::walksat(&clauses, p, max_flips, &mut rng, &mut interp.budget())? {
        Some(model) => model_to_value(&model),
        None => Ok(Value::None),
    }
}

pub(super) fn pl_resolution(interp: &mut Interpreter<'_>, args: CallArgs) -> EvalResult<Value> {
    let [kb, alpha] = args.bind("pl_resolution", ["kb", "alpha"], 2)?;
    let mut budget = interp.budget();
    let clauses = match &kb {
        Value::PropKb(kb) => kb.borrow().clauses().to_vec(),
        other => vec![logic::to_cnf(&to_logic(other)?, &mut budget)?],
    };
    let entailed = logic::pl_resolution(&clauses, &to_logic(&alpha)?, &mut budget)?;
    Ok(Value::Bool(entailed))
}

pub(super) fn tt_entails(interp: &mut Interpreter<'_>, args: CallArgs) -> EvalResult<Value> {
    let [kb, alpha] = args.bind("tt_entails", ["kb", "alpha"], 2)?;
    let kb = match &kb {
        Value::PropKb(kb) => associate(AND, kb.borrow().clauses().to_vec()),
        other => to_logic(other)?,
    };
    let entailed = logic::tt_entails(&kb, &to_logic(&alpha)?, &mut interp.budget())?;
    Ok(Value::Bool(entailed))
}

#[cfg(test)]
mod tests {
    use crate::environment::Environment;
    use crate::error::{EvalError, EvalResult};
    use crate::interpreter::Interpreter;
    use crate::limits::ResourceLimits;
    use crate::parser::{parse_expression, parse_statements};
    use crate::policy::AllowList;
    use crate::value::Value;
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn run(lines: &[&str]) -> EvalResult<Value> {
        let env = Environment::build(Arc::new(AllowList::default().resolve().unwrap()));
        let limits = ResourceLimits::default();
        let mut interp = Interpreter::new(&env, &limits, None);
        let (last, statements) = lines.split_last().unwrap();
        for line in statements {
            for stmt in parse_statements(line, 1).unwrap() {
                interp.execute(&stmt)?;
            }
        }
        interp.evaluate(&parse_expression(last, 1).unwrap())
    }

    fn repr(lines: &[&str]) -> String {
        run(lines).unwrap().repr()
    }

    #[test]
    fn test_expression_construction() {
        assert_eq!(repr(&["expr('P & Q ==> R')"]), "((P & Q) ==> R)");
        assert_eq!(repr(&["Fever = expr('Fever')", "Fever('Ahmad')"]), "Fever(Ahmad)");
        assert_matches!(
            run(&["expr('P & ')"]),
            Err(EvalError::Runtime { error_type: "ValueError", .. })
        );
    }

    #[test]
    fn test_assert_then_query() {
        assert_eq!(
            repr(&["kb = make_kb(); assert_fact(kb, 'P')", "query(kb, 'P'), query(kb, 'Q')"]),
            "(True, False)"
        );
        assert_eq!(
            repr(&["kb = PropKB()", "assert_fact(kb, 'A & B')", "query(kb, 'B')"]),
            "True"
        );
        assert_matches!(
            run(&["query([], 'P')"]),
            Err(EvalError::Runtime { error_type: "TypeError", .. })
        );
    }

    #[test]
    fn test_chaining() {
        let kb = [
            "kb = FolKB(['Parent(Ann, Bob)', 'Parent(Bob, Cal)'])",
            "kb.tell('Parent(x, y) & Parent(y, z) ==> Grandparent(x, z)')",
        ];
        let mut lines = kb.to_vec();
        lines.push("fol_bc_ask(kb, 'Grandparent(Ann, w)')");
        assert_eq!(repr(&lines), "[{'w': Cal}]");

        let mut lines = kb.to_vec();
        lines.push("fol_fc_ask(kb, expr('Grandparent(a, b)')), len(kb.clauses)");
        assert_eq!(repr(&lines), "([{'a': Ann, 'b': Cal}], 3)");
    }

    #[test]
    fn test_unify_and_subst() {
        assert_eq!(repr(&["unify('Knows(John, x)', 'Knows(y, Jane)')"]), "{'x': Jane, 'y': John}");
        assert_eq!(repr(&["unify('P(A)', 'P(B)')"]), "None");
        assert_eq!(repr(&["subst({'x': 'A'}, 'F(x, y)')"]), "F(A, y)");
        assert_eq!(repr(&["substitute('F(x, y)', {'y': 'B'})"]), "F(x, B)");
        assert_eq!(repr(&["sorted(str(v) for v in variables('F(x, G(y), A)'))"]), "['x', 'y']");
    }

    #[test]
    fn test_propositional_procedures() {
        assert_eq!(repr(&["pl_true('P | Q', {'P': True})"]), "True");
        assert_eq!(repr(&["pl_true('P & Q', {'P': True})"]), "None");
        assert_eq!(repr(&["to_cnf('P ==> Q')"]), "(Q | ~P)");
        assert_eq!(repr(&["dpll_satisfiable('P & ~P')"]), "False");
        assert_eq!(repr(&["dpll_satisfiable('A & ~B')"]), "{'A': True, 'B': False}");
        assert_eq!(repr(&["tt_entails('P & Q', 'Q')"]), "True");
        assert_eq!(
            repr(&["kb = PropKB('P ==> Q'); kb.tell('P')", "pl_resolution(kb, 'Q'), tt_entails(kb, 'Q')"]),
            "(True, True)"
        );
        assert_eq!(repr(&["walksat(['A | B', '~A'], max_flips=1000)['B']"]), "True");
        assert_eq!(repr(&["walksat(['A', '~A'], max_flips=50)"]), "None");
    }
}
