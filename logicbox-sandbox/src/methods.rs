//! Attributes and methods reachable on runtime values

use crate::builtins::{substitution_to_value, to_logic, CallArgs};
use crate::error::{EvalError, EvalResult};
use crate::interpreter::Interpreter;
use crate::value::{BoundMethod, Table, Value};
use logicbox_logic::Substitution;
use std::cmp::Ordering;
use std::rc::Rc;

const STR_METHODS: &[&str] = &[
    "upper", "lower", "strip", "lstrip", "rstrip", "split", "join", "replace", "startswith",
    "endswith", "find", "count",
];
const LIST_METHODS: &[&str] = &[
    "append", "extend", "pop", "insert", "index", "count", "copy", "reverse", "sort",
];
const DICT_METHODS: &[&str] = &["keys", "values", "items", "get", "update", "copy"];
const SET_METHODS: &[&str] = &["add", "union", "intersection"];
const TUPLE_METHODS: &[&str] = &["index", "count"];
const FOL_KB_METHODS: &[&str] = &["tell", "ask", "ask_all", "ask_generator", "retract"];
const PROP_KB_METHODS: &[&str] = &[
    "tell",
    "ask",
    "ask_all",
    "ask_generator",
    "ask_if_true",
    "retract",
];

fn methods_of(value: &Value) -> &'static [&'static str] {
    match value {
        Value::Str(_) => STR_METHODS,
        Value::List(_) => LIST_METHODS,
        Value::Dict(_) => DICT_METHODS,
        Value::Set(_) => SET_METHODS,
        Value::Tuple(_) => TUPLE_METHODS,
        Value::FolKb(_) => FOL_KB_METHODS,
        Value::PropKb(_) => PROP_KB_METHODS,
        _ => &[],
    }
}

/// `object.name`; underscore names are never reachable
pub(crate) fn get_attribute(object: &Value, name: &str) -> EvalResult<Value> {
    if name.starts_with('_') {
        return Err(EvalError::attribute_error(format!(
            "attribute '{}' is not accessible",
            name
        )));
    }
    match (object, name) {
        (Value::Expr(e), "op") => return Ok(Value::str(e.op())),
        (Value::Expr(e), "args") => {
            return Ok(Value::tuple(
                e.args().iter().cloned().map(Value::expr).collect(),
            ))
        }
        (Value::FolKb(kb), "clauses") => {
            return Ok(Value::list(
                kb.borrow().clauses().iter().cloned().map(Value::expr).collect(),
            ))
        }
        (Value::PropKb(kb), "clauses") => {
            return Ok(Value::list(
                kb.borrow().clauses().iter().cloned().map(Value::expr).collect(),
            ))
        }
        _ => {}
    }
    match methods_of(object).iter().copied().find(|m| *m == name) {
        Some(method) => Ok(Value::Method(Rc::new(BoundMethod {
            receiver: object.clone(),
            name: method,
        }))),
        None => Err(EvalError::attribute_error(format!(
            "'{}' object has no attribute '{}'",
            object.type_name(),
            name
        ))),
    }
}

pub(crate) fn call_method(
    interp: &mut Interpreter<'_>,
    receiver: &Value,
    name: &str,
    args: CallArgs,
) -> EvalResult<Value> {
    match receiver {
        Value::Str(s) => str_method(interp, s, name, args),
        Value::List(_) => list_method(interp, receiver, name, args),
        Value::Tuple(items) => sequence_method(items, name, args, "tuple"),
        Value::Dict(_) => dict_method(interp, receiver, name, args),
        Value::Set(_) => set_method(interp, receiver, name, args),
        Value::FolKb(_) | Value::PropKb(_) => kb_method(interp, receiver, name, args),
        other => Err(no_method(other, name)),
    }
}

fn no_method(value: &Value, name: &str) -> EvalError {
    EvalError::attribute_error(format!(
        "'{}' object has no attribute '{}'",
        value.type_name(),
        name
    ))
}

fn expect_str(value: &Value, what: &str) -> EvalResult<Rc<str>> {
    match value {
        Value::Str(s) => Ok(s.clone()),
        other => Err(EvalError::type_error(format!(
            "{} must be str, not {}",
            what,
            other.type_name()
        ))),
    }
}

fn optional_int(value: &Value, what: &str, default: i64) -> EvalResult<i64> {
    match value {
        Value::None => Ok(default),
        other => other.as_int().ok_or_else(|| {
            EvalError::type_error(format!(
                "{} must be an integer, not {}",
                what,
                other.type_name()
            ))
        }),
    }
}

fn str_method(
    interp: &mut Interpreter<'_>,
    s: &str,
    name: &str,
    args: CallArgs,
) -> EvalResult<Value> {
    let qualified = format!("str.{}", name);
    match name {
        "upper" => {
            args.bind(&qualified, [], 0)?;
            Ok(Value::str(s.to_uppercase()))
        }
        "lower" => {
            args.bind(&qualified, [], 0)?;
            Ok(Value::str(s.to_lowercase()))
        }
        "strip" | "lstrip" | "rstrip" => {
            let [chars] = args.bind(&qualified, ["chars"], 0)?;
            let chars: Option<Vec<char>> = match chars {
                Value::None => None,
                other => Some(expect_str(&other, "chars")?.chars().collect()),
            };
            let matches = |c: char| match &chars {
                Some(set) => set.contains(&c),
                None => c.is_whitespace(),
            };
            let stripped = match name {
                "strip" => s.trim_matches(matches),
                "lstrip" => s.trim_start_matches(matches),
                _ => s.trim_end_matches(matches),
            };
            Ok(Value::str(stripped))
        }
        "split" => {
            let [sep, maxsplit] = args.bind(&qualified, ["sep", "maxsplit"], 0)?;
            let maxsplit = optional_int(&maxsplit, "maxsplit", -1)?;
            let parts: Vec<Value> = match sep {
                Value::None => split_whitespace(s, maxsplit),
                other => {
                    let sep = expect_str(&other, "separator")?;
                    if sep.is_empty() {
                        return Err(EvalError::value_error("empty separator"));
                    }
                    if maxsplit < 0 {
                        s.split(&*sep).map(Value::str).collect()
                    } else {
                        s.splitn(maxsplit as usize + 1, &*sep)
                            .map(Value::str)
                            .collect()
                    }
                }
            };
            interp.check_len(parts.len())?;
            Ok(Value::list(parts))
        }
        "join" => {
            let [iterable] = args.bind(&qualified, ["iterable"], 1)?;
            let items = interp.iterate(&iterable)?;
            let mut pieces = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                match item {
                    Value::Str(piece) => pieces.push(piece.clone()),
                    other => {
                        return Err(EvalError::type_error(format!(
                            "sequence item {}: expected str instance, {} found",
                            i,
                            other.type_name()
                        )))
                    }
                }
            }
            let joined = pieces.join(s);
            interp.check_str_len(joined.len())?;
            Ok(Value::str(joined))
        }
        "replace" => {
            let [old, new, count] = args.bind(&qualified, ["old", "new", "count"], 2)?;
            let (old, new) = (expect_str(&old, "old")?, expect_str(&new, "new")?);
            let count = optional_int(&count, "count", -1)?;
            let replaced = if count < 0 {
                s.replace(&*old, &new)
            } else {
                s.replacen(&*old, &new, count as usize)
            };
            interp.check_str_len(replaced.len())?;
            Ok(Value::str(replaced))
        }
        "startswith" | "endswith" => {
            let [affix] = args.bind(&qualified, ["prefix"], 1)?;
            let candidates: Vec<Rc<str>> = match &affix {
                Value::Tuple(items) => items
                    .iter()
                    .map(|item| expect_str(item, "tuple item"))
                    .collect::<EvalResult<_>>()?,
                other => vec![expect_str(other, "prefix")?],
            };
            let found = candidates.iter().any(|c| {
                if name == "startswith" {
                    s.starts_with(&**c)
                } else {
                    s.ends_with(&**c)
                }
            });
            Ok(Value::Bool(found))
        }
        "find" => {
            let [sub] = args.bind(&qualified, ["sub"], 1)?;
            let sub = expect_str(&sub, "sub")?;
            Ok(Value::Int(match s.find(&*sub) {
                Some(offset) => s[..offset].chars().count() as i64,
                None => -1,
            }))
        }
        "count" => {
            let [sub] = args.bind(&qualified, ["sub"], 1)?;
            let sub = expect_str(&sub, "sub")?;
            Ok(Value::Int(if sub.is_empty() {
                s.chars().count() as i64 + 1
            } else {
                s.matches(&*sub).count() as i64
            }))
        }
        _ => Err(no_method(&Value::str(s), name)),
    }
}

fn split_whitespace(s: &str, maxsplit: i64) -> Vec<Value> {
    let mut parts = Vec::new();
    let mut rest = s.trim_start();
    while !rest.is_empty() {
        if maxsplit >= 0 && parts.len() as i64 == maxsplit {
            parts.push(Value::str(rest));
            break;
        }
        match rest.find(char::is_whitespace) {
            Some(end) => {
                parts.push(Value::str(&rest[..end]));
                rest = rest[end..].trim_start();
            }
            None => {
                parts.push(Value::str(rest));
                break;
            }
        }
    }
    parts
}

/// `index` and `count`, shared by lists and tuples
fn sequence_method(items: &[Value], name: &str, args: CallArgs, kind: &str) -> EvalResult<Value> {
    let qualified = format!("{}.{}", kind, name);
    match name {
        "index" => {
            let [value] = args.bind(&qualified, ["value"], 1)?;
            items
                .iter()
                .position(|item| item.equals(&value))
                .map(|i| Value::Int(i as i64))
                .ok_or_else(|| {
                    EvalError::value_error(format!("{} is not in {}", value.repr(), kind))
                })
        }
        "count" => {
            let [value] = args.bind(&qualified, ["value"], 1)?;
            Ok(Value::Int(
                items.iter().filter(|item| item.equals(&value)).count() as i64,
            ))
        }
        _ => Err(EvalError::attribute_error(format!(
            "'{}' object has no attribute '{}'",
            kind, name
        ))),
    }
}

fn list_method(
    interp: &mut Interpreter<'_>,
    receiver: &Value,
    name: &str,
    args: CallArgs,
) -> EvalResult<Value> {
    let Value::List(list) = receiver else {
        return Err(no_method(receiver, name));
    };
    let qualified = format!("list.{}", name);
    match name {
        "append" => {
            let [item] = args.bind(&qualified, ["object"], 1)?;
            interp.check_len(list.borrow().len() + 1)?;
            list.borrow_mut().push(item);
            Ok(Value::None)
        }
        "extend" => {
            let [iterable] = args.bind(&qualified, ["iterable"], 1)?;
            let extra = interp.iterate(&iterable)?;
            interp.check_len(list.borrow().len() + extra.len())?;
            list.borrow_mut().extend(extra);
            Ok(Value::None)
        }
        "pop" => {
            let [index] = args.bind(&qualified, ["index"], 0)?;
            let mut items = list.borrow_mut();
            if items.is_empty() {
                return Err(EvalError::index_error("pop from empty list"));
            }
            let len = items.len() as i64;
            let raw = optional_int(&index, "index", -1)?;
            let resolved = if raw < 0 { raw + len } else { raw };
            if resolved < 0 || resolved >= len {
                return Err(EvalError::index_error("pop index out of range"));
            }
            Ok(items.remove(resolved as usize))
        }
        "insert" => {
            let [index, item] = args.bind(&qualified, ["index", "object"], 2)?;
            let mut items = list.borrow_mut();
            interp.check_len(items.len() + 1)?;
            let len = items.len() as i64;
            let raw = optional_int(&index, "index", 0)?;
            let resolved = if raw < 0 { (raw + len).max(0) } else { raw.min(len) };
            items.insert(resolved as usize, item);
            Ok(Value::None)
        }
        "index" | "count" => {
            let items = list.borrow().clone();
            interp.tick_n(items.len() as u64)?;
            sequence_method(&items, name, args, "list")
        }
        "copy" => {
            args.bind(&qualified, [], 0)?;
            Ok(Value::list(list.borrow().clone()))
        }
        "reverse" => {
            args.bind(&qualified, [], 0)?;
            list.borrow_mut().reverse();
            Ok(Value::None)
        }
        "sort" => {
            let [key, reverse] = args.bind(&qualified, ["key", "reverse"], 0)?;
            let items = list.borrow().clone();
            let sorted = sort_values(interp, items, &key, reverse.truthy())?;
            *list.borrow_mut() = sorted;
            Ok(Value::None)
        }
        _ => Err(no_method(receiver, name)),
    }
}

/// Stable sort by `key` (identity when `None`)
pub(crate) fn sort_values(
    interp: &mut Interpreter<'_>,
    items: Vec<Value>,
    key: &Value,
    reverse: bool,
) -> EvalResult<Vec<Value>> {
    interp.tick_n(items.len() as u64)?;
    let mut keyed = Vec::with_capacity(items.len());
    for item in items {
        let sort_key = match key {
            Value::None => item.clone(),
            func => interp.call(func, CallArgs::positional(vec![item.clone()]))?,
        };
        keyed.push((sort_key, item));
    }
    let mut failure = None;
    keyed.sort_by(|(a, _), (b, _)| {
        let (first, second) = if reverse { (b, a) } else { (a, b) };
        match first.compare(second) {
            Ok(ordering) => ordering,
            Err(err) => {
                failure.get_or_insert(err);
                Ordering::Equal
            }
        }
    });
    match failure {
        Some(err) => Err(err),
        None => Ok(keyed.into_iter().map(|(_, item)| item).collect()),
    }
}

fn dict_method(
    interp: &mut Interpreter<'_>,
    receiver: &Value,
    name: &str,
    args: CallArgs,
) -> EvalResult<Value> {
    let Value::Dict(table) = receiver else {
        return Err(no_method(receiver, name));
    };
    let qualified = format!("dict.{}", name);
    match name {
        "keys" => {
            args.bind(&qualified, [], 0)?;
            Ok(Value::list(table.borrow().keys().cloned().collect()))
        }
        "values" => {
            args.bind(&qualified, [], 0)?;
            Ok(Value::list(table.borrow().values().cloned().collect()))
        }
        "items" => {
            args.bind(&qualified, [], 0)?;
            Ok(Value::list(
                table
                    .borrow()
                    .entries()
                    .map(|(k, v)| Value::tuple(vec![k.clone(), v.clone()]))
                    .collect(),
            ))
        }
        "get" => {
            let [key, default] = args.bind(&qualified, ["key", "default"], 1)?;
            Ok(table.borrow().get(&key)?.unwrap_or(default))
        }
        "update" => {
            let mut args = args;
            let keywords = std::mem::take(&mut args.keywords);
            let [other] = args.bind(&qualified, ["other"], 0)?;
            let mut pairs = match &other {
                Value::None => Vec::new(),
                Value::Dict(source) => source
                    .borrow()
                    .entries()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
                iterable => pairs_of(interp, iterable)?,
            };
            pairs.extend(keywords.into_iter().map(|(k, v)| (Value::str(k), v)));
            let mut table = table.borrow_mut();
            for (k, v) in pairs {
                table.insert(k, v)?;
            }
            interp.check_len(table.len())?;
            Ok(Value::None)
        }
        "copy" => {
            args.bind(&qualified, [], 0)?;
            Ok(Value::dict(table.borrow().clone()))
        }
        _ => Err(no_method(receiver, name)),
    }
}

/// Key/value pairs from an iterable of two-item sequences
pub(crate) fn pairs_of(
    interp: &mut Interpreter<'_>,
    iterable: &Value,
) -> EvalResult<Vec<(Value, Value)>> {
    let mut pairs = Vec::new();
    for (i, item) in interp.iterate(iterable)?.into_iter().enumerate() {
        let parts = interp.iterate(&item)?;
        match <[Value; 2]>::try_from(parts) {
            Ok([k, v]) => pairs.push((k, v)),
            Err(parts) => {
                return Err(EvalError::value_error(format!(
                    "dictionary update sequence element #{} has length {}; 2 is required",
                    i,
                    parts.len()
                )))
            }
        }
    }
    Ok(pairs)
}

fn set_method(
    interp: &mut Interpreter<'_>,
    receiver: &Value,
    name: &str,
    args: CallArgs,
) -> EvalResult<Value> {
    let Value::Set(table) = receiver else {
        return Err(no_method(receiver, name));
    };
    let qualified = format!("set.{}", name);
    match name {
        "add" => {
            let [member] = args.bind(&qualified, ["elem"], 1)?;
            let mut table = table.borrow_mut();
            table.add(member)?;
            interp.check_len(table.len())?;
            Ok(Value::None)
        }
        "union" | "intersection" => {
            args.reject_keywords(&qualified)?;
            let mut result = table.borrow().clone();
            for other in &args.positional {
                let members = interp.iterate(other)?;
                if name == "union" {
                    for member in members {
                        result.add(member)?;
                    }
                    interp.check_len(result.len())?;
                } else {
                    let other = Table::from_members(members)?;
                    let mut kept = Table::new();
                    for member in result.keys() {
                        if other.contains(member)? {
                            kept.add(member.clone())?;
                        }
                    }
                    result = kept;
                }
            }
            Ok(Value::set(result))
        }
        _ => Err(no_method(receiver, name)),
    }
}

fn kb_method(
    interp: &mut Interpreter<'_>,
    receiver: &Value,
    name: &str,
    args: CallArgs,
) -> EvalResult<Value> {
    let qualified = format!("{}.{}", receiver.type_name(), name);
    let mut budget = interp.budget();
    match (receiver, name) {
        (Value::FolKb(kb), "tell") => {
            let [sentence] = args.bind(&qualified, ["sentence"], 1)?;
            kb.borrow_mut().tell(to_logic(&sentence)?)?;
            Ok(Value::None)
        }
        (Value::PropKb(kb), "tell") => {
            let [sentence] = args.bind(&qualified, ["sentence"], 1)?;
            kb.borrow_mut().tell(&to_logic(&sentence)?, &mut budget)?;
            Ok(Value::None)
        }
        (Value::FolKb(kb), "retract") => {
            let [sentence] = args.bind(&qualified, ["sentence"], 1)?;
            kb.borrow_mut().retract(&to_logic(&sentence)?);
            Ok(Value::None)
        }
        (Value::PropKb(kb), "retract") => {
            let [sentence] = args.bind(&qualified, ["sentence"], 1)?;
            kb.borrow_mut().retract(&to_logic(&sentence)?, &mut budget)?;
            Ok(Value::None)
        }
        (Value::FolKb(kb), "ask") => {
            let [query] = args.bind(&qualified, ["query"], 1)?;
            let answer = kb.borrow().ask(&to_logic(&query)?, &mut budget)?;
            first_answer(answer)
        }
        (Value::PropKb(kb), "ask") => {
            let [query] = args.bind(&qualified, ["query"], 1)?;
            let answer = kb.borrow().ask(&to_logic(&query)?, &mut budget)?;
            first_answer(answer)
        }
        (Value::FolKb(kb), "ask_all" | "ask_generator") => {
            let [query] = args.bind(&qualified, ["query"], 1)?;
            let answers = kb.borrow().ask_all(&to_logic(&query)?, &mut budget)?;
            answer_list(interp, &answers)
        }
        (Value::PropKb(kb), "ask_all" | "ask_generator") => {
            let [query] = args.bind(&qualified, ["query"], 1)?;
            let answers: Vec<Substitution> = kb
                .borrow()
                .ask(&to_logic(&query)?, &mut budget)?
                .into_iter()
                .collect();
            answer_list(interp, &answers)
        }
        (Value::PropKb(kb), "ask_if_true") => {
            let [query] = args.bind(&qualified, ["query"], 1)?;
            Ok(Value::Bool(
                kb.borrow().ask_if_true(&to_logic(&query)?, &mut budget)?,
            ))
        }
        _ => Err(no_method(receiver, name)),
    }
}

/// A knowledge base answer: the substitution, or `False`
fn first_answer(answer: Option<Substitution>) -> EvalResult<Value> {
    match answer {
        Some(theta) => substitution_to_value(&theta),
        None => Ok(Value::Bool(false)),
    }
}

pub(crate) fn answer_list(
    interp: &mut Interpreter<'_>,
    answers: &[Substitution],
) -> EvalResult<Value> {
    interp.check_len(answers.len())?;
    let items = answers
        .iter()
        .map(substitution_to_value)
        .collect::<EvalResult<Vec<_>>>()?;
    Ok(Value::list(items))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::Environment;
    use crate::limits::ResourceLimits;
    use crate::parser::{parse_expression, parse_statements};
    use crate::policy::AllowList;
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
    fn test_string_methods() {
        assert_eq!(repr(&["'  Flu  '.strip().upper()"]), "'FLU'");
        assert_eq!(repr(&["'a, b,c'.split(',')"]), "['a', ' b', 'c']");
        assert_eq!(repr(&["' a  b c '.split(None, 1)"]), "['a', 'b c ']");
        assert_eq!(repr(&["'-'.join(['x', 'y'])"]), "'x-y'");
        assert_eq!(repr(&["'fever'.find('v'), 'fever'.count('e')"]), "(2, 2)");
        assert_eq!(repr(&["'HasFlu'.startswith(('Has', 'Is'))"]), "True");
        assert_matches!(
            run(&["'-'.join([1])"]),
            Err(EvalError::Runtime { error_type: "TypeError", .. })
        );
    }

    #[test]
    fn test_list_methods() {
        assert_eq!(
            repr(&[
                "xs = [3, 1, 2]",
                "xs.append(0); xs.insert(0, 9); last = xs.pop()",
                "xs.sort(reverse=True)",
                "xs, last, xs.index(1)",
            ]),
            "([9, 3, 2, 1], 0, 3)"
        );
        assert_eq!(
            repr(&["words = ['bb', 'a', 'ccc']", "words.sort(key=len)", "words"]),
            "['a', 'bb', 'ccc']"
        );
        assert_matches!(
            run(&["[].pop()"]),
            Err(EvalError::Runtime { error_type: "IndexError", .. })
        );
    }

    #[test]
    fn test_dict_and_set_methods() {
        assert_eq!(
            repr(&[
                "d = {'a': 1}",
                "d.update([('b', 2)], c=3)",
                "d.items(), d.get('z', 0)",
            ]),
            "([('a', 1), ('b', 2), ('c', 3)], 0)"
        );
        assert_eq!(
            repr(&["s = {1, 2}", "s.add(3)", "s.union([4]), s.intersection({2, 3, 5})"]),
            "({1, 2, 3, 4}, {2, 3})"
        );
    }

    #[test]
    fn test_private_attributes_are_unreachable() {
        assert_matches!(
            run(&["'x'.__class__"]),
            Err(EvalError::Runtime { error_type: "AttributeError", .. })
        );
        assert_matches!(
            run(&["[].nope"]),
            Err(EvalError::Runtime { error_type: "AttributeError", .. })
        );
    }

    #[test]
    fn test_expression_attributes() {
        assert_eq!(repr(&["e = expr('Fever(Ahmad)')", "e.op, e.args"]), "('Fever', (Ahmad,))");
    }

    #[test]
    fn test_knowledge_base_methods() {
        assert_eq!(
            repr(&[
                "kb = FolKB()",
                "kb.tell('Fever(Ahmad)'); kb.tell('Fever(Leila)')",
                "kb.tell(expr('Fever(x) ==> Sick(x)'))",
                "kb.ask('Sick(y)'), kb.ask('Sick(Omar)'), len(kb.ask_all('Sick(y)')), len(kb.clauses)",
            ]),
            "({'y': Ahmad}, False, 2, 3)"
        );
        assert_matches!(
            run(&["kb = FolKB()", "kb.tell('P | Q')"]),
            Err(EvalError::Runtime { error_type: "ValueError", .. })
        );

        assert_eq!(
            repr(&[
                "kb = PropKB()",
                "kb.tell('P ==> Q'); kb.tell('P')",
                "kb.ask_if_true('Q'), kb.ask('Q'), kb.ask('R')",
            ]),
            "(True, {}, False)"
        );
    }
}
