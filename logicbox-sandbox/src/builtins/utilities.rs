//! General-purpose helpers: conversions, collections, iteration and output

use super::CallArgs;
use crate::ast::BinOp;
use crate::error::{EvalError, EvalResult};
use crate::interpreter::Interpreter;
use crate::methods::{pairs_of, sort_values};
use crate::value::{Number, Table, Value};
use std::cmp::Ordering;

pub(super) fn len(_interp: &mut Interpreter<'_>, args: CallArgs) -> EvalResult<Value> {
    let [obj] = args.bind("len", ["obj"], 1)?;
    let n = match &obj {
        Value::Str(s) => s.chars().count(),
        Value::List(items) => items.borrow().len(),
        Value::Tuple(items) => items.len(),
        Value::Set(table) | Value::Dict(table) => table.borrow().len(),
        other => {
            return Err(EvalError::type_error(format!(
                "object of type '{}' has no len()",
                other.type_name()
            )))
        }
    };
    Ok(Value::Int(n as i64))
}

pub(super) fn str(interp: &mut Interpreter<'_>, args: CallArgs) -> EvalResult<Value> {
    if args.positional.is_empty() && args.keywords.is_empty() {
        return Ok(Value::str(""));
    }
    let [obj] = args.bind("str", ["object"], 1)?;
    if let Value::Str(_) = obj {
        return Ok(obj);
    }
    let text = obj.to_string();
    interp.check_str_len(text.len())?;
    Ok(Value::str(text))
}

pub(super) fn repr(interp: &mut Interpreter<'_>, args: CallArgs) -> EvalResult<Value> {
    let [obj] = args.bind("repr", ["obj"], 1)?;
    let text = obj.repr();
    interp.check_str_len(text.len())?;
    Ok(Value::str(text))
}

pub(super) fn int(_interp: &mut Interpreter<'_>, args: CallArgs) -> EvalResult<Value> {
    if args.positional.is_empty() && args.keywords.is_empty() {
        return Ok(Value::Int(0));
    }
    let [x] = args.bind("int", ["x"], 1)?;
    match &x {
        Value::Bool(b) => Ok(Value::Int(i64::from(*b))),
        Value::Int(v) => Ok(Value::Int(*v)),
        Value::Float(v) => float_to_int(*v),
        Value::Str(s) => {
            let cleaned = s.trim().replace('_', "");
            cleaned.parse::<i64>().map(Value::Int).map_err(|_| {
                EvalError::value_error(format!(
                    "invalid literal for int() with base 10: {}",
                    x.repr()
                ))
            })
        }
        other => Err(EvalError::type_error(format!(
            "int() argument must be a string or a number, not '{}'",
            other.type_name()
        ))),
    }
}

fn float_to_int(v: f64) -> EvalResult<Value> {
    if v.is_nan() {
        return Err(EvalError::value_error("cannot convert float NaN to integer"));
    }
    let truncated = v.trunc();
    if truncated < i64::MIN as f64 || truncated >= i64::MAX as f64 {
        return Err(EvalError::overflow("cannot convert float to integer"));
    }
    Ok(Value::Int(truncated as i64))
}

pub(super) fn float(_interp: &mut Interpreter<'_>, args: CallArgs) -> EvalResult<Value> {
    if args.positional.is_empty() && args.keywords.is_empty() {
        return Ok(Value::Float(0.0));
    }
    let [x] = args.bind("float", ["x"], 1)?;
    match &x {
        Value::Str(s) => s.trim().parse::<f64>().map(Value::Float).map_err(|_| {
            EvalError::value_error(format!("could not convert string to float: {}", x.repr()))
        }),
        other => match other.as_number() {
            Some(n) => Ok(Value::Float(n.as_f64())),
            None => Err(EvalError::type_error(format!(
                "float() argument must be a string or a number, not '{}'",
                other.type_name()
            ))),
        },
    }
}

pub(super) fn bool(_interp: &mut Interpreter<'_>, args: CallArgs) -> EvalResult<Value> {
    let [x] = args.bind("bool", ["x"], 0)?;
    Ok(Value::Bool(x.truthy()))
}

pub(super) fn list(interp: &mut Interpreter<'_>, args: CallArgs) -> EvalResult<Value> {
    let [iterable] = args.bind("list", ["iterable"], 0)?;
    Ok(Value::list(items_or_empty(interp, &iterable)?))
}

pub(super) fn tuple(interp: &mut Interpreter<'_>, args: CallArgs) -> EvalResult<Value> {
    let [iterable] = args.bind("tuple", ["iterable"], 0)?;
    Ok(Value::tuple(items_or_empty(interp, &iterable)?))
}

pub(super) fn set(interp: &mut Interpreter<'_>, args: CallArgs) -> EvalResult<Value> {
    let [iterable] = args.bind("set", ["iterable"], 0)?;
    Ok(Value::set(Table::from_members(items_or_empty(
        interp, &iterable,
    )?)?))
}

fn items_or_empty(interp: &mut Interpreter<'_>, iterable: &Value) -> EvalResult<Vec<Value>> {
    match iterable {
        Value::None => Ok(Vec::new()),
        other => interp.iterate(other),
    }
}

pub(super) fn dict(interp: &mut Interpreter<'_>, mut args: CallArgs) -> EvalResult<Value> {
    let keywords = std::mem::take(&mut args.keywords);
    let [source] = args.bind("dict", ["iterable"], 0)?;
    let mut table = match &source {
        Value::None => Table::new(),
        Value::Dict(other) => other.borrow().clone(),
        iterable => {
            let mut table = Table::new();
            for (k, v) in pairs_of(interp, iterable)? {
                table.insert(k, v)?;
            }
            table
        }
    };
    for (name, value) in keywords {
        table.insert(Value::str(name), value)?;
    }
    interp.check_len(table.len())?;
    Ok(Value::dict(table))
}

pub(super) fn range(interp: &mut Interpreter<'_>, args: CallArgs) -> EvalResult<Value> {
    args.reject_keywords("range")?;
    let bounds = args
        .positional
        .iter()
        .map(|v| {
            v.as_int().ok_or_else(|| {
                EvalError::type_error(format!(
                    "'{}' object cannot be interpreted as an integer",
                    v.type_name()
                ))
            })
        })
        .collect::<EvalResult<Vec<i64>>>()?;
    let (start, stop, step) = match bounds.as_slice() {
        [stop] => (0, *stop, 1),
        [start, stop] => (*start, *stop, 1),
        [start, stop, step] => (*start, *stop, *step),
        _ => {
            return Err(EvalError::type_error(format!(
                "range expected 1 to 3 arguments, got {}",
                bounds.len()
            )))
        }
    };
    if step == 0 {
        return Err(EvalError::value_error("range() arg 3 must not be zero"));
    }
    let span = if step > 0 {
        i128::from(stop) - i128::from(start)
    } else {
        i128::from(start) - i128::from(stop)
    };
    let count = if span <= 0 {
        0
    } else {
        let step = i128::from(step).abs();
        (span + step - 1) / step
    };
    let count = usize::try_from(count).unwrap_or(usize::MAX);
    interp.check_len(count)?;
    interp.tick_n(count as u64)?;
    let items = (0..count)
        .map(|i| Value::Int(start + step * i as i64))
        .collect();
    Ok(Value::list(items))
}

pub(super) fn enumerate(interp: &mut Interpreter<'_>, args: CallArgs) -> EvalResult<Value> {
    let [iterable, start] = args.bind("enumerate", ["iterable", "start"], 1)?;
    let start = match start {
        Value::None => 0,
        other => other
            .as_int()
            .ok_or_else(|| EvalError::type_error("enumerate() start must be an integer"))?,
    };
    let items = interp.iterate(&iterable)?;
    Ok(Value::list(
        items
            .into_iter()
            .zip(start..)
            .map(|(item, i)| Value::tuple(vec![Value::Int(i), item]))
            .collect(),
    ))
}

pub(super) fn zip(interp: &mut Interpreter<'_>, args: CallArgs) -> EvalResult<Value> {
    args.reject_keywords("zip")?;
    let columns = args
        .positional
        .iter()
        .map(|iterable| interp.iterate(iterable))
        .collect::<EvalResult<Vec<_>>>()?;
    let rows = columns.iter().map(Vec::len).min().unwrap_or(0);
    Ok(Value::list(
        (0..rows)
            .map(|row| Value::tuple(columns.iter().map(|c| c[row].clone()).collect()))
            .collect(),
    ))
}

pub(super) fn map(interp: &mut Interpreter<'_>, args: CallArgs) -> EvalResult<Value> {
    args.reject_keywords("map")?;
    let mut positional = args.positional.into_iter();
    let (Some(function), Some(first)) = (positional.next(), positional.next()) else {
        return Err(EvalError::type_error("map() must have at least two arguments."));
    };
    let mut columns = vec![interp.iterate(&first)?];
    for iterable in positional {
        columns.push(interp.iterate(&iterable)?);
    }
    let rows = columns.iter().map(Vec::len).min().unwrap_or(0);
    let mut results = Vec::with_capacity(rows);
    for row in 0..rows {
        let call_args = CallArgs::positional(columns.iter().map(|c| c[row].clone()).collect());
        results.push(interp.call(&function, call_args)?);
    }
    Ok(Value::list(results))
}

pub(super) fn filter(interp: &mut Interpreter<'_>, args: CallArgs) -> EvalResult<Value> {
    let [function, iterable] = args.bind("filter", ["function", "iterable"], 2)?;
    let mut kept = Vec::new();
    for item in interp.iterate(&iterable)? {
        let keep = match &function {
            Value::None => item.truthy(),
            f => interp.call(f, CallArgs::positional(vec![item.clone()]))?.truthy(),
        };
        if keep {
            kept.push(item);
        }
    }
    Ok(Value::list(kept))
}

pub(super) fn all(interp: &mut Interpreter<'_>, args: CallArgs) -> EvalResult<Value> {
    let [iterable] = args.bind("all", ["iterable"], 1)?;
    Ok(Value::Bool(interp.iterate(&iterable)?.iter().all(Value::truthy)))
}

pub(super) fn any(interp: &mut Interpreter<'_>, args: CallArgs) -> EvalResult<Value> {
    let [iterable] = args.bind("any", ["iterable"], 1)?;
    Ok(Value::Bool(interp.iterate(&iterable)?.iter().any(Value::truthy)))
}

pub(super) fn sum(interp: &mut Interpreter<'_>, args: CallArgs) -> EvalResult<Value> {
    let [iterable, start] = args.bind("sum", ["iterable", "start"], 1)?;
    let mut total = match start {
        Value::None => Value::Int(0),
        Value::Str(_) => {
            return Err(EvalError::type_error(
                "sum() can't sum strings [use ''.join(seq) instead]",
            ))
        }
        other => other,
    };
    for item in interp.iterate(&iterable)? {
        total = interp.binary(BinOp::Add, total, item)?;
    }
    Ok(total)
}

pub(super) fn max(interp: &mut Interpreter<'_>, args: CallArgs) -> EvalResult<Value> {
    extreme(interp, args, "max", Ordering::Greater)
}

pub(super) fn min(interp: &mut Interpreter<'_>, args: CallArgs) -> EvalResult<Value> {
    extreme(interp, args, "min", Ordering::Less)
}

/// `max`/`min`: the first item whose key beats every other in direction `wanted`
fn extreme(
    interp: &mut Interpreter<'_>,
    mut args: CallArgs,
    name: &str,
    wanted: Ordering,
) -> EvalResult<Value> {
    let key = args.take_keyword("key").unwrap_or(Value::None);
    let default = args.take_keyword("default");
    args.reject_keywords(name)?;
    let items = match args.positional.len() {
        0 => {
            return Err(EvalError::type_error(format!(
                "{} expected at least 1 argument, got 0",
                name
            )))
        }
        1 => {
            let iterable = args.positional.remove(0);
            interp.iterate(&iterable)?
        }
        _ => args.positional,
    };
    let mut best: Option<(Value, Value)> = None;
    for item in items {
        let item_key = match &key {
            Value::None => item.clone(),
            f => interp.call(f, CallArgs::positional(vec![item.clone()]))?,
        };
        let better = match &best {
            None => true,
            Some((best_key, _)) => item_key.compare(best_key)? == wanted,
        };
        if better {
            best = Some((item_key, item));
        }
    }
    match (best, default) {
        (Some((_, item)), _) => Ok(item),
        (None, Some(default)) => Ok(default),
        (None, None) => Err(EvalError::value_error(format!(
            "{}() arg is an empty sequence",
            name
        ))),
    }
}

pub(super) fn abs(_interp: &mut Interpreter<'_>, args: CallArgs) -> EvalResult<Value> {
    let [x] = args.bind("abs", ["x"], 1)?;
    match x.as_number() {
        Some(Number::Int(v)) => v
            .checked_abs()
            .map(Value::Int)
            .ok_or_else(|| EvalError::overflow("integer overflow in abs()")),
        Some(Number::Float(v)) => Ok(Value::Float(v.abs())),
        None => Err(EvalError::type_error(format!(
            "bad operand type for abs(): '{}'",
            x.type_name()
        ))),
    }
}

/// Round half to even
pub(super) fn round(_interp: &mut Interpreter<'_>, args: CallArgs) -> EvalResult<Value> {
    let [number, ndigits] = args.bind("round", ["number", "ndigits"], 1)?;
    let ndigits = match ndigits {
        Value::None => None,
        other => Some(
            other
                .as_int()
                .ok_or_else(|| EvalError::type_error("round() ndigits must be an integer"))?,
        ),
    };
    match (number.as_number(), ndigits) {
        (Some(Number::Int(v)), None) => Ok(Value::Int(v)),
        (Some(Number::Int(v)), Some(n)) if n >= 0 => Ok(Value::Int(v)),
        (Some(Number::Int(v)), Some(n)) => {
            let Some(unit) = u32::try_from(-n).ok().and_then(|e| 10i64.checked_pow(e)) else {
                return Ok(Value::Int(0));
            };
            let floor = v.div_euclid(unit) * unit;
            let rest = v - floor;
            let rounded = match (rest * 2).cmp(&unit) {
                Ordering::Less => floor,
                Ordering::Greater => floor + unit,
                Ordering::Equal if (floor / unit) % 2 == 0 => floor,
                Ordering::Equal => floor + unit,
            };
            Ok(Value::Int(rounded))
        }
        (Some(Number::Float(v)), None) => float_to_int(v.round_ties_even()),
        (Some(Number::Float(v)), Some(n)) => {
            if !v.is_finite() {
                return Ok(Value::Float(v));
            }
            let factor = 10f64.powi(n.clamp(-308, 308) as i32);
            let rounded = (v * factor).round_ties_even() / factor;
            Ok(Value::Float(if rounded.is_finite() { rounded } else { v }))
        }
        (None, _) => Err(EvalError::type_error(format!(
            "type {} doesn't define __round__ method",
            number.type_name()
        ))),
    }
}

pub(super) fn sorted(interp: &mut Interpreter<'_>, args: CallArgs) -> EvalResult<Value> {
    let [iterable, key, reverse] = args.bind("sorted", ["iterable", "key", "reverse"], 1)?;
    let items = interp.iterate(&iterable)?;
    Ok(Value::list(sort_values(interp, items, &key, reverse.truthy())?))
}

pub(super) fn reversed(interp: &mut Interpreter<'_>, args: CallArgs) -> EvalResult<Value> {
    let [sequence] = args.bind("reversed", ["sequence"], 1)?;
    if let Value::Set(_) = sequence {
        return Err(EvalError::type_error("'set' object is not reversible"));
    }
    let mut items = interp.iterate(&sequence)?;
    items.reverse();
    Ok(Value::list(items))
}

pub(super) fn print(interp: &mut Interpreter<'_>, mut args: CallArgs) -> EvalResult<Value> {
    let sep = text_keyword(&mut args, "sep", " ")?;
    let end = text_keyword(&mut args, "end", "\n")?;
    args.reject_keywords("print")?;
    let line = args
        .positional
        .iter()
        .map(Value::to_string)
        .collect::<Vec<_>>()
        .join(&sep);
    interp.write_stdout(&line)?;
    interp.write_stdout(&end)?;
    Ok(Value::None)
}

fn text_keyword(args: &mut CallArgs, name: &str, default: &str) -> EvalResult<String> {
    match args.take_keyword(name) {
        None | Some(Value::None) => Ok(default.to_string()),
        Some(Value::Str(s)) => Ok(s.to_string()),
        Some(other) => Err(EvalError::type_error(format!(
            "{} must be None or a string, not {}",
            name,
            other.type_name()
        ))),
    }
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

    fn run_with_stdout(lines: &[&str]) -> (EvalResult<Value>, String) {
        let env = Environment::build(Arc::new(AllowList::default().resolve().unwrap()));
        let limits = ResourceLimits::default();
        let mut interp = Interpreter::new(&env, &limits, None);
        let (last, statements) = lines.split_last().unwrap();
        for line in statements {
            for stmt in parse_statements(line, 1).unwrap() {
                if let Err(err) = interp.execute(&stmt) {
                    return (Err(err), interp.take_stdout());
                }
            }
        }
        let result = interp.evaluate(&parse_expression(last, 1).unwrap());
        (result, interp.take_stdout())
    }

    fn run(lines: &[&str]) -> EvalResult<Value> {
        run_with_stdout(lines).0
    }

    fn repr(lines: &[&str]) -> String {
        run(lines).unwrap().repr()
    }

    #[test]
    fn test_conversions() {
        assert_eq!(repr(&["int('42'), int(3.9), int(-3.9), int(True)"]), "(42, 3, -3, 1)");
        assert_eq!(repr(&["float('2.5'), float(1), bool([]), bool('x')"]), "(2.5, 1.0, False, True)");
        assert_eq!(repr(&["str(1.0), str(expr('P & Q')), repr('a')"]), "('1.0', '(P & Q)', \"'a'\")");
        assert_matches!(
            run(&["int('seven')"]),
            Err(EvalError::Runtime { error_type: "ValueError", .. })
        );
    }

    #[test]
    fn test_collections() {
        assert_eq!(repr(&["list('ab'), tuple([1]), len({1, 1, 2})"]), "(['a', 'b'], (1,), 2)");
        assert_eq!(repr(&["dict([('a', 1)], b=2)"]), "{'a': 1, 'b': 2}");
        assert_eq!(repr(&["list(), dict(), set()"]), "([], {}, set())");
        assert_matches!(
            run(&["len(5)"]),
            Err(EvalError::Runtime { error_type: "TypeError", .. })
        );
    }

    #[test]
    fn test_range() {
        assert_eq!(repr(&["range(4)"]), "[0, 1, 2, 3]");
        assert_eq!(repr(&["range(10, 0, -3)"]), "[10, 7, 4, 1]");
        assert_eq!(repr(&["range(2, 2)"]), "[]");
        assert_matches!(
            run(&["range(1, 2, 0)"]),
            Err(EvalError::Runtime { error_type: "ValueError", .. })
        );
        assert_matches!(
            run(&["range(10 ** 12)"]),
            Err(EvalError::Runtime { error_type: "ResourceLimitError", .. })
        );
    }

    #[test]
    fn test_iteration_helpers() {
        assert_eq!(
            repr(&["enumerate('ab', 1), zip([1, 2, 3], 'xy')"]),
            "([(1, 'a'), (2, 'b')], [(1, 'x'), (2, 'y')])"
        );
        assert_eq!(
            repr(&["map(lambda a, b: a * b, [1, 2], [3, 4]), filter(None, [0, 1, '', 'x'])"]),
            "([3, 8], [1, 'x'])"
        );
        assert_eq!(repr(&["all([]), any([0, None]), reversed((1, 2))"]), "(True, False, [2, 1])");
    }

    #[test]
    fn test_aggregates() {
        assert_eq!(repr(&["sum([1, 2.5]), sum(x * x for x in range(4))"]), "(3.5, 14)");
        assert_eq!(repr(&["max(3, 9, 4), min([5, 2, 8]), max(['bb', 'a'], key=len)"]), "(9, 2, 'bb')");
        assert_eq!(repr(&["max([], default=0)"]), "0");
        assert_matches!(
            run(&["min([])"]),
            Err(EvalError::Runtime { error_type: "ValueError", .. })
        );
        assert_eq!(repr(&["sorted([3, 1, 2], reverse=True), sorted('cab')"]), "([3, 2, 1], ['a', 'b', 'c'])");
    }

    #[test]
    fn test_numeric_helpers() {
        assert_eq!(repr(&["abs(-3), abs(-2.5), round(2.5), round(3.5), round(2.25, 1)"]), "(3, 2.5, 2, 4, 2.2)");
        assert_eq!(repr(&["round(1250, -2), round(1350, -2)"]), "(1200, 1400)");
    }

    #[test]
    fn test_print_writes_to_buffer() {
        let (result, stdout) = run_with_stdout(&["print('a', 1, sep='-')", "print('b', end='')"]);
        assert_matches!(result, Ok(Value::None));
        assert_eq!(stdout, "a-1\nb");
    }
}
