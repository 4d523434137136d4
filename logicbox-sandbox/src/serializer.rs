//! Conversion of a script result into a transport-safe JSON value.
//!
//! The conversion is total: primitives pass through, sequences become arrays
//! and everything else becomes its human-readable text. A sequence that
//! cannot be walked (it contains itself, or nests too deep) is rendered as
//! text instead.

use crate::value::{float_repr, Value, MAX_NESTING};
use serde_json::{Number, Value as Json};
use std::rc::Rc;

pub fn serialize(value: &Value) -> Json {
    let mut active = Vec::new();
    convert(value, &mut active)
}

fn convert(value: &Value, active: &mut Vec<usize>) -> Json {
    match value {
        Value::None => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Int(v) => Json::Number((*v).into()),
        Value::Float(v) => match Number::from_f64(*v) {
            Some(n) => Json::Number(n),
            None => Json::String(float_repr(*v)),
        },
        Value::Str(s) => Json::String(s.to_string()),
        Value::List(_) | Value::Tuple(_) | Value::Set(_) => {
            sequence(value, active).unwrap_or_else(|| Json::String(value.to_string()))
        }
        other => Json::String(other.to_string()),
    }
}

/// Array form of a sequence, or `None` when it cannot be traversed
fn sequence(value: &Value, active: &mut Vec<usize>) -> Option<Json> {
    let (id, items): (usize, Vec<Value>) = match value {
        Value::List(items) => (
            Rc::as_ptr(items) as *const () as usize,
            items.borrow().clone(),
        ),
        Value::Tuple(items) => (Rc::as_ptr(items) as *const () as usize, items.to_vec()),
        Value::Set(table) => (
            Rc::as_ptr(table) as *const () as usize,
            table.borrow().keys().cloned().collect(),
        ),
        _ => return None,
    };
    if active.len() >= MAX_NESTING || active.contains(&id) {
        return None;
    }
    active.push(id);
    let mut out = Vec::with_capacity(items.len());
    for item in &items {
        let converted = match item {
            Value::List(_) | Value::Tuple(_) | Value::Set(_) => match sequence(item, active) {
                Some(json) => json,
                None => {
                    active.pop();
                    return None;
                }
            },
            other => convert(other, active),
        };
        out.push(converted);
    }
    active.pop();
    Some(Json::Array(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Table;
    use logicbox_logic::{Expr, FolKb};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::cell::RefCell;

    #[test]
    fn test_primitives_pass_through() {
        assert_eq!(serialize(&Value::None), json!(null));
        assert_eq!(serialize(&Value::Bool(true)), json!(true));
        assert_eq!(serialize(&Value::Int(3)), json!(3));
        assert_eq!(serialize(&Value::Float(2.5)), json!(2.5));
        assert_eq!(serialize(&Value::str("text")), json!("text"));
    }

    #[test]
    fn test_non_finite_floats_become_text() {
        assert_eq!(serialize(&Value::Float(f64::INFINITY)), json!("inf"));
        assert_eq!(serialize(&Value::Float(f64::NAN)), json!("nan"));
    }

    #[test]
    fn test_sequences_flatten_recursively() {
        let nested = Value::list(vec![
            Value::Int(1),
            Value::tuple(vec![Value::str("a"), Value::None]),
            Value::set(Table::from_members([Value::Int(2)]).unwrap()),
        ]);
        assert_eq!(serialize(&nested), json!([1, ["a", null], [2]]));
    }

    #[test]
    fn test_opaque_values_become_text() {
        let e = Value::expr(Expr::parse("P & Q").unwrap());
        assert_eq!(serialize(&e), json!("(P & Q)"));
        let kb = Value::FolKb(Rc::new(RefCell::new(FolKb::new())));
        assert_eq!(serialize(&kb), json!("FolKB(0 clauses)"));

        let mut table = Table::new();
        table.insert(Value::str("x"), Value::expr(Expr::symbol("A"))).unwrap();
        assert_eq!(serialize(&Value::dict(table)), json!("{'x': A}"));
        assert_eq!(
            serialize(&Value::list(vec![e])),
            json!(["(P & Q)"])
        );
    }

    #[test]
    fn test_cyclic_sequence_falls_back_to_text() {
        let list = Value::list(vec![Value::Int(1)]);
        if let Value::List(items) = &list {
            items.borrow_mut().push(list.clone());
        }
        assert_eq!(serialize(&list), json!("[1, [...]]"));
        if let Value::List(items) = &list {
            items.borrow_mut().clear();
        }
    }

    #[test]
    fn test_deep_nesting_falls_back_to_text() {
        let mut value = Value::Int(0);
        for _ in 0..(MAX_NESTING + 5) {
            value = Value::list(vec![value]);
        }
        assert!(serialize(&value).is_string());
    }
}
