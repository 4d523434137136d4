//! Operator semantics over numbers, sequences, sets and logic expressions

use crate::ast::{BinOp, CmpOp, UnaryOp};
use crate::builtins::to_logic;
use crate::error::{EvalError, EvalResult};
use crate::interpreter::Interpreter;
use crate::value::{Number, Table, Value};
use logicbox_logic::{Expr as LogicExpr, IMPLIES, REVERSE_IMPLIES};
use std::cmp::Ordering;

impl Interpreter<'_> {
    pub(crate) fn binary(&mut self, op: BinOp, left: Value, right: Value) -> EvalResult<Value> {
        if matches!(left, Value::Expr(_)) || matches!(right, Value::Expr(_)) {
            return logic_binary(op, &left, &right);
        }
        if let (Some(a), Some(b)) = (left.as_number(), right.as_number()) {
            return match op {
                BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor | BinOp::LShift | BinOp::RShift => {
                    bitwise(op, &left, &right)
                }
                _ => arithmetic(op, a, b),
            };
        }
        match (op, &left, &right) {
            (BinOp::Add, Value::Str(a), Value::Str(b)) => {
                self.check_str_len(a.len() + b.len())?;
                Ok(Value::str(format!("{}{}", a, b)))
            }
            (BinOp::Add, Value::List(a), Value::List(b)) => {
                let mut items = a.borrow().clone();
                items.extend(b.borrow().iter().cloned());
                self.check_len(items.len())?;
                Ok(Value::list(items))
            }
            (BinOp::Add, Value::Tuple(a), Value::Tuple(b)) => {
                let items: Vec<Value> = a.iter().chain(b.iter()).cloned().collect();
                self.check_len(items.len())?;
                Ok(Value::tuple(items))
            }
            (BinOp::Mul, seq, Value::Int(_) | Value::Bool(_))
                if matches!(seq, Value::Str(_) | Value::List(_) | Value::Tuple(_)) =>
            {
                self.repeat(seq, right.as_int().unwrap_or(0))
            }
            (BinOp::Mul, Value::Int(_) | Value::Bool(_), seq)
                if matches!(seq, Value::Str(_) | Value::List(_) | Value::Tuple(_)) =>
            {
                self.repeat(seq, left.as_int().unwrap_or(0))
            }
            (BinOp::BitOr | BinOp::BitAnd | BinOp::Sub | BinOp::BitXor, Value::Set(a), Value::Set(b)) => {
                let (a, b) = (a.borrow(), b.borrow());
                let members: Vec<Value> = match op {
                    BinOp::BitOr => a.keys().chain(b.keys()).cloned().collect(),
                    BinOp::BitAnd => filter_members(&a, &b, true)?,
                    BinOp::Sub => filter_members(&a, &b, false)?,
                    _ => {
                        let mut members = filter_members(&a, &b, false)?;
                        members.extend(filter_members(&b, &a, false)?);
                        members
                    }
                };
                self.tick_n(members.len() as u64)?;
                self.check_len(members.len())?;
                Ok(Value::set(Table::from_members(members)?))
            }
            _ => Err(unsupported(op.symbol(), &left, &right)),
        }
    }

    fn repeat(&mut self, seq: &Value, count: i64) -> EvalResult<Value> {
        let count = usize::try_from(count).unwrap_or(0);
        match seq {
            Value::Str(s) => {
                let total = s.len().checked_mul(count).unwrap_or(usize::MAX);
                self.check_str_len(total)?;
                Ok(Value::str(s.repeat(count)))
            }
            Value::List(items) => {
                let items = items.borrow();
                let total = items.len().checked_mul(count).unwrap_or(usize::MAX);
                self.check_len(total)?;
                self.tick_n(total as u64)?;
                Ok(Value::list(items.iter().cloned().cycle().take(total).collect()))
            }
            Value::Tuple(items) => {
                let total = items.len().checked_mul(count).unwrap_or(usize::MAX);
                self.check_len(total)?;
                self.tick_n(total as u64)?;
                Ok(Value::tuple(items.iter().cloned().cycle().take(total).collect()))
            }
            other => Err(EvalError::type_error(format!(
                "can't multiply sequence of type '{}'",
                other.type_name()
            ))),
        }
    }

    pub(crate) fn unary(&mut self, op: UnaryOp, operand: Value) -> EvalResult<Value> {
        if let Value::Expr(e) = &operand {
            let e = e.as_ref().clone();
            let e = match op {
                UnaryOp::Invert => e.negate(),
                UnaryOp::Neg => LogicExpr::new("-", vec![e]),
                UnaryOp::Pos => LogicExpr::new("+", vec![e]),
            };
            return Ok(Value::expr(e.bounded()?));
        }
        match (op, operand.as_number()) {
            (UnaryOp::Neg, Some(Number::Int(v))) => v
                .checked_neg()
                .map(Value::Int)
                .ok_or_else(|| EvalError::overflow("integer overflow")),
            (UnaryOp::Neg, Some(Number::Float(v))) => Ok(Value::Float(-v)),
            (UnaryOp::Pos, Some(Number::Int(v))) => Ok(Value::Int(v)),
            (UnaryOp::Pos, Some(Number::Float(v))) => Ok(Value::Float(v)),
            (UnaryOp::Invert, Some(Number::Int(v))) => Ok(Value::Int(!v)),
            _ => {
                let symbol = match op {
                    UnaryOp::Neg => "-",
                    UnaryOp::Pos => "+",
                    UnaryOp::Invert => "~",
                };
                Err(EvalError::type_error(format!(
                    "bad operand type for unary {}: '{}'",
                    symbol,
                    operand.type_name()
                )))
            }
        }
    }

    pub(crate) fn compare(&mut self, op: CmpOp, left: &Value, right: &Value) -> EvalResult<bool> {
        Ok(match op {
            CmpOp::Eq => left.equals(right),
            CmpOp::NotEq => !left.equals(right),
            CmpOp::Lt => left.compare(right)? == Ordering::Less,
            CmpOp::LtE => left.compare(right)? != Ordering::Greater,
            CmpOp::Gt => left.compare(right)? == Ordering::Greater,
            CmpOp::GtE => left.compare(right)? != Ordering::Less,
            CmpOp::In => self.contains(right, left)?,
            CmpOp::NotIn => !self.contains(right, left)?,
            CmpOp::Is => left.is(right),
            CmpOp::IsNot => !left.is(right),
        })
    }

    /// `item in container`
    pub(crate) fn contains(&mut self, container: &Value, item: &Value) -> EvalResult<bool> {
        match container {
            Value::Str(haystack) => match item {
                Value::Str(needle) => Ok(haystack.contains(needle.as_ref())),
                other => Err(EvalError::type_error(format!(
                    "'in <string>' requires string as left operand, not {}",
                    other.type_name()
                ))),
            },
            Value::List(items) => {
                let items = items.borrow().clone();
                self.tick_n(items.len() as u64)?;
                Ok(items.iter().any(|candidate| candidate.equals(item)))
            }
            Value::Tuple(items) => {
                self.tick_n(items.len() as u64)?;
                Ok(items.iter().any(|candidate| candidate.equals(item)))
            }
            Value::Set(table) | Value::Dict(table) => table.borrow().contains(item),
            other => Err(EvalError::type_error(format!(
                "argument of type '{}' is not iterable",
                other.type_name()
            ))),
        }
    }
}

fn unsupported(symbol: &str, left: &Value, right: &Value) -> EvalError {
    EvalError::type_error(format!(
        "unsupported operand type(s) for {}: '{}' and '{}'",
        symbol,
        left.type_name(),
        right.type_name()
    ))
}

fn filter_members(from: &Table, other: &Table, keep_shared: bool) -> EvalResult<Vec<Value>> {
    let mut members = Vec::new();
    for member in from.keys() {
        if other.contains(member)? == keep_shared {
            members.push(member.clone());
        }
    }
    Ok(members)
}

/// Operators applied to logic expressions build larger expressions
fn logic_binary(op: BinOp, left: &Value, right: &Value) -> EvalResult<Value> {
    let (a, b) = match (to_logic(left), to_logic(right)) {
        (Ok(a), Ok(b)) => (a, b),
        _ => return Err(unsupported(op.symbol(), left, right)),
    };
    let e = match op {
        BinOp::BitAnd => a.and(b),
        BinOp::BitOr => a.or(b),
        BinOp::BitXor => a.xor(b),
        BinOp::RShift => LogicExpr::new(IMPLIES, vec![a, b]),
        BinOp::LShift => LogicExpr::new(REVERSE_IMPLIES, vec![a, b]),
        other => LogicExpr::new(other.symbol(), vec![a, b]),
    };
    Ok(Value::expr(e.bounded()?))
}

fn arithmetic(op: BinOp, a: Number, b: Number) -> EvalResult<Value> {
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => int_arithmetic(op, x, y),
        (x, y) => float_arithmetic(op, x.as_f64(), y.as_f64()),
    }
}

fn int_arithmetic(op: BinOp, x: i64, y: i64) -> EvalResult<Value> {
    let overflow = || EvalError::overflow("integer overflow");
    let by_zero = || EvalError::zero_division("integer division or modulo by zero");
    match op {
        BinOp::Add => x.checked_add(y).map(Value::Int).ok_or_else(overflow),
        BinOp::Sub => x.checked_sub(y).map(Value::Int).ok_or_else(overflow),
        BinOp::Mul => x.checked_mul(y).map(Value::Int).ok_or_else(overflow),
        BinOp::Div => {
            if y == 0 {
                return Err(EvalError::zero_division("division by zero"));
            }
            Ok(Value::Float(x as f64 / y as f64))
        }
        BinOp::FloorDiv => {
            if y == 0 {
                return Err(by_zero());
            }
            let q = x.checked_div(y).ok_or_else(overflow)?;
            let adjust = x % y != 0 && ((x < 0) != (y < 0));
            Ok(Value::Int(if adjust { q - 1 } else { q }))
        }
        BinOp::Mod => {
            if y == 0 {
                return Err(by_zero());
            }
            let r = x.checked_rem(y).unwrap_or(0);
            Ok(Value::Int(if r != 0 && ((r < 0) != (y < 0)) { r + y } else { r }))
        }
        BinOp::Pow => {
            if y < 0 {
                return float_arithmetic(op, x as f64, y as f64);
            }
            let exponent = u32::try_from(y).map_err(|_| overflow())?;
            x.checked_pow(exponent).map(Value::Int).ok_or_else(overflow)
        }
        _ => Err(EvalError::type_error(format!(
            "unsupported operand type(s) for {}: 'int' and 'int'",
            op.symbol()
        ))),
    }
}

fn float_arithmetic(op: BinOp, x: f64, y: f64) -> EvalResult<Value> {
    let result = match op {
        BinOp::Add => x + y,
        BinOp::Sub => x - y,
        BinOp::Mul => x * y,
        BinOp::Div => {
            if y == 0.0 {
                return Err(EvalError::zero_division("float division by zero"));
            }
            x / y
        }
        BinOp::FloorDiv => {
            if y == 0.0 {
                return Err(EvalError::zero_division("float floor division by zero"));
            }
            (x / y).floor()
        }
        BinOp::Mod => {
            if y == 0.0 {
                return Err(EvalError::zero_division("float modulo"));
            }
            let r = x % y;
            if r != 0.0 && ((r < 0.0) != (y < 0.0)) {
                r + y
            } else {
                r
            }
        }
        BinOp::Pow => {
            if x == 0.0 && y < 0.0 {
                return Err(EvalError::zero_division(
                    "0.0 cannot be raised to a negative power",
                ));
            }
            if x < 0.0 && y.fract() != 0.0 {
                return Err(EvalError::value_error(
                    "negative number cannot be raised to a fractional power",
                ));
            }
            let result = x.powf(y);
            if result.is_infinite() && x.is_finite() && y.is_finite() {
                return Err(EvalError::overflow("numerical result out of range"));
            }
            result
        }
        _ => {
            return Err(EvalError::type_error(format!(
                "unsupported operand type(s) for {}: 'float' and 'float'",
                op.symbol()
            )))
        }
    };
    Ok(Value::Float(result))
}

fn bitwise(op: BinOp, left: &Value, right: &Value) -> EvalResult<Value> {
    if let (Value::Bool(a), Value::Bool(b)) = (left, right) {
        match op {
            BinOp::BitAnd => return Ok(Value::Bool(a & b)),
            BinOp::BitOr => return Ok(Value::Bool(a | b)),
            BinOp::BitXor => return Ok(Value::Bool(a ^ b)),
            _ => {}
        }
    }
    let (Some(x), Some(y)) = (left.as_int(), right.as_int()) else {
        return Err(unsupported(op.symbol(), left, right));
    };
    match op {
        BinOp::BitAnd => Ok(Value::Int(x & y)),
        BinOp::BitOr => Ok(Value::Int(x | y)),
        BinOp::BitXor => Ok(Value::Int(x ^ y)),
        BinOp::LShift => {
            if y < 0 {
                return Err(EvalError::value_error("negative shift count"));
            }
            if x == 0 {
                return Ok(Value::Int(0));
            }
            let shifted = u32::try_from(y)
                .ok()
                .filter(|&n| n < 64)
                .map(|n| (x << n, n))
                .filter(|&(v, n)| v >> n == x);
            shifted
                .map(|(v, _)| Value::Int(v))
                .ok_or_else(|| EvalError::overflow("integer overflow"))
        }
        BinOp::RShift => {
            if y < 0 {
                return Err(EvalError::value_error("negative shift count"));
            }
            Ok(Value::Int(if y >= 64 {
                if x < 0 {
                    -1
                } else {
                    0
                }
            } else {
                x >> y
            }))
        }
        _ => Err(unsupported(op.symbol(), left, right)),
    }
}
