//! Runtime values of the script language

use crate::ast::LambdaDef;
use crate::builtins::Builtin;
use crate::error::{EvalError, EvalResult};
use logicbox_logic::{Expr as LogicExpr, FolKb, PropKb};
use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt::{self, Write as _};
use std::rc::Rc;

/// Nesting beyond which rendering and comparison stop descending
pub const MAX_NESTING: usize = 200;

/// Local names of one lambda call or comprehension
pub type Frame = HashMap<String, Value>;

#[derive(Clone)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    List(Rc<RefCell<Vec<Value>>>),
    Tuple(Rc<[Value]>),
    /// Keys of the table are the members
    Set(Rc<RefCell<Table>>),
    Dict(Rc<RefCell<Table>>),
    Expr(Rc<LogicExpr>),
    FolKb(Rc<RefCell<FolKb>>),
    PropKb(Rc<RefCell<PropKb>>),
    Builtin(&'static Builtin),
    Method(Rc<BoundMethod>),
    Lambda(Rc<Closure>),
}

/// A method looked up on a value, e.g. `kb.tell`
#[derive(Clone)]
pub struct BoundMethod {
    pub receiver: Value,
    pub name: &'static str,
}

/// A lambda together with its evaluated defaults and enclosing frames
pub struct Closure {
    pub def: Rc<LambdaDef>,
    pub defaults: Vec<Option<Value>>,
    pub captured: Vec<Frame>,
}

/// Numeric view of `bool`, `int` and `float`
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(v) => v as f64,
            Number::Float(v) => v,
        }
    }
}

impl Value {
    pub fn str(text: impl Into<Rc<str>>) -> Self {
        Value::Str(text.into())
    }

    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Rc::new(RefCell::new(items)))
    }

    pub fn tuple(items: Vec<Value>) -> Self {
        Value::Tuple(Rc::from(items))
    }

    pub fn dict(table: Table) -> Self {
        Value::Dict(Rc::new(RefCell::new(table)))
    }

    pub fn set(table: Table) -> Self {
        Value::Set(Rc::new(RefCell::new(table)))
    }

    pub fn expr(expr: LogicExpr) -> Self {
        Value::Expr(Rc::new(expr))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "NoneType",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
            Value::Set(_) => "set",
            Value::Dict(_) => "dict",
            Value::Expr(_) => "Expr",
            Value::FolKb(_) => "FolKB",
            Value::PropKb(_) => "PropKB",
            Value::Builtin(_) => "builtin_function_or_method",
            Value::Method(_) => "method",
            Value::Lambda(_) => "function",
        }
    }

    pub fn as_number(&self) -> Option<Number> {
        match self {
            Value::Bool(b) => Some(Number::Int(i64::from(*b))),
            Value::Int(v) => Some(Number::Int(*v)),
            Value::Float(v) => Some(Number::Float(*v)),
            _ => None,
        }
    }

    /// Integer view of `bool` and `int`
    pub fn as_int(&self) -> Option<i64> {
        match self.as_number()? {
            Number::Int(v) => Some(v),
            Number::Float(_) => None,
        }
    }

    pub fn truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(v) => *v != 0,
            Value::Float(v) => *v != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !items.borrow().is_empty(),
            Value::Tuple(items) => !items.is_empty(),
            Value::Set(table) | Value::Dict(table) => !table.borrow().is_empty(),
            _ => true,
        }
    }

    pub fn is_callable(&self) -> bool {
        matches!(
            self,
            Value::Builtin(_) | Value::Method(_) | Value::Lambda(_)
        ) || matches!(self, Value::Expr(e) if e.is_symbol())
    }

    /// `is`: identity for shared objects, value equality for immutable scalars
    pub fn is(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Tuple(a), Value::Tuple(b)) => Rc::ptr_eq(a, b),
            (Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b),
            (Value::Set(a), Value::Set(b)) | (Value::Dict(a), Value::Dict(b)) => Rc::ptr_eq(a, b),
            (Value::Expr(a), Value::Expr(b)) => Rc::ptr_eq(a, b),
            (Value::FolKb(a), Value::FolKb(b)) => Rc::ptr_eq(a, b),
            (Value::PropKb(a), Value::PropKb(b)) => Rc::ptr_eq(a, b),
            (Value::Builtin(a), Value::Builtin(b)) => std::ptr::eq(*a, *b),
            (Value::Method(a), Value::Method(b)) => Rc::ptr_eq(a, b),
            (Value::Lambda(a), Value::Lambda(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// `==`, with `1 == 1.0 == True`
    pub fn equals(&self, other: &Value) -> bool {
        equals_at(self, other, 0)
    }

    /// Dictionary key or set member form; fails for mutable containers
    pub fn key(&self) -> EvalResult<Key> {
        Ok(match self {
            Value::None => Key::None,
            Value::Bool(b) => Key::Int(i64::from(*b)),
            Value::Int(v) => Key::Int(*v),
            Value::Float(v) => float_key(*v),
            Value::Str(s) => Key::Str(s.clone()),
            Value::Tuple(items) => Key::Tuple(
                items
                    .iter()
                    .map(Value::key)
                    .collect::<EvalResult<Vec<_>>>()?,
            ),
            Value::Expr(e) => Key::Expr(e.clone()),
            Value::FolKb(kb) => Key::Identity(Rc::as_ptr(kb) as *const () as usize),
            Value::PropKb(kb) => Key::Identity(Rc::as_ptr(kb) as *const () as usize),
            Value::Builtin(b) => Key::Identity(*b as *const Builtin as usize),
            Value::Lambda(c) => Key::Identity(Rc::as_ptr(c) as *const () as usize),
            Value::Method(m) => Key::Identity(Rc::as_ptr(m) as *const () as usize),
            Value::List(_) | Value::Set(_) | Value::Dict(_) => {
                return Err(EvalError::type_error(format!(
                    "unhashable type: '{}'",
                    self.type_name()
                )))
            }
        })
    }

    /// Quoted, unambiguous rendering used by `repr()`
    pub fn repr(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail
        let _ = Renderer::default().write(&mut out, self, true);
        out
    }

    /// Ordering used by `<`, `sorted`, `min` and `max`
    pub fn compare(&self, other: &Value) -> EvalResult<Ordering> {
        compare_at(self, other, 0)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        Renderer::default().write(&mut out, self, false)?;
        f.write_str(&out)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.repr())
    }
}

fn equals_at(a: &Value, b: &Value, depth: usize) -> bool {
    if depth > MAX_NESTING {
        return false;
    }
    if let (Some(x), Some(y)) = (a.as_number(), b.as_number()) {
        return match (x, y) {
            (Number::Int(x), Number::Int(y)) => x == y,
            (x, y) => x.as_f64() == y.as_f64(),
        };
    }
    match (a, b) {
        (Value::None, Value::None) => true,
        (Value::Str(x), Value::Str(y)) => x == y,
        (Value::Tuple(x), Value::Tuple(y)) => sequence_equals(x, y, depth),
        (Value::List(x), Value::List(y)) => {
            Rc::ptr_eq(x, y) || sequence_equals(&x.borrow(), &y.borrow(), depth)
        }
        (Value::Set(x), Value::Set(y)) => {
            if Rc::ptr_eq(x, y) {
                return true;
            }
            let (x, y) = (x.borrow(), y.borrow());
            x.len() == y.len() && x.keys().all(|k| y.contains(k).unwrap_or(false))
        }
        (Value::Dict(x), Value::Dict(y)) => {
            if Rc::ptr_eq(x, y) {
                return true;
            }
            let (x, y) = (x.borrow(), y.borrow());
            x.len() == y.len()
                && x.entries().all(|(k, v)| match y.get(k) {
                    Ok(Some(other)) => equals_at(v, &other, depth + 1),
                    _ => false,
                })
        }
        (Value::Expr(x), Value::Expr(y)) => x == y,
        _ => a.is(b),
    }
}

fn sequence_equals(x: &[Value], y: &[Value], depth: usize) -> bool {
    x.len() == y.len() && x.iter().zip(y).all(|(a, b)| equals_at(a, b, depth + 1))
}

fn compare_at(a: &Value, b: &Value, depth: usize) -> EvalResult<Ordering> {
    if depth > MAX_NESTING {
        return Err(EvalError::runtime(
            "RecursionError",
            "maximum recursion depth exceeded in comparison",
        ));
    }
    if let (Some(x), Some(y)) = (a.as_number(), b.as_number()) {
        return Ok(match (x, y) {
            (Number::Int(x), Number::Int(y)) => x.cmp(&y),
            (x, y) => x
                .as_f64()
                .partial_cmp(&y.as_f64())
                .unwrap_or(Ordering::Equal),
        });
    }
    match (a, b) {
        (Value::Str(x), Value::Str(y)) => Ok(x.cmp(y)),
        (Value::Tuple(x), Value::Tuple(y)) => compare_sequences(x, y, depth),
        (Value::List(x), Value::List(y)) => {
            let (x, y) = (x.borrow().clone(), y.borrow().clone());
            compare_sequences(&x, &y, depth)
        }
        _ => Err(EvalError::type_error(format!(
            "'<' not supported between instances of '{}' and '{}'",
            a.type_name(),
            b.type_name()
        ))),
    }
}

fn compare_sequences(x: &[Value], y: &[Value], depth: usize) -> EvalResult<Ordering> {
    for (a, b) in x.iter().zip(y) {
        if !equals_at(a, b, depth + 1) {
            return compare_at(a, b, depth + 1);
        }
    }
    Ok(x.len().cmp(&y.len()))
}

/// Hashable form of a value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    None,
    Int(i64),
    Float(u64),
    Str(Rc<str>),
    Tuple(Vec<Key>),
    Expr(Rc<LogicExpr>),
    Identity(usize),
}

fn float_key(v: f64) -> Key {
    if v.fract() == 0.0 && v >= i64::MIN as f64 && v < i64::MAX as f64 {
        Key::Int(v as i64)
    } else if v.is_nan() {
        Key::Float(f64::NAN.to_bits())
    } else {
        Key::Float(v.to_bits())
    }
}

/// Insertion-ordered hash table backing `dict` and `set`
#[derive(Clone, Default)]
pub struct Table {
    entries: Vec<(Value, Value)>,
    index: HashMap<Key, usize>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &Value) -> EvalResult<Option<Value>> {
        let key = key.key()?;
        Ok(self.index.get(&key).map(|&i| self.entries[i].1.clone()))
    }

    pub fn contains(&self, key: &Value) -> EvalResult<bool> {
        Ok(self.index.contains_key(&key.key()?))
    }

    /// Insert or overwrite; an existing key keeps its position
    pub fn insert(&mut self, key: Value, value: Value) -> EvalResult<()> {
        let hashed = key.key()?;
        match self.index.get(&hashed) {
            Some(&i) => self.entries[i].1 = value,
            None => {
                self.index.insert(hashed, self.entries.len());
                self.entries.push((key, value));
            }
        }
        Ok(())
    }

    /// Add a set member
    pub fn add(&mut self, member: Value) -> EvalResult<()> {
        if !self.contains(&member)? {
            self.insert(member, Value::None)?;
        }
        Ok(())
    }

    pub fn keys(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(_, v)| v)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&Value, &Value)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn from_members(members: impl IntoIterator<Item = Value>) -> EvalResult<Self> {
        let mut table = Self::new();
        for member in members {
            table.add(member)?;
        }
        Ok(table)
    }
}

/// Display rendering with cycle detection
#[derive(Default)]
struct Renderer {
    active: Vec<usize>,
}

impl Renderer {
    fn write(&mut self, out: &mut String, value: &Value, repr: bool) -> fmt::Result {
        if self.active.len() > MAX_NESTING {
            return out.write_str("...");
        }
        match value {
            Value::None => out.write_str("None"),
            Value::Bool(true) => out.write_str("True"),
            Value::Bool(false) => out.write_str("False"),
            Value::Int(v) => write!(out, "{}", v),
            Value::Float(v) => out.write_str(&float_repr(*v)),
            Value::Str(s) if repr => out.write_str(&quote(s)),
            Value::Str(s) => out.write_str(s),
            Value::List(items) => {
                let id = Rc::as_ptr(items) as *const () as usize;
                if self.active.contains(&id) {
                    return out.write_str("[...]");
                }
                self.active.push(id);
                let items = items.borrow().clone();
                let result = self.sequence(out, "[", &items, "]");
                self.active.pop();
                result
            }
            Value::Tuple(items) => {
                if items.len() == 1 {
                    out.write_char('(')?;
                    self.write(out, &items[0], true)?;
                    out.write_str(",)")
                } else {
                    self.sequence(out, "(", items, ")")
                }
            }
            Value::Set(table) => {
                let members: Vec<Value> = table.borrow().keys().cloned().collect();
                if members.is_empty() {
                    return out.write_str("set()");
                }
                let id = Rc::as_ptr(table) as *const () as usize;
                if self.active.contains(&id) {
                    return out.write_str("{...}");
                }
                self.active.push(id);
                let result = self.sequence(out, "{", &members, "}");
                self.active.pop();
                result
            }
            Value::Dict(table) => {
                let id = Rc::as_ptr(table) as *const () as usize;
                if self.active.contains(&id) {
                    return out.write_str("{...}");
                }
                self.active.push(id);
                let entries: Vec<(Value, Value)> = table
                    .borrow()
                    .entries()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                let result = self.dict(out, &entries);
                self.active.pop();
                result
            }
            Value::Expr(e) => write!(out, "{}", e),
            Value::FolKb(kb) => write!(out, "{}", kb.borrow()),
            Value::PropKb(kb) => write!(out, "{}", kb.borrow()),
            Value::Builtin(b) => write!(out, "<built-in function {}>", b.name),
            Value::Method(m) => write!(
                out,
                "<bound method {}.{}>",
                m.receiver.type_name(),
                m.name
            ),
            Value::Lambda(_) => out.write_str("<function <lambda>>"),
        }
    }

    fn sequence(&mut self, out: &mut String, open: &str, items: &[Value], close: &str) -> fmt::Result {
        out.write_str(open)?;
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                out.write_str(", ")?;
            }
            self.write(out, item, true)?;
        }
        out.write_str(close)
    }

    fn dict(&mut self, out: &mut String, entries: &[(Value, Value)]) -> fmt::Result {
        out.write_char('{')?;
        for (i, (key, value)) in entries.iter().enumerate() {
            if i > 0 {
                out.write_str(", ")?;
            }
            self.write(out, key, true)?;
            out.write_str(": ")?;
            self.write(out, value, true)?;
        }
        out.write_char('}')
    }
}

/// Shortest round-trip float text, exponent form outside `1e-4 <= |v| < 1e16`
pub fn float_repr(v: f64) -> String {
    if v.is_nan() {
        return "nan".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let scientific = format!("{:e}", v);
    let (mantissa, exponent) = scientific
        .split_once('e')
        .unwrap_or((scientific.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    if v != 0.0 && !(-4..16).contains(&exponent) {
        let sign = if exponent < 0 { '-' } else { '+' };
        return format!("{}e{}{:02}", mantissa, sign, exponent.abs());
    }
    let plain = format!("{}", v);
    if plain.contains('.') {
        plain
    } else {
        format!("{}.0", plain)
    }
}

/// Quote text the way `repr()` does
pub fn quote(s: &str) -> String {
    let delimiter = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(delimiter);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == delimiter => {
                out.push('\\');
                out.push(c);
            }
            c if (c as u32) < 0x20 || c as u32 == 0x7f => {
                let _ = write!(out, "\\x{:02x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push(delimiter);
    out
}
