//! Tree-walking evaluator over one invocation's Binding Set

use crate::ast::{Arg, BinOp, BoolOp, Comprehension, Expr, Index, Stmt, Target};
use crate::builtins::{to_logic, CallArgs};
use crate::environment::Environment;
use crate::error::{EvalError, EvalResult};
use crate::limits::ResourceLimits;
use crate::methods;
use crate::value::{Closure, Frame, Table, Value};
use logicbox_logic::{Budget, Expr as LogicExpr};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Instant;

/// Operations between wall-clock checks
const DEADLINE_CHECK_INTERVAL: u64 = 1024;

/// Nested evaluations allowed before a `RecursionError`
pub const MAX_EVAL_DEPTH: usize = 2_000;

pub struct Interpreter<'env> {
    env: &'env Environment,
    limits: &'env ResourceLimits,
    deadline: Option<Instant>,
    bindings: HashMap<String, Value>,
    frames: Vec<Frame>,
    operations: u64,
    call_depth: usize,
    eval_depth: usize,
    stdout: String,
    rename_counter: usize,
}

impl<'env> Interpreter<'env> {
    pub fn new(
        env: &'env Environment,
        limits: &'env ResourceLimits,
        deadline: Option<Instant>,
    ) -> Self {
        Self {
            env,
            limits,
            deadline,
            bindings: HashMap::new(),
            frames: Vec::new(),
            operations: 0,
            call_depth: 0,
            eval_depth: 0,
            stdout: String::new(),
            rename_counter: 0,
        }
    }

    /// Names bound by preparatory statements so far
    pub fn binding_names(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }

    pub fn binding(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }

    pub fn operations(&self) -> u64 {
        self.operations
    }

    pub fn stdout(&self) -> &str {
        &self.stdout
    }

    pub fn take_stdout(&mut self) -> String {
        std::mem::take(&mut self.stdout)
    }

    // Accounting

    /// Count one operation
    pub fn tick(&mut self) -> EvalResult<()> {
        self.tick_n(1)
    }

    /// Count `n` operations of bulk work
    pub fn tick_n(&mut self, n: u64) -> EvalResult<()> {
        let before = self.operations;
        self.operations = self.operations.saturating_add(n);
        if self.operations > self.limits.max_operations {
            return Err(EvalError::limit(format!(
                "operation limit of {} exceeded",
                self.limits.max_operations
            )));
        }
        if n > 1 || before / DEADLINE_CHECK_INTERVAL != self.operations / DEADLINE_CHECK_INTERVAL {
            self.check_deadline()?;
        }
        Ok(())
    }

    pub fn check_deadline(&self) -> EvalResult<()> {
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(EvalError::timeout()),
            _ => Ok(()),
        }
    }

    pub fn check_len(&self, len: usize) -> EvalResult<()> {
        if len > self.limits.max_collection_len {
            return Err(EvalError::limit(format!(
                "collection exceeds {} items",
                self.limits.max_collection_len
            )));
        }
        Ok(())
    }

    pub fn check_str_len(&self, len: usize) -> EvalResult<()> {
        if len > self.limits.max_string_len {
            return Err(EvalError::limit(format!(
                "string exceeds {} bytes",
                self.limits.max_string_len
            )));
        }
        Ok(())
    }

    /// Fresh budget for one inference or solver call
    pub fn budget(&self) -> Budget {
        self.limits.inference_budget(self.deadline)
    }

    pub fn rename_counter(&mut self) -> &mut usize {
        &mut self.rename_counter
    }

    /// Append to the invocation's stdout buffer
    pub fn write_stdout(&mut self, text: &str) -> EvalResult<()> {
        self.check_str_len(self.stdout.len() + text.len())?;
        self.stdout.push_str(text);
        Ok(())
    }

    // Statements

    pub fn execute(&mut self, stmt: &Stmt) -> EvalResult<()> {
        match stmt {
            Stmt::Pass => Ok(()),
            Stmt::Expr(expr) => self.evaluate(expr).map(drop),
            Stmt::Assign { targets, value } => {
                let value = self.evaluate(value)?;
                for target in targets {
                    self.assign(target, value.clone())?;
                }
                Ok(())
            }
            Stmt::AugAssign { target, op, value } => self.augmented_assign(target, *op, value),
        }
    }

    fn augmented_assign(&mut self, target: &Target, op: BinOp, value: &Expr) -> EvalResult<()> {
        match target {
            Target::Name(name) => {
                let current = self.lookup(name)?;
                let operand = self.evaluate(value)?;
                let updated = self.in_place(op, current, operand)?;
                self.assign_name(name, updated);
                Ok(())
            }
            Target::Subscript { object, index } => {
                let object = self.evaluate(object)?;
                let index = self.evaluate(index)?;
                let current = self.get_item(&object, &index)?;
                let operand = self.evaluate(value)?;
                let updated = self.in_place(op, current, operand)?;
                self.set_item(&object, index, updated)
            }
            Target::Tuple(_) => Err(EvalError::type_error(
                "augmented assignment needs a single target",
            )),
        }
    }

    /// `list += iterable` extends in place; everything else rebinds
    fn in_place(&mut self, op: BinOp, current: Value, operand: Value) -> EvalResult<Value> {
        if let (BinOp::Add, Value::List(items)) = (op, &current) {
            let extra = self.iterate(&operand)?;
            self.check_len(items.borrow().len() + extra.len())?;
            items.borrow_mut().extend(extra);
            return Ok(current);
        }
        self.binary(op, current, operand)
    }

    pub fn assign(&mut self, target: &Target, value: Value) -> EvalResult<()> {
        match target {
            Target::Name(name) => {
                self.assign_name(name, value);
                Ok(())
            }
            Target::Tuple(targets) => {
                let items = self.iterate(&value)?;
                if items.len() != targets.len() {
                    return Err(EvalError::value_error(if items.len() > targets.len() {
                        format!("too many values to unpack (expected {})", targets.len())
                    } else {
                        format!(
                            "not enough values to unpack (expected {}, got {})",
                            targets.len(),
                            items.len()
                        )
                    }));
                }
                for (target, item) in targets.iter().zip(items) {
                    self.assign(target, item)?;
                }
                Ok(())
            }
            Target::Subscript { object, index } => {
                let object = self.evaluate(object)?;
                let index = self.evaluate(index)?;
                self.set_item(&object, index, value)
            }
        }
    }

    fn assign_name(&mut self, name: &str, value: Value) {
        match self.frames.last_mut() {
            Some(frame) => frame.insert(name.to_string(), value),
            None => self.bindings.insert(name.to_string(), value),
        };
    }

    fn lookup(&self, name: &str) -> EvalResult<Value> {
        for frame in self.frames.iter().rev() {
            if let Some(value) = frame.get(name) {
                return Ok(value.clone());
            }
        }
        if let Some(value) = self.bindings.get(name) {
            return Ok(value.clone());
        }
        if let Some(builtin) = self.env.lookup(name) {
            return Ok(Value::Builtin(builtin));
        }
        Err(EvalError::Unresolved {
            name: name.to_string(),
        })
    }

    // Expressions

    pub fn evaluate(&mut self, expr: &Expr) -> EvalResult<Value> {
        self.tick()?;
        if self.eval_depth >= MAX_EVAL_DEPTH {
            return Err(EvalError::runtime(
                "RecursionError",
                "maximum recursion depth exceeded",
            ));
        }
        self.eval_depth += 1;
        let result = self.eval_inner(expr);
        self.eval_depth -= 1;
        result
    }

    fn eval_inner(&mut self, expr: &Expr) -> EvalResult<Value> {
        match expr {
            Expr::None => Ok(Value::None),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Int(v) => Ok(Value::Int(*v)),
            Expr::Float(v) => Ok(Value::Float(*v)),
            Expr::Str(s) => {
                self.check_str_len(s.len())?;
                Ok(Value::Str(s.clone()))
            }
            Expr::Name(name) => self.lookup(name),
            Expr::List(items) => Ok(Value::list(self.evaluate_all(items)?)),
            Expr::Tuple(items) => Ok(Value::tuple(self.evaluate_all(items)?)),
            Expr::Set(items) => {
                let members = self.evaluate_all(items)?;
                Ok(Value::set(Table::from_members(members)?))
            }
            Expr::Dict(pairs) => {
                self.check_len(pairs.len())?;
                let mut table = Table::new();
                for (key, value) in pairs {
                    let key = self.evaluate(key)?;
                    let value = self.evaluate(value)?;
                    table.insert(key, value)?;
                }
                Ok(Value::dict(table))
            }
            Expr::ListComp { element, clauses } => {
                let mut items = Vec::new();
                self.comprehension(clauses, &mut |interp| {
                    items.push(interp.evaluate(element)?);
                    interp.check_len(items.len())
                })?;
                Ok(Value::list(items))
            }
            Expr::SetComp { element, clauses } => {
                let mut table = Table::new();
                self.comprehension(clauses, &mut |interp| {
                    table.add(interp.evaluate(element)?)?;
                    interp.check_len(table.len())
                })?;
                Ok(Value::set(table))
            }
            Expr::DictComp {
                key,
                value,
                clauses,
            } => {
                let mut table = Table::new();
                self.comprehension(clauses, &mut |interp| {
                    let k = interp.evaluate(key)?;
                    let v = interp.evaluate(value)?;
                    table.insert(k, v)?;
                    interp.check_len(table.len())
                })?;
                Ok(Value::dict(table))
            }
            Expr::Lambda(def) => {
                let mut defaults = Vec::with_capacity(def.params.len());
                for param in &def.params {
                    defaults.push(match &param.default {
                        Some(default) => Some(self.evaluate(default)?),
                        None => None,
                    });
                }
                Ok(Value::Lambda(Rc::new(Closure {
                    def: def.clone(),
                    defaults,
                    captured: self.frames.clone(),
                })))
            }
            Expr::IfExp { test, body, orelse } => {
                if self.evaluate(test)?.truthy() {
                    self.evaluate(body)
                } else {
                    self.evaluate(orelse)
                }
            }
            Expr::BoolOp { op, values } => {
                let mut last = Value::None;
                for value in values {
                    last = self.evaluate(value)?;
                    let decided = match op {
                        BoolOp::And => !last.truthy(),
                        BoolOp::Or => last.truthy(),
                    };
                    if decided {
                        break;
                    }
                }
                Ok(last)
            }
            Expr::Not(operand) => Ok(Value::Bool(!self.evaluate(operand)?.truthy())),
            Expr::Unary { op, operand } => {
                let operand = self.evaluate(operand)?;
                self.unary(*op, operand)
            }
            Expr::Binary { op, left, right } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                self.binary(*op, left, right)
            }
            Expr::Compare { left, ops } => {
                let mut left = self.evaluate(left)?;
                for (op, right) in ops {
                    let right = self.evaluate(right)?;
                    if !self.compare(*op, &left, &right)? {
                        return Ok(Value::Bool(false));
                    }
                    left = right;
                }
                Ok(Value::Bool(true))
            }
            Expr::Call { func, args } => {
                let func = self.evaluate(func)?;
                let mut call_args = CallArgs::default();
                for arg in args {
                    match arg {
                        Arg::Positional(value) => call_args.positional.push(self.evaluate(value)?),
                        Arg::Keyword(name, value) => {
                            let value = self.evaluate(value)?;
                            call_args.keywords.push((name.clone(), value));
                        }
                    }
                }
                self.call(&func, call_args)
            }
            Expr::Attribute { object, name } => {
                let object = self.evaluate(object)?;
                methods::get_attribute(&object, name)
            }
            Expr::Subscript { object, index } => {
                let object = self.evaluate(object)?;
                match index.as_ref() {
                    Index::Single(index) => {
                        let index = self.evaluate(index)?;
                        self.get_item(&object, &index)
                    }
                    Index::Slice { lower, upper, step } => {
                        let lower = self.evaluate_optional(lower.as_ref())?;
                        let upper = self.evaluate_optional(upper.as_ref())?;
                        let step = self.evaluate_optional(step.as_ref())?;
                        self.slice(&object, lower, upper, step)
                    }
                }
            }
        }
    }

    fn evaluate_all(&mut self, items: &[Expr]) -> EvalResult<Vec<Value>> {
        self.check_len(items.len())?;
        items.iter().map(|item| self.evaluate(item)).collect()
    }

    fn evaluate_optional(&mut self, expr: Option<&Expr>) -> EvalResult<Option<Value>> {
        match expr {
            Some(expr) => self.evaluate(expr).map(Some),
            None => Ok(None),
        }
    }

    /// Run `emit` once per combination of the clauses, inside a fresh frame
    fn comprehension(
        &mut self,
        clauses: &[Comprehension],
        emit: &mut dyn FnMut(&mut Self) -> EvalResult<()>,
    ) -> EvalResult<()> {
        self.frames.push(Frame::new());
        let result = self.comprehension_level(clauses, emit);
        self.frames.pop();
        result
    }

    fn comprehension_level(
        &mut self,
        clauses: &[Comprehension],
        emit: &mut dyn FnMut(&mut Self) -> EvalResult<()>,
    ) -> EvalResult<()> {
        let Some((clause, rest)) = clauses.split_first() else {
            return emit(self);
        };
        let iterable = self.evaluate(&clause.iter)?;
        'items: for item in self.iterate(&iterable)? {
            self.tick()?;
            self.assign(&clause.target, item)?;
            for condition in &clause.conditions {
                if !self.evaluate(condition)?.truthy() {
                    continue 'items;
                }
            }
            self.comprehension_level(rest, emit)?;
        }
        Ok(())
    }

    // Calls

    pub fn call(&mut self, func: &Value, args: CallArgs) -> EvalResult<Value> {
        match func {
            Value::Builtin(builtin) => (builtin.func)(self, args),
            Value::Method(method) => methods::call_method(self, &method.receiver, method.name, args),
            Value::Lambda(closure) => self.call_lambda(closure, args),
            Value::Expr(symbol) if symbol.is_symbol() => {
                args.reject_keywords(symbol.op())?;
                let operands = args
                    .positional
                    .iter()
                    .map(to_logic)
                    .collect::<EvalResult<Vec<_>>>()?;
                Ok(Value::expr(LogicExpr::new(symbol.op(), operands).bounded()?))
            }
            other => Err(EvalError::type_error(format!(
                "'{}' object is not callable",
                other.type_name()
            ))),
        }
    }

    fn call_lambda(&mut self, closure: &Closure, args: CallArgs) -> EvalResult<Value> {
        if self.call_depth >= self.limits.max_call_depth {
            return Err(EvalError::runtime(
                "RecursionError",
                "maximum recursion depth exceeded",
            ));
        }
        let params = &closure.def.params;
        if args.positional.len() > params.len() {
            return Err(EvalError::type_error(format!(
                "<lambda>() takes {} positional arguments but {} were given",
                params.len(),
                args.positional.len()
            )));
        }
        let mut frame = Frame::new();
        for (param, value) in params.iter().zip(args.positional) {
            frame.insert(param.name.clone(), value);
        }
        for (name, value) in args.keywords {
            if !params.iter().any(|p| p.name == name) {
                return Err(EvalError::type_error(format!(
                    "<lambda>() got an unexpected keyword argument '{}'",
                    name
                )));
            }
            if frame.contains_key(&name) {
                return Err(EvalError::type_error(format!(
                    "<lambda>() got multiple values for argument '{}'",
                    name
                )));
            }
            frame.insert(name, value);
        }
        for (param, default) in params.iter().zip(&closure.defaults) {
            if frame.contains_key(&param.name) {
                continue;
            }
            match default {
                Some(value) => {
                    frame.insert(param.name.clone(), value.clone());
                }
                None => {
                    return Err(EvalError::type_error(format!(
                        "<lambda>() missing required argument '{}'",
                        param.name
                    )))
                }
            }
        }

        let mut frames = closure.captured.clone();
        frames.push(frame);
        let saved = std::mem::replace(&mut self.frames, frames);
        self.call_depth += 1;
        let result = self.evaluate(&closure.def.body);
        self.call_depth -= 1;
        self.frames = saved;
        result
    }

    // Sequences and mappings

    /// Materialise the items of an iterable value
    pub fn iterate(&mut self, value: &Value) -> EvalResult<Vec<Value>> {
        let items: Vec<Value> = match value {
            Value::List(items) => items.borrow().clone(),
            Value::Tuple(items) => items.to_vec(),
            Value::Set(table) | Value::Dict(table) => table.borrow().keys().cloned().collect(),
            Value::Str(s) => s.chars().map(|c| Value::str(c.to_string())).collect(),
            other => {
                return Err(EvalError::type_error(format!(
                    "'{}' object is not iterable",
                    other.type_name()
                )))
            }
        };
        self.tick_n(items.len() as u64)?;
        Ok(items)
    }

    pub fn get_item(&mut self, object: &Value, index: &Value) -> EvalResult<Value> {
        match object {
            Value::List(items) => {
                let items = items.borrow();
                let i = sequence_index(items.len(), index, "list")?;
                Ok(items[i].clone())
            }
            Value::Tuple(items) => {
                let i = sequence_index(items.len(), index, "tuple")?;
                Ok(items[i].clone())
            }
            Value::Str(s) => {
                let chars: Vec<char> = s.chars().collect();
                let i = sequence_index(chars.len(), index, "string")?;
                Ok(Value::str(chars[i].to_string()))
            }
            Value::Dict(table) => table
                .borrow()
                .get(index)?
                .ok_or_else(|| EvalError::key_error(index.repr())),
            other => Err(EvalError::type_error(format!(
                "'{}' object is not subscriptable",
                other.type_name()
            ))),
        }
    }

    pub fn set_item(&mut self, object: &Value, index: Value, value: Value) -> EvalResult<()> {
        match object {
            Value::List(items) => {
                let mut items = items.borrow_mut();
                let i = sequence_index(items.len(), &index, "list")?;
                items[i] = value;
                Ok(())
            }
            Value::Dict(table) => {
                let mut table = table.borrow_mut();
                table.insert(index, value)?;
                self.check_len(table.len())
            }
            other => Err(EvalError::type_error(format!(
                "'{}' object does not support item assignment",
                other.type_name()
            ))),
        }
    }

    fn slice(
        &mut self,
        object: &Value,
        lower: Option<Value>,
        upper: Option<Value>,
        step: Option<Value>,
    ) -> EvalResult<Value> {
        let bound = |value: Option<Value>| -> EvalResult<Option<i64>> {
            match value {
                None | Some(Value::None) => Ok(None),
                Some(value) => value.as_int().map(Some).ok_or_else(|| {
                    EvalError::type_error(
                        "slice indices must be integers or None",
                    )
                }),
            }
        };
        let (lower, upper, step) = (bound(lower)?, bound(upper)?, bound(step)?);
        match object {
            Value::List(items) => {
                let items = items.borrow();
                let picked = slice_indices(items.len(), lower, upper, step)?;
                Ok(Value::list(picked.into_iter().map(|i| items[i].clone()).collect()))
            }
            Value::Tuple(items) => {
                let picked = slice_indices(items.len(), lower, upper, step)?;
                Ok(Value::tuple(picked.into_iter().map(|i| items[i].clone()).collect()))
            }
            Value::Str(s) => {
                let chars: Vec<char> = s.chars().collect();
                let picked = slice_indices(chars.len(), lower, upper, step)?;
                Ok(Value::str(picked.into_iter().map(|i| chars[i]).collect::<String>()))
            }
            other => Err(EvalError::type_error(format!(
                "'{}' object is not subscriptable",
                other.type_name()
            ))),
        }
    }
}

/// Resolve a possibly negative index against `len`
fn sequence_index(len: usize, index: &Value, kind: &str) -> EvalResult<usize> {
    let raw = index.as_int().ok_or_else(|| {
        EvalError::type_error(format!(
            "{} indices must be integers or slices, not {}",
            kind,
            index.type_name()
        ))
    })?;
    let len = len as i64;
    let resolved = if raw < 0 { raw + len } else { raw };
    if resolved < 0 || resolved >= len {
        return Err(EvalError::index_error(format!("{} index out of range", kind)));
    }
    Ok(resolved as usize)
}

/// Positions selected by `[lower:upper:step]` on a sequence of `len` items
pub(crate) fn slice_indices(
    len: usize,
    lower: Option<i64>,
    upper: Option<i64>,
    step: Option<i64>,
) -> EvalResult<Vec<usize>> {
    let len = len as i64;
    let step = step.unwrap_or(1);
    if step == 0 {
        return Err(EvalError::value_error("slice step cannot be zero"));
    }
    let resolve = |v: i64, low: i64, high: i64| {
        let v = if v < 0 { v + len } else { v };
        v.clamp(low, high)
    };
    let mut picked = Vec::new();
    if step > 0 {
        let start = lower.map_or(0, |v| resolve(v, 0, len));
        let stop = upper.map_or(len, |v| resolve(v, 0, len));
        let mut i = start;
        while i < stop {
            picked.push(i as usize);
            match i.checked_add(step) {
                Some(next) => i = next,
                None => break,
            }
        }
    } else {
        let start = lower.map_or(len - 1, |v| resolve(v, -1, len - 1));
        let stop = upper.map_or(-1, |v| resolve(v, -1, len - 1));
        let mut i = start;
        while i > stop {
            picked.push(i as usize);
            match i.checked_add(step) {
                Some(next) => i = next,
                None => break,
            }
        }
    }
    Ok(picked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_expression, parse_statements};
    use crate::policy::AllowList;
    use assert_matches::assert_matches;
    use std::sync::Arc;

    fn run(lines: &[&str]) -> EvalResult<Value> {
        let env = Environment::build(Arc::new(AllowList::default().resolve().unwrap()));
        let limits = ResourceLimits::default();
        let mut interp = Interpreter::new(&env, &limits, None);
        let (last, statements) = lines.split_last().unwrap();
        for (i, line) in statements.iter().enumerate() {
            for stmt in parse_statements(line, i + 1).unwrap() {
                interp.execute(&stmt)?;
            }
        }
        let expr = parse_expression(last, lines.len()).unwrap();
        interp.evaluate(&expr)
    }

    fn repr(lines: &[&str]) -> String {
        run(lines).unwrap().repr()
    }

    #[test]
    fn test_bindings_flow_forward() {
        assert_eq!(repr(&["x = 5", "y = x * 2", "x + y"]), "15");
        assert_eq!(repr(&["a, (b, c) = 1, [2, 3]", "a + b + c"]), "6");
        assert_eq!(repr(&["a = b = []", "a.append(1)", "b"]), "[1]");
    }

    #[test]
    fn test_augmented_assignment() {
        assert_eq!(repr(&["n = 1", "n += 2; n *= 3", "n"]), "9");
        assert_eq!(repr(&["xs = [1]", "alias = xs", "xs += [2]", "alias"]), "[1, 2]");
        assert_eq!(repr(&["d = {'k': 1}", "d['k'] += 10", "d"]), "{'k': 11}");
    }

    #[test]
    fn test_unresolved_name() {
        assert_eq!(
            run(&["undefined_name + 1"]).unwrap_err(),
            EvalError::Unresolved {
                name: "undefined_name".into()
            }
        );
    }

    #[test]
    fn test_bindings_shadow_environment() {
        assert_eq!(repr(&["len = 3", "len + 1"]), "4");
    }

    #[test]
    fn test_comprehensions_and_lambdas() {
        assert_eq!(
            repr(&["[x * y for x in range(3) for y in (1, 10) if x]"]),
            "[1, 10, 2, 20]"
        );
        assert_eq!(repr(&["{k: len(k) for k in ['ab', 'c']}"]), "{'ab': 2, 'c': 1}");
        assert_eq!(repr(&["add = lambda a, b=10: a + b", "add(1), add(1, b=2)"]), "(11, 3)");
        assert_eq!(
            repr(&["make = lambda n: lambda x: x + n", "make(5)(1)"]),
            "6"
        );
    }

    #[test]
    fn test_comprehension_variables_do_not_leak() {
        assert_matches!(
            run(&["[i for i in range(3)]", "i"]),
            Err(EvalError::Unresolved { .. })
        );
    }

    #[test]
    fn test_recursion_is_bounded() {
        let err = run(&["f = lambda n: f(n + 1)", "f(0)"]).unwrap_err();
        assert_matches!(err, EvalError::Runtime { error_type: "RecursionError", .. });
    }

    #[test]
    fn test_indexing_and_slicing() {
        assert_eq!(repr(&["xs = [1, 2, 3, 4]", "xs[-1], xs[1:3], xs[::-2]"]), "(4, [2, 3], [4, 2])");
        assert_eq!(repr(&["'hello'[1:4]"]), "'ell'");
        assert_matches!(
            run(&["[1][5]"]),
            Err(EvalError::Runtime { error_type: "IndexError", .. })
        );
        assert_matches!(
            run(&["{'a': 1}['b']"]),
            Err(EvalError::Runtime { error_type: "KeyError", .. })
        );
    }

    #[test]
    fn test_unpacking_mismatch() {
        assert_matches!(
            run(&["a, b = [1, 2, 3]", "a"]),
            Err(EvalError::Runtime { error_type: "ValueError", .. })
        );
    }

    #[test]
    fn test_operation_limit() {
        let env = Environment::build(Arc::new(AllowList::default().resolve().unwrap()));
        let limits = ResourceLimits {
            max_operations: 50,
            ..ResourceLimits::default()
        };
        let mut interp = Interpreter::new(&env, &limits, None);
        let expr = parse_expression("sum([x for x in range(100)])", 1).unwrap();
        assert_matches!(
            interp.evaluate(&expr),
            Err(EvalError::Runtime { error_type: "ResourceLimitError", .. })
        );
    }

    #[test]
    fn test_expired_deadline() {
        let env = Environment::build(Arc::new(AllowList::default().resolve().unwrap()));
        let limits = ResourceLimits::default();
        let mut interp = Interpreter::new(&env, &limits, Some(Instant::now()));
        let expr = parse_expression("list(range(5000))", 1).unwrap();
        assert_eq!(interp.evaluate(&expr).unwrap_err(), EvalError::timeout());
    }

    #[test]
    fn test_slice_indices() {
        assert_eq!(slice_indices(5, None, None, None).unwrap(), vec![0, 1, 2, 3, 4]);
        assert_eq!(slice_indices(5, Some(-2), None, None).unwrap(), vec![3, 4]);
        assert_eq!(slice_indices(5, None, None, Some(-1)).unwrap(), vec![4, 3, 2, 1, 0]);
        assert_eq!(slice_indices(5, Some(10), Some(20), None).unwrap(), Vec::<usize>::new());
        assert!(slice_indices(5, None, None, Some(0)).is_err());
        assert_eq!(slice_indices(5, Some(1), None, Some(i64::MAX)).unwrap(), vec![1]);
        assert_eq!(slice_indices(5, Some(3), None, Some(i64::MIN)).unwrap(), vec![3]);
    }
}
