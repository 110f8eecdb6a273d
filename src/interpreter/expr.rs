//! Expression evaluation (spec §4.3 "Expression evaluation").

use std::cell::RefCell;
use std::rc::Rc;

use crate::ast::{DictPair, Expr, ExprKind};
use crate::environment::Environment;
use crate::error::QuantumError;
use crate::position::Position;
use crate::value::{format_number, Class, Function, Instance, Native, Value};

use super::{EvalResult, Interpreter, Signal};

impl Interpreter {
    pub fn evaluate(&mut self, expr: &Expr, env: &Environment) -> EvalResult {
        let pos = Position::new(expr.line, 1);
        match &expr.kind {
            ExprKind::Number(n) => Ok(Value::Number(*n)),
            ExprKind::String(s) => Ok(Value::String(s.clone())),
            ExprKind::Bool(b) => Ok(Value::Bool(*b)),
            ExprKind::Nil => Ok(Value::Nil),
            ExprKind::Identifier(name) => env.get(name, pos).map_err(Signal::Error),
            ExprKind::SuperRef(method) => self.evaluate_super(method, env, pos),
            ExprKind::Binary { op, left, right } => self.evaluate_binary(op, left, right, env, pos),
            ExprKind::Unary { op, operand } => self.evaluate_unary(op, operand, env, pos),
            ExprKind::Assign { op, target, value } => self.evaluate_assign(op, target, value, env, pos),
            ExprKind::Ternary {
                cond,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(cond, env)?.is_truthy() {
                    self.evaluate(then_branch, env)
                } else {
                    self.evaluate(else_branch, env)
                }
            }
            ExprKind::Call { callee, args } => self.evaluate_call(callee, args, env, pos),
            ExprKind::Index { object, index } => self.evaluate_index(object, index, env, pos),
            ExprKind::Slice {
                object,
                start,
                stop,
                step,
            } => self.evaluate_slice(object, start, stop, step, env, pos),
            ExprKind::Member { object, name } => self.evaluate_member(object, name, env, pos),
            ExprKind::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(self.evaluate(item, env)?);
                }
                Ok(Value::array(out))
            }
            ExprKind::Dict(pairs) => self.evaluate_dict(pairs, env),
            ExprKind::Tuple(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(self.evaluate(item, env)?);
                }
                Ok(Value::array(out))
            }
            ExprKind::ListComp {
                expr,
                vars,
                iter,
                cond,
            } => self.evaluate_list_comp(expr, vars, iter, cond.as_deref(), env, pos),
            ExprKind::Lambda { params, body } => Ok(Value::Function(Rc::new(Function {
                name: "<lambda>".to_owned(),
                params: params.clone(),
                body: Rc::new(body.clone()),
                closure: env.clone(),
                bound_self: None,
            }))),
        }
    }

    fn evaluate_dict(&mut self, pairs: &[DictPair], env: &Environment) -> EvalResult {
        let mut map = crate::value::IndexMap::new();
        for pair in pairs {
            let key = self.evaluate(&pair.key, env)?;
            let key = self.stringify(&key);
            let value = self.evaluate(&pair.value, env)?;
            map.insert(key, value);
        }
        Ok(Value::dict(map))
    }

    fn evaluate_super(&mut self, method: &str, env: &Environment, pos: Position) -> EvalResult {
        let self_val = env.get("self", pos).map_err(Signal::Error)?;
        let Value::Instance(inst) = &self_val else {
            return Err(Signal::Error(QuantumError::runtime("'super' used outside a method", pos.line)));
        };
        let base = inst.borrow().class.borrow().base.clone();
        let Some(base_class) = base else {
            return Err(Signal::Error(QuantumError::runtime("class has no base for 'super'", pos.line)));
        };
        let name = if method.is_empty() { "init" } else { method };
        let func = Class::resolve_method(&base_class, name)
            .ok_or_else(|| QuantumError::name(format!("super has no method '{name}'"), pos.line))
            .map_err(Signal::Error)?;
        Ok(Value::Function(Rc::new(Function {
            bound_self: Some(Rc::clone(inst)),
            ..(*func).clone()
        })))
    }

    fn evaluate_unary(&mut self, op: &str, operand: &Expr, env: &Environment, pos: Position) -> EvalResult {
        let v = self.evaluate(operand, env)?;
        match op {
            "-" => {
                let n = v.as_number().ok_or_else(|| {
                    QuantumError::type_error(format!("unary '-' requires a number, got {}", v.type_name()), pos.line)
                }).map_err(Signal::Error)?;
                Ok(Value::Number(-n))
            }
            "not" => Ok(Value::Bool(!v.is_truthy())),
            "~" => {
                let n = v.as_number().unwrap_or(0.0) as i64;
                Ok(Value::Number(!n as f64))
            }
            other => Err(Signal::Error(QuantumError::runtime(format!("unknown unary operator '{other}'"), pos.line))),
        }
    }

    fn evaluate_binary(&mut self, op: &str, left: &Expr, right: &Expr, env: &Environment, pos: Position) -> EvalResult {
        if op == "and" {
            let l = self.evaluate(left, env)?;
            return if !l.is_truthy() { Ok(l) } else { self.evaluate(right, env) };
        }
        if op == "or" {
            let l = self.evaluate(left, env)?;
            return if l.is_truthy() { Ok(l) } else { self.evaluate(right, env) };
        }

        let l = self.evaluate(left, env)?;
        let r = self.evaluate(right, env)?;
        self.apply_binary(op, l, r, pos)
    }

    pub(super) fn apply_binary(&mut self, op: &str, l: Value, r: Value, pos: Position) -> EvalResult {
        match op {
            "+" => self.add(l, r, pos),
            "-" | "*" | "/" | "%" | "//" | "**" => self.arith(op, l, r, pos),
            "==" => Ok(Value::Bool(self.values_equal(&l, &r))),
            "!=" => Ok(Value::Bool(!self.values_equal(&l, &r))),
            "<" | ">" | "<=" | ">=" => self.compare(op, l, r, pos),
            "in" => self.membership(l, r, pos),
            "&" | "|" | "^" => self.bitwise(op, l, r, pos),
            "<<" | ">>" => self.shift(op, l, r, pos),
            other => Err(Signal::Error(QuantumError::runtime(format!("unknown operator '{other}'"), pos.line))),
        }
    }

    fn add(&mut self, l: Value, r: Value, pos: Position) -> EvalResult {
        match (&l, &r) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
            (Value::Array(a), Value::Array(b)) => {
                let mut out = a.borrow().clone();
                out.extend(b.borrow().iter().cloned());
                Ok(Value::array(out))
            }
            (Value::String(_), _) | (_, Value::String(_)) => {
                Ok(Value::String(format!("{}{}", self.stringify(&l), self.stringify(&r))))
            }
            _ => Err(Signal::Error(QuantumError::type_error(
                format!("unsupported operand types for +: '{}' and '{}'", l.type_name(), r.type_name()),
                pos.line,
            ))),
        }
    }

    fn arith(&mut self, op: &str, l: Value, r: Value, pos: Position) -> EvalResult {
        if op == "*" {
            if let (Value::String(s), Value::Number(n)) = (&l, &r) {
                return Ok(Value::String(s.repeat((*n).max(0.0) as usize)));
            }
            if let (Value::Number(n), Value::String(s)) = (&l, &r) {
                return Ok(Value::String(s.repeat((*n).max(0.0) as usize)));
            }
        }
        let (a, b) = match (l.as_number(), r.as_number()) {
            (Some(a), Some(b)) => (a, b),
            _ => {
                return Err(Signal::Error(QuantumError::type_error(
                    format!("unsupported operand types for {op}: '{}' and '{}'", l.type_name(), r.type_name()),
                    pos.line,
                )))
            }
        };
        match op {
            "-" => Ok(Value::Number(a - b)),
            "*" => Ok(Value::Number(a * b)),
            "/" => {
                if b == 0.0 {
                    Err(Signal::Error(QuantumError::runtime("Division by zero", pos.line)))
                } else {
                    Ok(Value::Number(a / b))
                }
            }
            "%" => {
                if b == 0.0 {
                    Err(Signal::Error(QuantumError::runtime("Modulo by zero", pos.line)))
                } else {
                    // Floor-toward-negative-infinity, matching `//` below, so
                    // `(a // b) * b + (a % b) == a` holds for negative operands.
                    Ok(Value::Number(a - b * (a / b).floor()))
                }
            }
            "//" => {
                if b == 0.0 {
                    Err(Signal::Error(QuantumError::runtime("Division by zero", pos.line)))
                } else {
                    Ok(Value::Number((a / b).floor()))
                }
            }
            "**" => Ok(Value::Number(a.powf(b))),
            _ => unreachable!(),
        }
    }

    fn compare(&mut self, op: &str, l: Value, r: Value, pos: Position) -> EvalResult {
        if let (Value::String(a), Value::String(b)) = (&l, &r) {
            let ord = a.cmp(b);
            return Ok(Value::Bool(match op {
                "<" => ord.is_lt(),
                ">" => ord.is_gt(),
                "<=" => ord.is_le(),
                ">=" => ord.is_ge(),
                _ => unreachable!(),
            }));
        }
        let a = l.as_number().ok_or_else(|| {
            QuantumError::type_error(format!("'{}' cannot be compared", l.type_name()), pos.line)
        }).map_err(Signal::Error)?;
        let b = r.as_number().ok_or_else(|| {
            QuantumError::type_error(format!("'{}' cannot be compared", r.type_name()), pos.line)
        }).map_err(Signal::Error)?;
        Ok(Value::Bool(match op {
            "<" => a < b,
            ">" => a > b,
            "<=" => a <= b,
            ">=" => a >= b,
            _ => unreachable!(),
        }))
    }

    fn membership(&mut self, l: Value, r: Value, pos: Position) -> EvalResult {
        match &r {
            Value::Array(a) => Ok(Value::Bool(a.borrow().iter().any(|v| *v == l))),
            Value::String(s) => {
                let needle = self.stringify(&l);
                Ok(Value::Bool(s.contains(&needle)))
            }
            Value::Dict(d) => {
                let key = self.stringify(&l);
                Ok(Value::Bool(d.borrow().contains_key(&key)))
            }
            other => Err(Signal::Error(QuantumError::type_error(
                format!("argument of type '{}' is not iterable", other.type_name()),
                pos.line,
            ))),
        }
    }

    fn bitwise(&mut self, op: &str, l: Value, r: Value, pos: Position) -> EvalResult {
        let a = l.as_number().unwrap_or(0.0) as i64;
        let b = r.as_number().unwrap_or(0.0) as i64;
        let _ = pos;
        Ok(Value::Number(match op {
            "&" => (a & b) as f64,
            "|" => (a | b) as f64,
            "^" => (a ^ b) as f64,
            _ => unreachable!(),
        }))
    }

    fn shift(&mut self, op: &str, l: Value, r: Value, pos: Position) -> EvalResult {
        let a = l.as_number().unwrap_or(0.0) as i64;
        let b = r.as_number().unwrap_or(0.0) as i64;
        let _ = pos;
        Ok(Value::Number(match op {
            "<<" => a.wrapping_shl(b as u32) as f64,
            ">>" => a.wrapping_shr(b as u32) as f64,
            _ => unreachable!(),
        }))
    }

    pub(super) fn values_equal(&mut self, l: &Value, r: &Value) -> bool {
        if l.type_name() != r.type_name() {
            return false;
        }
        l == r
    }

    fn evaluate_index(&mut self, object: &Expr, index: &Expr, env: &Environment, pos: Position) -> EvalResult {
        let obj = self.evaluate(object, env)?;
        let idx = self.evaluate(index, env)?;
        self.index_get(&obj, &idx, pos)
    }

    pub(super) fn index_get(&mut self, obj: &Value, idx: &Value, pos: Position) -> EvalResult {
        match obj {
            Value::Array(a) => {
                let borrowed = a.borrow();
                let i = wrap_index(idx.as_number().unwrap_or(0.0) as i64, borrowed.len());
                borrowed
                    .get(i)
                    .cloned()
                    .ok_or_else(|| Signal::Error(QuantumError::index("array index out of range", pos.line)))
            }
            Value::String(s) => {
                let chars: Vec<char> = s.chars().collect();
                let i = wrap_index(idx.as_number().unwrap_or(0.0) as i64, chars.len());
                chars
                    .get(i)
                    .map(|c| Value::String(c.to_string()))
                    .ok_or_else(|| Signal::Error(QuantumError::index("string index out of range", pos.line)))
            }
            Value::Dict(d) => {
                let key = self.stringify(idx);
                Ok(d.borrow().get(&key).cloned().unwrap_or(Value::Nil))
            }
            other => Err(Signal::Error(QuantumError::type_error(
                format!("'{}' is not subscriptable", other.type_name()),
                pos.line,
            ))),
        }
    }

    fn evaluate_slice(
        &mut self,
        object: &Expr,
        start: &Option<Box<Expr>>,
        stop: &Option<Box<Expr>>,
        step: &Option<Box<Expr>>,
        env: &Environment,
        pos: Position,
    ) -> EvalResult {
        let obj = self.evaluate(object, env)?;
        let step_val = match step {
            Some(e) => self.evaluate(e, env)?.as_number().unwrap_or(1.0) as i64,
            None => 1,
        };
        if step_val == 0 {
            return Err(Signal::Error(QuantumError::runtime("slice step cannot be zero", pos.line)));
        }

        let len = match &obj {
            Value::Array(a) => a.borrow().len(),
            Value::String(s) => s.chars().count(),
            other => {
                return Err(Signal::Error(QuantumError::type_error(
                    format!("'{}' is not sliceable", other.type_name()),
                    pos.line,
                )))
            }
        };

        let (default_start, default_stop) = if step_val > 0 {
            (0i64, len as i64)
        } else {
            (len as i64 - 1, -1i64)
        };

        let start_val = match start {
            Some(e) => clamp_slice_index(self.evaluate(e, env)?.as_number().unwrap_or(0.0) as i64, len, step_val > 0),
            None => default_start,
        };
        let stop_val = match stop {
            Some(e) => clamp_slice_index(self.evaluate(e, env)?.as_number().unwrap_or(0.0) as i64, len, step_val > 0),
            None => default_stop,
        };

        let indices = slice_indices(start_val, stop_val, step_val, len);

        match obj {
            Value::Array(a) => {
                let borrowed = a.borrow();
                Ok(Value::array(indices.into_iter().map(|i| borrowed[i].clone()).collect()))
            }
            Value::String(s) => {
                let chars: Vec<char> = s.chars().collect();
                Ok(Value::String(indices.into_iter().map(|i| chars[i]).collect()))
            }
            _ => unreachable!(),
        }
    }

    fn evaluate_member(&mut self, object: &Expr, name: &str, env: &Environment, pos: Position) -> EvalResult {
        let obj = self.evaluate(object, env)?;
        self.member_get(&obj, name, pos)
    }

    pub(super) fn member_get(&mut self, obj: &Value, name: &str, pos: Position) -> EvalResult {
        if name == "length" {
            match obj {
                Value::Array(a) => return Ok(Value::Number(a.borrow().len() as f64)),
                Value::String(s) => return Ok(Value::Number(s.chars().count() as f64)),
                _ => {}
            }
        }
        match obj {
            Value::Instance(inst) => {
                if let Some(field) = inst.borrow().fields.get(name).cloned() {
                    return Ok(field);
                }
                let class = inst.borrow().class.clone();
                if let Some(method) = Class::resolve_method(&class, name) {
                    return Ok(Value::Function(Rc::new(Function {
                        bound_self: Some(Rc::clone(inst)),
                        ..(*method).clone()
                    })));
                }
                Ok(Value::Nil)
            }
            Value::Class(c) => {
                if let Some(method) = Class::resolve_static(c, name) {
                    return Ok(Value::Function(method));
                }
                if let Some(v) = c.borrow().static_fields.borrow().get(name).cloned() {
                    return Ok(v);
                }
                Ok(Value::Nil)
            }
            Value::Dict(d) => Ok(d.borrow().get(name).cloned().unwrap_or(Value::Nil)),
            other => Err(Signal::Error(QuantumError::type_error(
                format!("'{}' has no attribute '{name}'", other.type_name()),
                pos.line,
            ))),
        }
    }

    fn evaluate_call(&mut self, callee: &Expr, args: &[Expr], env: &Environment, pos: Position) -> EvalResult {
        let mut evaluated_args = Vec::with_capacity(args.len());
        for a in args {
            evaluated_args.push(self.evaluate(a, env)?);
        }

        match &callee.kind {
            ExprKind::Member { object, name } => {
                let obj = self.evaluate(object, env)?;
                self.dispatch_method(obj, name, evaluated_args, pos)
            }
            ExprKind::SuperRef(method) => {
                let func = self.evaluate_super(method, env, pos)?;
                self.call_value(func, evaluated_args, pos)
            }
            _ => {
                let callee_val = self.evaluate(callee, env)?;
                if let Value::Class(class) = &callee_val {
                    return self.instantiate(class, evaluated_args, pos);
                }
                self.call_value(callee_val, evaluated_args, pos)
            }
        }
    }

    pub fn call_value(&mut self, callee: Value, args: Vec<Value>, pos: Position) -> EvalResult {
        match callee {
            Value::Function(func) => self.call_function(&func, args, pos),
            Value::Native(native) => self.call_native(&native, &args, pos),
            other => Err(Signal::Error(QuantumError::type_error(
                format!("'{}' object is not callable", other.type_name()),
                pos.line,
            ))),
        }
    }

    pub(super) fn call_function(&mut self, func: &Function, args: Vec<Value>, pos: Position) -> EvalResult {
        let call_env = Environment::child_of(&func.closure);
        if let Some(bound) = &func.bound_self {
            call_env.define("self", Value::Instance(Rc::clone(bound)), false);
        }
        for (i, param) in func.params.iter().enumerate() {
            call_env.define(param.clone(), args.get(i).cloned().unwrap_or(Value::Nil), false);
        }
        match self.execute_block(&func.body, &call_env) {
            Ok(()) => Ok(Value::Nil),
            Err(Signal::Return(v)) => Ok(v),
            Err(other) => Err(other),
        }
    }

    pub(super) fn call_native(&mut self, native: &Native, args: &[Value], pos: Position) -> EvalResult {
        let _ = pos;
        (native.func)(self, args)
    }

    fn instantiate(&mut self, class: &Rc<RefCell<Class>>, args: Vec<Value>, pos: Position) -> EvalResult {
        let instance = Rc::new(RefCell::new(Instance {
            class: Rc::clone(class),
            fields: std::collections::HashMap::new(),
        }));
        if let Some(init) = Class::resolve_method(class, "init") {
            let bound = Function {
                bound_self: Some(Rc::clone(&instance)),
                ..(*init).clone()
            };
            self.call_function(&bound, args, pos)?;
        }
        Ok(Value::Instance(instance))
    }

    fn evaluate_assign(&mut self, op: &str, target: &Expr, value: &Expr, env: &Environment, pos: Position) -> EvalResult {
        if op == "unpack" {
            return self.evaluate_unpack(target, value, env, pos);
        }

        let rhs = self.evaluate(value, env)?;

        match &target.kind {
            ExprKind::Identifier(name) => {
                let new_val = if op == "=" {
                    rhs
                } else {
                    let current = env.get(name, pos).map_err(Signal::Error)?;
                    self.apply_binary(strip_eq(op), current, rhs, pos)?
                };
                env.assign_or_define(name, new_val.clone(), pos).map_err(Signal::Error)?;
                Ok(new_val)
            }
            ExprKind::Index { object, index } => {
                let obj = self.evaluate(object, env)?;
                let idx = self.evaluate(index, env)?;
                let new_val = if op == "=" {
                    rhs
                } else {
                    let current = self.index_get(&obj, &idx, pos)?;
                    self.apply_binary(strip_eq(op), current, rhs, pos)?
                };
                self.index_set(&obj, &idx, new_val.clone(), pos)?;
                Ok(new_val)
            }
            ExprKind::Member { object, name } => {
                let obj = self.evaluate(object, env)?;
                let new_val = if op == "=" {
                    rhs
                } else {
                    let current = self.member_get(&obj, name, pos)?;
                    self.apply_binary(strip_eq(op), current, rhs, pos)?
                };
                self.member_set(&obj, name, new_val.clone(), pos)?;
                Ok(new_val)
            }
            _ => Err(Signal::Error(QuantumError::runtime("invalid assignment target", pos.line))),
        }
    }

    fn evaluate_unpack(&mut self, target: &Expr, value: &Expr, env: &Environment, pos: Position) -> EvalResult {
        let ExprKind::Tuple(names) = &target.kind else {
            return Err(Signal::Error(QuantumError::runtime("invalid unpack target", pos.line)));
        };
        let rhs = self.evaluate(value, env)?;
        let Value::Array(items) = &rhs else {
            return Err(Signal::Error(QuantumError::type_error(
                format!("cannot unpack '{}'", rhs.type_name()),
                pos.line,
            )));
        };
        let items = items.borrow();
        for (i, name_expr) in names.iter().enumerate() {
            let ExprKind::Identifier(name) = &name_expr.kind else {
                continue;
            };
            let v = items.get(i).cloned().unwrap_or(Value::Nil);
            env.assign_or_define(name, v, pos).map_err(Signal::Error)?;
        }
        Ok(rhs.clone())
    }

    fn index_set(&mut self, obj: &Value, idx: &Value, value: Value, pos: Position) -> Result<(), Signal> {
        match obj {
            Value::Array(a) => {
                let mut borrowed = a.borrow_mut();
                let len = borrowed.len();
                let i = wrap_index(idx.as_number().unwrap_or(0.0) as i64, len);
                if i >= len {
                    return Err(Signal::Error(QuantumError::index("array index out of range", pos.line)));
                }
                borrowed[i] = value;
                Ok(())
            }
            Value::Dict(d) => {
                let key = self.stringify(idx);
                d.borrow_mut().insert(key, value);
                Ok(())
            }
            other => Err(Signal::Error(QuantumError::type_error(
                format!("'{}' does not support item assignment", other.type_name()),
                pos.line,
            ))),
        }
    }

    fn member_set(&mut self, obj: &Value, name: &str, value: Value, pos: Position) -> Result<(), Signal> {
        match obj {
            Value::Instance(inst) => {
                inst.borrow_mut().fields.insert(name.to_owned(), value);
                Ok(())
            }
            Value::Dict(d) => {
                d.borrow_mut().insert(name.to_owned(), value);
                Ok(())
            }
            Value::Class(c) => {
                c.borrow().static_fields.borrow_mut().insert(name.to_owned(), value);
                Ok(())
            }
            other => Err(Signal::Error(QuantumError::type_error(
                format!("'{}' has no attribute '{name}'", other.type_name()),
                pos.line,
            ))),
        }
    }

    fn evaluate_list_comp(
        &mut self,
        expr: &Expr,
        vars: &[String],
        iter: &Expr,
        cond: Option<&Expr>,
        env: &Environment,
        pos: Position,
    ) -> EvalResult {
        let iterable = self.evaluate(iter, env)?;
        let items: Vec<(Value, Value)> = match &iterable {
            Value::Array(a) => a.borrow().iter().cloned().map(|v| split_pair(v)).collect(),
            Value::String(s) => s.chars().map(|c| (Value::String(c.to_string()), Value::Nil)).collect(),
            Value::Dict(d) => d.borrow().keys().map(|k| (Value::String(k.clone()), Value::Nil)).collect(),
            other => {
                return Err(Signal::Error(QuantumError::type_error(
                    format!("'{}' is not iterable", other.type_name()),
                    pos.line,
                )))
            }
        };

        let mut out = Vec::new();
        for (first, second) in items {
            let comp_env = Environment::child_of(env);
            comp_env.define(&vars[0], first, false);
            if let Some(v2) = vars.get(1) {
                comp_env.define(v2, second, false);
            }
            if let Some(cond) = cond {
                if !self.evaluate(cond, &comp_env)?.is_truthy() {
                    continue;
                }
            }
            out.push(self.evaluate(expr, &comp_env)?);
        }
        Ok(Value::array(out))
    }

    /// Human-readable rendering used by `print`, string concatenation and
    /// the `str()` builtin; dispatches `__str__` on instances.
    pub fn stringify(&mut self, v: &Value) -> String {
        match v {
            Value::Instance(inst) => {
                let class = inst.borrow().class.clone();
                if let Some(method) = Class::resolve_method(&class, "__str__") {
                    let bound = Function {
                        bound_self: Some(Rc::clone(inst)),
                        ..(*method).clone()
                    };
                    if let Ok(v) = self.call_function(&bound, Vec::new(), Position::start()) {
                        return self.stringify(&v);
                    }
                }
                format!("<{} instance>", class.borrow().name)
            }
            Value::Array(a) => {
                let items: Vec<String> = a
                    .borrow()
                    .iter()
                    .map(|v| match v {
                        Value::String(s) => format!("{s:?}"),
                        other => self.stringify(other),
                    })
                    .collect();
                format!("[{}]", items.join(", "))
            }
            Value::Dict(d) => {
                let items: Vec<String> = d
                    .borrow()
                    .iter()
                    .map(|(k, v)| format!("{k:?}: {}", self.stringify(v)))
                    .collect();
                format!("{{{}}}", items.join(", "))
            }
            Value::Number(n) => format_number(*n),
            Value::String(s) => s.clone(),
            Value::Bool(b) => b.to_string(),
            Value::Nil => "nil".to_owned(),
            Value::Function(f) => format!("<function {}>", f.name),
            Value::Native(n) => format!("<native {}>", n.name),
            Value::Class(c) => format!("<class {}>", c.borrow().name),
        }
    }
}

fn strip_eq(op: &str) -> &str {
    match op {
        "+=" => "+",
        "-=" => "-",
        "*=" => "*",
        "/=" => "/",
        other => other,
    }
}

fn wrap_index(i: i64, len: usize) -> usize {
    if i < 0 {
        (len as i64 + i).max(0) as usize
    } else {
        i as usize
    }
}

fn clamp_slice_index(i: i64, len: usize, forward: bool) -> i64 {
    let i = if i < 0 { i + len as i64 } else { i };
    if forward {
        i.clamp(0, len as i64)
    } else {
        i.clamp(-1, len as i64 - 1)
    }
}

fn slice_indices(start: i64, stop: i64, step: i64, len: usize) -> Vec<usize> {
    let mut out = Vec::new();
    let mut i = start;
    if step > 0 {
        while i < stop && i < len as i64 {
            if i >= 0 {
                out.push(i as usize);
            }
            i += step;
        }
    } else {
        while i > stop && i >= 0 {
            if (i as usize) < len {
                out.push(i as usize);
            }
            i += step;
        }
    }
    out
}

fn split_pair(v: Value) -> (Value, Value) {
    if let Value::Array(a) = &v {
        let borrowed = a.borrow();
        if borrowed.len() >= 2 {
            return (borrowed[0].clone(), borrowed[1].clone());
        }
    }
    (v, Value::Nil)
}
