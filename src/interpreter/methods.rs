//! Built-in method dispatch tables (spec §4.3.2).

use std::cmp::Ordering;
use std::rc::Rc;

use crate::error::QuantumError;
use crate::position::Position;
use crate::value::{Class, Function, Value};

use super::{EvalResult, Interpreter, Signal};

impl Interpreter {
    pub(super) fn dispatch_method(&mut self, obj: Value, name: &str, args: Vec<Value>, pos: Position) -> EvalResult {
        match &obj {
            Value::Array(_) => self.array_method(&obj, name, args, pos),
            Value::String(_) => self.string_method(&obj, name, args, pos),
            Value::Dict(d) => {
                if let Some(callable) = d.borrow().get(name).cloned() {
                    if matches!(callable, Value::Function(_) | Value::Native(_)) {
                        return self.call_value(callable, args, pos);
                    }
                }
                self.dict_method(&obj, name, args, pos)
            }
            Value::Instance(inst) => {
                let class = inst.borrow().class.clone();
                if let Some(method) = Class::resolve_method(&class, name) {
                    let bound = Function {
                        bound_self: Some(Rc::clone(inst)),
                        ..(*method).clone()
                    };
                    return self.call_function(&bound, args, pos);
                }
                if let Some(field) = inst.borrow().fields.get(name).cloned() {
                    if matches!(field, Value::Function(_) | Value::Native(_)) {
                        return self.call_value(field, args, pos);
                    }
                }
                Err(Signal::Error(QuantumError::name(format!("'{name}' is not a method of instance"), pos.line)))
            }
            Value::Class(c) => {
                if let Some(method) = Class::resolve_static(c, name) {
                    return self.call_function(&method, args, pos);
                }
                Err(Signal::Error(QuantumError::name(format!("'{name}' is not a static method"), pos.line)))
            }
            other => Err(Signal::Error(QuantumError::type_error(
                format!("'{}' has no method '{name}'", other.type_name()),
                pos.line,
            ))),
        }
    }

    fn array_method(&mut self, obj: &Value, name: &str, mut args: Vec<Value>, pos: Position) -> EvalResult {
        let Value::Array(arr) = obj else { unreachable!() };
        match name {
            "push" | "append" => {
                arr.borrow_mut().extend(args);
                Ok(Value::Number(arr.borrow().len() as f64))
            }
            "pop" => {
                let mut borrowed = arr.borrow_mut();
                let i = match args.first().and_then(Value::as_number) {
                    Some(n) => wrap(n as i64, borrowed.len()),
                    None => borrowed.len().saturating_sub(1),
                };
                if i < borrowed.len() {
                    Ok(borrowed.remove(i))
                } else {
                    Ok(Value::Nil)
                }
            }
            "shift" => {
                let mut borrowed = arr.borrow_mut();
                if borrowed.is_empty() {
                    Ok(Value::Nil)
                } else {
                    Ok(borrowed.remove(0))
                }
            }
            "unshift" => {
                let mut borrowed = arr.borrow_mut();
                for (i, v) in args.into_iter().enumerate() {
                    borrowed.insert(i, v);
                }
                Ok(Value::Number(borrowed.len() as f64))
            }
            "length" => Ok(Value::Number(arr.borrow().len() as f64)),
            "reverse" => {
                arr.borrow_mut().reverse();
                Ok(obj.clone())
            }
            "contains" => {
                let needle = args.into_iter().next().unwrap_or(Value::Nil);
                Ok(Value::Bool(arr.borrow().iter().any(|v| *v == needle)))
            }
            "join" => {
                let sep = match args.first() {
                    Some(v) => self.stringify(v),
                    None => ",".to_owned(),
                };
                let items: Vec<String> = arr.borrow().iter().map(|v| self.stringify(v)).collect();
                Ok(Value::String(items.join(&sep)))
            }
            "slice" => {
                let borrowed = arr.borrow();
                let len = borrowed.len();
                let start = clamp(args.first().and_then(Value::as_number).map(|n| n as i64).unwrap_or(0), len);
                let stop = clamp(args.get(1).and_then(Value::as_number).map(|n| n as i64).unwrap_or(len as i64), len);
                if start >= stop {
                    Ok(Value::array(Vec::new()))
                } else {
                    Ok(Value::array(borrowed[start..stop].to_vec()))
                }
            }
            "map" => {
                let f = args.into_iter().next().ok_or_else(|| {
                    Signal::Error(QuantumError::runtime("map requires a function argument", pos.line))
                })?;
                let items = arr.borrow().clone();
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(self.call_value(f.clone(), vec![item], pos)?);
                }
                Ok(Value::array(out))
            }
            "filter" => {
                let f = args.into_iter().next().ok_or_else(|| {
                    Signal::Error(QuantumError::runtime("filter requires a function argument", pos.line))
                })?;
                let items = arr.borrow().clone();
                let mut out = Vec::new();
                for item in items {
                    if self.call_value(f.clone(), vec![item.clone()], pos)?.is_truthy() {
                        out.push(item);
                    }
                }
                Ok(Value::array(out))
            }
            "sort" => {
                let mut borrowed = arr.borrow_mut();
                let all_numeric = borrowed.iter().all(|v| matches!(v, Value::Number(_)));
                if all_numeric {
                    borrowed.sort_by(|a, b| {
                        a.as_number()
                            .unwrap_or(0.0)
                            .partial_cmp(&b.as_number().unwrap_or(0.0))
                            .unwrap_or(Ordering::Equal)
                    });
                } else {
                    drop(borrowed);
                    let mut keyed: Vec<(String, Value)> = arr
                        .borrow()
                        .iter()
                        .map(|v| (self.stringify(v), v.clone()))
                        .collect();
                    keyed.sort_by(|a, b| a.0.cmp(&b.0));
                    *arr.borrow_mut() = keyed.into_iter().map(|(_, v)| v).collect();
                    return Ok(obj.clone());
                }
                drop(borrowed);
                Ok(obj.clone())
            }
            other => {
                let _ = args.pop();
                Err(Signal::Error(QuantumError::name(format!("array has no method '{other}'"), pos.line)))
            }
        }
    }

    fn string_method(&mut self, obj: &Value, name: &str, args: Vec<Value>, pos: Position) -> EvalResult {
        let Value::String(s) = obj else { unreachable!() };
        let mut arg_str = |i: usize| args.get(i).map(|v| self.stringify(v));
        match name {
            "upper" | "toUpperCase" => Ok(Value::String(s.to_uppercase())),
            "lower" | "toLowerCase" => Ok(Value::String(s.to_lowercase())),
            "trim" | "strip" => Ok(Value::String(trim_chars(s, args.first(), true, true))),
            "lstrip" => Ok(Value::String(trim_chars(s, args.first(), true, false))),
            "rstrip" => Ok(Value::String(trim_chars(s, args.first(), false, true))),
            "split" => {
                let sep = arg_str(0);
                let parts: Vec<Value> = match sep.as_deref() {
                    None | Some("") => s.split_whitespace().map(Value::string).collect(),
                    Some(sep) => s.split(sep).map(Value::string).collect(),
                };
                Ok(Value::array(parts))
            }
            "contains" | "includes" => {
                let needle = arg_str(0).unwrap_or_default();
                Ok(Value::Bool(s.contains(&needle)))
            }
            "starts_with" | "startsWith" => Ok(Value::Bool(s.starts_with(&arg_str(0).unwrap_or_default()))),
            "ends_with" | "endsWith" => Ok(Value::Bool(s.ends_with(&arg_str(0).unwrap_or_default()))),
            "replace" => {
                let from = arg_str(0).unwrap_or_default();
                let to = arg_str(1).unwrap_or_default();
                Ok(Value::String(s.replace(&from, &to)))
            }
            "slice" | "substr" | "substring" => {
                let chars: Vec<char> = s.chars().collect();
                let len = chars.len();
                let start = clamp(args.first().and_then(Value::as_number).map(|n| n as i64).unwrap_or(0), len);
                let stop = clamp(args.get(1).and_then(Value::as_number).map(|n| n as i64).unwrap_or(len as i64), len);
                if start >= stop {
                    Ok(Value::String(String::new()))
                } else {
                    Ok(Value::String(chars[start..stop].iter().collect()))
                }
            }
            "index" | "indexOf" => {
                let needle = arg_str(0).unwrap_or_default();
                Ok(Value::Number(match s.find(&needle) {
                    Some(byte_idx) => s[..byte_idx].chars().count() as f64,
                    None => -1.0,
                }))
            }
            "repeat" => {
                let n = args.first().and_then(Value::as_number).unwrap_or(0.0).max(0.0) as usize;
                Ok(Value::String(s.repeat(n)))
            }
            "chars" => Ok(Value::array(s.chars().map(|c| Value::String(c.to_string())).collect())),
            "charAt" | "at" => {
                let i = args.first().and_then(Value::as_number).unwrap_or(0.0) as i64;
                let chars: Vec<char> = s.chars().collect();
                let idx = wrap(i, chars.len());
                Ok(chars.get(idx).map(|c| Value::String(c.to_string())).unwrap_or(Value::String(String::new())))
            }
            "charCodeAt" => {
                let i = args.first().and_then(Value::as_number).unwrap_or(0.0) as i64;
                let chars: Vec<char> = s.chars().collect();
                let idx = wrap(i, chars.len());
                Ok(chars.get(idx).map(|c| Value::Number(*c as u32 as f64)).unwrap_or(Value::Number(f64::NAN)))
            }
            "padStart" => Ok(Value::String(pad(s, &args, self, true))),
            "padEnd" => Ok(Value::String(pad(s, &args, self, false))),
            "translate" => {
                let table = args.first().cloned().unwrap_or(Value::Nil);
                let Value::Dict(table) = table else {
                    return Ok(Value::String(s.clone()));
                };
                let mapped: String = s
                    .chars()
                    .map(|c| match table.borrow().get(&c.to_string()) {
                        Some(Value::String(rep)) => rep.clone(),
                        _ => c.to_string(),
                    })
                    .collect();
                Ok(Value::String(mapped))
            }
            "isdigit" | "isnumeric" => Ok(Value::Bool(!s.is_empty() && s.chars().all(|c| c.is_ascii_digit()))),
            "isalpha" => Ok(Value::Bool(!s.is_empty() && s.chars().all(|c| c.is_alphabetic()))),
            "isalnum" => Ok(Value::Bool(!s.is_empty() && s.chars().all(|c| c.is_alphanumeric()))),
            "isspace" => Ok(Value::Bool(!s.is_empty() && s.chars().all(|c| c.is_whitespace()))),
            "isupper" => Ok(Value::Bool(s.chars().any(|c| c.is_alphabetic()) && s.chars().all(|c| !c.is_lowercase()))),
            "islower" => Ok(Value::Bool(s.chars().any(|c| c.is_alphabetic()) && s.chars().all(|c| !c.is_uppercase()))),
            other => Err(Signal::Error(QuantumError::name(format!("string has no method '{other}'"), pos.line))),
        }
    }

    fn dict_method(&mut self, obj: &Value, name: &str, args: Vec<Value>, pos: Position) -> EvalResult {
        let Value::Dict(d) = obj else { unreachable!() };
        match name {
            "has" | "contains" | "hasOwnProperty" => {
                let key = args.first().map(|v| self.stringify(v)).unwrap_or_default();
                Ok(Value::Bool(d.borrow().contains_key(&key)))
            }
            "items" | "entries" => Ok(Value::array(
                d.borrow()
                    .iter()
                    .map(|(k, v)| Value::array(vec![Value::String(k.clone()), v.clone()]))
                    .collect(),
            )),
            "get" => {
                let key = args.first().map(|v| self.stringify(v)).unwrap_or_default();
                Ok(d.borrow()
                    .get(&key)
                    .cloned()
                    .unwrap_or_else(|| args.get(1).cloned().unwrap_or(Value::Nil)))
            }
            "set" => {
                let key = args.first().map(|v| self.stringify(v)).unwrap_or_default();
                let value = args.get(1).cloned().unwrap_or(Value::Nil);
                d.borrow_mut().insert(key, value.clone());
                Ok(value)
            }
            "delete" => {
                let key = args.first().map(|v| self.stringify(v)).unwrap_or_default();
                Ok(d.borrow_mut().remove(&key).unwrap_or(Value::Nil))
            }
            "keys" => Ok(Value::array(d.borrow().keys().map(|k| Value::String(k.clone())).collect())),
            "values" => Ok(Value::array(d.borrow().values().cloned().collect())),
            "length" | "size" => Ok(Value::Number(d.borrow().len() as f64)),
            other => Err(Signal::Error(QuantumError::name(format!("dict has no method '{other}'"), pos.line))),
        }
    }
}

fn wrap(i: i64, len: usize) -> usize {
    if i < 0 {
        (len as i64 + i).max(0) as usize
    } else {
        i as usize
    }
}

fn clamp(i: i64, len: usize) -> usize {
    let i = if i < 0 { i + len as i64 } else { i };
    i.clamp(0, len as i64) as usize
}

fn trim_chars(s: &str, charset: Option<&Value>, left: bool, right: bool) -> String {
    match charset {
        Some(Value::String(chars)) => {
            let set: Vec<char> = chars.chars().collect();
            let mut out = s;
            if left {
                out = out.trim_start_matches(|c| set.contains(&c));
            }
            if right {
                out = out.trim_end_matches(|c| set.contains(&c));
            }
            out.to_owned()
        }
        _ => match (left, right) {
            (true, true) => s.trim().to_owned(),
            (true, false) => s.trim_start().to_owned(),
            (false, true) => s.trim_end().to_owned(),
            _ => s.to_owned(),
        },
    }
}

fn pad(s: &str, args: &[Value], interp: &mut Interpreter, start: bool) -> String {
    let target_len = args.first().and_then(Value::as_number).unwrap_or(0.0) as usize;
    let fill = args.get(1).map(|v| interp.stringify(v)).unwrap_or_else(|| " ".to_owned());
    let fill = if fill.is_empty() { " ".to_owned() } else { fill };
    let current_len = s.chars().count();
    if current_len >= target_len {
        return s.to_owned();
    }
    let needed = target_len - current_len;
    let fill_chars: Vec<char> = fill.chars().collect();
    let padding: String = (0..needed).map(|i| fill_chars[i % fill_chars.len()]).collect();
    if start {
        format!("{padding}{s}")
    } else {
        format!("{s}{padding}")
    }
}
