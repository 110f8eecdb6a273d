//! Built-in registry bound at evaluator construction (spec §4.3.3) and the
//! fixed stdlib-module stub table consulted by `Import` (spec §4.3 Import).

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use log::trace;
use once_cell::sync::Lazy;
use rand::Rng;

use crate::ast::ImportItem;
use crate::environment::Environment;
use crate::error::QuantumError;
use crate::value::{Class, IndexMap, Native, Value};

use super::{EvalResult, Interpreter, Signal};

fn native(name: &str, f: impl Fn(&mut Interpreter, &[Value]) -> EvalResult + 'static) -> Value {
    Value::Native(Native {
        name: name.to_owned(),
        func: Rc::new(f),
    })
}

fn arg(args: &[Value], i: usize) -> Value {
    args.get(i).cloned().unwrap_or(Value::Nil)
}

fn num_arg(args: &[Value], i: usize) -> f64 {
    arg(args, i).as_number().unwrap_or(0.0)
}

/// Registers every global name §4.3.3 requires. Called once from
/// `Interpreter::new`.
pub fn register(env: &Environment) {
    env.define("PI", Value::Number(std::f64::consts::PI), false);
    env.define("E", Value::Number(std::f64::consts::E), false);
    env.define("INF", Value::Number(f64::INFINITY), false);
    env.define("NaN", Value::Number(f64::NAN), false);

    env.define("num", native("num", |i, a| Ok(Value::Number(coerce_number(i, &arg(a, 0))))), false);
    env.define("str", native("str", |i, a| Ok(Value::String(i.stringify(&arg(a, 0))))), false);
    env.define("bool", native("bool", |_, a| Ok(Value::Bool(arg(a, 0).is_truthy()))), false);
    env.define("type", native("type", |_, a| Ok(Value::String(arg(a, 0).type_name().to_owned()))), false);
    env.define("classname", native("classname", |_, a| Ok(Value::String(arg(a, 0).classname()))), false);
    env.define("id", native("id", |_, a| Ok(Value::Number(arg(a, 0).identity() as f64))), false);

    env.define(
        "isinstance",
        native("isinstance", |_, a| {
            let val = arg(a, 0);
            let target = arg(a, 1);
            let result = match &target {
                Value::String(name) => val.classname() == *name || val.type_name() == name.as_str(),
                Value::Class(class) => match &val {
                    Value::Instance(inst) => Class::is_or_extends(&inst.borrow().class, &class.borrow().name),
                    _ => false,
                },
                _ => false,
            };
            Ok(Value::Bool(result))
        }),
        false,
    );

    env.define(
        "len",
        native("len", |_, a| {
            Ok(Value::Number(match arg(a, 0) {
                Value::Array(arr) => arr.borrow().len() as f64,
                Value::String(s) => s.chars().count() as f64,
                Value::Dict(d) => d.borrow().len() as f64,
                _ => 0.0,
            }))
        }),
        false,
    );

    env.define(
        "range",
        native("range", |_, a| {
            let (start, stop, step) = match a.len() {
                0 => (0.0, 0.0, 1.0),
                1 => (0.0, num_arg(a, 0), 1.0),
                2 => (num_arg(a, 0), num_arg(a, 1), 1.0),
                _ => (num_arg(a, 0), num_arg(a, 1), num_arg(a, 2)),
            };
            Ok(Value::array(range_values(start, stop, step)))
        }),
        false,
    );

    env.define(
        "enumerate",
        native("enumerate", |_, a| {
            let start = if a.len() > 1 { num_arg(a, 1) } else { 0.0 } as i64;
            let items = iterable_values(&arg(a, 0));
            let out = items
                .into_iter()
                .enumerate()
                .map(|(i, v)| Value::array(vec![Value::Number((start + i as i64) as f64), v]))
                .collect();
            Ok(Value::array(out))
        }),
        false,
    );

    env.define(
        "sum",
        native("sum", |_, a| {
            let items = iterable_values(&arg(a, 0));
            Ok(Value::Number(items.iter().filter_map(Value::as_number).sum()))
        }),
        false,
    );
    env.define(
        "any",
        native("any", |_, a| Ok(Value::Bool(iterable_values(&arg(a, 0)).iter().any(Value::is_truthy)))),
        false,
    );
    env.define(
        "all",
        native("all", |_, a| Ok(Value::Bool(iterable_values(&arg(a, 0)).iter().all(Value::is_truthy)))),
        false,
    );

    env.define(
        "sorted",
        native("sorted", |i, a| {
            let mut items = iterable_values(&arg(a, 0));
            let reverse = arg(a, 1).is_truthy();
            let all_numeric = items.iter().all(|v| matches!(v, Value::Number(_)));
            if all_numeric {
                items.sort_by(|x, y| {
                    x.as_number()
                        .unwrap_or(0.0)
                        .partial_cmp(&y.as_number().unwrap_or(0.0))
                        .unwrap_or(std::cmp::Ordering::Equal)
                });
            } else {
                let mut keyed: Vec<(String, Value)> = items.into_iter().map(|v| (i.stringify(&v), v)).collect();
                keyed.sort_by(|x, y| x.0.cmp(&y.0));
                items = keyed.into_iter().map(|(_, v)| v).collect();
            }
            if reverse {
                items.reverse();
            }
            Ok(Value::array(items))
        }),
        false,
    );

    env.define("rand", native("rand", |_, _| Ok(Value::Number(rand::thread_rng().gen::<f64>()))), false);
    env.define(
        "rand_int",
        native("rand_int", |_, a| {
            let lo = num_arg(a, 0) as i64;
            let hi = num_arg(a, 1) as i64;
            let n = if hi > lo { rand::thread_rng().gen_range(lo..hi) } else { lo };
            Ok(Value::Number(n as f64))
        }),
        false,
    );

    env.define(
        "time",
        native("time", |_, _| {
            let now = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default();
            Ok(Value::Number(now.as_secs_f64()))
        }),
        false,
    );
    env.define(
        "sleep",
        native("sleep", |_, a| {
            std::thread::sleep(std::time::Duration::from_secs_f64(num_arg(a, 0)));
            Ok(Value::Nil)
        }),
        false,
    );
    env.define(
        "exit",
        native("exit", |_, a| -> EvalResult {
            std::process::exit(a.first().and_then(Value::as_number).unwrap_or(0.0) as i32)
        }),
        false,
    );
    env.define(
        "assert",
        native("assert", |i, a| {
            if !arg(a, 0).is_truthy() {
                let msg = a.get(1).map(|v| i.stringify(v)).unwrap_or_else(|| "assertion failed".to_owned());
                return Err(Signal::Error(QuantumError::runtime(msg, 0)));
            }
            Ok(Value::Nil)
        }),
        false,
    );

    env.define(
        "chr",
        native("chr", |_, a| {
            Ok(Value::String(
                char::from_u32(num_arg(a, 0) as u32).map(|c| c.to_string()).unwrap_or_default(),
            ))
        }),
        false,
    );
    env.define(
        "ord",
        native("ord", |_, a| {
            let s = match arg(a, 0) {
                Value::String(s) => s,
                _ => String::new(),
            };
            Ok(Value::Number(s.chars().next().map(|c| c as u32).unwrap_or(0) as f64))
        }),
        false,
    );
    env.define(
        "hex",
        native("hex", |_, a| {
            let n = num_arg(a, 0) as i64;
            let sign = if n < 0 { "-" } else { "" };
            Ok(Value::String(format!("{sign}0x{:x}", n.unsigned_abs())))
        }),
        false,
    );
    env.define(
        "bin",
        native("bin", |_, a| {
            let n = num_arg(a, 0) as i64;
            let sign = if n < 0 { "-" } else { "" };
            Ok(Value::String(format!("{sign}0b{:b}", n.unsigned_abs())))
        }),
        false,
    );

    env.define(
        "array",
        native("array", |_, a| {
            let size = a.first().and_then(Value::as_number).unwrap_or(0.0) as usize;
            let fill = arg(a, 1);
            Ok(Value::array(vec![fill; size]))
        }),
        false,
    );
    env.define(
        "keys",
        native("keys", |_, a| {
            if let Value::Dict(d) = arg(a, 0) {
                Ok(Value::array(d.borrow().keys().map(|k| Value::String(k.clone())).collect()))
            } else {
                Ok(Value::array(Vec::new()))
            }
        }),
        false,
    );
    env.define(
        "values",
        native("values", |_, a| {
            if let Value::Dict(d) = arg(a, 0) {
                Ok(Value::array(d.borrow().values().cloned().collect()))
            } else {
                Ok(Value::array(Vec::new()))
            }
        }),
        false,
    );

    env.define(
        "xor_bytes",
        native("xor_bytes", |i, a| {
            let data = i.stringify(&arg(a, 0));
            let key = i.stringify(&arg(a, 1));
            let key_bytes: Vec<u8> = key.bytes().collect();
            if key_bytes.is_empty() {
                return Ok(Value::String(data));
            }
            let out: Vec<u8> = data
                .bytes()
                .enumerate()
                .map(|(idx, b)| b ^ key_bytes[idx % key_bytes.len()])
                .collect();
            Ok(Value::String(String::from_utf8_lossy(&out).into_owned()))
        }),
        false,
    );
    env.define(
        "to_hex",
        native("to_hex", |i, a| {
            let s = i.stringify(&arg(a, 0));
            Ok(Value::String(s.bytes().map(|b| format!("{b:02x}")).collect()))
        }),
        false,
    );
    env.define(
        "from_hex",
        native("from_hex", |i, a| {
            let s = i.stringify(&arg(a, 0));
            let bytes: Vec<u8> = s
                .as_bytes()
                .chunks(2)
                .filter_map(|c| std::str::from_utf8(c).ok().and_then(|h| u8::from_str_radix(h, 16).ok()))
                .collect();
            Ok(Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        }),
        false,
    );
    env.define(
        "rot13",
        native("rot13", |i, a| {
            let s = i.stringify(&arg(a, 0));
            Ok(Value::String(s.chars().map(rot13_char).collect()))
        }),
        false,
    );
    env.define(
        "base64_encode",
        native("base64_encode", |i, a| {
            let s = i.stringify(&arg(a, 0));
            Ok(Value::String(base64_encode(s.as_bytes())))
        }),
        false,
    );

    env.define(
        "printf",
        native("printf", |i, a| {
            let fmt = i.stringify(&arg(a, 0));
            let text = super::format::printf(&fmt, &a[1.min(a.len())..]);
            print!("{text}");
            use std::io::Write;
            let _ = std::io::stdout().flush();
            Ok(Value::Nil)
        }),
        false,
    );
    env.define(
        "format",
        native("format", |i, a| {
            let fmt = i.stringify(&arg(a, 0));
            Ok(Value::String(super::format::printf(&fmt, &a[1.min(a.len())..])))
        }),
        false,
    );
    env.define(
        "sprintf",
        native("sprintf", |i, a| {
            let fmt = i.stringify(&arg(a, 0));
            Ok(Value::String(super::format::printf(&fmt, &a[1.min(a.len())..])))
        }),
        false,
    );
    env.define(
        "__format__",
        native("__format__", |i, a| {
            let value = arg(a, 0);
            let spec = i.stringify(&arg(a, 1));
            let fmt = format!("%{spec}");
            Ok(Value::String(super::format::printf(&fmt, &[value])))
        }),
        false,
    );
    env.define(
        "scanf",
        native("scanf", |_, _| {
            let mut line = String::new();
            let _ = std::io::stdin().read_line(&mut line);
            Ok(super::format::auto_numeric(line.trim_end_matches(['\n', '\r'])))
        }),
        false,
    );
    env.define(
        "input",
        native("input", |i, a| {
            use std::io::Write;
            if let Some(v) = a.first() {
                let text = i.stringify(v);
                let (display, _) = super::format::strip_specs(&text);
                print!("{display}");
                let _ = std::io::stdout().flush();
            }
            let mut line = String::new();
            let _ = std::io::stdin().read_line(&mut line);
            Ok(Value::String(line.trim_end_matches(['\n', '\r']).to_owned()))
        }),
        false,
    );

    register_math(env);
    register_console(env);
    register_exception_stubs(env);
    register_type_constructors(env);
}

fn register_math(env: &Environment) {
    macro_rules! unary_math {
        ($name:literal, $f:expr) => {
            env.define($name, native($name, move |_, a| Ok(Value::Number($f(num_arg(a, 0))))), false);
        };
    }
    unary_math!("abs", f64::abs);
    unary_math!("sqrt", f64::sqrt);
    unary_math!("floor", f64::floor);
    unary_math!("ceil", f64::ceil);
    unary_math!("round", f64::round);
    unary_math!("log", f64::ln);
    unary_math!("log2", f64::log2);
    unary_math!("sin", f64::sin);
    unary_math!("cos", f64::cos);
    unary_math!("tan", f64::tan);

    env.define("pow", native("pow", |_, a| Ok(Value::Number(num_arg(a, 0).powf(num_arg(a, 1))))), false);
    env.define(
        "min",
        native("min", |_, a| Ok(Value::Number(variadic_or_array(a).into_iter().fold(f64::INFINITY, f64::min)))),
        false,
    );
    env.define(
        "max",
        native("max", |_, a| Ok(Value::Number(variadic_or_array(a).into_iter().fold(f64::NEG_INFINITY, f64::max)))),
        false,
    );

    let mut math = IndexMap::new();
    math.insert("PI".to_owned(), Value::Number(std::f64::consts::PI));
    math.insert("E".to_owned(), Value::Number(std::f64::consts::E));
    math.insert("floor".to_owned(), native("floor", |_, a| Ok(Value::Number(num_arg(a, 0).floor()))));
    math.insert("ceil".to_owned(), native("ceil", |_, a| Ok(Value::Number(num_arg(a, 0).ceil()))));
    math.insert("round".to_owned(), native("round", |_, a| Ok(Value::Number(num_arg(a, 0).round()))));
    math.insert("abs".to_owned(), native("abs", |_, a| Ok(Value::Number(num_arg(a, 0).abs()))));
    math.insert("sqrt".to_owned(), native("sqrt", |_, a| Ok(Value::Number(num_arg(a, 0).sqrt()))));
    math.insert("pow".to_owned(), native("pow", |_, a| Ok(Value::Number(num_arg(a, 0).powf(num_arg(a, 1))))));
    math.insert("random".to_owned(), native("random", |_, _| Ok(Value::Number(rand::thread_rng().gen::<f64>()))));
    math.insert(
        "clamp".to_owned(),
        native("clamp", |_, a| Ok(Value::Number(num_arg(a, 0).clamp(num_arg(a, 1), num_arg(a, 2))))),
    );
    math.insert(
        "min".to_owned(),
        native("min", |_, a| Ok(Value::Number(variadic_or_array(a).into_iter().fold(f64::INFINITY, f64::min)))),
    );
    math.insert(
        "max".to_owned(),
        native("max", |_, a| Ok(Value::Number(variadic_or_array(a).into_iter().fold(f64::NEG_INFINITY, f64::max)))),
    );
    env.define("Math", Value::dict(math), false);
}

fn register_console(env: &Environment) {
    let mut console = IndexMap::new();
    console.insert(
        "log".to_owned(),
        native("log", |i, a| {
            println!("{}", a.iter().map(|v| i.stringify(v)).collect::<Vec<_>>().join(" "));
            Ok(Value::Nil)
        }),
    );
    console.insert(
        "warn".to_owned(),
        native("warn", |i, a| {
            println!("[warn] {}", a.iter().map(|v| i.stringify(v)).collect::<Vec<_>>().join(" "));
            Ok(Value::Nil)
        }),
    );
    console.insert(
        "error".to_owned(),
        native("error", |i, a| {
            eprintln!("[error] {}", a.iter().map(|v| i.stringify(v)).collect::<Vec<_>>().join(" "));
            Ok(Value::Nil)
        }),
    );
    env.define("console", Value::dict(console), false);
}

/// The Python/JS exception-class names the language accepts in `raise
/// ExceptionClass(msg)` position (spec §4.3.3).
const EXCEPTION_NAMES: &[&str] = &[
    "Exception", "Error", "ValueError", "TypeError", "KeyError", "IndexError", "NameError",
    "RuntimeError", "StopIteration", "AttributeError", "ZeroDivisionError", "IOError",
    "OSError", "ArithmeticError", "AssertionError", "NotImplementedError",
];

fn register_exception_stubs(env: &Environment) {
    for name in EXCEPTION_NAMES {
        let name = (*name).to_owned();
        let ctor_name = name.clone();
        env.define(
            ctor_name.clone(),
            native(&ctor_name, move |i, a| {
                let msg = a.first().map(|v| i.stringify(v)).unwrap_or_default();
                Ok(Value::String(format!("{name}: {msg}")))
            }),
            false,
        );
    }
}

fn register_type_constructors(env: &Environment) {
    env.define("int", native("int", |i, a| Ok(Value::Number(coerce_number(i, &arg(a, 0)).trunc()))), false);
    env.define("long", native("long", |i, a| Ok(Value::Number(coerce_number(i, &arg(a, 0)).trunc()))), false);
    env.define("short", native("short", |i, a| Ok(Value::Number(coerce_number(i, &arg(a, 0)).trunc()))), false);
    env.define("float", native("float", |i, a| Ok(Value::Number(coerce_number(i, &arg(a, 0))))), false);
    env.define(
        "char",
        native("char", |i, a| {
            Ok(Value::String(match arg(a, 0) {
                Value::Number(n) => char::from_u32(n as u32).map(|c| c.to_string()).unwrap_or_default(),
                other => i.stringify(&other).chars().next().map(|c| c.to_string()).unwrap_or_default(),
            }))
        }),
        false,
    );
    env.define("bool", native("bool", |_, a| Ok(Value::Bool(arg(a, 0).is_truthy()))), false);
    env.define("str", native("str", |i, a| Ok(Value::String(i.stringify(&arg(a, 0))))), false);
    env.define(
        "list",
        native("list", |_, a| Ok(Value::array(iterable_values(&arg(a, 0))))),
        false,
    );
    env.define(
        "tuple",
        native("tuple", |_, a| Ok(Value::array(iterable_values(&arg(a, 0))))),
        false,
    );
    env.define(
        "dict",
        native("dict", |_, _| Ok(Value::dict(IndexMap::new()))),
        false,
    );
}

fn coerce_number(interp: &mut Interpreter, v: &Value) -> f64 {
    match v {
        Value::Number(n) => *n,
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Value::String(s) => s.trim().parse().unwrap_or(0.0),
        other => interp.stringify(other).trim().parse().unwrap_or(0.0),
    }
}

fn range_values(start: f64, stop: f64, step: f64) -> Vec<Value> {
    let mut out = Vec::new();
    if step == 0.0 {
        return out;
    }
    let mut n = start;
    if step > 0.0 {
        while n < stop {
            out.push(Value::Number(n));
            n += step;
        }
    } else {
        while n > stop {
            out.push(Value::Number(n));
            n += step;
        }
    }
    out
}

fn iterable_values(v: &Value) -> Vec<Value> {
    match v {
        Value::Array(a) => a.borrow().clone(),
        Value::String(s) => s.chars().map(|c| Value::String(c.to_string())).collect(),
        Value::Dict(d) => d.borrow().keys().map(|k| Value::String(k.clone())).collect(),
        other => vec![other.clone()],
    }
}

fn variadic_or_array(args: &[Value]) -> Vec<f64> {
    if args.len() == 1 {
        if let Value::Array(a) = &args[0] {
            return a.borrow().iter().filter_map(Value::as_number).collect();
        }
    }
    args.iter().filter_map(Value::as_number).collect()
}

fn rot13_char(c: char) -> char {
    match c {
        'a'..='z' => (((c as u8 - b'a' + 13) % 26) + b'a') as char,
        'A'..='Z' => (((c as u8 - b'A' + 13) % 26) + b'A') as char,
        other => other,
    }
}

static BASE64_ALPHABET: Lazy<&'static [u8; 64]> =
    Lazy::new(|| b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/");

fn base64_encode(data: &[u8]) -> String {
    let alphabet = *BASE64_ALPHABET;
    let mut out = String::with_capacity((data.len() + 2) / 3 * 4);
    for chunk in data.chunks(3) {
        let b0 = chunk[0];
        let b1 = *chunk.get(1).unwrap_or(&0);
        let b2 = *chunk.get(2).unwrap_or(&0);
        out.push(alphabet[(b0 >> 2) as usize] as char);
        out.push(alphabet[(((b0 & 0x03) << 4) | (b1 >> 4)) as usize] as char);
        out.push(if chunk.len() > 1 {
            alphabet[(((b1 & 0x0f) << 2) | (b2 >> 6)) as usize] as char
        } else {
            '='
        });
        out.push(if chunk.len() > 2 {
            alphabet[(b2 & 0x3f) as usize] as char
        } else {
            '='
        });
    }
    out
}

/// Fixed stdlib-like module table consulted on `import`/`from ... import`
/// (spec §4.3 Import). Recognized modules register either identity-stub
/// natives or empty Class stubs for their conventional names; unrecognized
/// names become identity stubs too so arbitrary `from x import y` survives.
const STUB_MODULES: &[&str] = &[
    "abc", "typing", "collections", "dataclasses", "enum", "functools", "itertools", "os",
    "os.path", "sys", "re", "json", "math", "random", "datetime", "pathlib", "io", "copy",
];

fn identity_stub(name: &str) -> Value {
    native(name, |_, a| Ok(arg(a, 0)))
}

fn class_stub(name: &str) -> Value {
    Value::Class(Rc::new(RefCell::new(Class {
        name: name.to_owned(),
        base: None,
        methods: HashMap::new(),
        static_methods: HashMap::new(),
        static_fields: RefCell::new(HashMap::new()),
    })))
}

pub fn stub_import(module: Option<&str>, items: &[ImportItem], env: &Environment) {
    match module {
        Some(name) => {
            if !STUB_MODULES.contains(&name) {
                trace!("import of unrecognized module '{name}' falls back to identity stubs");
            }
            for item in items {
                let bound_name = item.alias.clone().unwrap_or_else(|| item.name.clone());
                let stub = if item.name.chars().next().map(char::is_uppercase).unwrap_or(false) {
                    class_stub(&item.name)
                } else {
                    identity_stub(&item.name)
                };
                env.define(bound_name, stub, false);
            }
        }
        None => {
            for item in items {
                let bound_name = item.alias.clone().unwrap_or_else(|| item.name.clone());
                env.define(bound_name, identity_stub(&item.name), false);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_values_covers_default_step() {
        let v = range_values(0.0, 3.0, 1.0);
        assert_eq!(v.len(), 3);
    }

    #[test]
    fn rot13_round_trips() {
        let enc: String = "hello".chars().map(rot13_char).collect();
        let dec: String = enc.chars().map(rot13_char).collect();
        assert_eq!(dec, "hello");
    }
}
