//! The dynamically-typed value model (spec §3).
//!
//! Arrays, dicts, functions, classes and instances have reference
//! semantics: they're `Rc<RefCell<_>>` handles, so aliasing one and
//! mutating it through another is observable, matching spec's "Reference
//! vs value" testable property. Numbers/bools/nil/strings are plain
//! owned data with value semantics.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::ast::Stmt;
use crate::environment::Environment;

pub type ArrayRef = Rc<RefCell<Vec<Value>>>;
pub type DictRef = Rc<RefCell<IndexMap>>;
pub type NativeFn = Rc<dyn Fn(&mut crate::interpreter::Interpreter, &[Value]) -> crate::interpreter::EvalResult>;

/// A dict whose iteration order is stable-per-insert, as spec requires
/// ("insertion order not guaranteed but stable-per-insert accepted").
/// A `Vec<(String, Value)>` gives exactly that without pulling in an
/// order-preserving map crate the teacher never used.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexMap {
    entries: Vec<(String, Value)>,
}

impl IndexMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn insert(&mut self, key: String, value: Value) {
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = value;
        } else {
            self.entries.push((key, value));
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let idx = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(idx).1)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, Value)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Clone)]
pub struct Function {
    pub name: String,
    pub params: Vec<String>,
    pub body: Rc<Vec<Stmt>>,
    pub closure: Environment,
    /// Bound `self`, when this Function value was produced by reading a
    /// method off an instance (spec 4.3.2: "methods returned as Function
    /// values bound to the instance on call, not at access").
    pub bound_self: Option<Rc<RefCell<Instance>>>,
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function").field("name", &self.name).finish()
    }
}

#[derive(Clone)]
pub struct Native {
    pub name: String,
    pub func: NativeFn,
}

impl fmt::Debug for Native {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Native").field("name", &self.name).finish()
    }
}

#[derive(Debug, Clone)]
pub struct Class {
    pub name: String,
    pub base: Option<Rc<RefCell<Class>>>,
    pub methods: HashMap<String, Rc<Function>>,
    pub static_methods: HashMap<String, Rc<Function>>,
    pub static_fields: RefCell<HashMap<String, Value>>,
}

impl Class {
    /// Linear walk of this class and its base chain (spec GLOSSARY
    /// "Method resolution"), returning the first matching method.
    pub fn resolve_method(class: &Rc<RefCell<Class>>, name: &str) -> Option<Rc<Function>> {
        let mut current = Some(Rc::clone(class));
        while let Some(c) = current {
            let borrowed = c.borrow();
            if let Some(method) = borrowed.methods.get(name) {
                return Some(Rc::clone(method));
            }
            current = borrowed.base.clone();
            drop(borrowed);
        }
        None
    }

    pub fn resolve_static(class: &Rc<RefCell<Class>>, name: &str) -> Option<Rc<Function>> {
        let mut current = Some(Rc::clone(class));
        while let Some(c) = current {
            let borrowed = c.borrow();
            if let Some(method) = borrowed.static_methods.get(name) {
                return Some(Rc::clone(method));
            }
            current = borrowed.base.clone();
            drop(borrowed);
        }
        None
    }

    pub fn is_or_extends(class: &Rc<RefCell<Class>>, name: &str) -> bool {
        let mut current = Some(Rc::clone(class));
        while let Some(c) = current {
            let borrowed = c.borrow();
            if borrowed.name == name {
                return true;
            }
            current = borrowed.base.clone();
        }
        false
    }
}

#[derive(Debug, Clone)]
pub struct Instance {
    pub class: Rc<RefCell<Class>>,
    pub fields: HashMap<String, Value>,
}

#[derive(Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Number(f64),
    String(String),
    Array(ArrayRef),
    Dict(DictRef),
    Function(Rc<Function>),
    Native(Native),
    Class(Rc<RefCell<Class>>),
    Instance(Rc<RefCell<Instance>>),
}

impl Value {
    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(items)))
    }

    pub fn dict(map: IndexMap) -> Self {
        Value::Dict(Rc::new(RefCell::new(map)))
    }

    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    /// "Truthy" per the GLOSSARY: anything not Nil, not `false`, not
    /// numeric zero, not empty string, not empty array.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Nil => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::Array(a) => !a.borrow().is_empty(),
            Value::Dict(d) => !d.borrow().is_empty(),
            Value::Function(_) | Value::Native(_) | Value::Class(_) | Value::Instance(_) => true,
        }
    }

    /// The canonical type name, shared by `type()`, `isinstance()`, the
    /// `%t`/`t` format conversion and error messages, per SPEC_FULL.md.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Dict(_) => "dict",
            Value::Function(_) | Value::Native(_) => "function",
            Value::Class(_) => "class",
            Value::Instance(_) => "instance",
        }
    }

    pub fn classname(&self) -> String {
        match self {
            Value::Instance(inst) => inst.borrow().class.borrow().name.clone(),
            Value::Class(c) => c.borrow().name.clone(),
            other => other.type_name().to_owned(),
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    /// Reference identity for `id()`: pointer value of the shared
    /// backing allocation for reference types, discriminant-salted
    /// numeric value for value types (still stable and distinct enough
    /// to support the builtin's contract of "same object -> same id").
    pub fn identity(&self) -> usize {
        match self {
            Value::Array(a) => Rc::as_ptr(a) as usize,
            Value::Dict(d) => Rc::as_ptr(d) as usize,
            Value::Function(f) => Rc::as_ptr(f) as usize,
            Value::Class(c) => Rc::as_ptr(c) as usize,
            Value::Instance(i) => Rc::as_ptr(i) as usize,
            Value::Native(n) => Rc::as_ptr(&n.func) as *const () as usize,
            Value::Nil => 0,
            Value::Bool(b) => *b as usize + 1,
            Value::Number(n) => n.to_bits() as usize,
            Value::String(s) => s.as_ptr() as usize,
        }
    }
}

impl PartialEq for Value {
    /// Same-type value comparison for number/bool/string/nil (spec
    /// §4.3 Equality); reference types compare by identity, since the
    /// language never defines deep equality for them.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Dict(a), Value::Dict(b)) => Rc::ptr_eq(a, b),
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    /// Best-effort textual form used only for Rust-side debugging; does
    /// not dispatch `__str__` on instances (that needs interpreter
    /// access — see `Interpreter::stringify`).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::String(s) => write!(f, "{s}"),
            Value::Array(a) => {
                write!(f, "[")?;
                for (i, v) in a.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    match v {
                        Value::String(s) => write!(f, "{s:?}")?,
                        other => write!(f, "{other:?}")?,
                    }
                }
                write!(f, "]")
            }
            Value::Dict(d) => {
                write!(f, "{{")?;
                for (i, (k, v)) in d.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k:?}: {v:?}")?;
                }
                write!(f, "}}")
            }
            Value::Function(func) => write!(f, "<function {}>", func.name),
            Value::Native(n) => write!(f, "<native {}>", n.name),
            Value::Class(c) => write!(f, "<class {}>", c.borrow().name),
            Value::Instance(i) => write!(f, "<{} instance>", i.borrow().class.borrow().name),
        }
    }
}

/// Shared number formatting: integral doubles print without a trailing
/// `.0`, matching the round-trip-format testable property in spec §8.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_owned()
    } else if n.is_infinite() {
        if n > 0.0 { "inf".to_owned() } else { "-inf".to_owned() }
    } else if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}
