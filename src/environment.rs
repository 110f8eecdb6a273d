//! Lexically-scoped name bindings (spec §4.4).
//!
//! An environment chain forms a tree rooted at the globals frame; cycles
//! are impossible because closures only ever capture environments older
//! than themselves. `Environment` is a cheap `Rc`-handle clone so a
//! `Function` can carry its declaration-time scope around without
//! duplicating the frame.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::error::QuantumError;
use crate::position::Position;
use crate::value::Value;

struct Frame {
    values: HashMap<String, Value>,
    consts: HashSet<String>,
    parent: Option<Environment>,
}

#[derive(Clone)]
pub struct Environment(Rc<RefCell<Frame>>);

impl Environment {
    pub fn new_global() -> Self {
        Environment(Rc::new(RefCell::new(Frame {
            values: HashMap::new(),
            consts: HashSet::new(),
            parent: None,
        })))
    }

    pub fn child_of(parent: &Environment) -> Self {
        Environment(Rc::new(RefCell::new(Frame {
            values: HashMap::new(),
            consts: HashSet::new(),
            parent: Some(parent.clone()),
        })))
    }

    /// Always creates (or overwrites) in the current frame.
    pub fn define(&self, name: impl Into<String>, value: Value, is_const: bool) {
        let name = name.into();
        let mut frame = self.0.borrow_mut();
        if is_const {
            frame.consts.insert(name.clone());
        } else {
            frame.consts.remove(&name);
        }
        frame.values.insert(name, value);
    }

    /// Walks parents; fails with `NameError` if nowhere defined.
    pub fn get(&self, name: &str, pos: Position) -> Result<Value, QuantumError> {
        let frame = self.0.borrow();
        if let Some(v) = frame.values.get(name) {
            return Ok(v.clone());
        }
        match &frame.parent {
            Some(parent) => {
                let parent = parent.clone();
                drop(frame);
                parent.get(name, pos)
            }
            None => Err(QuantumError::name(format!("name '{name}' is not defined"), pos.line)),
        }
    }

    /// Walks parents looking for an existing binding to reassign;
    /// fails with `RuntimeError` on a const target, `NameError` if
    /// nowhere defined.
    pub fn set(&self, name: &str, value: Value, pos: Position) -> Result<(), QuantumError> {
        let mut frame = self.0.borrow_mut();
        if frame.values.contains_key(name) {
            if frame.consts.contains(name) {
                return Err(QuantumError::runtime(
                    format!("cannot assign to const '{name}'"),
                    pos.line,
                ));
            }
            frame.values.insert(name.to_owned(), value);
            return Ok(());
        }
        match &frame.parent {
            Some(parent) => {
                let parent = parent.clone();
                drop(frame);
                parent.set(name, value, pos)
            }
            None => Err(QuantumError::name(format!("name '{name}' is not defined"), pos.line)),
        }
    }

    /// Like `set`, but defines in the current scope when the name isn't
    /// bound anywhere in the chain (Python-style implicit-local
    /// assignment, spec §4.3 Assignment on Identifier).
    pub fn assign_or_define(&self, name: &str, value: Value, pos: Position) -> Result<(), QuantumError> {
        if self.has(name) {
            self.set(name, value, pos)
        } else {
            self.define(name, value, false);
            Ok(())
        }
    }

    pub fn has(&self, name: &str) -> bool {
        let frame = self.0.borrow();
        if frame.values.contains_key(name) {
            return true;
        }
        match &frame.parent {
            Some(parent) => parent.has(name),
            None => false,
        }
    }
}
