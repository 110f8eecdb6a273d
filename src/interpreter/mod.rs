//! Tree-walking evaluator (spec §4.3).
//!
//! Non-local control flow — `return`/`break`/`continue`/raised errors —
//! is threaded as a typed [`Signal`] through `Result`, per the "typed
//! result bubbled up from execute/evaluate" design note.

mod builtins;
pub mod expr;
mod format;
mod methods;

use std::cell::RefCell;
use std::rc::Rc;

use log::{trace, warn};

use crate::ast::{CatchHandler, MethodDef, Program, Stmt, StmtKind};
use crate::environment::Environment;
use crate::error::{QuantumError, QuantumErrorKind};
use crate::position::Position;
use crate::value::{Class, Function, Value};

/// A non-local transfer out of `execute`/`evaluate`. Errors are carried in
/// the same channel as `return`/`break`/`continue` so `try/finally` can
/// observe and re-propagate any of them uniformly.
pub enum Signal {
    Return(Value),
    Break,
    Continue,
    Error(QuantumError),
}

impl From<QuantumError> for Signal {
    fn from(err: QuantumError) -> Self {
        Signal::Error(err)
    }
}

pub type EvalResult = Result<Value, Signal>;
pub type ExecResult = Result<(), Signal>;

pub struct Interpreter {
    pub globals: Environment,
}

impl Interpreter {
    pub fn new() -> Self {
        let globals = Environment::new_global();
        let interp = Interpreter { globals };
        builtins::register(&interp.globals);
        interp
    }

    /// Parses and runs `source`, returning the process exit code implied by
    /// how execution ended (spec §6).
    pub fn run(&mut self, source: &str) -> i32 {
        let program = match crate::parser::Parser::parse(source) {
            Ok(p) => p,
            Err(e) => {
                eprintln!("{}", e.diagnostic("<source>"));
                return 1;
            }
        };
        match self.run_program(&program) {
            Ok(()) => 0,
            Err(Signal::Error(e)) => {
                eprintln!("{}", e.as_display_message());
                1
            }
            Err(Signal::Return(_)) | Err(Signal::Break) | Err(Signal::Continue) => {
                warn!("top-level control-flow signal escaped the program");
                1
            }
        }
    }

    pub fn run_program(&mut self, program: &Program) -> ExecResult {
        let env = self.globals.clone();
        self.execute_block(&program.statements, &env)
    }

    pub fn execute_block(&mut self, stmts: &[Stmt], env: &Environment) -> ExecResult {
        for stmt in stmts {
            self.execute(stmt, env)?;
        }
        Ok(())
    }

    fn execute(&mut self, stmt: &Stmt, env: &Environment) -> ExecResult {
        let pos = Position::new(stmt.line, 1);
        match &stmt.kind {
            StmtKind::Var {
                is_const,
                name,
                init,
                type_hint,
            } => {
                let value = match init {
                    Some(e) => self.evaluate(e, env)?,
                    None => Value::Nil,
                };
                let value = match type_hint {
                    Some(hint) => self.coerce(value, hint),
                    None => value,
                };
                env.define(name.clone(), value, *is_const);
                Ok(())
            }
            StmtKind::Function { name, params, body } => {
                let func = Function {
                    name: name.clone(),
                    params: params.clone(),
                    body: Rc::new(body.clone()),
                    closure: env.clone(),
                    bound_self: None,
                };
                env.define(name.clone(), Value::Function(Rc::new(func)), false);
                Ok(())
            }
            StmtKind::Class {
                name,
                base,
                methods,
                static_methods,
            } => {
                let base_class = match base {
                    Some(base_name) => match env.get(base_name, pos) {
                        Ok(Value::Class(c)) => Some(c),
                        _ => {
                            trace!("class '{name}' named missing base '{base_name}'; treating as rootless");
                            None
                        }
                    },
                    None => None,
                };

                let build = |defs: &[MethodDef], env: &Environment| {
                    defs.iter()
                        .map(|m| {
                            (
                                m.name.clone(),
                                Rc::new(Function {
                                    name: m.name.clone(),
                                    params: m.params.clone(),
                                    body: Rc::new(m.body.clone()),
                                    closure: env.clone(),
                                    bound_self: None,
                                }),
                            )
                        })
                        .collect()
                };

                let class = Class {
                    name: name.clone(),
                    base: base_class,
                    methods: build(methods, env),
                    static_methods: build(static_methods, env),
                    static_fields: RefCell::new(std::collections::HashMap::new()),
                };
                env.define(name.clone(), Value::Class(Rc::new(RefCell::new(class))), false);
                Ok(())
            }
            StmtKind::Block(stmts) => {
                let block_env = Environment::child_of(env);
                self.execute_block(stmts, &block_env)
            }
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(cond, env)?.is_truthy() {
                    let block_env = Environment::child_of(env);
                    self.execute_block(then_branch, &block_env)
                } else if let Some(else_branch) = else_branch {
                    let block_env = Environment::child_of(env);
                    self.execute_block(else_branch, &block_env)
                } else {
                    Ok(())
                }
            }
            StmtKind::While { cond, body } => {
                while self.evaluate(cond, env)?.is_truthy() {
                    let block_env = Environment::child_of(env);
                    match self.execute_block(body, &block_env) {
                        Ok(()) => {}
                        Err(Signal::Break) => break,
                        Err(Signal::Continue) => continue,
                        Err(other) => return Err(other),
                    }
                }
                Ok(())
            }
            StmtKind::For {
                var,
                var2,
                iter,
                body,
            } => self.execute_for(var, var2.as_deref(), iter, body, env),
            StmtKind::Return(value) => {
                let v = match value {
                    Some(e) => self.evaluate(e, env)?,
                    None => Value::Nil,
                };
                Err(Signal::Return(v))
            }
            StmtKind::Break => Err(Signal::Break),
            StmtKind::Continue => Err(Signal::Continue),
            StmtKind::Raise(value) => {
                let err = match value {
                    Some(e) => {
                        let v = self.evaluate(e, env)?;
                        self.value_to_error(v, pos)
                    }
                    None => QuantumError::runtime("exception", pos.line),
                };
                Err(Signal::Error(err))
            }
            StmtKind::Try {
                body,
                handlers,
                finally,
            } => self.execute_try(body, handlers, finally, env),
            StmtKind::Print {
                args,
                trailing_newline,
            } => self.execute_print(args, *trailing_newline, env),
            StmtKind::Input {
                target_name,
                prompt,
            } => self.execute_input(target_name.as_deref(), prompt.as_ref(), env, pos),
            StmtKind::Import { module, items } => {
                self.execute_import(module.as_deref(), items, env);
                Ok(())
            }
            StmtKind::ExprStmt(e) => {
                self.evaluate(e, env)?;
                Ok(())
            }
        }
    }

    /// Raised values become the in-flight error: a string is wrapped as a
    /// bare RuntimeError, while `ExceptionClass(msg)` calls already
    /// produce a `"Kind: msg"`-shaped string from the registered
    /// exception-constructor stubs (spec §9 open question on `throw` vs
    /// `raise`: both end up RuntimeError unless a known kind prefixes the
    /// message).
    fn value_to_error(&mut self, v: Value, pos: Position) -> QuantumError {
        let text = self.stringify(&v);
        for kind in [
            QuantumErrorKind::TypeError,
            QuantumErrorKind::NameError,
            QuantumErrorKind::IndexError,
            QuantumErrorKind::RuntimeError,
        ] {
            if let Some(rest) = text.strip_prefix(&format!("{}: ", kind.as_str())) {
                return QuantumError::at(kind, rest.to_owned(), pos);
            }
        }
        QuantumError::at(QuantumErrorKind::RuntimeError, text, pos)
    }

    fn execute_for(
        &mut self,
        var: &str,
        var2: Option<&str>,
        iter: &crate::ast::Expr,
        body: &[Stmt],
        env: &Environment,
    ) -> ExecResult {
        let pos = Position::new(iter.line, 1);
        let iterable = self.evaluate(iter, env)?;

        // Snapshot the sequence of bindings up front so mutating the
        // container mid-loop can't invalidate iteration (spec §5).
        let items: Vec<(Value, Value)> = match &iterable {
            Value::Array(a) => a
                .borrow()
                .iter()
                .cloned()
                .map(|v| self.split_for_pair(v))
                .collect(),
            Value::String(s) => s
                .chars()
                .map(|c| self.split_for_pair(Value::String(c.to_string())))
                .collect(),
            Value::Dict(d) => d
                .borrow()
                .keys()
                .map(|k| self.split_for_pair(Value::String(k.clone())))
                .collect(),
            other => {
                return Err(Signal::Error(QuantumError::type_error(
                    format!("'{}' is not iterable", other.type_name()),
                    pos.line,
                )))
            }
        };

        for (first, second) in items {
            let loop_env = Environment::child_of(env);
            loop_env.define(var, first, false);
            if let Some(v2) = var2 {
                loop_env.define(v2, second, false);
            }
            match self.execute_block(body, &loop_env) {
                Ok(()) => {}
                Err(Signal::Break) => break,
                Err(Signal::Continue) => continue,
                Err(other) => return Err(other),
            }
        }
        Ok(())
    }

    /// With two loop variables, array-like pairs split into `[0]`/`[1]`;
    /// scalars bind `var` to the value and `var2` to Nil (spec §4.3 For).
    fn split_for_pair(&self, v: Value) -> (Value, Value) {
        if let Value::Array(a) = &v {
            let borrowed = a.borrow();
            if borrowed.len() >= 2 {
                return (borrowed[0].clone(), borrowed[1].clone());
            }
        }
        (v, Value::Nil)
    }

    fn execute_try(
        &mut self,
        body: &[Stmt],
        handlers: &[CatchHandler],
        finally: &Option<Vec<Stmt>>,
        env: &Environment,
    ) -> ExecResult {
        let body_env = Environment::child_of(env);
        let result = self.execute_block(body, &body_env);

        let result = match result {
            Err(Signal::Error(err)) => {
                let mut handled = None;
                for handler in handlers {
                    // A raised named exception (`raise ValueError("bad")`) keeps its
                    // class name as the leading text of `message` even though `kind`
                    // falls back to the closed RuntimeError bucket; accept either.
                    let named_match = err.message.starts_with(&format!("{}: ", handler.kind));
                    if err.kind.matches(&handler.kind) || named_match {
                        let handler_env = Environment::child_of(env);
                        if let Some(alias) = &handler.alias {
                            let text = if named_match { err.message.clone() } else { err.as_display_message() };
                            handler_env.define(alias.clone(), Value::String(text), false);
                        }
                        handled = Some(self.execute_block(&handler.body, &handler_env));
                        break;
                    }
                }
                match handled {
                    Some(r) => r,
                    None => Err(Signal::Error(err)),
                }
            }
            other => other,
        };

        if let Some(finally_body) = finally {
            let finally_env = Environment::child_of(env);
            match self.execute_block(finally_body, &finally_env) {
                Ok(()) => result,
                // a finally that raises replaces the in-flight signal
                Err(finally_signal) => Err(finally_signal),
            }
        } else {
            result
        }
    }

    fn execute_print(&mut self, args: &[crate::ast::Expr], trailing_newline: bool, env: &Environment) -> ExecResult {
        use std::io::Write;
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.evaluate(arg, env)?);
        }

        let text = if let Some(Value::String(fmt)) = values.first() {
            if values.len() > 1 && format::has_format_spec(fmt) {
                let rest = &values[1..];
                format::printf(fmt, rest)
            } else {
                values.iter().map(|v| self.stringify(v)).collect::<Vec<_>>().join(" ")
            }
        } else {
            values.iter().map(|v| self.stringify(v)).collect::<Vec<_>>().join(" ")
        };

        let mut out = std::io::stdout();
        if trailing_newline {
            let _ = writeln!(out, "{text}");
        } else {
            let _ = write!(out, "{text}");
        }
        let _ = out.flush();
        Ok(())
    }

    fn execute_input(
        &mut self,
        target_name: Option<&str>,
        prompt: Option<&crate::ast::Expr>,
        env: &Environment,
        pos: Position,
    ) -> ExecResult {
        use std::io::Write;
        let mut requested_conv = None;
        if let Some(prompt_expr) = prompt {
            let prompt_val = self.evaluate(prompt_expr, env)?;
            let prompt_text = self.stringify(&prompt_val);
            let (display, conv) = format::strip_specs(&prompt_text);
            requested_conv = conv;
            print!("{display}");
            let _ = std::io::stdout().flush();
        }

        let mut line = String::new();
        let _ = std::io::stdin().read_line(&mut line);
        let line = line.trim_end_matches(['\n', '\r']).to_owned();

        if let Some(name) = target_name {
            let value = match requested_conv {
                Some('d' | 'i' | 'u') => Value::Number(line.trim().parse::<f64>().unwrap_or(0.0).trunc()),
                Some('f' | 'e' | 'g' | 'F' | 'E' | 'G') => Value::Number(line.trim().parse().unwrap_or(0.0)),
                Some('s' | 'c') => Value::String(line.clone()),
                _ => format::auto_numeric(&line),
            };
            env.assign_or_define(name, value, pos).map_err(Signal::Error)?;
        }
        Ok(())
    }

    fn execute_import(&mut self, module: Option<&str>, items: &[crate::ast::ImportItem], env: &Environment) {
        builtins::stub_import(module, items, env);
    }

    /// C-style declaration coercion (spec §4.3 Var).
    fn coerce(&mut self, value: Value, hint: &crate::ast::TypeHint) -> Value {
        use crate::ast::TypeHint::*;
        match hint {
            Int => Value::Number(value.as_number().unwrap_or(0.0).trunc()),
            Float => Value::Number(value.as_number().unwrap_or_else(|| {
                if let Value::String(s) = &value {
                    s.trim().parse().unwrap_or(0.0)
                } else {
                    0.0
                }
            })),
            Char => match &value {
                Value::String(s) => Value::String(s.chars().next().map(|c| c.to_string()).unwrap_or_default()),
                Value::Number(n) => Value::String(
                    char::from_u32(*n as u32).map(|c| c.to_string()).unwrap_or_default(),
                ),
                other => Value::String(self.stringify(other)),
            },
            Str => Value::String(self.stringify(&value)),
            Bool => Value::Bool(value.is_truthy()),
            Void => Value::Nil,
        }
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}
