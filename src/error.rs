//! The closed error taxonomy shared by the lexer, parser and evaluator.
//!
//! Every failure kind is a flat struct implementing `std::error::Error`,
//! the same idiom the original lexer used for `LexError` — no `thiserror`,
//! just `Display` + `Error`.

use std::fmt;

use crate::position::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantumErrorKind {
    LexError,
    ParseError,
    NameError,
    TypeError,
    IndexError,
    RuntimeError,
}

impl QuantumErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LexError => "LexError",
            Self::ParseError => "ParseError",
            Self::NameError => "NameError",
            Self::TypeError => "TypeError",
            Self::IndexError => "IndexError",
            Self::RuntimeError => "RuntimeError",
        }
    }

    /// Matches against a handler's declared kind name, honouring the two
    /// universal catch-all spellings from spec §7.
    pub fn matches(&self, name: &str) -> bool {
        name.is_empty() || name == self.as_str() || name == "Exception" || name == "Error"
    }
}

impl fmt::Display for QuantumErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The umbrella "QuantumError" from spec §7: a kind, a message, and the
/// line (plus column, for lex/parse errors) where it was raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuantumError {
    pub kind: QuantumErrorKind,
    pub message: String,
    pub line: usize,
    pub column: Option<usize>,
}

impl QuantumError {
    pub fn new(kind: QuantumErrorKind, message: impl Into<String>, line: usize) -> Self {
        Self {
            kind,
            message: message.into(),
            line,
            column: None,
        }
    }

    pub fn at(kind: QuantumErrorKind, message: impl Into<String>, pos: Position) -> Self {
        Self {
            kind,
            message: message.into(),
            line: pos.line,
            column: Some(pos.column),
        }
    }

    pub fn lex(message: impl Into<String>, pos: Position) -> Self {
        Self::at(QuantumErrorKind::LexError, message, pos)
    }

    pub fn parse(message: impl Into<String>, pos: Position) -> Self {
        Self::at(QuantumErrorKind::ParseError, message, pos)
    }

    pub fn name(message: impl Into<String>, line: usize) -> Self {
        Self::new(QuantumErrorKind::NameError, message, line)
    }

    pub fn type_error(message: impl Into<String>, line: usize) -> Self {
        Self::new(QuantumErrorKind::TypeError, message, line)
    }

    pub fn index(message: impl Into<String>, line: usize) -> Self {
        Self::new(QuantumErrorKind::IndexError, message, line)
    }

    pub fn runtime(message: impl Into<String>, line: usize) -> Self {
        Self::new(QuantumErrorKind::RuntimeError, message, line)
    }

    /// Render the message the way a caught handler sees it:
    /// `"<Kind>: <message>"`, matching scenario 4 in spec §8.
    pub fn as_display_message(&self) -> String {
        format!("{}: {}", self.kind, self.message)
    }

    /// One-line `path:line:col: error: message` diagnostic for `--check`
    /// and top-level failures (spec §6).
    pub fn diagnostic(&self, path: &str) -> String {
        match self.column {
            Some(col) => format!("{path}:{}:{}: error: {}", self.line, col, self.message),
            None => format!("{path}:{}: error: {}", self.line, self.message),
        }
    }
}

impl fmt::Display for QuantumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display_message())
    }
}

impl std::error::Error for QuantumError {}
