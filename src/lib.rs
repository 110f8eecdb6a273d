pub mod ast;
pub mod environment;
pub mod error;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod position;
pub mod value;

pub use error::QuantumError;
pub use interpreter::Interpreter;
pub use parser::Parser;

/// Parses `source` without executing it, used by `--check` (spec §6).
/// Returns a diagnostic line (`path:line[:col]: error: message`) on failure.
pub fn check_source(path: &str, source: &str) -> Result<(), String> {
    Parser::parse(source)
        .map(|_| ())
        .map_err(|e| e.diagnostic(path))
}
