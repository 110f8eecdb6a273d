//! Backtick and `f"…"` template-literal expansion (spec §4.1).
//!
//! A template literal is a run of literal text and `${expr}` (or `{expr}`
//! in f-strings) placeholders. It expands, at lex time, into a token
//! stream equivalent to `str-seg + (expr) + str-seg + (expr) …`. Nested
//! braces inside a placeholder are balanced, and an f-string's `:spec`
//! tail only separates a format spec when not nested inside another
//! brace.

use crate::error::QuantumError;
use crate::position::Position;

use super::token::{Token, TokenKind};

pub struct InterpolationPart {
    pub literal: String,
    /// `Some(expr_src)` for a placeholder, carrying its raw `spec` tail
    /// for f-string `{value:spec}` forms.
    pub placeholder: Option<(String, Option<String>)>,
}

/// Splits `body` (the text between the opening/closing quote, already
/// escape-processed for the literal runs) into alternating literal and
/// placeholder parts.
pub fn split_parts(
    body: &str,
    is_fstring: bool,
    pos: Position,
) -> Result<Vec<InterpolationPart>, QuantumError> {
    let open = if is_fstring { '{' } else { '$' };
    let chars: Vec<char> = body.chars().collect();
    let mut parts = Vec::new();
    let mut literal = String::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let starts_placeholder = if is_fstring {
            c == '{'
        } else {
            c == '$' && chars.get(i + 1) == Some(&'{')
        };

        if starts_placeholder {
            if !literal.is_empty() || parts.is_empty() {
                parts.push(InterpolationPart {
                    literal: std::mem::take(&mut literal),
                    placeholder: None,
                });
            }
            i += if is_fstring { 1 } else { 2 };
            let mut depth = 1usize;
            let mut expr_src = String::new();
            let mut spec = None;
            let mut in_expr = true;
            while i < chars.len() && depth > 0 {
                let c = chars[i];
                if c == '{' {
                    depth += 1;
                    if in_expr || !is_fstring {
                        expr_src.push(c);
                    } else {
                        spec.get_or_insert_with(String::new).push(c);
                    }
                } else if c == '}' {
                    depth -= 1;
                    if depth == 0 {
                        i += 1;
                        break;
                    }
                    if in_expr || !is_fstring {
                        expr_src.push(c);
                    } else {
                        spec.get_or_insert_with(String::new).push(c);
                    }
                } else if c == ':' && depth == 1 && is_fstring && in_expr {
                    in_expr = false;
                    spec = Some(String::new());
                } else if in_expr || !is_fstring {
                    expr_src.push(c);
                } else {
                    spec.get_or_insert_with(String::new).push(c);
                }
                i += 1;
            }
            if depth != 0 {
                return Err(QuantumError::lex(
                    "unterminated interpolation placeholder",
                    pos,
                ));
            }
            parts.push(InterpolationPart {
                literal: String::new(),
                placeholder: Some((expr_src, spec)),
            });
            let _ = open;
        } else {
            literal.push(c);
            i += 1;
        }
    }

    if !literal.is_empty() || parts.is_empty() {
        parts.push(InterpolationPart {
            literal,
            placeholder: None,
        });
    }

    Ok(parts)
}

/// Expands the parsed parts into the token sequence for
/// `str-seg + (expr) + str-seg + …`, with `{value:spec}` f-string tails
/// becoming `__format__(value, "spec")` calls.
pub fn expand_to_tokens(
    parts: Vec<InterpolationPart>,
    is_fstring: bool,
    pos: Position,
    lex_sub_expr: impl Fn(&str, Position) -> Result<Vec<Token>, QuantumError>,
) -> Result<Vec<Token>, QuantumError> {
    let mut out = Vec::new();
    let mut first = true;

    for part in parts {
        if !first {
            out.push(Token::new(TokenKind::Operator("+".into()), pos));
        }
        if let Some((expr_src, spec)) = part.placeholder {
            out.push(Token::new(TokenKind::Punct('('), pos));
            if let Some(spec) = spec {
                if !is_fstring {
                    return Err(QuantumError::lex(
                        "format specs are only valid in f-strings",
                        pos,
                    ));
                }
                out.push(Token::new(
                    TokenKind::Identifier("__format__".into()),
                    pos,
                ));
                out.push(Token::new(TokenKind::Punct('('), pos));
                out.extend(lex_sub_expr(&expr_src, pos)?);
                out.push(Token::new(TokenKind::Punct(','), pos));
                out.push(Token::new(TokenKind::String(spec), pos));
                out.push(Token::new(TokenKind::Punct(')'), pos));
            } else {
                out.extend(lex_sub_expr(&expr_src, pos)?);
            }
            out.push(Token::new(TokenKind::Punct(')'), pos));
        } else {
            out.push(Token::new(TokenKind::String(part.literal), pos));
        }
        first = false;
    }

    if out.is_empty() {
        out.push(Token::new(TokenKind::String(String::new()), pos));
    }

    Ok(out)
}
