//! Layout reconstruction: the second lexer pass that turns significant
//! indentation into synthetic INDENT/DEDENT tokens (spec §4.1).
//!
//! Brace-delimited code is untouched by this pass — bracket depth gates
//! everything, and NEWLINE/COLON pass straight through while any bracket
//! is open.

use std::collections::HashMap;

use super::token::{Token, TokenKind};

const TAB_WIDTH: usize = 4;

fn compute_indents(source: &str) -> HashMap<usize, usize> {
    let mut map = HashMap::new();
    for (idx, line) in source.lines().enumerate() {
        let mut indent = 0usize;
        for c in line.chars() {
            match c {
                ' ' => indent += 1,
                '\t' => indent += TAB_WIDTH,
                _ => break,
            }
        }
        map.insert(idx + 1, indent);
    }
    map
}

pub fn reconstruct(tokens: Vec<Token>, source: &str) -> Vec<Token> {
    let indents = compute_indents(source);
    let indent_of = |line: usize| indents.get(&line).copied().unwrap_or(0);

    let mut out = Vec::with_capacity(tokens.len());
    let mut stack = vec![0usize];
    let mut depth: i64 = 0;
    let mut i = 0;

    while i < tokens.len() {
        let tok = &tokens[i];

        let is_open = matches!(tok.kind, TokenKind::Punct('(' | '[' | '{'));
        let is_close = matches!(tok.kind, TokenKind::Punct(')' | ']' | '}'));

        if is_open {
            depth += 1;
            out.push(tok.clone());
            i += 1;
            continue;
        }
        if is_close {
            depth = (depth - 1).max(0);
            out.push(tok.clone());
            i += 1;
            continue;
        }
        if depth > 0 {
            out.push(tok.clone());
            i += 1;
            continue;
        }

        match &tok.kind {
            TokenKind::Punct(':') => {
                out.push(tok.clone());
                i += 1;
                let mut j = i;
                while j < tokens.len() && matches!(tokens[j].kind, TokenKind::Newline) {
                    out.push(tokens[j].clone());
                    j += 1;
                }
                if j < tokens.len() && !matches!(tokens[j].kind, TokenKind::Eof) {
                    let next_indent = indent_of(tokens[j].pos.line);
                    if next_indent > *stack.last().unwrap() {
                        stack.push(next_indent);
                        out.push(Token::new(TokenKind::Indent, tokens[j].pos));
                    }
                }
                i = j;
            }
            TokenKind::Newline => {
                out.push(tok.clone());
                i += 1;
                while i < tokens.len() && matches!(tokens[i].kind, TokenKind::Newline) {
                    out.push(tokens[i].clone());
                    i += 1;
                }
                if i < tokens.len() && !matches!(tokens[i].kind, TokenKind::Eof) {
                    let next_indent = indent_of(tokens[i].pos.line);
                    while next_indent < *stack.last().unwrap() {
                        stack.pop();
                        out.push(Token::new(TokenKind::Dedent, tokens[i].pos));
                    }
                }
            }
            TokenKind::Eof => {
                while stack.len() > 1 {
                    stack.pop();
                    out.push(Token::new(TokenKind::Dedent, tok.pos));
                }
                out.push(tok.clone());
                i += 1;
            }
            _ => {
                out.push(tok.clone());
                i += 1;
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    fn kinds(tokens: &[Token]) -> Vec<TokenKind> {
        tokens.iter().map(|t| t.kind.clone()).collect()
    }

    #[test]
    fn brace_code_has_no_indent_dedent() {
        let src = "fn f() { if (x) { print(1) } }";
        let tokens = Lexer::lex(src).unwrap();
        assert!(!kinds(&tokens).iter().any(|k| matches!(
            k,
            TokenKind::Indent | TokenKind::Dedent
        )));
    }

    #[test]
    fn python_block_opens_and_closes() {
        let src = "def g(a, b):\n    return a + b\nprint(1)\n";
        let tokens = Lexer::lex(src).unwrap();
        let kinds = kinds(&tokens);
        assert!(kinds.iter().any(|k| matches!(k, TokenKind::Indent)));
        assert!(kinds.iter().any(|k| matches!(k, TokenKind::Dedent)));
    }
}
