//! # Lexer
//!
//! Scans source text into a token stream, then performs a second pass
//! (`layout`) that turns significant indentation into synthetic
//! INDENT/DEDENT tokens. Brace-delimited code passes through that second
//! pass unchanged (spec §4.1, "Layout invariance").

mod interpolation;
mod keywords;
mod layout;
pub mod token;

use log::trace;

use crate::error::QuantumError;
use crate::position::Position;

pub use token::{Keyword, Token, TokenKind};

pub struct Lexer {
    chars: Vec<char>,
    index: usize,
    line: usize,
    column: usize,
    tokens: Vec<Token>,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            index: 0,
            line: 1,
            column: 1,
            tokens: Vec::new(),
        }
    }

    /// Full public entry point: raw scan, then layout reconstruction.
    pub fn lex(source: &str) -> Result<Vec<Token>, QuantumError> {
        let tokens = Self::lex_raw(source)?;
        let tokens = layout::reconstruct(tokens, source);
        trace!("lexed {} tokens (post-layout)", tokens.len());
        Ok(tokens)
    }

    /// Scan without layout reconstruction; used both by the top-level
    /// entry point and recursively for interpolation placeholders.
    pub fn lex_raw(source: &str) -> Result<Vec<Token>, QuantumError> {
        let mut lexer = Lexer::new(source);
        lexer.run()?;
        Ok(lexer.tokens)
    }

    fn pos(&self) -> Position {
        Position::new(self.line, self.column)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.index).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.index + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.index += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn run(&mut self) -> Result<(), QuantumError> {
        loop {
            self.skip_whitespace_and_comments()?;
            let Some(c) = self.peek() else {
                self.tokens.push(Token::new(TokenKind::Eof, self.pos()));
                return Ok(());
            };

            let pos = self.pos();

            match c {
                '\n' => {
                    self.advance();
                    self.tokens.push(Token::new(TokenKind::Newline, pos));
                }
                '0'..='9' => self.lex_number()?,
                'a'..='z' | 'A'..='Z' | '_' => self.lex_identifier()?,
                '"' | '\'' => self.lex_string(c, false)?,
                '`' => self.lex_string('`', false)?,
                '(' | ')' | '[' | ']' | '{' | '}' | ',' | ';' | ':' | '.' | '@' => {
                    self.advance();
                    self.tokens.push(Token::new(TokenKind::Punct(c), pos));
                }
                _ => self.lex_operator()?,
            }
        }
    }

    fn skip_whitespace_and_comments(&mut self) -> Result<(), QuantumError> {
        loop {
            match self.peek() {
                Some(' ') | Some('\t') | Some('\r') => {
                    self.advance();
                }
                Some('#') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                Some('/') if self.peek_at(1) == Some('/') && !self.prev_is_value_producing() => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                Some('/') if self.peek_at(1) == Some('*') => {
                    self.advance();
                    self.advance();
                    loop {
                        match self.peek() {
                            None => {
                                return Err(QuantumError::lex(
                                    "unterminated block comment",
                                    self.pos(),
                                ))
                            }
                            Some('*') if self.peek_at(1) == Some('/') => {
                                self.advance();
                                self.advance();
                                break;
                            }
                            Some(_) => {
                                self.advance();
                            }
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn prev_is_value_producing(&self) -> bool {
        self.tokens.last().is_some_and(Token::is_value_producing)
    }

    fn lex_number(&mut self) -> Result<(), QuantumError> {
        let pos = self.pos();
        let start = self.index;

        if self.peek() == Some('0') && matches!(self.peek_at(1), Some('x') | Some('X')) {
            self.advance();
            self.advance();
            let hex_start = self.index;
            while self
                .peek()
                .is_some_and(|c| c.is_ascii_hexdigit())
            {
                self.advance();
            }
            let hex: String = self.chars[hex_start..self.index].iter().collect();
            let value = u64::from_str_radix(&hex, 16)
                .map_err(|_| QuantumError::lex("invalid hex literal", pos))?;
            self.tokens
                .push(Token::new(TokenKind::Number(value as f64), pos));
            return Ok(());
        }

        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
        if self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        let text: String = self.chars[start..self.index].iter().collect();
        let value = text
            .parse::<f64>()
            .map_err(|_| QuantumError::lex(format!("invalid number literal '{text}'"), pos))?;
        self.tokens.push(Token::new(TokenKind::Number(value), pos));
        Ok(())
    }

    fn lex_identifier(&mut self) -> Result<(), QuantumError> {
        let pos = self.pos();
        let start = self.index;
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || c == '_')
        {
            self.advance();
        }
        let text: String = self.chars[start..self.index].iter().collect();

        // `f"…"` / `f'…'` interpolated strings.
        if text == "f" && matches!(self.peek(), Some('"') | Some('\'')) {
            let quote = self.peek().unwrap();
            self.lex_string(quote, true)?;
            return Ok(());
        }

        if keywords::TYPE_NAMES.contains(text.as_str()) {
            self.tokens.push(Token::new(TokenKind::TypeName(text), pos));
        } else if let Some(kw) = keywords::KEYWORDS.get(text.as_str()) {
            self.tokens.push(Token::new(TokenKind::Keyword(*kw), pos));
        } else {
            self.tokens
                .push(Token::new(TokenKind::Identifier(text), pos));
        }
        Ok(())
    }

    fn lex_string(&mut self, quote: char, is_fstring: bool) -> Result<(), QuantumError> {
        let pos = self.pos();
        self.advance(); // opening quote (and the leading `f` was already consumed)

        let is_template = quote == '`' || is_fstring;
        let mut raw = String::new();

        loop {
            match self.peek() {
                None => return Err(QuantumError::lex("unterminated string literal", pos)),
                Some(c) if c == quote => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    self.advance();
                    match self.advance() {
                        Some('n') => raw.push('\n'),
                        Some('t') => raw.push('\t'),
                        Some('r') => raw.push('\r'),
                        Some('\\') => raw.push('\\'),
                        Some('\'') => raw.push('\''),
                        Some('"') => raw.push('"'),
                        Some('0') => raw.push('\0'),
                        Some(other) => raw.push(other),
                        None => return Err(QuantumError::lex("unterminated string literal", pos)),
                    }
                }
                Some(c) => {
                    raw.push(c);
                    self.advance();
                }
            }
        }

        if is_template {
            let parts = interpolation::split_parts(&raw, is_fstring, pos)?;
            let expanded = interpolation::expand_to_tokens(parts, is_fstring, pos, |src, p| {
                let mut toks = Lexer::lex_raw(src)?;
                toks.pop(); // drop the sub-lex's own Eof
                for t in &mut toks {
                    t.pos = p;
                }
                Ok(toks)
            })?;
            self.tokens.extend(expanded);
        } else {
            self.tokens.push(Token::new(TokenKind::String(raw), pos));
        }

        Ok(())
    }

    fn lex_operator(&mut self) -> Result<(), QuantumError> {
        const MULTI: &[&str] = &[
            "===", "!==", "**", "==", "!=", "<=", ">=", "<<", ">>", "&&", "||", "->", "=>", "++",
            "--", "+=", "-=", "*=", "/=", "//",
        ];

        let pos = self.pos();
        for op in MULTI {
            let len = op.chars().count();
            if self.chars[self.index..]
                .iter()
                .take(len)
                .collect::<String>()
                == *op
            {
                for _ in 0..len {
                    self.advance();
                }
                self.tokens
                    .push(Token::new(TokenKind::Operator((*op).to_owned()), pos));
                return Ok(());
            }
        }

        let c = self
            .advance()
            .ok_or_else(|| QuantumError::lex("unexpected end of input", pos))?;

        if c.is_whitespace() {
            return Ok(());
        }

        if "+-*/%<>=!&|^~?".contains(c) {
            self.tokens
                .push(Token::new(TokenKind::Operator(c.to_string()), pos));
            Ok(())
        } else {
            Err(QuantumError::lex(
                format!("unrecognized character '{c}'"),
                pos,
            ))
        }
    }
}
