//! Pratt-style precedence-climbing expression parser (spec §4.2).
//!
//! Precedence, loosest to tightest: assignment, ternary, or, and,
//! bitwise (`& | ^`), equality, comparison, shift, additive,
//! multiplicative, unary, power, postfix, primary.

use crate::ast::{DictPair, Expr, ExprKind};
use crate::error::QuantumError;
use crate::lexer::{Keyword, TokenKind};

use super::Parser;

impl Parser {
    pub(super) fn parse_assignment(&mut self) -> Result<Expr, QuantumError> {
        if let Some(unpack) = self.try_parse_tuple_unpack()? {
            return Ok(unpack);
        }

        let left = self.parse_ternary()?;

        let op = match self.kind() {
            TokenKind::Operator(o) if matches!(o.as_str(), "=" | "+=" | "-=" | "*=" | "/=") => {
                o.clone()
            }
            _ => return Ok(left),
        };
        let line = self.pos().line;
        self.advance();
        let value = self.parse_assignment()?;
        Ok(Expr::new(
            ExprKind::Assign {
                op,
                target: Box::new(left),
                value: Box::new(value),
            },
            line,
        ))
    }

    /// Non-consuming lookahead for `a, b, c = expr`; only commits once the
    /// identifier-list-then-`=` shape is confirmed.
    fn try_parse_tuple_unpack(&mut self) -> Result<Option<Expr>, QuantumError> {
        let start = self.save();
        let mut names = Vec::new();
        loop {
            match self.kind().clone() {
                TokenKind::Identifier(name) => {
                    self.advance();
                    names.push(name);
                }
                _ => {
                    self.restore(start);
                    return Ok(None);
                }
            }
            if self.check_punct(',') {
                self.advance();
            } else {
                break;
            }
        }
        if names.len() < 2 || !self.check_op("=") {
            self.restore(start);
            return Ok(None);
        }
        let line = self.pos().line;
        self.advance(); // =
        let value = self.parse_assignment()?;
        let targets = names
            .into_iter()
            .map(|n| Expr::new(ExprKind::Identifier(n), line))
            .collect();
        Ok(Some(Expr::new(
            ExprKind::Assign {
                op: "unpack".to_owned(),
                target: Box::new(Expr::new(ExprKind::Tuple(targets), line)),
                value: Box::new(value),
            },
            line,
        )))
    }

    fn save(&self) -> usize {
        self.index
    }

    fn restore(&mut self, index: usize) {
        self.index = index;
    }

    pub(super) fn parse_ternary(&mut self) -> Result<Expr, QuantumError> {
        let cond = self.parse_or()?;
        let line = cond.line;

        if self.check_kw(Keyword::If) {
            self.advance();
            let test = self.parse_or()?;
            if self.check_kw(Keyword::Else) {
                self.advance();
            } else {
                return Err(QuantumError::parse("expected 'else' in conditional expression", self.pos()));
            }
            let else_branch = self.parse_ternary()?;
            return Ok(Expr::new(
                ExprKind::Ternary {
                    cond: Box::new(test),
                    then_branch: Box::new(cond),
                    else_branch: Box::new(else_branch),
                },
                line,
            ));
        }

        if self.check_punct('?') {
            self.advance();
            let then_branch = self.parse_assignment()?;
            self.eat_colon()?;
            let else_branch = self.parse_ternary()?;
            return Ok(Expr::new(
                ExprKind::Ternary {
                    cond: Box::new(cond),
                    then_branch: Box::new(then_branch),
                    else_branch: Box::new(else_branch),
                },
                line,
            ));
        }

        Ok(cond)
    }

    fn eat_colon(&mut self) -> Result<(), QuantumError> {
        if self.check_punct(':') {
            self.advance();
            Ok(())
        } else {
            Err(QuantumError::parse("expected ':'", self.pos()))
        }
    }

    fn parse_or(&mut self) -> Result<Expr, QuantumError> {
        let mut left = self.parse_and()?;
        while self.check_kw(Keyword::Or) || self.check_op("||") {
            let line = self.pos().line;
            self.advance();
            let right = self.parse_and()?;
            left = Expr::new(
                ExprKind::Binary {
                    op: "or".to_owned(),
                    left: Box::new(left),
                    right: Box::new(right),
                },
                line,
            );
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, QuantumError> {
        let mut left = self.parse_bitwise()?;
        while self.check_kw(Keyword::And) || self.check_op("&&") {
            let line = self.pos().line;
            self.advance();
            let right = self.parse_bitwise()?;
            left = Expr::new(
                ExprKind::Binary {
                    op: "and".to_owned(),
                    left: Box::new(left),
                    right: Box::new(right),
                },
                line,
            );
        }
        Ok(left)
    }

    fn parse_bitwise(&mut self) -> Result<Expr, QuantumError> {
        let mut left = self.parse_equality()?;
        loop {
            let op = match self.kind() {
                TokenKind::Operator(o) if matches!(o.as_str(), "&" | "|" | "^") => o.clone(),
                _ => break,
            };
            let line = self.pos().line;
            self.advance();
            let right = self.parse_equality()?;
            left = Expr::new(
                ExprKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                line,
            );
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr, QuantumError> {
        let mut left = self.parse_comparison()?;
        loop {
            let op = match self.kind() {
                TokenKind::Operator(o) if o == "==" || o == "===" => "==",
                TokenKind::Operator(o) if o == "!=" || o == "!==" => "!=",
                _ => break,
            };
            let line = self.pos().line;
            self.advance();
            let right = self.parse_comparison()?;
            left = Expr::new(
                ExprKind::Binary {
                    op: op.to_owned(),
                    left: Box::new(left),
                    right: Box::new(right),
                },
                line,
            );
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<Expr, QuantumError> {
        let mut left = self.parse_shift()?;
        loop {
            if self.check_kw(Keyword::Not) && matches!(self.peek_kind(1), TokenKind::Keyword(Keyword::In)) {
                let line = self.pos().line;
                self.advance();
                self.advance();
                let right = self.parse_shift()?;
                left = Expr::new(
                    ExprKind::Unary {
                        op: "not".to_owned(),
                        operand: Box::new(Expr::new(
                            ExprKind::Binary {
                                op: "in".to_owned(),
                                left: Box::new(left),
                                right: Box::new(right),
                            },
                            line,
                        )),
                    },
                    line,
                );
                continue;
            }
            let op = match self.kind() {
                TokenKind::Operator(o) if matches!(o.as_str(), "<" | ">" | "<=" | ">=") => o.clone(),
                TokenKind::Keyword(Keyword::In) => "in".to_owned(),
                _ => break,
            };
            let line = self.pos().line;
            self.advance();
            let right = self.parse_shift()?;
            left = Expr::new(
                ExprKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                line,
            );
        }
        Ok(left)
    }

    fn parse_shift(&mut self) -> Result<Expr, QuantumError> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.kind() {
                TokenKind::Operator(o) if o == "<<" || o == ">>" => o.clone(),
                _ => break,
            };
            let line = self.pos().line;
            self.advance();
            let right = self.parse_additive()?;
            left = Expr::new(
                ExprKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                line,
            );
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr, QuantumError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.kind() {
                TokenKind::Operator(o) if o == "+" || o == "-" => o.clone(),
                _ => break,
            };
            let line = self.pos().line;
            self.advance();
            let right = self.parse_multiplicative()?;
            left = Expr::new(
                ExprKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                line,
            );
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, QuantumError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.kind() {
                TokenKind::Operator(o) if matches!(o.as_str(), "*" | "/" | "%" | "//") => o.clone(),
                _ => break,
            };
            let line = self.pos().line;
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::new(
                ExprKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                line,
            );
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, QuantumError> {
        let line = self.pos().line;

        if self.check_kw(Keyword::Not) || self.check_op("!") {
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(Expr::new(
                ExprKind::Unary {
                    op: "not".to_owned(),
                    operand: Box::new(operand),
                },
                line,
            ));
        }
        if self.check_op("-") {
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(Expr::new(
                ExprKind::Unary {
                    op: "-".to_owned(),
                    operand: Box::new(operand),
                },
                line,
            ));
        }
        if self.check_op("~") {
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(Expr::new(
                ExprKind::Unary {
                    op: "~".to_owned(),
                    operand: Box::new(operand),
                },
                line,
            ));
        }
        // permissive C-style address-of: silently stripped (spec §4.2)
        if self.check_op("&") {
            self.advance();
            return self.parse_unary();
        }
        if self.check_op("++") || self.check_op("--") {
            let delta = if self.check_op("++") { 1.0 } else { -1.0 };
            self.advance();
            let target = self.parse_unary()?;
            return Ok(Expr::new(
                ExprKind::Assign {
                    op: "+=".to_owned(),
                    target: Box::new(target),
                    value: Box::new(Expr::new(ExprKind::Number(delta), line)),
                },
                line,
            ));
        }

        self.parse_power()
    }

    fn parse_power(&mut self) -> Result<Expr, QuantumError> {
        let left = self.parse_postfix()?;
        if self.check_op("**") {
            let line = self.pos().line;
            self.advance();
            let right = self.parse_unary()?;
            return Ok(Expr::new(
                ExprKind::Binary {
                    op: "**".to_owned(),
                    left: Box::new(left),
                    right: Box::new(right),
                },
                line,
            ));
        }
        Ok(left)
    }

    fn parse_postfix(&mut self) -> Result<Expr, QuantumError> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.check_punct('(') {
                let line = self.pos().line;
                let args = self.parse_call_args()?;
                expr = Expr::new(
                    ExprKind::Call {
                        callee: Box::new(expr),
                        args,
                    },
                    line,
                );
            } else if self.check_punct('[') {
                let line = self.pos().line;
                self.advance();
                expr = self.parse_index_or_slice(expr, line)?;
            } else if self.check_punct('.') {
                let line = self.pos().line;
                self.advance();
                let name = self.expect_identifier()?;
                expr = Expr::new(
                    ExprKind::Member {
                        object: Box::new(expr),
                        name,
                    },
                    line,
                );
            } else if self.check_op("++") || self.check_op("--") {
                let delta = if self.check_op("++") { 1.0 } else { -1.0 };
                let line = self.pos().line;
                self.advance();
                expr = Expr::new(
                    ExprKind::Assign {
                        op: "+=".to_owned(),
                        target: Box::new(expr),
                        value: Box::new(Expr::new(ExprKind::Number(delta), line)),
                    },
                    line,
                );
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_index_or_slice(&mut self, object: Expr, line: usize) -> Result<Expr, QuantumError> {
        let start = if self.check_punct(':') {
            None
        } else {
            Some(Box::new(self.parse_assignment()?))
        };

        if self.check_punct(':') {
            self.advance();
            let stop = if self.check_punct(':') || self.check_punct(']') {
                None
            } else {
                Some(Box::new(self.parse_assignment()?))
            };
            let step = if self.check_punct(':') {
                self.advance();
                if self.check_punct(']') {
                    None
                } else {
                    Some(Box::new(self.parse_assignment()?))
                }
            } else {
                None
            };
            self.eat_punct_rbracket()?;
            return Ok(Expr::new(
                ExprKind::Slice {
                    object: Box::new(object),
                    start,
                    stop,
                    step,
                },
                line,
            ));
        }

        self.eat_punct_rbracket()?;
        let index = start.ok_or_else(|| QuantumError::parse("expected index expression", self.pos()))?;
        Ok(Expr::new(
            ExprKind::Index {
                object: Box::new(object),
                index,
            },
            line,
        ))
    }

    fn eat_punct_rbracket(&mut self) -> Result<(), QuantumError> {
        if self.check_punct(']') {
            self.advance();
            Ok(())
        } else {
            Err(QuantumError::parse("expected ']'", self.pos()))
        }
    }

    fn parse_call_args(&mut self) -> Result<Vec<Expr>, QuantumError> {
        self.advance(); // (
        let mut args = Vec::new();
        while !self.check_punct(')') && !self.at_eof() {
            let first = self.parse_assignment()?;
            if self.check_kw(Keyword::For) && args.is_empty() {
                // generator expression inside a single-argument call is
                // parsed as a list comprehension (spec §4.2).
                let comp = self.parse_comprehension_tail(first)?;
                args.push(comp);
                break;
            }
            args.push(first);
            if self.check_punct(',') {
                self.advance();
            } else {
                break;
            }
        }
        if self.check_punct(')') {
            self.advance();
        } else {
            return Err(QuantumError::parse("expected ')'", self.pos()));
        }
        Ok(args)
    }

    fn parse_comprehension_tail(&mut self, expr: Expr) -> Result<Expr, QuantumError> {
        let line = expr.line;
        self.eat_kw(Keyword::For)?;
        let var = self.expect_identifier()?;
        let var2 = if self.check_punct(',') {
            self.advance();
            Some(self.expect_identifier()?)
        } else {
            None
        };
        if self.check_kw(Keyword::In) || self.check_kw(Keyword::Of) {
            self.advance();
        } else {
            return Err(QuantumError::parse("expected 'in' in comprehension", self.pos()));
        }
        let iter = self.parse_or()?;
        let cond = if self.check_kw(Keyword::If) {
            self.advance();
            Some(Box::new(self.parse_or()?))
        } else {
            None
        };
        let mut vars = vec![var];
        if let Some(v2) = var2 {
            vars.push(v2);
        }
        Ok(Expr::new(
            ExprKind::ListComp {
                expr: Box::new(expr),
                vars,
                iter: Box::new(iter),
                cond,
            },
            line,
        ))
    }

    fn parse_primary(&mut self) -> Result<Expr, QuantumError> {
        let line = self.pos().line;

        match self.kind().clone() {
            TokenKind::Number(n) => {
                self.advance();
                Ok(Expr::new(ExprKind::Number(n), line))
            }
            TokenKind::String(s) => {
                self.advance();
                Ok(Expr::new(ExprKind::String(s), line))
            }
            TokenKind::Keyword(Keyword::True) => {
                self.advance();
                Ok(Expr::new(ExprKind::Bool(true), line))
            }
            TokenKind::Keyword(Keyword::False) => {
                self.advance();
                Ok(Expr::new(ExprKind::Bool(false), line))
            }
            TokenKind::Keyword(Keyword::Nil) => {
                self.advance();
                Ok(Expr::new(ExprKind::Nil, line))
            }
            TokenKind::Keyword(Keyword::Self_) => {
                self.advance();
                Ok(Expr::new(ExprKind::Identifier("self".to_owned()), line))
            }
            TokenKind::Keyword(Keyword::Super) => {
                self.advance();
                if self.check_punct('.') {
                    self.advance();
                    let name = self.expect_identifier()?;
                    Ok(Expr::new(ExprKind::SuperRef(name), line))
                } else {
                    Ok(Expr::new(ExprKind::SuperRef(String::new()), line))
                }
            }
            TokenKind::Keyword(Keyword::New) => {
                self.advance();
                self.parse_postfix()
            }
            // `input(...)` used as an expression (e.g. `let x = input("n: ")`)
            // resolves to the builtin of the same name rather than the
            // statement form the `input` keyword otherwise introduces.
            TokenKind::Keyword(Keyword::Input) => {
                self.advance();
                Ok(Expr::new(ExprKind::Identifier("input".to_owned()), line))
            }
            TokenKind::Identifier(name) => {
                if matches!(self.peek_kind(1), TokenKind::Operator(o) if o == "=>") {
                    self.advance();
                    self.advance(); // =>
                    return self.parse_arrow_body(vec![name], line);
                }
                self.advance();
                Ok(Expr::new(ExprKind::Identifier(name), line))
            }
            // A type keyword used as a value (`int(x)`, `str(x)`, bare
            // `list`) refers to the same-named type-constructor builtin.
            TokenKind::TypeName(name) => {
                self.advance();
                Ok(Expr::new(ExprKind::Identifier(name), line))
            }
            TokenKind::Punct('(') => self.parse_paren_or_arrow(line),
            TokenKind::Punct('[') => self.parse_array_or_comprehension(line),
            TokenKind::Punct('{') => self.parse_dict_literal(line),
            other => Err(QuantumError::parse(
                format!("unexpected token {other:?}"),
                self.pos(),
            )),
        }
    }

    /// Decides, via bounded lookahead to the matching `)`, whether `(` is a
    /// parenthesised/tuple expression or an arrow-function parameter list.
    fn parse_paren_or_arrow(&mut self, line: usize) -> Result<Expr, QuantumError> {
        if self.is_arrow_param_list() {
            let params = self.parse_params()?;
            self.eat_op_arrow()?;
            return self.parse_arrow_body(params, line);
        }

        self.advance(); // (
        if self.check_punct(')') {
            self.advance();
            return Ok(Expr::new(ExprKind::Tuple(Vec::new()), line));
        }
        let first = self.parse_assignment()?;
        if self.check_punct(',') {
            let mut items = vec![first];
            while self.check_punct(',') {
                self.advance();
                if self.check_punct(')') {
                    break;
                }
                items.push(self.parse_assignment()?);
            }
            self.eat_rparen()?;
            return Ok(Expr::new(ExprKind::Tuple(items), line));
        }
        self.eat_rparen()?;
        Ok(first)
    }

    fn eat_rparen(&mut self) -> Result<(), QuantumError> {
        if self.check_punct(')') {
            self.advance();
            Ok(())
        } else {
            Err(QuantumError::parse("expected ')'", self.pos()))
        }
    }

    fn eat_op_arrow(&mut self) -> Result<(), QuantumError> {
        if self.check_op("=>") {
            self.advance();
            Ok(())
        } else {
            Err(QuantumError::parse("expected '=>'", self.pos()))
        }
    }

    fn is_arrow_param_list(&self) -> bool {
        let mut depth = 0i32;
        let mut i = self.index;
        loop {
            match self.tokens.get(i).map(|t| &t.kind) {
                Some(TokenKind::Punct('(')) => depth += 1,
                Some(TokenKind::Punct(')')) => {
                    depth -= 1;
                    if depth == 0 {
                        return matches!(
                            self.tokens.get(i + 1).map(|t| &t.kind),
                            Some(TokenKind::Operator(o)) if o == "=>"
                        );
                    }
                }
                Some(TokenKind::Eof) | None => return false,
                _ => {}
            }
            i += 1;
        }
    }

    fn parse_arrow_body(&mut self, params: Vec<String>, line: usize) -> Result<Expr, QuantumError> {
        let body = if self.check_punct('{') {
            self.parse_block()?
        } else {
            let expr = self.parse_assignment()?;
            vec![crate::ast::Stmt::new(crate::ast::StmtKind::Return(Some(expr)), line)]
        };
        Ok(Expr::new(ExprKind::Lambda { params, body }, line))
    }

    fn parse_array_or_comprehension(&mut self, line: usize) -> Result<Expr, QuantumError> {
        self.advance(); // [
        if self.check_punct(']') {
            self.advance();
            return Ok(Expr::new(ExprKind::Array(Vec::new()), line));
        }
        let first = self.parse_assignment()?;
        if self.check_kw(Keyword::For) {
            let comp = self.parse_comprehension_tail(first)?;
            self.eat_punct_rbracket()?;
            return Ok(comp);
        }
        let mut items = vec![first];
        while self.check_punct(',') {
            self.advance();
            if self.check_punct(']') {
                break;
            }
            items.push(self.parse_assignment()?);
        }
        self.eat_punct_rbracket()?;
        Ok(Expr::new(ExprKind::Array(items), line))
    }

    fn parse_dict_literal(&mut self, line: usize) -> Result<Expr, QuantumError> {
        self.advance(); // {
        let mut pairs = Vec::new();
        while !self.check_punct('}') && !self.at_eof() {
            let key = match self.kind().clone() {
                TokenKind::Identifier(name) if matches!(self.peek_kind(1), TokenKind::Punct(':')) => {
                    self.advance();
                    Expr::new(ExprKind::String(name), line)
                }
                _ => self.parse_assignment()?,
            };
            self.eat_colon()?;
            let value = self.parse_assignment()?;
            pairs.push(DictPair { key, value });
            if self.check_punct(',') {
                self.advance();
            } else {
                break;
            }
        }
        if self.check_punct('}') {
            self.advance();
        } else {
            return Err(QuantumError::parse("expected '}'", self.pos()));
        }
        Ok(Expr::new(ExprKind::Dict(pairs), line))
    }
}
