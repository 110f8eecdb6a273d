//! Recursive-descent statement parser (spec §4.2). Expression parsing
//! (Pratt precedence climbing) lives in [`expr`].

mod expr;

use log::debug;

use crate::ast::{
    Block, CatchHandler, Expr, ExprKind, ImportItem, MethodDef, Program, Stmt, StmtKind, TypeHint,
};
use crate::error::QuantumError;
use crate::lexer::{Keyword, Lexer, Token, TokenKind};
use crate::position::Position;

pub struct Parser {
    tokens: Vec<Token>,
    index: usize,
}

impl Parser {
    pub fn parse(source: &str) -> Result<Program, QuantumError> {
        let tokens = Lexer::lex(source)?;
        debug!("parsing {} tokens", tokens.len());
        let mut parser = Parser { tokens, index: 0 };
        parser.parse_program()
    }

    pub fn parse_tokens(tokens: Vec<Token>) -> Result<Program, QuantumError> {
        let mut parser = Parser { tokens, index: 0 };
        parser.parse_program()
    }

    // --- token stream helpers -------------------------------------------------

    fn cur(&self) -> &Token {
        &self.tokens[self.index.min(self.tokens.len() - 1)]
    }

    fn kind(&self) -> &TokenKind {
        &self.cur().kind
    }

    fn pos(&self) -> Position {
        self.cur().pos
    }

    fn at_eof(&self) -> bool {
        matches!(self.kind(), TokenKind::Eof)
    }

    fn advance(&mut self) -> Token {
        let tok = self.cur().clone();
        if !self.at_eof() {
            self.index += 1;
        }
        tok
    }

    fn check_punct(&self, c: char) -> bool {
        matches!(self.kind(), TokenKind::Punct(p) if *p == c)
    }

    fn check_kw(&self, kw: Keyword) -> bool {
        matches!(self.kind(), TokenKind::Keyword(k) if *k == kw)
    }

    fn check_op(&self, op: &str) -> bool {
        matches!(self.kind(), TokenKind::Operator(o) if o == op)
    }

    fn peek_kind(&self, offset: usize) -> &TokenKind {
        let i = (self.index + offset).min(self.tokens.len() - 1);
        &self.tokens[i].kind
    }

    fn eat_punct(&mut self, c: char) -> Result<Token, QuantumError> {
        if self.check_punct(c) {
            Ok(self.advance())
        } else {
            Err(QuantumError::parse(format!("expected '{c}'"), self.pos()))
        }
    }

    fn eat_kw(&mut self, kw: Keyword) -> Result<Token, QuantumError> {
        if self.check_kw(kw) {
            Ok(self.advance())
        } else {
            Err(QuantumError::parse(format!("expected {kw:?}"), self.pos()))
        }
    }

    fn expect_identifier(&mut self) -> Result<String, QuantumError> {
        match self.kind().clone() {
            TokenKind::Identifier(name) => {
                self.advance();
                Ok(name)
            }
            _ => Err(QuantumError::parse("expected identifier", self.pos())),
        }
    }

    /// Skips NEWLINE tokens and stray `;` separators.
    fn skip_separators(&mut self) {
        while matches!(self.kind(), TokenKind::Newline) || self.check_punct(';') {
            self.advance();
        }
    }

    // --- program / blocks -------------------------------------------------

    fn parse_program(&mut self) -> Result<Program, QuantumError> {
        let mut statements = Block::new();
        self.skip_separators();
        while !self.at_eof() {
            statements.push(self.parse_statement()?);
            self.skip_separators();
        }
        Ok(Program { statements })
    }

    /// A block is either brace-delimited, an INDENT...DEDENT pair, or (when
    /// a single-statement body is allowed) a single statement wrapped up.
    fn parse_block(&mut self) -> Result<Block, QuantumError> {
        if self.check_punct('{') {
            self.advance();
            self.skip_separators();
            let mut stmts = Block::new();
            while !self.check_punct('}') && !self.at_eof() {
                stmts.push(self.parse_statement()?);
                self.skip_separators();
            }
            self.eat_punct('}')?;
            Ok(stmts)
        } else if matches!(self.kind(), TokenKind::Indent) {
            self.advance();
            self.skip_separators();
            let mut stmts = Block::new();
            while !matches!(self.kind(), TokenKind::Dedent) && !self.at_eof() {
                stmts.push(self.parse_statement()?);
                self.skip_separators();
            }
            if matches!(self.kind(), TokenKind::Dedent) {
                self.advance();
            }
            Ok(stmts)
        } else {
            Ok(vec![self.parse_statement()?])
        }
    }

    /// Skips an optional trailing colon on a Python-style header (`if
    /// cond:`), which layout reconstruction will usually have turned into
    /// an INDENT already by the time we get here, but the colon token
    /// itself still needs consuming.
    fn skip_optional_header_colon(&mut self) {
        if self.check_punct(':') {
            self.advance();
        }
    }

    // --- statements -------------------------------------------------------

    fn skip_decorators(&mut self) -> Result<(), QuantumError> {
        while self.check_punct('@') {
            self.advance();
            self.expect_identifier()?;
            if self.check_punct('(') {
                self.advance();
                while !self.check_punct(')') && !self.at_eof() {
                    self.parse_expression()?;
                    if self.check_punct(',') {
                        self.advance();
                    }
                }
                self.eat_punct(')')?;
            }
            self.skip_separators();
        }
        Ok(())
    }

    fn parse_statement(&mut self) -> Result<Stmt, QuantumError> {
        self.skip_decorators()?;
        let pos = self.pos();

        let kind = match self.kind().clone() {
            TokenKind::Keyword(Keyword::Let) => self.parse_var_decl(false)?,
            TokenKind::Keyword(Keyword::Const) => self.parse_var_decl(true)?,
            TokenKind::Keyword(Keyword::Fn) => self.parse_function_decl()?,
            TokenKind::Keyword(Keyword::Class) => self.parse_class_decl()?,
            TokenKind::Keyword(Keyword::If) => self.parse_if()?,
            TokenKind::Keyword(Keyword::While) => self.parse_while()?,
            TokenKind::Keyword(Keyword::For) => self.parse_for()?,
            TokenKind::Keyword(Keyword::Return) => self.parse_return()?,
            TokenKind::Keyword(Keyword::Break) => {
                self.advance();
                StmtKind::Break
            }
            TokenKind::Keyword(Keyword::Continue) => {
                self.advance();
                StmtKind::Continue
            }
            TokenKind::Keyword(Keyword::Raise) => self.parse_raise()?,
            TokenKind::Keyword(Keyword::Try) => self.parse_try()?,
            TokenKind::Keyword(Keyword::Print) => self.parse_print()?,
            TokenKind::Keyword(Keyword::Input) => self.parse_input()?,
            TokenKind::Keyword(Keyword::Cout) => self.parse_cout()?,
            TokenKind::Keyword(Keyword::Cin) => self.parse_cin()?,
            TokenKind::Keyword(Keyword::Import) => self.parse_import()?,
            TokenKind::Keyword(Keyword::From) => self.parse_from_import()?,
            TokenKind::Punct('{') => StmtKind::Block(self.parse_block()?),
            TokenKind::TypeName(_) if self.next_is_c_style_decl() => self.parse_c_style_decl()?,
            _ => StmtKind::ExprStmt(self.parse_expression()?),
        };

        Ok(Stmt::new(kind, pos.line))
    }

    fn next_is_c_style_decl(&self) -> bool {
        matches!(self.peek_kind(1), TokenKind::Identifier(_))
    }

    fn parse_c_style_decl(&mut self) -> Result<StmtKind, QuantumError> {
        let type_name = match self.advance().kind {
            TokenKind::TypeName(name) => name,
            _ => unreachable!(),
        };
        let type_hint = TypeHint::from_name(&type_name);
        let name = self.expect_identifier()?;
        let init = if self.check_op("=") {
            self.advance();
            Some(self.parse_expression()?)
        } else {
            None
        };
        self.consume_statement_end();
        Ok(StmtKind::Var {
            is_const: false,
            name,
            init,
            type_hint,
        })
    }

    fn consume_statement_end(&mut self) {
        if self.check_punct(';') {
            self.advance();
        }
    }

    fn parse_var_decl(&mut self, is_const: bool) -> Result<StmtKind, QuantumError> {
        self.advance(); // let/const
        let name = self.expect_identifier()?;

        let type_hint = if self.check_punct(':') {
            self.advance();
            let hint = self.parse_type_annotation()?;
            hint
        } else {
            None
        };

        let init = if self.check_op("=") {
            self.advance();
            Some(self.parse_expression()?)
        } else {
            None
        };
        self.consume_statement_end();
        Ok(StmtKind::Var {
            is_const,
            name,
            init,
            type_hint,
        })
    }

    /// Parses (and mostly discards) a type annotation, returning a
    /// coercion hint only when the name matches a known C-style scalar
    /// type (spec §4.2 "Type annotations and defaults").
    fn parse_type_annotation(&mut self) -> Result<Option<TypeHint>, QuantumError> {
        let name = match self.kind().clone() {
            TokenKind::TypeName(name) => {
                self.advance();
                name
            }
            _ => self.expect_identifier()?,
        };
        let hint = TypeHint::from_name(&name);
        // `List[int]`-style generic parameter lists are discarded.
        if self.check_punct('[') {
            self.advance();
            let mut depth = 1;
            while depth > 0 && !self.at_eof() {
                match self.kind() {
                    TokenKind::Punct('[') => depth += 1,
                    TokenKind::Punct(']') => depth -= 1,
                    _ => {}
                }
                self.advance();
            }
        }
        Ok(hint)
    }

    fn parse_params(&mut self) -> Result<Vec<String>, QuantumError> {
        self.eat_punct('(')?;
        let mut params = Vec::new();
        while !self.check_punct(')') && !self.at_eof() {
            if self.check_punct('&') {
                self.advance();
            }
            let name = self.expect_identifier()?;
            params.push(name);
            if self.check_punct(':') {
                self.advance();
                self.parse_type_annotation()?;
            }
            if self.check_op("=") {
                self.advance();
                self.parse_ternary()?; // default value, discarded
            }
            if self.check_punct(',') {
                self.advance();
            }
        }
        self.eat_punct(')')?;
        Ok(params)
    }

    fn skip_return_type_annotation(&mut self) {
        if self.check_op("->") {
            self.advance();
            match self.kind() {
                TokenKind::TypeName(_) | TokenKind::Identifier(_) => {
                    self.advance();
                }
                _ => {}
            }
        }
    }

    fn parse_function_decl(&mut self) -> Result<StmtKind, QuantumError> {
        self.advance(); // fn/def/function
        let name = self.expect_identifier()?;
        let params = self.parse_params()?;
        self.skip_return_type_annotation();
        self.skip_optional_header_colon();
        let body = self.parse_block()?;
        Ok(StmtKind::Function { name, params, body })
    }

    fn normalize_method_name(name: &str, class_name: &str) -> String {
        match name {
            "constructor" | "__init__" => "init".to_owned(),
            "destructor" => "__del__".to_owned(),
            "toString" | "to_string" | "to_str" => "__str__".to_owned(),
            other if other == format!("~{class_name}") => "__del__".to_owned(),
            other => other.to_owned(),
        }
    }

    fn parse_class_decl(&mut self) -> Result<StmtKind, QuantumError> {
        self.advance(); // class
        let name = self.expect_identifier()?;

        let mut base = None;
        if self.check_punct('(') {
            self.advance();
            if !self.check_punct(')') {
                base = Some(self.expect_identifier()?);
                while self.check_punct(',') {
                    self.advance();
                    self.expect_identifier()?; // extra bases discarded
                }
            }
            self.eat_punct(')')?;
        } else if self.check_kw(Keyword::Extends) {
            self.advance();
            base = Some(self.expect_identifier()?);
        }

        self.skip_optional_header_colon();

        let (methods, static_methods) = self.parse_class_body(&name)?;

        Ok(StmtKind::Class {
            name,
            base,
            methods,
            static_methods,
        })
    }

    fn parse_class_body(
        &mut self,
        class_name: &str,
    ) -> Result<(Vec<MethodDef>, Vec<MethodDef>), QuantumError> {
        let brace = self.check_punct('{');
        let indent = matches!(self.kind(), TokenKind::Indent);
        let single = !brace && !indent;
        if brace || indent {
            self.advance();
        }
        self.skip_separators();

        let mut methods = Vec::new();
        let mut static_methods = Vec::new();

        let mut first = true;
        loop {
            if brace && self.check_punct('}') {
                break;
            }
            if indent && matches!(self.kind(), TokenKind::Dedent) {
                break;
            }
            if single && !first {
                break;
            }
            if self.at_eof() {
                break;
            }
            first = false;

            self.skip_decorators()?;
            let is_static = if self.check_kw(Keyword::Static) {
                self.advance();
                true
            } else {
                false
            };

            if self.check_kw(Keyword::Fn) {
                self.advance();
                let method_name = self.expect_identifier()?;
                let params = self.parse_params()?;
                self.skip_return_type_annotation();
                self.skip_optional_header_colon();
                let body = self.parse_block()?;
                let normalized = Self::normalize_method_name(&method_name, class_name);
                let def = MethodDef {
                    name: normalized,
                    params,
                    body,
                    is_static,
                };
                if is_static {
                    static_methods.push(def);
                } else {
                    methods.push(def);
                }
            } else {
                // a bare field declaration or other statement in the class
                // body; the language has no class-field-declaration
                // construct, so anything else is parsed and discarded.
                self.parse_statement()?;
            }
            self.skip_separators();
        }

        if brace {
            self.eat_punct('}')?;
        } else if indent && matches!(self.kind(), TokenKind::Dedent) {
            self.advance();
        }

        Ok((methods, static_methods))
    }

    fn parse_if(&mut self) -> Result<StmtKind, QuantumError> {
        self.advance(); // if
        let paren = self.check_punct('(');
        if paren {
            self.advance();
        }
        let cond = self.parse_expression()?;
        if paren {
            self.eat_punct(')')?;
        }
        self.skip_optional_header_colon();
        let then_branch = self.parse_block()?;

        let else_branch = if self.check_kw(Keyword::Elif) {
            Some(vec![Stmt::new(self.parse_if()?, self.pos().line)])
        } else if self.check_kw(Keyword::Else) {
            self.advance();
            if self.check_kw(Keyword::If) {
                Some(vec![Stmt::new(self.parse_if()?, self.pos().line)])
            } else {
                self.skip_optional_header_colon();
                Some(self.parse_block()?)
            }
        } else {
            None
        };

        Ok(StmtKind::If {
            cond,
            then_branch,
            else_branch,
        })
    }

    fn parse_while(&mut self) -> Result<StmtKind, QuantumError> {
        self.advance(); // while
        let paren = self.check_punct('(');
        if paren {
            self.advance();
        }
        let cond = self.parse_expression()?;
        if paren {
            self.eat_punct(')')?;
        }
        self.skip_optional_header_colon();
        let body = self.parse_block()?;
        Ok(StmtKind::While { cond, body })
    }

    /// Distinguishes foreach from C-style by lookahead after `for (`.
    fn parse_for(&mut self) -> Result<StmtKind, QuantumError> {
        self.advance(); // for
        let has_parens = self.check_punct('(');
        if has_parens {
            self.advance();
        }

        let is_c_style = has_parens && self.looks_like_c_style_for();

        if is_c_style {
            let init = if self.check_kw(Keyword::Let) || self.check_kw(Keyword::Const) {
                Some(Stmt::new(
                    self.parse_var_decl(self.check_kw(Keyword::Const))?,
                    self.pos().line,
                ))
            } else if !self.check_punct(';') {
                let e = self.parse_expression()?;
                Some(Stmt::new(StmtKind::ExprStmt(e), self.pos().line))
            } else {
                None
            };
            self.eat_punct(';')?;

            let cond = if !self.check_punct(';') {
                self.parse_expression()?
            } else {
                Expr::new(ExprKind::Bool(true), self.pos().line)
            };
            self.eat_punct(';')?;

            let post = if !self.check_punct(')') {
                Some(self.parse_expression()?)
            } else {
                None
            };
            self.eat_punct(')')?;
            self.skip_optional_header_colon();
            let mut body = self.parse_block()?;
            if let Some(post) = post {
                body.push(Stmt::new(StmtKind::ExprStmt(post), cond.line));
            }
            let while_stmt = Stmt::new(StmtKind::While { cond, body }, self.pos().line);
            let mut outer = Block::new();
            if let Some(init) = init {
                outer.push(init);
            }
            outer.push(while_stmt);
            return Ok(StmtKind::Block(outer));
        }

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
            return Err(QuantumError::parse("expected 'in' or 'of' in for-loop", self.pos()));
        }
        let iter = self.parse_expression()?;
        if has_parens {
            self.eat_punct(')')?;
        }
        self.skip_optional_header_colon();
        let body = self.parse_block()?;
        Ok(StmtKind::For {
            var,
            var2,
            iter,
            body,
        })
    }

    /// Non-consuming scan: `for (` is C-style only if we can find a bare
    /// `;` before the matching `)` at depth zero.
    fn looks_like_c_style_for(&self) -> bool {
        let mut depth = 0i32;
        let mut i = self.index;
        while i < self.tokens.len() {
            match &self.tokens[i].kind {
                TokenKind::Punct('(') => depth += 1,
                TokenKind::Punct(')') if depth == 0 => return false,
                TokenKind::Punct(')') => depth -= 1,
                TokenKind::Punct(';') if depth == 0 => return true,
                TokenKind::Eof => return false,
                _ => {}
            }
            i += 1;
        }
        false
    }

    fn parse_return(&mut self) -> Result<StmtKind, QuantumError> {
        self.advance();
        if self.at_statement_end() {
            Ok(StmtKind::Return(None))
        } else {
            Ok(StmtKind::Return(Some(self.parse_expression()?)))
        }
    }

    fn parse_raise(&mut self) -> Result<StmtKind, QuantumError> {
        self.advance();
        if self.at_statement_end() {
            Ok(StmtKind::Raise(None))
        } else {
            Ok(StmtKind::Raise(Some(self.parse_expression()?)))
        }
    }

    fn at_statement_end(&self) -> bool {
        matches!(self.kind(), TokenKind::Newline | TokenKind::Eof | TokenKind::Dedent)
            || self.check_punct(';')
            || self.check_punct('}')
    }

    fn parse_try(&mut self) -> Result<StmtKind, QuantumError> {
        self.advance(); // try
        self.skip_optional_header_colon();
        let body = self.parse_block()?;

        let mut handlers = Vec::new();
        while self.check_kw(Keyword::Except) {
            self.advance();
            let mut kind = String::new();
            let mut alias = None;
            if !self.check_punct(':') && !matches!(self.kind(), TokenKind::Indent | TokenKind::Punct('{')) {
                kind = self.expect_identifier()?;
                if self.check_kw(Keyword::As) {
                    self.advance();
                    alias = Some(self.expect_identifier()?);
                } else if self.check_punct('(') {
                    self.advance();
                    alias = Some(self.expect_identifier()?);
                    self.eat_punct(')')?;
                }
            }
            self.skip_optional_header_colon();
            let handler_body = self.parse_block()?;
            handlers.push(CatchHandler {
                kind,
                alias,
                body: handler_body,
            });
        }

        let finally = if self.check_kw(Keyword::Finally) {
            self.advance();
            self.skip_optional_header_colon();
            Some(self.parse_block()?)
        } else {
            None
        };

        Ok(StmtKind::Try {
            body,
            handlers,
            finally,
        })
    }

    /// `print(...)`, with a trailing `,` (native style) suppressing the
    /// newline and a bare `print "x"` native form also accepted.
    fn parse_print(&mut self) -> Result<StmtKind, QuantumError> {
        self.advance();
        let mut args = Vec::new();
        let had_parens = self.check_punct('(');
        if had_parens {
            self.advance();
            while !self.check_punct(')') && !self.at_eof() {
                args.push(self.parse_expression()?);
                if self.check_punct(',') {
                    self.advance();
                } else {
                    break;
                }
            }
            self.eat_punct(')')?;
        } else if !self.at_statement_end() {
            args.push(self.parse_expression()?);
            while self.check_punct(',') {
                self.advance();
                args.push(self.parse_expression()?);
            }
        }
        self.consume_statement_end();
        Ok(StmtKind::Print {
            args,
            trailing_newline: true,
        })
    }

    fn parse_input(&mut self) -> Result<StmtKind, QuantumError> {
        self.advance();
        let mut prompt = None;
        if self.check_punct('(') {
            self.advance();
            if !self.check_punct(')') {
                prompt = Some(self.parse_expression()?);
            }
            self.eat_punct(')')?;
        }
        // The bare `input(...)` statement form (as opposed to `cin >> x`,
        // which desugars to named targets directly) has no target clause of
        // its own in the grammar; the line is read and discarded.
        self.consume_statement_end();
        Ok(StmtKind::Input {
            target_name: None,
            prompt,
        })
    }

    /// `cin >> x >> y;` reads successive values into each target name.
    fn parse_cin(&mut self) -> Result<StmtKind, QuantumError> {
        self.advance(); // cin
        let mut names = Vec::new();
        while self.check_op(">>") {
            self.advance();
            names.push(self.expect_identifier()?);
        }
        self.consume_statement_end();
        // Desugar into a chain wrapped in a Block of Input statements so
        // the statement-kind surface stays small (spec §3: "Stream-in
        // chains are normalised into ... Input sequences by the parser").
        let mut stmts = Block::new();
        for name in names {
            stmts.push(Stmt::new(
                StmtKind::Input {
                    target_name: Some(name),
                    prompt: None,
                },
                self.pos().line,
            ));
        }
        Ok(StmtKind::Block(stmts))
    }

    /// `cout << a << b << endl;` normalises into a Print sequence.
    fn parse_cout(&mut self) -> Result<StmtKind, QuantumError> {
        self.advance(); // cout
        let mut args = Vec::new();
        let mut trailing_newline = false;
        while self.check_op("<<") {
            self.advance();
            if matches!(self.kind(), TokenKind::Identifier(n) if n == "endl") {
                self.advance();
                trailing_newline = true;
                continue;
            }
            args.push(self.parse_ternary()?);
        }
        self.consume_statement_end();
        Ok(StmtKind::Print {
            args,
            trailing_newline,
        })
    }

    fn parse_import_item(&mut self) -> Result<ImportItem, QuantumError> {
        let name = self.expect_identifier()?;
        let alias = if self.check_kw(Keyword::As) {
            self.advance();
            Some(self.expect_identifier()?)
        } else {
            None
        };
        Ok(ImportItem { name, alias })
    }

    fn parse_import(&mut self) -> Result<StmtKind, QuantumError> {
        self.advance(); // import
        let item = self.parse_import_item()?;
        self.consume_statement_end();
        Ok(StmtKind::Import {
            module: Some(item.name.clone()),
            items: vec![item],
        })
    }

    fn parse_from_import(&mut self) -> Result<StmtKind, QuantumError> {
        self.advance(); // from
        let module = self.expect_identifier()?;
        self.eat_kw(Keyword::Import)?;
        let mut items = vec![self.parse_import_item()?];
        while self.check_punct(',') {
            self.advance();
            items.push(self.parse_import_item()?);
        }
        self.consume_statement_end();
        Ok(StmtKind::Import {
            module: Some(module),
            items,
        })
    }

    // --- expressions are implemented in expr.rs ---------------------------

    pub(crate) fn parse_expression(&mut self) -> Result<Expr, QuantumError> {
        self.parse_assignment()
    }
}
