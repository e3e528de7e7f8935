//! Recursive-descent PHP parser.
//!
//! Covers the expression and statement grammar a search tool meets in the
//! wild: the full operator table, declarations, closures, class-likes. It
//! stops at the first error; a grep worker treats that as a skipped file.
//! `else if` is folded into the `elseif` branch list so both spellings
//! produce one tree shape.

use crate::ast::*;
use crate::error::{ParseError, ParseErrorKind as ErrorKind};
use crate::scanner::{self, Op, StrPart, Token, TokenKind};
use crate::{Position, SourceLocation};

pub fn parse_source(source: &str) -> Result<Node, ParseError> {
    let tokens = scanner::scan(source)?;
    let eof = Position {
        offset: source.len(),
        line: 1 + source.bytes().filter(|&b| b == b'\n').count() as u32,
    };
    Parser {
        tokens,
        pos: 0,
        eof,
    }
    .parse_root()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    eof: Position,
}

const MAGIC_CONSTS: &[&str] = &[
    "__LINE__",
    "__FILE__",
    "__DIR__",
    "__FUNCTION__",
    "__CLASS__",
    "__TRAIT__",
    "__METHOD__",
    "__NAMESPACE__",
];

const CASTS: &[(&str, CastKind)] = &[
    ("int", CastKind::Int),
    ("integer", CastKind::Int),
    ("float", CastKind::Float),
    ("double", CastKind::Float),
    ("real", CastKind::Float),
    ("string", CastKind::String),
    ("binary", CastKind::String),
    ("bool", CastKind::Bool),
    ("boolean", CastKind::Bool),
    ("array", CastKind::Array),
    ("object", CastKind::Object),
];

const MEMBER_MODIFIERS: &[&str] = &[
    "public",
    "protected",
    "private",
    "static",
    "abstract",
    "final",
    "readonly",
    "var",
];

// cursor helpers
impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }
    fn peek_at(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.pos + n)
    }
    fn advance(&mut self) {
        self.pos += 1;
    }
    fn at_eof(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn at_op(&self, op: Op) -> bool {
        self.peek().is_some_and(|t| t.is_op(op))
    }
    fn eat_op(&mut self, op: Op) -> bool {
        if self.at_op(op) {
            self.advance();
            true
        } else {
            false
        }
    }
    fn expect_op(&mut self, op: Op) -> Result<(), ParseError> {
        if self.eat_op(op) {
            Ok(())
        } else {
            Err(self.err_here(ErrorKind::UnexpectedToken))
        }
    }
    fn at_kw(&self, kw: &str) -> bool {
        self.peek().is_some_and(|t| t.is_kw(kw))
    }
    fn eat_kw(&mut self, kw: &str) -> bool {
        if self.at_kw(kw) {
            self.advance();
            true
        } else {
            false
        }
    }
    fn expect_ident(&mut self) -> Result<String, ParseError> {
        match self.peek() {
            Some(Token {
                kind: TokenKind::Ident(name),
                ..
            }) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.err_here(ErrorKind::UnexpectedToken)),
        }
    }

    fn start(&self) -> Position {
        self.peek().map(|t| t.loc.start).unwrap_or(self.eof)
    }
    fn prev_end(&self) -> Position {
        if self.pos == 0 {
            Position::default()
        } else {
            self.tokens[self.pos - 1].loc.end
        }
    }
    fn finish(&self, start: Position) -> SourceLocation {
        SourceLocation {
            start,
            end: self.prev_end(),
        }
    }

    fn err_here(&self, kind: ErrorKind) -> ParseError {
        let loc = self
            .peek()
            .map(|t| t.loc)
            .unwrap_or(SourceLocation {
                start: self.eof,
                end: self.eof,
            });
        ParseError::new(kind).with_location(loc)
    }

    /// Statement terminator: `;`, end of input, or a closing brace (kept
    /// lenient so snippet-style patterns like `{$x;$y}` parse).
    fn expect_semi(&mut self) -> Result<(), ParseError> {
        if self.eat_op(Op::Semi) || self.at_eof() || self.at_op(Op::RBrace) {
            Ok(())
        } else {
            Err(self.err_here(ErrorKind::MissingSemicolon))
        }
    }
}

// statements
impl Parser {
    fn parse_root(mut self) -> Result<Node, ParseError> {
        let start = Position::default();
        let mut stmts = Vec::new();
        while !self.at_eof() {
            stmts.push(self.parse_stmt()?);
        }
        let loc = SourceLocation {
            start,
            end: self.eof,
        };
        Ok(Node::new(NodeKind::Root(stmts), loc))
    }

    fn parse_stmt(&mut self) -> Result<Node, ParseError> {
        let start = self.start();
        if let Some(Token {
            kind: TokenKind::InlineHtml(text),
            ..
        }) = self.peek()
        {
            let text = text.clone();
            self.advance();
            return Ok(Node::new(NodeKind::InlineHtml(text), self.finish(start)));
        }
        if self.eat_op(Op::Semi) {
            return Ok(Node::new(NodeKind::Nop, self.finish(start)));
        }
        if self.at_op(Op::LBrace) {
            return self.parse_block();
        }
        if self.at_kw("if") {
            return self.parse_if();
        }
        if self.at_kw("while") {
            return self.parse_while();
        }
        if self.at_kw("do") {
            return self.parse_do_while();
        }
        if self.at_kw("for") {
            return self.parse_for();
        }
        if self.at_kw("foreach") {
            return self.parse_foreach();
        }
        if self.at_kw("switch") {
            return self.parse_switch();
        }
        if self.eat_kw("return") {
            let expr = if self.at_op(Op::Semi) || self.at_eof() {
                None
            } else {
                Some(Box::new(self.parse_expr()?))
            };
            self.expect_semi()?;
            return Ok(Node::new(NodeKind::Return(expr), self.finish(start)));
        }
        if self.eat_kw("break") {
            let expr = if self.at_op(Op::Semi) || self.at_eof() {
                None
            } else {
                Some(Box::new(self.parse_expr()?))
            };
            self.expect_semi()?;
            return Ok(Node::new(NodeKind::Break(expr), self.finish(start)));
        }
        if self.eat_kw("continue") {
            let expr = if self.at_op(Op::Semi) || self.at_eof() {
                None
            } else {
                Some(Box::new(self.parse_expr()?))
            };
            self.expect_semi()?;
            return Ok(Node::new(NodeKind::Continue(expr), self.finish(start)));
        }
        if self.eat_kw("echo") {
            let mut exprs = vec![self.parse_expr()?];
            while self.eat_op(Op::Comma) {
                exprs.push(self.parse_expr()?);
            }
            self.expect_semi()?;
            return Ok(Node::new(NodeKind::Echo(exprs), self.finish(start)));
        }
        if self.eat_kw("throw") {
            let expr = self.parse_expr()?;
            self.expect_semi()?;
            return Ok(Node::new(
                NodeKind::Throw(Box::new(expr)),
                self.finish(start),
            ));
        }
        if self.at_kw("try") {
            return self.parse_try();
        }
        if self.eat_kw("unset") {
            self.expect_op(Op::LParen)?;
            let vars = self.parse_expr_list(Op::RParen)?;
            self.expect_semi()?;
            return Ok(Node::new(NodeKind::Unset(vars), self.finish(start)));
        }
        if self.eat_kw("global") {
            let mut vars = vec![self.parse_expr()?];
            while self.eat_op(Op::Comma) {
                vars.push(self.parse_expr()?);
            }
            self.expect_semi()?;
            return Ok(Node::new(NodeKind::Global(vars), self.finish(start)));
        }
        if self.at_kw("namespace") {
            return self.parse_namespace();
        }
        if self.at_kw("use") {
            return self.parse_use();
        }
        if self.at_kw("declare") {
            return self.parse_declare();
        }
        if self.at_kw("const") {
            self.advance();
            let elems = self.parse_const_elems()?;
            self.expect_semi()?;
            return Ok(Node::new(
                NodeKind::ClassConstDecl {
                    modifiers: Vec::new(),
                    elems,
                },
                self.finish(start),
            ));
        }
        // `function name(...)` is a declaration, `function (...)` an
        // expression statement (closure)
        let declares_function = self.at_kw("function")
            && (self
                .peek_at(1)
                .is_some_and(|t| matches!(t.kind, TokenKind::Ident(_)))
                || (self.peek_at(1).is_some_and(|t| t.is_op(Op::Amp))
                    && self
                        .peek_at(2)
                        .is_some_and(|t| matches!(t.kind, TokenKind::Ident(_)))));
        if declares_function {
            return self.parse_func_decl();
        }
        if self.at_kw("class") || self.at_kw("interface") || self.at_kw("trait") {
            return self.parse_class(start, false, false);
        }
        if self.at_kw("abstract") || self.at_kw("final") {
            let mut is_abstract = false;
            let mut is_final = false;
            loop {
                if self.eat_kw("abstract") {
                    is_abstract = true;
                } else if self.eat_kw("final") {
                    is_final = true;
                } else {
                    break;
                }
            }
            return self.parse_class(start, is_abstract, is_final);
        }

        let expr = self.parse_expr()?;
        self.expect_semi()?;
        Ok(Node::new(
            NodeKind::ExprStmt(Box::new(expr)),
            self.finish(start),
        ))
    }

    fn parse_block(&mut self) -> Result<Node, ParseError> {
        let start = self.start();
        self.expect_op(Op::LBrace)?;
        let stmts = self.parse_stmts_until_rbrace()?;
        Ok(Node::new(NodeKind::Block(stmts), self.finish(start)))
    }

    fn parse_stmts_until_rbrace(&mut self) -> Result<Vec<Node>, ParseError> {
        let mut stmts = Vec::new();
        while !self.at_op(Op::RBrace) {
            if self.at_eof() {
                return Err(self.err_here(ErrorKind::UnexpectedEof));
            }
            stmts.push(self.parse_stmt()?);
        }
        self.advance();
        Ok(stmts)
    }

    fn parse_paren_expr(&mut self) -> Result<Node, ParseError> {
        self.expect_op(Op::LParen)?;
        let expr = self.parse_expr()?;
        self.expect_op(Op::RParen)?;
        Ok(expr)
    }

    fn parse_if(&mut self) -> Result<Node, ParseError> {
        let start = self.start();
        self.advance(); // if
        let cond = self.parse_paren_expr()?;
        let then = self.parse_stmt()?;
        let mut elseifs = Vec::new();
        let mut else_ = None;
        loop {
            if self.at_kw("elseif") {
                let ei_start = self.start();
                self.advance();
                let cond = self.parse_paren_expr()?;
                let body = self.parse_stmt()?;
                elseifs.push(Node::new(
                    NodeKind::ElseIf {
                        cond: Box::new(cond),
                        body: Box::new(body),
                    },
                    self.finish(ei_start),
                ));
            } else if self.at_kw("else") {
                let else_start = self.start();
                self.advance();
                if self.at_kw("if") {
                    self.advance();
                    let cond = self.parse_paren_expr()?;
                    let body = self.parse_stmt()?;
                    elseifs.push(Node::new(
                        NodeKind::ElseIf {
                            cond: Box::new(cond),
                            body: Box::new(body),
                        },
                        self.finish(else_start),
                    ));
                } else {
                    let body = self.parse_stmt()?;
                    else_ = Some(Box::new(Node::new(
                        NodeKind::Else(Box::new(body)),
                        self.finish(else_start),
                    )));
                    break;
                }
            } else {
                break;
            }
        }
        Ok(Node::new(
            NodeKind::If {
                cond: Box::new(cond),
                then: Box::new(then),
                elseifs,
                else_,
            },
            self.finish(start),
        ))
    }

    fn parse_while(&mut self) -> Result<Node, ParseError> {
        let start = self.start();
        self.advance();
        let cond = self.parse_paren_expr()?;
        let body = self.parse_stmt()?;
        Ok(Node::new(
            NodeKind::While {
                cond: Box::new(cond),
                body: Box::new(body),
            },
            self.finish(start),
        ))
    }

    fn parse_do_while(&mut self) -> Result<Node, ParseError> {
        let start = self.start();
        self.advance();
        let body = self.parse_stmt()?;
        if !self.eat_kw("while") {
            return Err(self.err_here(ErrorKind::UnexpectedToken));
        }
        let cond = self.parse_paren_expr()?;
        self.expect_semi()?;
        Ok(Node::new(
            NodeKind::DoWhile {
                body: Box::new(body),
                cond: Box::new(cond),
            },
            self.finish(start),
        ))
    }

    fn parse_for(&mut self) -> Result<Node, ParseError> {
        let start = self.start();
        self.advance();
        self.expect_op(Op::LParen)?;
        let mut init = Vec::new();
        if !self.at_op(Op::Semi) {
            init.push(self.parse_expr()?);
            while self.eat_op(Op::Comma) {
                init.push(self.parse_expr()?);
            }
        }
        self.expect_op(Op::Semi)?;
        let mut cond = Vec::new();
        if !self.at_op(Op::Semi) {
            cond.push(self.parse_expr()?);
            while self.eat_op(Op::Comma) {
                cond.push(self.parse_expr()?);
            }
        }
        self.expect_op(Op::Semi)?;
        let mut step = Vec::new();
        if !self.at_op(Op::RParen) {
            step.push(self.parse_expr()?);
            while self.eat_op(Op::Comma) {
                step.push(self.parse_expr()?);
            }
        }
        self.expect_op(Op::RParen)?;
        let body = self.parse_stmt()?;
        Ok(Node::new(
            NodeKind::For {
                init,
                cond,
                step,
                body: Box::new(body),
            },
            self.finish(start),
        ))
    }

    fn parse_foreach(&mut self) -> Result<Node, ParseError> {
        let start = self.start();
        self.advance();
        self.expect_op(Op::LParen)?;
        let expr = self.parse_expr()?;
        if !self.eat_kw("as") {
            return Err(self.err_here(ErrorKind::UnexpectedToken));
        }
        let mut by_ref = self.eat_op(Op::Amp);
        let mut first = self.parse_expr()?;
        let mut key = None;
        if self.eat_op(Op::DoubleArrow) {
            key = Some(Box::new(first));
            by_ref = self.eat_op(Op::Amp);
            first = self.parse_expr()?;
        }
        self.expect_op(Op::RParen)?;
        let body = self.parse_stmt()?;
        Ok(Node::new(
            NodeKind::Foreach {
                expr: Box::new(expr),
                key,
                by_ref,
                value: Box::new(first),
                body: Box::new(body),
            },
            self.finish(start),
        ))
    }

    fn parse_switch(&mut self) -> Result<Node, ParseError> {
        let start = self.start();
        self.advance();
        let cond = self.parse_paren_expr()?;
        self.expect_op(Op::LBrace)?;
        let mut cases = Vec::new();
        while !self.at_op(Op::RBrace) {
            let case_start = self.start();
            if self.eat_kw("case") {
                let cond = self.parse_expr()?;
                if !self.eat_op(Op::Colon) {
                    self.expect_op(Op::Semi)?;
                }
                let body = self.parse_case_body()?;
                cases.push(Node::new(
                    NodeKind::Case {
                        cond: Box::new(cond),
                        body,
                    },
                    self.finish(case_start),
                ));
            } else if self.eat_kw("default") {
                if !self.eat_op(Op::Colon) {
                    self.expect_op(Op::Semi)?;
                }
                let body = self.parse_case_body()?;
                cases.push(Node::new(
                    NodeKind::DefaultCase(body),
                    self.finish(case_start),
                ));
            } else {
                return Err(self.err_here(ErrorKind::UnexpectedToken));
            }
        }
        self.advance();
        Ok(Node::new(
            NodeKind::Switch {
                cond: Box::new(cond),
                cases,
            },
            self.finish(start),
        ))
    }

    fn parse_case_body(&mut self) -> Result<Vec<Node>, ParseError> {
        let mut stmts = Vec::new();
        while !self.at_op(Op::RBrace) && !self.at_kw("case") && !self.at_kw("default") {
            if self.at_eof() {
                return Err(self.err_here(ErrorKind::UnexpectedEof));
            }
            stmts.push(self.parse_stmt()?);
        }
        Ok(stmts)
    }

    fn parse_try(&mut self) -> Result<Node, ParseError> {
        let start = self.start();
        self.advance();
        self.expect_op(Op::LBrace)?;
        let body = self.parse_stmts_until_rbrace()?;
        let mut catches = Vec::new();
        while self.at_kw("catch") {
            let catch_start = self.start();
            self.advance();
            self.expect_op(Op::LParen)?;
            let mut types = vec![self.parse_name()?];
            while self.eat_op(Op::Pipe) {
                types.push(self.parse_name()?);
            }
            let var = match self.peek() {
                Some(Token {
                    kind: TokenKind::Variable(name),
                    loc,
                }) => {
                    let node = Node::new(
                        NodeKind::Variable(VarName::Ident(name.clone())),
                        *loc,
                    );
                    self.advance();
                    Some(Box::new(node))
                }
                _ => None,
            };
            self.expect_op(Op::RParen)?;
            self.expect_op(Op::LBrace)?;
            let body = self.parse_stmts_until_rbrace()?;
            catches.push(Node::new(
                NodeKind::Catch { types, var, body },
                self.finish(catch_start),
            ));
        }
        let mut finally = None;
        if self.eat_kw("finally") {
            self.expect_op(Op::LBrace)?;
            finally = Some(self.parse_stmts_until_rbrace()?);
        }
        Ok(Node::new(
            NodeKind::Try {
                body,
                catches,
                finally,
            },
            self.finish(start),
        ))
    }

    fn parse_namespace(&mut self) -> Result<Node, ParseError> {
        let start = self.start();
        self.advance();
        let name = if self.peek().is_some_and(|t| matches!(t.kind, TokenKind::Ident(_))) {
            Some(Box::new(self.parse_name()?))
        } else {
            None
        };
        let body = if self.eat_op(Op::LBrace) {
            Some(self.parse_stmts_until_rbrace()?)
        } else {
            self.expect_semi()?;
            None
        };
        Ok(Node::new(
            NodeKind::NamespaceDecl { name, body },
            self.finish(start),
        ))
    }

    fn parse_use(&mut self) -> Result<Node, ParseError> {
        let start = self.start();
        self.advance();
        let kind = if self.at_kw("function")
            && self.peek_at(1).is_some_and(|t| !t.is_op(Op::LParen))
        {
            self.advance();
            UseKind::Function
        } else if self.at_kw("const") {
            self.advance();
            UseKind::Const
        } else {
            UseKind::Normal
        };
        let mut items = Vec::new();
        loop {
            let item_start = self.start();
            let name = self.parse_name()?;
            let alias = if self.eat_kw("as") {
                Some(self.expect_ident()?)
            } else {
                None
            };
            items.push(Node::new(
                NodeKind::UseItem {
                    name: Box::new(name),
                    alias,
                },
                self.finish(item_start),
            ));
            if !self.eat_op(Op::Comma) {
                break;
            }
        }
        self.expect_semi()?;
        Ok(Node::new(
            NodeKind::UseDecl { kind, items },
            self.finish(start),
        ))
    }

    fn parse_declare(&mut self) -> Result<Node, ParseError> {
        let start = self.start();
        self.advance();
        self.expect_op(Op::LParen)?;
        let mut directives = Vec::new();
        loop {
            let dir_start = self.start();
            let name = self.expect_ident()?;
            self.expect_op(Op::Assign)?;
            let value = self.parse_expr()?;
            directives.push(Node::new(
                NodeKind::DeclareDirective {
                    name,
                    value: Box::new(value),
                },
                self.finish(dir_start),
            ));
            if !self.eat_op(Op::Comma) {
                break;
            }
        }
        self.expect_op(Op::RParen)?;
        let body = if self.eat_op(Op::Semi) || self.at_eof() {
            None
        } else {
            Some(Box::new(self.parse_stmt()?))
        };
        Ok(Node::new(
            NodeKind::Declare { directives, body },
            self.finish(start),
        ))
    }

    fn parse_const_elems(&mut self) -> Result<Vec<Node>, ParseError> {
        let mut elems = Vec::new();
        loop {
            let start = self.start();
            let name = self.expect_ident()?;
            self.expect_op(Op::Assign)?;
            let value = self.parse_expr()?;
            elems.push(Node::new(
                NodeKind::ConstElem {
                    name,
                    value: Box::new(value),
                },
                self.finish(start),
            ));
            if !self.eat_op(Op::Comma) {
                break;
            }
        }
        Ok(elems)
    }

    fn parse_func_decl(&mut self) -> Result<Node, ParseError> {
        let start = self.start();
        self.advance(); // function
        let by_ref = self.eat_op(Op::Amp);
        let name = self.expect_ident()?;
        let func = self.parse_func_rest(Some(name), Vec::new(), false, by_ref, true)?;
        Ok(Node::new(NodeKind::Func(Box::new(func)), self.finish(start)))
    }

    /// Parameters, optional capture list, optional return type, body.
    fn parse_func_rest(
        &mut self,
        name: Option<String>,
        modifiers: Vec<String>,
        is_static: bool,
        by_ref: bool,
        require_body: bool,
    ) -> Result<FuncLit, ParseError> {
        let params = self.parse_params()?;
        let mut uses = Vec::new();
        if self.at_kw("use") && self.peek_at(1).is_some_and(|t| t.is_op(Op::LParen)) {
            self.advance();
            self.advance();
            loop {
                let use_start = self.start();
                let by_ref = self.eat_op(Op::Amp);
                match self.peek() {
                    Some(Token {
                        kind: TokenKind::Variable(var),
                        loc,
                    }) => {
                        let var = Node::new(
                            NodeKind::Variable(VarName::Ident(var.clone())),
                            *loc,
                        );
                        self.advance();
                        uses.push(Node::new(
                            NodeKind::ClosureUse {
                                by_ref,
                                var: Box::new(var),
                            },
                            self.finish(use_start),
                        ));
                    }
                    _ => return Err(self.err_here(ErrorKind::UnexpectedToken)),
                }
                if !self.eat_op(Op::Comma) {
                    break;
                }
            }
            self.expect_op(Op::RParen)?;
        }
        let ret = if self.eat_op(Op::Colon) {
            Some(Box::new(self.parse_type_hint()?))
        } else {
            None
        };
        let body = if self.at_op(Op::LBrace) {
            self.expect_op(Op::LBrace)?;
            Some(self.parse_stmts_until_rbrace()?)
        } else if require_body {
            return Err(self.err_here(ErrorKind::UnexpectedToken));
        } else {
            self.expect_semi()?;
            None
        };
        Ok(FuncLit {
            name,
            modifiers,
            is_static,
            by_ref,
            params,
            uses,
            ret,
            body,
        })
    }

    fn parse_params(&mut self) -> Result<Vec<Node>, ParseError> {
        self.expect_op(Op::LParen)?;
        let mut params = Vec::new();
        while !self.at_op(Op::RParen) {
            let start = self.start();
            let mut modifiers = Vec::new();
            while self
                .peek()
                .and_then(|t| t.ident())
                .is_some_and(|name| {
                    MEMBER_MODIFIERS.iter().any(|m| name.eq_ignore_ascii_case(m))
                })
            {
                modifiers.push(self.expect_ident()?.to_ascii_lowercase());
            }
            let ty = if self.peek().is_some_and(|t| {
                matches!(t.kind, TokenKind::Ident(_)) || t.is_op(Op::Question) || t.is_op(Op::Backslash)
            }) {
                Some(Box::new(self.parse_type_hint()?))
            } else {
                None
            };
            let by_ref = self.eat_op(Op::Amp);
            let variadic = self.eat_op(Op::Ellipsis);
            let var = match self.peek() {
                Some(Token {
                    kind: TokenKind::Variable(name),
                    loc,
                }) => {
                    let node = Node::new(
                        NodeKind::Variable(VarName::Ident(name.clone())),
                        *loc,
                    );
                    self.advance();
                    node
                }
                _ => return Err(self.err_here(ErrorKind::UnexpectedToken)),
            };
            let default = if self.eat_op(Op::Assign) {
                Some(Box::new(self.parse_assign()?))
            } else {
                None
            };
            params.push(Node::new(
                NodeKind::Param {
                    var: Box::new(var),
                    by_ref,
                    variadic,
                    ty,
                    default,
                    modifiers,
                },
                self.finish(start),
            ));
            if !self.eat_op(Op::Comma) {
                break;
            }
        }
        self.expect_op(Op::RParen)?;
        Ok(params)
    }

    fn parse_type_hint(&mut self) -> Result<Node, ParseError> {
        let start = self.start();
        let nullable = self.eat_op(Op::Question);
        let mut names = vec![self.parse_name()?];
        while self.eat_op(Op::Pipe) {
            names.push(self.parse_name()?);
        }
        Ok(Node::new(
            NodeKind::TypeHint { nullable, names },
            self.finish(start),
        ))
    }

    fn parse_class(
        &mut self,
        start: Position,
        is_abstract: bool,
        is_final: bool,
    ) -> Result<Node, ParseError> {
        let kind = if self.eat_kw("class") {
            ClassKind::Class
        } else if self.eat_kw("interface") {
            ClassKind::Interface
        } else if self.eat_kw("trait") {
            ClassKind::Trait
        } else {
            return Err(self.err_here(ErrorKind::UnexpectedToken));
        };
        let name = self.expect_ident()?;
        let mut extends = Vec::new();
        if self.eat_kw("extends") {
            extends.push(self.parse_name()?);
            while self.eat_op(Op::Comma) {
                extends.push(self.parse_name()?);
            }
        }
        let mut implements = Vec::new();
        if self.eat_kw("implements") {
            implements.push(self.parse_name()?);
            while self.eat_op(Op::Comma) {
                implements.push(self.parse_name()?);
            }
        }
        self.expect_op(Op::LBrace)?;
        let mut members = Vec::new();
        while !self.at_op(Op::RBrace) {
            if self.at_eof() {
                return Err(self.err_here(ErrorKind::UnexpectedEof));
            }
            members.push(self.parse_class_member()?);
        }
        self.advance();
        Ok(Node::new(
            NodeKind::ClassDecl(Box::new(ClassLit {
                kind,
                name,
                is_abstract,
                is_final,
                extends,
                implements,
                members,
            })),
            self.finish(start),
        ))
    }

    fn parse_class_member(&mut self) -> Result<Node, ParseError> {
        let start = self.start();
        if self.at_kw("use") {
            self.advance();
            let mut names = vec![self.parse_name()?];
            while self.eat_op(Op::Comma) {
                names.push(self.parse_name()?);
            }
            self.expect_semi()?;
            return Ok(Node::new(NodeKind::TraitUse(names), self.finish(start)));
        }
        let mut modifiers = Vec::new();
        while self
            .peek()
            .and_then(|t| t.ident())
            .is_some_and(|name| MEMBER_MODIFIERS.iter().any(|m| name.eq_ignore_ascii_case(m)))
        {
            modifiers.push(self.expect_ident()?.to_ascii_lowercase());
        }
        if self.eat_kw("const") {
            let elems = self.parse_const_elems()?;
            self.expect_semi()?;
            return Ok(Node::new(
                NodeKind::ClassConstDecl { modifiers, elems },
                self.finish(start),
            ));
        }
        if self.eat_kw("function") {
            let by_ref = self.eat_op(Op::Amp);
            let name = self.expect_ident()?;
            let is_static = modifiers.iter().any(|m| m == "static");
            let func = self.parse_func_rest(Some(name), modifiers, is_static, by_ref, false)?;
            return Ok(Node::new(NodeKind::Func(Box::new(func)), self.finish(start)));
        }
        // typed or untyped property
        let ty = if !self.peek().is_some_and(|t| matches!(t.kind, TokenKind::Variable(_))) {
            Some(Box::new(self.parse_type_hint()?))
        } else {
            None
        };
        let mut elems = Vec::new();
        loop {
            let elem_start = self.start();
            let name = match self.peek() {
                Some(Token {
                    kind: TokenKind::Variable(name),
                    ..
                }) => {
                    let name = name.clone();
                    self.advance();
                    name
                }
                _ => return Err(self.err_here(ErrorKind::UnexpectedToken)),
            };
            let default = if self.eat_op(Op::Assign) {
                Some(Box::new(self.parse_expr()?))
            } else {
                None
            };
            elems.push(Node::new(
                NodeKind::PropertyElem { name, default },
                self.finish(elem_start),
            ));
            if !self.eat_op(Op::Comma) {
                break;
            }
        }
        self.expect_semi()?;
        Ok(Node::new(
            NodeKind::Property {
                modifiers,
                ty,
                elems,
            },
            self.finish(start),
        ))
    }
}

// expressions
impl Parser {
    pub(crate) fn parse_expr(&mut self) -> Result<Node, ParseError> {
        self.parse_or_kw()
    }

    fn parse_or_kw(&mut self) -> Result<Node, ParseError> {
        let start = self.start();
        let mut left = self.parse_xor_kw()?;
        while self.eat_kw("or") {
            let right = self.parse_xor_kw()?;
            left = self.binary(BinaryOp::LogicalOr, left, right, start);
        }
        Ok(left)
    }
    fn parse_xor_kw(&mut self) -> Result<Node, ParseError> {
        let start = self.start();
        let mut left = self.parse_and_kw()?;
        while self.eat_kw("xor") {
            let right = self.parse_and_kw()?;
            left = self.binary(BinaryOp::LogicalXor, left, right, start);
        }
        Ok(left)
    }
    fn parse_and_kw(&mut self) -> Result<Node, ParseError> {
        let start = self.start();
        let mut left = self.parse_assign()?;
        while self.eat_kw("and") {
            let right = self.parse_assign()?;
            left = self.binary(BinaryOp::LogicalAnd, left, right, start);
        }
        Ok(left)
    }

    fn parse_assign(&mut self) -> Result<Node, ParseError> {
        let start = self.start();
        let left = self.parse_ternary()?;
        let op = match self.peek() {
            Some(t) => match t.kind {
                TokenKind::Op(Op::Assign) => Some(AssignOp::Plain),
                TokenKind::Op(Op::PlusAssign) => Some(AssignOp::Plus),
                TokenKind::Op(Op::MinusAssign) => Some(AssignOp::Minus),
                TokenKind::Op(Op::MulAssign) => Some(AssignOp::Mul),
                TokenKind::Op(Op::DivAssign) => Some(AssignOp::Div),
                TokenKind::Op(Op::ModAssign) => Some(AssignOp::Mod),
                TokenKind::Op(Op::PowAssign) => Some(AssignOp::Pow),
                TokenKind::Op(Op::ConcatAssign) => Some(AssignOp::Concat),
                TokenKind::Op(Op::AndAssign) => Some(AssignOp::BitAnd),
                TokenKind::Op(Op::OrAssign) => Some(AssignOp::BitOr),
                TokenKind::Op(Op::XorAssign) => Some(AssignOp::BitXor),
                TokenKind::Op(Op::ShlAssign) => Some(AssignOp::Shl),
                TokenKind::Op(Op::ShrAssign) => Some(AssignOp::Shr),
                TokenKind::Op(Op::CoalesceAssign) => Some(AssignOp::Coalesce),
                _ => None,
            },
            None => None,
        };
        let Some(mut op) = op else {
            return Ok(left);
        };
        self.advance();
        if op == AssignOp::Plain && self.eat_op(Op::Amp) {
            op = AssignOp::Ref;
        }
        let right = self.parse_assign()?;
        Ok(Node::new(
            NodeKind::Assign {
                op,
                var: Box::new(left),
                expr: Box::new(right),
            },
            self.finish(start),
        ))
    }

    fn parse_ternary(&mut self) -> Result<Node, ParseError> {
        let start = self.start();
        let cond = self.parse_coalesce()?;
        if !self.eat_op(Op::Question) {
            return Ok(cond);
        }
        let then = if self.eat_op(Op::Colon) {
            None
        } else {
            let t = self.parse_assign()?;
            self.expect_op(Op::Colon)?;
            Some(Box::new(t))
        };
        let else_ = self.parse_ternary()?;
        Ok(Node::new(
            NodeKind::Ternary {
                cond: Box::new(cond),
                then,
                else_: Box::new(else_),
            },
            self.finish(start),
        ))
    }

    fn parse_coalesce(&mut self) -> Result<Node, ParseError> {
        let start = self.start();
        let left = self.parse_bool_or()?;
        if self.eat_op(Op::Coalesce) {
            let right = self.parse_coalesce()?;
            return Ok(self.binary(BinaryOp::Coalesce, left, right, start));
        }
        Ok(left)
    }

    fn parse_bool_or(&mut self) -> Result<Node, ParseError> {
        let start = self.start();
        let mut left = self.parse_bool_and()?;
        while self.eat_op(Op::BoolOr) {
            let right = self.parse_bool_and()?;
            left = self.binary(BinaryOp::BoolOr, left, right, start);
        }
        Ok(left)
    }
    fn parse_bool_and(&mut self) -> Result<Node, ParseError> {
        let start = self.start();
        let mut left = self.parse_bit_or()?;
        while self.eat_op(Op::BoolAnd) {
            let right = self.parse_bit_or()?;
            left = self.binary(BinaryOp::BoolAnd, left, right, start);
        }
        Ok(left)
    }
    fn parse_bit_or(&mut self) -> Result<Node, ParseError> {
        let start = self.start();
        let mut left = self.parse_bit_xor()?;
        while self.eat_op(Op::Pipe) {
            let right = self.parse_bit_xor()?;
            left = self.binary(BinaryOp::BitOr, left, right, start);
        }
        Ok(left)
    }
    fn parse_bit_xor(&mut self) -> Result<Node, ParseError> {
        let start = self.start();
        let mut left = self.parse_bit_and()?;
        while self.eat_op(Op::Caret) {
            let right = self.parse_bit_and()?;
            left = self.binary(BinaryOp::BitXor, left, right, start);
        }
        Ok(left)
    }
    fn parse_bit_and(&mut self) -> Result<Node, ParseError> {
        let start = self.start();
        let mut left = self.parse_equality()?;
        while self.at_op(Op::Amp) && !self.peek_at(1).is_some_and(|t| t.is_op(Op::Amp)) {
            self.advance();
            let right = self.parse_equality()?;
            left = self.binary(BinaryOp::BitAnd, left, right, start);
        }
        Ok(left)
    }
    fn parse_equality(&mut self) -> Result<Node, ParseError> {
        let start = self.start();
        let mut left = self.parse_relational()?;
        loop {
            let op = if self.eat_op(Op::Equal) {
                BinaryOp::Equal
            } else if self.eat_op(Op::NotEqual) {
                BinaryOp::NotEqual
            } else if self.eat_op(Op::Identical) {
                BinaryOp::Identical
            } else if self.eat_op(Op::NotIdentical) {
                BinaryOp::NotIdentical
            } else {
                break;
            };
            let right = self.parse_relational()?;
            left = self.binary(op, left, right, start);
        }
        Ok(left)
    }
    fn parse_relational(&mut self) -> Result<Node, ParseError> {
        let start = self.start();
        let mut left = self.parse_shift()?;
        loop {
            let op = if self.eat_op(Op::Spaceship) {
                BinaryOp::Spaceship
            } else if self.eat_op(Op::Smaller) {
                BinaryOp::Smaller
            } else if self.eat_op(Op::SmallerOrEqual) {
                BinaryOp::SmallerOrEqual
            } else if self.eat_op(Op::Greater) {
                BinaryOp::Greater
            } else if self.eat_op(Op::GreaterOrEqual) {
                BinaryOp::GreaterOrEqual
            } else {
                break;
            };
            let right = self.parse_shift()?;
            left = self.binary(op, left, right, start);
        }
        Ok(left)
    }
    fn parse_shift(&mut self) -> Result<Node, ParseError> {
        let start = self.start();
        let mut left = self.parse_additive()?;
        loop {
            let op = if self.eat_op(Op::Shl) {
                BinaryOp::Shl
            } else if self.eat_op(Op::Shr) {
                BinaryOp::Shr
            } else {
                break;
            };
            let right = self.parse_additive()?;
            left = self.binary(op, left, right, start);
        }
        Ok(left)
    }
    fn parse_additive(&mut self) -> Result<Node, ParseError> {
        let start = self.start();
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = if self.eat_op(Op::Plus) {
                BinaryOp::Plus
            } else if self.eat_op(Op::Minus) {
                BinaryOp::Minus
            } else if self.eat_op(Op::Dot) {
                BinaryOp::Concat
            } else {
                break;
            };
            let right = self.parse_multiplicative()?;
            left = self.binary(op, left, right, start);
        }
        Ok(left)
    }
    fn parse_multiplicative(&mut self) -> Result<Node, ParseError> {
        let start = self.start();
        let mut left = self.parse_instanceof()?;
        loop {
            let op = if self.eat_op(Op::Star) {
                BinaryOp::Mul
            } else if self.eat_op(Op::Slash) {
                BinaryOp::Div
            } else if self.eat_op(Op::Percent) {
                BinaryOp::Mod
            } else {
                break;
            };
            let right = self.parse_instanceof()?;
            left = self.binary(op, left, right, start);
        }
        Ok(left)
    }
    fn parse_instanceof(&mut self) -> Result<Node, ParseError> {
        let start = self.start();
        let mut left = self.parse_unary()?;
        while self.eat_kw("instanceof") {
            let right = self.parse_unary()?;
            left = self.binary(BinaryOp::Instanceof, left, right, start);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Node, ParseError> {
        let start = self.start();
        let unary = |p: &mut Self, op: UnaryOp| -> Result<Node, ParseError> {
            let expr = p.parse_unary()?;
            Ok(Node::new(
                NodeKind::Unary {
                    op,
                    expr: Box::new(expr),
                },
                p.finish(start),
            ))
        };
        if self.eat_op(Op::Not) {
            return unary(self, UnaryOp::Not);
        }
        if self.eat_op(Op::Tilde) {
            return unary(self, UnaryOp::BitNot);
        }
        if self.eat_op(Op::At) {
            return unary(self, UnaryOp::Suppress);
        }
        if self.eat_op(Op::Plus) {
            return unary(self, UnaryOp::Plus);
        }
        if self.eat_op(Op::Minus) {
            return unary(self, UnaryOp::Minus);
        }
        if self.eat_op(Op::Inc) {
            let var = self.parse_unary()?;
            return Ok(Node::new(
                NodeKind::IncDec {
                    inc: true,
                    prefix: true,
                    var: Box::new(var),
                },
                self.finish(start),
            ));
        }
        if self.eat_op(Op::Dec) {
            let var = self.parse_unary()?;
            return Ok(Node::new(
                NodeKind::IncDec {
                    inc: false,
                    prefix: true,
                    var: Box::new(var),
                },
                self.finish(start),
            ));
        }
        if let Some(kind) = self.peek_cast() {
            self.advance();
            self.advance();
            self.advance();
            let expr = self.parse_unary()?;
            return Ok(Node::new(
                NodeKind::Cast {
                    kind,
                    expr: Box::new(expr),
                },
                self.finish(start),
            ));
        }
        if self.eat_kw("print") {
            let expr = self.parse_assign()?;
            return Ok(Node::new(
                NodeKind::Print(Box::new(expr)),
                self.finish(start),
            ));
        }
        if self.eat_kw("clone") {
            let expr = self.parse_unary()?;
            return Ok(Node::new(
                NodeKind::Clone(Box::new(expr)),
                self.finish(start),
            ));
        }
        if self.at_kw("new") {
            return self.parse_new();
        }
        let include = if self.eat_kw("include") {
            Some(IncludeKind::Include)
        } else if self.eat_kw("include_once") {
            Some(IncludeKind::IncludeOnce)
        } else if self.eat_kw("require") {
            Some(IncludeKind::Require)
        } else if self.eat_kw("require_once") {
            Some(IncludeKind::RequireOnce)
        } else {
            None
        };
        if let Some(kind) = include {
            let expr = self.parse_assign()?;
            return Ok(Node::new(
                NodeKind::Include {
                    kind,
                    expr: Box::new(expr),
                },
                self.finish(start),
            ));
        }
        self.parse_pow()
    }

    /// `(cast)` needs two tokens of lookahead to disambiguate from a
    /// parenthesised expression.
    fn peek_cast(&self) -> Option<CastKind> {
        if !self.at_op(Op::LParen) {
            return None;
        }
        let name = self.peek_at(1)?.ident()?;
        if !self.peek_at(2)?.is_op(Op::RParen) {
            return None;
        }
        CASTS
            .iter()
            .find(|(text, _)| name.eq_ignore_ascii_case(text))
            .map(|(_, kind)| *kind)
    }

    fn parse_pow(&mut self) -> Result<Node, ParseError> {
        let start = self.start();
        let base = self.parse_postfix()?;
        if self.eat_op(Op::Pow) {
            let exp = self.parse_unary()?;
            return Ok(self.binary(BinaryOp::Pow, base, exp, start));
        }
        Ok(base)
    }

    fn parse_new(&mut self) -> Result<Node, ParseError> {
        let start = self.start();
        self.advance(); // new
        let class = match self.peek() {
            Some(Token {
                kind: TokenKind::Variable(_) | TokenKind::Dollar,
                ..
            }) => self.parse_variable()?,
            _ => self.parse_name()?,
        };
        let args = if self.at_op(Op::LParen) {
            Some(self.parse_args()?)
        } else {
            None
        };
        Ok(Node::new(
            NodeKind::New {
                class: Box::new(class),
                args,
            },
            self.finish(start),
        ))
    }

    fn parse_postfix(&mut self) -> Result<Node, ParseError> {
        let start = self.start();
        let mut node = self.parse_primary()?;
        loop {
            if self.eat_op(Op::LBracket) {
                let dim = if self.at_op(Op::RBracket) {
                    None
                } else {
                    Some(Box::new(self.parse_expr()?))
                };
                self.expect_op(Op::RBracket)?;
                node = Node::new(
                    NodeKind::Index {
                        var: Box::new(node),
                        dim,
                    },
                    self.finish(start),
                );
                continue;
            }
            if self.eat_op(Op::Arrow) {
                let member = self.parse_member_name()?;
                if self.at_op(Op::LParen) {
                    let args = self.parse_args()?;
                    node = Node::new(
                        NodeKind::MethodCall {
                            target: Box::new(node),
                            method: Box::new(member),
                            args,
                        },
                        self.finish(start),
                    );
                } else {
                    node = Node::new(
                        NodeKind::Prop {
                            target: Box::new(node),
                            name: Box::new(member),
                        },
                        self.finish(start),
                    );
                }
                continue;
            }
            if self.eat_op(Op::DoubleColon) {
                match self.peek() {
                    Some(Token {
                        kind: TokenKind::Variable(_) | TokenKind::Dollar,
                        ..
                    }) => {
                        let prop = self.parse_variable()?;
                        node = Node::new(
                            NodeKind::StaticProp {
                                class: Box::new(node),
                                prop: Box::new(prop),
                            },
                            self.finish(start),
                        );
                    }
                    Some(Token {
                        kind: TokenKind::Ident(_),
                        ..
                    }) => {
                        let name = self.expect_ident()?;
                        let name_loc = self.finish(self.tokens[self.pos - 1].loc.start);
                        let member = Node::new(NodeKind::Ident(name), name_loc);
                        if self.at_op(Op::LParen) {
                            let args = self.parse_args()?;
                            node = Node::new(
                                NodeKind::StaticCall {
                                    class: Box::new(node),
                                    method: Box::new(member),
                                    args,
                                },
                                self.finish(start),
                            );
                        } else {
                            node = Node::new(
                                NodeKind::ClassConst {
                                    class: Box::new(node),
                                    name: Box::new(member),
                                },
                                self.finish(start),
                            );
                        }
                    }
                    _ => return Err(self.err_here(ErrorKind::UnexpectedToken)),
                }
                continue;
            }
            if self.at_op(Op::LParen) {
                let args = self.parse_args()?;
                node = Node::new(
                    NodeKind::Call {
                        callee: Box::new(node),
                        args,
                    },
                    self.finish(start),
                );
                continue;
            }
            if self.eat_op(Op::Inc) {
                node = Node::new(
                    NodeKind::IncDec {
                        inc: true,
                        prefix: false,
                        var: Box::new(node),
                    },
                    self.finish(start),
                );
                continue;
            }
            if self.eat_op(Op::Dec) {
                node = Node::new(
                    NodeKind::IncDec {
                        inc: false,
                        prefix: false,
                        var: Box::new(node),
                    },
                    self.finish(start),
                );
                continue;
            }
            break;
        }
        // a bare name used as a value is a constant reference
        if matches!(node.kind, NodeKind::Name { .. }) {
            let loc = node.loc;
            node = Node::new(NodeKind::ConstFetch(Box::new(node)), loc);
        }
        Ok(node)
    }

    fn parse_member_name(&mut self) -> Result<Node, ParseError> {
        match self.peek() {
            Some(Token {
                kind: TokenKind::Ident(name),
                loc,
            }) => {
                let node = Node::new(NodeKind::Ident(name.clone()), *loc);
                self.advance();
                Ok(node)
            }
            Some(Token {
                kind: TokenKind::Variable(_) | TokenKind::Dollar,
                ..
            }) => self.parse_variable(),
            Some(Token {
                kind: TokenKind::Op(Op::LBrace),
                ..
            }) => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect_op(Op::RBrace)?;
                Ok(expr)
            }
            _ => Err(self.err_here(ErrorKind::UnexpectedToken)),
        }
    }

    fn parse_variable(&mut self) -> Result<Node, ParseError> {
        let start = self.start();
        match self.peek() {
            Some(Token {
                kind: TokenKind::Variable(name),
                ..
            }) => {
                let name = name.clone();
                self.advance();
                Ok(Node::new(
                    NodeKind::Variable(VarName::Ident(name)),
                    self.finish(start),
                ))
            }
            Some(Token {
                kind: TokenKind::Dollar,
                ..
            }) => {
                self.advance();
                if self.eat_op(Op::LBrace) {
                    let expr = self.parse_expr()?;
                    self.expect_op(Op::RBrace)?;
                    Ok(Node::new(
                        NodeKind::Variable(VarName::Expr(Box::new(expr))),
                        self.finish(start),
                    ))
                } else {
                    let inner = self.parse_variable()?;
                    Ok(Node::new(
                        NodeKind::Variable(VarName::Expr(Box::new(inner))),
                        self.finish(start),
                    ))
                }
            }
            _ => Err(self.err_here(ErrorKind::UnexpectedToken)),
        }
    }

    fn parse_name(&mut self) -> Result<Node, ParseError> {
        let start = self.start();
        let fully_qualified = self.eat_op(Op::Backslash);
        let mut parts = vec![self.expect_ident()?];
        while self.at_op(Op::Backslash)
            && self
                .peek_at(1)
                .is_some_and(|t| matches!(t.kind, TokenKind::Ident(_)))
        {
            self.advance();
            parts.push(self.expect_ident()?);
        }
        Ok(Node::new(
            NodeKind::Name {
                parts,
                fully_qualified,
            },
            self.finish(start),
        ))
    }

    fn parse_args(&mut self) -> Result<Vec<Node>, ParseError> {
        self.expect_op(Op::LParen)?;
        let mut args = Vec::new();
        while !self.at_op(Op::RParen) {
            let start = self.start();
            let by_ref = self.eat_op(Op::Amp);
            let variadic = self.eat_op(Op::Ellipsis);
            let value = self.parse_expr()?;
            args.push(Node::new(
                NodeKind::Arg {
                    by_ref,
                    variadic,
                    value: Box::new(value),
                },
                self.finish(start),
            ));
            if !self.eat_op(Op::Comma) {
                break;
            }
        }
        self.expect_op(Op::RParen)?;
        Ok(args)
    }

    fn parse_expr_list(&mut self, close: Op) -> Result<Vec<Node>, ParseError> {
        let mut exprs = Vec::new();
        while !self.at_op(close) {
            exprs.push(self.parse_expr()?);
            if !self.eat_op(Op::Comma) {
                break;
            }
        }
        self.expect_op(close)?;
        Ok(exprs)
    }

    /// Items of `array(...)`, `[...]` and `list(...)`. Holes are kept as
    /// empty items so destructuring like `list($a, , $b)` keeps its arity.
    fn parse_array_items(&mut self, close: Op) -> Result<Vec<Node>, ParseError> {
        let mut items = Vec::new();
        loop {
            if self.at_op(close) {
                break;
            }
            let start = self.start();
            if self.at_op(Op::Comma) {
                items.push(Node::new(
                    NodeKind::ArrayItem {
                        key: None,
                        by_ref: false,
                        spread: false,
                        value: None,
                    },
                    self.finish(start),
                ));
                self.advance();
                continue;
            }
            let spread = self.eat_op(Op::Ellipsis);
            let by_ref = self.eat_op(Op::Amp);
            let first = self.parse_assign()?;
            let item = if self.eat_op(Op::DoubleArrow) {
                let value_by_ref = self.eat_op(Op::Amp);
                let value = self.parse_assign()?;
                NodeKind::ArrayItem {
                    key: Some(Box::new(first)),
                    by_ref: value_by_ref,
                    spread,
                    value: Some(Box::new(value)),
                }
            } else {
                NodeKind::ArrayItem {
                    key: None,
                    by_ref,
                    spread,
                    value: Some(Box::new(first)),
                }
            };
            items.push(Node::new(item, self.finish(start)));
            if !self.eat_op(Op::Comma) {
                break;
            }
        }
        self.expect_op(close)?;
        Ok(items)
    }

    fn parse_primary(&mut self) -> Result<Node, ParseError> {
        let start = self.start();
        let Some(token) = self.peek() else {
            return Err(self.err_here(ErrorKind::UnexpectedEof));
        };
        match &token.kind {
            TokenKind::Int(value) => {
                let value = value.clone();
                self.advance();
                Ok(Node::new(NodeKind::Int(value), self.finish(start)))
            }
            TokenKind::Float(value) => {
                let value = value.clone();
                self.advance();
                Ok(Node::new(NodeKind::Float(value), self.finish(start)))
            }
            TokenKind::Str { value, double } => {
                let kind = if *double {
                    StrKind::Double
                } else {
                    StrKind::Single
                };
                let value = value.clone();
                self.advance();
                Ok(Node::new(
                    NodeKind::Str { value, kind },
                    self.finish(start),
                ))
            }
            TokenKind::InterpStr { parts, raw } => {
                let raw = raw.clone();
                let parts = parts.clone();
                let loc = token.loc;
                self.advance();
                let parts = parts
                    .into_iter()
                    .map(|p| match p {
                        StrPart::Lit(text) => Node::new(NodeKind::EncapsedPart(text), loc),
                        StrPart::Var(name) => {
                            Node::new(NodeKind::Variable(VarName::Ident(name)), loc)
                        }
                    })
                    .collect();
                Ok(Node::new(
                    NodeKind::Encapsed { parts, raw },
                    self.finish(start),
                ))
            }
            TokenKind::Variable(_) | TokenKind::Dollar => self.parse_variable(),
            TokenKind::Op(Op::LParen) => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect_op(Op::RParen)?;
                Ok(Node::new(
                    NodeKind::Paren(Box::new(expr)),
                    self.finish(start),
                ))
            }
            TokenKind::Op(Op::LBracket) => {
                self.advance();
                let items = self.parse_array_items(Op::RBracket)?;
                Ok(Node::new(
                    NodeKind::ArrayLit { items, short: true },
                    self.finish(start),
                ))
            }
            TokenKind::Op(Op::Backslash) => {
                let name = self.parse_name()?;
                Ok(name)
            }
            TokenKind::Ident(name) => {
                let name = name.clone();
                self.parse_ident_primary(start, name)
            }
            _ => Err(self.err_here(ErrorKind::UnexpectedToken)),
        }
    }

    fn parse_ident_primary(&mut self, start: Position, name: String) -> Result<Node, ParseError> {
        if MAGIC_CONSTS
            .iter()
            .any(|magic| name.eq_ignore_ascii_case(magic))
        {
            self.advance();
            return Ok(Node::new(
                NodeKind::MagicConst(name),
                self.finish(start),
            ));
        }
        let lower = name.to_ascii_lowercase();
        match lower.as_str() {
            "array" if self.peek_at(1).is_some_and(|t| t.is_op(Op::LParen)) => {
                self.advance();
                self.advance();
                let items = self.parse_array_items(Op::RParen)?;
                Ok(Node::new(
                    NodeKind::ArrayLit {
                        items,
                        short: false,
                    },
                    self.finish(start),
                ))
            }
            "list" if self.peek_at(1).is_some_and(|t| t.is_op(Op::LParen)) => {
                self.advance();
                self.advance();
                let items = self.parse_array_items(Op::RParen)?;
                Ok(Node::new(NodeKind::ListPat(items), self.finish(start)))
            }
            "isset" => {
                self.advance();
                self.expect_op(Op::LParen)?;
                let vars = self.parse_expr_list(Op::RParen)?;
                Ok(Node::new(NodeKind::Isset(vars), self.finish(start)))
            }
            "empty" => {
                self.advance();
                let expr = self.parse_paren_expr()?;
                Ok(Node::new(
                    NodeKind::Empty(Box::new(expr)),
                    self.finish(start),
                ))
            }
            "eval" => {
                self.advance();
                let expr = self.parse_paren_expr()?;
                Ok(Node::new(
                    NodeKind::Eval(Box::new(expr)),
                    self.finish(start),
                ))
            }
            "exit" | "die" => {
                self.advance();
                let die = lower == "die";
                let expr = if self.eat_op(Op::LParen) {
                    if self.eat_op(Op::RParen) {
                        None
                    } else {
                        let e = self.parse_expr()?;
                        self.expect_op(Op::RParen)?;
                        Some(Box::new(e))
                    }
                } else {
                    None
                };
                Ok(Node::new(
                    NodeKind::Exit { die, expr },
                    self.finish(start),
                ))
            }
            "function" => {
                self.advance();
                let by_ref = self.eat_op(Op::Amp);
                let func = self.parse_func_rest(None, Vec::new(), false, by_ref, true)?;
                Ok(Node::new(NodeKind::Func(Box::new(func)), self.finish(start)))
            }
            "fn" => {
                self.advance();
                self.parse_arrow_func(start, false)
            }
            "static"
                if self
                    .peek_at(1)
                    .is_some_and(|t| t.is_kw("function") || t.is_kw("fn")) =>
            {
                self.advance();
                if self.eat_kw("function") {
                    let by_ref = self.eat_op(Op::Amp);
                    let func = self.parse_func_rest(None, Vec::new(), true, by_ref, true)?;
                    Ok(Node::new(NodeKind::Func(Box::new(func)), self.finish(start)))
                } else {
                    self.advance();
                    self.parse_arrow_func(start, true)
                }
            }
            _ => self.parse_name(),
        }
    }

    fn parse_arrow_func(&mut self, start: Position, is_static: bool) -> Result<Node, ParseError> {
        let by_ref = self.eat_op(Op::Amp);
        let params = self.parse_params()?;
        let ret = if self.eat_op(Op::Colon) {
            Some(Box::new(self.parse_type_hint()?))
        } else {
            None
        };
        self.expect_op(Op::DoubleArrow)?;
        let expr = self.parse_assign()?;
        Ok(Node::new(
            NodeKind::ArrowFunc {
                is_static,
                by_ref,
                params,
                ret,
                expr: Box::new(expr),
            },
            self.finish(start),
        ))
    }

    fn binary(&self, op: BinaryOp, left: Node, right: Node, start: Position) -> Node {
        Node::new(
            NodeKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            self.finish(start),
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn root_stmts(src: &str) -> Vec<Node> {
        match parse_source(src).unwrap().kind {
            NodeKind::Root(stmts) => stmts,
            other => panic!("expected root, got {other:?}"),
        }
    }

    fn first_expr(src: &str) -> Node {
        let stmts = root_stmts(src);
        match stmts.into_iter().next().unwrap().kind {
            NodeKind::ExprStmt(e) => *e,
            other => panic!("expected expression statement, got {other:?}"),
        }
    }

    #[test]
    fn test_precedence() {
        let expr = first_expr("<?php 1 + 2 * 3;");
        let NodeKind::Binary {
            op: BinaryOp::Plus,
            right,
            ..
        } = expr.kind
        else {
            panic!("expected + at the top: {:?}", expr.kind);
        };
        assert!(matches!(
            right.kind,
            NodeKind::Binary {
                op: BinaryOp::Mul,
                ..
            }
        ));
    }

    #[test]
    fn test_assignment_chain() {
        let expr = first_expr("<?php $a = $b = 1;");
        let NodeKind::Assign { expr: rhs, .. } = expr.kind else {
            panic!();
        };
        assert!(matches!(rhs.kind, NodeKind::Assign { .. }));
    }

    #[test]
    fn test_call_args() {
        let expr = first_expr("<?php f(1, &$x, ...$rest);");
        let NodeKind::Call { callee, args } = expr.kind else {
            panic!();
        };
        assert!(matches!(callee.kind, NodeKind::Name { .. }));
        assert_eq!(args.len(), 3);
        assert!(matches!(args[1].kind, NodeKind::Arg { by_ref: true, .. }));
        assert!(
            matches!(args[2].kind, NodeKind::Arg { variadic: true, .. })
        );
    }

    #[test]
    fn test_else_if_folds_into_elseif() {
        let a = root_stmts("<?php if ($a) {} else if ($b) {} else {}");
        let b = root_stmts("<?php if ($a) {} elseif ($b) {} else {}");
        let get = |stmts: &[Node]| match &stmts[0].kind {
            NodeKind::If { elseifs, else_, .. } => (elseifs.len(), else_.is_some()),
            other => panic!("{other:?}"),
        };
        assert_eq!(get(&a), (1, true));
        assert_eq!(get(&b), (1, true));
    }

    #[test]
    fn test_list_with_hole() {
        let expr = first_expr("<?php list($a, , $b) = f();");
        let NodeKind::Assign { var, .. } = expr.kind else {
            panic!();
        };
        let NodeKind::ListPat(items) = var.kind else {
            panic!();
        };
        assert_eq!(items.len(), 3);
        assert!(matches!(
            items[1].kind,
            NodeKind::ArrayItem { value: None, .. }
        ));
    }

    #[test]
    fn test_static_member_forms() {
        let expr = first_expr("<?php A::$prop;");
        assert!(matches!(expr.kind, NodeKind::StaticProp { .. }));
        let expr = first_expr("<?php A::CONST_NAME;");
        assert!(matches!(expr.kind, NodeKind::ClassConst { .. }));
        let expr = first_expr("<?php A::f(1);");
        assert!(matches!(expr.kind, NodeKind::StaticCall { .. }));
    }

    #[test]
    fn test_class_members() {
        let stmts = root_stmts(
            "<?php class A extends B { public $x = 1; const K = 2; public function f(int $a): ?int { return $a; } }",
        );
        let NodeKind::ClassDecl(class) = &stmts[0].kind else {
            panic!();
        };
        assert_eq!(class.members.len(), 3);
        assert!(matches!(class.members[0].kind, NodeKind::Property { .. }));
        assert!(matches!(
            class.members[1].kind,
            NodeKind::ClassConstDecl { .. }
        ));
        assert!(matches!(class.members[2].kind, NodeKind::Func(_)));
    }

    #[test]
    fn test_cast_vs_paren() {
        let expr = first_expr("<?php (int)$x;");
        assert!(matches!(
            expr.kind,
            NodeKind::Cast {
                kind: CastKind::Int,
                ..
            }
        ));
        let expr = first_expr("<?php ($x);");
        assert!(matches!(expr.kind, NodeKind::Paren(_)));
    }

    #[test]
    fn test_variable_variable() {
        let expr = first_expr("<?php $$x;");
        let NodeKind::Variable(VarName::Expr(inner)) = expr.kind else {
            panic!();
        };
        assert!(matches!(
            inner.kind,
            NodeKind::Variable(VarName::Ident(ref n)) if n == "x"
        ));
    }

    #[test]
    fn test_missing_terminator_is_error() {
        assert!(parse_source("<?php $x = 1 $y = 2;").is_err());
    }
}
