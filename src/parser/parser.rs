//! Recursive descent parser for the exercise language
#![allow(clippy::result_large_err)]

use crate::diagnostics::{error_codes, Diagnostic, Span};
use crate::parser::ast::*;
use crate::parser::lexer::{Token, TokenKind};
use std::mem::discriminant;

/// Parser over the token stream produced by the lexer
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    /// Create a new parser
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    /// Parse a complete program
    pub fn parse_program(&mut self) -> Result<Program, Diagnostic> {
        let start_span = self.current_span();
        let mut body = Vec::new();

        while !self.check(&TokenKind::Eof) {
            if self.check(&TokenKind::Newline) {
                self.advance();
                continue;
            }
            body.push(self.parse_stmt()?);
        }

        let end_span = self.current_span();
        Ok(Program {
            id: NodeId::new(),
            span: start_span.merge(&end_span),
            body,
        })
    }

    fn parse_stmt(&mut self) -> Result<Stmt, Diagnostic> {
        match &self.peek().kind {
            TokenKind::Def => self.parse_function_def(),
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::For => self.parse_for(),
            TokenKind::With => self.parse_with(),
            TokenKind::Return => self.parse_return(),
            TokenKind::Pass => {
                let span = self.advance().span;
                self.expect_newline()?;
                Ok(Stmt::Pass {
                    id: NodeId::new(),
                    span,
                })
            }
            _ => self.parse_assign_or_expr(),
        }
    }

    fn parse_function_def(&mut self) -> Result<Stmt, Diagnostic> {
        let start_span = self.expect(TokenKind::Def)?.span;
        let name = self.expect_ident()?;
        self.expect(TokenKind::LParen)?;

        let mut params = Vec::new();
        let mut seen_default = false;
        while !self.check(&TokenKind::RParen) {
            let param_span = self.current_span();
            let param_name = self.expect_ident()?;
            let default = if self.check(&TokenKind::Eq) {
                self.advance();
                seen_default = true;
                Some(self.parse_expr()?)
            } else {
                if seen_default {
                    return Err(self.error_at(
                        &param_span,
                        "parameter without default follows parameter with default",
                    ));
                }
                None
            };
            params.push(Param {
                id: NodeId::new(),
                span: param_span,
                name: param_name,
                default,
            });
            if self.check(&TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(TokenKind::RParen)?;

        let body = self.parse_block()?;
        let end_span = body.last().map(|s| s.span().clone()).unwrap_or_else(|| start_span.clone());
        Ok(Stmt::FunctionDef {
            id: NodeId::new(),
            span: start_span.merge(&end_span),
            name,
            params,
            body,
        })
    }

    fn parse_if(&mut self) -> Result<Stmt, Diagnostic> {
        let start_span = self.expect(TokenKind::If)?.span;
        let test = self.parse_expr()?;
        let body = self.parse_block()?;

        let orelse = if self.check(&TokenKind::Elif) {
            // desugar `elif` into a nested if in the else branch
            vec![self.parse_elif()?]
        } else if self.check(&TokenKind::Else) {
            self.advance();
            self.parse_block()?
        } else {
            Vec::new()
        };

        let end_span = orelse
            .last()
            .or(body.last())
            .map(|s| s.span().clone())
            .unwrap_or_else(|| start_span.clone());
        Ok(Stmt::If {
            id: NodeId::new(),
            span: start_span.merge(&end_span),
            test,
            body,
            orelse,
        })
    }

    fn parse_elif(&mut self) -> Result<Stmt, Diagnostic> {
        let start_span = self.expect(TokenKind::Elif)?.span;
        let test = self.parse_expr()?;
        let body = self.parse_block()?;

        let orelse = if self.check(&TokenKind::Elif) {
            vec![self.parse_elif()?]
        } else if self.check(&TokenKind::Else) {
            self.advance();
            self.parse_block()?
        } else {
            Vec::new()
        };

        let end_span = orelse
            .last()
            .or(body.last())
            .map(|s| s.span().clone())
            .unwrap_or_else(|| start_span.clone());
        Ok(Stmt::If {
            id: NodeId::new(),
            span: start_span.merge(&end_span),
            test,
            body,
            orelse,
        })
    }

    fn parse_while(&mut self) -> Result<Stmt, Diagnostic> {
        let start_span = self.expect(TokenKind::While)?.span;
        let test = self.parse_expr()?;
        let body = self.parse_block()?;
        let end_span = body.last().map(|s| s.span().clone()).unwrap_or_else(|| start_span.clone());
        Ok(Stmt::While {
            id: NodeId::new(),
            span: start_span.merge(&end_span),
            test,
            body,
        })
    }

    fn parse_for(&mut self) -> Result<Stmt, Diagnostic> {
        let start_span = self.expect(TokenKind::For)?.span;
        let target = self.expect_ident()?;
        self.expect(TokenKind::In)?;
        let iter = self.parse_expr()?;
        let body = self.parse_block()?;
        let end_span = body.last().map(|s| s.span().clone()).unwrap_or_else(|| start_span.clone());
        Ok(Stmt::For {
            id: NodeId::new(),
            span: start_span.merge(&end_span),
            target,
            iter,
            body,
        })
    }

    fn parse_with(&mut self) -> Result<Stmt, Diagnostic> {
        let start_span = self.expect(TokenKind::With)?.span;

        let mut items = Vec::new();
        loop {
            let item_span = self.current_span();
            let context_expr = self.parse_expr()?;
            let mut optional_vars = Vec::new();
            if self.check(&TokenKind::As) {
                self.advance();
                if self.check(&TokenKind::LParen) {
                    self.advance();
                    optional_vars.push(self.expect_ident()?);
                    while self.check(&TokenKind::Comma) {
                        self.advance();
                        optional_vars.push(self.expect_ident()?);
                    }
                    self.expect(TokenKind::RParen)?;
                } else {
                    optional_vars.push(self.expect_ident()?);
                }
            }
            items.push(WithItem {
                id: NodeId::new(),
                span: item_span,
                context_expr,
                optional_vars,
            });
            if self.check(&TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }

        let body = self.parse_block()?;
        let end_span = body.last().map(|s| s.span().clone()).unwrap_or_else(|| start_span.clone());
        Ok(Stmt::With {
            id: NodeId::new(),
            span: start_span.merge(&end_span),
            items,
            body,
        })
    }

    fn parse_return(&mut self) -> Result<Stmt, Diagnostic> {
        let start_span = self.expect(TokenKind::Return)?.span;
        let value = if self.check(&TokenKind::Newline) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.expect_newline()?;
        let end_span = value
            .as_ref()
            .map(|e| e.span().clone())
            .unwrap_or_else(|| start_span.clone());
        Ok(Stmt::Return {
            id: NodeId::new(),
            span: start_span.merge(&end_span),
            value,
        })
    }

    fn parse_assign_or_expr(&mut self) -> Result<Stmt, Diagnostic> {
        let start_span = self.current_span();
        let expr = self.parse_expr()?;

        if self.check(&TokenKind::Eq) {
            self.advance();
            let target = self.expr_to_target(expr)?;
            let value = self.parse_expr()?;
            self.expect_newline()?;
            let span = start_span.merge(value.span());
            return Ok(Stmt::Assign {
                id: NodeId::new(),
                span,
                target,
                value,
            });
        }

        self.expect_newline()?;
        let span = start_span.merge(expr.span());
        Ok(Stmt::Expr {
            id: NodeId::new(),
            span,
            expr,
        })
    }

    fn expr_to_target(&self, expr: Expr) -> Result<AssignTarget, Diagnostic> {
        match expr {
            Expr::Name { span, name, .. } => Ok(AssignTarget::Name { span, name }),
            Expr::Attribute {
                span, value, attr, ..
            } => Ok(AssignTarget::Attribute { span, value, attr }),
            Expr::Subscript {
                span, value, index, ..
            } => Ok(AssignTarget::Subscript { span, value, index }),
            other => Err(self.error_at(other.span(), "cannot assign to this expression")),
        }
    }

    /// Parse `: NEWLINE INDENT stmt+ DEDENT`
    fn parse_block(&mut self) -> Result<Vec<Stmt>, Diagnostic> {
        self.expect(TokenKind::Colon)?;
        self.expect(TokenKind::Newline)?;
        self.expect(TokenKind::Indent)?;

        let mut body = Vec::new();
        while !self.check(&TokenKind::Dedent) && !self.check(&TokenKind::Eof) {
            if self.check(&TokenKind::Newline) {
                self.advance();
                continue;
            }
            body.push(self.parse_stmt()?);
        }
        self.expect(TokenKind::Dedent)?;

        if body.is_empty() {
            return Err(self.error_unexpected("statement"));
        }
        Ok(body)
    }

    // Expressions ---------------------------------------------------------

    fn parse_expr(&mut self) -> Result<Expr, Diagnostic> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr, Diagnostic> {
        let mut left = self.parse_and()?;
        while self.check(&TokenKind::Or) {
            self.advance();
            let right = self.parse_and()?;
            let span = left.span().merge(right.span());
            left = Expr::Binary {
                id: NodeId::new(),
                span,
                op: BinaryOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, Diagnostic> {
        let mut left = self.parse_not()?;
        while self.check(&TokenKind::And) {
            self.advance();
            let right = self.parse_not()?;
            let span = left.span().merge(right.span());
            left = Expr::Binary {
                id: NodeId::new(),
                span,
                op: BinaryOp::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, Diagnostic> {
        if self.check(&TokenKind::Not) {
            let start_span = self.advance().span;
            let expr = self.parse_not()?;
            let span = start_span.merge(expr.span());
            return Ok(Expr::Unary {
                id: NodeId::new(),
                span,
                op: UnaryOp::Not,
                expr: Box::new(expr),
            });
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, Diagnostic> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match &self.peek().kind {
                TokenKind::EqEq => BinaryOp::Eq,
                TokenKind::BangEq => BinaryOp::Ne,
                TokenKind::Lt => BinaryOp::Lt,
                TokenKind::LtEq => BinaryOp::Le,
                TokenKind::Gt => BinaryOp::Gt,
                TokenKind::GtEq => BinaryOp::Ge,
                _ => break,
            };
            self.advance();
            let right = self.parse_additive()?;
            let span = left.span().merge(right.span());
            left = Expr::Binary {
                id: NodeId::new(),
                span,
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr, Diagnostic> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match &self.peek().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            let span = left.span().merge(right.span());
            left = Expr::Binary {
                id: NodeId::new(),
                span,
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, Diagnostic> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match &self.peek().kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            let span = left.span().merge(right.span());
            left = Expr::Binary {
                id: NodeId::new(),
                span,
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, Diagnostic> {
        if self.check(&TokenKind::Minus) {
            let start_span = self.advance().span;
            let expr = self.parse_unary()?;
            let span = start_span.merge(expr.span());
            return Ok(Expr::Unary {
                id: NodeId::new(),
                span,
                op: UnaryOp::Neg,
                expr: Box::new(expr),
            });
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr, Diagnostic> {
        let mut expr = self.parse_atom()?;
        loop {
            match &self.peek().kind {
                TokenKind::Dot => {
                    self.advance();
                    let attr = self.expect_ident()?;
                    let span = expr.span().merge(&self.prev_span());
                    expr = Expr::Attribute {
                        id: NodeId::new(),
                        span,
                        value: Box::new(expr),
                        attr,
                    };
                }
                TokenKind::LParen => {
                    self.advance();
                    let (args, kwargs) = self.parse_call_args()?;
                    let end = self.expect(TokenKind::RParen)?.span;
                    let span = expr.span().merge(&end);
                    expr = Expr::Call {
                        id: NodeId::new(),
                        span,
                        func: Box::new(expr),
                        args,
                        kwargs,
                    };
                }
                TokenKind::LBracket => {
                    self.advance();
                    let index = self.parse_expr()?;
                    let end = self.expect(TokenKind::RBracket)?.span;
                    let span = expr.span().merge(&end);
                    expr = Expr::Subscript {
                        id: NodeId::new(),
                        span,
                        value: Box::new(expr),
                        index: Box::new(index),
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_call_args(&mut self) -> Result<(Vec<Expr>, Vec<(String, Expr)>), Diagnostic> {
        let mut args = Vec::new();
        let mut kwargs = Vec::new();

        while !self.check(&TokenKind::RParen) {
            // `name = expr` is a keyword argument; needs two-token lookahead
            if let TokenKind::Ident(name) = &self.peek().kind {
                if matches!(self.peek_ahead(1).map(|t| &t.kind), Some(TokenKind::Eq)) {
                    let name = name.clone();
                    self.advance();
                    self.advance();
                    let value = self.parse_expr()?;
                    kwargs.push((name, value));
                    if self.check(&TokenKind::Comma) {
                        self.advance();
                    }
                    continue;
                }
            }

            if !kwargs.is_empty() {
                return Err(self.error_unexpected("keyword argument"));
            }
            args.push(self.parse_expr()?);
            if self.check(&TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }

        Ok((args, kwargs))
    }

    fn parse_atom(&mut self) -> Result<Expr, Diagnostic> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::IntLit(value) => {
                self.advance();
                Ok(Expr::IntLit {
                    id: NodeId::new(),
                    span: token.span,
                    value,
                })
            }
            TokenKind::FloatLit(value) => {
                self.advance();
                Ok(Expr::FloatLit {
                    id: NodeId::new(),
                    span: token.span,
                    value,
                })
            }
            TokenKind::StrLit(value) => {
                self.advance();
                Ok(Expr::StrLit {
                    id: NodeId::new(),
                    span: token.span,
                    value,
                })
            }
            TokenKind::True => {
                self.advance();
                Ok(Expr::BoolLit {
                    id: NodeId::new(),
                    span: token.span,
                    value: true,
                })
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::BoolLit {
                    id: NodeId::new(),
                    span: token.span,
                    value: false,
                })
            }
            TokenKind::None => {
                self.advance();
                Ok(Expr::NoneLit {
                    id: NodeId::new(),
                    span: token.span,
                })
            }
            TokenKind::Ident(name) => {
                self.advance();
                Ok(Expr::Name {
                    id: NodeId::new(),
                    span: token.span,
                    name,
                })
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                Ok(expr)
            }
            TokenKind::LBracket => {
                self.advance();
                let mut items = Vec::new();
                while !self.check(&TokenKind::RBracket) {
                    items.push(self.parse_expr()?);
                    if self.check(&TokenKind::Comma) {
                        self.advance();
                    } else {
                        break;
                    }
                }
                let end = self.expect(TokenKind::RBracket)?.span;
                Ok(Expr::ListLit {
                    id: NodeId::new(),
                    span: token.span.merge(&end),
                    items,
                })
            }
            TokenKind::LBrace => {
                self.advance();
                let mut entries = Vec::new();
                while !self.check(&TokenKind::RBrace) {
                    let key = self.parse_expr()?;
                    self.expect(TokenKind::Colon)?;
                    let value = self.parse_expr()?;
                    entries.push((key, value));
                    if self.check(&TokenKind::Comma) {
                        self.advance();
                    } else {
                        break;
                    }
                }
                let end = self.expect(TokenKind::RBrace)?.span;
                Ok(Expr::DictLit {
                    id: NodeId::new(),
                    span: token.span.merge(&end),
                    entries,
                })
            }
            _ => Err(self.error_unexpected("expression")),
        }
    }

    // Token plumbing ------------------------------------------------------

    fn peek(&self) -> &Token {
        self.tokens
            .get(self.pos)
            .unwrap_or_else(|| self.tokens.last().expect("token stream always ends in Eof"))
    }

    fn peek_ahead(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.pos + n)
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn check(&self, kind: &TokenKind) -> bool {
        discriminant(&self.peek().kind) == discriminant(kind)
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, Diagnostic> {
        if self.check(&kind) {
            Ok(self.advance())
        } else {
            Err(self.error_unexpected(&format!("{:?}", kind)))
        }
    }

    fn expect_newline(&mut self) -> Result<(), Diagnostic> {
        // Eof terminates the last statement just as well
        if self.check(&TokenKind::Eof) {
            return Ok(());
        }
        self.expect(TokenKind::Newline)?;
        Ok(())
    }

    fn expect_ident(&mut self) -> Result<String, Diagnostic> {
        match &self.peek().kind {
            TokenKind::Ident(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.error_unexpected("identifier")),
        }
    }

    fn current_span(&self) -> Span {
        self.peek().span.clone()
    }

    fn prev_span(&self) -> Span {
        self.tokens
            .get(self.pos.saturating_sub(1))
            .map(|t| t.span.clone())
            .unwrap_or_else(|| self.current_span())
    }

    fn error_unexpected(&self, expected: &str) -> Diagnostic {
        Diagnostic::error(error_codes::syntax::SYNTAX_ERROR)
            .message(format!(
                "expected {}, found {:?}",
                expected,
                self.peek().kind
            ))
            .span(self.current_span())
            .build()
    }

    fn error_at(&self, span: &Span, message: &str) -> Diagnostic {
        Diagnostic::error(error_codes::syntax::SYNTAX_ERROR)
            .message(message.to_string())
            .span(span.clone())
            .build()
    }
}

#[cfg(test)]
#[path = "parser_tests.rs"]
mod tests;
