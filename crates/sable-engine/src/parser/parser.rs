// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The main parser implementation.

use crate::ast::*;
use crate::diagnostics::Diagnostic;
use crate::lexer::{Scanner, Span, Token, TokenKind};

type ParseResult<T> = Result<T, Diagnostic>;

/// Binding power of infix operators, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    Assignment,
    Conditional,
    Equality,
    Comparison,
    Term,
    Factor,
    Unary,
    Postfix,
}

impl Precedence {
    fn next(self) -> Precedence {
        match self {
            Precedence::Assignment => Precedence::Conditional,
            Precedence::Conditional => Precedence::Equality,
            Precedence::Equality => Precedence::Comparison,
            Precedence::Comparison => Precedence::Term,
            Precedence::Term => Precedence::Factor,
            Precedence::Factor => Precedence::Unary,
            Precedence::Unary | Precedence::Postfix => Precedence::Postfix,
        }
    }

    fn of_infix(kind: &TokenKind) -> Option<Precedence> {
        let precedence = match kind {
            TokenKind::Equal => Precedence::Assignment,
            TokenKind::Question => Precedence::Conditional,
            TokenKind::EqualEqual | TokenKind::BangEqual => Precedence::Equality,
            TokenKind::Less
            | TokenKind::Greater
            | TokenKind::LessEqual
            | TokenKind::GreaterEqual => Precedence::Comparison,
            TokenKind::Plus | TokenKind::Minus => Precedence::Term,
            TokenKind::Star | TokenKind::Slash | TokenKind::Percent => Precedence::Factor,
            TokenKind::LeftParen | TokenKind::LeftBracket => Precedence::Postfix,
            _ => return None,
        };
        Some(precedence)
    }
}

/// A Pratt parser for Sable.
pub struct Parser<'a> {
    scanner: Scanner<'a>,
    current: Token,
    previous: Token,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Parser<'a> {
    /// Creates a new parser for the given source code.
    pub fn new(source: &'a str) -> Self {
        let mut parser = Self {
            scanner: Scanner::new(source),
            current: Token::new(TokenKind::Eof, Span::new(0, 0)),
            previous: Token::new(TokenKind::Eof, Span::new(0, 0)),
            diagnostics: Vec::new(),
        };
        parser.advance();
        parser
    }

    /// Parses the source code into a Program AST node.
    ///
    /// On failure every lexical and syntax error found is returned, lexical
    /// ones first. A program is only produced when both lists are empty.
    pub fn parse_program(&mut self) -> Result<Program, Vec<Diagnostic>> {
        let mut body = Vec::new();

        while !self.is_at_end() {
            if let Some(statement) = self.parse_declaration() {
                body.push(statement);
            }
        }

        let mut errors = self.scanner.take_diagnostics();
        errors.append(&mut self.diagnostics);
        if errors.is_empty() {
            Ok(Program { body })
        } else {
            Err(errors)
        }
    }

    /// Parses one statement, recovering from a syntax error by skipping to
    /// the next statement boundary.
    fn parse_declaration(&mut self) -> Option<Statement> {
        let start = self.current.span;
        match self.parse_statement() {
            Ok(statement) => Some(statement),
            Err(diagnostic) => {
                tracing::trace!(message = %diagnostic.message, "syntax error, resynchronizing");
                self.diagnostics.push(diagnostic);
                self.synchronize();
                if self.current.span == start && !self.is_at_end() {
                    self.advance();
                }
                None
            }
        }
    }

    /// Skips tokens until just after a `;` or just before a token that can
    /// only begin a statement.
    fn synchronize(&mut self) {
        while !self.is_at_end() {
            if self.previous.kind == TokenKind::Semicolon {
                return;
            }
            match self.current.kind {
                TokenKind::Const | TokenKind::Var | TokenKind::While | TokenKind::If => return,
                _ => self.advance(),
            }
        }
    }

    // ========================================================================
    // Statements
    // ========================================================================

    /// Parses a single statement.
    pub fn parse_statement(&mut self) -> Result<Statement, Diagnostic> {
        match &self.current.kind {
            TokenKind::Var | TokenKind::Const => self.parse_variable_declaration(),
            TokenKind::Function => self.parse_function_declaration(),
            TokenKind::If => self.parse_if_statement(),
            TokenKind::While => self.parse_while_statement(),
            TokenKind::Return => self.parse_return_statement(),
            TokenKind::Break => {
                self.advance();
                let span = self.previous.span;
                self.expect(&TokenKind::Semicolon)?;
                Ok(Statement::Break(span))
            }
            TokenKind::Continue => {
                self.advance();
                let span = self.previous.span;
                self.expect(&TokenKind::Semicolon)?;
                Ok(Statement::Continue(span))
            }
            TokenKind::LeftBrace => {
                self.advance();
                let body = self.parse_block_body()?;
                Ok(Statement::Block(BlockStatement { body }))
            }
            TokenKind::Semicolon => {
                self.advance();
                Ok(Statement::Empty)
            }
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_variable_declaration(&mut self) -> ParseResult<Statement> {
        let kind = match self.current.kind {
            TokenKind::Const => VariableKind::Const,
            _ => VariableKind::Var,
        };
        self.advance();

        let id = self.expect_identifier()?;
        let init = if self.check(&TokenKind::Equal) {
            self.advance();
            Some(self.parse_expression()?)
        } else {
            None
        };

        if kind == VariableKind::Const && init.is_none() {
            return Err(Diagnostic::parse(
                id.span,
                format!("Missing initializer in const declaration of \"{}\"", id.name),
            ));
        }

        self.expect(&TokenKind::Semicolon)?;

        Ok(Statement::VariableDeclaration(VariableDeclaration { kind, id, init }))
    }

    fn parse_function_declaration(&mut self) -> ParseResult<Statement> {
        self.advance(); // consume 'function'

        let id = self.expect_identifier()?;
        self.expect(&TokenKind::LeftParen)?;

        let mut params = Vec::new();
        if !self.check(&TokenKind::RightParen) {
            loop {
                params.push(self.expect_identifier()?);
                if !self.check(&TokenKind::Comma) {
                    break;
                }
                self.advance();
            }
        }

        self.expect(&TokenKind::RightParen)?;
        self.expect(&TokenKind::LeftBrace)?;

        let body = self.parse_block_body()?;

        Ok(Statement::FunctionDeclaration(FunctionDeclaration { id, params, body }))
    }

    /// Parses statements up to and including the closing `}`.
    fn parse_block_body(&mut self) -> ParseResult<Vec<Statement>> {
        let mut body = Vec::new();

        while !self.check(&TokenKind::RightBrace) && !self.is_at_end() {
            if let Some(statement) = self.parse_declaration() {
                body.push(statement);
            }
        }

        self.expect(&TokenKind::RightBrace)?;
        Ok(body)
    }

    fn parse_if_statement(&mut self) -> ParseResult<Statement> {
        self.advance(); // consume 'if'
        self.expect(&TokenKind::LeftParen)?;
        let test = self.parse_expression()?;
        self.expect(&TokenKind::RightParen)?;

        let consequent = Box::new(self.parse_statement()?);
        let alternate = if self.check(&TokenKind::Else) {
            self.advance();
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };

        Ok(Statement::If(IfStatement { test, consequent, alternate }))
    }

    fn parse_while_statement(&mut self) -> ParseResult<Statement> {
        self.advance(); // consume 'while'
        self.expect(&TokenKind::LeftParen)?;
        let test = self.parse_expression()?;
        self.expect(&TokenKind::RightParen)?;
        let body = Box::new(self.parse_statement()?);
        Ok(Statement::While(WhileStatement { test, body }))
    }

    fn parse_return_statement(&mut self) -> ParseResult<Statement> {
        self.advance(); // consume 'return'
        let start = self.previous.span;

        let argument = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };

        self.expect(&TokenKind::Semicolon)?;
        Ok(Statement::Return(ReturnStatement {
            argument,
            span: start.to(self.previous.span),
        }))
    }

    fn parse_expression_statement(&mut self) -> ParseResult<Statement> {
        let expression = self.parse_expression()?;
        self.expect(&TokenKind::Semicolon)?;
        Ok(Statement::Expression(expression))
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    /// Parses an expression, including assignments.
    pub fn parse_expression(&mut self) -> Result<Expression, Diagnostic> {
        self.parse_precedence(Precedence::Assignment)
    }

    fn parse_precedence(&mut self, min: Precedence) -> ParseResult<Expression> {
        self.advance();
        let mut left = self.parse_prefix()?;

        while let Some(precedence) = Precedence::of_infix(&self.current.kind) {
            if precedence < min {
                break;
            }
            self.advance();
            left = self.parse_infix(left, precedence)?;
        }

        Ok(left)
    }

    /// Parses the expression starting at the token just consumed.
    fn parse_prefix(&mut self) -> ParseResult<Expression> {
        let token = self.previous.clone();
        let kind = match token.kind {
            TokenKind::Number(n) => ExpressionKind::Number(n),
            TokenKind::String(s) => ExpressionKind::String(s),
            TokenKind::True => ExpressionKind::Boolean(true),
            TokenKind::False => ExpressionKind::Boolean(false),
            TokenKind::Null => ExpressionKind::Null,
            TokenKind::Identifier(name) => ExpressionKind::Identifier(name),
            TokenKind::LeftParen => {
                let inner = self.parse_expression()?;
                self.expect(&TokenKind::RightParen)?;
                return Ok(Expression::new(inner.kind, token.span.to(self.previous.span)));
            }
            TokenKind::LeftBracket => {
                let elements = self.parse_list(&TokenKind::RightBracket)?;
                ExpressionKind::Array(elements)
            }
            TokenKind::Minus | TokenKind::Bang => {
                let operator = if token.kind == TokenKind::Minus {
                    UnaryOperator::Negate
                } else {
                    UnaryOperator::Not
                };
                let argument = self.parse_precedence(Precedence::Unary)?;
                let span = token.span.to(argument.span);
                return Ok(Expression::new(
                    ExpressionKind::Unary(UnaryExpression {
                        operator,
                        argument: Box::new(argument),
                    }),
                    span,
                ));
            }
            other => {
                return Err(Diagnostic::parse(
                    token.span,
                    format!("Expected an expression, found {}", other),
                ));
            }
        };

        Ok(Expression::new(kind, token.span.to(self.previous.span)))
    }

    /// Parses the rest of an infix or postfix form whose operator token was
    /// just consumed.
    fn parse_infix(&mut self, left: Expression, precedence: Precedence) -> ParseResult<Expression> {
        let operator_token = self.previous.clone();
        let start = left.span;

        let kind = match operator_token.kind {
            TokenKind::Equal => {
                if !matches!(
                    left.kind,
                    ExpressionKind::Identifier(_) | ExpressionKind::Index(_)
                ) {
                    return Err(Diagnostic::parse(left.span, "Invalid assignment target"));
                }
                // Right-associative: `a = b = c` assigns c to b first.
                let value = self.parse_precedence(Precedence::Assignment)?;
                ExpressionKind::Assignment(AssignmentExpression {
                    target: Box::new(left),
                    value: Box::new(value),
                })
            }
            TokenKind::Question => {
                let consequent = self.parse_precedence(Precedence::Assignment)?;
                self.expect(&TokenKind::Colon)?;
                let alternate = self.parse_precedence(Precedence::Conditional)?;
                ExpressionKind::Conditional(ConditionalExpression {
                    test: Box::new(left),
                    consequent: Box::new(consequent),
                    alternate: Box::new(alternate),
                })
            }
            TokenKind::LeftParen => {
                let arguments = self.parse_list(&TokenKind::RightParen)?;
                ExpressionKind::Call(CallExpression {
                    callee: Box::new(left),
                    arguments,
                })
            }
            TokenKind::LeftBracket => {
                let index = self.parse_expression()?;
                self.expect(&TokenKind::RightBracket)?;
                ExpressionKind::Index(IndexExpression {
                    object: Box::new(left),
                    index: Box::new(index),
                })
            }
            ref kind => {
                let operator = binary_operator(kind).ok_or_else(|| {
                    Diagnostic::parse(
                        operator_token.span,
                        format!("Unexpected {}", operator_token.kind),
                    )
                })?;
                let right = self.parse_precedence(precedence.next())?;
                ExpressionKind::Binary(BinaryExpression {
                    operator,
                    left: Box::new(left),
                    right: Box::new(right),
                })
            }
        };

        Ok(Expression::new(kind, start.to(self.previous.span)))
    }

    /// Parses comma-separated expressions up to and including `close`.
    fn parse_list(&mut self, close: &TokenKind) -> ParseResult<Vec<Expression>> {
        let mut items = Vec::new();

        if !self.check(close) {
            loop {
                items.push(self.parse_expression()?);
                if !self.check(&TokenKind::Comma) {
                    break;
                }
                self.advance();
            }
        }

        self.expect(close)?;
        Ok(items)
    }

    // ========================================================================
    // Token helpers
    // ========================================================================

    fn advance(&mut self) {
        // Invalid tokens were already reported by the scanner.
        let mut next = self.scanner.next_token();
        while next.kind == TokenKind::Invalid {
            next = self.scanner.next_token();
        }
        self.previous = std::mem::replace(&mut self.current, next);
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.current.kind) == std::mem::discriminant(kind)
    }

    fn expect(&mut self, kind: &TokenKind) -> ParseResult<()> {
        if self.check(kind) {
            self.advance();
            Ok(())
        } else {
            Err(Diagnostic::parse(
                self.current.span,
                format!("Expected {}, found {}", kind, self.current.kind),
            ))
        }
    }

    fn expect_identifier(&mut self) -> ParseResult<Identifier> {
        if let TokenKind::Identifier(name) = &self.current.kind {
            let id = Identifier {
                name: name.clone(),
                span: self.current.span,
            };
            self.advance();
            Ok(id)
        } else {
            Err(Diagnostic::parse(
                self.current.span,
                format!("Expected identifier, found {}", self.current.kind),
            ))
        }
    }

    fn is_at_end(&self) -> bool {
        self.current.kind == TokenKind::Eof
    }
}

fn binary_operator(kind: &TokenKind) -> Option<BinaryOperator> {
    let operator = match kind {
        TokenKind::Plus => BinaryOperator::Add,
        TokenKind::Minus => BinaryOperator::Subtract,
        TokenKind::Star => BinaryOperator::Multiply,
        TokenKind::Slash => BinaryOperator::Divide,
        TokenKind::Percent => BinaryOperator::Modulo,
        TokenKind::Less => BinaryOperator::Less,
        TokenKind::Greater => BinaryOperator::Greater,
        TokenKind::LessEqual => BinaryOperator::LessEqual,
        TokenKind::GreaterEqual => BinaryOperator::GreaterEqual,
        TokenKind::EqualEqual => BinaryOperator::Equal,
        TokenKind::BangEqual => BinaryOperator::NotEqual,
        _ => return None,
    };
    Some(operator)
}
