// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Abstract Syntax Tree (AST) definitions for Sable.
//!
//! The tree is owned: every parent exclusively owns its children, so dropping
//! a [`Program`] tears the whole tree down. Every node carries the [`Span`] of
//! source it was parsed from so later phases can point diagnostics at it.

use std::fmt;

use crate::lexer::Span;

/// A complete Sable program.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    /// The statements in the program
    pub body: Vec<Statement>,
}

/// An identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Identifier {
    /// The name of the identifier
    pub name: String,
    /// Where the identifier appears
    pub span: Span,
}

/// A Sable statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// Variable declaration (var, const)
    VariableDeclaration(VariableDeclaration),
    /// Function declaration
    FunctionDeclaration(FunctionDeclaration),
    /// Expression statement
    Expression(Expression),
    /// Block statement { ... }
    Block(BlockStatement),
    /// If statement
    If(IfStatement),
    /// While statement
    While(WhileStatement),
    /// Return statement
    Return(ReturnStatement),
    /// Break statement
    Break(Span),
    /// Continue statement
    Continue(Span),
    /// Empty statement (;)
    Empty,
}

/// Variable declaration kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    /// var declaration
    Var,
    /// const declaration
    Const,
}

/// A variable declaration statement.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDeclaration {
    /// var or const
    pub kind: VariableKind,
    /// The declared name
    pub id: Identifier,
    /// The initializer; `var x;` has none and starts out null
    pub init: Option<Expression>,
}

/// A function declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDeclaration {
    /// The function name
    pub id: Identifier,
    /// Parameter names in declaration order
    pub params: Vec<Identifier>,
    /// The function body
    pub body: Vec<Statement>,
}

/// A block statement.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockStatement {
    /// The statements in the block
    pub body: Vec<Statement>,
}

/// An if statement.
#[derive(Debug, Clone, PartialEq)]
pub struct IfStatement {
    /// The condition
    pub test: Expression,
    /// The consequent
    pub consequent: Box<Statement>,
    /// The alternate (else branch)
    pub alternate: Option<Box<Statement>>,
}

/// A while statement.
#[derive(Debug, Clone, PartialEq)]
pub struct WhileStatement {
    /// The condition
    pub test: Expression,
    /// The body
    pub body: Box<Statement>,
}

/// A return statement.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnStatement {
    /// The returned value, null when absent
    pub argument: Option<Expression>,
    /// The `return` keyword through the semicolon
    pub span: Span,
}

/// An expression together with its source span.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    /// What kind of expression this is
    pub kind: ExpressionKind,
    /// The source it was parsed from
    pub span: Span,
}

impl Expression {
    /// Creates an expression node.
    pub fn new(kind: ExpressionKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// The different kinds of expressions.
#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionKind {
    /// Numeric literal
    Number(f64),
    /// String literal
    String(String),
    /// `true` or `false`
    Boolean(bool),
    /// `null`
    Null,
    /// Array literal `[a, b]`
    Array(Vec<Expression>),
    /// Variable reference
    Identifier(String),
    /// Binary operation
    Binary(BinaryExpression),
    /// Unary operation
    Unary(UnaryExpression),
    /// Conditional `test ? consequent : alternate`
    Conditional(ConditionalExpression),
    /// Assignment `target = value`
    Assignment(AssignmentExpression),
    /// Index access `object[index]`
    Index(IndexExpression),
    /// Function call
    Call(CallExpression),
}

/// A binary expression.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpression {
    /// The operator
    pub operator: BinaryOperator,
    /// The left operand
    pub left: Box<Expression>,
    /// The right operand
    pub right: Box<Expression>,
}

/// A unary expression.
#[derive(Debug, Clone, PartialEq)]
pub struct UnaryExpression {
    /// The operator
    pub operator: UnaryOperator,
    /// The operand
    pub argument: Box<Expression>,
}

/// A conditional (ternary) expression.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalExpression {
    /// The condition
    pub test: Box<Expression>,
    /// Value when the condition is truthy
    pub consequent: Box<Expression>,
    /// Value when the condition is falsey
    pub alternate: Box<Expression>,
}

/// An assignment expression.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentExpression {
    /// An identifier or index expression
    pub target: Box<Expression>,
    /// The assigned value
    pub value: Box<Expression>,
}

/// An index expression.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexExpression {
    /// The indexed value
    pub object: Box<Expression>,
    /// The index
    pub index: Box<Expression>,
}

/// A call expression.
#[derive(Debug, Clone, PartialEq)]
pub struct CallExpression {
    /// The callee
    pub callee: Box<Expression>,
    /// Arguments in source order
    pub arguments: Vec<Expression>,
}

/// Binary operators.
///
/// The discriminant is the operator-type byte carried by the IR and the
/// bytecode, so the order is part of the chunk format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BinaryOperator {
    // Arithmetic
    /// `+`
    Add = 0,
    /// `-`
    Subtract,
    /// `*`
    Multiply,
    /// `/`
    Divide,
    /// `%`
    Modulo,
    // Comparison
    /// `<`
    Less,
    /// `>`
    Greater,
    /// `<=`
    LessEqual,
    /// `>=`
    GreaterEqual,
    /// `!=`
    NotEqual,
    /// `==`
    Equal,
}

impl BinaryOperator {
    /// Every operator, in encoding order.
    pub const ALL: [BinaryOperator; 11] = [
        BinaryOperator::Add,
        BinaryOperator::Subtract,
        BinaryOperator::Multiply,
        BinaryOperator::Divide,
        BinaryOperator::Modulo,
        BinaryOperator::Less,
        BinaryOperator::Greater,
        BinaryOperator::LessEqual,
        BinaryOperator::GreaterEqual,
        BinaryOperator::NotEqual,
        BinaryOperator::Equal,
    ];

    /// Decodes an operator-type byte.
    pub fn from_byte(byte: u8) -> Option<Self> {
        Self::ALL.get(byte as usize).copied()
    }

    /// The source spelling of the operator.
    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
            BinaryOperator::Less => "<",
            BinaryOperator::Greater => ">",
            BinaryOperator::LessEqual => "<=",
            BinaryOperator::GreaterEqual => ">=",
            BinaryOperator::NotEqual => "!=",
            BinaryOperator::Equal => "==",
        }
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum UnaryOperator {
    /// `-`
    Negate = 0,
    /// `!`
    Not,
}

impl UnaryOperator {
    /// Every operator, in encoding order.
    pub const ALL: [UnaryOperator; 2] = [UnaryOperator::Negate, UnaryOperator::Not];

    /// Decodes an operator-type byte.
    pub fn from_byte(byte: u8) -> Option<Self> {
        Self::ALL.get(byte as usize).copied()
    }

    /// The source spelling of the operator.
    pub fn as_str(self) -> &'static str {
        match self {
            UnaryOperator::Negate => "-",
            UnaryOperator::Not => "!",
        }
    }
}

impl fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_bytes_round_trip() {
        for op in BinaryOperator::ALL {
            assert_eq!(BinaryOperator::from_byte(op as u8), Some(op));
        }
        for op in UnaryOperator::ALL {
            assert_eq!(UnaryOperator::from_byte(op as u8), Some(op));
        }
        assert_eq!(BinaryOperator::from_byte(11), None);
        assert_eq!(UnaryOperator::from_byte(2), None);
    }
}
