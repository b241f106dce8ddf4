// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Token definitions for the Sable lexer.

use std::fmt;

/// A span in the source code, representing a range of bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// Start byte offset (inclusive)
    pub start: usize,
    /// End byte offset (exclusive)
    pub end: usize,
}

impl Span {
    /// Creates a new span.
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Returns the smallest span covering both `self` and `other`.
    pub fn to(self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }

    /// Returns the length of this span in bytes.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Returns true if this span is empty.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// A token produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// The kind of token
    pub kind: TokenKind,
    /// The span in the source code
    pub span: Span,
}

impl Token {
    /// Creates a new token.
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// The different kinds of tokens in Sable.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    /// Numeric literal
    Number(f64),
    /// String literal, escapes already resolved
    String(String),
    /// Identifier
    Identifier(String),

    // Keywords
    /// `break`
    Break,
    /// `const`
    Const,
    /// `continue`
    Continue,
    /// `else`
    Else,
    /// `false`
    False,
    /// `function`
    Function,
    /// `if`
    If,
    /// `null`
    Null,
    /// `return`
    Return,
    /// `true`
    True,
    /// `var`
    Var,
    /// `while`
    While,

    // Punctuation
    /// `(`
    LeftParen,
    /// `)`
    RightParen,
    /// `[`
    LeftBracket,
    /// `]`
    RightBracket,
    /// `{`
    LeftBrace,
    /// `}`
    RightBrace,
    /// `,`
    Comma,
    /// `;`
    Semicolon,
    /// `:`
    Colon,
    /// `?`
    Question,

    // Operators
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `/`
    Slash,
    /// `%`
    Percent,
    /// `=`
    Equal,
    /// `==`
    EqualEqual,
    /// `!=`
    BangEqual,
    /// `!`
    Bang,
    /// `<`
    Less,
    /// `>`
    Greater,
    /// `<=`
    LessEqual,
    /// `>=`
    GreaterEqual,

    /// A character sequence the scanner rejected; a diagnostic was recorded.
    Invalid,
    /// End of input
    Eof,
}

impl TokenKind {
    /// Looks up the keyword spelled by `ident`, if any.
    pub fn keyword(ident: &str) -> Option<TokenKind> {
        let kind = match ident {
            "break" => TokenKind::Break,
            "const" => TokenKind::Const,
            "continue" => TokenKind::Continue,
            "else" => TokenKind::Else,
            "false" => TokenKind::False,
            "function" => TokenKind::Function,
            "if" => TokenKind::If,
            "null" => TokenKind::Null,
            "return" => TokenKind::Return,
            "true" => TokenKind::True,
            "var" => TokenKind::Var,
            "while" => TokenKind::While,
            _ => return None,
        };
        Some(kind)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TokenKind::Number(n) => return write!(f, "number {}", n),
            TokenKind::String(s) => return write!(f, "string {:?}", s),
            TokenKind::Identifier(name) => return write!(f, "identifier \"{}\"", name),
            TokenKind::Break => "\"break\"",
            TokenKind::Const => "\"const\"",
            TokenKind::Continue => "\"continue\"",
            TokenKind::Else => "\"else\"",
            TokenKind::False => "\"false\"",
            TokenKind::Function => "\"function\"",
            TokenKind::If => "\"if\"",
            TokenKind::Null => "\"null\"",
            TokenKind::Return => "\"return\"",
            TokenKind::True => "\"true\"",
            TokenKind::Var => "\"var\"",
            TokenKind::While => "\"while\"",
            TokenKind::LeftParen => "\"(\"",
            TokenKind::RightParen => "\")\"",
            TokenKind::LeftBracket => "\"[\"",
            TokenKind::RightBracket => "\"]\"",
            TokenKind::LeftBrace => "\"{\"",
            TokenKind::RightBrace => "\"}\"",
            TokenKind::Comma => "\",\"",
            TokenKind::Semicolon => "\";\"",
            TokenKind::Colon => "\":\"",
            TokenKind::Question => "\"?\"",
            TokenKind::Plus => "\"+\"",
            TokenKind::Minus => "\"-\"",
            TokenKind::Star => "\"*\"",
            TokenKind::Slash => "\"/\"",
            TokenKind::Percent => "\"%\"",
            TokenKind::Equal => "\"=\"",
            TokenKind::EqualEqual => "\"==\"",
            TokenKind::BangEqual => "\"!=\"",
            TokenKind::Bang => "\"!\"",
            TokenKind::Less => "\"<\"",
            TokenKind::Greater => "\">\"",
            TokenKind::LessEqual => "\"<=\"",
            TokenKind::GreaterEqual => "\">=\"",
            TokenKind::Invalid => "invalid token",
            TokenKind::Eof => "end of input",
        };
        f.write_str(text)
    }
}
