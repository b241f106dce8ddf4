// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Position-tagged diagnostics for the lexing, parsing and compiling phases.
//!
//! Each phase accumulates [`Diagnostic`]s carrying a byte [`Span`]. Once the
//! phase ends, the engine resolves the spans against the source text into a
//! [`Report`], which is what users see.

use std::fmt;

use crate::lexer::Span;

/// The phase that produced a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// Malformed token, unterminated string or comment.
    Lex,
    /// Unexpected token or invalid syntax construct.
    Parse,
    /// Semantic error found while lowering to IR.
    Compile,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DiagnosticKind::Lex => "lex",
            DiagnosticKind::Parse => "syntax",
            DiagnosticKind::Compile => "compile",
        })
    }
}

/// A single error message anchored to a region of the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// The phase that produced the diagnostic
    pub kind: DiagnosticKind,
    /// Where in the source the problem is
    pub span: Span,
    /// Human-readable message
    pub message: String,
}

impl Diagnostic {
    /// Creates a lexical error.
    pub fn lex(span: Span, message: impl Into<String>) -> Self {
        Self { kind: DiagnosticKind::Lex, span, message: message.into() }
    }

    /// Creates a syntax error.
    pub fn parse(span: Span, message: impl Into<String>) -> Self {
        Self { kind: DiagnosticKind::Parse, span, message: message.into() }
    }

    /// Creates a compile error.
    pub fn compile(span: Span, message: impl Into<String>) -> Self {
        Self { kind: DiagnosticKind::Compile, span, message: message.into() }
    }
}

/// A 1-based line and column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    /// Line number, starting at 1
    pub line: usize,
    /// Column in characters, starting at 1
    pub column: usize,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Maps byte offsets to line/column positions.
#[derive(Debug, Clone)]
pub struct LineIndex<'a> {
    source: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    /// Indexes the line starts of `source`.
    pub fn new(source: &'a str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self { source, line_starts }
    }

    /// Resolves a byte offset. Offsets past the end clamp to the end.
    pub fn position(&self, offset: usize) -> Position {
        let offset = offset.min(self.source.len());
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        let start = self.line_starts[line];
        let column = self
            .source
            .get(start..offset)
            .map_or(offset - start, |text| text.chars().count())
            + 1;
        Position { line: line + 1, column }
    }
}

/// Diagnostics of one failed phase, resolved against the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    entries: Vec<(Position, Diagnostic)>,
}

impl Report {
    /// Resolves `diagnostics` against `source`.
    pub fn new(source: &str, diagnostics: Vec<Diagnostic>) -> Self {
        let index = LineIndex::new(source);
        let entries = diagnostics
            .into_iter()
            .map(|d| (index.position(d.span.start), d))
            .collect();
        Self { entries }
    }

    /// Iterates over the diagnostics in the order they were reported.
    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().map(|(_, d)| d)
    }

    /// Iterates over `(position, diagnostic)` pairs.
    pub fn entries(&self) -> impl Iterator<Item = (Position, &Diagnostic)> {
        self.entries.iter().map(|(p, d)| (*p, d))
    }

    /// Number of diagnostics.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing was reported.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (position, diagnostic)) in self.entries.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}: {} error: {}", position, diagnostic.kind, diagnostic.message)?;
        }
        Ok(())
    }
}
