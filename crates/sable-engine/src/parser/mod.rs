// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Parser for Sable source code.
//!
//! Transforms a stream of tokens into an Abstract Syntax Tree (AST).
//! Statements are parsed by recursive descent, expressions by precedence
//! climbing (Pratt parsing). A syntax error does not stop the parser: it
//! records a diagnostic, skips ahead to the next statement boundary and
//! carries on, so one run can report several mistakes.
//!
//! ## Usage
//!
//! ```rust
//! use sable_engine::parser::Parser;
//!
//! let mut parser = Parser::new("var x = 1 + 2;");
//! let program = parser.parse_program().expect("Should parse");
//! assert_eq!(program.body.len(), 1);
//! ```

mod parser;

pub use parser::Parser;
