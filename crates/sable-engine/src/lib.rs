// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # sable-engine
//!
//! Compiler pipeline and bytecode virtual machine for Sable, a small
//! dynamically typed language.
//!
//! ## Overview
//!
//! Source text goes through these stages:
//! - Lexer and Pratt parser producing an owned AST
//! - Lowering to label IR, where jumps name labels instead of offsets
//! - A label-local peephole optimizer
//! - Transpiling to bytecode chunks with resolved addresses and slots
//! - A stack-based interpreter
//!
//! ## Quick Start
//!
//! ```rust
//! use sable_engine::{Engine, Value};
//!
//! let engine = Engine::new();
//! let vm = engine.run_with_output("var x = 5; x = x + 1;", Box::new(std::io::sink())).unwrap();
//! assert_eq!(vm.global("x"), Some(&Value::Number(6.0)));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ast;
pub mod builtins;
pub mod compiler;
pub mod config;
pub mod diagnostics;
pub mod lexer;
pub mod parser;
pub mod runtime;
pub mod vm;

use std::io::Write;
use std::path::Path;

use thiserror::Error;

pub use config::EngineConfig;
pub use diagnostics::{Diagnostic, DiagnosticKind, Report};
pub use runtime::Value;
pub use vm::{RuntimeError, VM};

use ast::Program;
use compiler::{Compiler, Executable, LabelIr, Transpiler};
use parser::Parser;

/// The main engine instance.
///
/// Holds the configuration and drives source text through every stage.
/// Each run builds a fresh [`VM`], so one engine can run many programs.
#[derive(Debug, Clone, Default)]
pub struct Engine {
    config: EngineConfig,
}

impl Engine {
    /// Creates an engine with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an engine with `config`.
    pub fn with_config(config: EngineConfig) -> Self {
        Self { config }
    }

    /// The active configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Parses `source` into an AST.
    pub fn parse(&self, source: &str) -> Result<Program, Error> {
        let program = Parser::new(source)
            .parse_program()
            .map_err(|diagnostics| Error::Syntax(Report::new(source, diagnostics)))?;
        tracing::debug!(statements = program.body.len(), "parsed program");
        Ok(program)
    }

    /// Parses and lowers `source` to label IR, optimized unless the
    /// configuration turns the optimizer off.
    pub fn lower(&self, source: &str) -> Result<LabelIr, Error> {
        let program = self.parse(source)?;
        let ir = Compiler::new()
            .compile(&program)
            .map_err(|diagnostics| Error::Compile(Report::new(source, diagnostics)))?;

        if self.config.optimize {
            Ok(compiler::optimize(&ir))
        } else {
            Ok(ir)
        }
    }

    /// Compiles `source` all the way to bytecode.
    pub fn compile(&self, source: &str) -> Result<Executable, Error> {
        let ir = self.lower(source)?;
        Ok(Transpiler::new(&ir).transpile())
    }

    /// Compiles and runs `source`, writing program output to stdout.
    ///
    /// Returns the finished VM so callers can inspect globals and the stack.
    pub fn run(&self, source: &str) -> Result<VM, Error> {
        let mut vm = VM::new(self.compile(source)?, &self.config);
        vm.run()?;
        Ok(vm)
    }

    /// Compiles and runs `source`, writing program output to `out`.
    pub fn run_with_output(&self, source: &str, out: Box<dyn Write>) -> Result<VM, Error> {
        let mut vm = VM::with_output(self.compile(source)?, &self.config, out);
        vm.run()?;
        Ok(vm)
    }

    /// Reads and runs the program at `path`.
    pub fn run_file(&self, path: &Path) -> Result<VM, Error> {
        let source = std::fs::read_to_string(path)?;
        self.run(&source)
    }
}

/// Errors that can occur while compiling or running a program.
#[derive(Debug, Error)]
pub enum Error {
    /// Lexical or syntax errors
    #[error("{0}")]
    Syntax(Report),
    /// Errors found while lowering to IR
    #[error("{0}")]
    Compile(Report),
    /// A fatal error during execution
    #[error("runtime error: {0}")]
    Runtime(#[from] RuntimeError),
    /// Reading the program failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::Syntax(_) => 1,
            Error::Compile(_) => 2,
            Error::Runtime(_) => 3,
            Error::Io(_) => 74,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet() -> Box<dyn Write> {
        Box::new(std::io::sink())
    }

    #[test]
    fn test_engine_creation() {
        let engine = Engine::new();
        assert_eq!(engine.config(), &EngineConfig::default());
    }

    #[test]
    fn test_run_returns_finished_vm() {
        let vm = Engine::new().run_with_output("var x = 2 * 21;", quiet()).unwrap();
        assert_eq!(vm.global("x"), Some(&Value::Number(42.0)));
    }

    #[test]
    fn test_syntax_error() {
        let err = Engine::new().run_with_output("var = 1;", quiet()).unwrap_err();
        assert!(matches!(err, Error::Syntax(_)));
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().starts_with("1:5: syntax error:"), "{}", err);
    }

    #[test]
    fn test_compile_error() {
        let err = Engine::new().compile("x = 1;").unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert_eq!(err.to_string(), "1:1: compile error: Variable \"x\" does not exist.");
    }

    #[test]
    fn test_runtime_error() {
        let err = Engine::new().run_with_output("clock(1);", quiet()).unwrap_err();
        assert_eq!(err.exit_code(), 3);
        assert_eq!(
            err.to_string(),
            "runtime error: 1 argument(s) passed to function expecting 0"
        );
    }

    #[test]
    fn test_io_error() {
        let err = Engine::new()
            .run_file(Path::new("/definitely/not/here.sable"))
            .unwrap_err();
        assert_eq!(err.exit_code(), 74);
    }

    #[test]
    fn test_optimizer_can_be_disabled() {
        let plain = Engine::with_config(EngineConfig::default().with_optimizer(false));
        let optimized = Engine::new();
        let src = "var x = 1 + 2;";
        assert!(plain.lower(src).unwrap().main.instruction_count()
            > optimized.lower(src).unwrap().main.instruction_count());
    }
}
