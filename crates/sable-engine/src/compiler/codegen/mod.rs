// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Lowering from AST to label IR.
//!
//! This module contains the `Compiler`, which walks a parsed [`Program`] and
//! emits [`Instruction`]s into the [`Block`] of whatever function it is
//! currently inside, resolving names through the [`ScopeTable`].
//!
//! Semantic errors are collected per statement: a failing statement is
//! abandoned, its diagnostic recorded, and compilation moves on to the next
//! statement so one run reports as much as it can. Scopes and function state
//! are always unwound, whether the statement failed or not.

mod expressions;
mod scope;
mod statements;

#[cfg(test)]
mod tests;

pub use scope::{ScopeKind, ScopeTable};

use crate::ast::*;
use crate::compiler::ir::{Block, Instruction, IrFunction, LabelIr, StorageClass, VariableId};
use crate::diagnostics::Diagnostic;
use crate::lexer::Span;
use crate::runtime::value::FunctionIndex;

type CompileResult<T = ()> = Result<T, Diagnostic>;

/// Largest argument or parameter count a call can encode.
pub const MAX_ARGUMENTS: usize = u8::MAX as usize;

/// Compiles AST to label IR.
pub struct Compiler {
    /// Current scope for variable resolution
    scopes: ScopeTable,
    /// Block receiving instructions: main, or the function being compiled
    block: Block,
    /// Function being compiled, `None` for top-level code
    function: Option<FunctionIndex>,
    /// Every function declared so far, indexed by function index
    functions: Vec<IrFunction>,
    diagnostics: Vec<Diagnostic>,
}

impl Compiler {
    /// Creates a new compiler.
    pub fn new() -> Self {
        Self {
            scopes: ScopeTable::new(),
            block: Block::new(),
            function: None,
            functions: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Compiles a program to label IR.
    ///
    /// Returns every compile error found if there was at least one.
    pub fn compile(mut self, program: &Program) -> Result<LabelIr, Vec<Diagnostic>> {
        self.scopes.new_scope(ScopeKind::Normal);
        self.compile_statements(&program.body);
        self.scopes.pop_scope();

        self.block.new_label();
        self.emit(Instruction::Exit);

        if !self.diagnostics.is_empty() {
            return Err(self.diagnostics);
        }

        tracing::debug!(
            labels = self.block.label_count(),
            functions = self.functions.len(),
            "lowered program to label IR"
        );

        Ok(LabelIr {
            main: self.block,
            functions: self.functions,
            variables: self.scopes.into_variables(),
        })
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn emit(&mut self, instruction: Instruction) {
        self.block.add_instruction(instruction);
    }

    /// Compiles a statement list, recording failures and moving on.
    fn compile_statements(&mut self, statements: &[Statement]) {
        for statement in statements {
            if let Err(diagnostic) = self.compile_statement(statement) {
                self.diagnostics.push(diagnostic);
            }
        }
    }

    /// Runs `f` inside a fresh scope, closing it even when `f` fails.
    fn with_scope<T>(
        &mut self,
        kind: ScopeKind,
        f: impl FnOnce(&mut Self) -> CompileResult<T>,
    ) -> CompileResult<T> {
        self.scopes.new_scope(kind);
        let result = f(self);
        self.scopes.pop_scope();
        result
    }

    /// Declares a name, classifying it by whether we're inside a function.
    fn declare(&mut self, id: &Identifier, constant: bool) -> CompileResult<VariableId> {
        let class = match (self.scopes.in_function(), constant) {
            (false, true) => StorageClass::GlobalConstant,
            (false, false) => StorageClass::GlobalMutable,
            (true, true) => StorageClass::FunctionConstant,
            (true, false) => StorageClass::FunctionMutable,
        };
        self.scopes
            .add_variable(&id.name, class, self.function)
            .map_err(|message| Diagnostic::compile(id.span, message))
    }

    /// Resolves a name for reading or writing.
    ///
    /// A variable owned by another function is a closure capture. Captures
    /// mark the variable Closed and are rejected.
    fn resolve(&mut self, name: &str, span: Span) -> CompileResult<VariableId> {
        let id = self.scopes.lookup(name).ok_or_else(|| {
            Diagnostic::compile(span, format!("Variable \"{}\" does not exist.", name))
        })?;

        let variable = self.scopes.variable(id);
        let captured = variable.class != StorageClass::Native
            && variable.function != self.function
            && variable.scope_index > 0;

        if captured {
            let owner = match variable.function {
                Some(_) => "an enclosing function",
                None => "an enclosing block of top-level code",
            };
            self.scopes.mark_closed(id);
            return Err(Diagnostic::compile(
                span,
                format!(
                    "Variable \"{}\" belongs to {}; closures are not supported.",
                    name, owner
                ),
            ));
        }

        Ok(id)
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}
