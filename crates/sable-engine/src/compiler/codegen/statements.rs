// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Statement lowering.
//!
//! | Statement | Shape |
//! |-----------|-------|
//! | `var/const` | value, `Store` |
//! | `if/else` | test, `PopJumpIfZero else`, then, `Goto end`, else |
//! | `while` | `cond:` test, `PopJumpIfZero end`, body, `Goto cond`, `end:` |
//! | `break/continue` | `Goto end` / `Goto cond` of the enclosing loop |
//! | `function` | reference, `MakeFunction`, `Store`; body in its own block |
//! | `return` | value, `Return` |

use std::mem;

use super::{CompileResult, Compiler, MAX_ARGUMENTS, ScopeKind};
use crate::ast::*;
use crate::compiler::ir::{Block, Instruction, IrFunction, StorageClass};
use crate::diagnostics::Diagnostic;

impl Compiler {
    pub(super) fn compile_statement(&mut self, statement: &Statement) -> CompileResult {
        match statement {
            Statement::VariableDeclaration(decl) => self.compile_variable_declaration(decl),
            Statement::FunctionDeclaration(decl) => self.compile_function_declaration(decl),
            Statement::Expression(expr) => {
                self.compile_expression(expr)?;
                self.emit(Instruction::Pop);
                Ok(())
            }
            Statement::Block(block) => self.with_scope(ScopeKind::Normal, |this| {
                this.compile_statements(&block.body);
                Ok(())
            }),
            Statement::If(if_stmt) => self.compile_if(if_stmt),
            Statement::While(while_stmt) => self.compile_while(while_stmt),
            Statement::Return(ret) => self.compile_return(ret),
            Statement::Break(span) => {
                let end = self.scopes.loop_end_label().ok_or_else(|| {
                    Diagnostic::compile(*span, "A break statement may only appear in a loop.")
                })?;
                self.emit(Instruction::Goto(end));
                Ok(())
            }
            Statement::Continue(span) => {
                let condition = self.scopes.loop_condition_label().ok_or_else(|| {
                    Diagnostic::compile(*span, "A continue statement may only appear in a loop.")
                })?;
                self.emit(Instruction::Goto(condition));
                Ok(())
            }
            Statement::Empty => Ok(()),
        }
    }

    fn compile_variable_declaration(&mut self, decl: &VariableDeclaration) -> CompileResult {
        // The initializer cannot see the name being declared.
        match &decl.init {
            Some(init) => self.compile_expression(init)?,
            None => self.emit(Instruction::Null),
        }
        let variable = self.declare(&decl.id, decl.kind == VariableKind::Const)?;
        self.emit(Instruction::Store(variable));
        Ok(())
    }

    fn compile_function_declaration(&mut self, decl: &FunctionDeclaration) -> CompileResult {
        // Declared before the body so the function can call itself.
        let variable = self.declare(&decl.id, true)?;

        if decl.params.len() > MAX_ARGUMENTS {
            return Err(Diagnostic::compile(
                decl.id.span,
                format!(
                    "Function \"{}\" declares {} parameters; the limit is {}.",
                    decl.id.name,
                    decl.params.len(),
                    MAX_ARGUMENTS
                ),
            ));
        }

        let index = self.functions.len() as u32;
        self.functions.push(IrFunction {
            name: decl.id.name.clone(),
            parameters: Vec::new(),
            block: Block::new(),
        });

        self.emit(Instruction::GetFunctionReference(index));
        self.emit(Instruction::MakeFunction);
        self.emit(Instruction::Store(variable));

        let outer_block = mem::take(&mut self.block);
        let outer_function = self.function.replace(index);

        self.scopes.new_scope(ScopeKind::Function);
        let mut parameters = Vec::with_capacity(decl.params.len());
        for param in &decl.params {
            match self
                .scopes
                .add_variable(&param.name, StorageClass::FunctionMutable, Some(index))
            {
                Ok(id) => parameters.push(id),
                Err(message) => self.diagnostics.push(Diagnostic::compile(param.span, message)),
            }
        }
        self.compile_statements(&decl.body);
        if !matches!(decl.body.last(), Some(Statement::Return(_))) {
            self.emit(Instruction::Null);
            self.emit(Instruction::Return);
        }
        self.scopes.pop_scope();

        let body = mem::replace(&mut self.block, outer_block);
        self.function = outer_function;

        let function = &mut self.functions[index as usize];
        function.parameters = parameters;
        function.block = body;
        Ok(())
    }

    fn compile_if(&mut self, if_stmt: &IfStatement) -> CompileResult {
        self.compile_expression(&if_stmt.test)?;
        let otherwise = self.block.reserve_label();
        self.emit(Instruction::PopJumpIfZero(otherwise));

        self.block.new_label();
        self.compile_statement(&if_stmt.consequent)?;

        match &if_stmt.alternate {
            Some(alternate) => {
                let end = self.block.reserve_label();
                self.emit(Instruction::Goto(end));
                self.block.bind_label(otherwise);
                self.compile_statement(alternate)?;
                self.block.bind_label(end);
            }
            None => self.block.bind_label(otherwise),
        }
        Ok(())
    }

    fn compile_while(&mut self, while_stmt: &WhileStatement) -> CompileResult {
        let end = self.block.reserve_label();
        let condition = self.block.new_label();
        self.compile_expression(&while_stmt.test)?;
        self.emit(Instruction::PopJumpIfZero(end));

        self.block.new_label();
        self.with_scope(ScopeKind::Loop { condition, end }, |this| {
            this.compile_statement(&while_stmt.body)
        })?;
        self.emit(Instruction::Goto(condition));

        self.block.bind_label(end);
        Ok(())
    }

    fn compile_return(&mut self, ret: &ReturnStatement) -> CompileResult {
        if !self.scopes.in_function() {
            return Err(Diagnostic::compile(
                ret.span,
                "A return statement may only appear in a function.",
            ));
        }
        match &ret.argument {
            Some(argument) => self.compile_expression(argument)?,
            None => self.emit(Instruction::Null),
        }
        self.emit(Instruction::Return);
        Ok(())
    }
}
