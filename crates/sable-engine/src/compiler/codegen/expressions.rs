// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Expression lowering. Every expression leaves exactly one value on the
//! operand stack.

use std::rc::Rc;

use super::{CompileResult, Compiler, MAX_ARGUMENTS};
use crate::ast::*;
use crate::compiler::ir::Instruction;
use crate::diagnostics::Diagnostic;

/// Literal kinds that can never be called or indexed, named for messages.
fn literal_name(kind: &ExpressionKind) -> Option<&'static str> {
    match kind {
        ExpressionKind::Number(_) => Some("number"),
        ExpressionKind::String(_) => Some("string"),
        ExpressionKind::Boolean(_) => Some("boolean"),
        ExpressionKind::Null => Some("null"),
        ExpressionKind::Array(_) => Some("array"),
        _ => None,
    }
}

impl Compiler {
    pub(super) fn compile_expression(&mut self, expr: &Expression) -> CompileResult {
        match &expr.kind {
            ExpressionKind::Number(n) => self.emit(Instruction::Number(*n)),
            ExpressionKind::String(s) => self.emit(Instruction::String(Rc::from(s.as_str()))),
            ExpressionKind::Boolean(true) => self.emit(Instruction::True),
            ExpressionKind::Boolean(false) => self.emit(Instruction::False),
            ExpressionKind::Null => self.emit(Instruction::Null),
            ExpressionKind::Array(elements) => {
                for element in elements {
                    self.compile_expression(element)?;
                }
                self.emit(Instruction::MakeArray(elements.len() as u32));
            }
            ExpressionKind::Identifier(name) => {
                let variable = self.resolve(name, expr.span)?;
                self.emit(Instruction::Load(variable));
            }
            ExpressionKind::Binary(binary) => {
                self.compile_expression(&binary.left)?;
                self.compile_expression(&binary.right)?;
                self.emit(Instruction::BinaryOp(binary.operator));
            }
            ExpressionKind::Unary(unary) => {
                self.compile_expression(&unary.argument)?;
                self.emit(Instruction::UnaryOp(unary.operator));
            }
            ExpressionKind::Conditional(cond) => self.compile_conditional(cond)?,
            ExpressionKind::Assignment(assign) => self.compile_assignment(assign)?,
            ExpressionKind::Index(index) => {
                self.check_indexable(&index.object)?;
                self.compile_expression(&index.object)?;
                self.compile_expression(&index.index)?;
                self.emit(Instruction::GetIndex);
            }
            ExpressionKind::Call(call) => self.compile_call(call, expr)?,
        }
        Ok(())
    }

    fn compile_conditional(&mut self, cond: &ConditionalExpression) -> CompileResult {
        self.compile_expression(&cond.test)?;
        let otherwise = self.block.reserve_label();
        let end = self.block.reserve_label();
        self.emit(Instruction::PopJumpIfZero(otherwise));

        self.block.new_label();
        self.compile_expression(&cond.consequent)?;
        self.emit(Instruction::Goto(end));

        self.block.bind_label(otherwise);
        self.compile_expression(&cond.alternate)?;
        self.block.bind_label(end);
        Ok(())
    }

    fn compile_assignment(&mut self, assign: &AssignmentExpression) -> CompileResult {
        match &assign.target.kind {
            ExpressionKind::Identifier(name) => {
                let variable = self.resolve(name, assign.target.span)?;
                if self.scopes.variable(variable).class.is_constant() {
                    return Err(Diagnostic::compile(
                        assign.target.span,
                        format!("Cannot assign a value to constant variable \"{}\"", name),
                    ));
                }
                self.compile_expression(&assign.value)?;
                self.emit(Instruction::Store(variable));
                self.emit(Instruction::Load(variable));
            }
            ExpressionKind::Index(index) => {
                self.check_indexable(&index.object)?;
                self.compile_expression(&index.object)?;
                self.compile_expression(&index.index)?;
                self.compile_expression(&assign.value)?;
                self.emit(Instruction::SetIndex);
            }
            _ => {
                return Err(Diagnostic::compile(
                    assign.target.span,
                    "Invalid assignment target",
                ));
            }
        }
        Ok(())
    }

    fn compile_call(&mut self, call: &CallExpression, expr: &Expression) -> CompileResult {
        if let Some(kind) = literal_name(&call.callee.kind) {
            return Err(Diagnostic::compile(
                call.callee.span,
                format!("Cannot call a {} literal.", kind),
            ));
        }
        if call.arguments.len() > MAX_ARGUMENTS {
            return Err(Diagnostic::compile(
                expr.span,
                format!(
                    "A call may pass at most {} arguments, found {}.",
                    MAX_ARGUMENTS,
                    call.arguments.len()
                ),
            ));
        }

        for argument in &call.arguments {
            self.compile_expression(argument)?;
        }
        self.compile_expression(&call.callee)?;
        self.emit(Instruction::Call(call.arguments.len() as u8));
        Ok(())
    }

    fn check_indexable(&self, object: &Expression) -> CompileResult {
        match &object.kind {
            ExpressionKind::Number(_) | ExpressionKind::Boolean(_) | ExpressionKind::Null => {
                let kind = literal_name(&object.kind).unwrap_or("value");
                Err(Diagnostic::compile(
                    object.span,
                    format!("Cannot index a {} literal.", kind),
                ))
            }
            _ => Ok(()),
        }
    }
}
