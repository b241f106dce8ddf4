// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Tests for lowering to label IR.

use super::*;
use crate::compiler::ir::{Label, LabelId};
use crate::parser::Parser;

fn compile_source(src: &str) -> Result<LabelIr, Vec<Diagnostic>> {
    let program = Parser::new(src).parse_program().expect("Should parse");
    Compiler::new().compile(&program)
}

fn compile_ok(src: &str) -> LabelIr {
    compile_source(src).expect("Compilation should succeed")
}

fn compile_err(src: &str) -> Vec<String> {
    compile_source(src)
        .expect_err("Compilation should fail")
        .into_iter()
        .map(|d| d.message)
        .collect()
}

fn assert_well_formed(block: &Block) {
    let labels = block.labels();
    for label in &labels[..labels.len().saturating_sub(1)] {
        assert!(label.is_terminated(), "label {} falls through", label.id);
    }
}

fn variable_named<'a>(ir: &'a LabelIr, name: &str) -> &'a crate::compiler::ir::Variable {
    ir.variables
        .iter()
        .find(|v| v.name == name)
        .unwrap_or_else(|| panic!("no variable {}", name))
}

#[test]
fn test_compile_empty_program() {
    let ir = compile_ok("");
    assert_eq!(ir.main.label_count(), 1);
    assert_eq!(ir.main.labels()[0].instructions, vec![Instruction::Exit]);
}

#[test]
fn test_expression_statement_is_popped() {
    let ir = compile_ok("1 + 2;");
    let labels = ir.main.labels();
    assert_eq!(
        labels[0],
        Label {
            id: labels[0].id,
            instructions: vec![
                Instruction::Number(1.0),
                Instruction::Number(2.0),
                Instruction::BinaryOp(BinaryOperator::Add),
                Instruction::Pop,
                Instruction::Goto(labels[1].id),
            ],
        }
    );
    assert_eq!(labels[1].instructions, vec![Instruction::Exit]);
}

#[test]
fn test_global_variables() {
    let ir = compile_ok("var x = 5; const y = 1; var z;");
    assert_eq!(variable_named(&ir, "x").class, StorageClass::GlobalMutable);
    assert_eq!(variable_named(&ir, "y").class, StorageClass::GlobalConstant);
    assert_eq!(variable_named(&ir, "x").function, None);
    assert!(ir.main.labels()[0].instructions.contains(&Instruction::Null));
}

#[test]
fn test_assignment_stores_then_loads() {
    let ir = compile_ok("var x = 5; x = x + 1;");
    let instructions = &ir.main.labels()[0].instructions;
    let x = VariableId(
        ir.variables.iter().position(|v| v.name == "x").unwrap() as u32,
    );
    assert_eq!(
        instructions[..],
        [
            Instruction::Number(5.0),
            Instruction::Store(x),
            Instruction::Load(x),
            Instruction::Number(1.0),
            Instruction::BinaryOp(BinaryOperator::Add),
            Instruction::Store(x),
            Instruction::Load(x),
            Instruction::Pop,
            Instruction::Goto(ir.main.labels()[1].id),
        ]
    );
}

#[test]
fn test_function_declaration() {
    let ir = compile_ok("function add(a, b) { var c = a + b; }");
    assert_eq!(ir.functions.len(), 1);
    let function = &ir.functions[0];
    assert_eq!(function.name, "add");
    assert_eq!(function.arity(), 2);

    assert_eq!(variable_named(&ir, "add").class, StorageClass::GlobalConstant);
    assert_eq!(variable_named(&ir, "a").class, StorageClass::FunctionMutable);
    assert_eq!(variable_named(&ir, "c").class, StorageClass::FunctionMutable);
    assert_eq!(variable_named(&ir, "c").function, Some(0));

    // Falling off the end returns null.
    let body = &function.block.labels()[0].instructions;
    assert_eq!(body[body.len() - 2..], [Instruction::Null, Instruction::Return]);

    let main = &ir.main.labels()[0].instructions;
    assert_eq!(main[0], Instruction::GetFunctionReference(0));
    assert_eq!(main[1], Instruction::MakeFunction);
    assert!(matches!(main[2], Instruction::Store(_)));
}

#[test]
fn test_explicit_return_is_not_doubled() {
    let ir = compile_ok("function f() { return 1; }");
    let body = &ir.functions[0].block.labels()[0].instructions;
    assert_eq!(body[..], [Instruction::Number(1.0), Instruction::Return]);
}

#[test]
fn test_recursive_function_resolves_itself() {
    let ir = compile_ok("function f(n) { return n < 1 ? 0 : f(n - 1); }");
    assert_eq!(ir.functions.len(), 1);
}

#[test]
fn test_while_loop_shape() {
    let ir = compile_ok("var i = 0; while (i < 3) { i = i + 1; if (i == 2) break; else continue; }");
    assert_well_formed(&ir.main);

    let jumps: Vec<LabelId> = ir
        .main
        .labels()
        .iter()
        .flat_map(|label| label.instructions.iter().filter_map(Instruction::jump_target))
        .collect();
    let bound: Vec<LabelId> = ir.main.labels().iter().map(|label| label.id).collect();
    assert!(jumps.iter().all(|target| bound.contains(target)));
}

#[test]
fn test_conditional_expression_is_well_formed() {
    let ir = compile_ok("var x = true ? 1 : 2;");
    assert_well_formed(&ir.main);
    assert!(ir.main.label_count() >= 4);
}

#[test]
fn test_natives_resolve_to_native_variables() {
    let ir = compile_ok("println(PI);");
    let instructions = &ir.main.labels()[0].instructions;
    let Instruction::Load(pi) = instructions[0] else {
        panic!("expected load of PI");
    };
    assert_eq!(ir.variable(pi).class, StorageClass::Native);
    assert_eq!(instructions[2], Instruction::Call(1));
}

#[test]
fn test_shadowing_in_nested_block() {
    let ir = compile_ok("var x = 1; { var x = 2; x = 3; }");
    assert_eq!(ir.variables.iter().filter(|v| v.name == "x").count(), 2);
}

#[test]
fn test_array_and_index() {
    let ir = compile_ok("var xs = [1, 2]; xs[0] = xs[1];");
    let instructions = &ir.main.labels()[0].instructions;
    assert_eq!(instructions[2], Instruction::MakeArray(2));
    assert!(instructions.contains(&Instruction::GetIndex));
    assert!(instructions.contains(&Instruction::SetIndex));
}

#[test]
fn test_break_outside_loop() {
    let errors = compile_err("break;");
    assert_eq!(errors, vec!["A break statement may only appear in a loop."]);
}

#[test]
fn test_continue_outside_loop() {
    let errors = compile_err("continue;");
    assert_eq!(errors, vec!["A continue statement may only appear in a loop."]);
}

#[test]
fn test_break_does_not_escape_function() {
    let errors = compile_err("while (true) { function f() { break; } }");
    assert_eq!(errors, vec!["A break statement may only appear in a loop."]);
}

#[test]
fn test_return_outside_function() {
    let errors = compile_err("return 1;");
    assert_eq!(errors, vec!["A return statement may only appear in a function."]);
}

#[test]
fn test_undeclared_variable() {
    let errors = compile_err("y = 1;");
    assert_eq!(errors, vec!["Variable \"y\" does not exist."]);
}

#[test]
fn test_redeclaration_in_same_scope() {
    let errors = compile_err("var x = 1; var x = 2;");
    assert_eq!(errors, vec!["Variable \"x\" has already been declared in this scope."]);
}

#[test]
fn test_duplicate_parameter() {
    let errors = compile_err("function f(a, a) {}");
    assert_eq!(errors, vec!["Variable \"a\" has already been declared in this scope."]);
}

#[test]
fn test_assign_to_constant() {
    let errors = compile_err("const x = 1; x = 2;");
    assert_eq!(errors, vec!["Cannot assign a value to constant variable \"x\""]);
    let errors = compile_err("println = 2;");
    assert_eq!(errors, vec!["Cannot assign a value to constant variable \"println\""]);
}

#[test]
fn test_closure_capture_is_rejected() {
    let errors = compile_err("function outer() { var v = 1; function inner() { return v; } }");
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("closures are not supported"));
}

#[test]
fn test_capture_of_block_scoped_top_level_variable() {
    let errors = compile_err("{ var x = 1; function g() { return x; } }");
    assert_eq!(
        errors,
        vec![
            "Variable \"x\" belongs to an enclosing block of top-level code; closures are not supported."
        ]
    );

    let errors = compile_err("function outer() { var v = 1; function inner() { return v; } }");
    assert!(errors[0].contains("belongs to an enclosing function;"), "{:?}", errors);
}

#[test]
fn test_globals_are_not_captures() {
    compile_ok("var g = 1; function f() { return g + 1; }");
}

#[test]
fn test_initializer_cannot_see_its_own_name() {
    let errors = compile_err("var x = x;");
    assert_eq!(errors, vec!["Variable \"x\" does not exist."]);
}

#[test]
fn test_literal_call_and_index_are_rejected() {
    assert_eq!(compile_err("1(2);"), vec!["Cannot call a number literal."]);
    assert_eq!(compile_err("null[0];"), vec!["Cannot index a null literal."]);
    compile_ok("\"abc\"[0];");
}

#[test]
fn test_errors_accumulate() {
    let errors = compile_err("break; var a = b; function f() { continue; } return;");
    assert_eq!(errors.len(), 4);
}
