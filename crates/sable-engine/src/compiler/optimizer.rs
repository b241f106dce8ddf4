// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Peephole optimizer over label IR.
//!
//! Each label is rewritten on its own in one left-to-right pass; nothing is
//! moved across a label boundary because control can enter a label from
//! several places. For every incoming instruction the pass looks at the tail
//! of what it has already emitted and tries, in order:
//!
//! 1. **Jump folding**: `<const> PopJumpIf*` becomes `Goto` or nothing.
//! 2. **Binary folding**: `<const> <const> BinaryOp` becomes one constant.
//! 3. **Unary folding**: `<const> UnaryOp` becomes one constant.
//! 4. **Dead-pop elimination**: `<const> Pop` disappears.
//!
//! Folding evaluates through [`crate::runtime::operations`], the same code
//! the interpreter runs, and gives up whenever evaluation fails, so errors
//! like division by zero still surface at run time.

use crate::compiler::ir::{Block, Instruction, LabelIr};
use crate::runtime::operations;

/// Optimizes main and every function block.
pub fn optimize(ir: &LabelIr) -> LabelIr {
    let optimized = LabelIr {
        main: optimize_block(&ir.main),
        functions: ir
            .functions
            .iter()
            .map(|function| {
                let mut function = function.clone();
                function.block = optimize_block(&function.block);
                function
            })
            .collect(),
        variables: ir.variables.clone(),
    };

    tracing::debug!(
        before = count_instructions(ir),
        after = count_instructions(&optimized),
        "optimized label IR"
    );
    optimized
}

fn count_instructions(ir: &LabelIr) -> usize {
    ir.main.instruction_count()
        + ir
            .functions
            .iter()
            .map(|function| function.block.instruction_count())
            .sum::<usize>()
}

/// Optimizes each label of `block` independently.
pub fn optimize_block(block: &Block) -> Block {
    block.map_labels(|label| optimize_label(&label.instructions))
}

/// Runs the peephole rules over one label's instructions.
pub fn optimize_label(instructions: &[Instruction]) -> Vec<Instruction> {
    let mut out: Vec<Instruction> = Vec::with_capacity(instructions.len());

    for instruction in instructions {
        if let Some(rewrite) = fold(&out, instruction) {
            tracing::trace!(%instruction, ?rewrite, "peephole rewrite");
            out.truncate(out.len() - rewrite.consumed);
            out.extend(rewrite.replacement);
        } else {
            out.push(instruction.clone());
        }
    }

    out
}

/// Outcome of a rule: drop `consumed` emitted instructions and the incoming
/// one, then emit `replacement`.
#[derive(Debug)]
struct Rewrite {
    consumed: usize,
    replacement: Option<Instruction>,
}

fn fold(out: &[Instruction], incoming: &Instruction) -> Option<Rewrite> {
    let last = out.last()?;

    match incoming {
        Instruction::PopJumpIfZero(target) | Instruction::PopJumpIfNonzero(target) => {
            let truthy = last.constant_truthiness()?;
            let jumps_on_truthy = matches!(incoming, Instruction::PopJumpIfNonzero(_));
            let replacement = (truthy == jumps_on_truthy).then_some(Instruction::Goto(*target));
            Some(Rewrite {
                consumed: 1,
                replacement,
            })
        }
        Instruction::BinaryOp(operator) => {
            let [left, right] = out.last_chunk::<2>()?;
            let result = operations::binary(
                *operator,
                &left.constant_value()?,
                &right.constant_value()?,
            )
            .ok()?;
            Some(Rewrite {
                consumed: 2,
                replacement: Some(Instruction::from_value(&result)?),
            })
        }
        Instruction::UnaryOp(operator) => {
            let result = operations::unary(*operator, &last.constant_value()?).ok()?;
            Some(Rewrite {
                consumed: 1,
                replacement: Some(Instruction::from_value(&result)?),
            })
        }
        Instruction::Pop if last.is_constant() => Some(Rewrite {
            consumed: 1,
            replacement: None,
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BinaryOperator, UnaryOperator};
    use crate::compiler::ir::{LabelId, VariableId};

    const TARGET: LabelId = LabelId(7);

    #[test]
    fn test_jump_if_zero_on_falsey_constant_becomes_goto() {
        let out = optimize_label(&[Instruction::False, Instruction::PopJumpIfZero(TARGET)]);
        assert_eq!(out, vec![Instruction::Goto(TARGET)]);
    }

    #[test]
    fn test_jump_if_zero_on_truthy_constant_disappears() {
        let out = optimize_label(&[Instruction::Number(1.0), Instruction::PopJumpIfZero(TARGET)]);
        assert_eq!(out, vec![]);
    }

    #[test]
    fn test_jump_if_nonzero_on_truthy_constant_becomes_goto() {
        let out = optimize_label(&[
            Instruction::String("x".into()),
            Instruction::PopJumpIfNonzero(TARGET),
        ]);
        assert_eq!(out, vec![Instruction::Goto(TARGET)]);
    }

    #[test]
    fn test_jump_if_nonzero_on_falsey_constant_disappears() {
        let out = optimize_label(&[Instruction::Null, Instruction::PopJumpIfNonzero(TARGET)]);
        assert_eq!(out, vec![]);
    }

    #[test]
    fn test_jump_after_non_constant_is_kept() {
        let input = [Instruction::Load(VariableId(0)), Instruction::PopJumpIfZero(TARGET)];
        assert_eq!(optimize_label(&input), input.to_vec());
    }

    #[test]
    fn test_binary_folding() {
        let out = optimize_label(&[
            Instruction::Number(1.0),
            Instruction::Number(2.0),
            Instruction::BinaryOp(BinaryOperator::Add),
        ]);
        assert_eq!(out, vec![Instruction::Number(3.0)]);

        let out = optimize_label(&[
            Instruction::String("a".into()),
            Instruction::String("b".into()),
            Instruction::BinaryOp(BinaryOperator::Add),
        ]);
        assert_eq!(out, vec![Instruction::String("ab".into())]);

        let out = optimize_label(&[
            Instruction::Number(1.0),
            Instruction::Number(2.0),
            Instruction::BinaryOp(BinaryOperator::Less),
        ]);
        assert_eq!(out, vec![Instruction::True]);
    }

    #[test]
    fn test_chained_folding_within_one_pass() {
        // (1 + 2) * 4
        let out = optimize_label(&[
            Instruction::Number(1.0),
            Instruction::Number(2.0),
            Instruction::BinaryOp(BinaryOperator::Add),
            Instruction::Number(4.0),
            Instruction::BinaryOp(BinaryOperator::Multiply),
        ]);
        assert_eq!(out, vec![Instruction::Number(12.0)]);
    }

    #[test]
    fn test_undefined_operations_are_not_folded() {
        let mismatch = [
            Instruction::String("a".into()),
            Instruction::Number(1.0),
            Instruction::BinaryOp(BinaryOperator::Subtract),
        ];
        assert_eq!(optimize_label(&mismatch), mismatch.to_vec());

        let division = [
            Instruction::Number(1.0),
            Instruction::Number(0.0),
            Instruction::BinaryOp(BinaryOperator::Divide),
        ];
        assert_eq!(optimize_label(&division), division.to_vec());

        let negate_null = [Instruction::Null, Instruction::UnaryOp(UnaryOperator::Negate)];
        assert_eq!(optimize_label(&negate_null), negate_null.to_vec());
    }

    #[test]
    fn test_binary_needs_two_constants() {
        let input = [
            Instruction::Load(VariableId(3)),
            Instruction::Number(2.0),
            Instruction::BinaryOp(BinaryOperator::Add),
        ];
        assert_eq!(optimize_label(&input), input.to_vec());
    }

    #[test]
    fn test_unary_folding() {
        let out = optimize_label(&[
            Instruction::Number(5.0),
            Instruction::UnaryOp(UnaryOperator::Negate),
        ]);
        assert_eq!(out, vec![Instruction::Number(-5.0)]);

        let out = optimize_label(&[Instruction::MakeArray(0), Instruction::UnaryOp(UnaryOperator::Not)]);
        assert_eq!(out, vec![Instruction::True]);
    }

    #[test]
    fn test_dead_pop_elimination() {
        let out = optimize_label(&[Instruction::Number(3.0), Instruction::Pop]);
        assert_eq!(out, vec![]);

        let kept = [Instruction::Call(0), Instruction::Pop];
        assert_eq!(optimize_label(&kept), kept.to_vec());
    }

    #[test]
    fn test_expression_statement_folds_away() {
        let out = optimize_label(&[
            Instruction::Number(1.0),
            Instruction::Number(2.0),
            Instruction::BinaryOp(BinaryOperator::Add),
            Instruction::Pop,
            Instruction::Goto(TARGET),
        ]);
        assert_eq!(out, vec![Instruction::Goto(TARGET)]);
    }

    #[test]
    fn test_labels_are_optimized_independently() {
        let mut block = Block::new();
        block.add_instruction(Instruction::Number(1.0));
        let second = block.new_label();
        block.add_instruction(Instruction::Number(2.0));
        block.add_instruction(Instruction::BinaryOp(BinaryOperator::Add));

        let optimized = optimize_block(&block);
        assert_eq!(optimized.label_count(), 2);
        // The trailing Goto separates the first constant from the BinaryOp.
        assert_eq!(
            optimized.labels()[0].instructions,
            vec![Instruction::Number(1.0), Instruction::Goto(second)]
        );
        assert_eq!(
            optimized.labels()[1].instructions,
            vec![Instruction::Number(2.0), Instruction::BinaryOp(BinaryOperator::Add)]
        );
    }
}
