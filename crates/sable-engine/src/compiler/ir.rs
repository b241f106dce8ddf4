// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Label-based intermediate representation.
//!
//! A [`Block`] is an ordered list of [`Label`]s, each holding straight-line
//! [`Instruction`]s. Jumps name their target label symbolically; byte
//! offsets only appear once the transpiler lays the labels out.
//!
//! Every label except the last ends in a jump. [`Block::new_label`] and
//! [`Block::bind_label`] enforce this by appending a `Goto` to the label
//! they are closing whenever it does not already end in one.

use std::fmt;
use std::rc::Rc;

use crate::ast::{BinaryOperator, UnaryOperator};
use crate::runtime::value::{FunctionIndex, Value};

/// Scope index given to variables that live outside every user scope.
pub const GLOBAL_SCOPE_INDEX: i32 = -1;

// ============================================================================
// Variables
// ============================================================================

/// Handle to a [`Variable`] owned by the compilation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VariableId(pub u32);

/// How and where a variable is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageClass {
    /// Top-level `const` or function name
    GlobalConstant,
    /// Top-level `var`
    GlobalMutable,
    /// `const` inside a function body
    FunctionConstant,
    /// `var` or parameter inside a function body
    FunctionMutable,
    /// Function constant referenced from a nested function
    ClosedConstant,
    /// Function variable referenced from a nested function
    ClosedMutable,
    /// Entry of the native table
    Native,
}

impl StorageClass {
    /// True if assignments to the variable are rejected.
    pub fn is_constant(self) -> bool {
        matches!(
            self,
            StorageClass::GlobalConstant
                | StorageClass::FunctionConstant
                | StorageClass::ClosedConstant
                | StorageClass::Native
        )
    }

    /// True for the two global classes.
    pub fn is_global(self) -> bool {
        matches!(self, StorageClass::GlobalConstant | StorageClass::GlobalMutable)
    }

    /// The class a captured variable of this class moves to.
    pub fn closed(self) -> StorageClass {
        match self {
            StorageClass::GlobalConstant
            | StorageClass::FunctionConstant
            | StorageClass::ClosedConstant => StorageClass::ClosedConstant,
            StorageClass::GlobalMutable
            | StorageClass::FunctionMutable
            | StorageClass::ClosedMutable => StorageClass::ClosedMutable,
            StorageClass::Native => StorageClass::Native,
        }
    }
}

/// A declared variable.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    /// Declared name
    pub name: String,
    /// Storage class; becomes Closed at most once
    pub class: StorageClass,
    /// Depth of the declaring scope, [`GLOBAL_SCOPE_INDEX`] for natives
    pub scope_index: i32,
    /// Function whose body declared it, `None` for top-level code
    pub function: Option<FunctionIndex>,
}

// ============================================================================
// Instructions
// ============================================================================

/// A symbolic jump target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LabelId(pub u32);

impl fmt::Display for LabelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ".L{}", self.0)
    }
}

/// An IR instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    /// Discard the top of stack
    Pop,
    /// Push true
    True,
    /// Push false
    False,
    /// Push null
    Null,
    /// Return the top of stack from the current function
    Return,
    /// Stop the program
    Exit,
    /// Jump unconditionally
    Goto(LabelId),
    /// Pop, jump if falsey
    PopJumpIfZero(LabelId),
    /// Pop, jump if truthy
    PopJumpIfNonzero(LabelId),
    /// Pop two operands, push the result
    BinaryOp(BinaryOperator),
    /// Pop one operand, push the result
    UnaryOp(UnaryOperator),
    /// Push a number
    Number(f64),
    /// Push a string
    String(Rc<str>),
    /// Pop n elements, push an array of them
    MakeArray(u32),
    /// Push a reference to a program function
    GetFunctionReference(FunctionIndex),
    /// Push a variable's value
    Load(VariableId),
    /// Pop into a variable
    Store(VariableId),
    /// Pop a callee and n arguments, push the result
    Call(u8),
    /// Turn a function reference into a callable value
    MakeFunction,
    /// Pop index and target, push `target[index]`
    GetIndex,
    /// Pop value, index and target, store, push value
    SetIndex,
}

impl Instruction {
    /// True for instructions that push a value known at compile time with
    /// no other effect.
    pub fn is_constant(&self) -> bool {
        self.constant_truthiness().is_some()
    }

    /// Truthiness of a constant instruction, `None` for anything else.
    pub fn constant_truthiness(&self) -> Option<bool> {
        match self {
            Instruction::True => Some(true),
            Instruction::False | Instruction::Null => Some(false),
            Instruction::Number(n) => Some(!n.is_nan() && *n != 0.0),
            Instruction::String(s) => Some(!s.is_empty()),
            // Only the empty array is free of operands.
            Instruction::MakeArray(0) => Some(false),
            Instruction::GetFunctionReference(_) => Some(true),
            _ => None,
        }
    }

    /// The value a constant instruction pushes.
    pub fn constant_value(&self) -> Option<Value> {
        let value = match self {
            Instruction::True => Value::Boolean(true),
            Instruction::False => Value::Boolean(false),
            Instruction::Null => Value::Null,
            Instruction::Number(n) => Value::Number(*n),
            Instruction::String(s) => Value::String(Rc::clone(s)),
            Instruction::MakeArray(0) => Value::array(Vec::new()),
            Instruction::GetFunctionReference(index) => Value::Function(*index),
            _ => return None,
        };
        Some(value)
    }

    /// The constant instruction that pushes `value`, if one exists.
    pub fn from_value(value: &Value) -> Option<Instruction> {
        let instruction = match value {
            Value::Boolean(true) => Instruction::True,
            Value::Boolean(false) => Instruction::False,
            Value::Null => Instruction::Null,
            Value::Number(n) => Instruction::Number(*n),
            Value::String(s) => Instruction::String(Rc::clone(s)),
            Value::Function(index) => Instruction::GetFunctionReference(*index),
            Value::Array(_) | Value::Native(_) => return None,
        };
        Some(instruction)
    }

    /// The label a jump instruction targets.
    pub fn jump_target(&self) -> Option<LabelId> {
        match self {
            Instruction::Goto(label)
            | Instruction::PopJumpIfZero(label)
            | Instruction::PopJumpIfNonzero(label) => Some(*label),
            _ => None,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Pop => write!(f, "Pop"),
            Instruction::True => write!(f, "True"),
            Instruction::False => write!(f, "False"),
            Instruction::Null => write!(f, "Null"),
            Instruction::Return => write!(f, "Return"),
            Instruction::Exit => write!(f, "Exit"),
            Instruction::Goto(label) => write!(f, "Goto {}", label),
            Instruction::PopJumpIfZero(label) => write!(f, "PopJumpIfZero {}", label),
            Instruction::PopJumpIfNonzero(label) => write!(f, "PopJumpIfNonzero {}", label),
            Instruction::BinaryOp(op) => write!(f, "BinaryOp {}", op),
            Instruction::UnaryOp(op) => write!(f, "UnaryOp {}", op),
            Instruction::Number(n) => write!(f, "Number {}", n),
            Instruction::String(s) => write!(f, "String {:?}", s),
            Instruction::MakeArray(n) => write!(f, "MakeArray {}", n),
            Instruction::GetFunctionReference(i) => write!(f, "GetFunctionReference {}", i),
            Instruction::Load(v) => write!(f, "Load v{}", v.0),
            Instruction::Store(v) => write!(f, "Store v{}", v.0),
            Instruction::Call(n) => write!(f, "Call {}", n),
            Instruction::MakeFunction => write!(f, "MakeFunction"),
            Instruction::GetIndex => write!(f, "GetIndex"),
            Instruction::SetIndex => write!(f, "SetIndex"),
        }
    }
}

// ============================================================================
// Labels and blocks
// ============================================================================

/// A named run of instructions.
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    /// The label's name
    pub id: LabelId,
    /// The label's instructions
    pub instructions: Vec<Instruction>,
}

impl Label {
    /// Creates an empty label.
    pub fn new(id: LabelId) -> Self {
        Self {
            id,
            instructions: Vec::new(),
        }
    }

    /// True if the label ends in a jump, as lowering guarantees for every
    /// label but the last. The optimizer may fold such a jump away.
    pub fn is_terminated(&self) -> bool {
        self.instructions
            .last()
            .and_then(Instruction::jump_target)
            .is_some()
    }
}

/// An ordered sequence of labels: the body of `main` or of one function.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Block {
    labels: Vec<Label>,
    next_label: u32,
}

impl Block {
    /// Creates an empty block.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves a label name without creating the label.
    ///
    /// Instructions may jump to the name right away; the label itself is
    /// created later with [`Block::bind_label`].
    pub fn reserve_label(&mut self) -> LabelId {
        let id = LabelId(self.next_label);
        self.next_label += 1;
        id
    }

    /// Starts a new label with a fresh name and returns it.
    pub fn new_label(&mut self) -> LabelId {
        let id = self.reserve_label();
        self.bind_label(id);
        id
    }

    /// Starts a new label named `id`, usually one from [`Block::reserve_label`].
    pub fn bind_label(&mut self, id: LabelId) {
        debug_assert!(
            self.labels.iter().all(|label| label.id != id),
            "label {} bound twice",
            id
        );
        if let Some(previous) = self.labels.last_mut() {
            if !matches!(previous.instructions.last(), Some(Instruction::Goto(_))) {
                previous.instructions.push(Instruction::Goto(id));
            }
        }
        self.labels.push(Label::new(id));
    }

    /// Appends to the current label, creating one first if the block is empty.
    pub fn add_instruction(&mut self, instruction: Instruction) {
        if self.labels.is_empty() {
            self.new_label();
        }
        if let Some(label) = self.labels.last_mut() {
            label.instructions.push(instruction);
        }
    }

    /// The labels in layout order.
    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    /// Number of labels.
    pub fn label_count(&self) -> usize {
        self.labels.len()
    }

    /// Total instructions across all labels.
    pub fn instruction_count(&self) -> usize {
        self.labels.iter().map(|label| label.instructions.len()).sum()
    }

    /// Rebuilds the block label by label, keeping names and the name counter.
    pub fn map_labels(&self, mut rewrite: impl FnMut(&Label) -> Vec<Instruction>) -> Block {
        Block {
            labels: self
                .labels
                .iter()
                .map(|label| Label {
                    id: label.id,
                    instructions: rewrite(label),
                })
                .collect(),
            next_label: self.next_label,
        }
    }
}

/// A function lowered to IR.
#[derive(Debug, Clone, PartialEq)]
pub struct IrFunction {
    /// Declared name
    pub name: String,
    /// Parameters in declaration order; they own local slots `0..arity`
    pub parameters: Vec<VariableId>,
    /// The function body
    pub block: Block,
}

impl IrFunction {
    /// Number of declared parameters.
    pub fn arity(&self) -> u8 {
        self.parameters.len() as u8
    }
}

/// A whole program lowered to IR.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelIr {
    /// Top-level code
    pub main: Block,
    /// Program functions, indexed by [`FunctionIndex`]
    pub functions: Vec<IrFunction>,
    /// Every variable the program declared, indexed by [`VariableId`]
    pub variables: Vec<Variable>,
}

impl LabelIr {
    /// Looks up a variable record.
    pub fn variable(&self, id: VariableId) -> &Variable {
        &self.variables[id.0 as usize]
    }

    fn fmt_block(&self, f: &mut fmt::Formatter<'_>, block: &Block) -> fmt::Result {
        for label in block.labels() {
            writeln!(f, "{}:", label.id)?;
            for instruction in &label.instructions {
                match instruction {
                    Instruction::Load(v) => writeln!(f, "    Load {}", self.variable(*v).name)?,
                    Instruction::Store(v) => writeln!(f, "    Store {}", self.variable(*v).name)?,
                    other => writeln!(f, "    {}", other)?,
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for LabelIr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "main:")?;
        self.fmt_block(f, &self.main)?;
        for (index, function) in self.functions.iter().enumerate() {
            writeln!(f)?;
            writeln!(
                f,
                "function #{} {}({}):",
                index,
                function.name,
                function.arity()
            )?;
            self.fmt_block(f, &function.block)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_instruction_creates_first_label() {
        let mut block = Block::new();
        block.add_instruction(Instruction::Number(1.0));
        assert_eq!(block.label_count(), 1);
        assert_eq!(block.labels()[0].instructions, vec![Instruction::Number(1.0)]);
    }

    #[test]
    fn test_new_label_terminates_previous() {
        let mut block = Block::new();
        block.add_instruction(Instruction::Number(1.0));
        let second = block.new_label();
        block.add_instruction(Instruction::Pop);

        assert_eq!(
            block.labels()[0].instructions,
            vec![Instruction::Number(1.0), Instruction::Goto(second)]
        );
        assert_eq!(block.labels()[1].id, second);
    }

    #[test]
    fn test_empty_label_gets_goto() {
        let mut block = Block::new();
        let first = block.new_label();
        let second = block.new_label();
        assert_eq!(block.labels()[0].id, first);
        assert_eq!(block.labels()[0].instructions, vec![Instruction::Goto(second)]);
    }

    #[test]
    fn test_existing_goto_is_kept() {
        let mut block = Block::new();
        let target = block.reserve_label();
        block.add_instruction(Instruction::Goto(target));
        block.new_label();
        block.bind_label(target);
        assert_eq!(block.labels()[0].instructions, vec![Instruction::Goto(target)]);
    }

    #[test]
    fn test_conditional_jump_still_gets_fallthrough() {
        let mut block = Block::new();
        let target = block.reserve_label();
        block.add_instruction(Instruction::True);
        block.add_instruction(Instruction::PopJumpIfZero(target));
        let next = block.new_label();
        assert_eq!(
            block.labels()[0].instructions,
            vec![
                Instruction::True,
                Instruction::PopJumpIfZero(target),
                Instruction::Goto(next)
            ]
        );
    }

    #[test]
    fn test_all_but_last_label_terminated() {
        let mut block = Block::new();
        let end = block.reserve_label();
        block.add_instruction(Instruction::False);
        block.add_instruction(Instruction::PopJumpIfZero(end));
        block.new_label();
        block.add_instruction(Instruction::Number(2.0));
        block.add_instruction(Instruction::Pop);
        block.new_label();
        block.bind_label(end);
        block.add_instruction(Instruction::Exit);

        let labels = block.labels();
        assert!(labels[..labels.len() - 1].iter().all(Label::is_terminated));
        assert!(!labels[labels.len() - 1].is_terminated());
    }

    #[test]
    fn test_reserved_names_are_unique() {
        let mut block = Block::new();
        let a = block.reserve_label();
        let b = block.new_label();
        let c = block.reserve_label();
        assert_ne!(a, b);
        assert_ne!(b, c);
        assert_ne!(a, c);
    }

    #[test]
    fn test_constant_truthiness() {
        assert_eq!(Instruction::True.constant_truthiness(), Some(true));
        assert_eq!(Instruction::False.constant_truthiness(), Some(false));
        assert_eq!(Instruction::Null.constant_truthiness(), Some(false));
        assert_eq!(Instruction::Number(0.0).constant_truthiness(), Some(false));
        assert_eq!(Instruction::Number(3.0).constant_truthiness(), Some(true));
        assert_eq!(Instruction::String("".into()).constant_truthiness(), Some(false));
        assert_eq!(Instruction::MakeArray(0).constant_truthiness(), Some(false));
        assert_eq!(Instruction::GetFunctionReference(0).constant_truthiness(), Some(true));
        assert!(!Instruction::MakeArray(2).is_constant());
        assert!(!Instruction::Load(VariableId(0)).is_constant());
    }

    #[test]
    fn test_value_conversion() {
        for instruction in [
            Instruction::True,
            Instruction::False,
            Instruction::Null,
            Instruction::Number(2.5),
            Instruction::String("s".into()),
            Instruction::GetFunctionReference(4),
        ] {
            let value = instruction.constant_value().unwrap();
            assert_eq!(Instruction::from_value(&value), Some(instruction));
        }
        assert_eq!(Instruction::from_value(&Value::array(vec![])), None);
    }

    #[test]
    fn test_storage_class_transitions() {
        assert_eq!(StorageClass::FunctionMutable.closed(), StorageClass::ClosedMutable);
        assert_eq!(StorageClass::FunctionConstant.closed(), StorageClass::ClosedConstant);
        assert!(StorageClass::Native.is_constant());
        assert!(StorageClass::GlobalMutable.is_global());
        assert!(!StorageClass::ClosedMutable.is_global());
    }
}
