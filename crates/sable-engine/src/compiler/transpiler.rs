// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Label IR to bytecode.
//!
//! Each block becomes its own [`Chunk`]: main first, then every function in
//! index order. Jumps are emitted with a zeroed address and patched once the
//! whole block has been laid out, since forward targets have no offset yet
//! when the jump is written.
//!
//! Variables get numeric slots here. Globals share one program-wide table in
//! first-seen order; each function numbers its locals separately, with the
//! parameters taking slots `0..arity`.

use std::fmt;

use rustc_hash::FxHashMap;

use super::bytecode::{Address, Chunk, Endianness, OpCode};
use super::ir::{Block, Instruction, LabelId, LabelIr, StorageClass, VariableId};
use crate::builtins;
use crate::runtime::{RuntimeFunction, Value};

/// A transpiled program, ready for the interpreter.
#[derive(Debug, Clone)]
pub struct Executable {
    /// Top-level code
    pub main: Chunk,
    /// Program functions, indexed by function index
    pub functions: Vec<RuntimeFunction>,
    /// Values referenced by `LoadConst`
    pub constants: Vec<Value>,
    /// Global variable names, indexed by slot
    pub global_names: Vec<String>,
}

impl Executable {
    /// Number of global slots the interpreter must allocate.
    pub fn global_count(&self) -> usize {
        self.global_names.len()
    }

    /// Slot assigned to the global `name`.
    pub fn global_slot(&self, name: &str) -> Option<usize> {
        self.global_names.iter().position(|global| global == name)
    }
}

impl fmt::Display for Executable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "== main ({} bytes) ==", self.main.len())?;
        write!(f, "{}", self.main)?;
        for (index, function) in self.functions.iter().enumerate() {
            writeln!(
                f,
                "== function #{} {} (arity {}, locals {}, {} bytes) ==",
                index,
                function.name,
                function.arity,
                function.total_locals,
                function.chunk.len()
            )?;
            write!(f, "{}", function.chunk)?;
        }
        writeln!(f, "== constants ==")?;
        for (index, constant) in self.constants.iter().enumerate() {
            writeln!(f, "{:>6}  {}", index, constant.repr())?;
        }
        writeln!(f, "== globals ==")?;
        for (slot, name) in self.global_names.iter().enumerate() {
            writeln!(f, "{:>6}  {}", slot, name)?;
        }
        Ok(())
    }
}

/// Slot table for one function's locals.
#[derive(Debug, Default)]
struct LocalSlots {
    slots: FxHashMap<VariableId, u32>,
}

impl LocalSlots {
    fn with_parameters(parameters: &[VariableId]) -> Self {
        let mut locals = Self::default();
        for &parameter in parameters {
            locals.slot(parameter);
        }
        locals
    }

    fn slot(&mut self, id: VariableId) -> u32 {
        let next = self.slots.len() as u32;
        *self.slots.entry(id).or_insert(next)
    }

    fn len(&self) -> usize {
        self.slots.len()
    }
}

/// A laid-out block and where each of its labels starts.
struct Assembly {
    chunk: Chunk,
    label_offsets: FxHashMap<LabelId, Address>,
}

/// Turns label IR into an [`Executable`].
pub struct Transpiler<'ir> {
    ir: &'ir LabelIr,
    endianness: Endianness,
    constants: Vec<Value>,
    globals: FxHashMap<VariableId, u32>,
    global_names: Vec<String>,
}

impl<'ir> Transpiler<'ir> {
    /// Creates a transpiler emitting in the host byte order.
    pub fn new(ir: &'ir LabelIr) -> Self {
        Self {
            ir,
            endianness: Endianness::NATIVE,
            constants: Vec::new(),
            globals: FxHashMap::default(),
            global_names: Vec::new(),
        }
    }

    /// Selects the byte order of every emitted chunk.
    pub fn with_endianness(mut self, endianness: Endianness) -> Self {
        self.endianness = endianness;
        self
    }

    /// Emits main and every function.
    ///
    /// # Panics
    ///
    /// Panics if the IR is malformed: a jump to a label the block never
    /// binds, or a variable used outside the code that owns it.
    pub fn transpile(mut self) -> Executable {
        let ir = self.ir;
        let Assembly {
            chunk: main,
            label_offsets,
        } = self.assemble(&ir.main, None);
        tracing::debug!(bytes = main.len(), labels = label_offsets.len(), "emitted main");

        let functions = ir
            .functions
            .iter()
            .map(|function| {
                let mut locals = LocalSlots::with_parameters(&function.parameters);
                let Assembly {
                    chunk,
                    label_offsets,
                } = self.assemble(&function.block, Some(&mut locals));
                tracing::debug!(
                    function = %function.name,
                    bytes = chunk.len(),
                    labels = label_offsets.len(),
                    locals = locals.len(),
                    "emitted function"
                );
                RuntimeFunction {
                    name: function.name.clone(),
                    chunk,
                    arity: function.arity(),
                    total_locals: locals.len(),
                }
            })
            .collect();

        tracing::debug!(
            constants = self.constants.len(),
            globals = self.global_names.len(),
            "transpiled program"
        );

        Executable {
            main,
            functions,
            constants: self.constants,
            global_names: self.global_names,
        }
    }

    fn assemble(&mut self, block: &Block, mut locals: Option<&mut LocalSlots>) -> Assembly {
        let mut chunk = Chunk::with_endianness(self.endianness);
        let mut label_offsets = FxHashMap::default();
        let mut fixups: Vec<(usize, LabelId)> = Vec::new();

        let labels = block.labels();
        for (position, label) in labels.iter().enumerate() {
            label_offsets.insert(label.id, chunk.len() as Address);
            let next = labels.get(position + 1).map(|label| label.id);

            let count = label.instructions.len();
            for (index, instruction) in label.instructions.iter().enumerate() {
                let falls_through = index + 1 == count
                    && matches!(instruction, Instruction::Goto(target) if Some(*target) == next);
                if falls_through {
                    continue;
                }
                self.emit(&mut chunk, instruction, &mut fixups, locals.as_deref_mut());
            }
        }

        for (hole, target) in fixups {
            let address = label_offsets
                .get(&target)
                .copied()
                .unwrap_or_else(|| panic!("internal error: jump to unbound label {}", target));
            chunk.insert_address(hole, address);
        }

        Assembly {
            chunk,
            label_offsets,
        }
    }

    fn emit(
        &mut self,
        chunk: &mut Chunk,
        instruction: &Instruction,
        fixups: &mut Vec<(usize, LabelId)>,
        locals: Option<&mut LocalSlots>,
    ) {
        match instruction {
            Instruction::Pop => chunk.push_opcode(OpCode::Pop),
            Instruction::True => chunk.push_opcode(OpCode::True),
            Instruction::False => chunk.push_opcode(OpCode::False),
            Instruction::Null => chunk.push_opcode(OpCode::Null),
            Instruction::Return => chunk.push_opcode(OpCode::Return),
            Instruction::Exit => chunk.push_opcode(OpCode::Exit),
            Instruction::MakeFunction => chunk.push_opcode(OpCode::MakeFunction),
            Instruction::GetIndex => chunk.push_opcode(OpCode::GetIndex),
            Instruction::SetIndex => chunk.push_opcode(OpCode::SetIndex),

            Instruction::Goto(target) => self.emit_jump(chunk, OpCode::Goto, *target, fixups),
            Instruction::PopJumpIfZero(target) => {
                self.emit_jump(chunk, OpCode::PopJumpIfZero, *target, fixups)
            }
            Instruction::PopJumpIfNonzero(target) => {
                self.emit_jump(chunk, OpCode::PopJumpIfNonzero, *target, fixups)
            }

            Instruction::BinaryOp(operator) => {
                chunk.push_opcode(OpCode::BinaryOp);
                chunk.push_u8(*operator as u8);
            }
            Instruction::UnaryOp(operator) => {
                chunk.push_opcode(OpCode::UnaryOp);
                chunk.push_u8(*operator as u8);
            }

            Instruction::Number(n) => {
                chunk.push_opcode(OpCode::Number);
                chunk.push_f64(*n);
            }
            Instruction::String(s) => self.emit_constant(chunk, Value::String(s.clone())),
            Instruction::GetFunctionReference(index) => {
                self.emit_constant(chunk, Value::Function(*index))
            }

            Instruction::MakeArray(count) => {
                chunk.push_opcode(OpCode::MakeArray);
                chunk.push_u32(*count);
            }
            Instruction::Call(argc) => {
                chunk.push_opcode(OpCode::Call);
                chunk.push_u8(*argc);
            }

            Instruction::Load(id) => self.emit_variable(chunk, *id, false, locals),
            Instruction::Store(id) => self.emit_variable(chunk, *id, true, locals),
        }
    }

    fn emit_jump(
        &mut self,
        chunk: &mut Chunk,
        opcode: OpCode,
        target: LabelId,
        fixups: &mut Vec<(usize, LabelId)>,
    ) {
        debug_assert!(opcode.is_jump(), "{} does not take a label", opcode);
        chunk.push_opcode(opcode);
        fixups.push((chunk.reserve_address(), target));
    }

    fn emit_constant(&mut self, chunk: &mut Chunk, value: Value) {
        let index = self.constants.len() as u32;
        self.constants.push(value);
        chunk.push_opcode(OpCode::LoadConst);
        chunk.push_u32(index);
    }

    fn emit_variable(
        &mut self,
        chunk: &mut Chunk,
        id: VariableId,
        store: bool,
        locals: Option<&mut LocalSlots>,
    ) {
        let variable = self.ir.variable(id);

        let (opcode, slot) = match variable.class {
            StorageClass::GlobalConstant | StorageClass::GlobalMutable => {
                let opcode = if store { OpCode::StoreGlobal } else { OpCode::LoadGlobal };
                (opcode, self.global_slot(id))
            }
            StorageClass::FunctionConstant
            | StorageClass::FunctionMutable
            | StorageClass::ClosedConstant
            | StorageClass::ClosedMutable => {
                let Some(locals) = locals else {
                    panic!(
                        "internal error: local variable \"{}\" used in top-level code",
                        variable.name
                    );
                };
                let opcode = if store { OpCode::StoreFrameVar } else { OpCode::LoadFrameVar };
                (opcode, locals.slot(id))
            }
            StorageClass::Native => {
                if store {
                    panic!("internal error: store to native \"{}\"", variable.name);
                }
                let index = builtins::native_index(&variable.name).unwrap_or_else(|| {
                    panic!("internal error: unknown native \"{}\"", variable.name)
                });
                (OpCode::LoadNative, index)
            }
        };

        chunk.push_opcode(opcode);
        chunk.push_u32(slot);
    }

    fn global_slot(&mut self, id: VariableId) -> u32 {
        if let Some(&slot) = self.globals.get(&id) {
            return slot;
        }
        let slot = self.global_names.len() as u32;
        self.globals.insert(id, slot);
        self.global_names.push(self.ir.variable(id).name.clone());
        slot
    }
}
