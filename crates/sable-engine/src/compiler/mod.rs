// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Compiler back end for Sable.
//!
//! Transforms the AST into bytecode that can be executed by the VM.
//!
//! # Module Structure
//!
//! - `codegen`: lowering from AST to label IR
//!   - `codegen::scope`: scope table for variable resolution
//! - `ir`: labels, blocks and IR instructions
//! - `optimizer`: label-local peephole pass
//! - `transpiler`: label IR to bytecode, address fixup and slot assignment
//! - `bytecode`: chunk encoding and decoding

pub mod bytecode;
pub mod codegen;
pub mod ir;
pub mod optimizer;
pub mod transpiler;

pub use bytecode::{Chunk, Decoded, Endianness, OpCode, Operand};
pub use codegen::Compiler;
pub use ir::{Block, Instruction, LabelId, LabelIr};
pub use optimizer::optimize;
pub use transpiler::{Executable, Transpiler};
