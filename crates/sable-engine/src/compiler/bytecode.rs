// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Bytecode definitions.
//!
//! A [`Chunk`] is a flat byte buffer holding one function's code. Every
//! instruction is a one-byte [`OpCode`] followed by an operand whose width
//! is fixed by the opcode:
//!
//! | operand              | width |
//! |----------------------|-------|
//! | address, slot, index | 4     |
//! | operator tag         | 1     |
//! | call argument count  | 1     |
//! | number literal       | 8     |
//!
//! Multi-byte fields use the chunk's [`Endianness`].

use std::fmt;

use crate::ast::{BinaryOperator, UnaryOperator};

/// Absolute byte offset into a chunk.
pub type Address = u32;

/// Width of an address, slot or index operand.
pub const ADDRESS_WIDTH: usize = 4;

/// Byte order for multi-byte operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    /// Least significant byte first
    Little,
    /// Most significant byte first
    Big,
}

impl Endianness {
    /// The host's byte order.
    pub const NATIVE: Endianness = if cfg!(target_endian = "big") {
        Endianness::Big
    } else {
        Endianness::Little
    };
}

impl Default for Endianness {
    fn default() -> Self {
        Endianness::NATIVE
    }
}

/// Operation codes for the VM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpCode {
    // Stack operations
    /// Discard the top value
    Pop,

    // Control flow
    /// Jump to an address
    Goto,
    /// Pop; jump if falsey
    PopJumpIfZero,
    /// Pop; jump if truthy
    PopJumpIfNonzero,

    // Operators
    /// Pop two values, push the result of the operator byte
    BinaryOp,
    /// Pop one value, push the result of the operator byte
    UnaryOp,

    // Constants
    /// Push true
    True,
    /// Push false
    False,
    /// Push null
    Null,
    /// Push an inline number
    Number,
    /// Push a copy of a constant-pool entry
    LoadConst,

    // Arrays
    /// Pop N values, push them as a new array
    MakeArray,
    /// Pop index and target, push `target[index]`
    GetIndex,
    /// Pop value, index and target, store and push value
    SetIndex,

    // Functions
    /// Pop the callee, call it with the N values below it
    Call,
    /// Leave the current frame
    Return,
    /// Turn a function reference into a callable value
    MakeFunction,

    // Variables
    /// Push a global slot
    LoadGlobal,
    /// Store the top value into a global slot, popping it
    StoreGlobal,
    /// Push a local slot of the current frame
    LoadFrameVar,
    /// Store the top value into a local slot, popping it
    StoreFrameVar,
    /// Push an entry of the native table
    LoadNative,

    /// Stop the program
    Exit,
}

impl OpCode {
    /// Every opcode, in byte order.
    pub const ALL: [OpCode; 23] = [
        OpCode::Pop,
        OpCode::Goto,
        OpCode::PopJumpIfZero,
        OpCode::PopJumpIfNonzero,
        OpCode::BinaryOp,
        OpCode::UnaryOp,
        OpCode::True,
        OpCode::False,
        OpCode::Null,
        OpCode::Number,
        OpCode::LoadConst,
        OpCode::MakeArray,
        OpCode::GetIndex,
        OpCode::SetIndex,
        OpCode::Call,
        OpCode::Return,
        OpCode::MakeFunction,
        OpCode::LoadGlobal,
        OpCode::StoreGlobal,
        OpCode::LoadFrameVar,
        OpCode::StoreFrameVar,
        OpCode::LoadNative,
        OpCode::Exit,
    ];

    /// Decodes an opcode byte.
    pub fn from_byte(byte: u8) -> Option<Self> {
        Self::ALL.get(byte as usize).copied()
    }

    /// Number of operand bytes following the opcode.
    pub fn operand_width(self) -> usize {
        match self {
            OpCode::Pop
            | OpCode::True
            | OpCode::False
            | OpCode::Null
            | OpCode::GetIndex
            | OpCode::SetIndex
            | OpCode::Return
            | OpCode::MakeFunction
            | OpCode::Exit => 0,
            OpCode::BinaryOp | OpCode::UnaryOp | OpCode::Call => 1,
            OpCode::Number => 8,
            OpCode::Goto
            | OpCode::PopJumpIfZero
            | OpCode::PopJumpIfNonzero
            | OpCode::LoadConst
            | OpCode::MakeArray
            | OpCode::LoadGlobal
            | OpCode::StoreGlobal
            | OpCode::LoadFrameVar
            | OpCode::StoreFrameVar
            | OpCode::LoadNative => ADDRESS_WIDTH,
        }
    }

    /// True for the three jump opcodes.
    pub fn is_jump(self) -> bool {
        matches!(
            self,
            OpCode::Goto | OpCode::PopJumpIfZero | OpCode::PopJumpIfNonzero
        )
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A decoded operand.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operand {
    /// No operand
    None,
    /// Jump target
    Address(Address),
    /// Constant-pool index, variable slot or native index
    Index(u32),
    /// Element count of `MakeArray`
    Count(u32),
    /// Argument count of `Call`
    ArgCount(u8),
    /// Binary operator tag
    Binary(BinaryOperator),
    /// Unary operator tag
    Unary(UnaryOperator),
    /// Inline number literal
    Number(f64),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::None => Ok(()),
            Operand::Address(address) => write!(f, "@{}", address),
            Operand::Index(index) => write!(f, "#{}", index),
            Operand::Count(count) => write!(f, "{}", count),
            Operand::ArgCount(count) => write!(f, "{}", count),
            Operand::Binary(operator) => write!(f, "{}", operator),
            Operand::Unary(operator) => write!(f, "{}", operator),
            Operand::Number(n) => write!(f, "{}", n),
        }
    }
}

/// One decoded instruction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decoded {
    /// Offset of the opcode byte
    pub offset: usize,
    /// The operation
    pub opcode: OpCode,
    /// Its operand
    pub operand: Operand,
    /// Total bytes, opcode included
    pub width: usize,
}

impl Decoded {
    /// Offset of the next instruction.
    pub fn next(&self) -> usize {
        self.offset + self.width
    }
}

/// A compiled bytecode chunk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Chunk {
    code: Vec<u8>,
    endianness: Endianness,
}

impl Chunk {
    /// Creates an empty chunk in the host byte order.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty chunk with an explicit byte order.
    pub fn with_endianness(endianness: Endianness) -> Self {
        Self {
            code: Vec::new(),
            endianness,
        }
    }

    /// The byte order of multi-byte operands.
    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    /// The raw bytes.
    pub fn code(&self) -> &[u8] {
        &self.code
    }

    /// Number of bytes emitted so far.
    pub fn len(&self) -> usize {
        self.code.len()
    }

    /// True if nothing has been emitted.
    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// Appends an opcode.
    pub fn push_opcode(&mut self, opcode: OpCode) {
        self.code.push(opcode as u8);
    }

    /// Appends one byte.
    pub fn push_u8(&mut self, value: u8) {
        self.code.push(value);
    }

    /// Appends a four-byte field.
    pub fn push_u32(&mut self, value: u32) {
        let bytes = match self.endianness {
            Endianness::Little => value.to_le_bytes(),
            Endianness::Big => value.to_be_bytes(),
        };
        self.code.extend_from_slice(&bytes);
    }

    /// Appends an eight-byte float.
    pub fn push_f64(&mut self, value: f64) {
        let bytes = match self.endianness {
            Endianness::Little => value.to_le_bytes(),
            Endianness::Big => value.to_be_bytes(),
        };
        self.code.extend_from_slice(&bytes);
    }

    /// Appends a zeroed address and returns its offset for
    /// [`Chunk::insert_address`].
    pub fn reserve_address(&mut self) -> usize {
        let offset = self.code.len();
        self.push_u32(0);
        offset
    }

    /// Overwrites the four bytes at `offset` with `address`.
    ///
    /// # Panics
    ///
    /// Panics if `offset` does not leave room for a full address.
    pub fn insert_address(&mut self, offset: usize, address: Address) {
        let bytes = match self.endianness {
            Endianness::Little => address.to_le_bytes(),
            Endianness::Big => address.to_be_bytes(),
        };
        self.code[offset..offset + ADDRESS_WIDTH].copy_from_slice(&bytes);
    }

    /// Reads one byte. Returns the value and the bytes consumed.
    pub fn read_u8(&self, offset: usize) -> (u8, usize) {
        (self.code[offset], 1)
    }

    /// Reads a four-byte field.
    pub fn read_u32(&self, offset: usize) -> (u32, usize) {
        let bytes: [u8; 4] = self.bytes_at(offset);
        let value = match self.endianness {
            Endianness::Little => u32::from_le_bytes(bytes),
            Endianness::Big => u32::from_be_bytes(bytes),
        };
        (value, 4)
    }

    /// Reads an eight-byte float.
    pub fn read_f64(&self, offset: usize) -> (f64, usize) {
        let bytes: [u8; 8] = self.bytes_at(offset);
        let value = match self.endianness {
            Endianness::Little => f64::from_le_bytes(bytes),
            Endianness::Big => f64::from_be_bytes(bytes),
        };
        (value, 8)
    }

    fn bytes_at<const N: usize>(&self, offset: usize) -> [u8; N] {
        let mut bytes = [0; N];
        bytes.copy_from_slice(&self.code[offset..offset + N]);
        bytes
    }

    /// Decodes the instruction starting at `offset`.
    ///
    /// # Panics
    ///
    /// Panics on an unknown opcode or operator byte; both mean the chunk was
    /// not produced by the transpiler.
    pub fn decode(&self, offset: usize) -> Decoded {
        let (byte, _) = self.read_u8(offset);
        let opcode = OpCode::from_byte(byte)
            .unwrap_or_else(|| panic!("internal error: unknown opcode {:#04x} at {}", byte, offset));
        let at = offset + 1;

        let operand = match opcode {
            OpCode::Goto | OpCode::PopJumpIfZero | OpCode::PopJumpIfNonzero => {
                Operand::Address(self.read_u32(at).0)
            }
            OpCode::LoadConst
            | OpCode::LoadGlobal
            | OpCode::StoreGlobal
            | OpCode::LoadFrameVar
            | OpCode::StoreFrameVar
            | OpCode::LoadNative => Operand::Index(self.read_u32(at).0),
            OpCode::MakeArray => Operand::Count(self.read_u32(at).0),
            OpCode::Call => Operand::ArgCount(self.read_u8(at).0),
            OpCode::BinaryOp => {
                let (tag, _) = self.read_u8(at);
                Operand::Binary(BinaryOperator::from_byte(tag).unwrap_or_else(|| {
                    panic!("internal error: unknown binary operator {} at {}", tag, offset)
                }))
            }
            OpCode::UnaryOp => {
                let (tag, _) = self.read_u8(at);
                Operand::Unary(UnaryOperator::from_byte(tag).unwrap_or_else(|| {
                    panic!("internal error: unknown unary operator {} at {}", tag, offset)
                }))
            }
            OpCode::Number => Operand::Number(self.read_f64(at).0),
            _ => Operand::None,
        };

        Decoded {
            offset,
            opcode,
            operand,
            width: 1 + opcode.operand_width(),
        }
    }

    /// Decodes the whole chunk in order.
    pub fn instructions(&self) -> Instructions<'_> {
        Instructions {
            chunk: self,
            offset: 0,
        }
    }
}

/// Iterator over the decoded instructions of a chunk.
pub struct Instructions<'a> {
    chunk: &'a Chunk,
    offset: usize,
}

impl Iterator for Instructions<'_> {
    type Item = Decoded;

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.chunk.len() {
            return None;
        }
        let decoded = self.chunk.decode(self.offset);
        self.offset = decoded.next();
        Some(decoded)
    }
}

impl fmt::Display for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for decoded in self.instructions() {
            writeln!(
                f,
                "{:>6}  {:<16} {}",
                decoded.offset, decoded.opcode, decoded.operand
            )?;
        }
        Ok(())
    }
}
