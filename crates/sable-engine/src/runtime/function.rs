// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Function records: compiled program functions, host functions and the
//! call frames the interpreter pushes for them.

use std::fmt;
use std::io::Write;

use super::value::{FunctionIndex, Value};
use crate::compiler::Chunk;

/// A function compiled from the program.
#[derive(Debug, Clone)]
pub struct RuntimeFunction {
    /// Declared name, used in stack traces
    pub name: String,
    /// The function's own bytecode
    pub chunk: Chunk,
    /// Number of declared parameters
    pub arity: u8,
    /// Parameters plus every other local the body uses
    pub total_locals: usize,
}

/// Services the interpreter lends to a host function for one call.
pub struct NativeContext<'a> {
    out: &'a mut dyn Write,
}

impl<'a> NativeContext<'a> {
    /// Creates a context writing program output to `out`.
    pub fn new(out: &'a mut dyn Write) -> Self {
        Self { out }
    }

    /// The program's output stream.
    pub fn out(&mut self) -> &mut dyn Write {
        &mut *self.out
    }
}

/// Signature of a host function.
///
/// `args` is a view of the top `arity` operand-stack values, first argument
/// first. An `Err` becomes a fatal runtime error.
pub type NativeFn = fn(&mut NativeContext<'_>, &[Value]) -> Result<Value, String>;

/// A host (Rust) function callable from Sable.
#[derive(Clone, Copy)]
pub struct NativeFunction {
    /// The function name
    pub name: &'static str,
    /// Exact number of arguments the function takes
    pub arity: u8,
    /// The native function pointer
    pub func: NativeFn,
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeFunction({}/{})", self.name, self.arity)
    }
}

/// A call frame for function execution.
#[derive(Debug)]
pub struct CallFrame {
    /// The function being executed
    pub function: FunctionIndex,
    /// Byte offset of the next instruction in the function's chunk
    pub ip: usize,
    /// Local variable slots, parameters first
    pub locals: Vec<Value>,
}

impl CallFrame {
    /// Creates a frame whose first slots hold `args` and the rest null.
    pub fn new(
        function: FunctionIndex,
        total_locals: usize,
        args: impl IntoIterator<Item = Value>,
    ) -> Self {
        let mut locals: Vec<Value> = args.into_iter().collect();
        locals.resize(total_locals.max(locals.len()), Value::Null);
        Self {
            function,
            ip: 0,
            locals,
        }
    }

    /// Bytes charged against the call-stack budget for a frame with
    /// `total_locals` slots.
    pub fn cost(total_locals: usize) -> usize {
        total_locals * std::mem::size_of::<Value>() + std::mem::size_of::<CallFrame>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_locals_start_with_arguments() {
        let frame = CallFrame::new(3, 4, vec![Value::Number(1.0), Value::Boolean(true)]);
        assert_eq!(frame.function, 3);
        assert_eq!(frame.ip, 0);
        assert_eq!(
            frame.locals,
            vec![Value::Number(1.0), Value::Boolean(true), Value::Null, Value::Null]
        );
    }

    #[test]
    fn test_frame_cost_grows_with_locals() {
        assert!(CallFrame::cost(8) > CallFrame::cost(2));
        assert_eq!(
            CallFrame::cost(8) - CallFrame::cost(2),
            6 * std::mem::size_of::<Value>()
        );
    }

    #[test]
    fn test_native_context_writes_to_output() {
        let mut buffer = Vec::new();
        {
            let mut ctx = NativeContext::new(&mut buffer);
            write!(ctx.out(), "hello").unwrap();
        }
        assert_eq!(buffer, b"hello");
    }
}
