// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The bytecode interpreter.

use std::fmt;
use std::io::{self, Write};

use super::error::RuntimeError;
use crate::builtins;
use crate::compiler::{Decoded, Executable, OpCode, Operand};
use crate::config::EngineConfig;
use crate::runtime::{operations, CallFrame, FunctionIndex, NativeContext, Value};

/// What the loop does after an instruction.
enum Step {
    Continue,
    Exit,
}

/// The virtual machine that executes bytecode.
pub struct VM {
    /// The program being run
    executable: Executable,
    /// Native table, indexed by `LoadNative`
    natives: Vec<Value>,
    /// The operand stack
    stack: Vec<Value>,
    /// Global variable slots
    globals: Vec<Value>,
    /// Instruction pointer of top-level code
    ip: usize,
    /// Active program-function calls
    frames: Vec<CallFrame>,
    /// Bytes charged for the active frames
    call_stack_bytes: usize,
    /// Budget for `call_stack_bytes`
    max_call_stack_bytes: usize,
    /// Where natives write program output
    out: Box<dyn Write>,
}

impl fmt::Debug for VM {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VM")
            .field("ip", &self.ip)
            .field("frames", &self.frames.len())
            .field("stack", &self.stack.len())
            .field("globals", &self.globals.len())
            .field("call_stack_bytes", &self.call_stack_bytes)
            .finish_non_exhaustive()
    }
}

impl VM {
    /// Creates a VM writing program output to stdout.
    pub fn new(executable: Executable, config: &EngineConfig) -> Self {
        Self::with_output(executable, config, Box::new(io::stdout()))
    }

    /// Creates a VM writing program output to `out`.
    pub fn with_output(executable: Executable, config: &EngineConfig, out: Box<dyn Write>) -> Self {
        let globals = vec![Value::Null; executable.global_count()];
        Self {
            executable,
            natives: builtins::native_values(),
            stack: Vec::with_capacity(256),
            globals,
            ip: 0,
            frames: Vec::with_capacity(64),
            call_stack_bytes: 0,
            max_call_stack_bytes: config.max_call_stack_bytes,
            out,
        }
    }

    /// The program being run.
    pub fn executable(&self) -> &Executable {
        &self.executable
    }

    /// Global slots, indexed like [`Executable::global_names`].
    pub fn globals(&self) -> &[Value] {
        &self.globals
    }

    /// Current value of the global `name`.
    pub fn global(&self, name: &str) -> Option<&Value> {
        self.executable
            .global_slot(name)
            .and_then(|slot| self.globals.get(slot))
    }

    /// The operand stack, bottom first.
    pub fn stack(&self) -> &[Value] {
        &self.stack
    }

    /// Runs until top-level code ends, `Exit` executes, or an error occurs.
    pub fn run(&mut self) -> Result<(), RuntimeError> {
        loop {
            let chunk = match self.frames.last() {
                Some(frame) => &self.executable.functions[frame.function as usize].chunk,
                None => &self.executable.main,
            };
            let ip = self.current_ip();
            if ip >= chunk.len() {
                if self.frames.is_empty() {
                    break;
                }
                panic!("internal error: function ran past the end of its chunk");
            }

            let decoded = chunk.decode(ip);
            self.set_ip(decoded.next());

            match self.execute(decoded) {
                Ok(Step::Continue) => {}
                Ok(Step::Exit) => break,
                Err(message) => return Err(self.error(message)),
            }
        }

        self.out.flush().map_err(|e| self.error(e.to_string()))
    }

    fn execute(&mut self, decoded: Decoded) -> Result<Step, String> {
        match (decoded.opcode, decoded.operand) {
            (OpCode::Pop, _) => {
                self.pop();
            }

            (OpCode::Goto, Operand::Address(address)) => self.set_ip(address as usize),
            (OpCode::PopJumpIfZero, Operand::Address(address)) => {
                if !self.pop().is_truthy() {
                    self.set_ip(address as usize);
                }
            }
            (OpCode::PopJumpIfNonzero, Operand::Address(address)) => {
                if self.pop().is_truthy() {
                    self.set_ip(address as usize);
                }
            }

            (OpCode::BinaryOp, Operand::Binary(operator)) => {
                let right = self.pop();
                let left = self.pop();
                self.stack.push(operations::binary(operator, &left, &right)?);
            }
            (OpCode::UnaryOp, Operand::Unary(operator)) => {
                let value = self.pop();
                self.stack.push(operations::unary(operator, &value)?);
            }

            (OpCode::True, _) => self.stack.push(Value::Boolean(true)),
            (OpCode::False, _) => self.stack.push(Value::Boolean(false)),
            (OpCode::Null, _) => self.stack.push(Value::Null),
            (OpCode::Number, Operand::Number(n)) => self.stack.push(Value::Number(n)),
            (OpCode::LoadConst, Operand::Index(index)) => {
                let value = self.executable.constants[index as usize].clone();
                self.stack.push(value);
            }

            (OpCode::MakeArray, Operand::Count(count)) => {
                let elements = self.pop_n(count as usize);
                self.stack.push(Value::array(elements));
            }
            (OpCode::GetIndex, _) => {
                let index = self.pop();
                let target = self.pop();
                self.stack.push(operations::get_index(&target, &index)?);
            }
            (OpCode::SetIndex, _) => {
                let value = self.pop();
                let index = self.pop();
                let target = self.pop();
                operations::set_index(&target, &index, value.clone())?;
                self.stack.push(value);
            }

            (OpCode::Call, Operand::ArgCount(argc)) => self.call(argc)?,
            (OpCode::Return, _) => self.return_from_frame(),
            (OpCode::MakeFunction, _) => match self.stack.last() {
                Some(Value::Function(index))
                    if (*index as usize) < self.executable.functions.len() => {}
                other => panic!("internal error: MakeFunction on {:?}", other),
            },

            (OpCode::LoadGlobal, Operand::Index(slot)) => {
                let value = self.globals[slot as usize].clone();
                self.stack.push(value);
            }
            (OpCode::StoreGlobal, Operand::Index(slot)) => {
                let value = self.pop();
                self.globals[slot as usize] = value;
            }
            (OpCode::LoadFrameVar, Operand::Index(slot)) => {
                let value = self.frame().locals[slot as usize].clone();
                self.stack.push(value);
            }
            (OpCode::StoreFrameVar, Operand::Index(slot)) => {
                let value = self.pop();
                self.frame_mut().locals[slot as usize] = value;
            }
            (OpCode::LoadNative, Operand::Index(index)) => {
                let value = self.natives[index as usize].clone();
                self.stack.push(value);
            }

            (OpCode::Exit, _) => return Ok(Step::Exit),

            (opcode, operand) => {
                panic!("internal error: {} with operand {:?}", opcode, operand)
            }
        }
        Ok(Step::Continue)
    }

    fn call(&mut self, argc: u8) -> Result<(), String> {
        let callee = self.pop();
        let argc = argc as usize;

        match callee {
            Value::Native(native) => {
                if native.arity as usize != argc {
                    return Err(format!(
                        "{} argument(s) passed to function expecting {}",
                        argc, native.arity
                    ));
                }
                let base = self.args_base(argc);
                let result = {
                    let mut ctx = NativeContext::new(&mut *self.out);
                    (native.func)(&mut ctx, &self.stack[base..])?
                };
                self.stack.truncate(base);
                self.stack.push(result);
            }
            Value::Function(index) => self.enter(index, argc)?,
            other => return Err(format!("Cannot call non-function value {}", other.repr())),
        }
        Ok(())
    }

    fn enter(&mut self, index: FunctionIndex, argc: usize) -> Result<(), String> {
        let function = &self.executable.functions[index as usize];
        if function.arity as usize != argc {
            return Err(format!(
                "{} argument(s) passed to function {} expecting {}",
                argc, function.name, function.arity
            ));
        }

        let total_locals = function.total_locals;
        let required = self.call_stack_bytes + CallFrame::cost(total_locals);
        if required > self.max_call_stack_bytes {
            return Err(format!(
                "Stack error: Maximum call stack size exceeded. {:.2} KB necessary, but maximum is {} KB",
                required as f64 / 1024.0,
                self.max_call_stack_bytes / 1024
            ));
        }

        tracing::trace!(function = %function.name, depth = self.frames.len() + 1, "call");
        let base = self.args_base(argc);
        let args = self.stack.split_off(base);
        self.frames.push(CallFrame::new(index, total_locals, args));
        self.call_stack_bytes = required;
        Ok(())
    }

    fn return_from_frame(&mut self) {
        let Some(frame) = self.frames.pop() else {
            panic!("internal error: return from top-level code");
        };
        let function = &self.executable.functions[frame.function as usize];
        tracing::trace!(function = %function.name, depth = self.frames.len(), "return");
        self.call_stack_bytes -= CallFrame::cost(function.total_locals);
    }

    fn error(&self, message: String) -> RuntimeError {
        let frames = self
            .frames
            .iter()
            .rev()
            .map(|frame| self.executable.functions[frame.function as usize].name.clone())
            .collect();
        RuntimeError::new(message, frames)
    }

    fn current_ip(&self) -> usize {
        self.frames.last().map_or(self.ip, |frame| frame.ip)
    }

    fn set_ip(&mut self, ip: usize) {
        match self.frames.last_mut() {
            Some(frame) => frame.ip = ip,
            None => self.ip = ip,
        }
    }

    fn frame(&self) -> &CallFrame {
        self.frames
            .last()
            .unwrap_or_else(|| panic!("internal error: frame variable outside a call"))
    }

    fn frame_mut(&mut self) -> &mut CallFrame {
        self.frames
            .last_mut()
            .unwrap_or_else(|| panic!("internal error: frame variable outside a call"))
    }

    fn pop(&mut self) -> Value {
        self.stack
            .pop()
            .unwrap_or_else(|| panic!("internal error: operand stack underflow"))
    }

    fn args_base(&self, argc: usize) -> usize {
        self.stack
            .len()
            .checked_sub(argc)
            .unwrap_or_else(|| panic!("internal error: operand stack underflow"))
    }

    fn pop_n(&mut self, n: usize) -> Vec<Value> {
        let base = self.args_base(n);
        self.stack.split_off(base)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::compiler::{optimize, Chunk, Compiler, Transpiler};
    use crate::parser::Parser;

    #[derive(Clone, Default)]
    struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.borrow().clone()).unwrap()
        }
    }

    fn build(src: &str) -> Executable {
        let program = Parser::new(src).parse_program().expect("Should parse");
        let ir = Compiler::new().compile(&program).expect("Should compile");
        Transpiler::new(&optimize(&ir)).transpile()
    }

    fn run_with(src: &str, config: &EngineConfig) -> (VM, Result<(), RuntimeError>, SharedBuffer) {
        let buffer = SharedBuffer::default();
        let mut vm = VM::with_output(build(src), config, Box::new(buffer.clone()));
        let result = vm.run();
        (vm, result, buffer)
    }

    fn run(src: &str) -> VM {
        let (vm, result, _) = run_with(src, &EngineConfig::default());
        result.expect("Program should run");
        vm
    }

    fn run_err(src: &str) -> RuntimeError {
        let (_, result, _) = run_with(src, &EngineConfig::default());
        result.expect_err("Program should fail")
    }

    fn executable(main: Chunk) -> Executable {
        Executable {
            main,
            functions: Vec::new(),
            constants: Vec::new(),
            global_names: Vec::new(),
        }
    }

    #[test]
    fn test_expression_statement_leaves_stack_empty() {
        let vm = run("1 + 2;");
        assert!(vm.stack().is_empty());
    }

    #[test]
    fn test_debug_summarizes_state() {
        let vm = run("var x = 1; var y = [x];");
        let debug = format!("{:?}", vm);
        assert!(debug.starts_with("VM { ip: "), "{}", debug);
        assert!(debug.contains("frames: 0, stack: 0, globals: 2"), "{}", debug);
    }

    #[test]
    fn test_global_assignment() {
        let vm = run("var x = 5; x = x + 1;");
        assert_eq!(vm.global("x"), Some(&Value::Number(6.0)));
        assert!(vm.stack().is_empty());
    }

    #[test]
    fn test_while_loop_counts() {
        let vm = run("var i = 0; var sum = 0; while (i < 5) { sum = sum + i; i = i + 1; }");
        assert_eq!(vm.global("sum"), Some(&Value::Number(10.0)));
    }

    #[test]
    fn test_break_and_continue() {
        let vm = run(
            "var i = 0; var odd = 0;
             while (true) {
                 i = i + 1;
                 if (i > 9) break;
                 if (i % 2 == 0) continue;
                 odd = odd + 1;
             }",
        );
        assert_eq!(vm.global("odd"), Some(&Value::Number(5.0)));
    }

    #[test]
    fn test_recursive_function() {
        let vm = run(
            "function fib(n) { if (n < 2) return n; return fib(n - 1) + fib(n - 2); }
             var result = fib(15);",
        );
        assert_eq!(vm.global("result"), Some(&Value::Number(610.0)));
        assert!(vm.stack().is_empty());
    }

    #[test]
    fn test_function_locals_are_per_call() {
        let vm = run(
            "function twice(x) { var y = x * 2; return y; }
             var a = twice(3); var b = twice(a);",
        );
        assert_eq!(vm.global("a"), Some(&Value::Number(6.0)));
        assert_eq!(vm.global("b"), Some(&Value::Number(12.0)));
    }

    #[test]
    fn test_function_without_return_yields_null() {
        let vm = run("function f() { 1; } var r = f();");
        assert_eq!(vm.global("r"), Some(&Value::Null));
    }

    #[test]
    fn test_ternary() {
        let vm = run("var a = 3; var b = a > 2 ? \"big\" : \"small\";");
        assert_eq!(vm.global("b"), Some(&Value::string("big")));
    }

    #[test]
    fn test_arrays() {
        let vm = run(
            "var xs = [1, 2, 3]; xs[1] = 20; append(xs, 4);
             var n = len(xs); var second = xs[1]; var has = includes(xs, 4);",
        );
        assert_eq!(vm.global("n"), Some(&Value::Number(4.0)));
        assert_eq!(vm.global("second"), Some(&Value::Number(20.0)));
        assert_eq!(vm.global("has"), Some(&Value::Boolean(true)));
    }

    #[test]
    fn test_println_writes_to_output() {
        let (_, result, buffer) = run_with(
            "println(\"a\" + \"b\"); print(1); println([2, \"x\"]);",
            &EngineConfig::default(),
        );
        result.expect("Program should run");
        assert_eq!(buffer.contents(), "ab\n1[2, \"x\"]\n");
    }

    #[test]
    fn test_native_arity_mismatch() {
        let error = run_err("println(1, 2);");
        assert_eq!(error.message, "2 argument(s) passed to function expecting 1");
        assert!(error.trace.is_empty());
    }

    #[test]
    fn test_program_function_arity_mismatch() {
        let error = run_err("function f(a) { return a; } f();");
        assert_eq!(error.message, "0 argument(s) passed to function f expecting 1");
    }

    #[test]
    fn test_call_non_function() {
        let error = run_err("var x = 1; x();");
        assert_eq!(error.message, "Cannot call non-function value 1");
    }

    #[test]
    fn test_division_by_zero_at_runtime() {
        let error = run_err("var zero = 0; var x = 1 / zero;");
        assert_eq!(error.message, "Division by zero");
    }

    #[test]
    fn test_dead_loop_body_never_runs() {
        let vm = run("while (false) { 1 / 0; }");
        assert!(vm.stack().is_empty());
    }

    #[test]
    fn test_type_error_reports_trace() {
        let error = run_err(
            "function inner() { return 1 - \"a\"; }
             function outer() { return inner(); }
             outer();",
        );
        assert_eq!(
            error.message,
            "Cannot perform binary operation - on values 1 and \"a\""
        );
        assert_eq!(error.trace, vec!["inner".to_string(), "outer".to_string()]);
    }

    #[test]
    fn test_stack_overflow() {
        let error = run_err("function down(n) { return down(n + 1); } down(0);");
        assert!(
            error
                .message
                .starts_with("Stack error: Maximum call stack size exceeded."),
            "{}",
            error.message
        );
        assert!(error.message.ends_with("but maximum is 40 KB"));
        assert_eq!(error.trace.len(), 6);
        assert!(error.omitted > 0);
    }

    #[test]
    fn test_stack_budget_is_configurable() {
        let src = "function depth(n) { if (n == 0) return 0; return depth(n - 1); } depth(50);";
        let config = EngineConfig::default().with_max_call_stack_bytes(CallFrame::cost(1) * 10);
        let (_, result, _) = run_with(src, &config);
        assert!(result.is_err());

        let config = EngineConfig::default().with_max_call_stack_bytes(CallFrame::cost(1) * 51);
        let (vm, result, _) = run_with(src, &config);
        result.expect("51 frames fit");
        assert!(vm.stack().is_empty());
    }

    #[test]
    fn test_exit_stops_the_loop() {
        let mut chunk = Chunk::new();
        chunk.push_opcode(OpCode::True);
        chunk.push_opcode(OpCode::Exit);
        chunk.push_opcode(OpCode::Null);

        let mut vm = VM::with_output(executable(chunk), &EngineConfig::default(), Box::new(io::sink()));
        vm.run().expect("Program should run");
        assert_eq!(vm.stack(), &[Value::Boolean(true)]);
    }

    #[test]
    fn test_conditional_jump() {
        // 0: Number 1.0; 9: PopJumpIfNonzero 23; 14: Number 2.0 (skipped); 23: True
        let mut chunk = Chunk::new();
        chunk.push_opcode(OpCode::Number);
        chunk.push_f64(1.0);
        chunk.push_opcode(OpCode::PopJumpIfNonzero);
        chunk.push_u32(23);
        chunk.push_opcode(OpCode::Number);
        chunk.push_f64(2.0);
        chunk.push_opcode(OpCode::True);

        let mut vm = VM::with_output(executable(chunk), &EngineConfig::default(), Box::new(io::sink()));
        vm.run().expect("Program should run");
        assert_eq!(vm.stack(), &[Value::Boolean(true)]);
    }

    #[test]
    #[should_panic(expected = "operand stack underflow")]
    fn test_underflow_is_internal() {
        let mut chunk = Chunk::new();
        chunk.push_opcode(OpCode::Pop);
        let mut vm = VM::with_output(executable(chunk), &EngineConfig::default(), Box::new(io::sink()));
        let _ = vm.run();
    }
}
