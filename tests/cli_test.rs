// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Tests for the `sable` binary.

use std::io::Write;
use std::process::{Command, Output};

fn sable(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_sable"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to start sable")
}

fn script(source: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".sb")
        .tempfile()
        .expect("failed to create script");
    file.write_all(source.as_bytes()).unwrap();
    file
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn test_run_file() {
    let file = script("function sq(n) { return n * n; }\nprintln(sq(12));\n");
    let output = sable(&["run", file.path().to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(stdout(&output), "144\n");
}

#[test]
fn test_eval() {
    let output = sable(&["eval", "println(\"hi\" + \"!\");"]);
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(stdout(&output), "hi!\n");
}

#[test]
fn test_syntax_error_exit_code() {
    let output = sable(&["eval", "var = 1;"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("1:5: syntax error"));
}

#[test]
fn test_compile_error_exit_code() {
    let output = sable(&["eval", "break;"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("A break statement may only appear in a loop."));
}

#[test]
fn test_runtime_error_exit_code() {
    let output = sable(&["eval", "function f() { return 1 / 0; } f();"]);
    assert_eq!(output.status.code(), Some(3));
    let err = stderr(&output);
    assert!(err.contains("runtime error: Division by zero"), "{}", err);
    assert!(err.contains("f(...)"), "{}", err);
}

#[test]
fn test_missing_file_exit_code() {
    let output = sable(&["run", "/no/such/program.sb"]);
    assert_eq!(output.status.code(), Some(74));
    assert!(stderr(&output).contains("cannot read"));
}

#[test]
fn test_dump_ir_and_bytecode() {
    let output = sable(&["eval", "--dump-ir", "--dump-bytecode", "var x = 1 + 2;"]);
    assert_eq!(output.status.code(), Some(0));
    let out = stdout(&output);
    assert!(out.contains("main:"), "{}", out);
    assert!(out.contains("== main"), "{}", out);
    assert!(out.contains("== globals =="), "{}", out);
    assert!(out.contains("StoreGlobal"), "{}", out);
}

#[test]
fn test_stack_budget_flag() {
    let program = "function d(n) { if (n == 0) return 0; return d(n - 1); } d(100);";
    assert_eq!(sable(&["eval", program]).status.code(), Some(0));

    let output = sable(&["eval", "--max-stack-kb", "1", program]);
    assert_eq!(output.status.code(), Some(3));
    assert!(stderr(&output).contains("Maximum call stack size exceeded"));
}
