// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Sable value representation.
//!
//! Numbers, booleans and null are copied by value. Strings and arrays are
//! reference counted: cloning a [`Value`] shares the heap payload, and the
//! payload is freed when the last reference goes away. Arrays that contain
//! themselves are never freed before the run ends.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::function::NativeFunction;

/// Dense index of a program function, `0..function_count`.
pub type FunctionIndex = u32;

/// Shared, mutable array storage.
pub type ArrayRef = Rc<RefCell<Vec<Value>>>;

/// A Sable value.
#[derive(Debug, Clone)]
pub enum Value {
    /// null
    Null,
    /// `true` / `false`
    Boolean(bool),
    /// Number (IEEE 754 double)
    Number(f64),
    /// Immutable string
    String(Rc<str>),
    /// Mutable array, shared by reference
    Array(ArrayRef),
    /// A function compiled from the program
    Function(FunctionIndex),
    /// A function provided by the host
    Native(NativeFunction),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => a == b,
            (Value::Native(a), Value::Native(b)) => a.name == b.name,
            _ => false,
        }
    }
}

impl Value {
    /// Creates a string value.
    pub fn string(s: &str) -> Self {
        Value::String(Rc::from(s))
    }

    /// Creates a fresh array value.
    pub fn array(elements: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(elements)))
    }

    /// Converts the value to a boolean.
    ///
    /// `null`, `false`, `0`, NaN, `""` and `[]` are falsey; everything else
    /// is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Boolean(b) => *b,
            Value::Number(n) => !n.is_nan() && *n != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::Array(items) => !items.borrow().is_empty(),
            Value::Function(_) | Value::Native(_) => true,
        }
    }

    /// Numeric view used by arithmetic and comparison; booleans count as 1/0.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    /// Returns the type of this value as a string.
    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Function(_) | Value::Native(_) => "function",
        }
    }

    /// Source-like rendering used in error messages: strings are quoted.
    pub fn repr(&self) -> String {
        match self {
            Value::String(s) => format!("{:?}", s),
            other => other.to_string(),
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

fn fmt_number(f: &mut fmt::Formatter<'_>, n: f64) -> fmt::Result {
    if n.is_nan() {
        write!(f, "NaN")
    } else if n.is_infinite() {
        write!(f, "{}", if n > 0.0 { "Infinity" } else { "-Infinity" })
    } else {
        write!(f, "{}", n)
    }
}

fn fmt_value(f: &mut fmt::Formatter<'_>, value: &Value, open: &mut Vec<*const RefCell<Vec<Value>>>) -> fmt::Result {
    match value {
        Value::Null => write!(f, "null"),
        Value::Boolean(b) => write!(f, "{}", b),
        Value::Number(n) => fmt_number(f, *n),
        Value::String(s) => write!(f, "{}", s),
        Value::Array(items) => {
            let ptr = Rc::as_ptr(items);
            if open.contains(&ptr) {
                return write!(f, "[...]");
            }
            open.push(ptr);
            write!(f, "[")?;
            for (i, item) in items.borrow().iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                match item {
                    Value::String(s) => write!(f, "{:?}", s)?,
                    other => fmt_value(f, other, open)?,
                }
            }
            open.pop();
            write!(f, "]")
        }
        Value::Function(index) => write!(f, "[Function #{}]", index),
        Value::Native(native) => write!(f, "[Function: {} (native)]", native.name),
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_value(f, self, &mut Vec::new())
    }
}
