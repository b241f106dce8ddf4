// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Built-in (native) functions and constants.
//!
//! [`NATIVES`] is a flat table. The compiler seeds its outermost scope with
//! one variable per entry, the transpiler turns references into
//! `LoadNative <index>`, and the interpreter realizes the table once per run,
//! so an entry's position is its identity throughout the pipeline.

pub mod array;
pub mod console;
pub mod math;
pub mod time;

use crate::runtime::function::{NativeFn, NativeFunction};
use crate::runtime::value::Value;

/// What a native table entry evaluates to.
#[derive(Debug, Clone, Copy)]
pub enum NativeValue {
    /// A host function
    Function(NativeFunction),
    /// A numeric constant
    Number(f64),
}

/// One entry in the native table.
#[derive(Debug, Clone, Copy)]
pub struct Native {
    /// The global name the entry is bound to
    pub name: &'static str,
    /// The bound value
    pub value: NativeValue,
}

impl Native {
    const fn function(name: &'static str, arity: u8, func: NativeFn) -> Self {
        Self {
            name,
            value: NativeValue::Function(NativeFunction { name, arity, func }),
        }
    }

    const fn constant(name: &'static str, value: f64) -> Self {
        Self {
            name,
            value: NativeValue::Number(value),
        }
    }

    /// Realizes the entry as a runtime value.
    pub fn to_value(&self) -> Value {
        match self.value {
            NativeValue::Function(native) => Value::Native(native),
            NativeValue::Number(n) => Value::Number(n),
        }
    }
}

/// Every native, in slot order.
pub static NATIVES: &[Native] = &[
    Native::function("print", 1, console::print),
    Native::function("println", 1, console::println),
    Native::function("clock", 0, time::clock),
    Native::constant("PI", math::PI),
    Native::function("len", 1, array::len),
    Native::function("append", 2, array::append),
    Native::function("includes", 2, array::includes),
    Native::function("sqrt", 1, math::sqrt),
    Native::function("floor", 1, math::floor),
    Native::function("abs", 1, math::abs),
    Native::function("pow", 2, math::pow),
];

/// Looks up the slot of the native bound to `name`.
pub fn native_index(name: &str) -> Option<u32> {
    NATIVES
        .iter()
        .position(|native| native.name == name)
        .map(|i| i as u32)
}

/// Realizes the whole table, indexed like [`NATIVES`].
pub fn native_values() -> Vec<Value> {
    NATIVES.iter().map(Native::to_value).collect()
}

/// Extracts a numeric argument or explains why it isn't one.
pub(crate) fn number_arg(function: &str, args: &[Value], index: usize) -> Result<f64, String> {
    match args.get(index) {
        Some(Value::Number(n)) => Ok(*n),
        Some(other) => Err(format!(
            "{} expects a number as argument {}, got {}",
            function,
            index + 1,
            other.repr()
        )),
        None => Err(format!("{} is missing argument {}", function, index + 1)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_are_unique() {
        for (i, native) in NATIVES.iter().enumerate() {
            assert_eq!(native_index(native.name), Some(i as u32), "{}", native.name);
        }
    }

    #[test]
    fn test_lookup() {
        assert_eq!(native_index("print"), Some(0));
        assert!(native_index("println").is_some());
        assert_eq!(native_index("nope"), None);
    }

    #[test]
    fn test_values_match_table() {
        let values = native_values();
        assert_eq!(values.len(), NATIVES.len());
        let pi = native_index("PI").unwrap() as usize;
        assert_eq!(values[pi], Value::Number(std::f64::consts::PI));
        let sqrt = native_index("sqrt").unwrap() as usize;
        assert!(matches!(values[sqrt], Value::Native(NativeFunction { arity: 1, .. })));
    }
}
