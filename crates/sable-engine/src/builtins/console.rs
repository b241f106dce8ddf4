// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Console output: `print` and `println`.

use crate::runtime::function::NativeContext;
use crate::runtime::value::Value;

/// print(value) - writes the value without a trailing newline
pub fn print(ctx: &mut NativeContext<'_>, args: &[Value]) -> Result<Value, String> {
    for value in args {
        write!(ctx.out(), "{}", value).map_err(|e| e.to_string())?;
    }
    Ok(Value::Null)
}

/// println(value) - writes the value followed by a newline
pub fn println(ctx: &mut NativeContext<'_>, args: &[Value]) -> Result<Value, String> {
    for value in args {
        write!(ctx.out(), "{}", value).map_err(|e| e.to_string())?;
    }
    writeln!(ctx.out()).map_err(|e| e.to_string())?;
    Ok(Value::Null)
}
