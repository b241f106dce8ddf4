// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Math functions and constants.

use super::number_arg;
use crate::runtime::function::NativeContext;
use crate::runtime::value::Value;

/// PI - Ratio of circumference to diameter
pub const PI: f64 = std::f64::consts::PI;

/// sqrt(x) - Returns the square root of x.
pub fn sqrt(_ctx: &mut NativeContext<'_>, args: &[Value]) -> Result<Value, String> {
    Ok(Value::Number(number_arg("sqrt", args, 0)?.sqrt()))
}

/// floor(x) - Returns the greatest integer less than or equal to x.
pub fn floor(_ctx: &mut NativeContext<'_>, args: &[Value]) -> Result<Value, String> {
    Ok(Value::Number(number_arg("floor", args, 0)?.floor()))
}

/// abs(x) - Returns the absolute value of x.
pub fn abs(_ctx: &mut NativeContext<'_>, args: &[Value]) -> Result<Value, String> {
    Ok(Value::Number(number_arg("abs", args, 0)?.abs()))
}

/// pow(x, y) - Returns x raised to the power y.
pub fn pow(_ctx: &mut NativeContext<'_>, args: &[Value]) -> Result<Value, String> {
    let base = number_arg("pow", args, 0)?;
    let exponent = number_arg("pow", args, 1)?;
    Ok(Value::Number(base.powf(exponent)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(f: crate::runtime::NativeFn, args: &[Value]) -> Result<Value, String> {
        let mut sink = std::io::sink();
        f(&mut NativeContext::new(&mut sink), args)
    }

    #[test]
    fn test_math_functions() {
        assert_eq!(call(sqrt, &[Value::Number(16.0)]), Ok(Value::Number(4.0)));
        assert_eq!(call(floor, &[Value::Number(2.7)]), Ok(Value::Number(2.0)));
        assert_eq!(call(abs, &[Value::Number(-3.0)]), Ok(Value::Number(3.0)));
        assert_eq!(
            call(pow, &[Value::Number(2.0), Value::Number(10.0)]),
            Ok(Value::Number(1024.0))
        );
    }

    #[test]
    fn test_rejects_non_numbers() {
        let err = call(sqrt, &[Value::string("4")]).unwrap_err();
        assert_eq!(err, "sqrt expects a number as argument 1, got \"4\"");
    }
}
