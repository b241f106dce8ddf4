// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Array helpers: `len`, `append` and `includes`.

use crate::runtime::function::NativeContext;
use crate::runtime::value::Value;

/// len(value) - Number of elements of an array or characters of a string.
pub fn len(_ctx: &mut NativeContext<'_>, args: &[Value]) -> Result<Value, String> {
    match args.first() {
        Some(Value::Array(items)) => Ok(Value::Number(items.borrow().len() as f64)),
        Some(Value::String(s)) => Ok(Value::Number(s.chars().count() as f64)),
        Some(other) => Err(format!("len expects an array or string, got {}", other.repr())),
        None => Err("len is missing argument 1".into()),
    }
}

/// append(array, value) - Pushes value onto array and returns the array.
pub fn append(_ctx: &mut NativeContext<'_>, args: &[Value]) -> Result<Value, String> {
    match args {
        [target @ Value::Array(items), value] => {
            items.borrow_mut().push(value.clone());
            Ok(target.clone())
        }
        [other, _] => Err(format!("append expects an array, got {}", other.repr())),
        _ => Err("append expects 2 arguments".into()),
    }
}

/// includes(array, value) - True if any element equals value.
pub fn includes(_ctx: &mut NativeContext<'_>, args: &[Value]) -> Result<Value, String> {
    match args {
        [Value::Array(items), needle] => {
            Ok(Value::Boolean(items.borrow().iter().any(|item| item == needle)))
        }
        [other, _] => Err(format!("includes expects an array, got {}", other.repr())),
        _ => Err("includes expects 2 arguments".into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx_call(f: crate::runtime::NativeFn, args: &[Value]) -> Result<Value, String> {
        let mut sink = std::io::sink();
        f(&mut NativeContext::new(&mut sink), args)
    }

    #[test]
    fn test_append_shares_the_array() {
        let arr = Value::array(vec![]);
        let returned = ctx_call(append, &[arr.clone(), Value::Number(1.0)]).unwrap();
        assert_eq!(returned, arr);
        assert_eq!(ctx_call(len, &[arr.clone()]), Ok(Value::Number(1.0)));
    }

    #[test]
    fn test_includes() {
        let arr = Value::array(vec![Value::Number(1.0), Value::string("b")]);
        assert_eq!(
            ctx_call(includes, &[arr.clone(), Value::string("b")]),
            Ok(Value::Boolean(true))
        );
        assert_eq!(
            ctx_call(includes, &[arr, Value::Number(2.0)]),
            Ok(Value::Boolean(false))
        );
    }

    #[test]
    fn test_len_of_string_and_errors() {
        assert_eq!(ctx_call(len, &[Value::string("héllo")]), Ok(Value::Number(5.0)));
        assert!(ctx_call(len, &[Value::Null]).is_err());
        assert!(ctx_call(append, &[Value::Null, Value::Null]).is_err());
    }
}
