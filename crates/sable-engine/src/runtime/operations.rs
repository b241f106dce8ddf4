// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Operator semantics.
//!
//! The interpreter and the constant folder both go through these functions,
//! so a folded expression always produces what running it would have.
//! An `Err` means the operation is undefined for its operands; the folder
//! leaves such expressions alone and the interpreter reports them.

use crate::ast::{BinaryOperator, UnaryOperator};

use super::value::Value;

/// Applies a binary operator to `left` and `right`.
pub fn binary(operator: BinaryOperator, left: &Value, right: &Value) -> Result<Value, String> {
    use BinaryOperator::*;

    match operator {
        Equal => return Ok(Value::Boolean(left == right)),
        NotEqual => return Ok(Value::Boolean(left != right)),
        Add => {
            if let (Value::String(a), Value::String(b)) = (left, right) {
                let mut joined = String::with_capacity(a.len() + b.len());
                joined.push_str(a);
                joined.push_str(b);
                return Ok(Value::string(&joined));
            }
        }
        _ => {}
    }

    let (Some(a), Some(b)) = (left.as_number(), right.as_number()) else {
        return Err(format!(
            "Cannot perform binary operation {} on values {} and {}",
            operator,
            left.repr(),
            right.repr()
        ));
    };

    let result = match operator {
        Add => Value::Number(a + b),
        Subtract => Value::Number(a - b),
        Multiply => Value::Number(a * b),
        Divide => {
            if b == 0.0 {
                return Err("Division by zero".into());
            }
            Value::Number(a / b)
        }
        Modulo => {
            if b == 0.0 {
                return Err("Division by zero".into());
            }
            Value::Number(a.rem_euclid(b))
        }
        Less => Value::Boolean(a < b),
        Greater => Value::Boolean(a > b),
        LessEqual => Value::Boolean(a <= b),
        GreaterEqual => Value::Boolean(a >= b),
        Equal | NotEqual => unreachable!("equality handled above"),
    };

    Ok(result)
}

/// Applies a unary operator to `value`.
pub fn unary(operator: UnaryOperator, value: &Value) -> Result<Value, String> {
    match operator {
        UnaryOperator::Not => Ok(Value::Boolean(!value.is_truthy())),
        UnaryOperator::Negate => value.as_number().map(|n| Value::Number(-n)).ok_or_else(|| {
            format!(
                "Cannot perform unary operation {} on value {}",
                operator,
                value.repr()
            )
        }),
    }
}

/// Resolves an index against a length, rejecting fractions and negatives.
fn resolve_index(index: &Value, len: usize) -> Result<usize, String> {
    let Value::Number(n) = index else {
        return Err(format!("Index must be a number, got {}", index.repr()));
    };
    if n.fract() != 0.0 || *n < 0.0 || *n >= len as f64 {
        return Err(format!("Index {} out of bounds for length {}", index, len));
    }
    Ok(*n as usize)
}

/// Reads `target[index]`.
pub fn get_index(target: &Value, index: &Value) -> Result<Value, String> {
    match target {
        Value::Array(items) => {
            let items = items.borrow();
            let i = resolve_index(index, items.len())?;
            Ok(items[i].clone())
        }
        Value::String(s) => {
            let i = resolve_index(index, s.chars().count())?;
            let ch = s.chars().nth(i).unwrap_or_default();
            Ok(Value::string(ch.encode_utf8(&mut [0; 4])))
        }
        other => Err(format!("Cannot index {} value {}", other.type_of(), other.repr())),
    }
}

/// Writes `target[index] = value`.
pub fn set_index(target: &Value, index: &Value, value: Value) -> Result<(), String> {
    match target {
        Value::Array(items) => {
            let mut items = items.borrow_mut();
            let i = resolve_index(index, items.len())?;
            items[i] = value;
            Ok(())
        }
        Value::String(_) => Err("Cannot assign to an index of a string".into()),
        other => Err(format!("Cannot index {} value {}", other.type_of(), other.repr())),
    }
}
