// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Sable runtime types: values, operator semantics and function records.

pub mod function;
pub mod operations;
pub mod value;

pub use function::{CallFrame, NativeContext, NativeFn, NativeFunction, RuntimeFunction};
pub use value::{FunctionIndex, Value};
