// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The bytecode virtual machine.
//!
//! ## Structure
//!
//! - `interpreter` - fetch, decode and execute loop
//! - `error` - runtime errors and their stack traces

mod error;
mod interpreter;

pub use error::RuntimeError;
pub use interpreter::VM;
