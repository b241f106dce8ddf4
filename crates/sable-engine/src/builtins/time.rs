// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Wall-clock access.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::runtime::function::NativeContext;
use crate::runtime::value::Value;

/// clock() - Seconds since the Unix epoch, with sub-second precision.
pub fn clock(_ctx: &mut NativeContext<'_>, _args: &[Value]) -> Result<Value, String> {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| e.to_string())?;
    Ok(Value::Number(elapsed.as_secs_f64()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_is_monotone_enough() {
        let mut sink = std::io::sink();
        let mut ctx = NativeContext::new(&mut sink);
        let Ok(Value::Number(first)) = clock(&mut ctx, &[]) else {
            panic!("clock should return a number");
        };
        let Ok(Value::Number(second)) = clock(&mut ctx, &[]) else {
            panic!("clock should return a number");
        };
        assert!(first > 1.0e9);
        assert!(second >= first);
    }
}
