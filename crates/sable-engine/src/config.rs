// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Engine configuration.

/// Default call-stack budget in bytes.
pub const DEFAULT_MAX_CALL_STACK_BYTES: usize = 40 * 1024;

/// Tunables for compiling and running a program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Upper bound on the bytes held by live call frames and their locals.
    pub max_call_stack_bytes: usize,
    /// Run the peephole optimizer between lowering and transpiling.
    pub optimize: bool,
}

impl EngineConfig {
    /// Sets the call-stack budget.
    pub fn with_max_call_stack_bytes(mut self, bytes: usize) -> Self {
        self.max_call_stack_bytes = bytes;
        self
    }

    /// Enables or disables the optimizer.
    pub fn with_optimizer(mut self, enabled: bool) -> Self {
        self.optimize = enabled;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_call_stack_bytes: DEFAULT_MAX_CALL_STACK_BYTES,
            optimize: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.max_call_stack_bytes, 40 * 1024);
        assert!(config.optimize);
    }

    #[test]
    fn test_builders() {
        let config = EngineConfig::default()
            .with_max_call_stack_bytes(512)
            .with_optimizer(false);
        assert_eq!(config.max_call_stack_bytes, 512);
        assert!(!config.optimize);
    }
}
