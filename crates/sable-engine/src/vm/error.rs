// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Runtime errors.

use thiserror::Error;

/// Frames kept from each end of a long call stack.
const TRACE_EDGE: usize = 3;

/// A fatal error raised while the program runs.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct RuntimeError {
    /// What went wrong
    pub message: String,
    /// Active program functions, innermost first
    pub trace: Vec<String>,
    /// Frames dropped from the middle of `trace`
    pub omitted: usize,
}

impl RuntimeError {
    /// Creates an error from `message` and the names of the active frames,
    /// innermost first. Deep stacks keep only their three innermost and three
    /// outermost frames.
    pub fn new(message: impl Into<String>, frames: Vec<String>) -> Self {
        let depth = frames.len();
        let (trace, omitted) = if depth > 2 * TRACE_EDGE {
            let mut trace = frames[..TRACE_EDGE].to_vec();
            trace.extend_from_slice(&frames[depth - TRACE_EDGE..]);
            (trace, depth - 2 * TRACE_EDGE)
        } else {
            (frames, 0)
        };
        Self {
            message: message.into(),
            trace,
            omitted,
        }
    }

    /// Printable stack trace, one frame per line, `...` marking the gap.
    pub fn trace_lines(&self) -> Vec<String> {
        let mut lines: Vec<String> = self.trace.iter().map(|name| format!("{}(...)", name)).collect();
        if self.omitted > 0 {
            lines.insert(TRACE_EDGE, "...".to_string());
        }
        lines
    }
}
