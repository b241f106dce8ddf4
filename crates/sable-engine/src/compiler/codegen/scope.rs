// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Scope management for variable resolution during compilation.
//!
//! The table owns every [`Variable`] declared while compiling a program and
//! hands out [`VariableId`]s, which IR `Load`/`Store` instructions carry.
//! Below all user scopes sits a permanent native scope holding one
//! [`StorageClass::Native`] variable per entry of the native table, so
//! built-ins resolve through the same lookup as user variables.

use rustc_hash::FxHashMap;

use crate::builtins::NATIVES;
use crate::compiler::ir::{GLOBAL_SCOPE_INDEX, LabelId, StorageClass, Variable, VariableId};
use crate::runtime::value::FunctionIndex;

/// What kind of construct opened a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    /// A plain block
    Normal,
    /// A loop body; `break` and `continue` jump to these labels
    Loop {
        /// Label that re-evaluates the loop condition
        condition: LabelId,
        /// Label just after the loop
        end: LabelId,
    },
    /// A function body
    Function,
}

#[derive(Debug)]
struct Scope {
    kind: ScopeKind,
    bindings: FxHashMap<String, VariableId>,
}

/// Nested lexical scopes plus the variables declared in them.
#[derive(Debug)]
pub struct ScopeTable {
    variables: Vec<Variable>,
    natives: FxHashMap<String, VariableId>,
    scopes: Vec<Scope>,
}

impl ScopeTable {
    /// Creates a table containing only the native scope.
    pub fn new() -> Self {
        let mut variables = Vec::with_capacity(NATIVES.len());
        let mut natives = FxHashMap::default();

        for native in NATIVES {
            let id = VariableId(variables.len() as u32);
            variables.push(Variable {
                name: native.name.to_string(),
                class: StorageClass::Native,
                scope_index: GLOBAL_SCOPE_INDEX,
                function: None,
            });
            natives.insert(native.name.to_string(), id);
        }

        Self {
            variables,
            natives,
            scopes: Vec::new(),
        }
    }

    /// Opens a scope.
    pub fn new_scope(&mut self, kind: ScopeKind) {
        self.scopes.push(Scope {
            kind,
            bindings: FxHashMap::default(),
        });
    }

    /// Closes the innermost scope.
    pub fn pop_scope(&mut self) {
        let popped = self.scopes.pop();
        debug_assert!(popped.is_some(), "pop_scope without a matching new_scope");
    }

    /// Depth of the innermost user scope; the top-level scope is 0.
    pub fn depth(&self) -> i32 {
        self.scopes.len() as i32 - 1
    }

    /// Declares `name` in the innermost scope.
    ///
    /// Fails if the innermost scope already binds `name`; shadowing a name
    /// from an outer scope is allowed.
    pub fn add_variable(
        &mut self,
        name: &str,
        class: StorageClass,
        function: Option<FunctionIndex>,
    ) -> Result<VariableId, String> {
        let scope_index = self.depth();
        let id = VariableId(self.variables.len() as u32);

        let Some(scope) = self.scopes.last_mut() else {
            panic!("internal error: variable \"{}\" declared outside any scope", name);
        };
        if scope.bindings.contains_key(name) {
            return Err(format!(
                "Variable \"{}\" has already been declared in this scope.",
                name
            ));
        }
        scope.bindings.insert(name.to_string(), id);

        self.variables.push(Variable {
            name: name.to_string(),
            class,
            scope_index,
            function,
        });
        Ok(id)
    }

    /// Resolves `name`, innermost scope first, natives last.
    pub fn lookup(&self, name: &str) -> Option<VariableId> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.bindings.get(name))
            .or_else(|| self.natives.get(name))
            .copied()
    }

    /// The record behind `id`.
    pub fn variable(&self, id: VariableId) -> &Variable {
        &self.variables[id.0 as usize]
    }

    /// Marks a variable as captured by a nested function. Irreversible.
    pub fn mark_closed(&mut self, id: VariableId) {
        let variable = &mut self.variables[id.0 as usize];
        variable.class = variable.class.closed();
    }

    /// Condition label of the nearest enclosing loop in the current function.
    pub fn loop_condition_label(&self) -> Option<LabelId> {
        self.enclosing_loop().map(|(condition, _)| condition)
    }

    /// End label of the nearest enclosing loop in the current function.
    pub fn loop_end_label(&self) -> Option<LabelId> {
        self.enclosing_loop().map(|(_, end)| end)
    }

    fn enclosing_loop(&self) -> Option<(LabelId, LabelId)> {
        for scope in self.scopes.iter().rev() {
            match scope.kind {
                ScopeKind::Normal => continue,
                ScopeKind::Loop { condition, end } => return Some((condition, end)),
                // A loop outside the function body is not ours to break.
                ScopeKind::Function => return None,
            }
        }
        None
    }

    /// True if any enclosing scope is a function body.
    pub fn in_function(&self) -> bool {
        self.scopes.iter().any(|scope| scope.kind == ScopeKind::Function)
    }

    /// Consumes the table, yielding the variable arena.
    pub fn into_variables(self) -> Vec<Variable> {
        debug_assert!(self.scopes.is_empty(), "unbalanced scopes at end of compilation");
        self.variables
    }
}

impl Default for ScopeTable {
    fn default() -> Self {
        Self::new()
    }
}
