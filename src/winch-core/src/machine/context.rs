// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

use std::collections::BTreeMap;

use tracing::{debug, error};

use super::state::StateId;

/// State registry plus current-state bookkeeping.
#[derive(Debug)]
pub struct Context {
    name: String,
    states: BTreeMap<String, StateId>,
    current: Option<StateId>,
    transition_count: u64,
}

impl Context {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            states: BTreeMap::new(),
            current: None,
            transition_count: 0,
        }
    }

    /// Context with every built-in state registered under its own name.
    pub fn with_builtin_states(name: impl Into<String>) -> Self {
        let mut ctx = Self::new(name);
        for state in StateId::ALL {
            ctx.register(state);
        }
        ctx
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register a state under its name. A name collision replaces the old entry.
    pub fn register(&mut self, state: StateId) {
        self.register_as(state.name(), state);
    }

    pub fn register_as(&mut self, name: impl Into<String>, state: StateId) {
        let name = name.into();
        if let Some(old) = self.states.insert(name.clone(), state) {
            debug!("{}: state '{}' re-registered ({} -> {})", self.name, name, old, state);
        }
    }

    pub fn lookup(&self, name: &str) -> Option<StateId> {
        self.states.get(name).copied()
    }

    pub fn current(&self) -> Option<StateId> {
        self.current
    }

    /// Make `name` the current state. Unknown names leave the context untouched.
    pub fn set_current(&mut self, name: &str) -> bool {
        match self.lookup(name) {
            Some(state) => {
                self.current = Some(state);
                self.transition_count += 1;
                true
            }
            None => {
                error!("{}: no state named '{}' is registered", self.name, name);
                false
            }
        }
    }

    pub fn transition_count(&self) -> u64 {
        self.transition_count
    }

    pub fn print_states(&self) -> Vec<String> {
        self.states.keys().cloned().collect()
    }
}
