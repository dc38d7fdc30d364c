// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Pending state sequence.
//!
//! A work queue of `(state name, args)` entries. The head is dispatched every
//! tick and removed only when its own behavior reports completion. STOP and
//! ERROR preempt by inserting at the head.

use std::collections::VecDeque;

#[derive(Debug, Clone, PartialEq)]
pub struct SequenceEntry {
    pub id: u64,
    pub state: String,
    pub args: Vec<f64>,
}

#[derive(Debug, Default)]
pub struct StateSequence {
    entries: VecDeque<SequenceEntry>,
    next_id: u64,
}

impl StateSequence {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&mut self, state: impl Into<String>, args: Vec<f64>) -> SequenceEntry {
        self.next_id += 1;
        SequenceEntry {
            id: self.next_id,
            state: state.into(),
            args,
        }
    }

    pub fn push_back(&mut self, state: impl Into<String>, args: Vec<f64>) -> u64 {
        let entry = self.entry(state, args);
        let id = entry.id;
        self.entries.push_back(entry);
        id
    }

    /// Preempt whatever is queued.
    pub fn push_front(&mut self, state: impl Into<String>, args: Vec<f64>) -> u64 {
        let entry = self.entry(state, args);
        let id = entry.id;
        self.entries.push_front(entry);
        id
    }

    /// Insert `items` in order directly behind the current head.
    pub fn insert_after_head(&mut self, items: Vec<(&str, Vec<f64>)>) {
        let at = usize::from(!self.entries.is_empty());
        for (offset, (state, args)) in items.into_iter().enumerate() {
            let entry = self.entry(state, args);
            self.entries.insert(at + offset, entry);
        }
    }

    pub fn head(&self) -> Option<&SequenceEntry> {
        self.entries.front()
    }

    /// Remove the head only if it is still the entry with `id`.
    pub fn pop_if_head(&mut self, id: u64) -> bool {
        if self.entries.front().map(|e| e.id) == Some(id) {
            self.entries.pop_front();
            true
        } else {
            false
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.state.clone()).collect()
    }
}
