// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nereid and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Bounded snapshot history for undo/redo.
//!
//! The newest entry of `past` is always the current state. Undo moves it onto the redo stack and
//! hands back the entry below it.

use std::collections::VecDeque;

use crate::config::DEFAULT_HISTORY_CAPACITY;

#[derive(Debug, Clone)]
pub struct History<T> {
    past: VecDeque<T>,
    future: Vec<T>,
    capacity: usize,
}

impl<T> Default for History<T> {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }
}

impl<T> History<T> {
    /// `capacity` counts every retained snapshot, the current one included. Zero is treated as one.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            past: VecDeque::with_capacity(capacity.min(64)),
            future: Vec::new(),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.past.len()
    }

    pub fn is_empty(&self) -> bool {
        self.past.is_empty()
    }

    pub fn can_undo(&self) -> bool {
        self.past.len() > 1
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    pub fn current(&self) -> Option<&T> {
        self.past.back()
    }

    /// Drops everything and starts over from `initial`.
    pub fn reset(&mut self, initial: T) {
        self.past.clear();
        self.future.clear();
        self.past.push_back(initial);
    }
}

impl<T: Clone + PartialEq> History<T> {
    /// Records a committed state. Returns false when it equals the current entry and was elided.
    pub fn record(&mut self, snapshot: T) -> bool {
        if self.past.back() == Some(&snapshot) {
            return false;
        }
        self.future.clear();
        self.past.push_back(snapshot);
        while self.past.len() > self.capacity {
            self.past.pop_front();
        }
        true
    }

    pub fn undo(&mut self) -> Option<T> {
        if !self.can_undo() {
            return None;
        }
        let undone = self.past.pop_back()?;
        self.future.push(undone);
        self.past.back().cloned()
    }

    pub fn redo(&mut self) -> Option<T> {
        let redone = self.future.pop()?;
        self.past.push_back(redone.clone());
        while self.past.len() > self.capacity {
            self.past.pop_front();
        }
        Some(redone)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::History;

    fn filled(capacity: usize, values: impl IntoIterator<Item = u32>) -> History<u32> {
        let mut history = History::with_capacity(capacity);
        history.reset(0);
        for value in values {
            history.record(value);
        }
        history
    }

    #[test]
    fn undo_and_redo_walk_the_timeline() {
        let mut history = filled(50, [1, 2, 3]);

        assert_eq!(history.undo(), Some(2));
        assert_eq!(history.undo(), Some(1));
        assert_eq!(history.redo(), Some(2));
        assert_eq!(history.current(), Some(&2));
        assert_eq!(history.redo(), Some(3));
        assert_eq!(history.redo(), None);
    }

    #[test]
    fn undo_stops_at_the_oldest_entry() {
        let mut history = filled(50, [1]);
        assert_eq!(history.undo(), Some(0));
        assert_eq!(history.undo(), None);
        assert_eq!(history.current(), Some(&0));
    }

    #[test]
    fn recording_clears_the_redo_stack() {
        let mut history = filled(50, [1, 2]);
        history.undo();
        assert!(history.can_redo());

        assert!(history.record(7));
        assert!(!history.can_redo());
        assert_eq!(history.undo(), Some(1));
    }

    #[test]
    fn consecutive_duplicates_are_elided() {
        let mut history = filled(50, [1]);
        assert!(!history.record(1));
        assert_eq!(history.len(), 2);
    }

    #[rstest]
    #[case(1, 1)]
    #[case(5, 5)]
    #[case(50, 50)]
    fn capacity_bounds_retained_snapshots(#[case] capacity: usize, #[case] expected: usize) {
        let history = filled(capacity, 1..=80);
        assert_eq!(history.len(), expected);
        assert_eq!(history.current(), Some(&80));
    }

    #[test]
    fn oldest_entries_fall_off_first() {
        let mut history = filled(3, [1, 2, 3, 4]);
        assert_eq!(history.undo(), Some(3));
        assert_eq!(history.undo(), Some(2));
        assert_eq!(history.undo(), None);
    }
}
