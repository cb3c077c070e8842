//! Undo/Redo History
//!
//! Snapshot-based linear history. Every entry is an owned snapshot, so moving
//! between past, present and future never mutates a state still held
//! elsewhere. A commit discards the redo branch.

use std::collections::VecDeque;

use log::debug;

/// Past, present and future snapshots of one value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryFrame<T> {
    /// Oldest first.
    pub past: Vec<T>,
    pub present: T,
    /// Nearest redo first.
    pub future: VecDeque<T>,
}

/// Generic undo/redo wrapper. The only ways to change the present are
/// [`commit`](Self::commit), [`undo`](Self::undo) and [`redo`](Self::redo).
#[derive(Debug, Clone)]
pub struct VersionedStore<T> {
    frame: HistoryFrame<T>,

    /// Maximum number of past snapshots kept; `None` keeps everything.
    max_levels: Option<usize>,

    /// Number of past snapshots dropped by the limit.
    discarded: usize,
}

impl<T: Default> Default for VersionedStore<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> VersionedStore<T> {
    /// Start a history whose present is `initial`, with nothing to undo or redo.
    pub fn new(initial: T) -> Self {
        Self {
            frame: HistoryFrame {
                past: Vec::new(),
                present: initial,
                future: VecDeque::new(),
            },
            max_levels: None,
            discarded: 0,
        }
    }

    /// Same as [`new`](Self::new) but keeps at most `max_levels` undo steps.
    pub fn with_max_levels(initial: T, max_levels: Option<usize>) -> Self {
        let mut store = Self::new(initial);
        store.max_levels = max_levels;
        store
    }

    pub fn present(&self) -> &T {
        &self.frame.present
    }

    pub fn frame(&self) -> &HistoryFrame<T> {
        &self.frame
    }

    /// Make `next` the present. The old present becomes the newest undo step
    /// and the redo branch is dropped.
    pub fn commit(&mut self, next: T) {
        let previous = std::mem::replace(&mut self.frame.present, next);
        self.frame.past.push(previous);
        if !self.frame.future.is_empty() {
            debug!("Commit discards {} redo step(s)", self.frame.future.len());
            self.frame.future.clear();
        }
        self.trim_history();
    }

    /// Step back one snapshot. Returns false when there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        let Some(previous) = self.frame.past.pop() else {
            return false;
        };
        let current = std::mem::replace(&mut self.frame.present, previous);
        self.frame.future.push_front(current);
        true
    }

    /// Step forward one snapshot. Returns false when there is nothing to redo.
    pub fn redo(&mut self) -> bool {
        let Some(next) = self.frame.future.pop_front() else {
            return false;
        };
        let current = std::mem::replace(&mut self.frame.present, next);
        self.frame.past.push(current);
        true
    }

    pub fn can_undo(&self) -> bool {
        !self.frame.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.frame.future.is_empty()
    }

    pub fn undo_count(&self) -> usize {
        self.frame.past.len()
    }

    pub fn redo_count(&self) -> usize {
        self.frame.future.len()
    }

    pub fn max_levels(&self) -> Option<usize> {
        self.max_levels
    }

    /// Change the limit, trimming the oldest snapshots if needed.
    pub fn set_max_levels(&mut self, max_levels: Option<usize>) {
        self.max_levels = max_levels;
        self.trim_history();
    }

    /// Number of undo steps dropped so far because of the limit.
    pub fn discarded_count(&self) -> usize {
        self.discarded
    }

    /// Forget all undo and redo steps, keeping the present.
    pub fn clear(&mut self) {
        self.discarded += self.frame.past.len();
        self.frame.past.clear();
        self.frame.future.clear();
    }

    /// Give up the history and keep only the present.
    pub fn into_present(self) -> T {
        self.frame.present
    }

    fn trim_history(&mut self) {
        let Some(max) = self.max_levels else {
            return;
        };
        if self.frame.past.len() > max {
            let excess = self.frame.past.len() - max;
            self.frame.past.drain(..excess);
            self.discarded += excess;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn store_with_commits(n: u32) -> VersionedStore<u32> {
        let mut store = VersionedStore::new(0);
        for i in 1..=n {
            store.commit(i);
        }
        store
    }

    #[test]
    fn test_new_store_is_empty() {
        let store = VersionedStore::new("start");
        assert_eq!(*store.present(), "start");
        assert!(!store.can_undo());
        assert!(!store.can_redo());
    }

    #[test]
    fn test_undo_on_empty_history_is_noop() {
        let mut store = VersionedStore::new(7);
        let before = store.frame().clone();

        assert!(!store.undo());
        assert_eq!(*store.frame(), before);
    }

    #[test]
    fn test_redo_on_empty_future_is_noop() {
        let mut store = store_with_commits(2);
        assert!(!store.redo());
        assert_eq!(*store.present(), 2);
        assert_eq!(store.undo_count(), 2);
    }

    #[test]
    fn test_commit_pushes_present_onto_past() {
        let store = store_with_commits(3);
        assert_eq!(store.frame().past, vec![0, 1, 2]);
        assert_eq!(*store.present(), 3);
        assert!(store.frame().future.is_empty());
    }

    #[test]
    fn test_undo_moves_present_to_front_of_future() {
        let mut store = store_with_commits(3);
        store.undo();
        store.undo();

        assert_eq!(*store.present(), 1);
        assert_eq!(store.frame().future, VecDeque::from(vec![2, 3]));
    }

    #[test_case(1 ; "one step")]
    #[test_case(3 ; "several steps")]
    #[test_case(5 ; "whole history")]
    fn test_undo_k_then_redo_k_restores_present(k: usize) {
        let mut store = store_with_commits(5);
        let original = store.frame().clone();

        for _ in 0..k {
            assert!(store.undo());
        }
        for _ in 0..k {
            assert!(store.redo());
        }

        assert_eq!(*store.frame(), original);
    }

    #[test]
    fn test_redo_then_undo_is_identity() {
        let mut store = store_with_commits(4);
        store.undo();
        store.undo();
        let middle = store.frame().clone();

        store.redo();
        store.undo();
        assert_eq!(*store.frame(), middle);
    }

    #[test]
    fn test_commit_after_undo_prunes_future() {
        let mut store = store_with_commits(4);
        store.undo();
        store.undo();
        assert_eq!(store.redo_count(), 2);

        store.commit(99);
        assert!(store.frame().future.is_empty());
        assert_eq!(store.frame().past, vec![0, 1, 2]);
        assert_eq!(*store.present(), 99);
    }

    #[test]
    fn test_max_levels_trims_oldest() {
        let mut store = VersionedStore::with_max_levels(0, Some(3));
        for i in 1..=5 {
            store.commit(i);
        }

        assert_eq!(store.frame().past, vec![2, 3, 4]);
        assert_eq!(store.discarded_count(), 2);
    }

    #[test]
    fn test_set_max_levels_trims_existing() {
        let mut store = store_with_commits(5);
        store.set_max_levels(Some(2));

        assert_eq!(store.undo_count(), 2);
        assert_eq!(store.max_levels(), Some(2));
    }

    #[test]
    fn test_clear_keeps_present() {
        let mut store = store_with_commits(3);
        store.undo();
        store.clear();

        assert_eq!(*store.present(), 2);
        assert!(!store.can_undo());
        assert!(!store.can_redo());
    }
}
