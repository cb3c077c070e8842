//! Registry of open storyboards.
//!
//! Owns the tab order, the active tab and the unsaved-changes flag. Page
//! edits are routed through here so that every commit marks the registry
//! dirty.

use log::{debug, info};

use crate::error::{Result, StoryboardError};
use crate::state::page::{PageCollection, PagePatch};
use crate::state::storyboard::{Storyboard, StoryboardId};

/// The set of open storyboards in tab order.
#[derive(Debug, Clone, Default)]
pub struct StoryboardRegistry {
    storyboards: Vec<Storyboard>,
    active: Option<usize>,
    unsaved_changes: bool,
    history_limit: Option<usize>,
}

impl StoryboardRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry whose storyboards keep at most `limit` undo steps each.
    pub fn with_history_limit(limit: Option<usize>) -> Self {
        Self {
            history_limit: limit,
            ..Self::default()
        }
    }

    /// Replace the open set with storyboards loaded at startup.
    ///
    /// `active_hint` is the remembered tab; it is clamped to the loaded set.
    pub fn restore(&mut self, storyboards: Vec<Storyboard>, active_hint: Option<usize>) {
        self.storyboards = storyboards
            .into_iter()
            .map(|sb| sb.with_history_limit(self.history_limit))
            .collect();
        self.active = match (self.storyboards.len(), active_hint) {
            (0, _) => None,
            (len, Some(hint)) => Some(hint.min(len - 1)),
            (_, None) => Some(0),
        };
        self.unsaved_changes = false;
        info!(
            "Restored {} storyboard(s), active tab {:?}",
            self.storyboards.len(),
            self.active
        );
    }

    /// Open a new empty storyboard and make it active.
    pub fn open_new(&mut self, name: impl Into<String>) -> StoryboardId {
        self.push_active(Storyboard::new(name))
    }

    /// Open a storyboard from loaded pages, without undo history, and make it active.
    pub fn open_from_snapshot(
        &mut self,
        name: impl Into<String>,
        pages: PageCollection,
    ) -> StoryboardId {
        self.push_active(Storyboard::with_pages(name, pages))
    }

    /// Focus `storyboard` if a storyboard with its id is already open,
    /// otherwise append it. Returns the index now active.
    pub fn open_recent(&mut self, storyboard: Storyboard) -> usize {
        if let Some(index) = self.position_of(storyboard.id()) {
            self.active = Some(index);
            return index;
        }
        self.push_active(storyboard);
        self.storyboards.len() - 1
    }

    /// Close the storyboard at `index` and hand it back.
    ///
    /// Closing the active tab activates the nearest lower tab (or the new
    /// first tab when the first one was closed).
    pub fn close(&mut self, index: usize) -> Result<Storyboard> {
        self.check_index(index)?;
        let removed = self.storyboards.remove(index);

        self.active = match self.active {
            _ if self.storyboards.is_empty() => None,
            Some(active) if active == index => Some(index.saturating_sub(1)),
            Some(active) if active > index => Some(active - 1),
            other => other,
        };

        info!("Closed storyboard {} ({})", removed.name(), removed.id());
        Ok(removed)
    }

    pub fn set_active(&mut self, index: usize) -> Result<()> {
        self.check_index(index)?;
        self.active = Some(index);
        Ok(())
    }

    pub fn active_index(&self) -> Option<usize> {
        self.active
    }

    pub fn active(&self) -> Option<&Storyboard> {
        self.active.and_then(|i| self.storyboards.get(i))
    }

    /// Index of the active tab, or an error when nothing is open.
    pub fn require_active(&self) -> Result<usize> {
        self.active.ok_or(StoryboardError::NoActiveStoryboard)
    }

    pub fn get(&self, index: usize) -> Option<&Storyboard> {
        self.storyboards.get(index)
    }

    pub fn find(&self, id: StoryboardId) -> Option<&Storyboard> {
        self.storyboards.iter().find(|sb| sb.id() == id)
    }

    pub fn position_of(&self, id: StoryboardId) -> Option<usize> {
        self.storyboards.iter().position(|sb| sb.id() == id)
    }

    pub fn storyboards(&self) -> &[Storyboard] {
        &self.storyboards
    }

    pub fn len(&self) -> usize {
        self.storyboards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storyboards.is_empty()
    }

    // === Edits ===

    /// Append a page to the storyboard at `index`; returns the new page index.
    pub fn add_page(&mut self, index: usize) -> Result<usize> {
        let page_index = self.storyboard_mut(index)?.add_page();
        self.mark_dirty();
        Ok(page_index)
    }

    pub fn update_page(&mut self, index: usize, page: usize, patch: &PagePatch) -> Result<()> {
        self.storyboard_mut(index)?.update_page(page, patch)?;
        self.mark_dirty();
        Ok(())
    }

    pub fn delete_page(&mut self, index: usize, page: usize) -> Result<()> {
        self.storyboard_mut(index)?.delete_page(page)?;
        self.mark_dirty();
        Ok(())
    }

    pub fn reorder_pages(&mut self, index: usize, source: usize, target: usize) -> Result<bool> {
        let moved = self.storyboard_mut(index)?.reorder_pages(source, target)?;
        if moved {
            self.mark_dirty();
        }
        Ok(moved)
    }

    pub fn undo(&mut self, index: usize) -> Result<bool> {
        let changed = self.storyboard_mut(index)?.undo();
        if changed {
            self.mark_dirty();
        }
        Ok(changed)
    }

    pub fn redo(&mut self, index: usize) -> Result<bool> {
        let changed = self.storyboard_mut(index)?.redo();
        if changed {
            self.mark_dirty();
        }
        Ok(changed)
    }

    // === Unsaved changes ===

    pub fn mark_dirty(&mut self) {
        self.unsaved_changes = true;
    }

    /// Called after an explicit export/save.
    pub fn clear_dirty(&mut self) {
        self.unsaved_changes = false;
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.unsaved_changes
    }

    fn push_active(&mut self, storyboard: Storyboard) -> StoryboardId {
        let storyboard = storyboard.with_history_limit(self.history_limit);
        let id = storyboard.id();
        info!("Opened storyboard {} ({})", storyboard.name(), id);
        self.storyboards.push(storyboard);
        self.active = Some(self.storyboards.len() - 1);
        self.mark_dirty();
        id
    }

    fn storyboard_mut(&mut self, index: usize) -> Result<&mut Storyboard> {
        let len = self.storyboards.len();
        debug!("Editing storyboard at tab {}", index);
        self.storyboards
            .get_mut(index)
            .ok_or(StoryboardError::IndexOutOfRange { index, len })
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index < self.storyboards.len() {
            Ok(())
        } else {
            Err(StoryboardError::out_of_range(index, self.storyboards.len()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn registry_with(names: &[&str]) -> StoryboardRegistry {
        let mut registry = StoryboardRegistry::new();
        for name in names {
            registry.open_new(*name);
        }
        registry
    }

    fn names(registry: &StoryboardRegistry) -> Vec<&str> {
        registry.storyboards().iter().map(Storyboard::name).collect()
    }

    #[test]
    fn test_open_new_appends_and_activates() {
        let mut registry = StoryboardRegistry::new();
        assert_eq!(registry.active_index(), None);

        registry.open_new("A");
        registry.open_new("B");

        assert_eq!(names(&registry), vec!["A", "B"]);
        assert_eq!(registry.active_index(), Some(1));
        assert!(registry.has_unsaved_changes());
    }

    #[test]
    fn test_close_active_middle_moves_to_previous() {
        let mut registry = registry_with(&["A", "B", "C"]);
        registry.set_active(1).unwrap();

        let closed = registry.close(1).unwrap();
        assert_eq!(closed.name(), "B");
        assert_eq!(registry.active_index(), Some(0));
    }

    #[test_case(0, 2, Some(1) ; "closing before active shifts it down")]
    #[test_case(2, 1, Some(1) ; "closing after active keeps it")]
    #[test_case(0, 0, Some(0) ; "closing active first tab keeps first")]
    fn test_close_adjusts_active(close: usize, active: usize, expected: Option<usize>) {
        let mut registry = registry_with(&["A", "B", "C"]);
        registry.set_active(active).unwrap();

        registry.close(close).unwrap();
        assert_eq!(registry.active_index(), expected);
    }

    #[test]
    fn test_close_last_leaves_none_active() {
        let mut registry = registry_with(&["A"]);
        registry.close(0).unwrap();

        assert!(registry.is_empty());
        assert_eq!(registry.active_index(), None);
        assert!(registry.active().is_none());
    }

    #[test]
    fn test_set_active_out_of_range() {
        let mut registry = registry_with(&["A", "B"]);
        assert!(matches!(
            registry.set_active(2),
            Err(StoryboardError::IndexOutOfRange { index: 2, len: 2 })
        ));
        assert_eq!(registry.active_index(), Some(1));
    }

    #[test]
    fn test_edits_mark_dirty() {
        let mut registry = registry_with(&["A"]);
        registry.clear_dirty();

        registry.add_page(0).unwrap();
        assert!(registry.has_unsaved_changes());

        registry.clear_dirty();
        registry
            .update_page(0, 0, &PagePatch::new().dialogue("x"))
            .unwrap();
        assert!(registry.has_unsaved_changes());
    }

    #[test]
    fn test_noop_undo_keeps_clean() {
        let mut registry = registry_with(&["A"]);
        registry.clear_dirty();

        assert!(!registry.undo(0).unwrap());
        assert!(!registry.has_unsaved_changes());
    }

    #[test]
    fn test_failed_edit_keeps_clean() {
        let mut registry = registry_with(&["A"]);
        registry.clear_dirty();

        assert!(registry.delete_page(0, 0).is_err());
        assert!(!registry.has_unsaved_changes());
    }

    #[test]
    fn test_open_from_snapshot_has_no_history() {
        let mut registry = StoryboardRegistry::new();
        let pages = PageCollection::new().insert_page();
        registry.open_from_snapshot("Loaded", pages.clone());

        let active = registry.active().unwrap();
        assert_eq!(*active.pages(), pages);
        assert!(!active.can_undo());
    }

    #[test]
    fn test_open_recent_focuses_existing() {
        let mut registry = registry_with(&["A", "B"]);
        let existing = registry.get(0).unwrap().clone();

        assert_eq!(registry.open_recent(existing), 0);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.active_index(), Some(0));

        assert_eq!(registry.open_recent(Storyboard::new("C")), 2);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_restore_clamps_active_hint() {
        let mut registry = StoryboardRegistry::new();
        registry.restore(vec![Storyboard::new("A"), Storyboard::new("B")], Some(9));

        assert_eq!(registry.active_index(), Some(1));
        assert!(!registry.has_unsaved_changes());

        registry.restore(Vec::new(), Some(3));
        assert_eq!(registry.active_index(), None);
    }

    #[test]
    fn test_history_limit_applies_to_new_storyboards() {
        let mut registry = StoryboardRegistry::with_history_limit(Some(2));
        registry.open_new("A");
        for _ in 0..5 {
            registry.add_page(0).unwrap();
        }

        assert_eq!(registry.get(0).unwrap().history().undo_count(), 2);
    }
}
