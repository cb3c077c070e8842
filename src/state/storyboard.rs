//! A named storyboard: one page collection plus its undo history.

use std::fmt;

use log::debug;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::state::history::VersionedStore;
use crate::state::page::{PageCollection, PagePatch};

/// Unique identifier of a storyboard, also the durable store key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoryboardId(Uuid);

impl StoryboardId {
    /// Generate a fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for StoryboardId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for StoryboardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for StoryboardId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// A storyboard open in the registry.
///
/// Edits compute a new collection first and only then commit it, so a failed
/// edit leaves the history exactly as it was.
#[derive(Debug, Clone)]
pub struct Storyboard {
    id: StoryboardId,
    name: String,
    history: VersionedStore<PageCollection>,
}

impl Storyboard {
    /// A new, empty storyboard.
    pub fn new(name: impl Into<String>) -> Self {
        Self::restore(StoryboardId::new(), name, PageCollection::new())
    }

    /// A storyboard whose present is `pages`, with no undo history.
    pub fn with_pages(name: impl Into<String>, pages: PageCollection) -> Self {
        Self::restore(StoryboardId::new(), name, pages)
    }

    /// Rebuild a storyboard under a known id, e.g. from the durable store.
    pub fn restore(id: StoryboardId, name: impl Into<String>, pages: PageCollection) -> Self {
        Self {
            id,
            name: name.into(),
            history: VersionedStore::new(pages),
        }
    }

    /// Limit how many undo steps this storyboard keeps.
    pub fn with_history_limit(mut self, limit: Option<usize>) -> Self {
        self.history.set_max_levels(limit);
        self
    }

    pub fn id(&self) -> StoryboardId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The current pages; the only state exposed for rendering and export.
    pub fn pages(&self) -> &PageCollection {
        self.history.present()
    }

    pub fn history(&self) -> &VersionedStore<PageCollection> {
        &self.history
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Compute a new collection from the present one and commit it.
    pub fn apply<F>(&mut self, edit: F) -> Result<()>
    where
        F: FnOnce(&PageCollection) -> Result<PageCollection>,
    {
        let next = edit(self.history.present())?;
        self.history.commit(next);
        debug!(
            "Storyboard {} committed ({} pages, {} undo steps)",
            self.id,
            self.pages().len(),
            self.history.undo_count()
        );
        Ok(())
    }

    /// Append an empty page and return its index.
    pub fn add_page(&mut self) -> usize {
        let next = self.history.present().insert_page();
        let index = next.len() - 1;
        self.history.commit(next);
        index
    }

    pub fn update_page(&mut self, index: usize, patch: &PagePatch) -> Result<()> {
        self.apply(|pages| pages.update_page(index, patch))
    }

    pub fn delete_page(&mut self, index: usize) -> Result<()> {
        self.apply(|pages| pages.delete_page(index))
    }

    /// Move a page. Returns false, without adding a history step, when the
    /// move would not change anything.
    pub fn reorder_pages(&mut self, source: usize, target: usize) -> Result<bool> {
        let next = self.history.present().reorder_pages(source, target)?;
        if source == target {
            return Ok(false);
        }
        self.history.commit(next);
        Ok(true)
    }

    pub fn undo(&mut self) -> bool {
        self.history.undo()
    }

    pub fn redo(&mut self) -> bool {
        self.history.redo()
    }
}
