//! Pages and the ordered page collection.
//!
//! Every structural operation returns a new collection and leaves its input
//! untouched. Page numbers are recomputed over the whole sequence after each
//! structural change, so they are always exactly `1..=N` in order.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StoryboardError};

/// Identifier of a page, stable across edits and reorders.
pub type PageId = u64;

/// One storyboard frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    id: PageId,

    /// 1-based position, owned by the collection.
    #[serde(default)]
    page_number: usize,

    /// Optional label shown next to the page number.
    #[serde(default)]
    pub page_name: String,

    /// Image blob (data URL) or empty.
    #[serde(default)]
    pub image: String,

    #[serde(default)]
    pub dialogue: String,

    /// Context or production notes.
    #[serde(default)]
    pub context: String,

    /// Free-text display cue. Only used as a hint for slideshow timing.
    #[serde(default)]
    pub timestamp: String,

    /// Audio blob (data URL) or empty.
    #[serde(default)]
    pub audio: String,
}

impl Page {
    /// Create an empty page. Its number is assigned when it joins a collection.
    pub fn new(id: PageId) -> Self {
        Self {
            id,
            page_number: 0,
            page_name: String::new(),
            image: String::new(),
            dialogue: String::new(),
            context: String::new(),
            timestamp: String::new(),
            audio: String::new(),
        }
    }

    pub fn id(&self) -> PageId {
        self.id
    }

    pub fn page_number(&self) -> usize {
        self.page_number
    }

    pub fn has_audio(&self) -> bool {
        !self.audio.is_empty()
    }

    pub fn has_image(&self) -> bool {
        !self.image.is_empty()
    }
}

/// Editable page fields. Unset fields are left as they are.
///
/// Identity and numbering are deliberately absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PagePatch {
    pub page_name: Option<String>,
    pub image: Option<String>,
    pub dialogue: Option<String>,
    pub context: Option<String>,
    pub timestamp: Option<String>,
    pub audio: Option<String>,
}

impl PagePatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page_name(mut self, value: impl Into<String>) -> Self {
        self.page_name = Some(value.into());
        self
    }

    pub fn image(mut self, value: impl Into<String>) -> Self {
        self.image = Some(value.into());
        self
    }

    pub fn dialogue(mut self, value: impl Into<String>) -> Self {
        self.dialogue = Some(value.into());
        self
    }

    pub fn context(mut self, value: impl Into<String>) -> Self {
        self.context = Some(value.into());
        self
    }

    pub fn timestamp(mut self, value: impl Into<String>) -> Self {
        self.timestamp = Some(value.into());
        self
    }

    pub fn audio(mut self, value: impl Into<String>) -> Self {
        self.audio = Some(value.into());
        self
    }

    /// Build a patch from a field name as typed by a user (`dialogue`,
    /// `pageName`/`page_name`/`name`, ...). Returns `None` for unknown fields.
    pub fn for_field(field: &str, value: impl Into<String>) -> Option<Self> {
        let patch = Self::new();
        let patch = match field {
            "pageName" | "page_name" | "name" => patch.page_name(value),
            "image" => patch.image(value),
            "dialogue" => patch.dialogue(value),
            "context" | "notes" => patch.context(value),
            "timestamp" => patch.timestamp(value),
            "audio" => patch.audio(value),
            _ => return None,
        };
        Some(patch)
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    fn apply_to(&self, page: &mut Page) {
        let fields = [
            (&self.page_name, &mut page.page_name),
            (&self.image, &mut page.image),
            (&self.dialogue, &mut page.dialogue),
            (&self.context, &mut page.context),
            (&self.timestamp, &mut page.timestamp),
            (&self.audio, &mut page.audio),
        ];
        for (change, slot) in fields {
            if let Some(value) = change {
                slot.clone_from(value);
            }
        }
    }
}

/// Ordered sequence of pages. Order defines page numbers and playback order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageCollection {
    pages: Vec<Page>,
}

impl PageCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap pages exactly as given, numbering included.
    pub fn from_pages(pages: Vec<Page>) -> Self {
        Self { pages }
    }

    /// Wrap pages and recompute their numbers from their order.
    pub fn from_pages_renumbered(mut pages: Vec<Page>) -> Self {
        renumber(&mut pages);
        Self { pages }
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn into_pages(self) -> Vec<Page> {
        self.pages
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Page> {
        self.pages.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Page> {
        self.pages.iter()
    }

    /// Position of the page with the given id.
    pub fn position_of(&self, id: PageId) -> Option<usize> {
        self.pages.iter().position(|p| p.id == id)
    }

    /// Id the next inserted page will receive: one past the largest id, or
    /// the smallest unused id once the largest is `PageId::MAX`.
    pub fn next_id(&self) -> PageId {
        match self.pages.iter().map(|p| p.id).max() {
            None => 1,
            Some(max) => max
                .checked_add(1)
                .unwrap_or_else(|| self.smallest_unused_id()),
        }
    }

    /// True when page numbers are exactly `1..=N` in order.
    pub fn is_densely_numbered(&self) -> bool {
        self.pages
            .iter()
            .enumerate()
            .all(|(i, p)| p.page_number == i + 1)
    }

    /// Append an empty page with a fresh id.
    pub fn insert_page(&self) -> Self {
        let mut pages = self.pages.clone();
        pages.push(Page::new(self.next_id()));
        renumber(&mut pages);
        Self { pages }
    }

    /// Replace fields on the page at `index`.
    pub fn update_page(&self, index: usize, patch: &PagePatch) -> Result<Self> {
        self.check_index(index)?;
        let mut pages = self.pages.clone();
        patch.apply_to(&mut pages[index]);
        Ok(Self { pages })
    }

    /// Remove the page at `index` and renumber the rest.
    pub fn delete_page(&self, index: usize) -> Result<Self> {
        self.check_index(index)?;
        let mut pages = self.pages.clone();
        pages.remove(index);
        renumber(&mut pages);
        Ok(Self { pages })
    }

    /// Move the page at `source` so it ends up at `target`.
    ///
    /// `target` is an index into the sequence after the page has been removed,
    /// which is the usual splice behaviour.
    pub fn reorder_pages(&self, source: usize, target: usize) -> Result<Self> {
        self.check_index(source)?;
        self.check_index(target)?;
        if source == target {
            return Ok(self.clone());
        }

        let mut pages = self.pages.clone();
        let moved = pages.remove(source);
        pages.insert(target, moved);
        renumber(&mut pages);
        Ok(Self { pages })
    }

    fn smallest_unused_id(&self) -> PageId {
        let used: BTreeSet<PageId> = self.pages.iter().map(|p| p.id).collect();
        (1..=PageId::MAX).find(|id| !used.contains(id)).unwrap_or(0)
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index < self.pages.len() {
            Ok(())
        } else {
            Err(StoryboardError::out_of_range(index, self.pages.len()))
        }
    }
}

impl<'a> IntoIterator for &'a PageCollection {
    type Item = &'a Page;
    type IntoIter = std::slice::Iter<'a, Page>;

    fn into_iter(self) -> Self::IntoIter {
        self.pages.iter()
    }
}

fn renumber(pages: &mut [Page]) {
    for (i, page) in pages.iter_mut().enumerate() {
        page.page_number = i + 1;
    }
}
