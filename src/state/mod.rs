//! State Management Module
//!
//! Pages, the versioned history wrapper, storyboards and the registry of
//! open storyboards.

pub mod history;
pub mod page;
pub mod registry;
pub mod storyboard;

pub use history::{HistoryFrame, VersionedStore};
pub use page::{Page, PageCollection, PageId, PagePatch};
pub use registry::StoryboardRegistry;
pub use storyboard::{Storyboard, StoryboardId};
