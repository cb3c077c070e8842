//! Persistence Module
//!
//! Two tiers: a durable per-storyboard record store written in the
//! background by the gateway, and a small synchronous key-value store for
//! preferences.

pub mod durable;
pub mod gateway;
pub mod scalar;

pub use durable::{
    DurableStore, FileDurableStore, MemoryDurableStore, RecordDraft, StoredStoryboard,
};
pub use gateway::{FlushReport, PersistenceGateway, PersistenceStatus, WriteFailure};
pub use scalar::{FileScalarStore, MemoryScalarStore, Preferences, ScalarStore};
