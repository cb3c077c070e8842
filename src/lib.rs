//! Storyboard Engine
//!
//! Versioned state for storyboards: ordered pages of image, dialogue, notes
//! and audio, with linear undo/redo per storyboard and durable save/restore
//! across sessions.
//!
//! # Architecture
//!
//! - `state`: pages, the generic undo/redo store, storyboards and the
//!   registry of open storyboards
//! - `persistence`: durable per-storyboard records written in the background,
//!   plus a small synchronous preference store
//! - `transfer`: the JSON export/import file format
//! - `media`: blob ingestion, recording sessions and playback planning
//! - `workspace`: wires the above together for an application

pub mod cli;
pub mod config;
pub mod error;
pub mod media;
pub mod persistence;
pub mod state;
pub mod transfer;
pub mod workspace;

pub use config::EngineConfig;
pub use error::{Result, StoryboardError};
pub use workspace::Workspace;
