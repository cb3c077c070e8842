//! Error types for the storyboard engine.

use std::path::PathBuf;
use thiserror::Error;

use crate::state::StoryboardId;

/// Result type for storyboard operations.
pub type Result<T> = std::result::Result<T, StoryboardError>;

/// Errors that can occur in the storyboard engine.
#[derive(Error, Debug)]
pub enum StoryboardError {
    // Collection Errors
    #[error("Index {index} out of range for {len} entries")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("No storyboard is active")]
    NoActiveStoryboard,

    // Import / Blob Errors
    #[error("Invalid storyboard file: {reason}")]
    InvalidStoryboardFile { reason: String },

    #[error("Failed to read blob: {path}: {source}")]
    BlobReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Capture session error: {reason}")]
    CaptureState { reason: String },

    // Persistence Errors
    #[error("Failed to persist storyboard {id}: {reason}")]
    PersistenceWriteFailed { id: StoryboardId, reason: String },

    #[error("Corrupt record {path}: {reason}")]
    CorruptRecord { path: PathBuf, reason: String },

    // File Errors
    #[error("Failed to read file: {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}: {source}")]
    FileWriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Directory creation failed: {path}: {source}")]
    DirectoryCreateError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Serialization Errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // Generic Errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoryboardError {
    /// Shorthand for an out-of-range position against a collection of `len`.
    pub fn out_of_range(index: usize, len: usize) -> Self {
        StoryboardError::IndexOutOfRange { index, len }
    }

    /// Shorthand for a rejected import.
    pub fn invalid_file(reason: impl Into<String>) -> Self {
        StoryboardError::InvalidStoryboardFile {
            reason: reason.into(),
        }
    }

    /// Returns true if this error indicates the operation can be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StoryboardError::PersistenceWriteFailed { .. }
                | StoryboardError::FileWriteError { .. }
                | StoryboardError::DirectoryCreateError { .. }
        )
    }

    /// Returns a user-friendly recovery suggestion.
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            StoryboardError::InvalidStoryboardFile { .. } => {
                Some("The file must be a JSON object with a non-empty \"name\" and a \"pages\" list.")
            }
            StoryboardError::BlobReadFailed { .. } => {
                Some("Check that the file still exists and is readable, then pick it again.")
            }
            StoryboardError::PersistenceWriteFailed { .. } => {
                Some("Your work is kept in memory. Saving will be retried on the next change.")
            }
            StoryboardError::NoActiveStoryboard => {
                Some("Create or open a storyboard first.")
            }
            StoryboardError::CorruptRecord { .. } => {
                Some("The record was skipped. Re-import the storyboard from an exported file.")
            }
            _ => None,
        }
    }
}
