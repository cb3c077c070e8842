//! Media Module
//!
//! Blob ingestion, recording sessions and playback planning. Codecs and
//! devices stay outside; only opaque blob strings pass through here.

pub mod blob;
pub mod capture;
pub mod playback;

pub use blob::{read_blob, BlobField};
pub use capture::{CaptureSession, CaptureState};
pub use playback::{audio_queue, slideshow, AudioCue, PlaybackCursor, Slide};
