//! Recording session state machine.
//!
//! The platform recorder lives outside the engine. It drives a
//! [`CaptureSession`] through explicit transitions and hands the finished
//! blob back as a [`PagePatch`] for the page being recorded.

use chrono::{DateTime, Duration, Utc};
use log::{debug, warn};

use crate::error::{Result, StoryboardError};
use crate::media::blob::{encode_data_url, BlobField};
use crate::state::PagePatch;

/// Mime type of recorded audio.
pub const RECORDING_MIME: &str = "audio/webm";

/// Where a capture session is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Recording {
        started_at: DateTime<Utc>,
        chunks: Vec<Vec<u8>>,
    },
    Completed {
        blob: String,
        duration: Duration,
    },
    Failed {
        reason: String,
    },
}

/// One recording, from start to blob.
#[derive(Debug, Clone)]
pub struct CaptureSession {
    state: CaptureState,
    mime: String,
}

impl Default for CaptureSession {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureSession {
    pub fn new() -> Self {
        Self::with_mime(RECORDING_MIME)
    }

    pub fn with_mime(mime: impl Into<String>) -> Self {
        Self {
            state: CaptureState::Idle,
            mime: mime.into(),
        }
    }

    pub fn state(&self) -> &CaptureState {
        &self.state
    }

    pub fn is_recording(&self) -> bool {
        matches!(self.state, CaptureState::Recording { .. })
    }

    /// Begin recording. Allowed from any state except `Recording`.
    pub fn start(&mut self) -> Result<()> {
        if self.is_recording() {
            return Err(invalid("already recording"));
        }
        self.state = CaptureState::Recording {
            started_at: Utc::now(),
            chunks: Vec::new(),
        };
        debug!("Capture started");
        Ok(())
    }

    /// Append a chunk of encoded audio delivered by the recorder.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Result<()> {
        match &mut self.state {
            CaptureState::Recording { chunks, .. } => {
                chunks.push(chunk.to_vec());
                Ok(())
            }
            _ => Err(invalid("not recording")),
        }
    }

    /// Finish recording and produce the patch that stores the audio.
    ///
    /// A recording with no data fails and leaves the page untouched.
    pub fn stop(&mut self) -> Result<PagePatch> {
        let CaptureState::Recording { started_at, chunks } =
            std::mem::replace(&mut self.state, CaptureState::Idle)
        else {
            return Err(invalid("not recording"));
        };

        let bytes = chunks.concat();
        if bytes.is_empty() {
            self.fail("no audio captured");
            return Err(invalid("no audio captured"));
        }

        let blob = encode_data_url(&self.mime, &bytes);
        let duration = Utc::now().signed_duration_since(started_at);
        debug!("Capture finished: {} bytes", bytes.len());
        self.state = CaptureState::Completed {
            blob: blob.clone(),
            duration,
        };
        Ok(BlobField::Audio.patch(blob))
    }

    /// Record that the platform recorder failed (e.g. microphone denied).
    pub fn fail(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        warn!("Capture failed: {}", reason);
        self.state = CaptureState::Failed { reason };
    }

    /// Back to `Idle`, discarding anything recorded.
    pub fn reset(&mut self) {
        self.state = CaptureState::Idle;
    }
}

fn invalid(reason: &str) -> StoryboardError {
    StoryboardError::CaptureState {
        reason: reason.to_string(),
    }
}
