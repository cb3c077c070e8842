//! Playback planning.
//!
//! Turns the present pages into the two playback orders the editor offers:
//! an audio queue (every page with audio, in order) and a slideshow (every
//! page, each held for a duration taken from its timestamp cue). Actual
//! audio output and rendering belong to the caller.

use std::time::Duration;

use crate::state::{PageCollection, PageId};

/// One entry of the audio queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioCue<'a> {
    pub page_index: usize,
    pub page_id: PageId,
    pub audio: &'a str,
}

/// One slide of a slideshow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slide {
    pub page_index: usize,
    pub page_id: PageId,
    /// How long the slide stays up unless its audio ends first.
    pub duration: Duration,
    pub has_audio: bool,
}

/// Pages that carry audio, in sequence order.
pub fn audio_queue(pages: &PageCollection) -> Vec<AudioCue<'_>> {
    pages
        .iter()
        .enumerate()
        .filter(|(_, page)| page.has_audio())
        .map(|(page_index, page)| AudioCue {
            page_index,
            page_id: page.id(),
            audio: &page.audio,
        })
        .collect()
}

/// One slide per page. A page whose timestamp does not start with a positive
/// number of seconds that fits a `Duration` is held for `default`.
pub fn slideshow(pages: &PageCollection, default: Duration) -> Vec<Slide> {
    pages
        .iter()
        .enumerate()
        .map(|(page_index, page)| Slide {
            page_index,
            page_id: page.id(),
            duration: parse_cue_seconds(&page.timestamp)
                .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
                .unwrap_or(default),
            has_audio: page.has_audio(),
        })
        .collect()
}

/// Seconds from the leading number of a timestamp cue (`"2.5"`, `"3s"`,
/// `" 4 sec"`). `None` unless the number is positive and finite.
pub fn parse_cue_seconds(timestamp: &str) -> Option<f64> {
    let trimmed = timestamp.trim_start();
    let candidate_len = trimmed
        .char_indices()
        .find(|(_, c)| !matches!(c, '0'..='9' | '.' | '+' | '-' | 'e' | 'E'))
        .map_or(trimmed.len(), |(i, _)| i);

    (1..=candidate_len)
        .rev()
        .find_map(|len| trimmed[..len].parse::<f64>().ok())
        .filter(|secs| secs.is_finite() && *secs > 0.0)
}

/// Position within a playback plan of `len` entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackCursor {
    len: usize,
    current: Option<usize>,
}

impl PlaybackCursor {
    pub fn new(len: usize) -> Self {
        Self { len, current: None }
    }

    /// Start at the first entry. `None` if the plan is empty.
    pub fn start(&mut self) -> Option<usize> {
        self.current = if self.len > 0 { Some(0) } else { None };
        self.current
    }

    /// Move to the next entry; `None` once the plan is finished.
    pub fn advance(&mut self) -> Option<usize> {
        self.current = match self.current {
            Some(i) if i + 1 < self.len => Some(i + 1),
            _ => None,
        };
        self.current
    }

    pub fn stop(&mut self) {
        self.current = None;
    }

    /// Entry being played, if any.
    pub fn current(&self) -> Option<usize> {
        self.current
    }

    pub fn is_playing(&self) -> bool {
        self.current.is_some()
    }
}
