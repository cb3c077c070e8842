//! Binary-blob ingestion.
//!
//! Images and audio are stored on pages as opaque `data:` URLs. The engine
//! never decodes the payload; it only wraps and unwraps the base64 text.

use std::fs;
use std::path::Path;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use log::debug;

use crate::error::{Result, StoryboardError};
use crate::state::PagePatch;

/// Mime type used when the extension is not recognised.
pub const FALLBACK_MIME: &str = "application/octet-stream";

/// Page field that holds a blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobField {
    Image,
    Audio,
}

impl BlobField {
    /// Patch setting this field to `blob`.
    pub fn patch(self, blob: impl Into<String>) -> PagePatch {
        match self {
            BlobField::Image => PagePatch::new().image(blob),
            BlobField::Audio => PagePatch::new().audio(blob),
        }
    }

    /// Patch emptying this field.
    pub fn clear(self) -> PagePatch {
        self.patch(String::new())
    }
}

impl std::str::FromStr for BlobField {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "image" => Ok(BlobField::Image),
            "audio" => Ok(BlobField::Audio),
            other => Err(format!("unknown blob field: {}", other)),
        }
    }
}

/// Guess a mime type from the file extension.
pub fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        Some("bmp") => "image/bmp",
        Some("wav") => "audio/wav",
        Some("mp3") => "audio/mpeg",
        Some("ogg") | Some("oga") => "audio/ogg",
        Some("webm") => "audio/webm",
        Some("m4a") => "audio/mp4",
        Some("flac") => "audio/flac",
        _ => FALLBACK_MIME,
    }
}

/// Wrap raw bytes as a `data:<mime>;base64,<payload>` string.
pub fn encode_data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, BASE64.encode(bytes))
}

/// Split a data URL into its mime type and decoded bytes.
pub fn decode_data_url(blob: &str) -> Option<(String, Vec<u8>)> {
    let rest = blob.strip_prefix("data:")?;
    let (header, payload) = rest.split_once(',')?;
    let mime = header.strip_suffix(";base64")?;
    let bytes = BASE64.decode(payload).ok()?;
    Some((mime.to_string(), bytes))
}

/// Read a user-selected file into a blob string.
pub fn read_blob(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|e| StoryboardError::BlobReadFailed {
        path: path.to_path_buf(),
        source: e,
    })?;
    let mime = mime_for_path(path);
    debug!("Read {} byte blob ({}) from {}", bytes.len(), mime, path.display());
    Ok(encode_data_url(mime, &bytes))
}
