//! Engine configuration.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StoryboardError};

/// Default directory for storyboard data.
pub const DEFAULT_DATA_DIR: &str = ".storyboards";

/// Directory (under the data dir) holding one record per storyboard.
pub const RECORDS_DIR: &str = "records";

/// File (under the data dir) holding scalar preferences.
pub const PREFERENCES_FILE: &str = "preferences.json";

/// Slide duration used when a page has no usable timestamp.
pub const DEFAULT_SLIDE_SECONDS: f64 = 5.0;

/// Settings for the engine and its stores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Root directory for durable records and preferences.
    pub data_dir: PathBuf,

    /// Maximum undo steps per storyboard; `None` keeps every step.
    pub history_limit: Option<usize>,

    /// Seconds a slide stays up when its timestamp gives no duration.
    pub default_slide_seconds: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            history_limit: None,
            default_slide_seconds: DEFAULT_SLIDE_SECONDS,
        }
    }
}

impl EngineConfig {
    /// Default settings rooted at `data_dir`.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// Load settings from a JSON file. Missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| StoryboardError::FileReadError {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn records_dir(&self) -> PathBuf {
        self.data_dir.join(RECORDS_DIR)
    }

    pub fn preferences_path(&self) -> PathBuf {
        self.data_dir.join(PREFERENCES_FILE)
    }

    pub fn default_slide_duration(&self) -> Duration {
        if self.default_slide_seconds.is_finite() && self.default_slide_seconds > 0.0 {
            Duration::from_secs_f64(self.default_slide_seconds)
        } else {
            Duration::from_secs_f64(DEFAULT_SLIDE_SECONDS)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_paths() {
        let config = EngineConfig::with_data_dir("/tmp/sb");
        assert_eq!(config.records_dir(), PathBuf::from("/tmp/sb/records"));
        assert_eq!(
            config.preferences_path(),
            PathBuf::from("/tmp/sb/preferences.json")
        );
        assert_eq!(config.history_limit, None);
    }

    #[test]
    fn test_load_partial_file_uses_defaults() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("config.json");
        fs::write(&path, r#"{ "history_limit": 25 }"#).unwrap();

        let config = EngineConfig::load(&path).unwrap();
        assert_eq!(config.history_limit, Some(25));
        assert_eq!(config.data_dir, PathBuf::from(DEFAULT_DATA_DIR));
        assert_eq!(config.default_slide_duration(), Duration::from_secs(5));
    }

    #[test]
    fn test_load_missing_file_fails() {
        let temp = tempdir().unwrap();
        let result = EngineConfig::load(&temp.path().join("nope.json"));
        assert!(matches!(result, Err(StoryboardError::FileReadError { .. })));
    }

    #[test]
    fn test_invalid_slide_seconds_falls_back() {
        let config = EngineConfig {
            default_slide_seconds: -1.0,
            ..EngineConfig::default()
        };
        assert_eq!(config.default_slide_duration(), Duration::from_secs(5));
    }
}
