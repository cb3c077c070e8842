//! Lightweight key-value preferences.
//!
//! Small scalars are read synchronously at startup, before the durable
//! storyboard load finishes, so a UI can render with cached preferences.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use log::{debug, warn};

use crate::error::{Result, StoryboardError};

pub const KEY_ACTIVE_TAB: &str = "activeTabIndex";
pub const KEY_DARK_MODE: &str = "darkMode";
pub const KEY_SETUP_COMPLETE: &str = "hasCompletedSetup";
pub const KEY_USER_NAME: &str = "userName";

/// Name used when the name prompt gives nothing back.
pub const DEFAULT_USER_NAME: &str = "User";

/// Synchronous string key-value store.
pub trait ScalarStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// Key-value pairs kept in one JSON object file.
///
/// The whole file is read once on open; every `set` rewrites it.
#[derive(Debug)]
pub struct FileScalarStore {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl FileScalarStore {
    /// Open the store at `path`. A missing file starts empty; an unreadable
    /// one is logged and also starts empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = match Self::read_values(&path) {
            Ok(values) => values,
            Err(e) => {
                warn!("Ignoring unreadable preferences: {}", e);
                BTreeMap::new()
            }
        };
        Self {
            path,
            values: Mutex::new(values),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_values(path: &Path) -> Result<BTreeMap<String, String>> {
        if !path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = fs::read_to_string(path).map_err(|e| StoryboardError::FileReadError {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    fn write_values(&self, values: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| StoryboardError::DirectoryCreateError {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
            }
        }
        let content = serde_json::to_string_pretty(values)?;
        fs::write(&self.path, content).map_err(|e| StoryboardError::FileWriteError {
            path: self.path.clone(),
            source: e,
        })
    }
}

impl ScalarStore for FileScalarStore {
    fn get(&self, key: &str) -> Option<String> {
        lock(&self.values).get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut values = lock(&self.values);
        values.insert(key.to_string(), value.to_string());
        self.write_values(&values)
    }
}

/// In-memory store for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryScalarStore {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemoryScalarStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ScalarStore for MemoryScalarStore {
    fn get(&self, key: &str) -> Option<String> {
        lock(&self.values).get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        lock(&self.values).insert(key.to_string(), value.to_string());
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Preferences cached in the scalar store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Preferences {
    /// Last active tab; `None` when no tab was open.
    pub active_tab_index: Option<usize>,
    pub dark_mode: bool,
    /// Whether the first-run colour mode choice has been made.
    pub has_completed_setup: bool,
    /// Display name used for the greeting.
    pub user_name: Option<String>,
}

impl Preferences {
    pub fn load(store: &dyn ScalarStore) -> Self {
        let prefs = Self {
            active_tab_index: store
                .get(KEY_ACTIVE_TAB)
                .and_then(|v| v.trim().parse::<i64>().ok())
                .and_then(|v| usize::try_from(v).ok()),
            dark_mode: parse_flag(store.get(KEY_DARK_MODE)),
            has_completed_setup: parse_flag(store.get(KEY_SETUP_COMPLETE)),
            user_name: store.get(KEY_USER_NAME).filter(|name| !name.is_empty()),
        };
        debug!("Loaded preferences: {:?}", prefs);
        prefs
    }

    pub fn set_active_tab(&mut self, store: &dyn ScalarStore, index: Option<usize>) -> Result<()> {
        self.active_tab_index = index;
        let value = index.map_or_else(|| "-1".to_string(), |i| i.to_string());
        store.set(KEY_ACTIVE_TAB, &value)
    }

    pub fn set_dark_mode(&mut self, store: &dyn ScalarStore, dark_mode: bool) -> Result<()> {
        self.dark_mode = dark_mode;
        store.set(KEY_DARK_MODE, bool_str(dark_mode))
    }

    pub fn toggle_dark_mode(&mut self, store: &dyn ScalarStore) -> Result<bool> {
        let next = !self.dark_mode;
        self.set_dark_mode(store, next)?;
        Ok(next)
    }

    /// Record the first-run colour mode choice.
    pub fn complete_setup(&mut self, store: &dyn ScalarStore, dark_mode: bool) -> Result<()> {
        self.set_dark_mode(store, dark_mode)?;
        self.has_completed_setup = true;
        store.set(KEY_SETUP_COMPLETE, bool_str(true))
    }

    pub fn set_user_name(&mut self, store: &dyn ScalarStore, name: &str) -> Result<()> {
        self.user_name = Some(name.to_string());
        store.set(KEY_USER_NAME, name)
    }

    /// The stored display name, asking `prompt` once if there is none.
    pub fn user_name_or_prompt<F>(&mut self, store: &dyn ScalarStore, prompt: F) -> Result<String>
    where
        F: FnOnce() -> Option<String>,
    {
        if let Some(name) = &self.user_name {
            return Ok(name.clone());
        }
        let name = prompt()
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| DEFAULT_USER_NAME.to_string());
        self.set_user_name(store, &name)?;
        Ok(name)
    }
}

fn parse_flag(value: Option<String>) -> bool {
    value.as_deref() == Some("true")
}

fn bool_str(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}
