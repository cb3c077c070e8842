//! Durable per-storyboard records.
//!
//! Each open storyboard is stored as one record keyed by its id. Only the
//! present pages are stored; undo history never survives a reload.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use crate::error::{Result, StoryboardError};
use crate::state::{PageCollection, Storyboard, StoryboardId};

/// Extension of record files.
const RECORD_EXTENSION: &str = "json";

/// Suffix of the temporary file a record is written to before the rename.
const TEMP_SUFFIX: &str = ".tmp";

/// One persisted storyboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredStoryboard {
    pub id: StoryboardId,
    pub name: String,
    pub pages: PageCollection,

    /// Tab position when saved; restores tab order.
    #[serde(default)]
    pub position: usize,

    pub saved_at: DateTime<Utc>,

    /// SHA-256 of the serialized pages.
    pub checksum: String,
}

/// The present pages of a storyboard, queued for writing. Serializing and
/// checksumming happen later, in [`RecordDraft::seal`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordDraft {
    pub id: StoryboardId,
    pub name: String,
    pub pages: PageCollection,
    pub position: usize,
}

impl RecordDraft {
    /// Snapshot the present pages of `storyboard` at tab `position`.
    pub fn capture(storyboard: &Storyboard, position: usize) -> Self {
        Self {
            id: storyboard.id(),
            name: storyboard.name().to_string(),
            pages: storyboard.pages().clone(),
            position,
        }
    }

    /// Stamp and checksum the draft into a storable record.
    pub fn seal(&self) -> Result<StoredStoryboard> {
        Ok(StoredStoryboard {
            id: self.id,
            name: self.name.clone(),
            pages: self.pages.clone(),
            position: self.position,
            saved_at: Utc::now(),
            checksum: pages_checksum(&self.pages)?,
        })
    }
}

impl StoredStoryboard {
    /// Snapshot, stamp and checksum `storyboard` at tab `position`.
    pub fn capture(storyboard: &Storyboard, position: usize) -> Result<Self> {
        RecordDraft::capture(storyboard, position).seal()
    }

    /// Check the stored checksum against the pages.
    pub fn verify(&self) -> Result<()> {
        let actual = pages_checksum(&self.pages)?;
        if actual == self.checksum {
            Ok(())
        } else {
            Err(StoryboardError::Internal(format!(
                "checksum mismatch for {}: expected {}, found {}",
                self.id, self.checksum, actual
            )))
        }
    }

    /// Rebuild the storyboard with an empty history.
    pub fn into_storyboard(self) -> Storyboard {
        Storyboard::restore(self.id, self.name, self.pages)
    }
}

fn pages_checksum(pages: &PageCollection) -> Result<String> {
    let bytes = serde_json::to_vec(pages)?;
    Ok(format!("{:x}", Sha256::digest(&bytes)))
}

/// Durable store of storyboard records.
///
/// Implementations must replace a record all-or-nothing: a failed `put`
/// leaves the previous version of that record intact.
pub trait DurableStore: Send + Sync {
    /// Every stored record, ordered by tab position. An empty or missing
    /// store yields an empty list.
    fn load_all(&self) -> Result<Vec<StoredStoryboard>>;

    /// Insert or replace the record with `record.id`.
    fn put(&self, record: &StoredStoryboard) -> Result<()>;

    /// Remove the record for `id`, if any.
    fn delete(&self, id: StoryboardId) -> Result<()>;
}

/// Stores one JSON file per storyboard in a directory.
#[derive(Debug, Clone)]
pub struct FileDurableStore {
    dir: PathBuf,
}

impl FileDurableStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the record for `id`.
    pub fn record_path(&self, id: StoryboardId) -> PathBuf {
        self.dir.join(format!("{}.{}", id, RECORD_EXTENSION))
    }

    fn read_record(path: &Path) -> Result<StoredStoryboard> {
        let content = fs::read_to_string(path).map_err(|e| StoryboardError::FileReadError {
            path: path.to_path_buf(),
            source: e,
        })?;
        let record: StoredStoryboard =
            serde_json::from_str(&content).map_err(|e| StoryboardError::CorruptRecord {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        record.verify().map_err(|e| StoryboardError::CorruptRecord {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Ok(record)
    }
}

impl DurableStore for FileDurableStore {
    fn load_all(&self) -> Result<Vec<StoredStoryboard>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut records = Vec::new();
        let entries = WalkDir::new(&self.dir)
            .max_depth(1)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| {
                entry.path().extension().and_then(|ext| ext.to_str()) == Some(RECORD_EXTENSION)
            });

        for entry in entries {
            match Self::read_record(entry.path()) {
                Ok(record) => records.push(record),
                Err(e) => warn!("Skipping storyboard record: {}", e),
            }
        }

        records.sort_by_key(|record| record.position);
        debug!("Loaded {} record(s) from {}", records.len(), self.dir.display());
        Ok(records)
    }

    fn put(&self, record: &StoredStoryboard) -> Result<()> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir).map_err(|e| StoryboardError::DirectoryCreateError {
                path: self.dir.clone(),
                source: e,
            })?;
        }

        let path = self.record_path(record.id);
        let mut temp_path = path.clone().into_os_string();
        temp_path.push(TEMP_SUFFIX);
        let temp_path = PathBuf::from(temp_path);

        let content = serde_json::to_string_pretty(record)?;
        fs::write(&temp_path, content).map_err(|e| StoryboardError::FileWriteError {
            path: temp_path.clone(),
            source: e,
        })?;
        fs::rename(&temp_path, &path).map_err(|e| StoryboardError::FileWriteError {
            path: path.clone(),
            source: e,
        })?;

        Ok(())
    }

    fn delete(&self, id: StoryboardId) -> Result<()> {
        let path = self.record_path(id);
        if path.exists() {
            fs::remove_file(&path).map_err(|e| StoryboardError::FileWriteError { path, source: e })?;
        }
        Ok(())
    }
}

/// A write applied to a [`MemoryDurableStore`], in application order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteEvent {
    Put { id: StoryboardId, name: String },
    Delete { id: StoryboardId },
}

/// In-memory store with write logging and failure injection.
#[derive(Debug, Default)]
pub struct MemoryDurableStore {
    records: Mutex<BTreeMap<StoryboardId, StoredStoryboard>>,
    log: Mutex<Vec<WriteEvent>>,
    fail_writes: AtomicBool,
}

impl MemoryDurableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate the store.
    pub fn with_records(records: impl IntoIterator<Item = StoredStoryboard>) -> Self {
        let store = Self::new();
        {
            let mut map = lock(&store.records);
            for record in records {
                map.insert(record.id, record);
            }
        }
        store
    }

    /// Make every subsequent write fail (or succeed again).
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn get(&self, id: StoryboardId) -> Option<StoredStoryboard> {
        lock(&self.records).get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        lock(&self.records).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.records).is_empty()
    }

    /// Every successful write so far, oldest first.
    pub fn write_log(&self) -> Vec<WriteEvent> {
        lock(&self.log).clone()
    }

    fn check_writable(&self, id: StoryboardId) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoryboardError::PersistenceWriteFailed {
                id,
                reason: "store unavailable".to_string(),
            });
        }
        Ok(())
    }
}

impl DurableStore for MemoryDurableStore {
    fn load_all(&self) -> Result<Vec<StoredStoryboard>> {
        let mut records: Vec<StoredStoryboard> = lock(&self.records).values().cloned().collect();
        records.sort_by_key(|record| record.position);
        Ok(records)
    }

    fn put(&self, record: &StoredStoryboard) -> Result<()> {
        self.check_writable(record.id)?;
        lock(&self.records).insert(record.id, record.clone());
        lock(&self.log).push(WriteEvent::Put {
            id: record.id,
            name: record.name.clone(),
        });
        Ok(())
    }

    fn delete(&self, id: StoryboardId) -> Result<()> {
        self.check_writable(id)?;
        lock(&self.records).remove(&id);
        lock(&self.log).push(WriteEvent::Delete { id });
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
