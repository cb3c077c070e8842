//! Workspace
//!
//! The application-side wiring: every edit goes to the registry, and every
//! registry change is handed to the persistence gateway without waiting for
//! it. Preferences are read synchronously when the workspace is created, the
//! storyboards themselves arrive with [`Workspace::load`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{info, warn};

use crate::config::EngineConfig;
use crate::error::{Result, StoryboardError};
use crate::media::blob::{read_blob, BlobField};
use crate::persistence::{
    DurableStore, FileDurableStore, FileScalarStore, FlushReport, PersistenceGateway, Preferences,
    ScalarStore, WriteFailure,
};
use crate::state::{PagePatch, Storyboard, StoryboardId, StoryboardRegistry};
use crate::transfer::{self, StoryboardFile};

/// Open storyboards plus the stores that keep them.
pub struct Workspace {
    config: EngineConfig,
    registry: StoryboardRegistry,
    gateway: PersistenceGateway,
    scalars: Arc<dyn ScalarStore>,
    preferences: Preferences,
}

impl Workspace {
    /// File-backed workspace under `config.data_dir`, fully loaded.
    pub async fn open(config: EngineConfig) -> Result<Self> {
        let durable = Arc::new(FileDurableStore::new(config.records_dir()));
        let scalars = Arc::new(FileScalarStore::open(config.preferences_path()));
        let mut workspace = Self::new(config, durable, scalars);
        workspace.load().await;
        Ok(workspace)
    }

    /// Create the workspace with an empty registry. Preferences are available
    /// immediately. Must be called from within a tokio runtime.
    pub fn new(
        config: EngineConfig,
        durable: Arc<dyn DurableStore>,
        scalars: Arc<dyn ScalarStore>,
    ) -> Self {
        let preferences = Preferences::load(scalars.as_ref());
        Self {
            registry: StoryboardRegistry::with_history_limit(config.history_limit),
            gateway: PersistenceGateway::spawn(durable),
            config,
            scalars,
            preferences,
        }
    }

    /// Load stored storyboards into the registry. A store that cannot be
    /// read is logged and treated as empty. Returns how many were loaded.
    pub async fn load(&mut self) -> usize {
        let storyboards = match self.gateway.load_all().await {
            Ok(storyboards) => storyboards,
            Err(e) => {
                warn!("Starting with no storyboards: {}", e);
                Vec::new()
            }
        };
        let count = storyboards.len();
        self.registry
            .restore(storyboards, self.preferences.active_tab_index);
        count
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &StoryboardRegistry {
        &self.registry
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    pub fn active(&self) -> Option<&Storyboard> {
        self.registry.active()
    }

    // === Storyboards ===

    pub fn create_storyboard(&mut self, name: &str) -> StoryboardId {
        let id = self.registry.open_new(name);
        self.persist();
        id
    }

    /// Import a storyboard from file contents. Invalid contents leave the
    /// workspace unchanged.
    pub fn import_str(&mut self, content: &str) -> Result<StoryboardId> {
        let (name, pages) = StoryboardFile::parse(content)?.into_collection();
        info!("Imported storyboard {} ({} pages)", name, pages.len());
        let id = self.registry.open_from_snapshot(name, pages);
        self.persist();
        Ok(id)
    }

    pub fn import_file(&mut self, path: &Path) -> Result<StoryboardId> {
        let (name, pages) = transfer::read_storyboard_file(path)?.into_collection();
        info!("Imported storyboard {} from {}", name, path.display());
        let id = self.registry.open_from_snapshot(name, pages);
        self.persist();
        Ok(id)
    }

    /// Focus a storyboard if open, otherwise open it.
    ///
    /// Closed tabs lose their stored record, so anything loaded from the
    /// store is already open and only gets focused here.
    pub fn open_recent(&mut self, storyboard: Storyboard) -> usize {
        let index = self.registry.open_recent(storyboard);
        self.persist();
        index
    }

    /// Close the tab at `index`. Its stored record is dropped once any write
    /// already running for it has finished.
    pub fn close(&mut self, index: usize) -> Result<Storyboard> {
        let closed = self.registry.close(index)?;
        self.persist();
        if let Err(e) = self.gateway.forget(closed.id()) {
            warn!("Could not queue removal of {}: {}", closed.id(), e);
        }
        Ok(closed)
    }

    pub fn set_active(&mut self, index: usize) -> Result<()> {
        self.registry.set_active(index)?;
        self.store_active_tab();
        Ok(())
    }

    // === Page edits on the active storyboard ===

    pub fn add_page(&mut self) -> Result<usize> {
        let active = self.registry.require_active()?;
        let page = self.registry.add_page(active)?;
        self.persist();
        Ok(page)
    }

    pub fn update_page(&mut self, page: usize, patch: &PagePatch) -> Result<()> {
        let active = self.registry.require_active()?;
        self.registry.update_page(active, page, patch)?;
        self.persist();
        Ok(())
    }

    /// Read a file into the image or audio field of a page. A failed read
    /// leaves the page unchanged.
    pub fn attach_blob(&mut self, page: usize, field: BlobField, path: &Path) -> Result<()> {
        let blob = read_blob(path)?;
        self.update_page(page, &field.patch(blob))
    }

    pub fn clear_blob(&mut self, page: usize, field: BlobField) -> Result<()> {
        self.update_page(page, &field.clear())
    }

    pub fn delete_page(&mut self, page: usize) -> Result<()> {
        let active = self.registry.require_active()?;
        self.registry.delete_page(active, page)?;
        self.persist();
        Ok(())
    }

    pub fn reorder_pages(&mut self, source: usize, target: usize) -> Result<bool> {
        let active = self.registry.require_active()?;
        let moved = self.registry.reorder_pages(active, source, target)?;
        if moved {
            self.persist();
        }
        Ok(moved)
    }

    pub fn undo(&mut self) -> Result<bool> {
        let active = self.registry.require_active()?;
        let changed = self.registry.undo(active)?;
        if changed {
            self.persist();
        }
        Ok(changed)
    }

    pub fn redo(&mut self) -> Result<bool> {
        let active = self.registry.require_active()?;
        let changed = self.registry.redo(active)?;
        if changed {
            self.persist();
        }
        Ok(changed)
    }

    // === Export ===

    /// Export the storyboard at `index` to `path` and clear the
    /// unsaved-changes flag.
    pub fn export_to(&mut self, index: usize, path: &Path) -> Result<()> {
        let storyboard = self
            .registry
            .get(index)
            .ok_or(StoryboardError::out_of_range(index, self.registry.len()))?;
        transfer::write_storyboard_file(path, storyboard)?;
        self.registry.clear_dirty();
        Ok(())
    }

    /// Export the active storyboard as `<name>.json` inside `dir`.
    pub fn export_active(&mut self, dir: &Path) -> Result<PathBuf> {
        let active = self.registry.require_active()?;
        let name = self
            .registry
            .get(active)
            .map(|sb| transfer::export_file_name(sb.name()))
            .ok_or(StoryboardError::NoActiveStoryboard)?;
        let path = dir.join(name);
        self.export_to(active, &path)?;
        Ok(path)
    }

    /// Whether closing or quitting now would lose unexported changes.
    pub fn confirm_discard(&self) -> bool {
        self.registry.has_unsaved_changes()
    }

    // === Preferences ===

    pub fn complete_setup(&mut self, dark_mode: bool) -> Result<()> {
        self.preferences
            .complete_setup(self.scalars.as_ref(), dark_mode)
    }

    pub fn set_dark_mode(&mut self, dark_mode: bool) -> Result<()> {
        self.preferences
            .set_dark_mode(self.scalars.as_ref(), dark_mode)
    }

    pub fn toggle_dark_mode(&mut self) -> Result<bool> {
        self.preferences.toggle_dark_mode(self.scalars.as_ref())
    }

    pub fn set_user_name(&mut self, name: &str) -> Result<()> {
        self.preferences.set_user_name(self.scalars.as_ref(), name)
    }

    /// Display name for the greeting, asking `prompt` the first time.
    pub fn user_name_or_prompt<F>(&mut self, prompt: F) -> Result<String>
    where
        F: FnOnce() -> Option<String>,
    {
        self.preferences
            .user_name_or_prompt(self.scalars.as_ref(), prompt)
    }

    // === Persistence ===

    /// Writes currently failing; the UI shows these as warnings.
    pub fn persistence_warnings(&self) -> Vec<WriteFailure> {
        self.gateway.status().failures
    }

    pub async fn flush(&self) -> Result<FlushReport> {
        self.gateway.flush().await
    }

    /// Flush outstanding writes and stop the writer.
    pub async fn shutdown(self) -> Result<FlushReport> {
        self.gateway.shutdown().await
    }

    fn persist(&mut self) {
        if let Err(e) = self.gateway.save_all(self.registry.storyboards()) {
            warn!("Could not queue storyboard save: {}", e);
        }
        self.store_active_tab();
    }

    fn store_active_tab(&mut self) {
        let active = self.registry.active_index();
        if self.preferences.active_tab_index == active {
            return;
        }
        if let Err(e) = self
            .preferences
            .set_active_tab(self.scalars.as_ref(), active)
        {
            warn!("Could not store active tab: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::{MemoryDurableStore, MemoryScalarStore};
    use pretty_assertions::assert_eq;

    fn memory_workspace() -> (Workspace, Arc<MemoryDurableStore>, Arc<MemoryScalarStore>) {
        let durable = Arc::new(MemoryDurableStore::new());
        let scalars = Arc::new(MemoryScalarStore::new());
        let workspace = Workspace::new(EngineConfig::default(), durable.clone(), scalars.clone());
        (workspace, durable, scalars)
    }

    #[tokio::test]
    async fn test_edits_reach_durable_store() {
        let (mut workspace, durable, _) = memory_workspace();
        let id = workspace.create_storyboard("Pilot");
        workspace.add_page().unwrap();
        workspace
            .update_page(0, &PagePatch::new().dialogue("Hi"))
            .unwrap();
        workspace.flush().await.unwrap();

        let record = durable.get(id).unwrap();
        assert_eq!(record.pages.pages()[0].dialogue, "Hi");
    }

    #[tokio::test]
    async fn test_edit_without_active_storyboard() {
        let (mut workspace, _, _) = memory_workspace();
        assert!(matches!(
            workspace.add_page(),
            Err(StoryboardError::NoActiveStoryboard)
        ));
    }

    #[tokio::test]
    async fn test_invalid_import_leaves_state_unchanged() {
        let (mut workspace, _, _) = memory_workspace();
        workspace.create_storyboard("A");
        let before = workspace.registry().len();

        let err = workspace.import_str(r#"{"name":"A"}"#).unwrap_err();
        assert!(matches!(err, StoryboardError::InvalidStoryboardFile { .. }));
        assert_eq!(workspace.registry().len(), before);
        assert_eq!(workspace.registry().active_index(), Some(0));
    }

    #[tokio::test]
    async fn test_active_tab_written_to_scalar_store() {
        let (mut workspace, _, scalars) = memory_workspace();
        workspace.create_storyboard("A");
        workspace.create_storyboard("B");
        workspace.set_active(0).unwrap();

        assert_eq!(Preferences::load(scalars.as_ref()).active_tab_index, Some(0));
    }

    #[tokio::test]
    async fn test_failed_blob_read_keeps_page() {
        let (mut workspace, _, _) = memory_workspace();
        workspace.create_storyboard("A");
        workspace.add_page().unwrap();
        let undo_steps = workspace.active().unwrap().history().undo_count();

        let err = workspace
            .attach_blob(0, BlobField::Image, Path::new("/definitely/missing.png"))
            .unwrap_err();
        assert!(matches!(err, StoryboardError::BlobReadFailed { .. }));
        assert_eq!(workspace.active().unwrap().history().undo_count(), undo_steps);
        assert!(workspace.active().unwrap().pages().pages()[0].image.is_empty());
    }

    #[tokio::test]
    async fn test_persistence_failure_is_non_blocking() {
        let (mut workspace, durable, _) = memory_workspace();
        durable.set_fail_writes(true);

        workspace.create_storyboard("A");
        workspace.add_page().unwrap();
        workspace.flush().await.unwrap();

        assert_eq!(workspace.persistence_warnings().len(), 1);
        assert_eq!(workspace.active().unwrap().pages().len(), 1);

        durable.set_fail_writes(false);
        workspace.add_page().unwrap();
        workspace.flush().await.unwrap();
        assert!(workspace.persistence_warnings().is_empty());
        assert_eq!(durable.len(), 1);
    }

    #[tokio::test]
    async fn test_open_recent_focuses_or_appends() {
        let (mut workspace, _, _) = memory_workspace();
        let id = workspace.create_storyboard("A");
        workspace.create_storyboard("B");
        let already_open = workspace.registry().find(id).cloned().unwrap();

        assert_eq!(workspace.open_recent(already_open), 0);
        assert_eq!(workspace.registry().len(), 2);

        let index = workspace.open_recent(Storyboard::new("C"));
        assert_eq!(index, 2);
        assert_eq!(workspace.registry().active_index(), Some(2));
    }

    #[tokio::test]
    async fn test_close_forgets_durable_record() {
        let (mut workspace, durable, _) = memory_workspace();
        workspace.create_storyboard("A");
        let id = workspace.create_storyboard("B");
        workspace.flush().await.unwrap();
        assert!(durable.get(id).is_some());

        workspace.close(1).unwrap();
        workspace.flush().await.unwrap();
        assert!(durable.get(id).is_none());
        assert_eq!(durable.len(), 1);
    }
}
