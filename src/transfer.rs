//! Export/import file format.
//!
//! A storyboard file is UTF-8 JSON:
//!
//! ```text
//! { "name": "...", "pages": [ { "id": 1, "pageNumber": 1, "pageName": "", "image": "",
//!   "dialogue": "", "context": "", "timestamp": "", "audio": "" }, ... ] }
//! ```
//!
//! Undo history is never part of a file.

use std::fs;
use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, StoryboardError};
use crate::state::{Page, PageCollection, PageId, Storyboard};

/// Extension used for exported storyboards.
pub const FILE_EXTENSION: &str = "json";

/// Contents of an exported storyboard file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryboardFile {
    pub name: String,
    pub pages: Vec<Page>,
}

impl StoryboardFile {
    /// Snapshot the present pages of a storyboard.
    pub fn from_storyboard(storyboard: &Storyboard) -> Self {
        Self {
            name: storyboard.name().to_string(),
            pages: storyboard.pages().pages().to_vec(),
        }
    }

    /// Pages as a collection, renumbered from their order.
    pub fn into_collection(self) -> (String, PageCollection) {
        (self.name, PageCollection::from_pages_renumbered(self.pages))
    }

    /// Pretty-printed JSON with two-space indentation.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse and validate file contents.
    ///
    /// Rejects anything that is not an object with a non-empty `name` string
    /// and a `pages` array. Nothing is partially imported.
    pub fn parse(content: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(content)
            .map_err(|e| StoryboardError::invalid_file(format!("not valid JSON: {}", e)))?;

        let object = value
            .as_object()
            .ok_or_else(|| StoryboardError::invalid_file("top level is not an object"))?;

        let name = match object.get("name") {
            Some(Value::String(name)) if !name.is_empty() => name.clone(),
            Some(Value::String(_)) => return Err(StoryboardError::invalid_file("name is empty")),
            Some(_) => return Err(StoryboardError::invalid_file("name is not a string")),
            None => return Err(StoryboardError::invalid_file("missing name")),
        };

        let pages = match object.get("pages") {
            Some(pages @ Value::Array(_)) => pages.clone(),
            Some(_) => return Err(StoryboardError::invalid_file("pages is not a list")),
            None => return Err(StoryboardError::invalid_file("missing pages")),
        };

        let pages: Vec<ImportedPage> = serde_json::from_value(pages)
            .map_err(|e| StoryboardError::invalid_file(format!("malformed page: {}", e)))?;

        Ok(Self {
            name,
            pages: assign_ids(pages),
        })
    }
}

/// A page as found in a file. Missing or `null` values are tolerated.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ImportedPage {
    id: Option<PageId>,
    page_name: Option<String>,
    image: Option<String>,
    dialogue: Option<String>,
    context: Option<String>,
    timestamp: Option<String>,
    audio: Option<String>,
}

/// Build pages, giving those without an id a fresh one that does not clash
/// with any id in the file.
fn assign_ids(imported: Vec<ImportedPage>) -> Vec<Page> {
    let mut taken = PageCollection::from_pages(
        imported
            .iter()
            .filter_map(|page| page.id)
            .map(Page::new)
            .collect(),
    );

    imported
        .into_iter()
        .map(|raw| {
            let id = raw.id.unwrap_or_else(|| {
                let id = taken.next_id();
                taken = taken.insert_page();
                id
            });
            let mut page = Page::new(id);
            page.page_name = raw.page_name.unwrap_or_default();
            page.image = raw.image.unwrap_or_default();
            page.dialogue = raw.dialogue.unwrap_or_default();
            page.context = raw.context.unwrap_or_default();
            page.timestamp = raw.timestamp.unwrap_or_default();
            page.audio = raw.audio.unwrap_or_default();
            page
        })
        .collect()
}

/// Suggested file name for an export, e.g. `Pilot.json`.
pub fn export_file_name(name: &str) -> String {
    let safe: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c => c,
        })
        .collect();
    format!("{}.{}", safe, FILE_EXTENSION)
}

/// Serialize a storyboard's present pages to file contents.
pub fn export(storyboard: &Storyboard) -> Result<String> {
    StoryboardFile::from_storyboard(storyboard).to_json()
}

/// Write a storyboard to `path`.
pub fn write_storyboard_file(path: &Path, storyboard: &Storyboard) -> Result<()> {
    let content = export(storyboard)?;
    fs::write(path, content).map_err(|e| StoryboardError::FileWriteError {
        path: path.to_path_buf(),
        source: e,
    })?;
    info!("Exported storyboard {} to {}", storyboard.name(), path.display());
    Ok(())
}

/// Read and validate a storyboard file from `path`.
pub fn read_storyboard_file(path: &Path) -> Result<StoryboardFile> {
    let content = fs::read_to_string(path).map_err(|e| StoryboardError::FileReadError {
        path: path.to_path_buf(),
        source: e,
    })?;
    StoryboardFile::parse(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::PagePatch;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;
    use test_case::test_case;

    fn sample_storyboard() -> Storyboard {
        let mut sb = Storyboard::new("Pilot");
        sb.add_page();
        sb.add_page();
        sb.update_page(
            0,
            &PagePatch::new()
                .page_name("Opening")
                .dialogue("Hello")
                .timestamp("2.5")
                .audio("data:audio/webm;base64,AAAA"),
        )
        .unwrap();
        sb.reorder_pages(1, 0).unwrap();
        sb
    }

    #[test]
    fn test_export_then_import_preserves_pages() {
        let sb = sample_storyboard();
        let content = export(&sb).unwrap();

        let file = StoryboardFile::parse(&content).unwrap();
        let (name, pages) = file.into_collection();
        assert_eq!(name, "Pilot");
        assert_eq!(pages, *sb.pages());
    }

    #[test]
    fn test_export_uses_camel_case_keys() {
        let content = export(&sample_storyboard()).unwrap();
        let value: Value = serde_json::from_str(&content).unwrap();

        let first = &value["pages"][0];
        for key in [
            "id", "pageNumber", "pageName", "image", "dialogue", "context", "timestamp", "audio",
        ] {
            assert!(first.get(key).is_some(), "missing key {}", key);
        }
        assert!(content.contains("\n  \"name\""));
    }

    #[test_case(r#"{"name":"A"}"# ; "missing pages")]
    #[test_case(r#"{"pages":[]}"# ; "missing name")]
    #[test_case(r#"{"name":"","pages":[]}"# ; "empty name")]
    #[test_case(r#"{"name":"A","pages":{}}"# ; "pages not a list")]
    #[test_case(r#"{"name":7,"pages":[]}"# ; "name not a string")]
    #[test_case(r#"[1,2,3]"# ; "not an object")]
    #[test_case(r#"{"name":"A","pages":[{"id":"one"}]}"# ; "id not a number")]
    #[test_case("not json" ; "garbage")]
    fn test_invalid_files_are_rejected(content: &str) {
        assert!(matches!(
            StoryboardFile::parse(content),
            Err(StoryboardError::InvalidStoryboardFile { .. })
        ));
    }

    #[test]
    fn test_pages_without_id_get_fresh_ids() {
        let content = r#"{"name":"A","pages":[
            {"dialogue":"hello"},
            {"id": 4},
            {"pageName":"third"}
        ]}"#;
        let (_, pages) = StoryboardFile::parse(content).unwrap().into_collection();

        let ids: Vec<PageId> = pages.iter().map(Page::id).collect();
        assert_eq!(ids, vec![5, 4, 6]);
        assert_eq!(pages.pages()[0].dialogue, "hello");
        assert_eq!(pages.pages()[2].page_name, "third");
        assert!(pages.is_densely_numbered());
    }

    #[test]
    fn test_null_fields_import_as_empty() {
        let content = r#"{"name":"A","pages":[{"id":1,"image":null,"audio":null,"dialogue":"hi"}]}"#;
        let file = StoryboardFile::parse(content).unwrap();

        let page = &file.pages[0];
        assert!(page.image.is_empty());
        assert!(!page.has_audio());
        assert_eq!(page.dialogue, "hi");
    }

    #[test]
    fn test_empty_pages_is_accepted() {
        let file = StoryboardFile::parse(r#"{"name":"Empty","pages":[]}"#).unwrap();
        assert_eq!(file.name, "Empty");
        assert!(file.pages.is_empty());
    }

    #[test]
    fn test_import_renumbers_defensively() {
        let content = r#"{"name":"A","pages":[
            {"id": 10, "pageNumber": 7, "dialogue": "first"},
            {"id": 3, "dialogue": "second"}
        ]}"#;
        let (_, pages) = StoryboardFile::parse(content).unwrap().into_collection();

        assert!(pages.is_densely_numbered());
        assert_eq!(pages.pages()[0].id(), 10);
        assert_eq!(pages.pages()[1].dialogue, "second");
        assert_eq!(pages.next_id(), 11);
    }

    #[test]
    fn test_write_and_read_file() {
        let temp = tempdir().unwrap();
        let sb = sample_storyboard();
        let path = temp.path().join(export_file_name(sb.name()));

        write_storyboard_file(&path, &sb).unwrap();
        let file = read_storyboard_file(&path).unwrap();
        assert_eq!(file, StoryboardFile::from_storyboard(&sb));
    }

    #[test]
    fn test_export_file_name_strips_separators() {
        assert_eq!(export_file_name("Pilot"), "Pilot.json");
        assert_eq!(export_file_name("a/b:c"), "a_b_c.json");
    }
}
