//! Server-side state: open documents, parsed workspace files, URI mapping.

use lumen_protocol::params::TextDocumentContentChangeEvent;
use lumen_refactoring::{source_files_under, ProjectSource};
use lumen_syntax::{scan_header, File};
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tracing::info;

/// Converts a file URI to an absolute path. Bare absolute paths pass
/// through, which keeps fixtures and the studio host's raw-path URIs
/// working.
pub fn uri_to_path(uri: &str) -> Option<String> {
    if uri.starts_with('/') {
        return Some(uri.to_string());
    }
    let url = url::Url::parse(uri).ok()?;
    url.to_file_path().ok().and_then(|p| p.to_str().map(str::to_string))
}

/// One open text document.
#[derive(Debug, Clone)]
pub struct Document {
    /// Full text.
    pub text: String,
    /// Client-reported version.
    pub version: i64,
}

/// Why a document update was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    /// The document is not open.
    NotOpen,
    /// The update's version does not follow the current one.
    StaleVersion {
        /// Version held by the store.
        current: i64,
        /// Version the update carried.
        offered: i64,
    },
}

/// Open documents keyed by URI, with receipt-order version checking.
#[derive(Default)]
pub struct DocumentStore {
    documents: FxHashMap<String, Document>,
}

impl DocumentStore {
    /// Opens (or re-opens) a document.
    pub fn open(&mut self, uri: &str, text: String, version: i64) {
        self.documents.insert(uri.to_string(), Document { text, version });
    }

    /// Applies a change notification; the version must be `current + 1`.
    pub fn change(
        &mut self,
        uri: &str,
        version: i64,
        changes: &[TextDocumentContentChangeEvent],
    ) -> Result<&Document, DocumentError> {
        let doc = self.documents.get_mut(uri).ok_or(DocumentError::NotOpen)?;
        if version != doc.version + 1 {
            return Err(DocumentError::StaleVersion { current: doc.version, offered: version });
        }
        for change in changes {
            match change.range {
                None => doc.text = change.text.clone(),
                Some(range) => {
                    let start = utf16_position_to_offset(
                        &doc.text,
                        range.start.line,
                        range.start.column,
                    );
                    let end =
                        utf16_position_to_offset(&doc.text, range.end.line, range.end.column);
                    let (start, end) = (start.min(doc.text.len()), end.min(doc.text.len()));
                    if start <= end {
                        doc.text.replace_range(start..end, &change.text);
                    }
                }
            }
        }
        doc.version = version;
        Ok(doc)
    }

    /// Closes a document.
    pub fn close(&mut self, uri: &str) {
        self.documents.remove(uri);
    }

    /// The open document for a URI.
    pub fn get(&self, uri: &str) -> Option<&Document> {
        self.documents.get(uri)
    }
}

/// Byte offset of a 0-based line and UTF-16 column in `text`.
fn utf16_position_to_offset(text: &str, line: i32, character: i32) -> usize {
    if line < 0 || character < 0 {
        return text.len();
    }
    let mut offset = 0usize;
    for (idx, line_text) in text.split_inclusive('\n').enumerate() {
        if idx as i32 == line {
            let mut units = 0i32;
            for (byte, ch) in line_text.char_indices() {
                if units >= character {
                    return offset + byte;
                }
                units += ch.len_utf16() as i32;
            }
            return offset + line_text.trim_end_matches(['\r', '\n']).len();
        }
        offset += line_text.len();
    }
    text.len()
}

/// Parsed workspace files and package resolution.
///
/// Holds header-scanned [`File`] nodes for every document the server has
/// seen; the full AST stays with the compiler adapter. Implements
/// [`ProjectSource`] so the file-move planner can resolve packages, files
/// and directory listings.
#[derive(Default)]
pub struct WorkspaceState {
    root_path: String,
    next_file_id: u32,
    files: FxHashMap<String, Arc<File>>,
}

impl WorkspaceState {
    /// Creates an empty workspace.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the workspace root from the `initialize` request.
    pub fn set_root(&mut self, root_uri: &str) {
        if let Some(path) = uri_to_path(root_uri) {
            self.root_path = path;
        }
    }

    /// The workspace root path.
    pub fn root_path(&self) -> &str {
        &self.root_path
    }

    /// Scans and stores a file's header, keeping its file id stable across
    /// re-scans.
    pub fn upsert_source(&mut self, path: &str, text: &str) -> Arc<File> {
        let file_id = match self.files.get(path) {
            Some(existing) => existing.file_id,
            None => {
                self.next_file_id += 1;
                self.next_file_id
            }
        };
        let file = Arc::new(scan_header(file_id, path, text));
        self.files.insert(path.to_string(), Arc::clone(&file));
        file
    }

    /// Forgets a file.
    pub fn remove(&mut self, path: &str) {
        self.files.remove(path);
    }

    /// The parsed file for a path, if seen.
    pub fn get(&self, path: &str) -> Option<Arc<File>> {
        self.files.get(path).cloned()
    }

    fn package_from_disk(&self, dir: &str) -> Option<String> {
        let mut files = source_files_under(dir);
        files.sort();
        let direct = files.into_iter().find(|f| {
            f.rsplit_once('/').map(|(parent, _)| parent == dir.trim_end_matches('/'))
                == Some(true)
        })?;
        let text = std::fs::read_to_string(&direct).ok()?;
        let scanned = scan_header(0, &direct, &text);
        Some(scanned.package_name().to_string())
    }

    fn package_from_root(&self, dir: &str) -> Option<String> {
        if self.root_path.is_empty() {
            return None;
        }
        let rel = dir.strip_prefix(&self.root_path)?.trim_matches('/');
        if rel.is_empty() {
            return None;
        }
        Some(rel.replace('/', "."))
    }
}

impl ProjectSource for WorkspaceState {
    fn package_of_file(&self, path: &str) -> Option<String> {
        self.files.get(path).map(|f| f.package_name().to_string())
    }

    fn package_of_dir(&self, dir: &str) -> Option<String> {
        let dir = dir.trim_end_matches('/');
        let from_open = self
            .files
            .iter()
            .find(|(path, _)| path.rsplit_once('/').map(|(parent, _)| parent) == Some(dir))
            .map(|(_, file)| file.package_name().to_string());
        if let Some(pkg) = from_open {
            return Some(pkg);
        }
        if let Some(pkg) = self.package_from_disk(dir) {
            return Some(pkg);
        }
        let derived = self.package_from_root(dir);
        if derived.is_none() {
            info!(dir, "unable to resolve package for directory");
        }
        derived
    }

    fn file(&self, path: &str) -> Option<Arc<File>> {
        if let Some(file) = self.files.get(path) {
            return Some(Arc::clone(file));
        }
        // sibling files are read from disk on demand during planning
        let text = std::fs::read_to_string(path).ok()?;
        Some(Arc::new(scan_header(0, path, &text)))
    }

    fn package_files(&self, package: &str) -> Vec<Arc<File>> {
        let mut files: Vec<Arc<File>> = self
            .files
            .values()
            .filter(|f| f.package_name() == package)
            .cloned()
            .collect();
        files.sort_by(|a, b| a.path.cmp(&b.path));
        files
    }

    fn files_under(&self, dir: &str) -> Vec<String> {
        let mut on_disk = source_files_under(dir);
        let prefix = format!("{}/", dir.trim_end_matches('/'));
        for path in self.files.keys() {
            if path.starts_with(&prefix) && !on_disk.contains(path) {
                on_disk.push(path.clone());
            }
        }
        on_disk.sort();
        on_disk
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_position::{Position, Range};
    use pretty_assertions::assert_eq;

    fn change(range: Option<Range>, text: &str) -> TextDocumentContentChangeEvent {
        TextDocumentContentChangeEvent {
            range,
            range_length: None,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_uri_to_path() {
        assert_eq!(uri_to_path("file:///w/a/one.lm").as_deref(), Some("/w/a/one.lm"));
        assert_eq!(uri_to_path("/w/a/one.lm").as_deref(), Some("/w/a/one.lm"));
        assert_eq!(uri_to_path("not a uri"), None);
    }

    #[test]
    fn test_document_versions_must_be_sequential() {
        let mut store = DocumentStore::default();
        store.open("file:///w/x.lm", "package a\n".to_string(), 1);
        let err = store
            .change("file:///w/x.lm", 3, &[change(None, "package b\n")])
            .expect_err("gap must be rejected");
        assert_eq!(err, DocumentError::StaleVersion { current: 1, offered: 3 });
        // the rejected update left the text untouched
        assert_eq!(store.get("file:///w/x.lm").map(|d| d.version), Some(1));

        store
            .change("file:///w/x.lm", 2, &[change(None, "package b\n")])
            .expect("sequential update");
        assert_eq!(store.get("file:///w/x.lm").map(|d| d.text.as_str()), Some("package b\n"));
    }

    #[test]
    fn test_ranged_change_with_utf16_columns() {
        let mut store = DocumentStore::default();
        store.open("file:///w/x.lm", "let 🦀 = 1\n".to_string(), 1);
        // the crab is two UTF-16 units; replace the `1` after it
        let range = Range::new(Position::new(0, 9), Position::new(0, 10));
        store
            .change("file:///w/x.lm", 2, &[change(Some(range), "2")])
            .expect("ranged update");
        assert_eq!(
            store.get("file:///w/x.lm").map(|d| d.text.as_str()),
            Some("let 🦀 = 2\n")
        );
    }

    #[test]
    fn test_workspace_package_resolution_prefers_open_files() {
        let mut workspace = WorkspaceState::new();
        workspace.upsert_source("/w/a/b/one.lm", "package a.b\n");
        assert_eq!(workspace.package_of_dir("/w/a/b").as_deref(), Some("a.b"));
        assert_eq!(workspace.package_of_file("/w/a/b/one.lm").as_deref(), Some("a.b"));
    }

    #[test]
    fn test_workspace_package_derived_from_root() {
        let mut workspace = WorkspaceState::new();
        workspace.set_root("file:///w");
        assert_eq!(workspace.package_of_dir("/w/a/c").as_deref(), Some("a.c"));
        assert_eq!(workspace.package_of_dir("/elsewhere"), None);
    }

    #[test]
    fn test_workspace_package_read_from_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let sub = dir.path().join("net");
        std::fs::create_dir_all(&sub).expect("mkdir");
        std::fs::write(sub.join("io.lm"), "package app.net\n").expect("write");
        let workspace = WorkspaceState::new();
        assert_eq!(
            workspace.package_of_dir(sub.to_str().expect("utf8")).as_deref(),
            Some("app.net")
        );
    }

    #[test]
    fn test_file_ids_stable_across_rescans() {
        let mut workspace = WorkspaceState::new();
        let first = workspace.upsert_source("/w/a/one.lm", "package a\n");
        let second = workspace.upsert_source("/w/a/one.lm", "package a\nimport b.K\n");
        assert_eq!(first.file_id, second.file_id);
        assert_eq!(second.imports.len(), 1);
    }
}
