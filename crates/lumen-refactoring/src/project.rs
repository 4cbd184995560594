//! The project surface the planner consults.

use lumen_syntax::File;
use std::sync::Arc;

/// Resolution services of the compiler project, kept behind a trait so the
/// language-server state and test fixtures plug in identically.
pub trait ProjectSource {
    /// Fully-qualified package of a source file.
    fn package_of_file(&self, path: &str) -> Option<String>;

    /// Fully-qualified package a directory maps to.
    fn package_of_dir(&self, dir: &str) -> Option<String>;

    /// The parsed file node for a path.
    ///
    /// May block on disk while the file is parsed; the planner calls it on
    /// its own thread.
    fn file(&self, path: &str) -> Option<Arc<File>>;

    /// All parsed files of one package.
    fn package_files(&self, package: &str) -> Vec<Arc<File>>;

    /// Source files under a directory, recursively.
    fn files_under(&self, dir: &str) -> Vec<String>;
}

/// The directory part of a path, without the trailing separator.
pub(crate) fn dir_path(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    }
}

/// The file-name part of a path.
pub(crate) fn file_name(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

/// Joins a directory and a relative path.
pub(crate) fn join_path(dir: &str, rel: &str) -> String {
    let dir = dir.trim_end_matches('/');
    let rel = rel.trim_start_matches('/');
    format!("{dir}/{rel}")
}

/// True when `path` lies under the directory `dir`.
pub(crate) fn is_under_path(dir: &str, path: &str) -> bool {
    let dir = dir.trim_end_matches('/');
    path.len() > dir.len() && path.starts_with(dir) && path.as_bytes()[dir.len()] == b'/'
}

/// File URI for an absolute path; falls back to plain concatenation when the
/// path is not absolute (fixture paths).
pub fn path_to_uri(path: &str) -> String {
    match url::Url::from_file_path(path) {
        Ok(url) => url.to_string(),
        Err(()) => format!("file://{path}"),
    }
}

/// Lumen source files under `dir` on disk, recursively.
///
/// The default [`ProjectSource::files_under`] implementation for adapters
/// backed by a real filesystem.
pub fn source_files_under(dir: &str) -> Vec<String> {
    walkdir::WalkDir::new(dir)
        .follow_links(false)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "lm"))
        .filter_map(|entry| entry.path().to_str().map(str::to_string))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_helpers() {
        assert_eq!(dir_path("/w/a/b/one.lm"), "/w/a/b");
        assert_eq!(file_name("/w/a/b/one.lm"), "one.lm");
        assert_eq!(join_path("/w/a", "b/one.lm"), "/w/a/b/one.lm");
        assert_eq!(join_path("/w/a/", "/b/one.lm"), "/w/a/b/one.lm");
    }

    #[test]
    fn test_is_under_path() {
        assert!(is_under_path("/w/a", "/w/a/b/one.lm"));
        assert!(is_under_path("/w/a/", "/w/a/one.lm"));
        assert!(!is_under_path("/w/a", "/w/ab/one.lm"));
        assert!(!is_under_path("/w/a", "/w/a"));
    }

    #[test]
    fn test_path_to_uri() {
        assert_eq!(path_to_uri("/w/a/one.lm"), "file:///w/a/one.lm");
    }

    #[test]
    fn test_source_files_under_filters_extension() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir_all(dir.path().join("sub")).expect("mkdir");
        std::fs::write(dir.path().join("one.lm"), "package a\n").expect("write");
        std::fs::write(dir.path().join("sub").join("two.lm"), "package a.b\n").expect("write");
        std::fs::write(dir.path().join("notes.txt"), "not source").expect("write");
        let mut files = source_files_under(dir.path().to_str().expect("utf8 path"));
        files.sort();
        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("one.lm"));
        assert!(files[1].ends_with("two.lm"));
    }
}
