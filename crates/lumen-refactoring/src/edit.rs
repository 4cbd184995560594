//! Edits and edit batches with the canonical apply ordering.

use lumen_position::Range;
use std::collections::{BTreeMap, BTreeSet};

/// What an edit does. The variant order is the canonical apply order at
/// equal start positions: deletions first, then replacements, then inserts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EditKind {
    /// Remove the text spanned by the range.
    Deleted,
    /// Replace the text spanned by the range with the content.
    Changed,
    /// Insert the content before the range start; the range end is ignored.
    Add,
}

/// One edit in one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    /// Edited range.
    pub range: Range,
    /// Edit kind.
    pub kind: EditKind,
    /// New content; empty for deletions.
    pub content: String,
}

impl Edit {
    /// A deletion of `range`.
    pub fn deleted(range: Range) -> Self {
        Self { range, kind: EditKind::Deleted, content: String::new() }
    }

    /// A replacement of `range` by `content`.
    pub fn changed(range: Range, content: impl Into<String>) -> Self {
        Self { range, kind: EditKind::Changed, content: content.into() }
    }

    /// An insertion of `content` before `range.start`.
    pub fn added(range: Range, content: impl Into<String>) -> Self {
        Self { range, kind: EditKind::Add, content: content.into() }
    }
}

impl PartialOrd for Edit {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Edit {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.range.start, self.kind, self.range.end, &self.content).cmp(&(
            other.range.start,
            other.kind,
            other.range.end,
            &other.content,
        ))
    }
}

/// Edits grouped per file URI, deduplicated, in canonical order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditBatch {
    changes: BTreeMap<String, BTreeSet<Edit>>,
}

impl EditBatch {
    /// Creates an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an edit; an identical edit scheduled twice collapses to one.
    pub fn insert(&mut self, uri: impl Into<String>, edit: Edit) {
        self.changes.entry(uri.into()).or_default().insert(edit);
    }

    /// True when no file has edits.
    pub fn is_empty(&self) -> bool {
        self.changes.values().all(BTreeSet::is_empty)
    }

    /// Number of edits across all files.
    pub fn len(&self) -> usize {
        self.changes.values().map(BTreeSet::len).sum()
    }

    /// The edits of one file in canonical order.
    pub fn edits(&self, uri: &str) -> Vec<Edit> {
        self.changes.get(uri).map(|edits| edits.iter().cloned().collect()).unwrap_or_default()
    }

    /// URIs with at least one edit.
    pub fn files(&self) -> impl Iterator<Item = &str> {
        self.changes.iter().filter(|(_, edits)| !edits.is_empty()).map(|(uri, _)| uri.as_str())
    }

    /// Iterates `(uri, edits)` pairs in URI order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeSet<Edit>)> {
        self.changes.iter().map(|(uri, edits)| (uri.as_str(), edits))
    }

    /// True when a deletion of exactly `range` is scheduled for `uri`.
    pub fn has_delete(&self, uri: &str, range: Range) -> bool {
        self.changes
            .get(uri)
            .is_some_and(|edits| {
                edits.iter().any(|e| e.kind == EditKind::Deleted && e.range == range)
            })
    }

    /// Deletions of `uri` lying inside `enclosing`, in canonical order.
    pub fn deletes_within(&self, uri: &str, enclosing: Range) -> Vec<Range> {
        match self.changes.get(uri) {
            Some(edits) => edits
                .iter()
                .filter(|e| e.kind == EditKind::Deleted && enclosing.encloses(e.range))
                .map(|e| e.range)
                .collect(),
            None => Vec::new(),
        }
    }

    /// Drops deletions of `uri` subsumed by a broader deletion of
    /// `enclosing`.
    pub fn remove_subsumed_deletes(&mut self, uri: &str, enclosing: Range) {
        if let Some(edits) = self.changes.get_mut(uri) {
            edits.retain(|e| !(e.kind == EditKind::Deleted && enclosing.encloses(e.range)));
        }
    }

    /// Merges another batch into this one.
    pub fn merge(&mut self, other: EditBatch) {
        for (uri, edits) in other.changes {
            self.changes.entry(uri).or_default().extend(edits);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_position::Position;
    use pretty_assertions::assert_eq;

    fn range(line: i32, start: i32, end: i32) -> Range {
        Range::new(Position::new(line, start), Position::new(line, end))
    }

    #[test]
    fn test_canonical_order_at_equal_start() {
        let mut batch = EditBatch::new();
        batch.insert("u", Edit::added(range(1, 0, 0), "import a.b.K\n"));
        batch.insert("u", Edit::deleted(range(1, 0, 9)));
        batch.insert("u", Edit::changed(range(1, 0, 9), "x"));
        let kinds: Vec<EditKind> = batch.edits("u").into_iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![EditKind::Deleted, EditKind::Changed, EditKind::Add]);
    }

    #[test]
    fn test_order_by_start_position_first() {
        let mut batch = EditBatch::new();
        batch.insert("u", Edit::added(range(0, 2, 2), "late"));
        batch.insert("u", Edit::deleted(range(3, 0, 4)));
        batch.insert("u", Edit::deleted(range(0, 5, 9)));
        let starts: Vec<Position> =
            batch.edits("u").into_iter().map(|e| e.range.start).collect();
        assert_eq!(
            starts,
            vec![Position::new(0, 2), Position::new(0, 5), Position::new(3, 0)]
        );
    }

    #[test]
    fn test_duplicate_edits_collapse() {
        let mut batch = EditBatch::new();
        batch.insert("u", Edit::deleted(range(2, 0, 9)));
        batch.insert("u", Edit::deleted(range(2, 0, 9)));
        assert_eq!(batch.len(), 1);
    }

    #[test]
    fn test_subsumed_deletes_removed() {
        let mut batch = EditBatch::new();
        batch.insert("u", Edit::deleted(range(2, 12, 13)));
        batch.insert("u", Edit::deleted(range(2, 15, 17)));
        batch.insert("u", Edit::changed(range(2, 12, 13), "keep"));
        batch.remove_subsumed_deletes("u", range(2, 0, 20));
        let edits = batch.edits("u");
        assert_eq!(edits.len(), 1);
        assert_eq!(edits[0].kind, EditKind::Changed);
    }

    #[test]
    fn test_no_overlap_after_dedup() {
        let mut batch = EditBatch::new();
        batch.insert("u", Edit::deleted(range(2, 0, 9)));
        batch.insert("u", Edit::deleted(range(2, 0, 9)));
        batch.insert("u", Edit::deleted(range(2, 10, 12)));
        let edits = batch.edits("u");
        for pair in edits.windows(2) {
            assert!(!pair[0].range.overlaps(pair[1].range));
        }
    }

    #[test]
    fn test_merge() {
        let mut a = EditBatch::new();
        a.insert("u", Edit::deleted(range(0, 0, 1)));
        let mut b = EditBatch::new();
        b.insert("u", Edit::deleted(range(1, 0, 1)));
        b.insert("v", Edit::changed(range(0, 0, 1), "x"));
        a.merge(b);
        assert_eq!(a.len(), 3);
        assert_eq!(a.files().count(), 2);
    }
}
