//! Parsed-file surface consumed by the Lumen language services.
//!
//! The parser and semantic analyzer are external collaborators; this crate
//! defines the shape of what they hand over (tokens, the package
//! declaration, import specifications) together with a header scanner that
//! recovers exactly that shape from source text. The scanner reads only the
//! `package`/`import` prologue; it is what the refactoring planner uses when
//! it loads sibling files from disk, and what test fixtures build files with.

mod scanner;

pub use scanner::{scan_header, tokenize};

use lumen_position::{Position, Range, SourceToken};
use lumen_symbols::Modifier;
use serde::{Deserialize, Serialize};

/// A lexed token with its text and UTF-8 byte-column positions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Token text exactly as written.
    pub value: String,
    /// Start position (byte column).
    pub begin: Position,
    /// End position (byte column, exclusive).
    pub end: Position,
}

impl SourceToken for Token {
    fn text(&self) -> &str {
        &self.value
    }
    fn begin(&self) -> Position {
        self.begin
    }
}

/// The `package a.b.c` declaration of a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageDecl {
    /// Fully-qualified dotted name.
    pub full_name: String,
    /// Range of the dotted name (first segment start to last segment end).
    pub name_range: Range,
}

/// Syntactic form of an import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImportKind {
    /// `import a.b.K`
    Single,
    /// `import a.b.K as J`
    Alias,
    /// `import a.b.*`
    All,
    /// `import a.b.{X, Y}`: the brace statement itself; each member also
    /// appears as its own [`ImportKind::Single`] spec with a range inside
    /// this one.
    Multi,
}

/// The path payload of an import statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportContent {
    /// Syntactic form.
    pub kind: ImportKind,
    /// Dotted package segments before the imported name.
    pub prefix_paths: Vec<String>,
    /// Start position of each prefix segment.
    pub prefix_positions: Vec<Position>,
    /// Imported name; `*` for [`ImportKind::All`], empty for
    /// [`ImportKind::Multi`].
    pub identifier: String,
    /// Alias for [`ImportKind::Alias`].
    pub alias: Option<String>,
    /// Member names of a [`ImportKind::Multi`] statement.
    pub items: Vec<String>,
    /// Positions of the separating commas of a multi-import.
    pub comma_positions: Vec<Position>,
    /// Position of the closing `}` of a multi-import.
    pub right_brace: Position,
}

impl ImportContent {
    /// The fully-qualified package the import draws from.
    pub fn full_package(&self) -> String {
        self.prefix_paths.join(".")
    }

    /// `package.name` for single and alias imports, `None` otherwise.
    pub fn full_symbol(&self) -> Option<String> {
        match self.kind {
            ImportKind::Single | ImportKind::Alias => {
                Some(format!("{}.{}", self.full_package(), self.identifier))
            }
            ImportKind::All | ImportKind::Multi => None,
        }
    }

    /// Range covering the dotted package prefix, for in-place rewrites.
    pub fn prefix_range(&self) -> Option<Range> {
        let first = *self.prefix_positions.first()?;
        let last = *self.prefix_positions.last()?;
        let last_len = self.prefix_paths.last()?.len() as i32;
        Some(Range::new(first, Position { column: last.column + last_len, ..last }))
    }
}

/// One import statement (or one member of a multi-import).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSpec {
    /// Statement range; for a flattened multi-import member, the member's
    /// own range inside the brace statement.
    pub range: Range,
    /// Visibility modifier; a re-exporting modifier makes the imported
    /// symbol visible to importers of this package.
    pub modifier: Modifier,
    /// Path payload.
    pub content: ImportContent,
}

impl ImportSpec {
    /// True for records the planner must skip (zero/absent ranges).
    pub fn is_unusable(&self) -> bool {
        self.range.end.is_absent() || self.range.is_zero()
    }
}

/// A parsed file as the core consumes it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct File {
    /// Scratch file id assigned by the source manager.
    pub file_id: u32,
    /// Absolute path on disk.
    pub path: String,
    /// The package declaration, if the prologue had one.
    pub package: Option<PackageDecl>,
    /// All import specs, with multi-import members flattened alongside their
    /// brace statement.
    pub imports: Vec<ImportSpec>,
    /// The file's token stream.
    pub tokens: Vec<Token>,
}

impl File {
    /// The declared package name, or empty for the root package.
    pub fn package_name(&self) -> &str {
        self.package.as_ref().map(|p| p.full_name.as_str()).unwrap_or("")
    }
}

// Default needed for Option-free construction in fixtures.
impl Default for ImportContent {
    fn default() -> Self {
        Self {
            kind: ImportKind::Single,
            prefix_paths: Vec::new(),
            prefix_positions: Vec::new(),
            identifier: String::new(),
            alias: None,
            items: Vec::new(),
            comma_positions: Vec::new(),
            right_brace: Position::ABSENT,
        }
    }
}
