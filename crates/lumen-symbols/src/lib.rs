//! Unified Lumen symbol taxonomy for LSP tooling.
//!
//! This crate is the single source of truth for symbol identity and
//! classification across the index, the refactoring engine and the LSP
//! providers: stable symbol ids, declaration kinds, visibility modifiers,
//! reference and relation records.

use lumen_position::Range;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::BitOr;

/// Stable 64-bit symbol handle, unique for the lifetime of the index.
///
/// The zero value is reserved as the invalid/absent sentinel; a reference
/// container of `SymbolId::INVALID` means "top level".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SymbolId(pub u64);

impl SymbolId {
    /// The reserved invalid id.
    pub const INVALID: SymbolId = SymbolId(0);

    /// True for any id other than the invalid sentinel.
    pub const fn is_valid(&self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Declaration kind of a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SymbolKind {
    /// Package declaration
    Package,
    /// Class declaration
    Class,
    /// Interface declaration
    Interface,
    /// Struct declaration
    Struct,
    /// Enum declaration
    Enum,
    /// Enum constructor (a case of an enum)
    EnumConstructor,
    /// Free or member function
    Function,
    /// Primary constructor of a class or struct
    PrimaryConstructor,
    /// Variable or parameter
    Variable,
    /// Type alias
    TypeAlias,
    /// Macro declaration
    Macro,
    /// Lambda expression
    Lambda,
    /// Generic type parameter
    GenericParam,
    /// Extend (extension) declaration
    Extend,
    /// Anything else
    Other,
}

impl SymbolKind {
    /// True for kinds that can appear in a call hierarchy.
    pub const fn is_callable(self) -> bool {
        matches!(
            self,
            SymbolKind::Function | SymbolKind::PrimaryConstructor | SymbolKind::Lambda
        )
    }

    /// True for kinds that can anchor a type hierarchy.
    pub const fn is_type(self) -> bool {
        matches!(
            self,
            SymbolKind::Class | SymbolKind::Interface | SymbolKind::Struct | SymbolKind::Enum
        )
    }

    /// LSP `SymbolKind` number for the wire.
    pub const fn to_lsp_kind(self) -> i32 {
        match self {
            SymbolKind::Package => 4,            // Package
            SymbolKind::Class => 5,              // Class
            SymbolKind::Interface => 11,         // Interface
            SymbolKind::Struct => 23,            // Struct
            SymbolKind::Enum => 10,              // Enum
            SymbolKind::EnumConstructor => 22,   // EnumMember
            SymbolKind::Function => 12,          // Function
            SymbolKind::PrimaryConstructor => 9, // Constructor
            SymbolKind::Variable => 13,          // Variable
            SymbolKind::TypeAlias => 5,          // Class
            SymbolKind::Macro => 12,             // Function
            SymbolKind::Lambda => 12,            // Function
            SymbolKind::GenericParam => 26,      // TypeParameter
            SymbolKind::Extend => 19,            // Object
            SymbolKind::Other => 19,             // Object
        }
    }
}

/// Visibility modifier of a declaration or import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Modifier {
    /// No modifier written
    #[default]
    Undefined,
    /// `private`
    Private,
    /// `internal`
    Internal,
    /// `protected`
    Protected,
    /// `public`
    Public,
}

impl Modifier {
    /// True when an import with this modifier re-exports the imported symbol.
    pub const fn is_reexport(self) -> bool {
        matches!(self, Modifier::Internal | Modifier::Protected | Modifier::Public)
    }

    /// Keyword spelling, empty for [`Modifier::Undefined`].
    pub const fn keyword(self) -> &'static str {
        match self {
            Modifier::Undefined => "",
            Modifier::Private => "private",
            Modifier::Internal => "internal",
            Modifier::Protected => "protected",
            Modifier::Public => "public",
        }
    }

    /// Parses a keyword; anything unrecognized is [`Modifier::Undefined`].
    pub fn from_keyword(word: &str) -> Modifier {
        match word {
            "private" => Modifier::Private,
            "internal" => Modifier::Internal,
            "protected" => Modifier::Protected,
            "public" => Modifier::Public,
            _ => Modifier::Undefined,
        }
    }
}

/// A file URI plus range.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    /// String form of the file URI; resolution is the filesystem adapter's job.
    pub file_uri: String,
    /// Token range of the occurrence.
    pub range: Range,
}

impl Location {
    /// Creates a location.
    pub fn new(file_uri: impl Into<String>, range: Range) -> Self {
        Self { file_uri: file_uri.into(), range }
    }

    /// True for the zero-location sentinel of compiler-synthesized symbols.
    pub fn is_zero(&self) -> bool {
        self.range.is_zero()
    }
}

/// Separator between scope segments after the leading package.
///
/// `:` cannot appear in a legal Lumen identifier, so splitting on it is safe.
pub const SCOPE_SEPARATOR: char = ':';

/// The core symbol record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Symbol {
    /// Stable id; [`SymbolId::INVALID`] marks an empty record.
    pub id: SymbolId,
    /// Unqualified identifier.
    pub name: String,
    /// Printed parameter-and-return list for callables, empty otherwise.
    pub signature: String,
    /// Printed return type or empty.
    pub return_type: String,
    /// Declaration kind.
    pub kind: SymbolKind,
    /// Visibility.
    pub modifier: Modifier,
    /// Canonical declaration location; zero range when compiler-synthesized.
    pub location: Location,
    /// Pre-expansion source location when `location` is in a macro-expansion
    /// file.
    pub declaration: Location,
    /// The invoking call site when this symbol was born from a macro
    /// expansion.
    pub macro_call: Location,
    /// Dotted package as the leading segment, then `:`-separated enclosing
    /// declarations, e.g. `app.net:Server:`.
    pub scope: String,
    /// True when the symbol came from a compiled `.lmi` package interface
    /// rather than source.
    pub from_interface: bool,
}

impl Default for SymbolId {
    fn default() -> Self {
        SymbolId::INVALID
    }
}

impl Default for SymbolKind {
    fn default() -> Self {
        SymbolKind::Other
    }
}

impl Symbol {
    /// The package part of the scope (everything before the first `:`).
    pub fn package(&self) -> &str {
        match self.scope.find(SCOPE_SEPARATOR) {
            Some(idx) => &self.scope[..idx],
            None => &self.scope,
        }
    }

    /// The innermost enclosing scope segment, or the whole scope when there
    /// is none. For an `init` constructor this is the owning type's name.
    pub fn enclosing_name(&self) -> &str {
        let trimmed = self.scope.trim_end_matches(SCOPE_SEPARATOR);
        match trimmed.rfind(SCOPE_SEPARATOR) {
            Some(idx) => &trimmed[idx + 1..],
            None => trimmed,
        }
    }
}

/// Classification of a single symbol occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RefKind {
    /// The defining occurrence.
    Definition,
    /// A plain use.
    Reference,
    /// An occurrence inside an import statement.
    Import,
    /// A forward or secondary declaration.
    Declaration,
}

impl RefKind {
    const fn bit(self) -> u8 {
        match self {
            RefKind::Definition => 1 << 0,
            RefKind::Reference => 1 << 1,
            RefKind::Import => 1 << 2,
            RefKind::Declaration => 1 << 3,
        }
    }
}

/// A set of [`RefKind`]s used to filter reference queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RefKindSet(u8);

impl RefKindSet {
    /// The empty set.
    pub const EMPTY: RefKindSet = RefKindSet(0);
    /// Every kind.
    pub const ALL: RefKindSet = RefKindSet(0b1111);

    /// True when `kind` is in the set.
    pub const fn contains(&self, kind: RefKind) -> bool {
        self.0 & kind.bit() != 0
    }
}

impl From<RefKind> for RefKindSet {
    fn from(kind: RefKind) -> Self {
        RefKindSet(kind.bit())
    }
}

impl BitOr for RefKind {
    type Output = RefKindSet;
    fn bitor(self, rhs: RefKind) -> RefKindSet {
        RefKindSet(self.bit() | rhs.bit())
    }
}

impl BitOr<RefKind> for RefKindSet {
    type Output = RefKindSet;
    fn bitor(self, rhs: RefKind) -> RefKindSet {
        RefKindSet(self.0 | rhs.bit())
    }
}

/// One occurrence of a symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ref {
    /// Exact token range of the occurrence.
    pub location: Location,
    /// Id of the enclosing declaration, [`SymbolId::INVALID`] at top level.
    pub container: SymbolId,
    /// Occurrence kind.
    pub kind: RefKind,
}

/// Label of a directed relation edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationKind {
    /// Subject is lexically contained by object.
    ContainedBy,
    /// Subject overrides object.
    Overrides,
    /// Subject extends object.
    Extends,
    /// Subject implements object.
    Implements,
}

/// A directed labelled edge between two symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Relation {
    /// Source of the edge.
    pub subject: SymbolId,
    /// Edge label.
    pub predicate: RelationKind,
    /// Target of the edge.
    pub object: SymbolId,
}
