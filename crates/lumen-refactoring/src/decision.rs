//! The file-move decision table.
//!
//! One cell per `(refactor kind, package relation, visibility)` triple.
//! Omitted cells mean "no action"; in particular every `Private` cell and
//! every `DiffModule` cell, which never produce edits.

use crate::relation::PackageRelation;
use lumen_symbols::Modifier;

/// Which scan produced the pending edit decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefactorKind {
    /// Editing the moved file itself.
    MoveFile,
    /// Editing a file that references a symbol defined in the moved file.
    RefFile,
    /// Editing a file that imports through the moved file's re-exports.
    ReExport,
}

/// What to do to the file under consideration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefactorAction {
    /// Insert an import unless one (or equivalent access) already exists.
    EnsureImport,
    /// Delete every import of the refactored package from the moved file.
    DeleteMovedImports,
    /// Delete the import of the moved symbol, guarded on one existing.
    DeleteImport,
    /// Rewrite the import's package path to the new package.
    RewriteImport,
    /// Delete the import of a re-exported symbol, matching either the
    /// re-exporting or the origin package path.
    DeleteReExport,
    /// Rewrite the import of a re-exported symbol.
    RewriteReExport,
}

/// Looks up the decision cell; `None` means no action.
///
/// The relation argument is oriented as the phases compute it:
/// `MoveFile` relates the target package to the referenced symbol's package,
/// `RefFile`/`ReExport` relate the referring file's post-move package to the
/// target package. With that orientation `Parent` means "the first package
/// sits below the provider", which is the side `internal` visibility
/// reaches.
pub fn decide(
    kind: RefactorKind,
    relation: PackageRelation,
    modifier: Modifier,
) -> Option<RefactorAction> {
    use Modifier::{Internal, Protected, Public, Undefined};
    use PackageRelation::{Child, Parent, SameModule, SamePackage};
    use RefactorAction::{
        DeleteImport, DeleteMovedImports, DeleteReExport, EnsureImport, RewriteImport,
        RewriteReExport,
    };

    match (kind, relation, modifier) {
        (RefactorKind::MoveFile, Parent, Internal | Protected | Public) => Some(EnsureImport),
        (RefactorKind::MoveFile, Child, Protected | Public) => Some(EnsureImport),
        (RefactorKind::MoveFile, SameModule, Protected | Public) => Some(EnsureImport),
        (RefactorKind::MoveFile, SamePackage, Undefined) => Some(DeleteMovedImports),

        (RefactorKind::RefFile, Parent, Internal | Protected | Public) => Some(RewriteImport),
        (RefactorKind::RefFile, Child, Protected | Public) => Some(RewriteImport),
        (RefactorKind::RefFile, SameModule, Protected | Public) => Some(RewriteImport),
        (RefactorKind::RefFile, SamePackage, Internal | Protected | Public) => {
            Some(DeleteImport)
        }

        (RefactorKind::ReExport, Parent, Internal | Protected | Public) => {
            Some(RewriteReExport)
        }
        (RefactorKind::ReExport, Child, Protected | Public) => Some(RewriteReExport),
        (RefactorKind::ReExport, SameModule, Protected | Public) => Some(RewriteReExport),
        (RefactorKind::ReExport, SamePackage, Internal | Protected | Public) => {
            Some(DeleteReExport)
        }

        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_reaches_only_descendants() {
        // a referring file below the target package sees internal symbols
        assert_eq!(
            decide(RefactorKind::RefFile, PackageRelation::Parent, Modifier::Internal),
            Some(RefactorAction::RewriteImport)
        );
        // a referring file above it does not
        assert_eq!(
            decide(RefactorKind::RefFile, PackageRelation::Child, Modifier::Internal),
            None
        );
        assert_eq!(
            decide(RefactorKind::RefFile, PackageRelation::SameModule, Modifier::Internal),
            None
        );
    }

    #[test]
    fn test_move_file_same_package_prunes_imports() {
        assert_eq!(
            decide(RefactorKind::MoveFile, PackageRelation::SamePackage, Modifier::Undefined),
            Some(RefactorAction::DeleteMovedImports)
        );
        // only the undefined-modifier cell exists on that row
        assert_eq!(
            decide(RefactorKind::MoveFile, PackageRelation::SamePackage, Modifier::Public),
            None
        );
    }

    #[test]
    fn test_private_never_acts() {
        for kind in [RefactorKind::MoveFile, RefactorKind::RefFile, RefactorKind::ReExport] {
            for relation in [
                PackageRelation::SamePackage,
                PackageRelation::Child,
                PackageRelation::Parent,
                PackageRelation::SameModule,
                PackageRelation::DiffModule,
            ] {
                assert_eq!(decide(kind, relation, Modifier::Private), None);
            }
        }
    }

    #[test]
    fn test_diff_module_never_acts() {
        for kind in [RefactorKind::MoveFile, RefactorKind::RefFile, RefactorKind::ReExport] {
            for modifier in [
                Modifier::Undefined,
                Modifier::Private,
                Modifier::Internal,
                Modifier::Protected,
                Modifier::Public,
            ] {
                assert_eq!(decide(kind, PackageRelation::DiffModule, modifier), None);
            }
        }
    }

    #[test]
    fn test_reexport_mirrors_ref_file_shape() {
        assert_eq!(
            decide(RefactorKind::ReExport, PackageRelation::SamePackage, Modifier::Public),
            Some(RefactorAction::DeleteReExport)
        );
        assert_eq!(
            decide(RefactorKind::ReExport, PackageRelation::Child, Modifier::Public),
            Some(RefactorAction::RewriteReExport)
        );
    }
}
