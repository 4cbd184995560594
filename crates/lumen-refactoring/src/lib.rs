//! Cross-file refactoring engine for Lumen.
//!
//! The centerpiece is the file-move planner: given a file or directory move
//! between packages it computes the minimal set of import edits across all
//! transitively affected files, honoring visibility modifiers, re-export
//! chains, multi-import statements and same-package access elision. The
//! package relation resolver and the edit-batch types it builds on live
//! here too.

mod decision;
mod edit;
mod file_move;
mod project;
mod relation;

pub use decision::{decide, RefactorAction, RefactorKind};
pub use edit::{Edit, EditBatch, EditKind};
pub use file_move::{FileMovePlanner, FileMoveRequest, PlanOutcome, RefusalReason};
pub use project::{path_to_uri, source_files_under, ProjectSource};
pub use relation::{package_relation, PackageRelation};
