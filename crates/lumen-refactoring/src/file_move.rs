//! The file-move planner.
//!
//! Given a move of a file or directory between packages, computes the
//! minimal cross-file edit set: the moved file's package declaration and
//! imports, every file that references symbols defined in the moved file,
//! and every file that imports through the moved file's re-exports.
//!
//! The planner never errors through the LSP boundary. Early refusals
//! (cross-module target, root-package rename) yield an explicit
//! [`PlanOutcome::Refused`]; lookup failures inside a phase are logged and
//! the affected file is skipped, never half-edited.

use crate::decision::{decide, RefactorAction, RefactorKind};
use crate::edit::{Edit, EditBatch};
use crate::project::{
    dir_path, file_name, is_under_path, join_path, path_to_uri, ProjectSource,
};
use crate::relation::{package_relation, PackageRelation};
use lumen_index::{
    CancelToken, FileRefsRequest, LookupRequest, PkgSymsRequest, RefsRequest, SymbolIndex,
};
use lumen_position::{Position, Range};
use lumen_symbols::{Modifier, RefKind, Symbol, SymbolId, SCOPE_SEPARATOR};
use lumen_syntax::{File, ImportKind, ImportSpec};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::info;

/// A parsed file-move request, in absolute paths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileMoveRequest {
    /// The file the cursor is in.
    pub file: String,
    /// The moved element: the file itself, or an enclosing directory whose
    /// whole subtree moves.
    pub selected_element: String,
    /// Destination directory.
    pub target_dir: String,
}

/// Why the planner declined to compute edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefusalReason {
    /// Source and target live in different modules.
    CrossModule,
    /// The move would rename a root package.
    RootPackageMove,
    /// The source package could not be resolved.
    UnknownSourcePackage,
    /// The target directory maps to no package.
    UnknownTargetPackage,
    /// The moved file is not available in parsed form.
    MissingFile,
}

/// Result of a planning run.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanOutcome {
    /// The computed edit batch (possibly empty).
    Edits(EditBatch),
    /// Refused early; the IDE shows "no changes".
    Refused(RefusalReason),
    /// The request was cancelled; the partial batch was dropped.
    Cancelled,
}

struct Cancelled;

type Flow = Result<(), Cancelled>;

struct RefactorCtx {
    file_node: Arc<File>,
    file: String,
    refactor_pkg: String,
    new_pkg: String,
    re_exported_pkg: String,
    sym: String,
    kind: RefactorKind,
    target_path: String,
    access_for_target: bool,
}

/// Plans one file-move request. Holds per-request scratch only; dropped
/// with the request.
pub struct FileMovePlanner<'a, P: ProjectSource> {
    project: &'a P,
    index: &'a SymbolIndex,
    token: CancelToken,
    move_dir: Option<String>,
    target_dir: String,
    file_cache: HashMap<String, Option<Arc<File>>>,
}

impl<'a, P: ProjectSource> FileMovePlanner<'a, P> {
    /// Creates a planner over the project and index.
    pub fn new(project: &'a P, index: &'a SymbolIndex, token: CancelToken) -> Self {
        Self {
            project,
            index,
            token,
            move_dir: None,
            target_dir: String::new(),
            file_cache: HashMap::new(),
        }
    }

    /// Computes the edit batch for the request.
    pub fn plan(&mut self, req: &FileMoveRequest) -> PlanOutcome {
        // a selected element without a dot in its name is a directory
        let is_dir = !file_name(&req.selected_element).contains('.');

        let source_pkg = if is_dir {
            match self.project.package_of_dir(&req.selected_element) {
                Some(pkg) => pkg,
                None => {
                    info!(dir = %req.selected_element, "no package for moved directory");
                    return PlanOutcome::Refused(RefusalReason::UnknownSourcePackage);
                }
            }
        } else {
            match self.file_node(&req.file) {
                Some(file) => file.package_name().to_string(),
                None => {
                    info!(file = %req.file, "no parsed file for move request");
                    return PlanOutcome::Refused(RefusalReason::MissingFile);
                }
            }
        };
        let Some(target_pkg) = self.project.package_of_dir(&req.target_dir) else {
            info!(dir = %req.target_dir, "no package for target directory");
            return PlanOutcome::Refused(RefusalReason::UnknownTargetPackage);
        };
        if package_relation(&source_pkg, &target_pkg) == PackageRelation::DiffModule {
            info!(from = %source_pkg, to = %target_pkg, "cross-module move refused");
            return PlanOutcome::Refused(RefusalReason::CrossModule);
        }
        if is_dir && !source_pkg.contains('.') {
            info!(pkg = %source_pkg, "root-package move refused");
            return PlanOutcome::Refused(RefusalReason::RootPackageMove);
        }

        self.target_dir = req.target_dir.clone();
        let mut batch = EditBatch::new();
        if is_dir {
            self.move_dir = Some(req.selected_element.clone());
            let mut paths = self.project.files_under(&req.selected_element);
            paths.sort();
            for path in paths {
                if self.token.is_cancelled() {
                    return PlanOutcome::Cancelled;
                }
                let Some(file) = self.file_node(&path) else {
                    info!(file = %path, "skipping unparsed file under moved directory");
                    continue;
                };
                let file_target_pkg =
                    self.package_after_move(&path, file.package_name());
                let target_path = self.target_path_for(&path);
                if self.plan_one(&file, &path, &file_target_pkg, &target_path, &mut batch).is_err()
                {
                    return PlanOutcome::Cancelled;
                }
            }
        } else {
            if source_pkg == target_pkg {
                // moving a file into its own package changes nothing
                return PlanOutcome::Edits(EditBatch::new());
            }
            let Some(file) = self.file_node(&req.file) else {
                return PlanOutcome::Refused(RefusalReason::MissingFile);
            };
            let target_path = join_path(&req.target_dir, file_name(&req.file));
            if self.plan_one(&file, &req.file, &target_pkg, &target_path, &mut batch).is_err() {
                return PlanOutcome::Cancelled;
            }
        }
        PlanOutcome::Edits(batch)
    }

    fn plan_one(
        &mut self,
        file: &Arc<File>,
        path: &str,
        target_pkg: &str,
        target_path: &str,
        batch: &mut EditBatch,
    ) -> Flow {
        if let Some(pkg_decl) = &file.package {
            batch.insert(
                path_to_uri(target_path),
                Edit::changed(pkg_decl.name_range, target_pkg),
            );
        }
        self.deal_move_file(file, path, target_pkg, target_path, batch)?;
        self.deal_ref_file(file, path, target_pkg, batch)?;
        self.deal_re_export(file, path, target_pkg, batch)?;
        Ok(())
    }

    fn check_cancel(&self) -> Flow {
        if self.token.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }

    // ------------------------------------------------------------------
    // Phase 1: the moved file's own imports
    // ------------------------------------------------------------------

    fn deal_move_file(
        &mut self,
        file: &Arc<File>,
        path: &str,
        target_pkg: &str,
        target_path: &str,
        batch: &mut EditBatch,
    ) -> Flow {
        let referenced = self.index.file_refs(&FileRefsRequest {
            file_id: file.file_id,
            uri: path.to_string(),
            package: file.package_name().to_string(),
            kinds: RefKind::Reference.into(),
        });
        let mut ids: Vec<SymbolId> = referenced
            .into_iter()
            .filter(|(r, _)| !r.location.is_zero())
            .map(|(_, id)| id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        ids.sort();

        for sym in self.index.lookup(&LookupRequest { ids }) {
            self.check_cancel()?;
            if sym.location.file_uri == path || sym.location.file_uri.is_empty() {
                continue;
            }
            let pkg = full_pkg_by_scope(&sym.scope);
            if pkg.is_empty() || !is_valid_export_sym(&sym, &pkg) {
                continue;
            }
            let pkg = self.package_after_move(&sym.location.file_uri, &pkg);
            let relation = package_relation(target_pkg, &pkg);
            if relation == PackageRelation::SamePackage {
                continue;
            }
            let access_for_target =
                self.exists_import_for_target_pkg(sym.id, target_pkg, path);
            let ctx = RefactorCtx {
                file_node: Arc::clone(file),
                file: path.to_string(),
                refactor_pkg: pkg.clone(),
                new_pkg: pkg,
                re_exported_pkg: String::new(),
                sym: real_import_sym_name(&sym),
                kind: RefactorKind::MoveFile,
                target_path: target_path.to_string(),
                access_for_target,
            };
            self.dispatch(&ctx, relation, sym.modifier, batch);
        }

        // imports of the target package become same-package access
        let ctx = RefactorCtx {
            file_node: Arc::clone(file),
            file: path.to_string(),
            refactor_pkg: target_pkg.to_string(),
            new_pkg: String::new(),
            re_exported_pkg: String::new(),
            sym: String::new(),
            kind: RefactorKind::MoveFile,
            target_path: target_path.to_string(),
            access_for_target: false,
        };
        self.dispatch(&ctx, PackageRelation::SamePackage, Modifier::Undefined, batch);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Phase 2: files that reference symbols defined in the moved file
    // ------------------------------------------------------------------

    fn deal_ref_file(
        &mut self,
        file: &Arc<File>,
        path: &str,
        target_pkg: &str,
        batch: &mut EditBatch,
    ) -> Flow {
        let file_pkg = file.package_name().to_string();
        let defined = self.index.file_refs(&FileRefsRequest {
            file_id: file.file_id,
            uri: path.to_string(),
            package: file_pkg.clone(),
            kinds: RefKind::Definition.into(),
        });
        let mut ids: Vec<SymbolId> =
            defined.into_iter().map(|(_, id)| id).collect::<HashSet<_>>().into_iter().collect();
        ids.sort();

        for sym in self.index.lookup(&LookupRequest { ids }) {
            self.check_cancel()?;
            if !is_valid_export_sym(&sym, &file_pkg) {
                continue;
            }
            let sym_name = real_import_sym_name(&sym);
            let modifier = sym.modifier;
            let mut refs = self.index.refs(&RefsRequest {
                ids: vec![sym.id],
                kinds: RefKind::Reference | RefKind::Import,
            });
            refs.sort_by(|a, b| {
                (&a.location.file_uri, a.location.range).cmp(&(&b.location.file_uri, b.location.range))
            });
            let mut processed: HashSet<String> = HashSet::new();
            for r in refs {
                self.check_cancel()?;
                if r.location.is_zero() || r.location.file_uri == path {
                    continue;
                }
                if !processed.insert(r.location.file_uri.clone()) {
                    continue;
                }
                let Some(ref_pkg) = self.project.package_of_file(&r.location.file_uri) else {
                    info!(file = %r.location.file_uri, "no package for referring file");
                    continue;
                };
                if package_relation(&file_pkg, &ref_pkg) == PackageRelation::DiffModule {
                    continue;
                }
                let Some(ref_file) = self.file_node(&r.location.file_uri) else {
                    info!(file = %r.location.file_uri, "no parsed file for referring file");
                    continue;
                };
                let relation = package_relation(
                    &self.package_after_move(&r.location.file_uri, &ref_pkg),
                    target_pkg,
                );
                let ctx = RefactorCtx {
                    file_node: ref_file,
                    file: r.location.file_uri.clone(),
                    refactor_pkg: file_pkg.clone(),
                    new_pkg: target_pkg.to_string(),
                    re_exported_pkg: String::new(),
                    sym: sym_name.clone(),
                    kind: RefactorKind::RefFile,
                    target_path: self.target_path_for(&r.location.file_uri),
                    access_for_target: false,
                };
                self.dispatch(&ctx, relation, modifier, batch);
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Phase 3: files importing through the moved file's re-exports
    // ------------------------------------------------------------------

    fn deal_re_export(
        &mut self,
        file: &Arc<File>,
        path: &str,
        target_pkg: &str,
        batch: &mut EditBatch,
    ) -> Flow {
        let file_pkg = file.package_name().to_string();
        let imports = file.imports.clone();
        for imp in &imports {
            self.check_cancel()?;
            if is_invalid_reexport_import(imp) {
                continue;
            }
            let origin_pkg = imp.content.full_package();
            let candidates =
                self.index.package_symbols(&PkgSymsRequest { package: origin_pkg.clone() });
            let re_exported: Vec<Symbol> = match imp.content.kind {
                ImportKind::All => candidates
                    .into_iter()
                    .filter(|s| is_valid_export_sym(s, &origin_pkg))
                    .collect(),
                _ => {
                    let full_sym = imp.content.full_symbol().unwrap_or_default();
                    candidates
                        .into_iter()
                        .filter(|s| is_valid_export_sym_named(s, &origin_pkg, &full_sym))
                        .collect()
                }
            };
            for sym in re_exported {
                self.check_cancel()?;
                let sym_name = real_import_sym_name(&sym);
                let mut refs = self.index.refs(&RefsRequest {
                    ids: vec![sym.id],
                    kinds: RefKind::Reference | RefKind::Import,
                });
                refs.sort_by(|a, b| {
                    (&a.location.file_uri, a.location.range)
                        .cmp(&(&b.location.file_uri, b.location.range))
                });
                let mut processed: HashSet<String> = HashSet::new();
                for r in refs {
                    if r.location.is_zero() || r.location.file_uri == path {
                        continue;
                    }
                    if !processed.insert(r.location.file_uri.clone()) {
                        continue;
                    }
                    let Some(ref_pkg) = self.project.package_of_file(&r.location.file_uri)
                    else {
                        continue;
                    };
                    if ref_pkg == origin_pkg
                        || package_relation(&file_pkg, &ref_pkg) == PackageRelation::DiffModule
                    {
                        continue;
                    }
                    let Some(ref_file) = self.file_node(&r.location.file_uri) else {
                        info!(file = %r.location.file_uri, "no parsed file for re-export consumer");
                        continue;
                    };
                    let relation = package_relation(
                        &self.package_after_move(&r.location.file_uri, &ref_pkg),
                        target_pkg,
                    );
                    let ctx = RefactorCtx {
                        file_node: ref_file,
                        file: r.location.file_uri.clone(),
                        refactor_pkg: file_pkg.clone(),
                        new_pkg: target_pkg.to_string(),
                        re_exported_pkg: origin_pkg.clone(),
                        sym: sym_name.clone(),
                        kind: RefactorKind::ReExport,
                        target_path: self.target_path_for(&r.location.file_uri),
                        access_for_target: false,
                    };
                    self.dispatch(&ctx, relation, imp.modifier, batch);
                }
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Decision dispatch and actions
    // ------------------------------------------------------------------

    fn dispatch(
        &mut self,
        ctx: &RefactorCtx,
        relation: PackageRelation,
        modifier: Modifier,
        batch: &mut EditBatch,
    ) {
        match decide(ctx.kind, relation, modifier) {
            Some(RefactorAction::EnsureImport) => self.check_and_add_import(ctx, batch),
            Some(RefactorAction::DeleteMovedImports) => self.delete_import(ctx, batch),
            Some(RefactorAction::DeleteImport) => self.check_and_delete_import(ctx, batch),
            Some(RefactorAction::RewriteImport) => {
                self.check_and_change_import(ctx, batch, false)
            }
            Some(RefactorAction::DeleteReExport) => {
                if self.contains_full_sym_import_for_re(ctx) {
                    self.delete_import(ctx, batch);
                }
            }
            Some(RefactorAction::RewriteReExport) => {
                self.check_and_change_import(ctx, batch, true)
            }
            None => {}
        }
    }

    fn check_and_add_import(&mut self, ctx: &RefactorCtx, batch: &mut EditBatch) {
        if !self.contains_full_sym_import(ctx) && !ctx.access_for_target {
            self.add_import(ctx, Modifier::Undefined, None, batch);
        }
    }

    fn check_and_delete_import(&mut self, ctx: &RefactorCtx, batch: &mut EditBatch) {
        if contains_full_pkg_import(&ctx.file_node, &ctx.refactor_pkg) {
            self.delete_import(ctx, batch);
        }
    }

    fn check_and_change_import(&mut self, ctx: &RefactorCtx, batch: &mut EditBatch, for_re: bool) {
        let same_pkg = self
            .project
            .package_of_file(&ctx.file)
            .map(|ref_pkg| {
                package_relation(&ctx.refactor_pkg, &ref_pkg) == PackageRelation::SamePackage
            })
            .unwrap_or(false);
        let has_import = if for_re {
            self.contains_full_sym_import_for_re(ctx)
        } else {
            self.contains_full_sym_import(ctx)
        };
        if same_pkg && !has_import {
            // same-package access so far; the move makes an import necessary
            self.add_import(ctx, Modifier::Undefined, None, batch);
            return;
        }
        if contains_full_pkg_import(&ctx.file_node, &ctx.refactor_pkg) {
            self.change_import(ctx, batch);
        }
    }

    fn add_import(
        &mut self,
        ctx: &RefactorCtx,
        modifier: Modifier,
        alias: Option<&str>,
        batch: &mut EditBatch,
    ) {
        let pos = import_insert_pos(&ctx.file_node);
        let mut content = String::new();
        if modifier != Modifier::Undefined {
            content.push_str(modifier.keyword());
            content.push(' ');
        }
        content.push_str("import ");
        content.push_str(&ctx.new_pkg);
        content.push('.');
        content.push_str(&ctx.sym);
        if let Some(alias) = alias {
            content.push_str(" as ");
            content.push_str(alias);
        }
        content.push('\n');
        batch.insert(path_to_uri(&ctx.target_path), Edit::added(Range::empty(pos), content));
    }

    fn delete_import(&mut self, ctx: &RefactorCtx, batch: &mut EditBatch) {
        if ctx.file_node.imports.is_empty() {
            return;
        }
        let uri = path_to_uri(&ctx.target_path);
        let multis = collect_multis(&ctx.file_node);
        let mut deleted_multis: Vec<ImportSpec> = Vec::new();
        if ctx.kind == RefactorKind::MoveFile {
            // whole multi-imports of the refactored package go away at once
            for multi in &multis {
                if multi.content.full_package() == ctx.refactor_pkg {
                    batch.insert(uri.clone(), Edit::deleted(multi.range));
                    deleted_multis.push(multi.clone());
                }
            }
        }
        let imports = ctx.file_node.imports.clone();
        for imp in &imports {
            if imp.is_unusable() || imp.content.kind == ImportKind::Multi {
                continue;
            }
            match ctx.kind {
                RefactorKind::MoveFile => {
                    if imp.content.full_package() != ctx.refactor_pkg
                        || deleted_multis.iter().any(|m| m.range.encloses(imp.range))
                    {
                        continue;
                    }
                }
                RefactorKind::RefFile => {
                    if imp.content.kind == ImportKind::All {
                        continue;
                    }
                    let target = format!("{}.{}", ctx.refactor_pkg, ctx.sym);
                    if imp.content.full_symbol().as_deref() != Some(target.as_str()) {
                        continue;
                    }
                }
                RefactorKind::ReExport => {
                    if imp.content.kind == ImportKind::All {
                        continue;
                    }
                    let through = format!("{}.{}", ctx.refactor_pkg, ctx.sym);
                    let origin = format!("{}.{}", ctx.re_exported_pkg, ctx.sym);
                    let full = imp.content.full_symbol().unwrap_or_default();
                    if full != through && full != origin {
                        continue;
                    }
                }
            }
            let range = self
                .delete_range_in_multi(&multis, imp, batch, &uri)
                .unwrap_or(imp.range);
            batch.insert(uri.clone(), Edit::deleted(range));
        }
    }

    fn change_import(&mut self, ctx: &RefactorCtx, batch: &mut EditBatch) {
        if ctx.file_node.imports.is_empty() {
            return;
        }
        let uri = path_to_uri(&ctx.target_path);
        let multis = collect_multis(&ctx.file_node);
        let refactor_full_sym = format!("{}.{}", ctx.refactor_pkg, ctx.sym);
        let imports = ctx.file_node.imports.clone();
        for imp in &imports {
            if imp.is_unusable() || imp.content.kind == ImportKind::Multi {
                continue;
            }
            let import_full_pkg = imp.content.full_package();
            if imp.content.kind == ImportKind::All {
                if import_full_pkg != ctx.refactor_pkg {
                    continue;
                }
                if self.move_dir.is_some() {
                    // the package travels with the directory: rewrite the
                    // star import's prefix in place
                    if let Some(prefix) = imp.content.prefix_range() {
                        batch.insert(uri.clone(), Edit::changed(prefix, ctx.new_pkg.clone()));
                    }
                } else {
                    // the star stops covering the moved symbol: import it
                    // individually from its new home
                    self.add_import(ctx, imp.modifier, None, batch);
                }
                continue;
            }
            if imp.content.full_symbol().as_deref() != Some(refactor_full_sym.as_str()) {
                continue;
            }
            if let Some(delete) = self.delete_range_in_multi(&multis, imp, batch, &uri) {
                // split out of the brace statement, reinsert as a single
                batch.insert(uri.clone(), Edit::deleted(delete));
                self.add_import(ctx, imp.modifier, imp.content.alias.as_deref(), batch);
                continue;
            }
            if let Some(prefix) = imp.content.prefix_range() {
                batch.insert(uri.clone(), Edit::changed(prefix, ctx.new_pkg.clone()));
            }
        }
    }

    /// Delete-range arithmetic inside a brace import.
    ///
    /// Deleting a member consumes the following comma; the last member
    /// consumes the preceding one instead. Once every member is scheduled,
    /// the whole statement is deleted and the member deletes coalesce away.
    fn delete_range_in_multi(
        &mut self,
        multis: &[ImportSpec],
        member: &ImportSpec,
        batch: &mut EditBatch,
        uri: &str,
    ) -> Option<Range> {
        let multi = multis.iter().find(|m| m.range.encloses(member.range))?;
        if batch.has_delete(uri, multi.range) {
            return Some(multi.range);
        }
        let scheduled = batch.deletes_within(uri, multi.range);
        if scheduled.len() >= multi.content.items.len().saturating_sub(1)
            && !multi.content.items.is_empty()
            && !scheduled.iter().any(|r| r.encloses(member.range))
        {
            batch.remove_subsumed_deletes(uri, multi.range);
            return Some(multi.range);
        }
        let mut commas = multi.content.comma_positions.clone();
        commas.sort();
        let mut start = member.range.start;
        let mut end = member.range.end;
        if let Some(comma) = commas.iter().find(|c| **c >= member.range.end) {
            end = Position { column: comma.column + 1, ..*comma };
        } else if let Some(comma) = commas.iter().rev().find(|c| **c <= member.range.start) {
            // last member: take the preceding comma, unless an earlier
            // member delete already covers it
            if !scheduled.iter().any(|r| r.contains(*comma)) {
                start = *comma;
            }
        }
        Some(Range::new(start, end))
    }

    // ------------------------------------------------------------------
    // Import-presence guards
    // ------------------------------------------------------------------

    fn contains_full_sym_import(&mut self, ctx: &RefactorCtx) -> bool {
        let full_sym = format!("{}.{}", ctx.refactor_pkg, ctx.sym);
        if ctx.kind == RefactorKind::MoveFile {
            return file_contains_full_sym_import(
                &ctx.file_node,
                true,
                &full_sym,
                &ctx.refactor_pkg,
            );
        }
        let Some(pkg) = self.project.package_of_file(&ctx.file) else {
            return false;
        };
        self.project.package_files(&pkg).iter().any(|f| {
            file_contains_full_sym_import(f, f.path == ctx.file, &full_sym, &ctx.refactor_pkg)
        })
    }

    fn contains_full_sym_import_for_re(&mut self, ctx: &RefactorCtx) -> bool {
        let through_sym = format!("{}.{}", ctx.refactor_pkg, ctx.sym);
        let origin_sym = format!("{}.{}", ctx.re_exported_pkg, ctx.sym);
        let Some(pkg) = self.project.package_of_file(&ctx.file) else {
            return false;
        };
        self.project.package_files(&pkg).iter().any(|f| {
            let is_ref_file = f.path == ctx.file;
            f.imports.iter().any(|imp| {
                if imp.is_unusable() || imp.content.kind == ImportKind::Multi {
                    return false;
                }
                let pkg_match = imp.content.kind == ImportKind::All
                    && (imp.content.full_package() == ctx.refactor_pkg
                        || imp.content.full_package() == ctx.re_exported_pkg);
                let sym_match = imp
                    .content
                    .full_symbol()
                    .map(|s| s == through_sym || s == origin_sym)
                    .unwrap_or(false);
                if is_ref_file {
                    pkg_match || sym_match
                } else {
                    imp.modifier.is_reexport() && (pkg_match || sym_match)
                }
            })
        })
    }

    fn exists_import_for_target_pkg(
        &mut self,
        id: SymbolId,
        target_pkg: &str,
        move_file: &str,
    ) -> bool {
        let refs =
            self.index.refs(&RefsRequest { ids: vec![id], kinds: RefKind::Import.into() });
        for r in refs {
            if r.location.is_zero() {
                continue;
            }
            let Some(import_pkg) = self.project.package_of_file(&r.location.file_uri) else {
                continue;
            };
            let in_target =
                package_relation(target_pkg, &import_pkg) == PackageRelation::SamePackage;
            if !in_target && r.location.file_uri != move_file {
                continue;
            }
            let Some(file) = self.file_node(&r.location.file_uri) else {
                info!(file = %r.location.file_uri, "no parsed file for import site");
                continue;
            };
            let is_move_file = r.location.file_uri == move_file;
            let granted = file.imports.iter().any(|imp| {
                !imp.is_unusable()
                    && imp.range.encloses(r.location.range)
                    && (is_move_file || imp.modifier.is_reexport())
            });
            if granted {
                return true;
            }
        }
        false
    }

    // ------------------------------------------------------------------
    // Directory-move mappings and scratch
    // ------------------------------------------------------------------

    fn package_after_move(&mut self, path: &str, pkg: &str) -> String {
        let Some(move_dir) = self.move_dir.clone() else {
            return pkg.to_string();
        };
        if !is_under_path(&move_dir, path) {
            return pkg.to_string();
        }
        let (Some(target_pkg), Some(move_pkg)) = (
            self.project.package_of_dir(&self.target_dir),
            self.project.package_of_dir(&move_dir),
        ) else {
            return pkg.to_string();
        };
        let parent_pkg = match move_pkg.rfind('.') {
            Some(idx) => &move_pkg[..idx],
            None => move_pkg.as_str(),
        };
        let sub = if pkg.len() > parent_pkg.len() { &pkg[parent_pkg.len()..] } else { "" };
        format!("{target_pkg}{sub}")
    }

    fn target_path_for(&self, path: &str) -> String {
        let Some(move_dir) = &self.move_dir else {
            return path.to_string();
        };
        if !is_under_path(move_dir, path) {
            return path.to_string();
        }
        join_path(&self.target_dir, &path[dir_path(move_dir).len()..])
    }

    fn file_node(&mut self, path: &str) -> Option<Arc<File>> {
        if let Some(cached) = self.file_cache.get(path) {
            return cached.clone();
        }
        let file = self.project.file(path);
        self.file_cache.insert(path.to_string(), file.clone());
        file
    }
}

// ----------------------------------------------------------------------
// Free helpers
// ----------------------------------------------------------------------

fn collect_multis(file: &File) -> Vec<ImportSpec> {
    file.imports
        .iter()
        .filter(|imp| !imp.is_unusable() && imp.content.kind == ImportKind::Multi)
        .cloned()
        .collect()
}

fn import_insert_pos(file: &File) -> Position {
    let mut line = file.package.as_ref().map(|p| p.name_range.end.line + 1).unwrap_or(0);
    for imp in &file.imports {
        if !imp.is_unusable() {
            line = line.max(imp.range.end.line + 1);
        }
    }
    Position::new(line, 0)
}

fn full_pkg_by_scope(scope: &str) -> String {
    match scope.find(SCOPE_SEPARATOR) {
        Some(idx) => scope[..idx].to_string(),
        None => scope.to_string(),
    }
}

fn real_import_sym_name(sym: &Symbol) -> String {
    if sym.name != "init" {
        return sym.name.clone();
    }
    // anonymous constructor: the importable name is the owning type's
    sym.enclosing_name().to_string()
}

fn is_constructor_signature(sym: &Symbol) -> bool {
    sym.kind == lumen_symbols::SymbolKind::Function
        || sym.kind == lumen_symbols::SymbolKind::PrimaryConstructor
}

fn is_valid_export_sym(sym: &Symbol, exported_pkg: &str) -> bool {
    if sym.location.range.end.is_zero() && sym.name != "init" {
        return false;
    }
    if sym.scope == exported_pkg {
        return true;
    }
    is_constructor_signature(sym) && sym.signature.starts_with("init(")
}

fn is_valid_export_sym_named(sym: &Symbol, exported_pkg: &str, full_sym: &str) -> bool {
    if sym.location.range.end.is_zero() && sym.name != "init" {
        return false;
    }
    if full_sym == format!("{exported_pkg}.{}", sym.name) && sym.scope == exported_pkg {
        return true;
    }
    let Some(idx) = full_sym.rfind('.') else {
        return false;
    };
    let import_sym = &full_sym[idx + 1..];
    let qualifier_scope = format!("{exported_pkg}{SCOPE_SEPARATOR}{import_sym}");
    sym.scope == qualifier_scope
        && is_constructor_signature(sym)
        && sym.signature.starts_with("init(")
}

fn is_invalid_reexport_import(imp: &ImportSpec) -> bool {
    imp.is_unusable()
        || imp.content.kind == ImportKind::Multi
        || !imp.modifier.is_reexport()
}

fn contains_full_pkg_import(file: &File, refactor_pkg: &str) -> bool {
    file.imports.iter().any(|imp| {
        if imp.is_unusable() || imp.content.kind == ImportKind::Multi {
            return false;
        }
        let import_pkg = imp.content.full_package();
        import_pkg == refactor_pkg
            || (import_pkg.len() > refactor_pkg.len()
                && import_pkg.starts_with(refactor_pkg)
                && import_pkg.as_bytes()[refactor_pkg.len()] == b'.')
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_symbols::{Location, SymbolKind};

    #[test]
    fn test_full_pkg_by_scope() {
        assert_eq!(full_pkg_by_scope("a.b:K:"), "a.b");
        assert_eq!(full_pkg_by_scope("a.b"), "a.b");
    }

    #[test]
    fn test_real_import_sym_name_for_constructor() {
        let ctor = Symbol {
            name: "init".to_string(),
            scope: "a.b:Widget".to_string(),
            ..Symbol::default()
        };
        assert_eq!(real_import_sym_name(&ctor), "Widget");
        let plain = Symbol { name: "draw".to_string(), ..Symbol::default() };
        assert_eq!(real_import_sym_name(&plain), "draw");
    }

    #[test]
    fn test_valid_export_requires_top_level_or_constructor() {
        let top = Symbol {
            name: "K".to_string(),
            scope: "a.b".to_string(),
            kind: SymbolKind::Class,
            location: Location::new(
                "/w/a/b/one.lm",
                Range::new(Position::new(1, 0), Position::new(1, 1)),
            ),
            ..Symbol::default()
        };
        assert!(is_valid_export_sym(&top, "a.b"));

        let nested = Symbol {
            name: "helper".to_string(),
            scope: "a.b:K:".to_string(),
            kind: SymbolKind::Function,
            location: top.location.clone(),
            ..Symbol::default()
        };
        assert!(!is_valid_export_sym(&nested, "a.b"));

        let ctor = Symbol {
            name: "init".to_string(),
            scope: "a.b:K".to_string(),
            kind: SymbolKind::PrimaryConstructor,
            signature: "init(Int64)".to_string(),
            ..Symbol::default()
        };
        assert!(is_valid_export_sym(&ctor, "a.b"));
    }

    #[test]
    fn test_contains_full_pkg_import_dot_boundary() {
        let file = lumen_syntax::scan_header(
            1,
            "/w/a/g/user.lm",
            "package a.g\nimport a.b.K\nimport a.bc.J\n",
        );
        assert!(contains_full_pkg_import(&file, "a.b"));
        assert!(!contains_full_pkg_import(&file, "a.x"));
        // `a.bc` must not count as `a.b`
        let only_bc =
            lumen_syntax::scan_header(1, "/w/a/g/user.lm", "package a.g\nimport a.bc.J\n");
        assert!(!contains_full_pkg_import(&only_bc, "a.b"));
    }

    #[test]
    fn test_import_insert_pos_after_last_import() {
        let file = lumen_syntax::scan_header(
            1,
            "/w/a/b/one.lm",
            "package a.b\nimport c.d.X\nimport c.d.Y\n",
        );
        assert_eq!(import_insert_pos(&file), Position::new(3, 0));
        let bare = lumen_syntax::scan_header(1, "/w/a/b/two.lm", "package a.b\n");
        assert_eq!(import_insert_pos(&bare), Position::new(1, 0));
    }
}
