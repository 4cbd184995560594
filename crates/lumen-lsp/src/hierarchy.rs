//! Call- and type-hierarchy assembly over the symbol index.
//!
//! Items are resolved from the declaration under the cursor, widened along
//! the override chain for incoming calls, and grouped per container/callee.
//! Symbols whose declaration is not on disk are marked kernel symbols and
//! anchored at the requesting file.

use crate::state::{uri_to_path, WorkspaceState};
use lumen_index::{FileRefsRequest, LookupRequest, RefsRequest, SymbolIndex};
use lumen_position::{count_unicode_chars, utf8_to_utf16, utf16_to_utf8, Position, Range};
use lumen_protocol::hierarchy::{
    CallHierarchyIncomingCall, CallHierarchyItem, CallHierarchyOutgoingCall, TypeHierarchyItem,
};
use lumen_refactoring::path_to_uri;
use lumen_symbols::{Ref, RefKindSet, RelationKind, Symbol, SymbolId, SymbolKind};
use std::collections::{BTreeMap, BTreeSet};

/// Builds hierarchy items and call lists from index queries.
pub struct HierarchyAssembler<'a> {
    index: &'a SymbolIndex,
    workspace: &'a WorkspaceState,
}

impl<'a> HierarchyAssembler<'a> {
    /// Creates an assembler over the index and workspace.
    pub fn new(index: &'a SymbolIndex, workspace: &'a WorkspaceState) -> Self {
        Self { index, workspace }
    }

    // ------------------------------------------------------------------
    // Cursor resolution
    // ------------------------------------------------------------------

    /// The innermost indexed symbol whose occurrence covers the wire
    /// position, filtered by kind.
    fn symbol_at(
        &self,
        path: &str,
        wire_pos: Position,
        keep: fn(SymbolKind) -> bool,
    ) -> Option<Symbol> {
        let file = self.workspace.get(path)?;
        let pos = utf16_to_utf8(&file.tokens, wire_pos);
        let anchored = self.index.file_refs(&FileRefsRequest {
            file_id: file.file_id,
            uri: path.to_string(),
            package: file.package_name().to_string(),
            kinds: RefKindSet::ALL,
        });
        let (_, id) = anchored
            .into_iter()
            .filter(|(r, _)| r.location.range.contains(pos))
            .min_by_key(|(r, _)| {
                (r.location.range.end.line - r.location.range.start.line, r.location.range.end.column)
            })?;
        let sym = self.index.lookup(&LookupRequest { ids: vec![id] }).pop()?;
        if keep(sym.kind) { Some(sym) } else { None }
    }

    /// Prepares the call-hierarchy item at a cursor position.
    ///
    /// Methods participate, macros do not. A kernel symbol (declaration not
    /// on disk) is anchored at the cursor token of the requesting file.
    pub fn prepare_call(&self, path: &str, wire_pos: Position) -> Option<CallHierarchyItem> {
        let sym = self.symbol_at(path, wire_pos, |kind| {
            kind.is_callable() && kind != SymbolKind::Macro
        })?;
        let mut item = self.call_item(&sym, path);
        if item.is_kernel {
            if let Some(file) = self.workspace.get(path) {
                let pos = utf16_to_utf8(&file.tokens, wire_pos);
                if let Some(token) =
                    file.tokens.iter().find(|t| t.begin.line == pos.line && t.begin.column <= pos.column && pos.column < t.end.column)
                {
                    let widened = Range::new(
                        token.begin,
                        Position {
                            column: token.begin.column + count_unicode_chars(&token.value),
                            ..token.end
                        },
                    );
                    let widened = self.to_ide_range(path, widened);
                    item.selection_range = widened;
                    item.range = widened;
                }
            }
        }
        Some(item)
    }

    /// Incoming calls: callers of the item's whole override chain, grouped
    /// by containing declaration, self-references dropped.
    pub fn incoming(&self, item: &CallHierarchyItem) -> Vec<CallHierarchyIncomingCall> {
        let id = item.symbol_id;
        if !id.is_valid() {
            return Vec::new();
        }
        let fallback = uri_to_path(&item.uri).unwrap_or_default();
        let (ups, top) = self.index.find_ridden_up(id);
        let mut ids: BTreeSet<SymbolId> = ups.into_iter().collect();
        ids.extend(self.index.find_ridden_down(top));
        ids.insert(id);
        ids.insert(top);

        let refs = self.index.refs(&RefsRequest {
            ids: ids.into_iter().collect(),
            kinds: lumen_symbols::RefKind::Reference.into(),
        });
        let mut callers: BTreeMap<SymbolId, Vec<Ref>> = BTreeMap::new();
        for r in refs {
            if r.location.is_zero() {
                continue;
            }
            if r.container == id || !r.container.is_valid() {
                continue;
            }
            callers.entry(r.container).or_default().push(r);
        }

        let mut results = Vec::new();
        for (container, call_refs) in callers {
            let Some(container_sym) =
                self.index.lookup(&LookupRequest { ids: vec![container] }).pop()
            else {
                continue;
            };
            if container_sym.location.is_zero() && container_sym.name != "init" {
                continue;
            }
            if container_sym.signature.is_empty() {
                continue;
            }
            let from = self.call_item(&container_sym, &fallback);
            let ranges: BTreeSet<Range> = call_refs
                .iter()
                .map(|r| self.to_ide_range(&r.location.file_uri, r.location.range))
                .collect();
            results.push(CallHierarchyIncomingCall {
                from,
                from_ranges: ranges.into_iter().collect(),
            });
        }
        results
    }

    /// Outgoing calls: every call expression inside the item, grouped by
    /// callee.
    pub fn outgoing(&self, item: &CallHierarchyItem) -> Vec<CallHierarchyOutgoingCall> {
        let id = item.symbol_id;
        if !id.is_valid() {
            return Vec::new();
        }
        let fallback = uri_to_path(&item.uri).unwrap_or_default();
        let Some(decl) = self.index.lookup(&LookupRequest { ids: vec![id] }).pop() else {
            return Vec::new();
        };
        if decl.location.is_zero() && decl.name != "init" && !decl.from_interface {
            return Vec::new();
        }

        let mut callees: BTreeMap<SymbolId, Vec<Ref>> = BTreeMap::new();
        for (callee, site) in self.index.callees(decl.package(), id) {
            if site.location.is_zero() || site.location.file_uri.is_empty() {
                continue;
            }
            callees.entry(callee).or_default().push(site);
        }

        let mut results = Vec::new();
        for (callee, sites) in callees {
            let Some(sym) = self.index.lookup(&LookupRequest { ids: vec![callee] }).pop() else {
                continue;
            };
            if sym.location.is_zero() && sym.name != "init" && !sym.from_interface {
                continue;
            }
            if sym.signature.is_empty() || !sym.kind.is_callable() {
                continue;
            }
            let mut to = self.call_item(&sym, &fallback);
            let ranges: BTreeSet<Range> = sites
                .iter()
                .map(|r| self.to_ide_range(&r.location.file_uri, r.location.range))
                .collect();
            let ranges: Vec<Range> = ranges.into_iter().collect();
            if sym.from_interface && sym.location.is_zero() {
                // no source range of its own: navigate to the call site
                if let Some(first) = ranges.first() {
                    to.range = *first;
                    to.selection_range = *first;
                }
            }
            results.push(CallHierarchyOutgoingCall { to, from_ranges: ranges });
        }
        results
    }

    // ------------------------------------------------------------------
    // Type hierarchy
    // ------------------------------------------------------------------

    /// Prepares the type-hierarchy item at a cursor position.
    pub fn prepare_type(&self, path: &str, wire_pos: Position) -> Option<TypeHierarchyItem> {
        let sym = self.symbol_at(path, wire_pos, SymbolKind::is_type)?;
        Some(self.type_item(&sym, path))
    }

    /// Supertypes of the item: `extends` and `implements` edges outward.
    pub fn supertypes(&self, item: &TypeHierarchyItem) -> Vec<TypeHierarchyItem> {
        self.expand_types(item, |id, predicate| {
            self.index.relations(id, predicate).into_iter().map(|r| r.object).collect()
        })
    }

    /// Subtypes of the item: the same edges walked inward.
    pub fn subtypes(&self, item: &TypeHierarchyItem) -> Vec<TypeHierarchyItem> {
        self.expand_types(item, |id, predicate| {
            self.index.relations_to(id, predicate).into_iter().map(|r| r.subject).collect()
        })
    }

    fn expand_types(
        &self,
        item: &TypeHierarchyItem,
        neighbors: impl Fn(SymbolId, RelationKind) -> Vec<SymbolId>,
    ) -> Vec<TypeHierarchyItem> {
        if !item.symbol_id.is_valid() {
            return Vec::new();
        }
        let fallback = uri_to_path(&item.uri).unwrap_or_default();
        let mut ids: BTreeSet<SymbolId> = BTreeSet::new();
        ids.extend(neighbors(item.symbol_id, RelationKind::Extends));
        ids.extend(neighbors(item.symbol_id, RelationKind::Implements));
        self.index
            .lookup(&LookupRequest { ids: ids.into_iter().collect() })
            .into_iter()
            .filter(|sym| !sym.location.is_zero())
            .map(|sym| self.type_item(&sym, &fallback))
            .collect()
    }

    // ------------------------------------------------------------------
    // Item construction
    // ------------------------------------------------------------------

    fn declaration_on_disk(&self, path: &str) -> bool {
        self.workspace.get(path).is_some() || std::path::Path::new(path).is_file()
    }

    fn call_item(&self, sym: &Symbol, fallback_path: &str) -> CallHierarchyItem {
        let on_disk = self.declaration_on_disk(&sym.location.file_uri);
        let path = if on_disk { sym.location.file_uri.as_str() } else { fallback_path };
        let file_name = path.rsplit('/').next().unwrap_or(path);
        let name = if sym.signature.starts_with("init(") {
            sym.signature.replacen("init", &sym.return_type, 1)
        } else {
            format!("{}:{}", sym.signature, sym.return_type)
        };
        let mut range = sym.location.range;
        if range.is_zero() && sym.name == "init" {
            if let Some(outer) = self.constructor_owner(sym.id) {
                range = outer.location.range;
            }
        }
        let range = self.to_ide_range(path, range);
        CallHierarchyItem {
            name,
            kind: sym.kind.to_lsp_kind(),
            uri: path_to_uri(path),
            detail: format!("{}.{}", sym.package(), file_name),
            range,
            selection_range: range,
            is_kernel: !on_disk,
            symbol_id: sym.id,
        }
    }

    fn type_item(&self, sym: &Symbol, fallback_path: &str) -> TypeHierarchyItem {
        let on_disk = self.declaration_on_disk(&sym.location.file_uri);
        let path = if on_disk { sym.location.file_uri.as_str() } else { fallback_path };
        let has_edges = !self.index.relations(sym.id, RelationKind::Extends).is_empty()
            || !self.index.relations(sym.id, RelationKind::Implements).is_empty()
            || !self.index.relations_to(sym.id, RelationKind::Extends).is_empty()
            || !self.index.relations_to(sym.id, RelationKind::Implements).is_empty();
        let range = self.to_ide_range(path, sym.location.range);
        TypeHierarchyItem {
            name: sym.name.clone(),
            kind: sym.kind.to_lsp_kind(),
            uri: path_to_uri(path),
            range,
            selection_range: range,
            is_kernel: !on_disk,
            is_child_or_super: has_edges,
            symbol_id: sym.id,
        }
    }

    /// The enclosing type of an anonymous constructor, one `ContainedBy`
    /// step up. The index does not store the fixed-up range; callers ask.
    fn constructor_owner(&self, id: SymbolId) -> Option<Symbol> {
        let outer = self.index.relations(id, RelationKind::ContainedBy).first()?.object;
        self.index.lookup(&LookupRequest { ids: vec![outer] }).pop()
    }

    fn to_ide_range(&self, path: &str, range: Range) -> Range {
        match self.workspace.get(path) {
            Some(file) => Range::new(
                utf8_to_utf16(&file.tokens, range.start),
                utf8_to_utf16(&file.tokens, range.end),
            ),
            None => range,
        }
    }
}
