//! Request and notification handlers.
//!
//! Resolution failures (cursor not on a symbol, file not indexed) return
//! empty-but-well-formed results, never errors; the only errors that leave
//! this module are invalid-params and request-cancelled.

use crate::hierarchy::HierarchyAssembler;
use crate::server::ServerState;
use crate::state::uri_to_path;
use lumen_index::{CancelToken, FileRefsRequest, LookupRequest, RefsRequest};
use lumen_position::{utf8_to_utf16, utf16_to_utf8, Position, Range};
use lumen_protocol::extensions::{
    CrossLanguageJumpParams, ExecuteCommandParams, ExportsNameParams, FileRefactorChangeKind,
    FileRefactorEdit, FileRefactorParams, FileRefactorResponse, OverrideMethodsParams,
    TrackCompletionParams, APPLY_TWEAK_COMMAND,
};
use lumen_protocol::hierarchy::{CallHierarchyRequestParams, TypeHierarchyRequestParams};
use lumen_protocol::params::{
    DidChangeTextDocumentParams, DidChangeWatchedFilesParams, DidCloseTextDocumentParams,
    DidOpenTextDocumentParams, DocumentSymbolParams, FileChangeType, RenameParams,
    TextDocumentPositionParams,
};
use lumen_protocol::replies::{
    CodeLens, Command, DocumentHighlight, DocumentSymbol, ExecutableRange, Hover, Location,
    TextEdit, WorkspaceEdit,
};
use lumen_protocol::{DecodeError, FromJson, JsonRpcError, ToJson};
use lumen_refactoring::{
    path_to_uri, EditKind, FileMovePlanner, FileMoveRequest, PlanOutcome,
};
use lumen_symbols::{Modifier, RefKind, RefKindSet, RelationKind, Symbol, SymbolId, SymbolKind};
use serde_json::{json, Value};
use tracing::{debug, info};

/// URI suffix of synthesized macro-expansion files.
pub const MACRO_CALL_SUFFIX: &str = ".macrocall";

type HandlerResult = Result<Value, JsonRpcError>;

fn invalid(err: DecodeError) -> JsonRpcError {
    JsonRpcError::invalid_params(err.to_string())
}

fn check(token: &CancelToken) -> Result<(), JsonRpcError> {
    if token.is_cancelled() {
        Err(JsonRpcError::cancelled())
    } else {
        Ok(())
    }
}

/// The symbol whose occurrence covers the wire position, together with the
/// resolved file path.
fn resolve_symbol_at(
    state: &ServerState,
    uri: &str,
    wire_pos: Position,
) -> Option<(Symbol, String)> {
    let path = uri_to_path(uri)?;
    let workspace = state.workspace.read();
    let file = workspace.get(&path)?;
    let pos = utf16_to_utf8(&file.tokens, wire_pos);
    let anchored = state.index.file_refs(&FileRefsRequest {
        file_id: file.file_id,
        uri: path.clone(),
        package: file.package_name().to_string(),
        kinds: RefKindSet::ALL,
    });
    let (_, id) = anchored
        .into_iter()
        .filter(|(r, _)| r.location.range.contains(pos))
        .min_by_key(|(r, _)| {
            (r.location.range.end.line - r.location.range.start.line, r.location.range.end.column)
        })?;
    let sym = state.index.lookup(&LookupRequest { ids: vec![id] }).pop()?;
    Some((sym, path))
}

/// The navigable declaration location of a symbol.
///
/// Declarations inside macro-expansion files navigate to the pre-expansion
/// source; zero locations (compiler-synthesized) navigate nowhere.
fn declaration_location(sym: &Symbol) -> Option<(String, Range)> {
    if sym.location.is_zero() && sym.name != "init" {
        return None;
    }
    if sym.location.file_uri.ends_with(MACRO_CALL_SUFFIX)
        && !sym.declaration.file_uri.is_empty()
    {
        return Some((sym.declaration.file_uri.clone(), sym.declaration.range));
    }
    if sym.location.file_uri.is_empty() {
        return None;
    }
    Some((sym.location.file_uri.clone(), sym.location.range))
}

fn to_ide_range(state: &ServerState, path: &str, range: Range) -> Range {
    let workspace = state.workspace.read();
    match workspace.get(path) {
        Some(file) => Range::new(
            utf8_to_utf16(&file.tokens, range.start),
            utf8_to_utf16(&file.tokens, range.end),
        ),
        None => range,
    }
}

fn wire_location(state: &ServerState, path: &str, range: Range) -> Location {
    Location { uri: path_to_uri(path), range: to_ide_range(state, path, range) }
}

// ----------------------------------------------------------------------
// Navigation
// ----------------------------------------------------------------------

/// `textDocument/definition`
pub fn definition(state: &ServerState, params: &Value, token: &CancelToken) -> HandlerResult {
    let params = TextDocumentPositionParams::from_json(params).map_err(invalid)?;
    check(token)?;
    let Some((sym, _)) = resolve_symbol_at(state, &params.text_document.uri, params.position)
    else {
        return Ok(json!([]));
    };
    let Some((path, range)) = declaration_location(&sym) else {
        return Ok(json!([]));
    };
    Ok(json!([wire_location(state, &path, range).to_json()]))
}

/// `textDocument/references`
pub fn references(state: &ServerState, params: &Value, token: &CancelToken) -> HandlerResult {
    let params = TextDocumentPositionParams::from_json(params).map_err(invalid)?;
    check(token)?;
    let Some((sym, _)) = resolve_symbol_at(state, &params.text_document.uri, params.position)
    else {
        return Ok(json!([]));
    };
    let refs = state.index.refs(&RefsRequest {
        ids: vec![sym.id],
        kinds: RefKind::Reference | RefKind::Definition,
    });
    check(token)?;
    let mut locations: Vec<Value> = Vec::new();
    let mut seen = std::collections::BTreeSet::new();
    for r in refs {
        if r.location.is_zero() {
            continue;
        }
        if seen.insert((r.location.file_uri.clone(), r.location.range)) {
            locations
                .push(wire_location(state, &r.location.file_uri, r.location.range).to_json());
        }
    }
    Ok(Value::Array(locations))
}

/// `textDocument/documentHighlight`
pub fn document_highlight(
    state: &ServerState,
    params: &Value,
    token: &CancelToken,
) -> HandlerResult {
    let params = TextDocumentPositionParams::from_json(params).map_err(invalid)?;
    check(token)?;
    let Some((sym, path)) = resolve_symbol_at(state, &params.text_document.uri, params.position)
    else {
        return Ok(json!([]));
    };
    let refs = state.index.refs(&RefsRequest { ids: vec![sym.id], kinds: RefKindSet::ALL });
    let mut highlights = std::collections::BTreeSet::new();
    for r in refs {
        if r.location.file_uri == path && !r.location.is_zero() {
            highlights.insert(to_ide_range(state, &path, r.location.range));
        }
    }
    Ok(Value::Array(
        highlights
            .into_iter()
            .map(|range| DocumentHighlight { range, ..DocumentHighlight::default() }.to_json())
            .collect(),
    ))
}

/// `textDocument/hover`
pub fn hover(state: &ServerState, params: &Value, token: &CancelToken) -> HandlerResult {
    let params = TextDocumentPositionParams::from_json(params).map_err(invalid)?;
    check(token)?;
    let Some((sym, path)) = resolve_symbol_at(state, &params.text_document.uri, params.position)
    else {
        return Ok(Value::Null);
    };
    if sym.signature.is_empty() && sym.return_type.is_empty() {
        return Ok(Value::Null);
    }
    let mut contents = Vec::new();
    if !sym.signature.is_empty() {
        contents.push(format!("{} : {}", sym.signature, sym.return_type));
    } else {
        contents.push(sym.name.clone());
    }
    contents.push(format!("package {}", sym.package()));
    let range = to_ide_range(state, &path, sym.location.range);
    Ok(Hover { range, contents }.to_json())
}

/// `textDocument/rename`
///
/// Renaming one override renames the whole chain, imports included.
pub fn rename(state: &ServerState, params: &Value, token: &CancelToken) -> HandlerResult {
    let params = RenameParams::from_json(params).map_err(invalid)?;
    check(token)?;
    let Some((sym, _)) = resolve_symbol_at(
        state,
        &params.position_params.text_document.uri,
        params.position_params.position,
    ) else {
        return Ok(Value::Null);
    };
    let (ups, top) = state.index.find_ridden_up(sym.id);
    let mut ids: std::collections::BTreeSet<SymbolId> = ups.into_iter().collect();
    ids.extend(state.index.find_ridden_down(top));
    ids.insert(sym.id);
    ids.insert(top);
    check(token)?;
    let refs = state.index.refs(&RefsRequest {
        ids: ids.into_iter().collect(),
        kinds: RefKind::Reference | RefKind::Definition | RefKind::Import,
    });
    let mut edit = WorkspaceEdit::default();
    let mut seen = std::collections::BTreeSet::new();
    for r in refs {
        if r.location.is_zero() {
            continue;
        }
        if !seen.insert((r.location.file_uri.clone(), r.location.range)) {
            continue;
        }
        let range = to_ide_range(state, &r.location.file_uri, r.location.range);
        edit.changes
            .entry(path_to_uri(&r.location.file_uri))
            .or_default()
            .push(TextEdit { range, new_text: params.new_name.clone() });
    }
    check(token)?;
    for edits in edit.changes.values_mut() {
        edits.sort_by_key(|e| e.range);
    }
    Ok(edit.to_json())
}

/// `textDocument/prepareRename`
pub fn prepare_rename(state: &ServerState, params: &Value, token: &CancelToken) -> HandlerResult {
    let params = TextDocumentPositionParams::from_json(params).map_err(invalid)?;
    check(token)?;
    let Some((sym, path)) = resolve_symbol_at(state, &params.text_document.uri, params.position)
    else {
        return Ok(Value::Null);
    };
    if sym.location.is_zero() {
        return Ok(Value::Null);
    }
    Ok(lumen_protocol::codec::range_json(to_ide_range(state, &path, sym.location.range)))
}

/// `textDocument/documentSymbol`
pub fn document_symbol(state: &ServerState, params: &Value, token: &CancelToken) -> HandlerResult {
    let params = DocumentSymbolParams::from_json(params).map_err(invalid)?;
    check(token)?;
    let Some(path) = uri_to_path(&params.text_document.uri) else {
        return Ok(json!([]));
    };
    let workspace = state.workspace.read();
    let Some(file) = workspace.get(&path) else {
        return Ok(json!([]));
    };
    drop(workspace);
    let defined = state.index.file_refs(&FileRefsRequest {
        file_id: file.file_id,
        uri: path.clone(),
        package: file.package_name().to_string(),
        kinds: RefKind::Definition.into(),
    });
    let mut ids: Vec<SymbolId> = defined.into_iter().map(|(_, id)| id).collect();
    ids.sort();
    ids.dedup();
    let mut symbols = Vec::new();
    for sym in state.index.lookup(&LookupRequest { ids }) {
        if sym.location.is_zero() {
            continue;
        }
        let range = to_ide_range(state, &path, sym.location.range);
        symbols.push(
            DocumentSymbol {
                name: sym.name.clone(),
                detail: sym.signature.clone(),
                kind: sym.kind.to_lsp_kind(),
                range,
                selection_range: range,
                children: vec![],
            }
            .to_json(),
        );
    }
    Ok(Value::Array(symbols))
}

/// `textDocument/codeLens`: one runnable lens per `main` entry point.
pub fn code_lens(state: &ServerState, params: &Value, token: &CancelToken) -> HandlerResult {
    let params = DocumentSymbolParams::from_json(params).map_err(invalid)?;
    check(token)?;
    let Some(path) = uri_to_path(&params.text_document.uri) else {
        return Ok(json!([]));
    };
    let workspace = state.workspace.read();
    let Some(file) = workspace.get(&path) else {
        return Ok(json!([]));
    };
    drop(workspace);
    let defined = state.index.file_refs(&FileRefsRequest {
        file_id: file.file_id,
        uri: path.clone(),
        package: file.package_name().to_string(),
        kinds: RefKind::Definition.into(),
    });
    let ids: Vec<SymbolId> = defined.into_iter().map(|(_, id)| id).collect();
    let mut lenses = Vec::new();
    for sym in state.index.lookup(&LookupRequest { ids }) {
        if sym.kind != SymbolKind::Function || sym.name != "main" || sym.location.is_zero() {
            continue;
        }
        let range = to_ide_range(state, &path, sym.location.range);
        let mut executable = ExecutableRange {
            uri: path_to_uri(&path),
            package_name: sym.package().to_string(),
            function_name: sym.name.clone(),
            range,
            tweak_id: "runTarget".to_string(),
            ..ExecutableRange::default()
        };
        executable
            .extra_options
            .insert("entry".to_string(), format!("{}.{}", sym.package(), sym.name));
        lenses.push(
            CodeLens {
                range,
                command: Command {
                    title: "Run".to_string(),
                    command: APPLY_TWEAK_COMMAND.to_string(),
                    arguments: vec![executable],
                },
            }
            .to_json(),
        );
    }
    Ok(Value::Array(lenses))
}

// ----------------------------------------------------------------------
// Hierarchies
// ----------------------------------------------------------------------

/// `textDocument/prepareCallHierarchy`
pub fn prepare_call_hierarchy(
    state: &ServerState,
    params: &Value,
    token: &CancelToken,
) -> HandlerResult {
    let params = TextDocumentPositionParams::from_json(params).map_err(invalid)?;
    check(token)?;
    let Some(path) = uri_to_path(&params.text_document.uri) else {
        return Ok(json!([]));
    };
    let workspace = state.workspace.read();
    let assembler = HierarchyAssembler::new(&state.index, &workspace);
    match assembler.prepare_call(&path, params.position) {
        Some(item) => Ok(json!([item.to_json()])),
        None => Ok(json!([])),
    }
}

/// `callHierarchy/incomingCalls`
pub fn incoming_calls(state: &ServerState, params: &Value, token: &CancelToken) -> HandlerResult {
    let params = CallHierarchyRequestParams::from_json(params).map_err(invalid)?;
    check(token)?;
    let workspace = state.workspace.read();
    let assembler = HierarchyAssembler::new(&state.index, &workspace);
    let calls = assembler.incoming(&params.item);
    check(token)?;
    Ok(Value::Array(calls.iter().map(ToJson::to_json).collect()))
}

/// `callHierarchy/outgoingCalls`
pub fn outgoing_calls(state: &ServerState, params: &Value, token: &CancelToken) -> HandlerResult {
    let params = CallHierarchyRequestParams::from_json(params).map_err(invalid)?;
    check(token)?;
    let workspace = state.workspace.read();
    let assembler = HierarchyAssembler::new(&state.index, &workspace);
    let calls = assembler.outgoing(&params.item);
    check(token)?;
    Ok(Value::Array(calls.iter().map(ToJson::to_json).collect()))
}

/// `textDocument/prepareTypeHierarchy`
pub fn prepare_type_hierarchy(
    state: &ServerState,
    params: &Value,
    token: &CancelToken,
) -> HandlerResult {
    let params = TextDocumentPositionParams::from_json(params).map_err(invalid)?;
    check(token)?;
    let Some(path) = uri_to_path(&params.text_document.uri) else {
        return Ok(json!([]));
    };
    let workspace = state.workspace.read();
    let assembler = HierarchyAssembler::new(&state.index, &workspace);
    match assembler.prepare_type(&path, params.position) {
        Some(item) => Ok(json!([item.to_json()])),
        None => Ok(json!([])),
    }
}

/// `typeHierarchy/supertypes`
pub fn supertypes(state: &ServerState, params: &Value, token: &CancelToken) -> HandlerResult {
    let params = TypeHierarchyRequestParams::from_json(params).map_err(invalid)?;
    check(token)?;
    let workspace = state.workspace.read();
    let assembler = HierarchyAssembler::new(&state.index, &workspace);
    Ok(Value::Array(assembler.supertypes(&params.item).iter().map(ToJson::to_json).collect()))
}

/// `typeHierarchy/subtypes`
pub fn subtypes(state: &ServerState, params: &Value, token: &CancelToken) -> HandlerResult {
    let params = TypeHierarchyRequestParams::from_json(params).map_err(invalid)?;
    check(token)?;
    let workspace = state.workspace.read();
    let assembler = HierarchyAssembler::new(&state.index, &workspace);
    Ok(Value::Array(assembler.subtypes(&params.item).iter().map(ToJson::to_json).collect()))
}

// ----------------------------------------------------------------------
// Dialect extensions
// ----------------------------------------------------------------------

/// `lumen/fileRefactor`
pub fn file_refactor(state: &ServerState, params: &Value, token: &CancelToken) -> HandlerResult {
    let params = FileRefactorParams::from_json(params).map_err(invalid)?;
    check(token)?;
    let (Some(file), Some(target), Some(selected)) = (
        uri_to_path(&params.file.uri),
        uri_to_path(&params.target_path.uri),
        uri_to_path(&params.selected_element.uri),
    ) else {
        return Ok(FileRefactorResponse::default().to_json());
    };
    let request =
        FileMoveRequest { file, selected_element: selected, target_dir: target };

    let outcome = {
        // planning holds the workspace read guard; text sync waits
        let workspace = state.workspace.read();
        let mut planner = FileMovePlanner::new(&*workspace, &state.index, token.clone());
        planner.plan(&request)
    };
    match outcome {
        PlanOutcome::Edits(batch) => {
            let mut response = FileRefactorResponse::default();
            for (uri, edits) in batch.iter() {
                let path = uri_to_path(uri).unwrap_or_else(|| uri.to_string());
                let wire_edits: Vec<FileRefactorEdit> = edits
                    .iter()
                    .map(|edit| FileRefactorEdit {
                        kind: match edit.kind {
                            EditKind::Add => FileRefactorChangeKind::Add,
                            EditKind::Changed => FileRefactorChangeKind::Changed,
                            EditKind::Deleted => FileRefactorChangeKind::Deleted,
                        },
                        range: to_ide_range(state, &path, edit.range),
                        content: edit.content.clone(),
                    })
                    .collect();
                response.changes.insert(uri.to_string(), wire_edits);
            }
            Ok(response.to_json())
        }
        PlanOutcome::Refused(reason) => {
            info!(?reason, "file refactor refused");
            Ok(FileRefactorResponse::default().to_json())
        }
        PlanOutcome::Cancelled => Err(JsonRpcError::cancelled()),
    }
}

/// `lumen/crossLanguageJump`
pub fn cross_language_jump(
    state: &ServerState,
    params: &Value,
    token: &CancelToken,
) -> HandlerResult {
    let params = CrossLanguageJumpParams::from_json(params).map_err(invalid)?;
    check(token)?;
    let symbols = state
        .index
        .package_symbols(&lumen_index::PkgSymsRequest { package: params.package_name.clone() });
    let target = symbols.into_iter().find(|sym| {
        sym.name == params.name
            && (params.outer_name.is_empty() || sym.enclosing_name() == params.outer_name)
    });
    match target.and_then(|sym| declaration_location(&sym)) {
        Some((path, range)) => Ok(wire_location(state, &path, range).to_json()),
        None => Ok(Value::Null),
    }
}

/// `lumen/exportsName`
pub fn exports_name(state: &ServerState, params: &Value, token: &CancelToken) -> HandlerResult {
    let params = ExportsNameParams::from_json(params).map_err(invalid)?;
    check(token)?;
    let symbols = state
        .index
        .package_symbols(&lumen_index::PkgSymsRequest { package: params.package_name.clone() });
    let mut names: Vec<String> = symbols
        .into_iter()
        .filter(|sym| sym.modifier == Modifier::Public && !sym.location.is_zero())
        .map(|sym| sym.name)
        .collect();
    names.sort();
    names.dedup();
    Ok(json!(names))
}

/// `lumen/overrideMethods`
pub fn override_methods(state: &ServerState, params: &Value, token: &CancelToken) -> HandlerResult {
    let params = OverrideMethodsParams::from_json(params).map_err(invalid)?;
    check(token)?;
    let Some((sym, _)) = resolve_symbol_at(
        state,
        &params.position_params.text_document.uri,
        params.position_params.position,
    ) else {
        return Ok(json!([]));
    };
    if !sym.kind.is_type() && !(params.is_extend && sym.kind == SymbolKind::Extend) {
        return Ok(json!([]));
    }
    // methods of direct supertypes that the type has not overridden yet
    let mut own: std::collections::BTreeSet<String> = std::collections::BTreeSet::new();
    for member in state.index.relations_to(sym.id, RelationKind::ContainedBy) {
        if let Some(member_sym) =
            state.index.lookup(&LookupRequest { ids: vec![member.subject] }).pop()
        {
            own.insert(member_sym.signature);
        }
    }
    check(token)?;
    let mut supers: Vec<SymbolId> = state
        .index
        .relations(sym.id, RelationKind::Extends)
        .into_iter()
        .chain(state.index.relations(sym.id, RelationKind::Implements))
        .map(|r| r.object)
        .collect();
    supers.sort();
    supers.dedup();
    let mut candidates = Vec::new();
    for super_id in supers {
        for member in state.index.relations_to(super_id, RelationKind::ContainedBy) {
            let Some(member_sym) =
                state.index.lookup(&LookupRequest { ids: vec![member.subject] }).pop()
            else {
                continue;
            };
            if !member_sym.kind.is_callable() || own.contains(&member_sym.signature) {
                continue;
            }
            candidates.push(json!({
                "name": member_sym.name,
                "signature": member_sym.signature,
                "returnType": member_sym.return_type,
            }));
        }
    }
    Ok(Value::Array(candidates))
}

/// `workspace/executeCommand`
///
/// Computing tweak edits is the refactor engine's job; executing anything
/// beyond returning the acknowledgement is out of scope here.
pub fn execute_command(_state: &ServerState, params: &Value, token: &CancelToken) -> HandlerResult {
    let params = ExecuteCommandParams::from_json(params).map_err(invalid)?;
    check(token)?;
    if params.command != APPLY_TWEAK_COMMAND {
        debug!(command = %params.command, "unknown command");
    }
    Ok(Value::Null)
}

// ----------------------------------------------------------------------
// Notifications
// ----------------------------------------------------------------------

/// `textDocument/didOpen`
pub fn did_open(state: &ServerState, params: &Value) {
    let Ok(params) = DidOpenTextDocumentParams::from_json(params) else {
        return;
    };
    let doc = params.text_document;
    state.documents.write().open(&doc.uri, doc.text.clone(), doc.version);
    let Some(path) = uri_to_path(&doc.uri) else {
        return;
    };
    let file = state.workspace.write().upsert_source(&path, &doc.text);
    // a re-opened document starts a fresh version line
    state.index.remove_file(&path);
    state.ingest_header(&path, &file, doc.version);
}

/// `textDocument/didChange`, applied in receipt order; a version gap is
/// rejected and the previous snapshot stays visible.
pub fn did_change(state: &ServerState, params: &Value) {
    let Ok(params) = DidChangeTextDocumentParams::from_json(params) else {
        return;
    };
    let text = {
        let mut documents = state.documents.write();
        match documents.change(&params.uri, params.version, &params.content_changes) {
            Ok(doc) => doc.text.clone(),
            Err(err) => {
                info!(uri = %params.uri, ?err, "rejected document update");
                return;
            }
        }
    };
    let Some(path) = uri_to_path(&params.uri) else {
        return;
    };
    let file = state.workspace.write().upsert_source(&path, &text);
    state.ingest_header(&path, &file, params.version);
}

/// `textDocument/didClose`
pub fn did_close(state: &ServerState, params: &Value) {
    let Ok(params) = DidCloseTextDocumentParams::from_json(params) else {
        return;
    };
    state.documents.write().close(&params.text_document.uri);
}

/// `workspace/didChangeWatchedFiles`
pub fn did_change_watched_files(state: &ServerState, params: &Value) {
    let Ok(params) = DidChangeWatchedFilesParams::from_json(params) else {
        return;
    };
    for event in params.changes {
        let Some(path) = uri_to_path(&event.uri) else {
            continue;
        };
        match event.change_type {
            FileChangeType::Deleted => {
                state.workspace.write().remove(&path);
                state.index.remove_file(&path);
            }
            FileChangeType::Created | FileChangeType::Changed => {
                if let Ok(text) = std::fs::read_to_string(&path) {
                    let next = state.index.file_version(&path).map(|v| v + 1).unwrap_or(1);
                    let file = state.workspace.write().upsert_source(&path, &text);
                    state.ingest_header(&path, &file, next);
                }
            }
        }
    }
}

/// `lumen/trackCompletion`
pub fn track_completion(_state: &ServerState, params: &Value) {
    if let Ok(params) = TrackCompletionParams::from_json(params) {
        debug!(label = %params.label, "completion accepted");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_index::FileSymbols;
    use lumen_symbols::{Location, Ref};
    use pretty_assertions::assert_eq;

    fn line_range(line: i32, start: i32, end: i32) -> Range {
        Range::new(Position::new(line, start), Position::new(line, end))
    }

    fn state_with_symbol() -> ServerState {
        let state = ServerState::new();
        let path = "/w/a/b/one.lm";
        did_open(
            &state,
            &json!({"textDocument": {
                "uri": "file:///w/a/b/one.lm",
                "languageId": "Lumen",
                "version": 1,
                "text": "package a.b\nfunc greet() {}\n"
            }}),
        );
        let file_id = state.workspace.read().get(path).map(|f| f.file_id).unwrap_or(0);
        state
            .index
            .apply(FileSymbols {
                file_id,
                uri: path.to_string(),
                package: "a.b".to_string(),
                version: 2,
                symbols: vec![Symbol {
                    id: SymbolId(7),
                    name: "greet".to_string(),
                    signature: "greet()".to_string(),
                    return_type: "Unit".to_string(),
                    kind: SymbolKind::Function,
                    modifier: Modifier::Public,
                    scope: "a.b".to_string(),
                    location: Location::new(path, line_range(1, 5, 10)),
                    ..Symbol::default()
                }],
                refs: vec![(
                    SymbolId(7),
                    Ref {
                        location: Location::new(path, line_range(1, 5, 10)),
                        container: SymbolId::INVALID,
                        kind: RefKind::Definition,
                    },
                )],
                relations: vec![],
                calls: vec![],
            })
            .expect("ingest");
        state
    }

    fn position_params(line: i32, character: i32) -> Value {
        json!({
            "textDocument": {"uri": "file:///w/a/b/one.lm"},
            "position": {"line": line, "character": character}
        })
    }

    #[test]
    fn test_definition_resolves_through_the_index() {
        let state = state_with_symbol();
        let token = CancelToken::new();
        let result = definition(&state, &position_params(1, 6), &token).expect("handler");
        assert_eq!(
            result,
            json!([{
                "uri": "file:///w/a/b/one.lm",
                "range": {"start": {"line": 1, "character": 5},
                           "end": {"line": 1, "character": 10}}
            }])
        );
    }

    #[test]
    fn test_definition_off_symbol_is_empty_not_error() {
        let state = state_with_symbol();
        let token = CancelToken::new();
        let result = definition(&state, &position_params(9, 0), &token).expect("handler");
        assert_eq!(result, json!([]));
    }

    #[test]
    fn test_definition_invalid_params() {
        let state = state_with_symbol();
        let token = CancelToken::new();
        let err = definition(&state, &json!({"textDocument": {}}), &token)
            .expect_err("missing uri must fail");
        assert_eq!(err.code, lumen_protocol::error_codes::INVALID_PARAMS);
    }

    #[test]
    fn test_cancelled_request_reports_cancellation() {
        let state = state_with_symbol();
        let token = CancelToken::new();
        token.cancel();
        let err = definition(&state, &position_params(1, 6), &token).expect_err("cancelled");
        assert_eq!(err.code, lumen_protocol::error_codes::REQUEST_CANCELLED);
    }

    #[test]
    fn test_rename_covers_definition_and_references() {
        let state = state_with_symbol();
        // a reference from another open file
        did_open(
            &state,
            &json!({"textDocument": {
                "uri": "file:///w/a/b/use.lm",
                "languageId": "Lumen",
                "version": 1,
                "text": "package a.b\n// greet()\n"
            }}),
        );
        state
            .index
            .apply(FileSymbols {
                file_id: 2,
                uri: "/w/a/b/use.lm".to_string(),
                package: "a.b".to_string(),
                version: 2,
                symbols: vec![],
                refs: vec![(
                    SymbolId(7),
                    Ref {
                        location: Location::new("/w/a/b/use.lm", line_range(1, 3, 8)),
                        container: SymbolId::INVALID,
                        kind: RefKind::Reference,
                    },
                )],
                relations: vec![],
                calls: vec![],
            })
            .expect("ingest");

        let token = CancelToken::new();
        let params = json!({
            "textDocument": {"uri": "file:///w/a/b/one.lm"},
            "position": {"line": 1, "character": 6},
            "newName": "salute"
        });
        let result = rename(&state, &params, &token).expect("handler");
        let changes = result["changes"].as_object().expect("changes map");
        assert_eq!(changes.len(), 2);
        assert_eq!(changes["file:///w/a/b/use.lm"][0]["newText"], json!("salute"));
    }

    #[test]
    fn test_stale_did_change_keeps_previous_text() {
        let state = state_with_symbol();
        did_change(
            &state,
            &json!({
                "textDocument": {"uri": "file:///w/a/b/one.lm", "version": 9},
                "contentChanges": [{"text": "package a.b\n"}]
            }),
        );
        let documents = state.documents.read();
        let doc = documents.get("file:///w/a/b/one.lm").expect("doc");
        assert_eq!(doc.version, 1);
        assert!(doc.text.contains("greet"));
    }

    #[test]
    fn test_exports_name_lists_public_symbols() {
        let state = state_with_symbol();
        let token = CancelToken::new();
        let result = exports_name(
            &state,
            &json!({
                "textDocument": {"uri": "file:///w/a/b/one.lm"},
                "position": {"line": 0, "character": 0},
                "packageName": "a.b"
            }),
            &token,
        )
        .expect("handler");
        assert_eq!(result, json!(["greet"]));
    }

    #[test]
    fn test_code_lens_marks_main() {
        let state = state_with_symbol();
        let path = "/w/a/b/main.lm";
        did_open(
            &state,
            &json!({"textDocument": {
                "uri": "file:///w/a/b/main.lm",
                "languageId": "Lumen",
                "version": 1,
                "text": "package a.b\nfunc main() {}\n"
            }}),
        );
        let file_id = state.workspace.read().get(path).map(|f| f.file_id).unwrap_or(0);
        state
            .index
            .apply(FileSymbols {
                file_id,
                uri: path.to_string(),
                package: "a.b".to_string(),
                version: 2,
                symbols: vec![Symbol {
                    id: SymbolId(8),
                    name: "main".to_string(),
                    signature: "main()".to_string(),
                    kind: SymbolKind::Function,
                    scope: "a.b".to_string(),
                    location: Location::new(path, line_range(1, 5, 9)),
                    ..Symbol::default()
                }],
                refs: vec![(
                    SymbolId(8),
                    Ref {
                        location: Location::new(path, line_range(1, 5, 9)),
                        container: SymbolId::INVALID,
                        kind: RefKind::Definition,
                    },
                )],
                relations: vec![],
                calls: vec![],
            })
            .expect("ingest");

        let token = CancelToken::new();
        let result = code_lens(
            &state,
            &json!({"textDocument": {"uri": "file:///w/a/b/main.lm"}}),
            &token,
        )
        .expect("handler");
        let lenses = result.as_array().expect("array");
        assert_eq!(lenses.len(), 1);
        assert_eq!(lenses[0]["command"]["command"], json!("lumenLsp.applyTweak"));
        assert_eq!(lenses[0]["command"]["arguments"][0]["tweakId"], json!("runTarget"));
    }
}
