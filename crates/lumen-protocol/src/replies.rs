//! Response-side wire records, plus the code-action family that flows both
//! ways.

use crate::codec::{
    array_json, decode_range, field, i32_or, range_json, require, require_object, str_or,
    DecodeError, FromJson, ToJson,
};
use crate::params::TextDocumentIdentifier;
use lumen_position::{Position, Range};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

/// A file URI plus range, the payload of every navigation answer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    /// Target file.
    pub uri: String,
    /// Target range.
    pub range: Range,
}

impl ToJson for Location {
    fn to_json(&self) -> Value {
        json!({"uri": self.uri, "range": range_json(self.range)})
    }
}

/// A single text replacement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextEdit {
    /// Replaced range.
    pub range: Range,
    /// Replacement text.
    pub new_text: String,
}

impl ToJson for TextEdit {
    fn to_json(&self) -> Value {
        json!({"range": range_json(self.range), "newText": self.new_text})
    }
}

/// Edits grouped per file, the rename/code-action result shape.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkspaceEdit {
    /// Per-URI edit lists.
    pub changes: BTreeMap<String, Vec<TextEdit>>,
}

impl ToJson for WorkspaceEdit {
    fn to_json(&self) -> Value {
        let mut changes = Map::new();
        for (uri, edits) in &self.changes {
            changes.insert(uri.clone(), array_json(edits, ToJson::to_json));
        }
        json!({"changes": Value::Object(changes)})
    }
}

/// Versioned edits for one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextDocumentEdit {
    /// Target document URI.
    pub uri: String,
    /// Document version the edits apply to.
    pub version: i64,
    /// The edits.
    pub edits: Vec<TextEdit>,
}

impl ToJson for TextDocumentEdit {
    fn to_json(&self) -> Value {
        json!({
            "textDocument": {"uri": self.uri, "version": self.version},
            "edits": array_json(&self.edits, ToJson::to_json),
        })
    }
}

/// `workspace/applyEdit` request payload (server to client).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyWorkspaceEditParams {
    /// The edit to apply.
    pub edit: WorkspaceEdit,
}

impl ToJson for ApplyWorkspaceEditParams {
    fn to_json(&self) -> Value {
        let mut obj = Map::new();
        if !self.edit.changes.is_empty() {
            obj.insert("edit".to_string(), self.edit.to_json());
        }
        Value::Object(obj)
    }
}

/// Additional location attached to a diagnostic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiagnosticRelatedInformation {
    /// Where the related information points.
    pub location: Location,
    /// Explanation.
    pub message: String,
}

impl FromJson for DiagnosticRelatedInformation {
    fn from_json(value: &Value) -> Result<Self, DecodeError> {
        let location = require_object(value, "location")?;
        Ok(Self {
            location: Location {
                uri: str_or(location, "uri", ""),
                range: decode_range(require_object(location, "range")?)?,
            },
            message: str_or(value, "message", ""),
        })
    }
}

impl ToJson for DiagnosticRelatedInformation {
    fn to_json(&self) -> Value {
        json!({"location": self.location.to_json(), "message": self.message})
    }
}

/// One diagnostic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostic {
    /// Marked range.
    pub range: Range,
    /// LSP severity number; `-1` when the producer left it unset.
    pub severity: i32,
    /// Tool-specific code.
    pub code: i32,
    /// Producing tool.
    pub source: String,
    /// Message text.
    pub message: String,
    /// LSP diagnostic tags.
    pub tags: Vec<i32>,
    /// Related locations.
    pub related_information: Vec<DiagnosticRelatedInformation>,
}

impl FromJson for Diagnostic {
    fn from_json(value: &Value) -> Result<Self, DecodeError> {
        let range = decode_range(require_object(value, "range")?)?;
        let mut related_information = Vec::new();
        if let Some(related) = field(value, "relatedInformation").and_then(Value::as_array) {
            for item in related {
                related_information.push(DiagnosticRelatedInformation::from_json(item)?);
            }
        }
        Ok(Self {
            range,
            severity: i32_or(value, "severity", -1),
            code: i32_or(value, "code", -1),
            source: str_or(value, "source", ""),
            message: str_or(value, "message", ""),
            tags: field(value, "tags")
                .and_then(Value::as_array)
                .map(|tags| tags.iter().filter_map(Value::as_i64).map(|t| t as i32).collect())
                .unwrap_or_default(),
            related_information,
        })
    }
}

impl ToJson for Diagnostic {
    fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("range".to_string(), range_json(self.range));
        obj.insert("severity".to_string(), Value::from(self.severity));
        obj.insert("code".to_string(), Value::from(self.code));
        obj.insert("source".to_string(), Value::from(self.source.clone()));
        obj.insert("message".to_string(), Value::from(self.message.clone()));
        if !self.tags.is_empty() {
            obj.insert(
                "tags".to_string(),
                Value::Array(self.tags.iter().map(|t| Value::from(*t)).collect()),
            );
        }
        if !self.related_information.is_empty() {
            obj.insert(
                "relatedInformation".to_string(),
                array_json(&self.related_information, ToJson::to_json),
            );
        }
        Value::Object(obj)
    }
}

/// `textDocument/publishDiagnostics` payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishDiagnosticsParams {
    /// The file the diagnostics belong to.
    pub uri: String,
    /// Current diagnostics; an empty list clears the file.
    pub diagnostics: Vec<Diagnostic>,
    /// Document version, when the client supports versioned diagnostics.
    pub version: Option<i64>,
}

impl ToJson for PublishDiagnosticsParams {
    fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("uri".to_string(), Value::from(self.uri.clone()));
        // always an array: clients treat null and [] differently
        obj.insert("diagnostics".to_string(), array_json(&self.diagnostics, ToJson::to_json));
        if let Some(version) = self.version {
            obj.insert("version".to_string(), Value::from(version));
        }
        Value::Object(obj)
    }
}

/// Hover answer: marked strings over a range.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Hover {
    /// Hovered range.
    pub range: Range,
    /// Rendered content lines.
    pub contents: Vec<String>,
}

impl ToJson for Hover {
    fn to_json(&self) -> Value {
        json!({
            "range": range_json(self.range),
            "contents": Value::Array(self.contents.iter().map(|c| Value::from(c.clone())).collect()),
        })
    }
}

/// Highlight kinds of `textDocument/documentHighlight`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DocumentHighlightKind {
    /// Plain textual occurrence.
    #[default]
    Text,
    /// Read access.
    Read,
    /// Write access.
    Write,
}

impl DocumentHighlightKind {
    const fn to_wire(self) -> i32 {
        match self {
            DocumentHighlightKind::Text => 1,
            DocumentHighlightKind::Read => 2,
            DocumentHighlightKind::Write => 3,
        }
    }
}

/// One document highlight.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentHighlight {
    /// Highlighted range.
    pub range: Range,
    /// Access classification.
    pub kind: DocumentHighlightKind,
}

impl ToJson for DocumentHighlight {
    fn to_json(&self) -> Value {
        json!({"range": range_json(self.range), "kind": self.kind.to_wire()})
    }
}

/// One node of a `textDocument/documentSymbol` answer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentSymbol {
    /// Symbol name.
    pub name: String,
    /// Extra detail (signature, type).
    pub detail: String,
    /// LSP symbol-kind number.
    pub kind: i32,
    /// Full declaration range.
    pub range: Range,
    /// Name range.
    pub selection_range: Range,
    /// Nested symbols.
    pub children: Vec<DocumentSymbol>,
}

impl ToJson for DocumentSymbol {
    fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("name".to_string(), Value::from(self.name.clone()));
        obj.insert("detail".to_string(), Value::from(self.detail.clone()));
        obj.insert("kind".to_string(), Value::from(self.kind));
        obj.insert("range".to_string(), range_json(self.range));
        obj.insert("selectionRange".to_string(), range_json(self.selection_range));
        if !self.children.is_empty() {
            obj.insert("children".to_string(), array_json(&self.children, ToJson::to_json));
        }
        Value::Object(obj)
    }
}

/// One completion item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionItem {
    /// Label shown in the list.
    pub label: String,
    /// LSP completion-item-kind number.
    pub kind: i32,
    /// Extra detail.
    pub detail: String,
    /// Text inserted on accept.
    pub insert_text: String,
    /// Sort key.
    pub sort_text: String,
    /// Import fixes and similar extra edits.
    pub additional_text_edits: Vec<TextEdit>,
}

impl ToJson for CompletionItem {
    fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("label".to_string(), Value::from(self.label.clone()));
        obj.insert("kind".to_string(), Value::from(self.kind));
        obj.insert("detail".to_string(), Value::from(self.detail.clone()));
        obj.insert("insertText".to_string(), Value::from(self.insert_text.clone()));
        obj.insert("sortText".to_string(), Value::from(self.sort_text.clone()));
        if !self.additional_text_edits.is_empty() {
            obj.insert(
                "additionalTextEdits".to_string(),
                array_json(&self.additional_text_edits, ToJson::to_json),
            );
        }
        Value::Object(obj)
    }
}

/// One signature of a signature-help answer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignatureInformation {
    /// Printed signature.
    pub label: String,
    /// Parameter labels.
    pub parameters: Vec<String>,
}

/// `textDocument/signatureHelp` answer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignatureHelp {
    /// Candidate signatures.
    pub signatures: Vec<SignatureInformation>,
    /// Index of the active signature.
    pub active_signature: i32,
    /// Index of the active parameter.
    pub active_parameter: i32,
}

impl ToJson for SignatureHelp {
    fn to_json(&self) -> Value {
        json!({
            "signatures": array_json(&self.signatures, |sig| {
                json!({
                    "label": sig.label,
                    "parameters": Value::Array(
                        sig.parameters.iter().map(|p| json!({"label": p})).collect(),
                    ),
                })
            }),
            "activeSignature": self.active_signature,
            "activeParameter": self.active_parameter,
        })
    }
}

/// Breakpoint-position answer used by the debug adapter bridge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BreakpointLocation {
    /// Target file.
    pub uri: String,
    /// Breakable range.
    pub range: Range,
}

impl ToJson for BreakpointLocation {
    fn to_json(&self) -> Value {
        json!({"uri": self.uri, "range": range_json(self.range)})
    }
}

/// Wait notice shown while a slow completion computes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionTip {
    /// The file the tip is for.
    pub uri: String,
    /// Anchor position; absent when the tip is file-wide.
    pub position: Position,
    /// Tip text.
    pub tip: String,
}

impl ToJson for CompletionTip {
    fn to_json(&self) -> Value {
        json!({
            "uri": self.uri,
            "position": {"line": self.position.line, "character": self.position.column},
            "tip": self.tip,
        })
    }
}

/// An invocable range carried by a code lens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutableRange {
    /// Target file.
    pub uri: String,
    /// Project the target belongs to.
    pub project_name: String,
    /// Package the target belongs to.
    pub package_name: String,
    /// Enclosing class, when any.
    pub class_name: String,
    /// Invocable function.
    pub function_name: String,
    /// The invocable range.
    pub range: Range,
    /// Refactor tweak addressed by this range, when any.
    pub tweak_id: String,
    /// Free-form string options forwarded to the tweak.
    pub extra_options: BTreeMap<String, String>,
}

impl ToJson for ExecutableRange {
    fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("uri".to_string(), Value::from(self.uri.clone()));
        obj.insert("projectName".to_string(), Value::from(self.project_name.clone()));
        obj.insert("packageName".to_string(), Value::from(self.package_name.clone()));
        obj.insert("className".to_string(), Value::from(self.class_name.clone()));
        obj.insert("functionName".to_string(), Value::from(self.function_name.clone()));
        obj.insert("range".to_string(), range_json(self.range));
        if !self.tweak_id.is_empty() {
            obj.insert("tweakId".to_string(), Value::from(self.tweak_id.clone()));
        }
        for (key, option) in &self.extra_options {
            obj.insert(key.clone(), Value::from(option.clone()));
        }
        Value::Object(obj)
    }
}

/// A client-executable command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Command {
    /// Display title.
    pub title: String,
    /// Command name.
    pub command: String,
    /// Executable ranges passed as arguments.
    pub arguments: Vec<ExecutableRange>,
}

impl ToJson for Command {
    fn to_json(&self) -> Value {
        json!({
            "title": self.title,
            "command": self.command,
            "arguments": array_json(&self.arguments, ToJson::to_json),
        })
    }
}

/// One code lens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeLens {
    /// Anchored range.
    pub range: Range,
    /// The lens command.
    pub command: Command,
}

impl ToJson for CodeLens {
    fn to_json(&self) -> Value {
        json!({"range": range_json(self.range), "command": self.command.to_json()})
    }
}

/// `textDocument/codeAction` context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeActionContext {
    /// Diagnostics the client shows for the requested range.
    pub diagnostics: Vec<Diagnostic>,
    /// Requested action kinds, when the client filters.
    pub only: Vec<String>,
}

impl FromJson for CodeActionContext {
    fn from_json(value: &Value) -> Result<Self, DecodeError> {
        let diagnostics_json = require(value, "diagnostics")?
            .as_array()
            .ok_or(DecodeError::InvalidField("diagnostics"))?;
        let mut diagnostics = Vec::new();
        for item in diagnostics_json {
            diagnostics.push(Diagnostic::from_json(item)?);
        }
        let only = field(value, "only")
            .and_then(Value::as_array)
            .map(|kinds| {
                kinds.iter().filter_map(Value::as_str).map(str::to_string).collect()
            })
            .unwrap_or_default();
        Ok(Self { diagnostics, only })
    }
}

/// `textDocument/codeAction` parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeActionParams {
    /// Target document.
    pub text_document: TextDocumentIdentifier,
    /// Requested range.
    pub range: Range,
    /// Context carried by the client.
    pub context: CodeActionContext,
}

impl FromJson for CodeActionParams {
    fn from_json(value: &Value) -> Result<Self, DecodeError> {
        let text_document =
            TextDocumentIdentifier::from_json(require_object(value, "textDocument")?)?;
        let range = decode_range(require_object(value, "range")?)?;
        let context = match field(value, "context") {
            Some(ctx) => CodeActionContext::from_json(ctx)?,
            None => CodeActionContext::default(),
        };
        Ok(Self { text_document, range, context })
    }
}

/// One code action.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeAction {
    /// Display title.
    pub title: String,
    /// Action kind string (`quickfix`, `refactor`, ...).
    pub kind: String,
    /// Diagnostics the action resolves.
    pub diagnostics: Vec<Diagnostic>,
    /// True when the client should preselect this action.
    pub is_preferred: bool,
    /// The edit, when the action is fully computed.
    pub edit: Option<WorkspaceEdit>,
    /// The command, when the action defers to `executeCommand`.
    pub command: Option<Command>,
}

/// Kind string of quick fixes that add an import.
pub const QUICKFIX_ADD_IMPORT: &str = "quickfix.addImport";
/// Kind string of quick fixes that remove an import.
pub const QUICKFIX_REMOVE_IMPORT: &str = "quickfix.removeImport";
/// Kind string of refactor actions.
pub const REFACTOR_KIND: &str = "refactor";

impl ToJson for CodeAction {
    fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("title".to_string(), Value::from(self.title.clone()));
        obj.insert("kind".to_string(), Value::from(self.kind.clone()));
        if !self.diagnostics.is_empty() {
            obj.insert("diagnostics".to_string(), array_json(&self.diagnostics, ToJson::to_json));
        }
        if self.is_preferred {
            obj.insert("isPreferred".to_string(), Value::from(true));
        }
        if let Some(edit) = &self.edit {
            obj.insert("edit".to_string(), edit.to_json());
        }
        if let Some(command) = &self.command {
            obj.insert("command".to_string(), command.to_json());
        }
        Value::Object(obj)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn line_range(line: i32, start: i32, end: i32) -> Range {
        Range::new(Position::new(line, start), Position::new(line, end))
    }

    #[test]
    fn test_empty_diagnostics_encode_as_array() {
        let params = PublishDiagnosticsParams {
            uri: "file:///w/x.lm".to_string(),
            diagnostics: vec![],
            version: None,
        };
        let wire = params.to_json();
        assert_eq!(wire["diagnostics"], json!([]));
        assert!(wire.get("version").is_none());
    }

    #[test]
    fn test_diagnostic_round_trip() {
        let diag = Diagnostic {
            range: line_range(2, 0, 5),
            severity: 1,
            code: 3101,
            source: "lumen".to_string(),
            message: "unused import".to_string(),
            tags: vec![1],
            related_information: vec![DiagnosticRelatedInformation {
                location: Location {
                    uri: "file:///w/y.lm".to_string(),
                    range: line_range(0, 0, 6),
                },
                message: "imported here".to_string(),
            }],
        };
        let decoded = Diagnostic::from_json(&diag.to_json()).expect("decode");
        assert_eq!(decoded, diag);
    }

    #[test]
    fn test_workspace_edit_shape() {
        let mut edit = WorkspaceEdit::default();
        edit.changes.insert(
            "file:///w/x.lm".to_string(),
            vec![TextEdit { range: line_range(0, 8, 11), new_text: "a.c".to_string() }],
        );
        assert_eq!(
            edit.to_json(),
            json!({"changes": {"file:///w/x.lm": [{
                "range": {"start": {"line": 0, "character": 8},
                           "end": {"line": 0, "character": 11}},
                "newText": "a.c"
            }]}})
        );
    }

    #[test]
    fn test_apply_edit_omits_empty_edit() {
        let params = ApplyWorkspaceEditParams::default();
        assert_eq!(params.to_json(), json!({}));
    }

    #[test]
    fn test_executable_range_flattens_extra_options() {
        let mut range = ExecutableRange {
            uri: "file:///w/x.lm".to_string(),
            project_name: "demo".to_string(),
            package_name: "a.b".to_string(),
            class_name: String::new(),
            function_name: "main".to_string(),
            range: line_range(4, 0, 4),
            tweak_id: "runTarget".to_string(),
            extra_options: BTreeMap::new(),
        };
        range.extra_options.insert("mode".to_string(), "release".to_string());
        let wire = range.to_json();
        assert_eq!(wire["tweakId"], json!("runTarget"));
        assert_eq!(wire["mode"], json!("release"));
    }

    #[test]
    fn test_code_lens_encodes_command_arguments() {
        let lens = CodeLens {
            range: line_range(4, 0, 4),
            command: Command {
                title: "▶ Run".to_string(),
                command: "lumenLsp.applyTweak".to_string(),
                arguments: vec![ExecutableRange::default()],
            },
        };
        let wire = lens.to_json();
        assert_eq!(wire["command"]["title"], json!("▶ Run"));
        assert_eq!(wire["command"]["arguments"].as_array().map(Vec::len), Some(1));
    }

    #[test]
    fn test_code_action_params_decode() {
        let params = CodeActionParams::from_json(&json!({
            "textDocument": {"uri": "file:///w/x.lm"},
            "range": {"start": {"line": 1, "character": 0},
                      "end": {"line": 1, "character": 9}},
            "context": {"diagnostics": [{
                "range": {"start": {"line": 1, "character": 0},
                          "end": {"line": 1, "character": 9}},
                "message": "unused import",
            }], "only": ["quickfix"]}
        }))
        .expect("decode");
        assert_eq!(params.context.diagnostics.len(), 1);
        assert_eq!(params.context.diagnostics[0].severity, -1); // sentinel, not sent
        assert_eq!(params.context.only, vec!["quickfix"]);
    }

    #[test]
    fn test_code_action_optional_edit() {
        let action = CodeAction {
            title: "Remove unused import".to_string(),
            kind: QUICKFIX_REMOVE_IMPORT.to_string(),
            ..CodeAction::default()
        };
        let wire = action.to_json();
        assert!(wire.get("edit").is_none());
        assert!(wire.get("command").is_none());
        assert!(wire.get("isPreferred").is_none());
    }

    #[test]
    fn test_document_symbol_children() {
        let symbol = DocumentSymbol {
            name: "Server".to_string(),
            detail: String::new(),
            kind: 5,
            range: line_range(0, 0, 40),
            selection_range: line_range(0, 6, 12),
            children: vec![DocumentSymbol {
                name: "start".to_string(),
                kind: 6,
                ..DocumentSymbol::default()
            }],
        };
        let wire = symbol.to_json();
        assert_eq!(wire["children"].as_array().map(Vec::len), Some(1));
        assert!(wire["children"][0].get("children").is_none());
    }
}
