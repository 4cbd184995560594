//! Decoders for lifecycle, text-synchronization and navigation requests.

use crate::codec::{
    bool_or, decode_range, field, i32_or, i64_or, require, require_object, require_str, str_or,
    DecodeError, FromJson,
};
use crate::host::HostFlavor;
use lumen_position::{Position, Range};
use serde_json::Value;

/// Language id the server accepts in `didOpen`.
pub const LANGUAGE_ID: &str = "Lumen";

/// `{ textDocument: { uri } }`: the identifier half of most requests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextDocumentIdentifier {
    /// The text document's URI.
    pub uri: String,
}

impl FromJson for TextDocumentIdentifier {
    fn from_json(value: &Value) -> Result<Self, DecodeError> {
        Ok(Self { uri: require_str(value, "uri")? })
    }
}

/// Cursor-position request parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextDocumentPositionParams {
    /// Target document.
    pub text_document: TextDocumentIdentifier,
    /// Cursor position, UTF-16 column as sent by the client.
    pub position: Position,
}

impl FromJson for TextDocumentPositionParams {
    fn from_json(value: &Value) -> Result<Self, DecodeError> {
        let text_document =
            TextDocumentIdentifier::from_json(require_object(value, "textDocument")?)?;
        let position = require_object(value, "position")?;
        let line = i32_or(position, "line", -1);
        let character = i32_or(position, "character", -1);
        if field(position, "line").is_none() {
            return Err(DecodeError::MissingField("position.line"));
        }
        if field(position, "character").is_none() {
            return Err(DecodeError::MissingField("position.character"));
        }
        Ok(Self { text_document, position: Position::new(line, character) })
    }
}

/// Client capability switches the server actually consults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClientCapabilities {
    /// `textDocument/documentHighlight` supported.
    pub document_highlight: bool,
    /// `textDocument/hover` supported.
    pub hover: bool,
    /// `textDocument/documentLink` supported.
    pub document_link: bool,
    /// Type hierarchy supported.
    pub type_hierarchy: bool,
    /// Client understands versioned diagnostics.
    pub diagnostic_version_support: bool,
}

/// `initialize` request parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InitializeParams {
    /// Workspace root URI; replaced by `lumenRootUri` when the studio host
    /// supplies one.
    pub root_uri: String,
    /// Raw initialization options, kept for host-specific settings.
    pub initialization_options: Option<Value>,
    /// Probed client capabilities.
    pub capabilities: ClientCapabilities,
    /// Host flavor detected from the options; the server records it
    /// process-wide exactly once.
    pub host_flavor: HostFlavor,
}

impl FromJson for InitializeParams {
    fn from_json(value: &Value) -> Result<Self, DecodeError> {
        let mut root_uri = require_str(value, "rootUri")?;
        let capabilities_json = require_object(value, "capabilities")?;

        let mut host_flavor = HostFlavor::Standard;
        let initialization_options = field(value, "initializationOptions").cloned();
        if let Some(options) = &initialization_options {
            let studio_root = str_or(options, "lumenRootUri", "");
            if !studio_root.is_empty() {
                root_uri = studio_root;
                host_flavor = HostFlavor::Studio;
            }
        }

        let mut capabilities = ClientCapabilities::default();
        if let Some(text_document) = field(capabilities_json, "textDocument") {
            capabilities.document_highlight =
                field(text_document, "documentHighlight").is_some_and(Value::is_object);
            capabilities.hover = field(text_document, "hover").is_some_and(Value::is_object);
            capabilities.document_link =
                field(text_document, "documentLink").is_some_and(Value::is_object);
            capabilities.type_hierarchy =
                field(text_document, "typeHierarchy").is_some_and(Value::is_object);
            if let Some(publish) = field(text_document, "publishDiagnostics") {
                capabilities.diagnostic_version_support =
                    bool_or(publish, "versionSupport", false);
            }
        }

        Ok(Self { root_uri, initialization_options, capabilities, host_flavor })
    }
}

/// The document payload of `didOpen`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextDocumentItem {
    /// Document URI.
    pub uri: String,
    /// Language id; only [`LANGUAGE_ID`] documents are accepted.
    pub language_id: String,
    /// Initial version.
    pub version: i64,
    /// Full text.
    pub text: String,
}

/// `textDocument/didOpen` parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DidOpenTextDocumentParams {
    /// The opened document.
    pub text_document: TextDocumentItem,
}

impl FromJson for DidOpenTextDocumentParams {
    fn from_json(value: &Value) -> Result<Self, DecodeError> {
        let doc = require_object(value, "textDocument")?;
        let uri = require_str(doc, "uri")?;
        let language_id = require_str(doc, "languageId")?;
        require(doc, "version")?;
        let text = require_str(doc, "text")?;
        if language_id != LANGUAGE_ID {
            return Err(DecodeError::InvalidField("textDocument.languageId"));
        }
        Ok(Self {
            text_document: TextDocumentItem {
                uri,
                language_id,
                version: i64_or(doc, "version", -1),
                text,
            },
        })
    }
}

/// One content change of `didChange`; `range` is absent for full-text sync.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextDocumentContentChangeEvent {
    /// Changed range; `None` replaces the whole document.
    pub range: Option<Range>,
    /// Length of the replaced span, when the client sends it.
    pub range_length: Option<i32>,
    /// Replacement text.
    pub text: String,
}

/// `textDocument/didChange` parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DidChangeTextDocumentParams {
    /// Target document URI.
    pub uri: String,
    /// New document version.
    pub version: i64,
    /// The changes, in client order. Never empty after a successful decode.
    pub content_changes: Vec<TextDocumentContentChangeEvent>,
}

impl FromJson for DidChangeTextDocumentParams {
    fn from_json(value: &Value) -> Result<Self, DecodeError> {
        let doc = require_object(value, "textDocument")?;
        let uri = require_str(doc, "uri")?;
        require(doc, "version")?;
        let version = i64_or(doc, "version", -1);

        let changes_json = match require(value, "contentChanges")?.as_array() {
            Some(array) if !array.is_empty() => array,
            _ => return Err(DecodeError::MissingField("contentChanges")),
        };
        let mut content_changes = Vec::new();
        for change in changes_json {
            // entries without text are skipped, not fatal
            if !change.is_object() || field(change, "text").is_none() {
                continue;
            }
            let mut event = TextDocumentContentChangeEvent {
                text: str_or(change, "text", ""),
                ..TextDocumentContentChangeEvent::default()
            };
            if let Some(range) = field(change, "range") {
                let Ok(range) = decode_range(range) else {
                    continue;
                };
                event.range = Some(range);
                let length = i32_or(change, "rangeLength", -1);
                event.range_length = (length >= 0).then_some(length);
            }
            content_changes.push(event);
        }
        if content_changes.is_empty() {
            return Err(DecodeError::MissingField("contentChanges.text"));
        }
        Ok(Self { uri, version, content_changes })
    }
}

/// `textDocument/didClose` parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DidCloseTextDocumentParams {
    /// The closed document.
    pub text_document: TextDocumentIdentifier,
}

impl FromJson for DidCloseTextDocumentParams {
    fn from_json(value: &Value) -> Result<Self, DecodeError> {
        let doc = require_object(value, "textDocument")?;
        Ok(Self { text_document: TextDocumentIdentifier::from_json(doc)? })
    }
}

/// `textDocument/rename` parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenameParams {
    /// Target document and position.
    pub position_params: TextDocumentPositionParams,
    /// Requested new name.
    pub new_name: String,
}

impl FromJson for RenameParams {
    fn from_json(value: &Value) -> Result<Self, DecodeError> {
        let new_name = require_str(value, "newName")?;
        Ok(Self { position_params: TextDocumentPositionParams::from_json(value)?, new_name })
    }
}

/// `textDocument/documentSymbol` parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentSymbolParams {
    /// Target document.
    pub text_document: TextDocumentIdentifier,
}

impl FromJson for DocumentSymbolParams {
    fn from_json(value: &Value) -> Result<Self, DecodeError> {
        let doc = require_object(value, "textDocument")?;
        Ok(Self { text_document: TextDocumentIdentifier::from_json(doc)? })
    }
}

/// `textDocument/semanticTokens/full` parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SemanticTokensParams {
    /// Target document.
    pub text_document: TextDocumentIdentifier,
}

impl FromJson for SemanticTokensParams {
    fn from_json(value: &Value) -> Result<Self, DecodeError> {
        let doc = require_object(value, "textDocument")?;
        Ok(Self { text_document: TextDocumentIdentifier::from_json(doc)? })
    }
}

/// `textDocument/documentLink` parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentLinkParams {
    /// Target document.
    pub text_document: TextDocumentIdentifier,
}

impl FromJson for DocumentLinkParams {
    fn from_json(value: &Value) -> Result<Self, DecodeError> {
        let doc = require_object(value, "textDocument")?;
        Ok(Self { text_document: TextDocumentIdentifier::from_json(doc)? })
    }
}

/// What happened to a watched file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileChangeType {
    /// The file was created.
    Created,
    /// The file content changed.
    Changed,
    /// The file was deleted.
    Deleted,
}

impl FileChangeType {
    fn from_wire(value: i32) -> Option<Self> {
        match value {
            1 => Some(FileChangeType::Created),
            2 => Some(FileChangeType::Changed),
            3 => Some(FileChangeType::Deleted),
            _ => None,
        }
    }
}

/// One watched-file event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileWatchedEvent {
    /// Affected file.
    pub uri: String,
    /// Event kind.
    pub change_type: FileChangeType,
}

/// `workspace/didChangeWatchedFiles` parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DidChangeWatchedFilesParams {
    /// Events in client order; malformed entries are dropped.
    pub changes: Vec<FileWatchedEvent>,
}

impl FromJson for DidChangeWatchedFilesParams {
    fn from_json(value: &Value) -> Result<Self, DecodeError> {
        let changes_json = require(value, "changes")?
            .as_array()
            .ok_or(DecodeError::InvalidField("changes"))?;
        let mut changes = Vec::new();
        for change in changes_json {
            let uri = str_or(change, "uri", "");
            let Some(change_type) = FileChangeType::from_wire(i32_or(change, "type", -1)) else {
                continue;
            };
            if uri.is_empty() {
                continue;
            }
            changes.push(FileWatchedEvent { uri, change_type });
        }
        Ok(Self { changes })
    }
}

/// `$/cancelRequest` parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CancelParams {
    /// Id of the request to cancel, as raw JSON (number or string).
    pub id: String,
}

impl FromJson for CancelParams {
    fn from_json(value: &Value) -> Result<Self, DecodeError> {
        let id = require(value, "id")?;
        Ok(Self { id: id.to_string() })
    }
}

/// `textDocument/completion` trigger context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionContext {
    /// LSP `CompletionTriggerKind` number.
    pub trigger_kind: i32,
    /// Character that triggered, when kind is trigger-character.
    pub trigger_character: Option<String>,
}

impl FromJson for CompletionContext {
    fn from_json(value: &Value) -> Result<Self, DecodeError> {
        require(value, "triggerKind")?;
        let trigger_kind = i32_or(value, "triggerKind", -1);
        let trigger_character = field(value, "triggerCharacter")
            .and_then(Value::as_str)
            .map(str::to_string);
        Ok(Self { trigger_kind, trigger_character })
    }
}

/// `textDocument/completion` parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionParams {
    /// Target document and position.
    pub position_params: TextDocumentPositionParams,
    /// Trigger context, when the client sends one.
    pub context: Option<CompletionContext>,
}

impl FromJson for CompletionParams {
    fn from_json(value: &Value) -> Result<Self, DecodeError> {
        let position_params = TextDocumentPositionParams::from_json(value)?;
        let context = match field(value, "context") {
            Some(ctx) => Some(CompletionContext::from_json(ctx)?),
            None => None,
        };
        Ok(Self { position_params, context })
    }
}

/// `textDocument/signatureHelp` trigger context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignatureHelpContext {
    /// LSP `SignatureHelpTriggerKind` number.
    pub trigger_kind: i32,
    /// Character that triggered, if any.
    pub trigger_character: Option<String>,
    /// True when re-triggered inside an active signature.
    pub is_retrigger: bool,
}

impl FromJson for SignatureHelpContext {
    fn from_json(value: &Value) -> Result<Self, DecodeError> {
        require(value, "triggerKind")?;
        Ok(Self {
            trigger_kind: i32_or(value, "triggerKind", -1),
            trigger_character: field(value, "triggerCharacter")
                .and_then(Value::as_str)
                .map(str::to_string),
            is_retrigger: bool_or(value, "isRetrigger", false),
        })
    }
}

/// `textDocument/signatureHelp` parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignatureHelpParams {
    /// Target document and position.
    pub position_params: TextDocumentPositionParams,
    /// Trigger context, when the client sends one.
    pub context: Option<SignatureHelpContext>,
}

impl FromJson for SignatureHelpParams {
    fn from_json(value: &Value) -> Result<Self, DecodeError> {
        let position_params = TextDocumentPositionParams::from_json(value)?;
        let context = match field(value, "context") {
            Some(ctx) => Some(SignatureHelpContext::from_json(ctx)?),
            None => None,
        };
        Ok(Self { position_params, context })
    }
}
