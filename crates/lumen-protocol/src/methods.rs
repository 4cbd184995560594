//! LSP method name constants for request/notification routing.
//!
//! One source of truth for every method the server dispatches on, grouped by
//! functional area. Dialect extensions carry the `lumen/` namespace prefix.

// ============================================================================
// Lifecycle
// ============================================================================

/// Initialize request - first request from client to server
pub const INITIALIZE: &str = "initialize";

/// Initialized notification - sent after initialize response
pub const INITIALIZED: &str = "initialized";

/// Shutdown request - graceful server shutdown
pub const SHUTDOWN: &str = "shutdown";

/// Exit notification - terminate server process
pub const EXIT: &str = "exit";

// ============================================================================
// Text Document Synchronization
// ============================================================================

/// Document opened notification
pub const TEXT_DOCUMENT_DID_OPEN: &str = "textDocument/didOpen";

/// Document changed notification
pub const TEXT_DOCUMENT_DID_CHANGE: &str = "textDocument/didChange";

/// Document closed notification
pub const TEXT_DOCUMENT_DID_CLOSE: &str = "textDocument/didClose";

/// Publish diagnostics notification (server to client)
pub const TEXT_DOCUMENT_PUBLISH_DIAGNOSTICS: &str = "textDocument/publishDiagnostics";

// ============================================================================
// Language Features
// ============================================================================

/// Go to definition request
pub const TEXT_DOCUMENT_DEFINITION: &str = "textDocument/definition";

/// Find references request
pub const TEXT_DOCUMENT_REFERENCES: &str = "textDocument/references";

/// Rename request
pub const TEXT_DOCUMENT_RENAME: &str = "textDocument/rename";

/// Prepare rename request
pub const TEXT_DOCUMENT_PREPARE_RENAME: &str = "textDocument/prepareRename";

/// Hover information request
pub const TEXT_DOCUMENT_HOVER: &str = "textDocument/hover";

/// Code completion request
pub const TEXT_DOCUMENT_COMPLETION: &str = "textDocument/completion";

/// Signature help request
pub const TEXT_DOCUMENT_SIGNATURE_HELP: &str = "textDocument/signatureHelp";

/// Document symbols request
pub const TEXT_DOCUMENT_DOCUMENT_SYMBOL: &str = "textDocument/documentSymbol";

/// Document highlight request
pub const TEXT_DOCUMENT_DOCUMENT_HIGHLIGHT: &str = "textDocument/documentHighlight";

/// Document links request
pub const TEXT_DOCUMENT_DOCUMENT_LINK: &str = "textDocument/documentLink";

/// Semantic tokens full document request
pub const TEXT_DOCUMENT_SEMANTIC_TOKENS_FULL: &str = "textDocument/semanticTokens/full";

/// Code action request
pub const TEXT_DOCUMENT_CODE_ACTION: &str = "textDocument/codeAction";

/// Code lens request
pub const TEXT_DOCUMENT_CODE_LENS: &str = "textDocument/codeLens";

// ============================================================================
// Type Hierarchy
// ============================================================================

/// Prepare type hierarchy request
pub const TEXT_DOCUMENT_PREPARE_TYPE_HIERARCHY: &str = "textDocument/prepareTypeHierarchy";

/// Type hierarchy supertypes request
pub const TYPE_HIERARCHY_SUPERTYPES: &str = "typeHierarchy/supertypes";

/// Type hierarchy subtypes request
pub const TYPE_HIERARCHY_SUBTYPES: &str = "typeHierarchy/subtypes";

// ============================================================================
// Call Hierarchy
// ============================================================================

/// Prepare call hierarchy request
pub const TEXT_DOCUMENT_PREPARE_CALL_HIERARCHY: &str = "textDocument/prepareCallHierarchy";

/// Call hierarchy incoming calls request
pub const CALL_HIERARCHY_INCOMING_CALLS: &str = "callHierarchy/incomingCalls";

/// Call hierarchy outgoing calls request
pub const CALL_HIERARCHY_OUTGOING_CALLS: &str = "callHierarchy/outgoingCalls";

// ============================================================================
// Workspace Features
// ============================================================================

/// Execute command request
pub const WORKSPACE_EXECUTE_COMMAND: &str = "workspace/executeCommand";

/// Watched files changed notification
pub const WORKSPACE_DID_CHANGE_WATCHED_FILES: &str = "workspace/didChangeWatchedFiles";

/// Apply workspace edit request (server to client)
pub const WORKSPACE_APPLY_EDIT: &str = "workspace/applyEdit";

// ============================================================================
// Special Methods
// ============================================================================

/// Cancel request notification
pub const CANCEL_REQUEST: &str = "$/cancelRequest";

// ============================================================================
// Lumen Dialect Extensions
// ============================================================================

/// File/directory move refactor request
pub const LUMEN_FILE_REFACTOR: &str = "lumen/fileRefactor";

/// Navigation into a foreign-language declaration
pub const LUMEN_CROSS_LANGUAGE_JUMP: &str = "lumen/crossLanguageJump";

/// Override-method listing for a type under the cursor
pub const LUMEN_OVERRIDE_METHODS: &str = "lumen/overrideMethods";

/// Exported-name query for a package
pub const LUMEN_EXPORTS_NAME: &str = "lumen/exportsName";

/// Completion acceptance tracking notification
pub const LUMEN_TRACK_COMPLETION: &str = "lumen/trackCompletion";
