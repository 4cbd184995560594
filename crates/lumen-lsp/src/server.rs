//! Server runtime: shared state, dispatch and the stdio loop.
//!
//! Notifications are applied in receipt order on the reader task, which is
//! what keeps document versions monotonic. Requests run on a small worker
//! pool; each carries a cancellation token registered under its id, and
//! `$/cancelRequest` flips the token from the reader task.

use crate::cancellation::CancellationRegistry;
use crate::state::{DocumentStore, WorkspaceState};
use crate::{handlers, transport};
use lumen_index::{CancelToken, FileSymbols, IndexError, SymbolIndex};
use lumen_protocol::extensions::APPLY_TWEAK_COMMAND;
use lumen_protocol::params::InitializeParams;
use lumen_protocol::{init_host_flavor, methods, FromJson, JsonRpcError, JsonRpcRequest,
    JsonRpcResponse};
use lumen_syntax::File;
use parking_lot::{Mutex, RwLock};
use serde_json::{json, Value};
use std::io::{self, BufReader, Write};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use tracing::{debug, info};

/// Number of request workers; navigation requests are short, the pool only
/// needs to cover a slow planner run overlapping quick lookups.
const WORKER_COUNT: usize = 4;

/// Process-wide server state shared by the reader task and the workers.
pub struct ServerState {
    /// The symbol index.
    pub index: SymbolIndex,
    /// Parsed workspace files.
    pub workspace: RwLock<WorkspaceState>,
    /// Open documents.
    pub documents: RwLock<DocumentStore>,
    /// In-flight request tokens.
    pub cancellations: CancellationRegistry,
}

impl Default for ServerState {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerState {
    /// Creates empty state.
    pub fn new() -> Self {
        Self {
            index: SymbolIndex::new(),
            workspace: RwLock::new(WorkspaceState::new()),
            documents: RwLock::new(DocumentStore::default()),
            cancellations: CancellationRegistry::new(),
        }
    }

    /// Ingests the header-level contribution of a file.
    ///
    /// The compiler adapter supplies full symbol payloads through the same
    /// [`SymbolIndex::apply`] path; the server itself maintains the per-file
    /// version line so reordered updates are rejected consistently.
    pub fn ingest_header(&self, path: &str, file: &File, version: i64) {
        let update = FileSymbols {
            file_id: file.file_id,
            uri: path.to_string(),
            package: file.package_name().to_string(),
            version,
            ..FileSymbols::default()
        };
        match self.index.apply(update) {
            Ok(()) => {}
            Err(IndexError::StaleVersion { current, offered, .. }) => {
                info!(path, current, offered, "index rejected stale header update");
            }
        }
    }
}

/// The Lumen language server.
pub struct LspServer {
    state: Arc<ServerState>,
}

impl Default for LspServer {
    fn default() -> Self {
        Self::new()
    }
}

impl LspServer {
    /// Creates a server with empty state.
    pub fn new() -> Self {
        Self { state: Arc::new(ServerState::new()) }
    }

    /// The shared state (tests and embedders).
    pub fn state(&self) -> &Arc<ServerState> {
        &self.state
    }

    /// Runs the stdio loop until EOF or `exit`.
    pub fn run(&self) -> anyhow::Result<()> {
        let stdin = io::stdin();
        let mut reader = BufReader::new(stdin.lock());
        let writer: Arc<Mutex<Box<dyn Write + Send>>> =
            Arc::new(Mutex::new(Box::new(io::stdout())));
        let pool = WorkerPool::start(Arc::clone(&self.state), Arc::clone(&writer));

        loop {
            let request = match transport::read_message(&mut reader)? {
                transport::Frame::Eof => {
                    info!("input closed, shutting down");
                    break;
                }
                transport::Frame::Malformed => {
                    let response = JsonRpcResponse::error(
                        None,
                        JsonRpcError::new(
                            lumen_protocol::error_codes::PARSE_ERROR,
                            "malformed message",
                        ),
                    );
                    let mut out = writer.lock();
                    if let Err(err) = transport::write_message(&mut *out, &response) {
                        info!(error = %err, "failed to write parse-error response");
                    }
                    continue;
                }
                transport::Frame::Message(request) => request,
            };
            if request.method == methods::EXIT {
                break;
            }
            match request.id {
                None => handle_notification(&self.state, &request.method, request.params),
                Some(id) => {
                    let token = self.state.cancellations.register(&id);
                    pool.submit(Job {
                        id,
                        method: request.method,
                        params: request.params.unwrap_or(Value::Null),
                        token,
                    });
                }
            }
        }
        pool.shutdown();
        Ok(())
    }

    /// Handles one message synchronously; the unit-test entry point.
    pub fn handle_message(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        match request.id {
            None => {
                handle_notification(&self.state, &request.method, request.params);
                None
            }
            Some(id) => {
                let token = self.state.cancellations.register(&id);
                let params = request.params.unwrap_or(Value::Null);
                let response =
                    match dispatch_request(&self.state, &request.method, &params, &token) {
                        Ok(result) => JsonRpcResponse::success(Some(id.clone()), result),
                        Err(err) => JsonRpcResponse::error(Some(id.clone()), err),
                    };
                self.state.cancellations.finish(&id);
                Some(response)
            }
        }
    }
}

struct Job {
    id: Value,
    method: String,
    params: Value,
    token: CancelToken,
}

struct WorkerPool {
    sender: Option<mpsc::Sender<Job>>,
    handles: Vec<thread::JoinHandle<()>>,
}

impl WorkerPool {
    fn start(state: Arc<ServerState>, writer: Arc<Mutex<Box<dyn Write + Send>>>) -> Self {
        let (sender, receiver) = mpsc::channel::<Job>();
        let receiver = Arc::new(Mutex::new(receiver));
        let handles = (0..WORKER_COUNT)
            .map(|_| {
                let state = Arc::clone(&state);
                let writer = Arc::clone(&writer);
                let receiver = Arc::clone(&receiver);
                thread::spawn(move || loop {
                    let job = {
                        let guard = receiver.lock();
                        guard.recv()
                    };
                    let Ok(job) = job else {
                        break;
                    };
                    let response =
                        match dispatch_request(&state, &job.method, &job.params, &job.token) {
                            Ok(result) => JsonRpcResponse::success(Some(job.id.clone()), result),
                            Err(err) => JsonRpcResponse::error(Some(job.id.clone()), err),
                        };
                    state.cancellations.finish(&job.id);
                    let mut out = writer.lock();
                    if let Err(err) = transport::write_message(&mut *out, &response) {
                        info!(error = %err, "failed to write response");
                    }
                })
            })
            .collect();
        Self { sender: Some(sender), handles }
    }

    fn submit(&self, job: Job) {
        if let Some(sender) = &self.sender {
            let _ = sender.send(job);
        }
    }

    fn shutdown(mut self) {
        self.sender.take();
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

/// Routes a request to its handler.
///
/// Unknown methods and unimplemented surfaces answer with an empty
/// well-formed result; the only error codes produced anywhere below are
/// invalid-params and request-cancelled.
fn dispatch_request(
    state: &ServerState,
    method: &str,
    params: &Value,
    token: &CancelToken,
) -> Result<Value, JsonRpcError> {
    match method {
        methods::INITIALIZE => initialize(state, params),
        methods::SHUTDOWN => Ok(Value::Null),
        methods::TEXT_DOCUMENT_DEFINITION => handlers::definition(state, params, token),
        methods::TEXT_DOCUMENT_REFERENCES => handlers::references(state, params, token),
        methods::TEXT_DOCUMENT_DOCUMENT_HIGHLIGHT => {
            handlers::document_highlight(state, params, token)
        }
        methods::TEXT_DOCUMENT_HOVER => handlers::hover(state, params, token),
        methods::TEXT_DOCUMENT_RENAME => handlers::rename(state, params, token),
        methods::TEXT_DOCUMENT_PREPARE_RENAME => handlers::prepare_rename(state, params, token),
        methods::TEXT_DOCUMENT_DOCUMENT_SYMBOL => handlers::document_symbol(state, params, token),
        methods::TEXT_DOCUMENT_CODE_LENS => handlers::code_lens(state, params, token),
        methods::TEXT_DOCUMENT_COMPLETION => {
            Ok(json!({"isIncomplete": false, "items": []}))
        }
        methods::TEXT_DOCUMENT_SIGNATURE_HELP => Ok(Value::Null),
        methods::TEXT_DOCUMENT_SEMANTIC_TOKENS_FULL => Ok(json!({"data": []})),
        methods::TEXT_DOCUMENT_DOCUMENT_LINK => Ok(json!([])),
        methods::TEXT_DOCUMENT_CODE_ACTION => Ok(json!([])),
        methods::TEXT_DOCUMENT_PREPARE_CALL_HIERARCHY => {
            handlers::prepare_call_hierarchy(state, params, token)
        }
        methods::CALL_HIERARCHY_INCOMING_CALLS => handlers::incoming_calls(state, params, token),
        methods::CALL_HIERARCHY_OUTGOING_CALLS => handlers::outgoing_calls(state, params, token),
        methods::TEXT_DOCUMENT_PREPARE_TYPE_HIERARCHY => {
            handlers::prepare_type_hierarchy(state, params, token)
        }
        methods::TYPE_HIERARCHY_SUPERTYPES => handlers::supertypes(state, params, token),
        methods::TYPE_HIERARCHY_SUBTYPES => handlers::subtypes(state, params, token),
        methods::WORKSPACE_EXECUTE_COMMAND => handlers::execute_command(state, params, token),
        methods::LUMEN_FILE_REFACTOR => handlers::file_refactor(state, params, token),
        methods::LUMEN_CROSS_LANGUAGE_JUMP => handlers::cross_language_jump(state, params, token),
        methods::LUMEN_EXPORTS_NAME => handlers::exports_name(state, params, token),
        methods::LUMEN_OVERRIDE_METHODS => handlers::override_methods(state, params, token),
        other => {
            debug!(method = other, "unhandled request");
            Ok(Value::Null)
        }
    }
}

fn handle_notification(state: &Arc<ServerState>, method: &str, params: Option<Value>) {
    let params = params.unwrap_or(Value::Null);
    match method {
        methods::INITIALIZED => {}
        methods::TEXT_DOCUMENT_DID_OPEN => handlers::did_open(state, &params),
        methods::TEXT_DOCUMENT_DID_CHANGE => handlers::did_change(state, &params),
        methods::TEXT_DOCUMENT_DID_CLOSE => handlers::did_close(state, &params),
        methods::WORKSPACE_DID_CHANGE_WATCHED_FILES => {
            handlers::did_change_watched_files(state, &params)
        }
        methods::LUMEN_TRACK_COMPLETION => handlers::track_completion(state, &params),
        methods::CANCEL_REQUEST => {
            if let Some(id) = params.get("id") {
                state.cancellations.cancel(id);
            }
        }
        other => debug!(method = other, "unhandled notification"),
    }
}

fn initialize(state: &ServerState, params: &Value) -> Result<Value, JsonRpcError> {
    let params = InitializeParams::from_json(params)
        .map_err(|err| JsonRpcError::invalid_params(err.to_string()))?;
    if !init_host_flavor(params.host_flavor) {
        info!("host flavor already initialized; keeping the first value");
    }
    state.workspace.write().set_root(&params.root_uri);
    Ok(json!({
        "capabilities": {
            "textDocumentSync": {"openClose": true, "change": 1},
            "definitionProvider": true,
            "referencesProvider": true,
            "documentHighlightProvider": params.capabilities.document_highlight,
            "hoverProvider": params.capabilities.hover,
            "documentSymbolProvider": true,
            "documentLinkProvider": params.capabilities.document_link,
            "renameProvider": {"prepareProvider": true},
            "codeLensProvider": {"resolveProvider": false},
            "callHierarchyProvider": true,
            "typeHierarchyProvider": params.capabilities.type_hierarchy,
            "executeCommandProvider": {"commands": [APPLY_TWEAK_COMMAND]},
        },
        "serverInfo": {
            "name": "lumen-lsp",
            "version": env!("CARGO_PKG_VERSION"),
        },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn request(id: i64, method: &str, params: Value) -> JsonRpcRequest {
        serde_json::from_value(json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        }))
        .expect("request")
    }

    fn notification(method: &str, params: Value) -> JsonRpcRequest {
        serde_json::from_value(json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
        }))
        .expect("notification")
    }

    #[test]
    fn test_initialize_reports_capabilities() {
        let server = LspServer::new();
        let response = server
            .handle_message(request(
                1,
                methods::INITIALIZE,
                json!({"rootUri": "file:///w", "capabilities": {"textDocument": {"typeHierarchy": {}}}}),
            ))
            .expect("response");
        let result = response.result.expect("result");
        assert_eq!(result["capabilities"]["definitionProvider"], json!(true));
        assert_eq!(result["capabilities"]["typeHierarchyProvider"], json!(true));
        assert_eq!(result["serverInfo"]["name"], json!("lumen-lsp"));
        assert_eq!(server.state().workspace.read().root_path(), "/w");
    }

    #[test]
    fn test_unknown_method_yields_empty_result_not_error() {
        let server = LspServer::new();
        let response = server
            .handle_message(request(2, "textDocument/foldingRange", json!({})))
            .expect("response");
        assert!(response.error.is_none());
        assert_eq!(response.result, Some(Value::Null));
    }

    #[test]
    fn test_invalid_params_is_the_only_decode_error_surface() {
        let server = LspServer::new();
        let response = server
            .handle_message(request(3, methods::TEXT_DOCUMENT_DEFINITION, json!({})))
            .expect("response");
        let error = response.error.expect("error");
        assert_eq!(error.code, lumen_protocol::error_codes::INVALID_PARAMS);
        assert!(error.message.contains("textDocument"));
    }

    #[test]
    fn test_notifications_produce_no_response() {
        let server = LspServer::new();
        let outcome = server.handle_message(notification(
            methods::TEXT_DOCUMENT_DID_OPEN,
            json!({"textDocument": {
                "uri": "file:///w/a/one.lm",
                "languageId": "Lumen",
                "version": 1,
                "text": "package a\n"
            }}),
        ));
        assert!(outcome.is_none());
        assert!(server.state().documents.read().get("file:///w/a/one.lm").is_some());
    }

    #[test]
    fn test_definition_round_trip_through_dispatch() {
        let server = LspServer::new();
        server.handle_message(notification(
            methods::TEXT_DOCUMENT_DID_OPEN,
            json!({"textDocument": {
                "uri": "file:///w/a/one.lm",
                "languageId": "Lumen",
                "version": 1,
                "text": "package a\n"
            }}),
        ));
        let response = server
            .handle_message(request(
                4,
                methods::TEXT_DOCUMENT_DEFINITION,
                json!({
                    "textDocument": {"uri": "file:///w/a/one.lm"},
                    "position": {"line": 0, "character": 2}
                }),
            ))
            .expect("response");
        assert_eq!(response.result, Some(json!([])));
    }

    #[test]
    fn test_shutdown_returns_null() {
        let server = LspServer::new();
        let response =
            server.handle_message(request(9, methods::SHUTDOWN, Value::Null)).expect("response");
        assert_eq!(response.result, Some(Value::Null));
    }
}
