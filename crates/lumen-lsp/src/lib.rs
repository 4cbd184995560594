//! Lumen Language Server runtime.
//!
//! Ties the protocol codec, symbol index, refactoring planner and hierarchy
//! assembler together behind a framed-stdio JSON-RPC loop:
//!
//! - [`transport`]: Content-Length framing with host-dependent header EOL
//! - [`state`]: open documents, parsed workspace files, URI mapping
//! - [`cancellation`]: per-request cancellation registry
//! - [`hierarchy`]: call/type hierarchy assembly over the index
//! - [`handlers`]: request and notification handlers
//! - [`server`]: shared state, dispatch, worker pool, the stdio loop

pub mod cancellation;
pub mod handlers;
pub mod hierarchy;
pub mod server;
pub mod state;
pub mod transport;

pub use server::{LspServer, ServerState};

/// Runs the LSP server on stdio until EOF or `exit`.
pub fn run_stdio() -> anyhow::Result<()> {
    let server = LspServer::new();
    server.run()
}
