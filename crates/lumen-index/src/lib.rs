//! Workspace-wide symbol index for the Lumen language server.
//!
//! The index is an in-memory graph of symbols, references and relations fed
//! by the semantic analyzer (source files) and by compiled `.lmi` package
//! interfaces. Every navigation feature (go-to-definition, find-references,
//! rename, call and type hierarchy, file-move refactoring) answers its
//! queries here.
//!
//! Readers run in parallel; mutation goes through a single writer guard so a
//! query never observes a half-written symbol. Documents carry a monotonic
//! version and an update that is not `current + 1` is rejected, which keeps
//! text synchronization honest under reordered notifications.

mod cancel;
mod index;

pub use cancel::CancelToken;
pub use index::{
    CallSite, FileRefsRequest, FileSymbols, IndexError, LookupRequest, PkgSymsRequest,
    RefsRequest, SymbolIndex,
};
