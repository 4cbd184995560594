//! JSON-RPC/LSP protocol types and codec for the Lumen language server.
//!
//! Bidirectional mapping between wire JSON and typed records for every
//! recognized method, including the `lumen/` dialect extensions. The codec
//! contract lives in [`codec`]: decoders fail on the first missing required
//! field and tolerate everything else; encoders omit absent optionals and
//! never emit `null` where a client expects `[]`.

pub mod codec;
pub mod extensions;
pub mod hierarchy;
pub mod host;
pub mod jsonrpc;
pub mod methods;
pub mod params;
pub mod replies;

pub use codec::{DecodeError, FromJson, ToJson};
pub use host::{host_flavor, init_host_flavor, HostFlavor};
pub use jsonrpc::{error_codes, JsonRpcError, JsonRpcRequest, JsonRpcResponse};
