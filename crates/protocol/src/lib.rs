//! Core domain for the DIM client.
//!
//! This crate contains the JSON-RPC envelope, the protocol constants, newtype
//! identifiers, the error values a DIM server (or the client-side version
//! check) can produce, and the keyset pagination algorithm. The `dimclient`
//! crate implements the port traits defined here over HTTP.
//!
//! ## Architectural Layer
//!
//! **Domain logic + port definitions.** This crate has no I/O dependencies.
//! It defines *what* a call looks like on the wire; infrastructure crates
//! define *how* it is carried.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`Username`, `MethodName`) |
//! | [`types`] | Shared value types (`ProtocolVersion`, `CallArgs`, `SessionPolicy`) |
//! | [`envelope`] | JSON-RPC 2.0 request/response envelope |
//! | [`errors`] | `RpcError` and `ProtocolError` |
//! | [`pagination`] | Keyset pagination over paged listing methods |
//! | [`ports`] | `RpcCaller` and `CredentialSource` traits |

pub mod envelope;
pub mod errors;
pub mod identifiers;
pub mod pagination;
pub mod ports;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use envelope::{EnvelopeError, RpcRequest, RpcResponse, JSONRPC_VERSION};
pub use errors::{ProtocolError, RpcError, CLIENT_ERROR_CODE};
pub use identifiers::{MethodName, Username};
pub use pagination::{list_all, PageQuery, PageRequest, PaginationError, DEFAULT_PAGE_LIMIT};
pub use ports::{CredentialError, CredentialSource, RpcCaller, StaticCredentials};
pub use types::{
    CallArgs, ProtocolVersion, SessionPolicy, DEFAULT_WHOAMI_METHOD, PROTOCOL_VERSION,
};
