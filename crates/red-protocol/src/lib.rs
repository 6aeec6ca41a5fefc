//! RED Protocol - Wire protocol for session server communication
//!
//! This crate provides the newline-delimited JSON frames exchanged between
//! the controlling editor and the session server, and the catalogue of
//! callable methods.

pub mod message;
pub mod method;
pub mod parse;

pub use message::{ErrorCode, Request, Response, RpcError, JSONRPC_VERSION};
pub use method::Method;
pub use parse::{parse_request, ProtocolError};
