//! RED Session Server - runtime introspection over a local RPC channel
//!
//! This crate provides the session server the editor spawns once per
//! editing session:
//! - `runtime` - collaborator interfaces of the test-automation runtime
//! - `operations` - the session operations catalogue
//! - `endpoints` - operations wrapped with envelope capture and call logging
//! - `server` - loopback TCP server for controller connections
//! - `supervisor` - shuts the server down when the parent goes away
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  red-session-server                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │                                                             │
//! │  ┌─────────────────┐     ┌─────────────────────────────┐   │
//! │  │  SessionServer  │────▶│     EndpointRegistry        │   │
//! │  │ (127.0.0.1:port)│     │ logging(envelope(operation))│   │
//! │  └────────┬────────┘     └──────────────┬──────────────┘   │
//! │           │ cancel                      │                   │
//! │  ┌────────┴────────┐     ┌──────────────▼──────────────┐   │
//! │  │  Supervisor     │     │  SessionOperations          │   │
//! │  │ (stdin EOF)     │     │  + RuntimeServices          │   │
//! │  └─────────────────┘     └─────────────────────────────┘   │
//! │                                                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Panic-Free Guarantees
//!
//! Production code does not `.unwrap()` or `.expect()`. Operation failures,
//! panics included, come back to the controller as envelope data.

pub mod banner;
pub mod config;
pub mod endpoints;
pub mod logging;
pub mod operations;
pub mod runtime;
pub mod server;
pub mod supervisor;
