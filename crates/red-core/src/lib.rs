//! RED Core - Value model and call machinery for the session server
//!
//! This crate provides the pieces of the request pipeline that do not
//! depend on the transport or on the installed runtime:
//! - `value` - in-memory runtime values and their wire rendering
//! - `sanitize` - conversion of arbitrary values into wire-safe values
//! - `envelope` - uniform result/exception capture around operations
//! - `call_log` - invocation/completion logging around operations
//! - `search_path` - the process-wide, lock-guarded resolution path
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or direct indexing `[i]`.

pub mod call_log;
pub mod envelope;
pub mod error;
pub mod sanitize;
pub mod search_path;
pub mod value;
pub mod variables;

// Re-exports for convenience
pub use call_log::with_logging;
pub use envelope::{with_envelope, Envelope, Param};
pub use error::SanitizeError;
pub use sanitize::{fallback, sanitize, try_sanitize, FALLBACK};
pub use search_path::{SearchPath, SearchPathGuard, SharedSearchPath};
pub use value::{OpaqueKind, Value};
pub use variables::{decorate_variable_name, sanitize_variables, VariableRecord};
