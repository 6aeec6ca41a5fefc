//! Sanitization error types following panic-free policy.

use thiserror::Error;

use crate::value::OpaqueKind;

/// Errors raised while converting a single value into its wire form.
///
/// These never escape a variable field: the caller replaces the field
/// with the fallback literal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SanitizeError {
    /// Modules, functions, classes and plain objects have no wire form
    #[error("cannot marshal {kind} object '{name}'")]
    Opaque { kind: OpaqueKind, name: String },

    /// Tuple flattening met an element it cannot iterate
    #[error("'{type_name}' object is not iterable")]
    NotIterable { type_name: &'static str },
}
