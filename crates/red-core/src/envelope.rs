//! Uniform success/failure capture around session operations.
//!
//! Every exposed operation is wrapped with [`with_envelope`], so whatever
//! happens inside it (an error, a panic, a missing value) comes back to the
//! controller as data and never takes the server down.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use serde::Serialize;
use tracing::error;

use crate::value::Value;

/// A positional argument as received from the wire.
pub type Param = serde_json::Value;

/// Result of one operation call.
///
/// At most one field is set: `exception` when the operation failed,
/// otherwise `result`, which may itself be absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Envelope {
    pub result: Option<Value>,
    pub exception: Option<String>,
}

impl Envelope {
    /// Creates a successful envelope.
    pub fn success(result: Option<Value>) -> Self {
        Self {
            result,
            exception: None,
        }
    }

    /// Creates a failed envelope carrying a formatted trace.
    pub fn failure(trace: impl Into<String>) -> Self {
        Self {
            result: None,
            exception: Some(trace.into()),
        }
    }

    /// Returns true if the wrapped operation failed.
    pub fn is_failure(&self) -> bool {
        self.exception.is_some()
    }
}

/// Wraps an operation so that its outcome is always an [`Envelope`].
///
/// Errors and panics are formatted into the `exception` field and written
/// to the error log.
pub fn with_envelope<F>(operation: F) -> impl Fn(&[Param]) -> Envelope + Send + Sync
where
    F: Fn(&[Param]) -> anyhow::Result<Option<Value>> + Send + Sync,
{
    move |params| match panic::catch_unwind(AssertUnwindSafe(|| operation(params))) {
        Ok(Ok(result)) => Envelope::success(result),
        Ok(Err(err)) => capture_failure(format_error(&err)),
        Err(payload) => capture_failure(format_panic(payload.as_ref())),
    }
}

fn capture_failure(trace: String) -> Envelope {
    error!("{trace}");
    Envelope::failure(trace)
}

/// Formats an error with its full cause chain (and backtrace, if captured).
pub fn format_error(err: &anyhow::Error) -> String {
    let trace = format!("{err:?}");
    if trace.trim().is_empty() {
        "operation failed without a message".to_string()
    } else {
        trace
    }
}

fn format_panic(payload: &(dyn Any + Send)) -> String {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string());
    format!("operation panicked: {message}")
}
