//! Collaborator interfaces of the test-automation runtime.
//!
//! The session server never links the runtime; it talks to it through the
//! traits below. Every call receives the effective [`SearchPath`] so that
//! scoped augmentations reach the runtime. All calls block and should be
//! made from `spawn_blocking`.
//!
//! Implementations:
//! - [`PythonRuntime`] - drives an installed interpreter through a helper script
//! - [`InMemoryRuntime`] - configurable in-process runtime

mod globals;
mod memory;
mod python;

pub use globals::{baseline_global_variables, collect_global_variables, GlobalsSchema};
pub use memory::InMemoryRuntime;
pub use python::PythonRuntime;

use std::path::Path;
use std::sync::Arc;

use red_core::{SearchPath, Value};
use thiserror::Error;

/// Variables as loaded by the runtime, keyed by name.
pub type NamedValues = Vec<(String, Value)>;

/// Errors reported by runtime collaborators.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The installed runtime lacks this capability
    #[error("runtime capability not available: {0}")]
    Unsupported(String),

    /// The interpreter could not be started
    #[error("failed to launch interpreter '{interpreter}': {source}")]
    Launch {
        interpreter: String,
        #[source]
        source: std::io::Error,
    },

    /// The runtime raised; carries its own trace
    #[error("{0}")]
    Failed(String),

    /// The runtime answered with something unreadable
    #[error("malformed runtime reply: {0}")]
    MalformedReply(String),

    /// A search path entry cannot be passed to the runtime
    #[error("invalid search path: {0}")]
    InvalidPath(String),
}

/// Module lookup.
pub trait ModuleResolver: Send + Sync {
    /// Returns the runtime's module search path.
    fn search_paths(&self, path: &SearchPath) -> Result<Vec<String>, RuntimeError>;

    /// Returns the file or directory a module would be imported from.
    fn module_path(&self, path: &SearchPath, module_name: &str) -> Result<Option<String>, RuntimeError>;

    /// Returns the path of the runtime's entry-point module.
    fn run_module_path(&self, path: &SearchPath) -> Result<Option<String>, RuntimeError>;
}

/// Standard library lookup.
pub trait LibraryResolver: Send + Sync {
    fn standard_library_names(&self, path: &SearchPath) -> Result<Vec<String>, RuntimeError>;

    fn standard_library_path(&self, path: &SearchPath, name: &str) -> Result<Option<String>, RuntimeError>;
}

/// Variable files and the runtime's global variables.
pub trait VariableStore: Send + Sync {
    /// Loads the variables defined by a variable file.
    fn load(&self, path: &SearchPath, source: &Path, arguments: &[String]) -> Result<NamedValues, RuntimeError>;

    /// Global variables in the legacy (module-level table) shape.
    ///
    /// Returns [`RuntimeError::Unsupported`] on runtimes without it.
    fn legacy_globals(&self, path: &SearchPath) -> Result<NamedValues, RuntimeError>;

    /// Global variables in the scoped (settings-derived) shape.
    fn scoped_globals(&self, path: &SearchPath) -> Result<NamedValues, RuntimeError>;
}

/// Library documentation generation.
pub trait DocGenerator: Send + Sync {
    /// Writes documentation of `library_name` to `output`.
    fn generate(&self, path: &SearchPath, library_name: &str, output: &Path) -> Result<(), RuntimeError>;
}

/// Version information. Absence is a valid answer, not an error.
pub trait VersionReporter: Send + Sync {
    /// Descriptive runtime version, or `None` when the runtime is not installed.
    fn full_version(&self) -> Option<String>;

    /// Version of the interpreter hosting the runtime.
    fn interpreter_version(&self) -> Option<String>;
}

/// Everything the runtime provides, behind shared handles.
#[derive(Clone)]
pub struct RuntimeServices {
    pub modules: Arc<dyn ModuleResolver>,
    pub libraries: Arc<dyn LibraryResolver>,
    pub variables: Arc<dyn VariableStore>,
    pub docs: Arc<dyn DocGenerator>,
    pub version: Arc<dyn VersionReporter>,
}

impl RuntimeServices {
    /// Uses one runtime for every collaborator role.
    pub fn from_runtime<R>(runtime: Arc<R>) -> Self
    where
        R: ModuleResolver + LibraryResolver + VariableStore + DocGenerator + VersionReporter + 'static,
    {
        Self {
            modules: runtime.clone(),
            libraries: runtime.clone(),
            variables: runtime.clone(),
            docs: runtime.clone(),
            version: runtime,
        }
    }
}
