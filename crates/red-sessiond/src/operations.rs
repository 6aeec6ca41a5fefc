//! Session operations exposed to the controller.
//!
//! Each operation is stateless between calls; the only shared state is the
//! search path, which operations taking extra paths augment for the span of
//! one call and restore afterwards, even when the call fails.
//!
//! All operations block on the runtime and must not run on an async worker.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::warn;

use red_core::{sanitize_variables, SearchPath, SharedSearchPath, VariableRecord};

use crate::runtime::{collect_global_variables, RuntimeServices};

/// The operations catalogue, bound to one runtime and one search path.
#[derive(Clone)]
pub struct SessionOperations {
    services: RuntimeServices,
    search_path: SharedSearchPath,
}

impl SessionOperations {
    pub fn new(services: RuntimeServices, search_path: SharedSearchPath) -> Self {
        Self {
            services,
            search_path,
        }
    }

    /// Returns the shared search path.
    pub fn search_path(&self) -> &SharedSearchPath {
        &self.search_path
    }

    /// Does nothing; answering proves the server is responsive.
    pub fn check_server_availability(&self) {}

    pub fn modules_search_paths(&self) -> Result<Vec<String>> {
        let path = self.search_path.snapshot();
        Ok(self.services.modules.search_paths(&path)?)
    }

    /// Resolves a module with extra search paths in effect.
    pub fn module_path(
        &self,
        module_name: &str,
        python_paths: &[String],
        class_paths: &[String],
    ) -> Result<Option<String>> {
        let path = self.search_path.augment(python_paths, class_paths);
        self.services
            .modules
            .module_path(&path, module_name)
            .with_context(|| format!("cannot resolve module '{module_name}'"))
    }

    /// Loads and sanitizes the variables defined by `source`.
    ///
    /// A failing load yields an empty record.
    pub fn variables(&self, source: &str, arguments: &[String]) -> VariableRecord {
        let path = self.search_path.snapshot();
        match self.services.variables.load(&path, Path::new(source), arguments) {
            Ok(variables) => sanitize_variables(variables),
            Err(e) => {
                warn!(source = %source, error = %e, "Variables could not be loaded");
                VariableRecord::new()
            }
        }
    }

    pub fn global_variables(&self) -> Result<VariableRecord> {
        let path = self.search_path.snapshot();
        collect_global_variables(self.services.variables.as_ref(), &path)
            .context("cannot collect global variables")
    }

    pub fn standard_library_names(&self) -> Result<Vec<String>> {
        let path = self.search_path.snapshot();
        Ok(self.services.libraries.standard_library_names(&path)?)
    }

    pub fn standard_library_path(&self, library_name: &str) -> Result<Option<String>> {
        let path = self.search_path.snapshot();
        self.services
            .libraries
            .standard_library_path(&path, library_name)
            .with_context(|| format!("cannot resolve standard library '{library_name}'"))
    }

    /// Returns the runtime's version, or `None` when it is not installed.
    pub fn robot_version(&self) -> Option<String> {
        self.services.version.full_version()
    }

    pub fn run_module_path(&self) -> Result<Option<String>> {
        let path = self.search_path.snapshot();
        Ok(self.services.modules.run_module_path(&path)?)
    }

    /// Writes the documentation of `library_name` to `result_path`.
    pub fn create_libdoc(
        &self,
        result_path: &str,
        library_name: &str,
        python_paths: &[String],
        class_paths: &[String],
    ) -> Result<()> {
        let path = self.search_path.augment(python_paths, class_paths);
        self.generate_libdoc(&path, result_path, library_name)
    }

    fn generate_libdoc(&self, path: &SearchPath, result_path: &str, library_name: &str) -> Result<()> {
        self.services
            .docs
            .generate(path, library_name, Path::new(result_path))
            .with_context(|| format!("cannot generate documentation for '{library_name}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use std::sync::Arc;

    use red_core::Value;

    use crate::runtime::InMemoryRuntime;

    fn operations(runtime: InMemoryRuntime) -> (SessionOperations, Arc<InMemoryRuntime>) {
        let runtime = Arc::new(runtime);
        let ops = SessionOperations::new(
            RuntimeServices::from_runtime(Arc::clone(&runtime)),
            SharedSearchPath::default(),
        );
        (ops, runtime)
    }

    #[test]
    fn test_module_path_sees_augmented_path() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("mylib.py"), "").unwrap();
        let (ops, runtime) = operations(InMemoryRuntime::new());
        let extra = vec![dir.path().display().to_string()];

        let found = ops.module_path("mylib", &extra, &[]).unwrap().unwrap();
        assert!(found.ends_with("mylib.py"));
        assert_eq!(ops.search_path().snapshot(), SearchPath::default());

        let observed = runtime.observed_paths();
        assert_eq!(observed[0].python_paths, vec![PathBuf::from(&extra[0])]);
    }

    #[test]
    fn test_module_path_failure_restores_path() {
        let (ops, _) = operations(InMemoryRuntime::new());
        let err = ops
            .module_path("missing", &["/extra".to_string()], &["/lib.jar".to_string()])
            .unwrap_err();
        assert!(format!("{err:?}").contains("No module named missing"));
        assert_eq!(ops.search_path().snapshot(), SearchPath::default());
    }

    #[test]
    fn test_variables_missing_source_is_empty() {
        let (ops, _) = operations(InMemoryRuntime::new());
        assert!(ops.variables("/nonexistent/vars.py", &[]).is_empty());
    }

    #[test]
    fn test_variables_are_sanitized() {
        let (ops, _) = operations(InMemoryRuntime::new().with_variable_file(
            "/vars.py",
            vec![
                ("${big}".to_string(), Value::Int(1 << 40)),
                ("${text}".to_string(), Value::text("zażółć")),
            ],
        ));
        let record = ops.variables("/vars.py", &[]);
        assert_eq!(
            record.get("${big}"),
            Some(&Value::encoded((1_i128 << 40).to_string()))
        );
        assert_eq!(
            record.get("${text}"),
            Some(&Value::encoded("za\\u017c\\xf3\\u0142\\u0107"))
        );
    }

    #[test]
    fn test_robot_version_absent() {
        let (ops, _) = operations(InMemoryRuntime::new());
        assert_eq!(ops.robot_version(), None);
        let (ops, _) = operations(InMemoryRuntime::new().with_version("Robot Framework 3.0.2"));
        assert_eq!(ops.robot_version().as_deref(), Some("Robot Framework 3.0.2"));
    }

    #[test]
    fn test_create_libdoc_writes_output() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.xml");
        let (ops, _) = operations(InMemoryRuntime::new().with_standard_library("BuiltIn", "/b.py"));

        ops.create_libdoc(&output.display().to_string(), "BuiltIn", &[], &[])
            .unwrap();
        assert!(output.is_file());

        assert!(ops
            .create_libdoc(&output.display().to_string(), "Unknown", &["/x".to_string()], &[])
            .is_err());
        assert_eq!(ops.search_path().snapshot(), SearchPath::default());
    }
}
