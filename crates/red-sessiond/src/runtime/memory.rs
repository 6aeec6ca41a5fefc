//! Configurable in-process runtime.
//!
//! Behaves like an installed runtime with a fixed set of modules, standard
//! libraries and variable files. Module lookup also searches the effective
//! search path on disk, so scoped augmentations are observable. Every call
//! records the search path it was made with.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use red_core::SearchPath;

use super::{
    DocGenerator, LibraryResolver, ModuleResolver, NamedValues, RuntimeError, VariableStore,
    VersionReporter,
};

#[derive(Debug, Default)]
pub struct InMemoryRuntime {
    version: Option<String>,
    interpreter_version: Option<String>,
    search_paths: Vec<String>,
    modules: HashMap<String, String>,
    run_module: Option<String>,
    standard_libraries: Vec<(String, String)>,
    variable_files: HashMap<PathBuf, NamedValues>,
    legacy_globals: Option<NamedValues>,
    scoped_globals: NamedValues,
    observed_paths: Mutex<Vec<SearchPath>>,
}

impl InMemoryRuntime {
    /// Creates a runtime that reports itself as not installed.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_interpreter_version(mut self, version: impl Into<String>) -> Self {
        self.interpreter_version = Some(version.into());
        self
    }

    pub fn with_search_path(mut self, entry: impl Into<String>) -> Self {
        self.search_paths.push(entry.into());
        self
    }

    pub fn with_module(mut self, name: impl Into<String>, path: impl Into<String>) -> Self {
        self.modules.insert(name.into(), path.into());
        self
    }

    pub fn with_run_module(mut self, path: impl Into<String>) -> Self {
        self.run_module = Some(path.into());
        self
    }

    pub fn with_standard_library(mut self, name: impl Into<String>, path: impl Into<String>) -> Self {
        self.standard_libraries.push((name.into(), path.into()));
        self
    }

    pub fn with_variable_file(mut self, source: impl Into<PathBuf>, variables: NamedValues) -> Self {
        self.variable_files.insert(source.into(), variables);
        self
    }

    /// Makes the legacy global-variables shape available.
    pub fn with_legacy_globals(mut self, variables: NamedValues) -> Self {
        self.legacy_globals = Some(variables);
        self
    }

    pub fn with_scoped_globals(mut self, variables: NamedValues) -> Self {
        self.scoped_globals = variables;
        self
    }

    /// Returns the search paths seen by every call so far, in call order.
    pub fn observed_paths(&self) -> Vec<SearchPath> {
        self.observed_paths
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn observe(&self, path: &SearchPath) {
        self.observed_paths
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(path.clone());
    }

    fn find_on_disk(path: &SearchPath, module_name: &str) -> Option<String> {
        let relative: PathBuf = module_name.split('.').collect();
        path.python_paths.iter().find_map(|dir| {
            let package = dir.join(&relative);
            let module = dir.join(&relative).with_extension("py");
            if package.join("__init__.py").is_file() {
                Some(package.display().to_string())
            } else if module.is_file() {
                Some(module.display().to_string())
            } else {
                None
            }
        })
    }

    fn is_importable(&self, path: &SearchPath, library_name: &str) -> bool {
        self.standard_libraries.iter().any(|(name, _)| name == library_name)
            || self.modules.contains_key(library_name)
            || Self::find_on_disk(path, library_name).is_some()
    }
}

impl ModuleResolver for InMemoryRuntime {
    fn search_paths(&self, path: &SearchPath) -> Result<Vec<String>, RuntimeError> {
        self.observe(path);
        Ok(path
            .python_paths
            .iter()
            .map(|p| p.display().to_string())
            .chain(self.search_paths.iter().cloned())
            .collect())
    }

    fn module_path(&self, path: &SearchPath, module_name: &str) -> Result<Option<String>, RuntimeError> {
        self.observe(path);
        self.modules
            .get(module_name)
            .cloned()
            .or_else(|| Self::find_on_disk(path, module_name))
            .map(Some)
            .ok_or_else(|| RuntimeError::Failed(format!("ImportError: No module named {module_name}")))
    }

    fn run_module_path(&self, path: &SearchPath) -> Result<Option<String>, RuntimeError> {
        self.observe(path);
        Ok(self.run_module.clone())
    }
}

impl LibraryResolver for InMemoryRuntime {
    fn standard_library_names(&self, path: &SearchPath) -> Result<Vec<String>, RuntimeError> {
        self.observe(path);
        let mut names: Vec<String> = self
            .standard_libraries
            .iter()
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        Ok(names)
    }

    fn standard_library_path(&self, path: &SearchPath, name: &str) -> Result<Option<String>, RuntimeError> {
        self.observe(path);
        self.standard_libraries
            .iter()
            .find(|(candidate, _)| candidate == name)
            .map(|(_, library_path)| Some(library_path.clone()))
            .ok_or_else(|| {
                RuntimeError::Failed(format!("ImportError: No module named robot.libraries.{name}"))
            })
    }
}

impl VariableStore for InMemoryRuntime {
    fn load(&self, path: &SearchPath, source: &Path, _arguments: &[String]) -> Result<NamedValues, RuntimeError> {
        self.observe(path);
        self.variable_files.get(source).cloned().ok_or_else(|| {
            RuntimeError::Failed(format!(
                "DataError: File or directory does not exist: {}",
                source.display()
            ))
        })
    }

    fn legacy_globals(&self, path: &SearchPath) -> Result<NamedValues, RuntimeError> {
        self.observe(path);
        self.legacy_globals.clone().ok_or_else(|| {
            RuntimeError::Unsupported("legacy global variables are not available".to_string())
        })
    }

    fn scoped_globals(&self, path: &SearchPath) -> Result<NamedValues, RuntimeError> {
        self.observe(path);
        Ok(self.scoped_globals.clone())
    }
}

impl DocGenerator for InMemoryRuntime {
    fn generate(&self, path: &SearchPath, library_name: &str, output: &Path) -> Result<(), RuntimeError> {
        self.observe(path);
        if !self.is_importable(path, library_name) {
            return Err(RuntimeError::Failed(format!(
                "DataError: Importing library '{library_name}' failed: ImportError: No module named {library_name}"
            )));
        }
        let document = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<keywordspec name=\"{library_name}\" type=\"library\" format=\"ROBOT\">\n</keywordspec>\n"
        );
        fs::write(output, document).map_err(|e| {
            RuntimeError::Failed(format!("cannot write {}: {e}", output.display()))
        })
    }
}

impl VersionReporter for InMemoryRuntime {
    fn full_version(&self) -> Option<String> {
        self.version.clone()
    }

    fn interpreter_version(&self) -> Option<String> {
        self.interpreter_version.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_installed_by_default() {
        let runtime = InMemoryRuntime::new();
        assert_eq!(runtime.full_version(), None);
        assert!(matches!(
            runtime.legacy_globals(&SearchPath::default()),
            Err(RuntimeError::Unsupported(_))
        ));
    }

    #[test]
    fn test_module_found_on_search_path() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("helper.py"), "x = 1\n").unwrap();
        fs::create_dir(dir.path().join("pkg")).unwrap();
        fs::write(dir.path().join("pkg").join("__init__.py"), "").unwrap();

        let runtime = InMemoryRuntime::new();
        assert!(runtime.module_path(&SearchPath::default(), "helper").is_err());

        let path = SearchPath::new(vec![dir.path().to_path_buf()], vec![]);
        let found = runtime.module_path(&path, "helper").unwrap().unwrap();
        assert!(found.ends_with("helper.py"));
        let found = runtime.module_path(&path, "pkg").unwrap().unwrap();
        assert!(found.ends_with("pkg"));
        assert_eq!(runtime.observed_paths().len(), 3);
    }

    #[test]
    fn test_standard_library_names_sorted() {
        let runtime = InMemoryRuntime::new()
            .with_standard_library("String", "/robot/libraries/String.py")
            .with_standard_library("BuiltIn", "/robot/libraries/BuiltIn.py");
        assert_eq!(
            runtime.standard_library_names(&SearchPath::default()).unwrap(),
            vec!["BuiltIn".to_string(), "String".to_string()]
        );
    }

    #[test]
    fn test_generate_writes_document() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("BuiltIn.xml");
        let runtime = InMemoryRuntime::new().with_standard_library("BuiltIn", "/b.py");
        runtime
            .generate(&SearchPath::default(), "BuiltIn", &output)
            .unwrap();
        let content = fs::read_to_string(&output).unwrap();
        assert!(content.contains("<keywordspec name=\"BuiltIn\""));
        assert!(runtime
            .generate(&SearchPath::default(), "Missing", &output)
            .is_err());
    }
}
