//! The process-wide module/library resolution path.
//!
//! Operations that need extra paths take a [`SearchPathGuard`] from
//! [`SharedSearchPath::augment`]. The guard holds the lock for its whole
//! lifetime, so augmentations never interleave, and dropping it restores the
//! exact pre-call state on every exit path.

use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

/// Effective resolution path handed to runtime collaborators.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPath {
    /// General module search path, highest priority first
    pub python_paths: Vec<PathBuf>,
    /// Platform-specific (class) path entries, in insertion order
    pub class_paths: Vec<PathBuf>,
}

impl SearchPath {
    pub fn new(python_paths: Vec<PathBuf>, class_paths: Vec<PathBuf>) -> Self {
        Self {
            python_paths,
            class_paths,
        }
    }

    /// Moves `path` to the front of the general path.
    pub fn add_path(&mut self, path: &Path) {
        self.remove_path(path);
        self.python_paths.insert(0, path.to_path_buf());
    }

    /// Removes every occurrence of `path` from the general path.
    pub fn remove_path(&mut self, path: &Path) {
        self.python_paths.retain(|existing| existing != path);
    }

    /// Appends `path` to the class path unless already present.
    pub fn add_class_path(&mut self, path: &Path) {
        if !self.class_paths.iter().any(|existing| existing == path) {
            self.class_paths.push(path.to_path_buf());
        }
    }
}

/// Lock-guarded [`SearchPath`] shared by all operations.
#[derive(Debug, Clone, Default)]
pub struct SharedSearchPath {
    inner: Arc<Mutex<SearchPath>>,
}

impl SharedSearchPath {
    pub fn new(initial: SearchPath) -> Self {
        Self {
            inner: Arc::new(Mutex::new(initial)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SearchPath> {
        // A panic while holding the guard already restored the state on unwind.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns a copy of the current path.
    pub fn snapshot(&self) -> SearchPath {
        self.lock().clone()
    }

    /// Adds extra paths for the lifetime of the returned guard.
    ///
    /// General and class paths are both put in front of the general path
    /// (the last one added ends up first); class paths are also recorded as
    /// class path entries.
    pub fn augment<P: AsRef<Path>>(&self, python_paths: &[P], class_paths: &[P]) -> SearchPathGuard<'_> {
        let mut state = self.lock();
        let original = state.clone();

        for path in python_paths.iter().chain(class_paths) {
            state.add_path(path.as_ref());
        }
        for path in class_paths {
            state.add_class_path(path.as_ref());
        }

        debug!(
            added = python_paths.len() + class_paths.len(),
            "Search path augmented"
        );
        SearchPathGuard { state, original }
    }
}

/// Scoped augmentation of the shared search path.
pub struct SearchPathGuard<'a> {
    state: MutexGuard<'a, SearchPath>,
    original: SearchPath,
}

impl Deref for SearchPathGuard<'_> {
    type Target = SearchPath;

    fn deref(&self) -> &SearchPath {
        &self.state
    }
}

impl Drop for SearchPathGuard<'_> {
    fn drop(&mut self) {
        *self.state = std::mem::take(&mut self.original);
        debug!("Search path restored");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn paths(items: &[&str]) -> Vec<PathBuf> {
        items.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn test_add_path_moves_to_front() {
        let mut path = SearchPath::new(paths(&["/a", "/b"]), vec![]);
        path.add_path(Path::new("/b"));
        path.add_path(Path::new("/c"));
        assert_eq!(path.python_paths, paths(&["/c", "/b", "/a"]));
    }

    #[test]
    fn test_augment_then_restore() {
        let shared = SharedSearchPath::new(SearchPath::new(paths(&["/base"]), vec![]));
        let before = shared.snapshot();
        {
            let guard = shared.augment(&["/x", "/y"], &["/lib.jar"]);
            assert_eq!(guard.python_paths, paths(&["/lib.jar", "/y", "/x", "/base"]));
            assert_eq!(guard.class_paths, paths(&["/lib.jar"]));
        }
        assert_eq!(shared.snapshot(), before);
    }

    #[test]
    fn test_restore_keeps_preexisting_entries() {
        let shared = SharedSearchPath::new(SearchPath::new(paths(&["/a", "/b"]), vec![]));
        drop(shared.augment(&["/b"], &[]));
        assert_eq!(shared.snapshot().python_paths, paths(&["/a", "/b"]));
    }

    #[test]
    fn test_restore_on_early_return() {
        fn resolve(shared: &SharedSearchPath) -> Result<(), String> {
            let _guard = shared.augment(&["/tmp/extra"], &[]);
            Err("resolution failed".to_string())
        }

        let shared = SharedSearchPath::default();
        assert!(resolve(&shared).is_err());
        assert_eq!(shared.snapshot(), SearchPath::default());
    }

    #[test]
    fn test_restore_after_panic() {
        let shared = SharedSearchPath::default();
        let cloned = shared.clone();
        let result = thread::spawn(move || {
            let _guard = cloned.augment(&["/tmp/extra"], &[]);
            panic!("resolver crashed");
        })
        .join();
        assert!(result.is_err());
        assert_eq!(shared.snapshot(), SearchPath::default());
    }

    #[test]
    fn test_concurrent_augmentations_do_not_interleave() {
        let shared = SharedSearchPath::new(SearchPath::new(paths(&["/base"]), vec![]));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let shared = shared.clone();
                thread::spawn(move || {
                    let own = format!("/worker/{i}");
                    for _ in 0..50 {
                        let guard = shared.augment(&[own.as_str()], &[]);
                        assert_eq!(guard.python_paths.len(), 2);
                        assert_eq!(guard.python_paths.first(), Some(&PathBuf::from(&own)));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(shared.snapshot().python_paths, paths(&["/base"]));
    }
}
