use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use bb_view::View;

use crate::error::{ActionError, ActionResult};

/// A worker body. Called repeatedly by the task loop with the action's view.
pub type Worker = Arc<dyn Fn(&View) -> anyhow::Result<()> + Send + Sync>;

/// Resolves a worker from a `(path, name)` roster record.
pub trait Loader: Send + Sync {
    fn load(&self, path: &Path, name: &str) -> ActionResult<Worker>;
}

/// The library a worker path refers to: its file stem.
///
/// `builtin`, `./builtin.so` and `libs/builtin.dll` all name the library
/// `builtin`.
pub fn library_of(path: &Path) -> ActionResult<String> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ActionError::InvalidPath(path.to_path_buf()))
}

/// Statically known workers, keyed by library and name.
#[derive(Default, Clone)]
pub struct Registry {
    workers: BTreeMap<(String, String), Worker>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `worker` as `name` in `library`.
    pub fn register<F>(&mut self, library: &str, name: &str, worker: F) -> ActionResult<()>
    where
        F: Fn(&View) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let key = (library.to_string(), name.to_string());
        if self.workers.contains_key(&key) {
            return Err(ActionError::DuplicateWorker {
                library: key.0,
                name: key.1,
            });
        }
        self.workers.insert(key, Arc::new(worker));
        Ok(())
    }

    /// Registered `(library, name)` pairs, sorted.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.workers.keys().map(|(l, n)| (l.as_str(), n.as_str()))
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }
}

impl Loader for Registry {
    fn load(&self, path: &Path, name: &str) -> ActionResult<Worker> {
        let library = library_of(path)?;
        let key = (library, name.to_string());
        match self.workers.get(&key) {
            Some(worker) => Ok(Arc::clone(worker)),
            None => Err(ActionError::UnknownWorker {
                library: key.0,
                name: key.1,
            }),
        }
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.workers.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn noop(_: &View) -> anyhow::Result<()> {
        Ok(())
    }

    #[test]
    fn resolve_by_file_stem() {
        let mut registry = Registry::new();
        registry.register("builtin", "heartbeat", noop).unwrap();

        for path in ["builtin", "./builtin.so", "libs/builtin.dll"] {
            assert!(registry.load(Path::new(path), "heartbeat").is_ok(), "{path}");
        }
    }

    #[test]
    fn unknown_worker() {
        let registry = Registry::new();
        let err = registry.load(Path::new("builtin"), "missing").err().unwrap();
        assert!(matches!(
            err,
            ActionError::UnknownWorker { ref library, ref name } if library == "builtin" && name == "missing"
        ));
    }

    #[test]
    fn duplicate_registration() {
        let mut registry = Registry::new();
        registry.register("lib", "w", noop).unwrap();
        assert!(matches!(
            registry.register("lib", "w", noop),
            Err(ActionError::DuplicateWorker { .. })
        ));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn empty_path_is_invalid() {
        assert!(matches!(
            library_of(&PathBuf::new()),
            Err(ActionError::InvalidPath(_))
        ));
    }

    #[test]
    fn entries_are_sorted() {
        let mut registry = Registry::new();
        registry.register("b", "x", noop).unwrap();
        registry.register("a", "y", noop).unwrap();
        let entries: Vec<_> = registry.entries().collect();
        assert_eq!(entries, vec![("a", "y"), ("b", "x")]);
    }
}
