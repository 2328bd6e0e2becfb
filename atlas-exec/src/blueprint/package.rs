use std::io;
use std::path::{Path, PathBuf};

/// A set of workflow, values and template files addressed by relative path.
pub trait BlueprintPackage: Send + Sync {
    /// Where the package came from; sub-workflow references resolve relative to it.
    fn location(&self) -> &str;

    fn exists(&self, path: &str) -> bool;

    /// Reads a text file. A missing file is `Ok(None)`.
    fn open_text(&self, path: &str) -> io::Result<Option<String>>;
}

/// Blueprint stored as a local directory.
#[derive(Debug, Clone)]
pub struct DirectoryBlueprintPackage {
    root: PathBuf,
    location: String,
}

impl DirectoryBlueprintPackage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let location = root.to_string_lossy().into_owned();
        Self { root, location }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }
}

impl BlueprintPackage for DirectoryBlueprintPackage {
    fn location(&self) -> &str {
        &self.location
    }

    fn exists(&self, path: &str) -> bool {
        self.resolve(path).is_file()
    }

    fn open_text(&self, path: &str) -> io::Result<Option<String>> {
        match std::fs::read_to_string(self.resolve(path)) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}
