// src/cache/location.rs

use std::fmt;
use std::path::{Path, PathBuf};

use crate::fs::FsEntry;

/// Where a cache lives: its internal (virtual) path and, when bound to
/// disk, its external directory or file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    internal: PathBuf,
    external: Option<PathBuf>,
}

impl Location {
    pub fn new(internal: impl Into<PathBuf>, external: Option<PathBuf>) -> Self {
        Self {
            internal: internal.into(),
            external,
        }
    }

    pub fn in_memory(internal: impl Into<PathBuf>) -> Self {
        Self::new(internal, None)
    }

    pub fn internal_path(&self) -> &Path {
        &self.internal
    }

    pub fn external_path(&self) -> Option<&Path> {
        self.external.as_deref()
    }

    /// Canonical on-disk path for a file named `file_name` in this location.
    pub fn artifact_path(&self, file_name: &str) -> Option<PathBuf> {
        self.external.as_ref().map(|e| e.join(file_name))
    }
}

impl From<&FsEntry> for Location {
    fn from(entry: &FsEntry) -> Self {
        Self::new(
            entry.internal_path(),
            entry.external_path().map(Path::to_path_buf),
        )
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.internal.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_paths_need_an_external_location() {
        let bound = Location::from(&FsEntry::new("exported/a", Some(PathBuf::from("/out/a"))));
        assert_eq!(
            bound.artifact_path("summary.json"),
            Some(PathBuf::from("/out/a/summary.json"))
        );
        assert_eq!(bound.to_string(), "exported/a");

        assert_eq!(Location::in_memory("exported/a/cleaned").artifact_path("x"), None);
    }
}
