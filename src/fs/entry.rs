// src/fs/entry.rs

//! Virtual filesystem entries.
//!
//! An entry has an internal path (`imported/sample-a/values`) and, if it is
//! bound to disk, an external one. Children without an explicit external
//! path inherit `parent external / name`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsEntry {
    internal: PathBuf,
    external: Option<PathBuf>,
    children: BTreeMap<String, FsEntry>,
}

impl FsEntry {
    pub fn new(internal: impl Into<PathBuf>, external: Option<PathBuf>) -> Self {
        Self {
            internal: internal.into(),
            external,
            children: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        self.internal
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
    }

    pub fn internal_path(&self) -> &Path {
        &self.internal
    }

    pub fn external_path(&self) -> Option<&Path> {
        self.external.as_deref()
    }

    pub fn has_external_path(&self) -> bool {
        self.external.is_some()
    }

    /// Known children, in name order.
    pub fn children(&self) -> impl Iterator<Item = &FsEntry> {
        self.children.values()
    }

    pub fn child(&self, name: &str) -> Option<&FsEntry> {
        self.children.get(name)
    }

    /// Register a child. Its external path defaults to `external / name`.
    pub fn insert_child(&mut self, name: &str, external: Option<PathBuf>) -> &mut FsEntry {
        let mut entry = self.derive(name);
        if external.is_some() {
            entry.external = external;
        }
        self.children.entry(name.to_string()).or_insert(entry)
    }

    /// Look up `name` (which may contain `/`), deriving entries that were
    /// never registered.
    pub fn resolve(&self, name: &str) -> FsEntry {
        let mut current = self.clone();
        for segment in name.split('/').filter(|s| !s.is_empty()) {
            current = match current.children.get(segment) {
                Some(child) => child.clone(),
                None => current.derive(segment),
            };
        }
        current
    }

    fn derive(&self, name: &str) -> FsEntry {
        FsEntry::new(
            self.internal.join(name),
            self.external.as_ref().map(|e| e.join(name)),
        )
    }
}

/// The imported (read) and exported (write) roots one module works against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleFilesystem {
    pub imported: FsEntry,
    pub exported: FsEntry,
}

impl ModuleFilesystem {
    pub fn new(imported: FsEntry, exported: FsEntry) -> Self {
        Self { imported, exported }
    }

    /// A filesystem without any disk binding, used when simulating.
    pub fn unbound() -> Self {
        Self::new(FsEntry::new("imported", None), FsEntry::new("exported", None))
    }

    /// Both roots narrowed to `name`.
    pub fn subsystem(&self, name: &str) -> ModuleFilesystem {
        ModuleFilesystem {
            imported: self.imported.resolve(name),
            exported: self.exported.resolve(name),
        }
    }
}
