// src/fs/importer.rs

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::debug;

use super::{FileSystem, FsEntry, ModuleFilesystem};

/// Builds a [`ModuleFilesystem`] from an input and an output directory.
///
/// Every directory below `input` becomes an imported entry; the exported
/// side is created on demand.
#[derive(Debug, Clone)]
pub struct DirectoriesImporter {
    input: PathBuf,
    output: PathBuf,
}

impl DirectoriesImporter {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
        }
    }

    pub fn import(&self, fs: &dyn FileSystem) -> Result<ModuleFilesystem> {
        if !fs.is_dir(&self.input) {
            anyhow::bail!("input directory {:?} does not exist", self.input);
        }
        let mut imported = FsEntry::new("imported", Some(self.input.clone()));
        discover(fs, &mut imported)?;

        fs.create_dir_all(&self.output)
            .with_context(|| format!("preparing output directory {:?}", self.output))?;
        let exported = FsEntry::new("exported", Some(self.output.clone()));

        Ok(ModuleFilesystem::new(imported, exported))
    }
}

fn discover(fs: &dyn FileSystem, entry: &mut FsEntry) -> Result<()> {
    let Some(external) = entry.external_path().map(|p| p.to_path_buf()) else {
        return Ok(());
    };
    debug!(internal = %entry.internal_path().display(), external = %external.display(), "importing entry");

    for path in fs.read_dir(&external)? {
        if !fs.is_dir(&path) {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let child = entry.insert_child(name, Some(path.clone()));
        discover(fs, child)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn imports_nested_directories_only() {
        let fs = MockFileSystem::new();
        fs.add_file("/in/a/values.json", "[]");
        fs.add_file("/in/b/deep/values.json", "[]");
        fs.add_file("/in/readme.txt", "");

        let vfs = DirectoriesImporter::new("/in", "/out").import(&fs).unwrap();

        let names: Vec<_> = vfs.imported.children().map(|c| c.name().to_string()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert!(vfs.imported.child("b").and_then(|b| b.child("deep")).is_some());
        assert!(fs.is_dir(Path::new("/out")));
    }

    #[test]
    fn missing_input_is_an_error() {
        let fs = MockFileSystem::new();
        assert!(DirectoriesImporter::new("/nope", "/out").import(&fs).is_err());
    }
}
