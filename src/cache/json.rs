// src/cache/json.rs

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::errors::CacheError;
use crate::fs::FileSystem;

use super::backend::{CacheBackend, Slot};

/// A value persisted as a pretty-printed JSON file.
///
/// Without a file path (e.g. in simulation) it behaves like a memory cache.
#[derive(Debug)]
pub struct JsonFileCache<V> {
    fs: Arc<dyn FileSystem>,
    path: Option<PathBuf>,
    slot: Slot<V>,
}

impl<V: Default> JsonFileCache<V> {
    pub fn new(fs: Arc<dyn FileSystem>, path: Option<PathBuf>) -> Self {
        Self {
            fs,
            path,
            slot: Slot::default(),
        }
    }

    pub fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }
}

impl<V> CacheBackend for JsonFileCache<V>
where
    V: Serialize + DeserializeOwned + Default + Send + Sync,
{
    type Value = V;

    fn has(&self) -> bool {
        self.slot.is_loaded()
    }

    fn can_pull(&self) -> bool {
        self.path.as_deref().is_some_and(|p| self.fs.is_file(p))
    }

    fn pull(&mut self) -> Result<(), CacheError> {
        if self.slot.is_loaded() {
            return Ok(());
        }
        let Some(path) = self.path.as_deref() else {
            return Ok(());
        };
        if !self.fs.is_file(path) {
            return Ok(());
        }
        let path_str = path.display().to_string();
        let text = self.fs.read_to_string(path).map_err(|cause| CacheError::Io {
            path: path_str.clone(),
            cause,
        })?;
        let value = serde_json::from_str(&text).map_err(|source| CacheError::Json {
            path: path_str.clone(),
            source,
        })?;
        debug!(path = %path_str, "pulled json cache");
        self.slot.set(value);
        Ok(())
    }

    fn push(&mut self) -> Result<(), CacheError> {
        let Some(path) = self.path.as_deref() else {
            return Ok(());
        };
        let display = path.display().to_string();
        let text = serde_json::to_vec_pretty(self.slot.get()).map_err(|source| {
            CacheError::Json {
                path: display.clone(),
                source,
            }
        })?;
        self.fs
            .write(path, &text)
            .map_err(|cause| CacheError::Io { path: display, cause })
    }

    fn stash(&mut self) {
        if self.path.is_some() {
            self.slot.clear();
        }
    }

    fn get(&self) -> &V {
        self.slot.get()
    }

    fn get_mut(&mut self) -> &mut V {
        self.slot.get_mut()
    }

    fn set(&mut self, value: V) {
        self.slot.set(value);
    }
}
