// src/cache/memory.rs

use crate::errors::CacheError;

use super::backend::{CacheBackend, Slot};

/// A value that only ever lives in memory.
///
/// Nothing to pull from, nothing to push to, and stashing would lose the
/// only copy, so it is a no-op.
#[derive(Debug, Default)]
pub struct MemoryCache<V> {
    slot: Slot<V>,
}

impl<V: Default> MemoryCache<V> {
    pub fn new() -> Self {
        Self {
            slot: Slot::default(),
        }
    }

    pub fn with_value(value: V) -> Self {
        let mut slot = Slot::default();
        slot.set(value);
        Self { slot }
    }
}

impl<V: Default + Send + Sync> CacheBackend for MemoryCache<V> {
    type Value = V;

    fn has(&self) -> bool {
        self.slot.is_loaded()
    }

    fn can_pull(&self) -> bool {
        false
    }

    fn pull(&mut self) -> Result<(), CacheError> {
        Ok(())
    }

    fn push(&mut self) -> Result<(), CacheError> {
        Ok(())
    }

    fn stash(&mut self) {}

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
