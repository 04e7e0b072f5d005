// src/cache/backend.rs

use crate::errors::CacheError;

/// Storage behind a [`Cache`](super::Cache).
///
/// Implementations are only ever touched through the cache's lock, so the
/// methods take plain `&self` / `&mut self`.
pub trait CacheBackend: Send + Sync {
    type Value: Default + Send + Sync;

    /// A value is resident in memory.
    fn has(&self) -> bool;

    /// An external source exists that `pull` could load from.
    fn can_pull(&self) -> bool;

    /// Load from the source. Must be cheap to call redundantly.
    fn pull(&mut self) -> Result<(), CacheError>;

    /// Persist the resident value to the source.
    fn push(&mut self) -> Result<(), CacheError>;

    /// Drop the resident value. Safe on an empty cache.
    fn stash(&mut self);

    /// The resident value, or the type default if nothing is resident.
    fn get(&self) -> &Self::Value;
    fn get_mut(&mut self) -> &mut Self::Value;
    fn set(&mut self, value: Self::Value);
}

/// A value plus whether it is actually loaded. Shared by the bundled
/// backends.
#[derive(Debug, Default)]
pub struct Slot<V> {
    value: V,
    loaded: bool,
}

impl<V: Default> Slot<V> {
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn get(&self) -> &V {
        &self.value
    }

    pub fn get_mut(&mut self) -> &mut V {
        self.loaded = true;
        &mut self.value
    }

    pub fn set(&mut self, value: V) {
        self.value = value;
        self.loaded = true;
    }

    pub fn clear(&mut self) {
        self.value = V::default();
        self.loaded = false;
    }
}
