// src/cache/registry.rs

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, warn};

use crate::errors::CacheError;

use super::Cache;
use super::backend::CacheBackend;
use super::location::Location;

/// Object-safe view of a cache for end-of-run processing.
pub trait RegisteredCache: Send + Sync {
    fn location(&self) -> &Location;

    /// Persist whatever is still resident and release it.
    fn postprocess(&self) -> Result<(), CacheError>;
}

impl<B: CacheBackend> RegisteredCache for Cache<B> {
    fn location(&self) -> &Location {
        Cache::location(self)
    }

    fn postprocess(&self) -> Result<(), CacheError> {
        self.flush()
    }
}

/// Append-only list of every cache created during setup.
///
/// Guarded by its own mutex, independent of the individual cache locks.
#[derive(Default)]
pub struct CacheRegistry {
    caches: Mutex<Vec<Arc<dyn RegisteredCache>>>,
}

impl fmt::Debug for CacheRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheRegistry")
            .field("len", &self.len())
            .finish()
    }
}

impl CacheRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap `backend` in a cache, register it and hand it back.
    pub fn register<B>(&self, backend: B, location: Location) -> Arc<Cache<B>>
    where
        B: CacheBackend + 'static,
    {
        let cache = Arc::new(Cache::new(backend, location));
        let erased: Arc<dyn RegisteredCache> = cache.clone();
        self.lock().push(erased);
        debug!(cache = %cache.location(), "registered cache");
        cache
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn locations(&self) -> Vec<Location> {
        self.lock().iter().map(|c| c.location().clone()).collect()
    }

    /// Post-process every cache. Failures are logged and counted; the
    /// first one is returned after all caches had their turn.
    pub fn postprocess_all(&self) -> Result<usize, CacheError> {
        let caches: Vec<_> = self.lock().clone();
        let mut first_error = None;
        for cache in &caches {
            if let Err(err) = cache.postprocess() {
                warn!(cache = %cache.location(), error = %err, "cache post-processing failed");
                first_error.get_or_insert(err);
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(caches.len()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Arc<dyn RegisteredCache>>> {
        self.caches.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
