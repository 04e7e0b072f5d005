// src/cache/access.rs

use std::sync::{RwLockReadGuard, RwLockWriteGuard};

use tracing::error;

use crate::errors::CacheError;

use super::Cache;
use super::backend::CacheBackend;

/// Shared access. Any number may coexist; writers wait for all of them.
pub struct ReadOnlyAccess<'a, B: CacheBackend> {
    // Field order matters: the guard is released before the stash attempt.
    guard: RwLockReadGuard<'a, B>,
    _release: StashOnRelease<'a, B>,
}

impl<'a, B: CacheBackend> ReadOnlyAccess<'a, B> {
    pub(super) fn new(cache: &'a Cache<B>, guard: RwLockReadGuard<'a, B>) -> Self {
        Self {
            guard,
            _release: StashOnRelease(cache),
        }
    }

    pub fn get(&self) -> &B::Value {
        self.guard.get()
    }
}

struct StashOnRelease<'a, B: CacheBackend>(&'a Cache<B>);

impl<B: CacheBackend> Drop for StashOnRelease<'_, B> {
    fn drop(&mut self) {
        self.0.try_stash();
    }
}

/// Exclusive access with the current value loaded. Pushes on exit.
pub struct ReadWriteAccess<'a, B: CacheBackend> {
    inner: Exclusive<'a, B>,
}

impl<'a, B: CacheBackend> ReadWriteAccess<'a, B> {
    pub(super) fn new(cache: &'a Cache<B>, guard: RwLockWriteGuard<'a, B>) -> Self {
        Self {
            inner: Exclusive::new(cache, guard),
        }
    }

    pub fn get(&self) -> &B::Value {
        self.inner.guard.get()
    }

    pub fn get_mut(&mut self) -> &mut B::Value {
        self.inner.guard.get_mut()
    }

    pub fn set(&mut self, value: B::Value) {
        self.inner.guard.set(value);
    }

    /// Push, stash and release, reporting a failed push.
    ///
    /// Dropping the access does the same but can only log the failure.
    pub fn finish(mut self) -> Result<(), CacheError> {
        self.inner.release()
    }
}

/// Exclusive access for a full overwrite. Pushes on exit.
pub struct WriteAccess<'a, B: CacheBackend> {
    inner: Exclusive<'a, B>,
}

impl<'a, B: CacheBackend> WriteAccess<'a, B> {
    pub(super) fn new(cache: &'a Cache<B>, guard: RwLockWriteGuard<'a, B>) -> Self {
        Self {
            inner: Exclusive::new(cache, guard),
        }
    }

    pub fn set(&mut self, value: B::Value) {
        self.inner.guard.set(value);
    }

    /// See [`ReadWriteAccess::finish`].
    pub fn finish(mut self) -> Result<(), CacheError> {
        self.inner.release()
    }
}

struct Exclusive<'a, B: CacheBackend> {
    cache: &'a Cache<B>,
    guard: RwLockWriteGuard<'a, B>,
    pending: bool,
}

impl<'a, B: CacheBackend> Exclusive<'a, B> {
    fn new(cache: &'a Cache<B>, guard: RwLockWriteGuard<'a, B>) -> Self {
        Self {
            cache,
            guard,
            pending: true,
        }
    }

    /// Push while still holding the lock; stash only after a good push.
    fn release(&mut self) -> Result<(), CacheError> {
        if !self.pending {
            return Ok(());
        }
        self.pending = false;
        if self.guard.has() {
            self.guard.push()?;
        }
        self.guard.stash();
        Ok(())
    }
}

impl<B: CacheBackend> Drop for Exclusive<'_, B> {
    fn drop(&mut self) {
        if let Err(err) = self.release() {
            error!(cache = %self.cache.location(), error = %err, "push on release failed");
        }
    }
}
