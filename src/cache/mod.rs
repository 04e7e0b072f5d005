// src/cache/mod.rs

//! Typed caches with lock-guarded access.
//!
//! A [`Cache`] wraps a [`CacheBackend`] in an `RwLock` and only hands out
//! scoped access guards:
//!
//! | access | lock | pulls | on exit |
//! |---|---|---|---|
//! | [`ReadOnlyAccess`] | shared | yes | stash if nobody else holds the lock |
//! | [`ReadWriteAccess`] | exclusive | yes | push, then stash |
//! | [`WriteAccess`] | exclusive | no | push, then stash |
//!
//! Caches are created during module setup and registered with the run's
//! [`CacheRegistry`] so they can be flushed once the run ends.

pub mod access;
pub mod backend;
pub mod json;
pub mod location;
pub mod memory;
pub mod registry;

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

pub use access::{ReadOnlyAccess, ReadWriteAccess, WriteAccess};
pub use backend::{CacheBackend, Slot};
pub use json::JsonFileCache;
pub use location::Location;
pub use memory::MemoryCache;
pub use registry::{CacheRegistry, RegisteredCache};

use crate::errors::CacheError;
use crate::types::ExecutionMode;

#[derive(Debug)]
pub struct Cache<B: CacheBackend> {
    backend: RwLock<B>,
    location: Location,
}

impl<B: CacheBackend> Cache<B> {
    pub fn new(backend: B, location: Location) -> Self {
        Self {
            backend: RwLock::new(backend),
            location,
        }
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    /// True if a reader would find a value, resident or pullable.
    pub fn is_available(&self) -> Result<bool, CacheError> {
        let backend = self.read_lock()?;
        Ok(backend.has() || backend.can_pull())
    }

    /// Shared access. Pulls the value first if it is not resident.
    ///
    /// With nothing resident and nothing to pull, simulation reads the
    /// value type's default while a real run fails.
    pub fn read(&self, mode: ExecutionMode) -> Result<ReadOnlyAccess<'_, B>, CacheError> {
        loop {
            let guard = self.read_lock()?;
            if guard.has() {
                return Ok(ReadOnlyAccess::new(self, guard));
            }
            drop(guard);

            // Loading needs the exclusive lock; re-check under it since
            // another reader may have pulled in between.
            let mut backend = self.write_lock()?;
            if !backend.has() {
                let can_pull = backend.can_pull();
                self.populate(&mut backend, can_pull, mode)?;
            }
        }
    }

    /// Exclusive access with the current value loaded.
    pub fn read_write(&self, mode: ExecutionMode) -> Result<ReadWriteAccess<'_, B>, CacheError> {
        let mut backend = self.write_lock()?;
        if !backend.has() {
            let can_pull = backend.can_pull();
            self.populate(&mut backend, can_pull, mode)?;
        }
        Ok(ReadWriteAccess::new(self, backend))
    }

    /// Exclusive access for a full overwrite. Nothing is pulled.
    pub fn write(&self) -> Result<WriteAccess<'_, B>, CacheError> {
        let backend = self.write_lock()?;
        Ok(WriteAccess::new(self, backend))
    }

    fn populate(
        &self,
        backend: &mut B,
        can_pull: bool,
        mode: ExecutionMode,
    ) -> Result<(), CacheError> {
        if can_pull {
            backend.pull()?;
            if backend.has() {
                return Ok(());
            }
        }
        if mode.is_simulating() {
            backend.set(B::Value::default());
            return Ok(());
        }
        Err(CacheError::NoValue {
            location: self.location.to_string(),
        })
    }

    fn read_lock(&self) -> Result<RwLockReadGuard<'_, B>, CacheError> {
        self.backend.read().map_err(|_| self.poisoned())
    }

    fn write_lock(&self) -> Result<RwLockWriteGuard<'_, B>, CacheError> {
        self.backend.write().map_err(|_| self.poisoned())
    }

    /// Stash if the lock is free right now; never blocks.
    fn try_stash(&self) {
        if let Ok(mut backend) = self.backend.try_write() {
            backend.stash();
        }
    }

    /// Push and stash unconditionally. Used by end-of-run post-processing.
    fn flush(&self) -> Result<(), CacheError> {
        let mut backend = self.backend.write().unwrap_or_else(PoisonError::into_inner);
        if backend.has() {
            backend.push()?;
        }
        backend.stash();
        Ok(())
    }

    fn poisoned(&self) -> CacheError {
        CacheError::Poisoned {
            location: self.location.to_string(),
        }
    }
}
