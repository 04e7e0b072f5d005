// src/params/mod.rs

//! Parameters: a JSON document of values plus a schema tree describing
//! every parameter a worker declared.
//!
//! Workers declare parameters through a [`ParameterBuilder`] during
//! preparation, which happens before any work runs. A simulation pass over
//! the whole tree therefore discovers the complete schema.

pub mod builder;
pub mod registry;
pub mod schema;

use std::fmt;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;

pub use builder::ParameterBuilder;
pub use registry::ParameterRegistry;
pub use schema::SchemaNode;

use crate::errors::Result;
use crate::types::ExecutionMode;

/// Typed handle to a declared parameter.
pub struct Parameter<T> {
    path: Vec<String>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Parameter<T> {
    pub(crate) fn new(path: Vec<String>) -> Self {
        Self {
            path,
            _marker: PhantomData,
        }
    }

    pub fn path(&self) -> &[String] {
        &self.path
    }

    pub fn name(&self) -> &str {
        self.path.last().map(String::as_str).unwrap_or_default()
    }
}

impl<T: DeserializeOwned + Default> Parameter<T> {
    pub fn query(&self, registry: &ParameterRegistry, mode: ExecutionMode) -> Result<T> {
        registry.query(&self.path, mode)
    }
}

impl<T> Clone for Parameter<T> {
    fn clone(&self) -> Self {
        Self::new(self.path.clone())
    }
}

impl<T> fmt::Debug for Parameter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parameter")
            .field("path", &self.path.join("/"))
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}
