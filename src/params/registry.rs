// src/params/registry.rs

use std::path::Path;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::errors::{PipelineError, Result};
use crate::fs::FileSystem;
use crate::types::ExecutionMode;

use super::schema::SchemaNode;

/// Key-path → JSON value store plus the schema of declared parameters.
///
/// The value document is fixed for the run; the schema grows as workers
/// declare parameters and is guarded by its own lock.
#[derive(Debug)]
pub struct ParameterRegistry {
    values: Value,
    schema: RwLock<SchemaNode>,
}

/// Write access to one schema node, held for the duration of a declaration.
pub struct SchemaEntry<'a> {
    guard: RwLockWriteGuard<'a, SchemaNode>,
    path: Vec<String>,
}

impl SchemaEntry<'_> {
    pub fn node(&mut self) -> &mut SchemaNode {
        self.guard.resolve_mut(&self.path)
    }
}

impl Default for ParameterRegistry {
    fn default() -> Self {
        Self::new(Value::Object(Map::new()))
    }
}

impl ParameterRegistry {
    pub fn new(values: Value) -> Self {
        Self {
            values,
            schema: RwLock::new(SchemaNode::default()),
        }
    }

    /// Read a JSON parameter document. The top level must be an object.
    pub fn load(fs: &dyn FileSystem, path: &Path) -> Result<Self> {
        let text = fs.read_to_string(path)?;
        let values: Value = serde_json::from_str(&text)?;
        if !values.is_object() {
            return Err(PipelineError::ConfigError(format!(
                "parameter file {:?} must contain a JSON object",
                path
            )));
        }
        Ok(Self::new(values))
    }

    pub fn values(&self) -> &Value {
        &self.values
    }

    /// The value stored at `path`, treating `null` as absent.
    pub fn value_at(&self, path: &[String]) -> Option<&Value> {
        path.iter()
            .try_fold(&self.values, |value, key| value.get(key))
            .filter(|v| !v.is_null())
    }

    /// Create (or reopen) the schema node at `path`.
    pub fn register_parameter(&self, path: &[String]) -> SchemaEntry<'_> {
        let mut guard = self.schema.write().unwrap_or_else(PoisonError::into_inner);
        guard.resolve_mut(path);
        SchemaEntry {
            guard,
            path: path.to_vec(),
        }
    }

    /// Resolve a parameter: stored value, else declared default, else the
    /// type's default when simulating, else an error.
    pub fn query<T: DeserializeOwned + Default>(
        &self,
        path: &[String],
        mode: ExecutionMode,
    ) -> Result<T> {
        let decode = |value: Value| {
            serde_json::from_value(value).map_err(|source| PipelineError::ParameterType {
                path: path.join("/"),
                source,
            })
        };

        if let Some(value) = self.value_at(path) {
            return decode(value.clone());
        }
        let declared_default = self.read_schema().get(path).and_then(|n| n.default.clone());
        if let Some(default) = declared_default {
            return decode(default);
        }
        if mode.is_simulating() {
            return Ok(T::default());
        }
        Err(PipelineError::ParameterMissing(path.join(" / ")))
    }

    pub fn schema(&self) -> SchemaNode {
        self.read_schema().clone()
    }

    pub fn schema_json(&self) -> Value {
        self.read_schema().to_json_schema()
    }

    /// The value document with every declared default filled in.
    pub fn effective_values(&self) -> Value {
        let mut values = self.values.clone();
        fill_defaults(&mut values, &self.read_schema());
        values
    }

    fn read_schema(&self) -> RwLockReadGuard<'_, SchemaNode> {
        self.schema.read().unwrap_or_else(PoisonError::into_inner)
    }
}

fn fill_defaults(value: &mut Value, schema: &SchemaNode) {
    if schema.children.is_empty() {
        return;
    }
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    let Value::Object(map) = value else {
        return;
    };
    for (name, child) in &schema.children {
        match map.get_mut(name) {
            Some(existing) if !existing.is_null() => fill_defaults(existing, child),
            _ => {
                if let Some(default) = &child.default {
                    map.insert(name.clone(), default.clone());
                } else if !child.children.is_empty() {
                    let mut nested = Value::Object(Map::new());
                    fill_defaults(&mut nested, child);
                    map.insert(name.clone(), nested);
                }
            }
        }
    }
}
