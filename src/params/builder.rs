// src/params/builder.rs

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::errors::Result;
use crate::tree::NodePath;
use crate::types::ExecutionMode;
use crate::worker::BlueprintList;

use super::Parameter;
use super::registry::ParameterRegistry;

const RUNTIME_SEGMENT: &str = "runtime";

/// Declares parameters on behalf of one worker.
///
/// - algorithm parameters live under the worker's algorithm path and are
///   shared by every sample;
/// - sample parameters live under `samples/<sample>/...`;
/// - runtime parameters live under `runtime/...`.
#[derive(Debug, Clone)]
pub struct ParameterBuilder {
    registry: Arc<ParameterRegistry>,
    mode: ExecutionMode,
    algorithm_path: NodePath,
    sample_path: NodePath,
}

impl ParameterBuilder {
    pub fn new(
        registry: Arc<ParameterRegistry>,
        mode: ExecutionMode,
        algorithm_path: NodePath,
        sample_path: NodePath,
    ) -> Self {
        Self {
            registry,
            mode,
            algorithm_path,
            sample_path,
        }
    }

    pub fn registry(&self) -> &ParameterRegistry {
        &self.registry
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    pub fn algorithm_path(&self) -> &NodePath {
        &self.algorithm_path
    }

    pub fn sample_path(&self) -> &NodePath {
        &self.sample_path
    }

    pub fn algorithm_parameter<T>(&mut self, name: &str, default: T) -> Result<Parameter<T>>
    where
        T: Serialize + DeserializeOwned + Default,
    {
        let path = self.algorithm_path.join(name).to_vec();
        self.optional(path, default)
    }

    pub fn required_algorithm_parameter<T>(&mut self, name: &str) -> Result<Parameter<T>>
    where
        T: Serialize + DeserializeOwned + Default,
    {
        let path = self.algorithm_path.join(name).to_vec();
        self.required(path)
    }

    pub fn sample_parameter<T>(&mut self, name: &str, default: T) -> Result<Parameter<T>>
    where
        T: Serialize + DeserializeOwned + Default,
    {
        let path = self.sample_path.join(name).to_vec();
        self.optional(path, default)
    }

    pub fn required_sample_parameter<T>(&mut self, name: &str) -> Result<Parameter<T>>
    where
        T: Serialize + DeserializeOwned + Default,
    {
        let path = self.sample_path.join(name).to_vec();
        self.required(path)
    }

    pub fn runtime_parameter<T>(&mut self, name: &str, default: T) -> Result<Parameter<T>>
    where
        T: Serialize + DeserializeOwned + Default,
    {
        let path = vec![RUNTIME_SEGMENT.to_string(), name.to_string()];
        self.optional(path, default)
    }

    /// An algorithm parameter choosing one of the listed blueprints by name.
    pub fn blueprint_choice(
        &mut self,
        name: &str,
        blueprints: &BlueprintList,
        default: Option<&str>,
    ) -> Result<Parameter<String>> {
        let path = self.algorithm_path.join(name).to_vec();
        let allowed = blueprints.names().map(|n| Value::String(n.to_string()));

        let mut entry = self.registry.register_parameter(&path);
        let node = entry.node();
        match default {
            Some(d) => node.declare_optional(Value::String(d.to_string())),
            None => node.declare_required(&Value::String(String::new())),
        };
        node.allow_values(allowed)
            .document_title(name.to_string());
        Ok(Parameter::new(path))
    }

    fn optional<T>(&mut self, path: Vec<String>, default: T) -> Result<Parameter<T>>
    where
        T: Serialize + DeserializeOwned + Default,
    {
        let default = serde_json::to_value(default)?;
        self.registry
            .register_parameter(&path)
            .node()
            .declare_optional(default);
        Ok(Parameter::new(path))
    }

    fn required<T>(&mut self, path: Vec<String>) -> Result<Parameter<T>>
    where
        T: Serialize + DeserializeOwned + Default,
    {
        let sample = serde_json::to_value(T::default())?;
        self.registry
            .register_parameter(&path)
            .node()
            .declare_required(&sample);
        Ok(Parameter::new(path))
    }
}
