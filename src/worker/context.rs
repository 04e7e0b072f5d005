// src/worker/context.rs

//! Explicit run context threaded through every worker.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::cache::CacheRegistry;
use crate::errors::Result;
use crate::fs::FileSystem;
use crate::params::{Parameter, ParameterRegistry};
use crate::tree::{NodeId, NodePath};
use crate::types::{ExecutionMode, SkipPolicy};

/// Everything a run shares: mode, skip settings, parameters, caches and
/// the filesystem. Independent runs use independent contexts.
pub struct RunContext {
    mode: ExecutionMode,
    request_skipping: bool,
    skip_policy: SkipPolicy,
    parameters: Arc<ParameterRegistry>,
    caches: Arc<CacheRegistry>,
    fs: Arc<dyn FileSystem>,
}

impl RunContext {
    pub fn new(
        mode: ExecutionMode,
        parameters: ParameterRegistry,
        fs: Arc<dyn FileSystem>,
    ) -> Self {
        Self {
            mode,
            request_skipping: false,
            skip_policy: SkipPolicy::default(),
            parameters: Arc::new(parameters),
            caches: Arc::new(CacheRegistry::new()),
            fs,
        }
    }

    pub fn with_skipping(mut self, request_skipping: bool, policy: SkipPolicy) -> Self {
        self.request_skipping = request_skipping;
        self.skip_policy = policy;
        self
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    pub fn is_simulating(&self) -> bool {
        self.mode.is_simulating()
    }

    pub fn request_skipping(&self) -> bool {
        self.request_skipping
    }

    pub fn skip_policy(&self) -> SkipPolicy {
        self.skip_policy
    }

    pub fn parameters(&self) -> &Arc<ParameterRegistry> {
        &self.parameters
    }

    pub fn caches(&self) -> &Arc<CacheRegistry> {
        &self.caches
    }

    pub fn fs(&self) -> &Arc<dyn FileSystem> {
        &self.fs
    }

    pub fn query<T: DeserializeOwned + Default>(&self, param: &Parameter<T>) -> Result<T> {
        param.query(&self.parameters, self.mode)
    }
}

impl fmt::Debug for RunContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunContext")
            .field("mode", &self.mode)
            .field("request_skipping", &self.request_skipping)
            .field("skip_policy", &self.skip_policy)
            .field("caches", &self.caches.len())
            .finish_non_exhaustive()
    }
}

/// The run context as seen by one task, plus where that task sits.
#[derive(Debug, Clone)]
pub struct TaskContext {
    run: Arc<RunContext>,
    node: NodeId,
    global_path: NodePath,
    sample_path: NodePath,
    algorithm_path: NodePath,
}

impl TaskContext {
    pub fn new(
        run: Arc<RunContext>,
        node: NodeId,
        global_path: NodePath,
        sample_path: NodePath,
        algorithm_path: NodePath,
    ) -> Self {
        Self {
            run,
            node,
            global_path,
            sample_path,
            algorithm_path,
        }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn global_path(&self) -> &NodePath {
        &self.global_path
    }

    pub fn sample_path(&self) -> &NodePath {
        &self.sample_path
    }

    pub fn algorithm_path(&self) -> &NodePath {
        &self.algorithm_path
    }

    pub fn mode(&self) -> ExecutionMode {
        self.run.mode()
    }

    pub fn is_simulating(&self) -> bool {
        self.run.is_simulating()
    }

    pub fn request_skipping(&self) -> bool {
        self.run.request_skipping()
    }

    pub fn parameters(&self) -> &ParameterRegistry {
        self.run.parameters()
    }

    pub fn caches(&self) -> &CacheRegistry {
        self.run.caches()
    }

    pub fn fs(&self) -> &dyn FileSystem {
        self.run.fs().as_ref()
    }

    pub fn query<T: DeserializeOwned + Default>(&self, param: &Parameter<T>) -> Result<T> {
        self.run.query(param)
    }
}
