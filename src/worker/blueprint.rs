// src/worker/blueprint.rs

//! Blueprints: named, type-erased factories for child workers.
//!
//! A dispatcher lists its possible children in a [`BlueprintList`] while it
//! is prepared, then instantiates the ones it needs through a [`Builder`]
//! when it executes.

use std::any::{Any, TypeId};
use std::ops::{Deref, DerefMut};

use tracing::debug;

use crate::errors::{PipelineError, Result};
use crate::tree::{InsertSegment, NodeId, WorkTree};
use crate::types::ExecutionMode;

use super::context::RunContext;
use super::dispatcher::Dispatcher;
use super::task::Task;
use super::Worker;

type Factory = Box<dyn Fn() -> Worker + Send>;

pub struct Blueprint {
    name: String,
    type_id: TypeId,
    type_name: &'static str,
    factory: Factory,
    allow_multi_instancing: bool,
    instantiated: bool,
}

impl Blueprint {
    pub fn task<T: Task>(name: impl Into<String>, factory: impl Fn() -> T + Send + 'static) -> Self {
        Self::erased::<T>(name.into(), Box::new(move || Worker::task(factory())))
    }

    pub fn dispatcher<D: Dispatcher>(
        name: impl Into<String>,
        factory: impl Fn() -> D + Send + 'static,
    ) -> Self {
        Self::erased::<D>(name.into(), Box::new(move || Worker::dispatcher(factory())))
    }

    fn erased<T: Any>(name: String, factory: Factory) -> Self {
        Self {
            name,
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            factory,
            allow_multi_instancing: false,
            instantiated: false,
        }
    }

    /// Allow this blueprint to back more than one node.
    pub fn multi_instance(mut self) -> Self {
        self.allow_multi_instancing = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn allows_multi_instancing(&self) -> bool {
        self.allow_multi_instancing
    }

    pub fn is_instantiated(&self) -> bool {
        self.instantiated
    }
}

impl std::fmt::Debug for Blueprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Blueprint")
            .field("name", &self.name)
            .field("type", &self.type_name)
            .field("allow_multi_instancing", &self.allow_multi_instancing)
            .field("instantiated", &self.instantiated)
            .finish()
    }
}

/// The declared menu of children of one dispatcher, in declaration order.
#[derive(Debug, Default)]
pub struct BlueprintList {
    blueprints: Vec<Blueprint>,
}

impl BlueprintList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, blueprint: Blueprint) -> Result<()> {
        if self.get(blueprint.name()).is_some() {
            return Err(PipelineError::DuplicateBlueprint(blueprint.name));
        }
        self.blueprints.push(blueprint);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Blueprint> {
        self.blueprints.iter().find(|b| b.name == name)
    }

    fn get_mut(&mut self, name: &str) -> Option<&mut Blueprint> {
        self.blueprints.iter_mut().find(|b| b.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.blueprints.iter().map(|b| b.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.blueprints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blueprints.is_empty()
    }
}

/// A freshly built child, typed. Derefs to the concrete worker.
pub struct Built<'b, T> {
    node: NodeId,
    worker: &'b mut T,
}

impl<T> Built<'_, T> {
    pub fn node(&self) -> NodeId {
        self.node
    }
}

impl<T> Deref for Built<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.worker
    }
}

impl<T> DerefMut for Built<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.worker
    }
}

/// Instantiates blueprints as children of one dispatcher node.
pub struct Builder<'a> {
    tree: &'a mut WorkTree,
    parent: NodeId,
    blueprints: &'a mut BlueprintList,
    ctx: &'a RunContext,
    created: Vec<NodeId>,
}

impl<'a> Builder<'a> {
    pub fn new(
        tree: &'a mut WorkTree,
        parent: NodeId,
        blueprints: &'a mut BlueprintList,
        ctx: &'a RunContext,
    ) -> Self {
        Self {
            tree,
            parent,
            blueprints,
            ctx,
            created: Vec::new(),
        }
    }

    pub fn context(&self) -> &RunContext {
        self.ctx
    }

    pub fn mode(&self) -> ExecutionMode {
        self.ctx.mode()
    }

    pub fn parent(&self) -> NodeId {
        self.parent
    }

    pub fn tree(&self) -> &WorkTree {
        self.tree
    }

    pub fn tree_mut(&mut self) -> &mut WorkTree {
        self.tree
    }

    pub fn blueprints(&self) -> &BlueprintList {
        self.blueprints
    }

    /// Children created through this builder, in order.
    pub fn created(&self) -> &[NodeId] {
        &self.created
    }

    pub(crate) fn into_created(self) -> Vec<NodeId> {
        self.created
    }

    /// Instantiate `blueprint` as a node of the same name, checking that it
    /// builds a `T`.
    pub fn build<T: Any>(&mut self, blueprint: &str) -> Result<Built<'_, T>> {
        self.build_as(blueprint, blueprint)
    }

    /// Like [`build`](Self::build) with an explicit node name; the way to
    /// create several nodes from one multi-instance blueprint.
    pub fn build_as<T: Any>(&mut self, blueprint: &str, node_name: &str) -> Result<Built<'_, T>> {
        let expected = (TypeId::of::<T>(), std::any::type_name::<T>());
        let node = self.instantiate(blueprint, node_name, Some(expected))?;
        let worker = self
            .tree
            .worker_mut(node)
            .and_then(Worker::downcast_mut::<T>)
            .ok_or_else(|| PipelineError::BlueprintTypeMismatch {
                name: blueprint.to_string(),
                expected: expected.1,
                actual: "an unrelated worker",
            })?;
        Ok(Built { node, worker })
    }

    /// Build a `T` and insert it into `segment` in one go.
    pub fn build_in<T: Any>(
        &mut self,
        blueprint: &str,
        segment: &mut dyn InsertSegment,
    ) -> Result<NodeId> {
        let node = self.build::<T>(blueprint)?.node();
        segment.insert(self.tree, node)?;
        Ok(node)
    }

    /// Instantiate without a type check.
    pub fn dispatch(&mut self, blueprint: &str) -> Result<NodeId> {
        self.instantiate(blueprint, blueprint, None)
    }

    pub fn dispatch_as(&mut self, blueprint: &str, node_name: &str) -> Result<NodeId> {
        self.instantiate(blueprint, node_name, None)
    }

    /// Instantiate every registered blueprint exactly once.
    pub fn dispatch_all(&mut self) -> Result<Vec<NodeId>> {
        let names: Vec<String> = self.blueprints.names().map(String::from).collect();
        names.iter().map(|name| self.dispatch(name)).collect()
    }

    pub fn insert(&mut self, segment: &mut dyn InsertSegment, node: NodeId) -> Result<()> {
        segment.insert(self.tree, node)
    }

    fn instantiate(
        &mut self,
        blueprint: &str,
        node_name: &str,
        expected: Option<(TypeId, &'static str)>,
    ) -> Result<NodeId> {
        let bp = self
            .blueprints
            .get_mut(blueprint)
            .ok_or_else(|| PipelineError::UnknownBlueprint(blueprint.to_string()))?;

        if let Some((type_id, type_name)) = expected {
            if bp.type_id != type_id {
                return Err(PipelineError::BlueprintTypeMismatch {
                    name: bp.name.clone(),
                    expected: type_name,
                    actual: bp.type_name,
                });
            }
        }
        if bp.is_instantiated() && !bp.allows_multi_instancing() {
            return Err(PipelineError::BlueprintReinstantiated(bp.name.clone()));
        }

        let worker = (bp.factory)();
        let node = self.tree.create_child(self.parent, node_name, worker)?;
        bp.instantiated = true;
        self.created.push(node);
        debug!(
            parent = %self.tree.global_path(self.parent),
            blueprint,
            node = node_name,
            "instantiated blueprint"
        );
        Ok(node)
    }
}
