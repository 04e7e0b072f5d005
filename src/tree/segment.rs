// src/tree/segment.rs

//! Dependency composition.
//!
//! [`Group`] gates every member on the same fixed set (fan-out);
//! [`Chain`] makes each member depend on everything inserted before it.
//!
//! Both lock the first time their [`to_dependencies`] summary is taken.
//! After that, inserting more members would silently under-constrain
//! whoever captured the summary, so it fails instead.
//!
//! [`to_dependencies`]: DependencySegment::to_dependencies

use std::cell::Cell;
use std::collections::BTreeSet;

use crate::errors::{PipelineError, Result};

use super::node::{NodeId, WorkTree};

/// Anything another node can wait on.
pub trait DependencySegment {
    /// The set a dependent of this whole segment must wait for.
    fn to_dependencies(&self) -> BTreeSet<NodeId>;
}

/// Segments that assign dependencies to freshly created nodes.
pub trait InsertSegment {
    fn insert(&mut self, tree: &mut WorkTree, node: NodeId) -> Result<()>;
}

impl DependencySegment for NodeId {
    fn to_dependencies(&self) -> BTreeSet<NodeId> {
        BTreeSet::from([*self])
    }
}

fn union(segments: &[&dyn DependencySegment]) -> BTreeSet<NodeId> {
    segments
        .iter()
        .flat_map(|s| s.to_dependencies())
        .collect()
}

/// Fan-out with a common gate.
#[derive(Debug, Default)]
pub struct Group {
    dependencies: BTreeSet<NodeId>,
    members: BTreeSet<NodeId>,
    locked: Cell<bool>,
}

impl Group {
    pub fn new(segments: &[&dyn DependencySegment]) -> Self {
        Self {
            dependencies: union(segments),
            ..Self::default()
        }
    }

    /// Widen the gate. Only allowed before the first member is inserted.
    pub fn add_dependency(&mut self, segment: &dyn DependencySegment) -> Result<()> {
        if self.locked.get() {
            return Err(PipelineError::SegmentLocked { kind: "Group" });
        }
        if !self.members.is_empty() {
            return Err(PipelineError::GroupAlreadyAssigned);
        }
        self.dependencies.extend(segment.to_dependencies());
        Ok(())
    }

    pub fn dependencies(&self) -> &BTreeSet<NodeId> {
        &self.dependencies
    }

    pub fn is_locked(&self) -> bool {
        self.locked.get()
    }
}

impl InsertSegment for Group {
    fn insert(&mut self, tree: &mut WorkTree, node: NodeId) -> Result<()> {
        if self.locked.get() {
            return Err(PipelineError::SegmentLocked { kind: "Group" });
        }
        tree.add_dependencies(node, self.dependencies.iter().copied())?;
        self.members.insert(node);
        Ok(())
    }
}

impl DependencySegment for Group {
    fn to_dependencies(&self) -> BTreeSet<NodeId> {
        self.locked.set(true);
        self.dependencies.union(&self.members).copied().collect()
    }
}

/// Sequential pipeline stage.
#[derive(Debug, Default)]
pub struct Chain {
    consecutive: BTreeSet<NodeId>,
    locked: Cell<bool>,
}

impl Chain {
    pub fn new(segments: &[&dyn DependencySegment]) -> Self {
        Self {
            consecutive: union(segments),
            locked: Cell::new(false),
        }
    }

    /// Add to the set every following member waits for.
    pub fn add_dependency(&mut self, segment: &dyn DependencySegment) -> Result<()> {
        if self.locked.get() {
            return Err(PipelineError::SegmentLocked { kind: "Chain" });
        }
        self.consecutive.extend(segment.to_dependencies());
        Ok(())
    }

    pub fn is_locked(&self) -> bool {
        self.locked.get()
    }
}

impl InsertSegment for Chain {
    fn insert(&mut self, tree: &mut WorkTree, node: NodeId) -> Result<()> {
        if self.locked.get() {
            return Err(PipelineError::SegmentLocked { kind: "Chain" });
        }
        tree.add_dependencies(node, self.consecutive.iter().copied())?;
        self.consecutive.insert(node);
        Ok(())
    }
}

impl DependencySegment for Chain {
    fn to_dependencies(&self) -> BTreeSet<NodeId> {
        self.locked.set(true);
        self.consecutive.clone()
    }
}
