// src/tree/node.rs

use std::collections::BTreeSet;
use std::fmt;
use std::sync::OnceLock;

use tracing::trace;

use crate::errors::{PipelineError, Result};
use crate::worker::{Worker, WorkerKind};

use super::path::NodePath;
use super::status::WorkerStatus;

pub const SAMPLES_SEGMENT: &str = "samples";
pub const ALGORITHM_SEGMENT: &str = "algorithm";

/// Stable handle of a node inside one [`WorkTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One element of the work tree.
#[derive(Debug)]
pub struct WorkNode {
    name: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    dependencies: BTreeSet<NodeId>,
    status: WorkerStatus,
    kind: WorkerKind,
    sample_root: bool,
    /// `None` while the worker is checked out for execution.
    worker: Option<Worker>,
    global_path: OnceLock<NodePath>,
    sample_path: OnceLock<NodePath>,
    algorithm_path: OnceLock<NodePath>,
}

impl WorkNode {
    fn new(name: String, parent: Option<NodeId>, worker: Worker) -> Self {
        Self {
            name,
            parent,
            children: Vec::new(),
            dependencies: BTreeSet::new(),
            status: WorkerStatus::Undone,
            kind: worker.kind(),
            sample_root: worker.is_sample_root(),
            worker: Some(worker),
            global_path: OnceLock::new(),
            sample_path: OnceLock::new(),
            algorithm_path: OnceLock::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn dependencies(&self) -> &BTreeSet<NodeId> {
        &self.dependencies
    }

    pub fn status(&self) -> WorkerStatus {
        self.status
    }

    pub fn kind(&self) -> WorkerKind {
        self.kind
    }

    pub fn is_sample_root(&self) -> bool {
        self.sample_root
    }

    pub fn worker(&self) -> Option<&Worker> {
        self.worker.as_ref()
    }

    pub fn worker_mut(&mut self) -> Option<&mut Worker> {
        self.worker.as_mut()
    }
}

/// A recorded status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub node: NodeId,
    pub from: WorkerStatus,
    pub to: WorkerStatus,
}

/// Append-only arena of [`WorkNode`]s. Node 0 is the root.
#[derive(Debug)]
pub struct WorkTree {
    nodes: Vec<WorkNode>,
    journal: Vec<Transition>,
}

impl WorkTree {
    pub fn new(root_name: impl Into<String>, root: Worker) -> Self {
        Self {
            nodes: vec![WorkNode::new(root_name.into(), None, root)],
            journal: Vec::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// All ids in creation order. Parents always precede their children.
    pub fn ids(&self) -> impl DoubleEndedIterator<Item = NodeId> + use<> {
        (0..self.nodes.len()).map(NodeId)
    }

    pub fn node(&self, id: NodeId) -> Result<&WorkNode> {
        self.nodes
            .get(id.0)
            .ok_or(PipelineError::UnknownNode(id.0))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut WorkNode> {
        self.nodes
            .get_mut(id.0)
            .ok_or(PipelineError::UnknownNode(id.0))
    }

    /// Look a node up by its global path, e.g. `"root/sample-a/ingest"`.
    pub fn find(&self, global_path: &str) -> Option<NodeId> {
        self.ids()
            .find(|&id| self.global_path(id).to_string() == global_path)
    }

    /// Append a child below `parent`. Names are unique among siblings.
    pub fn create_child(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        worker: Worker,
    ) -> Result<NodeId> {
        let name = name.into();
        let siblings = self.node(parent)?.children.clone();
        if siblings.iter().any(|&c| self.nodes[c.0].name == name) {
            return Err(PipelineError::DuplicateSibling {
                parent: self.global_path(parent).to_string(),
                name,
            });
        }

        let id = NodeId(self.nodes.len());
        self.nodes.push(WorkNode::new(name, Some(parent), worker));
        self.node_mut(parent)?.children.push(id);
        trace!(node = %self.global_path(id), "created node");
        Ok(id)
    }

    /// Add upstream dependencies to a node that has not been scheduled yet.
    ///
    /// A node may not depend on itself or on one of its ancestors, since an
    /// ancestor is only done once all of its descendants are.
    pub fn add_dependencies(
        &mut self,
        id: NodeId,
        dependencies: impl IntoIterator<Item = NodeId>,
    ) -> Result<()> {
        if self.node(id)?.status != WorkerStatus::Undone {
            return Err(PipelineError::InvalidDependency {
                node: self.global_path(id).to_string(),
                dependency: "*".to_string(),
                reason: "the node has already been scheduled",
            });
        }
        for dep in dependencies {
            self.node(dep)?;
            let reason = if dep == id {
                Some("a node cannot depend on itself")
            } else if self.is_ancestor(dep, id) {
                Some("a node cannot depend on its own ancestor")
            } else {
                None
            };
            if let Some(reason) = reason {
                return Err(PipelineError::InvalidDependency {
                    node: self.global_path(id).to_string(),
                    dependency: self.global_path(dep).to_string(),
                    reason,
                });
            }
            self.nodes[id.0].dependencies.insert(dep);
        }
        Ok(())
    }

    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = self.nodes.get(node.0).and_then(|n| n.parent);
        while let Some(p) = current {
            if p == ancestor {
                return true;
            }
            current = self.nodes[p.0].parent;
        }
        false
    }

    pub fn dependencies_done(&self, id: NodeId) -> bool {
        self.nodes[id.0]
            .dependencies
            .iter()
            .all(|d| self.nodes[d.0].status.is_done())
    }

    pub fn children_done(&self, id: NodeId) -> bool {
        self.nodes[id.0]
            .children
            .iter()
            .all(|c| self.nodes[c.0].status.is_done())
    }

    /// # Panics
    /// If `id` was not minted by this tree.
    pub fn status(&self, id: NodeId) -> WorkerStatus {
        self.nodes[id.0].status
    }

    pub fn count_status(&self, status: WorkerStatus) -> usize {
        self.nodes.iter().filter(|n| n.status == status).count()
    }

    pub fn is_complete(&self) -> bool {
        self.nodes.iter().all(|n| n.status.is_done())
    }

    /// Move a node to `to`, rejecting transitions the state machine forbids.
    pub fn set_status(&mut self, id: NodeId, to: WorkerStatus) -> Result<()> {
        let from = self.node(id)?.status;
        if !from.can_transition_to(to) {
            return Err(PipelineError::InvalidTransition {
                node: self.global_path(id).to_string(),
                from,
                to,
            });
        }
        self.nodes[id.0].status = to;
        self.journal.push(Transition { node: id, from, to });
        trace!(node = %self.global_path(id), %from, %to, "status changed");
        Ok(())
    }

    /// Every status change so far, in order.
    pub fn journal(&self) -> &[Transition] {
        &self.journal
    }

    pub fn take_worker(&mut self, id: NodeId) -> Result<Worker> {
        let path = self.global_path(id).to_string();
        self.node_mut(id)?.worker.take().ok_or_else(|| {
            PipelineError::Other(anyhow::anyhow!("worker of {path} is already checked out"))
        })
    }

    pub fn restore_worker(&mut self, id: NodeId, worker: Worker) -> Result<()> {
        self.node_mut(id)?.worker = Some(worker);
        Ok(())
    }

    pub fn worker_mut(&mut self, id: NodeId) -> Option<&mut Worker> {
        self.nodes.get_mut(id.0).and_then(|n| n.worker.as_mut())
    }

    /// Names from the root down to `id`.
    ///
    /// # Panics
    /// If `id` was not minted by this tree.
    pub fn global_path(&self, id: NodeId) -> &NodePath {
        let node = &self.nodes[id.0];
        node.global_path.get_or_init(|| match node.parent {
            None => NodePath::new(vec![node.name.clone()]),
            Some(parent) => self.global_path(parent).join(&node.name),
        })
    }

    /// `samples/<sample>` below the nearest sample root, empty elsewhere.
    ///
    /// # Panics
    /// If `id` was not minted by this tree.
    pub fn sample_path(&self, id: NodeId) -> &NodePath {
        let node = &self.nodes[id.0];
        node.sample_path.get_or_init(|| match node.parent {
            None => NodePath::default(),
            Some(parent) if self.nodes[parent.0].sample_root => NodePath::new(vec![
                SAMPLES_SEGMENT.to_string(),
                node.name.clone(),
            ]),
            Some(parent) => self.sample_path(parent).clone(),
        })
    }

    /// Position-invariant path used to key parameters shared by all samples.
    ///
    /// # Panics
    /// If `id` was not minted by this tree.
    pub fn algorithm_path(&self, id: NodeId) -> &NodePath {
        let node = &self.nodes[id.0];
        node.algorithm_path.get_or_init(|| match node.parent {
            None => NodePath::new(vec![ALGORITHM_SEGMENT.to_string()]),
            Some(parent) if self.nodes[parent.0].sample_root => {
                self.algorithm_path(parent).clone()
            }
            Some(parent) => self.algorithm_path(parent).join(&node.name),
        })
    }
}
