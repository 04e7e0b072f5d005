// src/tree/graph.rs

//! Whole-tree graph views built with `petgraph`.

use petgraph::algo::toposort;
use petgraph::dot::{Config, Dot};
use petgraph::graph::DiGraph;
use petgraph::graphmap::DiGraphMap;
use petgraph::visit::EdgeRef;

use crate::errors::{PipelineError, Result};
use crate::worker::WorkerKind;

use super::node::WorkTree;

/// Check that the combined wait-for relation has no cycle.
///
/// Edges run from what must finish first to what waits: `dependency ->
/// node` and `child -> parent` (a parent is done only after its children).
pub fn validate_acyclic(tree: &WorkTree) -> Result<()> {
    let mut graph: DiGraphMap<usize, ()> = DiGraphMap::new();

    for id in tree.ids() {
        graph.add_node(id.index());
    }
    for id in tree.ids() {
        let node = tree.node(id)?;
        for dep in node.dependencies() {
            graph.add_edge(dep.index(), id.index(), ());
        }
        if let Some(parent) = node.parent() {
            graph.add_edge(id.index(), parent.index(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => {
            let offender = tree
                .ids()
                .find(|id| id.index() == cycle.node_id())
                .map(|id| tree.global_path(id).to_string())
                .unwrap_or_else(|| format!("#{}", cycle.node_id()));
            Err(PipelineError::DependencyCycle(format!(
                "cycle detected in work graph involving node '{offender}'"
            )))
        }
    }
}

#[derive(Debug)]
struct DotNode {
    label: String,
    kind: WorkerKind,
}

#[derive(Debug, Clone, Copy)]
enum DotEdge {
    Child,
    Dependency,
}

/// Render the tree as Graphviz: solid edges for parent/child, dashed for
/// dependencies, folders for dispatchers and boxes for tasks.
pub fn to_dot(tree: &WorkTree) -> Result<String> {
    let mut graph: DiGraph<DotNode, DotEdge> = DiGraph::new();

    let mut indices = Vec::with_capacity(tree.node_count());
    for id in tree.ids() {
        let node = tree.node(id)?;
        indices.push(graph.add_node(DotNode {
            label: node.name().to_string(),
            kind: node.kind(),
        }));
    }
    for id in tree.ids() {
        let node = tree.node(id)?;
        for child in node.children() {
            graph.add_edge(indices[id.index()], indices[child.index()], DotEdge::Child);
        }
        for dep in node.dependencies() {
            graph.add_edge(indices[dep.index()], indices[id.index()], DotEdge::Dependency);
        }
    }

    let dot = Dot::with_attr_getters(
        &graph,
        &[Config::EdgeNoLabel, Config::NodeNoLabel],
        &|_, edge| match edge.weight() {
            DotEdge::Child => String::new(),
            DotEdge::Dependency => "style=dashed".to_string(),
        },
        &|_, (_, node)| {
            let shape = match node.kind {
                WorkerKind::Dispatcher => "folder",
                WorkerKind::Task => "box",
            };
            format!("label={:?} shape={shape}", node.label)
        },
    );
    Ok(format!("{dot:?}"))
}
