#![allow(dead_code)]

pub use pipetree_test_utils::builders;
pub use pipetree_test_utils::fake_executor;
pub use pipetree_test_utils::{init_tracing, test_context, test_context_with, with_timeout};

use pipetree::tree::{NodeId, WorkTree};
use pipetree::worker::{Worker, WorkerKind};

use self::builders::{FnDispatcher, FnTask};

/// A tree whose root dispatcher builds nothing; children are added by hand.
pub fn bare_tree() -> WorkTree {
    WorkTree::new(
        "root",
        Worker::dispatcher(FnDispatcher::new(|_, _| Ok(()), |_| Ok(()))),
    )
}

/// Add `names` as plain tasks below `parent`.
pub fn add_tasks(tree: &mut WorkTree, parent: NodeId, names: &[&str]) -> Vec<NodeId> {
    names
        .iter()
        .map(|name| {
            tree.create_child(parent, *name, Worker::task(FnTask::done()))
                .unwrap()
        })
        .collect()
}

pub fn node_by_path(tree: &WorkTree, path: &str) -> NodeId {
    tree.find(path)
        .unwrap_or_else(|| panic!("no node at {path}"))
}

pub fn task_nodes(tree: &WorkTree) -> Vec<NodeId> {
    tree.ids()
        .filter(|&id| tree.node(id).unwrap().kind() == WorkerKind::Task)
        .collect()
}
