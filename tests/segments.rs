// tests/segments.rs

mod common;
use crate::common::{add_tasks, bare_tree};

use std::collections::BTreeSet;

use pipetree::errors::PipelineError;
use pipetree::tree::{Chain, DependencySegment, Group, InsertSegment};

#[test]
fn chain_orders_members_sequentially() {
    let mut tree = bare_tree();
    let root = tree.root();
    let ids = add_tasks(&mut tree, root, &["seed", "a", "b", "c"]);
    let (seed, a, b, c) = (ids[0], ids[1], ids[2], ids[3]);

    let mut chain = Chain::new(&[&seed]);
    for &node in &[a, b, c] {
        chain.insert(&mut tree, node).unwrap();
    }

    let deps = |id| tree.node(id).unwrap().dependencies().clone();
    assert_eq!(deps(a), BTreeSet::from([seed]));
    assert!(deps(b).is_superset(&BTreeSet::from([seed, a])));
    assert!(deps(c).is_superset(&BTreeSet::from([seed, a, b])));
    assert!(!deps(a).contains(&b) && !deps(a).contains(&c));
}

#[test]
fn group_gates_members_on_the_same_seed() {
    let mut tree = bare_tree();
    let root = tree.root();
    let ids = add_tasks(&mut tree, root, &["s1", "s2", "a", "b", "c"]);
    let seed = BTreeSet::from([ids[0], ids[1]]);

    let mut group = Group::new(&[&ids[0]]);
    group.add_dependency(&ids[1]).unwrap();
    for &node in &ids[2..] {
        group.insert(&mut tree, node).unwrap();
    }

    for &node in &ids[2..] {
        assert_eq!(tree.node(node).unwrap().dependencies(), &seed);
    }
    assert_eq!(
        group.to_dependencies(),
        ids.iter().copied().collect::<BTreeSet<_>>()
    );
}

#[test]
fn group_cannot_widen_after_members_joined() {
    let mut tree = bare_tree();
    let root = tree.root();
    let ids = add_tasks(&mut tree, root, &["seed", "a", "late"]);

    let mut group = Group::new(&[&ids[0]]);
    group.insert(&mut tree, ids[1]).unwrap();
    let err = group.add_dependency(&ids[2]).unwrap_err();
    assert!(matches!(err, PipelineError::GroupAlreadyAssigned));
}

#[test]
fn segments_lock_once_consumed() {
    let mut tree = bare_tree();
    let root = tree.root();
    let ids = add_tasks(&mut tree, root, &["a", "b", "c", "d"]);

    let mut chain = Chain::new(&[]);
    chain.insert(&mut tree, ids[0]).unwrap();
    let downstream = Group::new(&[&chain]);
    assert!(chain.is_locked());
    let err = chain.insert(&mut tree, ids[1]).unwrap_err();
    assert!(matches!(err, PipelineError::SegmentLocked { kind: "Chain" }));
    assert!(chain.add_dependency(&ids[3]).is_err());

    let mut group = Group::new(&[]);
    group.insert(&mut tree, ids[2]).unwrap();
    let _ = group.to_dependencies();
    let err = group.insert(&mut tree, ids[3]).unwrap_err();
    assert!(matches!(err, PipelineError::SegmentLocked { kind: "Group" }));

    assert_eq!(downstream.dependencies(), &BTreeSet::from([ids[0]]));
}

#[test]
fn duplicate_sibling_names_are_rejected() {
    let mut tree = bare_tree();
    let root = tree.root();
    add_tasks(&mut tree, root, &["a"]);

    let err = tree
        .create_child(root, "a", pipetree::worker::Worker::task(common::builders::FnTask::done()))
        .unwrap_err();
    assert!(matches!(err, PipelineError::DuplicateSibling { .. }));
}

#[test]
fn nodes_cannot_depend_on_themselves_or_ancestors() {
    let mut tree = bare_tree();
    let root = tree.root();
    let ids = add_tasks(&mut tree, root, &["a"]);

    assert!(matches!(
        tree.add_dependencies(ids[0], [ids[0]]),
        Err(PipelineError::InvalidDependency { .. })
    ));
    assert!(matches!(
        tree.add_dependencies(ids[0], [root]),
        Err(PipelineError::InvalidDependency { .. })
    ));
}
