// Copyright (C) 2024 Zhuo Zhang and Wuqi Zhang
// SPDX-License-Identifier: AGPL-3.0

//! Change tracking across debugger stops.
//!
//! A checkpoint records `(expanded, value)` per node path. Only what the user
//! could see is recorded: recursion stops at collapsed nodes, and an
//! enumerable node contributes the children loaded so far. A path missing from
//! the store means "not observed", never "unchanged".

use std::collections::HashMap;

use crate::{
    node::{NodeId, ValueNode},
    tree::ValueTree,
};

/// Snapshot of one node at checkpoint time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointState {
    /// Whether the node was expanded
    pub expanded: bool,
    /// Raw value text
    pub value: String,
}

impl CheckpointState {
    fn of(node: &ValueNode) -> Self {
        Self { expanded: node.is_expanded(), value: node.value().to_string() }
    }
}

/// Path-keyed snapshots of the tree
#[derive(Debug, Clone, Default)]
pub struct CheckpointStore {
    states: HashMap<String, CheckpointState>,
}

impl CheckpointStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget every snapshot and record the current tree
    pub fn capture(&mut self, tree: &ValueTree) {
        self.states.clear();

        let mut stack: Vec<NodeId> =
            tree.get(tree.root()).map(|root| root.children().to_vec()).unwrap_or_default();
        while let Some(id) = stack.pop() {
            let Some(node) = tree.get(id) else {
                continue;
            };
            self.states.insert(node.path().to_string(), CheckpointState::of(node));
            if node.is_expanded() {
                stack.extend(node.children().iter().copied());
            }
        }
    }

    /// Forget every snapshot
    pub fn reset(&mut self) {
        self.states.clear();
    }

    /// Whether the node's value differs from its snapshot
    pub fn has_changed(&self, node: &ValueNode) -> bool {
        self.states.get(node.path()).is_some_and(|state| state.value != node.value())
    }

    /// Whether the node was expanded at checkpoint time
    pub fn was_expanded(&self, node: &ValueNode) -> bool {
        self.states.get(node.path()).is_some_and(|state| state.expanded)
    }

    /// Snapshot recorded for a path
    pub fn get(&self, path: &str) -> Option<&CheckpointState> {
        self.states.get(path)
    }

    /// Number of recorded paths
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Whether nothing is recorded
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Prepare for an in-place edit of `id`.
    ///
    /// The node keeps (or gains) a snapshot of its pre-edit value, and every
    /// ancestor below the root is recorded as expanded, so that a later
    /// refresh re-expands the path down to the edited value.
    pub fn record_edit(&mut self, tree: &ValueTree, id: NodeId) {
        let Some(node) = tree.get(id) else {
            return;
        };
        self.states
            .entry(node.path().to_string())
            .or_insert_with(|| CheckpointState::of(node));

        for ancestor in tree.ancestors(id) {
            let Some(ancestor) = tree.get(ancestor) else {
                continue;
            };
            self.states
                .entry(ancestor.path().to_string())
                .and_modify(|state| state.expanded = true)
                .or_insert_with(|| CheckpointState {
                    expanded: true,
                    value: ancestor.value().to_string(),
                });
        }
    }
}
