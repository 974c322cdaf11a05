// Copyright (C) 2024 Zhuo Zhang and Wuqi Zhang
// SPDX-License-Identifier: AGPL-3.0

//! Evaluation watches: bridging "still being computed" to "notify once resolved".

use std::collections::HashMap;

use tracing::debug;

use crate::{
    node::{NodeId, ValueInfo},
    tree::ValueTree,
};

/// A node finished evaluating.
///
/// `replacements` is `[node]` for an ordinary value, the resolved set for a
/// group placeholder, and empty when the node was removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// The node whose evaluation completed
    pub node: NodeId,
    /// Nodes standing in its place now
    pub replacements: Vec<NodeId>,
}

impl Completion {
    fn resolved(node: NodeId) -> Self {
        Self { node, replacements: vec![node] }
    }
}

/// Nodes whose value is still being computed by the backend
#[derive(Debug, Default)]
pub struct EvaluationRegistry {
    /// Pending node -> registration token
    pending: HashMap<NodeId, u64>,
    next_token: u64,
}

impl EvaluationRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a pending watch, replacing any previous registration of the node
    pub fn register(&mut self, node: NodeId) -> u64 {
        let token = self.next_token;
        self.next_token += 1;
        self.pending.insert(node, token);
        token
    }

    /// Drop the watch of a node. Returns whether one existed.
    pub fn unregister(&mut self, node: NodeId) -> bool {
        self.pending.remove(&node).is_some()
    }

    /// Drop every watch without firing anything
    pub fn unregister_all(&mut self) -> usize {
        let count = self.pending.len();
        self.pending.clear();
        count
    }

    /// Whether the node is waiting for its value
    pub fn is_pending(&self, node: NodeId) -> bool {
        self.pending.contains_key(&node)
    }

    /// Number of pending watches
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether no watch is pending
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Watch a node until its value resolves.
    ///
    /// A node that is not evaluating is not watched; with
    /// `send_immediately_if_not_evaluating` the completion is returned right
    /// away instead, so the caller still gets its follow-up event.
    pub fn register_for_completion(
        &mut self,
        tree: &ValueTree,
        node: NodeId,
        send_immediately_if_not_evaluating: bool,
    ) -> Option<Completion> {
        let evaluating = tree.get(node)?.is_evaluating();
        if evaluating {
            self.register(node);
            None
        } else if send_immediately_if_not_evaluating {
            Some(Completion::resolved(node))
        } else {
            None
        }
    }

    /// Apply a value-changed notification.
    ///
    /// The node always takes the new data. Only a pending node produces a
    /// completion, and only once per registration. A group placeholder that
    /// still reports itself evaluating stays pending until it resolves.
    pub fn on_value_changed(
        &mut self,
        tree: &mut ValueTree,
        node: NodeId,
        info: ValueInfo,
    ) -> Option<Completion> {
        let Some(entry) = tree.get_mut(node) else {
            debug!(%node, "Value change for a node that is no longer in the tree");
            self.unregister(node);
            return None;
        };
        entry.apply(info);
        let group = entry.is_group_placeholder();

        if group && entry.is_evaluating() {
            debug!(%node, "Group placeholder still evaluating");
            return None;
        }
        if !self.unregister(node) {
            return None;
        }

        if group {
            let entry = tree.get_mut(node)?;
            let replacements = entry.take_replacements();
            let inserted = self.splice_replacement(tree, node, replacements);
            for replacement in &inserted {
                self.register_for_completion(tree, *replacement, false);
            }
            debug!(%node, count = inserted.len(), "Group placeholder resolved");
            Some(Completion { node, replacements: inserted })
        } else {
            Some(Completion::resolved(node))
        }
    }

    /// Put `infos` in place of `node`.
    ///
    /// If the parent accepts replacements, the values are spliced into its
    /// children and the old subtree is dropped together with its watches.
    /// Otherwise the values are materialized detached and `node` stays where
    /// it is.
    pub fn splice_replacement(
        &mut self,
        tree: &mut ValueTree,
        node: NodeId,
        infos: Vec<ValueInfo>,
    ) -> Vec<NodeId> {
        let parent = tree.get(node).and_then(|entry| entry.parent()).filter(|parent| {
            tree.get(*parent).is_some_and(|p| {
                p.supports_child_replacement() && p.children().contains(&node)
            })
        });

        let Some(parent) = parent else {
            return tree.insert_detached(infos);
        };

        let splice = tree.replace_child(parent, node, infos).unwrap_or_default();
        for removed in splice.removed {
            self.unregister(removed);
        }
        splice.inserted
    }
}
