// Copyright (C) 2024 Zhuo Zhang and Wuqi Zhang
// SPDX-License-Identifier: AGPL-3.0

//! Arena storage for value nodes.
//!
//! Parents own their children through the `children` id list; the `parent`
//! link is a plain id and never keeps anything alive. Dropping a node from the
//! arena drops its whole subtree.

use std::collections::HashMap;

use crate::node::{NodeId, ValueInfo, ValueNode};

/// Separator between the segments of a node path
pub const PATH_SEPARATOR: char = '/';

/// Path of the child `name` of the node at `parent`; an empty `parent` means
/// a top-level value.
///
/// Backslashes and separators inside `name` are escaped with a backslash, so
/// a value named `a/b` never shares a path with child `b` of `a`.
pub fn join_path(parent: &str, name: &str) -> String {
    let mut path = String::with_capacity(parent.len() + name.len() + 1);
    if !parent.is_empty() {
        path.push_str(parent);
        path.push(PATH_SEPARATOR);
    }
    for c in name.chars() {
        if c == '\\' || c == PATH_SEPARATOR {
            path.push('\\');
        }
        path.push(c);
    }
    path
}

/// Result of splicing replacement values in place of a node
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Splice {
    /// Newly created nodes, in order
    pub inserted: Vec<NodeId>,
    /// Nodes dropped from the arena (the replaced node and its descendants)
    pub removed: Vec<NodeId>,
}

/// Arena holding every materialized node, rooted at an invisible root node
#[derive(Debug, Clone)]
pub struct ValueTree {
    nodes: HashMap<NodeId, ValueNode>,
    root: NodeId,
    next_id: u64,
}

impl Default for ValueTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ValueTree {
    /// Create a tree holding only an empty root
    pub fn new() -> Self {
        let mut tree = Self { nodes: HashMap::new(), root: NodeId::from(0), next_id: 0 };
        tree.root = tree.new_root();
        tree
    }

    fn new_root(&mut self) -> NodeId {
        let id = self.next_id();
        let mut root = ValueNode::from_info(
            id,
            None,
            String::new(),
            ValueInfo::default().replacing_children(),
        );
        root.is_expanded = true;
        root.children_loaded = true;
        self.nodes.insert(id, root);
        id
    }

    fn next_id(&mut self) -> NodeId {
        let id = NodeId::from(self.next_id);
        self.next_id += 1;
        id
    }

    /// Replace the root with an empty one, dropping every node.
    ///
    /// Ids keep counting up, so handles into the old tree never resolve to
    /// nodes of the new one.
    pub fn clear(&mut self) -> NodeId {
        self.nodes.clear();
        self.root = self.new_root();
        self.root
    }

    /// Id of the root node
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Look up a node
    pub fn get(&self, id: NodeId) -> Option<&ValueNode> {
        self.nodes.get(&id)
    }

    /// Look up a node mutably
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut ValueNode> {
        self.nodes.get_mut(&id)
    }

    /// Whether the node is materialized in this tree
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Number of materialized nodes, root included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree holds nothing but the root
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// Find a node by its path
    pub fn find_by_path(&self, path: &str) -> Option<NodeId> {
        self.nodes.values().find(|node| node.id != self.root && node.path == path).map(|n| n.id)
    }

    /// Ancestors of a node from its parent upwards, excluding the root
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut ancestors = Vec::new();
        let mut current = self.get(id).and_then(|node| node.parent);
        while let Some(parent) = current {
            if parent == self.root {
                break;
            }
            ancestors.push(parent);
            current = self.get(parent).and_then(|node| node.parent);
        }
        ancestors
    }

    fn child_path(&self, parent: Option<NodeId>, name: &str) -> String {
        let parent = parent.filter(|p| *p != self.root).and_then(|p| self.get(p));
        join_path(parent.map_or("", |parent| parent.path.as_str()), name)
    }

    fn alloc(&mut self, parent: Option<NodeId>, info: ValueInfo) -> NodeId {
        let id = self.next_id();
        let path = self.child_path(parent, &info.name);
        self.nodes.insert(id, ValueNode::from_info(id, parent, path, info));
        id
    }

    /// Append children to a node. Returns the new ids, or nothing if the parent is gone.
    pub fn append_children(&mut self, parent: NodeId, infos: Vec<ValueInfo>) -> Vec<NodeId> {
        if !self.contains(parent) {
            return Vec::new();
        }

        let ids: Vec<NodeId> = infos.into_iter().map(|info| self.alloc(Some(parent), info)).collect();
        if let Some(node) = self.get_mut(parent) {
            node.children.extend(ids.iter().copied());
        }
        ids
    }

    /// Materialize values that belong to no parent's child list
    pub fn insert_detached(&mut self, infos: Vec<ValueInfo>) -> Vec<NodeId> {
        infos.into_iter().map(|info| self.alloc(None, info)).collect()
    }

    /// Splice `infos` into `parent`'s children in place of `old`.
    ///
    /// Returns `None` if `old` is not a child of `parent`.
    pub fn replace_child(
        &mut self,
        parent: NodeId,
        old: NodeId,
        infos: Vec<ValueInfo>,
    ) -> Option<Splice> {
        let position = self.get(parent)?.children.iter().position(|c| *c == old)?;

        let removed = self.remove_subtree(old);
        let inserted: Vec<NodeId> =
            infos.into_iter().map(|info| self.alloc(Some(parent), info)).collect();

        let node = self.get_mut(parent)?;
        node.children.splice(position..=position, inserted.iter().copied());

        Some(Splice { inserted, removed })
    }

    /// Drop a node and all of its descendants from the arena.
    ///
    /// The parent's child list is left alone.
    pub fn remove_subtree(&mut self, id: NodeId) -> Vec<NodeId> {
        let mut removed = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.remove(&current) {
                stack.extend(node.children.iter().copied());
                removed.push(current);
            }
        }
        removed
    }

    /// Discard a node's cached children
    pub fn clear_children(&mut self, id: NodeId) -> Vec<NodeId> {
        let Some(node) = self.get_mut(id) else {
            return Vec::new();
        };
        let children = std::mem::take(&mut node.children);
        node.children_loaded = false;
        node.generation += 1;

        children.into_iter().flat_map(|child| self.remove_subtree(child)).collect()
    }

    /// Iterate over every node except the root
    pub fn iter(&self) -> impl Iterator<Item = &ValueNode> {
        self.nodes.values().filter(move |node| node.id != self.root)
    }
}
