// Copyright (C) 2024 Zhuo Zhang and Wuqi Zhang
// SPDX-License-Identifier: AGPL-3.0

//! Child fetch coordination.
//!
//! At most one child load per node is outstanding at any time. A caller that
//! arrives while a load is running awaits the same shared future and observes
//! the same count. The future removes its own entry when it settles.

use std::collections::HashMap;

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tracing::debug;

use crate::{
    node::{NodeId, ValueInfo},
    tree::ValueTree,
};

/// A child load that any number of callers can await
pub type SharedFetch = Shared<BoxFuture<'static, usize>>;

/// How many children to request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchLimit {
    /// At most this many more children
    Page(usize),
    /// Every remaining child
    All,
}

impl FetchLimit {
    /// The bound passed to the backend, `None` for unbounded
    pub fn count(self) -> Option<usize> {
        match self {
            Self::Page(count) => Some(count),
            Self::All => None,
        }
    }
}

/// In-flight child loads keyed by node
#[derive(Default)]
pub struct ChildFetcher {
    in_flight: Mutex<HashMap<NodeId, SharedFetch>>,
}

impl std::fmt::Debug for ChildFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChildFetcher").field("in_flight", &self.in_flight.lock().len()).finish()
    }
}

impl ChildFetcher {
    /// Create a coordinator with nothing in flight
    pub fn new() -> Self {
        Self::default()
    }

    /// Join the load already running for `node`, or start one with `start`.
    ///
    /// Returns the shared load and whether this call started it.
    pub fn join_or_start<F>(&self, node: NodeId, start: F) -> (SharedFetch, bool)
    where
        F: FnOnce() -> BoxFuture<'static, usize>,
    {
        let mut in_flight = self.in_flight.lock();
        if let Some(fetch) = in_flight.get(&node) {
            debug!(%node, "Joining in-flight child fetch");
            return (fetch.clone(), false);
        }

        let fetch = start().shared();
        in_flight.insert(node, fetch.clone());
        (fetch, true)
    }

    /// The load running for `node`, if any
    pub fn get(&self, node: NodeId) -> Option<SharedFetch> {
        self.in_flight.lock().get(&node).cloned()
    }

    /// Forget the load of `node`
    pub fn settle(&self, node: NodeId) {
        self.in_flight.lock().remove(&node);
    }

    /// Whether a load is running for `node`
    pub fn is_in_flight(&self, node: NodeId) -> bool {
        self.in_flight.lock().contains_key(&node)
    }

    /// Number of loads in flight
    pub fn len(&self) -> usize {
        self.in_flight.lock().len()
    }

    /// Whether nothing is in flight
    pub fn is_empty(&self) -> bool {
        self.in_flight.lock().is_empty()
    }
}

/// Where a page of children lands in the tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedPage {
    /// Index of the first new child
    pub start: usize,
    /// The new children
    pub children: Vec<NodeId>,
}

/// Append a page fetched from the backend.
///
/// `offset` and `generation` describe the node when the request was issued;
/// the page is discarded if the node's children changed since. A page shorter
/// than the requested bound (or an unbounded load) completes the node.
pub fn merge_page(
    tree: &mut ValueTree,
    node: NodeId,
    offset: usize,
    generation: u64,
    limit: FetchLimit,
    page: Vec<ValueInfo>,
) -> Option<MergedPage> {
    let entry = tree.get(node)?;
    if entry.generation != generation || entry.children().len() != offset {
        debug!(%node, "Discarding stale child page");
        return None;
    }

    let complete = limit.count().is_none_or(|count| page.len() < count);
    let children = tree.append_children(node, page);
    if let Some(entry) = tree.get_mut(node) {
        entry.children_loaded = complete;
    }

    Some(MergedPage { start: offset, children })
}
