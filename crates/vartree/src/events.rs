// Copyright (C) 2024 Zhuo Zhang and Wuqi Zhang
// SPDX-License-Identifier: AGPL-3.0

//! Notifications raised for the rendering surface

use tokio::sync::broadcast;
use tracing::trace;

use crate::node::NodeId;

/// Something in the tree changed
#[derive(Debug, Clone, PartialEq)]
pub enum TreeEvent {
    /// Children `start..start + count` of `node` were loaded
    ChildrenLoaded {
        /// Node whose children were loaded
        node: NodeId,
        /// Index of the first loaded child
        start: usize,
        /// Number of loaded children
        count: usize,
    },
    /// A node was expanded (sent even when it has no children)
    NodeExpanded(NodeId),
    /// A node finished evaluating; `replacements` now stand in its place
    EvaluationCompleted {
        /// Node whose evaluation completed
        node: NodeId,
        /// Its replacement set; `[node]` for a plain value, empty when removed
        replacements: Vec<NodeId>,
    },
    /// A pinned watch was placed or moved
    PinnedWatchChanged {
        /// Pinned node
        node: NodeId,
        /// Opaque placement data
        placement: serde_json::Value,
    },
    /// A node was pinned or unpinned
    PinStatusChanged {
        /// Affected node
        node: NodeId,
        /// Whether it is pinned now
        pinned: bool,
    },
    /// Inline editing of a node started
    StartEditing(NodeId),
    /// Inline editing of a node ended
    EndEditing(NodeId),
}

/// Fan-out of [`TreeEvent`]s to any number of subscribers
#[derive(Debug, Clone)]
pub(crate) struct EventSink {
    tx: broadcast::Sender<TreeEvent>,
}

impl EventSink {
    pub(crate) fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<TreeEvent> {
        self.tx.subscribe()
    }

    pub(crate) fn emit(&self, event: TreeEvent) {
        if let Err(broadcast::error::SendError(event)) = self.tx.send(event) {
            trace!(?event, "No subscriber for tree event");
        }
    }
}
