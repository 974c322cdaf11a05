// Copyright (C) 2024 Zhuo Zhang and Wuqi Zhang
// SPDX-License-Identifier: AGPL-3.0

//! Errors raised inside the controller.
//!
//! None of these cross the public operation boundary: they are logged and the
//! operation reports `false`, zero or `None`.

use thiserror::Error;

use crate::node::NodeId;

/// Why a tree operation could not be carried out
#[derive(Debug, Error)]
pub enum TreeError {
    /// The node is not (or no longer) in the tree
    #[error("node {0} is not in the tree")]
    NodeNotFound(NodeId),

    /// No frame is available for evaluation
    #[error("no active stack frame")]
    NoActiveFrame,

    /// The backend is not attached to a debuggee
    #[error("backend is not connected")]
    Disconnected,

    /// The debuggee is running
    #[error("debuggee is not paused")]
    NotPaused,

    /// Editing is turned off or the node cannot be edited
    #[error("node {0} cannot be edited")]
    EditingDisabled(NodeId),

    /// The backend reported a failure
    #[error("backend failure: {0:#}")]
    Backend(#[from] eyre::Report),
}

/// Result type for controller internals
pub type TreeResult<T> = std::result::Result<T, TreeError>;
