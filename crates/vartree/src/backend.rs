// Copyright (C) 2024 Zhuo Zhang and Wuqi Zhang
// SPDX-License-Identifier: AGPL-3.0

//! Capability traits the controller consumes.
//!
//! The controller never talks to a debuggee directly. Everything it needs
//! from the outside world goes through these seams:
//!
//! - [`DebugBackend`] - connection state, child loading, refresh, editing, visualizers
//! - [`StackFrame`] - expression evaluation in the current frame
//! - [`ValueNotifier`] - the channel a backend uses to report that a value resolved
//!
//! Backend methods return [`eyre::Result`]; the controller logs failures and
//! never lets them escape its public operations.

use std::{future::Future, time::Duration};

use eyre::{bail, Result};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::node::{NodeId, ValueInfo, ValueNode};

/// Options bundle passed along with evaluation requests
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalOptions {
    /// Upper bound on a single evaluation
    pub timeout: Duration,
    /// Allow calling methods and property getters
    pub allow_method_evaluation: bool,
    /// Allow calling `ToString`-like formatting hooks
    pub allow_to_string: bool,
    /// Allow running code in the debuggee
    pub allow_target_invoke: bool,
    /// Numeric radix for display
    pub radix: u32,
}

impl Default for EvalOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            allow_method_evaluation: false,
            allow_to_string: false,
            allow_target_invoke: false,
            radix: 10,
        }
    }
}

impl EvalOptions {
    /// The same options with every kind of evaluation permitted, as used for refresh
    pub fn for_refresh(mut self) -> Self {
        self.allow_method_evaluation = true;
        self.allow_to_string = true;
        self.allow_target_invoke = true;
        self
    }
}

/// The stack frame values are evaluated in
pub trait StackFrame: Send + Sync + 'static {
    /// Evaluate one expression.
    ///
    /// The returned value may still be evaluating; its final data then
    /// arrives through the [`ValueNotifier`].
    fn evaluate(&self, expr: &str) -> impl Future<Output = Result<ValueInfo>> + Send;

    /// Evaluate several expressions, in order
    fn evaluate_many(&self, exprs: &[String]) -> impl Future<Output = Result<Vec<ValueInfo>>> + Send {
        async move {
            let mut values = Vec::with_capacity(exprs.len());
            for expr in exprs {
                values.push(self.evaluate(expr).await?);
            }
            Ok(values)
        }
    }

    /// A copy of the frame's evaluation options
    fn evaluation_options(&self) -> EvalOptions;
}

/// The debugging backend serving values to the tree
pub trait DebugBackend: Send + Sync + 'static {
    /// Frame type used for evaluation
    type Frame: StackFrame;

    /// Whether a debuggee is attached
    fn is_connected(&self) -> bool;

    /// Whether the debuggee is stopped
    fn is_paused(&self) -> bool;

    /// Load children of a node.
    ///
    /// # Arguments
    /// * `node` - The node whose children are requested
    /// * `offset` - Number of children already loaded; the page starts here
    /// * `count` - Maximum number of children to return, `None` for all remaining
    /// * `cancel` - Signalled when the controller is torn down
    ///
    /// # Returns
    /// The next children in order. Returning fewer than `count` marks the node
    /// as fully loaded.
    fn load_children(
        &self,
        node: &ValueNode,
        offset: usize,
        count: Option<usize>,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<Vec<ValueInfo>>> + Send;

    /// Re-evaluate a node with the given options
    fn refresh(
        &self,
        node: &ValueNode,
        options: EvalOptions,
    ) -> impl Future<Output = Result<ValueInfo>> + Send;

    /// Push a new value to the debuggee. Fails on input the backend rejects.
    fn set_value(&self, node: &ValueNode, value: &str) -> impl Future<Output = Result<()>> + Send;

    /// Whether any visualizer is registered
    fn has_visualizers(&self) -> bool {
        false
    }

    /// Whether an inline visualizer can render this node
    fn has_inline_visualizer(&self, _node: &ValueNode) -> bool {
        false
    }

    /// Render the node with its inline visualizer
    fn render_inline_visualizer(&self, node: &ValueNode) -> Result<String> {
        bail!("no inline visualizer for {}", node.path())
    }

    /// Show the pop-up visualizer for a node.
    ///
    /// # Returns
    /// Whether the user changed the value through the visualizer
    fn show_visualizer(&self, _node: &ValueNode) -> impl Future<Output = Result<bool>> + Send {
        async { Ok(false) }
    }

    /// Tell observers outside the tree that a variable was changed
    fn notify_variable_changed(&self, _node: &ValueNode) {}
}

/// A value-changed notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueChange {
    /// The node whose value changed
    pub node: NodeId,
    /// Its fresh data
    pub info: ValueInfo,
}

/// Sending half of the value-changed channel, handed to backends
#[derive(Debug, Clone)]
pub struct ValueNotifier {
    tx: mpsc::UnboundedSender<ValueChange>,
}

impl ValueNotifier {
    pub(crate) fn new(tx: mpsc::UnboundedSender<ValueChange>) -> Self {
        Self { tx }
    }

    /// Report fresh data for a node.
    ///
    /// Returns `false` once the controller is gone.
    pub fn value_changed(&self, node: NodeId, info: ValueInfo) -> bool {
        self.tx.send(ValueChange { node, info }).is_ok()
    }
}
