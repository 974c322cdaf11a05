// Copyright (C) 2024 Zhuo Zhang and Wuqi Zhang
// SPDX-License-Identifier: AGPL-3.0

//! The tree controller
//!
//! [`TreeController`] owns the root of the value tree and composes the three
//! bookkeeping subsystems from [`manager`](crate::manager):
//!
//! - `EvaluationRegistry`: values still being computed by the backend
//! - `ChildFetcher`: child loads, at most one in flight per node
//! - `CheckpointStore`: snapshots for "changed since the last stop" queries
//!
//! # Data Flow
//!
//! 1. The rendering surface calls an operation (expand, edit, refresh, ...)
//! 2. The controller updates the arena and issues backend calls
//! 3. Backend results are merged back, unless the tree moved on in between
//! 4. [`TreeEvent`]s are broadcast to every subscriber
//!
//! Backends report late-resolving values through a [`ValueNotifier`]; the
//! owner drains them with [`TreeController::process_value_changes`].
//!
//! # Failure policy
//!
//! No backend failure escapes a public operation. Failures are logged and
//! reported as `false`, zero or `None`, and the controller stays usable.

use std::sync::{Arc, Weak};

use futures::{future::BoxFuture, FutureExt};
use parking_lot::{Mutex, RwLock};
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use vartree_common::normalize_expression;

use crate::{
    backend::{DebugBackend, StackFrame, ValueChange, ValueNotifier},
    config::TreeConfig,
    error::{TreeError, TreeResult},
    events::{EventSink, TreeEvent},
    manager::{
        fetch::merge_page, CheckpointStore, ChildFetcher, Completion, EvaluationRegistry,
        FetchLimit,
    },
    node::{truncate_display, NodeId, ValueInfo, ValueNode},
    tree::ValueTree,
};

/// Text to show for a value, after visualizers and truncation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayValue {
    /// The text to render
    pub text: String,
    /// Whether to offer a "show visualizer" affordance
    pub show_visualizer: bool,
}

struct Inner<B: DebugBackend> {
    config: TreeConfig,
    backend: Arc<B>,
    frame: RwLock<Option<Arc<B::Frame>>>,

    // Lock order: tree, then watches or checkpoints. None is held across an await.
    tree: Mutex<ValueTree>,
    watches: Mutex<EvaluationRegistry>,
    checkpoints: Mutex<CheckpointStore>,
    fetcher: ChildFetcher,

    events: EventSink,
    notifier: ValueNotifier,
    changes: Mutex<mpsc::UnboundedReceiver<ValueChange>>,
    cancel: CancellationToken,
}

impl<B: DebugBackend> Drop for Inner<B> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl<B: DebugBackend> Inner<B> {
    fn emit_completion(&self, completion: Completion) {
        self.events.emit(TreeEvent::EvaluationCompleted {
            node: completion.node,
            replacements: completion.replacements,
        });
    }

    /// Merge a page loaded for `node` (as it was when the load was issued)
    fn merge(&self, node: &ValueNode, offset: usize, limit: FetchLimit, page: Vec<ValueInfo>) -> usize {
        let merged = {
            let mut tree = self.tree.lock();
            let Some(merged) =
                merge_page(&mut tree, node.id(), offset, node.generation, limit, page)
            else {
                return 0;
            };

            let mut watches = self.watches.lock();
            for child in &merged.children {
                watches.register_for_completion(&tree, *child, false);
            }
            merged
        };

        if !merged.children.is_empty() {
            self.events.emit(TreeEvent::ChildrenLoaded {
                node: node.id(),
                start: merged.start,
                count: merged.children.len(),
            });
        }
        merged.children.len()
    }
}

/// Controller of a lazily-populated tree of inspected values
///
/// The controller is a cheap handle; clones share the same tree. All methods
/// take `&self`, so concurrent operations (for example two fetches of the same
/// node) can be awaited side by side.
pub struct TreeController<B: DebugBackend> {
    inner: Arc<Inner<B>>,
}

impl<B: DebugBackend> Clone for TreeController<B> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<B: DebugBackend> std::fmt::Debug for TreeController<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeController")
            .field("nodes", &self.inner.tree.lock().len())
            .field("pending_evaluations", &self.inner.watches.lock().len())
            .field("fetcher", &self.inner.fetcher)
            .finish()
    }
}

// Construction and introspection
impl<B: DebugBackend> TreeController<B> {
    /// Create a controller with an empty tree
    pub fn new(backend: Arc<B>, config: TreeConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            inner: Arc::new(Inner {
                events: EventSink::new(config.event_capacity),
                config,
                backend,
                frame: RwLock::new(None),
                tree: Mutex::new(ValueTree::new()),
                watches: Mutex::new(EvaluationRegistry::new()),
                checkpoints: Mutex::new(CheckpointStore::new()),
                fetcher: ChildFetcher::new(),
                notifier: ValueNotifier::new(tx),
                changes: Mutex::new(rx),
                cancel: CancellationToken::new(),
            }),
        }
    }

    /// Configuration in use
    pub fn config(&self) -> &TreeConfig {
        &self.inner.config
    }

    /// The backend serving values
    pub fn backend(&self) -> &Arc<B> {
        &self.inner.backend
    }

    /// A notifier for the backend to report resolved values with
    pub fn notifier(&self) -> ValueNotifier {
        self.inner.notifier.clone()
    }

    /// Subscribe to tree events
    pub fn subscribe(&self) -> broadcast::Receiver<TreeEvent> {
        self.inner.events.subscribe()
    }

    /// Install (or clear) the frame used for evaluation.
    ///
    /// Without a frame nothing can have been observed, so change tracking is
    /// reset as well.
    pub fn set_frame(&self, frame: Option<Arc<B::Frame>>) {
        let cleared = frame.is_none();
        *self.inner.frame.write() = frame;
        if cleared {
            self.reset_change_tracking();
        }
    }

    fn frame(&self) -> TreeResult<Arc<B::Frame>> {
        self.inner.frame.read().clone().ok_or(TreeError::NoActiveFrame)
    }

    /// Id of the current root
    pub fn root(&self) -> NodeId {
        self.inner.tree.lock().root()
    }

    /// A copy of a node
    pub fn node(&self, id: NodeId) -> Option<ValueNode> {
        self.inner.tree.lock().get(id).cloned()
    }

    /// Children of a node loaded so far
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.inner.tree.lock().get(id).map(|node| node.children().to_vec()).unwrap_or_default()
    }

    /// Find a materialized node by path
    pub fn find_by_path(&self, path: &str) -> Option<NodeId> {
        self.inner.tree.lock().find_by_path(path)
    }

    /// Run `f` against the tree, e.g. to render it
    pub fn with_tree<R>(&self, f: impl FnOnce(&ValueTree) -> R) -> R {
        f(&self.inner.tree.lock())
    }

    /// Number of nodes waiting for their value
    pub fn pending_evaluations(&self) -> usize {
        self.inner.watches.lock().len()
    }

    /// Whether a node is waiting for its value
    pub fn is_pending_evaluation(&self, id: NodeId) -> bool {
        self.inner.watches.lock().is_pending(id)
    }

    /// Number of child loads in flight
    pub fn in_flight_fetches(&self) -> usize {
        self.inner.fetcher.len()
    }
}

// Expansion and child loading
impl<B: DebugBackend> TreeController<B> {
    /// Expand a node, loading its children if needed.
    ///
    /// An enumerable node without children gets its first page; any other
    /// node that is not fully loaded gets all of its children. Expanding an
    /// expanded node does nothing.
    ///
    /// # Returns
    /// The number of newly loaded children
    pub async fn expand_node(&self, id: NodeId) -> usize {
        let limit = {
            let mut tree = self.inner.tree.lock();
            let Some(node) = tree.get_mut(id) else {
                return 0;
            };
            if node.is_expanded {
                return 0;
            }
            node.is_expanded = true;

            if node.is_enumerable {
                (node.children.is_empty() && !node.children_loaded)
                    .then_some(FetchLimit::Page(self.inner.config.page_size))
            } else {
                (!node.children_loaded).then_some(FetchLimit::All)
            }
        };

        let loaded = match limit {
            Some(limit) => self.fetch_children(id, limit).await,
            None => 0,
        };

        self.inner.events.emit(TreeEvent::NodeExpanded(id));
        loaded
    }

    /// Collapse a node. Its children stay cached.
    pub fn collapse_node(&self, id: NodeId) -> bool {
        let mut tree = self.inner.tree.lock();
        let root = tree.root();
        match tree.get_mut(id) {
            Some(node) if node.is_expanded && id != root => {
                node.is_expanded = false;
                true
            }
            _ => false,
        }
    }

    /// Load the next page of an expanded enumerable node.
    ///
    /// # Returns
    /// The number of newly loaded children; zero if everything was loaded already
    pub async fn fetch_more_children(&self, id: NodeId) -> usize {
        let eligible = self
            .inner
            .tree
            .lock()
            .get(id)
            .is_some_and(|node| node.is_expanded && node.is_enumerable && !node.children_loaded);
        if !eligible {
            return 0;
        }

        self.fetch_children(id, FetchLimit::Page(self.inner.config.page_size)).await
    }

    async fn fetch_children(&self, id: NodeId, limit: FetchLimit) -> usize {
        let Some(node) = self.node(id) else {
            return 0;
        };

        let (fetch, _) = self.inner.fetcher.join_or_start(id, || self.start_fetch(node, limit));
        fetch.await
    }

    fn start_fetch(&self, node: ValueNode, limit: FetchLimit) -> BoxFuture<'static, usize> {
        let inner: Weak<Inner<B>> = Arc::downgrade(&self.inner);
        let backend = Arc::clone(&self.inner.backend);
        let cancel = self.inner.cancel.clone();

        async move {
            let id = node.id();
            let offset = node.children().len();

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                result = backend.load_children(&node, offset, limit.count(), &cancel) => Some(result),
            };

            let loaded = match result {
                None => {
                    debug!(node = %id, "Child fetch cancelled");
                    0
                }
                Some(Err(err)) => {
                    warn!(node = %id, path = node.path(), "Failed to load children: {err:#}");
                    0
                }
                Some(Ok(page)) => {
                    inner.upgrade().map_or(0, |inner| inner.merge(&node, offset, limit, page))
                }
            };

            if let Some(inner) = inner.upgrade() {
                inner.fetcher.settle(id);
            }
            loaded
        }
        .boxed()
    }
}

// Evaluation watches
impl<B: DebugBackend> TreeController<B> {
    /// Watch a node until its value resolves.
    ///
    /// With `send_immediately_if_not_evaluating`, a node that is already
    /// resolved gets its evaluation-completed event right away.
    pub fn register_for_completion(&self, id: NodeId, send_immediately_if_not_evaluating: bool) {
        let completion = {
            let tree = self.inner.tree.lock();
            self.inner.watches.lock().register_for_completion(
                &tree,
                id,
                send_immediately_if_not_evaluating,
            )
        };

        if let Some(completion) = completion {
            self.inner.emit_completion(completion);
        }
    }

    /// Apply a value-changed notification for a node
    pub fn on_value_changed(&self, id: NodeId, info: ValueInfo) {
        let completion = {
            let mut tree = self.inner.tree.lock();
            self.inner.watches.lock().on_value_changed(&mut tree, id, info)
        };

        if let Some(completion) = completion {
            self.inner.emit_completion(completion);
        }
    }

    /// Apply every value-changed notification sent through the [`ValueNotifier`] so far
    ///
    /// # Returns
    /// The number of notifications processed
    pub fn process_value_changes(&self) -> usize {
        let changes: Vec<ValueChange> = {
            let mut rx = self.inner.changes.lock();
            std::iter::from_fn(|| rx.try_recv().ok()).collect()
        };

        let count = changes.len();
        for change in changes {
            self.on_value_changed(change.node, change.info);
        }
        count
    }

    /// Put `infos` in place of `id`, watching the new values
    fn replace_node(&self, id: NodeId, infos: Vec<ValueInfo>) -> Option<Vec<NodeId>> {
        let mut tree = self.inner.tree.lock();
        if !tree.contains(id) {
            return None;
        }

        let mut watches = self.inner.watches.lock();
        let inserted = watches.splice_replacement(&mut tree, id, infos);
        for node in &inserted {
            watches.register_for_completion(&tree, *node, false);
        }
        Some(inserted)
    }
}

// Adding and removing values
impl<B: DebugBackend> TreeController<B> {
    /// Replace the root with an empty one
    pub fn clear_values(&self) {
        let root = self.inner.tree.lock().clear();
        debug!("Cleared value tree");
        self.inner.events.emit(TreeEvent::ChildrenLoaded { node: root, start: 0, count: 0 });
    }

    /// Drop every evaluation watch, then clear the tree
    pub fn clear_all(&self) {
        let dropped = self.inner.watches.lock().unregister_all();
        debug!(dropped, "Dropped evaluation watches");
        self.clear_values();
    }

    /// Add a top-level value
    pub fn add_value(&self, value: ValueInfo) -> Option<NodeId> {
        self.add_values(vec![value]).pop()
    }

    /// Add top-level values, in order
    pub fn add_values(&self, values: Vec<ValueInfo>) -> Vec<NodeId> {
        if values.is_empty() {
            return Vec::new();
        }

        let (root, start, ids) = {
            let mut tree = self.inner.tree.lock();
            let root = tree.root();
            let start = tree.get(root).map_or(0, |node| node.children().len());
            let ids = tree.append_children(root, values);
            (root, start, ids)
        };

        for id in &ids {
            self.register_for_completion(*id, false);
        }

        self.inner.events.emit(TreeEvent::ChildrenLoaded { node: root, start, count: ids.len() });
        ids
    }

    /// Stop watching a value and announce that it is gone.
    ///
    /// A parent that accepts replacements (such as the root) drops the node
    /// from its children; otherwise the node stays where it is.
    pub fn remove_value(&self, id: NodeId) -> bool {
        self.inner.watches.lock().unregister(id);
        if self.replace_node(id, Vec::new()).is_none() {
            return false;
        }

        self.inner.emit_completion(Completion { node: id, replacements: Vec::new() });
        true
    }

    async fn evaluate(&self, expr: &str) -> TreeResult<ValueInfo> {
        let frame = self.frame()?;
        Ok(frame.evaluate(expr).await?)
    }

    /// Evaluate a watch expression in the current frame and add it
    pub async fn add_expression(&self, expr: &str) -> Option<NodeId> {
        if !self.inner.config.watch_expressions {
            return None;
        }

        let expr = normalize_expression(expr);
        if expr.is_empty() {
            return None;
        }

        match self.evaluate(&expr).await {
            Ok(value) => self.add_value(value),
            Err(err) => {
                warn!(expr = %expr, "Failed to add watch expression: {err}");
                None
            }
        }
    }

    /// Evaluate several watch expressions in the current frame and add them
    pub async fn add_expressions(&self, exprs: &[String]) -> Vec<NodeId> {
        if !self.inner.config.watch_expressions {
            return Vec::new();
        }

        let exprs: Vec<String> = exprs
            .iter()
            .map(|expr| normalize_expression(expr))
            .filter(|expr| !expr.is_empty())
            .collect();
        if exprs.is_empty() {
            return Vec::new();
        }

        let frame = match self.frame() {
            Ok(frame) => frame,
            Err(err) => {
                warn!(count = exprs.len(), "Failed to add watch expressions: {err}");
                return Vec::new();
            }
        };

        match frame.evaluate_many(&exprs).await {
            Ok(values) => self.add_values(values),
            Err(err) => {
                warn!(count = exprs.len(), "Failed to add watch expressions: {err:#}");
                Vec::new()
            }
        }
    }

    /// Replace a watch expression with new text; empty text deletes it
    pub async fn edit_expression(&self, id: NodeId, new_text: &str) -> bool {
        if !self.inner.config.watch_expressions || self.node(id).is_none() {
            return false;
        }
        self.inner.watches.lock().unregister(id);

        let text = normalize_expression(new_text);
        let replacements = if text.is_empty() {
            Vec::new()
        } else {
            match self.evaluate(&text).await {
                Ok(value) => vec![value],
                Err(err) => {
                    warn!(node = %id, expr = %text, "Failed to evaluate edited expression: {err}");
                    return false;
                }
            }
        };

        let Some(inserted) = self.replace_node(id, replacements) else {
            debug!(node = %id, "Edited expression left the tree during evaluation");
            return false;
        };

        self.inner.emit_completion(Completion { node: id, replacements: inserted });
        true
    }
}

// Editing, refresh and visualizers
impl<B: DebugBackend> TreeController<B> {
    /// A node whose value may be written
    fn writable_node(&self, id: NodeId) -> TreeResult<ValueNode> {
        let node = self.node(id).ok_or(TreeError::NodeNotFound(id))?;
        if !self.inner.config.allow_editing || node.is_null() {
            return Err(TreeError::EditingDisabled(id));
        }
        Ok(node)
    }

    /// Record the pre-edit state of a node so the edit shows up as a change
    fn prepare_edit(&self, id: NodeId) {
        let tree = self.inner.tree.lock();
        self.inner.checkpoints.lock().record_edit(&tree, id);
    }

    /// Write a new value to the debuggee.
    ///
    /// On success the parent is refreshed (the node itself for a top-level
    /// value) and observers are told that a variable changed.
    ///
    /// # Returns
    /// Whether the value was written
    pub async fn edit_node_value(&self, id: NodeId, new_value: &str) -> bool {
        let node = match self.writable_node(id) {
            Ok(node) => node,
            Err(err) => {
                debug!("Ignoring edit: {err}");
                return false;
            }
        };
        if node.value() == new_value {
            return false;
        }

        self.prepare_edit(id);

        if let Err(err) = self.inner.backend.set_value(&node, new_value).await {
            warn!(node = %id, path = node.path(), "Failed to set value: {err:#}");
            return false;
        }

        let updated = {
            let mut tree = self.inner.tree.lock();
            tree.get_mut(id).map(|entry| {
                entry.value = new_value.to_string();
                entry.display_value = new_value.to_string();
                entry.clone()
            })
        };

        self.refresh_after_change(&node).await;
        self.inner.backend.notify_variable_changed(updated.as_ref().unwrap_or(&node));
        true
    }

    /// Show the pop-up visualizer for a node.
    ///
    /// # Returns
    /// Whether the value was changed through the visualizer
    pub async fn show_value_visualizer(&self, id: NodeId) -> bool {
        let Some(node) = self.node(id) else {
            return false;
        };
        self.prepare_edit(id);

        match self.inner.backend.show_visualizer(&node).await {
            Ok(true) => {
                self.refresh_after_change(&node).await;
                true
            }
            Ok(false) => false,
            Err(err) => {
                warn!(node = %id, path = node.path(), "Visualizer failed: {err:#}");
                false
            }
        }
    }

    async fn refresh_after_change(&self, node: &ValueNode) {
        let root = self.root();
        let target = node.parent().filter(|parent| *parent != root).unwrap_or(node.id());

        self.refresh_node(target).await;
        self.register_for_completion(target, true);
    }

    /// Re-evaluate a node with every kind of evaluation permitted.
    ///
    /// Only meaningful while connected, paused and with an active frame.
    /// Cached children are dropped and, if the node is expanded, reloaded.
    pub async fn refresh_node(&self, id: NodeId) -> bool {
        match self.try_refresh(id).await {
            Ok(()) => true,
            Err(err @ TreeError::Backend(_)) => {
                warn!(node = %id, "Refresh failed: {err}");
                false
            }
            Err(err) => {
                debug!(node = %id, "Refresh skipped: {err}");
                false
            }
        }
    }

    async fn try_refresh(&self, id: NodeId) -> TreeResult<()> {
        let backend = &self.inner.backend;
        if !backend.is_connected() {
            return Err(TreeError::Disconnected);
        }
        if !backend.is_paused() {
            return Err(TreeError::NotPaused);
        }
        let frame = self.frame()?;
        let node = self.node(id).filter(|_| id != self.root()).ok_or(TreeError::NodeNotFound(id))?;

        let watched = self.inner.watches.lock().unregister(id);
        let info = match backend.refresh(&node, frame.evaluation_options().for_refresh()).await {
            Ok(info) => info,
            Err(err) => {
                if watched {
                    self.register_for_completion(id, false);
                }
                return Err(err.into());
            }
        };

        // A load issued before the refresh must settle first, or the reload below would join it
        if let Some(fetch) = self.inner.fetcher.get(id) {
            fetch.await;
        }

        let reload = {
            let mut tree = self.inner.tree.lock();
            let entry = tree.get_mut(id).ok_or(TreeError::NodeNotFound(id))?;
            entry.apply(info);
            let reload = entry.is_expanded.then_some(if entry.is_enumerable {
                FetchLimit::Page(self.inner.config.page_size)
            } else {
                FetchLimit::All
            });

            let removed = tree.clear_children(id);
            let mut watches = self.inner.watches.lock();
            for node in removed {
                watches.unregister(node);
            }
            reload
        };

        if let Some(limit) = reload {
            self.fetch_children(id, limit).await;
        }

        self.register_for_completion(id, false);
        Ok(())
    }

    /// Display text of a node, rendered by an inline visualizer when one applies.
    ///
    /// A failing visualizer falls back to the plain display value.
    pub fn get_display_value_with_visualizers(&self, id: NodeId) -> Option<DisplayValue> {
        let node = self.node(id)?;
        let backend = &self.inner.backend;

        let text = if backend.has_inline_visualizer(&node) {
            backend.render_inline_visualizer(&node).unwrap_or_else(|err| {
                debug!(node = %id, "Inline visualizer failed: {err:#}");
                node.display_value().to_string()
            })
        } else {
            node.display_value().to_string()
        };

        Some(DisplayValue {
            text: truncate_display(&text, self.inner.config.max_display_len).into_owned(),
            show_visualizer: backend.has_visualizers() && !node.is_null(),
        })
    }

    /// Cancel every outstanding asynchronous operation. Safe to call repeatedly.
    pub fn cancel_async_tasks(&self) {
        if !self.inner.cancel.is_cancelled() {
            info!("Cancelling outstanding tree operations");
        }
        self.inner.cancel.cancel();
    }
}

// Change tracking
impl<B: DebugBackend> TreeController<B> {
    /// Snapshot the visible tree as the new baseline for change detection
    pub fn change_checkpoint(&self) {
        let tree = self.inner.tree.lock();
        let mut checkpoints = self.inner.checkpoints.lock();
        checkpoints.capture(&tree);
        debug!(entries = checkpoints.len(), "Captured checkpoint");
    }

    /// Forget the baseline without taking a new one
    pub fn reset_change_tracking(&self) {
        self.inner.checkpoints.lock().reset();
    }

    /// Whether a node's value differs from the last checkpoint
    pub fn has_changed_since_checkpoint(&self, id: NodeId) -> bool {
        let tree = self.inner.tree.lock();
        tree.get(id).is_some_and(|node| self.inner.checkpoints.lock().has_changed(node))
    }

    /// Whether a node was expanded at the last checkpoint
    pub fn was_expanded_at_checkpoint(&self, id: NodeId) -> bool {
        let tree = self.inner.tree.lock();
        tree.get(id).is_some_and(|node| self.inner.checkpoints.lock().was_expanded(node))
    }
}

// Pinned watches and inline editing
impl<B: DebugBackend> TreeController<B> {
    /// Pin a node, or move its pin, with opaque placement data
    pub fn pin_watch(&self, id: NodeId, placement: serde_json::Value) -> bool {
        let was_pinned = {
            let mut tree = self.inner.tree.lock();
            let Some(node) = tree.get_mut(id) else {
                return false;
            };
            node.pin.replace(placement.clone()).is_some()
        };

        self.inner.events.emit(TreeEvent::PinnedWatchChanged { node: id, placement });
        if !was_pinned {
            self.inner.events.emit(TreeEvent::PinStatusChanged { node: id, pinned: true });
        }
        true
    }

    /// Unpin a node. Returns whether it was pinned.
    pub fn unpin_watch(&self, id: NodeId) -> bool {
        let was_pinned =
            self.inner.tree.lock().get_mut(id).and_then(|node| node.pin.take()).is_some();
        if was_pinned {
            self.inner.events.emit(TreeEvent::PinStatusChanged { node: id, pinned: false });
        }
        was_pinned
    }

    /// Pin or unpin a node, keeping any placement it already has.
    ///
    /// # Returns
    /// Whether the pin status changed
    pub fn set_pin_status(&self, id: NodeId, pinned: bool) -> bool {
        let changed = {
            let mut tree = self.inner.tree.lock();
            let Some(node) = tree.get_mut(id) else {
                return false;
            };
            match (pinned, node.pin.is_some()) {
                (true, false) => {
                    node.pin = Some(serde_json::Value::Null);
                    true
                }
                (false, true) => {
                    node.pin = None;
                    true
                }
                _ => false,
            }
        };

        if changed {
            self.inner.events.emit(TreeEvent::PinStatusChanged { node: id, pinned });
        }
        changed
    }

    /// Start inline editing of a node
    pub fn begin_edit(&self, id: NodeId) -> bool {
        match self.writable_node(id) {
            Ok(node) if node.can_edit() => {}
            Ok(_) => {
                debug!(node = %id, "Refusing to start editing a read-only value");
                return false;
            }
            Err(err) => {
                debug!("Refusing to start editing: {err}");
                return false;
            }
        }
        self.inner.events.emit(TreeEvent::StartEditing(id));
        true
    }

    /// End inline editing of a node
    pub fn end_edit(&self, id: NodeId) -> bool {
        if self.node(id).is_none() {
            return false;
        }
        self.inner.events.emit(TreeEvent::EndEditing(id));
        true
    }
}
