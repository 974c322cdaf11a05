// Copyright (C) 2024 Zhuo Zhang and Wuqi Zhang
// SPDX-License-Identifier: AGPL-3.0

//! Value nodes: the entries of the inspected-value tree.
//!
//! A backend describes a value with a [`ValueInfo`]. Once the value is placed in
//! a [`ValueTree`](crate::ValueTree) it becomes a [`ValueNode`], gaining an id,
//! a path, a parent link and the expansion state owned by the controller.

use std::borrow::Cow;

use derive_more::{Display, From};

/// Display values longer than this many characters are truncated.
pub const DEFAULT_MAX_DISPLAY_LEN: usize = 1000;

/// Marker appended to a truncated display value.
pub const ELLIPSIS: &str = "...";

/// Handle of a node inside a [`ValueTree`](crate::ValueTree).
///
/// Ids are never reused, so a handle to a node that has been dropped from the
/// tree simply stops resolving.
#[derive(Debug, Display, From, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[display("#{_0}")]
pub struct NodeId(u64);

impl NodeId {
    /// Raw numeric value of the id
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

/// What kind of value a node stands for
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum NodeKind {
    /// An ordinary value
    #[default]
    Value,
    /// A placeholder for a group of values that are still being computed
    /// (such as "locals"). Once it stops evaluating, the placeholder is
    /// replaced by `replacements`.
    Group {
        /// Values that take the placeholder's place once resolved
        replacements: Vec<ValueInfo>,
    },
}

/// Description of a value as produced by a debugging backend
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValueInfo {
    /// Name shown for the value (variable name, field name, `[index]`, expression)
    pub name: String,
    /// Raw value text
    pub value: String,
    /// Text to display, when it differs from `value`
    pub display_value: Option<String>,
    /// Expression the backend evaluates to reach this value again, if any
    pub expression: Option<String>,
    /// Whether the value is null
    pub is_null: bool,
    /// Whether the value can be edited in place
    pub can_edit: bool,
    /// Whether the value could not be determined
    pub is_unknown: bool,
    /// Whether children must be paged rather than loaded in full
    pub is_enumerable: bool,
    /// Whether the value is still being computed
    pub is_evaluating: bool,
    /// Whether the node may splice replacement values in place of its children
    pub replaces_children: bool,
    /// Plain value or group placeholder
    pub kind: NodeKind,
}

impl ValueInfo {
    /// Create a plain, non-editable value
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { name: name.into(), value: value.into(), ..Default::default() }
    }

    /// Create an evaluating group placeholder
    pub fn group(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_evaluating: true,
            kind: NodeKind::Group { replacements: Vec::new() },
            ..Default::default()
        }
    }

    /// Set a display value that differs from the raw value
    pub fn with_display(mut self, display: impl Into<String>) -> Self {
        self.display_value = Some(display.into());
        self
    }

    /// Set the expression that reaches this value
    pub fn with_expression(mut self, expression: impl Into<String>) -> Self {
        self.expression = Some(expression.into());
        self
    }

    /// Mark the value as editable
    pub fn editable(mut self) -> Self {
        self.can_edit = true;
        self
    }

    /// Mark the value as null
    pub fn null(mut self) -> Self {
        self.is_null = true;
        self
    }

    /// Mark the value as unknown
    pub fn unknown(mut self) -> Self {
        self.is_unknown = true;
        self
    }

    /// Mark the value as enumerable (paged children)
    pub fn enumerable(mut self) -> Self {
        self.is_enumerable = true;
        self
    }

    /// Mark the value as still evaluating
    pub fn evaluating(mut self) -> Self {
        self.is_evaluating = true;
        self
    }

    /// Allow the node to splice replacement values among its children
    pub fn replacing_children(mut self) -> Self {
        self.replaces_children = true;
        self
    }

    /// Resolve a group placeholder with the given replacement values
    pub fn resolved_group(mut self, replacements: Vec<ValueInfo>) -> Self {
        self.is_evaluating = false;
        self.kind = NodeKind::Group { replacements };
        self
    }
}

/// A value placed in the tree
#[derive(Debug, Clone, PartialEq)]
pub struct ValueNode {
    pub(crate) id: NodeId,
    pub(crate) path: String,
    pub(crate) name: String,
    pub(crate) value: String,
    pub(crate) display_value: String,
    pub(crate) expression: Option<String>,
    pub(crate) is_null: bool,
    pub(crate) can_edit: bool,
    pub(crate) is_unknown: bool,
    pub(crate) is_enumerable: bool,
    pub(crate) is_expanded: bool,
    pub(crate) is_evaluating: bool,
    pub(crate) children_loaded: bool,
    pub(crate) replaces_children: bool,
    pub(crate) kind: NodeKind,
    pub(crate) children: Vec<NodeId>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) pin: Option<serde_json::Value>,
    /// Bumped whenever the cached children are discarded, so that a page
    /// requested before the discard is not merged afterwards.
    pub(crate) generation: u64,
}

impl ValueNode {
    pub(crate) fn from_info(
        id: NodeId,
        parent: Option<NodeId>,
        path: String,
        info: ValueInfo,
    ) -> Self {
        let display_value = info.display_value.unwrap_or_else(|| info.value.clone());
        Self {
            id,
            path,
            name: info.name,
            value: info.value,
            display_value,
            expression: info.expression,
            is_null: info.is_null,
            can_edit: info.can_edit,
            is_unknown: info.is_unknown,
            is_enumerable: info.is_enumerable,
            is_expanded: false,
            is_evaluating: info.is_evaluating,
            children_loaded: false,
            replaces_children: info.replaces_children,
            kind: info.kind,
            children: Vec::new(),
            parent,
            pin: None,
            generation: 0,
        }
    }

    /// Overwrite the value-related fields with fresh backend data.
    ///
    /// Identity, position and expansion state are kept.
    pub(crate) fn apply(&mut self, info: ValueInfo) {
        self.display_value = info.display_value.unwrap_or_else(|| info.value.clone());
        self.value = info.value;
        if info.expression.is_some() {
            self.expression = info.expression;
        }
        self.is_null = info.is_null;
        self.can_edit = info.can_edit;
        self.is_unknown = info.is_unknown;
        self.is_enumerable = info.is_enumerable;
        self.is_evaluating = info.is_evaluating;
        self.replaces_children = info.replaces_children;
        self.kind = info.kind;
    }

    /// Take the replacement set of a resolved group placeholder
    pub(crate) fn take_replacements(&mut self) -> Vec<ValueInfo> {
        match &mut self.kind {
            NodeKind::Group { replacements } => std::mem::take(replacements),
            NodeKind::Value => Vec::new(),
        }
    }

    /// Id of this node
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Stable path of this node, unique among the materialized nodes
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Name of the value
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw value text
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Expression reaching this value, as reported by the backend.
    ///
    /// Unlike [`path`](Self::path) this is backend syntax and need not be unique.
    pub fn expression(&self) -> Option<&str> {
        self.expression.as_deref()
    }

    /// Display text, untruncated
    pub fn display_value(&self) -> &str {
        &self.display_value
    }

    /// Whether the value is null
    pub fn is_null(&self) -> bool {
        self.is_null
    }

    /// Whether the value can be edited in place
    pub fn can_edit(&self) -> bool {
        self.can_edit
    }

    /// Whether the value could not be determined
    pub fn is_unknown(&self) -> bool {
        self.is_unknown
    }

    /// Whether children are paged
    pub fn is_enumerable(&self) -> bool {
        self.is_enumerable
    }

    /// Whether the node is expanded
    pub fn is_expanded(&self) -> bool {
        self.is_expanded
    }

    /// Whether the value is still being computed
    pub fn is_evaluating(&self) -> bool {
        self.is_evaluating
    }

    /// Whether every child has been fetched (a partial page does not count)
    pub fn children_loaded(&self) -> bool {
        self.children_loaded
    }

    /// Children fetched so far, in order
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Parent node; `None` for the root and for detached replacement values
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Placement data of a pinned watch, if the node is pinned
    pub fn pin(&self) -> Option<&serde_json::Value> {
        self.pin.as_ref()
    }

    /// Whether this node is a group placeholder
    pub fn is_group_placeholder(&self) -> bool {
        matches!(self.kind, NodeKind::Group { .. })
    }

    /// Whether this node splices replacement values among its children
    pub fn supports_child_replacement(&self) -> bool {
        self.replaces_children
    }
}

/// Truncate a display value to `limit` characters, appending [`ELLIPSIS`].
///
/// Values of at most `limit` characters are returned unchanged.
pub fn truncate_display(text: &str, limit: usize) -> Cow<'_, str> {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => Cow::Owned(format!("{}{ELLIPSIS}", &text[..cut])),
        None => Cow::Borrowed(text),
    }
}
