// Copyright (C) 2024 Zhuo Zhang and Wuqi Zhang
// SPDX-License-Identifier: AGPL-3.0

//! A debugging backend serving values out of a JSON snapshot.
//!
//! Each snapshot stands for one stop of the debuggee. Every value carries the
//! member expression that reaches it (`config.items[0]`), so an object key
//! that is not a plain identifier cannot be reached below the top level.

use std::sync::Arc;

use eyre::{bail, eyre, Result, WrapErr};
use parking_lot::RwLock;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use vartree::{DebugBackend, EvalOptions, StackFrame, ValueInfo, ValueNode};
use vartree_common::{parse_member_path, PathSegment};

type Snapshot = Arc<RwLock<Value>>;

/// Backend over the current JSON snapshot
#[derive(Debug, Default)]
pub struct JsonBackend {
    snapshot: Snapshot,
}

impl JsonBackend {
    /// Create a backend stopped at `snapshot`
    pub fn new(snapshot: Value) -> Self {
        Self { snapshot: Arc::new(RwLock::new(snapshot)) }
    }

    /// Move to the next stop
    pub fn load_snapshot(&self, snapshot: Value) {
        *self.snapshot.write() = snapshot;
    }

    /// A frame evaluating against the live snapshot
    pub fn frame(&self) -> JsonFrame {
        JsonFrame { snapshot: Arc::clone(&self.snapshot) }
    }

    /// The top-level values of the snapshot, one per key
    pub fn top_level(&self) -> Result<Vec<ValueInfo>> {
        match &*self.snapshot.read() {
            Value::Object(map) => {
                Ok(map.iter().map(|(key, value)| describe(key, key, value)).collect())
            }
            other => bail!("snapshot must be a JSON object, found {}", kind_of(other)),
        }
    }

    /// Whether the value of `node` is an object or array
    pub fn has_children(&self, node: &ValueNode) -> bool {
        expression_of(node).is_ok_and(|expr| {
            resolve(&self.snapshot.read(), expr)
                .is_ok_and(|value| matches!(value, Value::Object(_) | Value::Array(_)))
        })
    }

    fn children_of(&self, expr: &str, offset: usize, count: Option<usize>) -> Result<Vec<ValueInfo>> {
        let snapshot = self.snapshot.read();
        let take = count.unwrap_or(usize::MAX);

        Ok(match resolve(&snapshot, expr)? {
            Value::Array(items) => items
                .iter()
                .enumerate()
                .skip(offset)
                .take(take)
                .map(|(index, item)| {
                    describe(&format!("[{index}]"), &format!("{expr}[{index}]"), item)
                })
                .collect(),
            Value::Object(map) => map
                .iter()
                .skip(offset)
                .take(take)
                .map(|(key, value)| describe(key, &format!("{expr}.{key}"), value))
                .collect(),
            _ => Vec::new(),
        })
    }
}

fn expression_of(node: &ValueNode) -> Result<&str> {
    node.expression().ok_or_else(|| eyre!("'{}' has no expression", node.name()))
}

impl DebugBackend for JsonBackend {
    type Frame = JsonFrame;

    fn is_connected(&self) -> bool {
        true
    }

    fn is_paused(&self) -> bool {
        true
    }

    async fn load_children(
        &self,
        node: &ValueNode,
        offset: usize,
        count: Option<usize>,
        _cancel: &CancellationToken,
    ) -> Result<Vec<ValueInfo>> {
        self.children_of(expression_of(node)?, offset, count)
    }

    async fn refresh(&self, node: &ValueNode, _options: EvalOptions) -> Result<ValueInfo> {
        let expr = expression_of(node)?;
        let snapshot = self.snapshot.read();
        Ok(describe(node.name(), expr, resolve(&snapshot, expr)?))
    }

    async fn set_value(&self, node: &ValueNode, value: &str) -> Result<()> {
        let parsed: Value = serde_json::from_str(value)
            .wrap_err_with(|| format!("'{value}' is not a JSON value"))?;

        let expr = expression_of(node)?;
        let mut snapshot = self.snapshot.write();
        *resolve_mut(&mut snapshot, expr)? = parsed;
        Ok(())
    }
}

/// Evaluates member paths such as `config.items[0]` against the snapshot
#[derive(Debug, Clone)]
pub struct JsonFrame {
    snapshot: Snapshot,
}

impl StackFrame for JsonFrame {
    async fn evaluate(&self, expr: &str) -> Result<ValueInfo> {
        let snapshot = self.snapshot.read();
        Ok(describe(expr, expr, resolve(&snapshot, expr)?))
    }

    fn evaluation_options(&self) -> EvalOptions {
        EvalOptions::default()
    }
}

/// Describe a JSON value, reached through `expr`, as a tree value
pub fn describe(name: &str, expr: &str, value: &Value) -> ValueInfo {
    let info = match value {
        Value::Null => ValueInfo::new(name, "null").null(),
        Value::Bool(_) | Value::Number(_) | Value::String(_) => {
            ValueInfo::new(name, value.to_string()).editable()
        }
        Value::Array(items) => ValueInfo::new(name, format!("[{} items]", items.len())).enumerable(),
        Value::Object(map) => ValueInfo::new(name, format!("{{{} fields}}", map.len())),
    };
    info.with_expression(expr)
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn resolve<'a>(root: &'a Value, path: &str) -> Result<&'a Value> {
    parse_member_path(path)?.iter().try_fold(root, |current, segment| {
        match (segment, current) {
            (PathSegment::Member(name), Value::Object(map)) => map.get(name),
            (PathSegment::Index(index), Value::Array(items)) => items.get(*index),
            _ => None,
        }
        .ok_or_else(|| eyre!("'{path}' does not name a value"))
    })
}

fn resolve_mut<'a>(root: &'a mut Value, path: &str) -> Result<&'a mut Value> {
    parse_member_path(path)?.iter().try_fold(root, |current, segment| {
        match (segment, current) {
            (PathSegment::Member(name), Value::Object(map)) => map.get_mut(name),
            (PathSegment::Index(index), Value::Array(items)) => items.get_mut(*index),
            _ => None,
        }
        .ok_or_else(|| eyre!("'{path}' does not name a value"))
    })
}
