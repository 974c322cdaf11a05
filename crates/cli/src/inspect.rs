// Copyright (C) 2024 Zhuo Zhang and Wuqi Zhang
// SPDX-License-Identifier: AGPL-3.0

//! The `inspect` command: walk a series of snapshots as consecutive stops

use std::{fs, path::Path, sync::Arc};

use eyre::{Result, WrapErr};
use serde_json::Value;
use tracing::{debug, info};
use vartree::{DebugBackend, NodeId, TreeConfig, TreeController};

use crate::{backend::JsonBackend, InspectArgs};

/// Run the inspect command, printing one tree per stop
pub async fn inspect(args: &InspectArgs) -> Result<()> {
    let config = match &args.config {
        Some(path) => TreeConfig::load_from_path(path)?,
        None => TreeConfig::default(),
    };

    let backend = Arc::new(JsonBackend::default());
    let controller = TreeController::new(Arc::clone(&backend), config);

    for (index, file) in args.files.iter().enumerate() {
        let snapshot = read_snapshot(file)?;
        info!("Stop {}: {}", index + 1, file.display());

        // The tree of the previous stop becomes the baseline
        controller.change_checkpoint();
        backend.load_snapshot(snapshot);
        controller.set_frame(Some(Arc::new(backend.frame())));

        populate(&controller, &backend, &args.watch, args.depth).await?;

        println!("== stop {}: {} ==", index + 1, file.display());
        print!("{}", render_tree(&controller));
    }

    controller.cancel_async_tasks();
    Ok(())
}

fn read_snapshot(path: &Path) -> Result<Value> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse snapshot: {}", path.display()))
}

/// Rebuild the tree for the current stop.
///
/// Values are expanded down to `depth`, and deeper wherever the previous stop
/// had them expanded.
pub async fn populate(
    controller: &TreeController<JsonBackend>,
    backend: &JsonBackend,
    watches: &[String],
    depth: usize,
) -> Result<()> {
    controller.clear_values();
    controller.add_values(backend.top_level()?);
    for expr in watches {
        if controller.add_expression(expr).await.is_none() {
            debug!(expr = %expr, "Watch not shown at this stop");
        }
    }

    let mut pending: Vec<(NodeId, usize)> =
        controller.children(controller.root()).into_iter().map(|id| (id, 0)).collect();
    while let Some((id, level)) = pending.pop() {
        let Some(node) = controller.node(id) else {
            continue;
        };
        if !backend.has_children(&node) {
            continue;
        }
        if level >= depth && !controller.was_expanded_at_checkpoint(id) {
            continue;
        }

        controller.expand_node(id).await;
        pending.extend(controller.children(id).into_iter().map(|child| (child, level + 1)));
    }

    Ok(())
}

/// Render the tree, one value per line, marking values changed since the
/// previous stop with `*`
pub fn render_tree<B: DebugBackend>(controller: &TreeController<B>) -> String {
    let mut out = String::new();
    for id in controller.children(controller.root()) {
        render_node(controller, id, 0, &mut out);
    }
    out
}

fn render_node<B: DebugBackend>(
    controller: &TreeController<B>,
    id: NodeId,
    level: usize,
    out: &mut String,
) {
    let Some(node) = controller.node(id) else {
        return;
    };
    let display =
        controller.get_display_value_with_visualizers(id).map(|display| display.text).unwrap_or_default();
    let marker = if controller.has_changed_since_checkpoint(id) { '*' } else { ' ' };
    let indent = "  ".repeat(level);

    out.push_str(&format!("{marker} {indent}{} = {display}\n", node.name()));

    if node.is_expanded() {
        for child in node.children() {
            render_node(controller, *child, level + 1, out);
        }
        if node.is_enumerable() && !node.children_loaded() {
            out.push_str(&format!("  {indent}  ...\n"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn controller_for(snapshot: Value) -> (Arc<JsonBackend>, TreeController<JsonBackend>) {
        let backend = Arc::new(JsonBackend::new(snapshot));
        let controller = TreeController::new(Arc::clone(&backend), TreeConfig::default());
        controller.set_frame(Some(Arc::new(backend.frame())));
        (backend, controller)
    }

    #[tokio::test]
    async fn test_render_respects_depth() {
        let (backend, controller) = controller_for(json!({ "a": { "b": { "c": 1 } } }));

        populate(&controller, &backend, &[], 1).await.unwrap();
        let rendered = render_tree(&controller);

        assert_eq!(rendered, "  a = {1 fields}\n    b = {1 fields}\n");
    }

    #[tokio::test]
    async fn test_render_marks_changed_values() {
        let (backend, controller) = controller_for(json!({ "x": 1, "y": 2 }));
        populate(&controller, &backend, &[], 1).await.unwrap();

        controller.change_checkpoint();
        backend.load_snapshot(json!({ "x": 1, "y": 3 }));
        populate(&controller, &backend, &[], 1).await.unwrap();

        assert_eq!(render_tree(&controller), "  x = 1\n* y = 3\n");
    }

    #[tokio::test]
    async fn test_expansion_carries_over_stops() {
        let (backend, controller) = controller_for(json!({ "a": { "b": { "c": 1 } } }));
        populate(&controller, &backend, &[], 0).await.unwrap();
        let b_parent = controller.find_by_path("a").unwrap();
        controller.expand_node(b_parent).await;
        let b = controller.find_by_path("a/b").unwrap();
        controller.expand_node(b).await;

        controller.change_checkpoint();
        backend.load_snapshot(json!({ "a": { "b": { "c": 2 } } }));
        populate(&controller, &backend, &[], 0).await.unwrap();

        assert_eq!(render_tree(&controller), "  a = {1 fields}\n    b = {1 fields}\n*     c = 2\n");
    }

    #[tokio::test]
    async fn test_render_shows_unloaded_pages() {
        let (backend, controller) = controller_for(json!({ "big": (0..30).collect::<Vec<_>>() }));
        populate(&controller, &backend, &[], 1).await.unwrap();

        let rendered = render_tree(&controller);
        assert!(rendered.contains("[19] = 19"));
        assert!(!rendered.contains("[20]"));
        assert!(rendered.ends_with("    ...\n"));
    }

    #[tokio::test]
    async fn test_dotted_watch_is_tracked_apart_from_member() {
        let (backend, controller) = controller_for(json!({ "a": { "b": { "c": 1 } } }));
        populate(&controller, &backend, &["a.b".to_string()], 1).await.unwrap();
        let watch = controller.find_by_path("a.b").unwrap();
        assert_eq!(controller.children(watch).len(), 1);
        assert!(!controller.node(controller.find_by_path("a/b").unwrap()).unwrap().is_expanded());

        controller.change_checkpoint();
        backend.load_snapshot(json!({ "a": { "b": { "c": 2 } } }));
        populate(&controller, &backend, &["a.b".to_string()], 0).await.unwrap();

        assert_eq!(
            render_tree(&controller),
            "  a = {1 fields}\n    b = {1 fields}\n  a.b = {1 fields}\n*   c = 2\n"
        );
    }

    #[tokio::test]
    async fn test_watch_expressions_are_appended() {
        let (backend, controller) = controller_for(json!({ "cfg": { "port": 8080 } }));
        populate(&controller, &backend, &["cfg.port".to_string(), "missing".to_string()], 0)
            .await
            .unwrap();

        assert_eq!(render_tree(&controller), "  cfg = {1 fields}\n  cfg.port = 8080\n");
    }
}
