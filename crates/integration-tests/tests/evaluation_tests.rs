// Copyright (C) 2024 Zhuo Zhang and Wuqi Zhang
// SPDX-License-Identifier: AGPL-3.0

//! Evaluation watches, group placeholders and watch expressions

use std::sync::Arc;

use vartree::{TreeConfig, TreeEvent, ValueInfo};
use vartree_integration_tests::test_utils::{
    fixtures::{drain, named},
    init::{controller, controller_with_config, controller_with_frame},
    mock::{MockBackend, MockFrame},
};

#[tokio::test]
async fn test_add_values_registers_evaluating_values() {
    let backend = Arc::new(MockBackend::new());
    let controller = controller(&backend);
    let root = controller.root();
    let mut rx = controller.subscribe();

    let ids = controller
        .add_values(vec![ValueInfo::new("a", "").evaluating(), ValueInfo::new("b", "2")]);

    assert_eq!(ids.len(), 2);
    assert_eq!(controller.children(root), ids);
    assert_eq!(drain(&mut rx), vec![TreeEvent::ChildrenLoaded { node: root, start: 0, count: 2 }]);
    assert!(controller.is_pending_evaluation(ids[0]));
    assert!(!controller.is_pending_evaluation(ids[1]));

    let more = controller.add_values(named(&["c"]));
    assert_eq!(drain(&mut rx), vec![TreeEvent::ChildrenLoaded { node: root, start: 2, count: 1 }]);
    assert_eq!(controller.children(root)[2], more[0]);
}

#[tokio::test]
async fn test_value_change_completes_once() {
    let backend = Arc::new(MockBackend::new());
    let controller = controller(&backend);
    let slow = controller.add_value(ValueInfo::new("slow", "").evaluating()).unwrap();
    let mut rx = controller.subscribe();
    let notifier = controller.notifier();

    assert!(notifier.value_changed(slow, ValueInfo::new("slow", "42")));
    assert!(notifier.value_changed(slow, ValueInfo::new("slow", "43")));
    assert_eq!(controller.process_value_changes(), 2);

    assert_eq!(
        drain(&mut rx),
        vec![TreeEvent::EvaluationCompleted { node: slow, replacements: vec![slow] }]
    );
    assert_eq!(controller.node(slow).unwrap().value(), "43");
    assert_eq!(controller.pending_evaluations(), 0);
}

#[tokio::test]
async fn test_register_for_completion_can_fire_immediately() {
    let backend = Arc::new(MockBackend::new());
    let controller = controller(&backend);
    let done = controller.add_value(ValueInfo::new("done", "1")).unwrap();
    let mut rx = controller.subscribe();

    controller.register_for_completion(done, false);
    assert!(drain(&mut rx).is_empty());

    controller.register_for_completion(done, true);
    assert_eq!(
        drain(&mut rx),
        vec![TreeEvent::EvaluationCompleted { node: done, replacements: vec![done] }]
    );
    assert_eq!(controller.pending_evaluations(), 0);
}

#[tokio::test]
async fn test_reregistration_does_not_duplicate() {
    let backend = Arc::new(MockBackend::new());
    let controller = controller(&backend);
    let slow = controller.add_value(ValueInfo::new("slow", "").evaluating()).unwrap();

    controller.register_for_completion(slow, false);
    controller.register_for_completion(slow, true);
    assert_eq!(controller.pending_evaluations(), 1);

    let mut rx = controller.subscribe();
    controller.on_value_changed(slow, ValueInfo::new("slow", "1"));
    assert_eq!(drain(&mut rx).len(), 1);
}

#[tokio::test]
async fn test_group_placeholder_is_replaced_in_place() {
    let backend = Arc::new(MockBackend::new());
    let controller = controller(&backend);
    let root = controller.root();
    let ids = controller.add_values(vec![
        ValueInfo::new("first", "1"),
        ValueInfo::group("locals"),
        ValueInfo::new("last", "2"),
    ]);
    let group = ids[1];
    let mut rx = controller.subscribe();

    controller.on_value_changed(
        group,
        ValueInfo::group("locals").resolved_group(named(&["x", "y", "z"])),
    );

    let events = drain(&mut rx);
    assert_eq!(events.len(), 1);
    let TreeEvent::EvaluationCompleted { node, replacements } = &events[0] else {
        panic!("unexpected event {:?}", events[0]);
    };
    assert_eq!(*node, group);
    assert_eq!(replacements.len(), 3);

    let children = controller.children(root);
    assert_eq!(children.len(), 5);
    assert_eq!(children[0], ids[0]);
    assert_eq!(&children[1..4], replacements.as_slice());
    assert_eq!(children[4], ids[2]);
    assert!(controller.node(group).is_none());

    let names: Vec<String> =
        replacements.iter().map(|id| controller.node(*id).unwrap().name().to_string()).collect();
    assert_eq!(names, vec!["x", "y", "z"]);
}

#[tokio::test]
async fn test_evaluating_replacements_are_watched() {
    let backend = Arc::new(MockBackend::new());
    let controller = controller(&backend);
    let group = controller.add_value(ValueInfo::group("locals")).unwrap();

    controller.on_value_changed(
        group,
        ValueInfo::group("locals").resolved_group(vec![ValueInfo::new("pending", "").evaluating()]),
    );

    let pending = controller.find_by_path("pending").unwrap();
    assert!(controller.is_pending_evaluation(pending));

    let mut rx = controller.subscribe();
    controller.on_value_changed(pending, ValueInfo::new("pending", "5"));
    assert_eq!(
        drain(&mut rx),
        vec![TreeEvent::EvaluationCompleted { node: pending, replacements: vec![pending] }]
    );
}

#[tokio::test]
async fn test_group_under_plain_parent_is_not_spliced() {
    let backend = Arc::new(
        MockBackend::new()
            .with_children("obj", vec![ValueInfo::new("a", "1"), ValueInfo::group("extra")]),
    );
    let controller = controller(&backend);
    let obj = controller.add_value(ValueInfo::new("obj", "{..}")).unwrap();
    controller.expand_node(obj).await;
    let group = controller.find_by_path("obj/extra").unwrap();
    let mut rx = controller.subscribe();

    controller.on_value_changed(group, ValueInfo::group("extra").resolved_group(named(&["q"])));

    let events = drain(&mut rx);
    let TreeEvent::EvaluationCompleted { replacements, .. } = &events[0] else {
        panic!("unexpected event {:?}", events[0]);
    };
    assert_eq!(replacements.len(), 1);
    assert_eq!(controller.children(obj).len(), 2);
    assert!(controller.children(obj).contains(&group));
}

#[tokio::test]
async fn test_remove_value_announces_removal() {
    let backend = Arc::new(MockBackend::new());
    let controller = controller(&backend);
    let root = controller.root();
    let slow = controller.add_value(ValueInfo::new("slow", "").evaluating()).unwrap();
    let mut rx = controller.subscribe();

    assert!(controller.remove_value(slow));

    assert_eq!(
        drain(&mut rx),
        vec![TreeEvent::EvaluationCompleted { node: slow, replacements: vec![] }]
    );
    assert_eq!(controller.pending_evaluations(), 0);
    assert!(controller.children(root).is_empty());
    assert!(!controller.remove_value(slow));
}

#[tokio::test]
async fn test_clear_all_drops_watches() {
    let backend = Arc::new(MockBackend::new());
    let controller = controller(&backend);
    let old_root = controller.root();
    let slow = controller.add_value(ValueInfo::new("slow", "").evaluating()).unwrap();
    let mut rx = controller.subscribe();

    controller.clear_all();

    let root = controller.root();
    assert_ne!(root, old_root);
    assert_eq!(drain(&mut rx), vec![TreeEvent::ChildrenLoaded { node: root, start: 0, count: 0 }]);
    assert_eq!(controller.pending_evaluations(), 0);
    assert!(controller.node(slow).is_none());

    controller.on_value_changed(slow, ValueInfo::new("slow", "1"));
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn test_clear_values_keeps_watches() {
    let backend = Arc::new(MockBackend::new());
    let controller = controller(&backend);
    controller.add_value(ValueInfo::new("slow", "").evaluating());

    controller.clear_values();

    assert_eq!(controller.pending_evaluations(), 1);
    assert!(controller.children(controller.root()).is_empty());
}

#[tokio::test]
async fn test_add_expression_evaluates_in_frame() {
    let backend = Arc::new(MockBackend::new());
    let frame = MockFrame::new().with_value("a + b", ValueInfo::new("a + b", "3"));
    let (controller, frame) = controller_with_frame(&backend, frame);

    let id = controller.add_expression("  a  +\n b ").await.unwrap();

    assert_eq!(frame.evaluated(), vec!["a + b"]);
    assert_eq!(controller.node(id).unwrap().value(), "3");
    assert_eq!(controller.children(controller.root()), vec![id]);
}

#[tokio::test]
async fn test_add_expression_failures_are_contained() {
    let backend = Arc::new(MockBackend::new());
    let (controller, frame) = controller_with_frame(&backend, MockFrame::new());

    assert!(controller.add_expression("missing").await.is_none());
    assert!(controller.add_expression("   ").await.is_none());
    assert_eq!(frame.evaluated(), vec!["missing"]);

    // Without a frame nothing is evaluated
    controller.set_frame(None);
    assert!(controller.add_expression("missing").await.is_none());
    assert_eq!(frame.evaluated().len(), 1);
    assert!(controller.children(controller.root()).is_empty());
}

#[tokio::test]
async fn test_watch_expressions_can_be_disabled() {
    let backend = Arc::new(MockBackend::new());
    let config = TreeConfig { watch_expressions: false, ..Default::default() };
    let controller = controller_with_config(&backend, config);
    let frame = Arc::new(MockFrame::new().with_value("x", ValueInfo::new("x", "1")));
    controller.set_frame(Some(Arc::clone(&frame)));

    assert!(controller.add_expression("x").await.is_none());
    assert!(controller.add_expressions(&["x".to_string()]).await.is_empty());
    assert!(frame.evaluated().is_empty());
}

#[tokio::test]
async fn test_add_expressions_in_order() {
    let backend = Arc::new(MockBackend::new());
    let frame = MockFrame::new()
        .with_value("x", ValueInfo::new("x", "1"))
        .with_value("y", ValueInfo::new("y", "2"));
    let (controller, _frame) = controller_with_frame(&backend, frame);
    let mut rx = controller.subscribe();

    let ids = controller.add_expressions(&["x".to_string(), "".to_string(), "y".to_string()]).await;

    assert_eq!(ids.len(), 2);
    assert_eq!(controller.node(ids[0]).unwrap().name(), "x");
    assert_eq!(controller.node(ids[1]).unwrap().name(), "y");
    assert_eq!(
        drain(&mut rx),
        vec![TreeEvent::ChildrenLoaded { node: controller.root(), start: 0, count: 2 }]
    );
}

#[tokio::test]
async fn test_edit_expression_replaces_node() {
    let backend = Arc::new(MockBackend::new());
    let frame = MockFrame::new()
        .with_value("x", ValueInfo::new("x", "1"))
        .with_value("y", ValueInfo::new("y", "2"));
    let (controller, _frame) = controller_with_frame(&backend, frame);
    let x = controller.add_expression("x").await.unwrap();
    let mut rx = controller.subscribe();

    assert!(controller.edit_expression(x, "y").await);

    let children = controller.children(controller.root());
    assert_eq!(children.len(), 1);
    assert_eq!(controller.node(children[0]).unwrap().value(), "2");
    assert_eq!(
        drain(&mut rx),
        vec![TreeEvent::EvaluationCompleted { node: x, replacements: children }]
    );
}

#[tokio::test]
async fn test_edit_expression_to_empty_deletes() {
    let backend = Arc::new(MockBackend::new());
    let frame = MockFrame::new().with_value("x", ValueInfo::new("x", "1"));
    let (controller, _frame) = controller_with_frame(&backend, frame);
    let x = controller.add_expression("x").await.unwrap();
    let mut rx = controller.subscribe();

    assert!(controller.edit_expression(x, "  ").await);

    assert!(controller.children(controller.root()).is_empty());
    assert_eq!(
        drain(&mut rx),
        vec![TreeEvent::EvaluationCompleted { node: x, replacements: vec![] }]
    );
}

#[tokio::test]
async fn test_edit_expression_failure_keeps_node() {
    let backend = Arc::new(MockBackend::new());
    let frame = MockFrame::new().with_value("x", ValueInfo::new("x", "1"));
    let (controller, _frame) = controller_with_frame(&backend, frame);
    let x = controller.add_expression("x").await.unwrap();

    assert!(!controller.edit_expression(x, "nope").await);
    assert_eq!(controller.children(controller.root()), vec![x]);
}
