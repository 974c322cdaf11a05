// Copyright (C) 2024 Zhuo Zhang and Wuqi Zhang
// SPDX-License-Identifier: AGPL-3.0

//! Child loading through the controller: expansion, paging, coalescing,
//! failures and cancellation

use std::{collections::HashSet, sync::Arc};

use tracing::info;
use vartree::{TreeEvent, ValueInfo};
use vartree_integration_tests::test_utils::{
    fixtures::{drain, indexed, named},
    init::{controller, controller_with_frame},
    logging::capture_warnings,
    mock::{MockBackend, MockFrame},
};

#[tokio::test]
async fn test_expand_loads_all_children_of_plain_value() {
    let backend = Arc::new(MockBackend::new().with_children("obj", named(&["a", "b", "c"])));
    let controller = controller(&backend);
    let obj = controller.add_value(ValueInfo::new("obj", "{..}")).unwrap();
    let mut rx = controller.subscribe();

    assert_eq!(controller.expand_node(obj).await, 3);

    assert_eq!(backend.load_requests(), vec![("obj".to_string(), 0, None)]);
    assert_eq!(
        drain(&mut rx),
        vec![TreeEvent::ChildrenLoaded { node: obj, start: 0, count: 3 }, TreeEvent::NodeExpanded(obj)]
    );

    let node = controller.node(obj).unwrap();
    assert!(node.is_expanded());
    assert!(node.children_loaded());
    assert!(controller.find_by_path("obj/b").is_some());
}

#[tokio::test]
async fn test_expand_is_idempotent() {
    let backend = Arc::new(MockBackend::new().with_children("obj", named(&["a", "b"])));
    let controller = controller(&backend);
    let obj = controller.add_value(ValueInfo::new("obj", "{..}")).unwrap();

    assert_eq!(controller.expand_node(obj).await, 2);
    let mut rx = controller.subscribe();

    info!("Expanding an expanded node");
    assert_eq!(controller.expand_node(obj).await, 0);
    assert_eq!(backend.load_calls(), 1);
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn test_empty_expansion_still_notifies() {
    let backend = Arc::new(MockBackend::new());
    let controller = controller(&backend);
    let leaf = controller.add_value(ValueInfo::new("leaf", "{}")).unwrap();
    let mut rx = controller.subscribe();

    assert_eq!(controller.expand_node(leaf).await, 0);
    assert_eq!(drain(&mut rx), vec![TreeEvent::NodeExpanded(leaf)]);
}

#[tokio::test]
async fn test_enumerable_children_are_paged() {
    let backend = Arc::new(MockBackend::new().with_children("list", indexed(45)));
    let controller = controller(&backend);
    let list = controller.add_value(ValueInfo::new("list", "[45]").enumerable()).unwrap();
    let mut rx = controller.subscribe();

    assert_eq!(controller.expand_node(list).await, 20);
    assert!(!controller.node(list).unwrap().children_loaded());
    assert_eq!(controller.fetch_more_children(list).await, 20);
    assert_eq!(controller.fetch_more_children(list).await, 5);
    assert!(controller.node(list).unwrap().children_loaded());

    // Fully loaded: no further backend call
    assert_eq!(controller.fetch_more_children(list).await, 0);
    assert_eq!(
        backend.load_requests(),
        vec![
            ("list".to_string(), 0, Some(20)),
            ("list".to_string(), 20, Some(20)),
            ("list".to_string(), 40, Some(20)),
        ]
    );

    let loaded: Vec<(usize, usize)> = drain(&mut rx)
        .into_iter()
        .filter_map(|event| match event {
            TreeEvent::ChildrenLoaded { start, count, .. } => Some((start, count)),
            _ => None,
        })
        .collect();
    assert_eq!(loaded, vec![(0, 20), (20, 20), (40, 5)]);

    let last = controller.find_by_path("list/[44]").unwrap();
    assert_eq!(controller.node(last).unwrap().value(), "44");
}

#[tokio::test]
async fn test_fetch_more_requires_expansion() {
    let backend = Arc::new(MockBackend::new().with_children("list", indexed(5)));
    let controller = controller(&backend);
    let list = controller.add_value(ValueInfo::new("list", "[5]").enumerable()).unwrap();

    assert_eq!(controller.fetch_more_children(list).await, 0);
    assert_eq!(backend.load_calls(), 0);
}

#[tokio::test]
async fn test_concurrent_fetches_share_one_backend_call() {
    let backend = Arc::new(MockBackend::new().with_children("list", indexed(50)));
    let controller = controller(&backend);
    let list = controller.add_value(ValueInfo::new("list", "[50]").enumerable()).unwrap();
    let gate = backend.gate_loads();

    let (expanded, more, again, ()) = tokio::join!(
        controller.expand_node(list),
        controller.fetch_more_children(list),
        controller.fetch_more_children(list),
        async {
            while controller.in_flight_fetches() == 0 {
                tokio::task::yield_now().await;
            }
            assert_eq!(controller.in_flight_fetches(), 1);
            gate.add_permits(1);
        }
    );

    assert_eq!((expanded, more, again), (20, 20, 20));
    assert_eq!(backend.load_calls(), 1);
    assert_eq!(controller.children(list).len(), 20);
    assert_eq!(controller.in_flight_fetches(), 0);
}

#[tokio::test]
async fn test_failed_fetch_reports_zero_and_recovers() {
    let backend = Arc::new(MockBackend::new().with_children("obj", named(&["a", "b", "c"])));
    let controller = controller(&backend);
    let obj = controller.add_value(ValueInfo::new("obj", "{..}")).unwrap();
    let (warnings, _guard) = capture_warnings();

    backend.fail_loads(true);
    assert_eq!(controller.expand_node(obj).await, 0);
    assert_eq!(controller.in_flight_fetches(), 0);
    assert!(warnings.contains("Failed to load children"));

    let node = controller.node(obj).unwrap();
    assert!(node.is_expanded());
    assert!(!node.children_loaded());

    backend.fail_loads(false);
    assert!(controller.collapse_node(obj));
    assert_eq!(controller.expand_node(obj).await, 3);
}

#[tokio::test]
async fn test_cancel_settles_pending_fetch() {
    let backend = Arc::new(MockBackend::new().with_children("obj", named(&["a"])));
    let controller = controller(&backend);
    let obj = controller.add_value(ValueInfo::new("obj", "{..}")).unwrap();
    let other = controller.add_value(ValueInfo::new("other", "{..}")).unwrap();
    let _gate = backend.gate_loads();

    let (loaded, ()) = tokio::join!(controller.expand_node(obj), async {
        while controller.in_flight_fetches() == 0 {
            tokio::task::yield_now().await;
        }
        controller.cancel_async_tasks();
    });

    assert_eq!(loaded, 0);
    assert_eq!(controller.in_flight_fetches(), 0);

    // Idempotent, and later fetches settle at once
    controller.cancel_async_tasks();
    assert_eq!(controller.expand_node(other).await, 0);
    assert_eq!(controller.in_flight_fetches(), 0);
    assert_eq!(backend.load_calls(), 1);
}

#[tokio::test]
async fn test_collapse_keeps_children_cached() {
    let backend = Arc::new(MockBackend::new().with_children("obj", named(&["a", "b"])));
    let controller = controller(&backend);
    let obj = controller.add_value(ValueInfo::new("obj", "{..}")).unwrap();

    controller.expand_node(obj).await;
    assert!(controller.collapse_node(obj));
    assert!(!controller.collapse_node(obj));
    assert_eq!(controller.children(obj).len(), 2);

    let mut rx = controller.subscribe();
    assert_eq!(controller.expand_node(obj).await, 0);
    assert_eq!(backend.load_calls(), 1);
    assert_eq!(drain(&mut rx), vec![TreeEvent::NodeExpanded(obj)]);
}

#[tokio::test]
async fn test_loaded_children_are_watched_while_evaluating() {
    let backend = Arc::new(MockBackend::new().with_children(
        "obj",
        vec![ValueInfo::new("slow", "").evaluating(), ValueInfo::new("fast", "1")],
    ));
    let controller = controller(&backend);
    let obj = controller.add_value(ValueInfo::new("obj", "{..}")).unwrap();

    controller.expand_node(obj).await;

    let slow = controller.find_by_path("obj/slow").unwrap();
    assert!(controller.is_pending_evaluation(slow));
    assert_eq!(controller.pending_evaluations(), 1);
}

#[tokio::test]
async fn test_page_arriving_after_clear_is_dropped() {
    let backend = Arc::new(MockBackend::new().with_children("list", indexed(30)));
    let controller = controller(&backend);
    let list = controller.add_value(ValueInfo::new("list", "[30]").enumerable()).unwrap();
    let gate = backend.gate_loads();

    let (loaded, ()) = tokio::join!(controller.expand_node(list), async {
        while controller.in_flight_fetches() == 0 {
            tokio::task::yield_now().await;
        }
        controller.clear_values();
        gate.add_permits(1);
    });

    assert_eq!(loaded, 0);
    assert_eq!(controller.in_flight_fetches(), 0);
    assert!(controller.node(list).is_none());
    assert!(controller.children(controller.root()).is_empty());
    // Nothing but the new root is left in the arena
    assert_eq!(controller.with_tree(|tree| tree.len()), 1);
}

#[tokio::test]
async fn test_refresh_during_load_leaves_one_set_of_children() {
    let backend = Arc::new(MockBackend::new().with_children("list", indexed(30)));
    let (controller, _frame) = controller_with_frame(&backend, MockFrame::new());
    let list = controller.add_value(ValueInfo::new("list", "[30]").enumerable()).unwrap();
    let gate = backend.gate_loads();

    let (expanded, refreshed, ()) = tokio::join!(
        controller.expand_node(list),
        async {
            while controller.in_flight_fetches() == 0 {
                tokio::task::yield_now().await;
            }
            controller.refresh_node(list).await
        },
        async {
            while backend.refresh_requests().is_empty() {
                tokio::task::yield_now().await;
            }
            gate.add_permits(2);
        }
    );

    assert_eq!(expanded, 20);
    assert!(refreshed);
    assert_eq!(backend.load_calls(), 2);
    assert_eq!(controller.in_flight_fetches(), 0);

    let children = controller.children(list);
    assert_eq!(children.len(), 20);
    let paths: HashSet<String> = children
        .iter()
        .map(|id| {
            let child = controller.node(*id).unwrap();
            assert_eq!(child.parent(), Some(list));
            child.path().to_string()
        })
        .collect();
    assert_eq!(paths.len(), 20);
    // Root, the list and one page of children
    assert_eq!(controller.with_tree(|tree| tree.len()), 22);
}
