// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::sync::atomic::{AtomicUsize, Ordering as O};
use std::sync::Arc;

#[tokio::test]
async fn handlers_run_in_descending_priority_order() {
    let bus = EventBus::default();
    let log = Arc::new(Mutex::new(Vec::<&'static str>::new()));

    let log1 = log.clone();
    bus.subscribe(
        Some(EventKind::WorkflowStarted),
        move |_e: &Event| {
            let log1 = log1.clone();
            async move {
                log1.lock().push("h1");
                Ok(())
            }
        },
        10,
        None,
    );

    let log2 = log.clone();
    bus.subscribe(
        Some(EventKind::WorkflowStarted),
        move |_e: &Event| {
            let log2 = log2.clone();
            async move {
                log2.lock().push("h2");
                Ok(())
            }
        },
        1,
        None,
    );

    bus.publish(Event::new(EventKind::WorkflowStarted, "test")).await;
    assert_eq!(*log.lock(), vec!["h1", "h2"]);
}

#[tokio::test]
async fn stop_propagation_skips_lower_priority_handlers() {
    let bus = EventBus::default();
    let called = Arc::new(AtomicUsize::new(0));

    bus.subscribe(
        Some(EventKind::WorkflowStarted),
        |e: &Event| async move {
            e.stop_propagation();
            Ok(())
        },
        10,
        None,
    );

    let called2 = called.clone();
    bus.subscribe(
        Some(EventKind::WorkflowStarted),
        move |_e: &Event| {
            let called2 = called2.clone();
            async move {
                called2.fetch_add(1, O::SeqCst);
                Ok(())
            }
        },
        1,
        None,
    );

    bus.publish(Event::new(EventKind::WorkflowStarted, "test")).await;
    assert_eq!(called.load(O::SeqCst), 0);
}

#[tokio::test]
async fn handler_errors_are_isolated_and_counted() {
    let bus = EventBus::default();
    bus.subscribe(
        None,
        |_e: &Event| async move { Err(HandlerError::from("boom")) },
        0,
        None,
    );
    bus.subscribe(None, |_e: &Event| async move { Ok(()) }, 0, None);

    bus.publish(Event::new(EventKind::Custom("x".into()), "test")).await;
    let metrics = bus.metrics();
    assert_eq!(metrics.handler_errors, 1);
    assert_eq!(metrics.total_published, 1);
}

#[tokio::test]
async fn filter_excludes_non_matching_events() {
    let bus = EventBus::default();
    let called = Arc::new(AtomicUsize::new(0));
    let called2 = called.clone();
    let filter: EventFilter = Arc::new(|e: &Event| e.source == "wanted");
    bus.subscribe(
        None,
        move |_e: &Event| {
            let called2 = called2.clone();
            async move {
                called2.fetch_add(1, O::SeqCst);
                Ok(())
            }
        },
        0,
        Some(filter),
    );

    bus.publish(Event::new(EventKind::Custom("x".into()), "unwanted")).await;
    assert_eq!(called.load(O::SeqCst), 0);
    bus.publish(Event::new(EventKind::Custom("x".into()), "wanted")).await;
    assert_eq!(called.load(O::SeqCst), 1);
}

#[tokio::test]
async fn unsubscribe_removes_handler() {
    let bus = EventBus::default();
    let called = Arc::new(AtomicUsize::new(0));
    let called2 = called.clone();
    let id = bus.subscribe(
        None,
        move |_e: &Event| {
            let called2 = called2.clone();
            async move {
                called2.fetch_add(1, O::SeqCst);
                Ok(())
            }
        },
        0,
        None,
    );
    assert!(bus.unsubscribe(id));
    bus.publish(Event::new(EventKind::Custom("x".into()), "test")).await;
    assert_eq!(called.load(O::SeqCst), 0);
}

#[tokio::test]
async fn history_is_bounded_and_preserves_order() {
    let bus = EventBus::new(2);
    bus.publish(Event::new(EventKind::Custom("a".into()), "t")).await;
    bus.publish(Event::new(EventKind::Custom("b".into()), "t")).await;
    bus.publish(Event::new(EventKind::Custom("c".into()), "t")).await;

    let history = bus.history(None);
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].kind.to_string(), "b");
    assert_eq!(history[1].kind.to_string(), "c");
}

#[tokio::test]
async fn publish_batch_preserves_input_order() {
    let bus = EventBus::default();
    let log = Arc::new(Mutex::new(Vec::<String>::new()));
    let log2 = log.clone();
    bus.subscribe(
        None,
        move |e: &Event| {
            let log2 = log2.clone();
            let src = e.source.clone();
            async move {
                log2.lock().push(src);
                Ok(())
            }
        },
        0,
        None,
    );

    let events = vec![
        Event::new(EventKind::Custom("x".into()), "1"),
        Event::new(EventKind::Custom("x".into()), "2"),
        Event::new(EventKind::Custom("x".into()), "3"),
    ];
    let returned = bus.publish_batch(events).await;
    assert_eq!(returned.len(), 3);
    assert_eq!(*log.lock(), vec!["1", "2", "3"]);
}

#[test]
fn event_kind_roundtrips_through_wire_string() {
    assert_eq!(EventKind::from_wire_str("rollback_initiated"), EventKind::RollbackInitiated);
    assert_eq!(EventKind::from_wire_str("my_custom").to_string(), "my_custom");
    assert_eq!(EventKind::WorkflowStarted.to_string(), "workflow_started");
}

#[test]
fn event_clone_does_not_share_stop_flag() {
    let e1 = Event::new(EventKind::Progress, "s");
    e1.stop_propagation();
    let e2 = e1.clone();
    assert!(e2.is_propagation_stopped());
    // Each Event owns its own flag after clone; flipping one doesn't
    // retroactively change the other's already-copied state.
    assert!(e1.is_propagation_stopped());
}
