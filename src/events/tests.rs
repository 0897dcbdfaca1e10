//! Event relay tests

use super::relay::{Callback, EventRelay};
use super::types::PageEvent;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn counter_callback(counter: &Arc<AtomicUsize>) -> Callback {
    let counter = Arc::clone(counter);
    Arc::new(move |_params: Value| {
        counter.fetch_add(1, Ordering::SeqCst);
    })
}

#[test]
fn test_persistent_listener_fires_every_time() {
    let relay = EventRelay::new();
    let count = Arc::new(AtomicUsize::new(0));
    relay.on(PageEvent::LoadFinished, counter_callback(&count));

    for _ in 0..3 {
        relay.dispatch("load-finished", json!("success"));
    }
    assert_eq!(count.load(Ordering::SeqCst), 3);
}

#[test]
fn test_once_fires_exactly_once() {
    let relay = EventRelay::new();
    let count = Arc::new(AtomicUsize::new(0));
    relay.once(PageEvent::LoadFinished, counter_callback(&count));

    for _ in 0..5 {
        relay.dispatch("load-finished", json!("success"));
    }
    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert_eq!(relay.listener_count(PageEvent::LoadFinished), 0);
}

#[test]
fn test_remove_listener_is_exact_match() {
    let relay = EventRelay::new();
    let removed_count = Arc::new(AtomicUsize::new(0));
    let kept_count = Arc::new(AtomicUsize::new(0));

    let removed = counter_callback(&removed_count);
    let kept = counter_callback(&kept_count);

    relay.on(PageEvent::ScriptError, Arc::clone(&removed));
    relay.on(PageEvent::ScriptError, Arc::clone(&kept));

    relay.dispatch("script-error", json!("boom"));
    relay.remove_listener(PageEvent::ScriptError, &removed);
    relay.dispatch("script-error", json!("boom"));

    assert_eq!(removed_count.load(Ordering::SeqCst), 1);
    assert_eq!(kept_count.load(Ordering::SeqCst), 2);
}

#[test]
fn test_dispatch_in_registration_order() {
    let relay = EventRelay::new();
    let order = Arc::new(std::sync::Mutex::new(Vec::new()));

    for tag in ["first", "second", "third"] {
        let order = Arc::clone(&order);
        relay.on(
            PageEvent::UrlChanged,
            Arc::new(move |_params| {
                order.lock().unwrap().push(tag);
            }),
        );
    }

    relay.dispatch("url-changed", json!("http://localhost:3000"));
    assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
}

#[test]
fn test_panicking_listener_is_isolated() {
    let relay = EventRelay::new();
    let count = Arc::new(AtomicUsize::new(0));

    relay.on(
        PageEvent::Alert,
        Arc::new(|_params| panic!("subscriber bug")),
    );
    relay.on(PageEvent::Alert, counter_callback(&count));

    relay.dispatch("alert", json!("test alert message"));
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn test_unknown_subscription_never_fires() {
    let relay = EventRelay::new();
    let count = Arc::new(AtomicUsize::new(0));
    relay.on("page-exploded", counter_callback(&count));

    for event in PageEvent::ALL {
        relay.dispatch(event.name(), Value::Null);
    }
    assert_eq!(count.load(Ordering::SeqCst), 0);
    assert_eq!(relay.listener_count("page-exploded"), 1);
}

#[tokio::test]
async fn test_pump_delivers_transport_notifications() {
    use crate::proc::{MockTransport, Transport};

    let transport = MockTransport::new();
    let relay = Arc::new(EventRelay::new());
    let _pump = Arc::clone(&relay).spawn_pump(transport.notifications());

    let count = Arc::new(AtomicUsize::new(0));
    relay.on(PageEvent::LoadFinished, counter_callback(&count));

    transport.emit(PageEvent::LoadFinished, json!("success"));
    transport.emit("not-a-real-event", json!("ignored"));
    transport.emit(PageEvent::LoadFinished, json!("success"));

    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert_eq!(count.load(Ordering::SeqCst), 2);
}
