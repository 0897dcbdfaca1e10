//! Command queue and chain tests

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tokio_test::assert_ok;

use super::client::Wraith;
use crate::config::Options;
use crate::proc::{MockTransport, Transport};
use crate::Error;

fn client_with(options: Options) -> (Arc<MockTransport>, Wraith) {
    let mock = MockTransport::new();
    let transport: Arc<dyn Transport> = mock.clone();
    let session = Wraith::with_transport(transport, options).unwrap();
    (mock, session)
}

fn client() -> (Arc<MockTransport>, Wraith) {
    client_with(Options::default())
}

#[tokio::test]
async fn test_operations_execute_in_enqueue_order() {
    let (mock, mut session) = client();

    // No intermediate awaits; the queue alone provides the ordering
    let last = session
        .evaluate("1")
        .evaluate("2")
        .evaluate("3")
        .evaluate("4")
        .evaluate("5")
        .settle()
        .await
        .unwrap();

    assert_eq!(last, "5");
    assert_eq!(
        mock.calls().await,
        vec![
            "evaluate 1",
            "evaluate 2",
            "evaluate 3",
            "evaluate 4",
            "evaluate 5",
        ]
    );
}

#[tokio::test]
async fn test_open_success_settles_with_status() {
    let (_mock, mut session) = client();

    let status = tokio_test::assert_ok!(session.open("http://localhost:3000").settle().await);
    assert_eq!(status, "success");
}

#[tokio::test]
async fn test_open_refused_rejects_with_navigation_failure() {
    let (mock, mut session) = client();
    mock.refuse("http://localhost:3001").await;

    let result = session.open("http://localhost:3001").settle().await;
    assert!(matches!(result, Err(Error::NavigationFailed(_))));
}

#[tokio::test]
async fn test_queue_continues_after_navigation_failure() {
    let (mock, mut session) = client();
    mock.refuse("http://localhost:3001").await;

    // The rejected open settles its own slot; the rest of the queue drains
    let title = session
        .open("http://localhost:3001")
        .open("http://localhost:3000")
        .title()
        .settle()
        .await
        .unwrap();

    assert_eq!(title, "Test");
    assert_eq!(
        mock.calls().await,
        vec!["open http://localhost:3001", "open http://localhost:3000", "title"]
    );
}

#[tokio::test]
async fn test_await_uses_the_current_tail() {
    let (_mock, mut session) = client();

    let title = session.open("http://localhost:3000").title().await.unwrap();
    assert_eq!(title, "Test");

    // Tail was consumed; a bare await settles with null
    let nothing = session.settle().await.unwrap();
    assert_eq!(nothing, Value::Null);
}

#[tokio::test]
async fn test_type_then_evaluate_round_trip() {
    let (_mock, mut session) = client();

    let value = session
        .open("http://localhost:3000")
        .type_text("#typehere", "test value")
        .evaluate("document.querySelector('#typehere').value")
        .await
        .unwrap();
    assert_eq!(value, "test value");

    // Re-applying the same input is idempotent
    let value = session
        .type_text("#typehere", "test value")
        .evaluate("document.querySelector('#typehere').value")
        .await
        .unwrap();
    assert_eq!(value, "test value");
}

#[tokio::test]
async fn test_content_round_trip() {
    let (_mock, mut session) = client();

    let content = session
        .set_content("<h1>Test</h1>")
        .content()
        .await
        .unwrap();
    assert_eq!(content, "<html><head></head><body><h1>Test</h1></body></html>");
}

#[tokio::test]
async fn test_click_wait_url_follows_a_link() {
    let (mock, mut session) = client();
    mock.link("#link", "http://localhost:3000/page1.html").await;

    let url = session
        .open("http://localhost:3000")
        .click("#link")
        .wait()
        .url()
        .await
        .unwrap();
    assert_eq!(url, "http://localhost:3000/page1.html");
}

#[tokio::test]
async fn test_history_traversal() {
    let (_mock, mut session) = client();

    let url = session
        .open("http://localhost:3000")
        .open("http://localhost:3000/page1.html")
        .back()
        .url()
        .await
        .unwrap();
    assert_eq!(url, "http://localhost:3000");

    let url = session.forward().url().await.unwrap();
    assert_eq!(url, "http://localhost:3000/page1.html");
}

#[tokio::test]
async fn test_timeout_rejects_within_threshold() {
    let (mock, mut session) = client_with(Options::default().with_timeout(200));
    mock.stall("open").await;

    let started = Instant::now();
    let result = session.open("http://localhost:3000").settle().await;
    let elapsed = started.elapsed();

    assert!(matches!(result, Err(Error::Timeout(_))));
    assert!(elapsed >= Duration::from_millis(200));
    assert!(elapsed < Duration::from_millis(2_000));

    // The chain is not hung; subsequent operations still run
    let title = session.title().settle().await.unwrap();
    assert_eq!(title, "Test");
}

#[tokio::test]
async fn test_wait_is_bounded_by_the_timeout() {
    let (_mock, mut session) = client_with(Options::default().with_timeout(100));

    // Nothing ever loads, so wait() can only settle by deadline
    let result = session.wait().settle().await;
    assert!(matches!(result, Err(Error::Timeout(_))));
}

#[tokio::test]
async fn test_delay_blocks_the_queue() {
    let (_mock, mut session) = client();

    let started = Instant::now();
    session.delay(80).evaluate("after").settle().await.unwrap();
    assert!(started.elapsed() >= Duration::from_millis(80));
}

#[tokio::test]
async fn test_exit_is_idempotent() {
    let (mock, mut session) = client();

    session.exit().await.unwrap();
    session.exit().await.unwrap();
    assert!(!mock.is_active());

    // Operations enqueued after exit settle rejected, not hung
    let result = session.title().settle().await;
    assert!(matches!(result, Err(Error::Communication(_))));
}

#[tokio::test]
async fn test_pid_is_stable_across_operations() {
    let (mock, mut session) = client();

    let before = session.pid();
    session.open("http://localhost:3000").title().await.unwrap();
    assert_eq!(session.pid(), before);
    assert_eq!(session.pid(), mock.pid());
}
