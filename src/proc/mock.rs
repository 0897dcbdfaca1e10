//! Mock transport for testing
//!
//! Simulates an agent process in memory: scripted responses, a small page
//! state machine, and synthetic notifications.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tracing::debug;

use super::traits::Transport;
use super::types::Notification;
use crate::events::PageEvent;
use crate::Error;

/// Fake pids start well above common OS pid ranges
static NEXT_PID: AtomicU32 = AtomicU32::new(40_001);

/// 1x1 transparent PNG, the payload returned for screenshot commands
const TINY_PNG_BASE64: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNk+M9QDwADhgGAWjR9awAAAABJRU5ErkJggg==";

/// Simulated page state
#[derive(Debug, Default)]
struct PageState {
    url: Option<String>,
    title: String,
    history: Vec<String>,
    cursor: usize,
    content: String,
    fields: HashMap<String, String>,
    focused: Option<String>,
}

/// Mock agent transport
#[derive(Debug)]
pub struct MockTransport {
    pid: u32,
    is_active: AtomicBool,
    notify_tx: broadcast::Sender<Notification>,
    state: Mutex<PageState>,
    /// URL prefixes that refuse connections
    refused: Mutex<Vec<String>>,
    /// Methods that never respond
    stalled: Mutex<HashSet<String>>,
    /// Selectors that navigate when clicked
    links: Mutex<HashMap<String, String>>,
    /// Primed evaluate results (script -> value)
    scripted: Mutex<HashMap<String, Value>>,
    /// Methods in invocation order
    calls: Mutex<Vec<String>>,
}

impl MockTransport {
    /// Create a new mock transport with a process-unique fake pid
    pub fn new() -> Arc<Self> {
        let (notify_tx, _) = broadcast::channel(256);
        Arc::new(Self {
            pid: NEXT_PID.fetch_add(1, Ordering::Relaxed),
            is_active: AtomicBool::new(true),
            notify_tx,
            state: Mutex::new(PageState {
                title: "Test".to_string(),
                ..PageState::default()
            }),
            refused: Mutex::new(Vec::new()),
            stalled: Mutex::new(HashSet::new()),
            links: Mutex::new(HashMap::new()),
            scripted: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Refuse connections to URLs with this prefix
    pub async fn refuse<S: Into<String>>(&self, prefix: S) {
        self.refused.lock().await.push(prefix.into());
    }

    /// Never respond to this method
    pub async fn stall<S: Into<String>>(&self, method: S) {
        self.stalled.lock().await.insert(method.into());
    }

    /// Make a selector navigate to a URL when clicked
    pub async fn link<S: Into<String>, U: Into<String>>(&self, selector: S, url: U) {
        self.links.lock().await.insert(selector.into(), url.into());
    }

    /// Prime an evaluate result
    pub async fn script<S: Into<String>>(&self, script: S, result: Value) {
        self.scripted.lock().await.insert(script.into(), result);
    }

    /// Set the simulated page title
    pub async fn set_title<S: Into<String>>(&self, title: S) {
        self.state.lock().await.title = title.into();
    }

    /// Methods invoked so far, in order
    pub async fn calls(&self) -> Vec<String> {
        self.calls.lock().await.clone()
    }

    /// Emit a synthetic notification
    pub fn emit<E: AsRef<str>>(&self, event: E, params: Value) {
        let _ = self.notify_tx.send(Notification {
            event: event.as_ref().to_string(),
            params,
        });
    }

    /// Emit the notification sequence of a successful page load
    fn emit_load(&self, url: &str) {
        self.emit(PageEvent::LoadStarted, Value::Null);
        self.emit(PageEvent::UrlChanged, json!(url));
        self.emit(
            PageEvent::ResourceRequested,
            json!({ "url": url, "method": "GET" }),
        );
        self.emit(PageEvent::ResourceReceived, json!({ "url": url }));
        self.emit(PageEvent::LoadFinished, json!("success"));
    }

    /// Record the visited URL, truncating any forward history
    async fn record_navigation(&self, url: &str) {
        let mut state = self.state.lock().await;
        if !state.history.is_empty() {
            let keep = state.cursor + 1;
            state.history.truncate(keep);
        }
        state.history.push(url.to_string());
        state.cursor = state.history.len() - 1;
        state.url = Some(url.to_string());
    }

    /// Wrap a fragment in a minimal document shell
    fn normalize_document(html: &str) -> String {
        if html.contains("<html") {
            html.to_string()
        } else {
            format!("<html><head></head><body>{}</body></html>", html)
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn request(&self, method: &str, params: Value) -> Result<Value, Error> {
        if !self.is_active.load(Ordering::Relaxed) {
            return Err(Error::communication("Mock transport is stopped"));
        }

        let call = match method {
            "open" => format!("open {}", params["url"].as_str().unwrap_or_default()),
            "click" => format!("click {}", params["selector"].as_str().unwrap_or_default()),
            "evaluate" => format!("evaluate {}", params["script"].as_str().unwrap_or_default()),
            _ => method.to_string(),
        };
        self.calls.lock().await.push(call);

        if self.stalled.lock().await.contains(method) {
            debug!("Mock: stalling {} forever", method);
            futures::future::pending::<()>().await;
            unreachable!();
        }

        match method {
            "open" => {
                let url = params["url"].as_str().unwrap_or_default().to_string();
                let refused = self.refused.lock().await;
                if refused.iter().any(|p| url.starts_with(p.as_str())) {
                    self.emit(PageEvent::LoadStarted, Value::Null);
                    self.emit(PageEvent::LoadFinished, json!("fail"));
                    return Ok(json!({ "status": "fail" }));
                }
                drop(refused);
                self.record_navigation(&url).await;
                self.emit_load(&url);
                Ok(json!({ "status": "success" }))
            }
            "title" => Ok(json!(self.state.lock().await.title)),
            "url" => Ok(json!(self.state.lock().await.url)),
            "click" => {
                let selector = params["selector"].as_str().unwrap_or_default();
                if let Some(target) = self.links.lock().await.get(selector).cloned() {
                    self.record_navigation(&target).await;
                    // Load events land shortly after the click settles, like a
                    // real navigation kicked off by the page
                    let tx = self.notify_tx.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                        let _ = tx.send(Notification {
                            event: PageEvent::LoadStarted.name().to_string(),
                            params: Value::Null,
                        });
                        let _ = tx.send(Notification {
                            event: PageEvent::UrlChanged.name().to_string(),
                            params: json!(target),
                        });
                        let _ = tx.send(Notification {
                            event: PageEvent::LoadFinished.name().to_string(),
                            params: json!("success"),
                        });
                    });
                }
                Ok(Value::Null)
            }
            "type" | "value" | "select" => {
                let selector = params["selector"].as_str().unwrap_or_default().to_string();
                let text = params["text"].as_str().unwrap_or_default().to_string();
                self.state.lock().await.fields.insert(selector, text);
                Ok(Value::Null)
            }
            "evaluate" => {
                let script = params["script"].as_str().unwrap_or_default();
                if let Some(result) = self.scripted.lock().await.get(script).cloned() {
                    return Ok(result);
                }
                let state = self.state.lock().await;
                if script.contains("document.title") {
                    return Ok(json!(state.title));
                }
                if let Some(value) = state
                    .fields
                    .iter()
                    .find(|(selector, _)| script.contains(selector.as_str()))
                    .map(|(_, value)| value.clone())
                {
                    return Ok(json!(value));
                }
                // Echo the script back, handy for ordering assertions
                Ok(json!(script))
            }
            "screenshot" | "screenshotElement" => Ok(json!({ "data": TINY_PNG_BASE64 })),
            "back" => {
                let mut state = self.state.lock().await;
                if state.cursor > 0 {
                    state.cursor -= 1;
                    let url = state.history[state.cursor].clone();
                    state.url = Some(url.clone());
                    drop(state);
                    self.emit(PageEvent::UrlChanged, json!(url));
                    self.emit(PageEvent::LoadFinished, json!("success"));
                }
                Ok(Value::Null)
            }
            "forward" => {
                let mut state = self.state.lock().await;
                if state.cursor + 1 < state.history.len() {
                    state.cursor += 1;
                    let url = state.history[state.cursor].clone();
                    state.url = Some(url.clone());
                    drop(state);
                    self.emit(PageEvent::UrlChanged, json!(url));
                    self.emit(PageEvent::LoadFinished, json!("success"));
                }
                Ok(Value::Null)
            }
            "refresh" => {
                let url = self.state.lock().await.url.clone().unwrap_or_default();
                self.emit(PageEvent::LoadStarted, Value::Null);
                self.emit(PageEvent::ResourceRequested, json!({ "url": url, "method": "GET" }));
                self.emit(PageEvent::LoadFinished, json!("success"));
                Ok(Value::Null)
            }
            "focus" => {
                let selector = params["selector"].as_str().unwrap_or_default().to_string();
                self.state.lock().await.focused = Some(selector.clone());
                Ok(json!(selector))
            }
            "injectJs" | "injectCss" => Ok(Value::Null),
            "content" => Ok(json!(self.state.lock().await.content)),
            "setContent" => {
                let html = params["html"].as_str().unwrap_or_default();
                self.state.lock().await.content = Self::normalize_document(html);
                Ok(Value::Null)
            }
            _ => Ok(Value::Null),
        }
    }

    fn notifications(&self) -> broadcast::Receiver<Notification> {
        self.notify_tx.subscribe()
    }

    async fn stop(&self) -> Result<(), Error> {
        self.is_active.store(false, Ordering::Relaxed);
        Ok(())
    }

    fn pid(&self) -> u32 {
        self.pid
    }

    fn is_active(&self) -> bool {
        self.is_active.load(Ordering::Relaxed)
    }
}
