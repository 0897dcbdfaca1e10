//! Command queue worker
//!
//! One worker task per session drains the queue and executes operations
//! strictly in enqueue order, each bounded by the session deadline.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde_json::{json, Value};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::op::{Operation, Queued};
use crate::events::PageEvent;
use crate::proc::types::{
    ContentParams, EvaluateParams, InjectParams, OpenParams, ScreenshotParams, SelectorParams,
    TextParams,
};
use crate::proc::Transport;
use crate::{Error, Result};

/// Spawn the queue worker for one session
///
/// The worker exits when every queue sender is dropped. A failed operation
/// settles its own slot and the worker keeps draining; the queue is only
/// ever advanced here, so operations never interleave.
pub(crate) fn spawn_worker(
    transport: Arc<dyn Transport>,
    deadline: Duration,
    mut queue: mpsc::UnboundedReceiver<Queued>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(queued) = queue.recv().await {
            let kind = queued.op.kind();
            let outcome = match tokio::time::timeout(deadline, execute(&transport, queued.op)).await
            {
                Ok(result) => result,
                Err(_) => Err(Error::timeout(format!(
                    "{} did not settle within {}ms",
                    kind,
                    deadline.as_millis()
                ))),
            };

            if let Err(error) = &outcome {
                debug!("Operation {} settled rejected: {}", kind, error);
            }

            // The caller may have dropped its settlement receiver; that is
            // not the queue's problem
            let _ = queued.settle.send(outcome);
        }
        debug!("Command queue closed, worker exiting");
    })
}

/// Execute one operation against the session's transport
async fn execute(transport: &Arc<dyn Transport>, op: Operation) -> Result<Value> {
    match op {
        Operation::Open { url } => {
            let params = serde_json::to_value(OpenParams { url: url.clone() })?;
            let result = transport.request("open", params).await?;
            match result["status"].as_str() {
                Some("success") => Ok(json!("success")),
                Some(status) => Err(Error::navigation_failed(format!("{}: {}", url, status))),
                None => Err(Error::protocol("open response carried no status")),
            }
        }
        Operation::Title => transport.request("title", Value::Null).await,
        Operation::Url => transport.request("url", Value::Null).await,
        Operation::Click { selector } => {
            let params = serde_json::to_value(SelectorParams { selector })?;
            transport.request("click", params).await
        }
        Operation::TypeText { selector, text } => {
            let params = serde_json::to_value(TextParams { selector, text })?;
            transport.request("type", params).await
        }
        Operation::SetValue { selector, text } => {
            let params = serde_json::to_value(TextParams { selector, text })?;
            transport.request("value", params).await
        }
        Operation::Select { selector, value } => {
            let params = serde_json::to_value(TextParams {
                selector,
                text: value,
            })?;
            transport.request("select", params).await
        }
        Operation::Screenshot { path } => capture(transport, None, &path).await,
        Operation::ScreenshotDomElement { selector, path } => {
            capture(transport, Some(selector), &path).await
        }
        Operation::Back => transport.request("back", Value::Null).await,
        Operation::Forward => transport.request("forward", Value::Null).await,
        Operation::Refresh => transport.request("refresh", Value::Null).await,
        Operation::Focus { selector } => {
            let params = serde_json::to_value(SelectorParams { selector })?;
            transport.request("focus", params).await
        }
        Operation::InjectJs { path } => {
            let source = tokio::fs::read_to_string(&path).await?;
            let params = serde_json::to_value(InjectParams { source })?;
            transport.request("injectJs", params).await
        }
        Operation::InjectCss { css } => {
            let params = serde_json::to_value(InjectParams { source: css })?;
            transport.request("injectCss", params).await
        }
        Operation::Content => transport.request("content", Value::Null).await,
        Operation::SetContent { html } => {
            let params = serde_json::to_value(ContentParams { html })?;
            transport.request("setContent", params).await
        }
        Operation::Evaluate { script } => {
            let params = serde_json::to_value(EvaluateParams { script })?;
            transport.request("evaluate", params).await
        }
        Operation::Wait => wait_for_load(transport).await,
        Operation::Delay { ms } => {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            Ok(Value::Null)
        }
    }
}

/// Block until the next load-finished notification; settles with its status
async fn wait_for_load(transport: &Arc<dyn Transport>) -> Result<Value> {
    let mut notifications = transport.notifications();
    loop {
        match notifications.recv().await {
            Ok(notification) if notification.event == PageEvent::LoadFinished.name() => {
                return Ok(notification.params);
            }
            Ok(_) => continue,
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!("wait missed {} notifications, still waiting for load", n);
            }
            Err(broadcast::error::RecvError::Closed) => {
                return Err(Error::communication(
                    "notification channel closed while waiting for load",
                ));
            }
        }
    }
}

/// Request a capture and write the decoded payload to disk
async fn capture(
    transport: &Arc<dyn Transport>,
    selector: Option<String>,
    path: &Path,
) -> Result<Value> {
    let method = if selector.is_some() {
        "screenshotElement"
    } else {
        "screenshot"
    };
    let params = serde_json::to_value(ScreenshotParams { selector })?;
    let result = transport.request(method, params).await?;

    let data = result["data"]
        .as_str()
        .ok_or_else(|| Error::protocol("screenshot response carried no data"))?;
    let bytes = BASE64
        .decode(data)
        .map_err(|e| Error::protocol(format!("screenshot payload is not base64: {}", e)))?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    tokio::fs::write(path, bytes).await?;
    Ok(Value::Null)
}
