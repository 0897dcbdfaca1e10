//! Queued operation definitions

use std::path::PathBuf;

use serde_json::Value;
use tokio::sync::oneshot;

use crate::Result;

/// A single queued unit of work against one session
///
/// Created when a chainable method is invoked; executed by the queue worker
/// strictly in enqueue order.
#[derive(Debug, Clone)]
pub enum Operation {
    /// Navigate to a URL; settles with the load status
    Open { url: String },
    /// Read the page title
    Title,
    /// Read the current URL
    Url,
    /// Click the first element matching a selector
    Click { selector: String },
    /// Type text into an element, key by key
    TypeText { selector: String, text: String },
    /// Set an element's value directly
    SetValue { selector: String, text: String },
    /// Choose an option of a select element
    Select { selector: String, value: String },
    /// Capture the page and write it to a file
    Screenshot { path: PathBuf },
    /// Capture one element and write it to a file
    ScreenshotDomElement { selector: String, path: PathBuf },
    /// Go back in history
    Back,
    /// Go forward in history
    Forward,
    /// Reload the current page
    Refresh,
    /// Focus an element
    Focus { selector: String },
    /// Inject a local JavaScript file into the page
    InjectJs { path: PathBuf },
    /// Inject CSS source into the page
    InjectCss { css: String },
    /// Read the page content
    Content,
    /// Replace the page content
    SetContent { html: String },
    /// Evaluate a script in the page and settle with its result
    Evaluate { script: String },
    /// Block the queue until the next load finishes
    Wait,
    /// Block the queue for a fixed duration
    Delay { ms: u64 },
}

impl Operation {
    /// Operation kind, for logs and failure messages
    pub fn kind(&self) -> &'static str {
        match self {
            Operation::Open { .. } => "open",
            Operation::Title => "title",
            Operation::Url => "url",
            Operation::Click { .. } => "click",
            Operation::TypeText { .. } => "type",
            Operation::SetValue { .. } => "value",
            Operation::Select { .. } => "select",
            Operation::Screenshot { .. } => "screenshot",
            Operation::ScreenshotDomElement { .. } => "screenshotElement",
            Operation::Back => "back",
            Operation::Forward => "forward",
            Operation::Refresh => "refresh",
            Operation::Focus { .. } => "focus",
            Operation::InjectJs { .. } => "injectJs",
            Operation::InjectCss { .. } => "injectCss",
            Operation::Content => "content",
            Operation::SetContent { .. } => "setContent",
            Operation::Evaluate { .. } => "evaluate",
            Operation::Wait => "wait",
            Operation::Delay { .. } => "delay",
        }
    }
}

/// An operation paired with its settlement channel
#[derive(Debug)]
pub(crate) struct Queued {
    pub op: Operation,
    pub settle: oneshot::Sender<Result<Value>>,
}
