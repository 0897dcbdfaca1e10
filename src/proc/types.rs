//! Agent wire protocol type definitions
//!
//! This module defines the client side of the line-delimited JSON protocol
//! spoken with the agent process.

use serde::{Deserialize, Serialize};

/// Request sent to the agent
#[derive(Debug, Clone, Serialize)]
pub struct Request {
    /// Request ID
    pub id: u64,
    /// Method name (e.g., "open")
    pub method: String,
    /// Method parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

/// Response received from the agent
#[derive(Debug, Clone, Deserialize)]
pub struct RpcResponse {
    /// Response ID (matches request ID)
    pub id: u64,
    /// Response result
    #[serde(default)]
    pub result: serde_json::Value,
    /// Error if any
    #[serde(default)]
    pub error: Option<ErrorDetail>,
}

/// Agent error detail
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorDetail {
    /// Error message
    pub message: String,
    /// Additional error data
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

/// Unsolicited message from the agent signaling a page-level event
#[derive(Debug, Clone, Deserialize)]
pub struct Notification {
    /// Event name (e.g., "load-finished")
    pub event: String,
    /// Event payload
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Navigation parameters
#[derive(Debug, Clone, Serialize)]
pub struct OpenParams {
    /// URL to navigate to
    pub url: String,
}

/// Selector-only parameters (click, focus, screenshot of an element)
#[derive(Debug, Clone, Serialize)]
pub struct SelectorParams {
    /// CSS selector
    pub selector: String,
}

/// Selector plus text parameters (type, value, select)
#[derive(Debug, Clone, Serialize)]
pub struct TextParams {
    /// CSS selector
    pub selector: String,
    /// Text or value to apply
    pub text: String,
}

/// Script evaluation parameters
#[derive(Debug, Clone, Serialize)]
pub struct EvaluateParams {
    /// JavaScript source to evaluate in the page
    pub script: String,
}

/// Source injection parameters (injectJs, injectCss)
#[derive(Debug, Clone, Serialize)]
pub struct InjectParams {
    /// Source text to inject
    pub source: String,
}

/// Content setter parameters
#[derive(Debug, Clone, Serialize)]
pub struct ContentParams {
    /// HTML fragment or document
    pub html: String,
}

/// Screenshot parameters
#[derive(Debug, Clone, Serialize)]
pub struct ScreenshotParams {
    /// Clip the capture to this selector's element
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
}
