//! Process transport layer traits
//!
//! This module defines the abstract interface for talking to an agent process.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::broadcast;

use super::types::Notification;

/// Transport to one agent process
///
/// A transport owns exactly one external session: its request/response
/// channel, its notification stream, and its process identity. Requests and
/// responses are paired by id even with notifications interleaved; every
/// request either yields exactly one response or fails when the channel
/// closes.
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Send a command and wait for the agent's paired response
    async fn request(&self, method: &str, params: Value) -> Result<Value, crate::Error>;

    /// Subscribe to unsolicited notifications, in arrival order
    fn notifications(&self) -> broadcast::Receiver<Notification>;

    /// Terminate the agent process and release the channel; idempotent
    async fn stop(&self) -> Result<(), crate::Error>;

    /// Process identifier, stable for the lifetime of this transport
    fn pid(&self) -> u32;

    /// Check if the channel is still open
    fn is_active(&self) -> bool;
}
