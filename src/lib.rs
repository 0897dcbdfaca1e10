//! Wraith: chainable async client for an external browser-automation agent
//!
//! This library spawns a long-lived agent process per session, drives it over
//! a line-based command protocol, and exposes its capabilities as a fluent,
//! chainable API with strict in-order execution and an independent page-event
//! stream.

pub mod error;
pub mod config;

pub mod proc;
pub mod events;
pub mod chain;
pub mod session;

// Re-exports
pub use chain::Wraith;
pub use config::Options;
pub use error::{Error, Result};
pub use events::{Callback, PageEvent};
pub use session::SessionRegistry;

/// Wraith library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
