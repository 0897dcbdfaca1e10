//! Session registry implementation
//!
//! Tracks live process handles by pid so sessions can be looked up and
//! multiplexed without cross-talk.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, Weak};

use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::proc::Transport;
use crate::{Error, Result};

/// One tracked session
#[derive(Debug, Clone)]
pub struct RegistryEntry {
    /// Logical session id; pids can be reused by the OS, this cannot
    pub session_id: Uuid,
    /// Handle to the backing process; weak so a crashed or dropped session
    /// does not keep its entry alive
    transport: Weak<dyn Transport>,
    /// When the session was registered
    pub registered_at: DateTime<Utc>,
}

/// Process-wide lookup of live sessions by pid
///
/// Explicitly constructed and cheap to clone; independent registries can
/// coexist, e.g. one per test.
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    entries: Arc<RwLock<HashMap<u32, RegistryEntry>>>,
}

impl SessionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a session under its transport's pid
    pub fn register(&self, session_id: Uuid, transport: &Arc<dyn Transport>) -> Result<()> {
        let pid = transport.pid();
        let entry = RegistryEntry {
            session_id,
            transport: Arc::downgrade(transport),
            registered_at: Utc::now(),
        };

        self.entries
            .write()
            .map_err(|e| Error::internal(format!("Lock error: {}", e)))?
            .insert(pid, entry);

        info!("Registered session {} under pid {}", session_id, pid);
        Ok(())
    }

    /// Answer "what session backs this pid"
    pub fn lookup(&self, pid: u32) -> Result<Arc<dyn Transport>> {
        self.entries
            .read()
            .map_err(|e| Error::internal(format!("Lock error: {}", e)))?
            .get(&pid)
            .and_then(|entry| entry.transport.upgrade())
            .ok_or_else(|| Error::session_not_found(pid.to_string()))
    }

    /// Logical id of the session backing a pid
    pub fn session_id(&self, pid: u32) -> Result<Uuid> {
        self.entries
            .read()
            .map_err(|e| Error::internal(format!("Lock error: {}", e)))?
            .get(&pid)
            .map(|entry| entry.session_id)
            .ok_or_else(|| Error::session_not_found(pid.to_string()))
    }

    /// Remove a session's entry; false if it was not tracked
    pub fn remove(&self, pid: u32) -> Result<bool> {
        let removed = self
            .entries
            .write()
            .map_err(|e| Error::internal(format!("Lock error: {}", e)))?
            .remove(&pid)
            .is_some();

        if removed {
            info!("Removed session entry for pid {}", pid);
        }
        Ok(removed)
    }

    /// Pids of all tracked sessions
    pub fn pids(&self) -> Result<Vec<u32>> {
        Ok(self
            .entries
            .read()
            .map_err(|e| Error::internal(format!("Lock error: {}", e)))?
            .keys()
            .copied()
            .collect())
    }

    /// Drop entries whose process is gone
    ///
    /// Abnormal terminations never call `remove`; this sweep keeps them
    /// from leaking entries.
    pub fn prune(&self) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| Error::internal(format!("Lock error: {}", e)))?;

        let before = entries.len();
        entries.retain(|_, entry| {
            entry
                .transport
                .upgrade()
                .map(|transport| transport.is_active())
                .unwrap_or(false)
        });

        if entries.len() < before {
            debug!("Pruned {} dead session entries", before - entries.len());
        }
        Ok(())
    }

    /// Number of tracked sessions
    pub fn len(&self) -> usize {
        self.entries.read().map(|entries| entries.len()).unwrap_or(0)
    }

    /// True if no sessions are tracked
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proc::MockTransport;

    fn mock_transport() -> Arc<dyn Transport> {
        MockTransport::new()
    }

    #[tokio::test]
    async fn test_register_and_lookup() {
        let registry = SessionRegistry::new();
        let transport = mock_transport();
        let session_id = Uuid::new_v4();

        registry.register(session_id, &transport).unwrap();
        assert_eq!(registry.len(), 1);

        let found = registry.lookup(transport.pid()).unwrap();
        assert_eq!(found.pid(), transport.pid());
        assert_eq!(registry.session_id(transport.pid()).unwrap(), session_id);
    }

    #[tokio::test]
    async fn test_lookup_unknown_pid() {
        let registry = SessionRegistry::new();
        let result = registry.lookup(99_999);
        assert!(matches!(result, Err(Error::SessionNotFound(_))));
    }

    #[tokio::test]
    async fn test_remove() {
        let registry = SessionRegistry::new();
        let transport = mock_transport();

        registry.register(Uuid::new_v4(), &transport).unwrap();
        assert!(registry.remove(transport.pid()).unwrap());
        assert!(!registry.remove(transport.pid()).unwrap());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_dropped_session_does_not_leak() {
        let registry = SessionRegistry::new();
        let transport = mock_transport();
        let pid = transport.pid();

        registry.register(Uuid::new_v4(), &transport).unwrap();
        drop(transport);

        // Entry still counted until swept, but no longer resolvable
        assert!(registry.lookup(pid).is_err());
        registry.prune().unwrap();
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_stopped_session_is_pruned() {
        let registry = SessionRegistry::new();
        let mock = MockTransport::new();
        let transport: Arc<dyn Transport> = mock.clone();

        registry.register(Uuid::new_v4(), &transport).unwrap();
        mock.stop().await.unwrap();

        registry.prune().unwrap();
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_registries_are_independent() {
        let first = SessionRegistry::new();
        let second = SessionRegistry::new();
        let transport = mock_transport();

        first.register(Uuid::new_v4(), &transport).unwrap();
        assert_eq!(first.len(), 1);
        assert!(second.is_empty());
    }
}
