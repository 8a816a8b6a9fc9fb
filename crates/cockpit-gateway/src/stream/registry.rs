//! Live streaming session registry.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use cockpit_core::{ConnectionId, RequestId};

/// What the registry knows about one open session.
#[derive(Debug, Clone)]
pub struct SessionInfo {
    /// Client address of the upgrade request.
    pub client: String,
    /// Correlation id of the upgrade request.
    pub request_id: Option<RequestId>,
    /// When the connection was accepted.
    pub connected_at: DateTime<Utc>,
}

/// Open sessions keyed by connection id.
///
/// Cloning yields another handle to the same registry.
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<Mutex<HashMap<ConnectionId, SessionInfo>>>,
}

impl SessionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session. It stays registered until the guard is dropped.
    #[must_use = "the session is removed when the guard is dropped"]
    pub fn register(&self, id: ConnectionId, info: SessionInfo) -> SessionGuard {
        self.sessions.lock().insert(id, info);
        SessionGuard {
            registry: self.clone(),
            id,
        }
    }

    /// Number of open sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    /// Whether no sessions are open.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }

    /// Look up a session.
    #[must_use]
    pub fn get(&self, id: &ConnectionId) -> Option<SessionInfo> {
        self.sessions.lock().get(id).cloned()
    }

    fn remove(&self, id: &ConnectionId) {
        self.sessions.lock().remove(id);
    }
}

/// Removes its session from the registry when dropped.
#[derive(Debug)]
pub struct SessionGuard {
    registry: SessionRegistry,
    id: ConnectionId,
}

impl SessionGuard {
    /// Connection id of the guarded session.
    #[must_use]
    pub const fn id(&self) -> ConnectionId {
        self.id
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.registry.remove(&self.id);
    }
}
