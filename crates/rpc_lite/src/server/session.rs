use dashmap::DashMap;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::RpcServerError;

/// Identifies one accepted connection for the lifetime of the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tracks open client connections.
///
/// Opening a session returns a guard that removes the entry when dropped, so
/// the map always reflects the connections that are still being served. An
/// optional limit caps how many may be open at once.
#[derive(Debug)]
pub struct SessionMap {
    sessions: DashMap<ConnectionId, SocketAddr, ahash::RandomState>,
    limit: Option<usize>,
}

impl SessionMap {
    pub fn new() -> Self {
        Self::with_limit(None)
    }

    pub fn with_limit(limit: Option<usize>) -> Self {
        Self {
            sessions: DashMap::default(),
            limit,
        }
    }

    /// Register a newly accepted connection. Returns a guard that removes the
    /// session on drop.
    ///
    /// Only the accept loop opens sessions, so the limit check cannot be raced
    /// by another insert.
    pub fn try_open(self: &Arc<Self>, peer: SocketAddr) -> Result<SessionGuard, RpcServerError> {
        if let Some(limit) = self.limit.filter(|&limit| self.sessions.len() >= limit) {
            return Err(RpcServerError::ConnectionLimit { limit, peer });
        }

        let id = ConnectionId::new();
        self.sessions.insert(id, peer);
        Ok(SessionGuard {
            id,
            peer,
            map: Arc::clone(self),
        })
    }

    pub fn contains(&self, id: &ConnectionId) -> bool {
        self.sessions.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn remove(&self, id: &ConnectionId) {
        self.sessions.remove(id);
    }
}

impl Default for SessionMap {
    fn default() -> Self {
        Self::new()
    }
}

/// A guard that holds an open session. When dropped, the session is removed.
pub struct SessionGuard {
    id: ConnectionId,
    peer: SocketAddr,
    map: Arc<SessionMap>,
}

impl SessionGuard {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.map.remove(&self.id);
    }
}

impl fmt::Debug for SessionGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionGuard")
            .field("id", &self.id)
            .field("peer", &self.peer)
            .finish()
    }
}
