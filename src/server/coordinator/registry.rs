/// Connection registry.
///
/// Sole owner of the id -> live transport mapping. Matches and queue entries
/// reference connections by `ConnectionId` only, so reconnection is a pure
/// swap of the id bound to a participant; nothing else holds a transport
/// handle.
use actix::Recipient;
use log::debug;
use std::collections::HashMap;

use crate::server::coordinator::types::ConnectionId;
use crate::server::messages::{CloseSession, ServerWsMessage};

/// One live client transport.
struct Connection {
    session: Recipient<ServerWsMessage>,
    close: Recipient<CloseSession>,
    alive: bool,
}

#[derive(Default)]
pub struct ConnectionRegistry {
    connections: HashMap<ConnectionId, Connection>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly accepted connection.
    pub fn register(
        &mut self,
        id: ConnectionId,
        session: Recipient<ServerWsMessage>,
        close: Recipient<CloseSession>,
    ) {
        self.connections.insert(
            id,
            Connection {
                session,
                close,
                alive: true,
            },
        );
        debug!("[Registry] Connection {} registered ({} live)", id, self.connections.len());
    }

    /// Drop a connection. Idempotent.
    pub fn deregister(&mut self, id: ConnectionId) -> bool {
        let removed = self.connections.remove(&id).is_some();
        if removed {
            debug!("[Registry] Connection {} deregistered ({} live)", id, self.connections.len());
        }
        removed
    }

    /// Resolve `id` and deliver `msg`.
    ///
    /// Returns false when the transport is gone or its mailbox is closed;
    /// the caller is expected to route that into disconnect handling for the
    /// connection. A failed send to one participant never affects the peer.
    pub fn send(&mut self, id: ConnectionId, msg: ServerWsMessage) -> bool {
        match self.connections.get_mut(&id) {
            Some(conn) if conn.alive => {
                if conn.session.try_send(msg).is_ok() {
                    true
                } else {
                    conn.alive = false;
                    false
                }
            }
            _ => false,
        }
    }

    /// Remove `id` and tell its session actor to close the socket. Used when
    /// a newer connection for the same player supersedes this one.
    pub fn close(&mut self, id: ConnectionId, reason: &str) {
        if let Some(conn) = self.connections.remove(&id) {
            let _ = conn.close.try_send(CloseSession {
                reason: reason.to_string(),
            });
            debug!("[Registry] Connection {} closed ({} live)", id, self.connections.len());
        }
    }
}
