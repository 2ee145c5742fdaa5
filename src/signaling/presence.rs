use std::collections::{BTreeMap, HashMap};

use crate::signaling::protocol::{ServerMsg, UserId};
use crate::signaling::types::{ConnectionId, OutgoingMsg};

/// One live transport connection and the identity it announced, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionHandle {
    pub conn_id: ConnectionId,
    pub user_id: Option<UserId>,
}

/// Tracks every connection and which user id currently maps to which one.
///
/// A user id maps to at most one connection; the most recent `join` wins.
/// The online list keeps first-join order so broadcasts are stable.
#[derive(Debug, Default)]
pub struct PresenceDirectory {
    connections: BTreeMap<ConnectionId, ConnectionHandle>,
    user_to_conn: HashMap<UserId, ConnectionId>,
    online_order: Vec<UserId>,
}

impl PresenceDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a freshly accepted connection. It receives presence broadcasts
    /// from now on, even before it joins.
    pub fn connect(&mut self, conn_id: ConnectionId) {
        self.connections.entry(conn_id).or_insert(ConnectionHandle {
            conn_id,
            user_id: None,
        });
    }

    /// Bind `user_id` to `conn_id` and broadcast the online list to every
    /// connection.
    ///
    /// A newer connection for the same user replaces the older mapping. A
    /// connection that re-joins under another id releases its previous one.
    pub fn join(&mut self, user_id: UserId, conn_id: ConnectionId) -> Vec<OutgoingMsg> {
        self.connect(conn_id);

        let previous = self
            .connections
            .get_mut(&conn_id)
            .and_then(|handle| handle.user_id.replace(user_id.clone()));
        if let Some(prev) = previous {
            if prev != user_id {
                self.release(&prev, conn_id);
            }
        }

        if self.user_to_conn.insert(user_id.clone(), conn_id).is_none() {
            self.online_order.push(user_id);
        }

        self.broadcast()
    }

    /// Forget a connection. Only releases its user id if that id still maps
    /// to this connection, so a stale disconnect after a reconnect is inert.
    ///
    /// Broadcasts only when the online set actually changed.
    pub fn remove(&mut self, conn_id: ConnectionId) -> Vec<OutgoingMsg> {
        let Some(handle) = self.connections.remove(&conn_id) else {
            return Vec::new();
        };

        let changed = match handle.user_id {
            Some(user_id) => self.release(&user_id, conn_id),
            None => false,
        };

        if changed {
            self.broadcast()
        } else {
            Vec::new()
        }
    }

    /// Connection currently serving `user_id`.
    pub fn lookup(&self, user_id: &str) -> Option<ConnectionId> {
        self.user_to_conn.get(user_id).copied()
    }

    /// The user id a connection announced (it may have been superseded).
    pub fn user_for(&self, conn_id: ConnectionId) -> Option<&UserId> {
        self.connections
            .get(&conn_id)
            .and_then(|handle| handle.user_id.as_ref())
    }

    pub fn is_online(&self, user_id: &str) -> bool {
        self.user_to_conn.contains_key(user_id)
    }

    pub fn online_users(&self) -> Vec<UserId> {
        self.online_order.clone()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    fn release(&mut self, user_id: &str, conn_id: ConnectionId) -> bool {
        if self.user_to_conn.get(user_id) != Some(&conn_id) {
            return false;
        }
        self.user_to_conn.remove(user_id);
        self.online_order.retain(|u| u != user_id);
        true
    }

    fn broadcast(&self) -> Vec<OutgoingMsg> {
        let users = self.online_users();
        self.connections
            .keys()
            .map(|&target| OutgoingMsg {
                target,
                msg: ServerMsg::OnlineUsers(users.clone()),
            })
            .collect()
    }
}
