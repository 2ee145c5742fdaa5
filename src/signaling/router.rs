use std::collections::BTreeMap;
use std::sync::Arc;

use crate::log::LogSink;
use crate::signaling::protocol::{ClientMsg, ServerMsg};
use crate::signaling::server_engine::ServerEngine;
use crate::signaling::types::{ConnectionId, OutgoingMsg};

/// Router glues the ServerEngine state machine to per-connection outboxes.
///
/// Messages for one connection stay in the order the engine produced them.
pub struct Router {
    engine: ServerEngine,
    outboxes: BTreeMap<ConnectionId, Vec<ServerMsg>>,
}

impl Router {
    pub fn new() -> Self {
        Self::with_engine(ServerEngine::new())
    }

    pub fn with_log(log: Arc<dyn LogSink>) -> Self {
        Self::with_engine(ServerEngine::with_log(log))
    }

    pub fn with_engine(engine: ServerEngine) -> Self {
        Self {
            engine,
            outboxes: BTreeMap::new(),
        }
    }

    /// Register a new connection: it gets an outbox and starts receiving
    /// presence broadcasts.
    pub fn register_client(&mut self, conn_id: ConnectionId) {
        self.outboxes.entry(conn_id).or_default();
        let out_msgs = self.engine.handle_connect(conn_id);
        self.enqueue_all(out_msgs);
    }

    /// Unregister a connection:
    /// - removes its outbox
    /// - lets the engine clean up presence and emit any notifications.
    pub fn unregister_client(&mut self, conn_id: ConnectionId) {
        self.outboxes.remove(&conn_id);
        let out_msgs = self.engine.handle_disconnect(conn_id);
        self.enqueue_all(out_msgs);
    }

    /// Handle a message coming *from* a connection and enqueue whatever the
    /// engine wants sent.
    pub fn handle_from_client(&mut self, from: ConnectionId, msg: ClientMsg) {
        let out_msgs = self.engine.handle(from, msg);
        self.enqueue_all(out_msgs);
    }

    /// Drain and return all outgoing messages for a given connection.
    pub fn take_outgoing_for(&mut self, conn_id: ConnectionId) -> Vec<ServerMsg> {
        self.outboxes
            .get_mut(&conn_id)
            .map(std::mem::take)
            .unwrap_or_default()
    }

    /// Peek (non-destructive) at outgoing messages for a connection.
    pub fn outgoing_for(&self, conn_id: ConnectionId) -> &[ServerMsg] {
        self.outboxes
            .get(&conn_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Drain all pending outgoing messages for all connections.
    pub fn drain_all_outgoing(&mut self) -> Vec<(ConnectionId, ServerMsg)> {
        let mut result = Vec::new();
        for (conn_id, queue) in self.outboxes.iter_mut() {
            result.extend(queue.drain(..).map(|m| (*conn_id, m)));
        }
        result
    }

    pub fn engine(&self) -> &ServerEngine {
        &self.engine
    }

    fn enqueue_all(&mut self, out_msgs: Vec<OutgoingMsg>) {
        for out_msg in out_msgs {
            self.enqueue(out_msg);
        }
    }

    /// Messages for connections that are no longer registered are dropped.
    fn enqueue(&mut self, out_msg: OutgoingMsg) {
        if let Some(queue) = self.outboxes.get_mut(&out_msg.target) {
            queue.push(out_msg.msg);
        }
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}
