use crate::signaling::protocol::ServerMsg;

/// Internal identifier for one transport connection (TCP/TLS + WebSocket).
pub type ConnectionId = u64;

/// A message the server wants to send to a connection.
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingMsg {
    pub target: ConnectionId,
    pub msg: ServerMsg,
}
