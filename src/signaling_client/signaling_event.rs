use crate::signaling::protocol::ServerMsg;

/// What the network thread reports back to the application.
#[derive(Debug, Clone, PartialEq)]
pub enum SignalingEvent {
    /// Handshake done and `join` sent.
    Connected,
    Message(ServerMsg),
    /// The connection is gone; no further events follow.
    Disconnected { reason: String },
}
