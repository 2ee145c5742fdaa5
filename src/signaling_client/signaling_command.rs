use crate::signaling::protocol::ClientMsg;

/// Commands issued by the application into the signaling client's
/// network thread.
#[derive(Debug)]
pub enum SignalingCommand {
    Send(ClientMsg),
    Disconnect,
}
