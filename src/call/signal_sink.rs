use crate::signaling::protocol::ClientMsg;
use crate::signaling_client::{SignalingClientError, SignalingSender};

/// Where the call machine and chat client push outbound protocol messages.
pub trait SignalSink: Send + Sync {
    fn send_signal(&self, msg: ClientMsg) -> Result<(), SignalingClientError>;
}

impl SignalSink for SignalingSender {
    fn send_signal(&self, msg: ClientMsg) -> Result<(), SignalingClientError> {
        self.send(msg)
    }
}
