use std::io;

use thiserror::Error;

use crate::signaling::SignalingError;
use crate::signaling::protocol::FrameError;

/// Errors surfaced by [`SignalingClient`](crate::signaling_client::SignalingClient).
///
/// Once connected, the only thing `send()` can report is that the network
/// thread has exited and dropped its command receiver.
#[derive(Debug, Error)]
pub enum SignalingClientError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("protocol error: {0}")]
    Frame(#[from] FrameError),

    #[error(transparent)]
    Setup(#[from] SignalingError),

    #[error("invalid signaling url '{0}'")]
    InvalidUrl(String),

    #[error("wss:// requires a pinned CA certificate")]
    MissingCa,

    #[error("signaling client disconnected")]
    Disconnected,
}
