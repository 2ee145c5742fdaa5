//! Client-side call handling: the call state machine and the peer
//! connection adapter it drives.

pub mod call_error;
pub mod call_event;
pub mod call_machine;
pub mod call_session;
pub mod call_state;
#[cfg(test)]
pub mod fakes;
pub mod media;
pub mod peer_connection;
pub mod signal_sink;

pub use call_error::{CallError, MediaError, NegotiationError};
pub use call_event::{CallEvent, EndReason};
pub use call_machine::CallMachine;
pub use call_session::CallSession;
pub use call_state::CallState;
pub use media::{LocalStream, MediaConstraints, MediaDevices, MediaTrack, RemoteStream, TrackKind};
pub use peer_connection::{
    IceCandidate, IceConfig, PeerAdapter, PeerConnection, PeerConnectionFactory, SdpType,
    SessionDescription,
};
pub use signal_sink::SignalSink;
