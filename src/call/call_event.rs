use crate::call::media::RemoteStream;
use crate::signaling::protocol::{CallType, CallerInfo, UserId};

/// Why a call went back to idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    LocalHangup,
    RemoteHangup,
    /// We declined an incoming call.
    Declined,
    /// The peer declined (or was busy).
    Rejected,
    Timeout,
    ConnectionFailed,
    TransportLost,
}

/// Notifications for the UI layer.
#[derive(Debug, Clone, PartialEq)]
pub enum CallEvent {
    IncomingCall {
        from: UserId,
        call_type: CallType,
        caller_info: CallerInfo,
    },
    Ringing {
        to: UserId,
        call_type: CallType,
    },
    Connected {
        peer: UserId,
        remote: Option<RemoteStream>,
    },
    Ended {
        peer: UserId,
        reason: EndReason,
    },
    CallFailed {
        peer: UserId,
        error: String,
    },
}
