use thiserror::Error;

use crate::call::media::TrackKind;
use crate::signaling::protocol::UserId;
use crate::signaling_client::SignalingClientError;

/// Local media capture failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MediaError {
    #[error("permission denied")]
    PermissionDenied,
    #[error("no {0} device available")]
    NoDevice(TrackKind),
    #[error("capture failed: {0}")]
    Capture(String),
}

/// Offer/answer/ICE failures from the peer connection layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NegotiationError {
    #[error("invalid session description: {0}")]
    InvalidDescription(String),
    #[error("invalid ice candidate: {0}")]
    InvalidCandidate(String),
    #[error("peer connection error: {0}")]
    PeerConnection(String),
    #[error("peer connection already closed")]
    Closed,
}

#[derive(Debug, Error)]
pub enum CallError {
    #[error("already in a call with '{peer}'")]
    Busy { peer: UserId },
    #[error("invalid call target '{0}'")]
    InvalidPeer(UserId),
    #[error("no incoming call to accept")]
    NoPendingCall,
    #[error("no active call")]
    NotInCall,
    #[error("no local {0} track in this call")]
    NoTrack(TrackKind),
    #[error("media acquisition failed: {0}")]
    Media(#[from] MediaError),
    #[error("negotiation failed: {0}")]
    Negotiation(#[from] NegotiationError),
    #[error("signaling unavailable: {0}")]
    Signaling(#[from] SignalingClientError),
}
