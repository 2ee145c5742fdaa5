use serde::{Deserialize, Serialize};

use crate::call::call_error::NegotiationError;
use crate::call::media::{LocalStream, RemoteStream, TrackKind};
use crate::signaling::protocol::SignalPayload;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    Offer,
    Answer,
    Pranswer,
    Rollback,
}

/// Browser-shaped session description: `{"type": "offer", "sdp": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub sdp_type: SdpType,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Answer,
            sdp: sdp.into(),
        }
    }

    pub fn from_signal(signal: &SignalPayload) -> Result<Self, NegotiationError> {
        serde_json::from_value(signal.clone())
            .map_err(|e| NegotiationError::InvalidDescription(e.to_string()))
    }

    pub fn to_signal(&self) -> SignalPayload {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Browser-shaped ICE candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(rename = "sdpMid", default)]
    pub sdp_mid: Option<String>,
    #[serde(rename = "sdpMLineIndex", default)]
    pub sdp_mline_index: Option<u16>,
}

impl IceCandidate {
    pub fn from_signal(signal: &SignalPayload) -> Result<Self, NegotiationError> {
        serde_json::from_value(signal.clone())
            .map_err(|e| NegotiationError::InvalidCandidate(e.to_string()))
    }

    pub fn to_signal(&self) -> SignalPayload {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// ICE servers handed to every new peer connection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IceConfig {
    pub stun_urls: Vec<String>,
}

/// The WebRTC negotiation primitive.
///
/// `create_offer`/`create_answer` return a description that already
/// contains every gathered candidate; nothing is trickled.
pub trait PeerConnection: Send {
    fn add_local_stream(&mut self, stream: &LocalStream) -> Result<(), NegotiationError>;
    fn create_offer(&mut self) -> Result<SessionDescription, NegotiationError>;
    fn create_answer(&mut self) -> Result<SessionDescription, NegotiationError>;
    fn set_remote_description(&mut self, desc: &SessionDescription)
    -> Result<(), NegotiationError>;
    fn add_ice_candidate(&mut self, candidate: &IceCandidate) -> Result<(), NegotiationError>;
    /// Remote media, once a remote description has been applied.
    fn remote_stream(&mut self) -> Option<RemoteStream>;
    fn close(&mut self);
}

pub trait PeerConnectionFactory: Send {
    fn create(&mut self, config: &IceConfig) -> Result<Box<dyn PeerConnection>, NegotiationError>;
}

/// Owns one peer connection together with the local and remote streams.
///
/// `teardown` is idempotent and also runs on drop, so every exit path
/// closes the connection and stops local capture.
pub struct PeerAdapter {
    pc: Option<Box<dyn PeerConnection>>,
    local: Option<LocalStream>,
    remote: Option<RemoteStream>,
}

impl PeerAdapter {
    /// Attach `local` to `pc`. On failure both are released before returning.
    pub fn new(pc: Box<dyn PeerConnection>, local: LocalStream) -> Result<Self, NegotiationError> {
        let mut adapter = Self {
            pc: Some(pc),
            local: Some(local),
            remote: None,
        };
        if let (Some(pc), Some(local)) = (adapter.pc.as_mut(), adapter.local.as_ref()) {
            pc.add_local_stream(local)?;
        }
        Ok(adapter)
    }

    fn pc(&mut self) -> Result<&mut Box<dyn PeerConnection>, NegotiationError> {
        self.pc.as_mut().ok_or(NegotiationError::Closed)
    }

    pub fn create_offer(&mut self) -> Result<SessionDescription, NegotiationError> {
        self.pc()?.create_offer()
    }

    pub fn create_answer(&mut self) -> Result<SessionDescription, NegotiationError> {
        self.pc()?.create_answer()
    }

    pub fn apply_remote(&mut self, desc: &SessionDescription) -> Result<(), NegotiationError> {
        self.pc()?.set_remote_description(desc)
    }

    pub fn add_candidate(&mut self, candidate: &IceCandidate) -> Result<(), NegotiationError> {
        self.pc()?.add_ice_candidate(candidate)
    }

    /// Pick up the remote stream from the connection, if it has one yet.
    pub fn attach_remote_stream(&mut self) -> Option<&RemoteStream> {
        if self.remote.is_none() {
            self.remote = self.pc.as_mut().and_then(|pc| pc.remote_stream());
        }
        self.remote.as_ref()
    }

    pub fn remote_stream(&self) -> Option<&RemoteStream> {
        self.remote.as_ref()
    }

    pub fn local_stream(&self) -> Option<&LocalStream> {
        self.local.as_ref()
    }

    /// Flip every local track of `kind`; false if there is none.
    pub fn set_local_enabled(&mut self, kind: TrackKind, enabled: bool) -> bool {
        self.local
            .as_mut()
            .is_some_and(|local| local.set_enabled(kind, enabled))
    }

    pub fn is_closed(&self) -> bool {
        self.pc.is_none()
    }

    pub fn teardown(&mut self) {
        if let Some(mut pc) = self.pc.take() {
            pc.close();
        }
        if let Some(mut local) = self.local.take() {
            local.stop();
        }
        self.remote = None;
    }
}

impl Drop for PeerAdapter {
    fn drop(&mut self) {
        self.teardown();
    }
}
