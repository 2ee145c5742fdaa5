use std::time::Instant;

use crate::call::call_state::CallState;
use crate::call::peer_connection::{IceCandidate, PeerAdapter, SessionDescription};
use crate::signaling::protocol::{CallType, CallerInfo, UserId};

/// The one call a client can have at a time.
pub struct CallSession {
    /// Random id, only for correlating log lines.
    pub call_id: u64,
    pub state: CallState,
    pub call_type: CallType,
    pub peer: UserId,
    pub is_initiator: bool,
    pub caller_info: Option<CallerInfo>,
    /// Offer waiting for accept; only set while `Receiving`.
    pub pending_offer: Option<SessionDescription>,
    /// Candidates that arrived before a peer connection existed.
    pub pending_candidates: Vec<IceCandidate>,
    pub peer_conn: Option<PeerAdapter>,
    pub started_at: Instant,
    pub muted: bool,
    pub camera_off: bool,
}

impl CallSession {
    pub fn outgoing(peer: UserId, call_type: CallType, peer_conn: PeerAdapter, now: Instant) -> Self {
        Self {
            call_id: rand::random(),
            state: CallState::Calling,
            call_type,
            peer,
            is_initiator: true,
            caller_info: None,
            pending_offer: None,
            pending_candidates: Vec::new(),
            peer_conn: Some(peer_conn),
            started_at: now,
            muted: false,
            camera_off: false,
        }
    }

    pub fn incoming(
        peer: UserId,
        call_type: CallType,
        caller_info: CallerInfo,
        offer: SessionDescription,
        now: Instant,
    ) -> Self {
        Self {
            call_id: rand::random(),
            state: CallState::Receiving,
            call_type,
            peer,
            is_initiator: false,
            caller_info: Some(caller_info),
            pending_offer: Some(offer),
            pending_candidates: Vec::new(),
            peer_conn: None,
            started_at: now,
            muted: false,
            camera_off: false,
        }
    }

    pub fn is_with(&self, user_id: &str) -> bool {
        self.peer == user_id
    }

    /// Close the connection and stop local capture. Safe to repeat.
    pub fn release(&mut self) {
        if let Some(pc) = self.peer_conn.as_mut() {
            pc.teardown();
        }
        self.peer_conn = None;
        self.pending_offer = None;
        self.pending_candidates.clear();
    }
}
