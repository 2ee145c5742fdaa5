use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::time::{Duration, Instant};

use crate::call::call_error::{CallError, NegotiationError};
use crate::call::call_event::{CallEvent, EndReason};
use crate::call::call_session::CallSession;
use crate::call::call_state::CallState;
use crate::call::media::{MediaConstraints, MediaDevices, RemoteStream, TrackKind};
use crate::call::peer_connection::{
    IceCandidate, IceConfig, PeerAdapter, PeerConnectionFactory, SdpType, SessionDescription,
};
use crate::call::signal_sink::SignalSink;
use crate::config::CallSettings;
use crate::log::LogSink;
use crate::signaling::protocol::{
    CallControl, CallOfferRequest, CallType, CallerInfo, ClientMsg, SignalPayload, SignalRequest,
    UserId,
};
use crate::{sink_debug, sink_info, sink_warn};

/// Client-side call state machine: idle -> calling/receiving -> active -> idle.
///
/// At most one [`CallSession`] exists. Every path back to idle releases the
/// peer connection and stops local capture exactly once.
pub struct CallMachine {
    me: UserId,
    session: Option<CallSession>,
    factory: Box<dyn PeerConnectionFactory>,
    devices: Box<dyn MediaDevices>,
    signals: Arc<dyn SignalSink>,
    events: Sender<CallEvent>,
    ice: IceConfig,
    ring_timeout: Option<Duration>,
    log: Arc<dyn LogSink>,
}

impl CallMachine {
    pub fn new(
        me: impl Into<UserId>,
        factory: Box<dyn PeerConnectionFactory>,
        devices: Box<dyn MediaDevices>,
        signals: Arc<dyn SignalSink>,
        events: Sender<CallEvent>,
        settings: &CallSettings,
        log: Arc<dyn LogSink>,
    ) -> Self {
        Self {
            me: me.into(),
            session: None,
            factory,
            devices,
            signals,
            events,
            ice: IceConfig {
                stun_urls: settings.stun_urls.clone(),
            },
            ring_timeout: settings.ring_timeout,
            log,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.me
    }

    pub fn state(&self) -> CallState {
        self.session
            .as_ref()
            .map_or(CallState::Idle, |s| s.state)
    }

    pub fn session(&self) -> Option<&CallSession> {
        self.session.as_ref()
    }

    pub fn peer(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.peer.as_str())
    }

    // ---- Local actions ---------------------------------------------------

    /// Acquire media, create an offer and send it to `peer`.
    pub fn initiate_call(&mut self, peer: &str, call_type: CallType) -> Result<(), CallError> {
        if peer.is_empty() || peer == self.me {
            return Err(CallError::InvalidPeer(peer.to_string()));
        }
        if let Some(session) = &self.session {
            sink_warn!(
                self.log,
                "cannot call '{}': already {} with '{}'",
                peer,
                session.state,
                session.peer
            );
            return Err(CallError::Busy {
                peer: session.peer.clone(),
            });
        }

        match self.start_outgoing(peer, call_type) {
            Ok(session) => {
                sink_info!(
                    self.log,
                    "call {:016x}: calling '{}' ({})",
                    session.call_id,
                    peer,
                    call_type
                );
                self.session = Some(session);
                self.emit(CallEvent::Ringing {
                    to: peer.to_string(),
                    call_type,
                });
                Ok(())
            }
            Err(err) => {
                self.report_failure(peer, &err);
                Err(err)
            }
        }
    }

    /// Answer the pending offer. Any failure rejects the call towards the
    /// caller and returns to idle.
    pub fn accept_call(&mut self) -> Result<(), CallError> {
        let (peer, call_type, offer, candidates) = match self.session.as_mut() {
            Some(s) if s.state == CallState::Receiving => match s.pending_offer.take() {
                Some(offer) => (
                    s.peer.clone(),
                    s.call_type,
                    offer,
                    std::mem::take(&mut s.pending_candidates),
                ),
                None => return Err(CallError::NoPendingCall),
            },
            _ => return Err(CallError::NoPendingCall),
        };

        let (adapter, answer) = match self.connect_incoming(call_type, &offer, &candidates) {
            Ok(connected) => connected,
            Err(err) => {
                self.fail_call(&err, Some(ClientMsg::CallReject));
                return Err(err);
            }
        };

        if let Err(e) = self.signals.send_signal(ClientMsg::CallAnswer(SignalRequest {
            to: peer.clone(),
            from: self.me.clone(),
            signal: answer.to_signal(),
        })) {
            let err = CallError::Signaling(e);
            self.fail_call(&err, None);
            return Err(err);
        }

        let mut remote = None;
        if let Some(session) = self.session.as_mut() {
            let adapter = session.peer_conn.insert(adapter);
            remote = adapter.attach_remote_stream().cloned();
            session.state = CallState::Active;
            sink_info!(self.log, "call {:016x}: accepted, now active", session.call_id);
        }
        self.emit(CallEvent::Connected { peer, remote });
        Ok(())
    }

    /// Decline an incoming call. Outside `receiving` this hangs up whatever
    /// call exists; from idle it does nothing.
    pub fn reject_call(&mut self) {
        self.end_call();
    }

    /// Hang up. Idempotent; always ends in idle.
    pub fn end_call(&mut self) {
        let reason = match self.state() {
            CallState::Idle => return,
            CallState::Receiving => EndReason::Declined,
            CallState::Calling | CallState::Active => EndReason::LocalHangup,
        };
        self.hang_up(reason);
    }

    /// Flip the microphone. Returns the new muted flag.
    pub fn toggle_mute(&mut self) -> Result<bool, CallError> {
        let session = self.active_session()?;
        let muted = !session.muted;
        set_local_track(session, TrackKind::Audio, !muted)?;
        session.muted = muted;
        Ok(muted)
    }

    /// Flip the camera. Returns the new camera-off flag; audio-only calls
    /// have no camera to flip.
    pub fn toggle_camera(&mut self) -> Result<bool, CallError> {
        let session = self.active_session()?;
        let camera_off = !session.camera_off;
        set_local_track(session, TrackKind::Video, !camera_off)?;
        session.camera_off = camera_off;
        Ok(camera_off)
    }

    /// Drive the ring timeout. Returns true if a ringing call was ended.
    pub fn tick(&mut self, now: Instant) -> bool {
        let Some(timeout) = self.ring_timeout else {
            return false;
        };
        let expired = self.session.as_ref().is_some_and(|s| {
            s.state.is_ringing() && now.saturating_duration_since(s.started_at) >= timeout
        });
        if expired {
            sink_info!(self.log, "ring timeout after {:?}", timeout);
            self.hang_up(EndReason::Timeout);
        }
        expired
    }

    /// The platform reports the media connection as failed.
    pub fn on_connection_failed(&mut self) {
        match self.state() {
            CallState::Calling | CallState::Active => {
                sink_warn!(self.log, "peer connection failed; ending call");
                self.hang_up(EndReason::ConnectionFailed);
            }
            CallState::Idle | CallState::Receiving => {}
        }
    }

    /// The signaling transport is gone: nothing can be sent, end locally.
    pub fn on_transport_lost(&mut self) {
        if self.session.is_some() {
            self.finish(EndReason::TransportLost);
        }
    }

    // ---- Inbound signals -------------------------------------------------

    pub fn handle_offer(
        &mut self,
        from: &str,
        signal: &SignalPayload,
        call_type: CallType,
        caller_info: CallerInfo,
    ) {
        let offer = match SessionDescription::from_signal(signal) {
            Ok(desc) if desc.sdp_type == SdpType::Offer => desc,
            Ok(desc) => {
                sink_warn!(
                    self.log,
                    "ignoring call-offer from '{}' carrying {:?}",
                    from,
                    desc.sdp_type
                );
                return;
            }
            Err(e) => {
                sink_warn!(self.log, "ignoring unparseable offer from '{}': {}", from, e);
                return;
            }
        };

        let mut yielded = false;
        if let Some(session) = &self.session {
            if !session.is_with(from) {
                sink_info!(
                    self.log,
                    "busy with '{}'; rejecting offer from '{}'",
                    session.peer,
                    from
                );
                self.send(ClientMsg::CallReject(CallControl {
                    to: from.to_string(),
                    from: self.me.clone(),
                }));
                return;
            }
            // Both sides called each other: the lower user id drops its own
            // offer and answers the other one.
            if session.state != CallState::Calling || self.me.as_str() > from {
                sink_warn!(self.log, "ignoring repeated offer from current peer '{}'", from);
                return;
            }
            sink_info!(self.log, "offer collision with '{}'; answering theirs", from);
            if let Some(mut own) = self.session.take() {
                own.release();
            }
            yielded = true;
        }

        let session = CallSession::incoming(
            from.to_string(),
            call_type,
            caller_info.clone(),
            offer,
            Instant::now(),
        );
        sink_info!(
            self.log,
            "call {:016x}: incoming {} call from '{}'",
            session.call_id,
            call_type,
            from
        );
        self.session = Some(session);
        self.emit(CallEvent::IncomingCall {
            from: from.to_string(),
            call_type,
            caller_info,
        });

        if yielded {
            if let Err(e) = self.accept_call() {
                sink_warn!(self.log, "could not answer colliding offer from '{}': {}", from, e);
            }
        }
    }

    pub fn handle_answer(&mut self, from: &str, signal: &SignalPayload) {
        let Some(session) = self
            .session
            .as_mut()
            .filter(|s| s.is_with(from) && s.state == CallState::Calling)
        else {
            sink_warn!(self.log, "ignoring call-answer from '{}' (no matching call)", from);
            return;
        };

        match apply_answer(session, signal) {
            Ok(remote) => {
                session.state = CallState::Active;
                let peer = session.peer.clone();
                sink_info!(self.log, "call {:016x}: answered, now active", session.call_id);
                self.emit(CallEvent::Connected { peer, remote });
            }
            Err(e) => self.fail_call(&CallError::Negotiation(e), Some(ClientMsg::CallEnd)),
        }
    }

    pub fn handle_candidate(&mut self, from: &str, signal: &SignalPayload) {
        let Some(session) = self.session.as_mut().filter(|s| s.is_with(from)) else {
            sink_warn!(self.log, "ignoring call-candidate from '{}' (no matching call)", from);
            return;
        };

        let candidate = match IceCandidate::from_signal(signal) {
            Ok(c) => c,
            Err(e) => {
                sink_warn!(self.log, "ignoring candidate from '{}': {}", from, e);
                return;
            }
        };

        match session.peer_conn.as_mut() {
            Some(pc) => {
                if let Err(e) = pc.add_candidate(&candidate) {
                    sink_warn!(self.log, "failed to apply candidate from '{}': {}", from, e);
                }
            }
            None if session.state == CallState::Receiving => {
                sink_debug!(self.log, "buffering candidate from '{}'", from);
                session.pending_candidates.push(candidate);
            }
            None => {
                sink_warn!(self.log, "dropping candidate from '{}': no connection", from);
            }
        }
    }

    pub fn handle_reject(&mut self, from: &str) {
        self.remote_finished(from, EndReason::Rejected, "call-reject");
    }

    pub fn handle_end(&mut self, from: &str) {
        self.remote_finished(from, EndReason::RemoteHangup, "call-end");
    }

    // ---- Internals -------------------------------------------------------

    fn start_outgoing(&mut self, peer: &str, call_type: CallType) -> Result<CallSession, CallError> {
        let local = self.devices.acquire(MediaConstraints::for_call(call_type))?;
        let pc = self.factory.create(&self.ice)?;
        let mut adapter = PeerAdapter::new(pc, local)?;
        let offer = adapter.create_offer()?;

        self.signals
            .send_signal(ClientMsg::CallOffer(CallOfferRequest {
                to: peer.to_string(),
                from: self.me.clone(),
                signal: offer.to_signal(),
                call_type,
            }))?;

        Ok(CallSession::outgoing(
            peer.to_string(),
            call_type,
            adapter,
            Instant::now(),
        ))
    }

    fn connect_incoming(
        &mut self,
        call_type: CallType,
        offer: &SessionDescription,
        candidates: &[IceCandidate],
    ) -> Result<(PeerAdapter, SessionDescription), CallError> {
        let local = self.devices.acquire(MediaConstraints::for_call(call_type))?;
        let pc = self.factory.create(&self.ice)?;
        let mut adapter = PeerAdapter::new(pc, local)?;
        adapter.apply_remote(offer)?;
        for candidate in candidates {
            if let Err(e) = adapter.add_candidate(candidate) {
                sink_warn!(self.log, "dropping buffered candidate: {}", e);
            }
        }
        let answer = adapter.create_answer()?;
        Ok((adapter, answer))
    }

    fn active_session(&mut self) -> Result<&mut CallSession, CallError> {
        self.session
            .as_mut()
            .filter(|s| s.state == CallState::Active)
            .ok_or(CallError::NotInCall)
    }

    fn remote_finished(&mut self, from: &str, reason: EndReason, event: &str) {
        if self.session.as_ref().is_some_and(|s| s.is_with(from)) {
            self.finish(reason);
        } else {
            sink_warn!(self.log, "ignoring {} from '{}' (no matching call)", event, from);
        }
    }

    /// Tell the peer (reject while receiving, end otherwise), then finish.
    fn hang_up(&mut self, reason: EndReason) {
        let Some(session) = &self.session else {
            return;
        };
        let control = CallControl {
            to: session.peer.clone(),
            from: self.me.clone(),
        };
        let msg = if session.state == CallState::Receiving {
            ClientMsg::CallReject(control)
        } else {
            ClientMsg::CallEnd(control)
        };
        self.send(msg);
        self.finish(reason);
    }

    fn finish(&mut self, reason: EndReason) {
        if let Some(mut session) = self.session.take() {
            session.release();
            sink_info!(
                self.log,
                "call {:016x} with '{}' ended: {:?}",
                session.call_id,
                session.peer,
                reason
            );
            self.emit(CallEvent::Ended {
                peer: session.peer,
                reason,
            });
        }
    }

    /// Abort the current call after an error, optionally notifying the peer.
    fn fail_call(&mut self, err: &CallError, notify: Option<fn(CallControl) -> ClientMsg>) {
        let Some(mut session) = self.session.take() else {
            return;
        };
        session.release();
        if let Some(build) = notify {
            self.send(build(CallControl {
                to: session.peer.clone(),
                from: self.me.clone(),
            }));
        }
        self.report_failure(&session.peer, err);
    }

    fn report_failure(&self, peer: &str, err: &CallError) {
        sink_warn!(self.log, "call with '{}' failed: {}", peer, err);
        self.emit(CallEvent::CallFailed {
            peer: peer.to_string(),
            error: err.to_string(),
        });
    }

    fn send(&self, msg: ClientMsg) {
        let event = msg.event_name();
        if let Err(e) = self.signals.send_signal(msg) {
            sink_warn!(self.log, "could not send {}: {}", event, e);
        }
    }

    fn emit(&self, event: CallEvent) {
        let _ = self.events.send(event);
    }
}

fn set_local_track(
    session: &mut CallSession,
    kind: TrackKind,
    enabled: bool,
) -> Result<(), CallError> {
    let pc = session.peer_conn.as_mut().ok_or(CallError::NotInCall)?;
    if pc.set_local_enabled(kind, enabled) {
        Ok(())
    } else {
        Err(CallError::NoTrack(kind))
    }
}

fn apply_answer(
    session: &mut CallSession,
    signal: &SignalPayload,
) -> Result<Option<RemoteStream>, NegotiationError> {
    let answer = SessionDescription::from_signal(signal)?;
    if answer.sdp_type != SdpType::Answer {
        return Err(NegotiationError::InvalidDescription(format!(
            "expected answer, got {:?}",
            answer.sdp_type
        )));
    }
    let pc = session.peer_conn.as_mut().ok_or(NegotiationError::Closed)?;
    pc.apply_remote(&answer)?;
    Ok(pc.attach_remote_stream().cloned())
}
