//! In-memory stand-ins for capture devices, peer connections and the
//! signaling channel. Counters live in shared probes so tests can observe
//! releases after the owning objects are gone.
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::call::call_error::{MediaError, NegotiationError};
use crate::call::media::{LocalStream, MediaConstraints, MediaDevices, MediaTrack, RemoteStream, TrackKind};
use crate::call::peer_connection::{
    IceCandidate, IceConfig, PeerConnection, PeerConnectionFactory, SessionDescription,
};
use crate::call::signal_sink::SignalSink;
use crate::signaling::protocol::ClientMsg;
use crate::signaling_client::SignalingClientError;

#[derive(Debug, Default)]
pub struct MediaProbe {
    acquired: AtomicUsize,
    stopped: AtomicUsize,
}

impl MediaProbe {
    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    /// Every `MediaTrack::stop` call, including repeated ones.
    pub fn stopped(&self) -> usize {
        self.stopped.load(Ordering::SeqCst)
    }
}

pub struct FakeTrack {
    kind: TrackKind,
    enabled: bool,
    probe: Arc<MediaProbe>,
}

impl FakeTrack {
    pub fn new(kind: TrackKind, probe: Arc<MediaProbe>) -> Self {
        Self {
            kind,
            enabled: true,
            probe,
        }
    }
}

impl MediaTrack for FakeTrack {
    fn kind(&self) -> TrackKind {
        self.kind
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn stop(&mut self) {
        self.probe.stopped.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct FakeDevices {
    probe: Arc<MediaProbe>,
    fail: Option<MediaError>,
}

impl FakeDevices {
    pub fn new(probe: Arc<MediaProbe>) -> Self {
        Self { probe, fail: None }
    }

    pub fn failing(probe: Arc<MediaProbe>, err: MediaError) -> Self {
        Self {
            probe,
            fail: Some(err),
        }
    }
}

impl MediaDevices for FakeDevices {
    fn acquire(&mut self, constraints: MediaConstraints) -> Result<LocalStream, MediaError> {
        if let Some(err) = &self.fail {
            return Err(err.clone());
        }
        let mut tracks: Vec<Box<dyn MediaTrack>> = Vec::new();
        if constraints.audio {
            tracks.push(Box::new(FakeTrack::new(TrackKind::Audio, self.probe.clone())));
        }
        if constraints.video {
            tracks.push(Box::new(FakeTrack::new(TrackKind::Video, self.probe.clone())));
        }
        self.probe.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(LocalStream::new(tracks))
    }
}

#[derive(Debug, Default)]
pub struct PcProbe {
    created: AtomicUsize,
    closed: AtomicUsize,
    remote: Mutex<Vec<SessionDescription>>,
    candidates: Mutex<Vec<IceCandidate>>,
}

impl PcProbe {
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn remote_descriptions(&self) -> Vec<SessionDescription> {
        self.remote.lock().unwrap().clone()
    }

    pub fn candidates(&self) -> Vec<IceCandidate> {
        self.candidates.lock().unwrap().clone()
    }
}

pub struct FakePeerConnection {
    probe: Arc<PcProbe>,
    fail_on: Option<&'static str>,
    local_kinds: Vec<TrackKind>,
    has_remote: bool,
}

impl FakePeerConnection {
    pub fn new(probe: Arc<PcProbe>) -> Self {
        probe.created.fetch_add(1, Ordering::SeqCst);
        Self {
            probe,
            fail_on: None,
            local_kinds: Vec::new(),
            has_remote: false,
        }
    }

    /// Make the named operation fail.
    pub fn failing_on(mut self, op: &'static str) -> Self {
        self.fail_on = Some(op);
        self
    }

    fn check(&self, op: &'static str) -> Result<(), NegotiationError> {
        if self.fail_on == Some(op) {
            Err(NegotiationError::PeerConnection(format!("{op} failed")))
        } else {
            Ok(())
        }
    }
}

impl PeerConnection for FakePeerConnection {
    fn add_local_stream(&mut self, stream: &LocalStream) -> Result<(), NegotiationError> {
        self.check("add_local_stream")?;
        self.local_kinds = stream.kinds();
        Ok(())
    }

    fn create_offer(&mut self) -> Result<SessionDescription, NegotiationError> {
        self.check("create_offer")?;
        Ok(SessionDescription::offer(format!(
            "v=0 offer {:?} candidates=all",
            self.local_kinds
        )))
    }

    fn create_answer(&mut self) -> Result<SessionDescription, NegotiationError> {
        self.check("create_answer")?;
        if !self.has_remote {
            return Err(NegotiationError::PeerConnection("answer before offer".into()));
        }
        Ok(SessionDescription::answer(format!(
            "v=0 answer {:?} candidates=all",
            self.local_kinds
        )))
    }

    fn set_remote_description(
        &mut self,
        desc: &SessionDescription,
    ) -> Result<(), NegotiationError> {
        self.check("set_remote_description")?;
        self.probe.remote.lock().unwrap().push(desc.clone());
        self.has_remote = true;
        Ok(())
    }

    fn add_ice_candidate(&mut self, candidate: &IceCandidate) -> Result<(), NegotiationError> {
        self.check("add_ice_candidate")?;
        self.probe.candidates.lock().unwrap().push(candidate.clone());
        Ok(())
    }

    fn remote_stream(&mut self) -> Option<RemoteStream> {
        self.has_remote.then(|| RemoteStream {
            id: "remote-0".into(),
            kinds: self.local_kinds.clone(),
        })
    }

    fn close(&mut self) {
        self.probe.closed.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct FakeFactory {
    probe: Arc<PcProbe>,
    fail_create: bool,
    fail_on: Option<&'static str>,
}

impl FakeFactory {
    pub fn new(probe: Arc<PcProbe>) -> Self {
        Self {
            probe,
            fail_create: false,
            fail_on: None,
        }
    }

    pub fn failing_create(probe: Arc<PcProbe>) -> Self {
        Self {
            probe,
            fail_create: true,
            fail_on: None,
        }
    }

    /// Every connection created fails on `op`.
    pub fn failing_on(probe: Arc<PcProbe>, op: &'static str) -> Self {
        Self {
            probe,
            fail_create: false,
            fail_on: Some(op),
        }
    }
}

impl PeerConnectionFactory for FakeFactory {
    fn create(&mut self, _config: &IceConfig) -> Result<Box<dyn PeerConnection>, NegotiationError> {
        if self.fail_create {
            return Err(NegotiationError::PeerConnection("no webrtc stack".into()));
        }
        let mut pc = FakePeerConnection::new(self.probe.clone());
        if let Some(op) = self.fail_on {
            pc = pc.failing_on(op);
        }
        Ok(Box::new(pc))
    }
}

/// Records every outbound signal instead of sending it.
#[derive(Debug, Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<ClientMsg>>,
}

impl RecordingSink {
    pub fn take(&self) -> Vec<ClientMsg> {
        std::mem::take(&mut *self.sent.lock().unwrap())
    }
}

impl SignalSink for RecordingSink {
    fn send_signal(&self, msg: ClientMsg) -> Result<(), SignalingClientError> {
        self.sent.lock().unwrap().push(msg);
        Ok(())
    }
}
