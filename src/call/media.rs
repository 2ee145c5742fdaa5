use std::fmt;

use crate::call::call_error::MediaError;
use crate::signaling::protocol::CallType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackKind {
    Audio,
    Video,
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackKind::Audio => f.write_str("audio"),
            TrackKind::Video => f.write_str("video"),
        }
    }
}

/// One captured audio or video track.
pub trait MediaTrack: Send {
    fn kind(&self) -> TrackKind;
    fn set_enabled(&mut self, enabled: bool);
    fn is_enabled(&self) -> bool;
    /// Release the underlying device.
    fn stop(&mut self);
}

/// What to ask the capture layer for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaConstraints {
    pub audio: bool,
    pub video: bool,
}

impl MediaConstraints {
    /// Audio always, video only for video calls.
    pub fn for_call(call_type: CallType) -> Self {
        Self {
            audio: true,
            video: call_type.wants_video(),
        }
    }
}

/// Capture devices (microphone, camera).
pub trait MediaDevices: Send {
    fn acquire(&mut self, constraints: MediaConstraints) -> Result<LocalStream, MediaError>;
}

/// Exclusively owned local capture. Tracks are stopped exactly once, either
/// by `stop()` or on drop.
pub struct LocalStream {
    tracks: Vec<Box<dyn MediaTrack>>,
    stopped: bool,
}

impl LocalStream {
    pub fn new(tracks: Vec<Box<dyn MediaTrack>>) -> Self {
        Self {
            tracks,
            stopped: false,
        }
    }

    pub fn has(&self, kind: TrackKind) -> bool {
        self.tracks.iter().any(|t| t.kind() == kind)
    }

    pub fn kinds(&self) -> Vec<TrackKind> {
        self.tracks.iter().map(|t| t.kind()).collect()
    }

    /// Enable/disable every track of `kind`; false if there is none.
    pub fn set_enabled(&mut self, kind: TrackKind, enabled: bool) -> bool {
        let mut found = false;
        for track in self.tracks.iter_mut().filter(|t| t.kind() == kind) {
            track.set_enabled(enabled);
            found = true;
        }
        found
    }

    pub fn is_enabled(&self, kind: TrackKind) -> bool {
        self.tracks
            .iter()
            .filter(|t| t.kind() == kind)
            .any(|t| t.is_enabled())
    }

    pub fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        for track in &mut self.tracks {
            track.stop();
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }
}

impl Drop for LocalStream {
    fn drop(&mut self) {
        self.stop();
    }
}

impl fmt::Debug for LocalStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalStream")
            .field("kinds", &self.kinds())
            .field("stopped", &self.stopped)
            .finish()
    }
}

/// Remote media as surfaced by the peer connection once negotiated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteStream {
    pub id: String,
    pub kinds: Vec<TrackKind>,
}
