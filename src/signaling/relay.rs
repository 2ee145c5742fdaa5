use std::sync::Arc;

use crate::log::{LogSink, NoopLogSink};
use crate::signaling::auth::IdentityResolver;
use crate::signaling::presence::PresenceDirectory;
use crate::signaling::protocol::{
    CallNotice, CallType, CallerInfo, ClientMsg, DEFAULT_CALLER_NAME, IncomingOffer,
    IncomingSignal, ServerMsg, SignalPayload, UserId,
};
use crate::signaling::types::OutgoingMsg;
use crate::{sink_debug, sink_warn};

/// What a call-related message carries besides its addresses.
#[derive(Debug, Clone, PartialEq)]
pub enum SignalKind {
    Offer {
        signal: SignalPayload,
        call_type: CallType,
    },
    Answer {
        signal: SignalPayload,
    },
    Candidate {
        signal: SignalPayload,
    },
    Reject,
    End,
}

impl SignalKind {
    pub fn event_name(&self) -> &'static str {
        match self {
            SignalKind::Offer { .. } => "call-offer",
            SignalKind::Answer { .. } => "call-answer",
            SignalKind::Candidate { .. } => "call-candidate",
            SignalKind::Reject => "call-reject",
            SignalKind::End => "call-end",
        }
    }
}

/// Addressed call signal as received from a client.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalEnvelope {
    pub to: UserId,
    pub from: UserId,
    pub kind: SignalKind,
}

impl SignalEnvelope {
    /// Split call signals off from the rest of the client vocabulary.
    /// Anything else is handed back untouched.
    pub fn from_client_msg(msg: ClientMsg) -> Result<Self, ClientMsg> {
        let (to, from, kind) = match msg {
            ClientMsg::CallOffer(o) => (
                o.to,
                o.from,
                SignalKind::Offer {
                    signal: o.signal,
                    call_type: o.call_type,
                },
            ),
            ClientMsg::CallAnswer(s) => (s.to, s.from, SignalKind::Answer { signal: s.signal }),
            ClientMsg::CallCandidate(s) => {
                (s.to, s.from, SignalKind::Candidate { signal: s.signal })
            }
            ClientMsg::CallReject(c) => (c.to, c.from, SignalKind::Reject),
            ClientMsg::CallEnd(c) => (c.to, c.from, SignalKind::End),
            other => return Err(other),
        };
        Ok(Self { to, from, kind })
    }
}

/// Stateless forwarder of call signals between online users.
///
/// Delivery is best effort: an offline target means the signal is dropped
/// and the sender is not told.
pub struct SignalRelay {
    log: Arc<dyn LogSink>,
}

impl SignalRelay {
    pub fn new(log: Arc<dyn LogSink>) -> Self {
        Self { log }
    }

    pub fn forward(
        &self,
        directory: &PresenceDirectory,
        identities: &dyn IdentityResolver,
        envelope: SignalEnvelope,
    ) -> Option<OutgoingMsg> {
        let SignalEnvelope { to, from, kind } = envelope;
        let event = kind.event_name();

        if to.is_empty() {
            sink_warn!(self.log, "dropping {} from '{}' with empty target", event, from);
            return None;
        }

        let Some(target) = directory.lookup(&to) else {
            sink_debug!(
                self.log,
                "dropping {} from '{}': '{}' is offline",
                event,
                from,
                to
            );
            return None;
        };

        let msg = match kind {
            SignalKind::Offer { signal, call_type } => ServerMsg::CallOffer(IncomingOffer {
                caller_info: caller_info(identities, &from),
                from,
                signal,
                call_type,
            }),
            SignalKind::Answer { signal } => ServerMsg::CallAnswer(IncomingSignal { from, signal }),
            SignalKind::Candidate { signal } => {
                ServerMsg::CallCandidate(IncomingSignal { from, signal })
            }
            SignalKind::Reject => ServerMsg::CallReject(CallNotice { from }),
            SignalKind::End => ServerMsg::CallEnd(CallNotice { from }),
        };

        sink_debug!(self.log, "relaying {} to '{}' on connection {}", event, to, target);
        Some(OutgoingMsg { target, msg })
    }
}

impl Default for SignalRelay {
    fn default() -> Self {
        Self::new(Arc::new(NoopLogSink))
    }
}

fn caller_info(identities: &dyn IdentityResolver, user_id: &str) -> CallerInfo {
    match identities.profile(user_id) {
        Some(profile) => CallerInfo {
            name: profile.name,
            avatar: profile.avatar,
        },
        None => CallerInfo {
            name: DEFAULT_CALLER_NAME.to_string(),
            avatar: None,
        },
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use crate::signaling::auth::{AllowAllIdentities, InMemoryIdentities};
    use crate::signaling::protocol::{CallControl, CallOfferRequest, SignalRequest};
    use serde_json::json;

    fn directory_with(users: &[(&str, u64)]) -> PresenceDirectory {
        let mut dir = PresenceDirectory::new();
        for (user, conn) in users {
            dir.join((*user).to_string(), *conn);
        }
        dir
    }

    fn envelope(msg: ClientMsg) -> SignalEnvelope {
        SignalEnvelope::from_client_msg(msg).expect("call signal")
    }

    #[test]
    fn offer_gets_caller_info_from_profile() {
        let dir = directory_with(&[("a", 1), ("b", 2)]);
        let ids = InMemoryIdentities::new().with_user("a", "Ana", Some("ana.png"));
        let relay = SignalRelay::default();

        let out = relay
            .forward(
                &dir,
                &ids,
                envelope(ClientMsg::CallOffer(CallOfferRequest {
                    to: "b".into(),
                    from: "a".into(),
                    signal: json!({"type": "offer", "sdp": "X"}),
                    call_type: CallType::Audio,
                })),
            )
            .expect("delivered");

        assert_eq!(out.target, 2);
        assert_eq!(
            out.msg,
            ServerMsg::CallOffer(IncomingOffer {
                from: "a".into(),
                signal: json!({"type": "offer", "sdp": "X"}),
                call_type: CallType::Audio,
                caller_info: CallerInfo {
                    name: "Ana".into(),
                    avatar: Some("ana.png".into()),
                },
            })
        );
    }

    #[test]
    fn unknown_caller_is_named_user() {
        let dir = directory_with(&[("b", 2)]);
        let out = SignalRelay::default()
            .forward(
                &dir,
                &AllowAllIdentities,
                envelope(ClientMsg::CallOffer(CallOfferRequest {
                    to: "b".into(),
                    from: "ghost".into(),
                    signal: json!({}),
                    call_type: CallType::Video,
                })),
            )
            .unwrap();
        match out.msg {
            ServerMsg::CallOffer(offer) => {
                assert_eq!(offer.caller_info.name, DEFAULT_CALLER_NAME);
                assert_eq!(offer.caller_info.avatar, None);
            }
            other => panic!("expected call-offer, got {other:?}"),
        }
    }

    #[test]
    fn answer_candidate_reject_end_keep_only_sender_and_payload() {
        let dir = directory_with(&[("a", 1), ("b", 2)]);
        let relay = SignalRelay::default();
        let ids = AllowAllIdentities;

        let out = relay
            .forward(
                &dir,
                &ids,
                envelope(ClientMsg::CallAnswer(SignalRequest {
                    to: "a".into(),
                    from: "b".into(),
                    signal: json!({"type": "answer", "sdp": "Y"}),
                })),
            )
            .unwrap();
        assert_eq!(out.target, 1);
        assert_eq!(
            out.msg,
            ServerMsg::CallAnswer(IncomingSignal {
                from: "b".into(),
                signal: json!({"type": "answer", "sdp": "Y"}),
            })
        );

        let out = relay
            .forward(
                &dir,
                &ids,
                envelope(ClientMsg::CallCandidate(SignalRequest {
                    to: "b".into(),
                    from: "a".into(),
                    signal: json!({"candidate": "c1"}),
                })),
            )
            .unwrap();
        assert_eq!(out.target, 2);
        assert!(matches!(out.msg, ServerMsg::CallCandidate(_)));

        let control = CallControl {
            to: "a".into(),
            from: "b".into(),
        };
        let out = relay
            .forward(&dir, &ids, envelope(ClientMsg::CallReject(control.clone())))
            .unwrap();
        assert_eq!(out.msg, ServerMsg::CallReject(CallNotice { from: "b".into() }));

        let out = relay
            .forward(&dir, &ids, envelope(ClientMsg::CallEnd(control)))
            .unwrap();
        assert_eq!(out.msg, ServerMsg::CallEnd(CallNotice { from: "b".into() }));
    }

    #[test]
    fn offline_target_is_dropped_silently() {
        let dir = directory_with(&[("a", 1)]);
        let out = SignalRelay::default().forward(
            &dir,
            &AllowAllIdentities,
            envelope(ClientMsg::CallEnd(CallControl {
                to: "nobody".into(),
                from: "a".into(),
            })),
        );
        assert!(out.is_none());
    }

    #[test]
    fn non_call_messages_are_handed_back() {
        let back = SignalEnvelope::from_client_msg(ClientMsg::Join("a".into()));
        assert_eq!(back, Err(ClientMsg::Join("a".into())));
    }
}
