#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Two- and three-party call scenarios running through the real router.

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver};
use std::time::{Duration, Instant};

use crate::call::fakes::{FakeDevices, FakeFactory, MediaProbe, PcProbe, RecordingSink};
use crate::call::{CallError, CallEvent, CallState, EndReason, MediaError};
use crate::client::ChatClient;
use crate::config::CallSettings;
use crate::log::NoopLogSink;
use crate::signaling::protocol::{CallNotice, CallType, ChatBody, ClientMsg, ServerMsg};
use crate::signaling::router::Router;
use crate::signaling::types::ConnectionId;
use crate::signaling_client::SignalingEvent;

struct Party {
    conn: ConnectionId,
    client: ChatClient,
    sink: Arc<RecordingSink>,
    events: Receiver<CallEvent>,
    media: Arc<MediaProbe>,
    pcs: Arc<PcProbe>,
}

impl Party {
    fn new(user: &str, conn: ConnectionId) -> Self {
        Self::build(user, conn, None)
    }

    fn build(user: &str, conn: ConnectionId, media_error: Option<MediaError>) -> Self {
        let media = Arc::new(MediaProbe::default());
        let pcs = Arc::new(PcProbe::default());
        let devices = match media_error {
            Some(err) => FakeDevices::failing(media.clone(), err),
            None => FakeDevices::new(media.clone()),
        };
        let sink = Arc::new(RecordingSink::default());
        let (tx, events) = mpsc::channel();
        let client = ChatClient::new(
            user,
            sink.clone(),
            Box::new(FakeFactory::new(pcs.clone())),
            Box::new(devices),
            tx,
            &CallSettings::default(),
            Arc::new(NoopLogSink),
        );
        Self {
            conn,
            client,
            sink,
            events,
            media,
            pcs,
        }
    }

    fn join(&mut self, router: &mut Router) {
        router.register_client(self.conn);
        router.handle_from_client(self.conn, ClientMsg::Join(self.client.user_id().to_string()));
        self.client.handle_event(SignalingEvent::Connected);
    }

    fn state(&self) -> CallState {
        self.client.calls().state()
    }

    fn events(&self) -> Vec<CallEvent> {
        self.events.try_iter().collect()
    }
}

/// Shuttle traffic between parties and the router until it settles.
fn pump(router: &mut Router, parties: &mut [&mut Party]) {
    for _ in 0..32 {
        let mut moved = false;
        for p in parties.iter_mut() {
            for msg in p.sink.take() {
                moved = true;
                router.handle_from_client(p.conn, msg);
            }
        }
        for p in parties.iter_mut() {
            for msg in router.take_outgoing_for(p.conn) {
                moved = true;
                p.client.dispatch(msg);
            }
        }
        if !moved {
            return;
        }
    }
    panic!("traffic did not settle");
}

fn pair() -> (Router, Party, Party) {
    let mut router = Router::new();
    let mut a = Party::new("a", 1);
    let mut b = Party::new("b", 2);
    a.join(&mut router);
    b.join(&mut router);
    pump(&mut router, &mut [&mut a, &mut b]);
    (router, a, b)
}

#[test]
fn video_call_round_trip_releases_media_on_both_sides() {
    let (mut router, mut a, mut b) = pair();
    assert_eq!(a.client.online_users(), ["a", "b"]);
    assert_eq!(b.client.online_users(), ["a", "b"]);
    assert_eq!(a.client.online_peers(), vec!["b"]);

    a.client
        .calls_mut()
        .initiate_call("b", CallType::Video)
        .unwrap();
    pump(&mut router, &mut [&mut a, &mut b]);
    assert_eq!(a.state(), CallState::Calling);
    assert_eq!(b.state(), CallState::Receiving);

    match b.events().as_slice() {
        [CallEvent::IncomingCall {
            from,
            call_type,
            caller_info,
        }] => {
            assert_eq!(from, "a");
            assert_eq!(*call_type, CallType::Video);
            assert_eq!(caller_info.name, "User");
        }
        other => panic!("unexpected events on b: {other:?}"),
    }

    b.client.calls_mut().accept_call().unwrap();
    pump(&mut router, &mut [&mut a, &mut b]);
    assert_eq!(a.state(), CallState::Active);
    assert_eq!(b.state(), CallState::Active);
    assert!(a.events().iter().any(|e| matches!(
        e,
        CallEvent::Connected { peer, remote: Some(_) } if peer == "b"
    )));

    a.client.calls_mut().end_call();
    pump(&mut router, &mut [&mut a, &mut b]);
    assert_eq!(a.state(), CallState::Idle);
    assert_eq!(b.state(), CallState::Idle);
    assert_eq!(
        b.events().last(),
        Some(&CallEvent::Ended {
            peer: "a".into(),
            reason: EndReason::RemoteHangup
        })
    );

    for p in [&a, &b] {
        assert_eq!(p.media.acquired(), 1);
        assert_eq!(p.media.stopped(), 2, "audio and video stopped exactly once");
        assert_eq!(p.pcs.closed(), 1);
    }

    // Nothing left to release.
    a.client.calls_mut().end_call();
    b.client.calls_mut().reject_call();
    pump(&mut router, &mut [&mut a, &mut b]);
    assert_eq!(a.media.stopped(), 2);
    assert_eq!(b.media.stopped(), 2);
}

#[test]
fn callee_disconnect_while_ringing_leaves_caller_calling() {
    let (mut router, mut a, mut b) = pair();
    a.client
        .calls_mut()
        .initiate_call("b", CallType::Audio)
        .unwrap();
    pump(&mut router, &mut [&mut a, &mut b]);
    assert_eq!(b.state(), CallState::Receiving);

    router.unregister_client(b.conn);
    b.client.handle_event(SignalingEvent::Disconnected {
        reason: "closed by server".into(),
    });
    assert_eq!(b.state(), CallState::Idle);
    assert!(b.client.online_users().is_empty());
    assert!(!b.client.is_connected());
    assert!(b.sink.take().is_empty(), "nothing sent over a dead transport");

    pump(&mut router, &mut [&mut a]);
    assert_eq!(a.client.online_users(), ["a"]);
    assert_eq!(a.state(), CallState::Calling);

    assert!(a.client.tick(Instant::now() + Duration::from_secs(60)));
    pump(&mut router, &mut [&mut a]);
    assert_eq!(a.state(), CallState::Idle);
    assert_eq!(a.media.stopped(), 1);
    assert!(a.events().iter().any(|e| matches!(
        e,
        CallEvent::Ended {
            reason: EndReason::Timeout,
            ..
        }
    )));
}

#[test]
fn second_caller_is_rejected_while_busy() {
    let mut router = Router::new();
    let mut a = Party::new("a", 1);
    let mut b = Party::new("b", 2);
    let mut c = Party::new("c", 3);
    for p in [&mut a, &mut b, &mut c] {
        p.join(&mut router);
    }
    pump(&mut router, &mut [&mut a, &mut b, &mut c]);

    a.client
        .calls_mut()
        .initiate_call("b", CallType::Video)
        .unwrap();
    pump(&mut router, &mut [&mut a, &mut b, &mut c]);
    c.client
        .calls_mut()
        .initiate_call("b", CallType::Audio)
        .unwrap();
    pump(&mut router, &mut [&mut a, &mut b, &mut c]);

    assert_eq!(b.state(), CallState::Receiving);
    assert_eq!(b.client.calls().peer(), Some("a"));
    assert_eq!(a.state(), CallState::Calling);
    assert_eq!(c.state(), CallState::Idle);
    assert_eq!(c.media.stopped(), 1);
    assert_eq!(
        c.events().last(),
        Some(&CallEvent::Ended {
            peer: "b".into(),
            reason: EndReason::Rejected
        })
    );

    assert!(matches!(
        b.client.calls_mut().initiate_call("c", CallType::Audio),
        Err(CallError::Busy { .. })
    ));
}

#[test]
fn media_failure_on_accept_rejects_caller() {
    let mut router = Router::new();
    let mut a = Party::new("a", 1);
    let mut b = Party::build("b", 2, Some(MediaError::PermissionDenied));
    a.join(&mut router);
    b.join(&mut router);

    a.client
        .calls_mut()
        .initiate_call("b", CallType::Video)
        .unwrap();
    pump(&mut router, &mut [&mut a, &mut b]);

    assert!(matches!(
        b.client.calls_mut().accept_call(),
        Err(CallError::Media(MediaError::PermissionDenied))
    ));
    assert_eq!(b.state(), CallState::Idle);

    pump(&mut router, &mut [&mut a, &mut b]);
    assert_eq!(a.state(), CallState::Idle);
    assert_eq!(a.media.stopped(), 2);
    assert_eq!(a.pcs.closed(), 1);
}

#[test]
fn declined_call_notifies_caller_once() {
    let (mut router, mut a, mut b) = pair();
    a.client
        .calls_mut()
        .initiate_call("b", CallType::Audio)
        .unwrap();
    pump(&mut router, &mut [&mut a, &mut b]);

    b.client.calls_mut().reject_call();
    b.client.calls_mut().reject_call();
    let sent = b.sink.take();
    assert_eq!(sent.len(), 1);
    for msg in sent {
        router.handle_from_client(b.conn, msg);
    }
    b.client.calls_mut().reject_call();
    pump(&mut router, &mut [&mut a, &mut b]);

    assert_eq!(a.state(), CallState::Idle);
    assert_eq!(b.media.acquired(), 0);
}

#[test]
fn simultaneous_calls_settle_into_one_active_call() {
    let (mut router, mut a, mut b) = pair();
    a.client
        .calls_mut()
        .initiate_call("b", CallType::Video)
        .unwrap();
    b.client
        .calls_mut()
        .initiate_call("a", CallType::Video)
        .unwrap();
    pump(&mut router, &mut [&mut a, &mut b]);

    assert_eq!(a.state(), CallState::Active);
    assert_eq!(b.state(), CallState::Active);
    assert!(b.client.calls().session().unwrap().is_initiator);
    assert!(!a.client.calls().session().unwrap().is_initiator);

    b.client.calls_mut().end_call();
    pump(&mut router, &mut [&mut a, &mut b]);
    assert_eq!(a.state(), CallState::Idle);
    assert_eq!(a.media.acquired(), 2);
    assert_eq!(a.media.stopped(), 4);
    assert_eq!(b.media.stopped(), 2);
}

#[test]
fn chat_reaches_online_receivers_only() {
    let (mut router, mut a, mut b) = pair();

    a.client
        .send_chat(
            "b",
            ChatBody {
                text: Some("hi".into()),
                sender_name: Some("Alice".into()),
                ..ChatBody::default()
            },
        )
        .unwrap();
    a.client
        .send_chat(
            "zed",
            ChatBody {
                text: Some("anyone?".into()),
                ..ChatBody::default()
            },
        )
        .unwrap();
    pump(&mut router, &mut [&mut a, &mut b]);

    let inbox = b.client.take_inbox();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].content.as_deref(), Some("hi"));
    assert_eq!(inbox[0].sender.id, "a");
    assert_eq!(inbox[0].sender.name.as_deref(), Some("Alice"));
    assert!(!inbox[0].is_own);
    assert!(a.client.inbox().is_empty());
}

#[test]
fn presence_updates_and_stray_call_end() {
    let (_router, mut a, _b) = pair();
    a.client.dispatch(ServerMsg::OnlineUsers(vec!["a".into(), "z".into()]));
    assert_eq!(a.client.online_peers(), vec!["z"]);

    a.client
        .handle_event(SignalingEvent::Message(ServerMsg::CallEnd(
            CallNotice { from: "z".into() },
        )));
    assert_eq!(a.state(), CallState::Idle);
    assert!(a.events().is_empty());
}
