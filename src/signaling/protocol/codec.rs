use serde::Serialize;
use serde::de::DeserializeOwned;

use super::{MAX_BODY_LEN, ProtoError};

/// Encode one protocol message into the text of a WebSocket frame.
pub fn encode_msg<M: Serialize>(msg: &M) -> Result<String, ProtoError> {
    let text = serde_json::to_string(msg)?;
    if text.len() > MAX_BODY_LEN {
        return Err(ProtoError::TooLarge {
            max: MAX_BODY_LEN,
            actual: text.len(),
        });
    }
    Ok(text)
}

/// Decode the text of a WebSocket frame, enforcing `MAX_BODY_LEN`.
pub fn decode_msg<M: DeserializeOwned>(text: &str) -> Result<M, ProtoError> {
    if text.len() > MAX_BODY_LEN {
        return Err(ProtoError::TooLarge {
            max: MAX_BODY_LEN,
            actual: text.len(),
        });
    }
    Ok(serde_json::from_str(text)?)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use crate::signaling::protocol::{
        CallControl, CallOfferRequest, CallType, ClientMsg, ServerMsg, SignalRequest,
    };
    use serde_json::json;

    #[test]
    fn join_is_a_bare_user_id() {
        let msg: ClientMsg = decode_msg(r#"{"event":"join","data":"a"}"#).unwrap();
        assert_eq!(msg, ClientMsg::Join("a".into()));
        assert_eq!(encode_msg(&msg).unwrap(), r#"{"event":"join","data":"a"}"#);
    }

    #[test]
    fn call_offer_uses_browser_field_names() {
        let text = r#"{"event":"call-offer","data":{"to":"b","from":"a","signal":{"type":"offer","sdp":"v=0"},"type":"video"}}"#;
        let msg: ClientMsg = decode_msg(text).unwrap();
        assert_eq!(
            msg,
            ClientMsg::CallOffer(CallOfferRequest {
                to: "b".into(),
                from: "a".into(),
                signal: json!({"type": "offer", "sdp": "v=0"}),
                call_type: CallType::Video,
            })
        );
    }

    #[test]
    fn reject_and_end_carry_only_addresses() {
        let msg: ClientMsg =
            decode_msg(r#"{"event":"call-end","data":{"to":"a","from":"b"}}"#).unwrap();
        assert_eq!(
            msg,
            ClientMsg::CallEnd(CallControl {
                to: "a".into(),
                from: "b".into()
            })
        );

        let msg: ClientMsg =
            decode_msg(r#"{"event":"call-reject","data":{"to":"a","from":"b"}}"#).unwrap();
        assert!(matches!(msg, ClientMsg::CallReject(_)));
    }

    #[test]
    fn candidate_event_name() {
        let msg = ClientMsg::CallCandidate(SignalRequest {
            to: "b".into(),
            from: "a".into(),
            signal: json!({"candidate": "candidate:1 1 udp 1 10.0.0.1 5000 typ host"}),
        });
        let text = encode_msg(&msg).unwrap();
        assert!(text.starts_with(r#"{"event":"call-candidate""#), "{text}");
    }

    #[test]
    fn online_users_is_a_plain_array() {
        let text = encode_msg(&ServerMsg::OnlineUsers(vec!["a".into(), "b".into()])).unwrap();
        assert_eq!(text, r#"{"event":"onlineUsers","data":["a","b"]}"#);
    }

    #[test]
    fn rejects_unknown_events_and_missing_fields() {
        assert!(matches!(
            decode_msg::<ClientMsg>(r#"{"event":"teleport","data":{}}"#),
            Err(ProtoError::Json(_))
        ));
        assert!(matches!(
            decode_msg::<ClientMsg>(r#"{"event":"call-answer","data":{"to":"a"}}"#),
            Err(ProtoError::Json(_))
        ));
        assert!(decode_msg::<ClientMsg>("not json").is_err());
    }

    #[test]
    fn rejects_oversized_frames() {
        let huge = "x".repeat(MAX_BODY_LEN + 1);
        assert!(matches!(
            decode_msg::<ClientMsg>(&huge),
            Err(ProtoError::TooLarge { .. })
        ));
    }
}
