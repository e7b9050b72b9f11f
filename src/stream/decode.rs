//! Decoding of reassembled frames into [`StreamEvent`]s.

use serde_json::Value;

use crate::error::{DecodeWarning, GENERIC_FAILURE_MESSAGE};
use crate::types::{RawFrame, StreamEvent};

pub const MESSAGE_KIND: &str = "Message";
pub const INTERRUPT_KIND: &str = "Interrupt";
pub const DONE_KIND: &str = "Done";
pub const ERROR_KIND: &str = "Error";

/// Decode one complete frame.
///
/// Returns `Ok(None)` for event kinds this client does not know, and a
/// [`DecodeWarning`] when the payload is not valid JSON. Decoding is a pure
/// function of the frame.
pub fn decode_frame(frame: &RawFrame) -> Result<Option<StreamEvent>, DecodeWarning> {
    let kind = frame.event_kind.as_deref().unwrap_or_default();
    let data = frame.data.as_deref().unwrap_or_default();

    match kind {
        MESSAGE_KIND => {
            let payload = parse_payload(frame, data)?;
            let text = match payload.get("content") {
                Some(Value::String(content)) => unwrap_output_envelope(content),
                Some(Value::Null) | None => String::new(),
                Some(other) => other.to_string(),
            };
            Ok(Some(StreamEvent::MessageDelta { text }))
        }
        INTERRUPT_KIND => {
            let payload = parse_payload(frame, data)?;
            let interrupt_data = payload.get("interrupt_data");
            let continuation_token = interrupt_data
                .and_then(|d| d.get("event_id"))
                .and_then(|id| match id {
                    Value::String(s) => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .unwrap_or_default();
            let interrupt_type = interrupt_data
                .and_then(|d| d.get("type"))
                .and_then(Value::as_i64);
            Ok(Some(StreamEvent::Interrupt {
                continuation_token,
                interrupt_type,
                prompt_payload: payload,
            }))
        }
        DONE_KIND => Ok(Some(StreamEvent::Done)),
        ERROR_KIND => {
            let payload = parse_payload(frame, data)?;
            let message = payload
                .get("error_message")
                .and_then(Value::as_str)
                .filter(|m| !m.trim().is_empty())
                .unwrap_or(GENERIC_FAILURE_MESSAGE)
                .to_string();
            let code = payload.get("error_code").and_then(Value::as_i64);
            Ok(Some(StreamEvent::Error { message, code }))
        }
        _ => Ok(None),
    }
}

/// Unwrap a fragment of the form `{"output": ...}` exactly once.
///
/// Anything that is not such an envelope is returned unchanged.
pub fn unwrap_output_envelope(fragment: &str) -> String {
    let trimmed = fragment.trim_start();
    if !trimmed.starts_with('{') {
        return fragment.to_string();
    }
    match serde_json::from_str::<Value>(fragment) {
        Ok(Value::Object(mut map)) => match map.remove("output") {
            Some(Value::String(inner)) => inner,
            Some(Value::Null) | None => fragment.to_string(),
            Some(other) => other.to_string(),
        },
        _ => fragment.to_string(),
    }
}

fn parse_payload(frame: &RawFrame, data: &str) -> Result<Value, DecodeWarning> {
    serde_json::from_str::<Value>(data).map_err(|err| DecodeWarning {
        event_kind: frame.event_kind.clone().unwrap_or_default(),
        frame_id: frame.id.clone(),
        reason: format!("payload is not valid JSON: {err}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn message_content_becomes_delta() {
        let event = decode_frame(&RawFrame::new("Message", r#"{"content":"abc"}"#)).unwrap();
        assert_eq!(event, Some(StreamEvent::delta("abc")));
    }

    #[test]
    fn message_output_envelope_is_unwrapped_once() {
        let frame = RawFrame::new(
            "Message",
            json!({"content": r#"{"output":"real text"}"#}).to_string(),
        );
        assert_eq!(decode_frame(&frame).unwrap(), Some(StreamEvent::delta("real text")));

        let nested = json!({"output": r#"{"output":"inner"}"#}).to_string();
        let frame = RawFrame::new("Message", json!({ "content": nested }).to_string());
        assert_eq!(
            decode_frame(&frame).unwrap(),
            Some(StreamEvent::delta(r#"{"output":"inner"}"#))
        );
    }

    #[test]
    fn envelope_fallbacks_keep_original_text() {
        assert_eq!(unwrap_output_envelope("plain"), "plain");
        assert_eq!(unwrap_output_envelope("{not json"), "{not json");
        assert_eq!(unwrap_output_envelope(r#"{"other":"x"}"#), r#"{"other":"x"}"#);
        assert_eq!(unwrap_output_envelope(r#"{"output":3}"#), "3");
    }

    #[test]
    fn message_without_content_is_empty_delta() {
        let event = decode_frame(&RawFrame::new("Message", r#"{"node_title":"x"}"#)).unwrap();
        assert_eq!(event, Some(StreamEvent::delta("")));
    }

    #[test]
    fn interrupt_extracts_token_and_type() {
        let data = json!({"interrupt_data": {"event_id": "tok-1", "type": 2}, "node_title": "ask"});
        let event = decode_frame(&RawFrame::new("Interrupt", data.to_string())).unwrap();
        assert_eq!(
            event,
            Some(StreamEvent::Interrupt {
                continuation_token: "tok-1".to_string(),
                interrupt_type: Some(2),
                prompt_payload: data,
            })
        );
    }

    #[test]
    fn interrupt_without_token_is_still_emitted() {
        let event = decode_frame(&RawFrame::new("Interrupt", "{}")).unwrap();
        assert!(matches!(
            event,
            Some(StreamEvent::Interrupt { ref continuation_token, .. }) if continuation_token.is_empty()
        ));
    }

    #[test]
    fn done_ignores_payload() {
        let event = decode_frame(&RawFrame::new("Done", "not json at all")).unwrap();
        assert_eq!(event, Some(StreamEvent::Done));
    }

    #[test]
    fn error_message_and_default() {
        let event = decode_frame(&RawFrame::new("Error", r#"{"error_message":"boom","error_code":4000}"#))
            .unwrap();
        assert_eq!(
            event,
            Some(StreamEvent::Error {
                message: "boom".to_string(),
                code: Some(4000),
            })
        );

        let event = decode_frame(&RawFrame::new("Error", "{}")).unwrap();
        assert_eq!(
            event,
            Some(StreamEvent::Error {
                message: GENERIC_FAILURE_MESSAGE.to_string(),
                code: None,
            })
        );
    }

    #[test]
    fn unknown_and_differently_cased_kinds_are_ignored() {
        assert_eq!(decode_frame(&RawFrame::new("PING", "{}")).unwrap(), None);
        assert_eq!(decode_frame(&RawFrame::new("message", r#"{"content":"x"}"#)).unwrap(), None);
    }

    #[test]
    fn malformed_payload_is_a_warning() {
        let warning = decode_frame(&RawFrame::new("Message", "{oops").with_id("7")).unwrap_err();
        assert_eq!(warning.event_kind, "Message");
        assert_eq!(warning.frame_id.as_deref(), Some("7"));
    }

    #[test]
    fn decoding_is_repeatable() {
        let frame = RawFrame::new("Message", r#"{"content":"{\"output\":\"x\"}"}"#);
        assert_eq!(decode_frame(&frame).unwrap(), decode_frame(&frame).unwrap());
    }
}
