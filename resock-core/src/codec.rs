//! Codec for signaling messages
//!
//! Outbound payloads are plain JSON text: anything implementing `Serialize`
//! can be sent, and it goes on the wire exactly as `serde_json` renders it.
//! Inbound text is decoded into a [`Message`], which requires a JSON object
//! carrying one of the `request`, `response` or `notification` flags.
//!
//! # Examples
//!
//! ```rust
//! use resock_core::codec;
//! use serde_json::json;
//!
//! assert_eq!(codec::encode(&json!({"a": 1})).unwrap(), r#"{"a":1}"#);
//!
//! let msg = codec::decode(r#"{"notification":true,"method":"ping"}"#).unwrap();
//! assert!(msg.is_notification());
//! ```

use crate::error::{Error, Result};
use crate::types::Message;
use serde::Serialize;
use serde_json::Value;

/// Encode any serializable payload to JSON text
pub fn encode<T: Serialize + ?Sized>(msg: &T) -> Result<String> {
    serde_json::to_string(msg).map_err(|e| Error::Serialization(e.to_string()))
}

/// Decode inbound text into a signaling message
///
/// Parses to a generic JSON value first so malformed JSON and wrong shapes
/// get distinct errors, then lets the untagged [`Message`] pick the variant
/// whose type flag is set.
///
/// # Errors
///
/// Returns `Error::InvalidMessage` when the text is not JSON, not an
/// object, carries no known type flag, or misses a field its type requires.
pub fn decode(data: &str) -> Result<Message> {
    let value: Value = serde_json::from_str(data)
        .map_err(|e| Error::InvalidMessage(format!("not valid JSON: {}", e)))?;

    if !value.is_object() {
        return Err(Error::InvalidMessage("not a JSON object".to_string()));
    }

    let message: Message = serde_json::from_value(value).map_err(|_| {
        Error::InvalidMessage("unknown message type or missing field".to_string())
    })?;

    if message.method() == Some("") {
        return Err(Error::InvalidMessage("missing method".to_string()));
    }

    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_encode_literal_text() {
        assert_eq!(encode(&json!({"a": 1})).unwrap(), r#"{"a":1}"#);
        assert_eq!(encode("hello").unwrap(), r#""hello""#);
    }

    #[test]
    fn test_decode_request() {
        let msg = decode(r#"{"request":true,"id":42,"method":"join","data":{"room":"r1"}}"#)
            .unwrap();
        match msg {
            Message::Request(req) => {
                assert_eq!(req.id, 42);
                assert_eq!(req.method, "join");
                assert_eq!(req.data, json!({"room": "r1"}));
            }
            other => panic!("expected request, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_success_response() {
        let msg = decode(r#"{"response":true,"id":7,"ok":true,"data":{"x":1}}"#).unwrap();
        match msg {
            Message::Response(resp) => {
                assert!(resp.ok);
                assert_eq!(resp.id, 7);
                assert_eq!(resp.data, json!({"x": 1}));
            }
            other => panic!("expected response, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_error_response() {
        let msg = decode(
            r#"{"response":true,"id":7,"ok":false,"errorCode":500,"errorReason":"boom"}"#,
        )
        .unwrap();
        match msg {
            Message::Response(resp) => {
                assert!(!resp.ok);
                assert_eq!(resp.error_code, Some(500));
                assert_eq!(resp.error_reason.as_deref(), Some("boom"));
            }
            other => panic!("expected response, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_notification_without_data() {
        let msg = decode(r#"{"notification":true,"method":"peerClosed"}"#).unwrap();
        assert!(msg.is_notification());
        assert_eq!(msg.method(), Some("peerClosed"));
        assert_eq!(msg.data(), &json!({}));
    }

    #[test]
    fn test_decode_rejects_invalid_input() {
        assert!(matches!(decode("{"), Err(Error::InvalidMessage(_))));
        assert!(matches!(decode("[1,2]"), Err(Error::InvalidMessage(_))));
        assert!(matches!(decode(r#"{"a":1}"#), Err(Error::InvalidMessage(_))));
        // request without id
        assert!(decode(r#"{"request":true,"method":"join"}"#).is_err());
        // notification without method
        assert!(decode(r#"{"notification":true}"#).is_err());
    }

    #[test]
    fn test_decode_rejects_false_flags() {
        assert!(decode(r#"{"request":false,"id":1,"method":"join"}"#).is_err());
        assert!(decode(r#"{"notification":true,"method":""}"#).is_err());

        // a false flag does not hide a true one
        let msg = decode(r#"{"request":false,"notification":true,"method":"x"}"#).unwrap();
        assert!(msg.is_notification());
    }

    #[test]
    fn test_decode_null_data_is_empty_object() {
        let msg = decode(r#"{"request":true,"id":3,"method":"join","data":null}"#).unwrap();
        assert_eq!(msg.data(), &json!({}));
    }

    #[test]
    fn test_encoded_messages_decode_back() {
        let Message::Request(req) = Message::request("join", Some(json!({"roomId": "r1"}))) else {
            panic!("expected request");
        };
        let messages = vec![
            Message::Request(req.clone()),
            Message::success_response(&req, Some(json!({"peers": []}))),
            Message::error_response(&req, 403, "forbidden"),
            Message::notification("peerClosed", None),
        ];

        for message in messages {
            let text = encode(&message).unwrap();
            assert_eq!(decode(&text).unwrap(), message, "{}", text);
        }
    }

    #[test]
    fn test_error_response_encoding() {
        let Message::Request(req) = Message::request("join", None) else {
            panic!("expected request");
        };
        let text = encode(&Message::error_response(&req, 403, "forbidden")).unwrap();
        assert_eq!(
            text,
            format!(
                r#"{{"response":true,"id":{},"ok":false,"errorCode":403,"errorReason":"forbidden"}}"#,
                req.id
            )
        );
    }
}
