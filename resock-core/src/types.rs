//! Signaling message types
//!
//! Messages exchanged with a signaling server come in three shapes, told
//! apart by a boolean flag on the JSON object:
//!
//! ```text
//! {"request":true,"id":12,"method":"join","data":{...}}
//! {"response":true,"id":12,"ok":true,"data":{...}}
//! {"response":true,"id":12,"ok":false,"errorCode":403,"errorReason":"..."}
//! {"notification":true,"method":"peerClosed","data":{...}}
//! ```
//!
//! A response always carries the id of the request it answers. Request ids
//! are random (see [`crate::util::generate_random_number`]) rather than
//! sequential, so two peers can issue requests without coordinating.

use crate::codec;
use crate::util::generate_random_number;
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// A decoded signaling message
///
/// Uses `#[serde(untagged)]`: each variant serializes as its inner struct,
/// and deserialization picks the variant whose type flag is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Message {
    /// A call that expects a response
    Request(Request),
    /// The answer to an earlier request
    Response(Response),
    /// A one-way event
    Notification(Notification),
}

/// Signaling request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Type flag, always `true`
    #[serde(deserialize_with = "flag_set")]
    pub request: bool,
    /// Correlation id echoed back by the response
    pub id: u64,
    /// Method name
    pub method: String,
    /// Method payload (defaults to an empty object)
    #[serde(default = "empty_data", deserialize_with = "data_or_empty")]
    pub data: Value,
}

/// Signaling response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    /// Type flag, always `true`
    #[serde(deserialize_with = "flag_set")]
    pub response: bool,
    /// Id of the request being answered
    pub id: u64,
    /// Whether the request succeeded
    #[serde(default)]
    pub ok: bool,
    /// Result payload when `ok` is true
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,
    /// Error code when `ok` is false
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<i64>,
    /// Human-readable error when `ok` is false
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<String>,
}

/// Signaling notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Type flag, always `true`
    #[serde(deserialize_with = "flag_set")]
    pub notification: bool,
    /// Event name
    pub method: String,
    /// Event payload (defaults to an empty object)
    #[serde(default = "empty_data", deserialize_with = "data_or_empty")]
    pub data: Value,
}

fn empty_data() -> Value {
    Value::Object(Map::new())
}

/// A type flag only identifies its variant when it is `true`
fn flag_set<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    if bool::deserialize(deserializer)? {
        Ok(true)
    } else {
        Err(de::Error::custom("type flag is false"))
    }
}

/// `null` data is treated like missing data
fn data_or_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Value, D::Error> {
    Ok(Option::<Value>::deserialize(deserializer)?
        .filter(|data| !data.is_null())
        .unwrap_or_else(empty_data))
}

impl Message {
    /// Parse raw inbound text into a message
    ///
    /// Returns `None` when the text is not a well-formed signaling message.
    /// The reason is logged; callers only need to drop the frame.
    pub fn parse(raw: &str) -> Option<Message> {
        match codec::decode(raw) {
            Ok(message) => Some(message),
            Err(e) => {
                tracing::error!(error = %e, "parse() | invalid message");
                None
            }
        }
    }

    /// Create a request with a fresh random id
    pub fn request(method: impl Into<String>, data: Option<Value>) -> Self {
        Message::Request(Request {
            request: true,
            id: u64::from(generate_random_number()),
            method: method.into(),
            data: data.unwrap_or_else(empty_data),
        })
    }

    /// Create a notification
    pub fn notification(method: impl Into<String>, data: Option<Value>) -> Self {
        Message::Notification(Notification {
            notification: true,
            method: method.into(),
            data: data.unwrap_or_else(empty_data),
        })
    }

    /// Create a successful response to `request`
    pub fn success_response(request: &Request, data: Option<Value>) -> Self {
        Message::Response(Response {
            response: true,
            id: request.id,
            ok: true,
            data: data.unwrap_or_else(empty_data),
            error_code: None,
            error_reason: None,
        })
    }

    /// Create an error response to `request`
    pub fn error_response(request: &Request, code: i64, reason: impl Into<String>) -> Self {
        Message::Response(Response {
            response: true,
            id: request.id,
            ok: false,
            data: Value::Null,
            error_code: Some(code),
            error_reason: Some(reason.into()),
        })
    }

    /// Correlation id, if the message has one
    pub fn id(&self) -> Option<u64> {
        match self {
            Message::Request(req) => Some(req.id),
            Message::Response(resp) => Some(resp.id),
            Message::Notification(_) => None,
        }
    }

    /// Method name for requests and notifications
    pub fn method(&self) -> Option<&str> {
        match self {
            Message::Request(req) => Some(&req.method),
            Message::Notification(notif) => Some(&notif.method),
            Message::Response(_) => None,
        }
    }

    /// Payload of the message
    pub fn data(&self) -> &Value {
        match self {
            Message::Request(req) => &req.data,
            Message::Response(resp) => &resp.data,
            Message::Notification(notif) => &notif.data,
        }
    }

    /// Check if this is a request
    pub fn is_request(&self) -> bool {
        matches!(self, Message::Request(_))
    }

    /// Check if this is a response
    pub fn is_response(&self) -> bool {
        matches!(self, Message::Response(_))
    }

    /// Check if this is a notification
    pub fn is_notification(&self) -> bool {
        matches!(self, Message::Notification(_))
    }
}
