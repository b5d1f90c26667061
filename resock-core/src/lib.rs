//! Core types for resock
//!
//! This crate holds everything the transport needs that is not tied to a
//! socket:
//!
//! - **Error handling**: the [`Error`] taxonomy shared by all resock crates
//! - **Messages**: the signaling [`Message`] type and its JSON [`codec`]
//! - **Utilities**: [`util::sleep`], [`util::duration_to_millis`] and [`util::generate_random_number`]
//! - **Observability**: tracing subscriber and OpenTelemetry setup
//!
//! # Example
//!
//! ```rust
//! use resock_core::{codec, Message};
//!
//! let request = Message::request("join", Some(serde_json::json!({"roomId": "r1"})));
//! let text = codec::encode(&request).unwrap();
//!
//! let decoded = Message::parse(&text).unwrap();
//! assert_eq!(decoded.method(), Some("join"));
//! assert_eq!(decoded.id(), request.id());
//! ```

pub mod codec;
pub mod error;
pub mod observability;
pub mod types;
pub mod util;

pub use error::{Error, Result};
pub use observability::{init_observability, shutdown_observability, ObservabilityConfig};
pub use types::{Message, Notification, Request, Response};
