//! resock - reconnecting WebSocket transport for signaling clients
//!
//! This is the convenience crate that re-exports the resock sub-crates.
//! Use it if you want a single dependency.
//!
//! # Architecture
//!
//! - **resock-core**: errors, signaling message codec, utilities, observability
//! - **resock-transport**: the reconnecting [`Transport`] and its socket layer
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use resock::{EventKind, Message, Transport};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let transport = Transport::builder("ws://localhost:4443")
//!         .on(EventKind::Open, |_| println!("connected"))
//!         .build()?;
//!
//!     transport.on_message(|message| {
//!         if let Message::Notification(notification) = message {
//!             println!("{}: {}", notification.method, notification.data);
//!         }
//!     });
//!
//!     let join = Message::request("join", Some(serde_json::json!({"roomId": "r1"})));
//!     transport.send(&join)?;
//!
//!     Ok(())
//! }
//! ```

// Re-export sub-crates so everything is reachable through `resock::`
pub use resock_core as core;
pub use resock_transport as transport;

// Most commonly used types
pub use resock_core::{Error, Message, Result};
pub use resock_transport::{ConnectParams, EventKind, Transport, TransportBuilder, TransportEvent};
