//! Reconnecting WebSocket transport for signaling clients
//!
//! This crate keeps one WebSocket connection to a signaling endpoint alive.
//! It re-establishes the connection after a drop, bounded by a reconnection
//! ceiling, and exposes the connection's lifecycle as events.
//!
//! # Core Features
//!
//! - **Event-driven**: `open`, `close`, `disconnect`, `reconnect`, `failed`
//!   and `message` events delivered to registered listeners
//! - **Auto-Reconnection**: pluggable strategies, 500ms pause and 240 attempts by default
//! - **JSON Send**: any `Serialize` value written as one text frame
//! - **Pluggable Sockets**: [`Connector`] trait with a tokio-tungstenite default
//! - **Observability**: `tracing` logs routed to an injectable dispatcher,
//!   OpenTelemetry metrics
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use resock_transport::{ConnectParams, EventKind, Transport};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let transport = Transport::builder("ws://localhost:4443")
//!         .params(ConnectParams::new().with_query("peerId", "alice"))
//!         .on(EventKind::Open, |_| println!("connected"))
//!         .on(EventKind::Failed, |event| eprintln!("gave up: {:?}", event))
//!         .build()?;
//!
//!     transport.on_message(|message| println!("received: {:?}", message));
//!     transport.send(&json!({"notification": true, "method": "hello", "data": {}}))?;
//!
//!     transport.close();
//!     Ok(())
//! }
//! ```

mod connection_state;
mod events;
mod metrics;
mod params;
mod reconnect;
mod socket;
mod transport;
mod transport_builder;
mod ws;

pub use connection_state::{ConnectionManager, ConnectionState};
pub use events::{EventDispatcher, EventKind, FailureReason, Listener, ListenerId, TransportEvent};
pub use metrics::TransportMetrics;
pub use params::{ConnectParams, DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_RETRY_DELAY_MS};
pub use reconnect::{
    ExponentialBackoff, FixedDelay, NoReconnect, ReconnectionStrategy, DEFAULT_RECONNECT_CEILING,
    DEFAULT_RECONNECT_PAUSE,
};
pub use socket::{Connector, EventSink, SocketEvent, SocketHandle};
pub use transport::Transport;
pub use transport_builder::TransportBuilder;
pub use ws::{
    resolve_url, WsConnector, REASON_CLIENT_DISCONNECT, REASON_SERVER_DISCONNECT,
    REASON_TRANSPORT_CLOSE,
};

// Re-export core types
pub use resock_core::{Error, Message, Result};
