//! Socket abstraction
//!
//! The transport never touches the network itself. It asks a [`Connector`]
//! for a socket and hands it an [`EventSink`]; the socket reports its
//! lifecycle through that sink and accepts outbound text through its
//! [`SocketHandle`]. [`WsConnector`](crate::WsConnector) is the
//! tokio-tungstenite implementation; tests plug in their own.
//!
//! Every socket a transport opens gets a new generation number. Events carry
//! the generation of the socket that produced them, which lets the transport
//! ignore late events from a socket it has already replaced.

use crate::params::ConnectParams;
use resock_core::Result;
use tokio::sync::mpsc;

/// Lifecycle event reported by a socket
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
    /// Handshake completed
    Connect,
    /// Connection ended, with a short reason
    Disconnect { reason: String },
    /// A failed handshake was retried successfully by the socket itself
    Reconnect,
    /// A handshake attempt failed
    ConnectError(String),
    /// Unrecoverable socket error
    Error(String),
    /// Inbound text frame
    Message(String),
}

/// Channel end a socket uses to report its events
#[derive(Debug, Clone)]
pub struct EventSink {
    generation: u64,
    tx: mpsc::UnboundedSender<(u64, SocketEvent)>,
}

impl EventSink {
    pub(crate) fn new(generation: u64, tx: mpsc::UnboundedSender<(u64, SocketEvent)>) -> Self {
        Self { generation, tx }
    }

    /// Generation of the socket owning this sink
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Report an event; returns false once the transport has gone away
    pub fn emit(&self, event: SocketEvent) -> bool {
        self.tx.send((self.generation, event)).is_ok()
    }
}

/// Handle to one live socket, exclusively owned by the transport
pub trait SocketHandle: Send {
    /// Queue a text frame for sending
    fn send_text(&mut self, text: String) -> Result<()>;

    /// Ask the socket to close
    fn disconnect(&mut self) -> Result<()>;
}

/// Opens sockets for a transport
pub trait Connector: Send + Sync + 'static {
    /// Open a socket to `url`
    ///
    /// Must return immediately: connecting happens in the background and is
    /// reported through `sink`. Errors returned here are configuration
    /// errors found before any I/O.
    fn open(
        &self,
        url: &str,
        params: &ConnectParams,
        sink: EventSink,
    ) -> Result<Box<dyn SocketHandle>>;
}
