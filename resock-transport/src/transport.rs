//! Reconnecting transport
//!
//! A [`Transport`] owns one socket at a time and a single event-loop task.
//! Sockets report their lifecycle over a channel; the loop handles those
//! events strictly in arrival order, re-emits them to listeners, and replaces
//! the socket when it drops, until the reconnection strategy refuses another
//! attempt.
//!
//! # Examples
//!
//! ```rust,no_run
//! use resock_transport::{ConnectParams, EventKind, Transport};
//! use serde_json::json;
//!
//! # async fn example() -> resock_core::Result<()> {
//! let transport = Transport::builder("wss://signaling.example.com")
//!     .params(ConnectParams::new().with_query("roomId", "r1"))
//!     .on(EventKind::Open, |_| println!("open"))
//!     .build()?;
//!
//! transport.on_message(|message| println!("received {:?}", message.method()));
//! transport.send(&json!({"notification": true, "method": "hello", "data": {}}))?;
//! transport.close();
//! # Ok(())
//! # }
//! ```

use crate::connection_state::{ConnectionManager, ConnectionState};
use crate::events::{EventDispatcher, EventKind, FailureReason, ListenerId, TransportEvent};
use crate::metrics::TransportMetrics;
use crate::params::ConnectParams;
use crate::socket::{Connector, EventSink, SocketEvent, SocketHandle};
use crate::transport_builder::TransportBuilder;
use parking_lot::Mutex;
use resock_core::{codec, util, Error, Message, Result};
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tracing::instrument::WithSubscriber;
use tracing::{dispatcher, Dispatch, Instrument};

type SocketEvents = mpsc::UnboundedReceiver<(u64, SocketEvent)>;

/// Everything the builder resolved, handed over to [`Transport::start`]
pub(crate) struct TransportParts {
    pub url: String,
    pub params: ConnectParams,
    pub manager: ConnectionManager,
    pub events: EventDispatcher,
    pub connector: Arc<dyn Connector>,
    pub dispatch: Dispatch,
    pub metrics: Option<Arc<TransportMetrics>>,
    pub runtime: tokio::runtime::Handle,
}

/// Reconnecting WebSocket transport
///
/// Dropping the transport closes it.
pub struct Transport {
    inner: Arc<Inner>,
}

struct Inner {
    url: String,
    params: ConnectParams,
    closed: AtomicBool,
    connected: AtomicBool,
    manager: ConnectionManager,
    socket: Mutex<Option<Box<dyn SocketHandle>>>,
    generation: AtomicU64,
    sink_tx: mpsc::UnboundedSender<(u64, SocketEvent)>,
    events: EventDispatcher,
    connector: Arc<dyn Connector>,
    dispatch: Dispatch,
    shutdown: Notify,
    metrics: Option<Arc<TransportMetrics>>,
}

/// What the event loop does after handling one socket event
#[derive(Debug, PartialEq, Eq)]
enum Step {
    Continue,
    Pause(Duration),
    Stop,
}

impl Transport {
    /// Create a transport with the default reconnection strategy and connector
    ///
    /// Must be called inside a Tokio runtime. The first socket is opened
    /// immediately.
    pub fn new(url: impl Into<String>, params: ConnectParams) -> Result<Self> {
        TransportBuilder::new(url).params(params).build()
    }

    /// Start configuring a transport
    pub fn builder(url: impl Into<String>) -> TransportBuilder {
        TransportBuilder::new(url)
    }

    pub(crate) fn start(parts: TransportParts) -> Result<Self> {
        let runtime = parts.runtime.clone();
        let (inner, socket_events) = Inner::new(parts);
        let inner = Arc::new(inner);

        let span = dispatcher::with_default(&inner.dispatch, || {
            inner.open_socket()?;
            Ok::<_, Error>(tracing::info_span!("transport", url = %inner.url))
        })?;

        let dispatch = inner.dispatch.clone();
        runtime.spawn(
            drive(Arc::clone(&inner), socket_events)
                .instrument(span)
                .with_subscriber(dispatch),
        );

        Ok(Self { inner })
    }

    /// Serialize `message` as JSON and write it to the current socket
    ///
    /// # Errors
    ///
    /// - [`Error::TransportClosed`] once [`close`](Self::close) was called
    /// - [`Error::Serialization`] when `message` cannot be encoded
    /// - [`Error::ConnectionClosed`] when reconnection was abandoned
    /// - whatever the socket reports for a failed write
    pub fn send<T: Serialize + ?Sized>(&self, message: &T) -> Result<()> {
        dispatcher::with_default(&self.inner.dispatch, || self.inner.send(message))
    }

    /// Close the transport
    ///
    /// Emits `close` once, then disconnects the socket. Later calls do
    /// nothing. No event of any kind is emitted afterwards.
    pub fn close(&self) {
        dispatcher::with_default(&self.inner.dispatch, || self.inner.close())
    }

    /// Whether [`close`](Self::close) was called
    pub fn closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Whether the current socket reports itself connected
    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::SeqCst)
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        self.inner.manager.state()
    }

    /// Reconnection attempts made over the transport's lifetime
    pub fn reconnection_attempts(&self) -> u32 {
        self.inner.manager.attempts()
    }

    pub fn url(&self) -> &str {
        &self.inner.url
    }

    pub fn params(&self) -> &ConnectParams {
        &self.inner.params
    }

    /// Register a listener for events of `kind`
    pub fn on<F>(&self, kind: EventKind, listener: F) -> ListenerId
    where
        F: Fn(&TransportEvent) + Send + Sync + 'static,
    {
        self.inner.events.subscribe(kind, listener)
    }

    /// Remove a listener registered with [`on`](Self::on)
    pub fn off(&self, kind: EventKind, id: ListenerId) -> bool {
        self.inner.events.unsubscribe(kind, id)
    }

    /// Register a listener for decoded inbound messages
    pub fn on_message<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&Message) + Send + Sync + 'static,
    {
        self.on(EventKind::Message, move |event| {
            if let TransportEvent::Message(message) = event {
                listener(message);
            }
        })
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.inner.events.listener_count(kind)
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transport")
            .field("url", &self.inner.url)
            .field("state", &self.state())
            .field("closed", &self.closed())
            .field("connected", &self.is_connected())
            .finish()
    }
}

/// Event loop of one transport
///
/// Exits on `close()`, after a terminal failure, or when every socket
/// sender is gone.
async fn drive(inner: Arc<Inner>, mut socket_events: SocketEvents) {
    loop {
        let (generation, event) = tokio::select! {
            biased;
            _ = inner.shutdown.notified() => break,
            next = socket_events.recv() => match next {
                Some(next) => next,
                None => break,
            },
        };

        match inner.handle_event(generation, event) {
            Step::Continue => {}
            Step::Pause(delay) => {
                tokio::select! {
                    biased;
                    _ = inner.shutdown.notified() => break,
                    _ = util::sleep(util::duration_to_millis(delay)) => {}
                }
            }
            Step::Stop => break,
        }
    }

    tracing::debug!("Event loop stopped");
}

impl Inner {
    fn new(parts: TransportParts) -> (Self, SocketEvents) {
        let (sink_tx, socket_events) = mpsc::unbounded_channel();
        let inner = Self {
            url: parts.url,
            params: parts.params,
            closed: AtomicBool::new(false),
            connected: AtomicBool::new(false),
            manager: parts.manager,
            socket: Mutex::new(None),
            generation: AtomicU64::new(0),
            sink_tx,
            events: parts.events,
            connector: parts.connector,
            dispatch: parts.dispatch,
            shutdown: Notify::new(),
            metrics: parts.metrics,
        };
        (inner, socket_events)
    }

    /// Open a socket with a new generation and make it the current one
    ///
    /// Returns the socket it replaced. The slot is never left empty while
    /// the new socket opens, so concurrent sends keep reaching the old one.
    fn open_socket(&self) -> Result<Option<Box<dyn SocketHandle>>> {
        if self.url.is_empty() {
            return Err(Error::Config("url is empty".into()));
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let sink = EventSink::new(generation, self.sink_tx.clone());
        let mut socket = self.connector.open(&self.url, &self.params, sink)?;

        let mut slot = self.socket.lock();
        if self.closed.load(Ordering::SeqCst) {
            // close() ran while the socket was being opened
            drop(slot);
            if let Err(e) = socket.disconnect() {
                tracing::debug!(
                    generation,
                    error = %e,
                    "Failed to disconnect socket opened during close()"
                );
            }
            return Ok(None);
        }
        let previous = std::mem::replace(&mut *slot, Some(socket));
        tracing::debug!(generation, "Socket opened");
        Ok(previous)
    }

    fn record_state(&self) {
        if let Some(ref m) = self.metrics {
            m.update_connection_state(self.manager.state());
        }
    }

    fn record_error(&self, error_type: &str) {
        if let Some(ref m) = self.metrics {
            m.record_error(error_type);
        }
    }

    fn handle_event(&self, generation: u64, event: SocketEvent) -> Step {
        if self.closed.load(Ordering::SeqCst) {
            tracing::debug!(event = ?event, "Transport closed, ignoring socket event");
            return Step::Continue;
        }

        let current = self.generation.load(Ordering::SeqCst);
        if generation != current {
            tracing::debug!(
                generation,
                current,
                event = ?event,
                "Ignoring event from a replaced socket"
            );
            return Step::Continue;
        }

        match event {
            SocketEvent::Connect => self.on_connect(),
            SocketEvent::Disconnect { reason } => self.on_disconnect(reason),
            SocketEvent::Reconnect => {
                tracing::info!("Socket reconnected after failed handshakes");
                self.events.emit(&TransportEvent::Reconnect);
                Step::Continue
            }
            SocketEvent::ConnectError(error) => {
                self.connected.store(false, Ordering::SeqCst);
                tracing::error!(error = %error, "Connection error");
                self.record_error("connect");
                Step::Continue
            }
            SocketEvent::Error(error) => {
                self.connected.store(false, Ordering::SeqCst);
                tracing::error!(error = %error, "Socket error");
                self.record_error("socket");
                self.events
                    .emit(&TransportEvent::Failed(FailureReason::SocketError(error)));
                Step::Continue
            }
            SocketEvent::Message(text) => self.on_message(&text),
        }
    }

    fn on_connect(&self) -> Step {
        if self.connected.swap(true, Ordering::SeqCst) {
            tracing::debug!("Already connected, ignoring connect event");
            return Step::Continue;
        }

        self.manager.connected();
        tracing::info!(url = %self.url, "Connected");
        self.record_state();
        if let Some(ref m) = self.metrics {
            if self.manager.attempts() > 0 {
                m.record_reconnection_success();
            }
        }

        self.events.emit(&TransportEvent::Open);
        Step::Continue
    }

    fn on_disconnect(&self, reason: String) -> Step {
        self.connected.store(false, Ordering::SeqCst);
        self.manager.disconnected();
        tracing::info!(reason = %reason, "Disconnected");
        self.record_state();
        self.events.emit(&TransportEvent::Disconnect { reason });

        // a disconnect listener may have closed the transport
        if self.closed.load(Ordering::SeqCst) {
            return Step::Stop;
        }

        let Some(delay) = self.manager.next_reconnect_delay() else {
            let attempts = self.manager.attempts();
            tracing::warn!(attempts, "Reconnection abandoned, ceiling reached");
            let socket = self.socket.lock().take();
            drop(socket);
            self.record_state();
            self.events.emit(&TransportEvent::Failed(
                FailureReason::ReconnectAbandoned { attempts },
            ));
            return Step::Stop;
        };

        let attempt = self.manager.attempts();
        tracing::info!(
            attempt,
            delay_ms = util::duration_to_millis(delay),
            "Reconnecting"
        );

        match self.open_socket() {
            Ok(Some(mut previous)) => {
                if let Err(e) = previous.disconnect() {
                    tracing::debug!(error = %e, "Replaced socket was already gone");
                }
            }
            Ok(None) => {}
            Err(e) => {
                tracing::error!(error = %e, "Failed to open replacement socket");
                let socket = self.socket.lock().take();
                drop(socket);
                self.manager.failed();
                self.record_state();
                self.record_error("reconnection");
                self.events
                    .emit(&TransportEvent::Failed(FailureReason::SocketError(e.to_string())));
                return Step::Stop;
            }
        }

        if let Some(ref m) = self.metrics {
            m.record_reconnection_attempt();
        }
        self.record_state();
        Step::Pause(delay)
    }

    fn on_message(&self, text: &str) -> Step {
        let Some(message) = Message::parse(text) else {
            if let Some(ref m) = self.metrics {
                m.record_dropped("undecodable");
            }
            return Step::Continue;
        };

        if self.events.listener_count(EventKind::Message) == 0 {
            tracing::error!(
                "no listeners for WebSocket \"message\" event, ignoring received message"
            );
            if let Some(ref m) = self.metrics {
                m.record_dropped("no_listener");
            }
            return Step::Continue;
        }

        if let Some(ref m) = self.metrics {
            let kind = match message {
                Message::Request(_) => "request",
                Message::Response(_) => "response",
                Message::Notification(_) => "notification",
            };
            m.record_received(kind);
        }
        self.events.emit(&TransportEvent::Message(message));
        Step::Continue
    }

    fn send<T: Serialize + ?Sized>(&self, message: &T) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::TransportClosed);
        }

        let text = codec::encode(message)?;

        let mut slot = self.socket.lock();
        let socket = slot.as_mut().ok_or(Error::ConnectionClosed)?;
        if let Err(e) = socket.send_text(text) {
            tracing::warn!(error = %e, "send() failed");
            self.record_error("send");
            return Err(e);
        }

        if let Some(ref m) = self.metrics {
            m.record_sent();
        }
        Ok(())
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        tracing::debug!(url = %self.url, "close()");
        self.connected.store(false, Ordering::SeqCst);
        self.manager.closed();
        self.record_state();
        self.events.emit(&TransportEvent::Close);

        let socket = self.socket.lock().take();
        if let Some(mut socket) = socket {
            if let Err(e) = socket.disconnect() {
                tracing::error!(error = %e, "close() | error closing the socket");
            }
        }

        self.shutdown.notify_one();
    }
}
