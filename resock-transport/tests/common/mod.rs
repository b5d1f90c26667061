//! Common test utilities for resock-transport integration tests
//!
//! - [`MockConnector`]: in-memory sockets driven by the test through their
//!   [`EventSink`]
//! - [`MockWsServer`]: a real tokio-tungstenite server on a random port
//! - [`EventLog`]: records every event a transport emits
//! - [`LogCapture`]: a private tracing subscriber whose output can be read back

#![allow(dead_code)]

use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use resock_transport::{
    ConnectParams, Connector, Error, EventKind, EventSink, Result, SocketHandle, TransportBuilder,
    TransportEvent,
};
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;
use tracing_subscriber::fmt::MakeWriter;

/// State of one socket opened by [`MockConnector`]
pub struct MockSocketState {
    pub url: String,
    pub params: ConnectParams,
    pub sink: EventSink,
    pub sent: Mutex<Vec<String>>,
    pub disconnected: AtomicBool,
}

/// Connector whose sockets never touch the network
///
/// The test plays the socket library: it pushes lifecycle events through
/// [`MockConnector::sink`] and inspects what the transport wrote.
#[derive(Default)]
pub struct MockConnector {
    sockets: Mutex<Vec<Arc<MockSocketState>>>,
    fail_writes: Arc<AtomicBool>,
    fail_disconnects: Arc<AtomicBool>,
    slow_open: Mutex<Option<(usize, Duration)>>,
}

struct MockSocket {
    state: Arc<MockSocketState>,
    fail_writes: Arc<AtomicBool>,
    fail_disconnects: Arc<AtomicBool>,
}

impl SocketHandle for MockSocket {
    fn send_text(&mut self, text: String) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::WebSocket("write refused".into()));
        }
        self.state.sent.lock().push(text);
        Ok(())
    }

    fn disconnect(&mut self) -> Result<()> {
        if self.state.disconnected.swap(true, Ordering::SeqCst) {
            return Err(Error::ConnectionClosed);
        }
        if self.fail_disconnects.load(Ordering::SeqCst) {
            return Err(Error::WebSocket("disconnect refused".into()));
        }
        Ok(())
    }
}

impl Connector for MockConnector {
    fn open(
        &self,
        url: &str,
        params: &ConnectParams,
        sink: EventSink,
    ) -> Result<Box<dyn SocketHandle>> {
        let slow = *self.slow_open.lock();
        if let Some((index, delay)) = slow {
            if self.opened() == index {
                // blocks the calling thread, like a slow handshake setup would
                std::thread::sleep(delay);
            }
        }

        let state = Arc::new(MockSocketState {
            url: url.to_string(),
            params: params.clone(),
            sink,
            sent: Mutex::new(Vec::new()),
            disconnected: AtomicBool::new(false),
        });
        self.sockets.lock().push(Arc::clone(&state));
        Ok(Box::new(MockSocket {
            state,
            fail_writes: Arc::clone(&self.fail_writes),
            fail_disconnects: Arc::clone(&self.fail_disconnects),
        }))
    }
}

impl MockConnector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Number of sockets opened so far
    pub fn opened(&self) -> usize {
        self.sockets.lock().len()
    }

    /// Socket number `index`, in opening order
    pub fn socket(&self, index: usize) -> Arc<MockSocketState> {
        Arc::clone(&self.sockets.lock()[index])
    }

    /// Event sink of socket number `index`
    pub fn sink(&self, index: usize) -> EventSink {
        self.socket(index).sink.clone()
    }

    /// Event sink of the most recently opened socket
    pub fn latest_sink(&self) -> EventSink {
        let sockets = self.sockets.lock();
        sockets
            .last()
            .map(|socket| socket.sink.clone())
            .expect("no socket opened yet")
    }

    /// Texts written to socket number `index`
    pub fn sent(&self, index: usize) -> Vec<String> {
        self.socket(index).sent.lock().clone()
    }

    pub fn is_disconnected(&self, index: usize) -> bool {
        self.socket(index).disconnected.load(Ordering::SeqCst)
    }

    /// Make every socket's writes fail
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make every socket's disconnect fail after marking it disconnected
    pub fn set_fail_disconnects(&self, fail: bool) {
        self.fail_disconnects.store(fail, Ordering::SeqCst);
    }

    /// Block for `delay` inside the open of socket number `index`
    pub fn delay_open(&self, index: usize, delay: Duration) {
        *self.slow_open.lock() = Some((index, delay));
    }
}

/// Records every event emitted by a transport
#[derive(Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<TransportEvent>>>,
}

impl EventLog {
    /// Subscribe a fresh log to every event kind of `builder`
    pub fn attach(builder: TransportBuilder) -> (TransportBuilder, EventLog) {
        let log = EventLog::default();
        let builder = EventKind::ALL.iter().fold(builder, |builder, kind| {
            let events = Arc::clone(&log.events);
            builder.on(*kind, move |event| events.lock().push(event.clone()))
        });
        (builder, log)
    }

    pub fn events(&self) -> Vec<TransportEvent> {
        self.events.lock().clone()
    }

    pub fn kinds(&self) -> Vec<EventKind> {
        self.events.lock().iter().map(TransportEvent::kind).collect()
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|event| event.kind() == kind)
            .count()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }
}

/// Tracing output captured in memory
#[derive(Clone, Default)]
pub struct LogCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = LogCapture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

impl LogCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// A dispatcher writing plain-text lines (debug and up) into this capture
    pub fn dispatch(&self) -> tracing::Dispatch {
        let subscriber = tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish();
        tracing::Dispatch::new(subscriber)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock()).into_owned()
    }

    /// Captured lines containing `needle`
    pub fn lines_containing(&self, needle: &str) -> Vec<String> {
        self.contents()
            .lines()
            .filter(|line| line.contains(needle))
            .map(str::to_string)
            .collect()
    }
}

/// Poll `condition` every 10ms for up to 5 seconds
pub async fn wait_until<F: Fn() -> bool>(condition: F) -> bool {
    for _ in 0..500 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

/// Mock WebSocket server for transport testing
///
/// Accepts any number of connections, records every text frame it receives,
/// optionally greets each new connection, and can drop all open connections
/// on demand.
pub struct MockWsServer {
    addr: SocketAddr,
    shutdown_tx: mpsc::Sender<()>,
    kick_tx: broadcast::Sender<()>,
    accepted: Arc<AtomicUsize>,
    message_rx: mpsc::Receiver<String>,
}

impl MockWsServer {
    /// Start a server that stays silent
    pub async fn new() -> Self {
        Self::start(None).await
    }

    /// Start a server that sends `greeting` to every new connection
    pub async fn with_greeting(greeting: impl Into<String>) -> Self {
        Self::start(Some(greeting.into())).await
    }

    async fn start(greeting: Option<String>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let (msg_tx, msg_rx) = mpsc::channel::<String>(100);
        let (kick_tx, _) = broadcast::channel::<()>(4);
        let accepted = Arc::new(AtomicUsize::new(0));

        let kick = kick_tx.clone();
        let counter = Arc::clone(&accepted);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => break,
                    accept_result = listener.accept() => {
                        let Ok((stream, _)) = accept_result else { continue };
                        let msg_tx = msg_tx.clone();
                        let greeting = greeting.clone();
                        let mut kick_rx = kick.subscribe();
                        let counter = Arc::clone(&counter);

                        tokio::spawn(async move {
                            let Ok(ws_stream) = accept_async(stream).await else { return };
                            counter.fetch_add(1, Ordering::SeqCst);
                            let (mut write, mut read) = ws_stream.split();

                            if let Some(greeting) = greeting {
                                let _ = write.send(Message::Text(greeting)).await;
                            }

                            loop {
                                tokio::select! {
                                    _ = kick_rx.recv() => {
                                        let _ = write.send(Message::Close(None)).await;
                                        break;
                                    }
                                    frame = read.next() => match frame {
                                        Some(Ok(Message::Text(text))) => {
                                            let _ = msg_tx.send(text).await;
                                        }
                                        Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                                        Some(Ok(_)) => {}
                                    },
                                }
                            }
                        });
                    }
                }
            }
        });

        Self {
            addr,
            shutdown_tx,
            kick_tx,
            accepted,
            message_rx: msg_rx,
        }
    }

    /// Get the WebSocket URL for connecting to this server
    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Completed handshakes so far
    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }

    /// Close every open connection with a close frame
    pub fn disconnect_all(&self) {
        let _ = self.kick_tx.send(());
    }

    /// Wait for the next text frame received by the server
    pub async fn wait_for_message(&mut self) -> Option<String> {
        tokio::time::timeout(Duration::from_secs(5), self.message_rx.recv())
            .await
            .ok()
            .flatten()
    }

    /// Stop accepting new connections
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}
