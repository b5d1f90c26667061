//! WebSocket connector built on tokio-tungstenite
//!
//! Each call to [`WsConnector::open`] validates the URL up front and then
//! spawns one I/O task for the new socket. The task keeps retrying the
//! handshake until it connects (or runs out of `retry_attempts`), pumps
//! frames in both directions while connected, and reports a single
//! `Disconnect` when the connection ends. It never reconnects after a
//! connection has been established; that decision belongs to the transport.

use crate::params::ConnectParams;
use crate::socket::{Connector, EventSink, SocketEvent, SocketHandle};
use futures::{SinkExt, StreamExt};
use resock_core::{Error, Result};
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{HeaderName, HeaderValue, Request};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use url::Url;

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Reason reported when the transport asked the socket to close
pub const REASON_CLIENT_DISCONNECT: &str = "io client disconnect";
/// Reason reported when the peer sent a close frame
pub const REASON_SERVER_DISCONNECT: &str = "io server disconnect";
/// Reason reported when the stream ended without a close frame
pub const REASON_TRANSPORT_CLOSE: &str = "transport close";

/// Default connector producing tokio-tungstenite sockets
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

impl WsConnector {
    pub fn new() -> Self {
        Self
    }
}

/// Validate `url` and merge the query parameters from `params` into it
///
/// `http`/`https` are accepted and mapped to `ws`/`wss`.
pub fn resolve_url(url: &str, params: &ConnectParams) -> Result<Url> {
    if url.is_empty() {
        return Err(Error::Config("url is empty".into()));
    }

    let mut parsed =
        Url::parse(url).map_err(|e| Error::Config(format!("invalid url {:?}: {}", url, e)))?;

    let scheme = match parsed.scheme() {
        "ws" | "http" => "ws",
        "wss" | "https" => "wss",
        other => {
            return Err(Error::Config(format!("unsupported url scheme {:?}", other)));
        }
    };
    if parsed.scheme() != scheme && parsed.set_scheme(scheme).is_err() {
        return Err(Error::Config(format!("cannot use scheme {:?} for {:?}", scheme, url)));
    }

    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(Error::Config(format!("url {:?} has no host", url)));
    }

    if !params.query.is_empty() {
        let mut pairs = parsed.query_pairs_mut();
        for (key, value) in &params.query {
            pairs.append_pair(key, value);
        }
    }

    Ok(parsed)
}

/// Build the handshake request for `url`, adding the configured headers
fn build_request(url: &Url, params: &ConnectParams) -> Result<Request<()>> {
    let mut request = url
        .as_str()
        .into_client_request()
        .map_err(|e| Error::Config(format!("invalid handshake request: {}", e)))?;

    for (name, value) in &params.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| Error::Config(format!("invalid header name {:?}: {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| Error::Config(format!("invalid header value for {}: {}", name, e)))?;
        request.headers_mut().insert(name, value);
    }

    Ok(request)
}

impl Connector for WsConnector {
    fn open(
        &self,
        url: &str,
        params: &ConnectParams,
        sink: EventSink,
    ) -> Result<Box<dyn SocketHandle>> {
        let url = resolve_url(url, params)?;
        // fail on bad headers now rather than inside the task
        build_request(&url, params)?;

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::Config(format!("no tokio runtime: {}", e)))?;

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tracing::debug!(url = %url, generation = sink.generation(), "Opening socket");
        runtime.spawn(run_socket(url, params.clone(), sink, outbound_rx, shutdown_rx));

        Ok(Box::new(WsSocket {
            outbound: outbound_tx,
            shutdown: Some(shutdown_tx),
        }))
    }
}

/// Handle to a socket driven by [`run_socket`]
struct WsSocket {
    outbound: mpsc::UnboundedSender<String>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl SocketHandle for WsSocket {
    fn send_text(&mut self, text: String) -> Result<()> {
        if self.shutdown.is_none() {
            return Err(Error::ConnectionClosed);
        }
        self.outbound
            .send(text)
            .map_err(|_| Error::WebSocket("socket task has stopped".into()))
    }

    fn disconnect(&mut self) -> Result<()> {
        match self.shutdown.take() {
            // the task may already be gone; nothing left to stop then
            Some(shutdown) => {
                let _ = shutdown.send(());
                Ok(())
            }
            None => Err(Error::ConnectionClosed),
        }
    }
}

enum Handshake {
    Connected(WsStream),
    Cancelled,
    GaveUp(String),
}

async fn handshake(
    url: &Url,
    params: &ConnectParams,
    sink: &EventSink,
    shutdown: &mut oneshot::Receiver<()>,
) -> Handshake {
    let mut failures: u32 = 0;

    loop {
        let request = match build_request(url, params) {
            Ok(request) => request,
            Err(e) => return Handshake::GaveUp(e.to_string()),
        };

        let attempt = tokio::time::timeout(params.connect_timeout(), connect_async(request));
        let error = tokio::select! {
            _ = &mut *shutdown => return Handshake::Cancelled,
            result = attempt => match result {
                Ok(Ok((stream, _response))) => {
                    if failures > 0 {
                        sink.emit(SocketEvent::Reconnect);
                    }
                    return Handshake::Connected(stream);
                }
                Ok(Err(e)) => e.to_string(),
                Err(_) => format!("timeout after {}ms", params.connect_timeout_ms),
            },
        };

        failures += 1;
        tracing::debug!(url = %url, failures, error = %error, "Handshake failed");
        sink.emit(SocketEvent::ConnectError(error.clone()));

        if params.retry_attempts.is_some_and(|max| failures > max) {
            return Handshake::GaveUp(error);
        }

        tokio::select! {
            _ = &mut *shutdown => return Handshake::Cancelled,
            _ = tokio::time::sleep(params.retry_delay()) => {}
        }
    }
}

/// I/O task of one socket
async fn run_socket(
    url: Url,
    params: ConnectParams,
    sink: EventSink,
    mut outbound: mpsc::UnboundedReceiver<String>,
    mut shutdown: oneshot::Receiver<()>,
) {
    let stream = match handshake(&url, &params, &sink, &mut shutdown).await {
        Handshake::Connected(stream) => stream,
        Handshake::Cancelled => {
            tracing::debug!(url = %url, "Socket closed before connecting");
            return;
        }
        Handshake::GaveUp(error) => {
            sink.emit(SocketEvent::Error(error));
            return;
        }
    };

    let (mut write, mut read) = stream.split();
    sink.emit(SocketEvent::Connect);

    let reason = loop {
        tokio::select! {
            _ = &mut shutdown => {
                if let Err(e) = write.send(WsMessage::Close(None)).await {
                    tracing::debug!(error = %e, "Failed to send close frame");
                }
                break REASON_CLIENT_DISCONNECT.to_string();
            }
            Some(text) = outbound.recv() => {
                if let Err(e) = write.send(WsMessage::Text(text)).await {
                    tracing::warn!(error = %e, "Failed to write frame");
                    break format!("transport error: {}", e);
                }
            }
            frame = read.next() => match frame {
                Some(Ok(WsMessage::Text(text))) => {
                    sink.emit(SocketEvent::Message(text));
                }
                Some(Ok(WsMessage::Binary(bytes))) => match String::from_utf8(bytes) {
                    Ok(text) => {
                        sink.emit(SocketEvent::Message(text));
                    }
                    Err(_) => tracing::debug!("Ignoring non UTF-8 binary frame"),
                },
                Some(Ok(WsMessage::Close(_))) => break REASON_SERVER_DISCONNECT.to_string(),
                Some(Ok(_)) => {} // ping/pong handled by tungstenite
                Some(Err(e)) => break format!("transport error: {}", e),
                None => break REASON_TRANSPORT_CLOSE.to_string(),
            },
        }
    };

    tracing::debug!(url = %url, reason = %reason, "Socket disconnected");
    sink.emit(SocketEvent::Disconnect { reason });
}
